//! Validated, lazy access to one open container
//!
//! An [`Archive`] maps the file once and slices entry payloads out of the
//! mapping on demand; nothing is decoded until an accessor asks for it. The
//! full calibration table is the one expensive whole-archive read, so it is
//! memoized on the handle: the first call loads it, later calls return the
//! cached table, and concurrent first calls collapse to a single load.

use crate::error::{ArchiveError, Result};
use crate::format::{
    decode_payload, ArchiveIndex, ArchiveMeta, AudioClip, CameraCalibration, CameraInfo, EntryKey,
    EntryRecord, ImageKind, Landmarks2d, Landmarks3d, ModelFrame, PayloadEncoding, ScanMesh,
    LANDMARK_CAMERAS, MAGIC,
};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use memmap2::Mmap;
use mvx_common::{Capabilities, CameraId};
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Magic + index length
const HEADER_LEN: usize = MAGIC.len() + 8;

/// Frame addressing for batch image access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Every frame present for the camera, in ascending frame order
    All,
    /// Exactly these frames, in the given order; a missing frame is an error
    Frames(Vec<u32>),
}

/// One open `.mvc` container
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    mmap: Mmap,
    payload_start: usize,
    index: ArchiveIndex,
    calibration: OnceCell<BTreeMap<CameraId, CameraCalibration>>,
    calibration_loads: AtomicUsize,
}

impl Archive {
    /// Open and validate a container file
    ///
    /// Fails with [`ArchiveError::Format`] when the magic, index, or required
    /// top-level metadata is missing or corrupt.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < HEADER_LEN {
            return Err(ArchiveError::Format(format!(
                "{} is truncated ({} bytes)",
                path.display(),
                mmap.len()
            )));
        }
        if mmap[..MAGIC.len()] != MAGIC {
            return Err(ArchiveError::Format(format!(
                "{} is not an mvc container (bad magic)",
                path.display()
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&mmap[MAGIC.len()..HEADER_LEN]);
        let index_len = u64::from_le_bytes(len_bytes) as usize;

        let payload_start = HEADER_LEN
            .checked_add(index_len)
            .filter(|end| *end <= mmap.len())
            .ok_or_else(|| {
                ArchiveError::Format(format!(
                    "{} declares an index larger than the file",
                    path.display()
                ))
            })?;

        let index: ArchiveIndex = decode_payload(&mmap[HEADER_LEN..payload_start])
            .map_err(|e| ArchiveError::Format(format!("archive index is corrupt: {}", e)))?;

        validate_index(&index, mmap.len() - payload_start)?;

        Ok(Self {
            path,
            mmap,
            payload_start,
            index,
            calibration: OnceCell::new(),
            calibration_loads: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &ArchiveMeta {
        &self.index.meta
    }

    /// Camera rig metadata: device count, frame count, resolution
    pub fn camera_info(&self) -> &CameraInfo {
        &self.index.meta.camera
    }

    /// Actor metadata recorded at capture time
    pub fn actor_info(&self) -> &crate::format::ActorInfo {
        &self.index.meta.actor
    }

    pub fn capture_date(&self) -> &str {
        &self.index.meta.capture_date
    }

    /// Modality families this performance type carries
    pub fn capabilities(&self) -> Capabilities {
        let part = self
            .index
            .meta
            .performance_part
            .split('_')
            .next()
            .unwrap_or("");
        Capabilities::from_part(part)
    }

    /// Cameras that actually captured this performance
    pub fn camera_group(&self) -> &BTreeSet<CameraId> {
        &self.index.camera_group
    }

    /// Entry counts per modality group, for inspection tooling
    pub fn group_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for key in self.index.entries.keys() {
            *counts.entry(key.group()).or_insert(0) += 1;
        }
        counts
    }

    fn num_frames(&self) -> u32 {
        self.index.meta.camera.num_frame
    }

    fn parse_camera(&self, camera_id: &str) -> Result<CameraId> {
        camera_id
            .parse::<CameraId>()
            .map_err(|e| ArchiveError::InvalidRequest(e.to_string()))
    }

    fn check_frame_bound(&self, frame: u32) -> Result<()> {
        if frame >= self.num_frames() {
            return Err(ArchiveError::InvalidRequest(format!(
                "frame {} is out of range (sequence has {} frames)",
                frame,
                self.num_frames()
            )));
        }
        Ok(())
    }

    fn entry(&self, key: &EntryKey) -> Option<&EntryRecord> {
        self.index.entries.get(key)
    }

    fn payload(&self, record: &EntryRecord) -> &[u8] {
        let start = self.payload_start + record.offset as usize;
        &self.mmap[start..start + record.len as usize]
    }

    fn raw_payload<T: serde::de::DeserializeOwned>(&self, record: &EntryRecord) -> Result<T> {
        if record.encoding != PayloadEncoding::Raw {
            return Err(ArchiveError::Decode(
                "entry holds compressed image bytes, not a numeric payload".to_string(),
            ));
        }
        decode_payload(self.payload(record))
    }

    // -----------------------------------------------------------------------
    // Calibration
    // -----------------------------------------------------------------------

    /// Calibration for one camera
    ///
    /// Unlike the image accessors this is a hard lookup: a camera missing
    /// from the calibration group is a [`ArchiveError::NotFound`].
    pub fn calibration(&self, camera_id: &str) -> Result<CameraCalibration> {
        let camera = self.parse_camera(camera_id)?;
        let record = self
            .entry(&EntryKey::Calibration { camera })
            .ok_or_else(|| {
                ArchiveError::NotFound(format!("camera {} is not in the calibration group", camera))
            })?;
        self.raw_payload(record)
    }

    /// The full calibration table, loaded once per handle and memoized
    ///
    /// The load walks every calibration entry in the container; subsequent
    /// calls return the cached table. Concurrent first calls on the same
    /// handle collapse to a single load.
    pub fn all_calibrations(&self) -> Result<&BTreeMap<CameraId, CameraCalibration>> {
        self.calibration.get_or_try_init(|| {
            self.calibration_loads.fetch_add(1, Ordering::SeqCst);
            let mut table = BTreeMap::new();
            for (key, record) in &self.index.entries {
                if let EntryKey::Calibration { camera } = key {
                    table.insert(*camera, self.raw_payload::<CameraCalibration>(record)?);
                }
            }
            Ok(table)
        })
    }

    /// How many times the calibration table has been loaded from the file
    ///
    /// Stays at 1 after any number of `all_calibrations` calls; tests use it
    /// to prove the memo holds.
    pub fn calibration_loads(&self) -> usize {
        self.calibration_loads.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Imagery
    // -----------------------------------------------------------------------

    /// Decode one image entry
    ///
    /// Returns `Ok(None)` when the camera never captured this performance or
    /// the frame is absent. Masks are collapsed to a single channel by taking
    /// the per-pixel maximum across channels; downstream consumers diff
    /// against exactly that reduction.
    pub fn image(
        &self,
        camera_id: &str,
        kind: ImageKind,
        frame: u32,
    ) -> Result<Option<DynamicImage>> {
        let camera = self.parse_camera(camera_id)?;
        if !self.index.camera_group.contains(&camera) {
            debug!(camera = %camera, "camera has no entries in the camera group");
            return Ok(None);
        }
        let key = EntryKey::Image {
            camera,
            kind,
            frame,
        };
        let Some(record) = self.entry(&key) else {
            debug!(camera = %camera, kind = %kind, frame, "frame not present");
            return Ok(None);
        };
        self.decode_image(record, kind).map(Some)
    }

    /// Decode a batch of image entries
    ///
    /// `FrameSelection::All` yields every present frame in ascending order;
    /// an explicit list is returned in input order and a missing frame inside
    /// it is a hard [`ArchiveError::NotFound`]; batch access never silently
    /// skips.
    pub fn images(
        &self,
        camera_id: &str,
        kind: ImageKind,
        selection: FrameSelection,
    ) -> Result<Vec<DynamicImage>> {
        let camera = self.parse_camera(camera_id)?;
        if !self.index.camera_group.contains(&camera) {
            return Err(ArchiveError::NotFound(format!(
                "camera {} has no entries in the camera group",
                camera
            )));
        }

        let frames = match selection {
            FrameSelection::All => self.frames_for(camera, kind),
            FrameSelection::Frames(frames) => frames,
        };

        let mut images = Vec::with_capacity(frames.len());
        for frame in frames {
            let key = EntryKey::Image {
                camera,
                kind,
                frame,
            };
            let record = self.entry(&key).ok_or_else(|| {
                ArchiveError::NotFound(format!(
                    "frame {} missing for camera {} ({})",
                    frame, camera, kind
                ))
            })?;
            images.push(self.decode_image(record, kind)?);
        }
        Ok(images)
    }

    /// Present frame ids for one (camera, kind), ascending
    pub fn frames_for(&self, camera: CameraId, kind: ImageKind) -> Vec<u32> {
        let start = EntryKey::Image {
            camera,
            kind,
            frame: 0,
        };
        let end = EntryKey::Image {
            camera,
            kind,
            frame: u32::MAX,
        };
        self.index
            .entries
            .range(start..=end)
            .filter_map(|(key, _)| match key {
                EntryKey::Image { frame, .. } => Some(*frame),
                _ => None,
            })
            .collect()
    }

    fn decode_image(&self, record: &EntryRecord, kind: ImageKind) -> Result<DynamicImage> {
        if record.encoding != PayloadEncoding::CompressedImage {
            return Err(ArchiveError::Decode(
                "entry holds a numeric payload, not compressed image bytes".to_string(),
            ));
        }
        let decoded = image::load_from_memory(self.payload(record))
            .map_err(|e| ArchiveError::Decode(e.to_string()))?;
        Ok(match kind {
            ImageKind::Color => DynamicImage::ImageRgb8(decoded.to_rgb8()),
            ImageKind::Mask => DynamicImage::ImageLuma8(collapse_mask(&decoded.to_rgb8())),
        })
    }

    // -----------------------------------------------------------------------
    // Keypoints
    // -----------------------------------------------------------------------

    /// 2D landmarks detected in one camera view
    ///
    /// Valid only for the landmark camera range; `Ok(None)` covers the two
    /// expected absences: the detector produced nothing for this camera, or
    /// nothing for this frame (occlusion).
    pub fn keypoints2d(&self, camera_id: &str, frame: u32) -> Result<Option<Landmarks2d>> {
        let camera = self.parse_camera(camera_id)?;
        if !LANDMARK_CAMERAS.contains(&camera.index()) {
            return Err(ArchiveError::InvalidRequest(format!(
                "camera {} is outside the landmark detector range {:02}-{:02}",
                camera,
                LANDMARK_CAMERAS.start(),
                LANDMARK_CAMERAS.end()
            )));
        }
        self.check_frame_bound(frame)?;

        if !self.has_keypoints2d(camera) {
            debug!(camera = %camera, "no 2d landmark results for camera");
            return Ok(None);
        }
        let Some(record) = self.entry(&EntryKey::Keypoints2d { camera, frame }) else {
            debug!(camera = %camera, frame, "no 2d landmark result for frame");
            return Ok(None);
        };
        self.raw_payload(record).map(Some)
    }

    /// Whether any 2D landmark entry exists for this camera
    pub fn has_keypoints2d(&self, camera: CameraId) -> bool {
        let start = EntryKey::Keypoints2d { camera, frame: 0 };
        let end = EntryKey::Keypoints2d {
            camera,
            frame: u32::MAX,
        };
        self.index.entries.range(start..=end).next().is_some()
    }

    /// Triangulated 3D landmarks for one frame
    pub fn keypoints3d(&self, frame: u32) -> Result<Option<Landmarks3d>> {
        self.check_frame_bound(frame)?;
        let Some(record) = self.entry(&EntryKey::Keypoints3d { frame }) else {
            debug!(frame, "no 3d landmark result for frame");
            return Ok(None);
        };
        self.raw_payload(record).map(Some)
    }

    // -----------------------------------------------------------------------
    // Expression-gated modalities
    // -----------------------------------------------------------------------

    /// Parametric model state for one frame; expression performances only
    pub fn model_frame(&self, frame: u32) -> Result<Option<ModelFrame>> {
        if !self.capabilities().expression {
            debug!(
                performance_part = %self.index.meta.performance_part,
                "no model data in this performance part"
            );
            return Ok(None);
        }
        self.check_frame_bound(frame)?;
        let Some(record) = self.entry(&EntryKey::ModelFrame { frame }) else {
            debug!(frame, "no model parameters for frame");
            return Ok(None);
        };
        self.raw_payload(record).map(Some)
    }

    /// UV texture map for one frame; expression performances only
    pub fn uv_texture(&self, frame: u32) -> Result<Option<DynamicImage>> {
        if !self.capabilities().expression {
            debug!(
                performance_part = %self.index.meta.performance_part,
                "no uv data in this performance part"
            );
            return Ok(None);
        }
        let Some(record) = self.entry(&EntryKey::UvTexture { frame }) else {
            debug!(frame, "no uv texture for frame");
            return Ok(None);
        };
        self.decode_image(record, ImageKind::Color).map(Some)
    }

    /// High-resolution scan mesh; expression performances only
    pub fn scan_mesh(&self) -> Result<Option<ScanMesh>> {
        if !self.capabilities().expression {
            debug!(
                performance_part = %self.index.meta.performance_part,
                "no scan mesh in this performance part"
            );
            return Ok(None);
        }
        let Some(record) = self.entry(&EntryKey::ScanMesh) else {
            debug!("no scan mesh entry");
            return Ok(None);
        };
        self.raw_payload(record).map(Some)
    }

    /// Scan segmentation mask for one camera view; expression performances
    /// only. Collapsed to a single channel like regular masks.
    pub fn scan_mask(&self, camera_id: &str) -> Result<Option<DynamicImage>> {
        if !self.capabilities().expression {
            debug!(
                performance_part = %self.index.meta.performance_part,
                "no scan masks in this performance part"
            );
            return Ok(None);
        }
        let camera = self.parse_camera(camera_id)?;
        let Some(record) = self.entry(&EntryKey::ScanMask { camera }) else {
            debug!(camera = %camera, "no scan mask for camera");
            return Ok(None);
        };
        self.decode_image(record, ImageKind::Mask).map(Some)
    }

    // -----------------------------------------------------------------------
    // Audio
    // -----------------------------------------------------------------------

    /// Synchronized audio; speech performances only
    pub fn audio(&self) -> Result<Option<AudioClip>> {
        if !self.capabilities().speech {
            debug!(
                performance_part = %self.index.meta.performance_part,
                "no audio data in this performance part"
            );
            return Ok(None);
        }
        let Some(record) = self.entry(&EntryKey::Audio) else {
            debug!("no audio entry");
            return Ok(None);
        };
        self.raw_payload(record).map(Some)
    }
}

/// Collapse a multi-channel mask decode to one channel
///
/// Takes the per-pixel maximum across channels. Extraction output and the
/// mask accessors must agree on this exact reduction.
pub fn collapse_mask(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        out.put_pixel(x, y, Luma([r.max(g).max(b)]));
    }
    out
}

/// Structural checks beyond what deserialization enforces
fn validate_index(index: &ArchiveIndex, payload_len: usize) -> Result<()> {
    let meta = &index.meta;
    if meta.subject.is_empty() {
        return Err(ArchiveError::Format("missing subject id".to_string()));
    }
    if meta.performance_part.is_empty() {
        return Err(ArchiveError::Format(
            "missing performance part".to_string(),
        ));
    }
    if meta.capture_date.is_empty() {
        return Err(ArchiveError::Format("missing capture date".to_string()));
    }
    if meta.camera.num_device == 0 {
        return Err(ArchiveError::Format(
            "camera rig declares zero devices".to_string(),
        ));
    }
    if meta.camera.resolution[0] == 0 || meta.camera.resolution[1] == 0 {
        return Err(ArchiveError::Format(
            "camera rig declares a zero resolution".to_string(),
        ));
    }
    for (key, record) in &index.entries {
        let end = record.offset.checked_add(record.len);
        if end.is_none() || end.unwrap_or(u64::MAX) > payload_len as u64 {
            return Err(ArchiveError::Format(format!(
                "entry {:?} points outside the payload region",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_mask_takes_channel_max() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, image::Rgb([10, 200, 30]));
        rgb.put_pixel(1, 0, image::Rgb([0, 0, 0]));

        let gray = collapse_mask(&rgb);
        assert_eq!(gray.get_pixel(0, 0).0, [200]);
        assert_eq!(gray.get_pixel(1, 0).0, [0]);
    }
}
