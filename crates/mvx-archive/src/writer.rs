//! Container builder
//!
//! Assembles a valid `.mvc` file from in-memory parts. The extraction
//! pipeline itself never writes containers; this exists for synthetic capture
//! fixtures in tests and for small demo archives. Entries are staged in
//! memory and laid out in key order on [`ArchiveWriter::write_to`].

use crate::error::Result;
use crate::format::{
    encode_payload, ArchiveIndex, ArchiveMeta, AudioClip, CameraCalibration, EntryKey,
    EntryRecord, ImageKind, Landmarks2d, Landmarks3d, ModelFrame, PayloadEncoding, ScanMesh,
    MAGIC,
};
use mvx_common::CameraId;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

/// Builder for one container file
pub struct ArchiveWriter {
    meta: ArchiveMeta,
    camera_group: BTreeSet<CameraId>,
    entries: BTreeMap<EntryKey, (PayloadEncoding, Vec<u8>)>,
}

impl ArchiveWriter {
    pub fn new(meta: ArchiveMeta) -> Self {
        Self {
            meta,
            camera_group: BTreeSet::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Mark a camera as having captured this performance
    ///
    /// Image accessors resolve against this membership, so cameras that only
    /// appear in calibration must not be added here.
    pub fn add_camera(&mut self, camera: CameraId) {
        self.camera_group.insert(camera);
    }

    pub fn put_calibration(&mut self, camera: CameraId, calib: &CameraCalibration) -> Result<()> {
        let bytes = encode_payload(calib)?;
        self.put_entry(EntryKey::Calibration { camera }, PayloadEncoding::Raw, bytes);
        Ok(())
    }

    /// Store compressed image bytes (JPEG/PNG) for one (camera, kind, frame)
    pub fn put_image(&mut self, camera: CameraId, kind: ImageKind, frame: u32, bytes: Vec<u8>) {
        self.put_entry(
            EntryKey::Image {
                camera,
                kind,
                frame,
            },
            PayloadEncoding::CompressedImage,
            bytes,
        );
    }

    pub fn put_keypoints2d(
        &mut self,
        camera: CameraId,
        frame: u32,
        landmarks: &Landmarks2d,
    ) -> Result<()> {
        let bytes = encode_payload(landmarks)?;
        self.put_entry(
            EntryKey::Keypoints2d { camera, frame },
            PayloadEncoding::Raw,
            bytes,
        );
        Ok(())
    }

    pub fn put_keypoints3d(&mut self, frame: u32, landmarks: &Landmarks3d) -> Result<()> {
        let bytes = encode_payload(landmarks)?;
        self.put_entry(EntryKey::Keypoints3d { frame }, PayloadEncoding::Raw, bytes);
        Ok(())
    }

    pub fn put_model_frame(&mut self, frame: u32, model: &ModelFrame) -> Result<()> {
        let bytes = encode_payload(model)?;
        self.put_entry(EntryKey::ModelFrame { frame }, PayloadEncoding::Raw, bytes);
        Ok(())
    }

    pub fn put_uv_texture(&mut self, frame: u32, bytes: Vec<u8>) {
        self.put_entry(
            EntryKey::UvTexture { frame },
            PayloadEncoding::CompressedImage,
            bytes,
        );
    }

    pub fn put_scan_mesh(&mut self, mesh: &ScanMesh) -> Result<()> {
        let bytes = encode_payload(mesh)?;
        self.put_entry(EntryKey::ScanMesh, PayloadEncoding::Raw, bytes);
        Ok(())
    }

    pub fn put_scan_mask(&mut self, camera: CameraId, bytes: Vec<u8>) {
        self.put_entry(
            EntryKey::ScanMask { camera },
            PayloadEncoding::CompressedImage,
            bytes,
        );
    }

    pub fn put_audio(&mut self, clip: &AudioClip) -> Result<()> {
        let bytes = encode_payload(clip)?;
        self.put_entry(EntryKey::Audio, PayloadEncoding::Raw, bytes);
        Ok(())
    }

    /// Stage an arbitrary entry; tests use this to plant corrupt payloads
    pub fn put_entry(&mut self, key: EntryKey, encoding: PayloadEncoding, bytes: Vec<u8>) {
        self.entries.insert(key, (encoding, bytes));
    }

    /// Lay out and write the container
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut records = BTreeMap::new();
        let mut payload: Vec<u8> = Vec::new();

        for (key, (encoding, bytes)) in &self.entries {
            records.insert(
                *key,
                EntryRecord {
                    offset: payload.len() as u64,
                    len: bytes.len() as u64,
                    encoding: *encoding,
                },
            );
            payload.extend_from_slice(bytes);
        }

        let index = ArchiveIndex {
            meta: self.meta.clone(),
            camera_group: self.camera_group.clone(),
            entries: records,
        };
        let index_bytes = encode_payload(&index)?;

        let file = std::fs::File::create(path)?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(&MAGIC)?;
        out.write_all(&(index_bytes.len() as u64).to_le_bytes())?;
        out.write_all(&index_bytes)?;
        out.write_all(&payload)?;
        out.flush()?;
        Ok(())
    }
}
