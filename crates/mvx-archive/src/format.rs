//! On-disk model of the `.mvc` container
//!
//! Layout: an 8-byte magic, a little-endian u64 giving the index length, the
//! bincode-encoded [`ArchiveIndex`], then the payload region. The index maps
//! hierarchical [`EntryKey`]s to `(offset, len, encoding)` records relative to
//! the payload region, so a reader can slice any entry without touching the
//! rest of the file.
//!
//! Numeric payloads (calibration matrices, landmarks, model parameters, audio
//! samples, scan geometry) are bincode-serialized. Imagery (color frames,
//! masks, UV textures, scan masks) is stored as the original compressed
//! JPEG/PNG bytes and decoded on demand.

use crate::error::{ArchiveError, Result};
use mvx_common::CameraId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

/// Magic bytes opening every `.mvc` container
pub const MAGIC: [u8; 8] = *b"MVCAPT01";

/// Cameras equipped with landmark detectors
///
/// Only this contiguous id range produces 2D keypoint entries; requests
/// outside it are malformed rather than merely empty.
pub const LANDMARK_CAMERAS: RangeInclusive<u8> = 18..=32;

/// Top-level archive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMeta {
    /// Subject (actor) id this archive belongs to
    pub subject: String,
    /// Performance name, e.g. `s1_all`; the leading segment encodes the
    /// performance type
    pub performance_part: String,
    /// Capture session date, e.g. `2023-04-12`
    pub capture_date: String,
    pub actor: ActorInfo,
    pub camera: CameraInfo,
}

/// Actor metadata recorded at capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub age: u32,
    pub color: String,
    pub gender: String,
    pub height_cm: f32,
    pub weight_kg: f32,
}

/// Camera rig metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Total cameras in the rig
    pub num_device: u32,
    /// Frames in the sequence; frame ids are dense in `0..num_frame` but
    /// presence of any given frame is not guaranteed
    pub num_frame: u32,
    /// Per-camera resolution as `[height, width]`
    pub resolution: [u32; 2],
}

/// Image entry flavor
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ImageKind {
    Color,
    Mask,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Color => f.write_str("color"),
            ImageKind::Mask => f.write_str("mask"),
        }
    }
}

/// Hierarchical address of one entry inside the container
///
/// The derived ordering groups entries by modality, then camera, then frame,
/// which lets the reader range-scan all frames of one (camera, kind) pair
/// directly on the index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EntryKey {
    Calibration { camera: CameraId },
    Image { camera: CameraId, kind: ImageKind, frame: u32 },
    Keypoints2d { camera: CameraId, frame: u32 },
    Keypoints3d { frame: u32 },
    ModelFrame { frame: u32 },
    UvTexture { frame: u32 },
    ScanMesh,
    ScanMask { camera: CameraId },
    Audio,
}

impl EntryKey {
    /// Modality group name, as shown by `mvx inspect`
    pub fn group(&self) -> &'static str {
        match self {
            EntryKey::Calibration { .. } => "calibration",
            EntryKey::Image {
                kind: ImageKind::Color,
                ..
            } => "images",
            EntryKey::Image {
                kind: ImageKind::Mask,
                ..
            } => "masks",
            EntryKey::Keypoints2d { .. } => "keypoints2d",
            EntryKey::Keypoints3d { .. } => "keypoints3d",
            EntryKey::ModelFrame { .. } => "model",
            EntryKey::UvTexture { .. } => "uv_textures",
            EntryKey::ScanMesh => "scan",
            EntryKey::ScanMask { .. } => "scan_masks",
            EntryKey::Audio => "audio",
        }
    }
}

/// How an entry's payload bytes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadEncoding {
    /// Bincode-serialized numeric payload, decoded straight into its type
    Raw,
    /// Compressed JPEG/PNG bytes handed to the image decoder
    CompressedImage,
}

/// Location of one entry's payload inside the payload region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub offset: u64,
    pub len: u64,
    pub encoding: PayloadEncoding,
}

/// The container index: metadata plus the full entry table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub meta: ArchiveMeta,
    /// Cameras that actually captured this performance. A camera listed in
    /// the rig but absent here produced no entries of any kind.
    pub camera_group: BTreeSet<CameraId>,
    pub entries: BTreeMap<EntryKey, EntryRecord>,
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// Per-camera calibration: distortion, intrinsics, extrinsic pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Lens distortion coefficients `[k1, k2, p1, p2, k3]`
    pub d: Vec<f64>,
    /// 3x3 intrinsic matrix
    pub k: [[f64; 3]; 3],
    /// 4x4 extrinsic pose matrix
    pub rt: [[f64; 4]; 4],
}

/// 2D facial landmarks for one frame, `(x, y)` per point
pub type Landmarks2d = Vec<[f32; 2]>;

/// Triangulated 3D landmarks for one frame, `(x, y, z)` per point
pub type Landmarks3d = Vec<[f32; 3]>;

/// Parametric face model state for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFrame {
    pub global_pose: [f32; 3],
    pub neck_pose: [f32; 3],
    pub jaw_pose: [f32; 3],
    pub left_eye_pose: [f32; 3],
    pub right_eye_pose: [f32; 3],
    pub translation: [f32; 3],
    /// Identity/shape parameters
    pub shape: Vec<f32>,
    /// Expression parameters
    pub expression: Vec<f32>,
    /// Posed mesh vertices
    pub vertices: Vec<[f32; 3]>,
    /// Flattened albedo texture planes
    pub albedo: Vec<f32>,
}

/// High-resolution scan mesh from the dense reconstruction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMesh {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

/// Synchronized audio for speech performances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub sample_rate: u32,
    /// Mono samples normalized to `[-1.0, 1.0]`
    pub samples: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Payload codec
// ---------------------------------------------------------------------------

fn codec_config() -> impl bincode::config::Config {
    bincode::config::standard()
}

/// Serialize a numeric payload or index structure
pub(crate) fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, codec_config())
        .map_err(|e| ArchiveError::Encode(e.to_string()))
}

/// Deserialize a payload, rejecting trailing bytes
pub(crate) fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, read) = bincode::serde::decode_from_slice::<T, _>(bytes, codec_config())
        .map_err(|e| ArchiveError::Decode(e.to_string()))?;
    if read != bytes.len() {
        return Err(ArchiveError::Decode(format!(
            "payload has {} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(value)
}
