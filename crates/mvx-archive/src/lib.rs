//! MVX Archive Library
//!
//! Reader for `.mvc` capture containers: one immutable file per
//! (subject, performance, variant) holding every modality recorded for that
//! take behind a hierarchical keyed index.
//!
//! The reader exposes typed, validated accessors per modality. Every accessor
//! distinguishes three outcomes:
//!
//! - a structurally invalid request (malformed camera id, out-of-range frame)
//!   is a hard error,
//! - a valid request for data that was never captured resolves to `None`,
//! - a successful lookup decodes the payload on demand.
//!
//! Callers iterating cameras and frames treat `None` as "skip and continue";
//! only malformed requests and corrupt payloads surface as errors.
//!
//! # Example
//!
//! ```no_run
//! use mvx_archive::{Archive, ImageKind};
//!
//! fn first_frame(path: &str) -> mvx_archive::Result<()> {
//!     let archive = Archive::open(path)?;
//!     if let Some(image) = archive.image("25", ImageKind::Color, 0)? {
//!         println!("decoded {}x{}", image.width(), image.height());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::{ArchiveError, Result};
pub use format::{
    ActorInfo, ArchiveIndex, ArchiveMeta, AudioClip, CameraCalibration, CameraInfo, EntryKey,
    EntryRecord, ImageKind, Landmarks2d, Landmarks3d, ModelFrame, PayloadEncoding, ScanMesh,
    LANDMARK_CAMERAS, MAGIC,
};
pub use reader::{collapse_mask, Archive, FrameSelection};
pub use writer::ArchiveWriter;
