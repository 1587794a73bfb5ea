//! MVX Common Library
//!
//! Shared foundation for the MVX workspace members:
//!
//! - **Identifiers**: subject, performance, camera and variant types with the
//!   validation rules the capture naming convention imposes
//! - **Error Handling**: shared error type for foundation-level failures
//! - **Logging**: tracing subscriber setup (console, rotating file, or both)
//! - **Checksums**: streaming sha256 digests for downloaded archives
//! - **Byte formatting**: human-readable sizes for logs and reports

pub mod bytes;
pub mod checksum;
pub mod error;
pub mod ids;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use ids::{Capabilities, CameraId, PerformanceId, SubjectId, Variant};
