//! MVX Extract Library
//!
//! Everything between a remote archive store and a finished output tree:
//!
//! - **Transfer**: fetches archives through the configured external copy
//!   command, with bounded retries
//! - **Extractors**: per-modality strategies that materialize files under
//!   `from_anno/` and `from_raw/` subtrees, resumable at file granularity
//! - **Orchestrator**: the per-(subject, performance) state machine,
//!   sequential by design so that a partially written camera's missing
//!   frames are exactly those still to do
//! - **Manifest**: durable SQLite ledger consulted before starting a task
//!   and updated after every transition
//! - **Storage guard**: free-space floor checked once per subject

pub mod config;
pub mod error;
pub mod extractors;
pub mod manifest;
pub mod modality;
pub mod orchestrator;
pub mod ply;
pub mod progress;
pub mod selection;
pub mod storage;
pub mod transfer;
pub mod wav;

pub use config::PipelineConfig;
pub use error::{ExtractError, Result};
pub use extractors::{extract_performance, ExtractionOutcome, ModalityReport, COMPLETE_MARKER};
pub use manifest::{ManifestStore, TaskRecord, TaskStatus};
pub use modality::Modality;
pub use orchestrator::{Orchestrator, RunSummary, TaskOutcome};
pub use selection::{CameraSelection, Selection};
pub use storage::StorageGuard;
pub use transfer::{FetchedArchive, Transfer, TransferConfig};
