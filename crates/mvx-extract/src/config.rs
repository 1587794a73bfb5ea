//! Run configuration
//!
//! One YAML file declares everything a run needs: which (subject,
//! performance) units to process, which cameras and modalities to extract,
//! where temp/output/manifest/log live, the transfer command, and the
//! processing policy. Validation failures here are the only globally fatal
//! errors in the pipeline.

use crate::error::{ExtractError, Result};
use crate::modality::Modality;
use crate::transfer::TransferConfig;
use mvx_common::{PerformanceId, SubjectId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level run configuration, deserialized from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub extraction: ExtractionConfig,
    pub storage: StorageConfig,
    pub transfer: TransferConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

/// What to extract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Subject ids to process, in order
    pub subjects: Vec<String>,

    /// Performances per subject, in order
    pub performances: Vec<String>,

    /// `all` or an explicit camera id list
    #[serde(default)]
    pub cameras: CameraSelectionConfig,

    /// Modalities to extract; defaults to everything
    #[serde(default = "default_modalities")]
    pub modalities: Vec<Modality>,

    /// Frame stride for keypoint sampling
    #[serde(default = "default_keypoint_stride")]
    pub keypoint_stride: u32,

    /// Frame stride for parametric model frames
    #[serde(default = "default_model_stride")]
    pub model_stride: u32,

    /// Frame stride for UV textures
    #[serde(default = "default_uv_stride")]
    pub uv_stride: u32,
}

/// Camera selection as written in YAML: the string `all` or an id list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraSelectionConfig {
    Keyword(String),
    Ids(Vec<u8>),
}

impl Default for CameraSelectionConfig {
    fn default() -> Self {
        CameraSelectionConfig::Keyword("all".to_string())
    }
}

/// Local filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where downloaded archives land before extraction
    pub temp_dir: PathBuf,

    /// Root of the output tree: `{output_dir}/{subject}/{performance}/...`
    pub output_dir: PathBuf,

    /// SQLite manifest ledger
    pub manifest_path: PathBuf,

    /// Directory for rotated log files
    pub log_dir: PathBuf,
}

/// Processing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Delete local archive copies after a task completes
    #[serde(default = "default_true")]
    pub delete_after_extract: bool,

    /// Ignore completion markers and manifest rows, re-running every task
    #[serde(default)]
    pub force_reextract: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            delete_after_extract: true,
            force_reextract: false,
        }
    }
}

/// Resource floors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Minimum free space required before starting a subject
    #[serde(default = "default_min_free_space_gb")]
    pub min_free_space_gb: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_free_space_gb: default_min_free_space_gb(),
        }
    }
}

fn default_modalities() -> Vec<Modality> {
    Modality::ALL.to_vec()
}

fn default_keypoint_stride() -> u32 {
    10
}

fn default_model_stride() -> u32 {
    5
}

fn default_uv_stride() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_min_free_space_gb() -> f64 {
    50.0
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content).map_err(|e| {
            ExtractError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration; must pass before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.extraction.subjects.is_empty() {
            return Err(ExtractError::Config(
                "extraction.subjects must not be empty".to_string(),
            ));
        }
        if self.extraction.performances.is_empty() {
            return Err(ExtractError::Config(
                "extraction.performances must not be empty".to_string(),
            ));
        }
        if self.extraction.modalities.is_empty() {
            return Err(ExtractError::Config(
                "extraction.modalities must not be empty".to_string(),
            ));
        }
        self.subjects()?;
        self.performances()?;
        // Camera and stride validation shares the Selection path.
        crate::selection::Selection::from_config(&self.extraction)?;
        self.transfer.validate()?;
        if self.limits.min_free_space_gb < 0.0 {
            return Err(ExtractError::Config(
                "limits.min_free_space_gb must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed subject ids, in configured order
    pub fn subjects(&self) -> Result<Vec<SubjectId>> {
        self.extraction
            .subjects
            .iter()
            .map(|s| {
                s.parse::<SubjectId>()
                    .map_err(|e| ExtractError::Config(e.to_string()))
            })
            .collect()
    }

    /// Parsed performance ids, in configured order
    pub fn performances(&self) -> Result<Vec<PerformanceId>> {
        self.extraction
            .performances
            .iter()
            .map(|p| {
                p.parse::<PerformanceId>()
                    .map_err(|e| ExtractError::Config(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
extraction:
  subjects: ["0026", "0041"]
  performances: ["s1_all", "e0"]
  cameras: [0, 6, 12]
  modalities: [metadata, calibration, images, masks]
  keypoint_stride: 10
storage:
  temp_dir: /data/tmp
  output_dir: /data/out
  manifest_path: /data/manifest.db
  log_dir: /data/logs
transfer:
  remote_root: "remote:captures"
processing:
  delete_after_extract: false
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: PipelineConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.subjects().unwrap().len(), 2);
        assert_eq!(config.extraction.modalities.len(), 4);
        assert!(matches!(
            config.extraction.cameras,
            CameraSelectionConfig::Ids(ref ids) if ids == &[0, 6, 12]
        ));
        // Defaults fill unset fields.
        assert_eq!(config.extraction.model_stride, 5);
        assert!(!config.processing.delete_after_extract);
        assert!(!config.processing.force_reextract);
        assert_eq!(config.limits.min_free_space_gb, 50.0);
        assert_eq!(config.transfer.max_retries, 3);
    }

    #[test]
    fn test_empty_subjects_rejected() {
        let mut config: PipelineConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.extraction.subjects.clear();
        assert!(matches!(
            config.validate(),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_modality_fails_at_parse() {
        let broken = SAMPLE.replace("masks", "holograms");
        let parsed: std::result::Result<PipelineConfig, _> = serde_yaml::from_str(&broken);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bad_subject_id_rejected() {
        let mut config: PipelineConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.extraction.subjects = vec!["a/b".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ExtractError::Config(_))
        ));
    }
}
