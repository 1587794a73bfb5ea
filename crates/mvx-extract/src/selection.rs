//! Resolved extraction selection
//!
//! Configuration names cameras and modalities loosely (`all`, id lists,
//! modality strings); [`Selection`] is the validated form the extractors
//! consume. Frame strides bound the output volume of the dense per-frame
//! modalities and come from configuration, not from the extractors.

use crate::config::{CameraSelectionConfig, ExtractionConfig};
use crate::error::{ExtractError, Result};
use crate::modality::Modality;
use mvx_common::CameraId;

/// Which cameras a run extracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSelection {
    /// Every camera the archive declares
    All,
    /// An explicit id list; ids absent from the archive are skipped at
    /// extraction time, not rejected here
    Ids(Vec<CameraId>),
}

/// Validated selection parameters for one run
#[derive(Debug, Clone)]
pub struct Selection {
    pub cameras: CameraSelection,
    pub modalities: Vec<Modality>,
    /// Frame stride for 2D/3D keypoint sampling
    pub keypoint_stride: u32,
    /// Frame stride for parametric model frames
    pub model_stride: u32,
    /// Frame stride for UV textures
    pub uv_stride: u32,
}

impl Selection {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let cameras = match &config.cameras {
            CameraSelectionConfig::Keyword(word) if word == "all" => CameraSelection::All,
            CameraSelectionConfig::Keyword(word) => {
                return Err(ExtractError::Config(format!(
                    "camera selection '{}' is not recognized; use 'all' or a list of ids",
                    word
                )))
            }
            CameraSelectionConfig::Ids(ids) => {
                let mut cameras = Vec::with_capacity(ids.len());
                for id in ids {
                    let camera = CameraId::new(*id).ok_or_else(|| {
                        ExtractError::Config(format!("camera id {} is out of range (0-99)", id))
                    })?;
                    cameras.push(camera);
                }
                CameraSelection::Ids(cameras)
            }
        };

        for (name, stride) in [
            ("keypoint_stride", config.keypoint_stride),
            ("model_stride", config.model_stride),
            ("uv_stride", config.uv_stride),
        ] {
            if stride == 0 {
                return Err(ExtractError::Config(format!("{} must be at least 1", name)));
            }
        }

        Ok(Self {
            cameras,
            modalities: config.modalities.clone(),
            keypoint_stride: config.keypoint_stride,
            model_stride: config.model_stride,
            uv_stride: config.uv_stride,
        })
    }

    /// Concrete camera list for an archive declaring `num_device` cameras
    pub fn resolve_cameras(&self, num_device: u32) -> Vec<CameraId> {
        match &self.cameras {
            CameraSelection::All => (0..num_device)
                .filter_map(|index| u8::try_from(index).ok().and_then(CameraId::new))
                .collect(),
            CameraSelection::Ids(ids) => ids.clone(),
        }
    }

    pub fn wants(&self, modality: Modality) -> bool {
        self.modalities.contains(&modality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;

    fn base_config() -> ExtractionConfig {
        ExtractionConfig {
            subjects: vec!["0026".to_string()],
            performances: vec!["s1_all".to_string()],
            cameras: CameraSelectionConfig::Keyword("all".to_string()),
            modalities: vec![Modality::Images, Modality::Calibration],
            keypoint_stride: 10,
            model_stride: 5,
            uv_stride: 30,
        }
    }

    #[test]
    fn test_all_cameras_resolution() {
        let selection = Selection::from_config(&base_config()).unwrap();
        let cameras = selection.resolve_cameras(3);
        assert_eq!(cameras.len(), 3);
        assert_eq!(cameras[2].to_string(), "02");
    }

    #[test]
    fn test_explicit_ids_pass_through() {
        let mut config = base_config();
        config.cameras = CameraSelectionConfig::Ids(vec![0, 6, 12]);
        let selection = Selection::from_config(&config).unwrap();
        // The list is kept as requested even when the archive has fewer
        // cameras; presence is resolved against the camera group later.
        let cameras = selection.resolve_cameras(2);
        assert_eq!(cameras.len(), 3);
    }

    #[test]
    fn test_bad_keyword_rejected() {
        let mut config = base_config();
        config.cameras = CameraSelectionConfig::Keyword("everything".to_string());
        assert!(matches!(
            Selection::from_config(&config),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let mut config = base_config();
        config.keypoint_stride = 0;
        assert!(matches!(
            Selection::from_config(&config),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_wants() {
        let selection = Selection::from_config(&base_config()).unwrap();
        assert!(selection.wants(Modality::Images));
        assert!(!selection.wants(Modality::Audio));
    }
}
