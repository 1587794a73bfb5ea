//! Modality enumeration and extractor dispatch
//!
//! Every extractable modality is a typed enum variant with a fixed extractor
//! function behind it. Configuration names map through `FromStr`/serde; the
//! dispatch table replaces any string-keyed branching at extraction time.

use crate::error::{ExtractError, Result};
use crate::extractors::{self, ExtractContext, ModalityReport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named category of captured data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Metadata,
    Calibration,
    Images,
    Masks,
    Audio,
    Keypoints2d,
    Keypoints3d,
    Flame,
    UvTextures,
    Scan,
    ScanMasks,
}

/// Extractor entry point: one modality against one task's archives
pub type ExtractorFn = fn(&ExtractContext<'_>) -> Result<ModalityReport>;

impl Modality {
    /// Canonical extraction order; metadata first so a task that fails later
    /// still leaves an identifying record behind
    pub const ALL: [Modality; 11] = [
        Modality::Metadata,
        Modality::Calibration,
        Modality::Audio,
        Modality::Images,
        Modality::Masks,
        Modality::Keypoints2d,
        Modality::Keypoints3d,
        Modality::Flame,
        Modality::UvTextures,
        Modality::Scan,
        Modality::ScanMasks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Metadata => "metadata",
            Modality::Calibration => "calibration",
            Modality::Images => "images",
            Modality::Masks => "masks",
            Modality::Audio => "audio",
            Modality::Keypoints2d => "keypoints2d",
            Modality::Keypoints3d => "keypoints3d",
            Modality::Flame => "flame",
            Modality::UvTextures => "uv_textures",
            Modality::Scan => "scan",
            Modality::ScanMasks => "scan_masks",
        }
    }

    /// The extractor implementing this modality
    pub fn extractor(&self) -> ExtractorFn {
        match self {
            Modality::Metadata => extractors::metadata::extract,
            Modality::Calibration => extractors::calibration::extract,
            Modality::Images => extractors::images::extract_images,
            Modality::Masks => extractors::images::extract_masks,
            Modality::Audio => extractors::audio::extract,
            Modality::Keypoints2d => extractors::keypoints::extract_keypoints2d,
            Modality::Keypoints3d => extractors::keypoints::extract_keypoints3d,
            Modality::Flame => extractors::model::extract,
            Modality::UvTextures => extractors::uv::extract,
            Modality::Scan => extractors::scan::extract_mesh,
            Modality::ScanMasks => extractors::scan::extract_masks,
        }
    }
}

impl FromStr for Modality {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        Modality::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| {
                ExtractError::Config(format!(
                    "unknown modality '{}' (expected one of: {})",
                    s,
                    Modality::ALL
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_covers_all_names() {
        for modality in Modality::ALL {
            assert_eq!(modality.as_str().parse::<Modality>().unwrap(), modality);
        }
        assert!("textures".parse::<Modality>().is_err());
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for modality in Modality::ALL {
            let yaml = serde_yaml::to_string(&modality).unwrap();
            assert_eq!(yaml.trim(), modality.as_str());
        }
    }
}
