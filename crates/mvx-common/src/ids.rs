//! Identifier types for capture units
//!
//! A capture unit is addressed as (subject, performance, variant). Camera ids
//! are zero-padded two-digit strings throughout the archive format and the
//! output tree; the types here own those invariants so the rest of the
//! workspace never re-validates them.

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn valid_id_chars(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Subject (actor) identifier, e.g. `0026`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SubjectId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        if valid_id_chars(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CommonError::InvalidId(format!(
                "subject id '{}' must be non-empty and contain only [A-Za-z0-9_-]",
                s
            )))
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Performance identifier, e.g. `s1_all` or `e0`
///
/// The leading `_`-separated segment encodes the performance type: a segment
/// containing `e` marks an expression take (parametric model, UV textures and
/// scan data present), a segment containing `s` marks a speech take (audio
/// present).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PerformanceId(String);

impl PerformanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The performance-type segment (everything before the first `_`)
    pub fn part(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_part(self.part())
    }
}

impl FromStr for PerformanceId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        if valid_id_chars(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CommonError::InvalidId(format!(
                "performance id '{}' must be non-empty and contain only [A-Za-z0-9_-]",
                s
            )))
        }
    }
}

impl fmt::Display for PerformanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which modality families a performance type carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Parametric model frames, UV textures, scan mesh and scan masks
    pub expression: bool,
    /// Synchronized audio
    pub speech: bool,
}

impl Capabilities {
    /// Derive capabilities from a performance-type segment such as `e0` or `s1`
    pub fn from_part(part: &str) -> Self {
        Self {
            expression: part.contains('e'),
            speech: part.contains('s'),
        }
    }
}

/// Camera identifier, rendered as a zero-padded two-digit string (`00`-`99`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CameraId(u8);

impl CameraId {
    pub const MAX: u8 = 99;

    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX).then_some(Self(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }
}

impl FromStr for CameraId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        // The archive keys cameras as exactly two decimal digits.
        if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
            let index: u8 = s
                .parse()
                .map_err(|_| CommonError::InvalidId(format!("camera id '{}' out of range", s)))?;
            Ok(Self(index))
        } else {
            Err(CommonError::InvalidId(format!(
                "camera id '{}' must be a zero-padded two-digit string (e.g. '07')",
                s
            )))
        }
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Archive source variant for a performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Annotation archive: derived data plus downsampled imagery
    Anno,
    /// Raw archive: full-resolution capture imagery
    Raw,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Anno, Variant::Raw];

    /// Output subtree name for extraction passes from this variant
    pub fn output_subdir(&self) -> &'static str {
        match self {
            Variant::Anno => "from_anno",
            Variant::Raw => "from_raw",
        }
    }
}

impl FromStr for Variant {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "anno" => Ok(Variant::Anno),
            "raw" => Ok(Variant::Raw),
            _ => Err(CommonError::InvalidId(format!(
                "variant '{}' must be 'anno' or 'raw'",
                s
            ))),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Anno => f.write_str("anno"),
            Variant::Raw => f.write_str("raw"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_parsing() {
        assert!("0026".parse::<SubjectId>().is_ok());
        assert!("actor_01".parse::<SubjectId>().is_ok());
        assert!("".parse::<SubjectId>().is_err());
        assert!("a/b".parse::<SubjectId>().is_err());
        assert!("a b".parse::<SubjectId>().is_err());
    }

    #[test]
    fn test_performance_part() {
        let p: PerformanceId = "s1_all".parse().unwrap();
        assert_eq!(p.part(), "s1");
        let p: PerformanceId = "e0".parse().unwrap();
        assert_eq!(p.part(), "e0");
    }

    #[test]
    fn test_capabilities_from_part() {
        let speech = Capabilities::from_part("s1");
        assert!(speech.speech);
        assert!(!speech.expression);

        let expression = Capabilities::from_part("e0");
        assert!(expression.expression);
        assert!(!expression.speech);

        let neither = Capabilities::from_part("h0");
        assert!(!neither.expression);
        assert!(!neither.speech);
    }

    #[test]
    fn test_camera_id_format() {
        let cam: CameraId = "07".parse().unwrap();
        assert_eq!(cam.index(), 7);
        assert_eq!(cam.to_string(), "07");

        // Only the exact two-digit form is accepted.
        assert!("7".parse::<CameraId>().is_err());
        assert!("007".parse::<CameraId>().is_err());
        assert!("ab".parse::<CameraId>().is_err());
        assert!("".parse::<CameraId>().is_err());
    }

    #[test]
    fn test_variant_roundtrip() {
        assert_eq!("anno".parse::<Variant>().unwrap(), Variant::Anno);
        assert_eq!("raw".parse::<Variant>().unwrap(), Variant::Raw);
        assert_eq!(Variant::Anno.to_string(), "anno");
        assert_eq!(Variant::Raw.output_subdir(), "from_raw");
        assert!("other".parse::<Variant>().is_err());
    }
}
