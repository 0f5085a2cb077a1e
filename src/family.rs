//! Per-ECU-family profile data.
//!
//! Everything that varies between sibling controllers lives here: bank
//! thresholds, structural size limits and the hand-made anchor signatures.
//! Profiles are immutable for the duration of a run.

use serde::Serialize;

use crate::bank::BankLayout;
use crate::error::{AnalyzerError, Result};
use crate::signature::Signature;

/// Anchored singleton: where to look and how to name what is found.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnchorSpec {
    /// Signature preceding the value
    pub signature: Signature<'static>,
    /// Offset of the value from the match start
    pub value_offset: usize,
    /// Symbol name
    pub name: &'static str,
    /// Category
    pub category: &'static str,
    /// Subcategory
    pub subcategory: &'static str,
}

/// Switch located relative to an anchored singleton.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompanionSpec {
    /// Signature of the switch record
    pub signature: Signature<'static>,
    /// How far before the singleton's match to look
    pub window: usize,
    /// Offset of the switch value from the match start
    pub value_offset: usize,
    /// Name prefix; the code bank is appended
    pub name: &'static str,
    /// Category
    pub category: &'static str,
    /// Subcategory
    pub subcategory: &'static str,
}

/// Byte markers around the identification block.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IdentMarkers {
    /// Marker preceding the software number
    pub info: Signature<'static>,
    /// Controller version string
    pub version: Signature<'static>,
}

/// Immutable description of one ECU family.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyProfile {
    /// Short family name
    pub name: &'static str,
    /// Code-bank thresholds
    pub banks: BankLayout,
    /// Length fields must be strictly below this value
    pub max_axis_len: usize,
    /// Tables with a data block this long or longer are rejected
    pub max_table_bytes: usize,
    /// Singleton with an optional companion switch
    pub boost_limiter: AnchorSpec,
    /// Switch found near each boost limiter
    pub map_maf_switch: CompanionSpec,
    /// Plain singleton
    pub rev_limiter: AnchorSpec,
    /// Identification markers
    pub ident: IdentMarkers,
}

const SVBL_PATTERN: [u8; 24] = [
    0x06, 0x06, 0x06, 0x40, 0x06, 0x61, 0x06, 0xB8, 0x07, 0x3A, 0x08, 0xCA, 0x08, 0xCA, 0x08, 0xCA,
    0x08, 0xCA, 0x08, 0xCA, 0x00, 0x00, 0x00, 0x00,
];
const SVBL_MASK: [u8; 24] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 1, 1,
];

const MAP_MAF_PATTERN: [u8; 8] = [0x41, 0x02, 0xFF, 0xFF, 0x00, 0x01, 0x01, 0x00];
const MAP_MAF_MASK: [u8; 8] = [1, 1, 0, 0, 1, 1, 1, 1];

const SVRL_PATTERN: [u8; 10] = [0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x0C, 0x00, 0x00, 0x32];
const SVRL_MASK: [u8; 10] = [1; 10];

const EDC_MARKER: [u8; 5] = *b"EDC  ";
const EDC_MARKER_MASK: [u8; 5] = [1; 5];
const EDC16_VERSION: [u8; 8] = *b"EDC16U34";
const EDC16_VERSION_MASK: [u8; 8] = [1; 8];

impl FamilyProfile {
    /// Bosch EDC16C (TriCore) as found in VAG diesel controllers.
    pub fn edc16c() -> Self {
        Self {
            name: "edc16c",
            banks: BankLayout {
                low: 0x40000,
                high: 0x1C0000,
            },
            max_axis_len: 32,
            max_table_bytes: 800,
            boost_limiter: AnchorSpec {
                signature: Signature {
                    name: "svbl",
                    pattern: &SVBL_PATTERN,
                    mask: &SVBL_MASK,
                },
                value_offset: 20,
                name: "Single Value Boost Limiter (SVBL)",
                category: "Turbo",
                subcategory: "Limiters",
            },
            map_maf_switch: CompanionSpec {
                signature: Signature {
                    name: "map-maf-switch",
                    pattern: &MAP_MAF_PATTERN,
                    mask: &MAP_MAF_MASK,
                },
                window: 0x100,
                value_offset: 2,
                name: "MAP/MAF switch (0 = MAF, 257/0x101 = MAP)",
                category: "Detected maps",
                subcategory: "Switches",
            },
            rev_limiter: AnchorSpec {
                signature: Signature {
                    name: "svrl",
                    pattern: &SVRL_PATTERN,
                    mask: &SVRL_MASK,
                },
                value_offset: 10,
                name: "Single Value Rev Limiter (SVRL)",
                category: "Misc",
                subcategory: "Limiters",
            },
            ident: IdentMarkers {
                info: Signature {
                    name: "edc-marker",
                    pattern: &EDC_MARKER,
                    mask: &EDC_MARKER_MASK,
                },
                version: Signature {
                    name: "edc16-version",
                    pattern: &EDC16_VERSION,
                    mask: &EDC16_VERSION_MASK,
                },
            },
        }
    }

    /// Look up a built-in profile by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "edc16c" | "edc16cp" | "edc16c34" => Some(Self::edc16c()),
            _ => None,
        }
    }

    /// Names accepted by [`FamilyProfile::by_name`].
    pub fn builtin_names() -> &'static [&'static str] {
        &["edc16c"]
    }

    /// Check thresholds, limits and signatures.
    pub fn validate(&self) -> Result<()> {
        self.banks.validate()?;
        if self.max_axis_len < 2 {
            return Err(AnalyzerError::ConfigError {
                message: format!("max_axis_len must be at least 2, got {}", self.max_axis_len),
            });
        }
        if self.max_table_bytes == 0 {
            return Err(AnalyzerError::ConfigError {
                message: "max_table_bytes must be non-zero".to_string(),
            });
        }
        for signature in [
            &self.boost_limiter.signature,
            &self.map_maf_switch.signature,
            &self.rev_limiter.signature,
            &self.ident.info,
            &self.ident.version,
        ] {
            signature.validate()?;
        }
        Ok(())
    }
}

impl Default for FamilyProfile {
    fn default() -> Self {
        Self::edc16c()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edc16c_is_valid() {
        let profile = FamilyProfile::edc16c();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.boost_limiter.signature.len(), 24);
        assert_eq!(profile.boost_limiter.signature.wildcards(), 2);
        assert_eq!(profile.map_maf_switch.signature.len(), 8);
        assert_eq!(profile.map_maf_switch.signature.wildcards(), 2);
        assert_eq!(profile.rev_limiter.signature.len(), 10);
        assert_eq!(profile.rev_limiter.signature.wildcards(), 0);
    }

    #[test]
    fn test_by_name() {
        assert!(FamilyProfile::by_name("EDC16C").is_some());
        assert!(FamilyProfile::by_name("me7").is_none());
        for name in FamilyProfile::builtin_names() {
            assert!(FamilyProfile::by_name(name).is_some());
        }
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut profile = FamilyProfile::edc16c();
        profile.max_table_bytes = 0;
        assert!(profile.validate().is_err());

        let mut profile = FamilyProfile::edc16c();
        profile.banks.low = 0x200000;
        assert!(profile.validate().is_err());
    }
}
