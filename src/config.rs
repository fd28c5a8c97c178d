//! Trim and discard settings
//!
//! Settings are plain serializable values. `build()` validates them and
//! produces the strategy that does the work.

use crate::discard::{DiscardStrategy, Discarder};
use crate::encoding::QualityEncoding;
use crate::error::Result;
use crate::trim::{TrimByLength, TrimByQuality, TrimByRegex, TrimStrategy, Trimmer};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// What a trim run cuts by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimMode {
    /// Bases to keep, or a fraction of each read when in (0, 1)
    Length(f64),
    /// Phred threshold for the maximum-sum window
    Quality(u8),
    /// Pattern whose matches are cut out
    Regex(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimSettings {
    pub mode: TrimMode,
    /// Trim from the start of reads as well as the end
    pub from_start: bool,
    /// Shortest window a quality trim may keep
    pub min_length: usize,
    pub encoding: QualityEncoding,
}

impl TrimSettings {
    pub fn new(mode: TrimMode) -> Self {
        Self {
            mode,
            from_start: false,
            min_length: 0,
            encoding: QualityEncoding::default(),
        }
    }

    pub fn build(&self) -> Result<Trimmer> {
        let strategy = match &self.mode {
            TrimMode::Length(length) => TrimStrategy::Length(TrimByLength::new(*length, self.from_start)?),
            TrimMode::Quality(threshold) => TrimStrategy::Quality(TrimByQuality::new(
                *threshold,
                self.from_start,
                self.min_length,
                self.encoding,
            )?),
            TrimMode::Regex(pattern) => TrimStrategy::Regex(TrimByRegex::new(pattern)?),
        };
        Ok(Trimmer::new(strategy))
    }
}

/// What a discard run filters on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardMode {
    /// Minimum read length
    Length(usize),
    /// Minimum mean Phred score
    MeanQuality(u8),
    /// Pattern that marks a read for discard
    Regex(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardSettings {
    pub mode: DiscardMode,
    pub encoding: QualityEncoding,
}

impl DiscardSettings {
    pub fn new(mode: DiscardMode) -> Self {
        Self {
            mode,
            encoding: QualityEncoding::default(),
        }
    }

    pub fn build(&self) -> Result<Discarder> {
        let strategy = match &self.mode {
            DiscardMode::Length(min_length) => DiscardStrategy::by_length(*min_length)?,
            DiscardMode::MeanQuality(threshold) => DiscardStrategy::by_mean_quality(*threshold, self.encoding)?,
            DiscardMode::Regex(pattern) => DiscardStrategy::by_regex(pattern)?,
        };
        Ok(Discarder::new(strategy))
    }
}

/// Check that a pattern compiles before any records are read
pub fn validate_pattern(pattern: &str) -> Result<()> {
    Regex::new(pattern)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QcError;

    #[test]
    fn test_trim_settings_build() {
        let mut settings = TrimSettings::new(TrimMode::Quality(20));
        settings.from_start = true;
        settings.encoding = QualityEncoding::Illumina15;
        let trimmer = settings.build().unwrap();
        assert!(trimmer.strategy().requires_quality());

        assert!(TrimSettings::new(TrimMode::Length(-1.0)).build().is_err());
        assert!(TrimSettings::new(TrimMode::Regex("(".into())).build().is_err());
    }

    #[test]
    fn test_discard_settings_build() {
        let discarder = DiscardSettings::new(DiscardMode::Length(50)).build().unwrap();
        assert_eq!(discarder.strategy().name(), "length");
        assert!(matches!(
            DiscardSettings::new(DiscardMode::MeanQuality(0)).build(),
            Err(QcError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_settings_serialize() {
        let settings = TrimSettings::new(TrimMode::Regex("GATTACA".into()));
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"regex\":\"GATTACA\""));
        assert!(json.contains("\"encoding\":\"sanger\""));
        let back: TrimSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("^ACGT+$").is_ok());
        assert!(matches!(validate_pattern("[A"), Err(QcError::InvalidPattern(_))));
    }

    #[test]
    fn test_validate_pattern_accepts_byte_patterns() {
        // raw bytes are legal in sequence patterns
        let pattern = r"(?-u)\xFF";
        assert!(validate_pattern(pattern).is_ok());
        assert!(TrimSettings::new(TrimMode::Regex(pattern.into())).build().is_ok());
        assert!(DiscardSettings::new(DiscardMode::Regex(pattern.into())).build().is_ok());
    }
}
