//! Quality score encodings and Phred normalization
//!
//! Each scheme is described by one row of [`ENCODING_TABLE`]: the offset that
//! is subtracted from a raw byte and the inclusive range of raw bytes the
//! scheme accepts. A byte outside the range makes the record malformed.

use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest raw quality byte any scheme accepts ('~')
pub const MAX_ENCODED_QUALITY: u8 = 126;

/// Quality encoding scheme of a FASTQ file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityEncoding {
    /// Phred+33
    #[default]
    Sanger,
    /// Solexa / Illumina 1.0
    Solexa,
    /// Phred+64
    Illumina13,
    /// Phred+64, scores start at 'B'
    Illumina15,
    /// Phred+33 (same range as Sanger)
    Illumina18,
}

/// Offset and valid raw range for one encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingScheme {
    pub encoding: QualityEncoding,
    pub name: &'static str,
    pub offset: u8,
    pub min: u8,
    pub max: u8,
}

pub const ENCODING_TABLE: [EncodingScheme; 5] = [
    EncodingScheme { encoding: QualityEncoding::Sanger, name: "sanger", offset: 33, min: 33, max: MAX_ENCODED_QUALITY },
    EncodingScheme { encoding: QualityEncoding::Solexa, name: "solexa", offset: 59, min: 59, max: MAX_ENCODED_QUALITY },
    EncodingScheme { encoding: QualityEncoding::Illumina13, name: "illumina1.3", offset: 64, min: 64, max: MAX_ENCODED_QUALITY },
    EncodingScheme { encoding: QualityEncoding::Illumina15, name: "illumina1.5", offset: 64, min: 66, max: MAX_ENCODED_QUALITY },
    EncodingScheme { encoding: QualityEncoding::Illumina18, name: "illumina1.8", offset: 33, min: 33, max: MAX_ENCODED_QUALITY },
];

impl QualityEncoding {
    pub fn scheme(self) -> &'static EncodingScheme {
        // The table is indexed in declaration order.
        &ENCODING_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.scheme().name
    }

    pub fn offset(self) -> u8 {
        self.scheme().offset
    }

    /// Largest Phred score this encoding can express
    pub fn max_phred(self) -> u8 {
        let scheme = self.scheme();
        scheme.max - scheme.offset
    }

    /// Convert one raw byte to a Phred score
    #[inline]
    pub fn to_phred(self, raw: u8) -> Result<u8> {
        let scheme = self.scheme();
        if raw < scheme.min || raw > scheme.max {
            return Err(QcError::QualityOutOfRange {
                byte: raw,
                encoding: scheme.name,
                min: scheme.min,
                max: scheme.max,
            });
        }
        Ok(raw - scheme.offset)
    }

    /// Convert a whole quality string to Phred scores
    pub fn to_phred_vec(self, raw: &[u8]) -> Result<Vec<u8>> {
        raw.iter().map(|&q| self.to_phred(q)).collect()
    }

    /// Mean Phred score of a quality string; 0.0 for an empty string
    pub fn mean_phred(self, raw: &[u8]) -> Result<f64> {
        if raw.is_empty() {
            return Ok(0.0);
        }
        let mut sum = 0u64;
        for &q in raw {
            sum += self.to_phred(q)? as u64;
        }
        Ok(sum as f64 / raw.len() as f64)
    }

    /// All supported encodings, in table order
    pub fn all() -> impl Iterator<Item = QualityEncoding> {
        ENCODING_TABLE.iter().map(|scheme| scheme.encoding)
    }
}

impl fmt::Display for QualityEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QualityEncoding {
    type Err = QcError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "");
        let found = match normalized.as_str() {
            "sanger" | "phred33" => QualityEncoding::Sanger,
            "solexa" | "illumina1.0" | "solexaillumina1.0" => QualityEncoding::Solexa,
            "illumina1.3" | "phred64" => QualityEncoding::Illumina13,
            "illumina1.5" => QualityEncoding::Illumina15,
            "illumina1.8" | "illumina" => QualityEncoding::Illumina18,
            _ => return Err(QcError::UnknownEncoding(s.to_string())),
        };
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows_match_variants() {
        for encoding in QualityEncoding::all() {
            assert_eq!(encoding.scheme().encoding, encoding);
        }
    }

    #[test]
    fn test_sanger_normalization() {
        assert_eq!(QualityEncoding::Sanger.to_phred(b'!').unwrap(), 0);
        assert_eq!(QualityEncoding::Sanger.to_phred(b'I').unwrap(), 40);
        assert_eq!(QualityEncoding::Sanger.max_phred(), 93);
    }

    #[test]
    fn test_out_of_range_byte_fails() {
        let err = QualityEncoding::Illumina13.to_phred(b'!').unwrap_err();
        assert!(matches!(err, QcError::QualityOutOfRange { byte: 33, min: 64, .. }));
        assert!(QualityEncoding::Illumina15.to_phred(b'A').is_err());
        assert!(QualityEncoding::Sanger.to_phred(127).is_err());
    }

    #[test]
    fn test_solexa_and_illumina_offsets() {
        assert_eq!(QualityEncoding::Solexa.to_phred(b'a').unwrap(), 38);
        assert_eq!(QualityEncoding::Illumina15.to_phred(b'a').unwrap(), 33);
    }

    #[test]
    fn test_mean_phred() {
        let mean = QualityEncoding::Sanger.mean_phred(b"!I").unwrap();
        assert!((mean - 20.0).abs() < 1e-9);
        assert_eq!(QualityEncoding::Sanger.mean_phred(b"").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Sanger".parse::<QualityEncoding>().unwrap(), QualityEncoding::Sanger);
        assert_eq!("illumina_1.5".parse::<QualityEncoding>().unwrap(), QualityEncoding::Illumina15);
        assert_eq!("Solexa".parse::<QualityEncoding>().unwrap(), QualityEncoding::Solexa);
        assert!("phred99".parse::<QualityEncoding>().is_err());
    }
}
