//! Error types for QC analysis and read filtering

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, QcError>;

/// Errors raised while analyzing or filtering reads
///
/// Every error is fatal to the operation that raised it. Malformed records
/// are never skipped.
#[derive(Debug, Error)]
pub enum QcError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record source produced no records
    #[error("Zero sequence records were processed")]
    EmptyDataset,

    /// A configured value is outside its permitted range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// A quality-dependent operation received a record without qualities
    #[error("Record '{id}' has no quality scores")]
    MissingQuality {
        /// Record identifier
        id: String,
    },

    /// The record source yielded different data on a later pass
    #[error("Record source changed between passes: {0}")]
    DatasetChanged(String),

    /// Raw quality byte outside the declared encoding's range
    #[error("Quality byte {byte} is outside the {encoding} range {min}..={max}")]
    QualityOutOfRange {
        /// Offending raw byte
        byte: u8,
        /// Encoding name
        encoding: &'static str,
        /// Lowest valid byte
        min: u8,
        /// Highest valid byte
        max: u8,
    },

    /// Malformed FASTQ input
    #[error("Invalid FASTQ format at line {line}: {msg}")]
    InvalidFastq {
        /// Line number where the error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Malformed FASTA input
    #[error("Invalid FASTA format at line {line}: {msg}")]
    InvalidFasta {
        /// Line number where the error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Regular expression failed to compile
    #[error("Invalid regular expression: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Unrecognised quality encoding name
    #[error("Unknown quality encoding: {0}")]
    UnknownEncoding(String),

    /// File extension does not map to a supported format
    #[error("Unable to determine sequence format for '{0}'")]
    UnknownFormat(String),

    /// Quality matrix dimensions do not fit in memory indices
    #[error("Quality matrix of {positions} positions x {reads} reads overflows")]
    IndexOverflow {
        /// Number of read positions
        positions: usize,
        /// Number of reads
        reads: usize,
    },
}

impl QcError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        QcError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
