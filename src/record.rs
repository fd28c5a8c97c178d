//! Read records shared by the analyzers and the filters

use crate::error::{QcError, Result};

/// A sequencing read
///
/// `quality` holds the raw encoded bytes exactly as they appear in the
/// FASTQ file; decoding to Phred happens through [`crate::QualityEncoding`].
/// FASTA records carry no quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    /// Sequence identifier (without the '@' or '>' prefix)
    pub id: String,
    /// Symbol sequence (A/C/G/T/N and ambiguity codes)
    pub sequence: Vec<u8>,
    /// Raw encoded quality bytes, aligned with `sequence`
    pub quality: Option<Vec<u8>>,
}

impl SeqRecord {
    /// Create a FASTQ-style record, checking that quality and sequence align
    pub fn with_quality(id: impl Into<String>, sequence: Vec<u8>, quality: Vec<u8>) -> Result<Self> {
        let id = id.into();
        if sequence.len() != quality.len() {
            return Err(QcError::invalid(
                "quality",
                format!(
                    "record '{}' has sequence length {} but quality length {}",
                    id,
                    sequence.len(),
                    quality.len()
                ),
            ));
        }
        Ok(Self {
            id,
            sequence,
            quality: Some(quality),
        })
    }

    /// Create a FASTA-style record without qualities
    pub fn without_quality(id: impl Into<String>, sequence: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            sequence,
            quality: None,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn has_quality(&self) -> bool {
        self.quality.is_some()
    }

    /// Quality bytes, or `MissingQuality` for FASTA-style records
    pub fn require_quality(&self) -> Result<&[u8]> {
        self.quality
            .as_deref()
            .ok_or_else(|| QcError::MissingQuality { id: self.id.clone() })
    }

    /// Copy of `start..start + length`, keeping the identifier
    ///
    /// Callers guarantee the range is inside the record.
    pub fn sub_record(&self, start: usize, length: usize) -> SeqRecord {
        let end = start + length;
        SeqRecord {
            id: self.id.clone(),
            sequence: self.sequence[start..end].to_vec(),
            quality: self.quality.as_ref().map(|q| q[start..end].to_vec()),
        }
    }
}
