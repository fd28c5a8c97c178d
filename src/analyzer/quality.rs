//! Phred quality statistics by position and by read
//!
//! The by-position pass stores every normalized score in a flat,
//! position-major matrix: all reads' values at position `p` occupy
//! `p * read_count .. (p + 1) * read_count`. Boxplots read those blocks
//! directly.

use super::{check_dimensions, per_record_pass, Analyzer, ReadLengths, SummaryStats};
use crate::boxplot::{self, BoxPlot};
use crate::control::RunControl;
use crate::encoding::QualityEncoding;
use crate::error::{QcError, Result};
use crate::io::RecordSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Matrix cell for a position beyond a read's end
pub const ABSENT: u8 = u8::MAX;

/// Min/max/mean over every observed base quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseQualityStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    pub bases: u64,
}

/// Quality-score analyzer
pub struct QualityScoreAnalyzer<S> {
    source: S,
    label: String,
    encoding: QualityEncoding,
    read_count: usize,
    max_read_length: usize,
    matrix: Vec<u8>,
    base_stats: Option<BaseQualityStats>,
    mean_by_sequence: Vec<f64>,
    has_run_by_position: bool,
    has_run_by_sequence: bool,
    cancelled: bool,
}

impl<S: RecordSource> QualityScoreAnalyzer<S> {
    /// Create an analyzer, scanning the source for its dimensions
    pub fn new(source: S, label: impl Into<String>, encoding: QualityEncoding) -> Result<Self> {
        let lengths = ReadLengths::scan(&source)?;
        Self::with_dimensions(source, label, encoding, lengths.count(), lengths.max())
    }

    /// Create an analyzer from dimensions another pass already established
    pub fn with_dimensions(
        source: S,
        label: impl Into<String>,
        encoding: QualityEncoding,
        read_count: usize,
        max_read_length: usize,
    ) -> Result<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(QcError::invalid("label", "dataset label must not be empty"));
        }
        if read_count == 0 {
            return Err(QcError::EmptyDataset);
        }
        if max_read_length == 0 {
            return Err(QcError::invalid("max_read_length", "must be greater than zero"));
        }
        info!(
            "{}: quality analysis of {} reads x {} positions ({})",
            label, read_count, max_read_length, encoding
        );
        Ok(Self {
            source,
            label,
            encoding,
            read_count,
            max_read_length,
            matrix: Vec::new(),
            base_stats: None,
            mean_by_sequence: Vec::new(),
            has_run_by_position: false,
            has_run_by_sequence: false,
            cancelled: false,
        })
    }

    pub fn encoding(&self) -> QualityEncoding {
        self.encoding
    }

    /// Position-major Phred matrix; [`ABSENT`] marks padding
    pub fn quality_matrix(&self) -> &[u8] {
        &self.matrix
    }

    /// Every read's score at `position`, padding included
    pub fn position_values(&self, position: usize) -> Option<&[u8]> {
        if !self.has_run_by_position || position >= self.max_read_length {
            return None;
        }
        let start = position * self.read_count;
        self.matrix.get(start..start + self.read_count)
    }

    pub fn base_stats(&self) -> Option<BaseQualityStats> {
        self.base_stats
    }

    /// Mean Phred score of each read, in input order
    pub fn mean_by_sequence(&self) -> &[f64] {
        &self.mean_by_sequence
    }

    /// Min/max/mean/std of the per-read means
    pub fn read_stats(&self) -> Option<SummaryStats> {
        if !self.has_run_by_sequence {
            return None;
        }
        SummaryStats::from_values(&self.mean_by_sequence)
    }

    /// Per-position boxplot summaries
    ///
    /// Runs the by-position pass first when it has not run yet.
    pub fn boxplot(&mut self, control: &RunControl) -> Result<BoxPlot> {
        if !self.has_run_by_position {
            self.content_by_position(control)?;
            if self.cancelled {
                return Ok(BoxPlot::cancelled(self.max_read_length));
            }
        }
        boxplot::compute(&self.matrix, self.read_count, self.max_read_length, control)
    }

    fn matrix_len(&self) -> Result<usize> {
        self.max_read_length
            .checked_mul(self.read_count)
            .ok_or(QcError::IndexOverflow {
                positions: self.max_read_length,
                reads: self.read_count,
            })
    }
}

impl<S: RecordSource> Analyzer for QualityScoreAnalyzer<S> {
    fn label(&self) -> &str {
        &self.label
    }

    fn read_count(&self) -> usize {
        self.read_count
    }

    fn max_read_length(&self) -> usize {
        self.max_read_length
    }

    fn content_by_position(&mut self, control: &RunControl) -> Result<()> {
        let reads = self.read_count;
        let max_len = self.max_read_length;
        self.cancelled = false;
        self.has_run_by_position = false;
        self.base_stats = None;

        let size = self.matrix_len()?;
        self.matrix.clear();
        self.matrix.resize(size, ABSENT);
        debug!("{}: allocated quality matrix of {} cells", self.label, size);

        let mut min = u8::MAX;
        let mut max = 0u8;
        let mut sum = 0u64;
        let mut bases = 0u64;
        let mut seen = 0usize;

        for (index, record) in self.source.records()?.enumerate() {
            if control.should_stop() {
                self.cancelled = true;
                warn!("{}: quality matrix cancelled after {} reads", self.label, seen);
                return Ok(());
            }
            let record = record?;
            check_dimensions(index, &record, reads, max_len)?;
            let quality = record.require_quality()?;

            for (pos, &raw) in quality.iter().enumerate() {
                let phred = self.encoding.to_phred(raw)?;
                self.matrix[pos * reads + index] = phred;
                min = min.min(phred);
                max = max.max(phred);
                sum += phred as u64;
                bases += 1;
            }
            seen += 1;
            control.tick(seen as u64);
        }

        if seen != reads {
            return Err(QcError::DatasetChanged(format!(
                "expected {} reads, found {}",
                reads, seen
            )));
        }

        if bases > 0 {
            self.base_stats = Some(BaseQualityStats {
                min,
                max,
                mean: sum as f64 / bases as f64,
                bases,
            });
        }
        self.has_run_by_position = true;
        info!("{}: recorded {} base qualities", self.label, bases);
        Ok(())
    }

    fn content_by_sequence(&mut self, control: &RunControl) -> Result<()> {
        self.cancelled = false;
        self.has_run_by_sequence = false;

        let encoding = self.encoding;
        let outcome = per_record_pass(&self.source, self.read_count, control, |record| {
            encoding.mean_phred(record.require_quality()?)
        })?;
        self.mean_by_sequence = outcome.values;
        self.cancelled = outcome.cancelled;
        self.has_run_by_sequence = !outcome.cancelled;
        Ok(())
    }

    fn has_run_by_position(&self) -> bool {
        self.has_run_by_position
    }

    fn has_run_by_sequence(&self) -> bool {
        self.has_run_by_sequence
    }

    fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancellationToken;
    use crate::record::SeqRecord;

    fn fastq(pairs: &[(&str, &str)]) -> Vec<SeqRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (s, q))| {
                SeqRecord::with_quality(format!("r{}", i), s.as_bytes().to_vec(), q.as_bytes().to_vec()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_position_major_matrix() {
        let source = fastq(&[("ACG", "!+5"), ("AC", "II")]);
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Sanger).unwrap();
        analyzer.content_by_position(&RunControl::default()).unwrap();

        assert_eq!(analyzer.quality_matrix(), &[0, 40, 10, 40, 20, ABSENT]);
        assert_eq!(analyzer.position_values(2).unwrap(), &[20, ABSENT]);
        assert!(analyzer.position_values(3).is_none());

        let stats = analyzer.base_stats().unwrap();
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 40);
        assert_eq!(stats.bases, 5);
        assert!((stats.mean - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_by_sequence() {
        let source = fastq(&[("ACGT", "IIII"), ("AC", "!!"), ("A", "5")]);
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Sanger).unwrap();
        analyzer.process(&RunControl::default()).unwrap();
        assert!(analyzer.is_ready());
        assert_eq!(analyzer.mean_by_sequence(), &[40.0, 0.0, 20.0]);

        let stats = analyzer.read_stats().unwrap();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 40.0);
        assert!((stats.mean - 20.0).abs() < 1e-9);
        assert!((stats.std_dev - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_quality_fails() {
        let source = fastq(&[("ACGT", "IIII"), ("ACGT", "II!I")]);
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Illumina13).unwrap();
        let result = analyzer.content_by_position(&RunControl::default());
        assert!(matches!(result, Err(QcError::QualityOutOfRange { .. })));
        assert!(!analyzer.has_run_by_position());
    }

    #[test]
    fn test_fasta_records_are_rejected() {
        let source = vec![SeqRecord::without_quality("r", b"ACGT".to_vec())];
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Sanger).unwrap();
        let result = analyzer.content_by_position(&RunControl::default());
        assert!(matches!(result, Err(QcError::MissingQuality { .. })));
    }

    #[test]
    fn test_with_dimensions_validation() {
        let source = fastq(&[("A", "I")]);
        assert!(matches!(
            QualityScoreAnalyzer::with_dimensions(source.clone(), "q", QualityEncoding::Sanger, 0, 10),
            Err(QcError::EmptyDataset)
        ));
        assert!(matches!(
            QualityScoreAnalyzer::with_dimensions(source.clone(), "q", QualityEncoding::Sanger, 1, 0),
            Err(QcError::InvalidParameter { .. })
        ));
        assert!(QualityScoreAnalyzer::with_dimensions(source, "q", QualityEncoding::Sanger, 1, 1).is_ok());
    }

    #[test]
    fn test_wrong_dimensions_detected() {
        let source = fastq(&[("ACGT", "IIII")]);
        let mut analyzer = QualityScoreAnalyzer::with_dimensions(source, "q", QualityEncoding::Sanger, 1, 2).unwrap();
        let result = analyzer.content_by_position(&RunControl::default());
        assert!(matches!(result, Err(QcError::DatasetChanged(_))));
    }

    #[test]
    fn test_cancelled_quality_pass() {
        let source = fastq(&[("ACGT", "IIII")]);
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Sanger).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        analyzer.process(&RunControl::new(token)).unwrap();
        assert!(analyzer.was_cancelled());
        assert!(!analyzer.is_ready());
        assert!(analyzer.base_stats().is_none());
    }

    #[test]
    fn test_boxplot_from_analyzer() {
        let source = fastq(&[("AC", "!I"), ("AC", "+I"), ("A", "5")]);
        let mut analyzer = QualityScoreAnalyzer::new(source, "q", QualityEncoding::Sanger).unwrap();
        let plot = analyzer.boxplot(&RunControl::default()).unwrap();
        assert_eq!(plot.positions.len(), 2);
        assert_eq!(plot.positions[0].median, 10.0);
        assert_eq!(plot.positions[1].observations, 2);
        assert_eq!(plot.positions[1].mean, 40.0);
    }
}
