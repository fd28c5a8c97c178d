//! Run summaries and JSON export
//!
//! Collects the finished statistics of the analyzers into serializable
//! structures for the report layer.

use crate::analyzer::sequence::SymbolTable;
use crate::analyzer::{Analyzer, QualityScoreAnalyzer, SequenceAnalyzer, SummaryStats};
use crate::boxplot::BoxPlot;
use crate::error::{QcError, Result};
use crate::io::RecordSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Read length min/max/mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthSummary {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

/// Base-level Phred min/max/mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseQualitySummary {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
}

/// Dataset-wide summary of a finished analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStatistics {
    pub sample_name: String,
    pub read_count: usize,
    pub read_length: LengthSummary,
    pub gc_by_read: SummaryStats,
    /// Absent for FASTA input
    pub base_quality: Option<BaseQualitySummary>,
    pub read_quality: Option<SummaryStats>,
    pub encoding: Option<String>,
}

fn not_ready(label: &str) -> QcError {
    QcError::invalid("analyzer", format!("'{}' has not completed both passes", label))
}

impl InputStatistics {
    /// Summarize analyzers whose passes have both completed
    pub fn from_analyzers<S, Q>(
        sequence: &SequenceAnalyzer<S>,
        quality: Option<&QualityScoreAnalyzer<Q>>,
    ) -> Result<Self>
    where
        S: RecordSource,
        Q: RecordSource,
    {
        if !sequence.is_ready() {
            return Err(not_ready(sequence.label()));
        }
        let gc_by_read = sequence.gc_summary().ok_or_else(|| not_ready(sequence.label()))?;
        let lengths = sequence.read_lengths();

        let (base_quality, read_quality, encoding) = match quality {
            Some(analyzer) => {
                if !analyzer.is_ready() {
                    return Err(not_ready(analyzer.label()));
                }
                let base = analyzer.base_stats().map(|stats| BaseQualitySummary {
                    min: stats.min,
                    max: stats.max,
                    mean: stats.mean,
                });
                (base, analyzer.read_stats(), Some(analyzer.encoding().to_string()))
            }
            None => (None, None, None),
        };

        Ok(Self {
            sample_name: sequence.label().to_string(),
            read_count: sequence.read_count(),
            read_length: LengthSummary {
                min: lengths.min(),
                max: lengths.max(),
                mean: lengths.mean(),
            },
            gc_by_read,
            base_quality,
            read_quality,
            encoding,
        })
    }
}

/// Everything the plotting layer needs for one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcReport {
    pub statistics: InputStatistics,
    pub gc_by_position: Vec<f64>,
    pub gc_by_read: Vec<f64>,
    /// Symbol counts per position, keyed by the symbol as a string
    pub symbols_by_position: BTreeMap<String, Vec<u64>>,
    pub quality_by_read: Vec<f64>,
    pub quality_boxplot: Option<BoxPlot>,
}

impl QcReport {
    pub fn new(
        statistics: InputStatistics,
        gc_by_position: Vec<f64>,
        gc_by_read: &[f64],
        symbols: &SymbolTable,
        quality_by_read: &[f64],
        quality_boxplot: Option<BoxPlot>,
    ) -> Self {
        let symbols_by_position = symbols
            .iter()
            .map(|(&symbol, counts)| ((symbol as char).to_string(), counts.clone()))
            .collect();
        Self {
            statistics,
            gc_by_position,
            gc_by_read: gc_by_read.to_vec(),
            symbols_by_position,
            quality_by_read: quality_by_read.to_vec(),
            quality_boxplot,
        }
    }

    /// Export report to JSON
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json_content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::RunControl;
    use crate::encoding::QualityEncoding;
    use crate::record::SeqRecord;

    fn source() -> Vec<SeqRecord> {
        vec![
            SeqRecord::with_quality("a", b"GGCC".to_vec(), b"IIII".to_vec()).unwrap(),
            SeqRecord::with_quality("b", b"AT".to_vec(), b"!!".to_vec()).unwrap(),
        ]
    }

    #[test]
    fn test_statistics_require_finished_analyzers() {
        let sequence = SequenceAnalyzer::new(source(), "sample").unwrap();
        let result = InputStatistics::from_analyzers::<_, Vec<SeqRecord>>(&sequence, None);
        assert!(matches!(result, Err(QcError::InvalidParameter { .. })));
    }

    #[test]
    fn test_statistics_and_report() {
        let control = RunControl::default();
        let mut sequence = SequenceAnalyzer::new(source(), "sample").unwrap();
        sequence.process(&control).unwrap();
        let mut quality = QualityScoreAnalyzer::with_dimensions(
            source(),
            "sample",
            QualityEncoding::Sanger,
            sequence.read_count(),
            sequence.max_read_length(),
        )
        .unwrap();
        quality.process(&control).unwrap();

        let stats = InputStatistics::from_analyzers(&sequence, Some(&quality)).unwrap();
        assert_eq!(stats.read_count, 2);
        assert_eq!(stats.read_length.max, 4);
        assert_eq!(stats.read_length.min, 2);
        assert_eq!(stats.gc_by_read.max, 100.0);
        assert_eq!(stats.base_quality.unwrap().max, 40);
        assert_eq!(stats.encoding.as_deref(), Some("sanger"));

        let gc = sequence.gc_by_position(&control).unwrap();
        let boxplot = quality.boxplot(&control).unwrap();
        let report = QcReport::new(
            stats,
            gc,
            sequence.gc_by_sequence(),
            sequence.symbol_table(),
            quality.mean_by_sequence(),
            Some(boxplot),
        );
        assert_eq!(report.symbols_by_position["G"], vec![1, 1, 0, 0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.export_json(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"sample_name\": \"sample\""));
    }
}
