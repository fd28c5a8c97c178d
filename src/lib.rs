//! Seqcos QC Tools
//!
//! Quality control analysis and read filtering for sequencing reads.
//!
//! This library provides shared functionality for:
//! - Base composition and GC content by position and by read
//! - Phred quality statistics and per-position boxplots
//! - Trimming reads by length, quality window or pattern
//! - Discarding reads by length, mean quality or pattern

pub mod analyzer;
pub mod boxplot;
pub mod cli;
pub mod config;
pub mod control;
pub mod discard;
pub mod encoding;
pub mod error;
pub mod io;
pub mod record;
pub mod reporting;
pub mod trim;

pub use analyzer::{Analyzer, QualityScoreAnalyzer, ReadLengths, SequenceAnalyzer, SummaryStats};
pub use boxplot::{BoxPlot, PositionSummary};
pub use config::{validate_pattern, DiscardMode, DiscardSettings, TrimMode, TrimSettings};
pub use control::{CancellationToken, RunControl};
pub use discard::{DiscardStrategy, Discarder};
pub use encoding::QualityEncoding;
pub use error::{QcError, Result};
pub use io::{create_sink, FileFormat, RecordSink, RecordSource, SequenceFile};
pub use record::SeqRecord;
pub use reporting::{InputStatistics, QcReport};
pub use trim::{TrimStrategy, Trimmer};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Trait for QC statistics structures
pub trait QcStatsMarker: Clone + Serialize + for<'de> Deserialize<'de> + std::fmt::Debug {}

/// Read trimming statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimStats {
    pub sample_name: String,
    pub total_reads: u64,
    pub reads_trimmed: u64,
    pub reads_discarded: u64,
    pub trim_rate: f64,
    pub cancelled: bool,
}

impl TrimStats {
    pub fn new(sample_name: &str, total_reads: u64, reads_trimmed: u64, reads_discarded: u64, cancelled: bool) -> Self {
        Self {
            sample_name: sample_name.to_string(),
            total_reads,
            reads_trimmed,
            reads_discarded,
            trim_rate: percentage(reads_trimmed, total_reads),
            cancelled,
        }
    }
}

impl QcStatsMarker for TrimStats {}

/// Read discard statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardStats {
    pub sample_name: String,
    pub total_reads: u64,
    pub reads_passed: u64,
    pub reads_discarded: u64,
    pub pass_rate: f64,
    pub cancelled: bool,
}

impl DiscardStats {
    pub fn new(sample_name: &str, total_reads: u64, reads_discarded: u64, cancelled: bool) -> Self {
        let reads_passed = total_reads - reads_discarded;
        Self {
            sample_name: sample_name.to_string(),
            total_reads,
            reads_passed,
            reads_discarded,
            pass_rate: percentage(reads_passed, total_reads),
            cancelled,
        }
    }
}

impl QcStatsMarker for DiscardStats {}

impl QcStatsMarker for InputStatistics {}

/// `part` as a percentage of `total`; 0 when `total` is 0
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Write any statistics structure as pretty JSON
pub fn export_stats<T: QcStatsMarker, P: AsRef<Path>>(stats: &T, path: P) -> anyhow::Result<()> {
    let json_content = serde_json::to_string_pretty(stats)?;
    std::fs::write(path, json_content)?;
    Ok(())
}

/// File name and size in bytes
pub fn get_file_info<P: AsRef<Path>>(path: P) -> anyhow::Result<(String, u64)> {
    let filename = path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let metadata = std::fs::metadata(&path)?;
    Ok((filename, metadata.len()))
}

/// Sample name derived from a sequence file name, extensions stripped
pub fn sample_name<P: AsRef<Path>>(path: P) -> String {
    let name = path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    let name = name.strip_suffix(".gz").unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_stats_rates() {
        let trim = TrimStats::new("s", 10, 7, 3, false);
        assert_eq!(trim.trim_rate, 70.0);
        let discard = DiscardStats::new("s", 8, 2, false);
        assert_eq!(discard.reads_passed, 6);
        assert_eq!(discard.pass_rate, 75.0);
    }

    #[test]
    fn test_sample_name() {
        assert_eq!(sample_name("/data/run1.fastq.gz"), "run1");
        assert_eq!(sample_name("reads.fa"), "reads");
        assert_eq!(sample_name("plain"), "plain");
    }

    #[test]
    fn test_export_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trim_stats.json");
        export_stats(&TrimStats::new("s", 2, 1, 1, false), &path).unwrap();
        let back: TrimStats = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.reads_trimmed, 1);
    }
}
