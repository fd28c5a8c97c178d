//! Two-phase read analyzers
//!
//! An analyzer walks its record source once per phase: a sequential
//! by-position pass that fills a position-indexed table, and a parallel
//! by-sequence pass that fills one slot per read. Both analyzers share the
//! read-length pre-pass and the per-read pass driver defined here.

pub mod quality;
pub mod sequence;

pub use quality::{BaseQualityStats, QualityScoreAnalyzer};
pub use sequence::SequenceAnalyzer;

use crate::control::{Counter, RunControl};
use crate::error::{QcError, Result};
use crate::io::RecordSource;
use crate::record::SeqRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Capabilities shared by the sequence and quality analyzers
pub trait Analyzer {
    /// Dataset label given at construction
    fn label(&self) -> &str;

    fn read_count(&self) -> usize;

    fn max_read_length(&self) -> usize;

    /// Sequential pass filling the position-indexed table
    fn content_by_position(&mut self, control: &RunControl) -> Result<()>;

    /// Parallel pass filling the per-read results
    fn content_by_sequence(&mut self, control: &RunControl) -> Result<()>;

    fn has_run_by_position(&self) -> bool;

    fn has_run_by_sequence(&self) -> bool;

    /// True when the most recent pass stopped on a cancellation request
    fn was_cancelled(&self) -> bool;

    /// Both phases have completed
    fn is_ready(&self) -> bool {
        self.has_run_by_position() && self.has_run_by_sequence()
    }

    /// Run the by-position pass, then the by-sequence pass
    fn process(&mut self, control: &RunControl) -> Result<()> {
        self.content_by_position(control)?;
        if self.was_cancelled() {
            return Ok(());
        }
        self.content_by_sequence(control)
    }
}

/// Lengths of every read in input order
///
/// Computed once by a dedicated pass; the maximum sizes every
/// position-indexed table downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadLengths {
    lengths: Vec<usize>,
    max: usize,
}

impl ReadLengths {
    /// Walk the source once and record each read's length
    pub fn scan<S: RecordSource + ?Sized>(source: &S) -> Result<Self> {
        let mut lengths = Vec::new();
        for record in source.records()? {
            lengths.push(record?.len());
        }
        Self::from_lengths(lengths)
    }

    pub fn from_lengths(lengths: Vec<usize>) -> Result<Self> {
        if lengths.is_empty() {
            return Err(QcError::EmptyDataset);
        }
        let max = lengths.iter().copied().max().unwrap_or(0);
        debug!("Read length pre-pass: {} reads, max length {}", lengths.len(), max);
        Ok(Self { lengths, max })
    }

    pub fn count(&self) -> usize {
        self.lengths.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn min(&self) -> usize {
        self.lengths.iter().copied().min().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        self.lengths.iter().sum::<usize>() as f64 / self.lengths.len() as f64
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.lengths
    }
}

/// Min/max/mean/standard deviation of a per-read metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 for a single value
    pub std_dev: f64,
}

impl SummaryStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum / n;
        let std_dev = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };
        Some(Self { min, max, mean, std_dev })
    }
}

/// Result of a per-read pass
pub(crate) struct PassOutcome {
    pub values: Vec<f64>,
    pub cancelled: bool,
}

/// Compute `metric` for every record in parallel, storing each result in the
/// slot of its input index
///
/// Completion order is irrelevant; the index travels with the record.
pub(crate) fn per_record_pass<S, F>(
    source: &S,
    expected: usize,
    control: &RunControl,
    metric: F,
) -> Result<PassOutcome>
where
    S: RecordSource + ?Sized,
    F: Fn(&SeqRecord) -> Result<f64> + Sync,
{
    let stopped = AtomicBool::new(false);
    let done = Counter::default();

    let computed: Vec<(usize, f64)> = source
        .records()?
        .enumerate()
        .par_bridge()
        .map(|(index, record)| {
            if control.should_stop() {
                stopped.store(true, Ordering::Relaxed);
                return None;
            }
            let value = record.and_then(|r| metric(&r)).map(|v| (index, v));
            control.tick(done.bump());
            Some(value)
        })
        .while_some()
        .collect::<Result<Vec<_>>>()?;

    let cancelled = stopped.load(Ordering::Relaxed);
    if !cancelled && computed.len() != expected {
        return Err(QcError::DatasetChanged(format!(
            "expected {} reads, found {}",
            expected,
            computed.len()
        )));
    }

    let mut values = vec![0.0; expected];
    for (index, value) in computed {
        let slot = values.get_mut(index).ok_or_else(|| {
            QcError::DatasetChanged(format!("read index {} beyond {} reads", index, expected))
        })?;
        *slot = value;
    }

    if cancelled {
        warn!("Per-read pass cancelled");
    } else {
        info!("Per-read pass complete: {} reads", expected);
    }
    Ok(PassOutcome { values, cancelled })
}

/// Check a record against the dimensions found by the pre-pass
pub(crate) fn check_dimensions(index: usize, record: &SeqRecord, reads: usize, max_len: usize) -> Result<()> {
    if index >= reads {
        return Err(QcError::DatasetChanged(format!(
            "more than {} reads on a later pass",
            reads
        )));
    }
    if record.len() > max_len {
        return Err(QcError::DatasetChanged(format!(
            "read '{}' has length {} beyond maximum {}",
            record.id,
            record.len(),
            max_len
        )));
    }
    Ok(())
}
