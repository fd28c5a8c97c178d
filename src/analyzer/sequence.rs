//! Base composition by position and GC content by read

use super::{check_dimensions, per_record_pass, Analyzer, ReadLengths, SummaryStats};
use crate::control::RunControl;
use crate::error::{QcError, Result};
use crate::io::RecordSource;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Symbol counts per read position
///
/// Symbols are folded to upper case. Each array has one slot per position
/// up to the maximum read length.
pub type SymbolTable = BTreeMap<u8, Vec<u64>>;

/// Sequence-level analyzer
pub struct SequenceAnalyzer<S> {
    source: S,
    label: String,
    lengths: ReadLengths,
    symbols: SymbolTable,
    gc_by_sequence: Vec<f64>,
    has_run_by_position: bool,
    has_run_by_sequence: bool,
    cancelled: bool,
}

impl<S: RecordSource> SequenceAnalyzer<S> {
    /// Create an analyzer; runs the read-length pre-pass immediately
    pub fn new(source: S, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(QcError::invalid("label", "dataset label must not be empty"));
        }
        let lengths = ReadLengths::scan(&source)?;
        info!(
            "{}: {} reads, max length {}",
            label,
            lengths.count(),
            lengths.max()
        );
        Ok(Self {
            source,
            label,
            lengths,
            symbols: SymbolTable::new(),
            gc_by_sequence: Vec::new(),
            has_run_by_position: false,
            has_run_by_sequence: false,
            cancelled: false,
        })
    }

    pub fn read_lengths(&self) -> &ReadLengths {
        &self.lengths
    }

    /// Symbol counts per position, filled by the by-position pass
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    /// GC percentage of each read, in input order
    pub fn gc_by_sequence(&self) -> &[f64] {
        &self.gc_by_sequence
    }

    /// Min/max/mean/std of the per-read GC percentages
    pub fn gc_summary(&self) -> Option<SummaryStats> {
        if !self.has_run_by_sequence {
            return None;
        }
        SummaryStats::from_values(&self.gc_by_sequence)
    }

    /// GC percentage at each position; NaN where no symbol was observed
    ///
    /// Runs the by-position pass first when it has not run yet.
    pub fn gc_by_position(&mut self, control: &RunControl) -> Result<Vec<f64>> {
        if !self.has_run_by_position {
            self.content_by_position(control)?;
        }
        let totals = self.position_totals();
        let count_at = |symbol: u8, pos: usize| {
            self.symbols
                .get(&symbol)
                .map(|counts| counts[pos])
                .unwrap_or(0)
        };
        Ok(totals
            .iter()
            .enumerate()
            .map(|(pos, &total)| {
                if total == 0 {
                    f64::NAN
                } else {
                    let gc = count_at(b'G', pos) + count_at(b'C', pos);
                    100.0 * gc as f64 / total as f64
                }
            })
            .collect())
    }

    /// Total symbols observed at each position
    ///
    /// Runs the by-position pass first when it has not run yet.
    pub fn sum_by_position(&mut self, control: &RunControl) -> Result<Vec<u64>> {
        if !self.has_run_by_position {
            self.content_by_position(control)?;
        }
        Ok(self.position_totals())
    }

    fn position_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.lengths.max()];
        for counts in self.symbols.values() {
            for (total, count) in totals.iter_mut().zip(counts) {
                *total += count;
            }
        }
        totals
    }
}

/// Percentage of G, C and S (strong) symbols in a read; 0 for an empty read
pub fn gc_percent(sequence: &[u8]) -> f64 {
    if sequence.is_empty() {
        return 0.0;
    }
    let gc = sequence
        .iter()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C' | b'S'))
        .count();
    100.0 * gc as f64 / sequence.len() as f64
}

impl<S: RecordSource> Analyzer for SequenceAnalyzer<S> {
    fn label(&self) -> &str {
        &self.label
    }

    fn read_count(&self) -> usize {
        self.lengths.count()
    }

    fn max_read_length(&self) -> usize {
        self.lengths.max()
    }

    fn content_by_position(&mut self, control: &RunControl) -> Result<()> {
        let max_len = self.lengths.max();
        let reads = self.lengths.count();
        self.cancelled = false;
        self.has_run_by_position = false;
        self.symbols.clear();

        let mut seen = 0usize;
        for (index, record) in self.source.records()?.enumerate() {
            if control.should_stop() {
                self.cancelled = true;
                warn!("{}: symbol count cancelled after {} reads", self.label, seen);
                return Ok(());
            }
            let record = record?;
            check_dimensions(index, &record, reads, max_len)?;

            for (pos, &symbol) in record.sequence.iter().enumerate() {
                let counts = self
                    .symbols
                    .entry(symbol.to_ascii_uppercase())
                    .or_insert_with(|| vec![0; max_len]);
                counts[pos] += 1;
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

        self.has_run_by_position = true;
        info!(
            "{}: counted {} distinct symbols over {} positions",
            self.label,
            self.symbols.len(),
            max_len
        );
        Ok(())
    }

    fn content_by_sequence(&mut self, control: &RunControl) -> Result<()> {
        self.cancelled = false;
        self.has_run_by_sequence = false;

        let outcome = per_record_pass(&self.source, self.lengths.count(), control, |record| {
            Ok(gc_percent(&record.sequence))
        })?;
        self.gc_by_sequence = outcome.values;
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
