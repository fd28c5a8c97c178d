//! Read trimming strategies and the parallel trim driver

use crate::control::{Counter, RunControl};
use crate::encoding::QualityEncoding;
use crate::error::{QcError, Result};
use crate::io::{RecordSink, RecordSource};
use crate::record::SeqRecord;
use crate::TrimStats;
use rayon::prelude::*;
use regex::bytes::Regex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

/// Keep a fixed number of bases, or a fraction of each read
#[derive(Debug, Clone)]
pub struct TrimByLength {
    length: f64,
    from_start: bool,
}

impl TrimByLength {
    /// `length` in (0, 1) is a fraction of the read; anything else is an
    /// absolute base count. `from_start` removes bases from the start and
    /// keeps the tail.
    pub fn new(length: f64, from_start: bool) -> Result<Self> {
        if !length.is_finite() || length <= 0.0 {
            return Err(QcError::invalid("length", format!("must be positive, got {}", length)));
        }
        Ok(Self { length, from_start })
    }

    /// Bases kept for a read of `read_length`
    pub fn kept_length(&self, read_length: usize) -> usize {
        if self.length < 1.0 {
            (read_length as f64 * self.length) as usize
        } else {
            self.length.round_ties_even() as usize
        }
    }

    pub fn apply(&self, record: &SeqRecord) -> Option<SeqRecord> {
        let keep = self.kept_length(record.len());
        if record.len() < keep {
            return None;
        }
        let start = if self.from_start { record.len() - keep } else { 0 };
        Some(record.sub_record(start, keep))
    }
}

/// Keep the highest-scoring window of qualities above a threshold
///
/// Each base contributes `phred - threshold`; the window is the
/// maximum-sum subarray. Without `from_start` the window start never moves
/// past the first base, so only the tail gets trimmed.
#[derive(Debug, Clone)]
pub struct TrimByQuality {
    threshold: u8,
    from_start: bool,
    min_length: usize,
    encoding: QualityEncoding,
}

impl TrimByQuality {
    pub fn new(threshold: u8, from_start: bool, min_length: usize, encoding: QualityEncoding) -> Result<Self> {
        if threshold == 0 || threshold > encoding.max_phred() {
            return Err(QcError::invalid(
                "quality threshold",
                format!("must be within 1..={} for {}", encoding.max_phred(), encoding),
            ));
        }
        Ok(Self {
            threshold,
            from_start,
            min_length,
            encoding,
        })
    }

    /// Inclusive bounds of the best window, if any has a positive sum
    pub fn best_window(&self, phred: &[u8]) -> Option<(usize, usize)> {
        let threshold = self.threshold as i64;
        let mut best: Option<(usize, usize)> = None;
        let mut max_sum = 0i64;
        let mut sum = 0i64;
        let mut start = 0usize;

        for (i, &score) in phred.iter().enumerate() {
            sum += score as i64 - threshold;
            if sum < 0 && self.from_start {
                start = i + 1;
                sum = 0;
            }
            if sum > max_sum {
                max_sum = sum;
                best = Some((start, i));
            }
        }
        best
    }

    pub fn apply(&self, record: &SeqRecord) -> Result<Option<SeqRecord>> {
        let phred = self.encoding.to_phred_vec(record.require_quality()?)?;
        let trimmed = self
            .best_window(&phred)
            .map(|(start, end)| (start, end - start + 1))
            .filter(|&(_, length)| length >= self.min_length)
            .map(|(start, length)| record.sub_record(start, length));
        Ok(trimmed)
    }
}

/// Cut every match of a pattern out of the read
#[derive(Debug, Clone)]
pub struct TrimByRegex {
    pattern: Regex,
}

impl TrimByRegex {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Excise all non-overlapping matches; `None` when nothing matched
    pub fn apply(&self, record: &SeqRecord) -> Option<SeqRecord> {
        let mut sequence = Vec::with_capacity(record.len());
        let mut quality = record.quality.as_ref().map(|q| Vec::with_capacity(q.len()));
        let mut last = 0;
        let mut matched = false;

        for found in self.pattern.find_iter(&record.sequence) {
            matched = true;
            sequence.extend_from_slice(&record.sequence[last..found.start()]);
            if let (Some(kept), Some(source)) = (quality.as_mut(), record.quality.as_ref()) {
                kept.extend_from_slice(&source[last..found.start()]);
            }
            last = found.end();
        }
        if !matched {
            return None;
        }

        sequence.extend_from_slice(&record.sequence[last..]);
        if let (Some(kept), Some(source)) = (quality.as_mut(), record.quality.as_ref()) {
            kept.extend_from_slice(&source[last..]);
        }
        Some(SeqRecord {
            id: record.id.clone(),
            sequence,
            quality,
        })
    }
}

/// Configured trim strategy
#[derive(Debug, Clone)]
pub enum TrimStrategy {
    Length(TrimByLength),
    Quality(TrimByQuality),
    Regex(TrimByRegex),
}

impl TrimStrategy {
    /// Trimmed copy of `record`, or `None` to discard it
    pub fn apply(&self, record: &SeqRecord) -> Result<Option<SeqRecord>> {
        match self {
            TrimStrategy::Length(s) => Ok(s.apply(record)),
            TrimStrategy::Quality(s) => s.apply(record),
            TrimStrategy::Regex(s) => Ok(s.apply(record)),
        }
    }

    pub fn requires_quality(&self) -> bool {
        matches!(self, TrimStrategy::Quality(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrimStrategy::Length(_) => "length",
            TrimStrategy::Quality(_) => "quality",
            TrimStrategy::Regex(_) => "regex",
        }
    }
}

/// Applies a strategy to every record of a source
#[derive(Debug, Clone)]
pub struct Trimmer {
    strategy: TrimStrategy,
}

fn poisoned() -> QcError {
    QcError::Io(io::Error::other("output sink lock poisoned"))
}

impl Trimmer {
    pub fn new(strategy: TrimStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &TrimStrategy {
        &self.strategy
    }

    pub fn trim(&self, record: &SeqRecord) -> Result<Option<SeqRecord>> {
        self.strategy.apply(record)
    }

    /// Trim every record, writing results to `filtered` and rejects to `discarded`
    ///
    /// Records are processed in parallel, so neither sink preserves input
    /// order. Sinks are flushed before returning, including after
    /// cancellation.
    pub fn trim_all<S>(
        &self,
        source: &S,
        filtered: &mut dyn RecordSink,
        discarded: Option<&mut dyn RecordSink>,
        control: &RunControl,
        sample_name: &str,
    ) -> Result<TrimStats>
    where
        S: RecordSource + ?Sized,
    {
        info!("Trimming {} by {}", sample_name, self.strategy.name());
        let filtered = Mutex::new(filtered);
        let discarded = discarded.map(Mutex::new);
        let processed = Counter::default();
        let trimmed = Counter::default();
        let rejected = Counter::default();
        let stopped = AtomicBool::new(false);

        source
            .records()?
            .par_bridge()
            .map(|record| {
                if control.should_stop() {
                    stopped.store(true, Ordering::Relaxed);
                    return None;
                }
                Some(record.and_then(|record| {
                    match self.strategy.apply(&record)? {
                        Some(kept) => {
                            filtered.lock().map_err(|_| poisoned())?.write_record(&kept)?;
                            trimmed.bump();
                        }
                        None => {
                            if let Some(sink) = &discarded {
                                sink.lock().map_err(|_| poisoned())?.write_record(&record)?;
                            }
                            rejected.bump();
                        }
                    }
                    control.tick(processed.bump());
                    Ok(())
                }))
            })
            .while_some()
            .collect::<Result<()>>()?;

        filtered.into_inner().map_err(|_| poisoned())?.flush()?;
        if let Some(sink) = discarded {
            sink.into_inner().map_err(|_| poisoned())?.flush()?;
        }

        let cancelled = stopped.load(Ordering::Relaxed);
        let stats = TrimStats::new(sample_name, processed.get(), trimmed.get(), rejected.get(), cancelled);
        if cancelled {
            warn!("Trimming cancelled after {} reads", stats.total_reads);
        } else {
            info!(
                "Trimmed {}/{} reads, discarded {}",
                stats.reads_trimmed, stats.total_reads, stats.reads_discarded
            );
        }
        Ok(stats)
    }
}
