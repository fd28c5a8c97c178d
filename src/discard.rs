//! Read discard strategies and the sequential discard driver

use crate::control::RunControl;
use crate::encoding::QualityEncoding;
use crate::error::{QcError, Result};
use crate::io::{RecordSink, RecordSource};
use crate::record::SeqRecord;
use crate::DiscardStats;
use regex::bytes::Regex;
use tracing::{info, warn};

/// Configured discard strategy
#[derive(Debug, Clone)]
pub enum DiscardStrategy {
    /// Discard reads shorter than the minimum
    Length { min_length: usize },
    /// Discard reads whose mean Phred score is below the threshold
    MeanQuality { threshold: u8, encoding: QualityEncoding },
    /// Discard reads whose sequence matches the pattern anywhere
    Regex(Regex),
}

impl DiscardStrategy {
    pub fn by_length(min_length: usize) -> Result<Self> {
        if min_length == 0 {
            return Err(QcError::invalid("length", "minimum length must be positive"));
        }
        Ok(DiscardStrategy::Length { min_length })
    }

    pub fn by_mean_quality(threshold: u8, encoding: QualityEncoding) -> Result<Self> {
        if threshold == 0 || threshold > encoding.max_phred() {
            return Err(QcError::invalid(
                "mean quality",
                format!("must be within 1..={} for {}", encoding.max_phred(), encoding),
            ));
        }
        Ok(DiscardStrategy::MeanQuality { threshold, encoding })
    }

    pub fn by_regex(pattern: &str) -> Result<Self> {
        Ok(DiscardStrategy::Regex(Regex::new(pattern)?))
    }

    pub fn can_discard(&self, record: &SeqRecord) -> Result<bool> {
        match self {
            DiscardStrategy::Length { min_length } => Ok(record.len() < *min_length),
            DiscardStrategy::MeanQuality { threshold, encoding } => {
                let mean = encoding.mean_phred(record.require_quality()?)?;
                Ok(mean < *threshold as f64)
            }
            DiscardStrategy::Regex(pattern) => Ok(pattern.is_match(&record.sequence)),
        }
    }

    pub fn requires_quality(&self) -> bool {
        matches!(self, DiscardStrategy::MeanQuality { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiscardStrategy::Length { .. } => "length",
            DiscardStrategy::MeanQuality { .. } => "mean quality",
            DiscardStrategy::Regex(_) => "regex",
        }
    }
}

/// Splits a source into kept and discarded records
#[derive(Debug, Clone)]
pub struct Discarder {
    strategy: DiscardStrategy,
}

impl Discarder {
    pub fn new(strategy: DiscardStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &DiscardStrategy {
        &self.strategy
    }

    pub fn can_discard(&self, record: &SeqRecord) -> Result<bool> {
        self.strategy.can_discard(record)
    }

    /// Route every record to `filtered` or `discarded`, in input order
    pub fn discard_reads<S>(
        &self,
        source: &S,
        filtered: &mut dyn RecordSink,
        mut discarded: Option<&mut dyn RecordSink>,
        control: &RunControl,
        sample_name: &str,
    ) -> Result<DiscardStats>
    where
        S: RecordSource + ?Sized,
    {
        info!("Discarding from {} by {}", sample_name, self.strategy.name());
        let mut processed = 0u64;
        let mut rejected = 0u64;
        let mut cancelled = false;

        for record in source.records()? {
            if control.should_stop() {
                cancelled = true;
                break;
            }
            let record = record?;
            if self.strategy.can_discard(&record)? {
                if let Some(sink) = discarded.as_deref_mut() {
                    sink.write_record(&record)?;
                }
                rejected += 1;
            } else {
                filtered.write_record(&record)?;
            }
            processed += 1;
            control.tick(processed);
        }

        filtered.flush()?;
        if let Some(sink) = discarded.as_deref_mut() {
            sink.flush()?;
        }

        let stats = DiscardStats::new(sample_name, processed, rejected, cancelled);
        if cancelled {
            warn!("Discarding cancelled after {} reads", processed);
        } else {
            info!("Discarded {}/{} reads", rejected, processed);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancellationToken;
    use std::sync::Arc;
    use proptest::prelude::*;

    fn read(seq: &str, qual: &str) -> SeqRecord {
        SeqRecord::with_quality("read", seq.as_bytes().to_vec(), qual.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_discard_by_length() {
        let strategy = DiscardStrategy::by_length(5).unwrap();
        assert!(strategy.can_discard(&read("ACG", "III")).unwrap());
        assert!(!strategy.can_discard(&read("ACGTACGTAC", "IIIIIIIIII")).unwrap());
        assert!(!strategy.can_discard(&read("ACGTA", "IIIII")).unwrap());
        assert!(DiscardStrategy::by_length(0).is_err());
    }

    #[test]
    fn test_discard_by_mean_quality() {
        let strategy = DiscardStrategy::by_mean_quality(20, QualityEncoding::Sanger).unwrap();
        // mean of 0 and 40 is exactly the threshold
        assert!(!strategy.can_discard(&read("AC", "!I")).unwrap());
        assert!(strategy.can_discard(&read("AC", "!5")).unwrap());
        let fasta = SeqRecord::without_quality("r", b"AC".to_vec());
        assert!(matches!(strategy.can_discard(&fasta), Err(QcError::MissingQuality { .. })));
    }

    #[test]
    fn test_mean_quality_threshold_bounds() {
        assert!(DiscardStrategy::by_mean_quality(0, QualityEncoding::Sanger).is_err());
        assert!(DiscardStrategy::by_mean_quality(93, QualityEncoding::Sanger).is_ok());
        assert!(DiscardStrategy::by_mean_quality(94, QualityEncoding::Sanger).is_err());
    }

    #[test]
    fn test_discard_by_regex() {
        let strategy = DiscardStrategy::by_regex("GATTACA").unwrap();
        assert!(strategy.can_discard(&read("TTGATTACATT", "IIIIIIIIIII")).unwrap());
        assert!(!strategy.can_discard(&read("TTTT", "IIII")).unwrap());
        assert!(matches!(DiscardStrategy::by_regex("[AC"), Err(QcError::InvalidPattern(_))));
    }

    #[test]
    fn test_discard_reads_preserves_order() {
        let source: Vec<SeqRecord> = (0..20)
            .map(|i| SeqRecord::without_quality(format!("r{}", i), vec![b'C'; i]))
            .collect();
        let discarder = Discarder::new(DiscardStrategy::by_length(10).unwrap());
        let mut kept: Vec<SeqRecord> = Vec::new();
        let mut dropped: Vec<SeqRecord> = Vec::new();
        let stats = discarder
            .discard_reads(&source, &mut kept, Some(&mut dropped), &RunControl::default(), "s")
            .unwrap();

        assert_eq!(stats.total_reads, 20);
        assert_eq!(stats.reads_discarded, 10);
        assert_eq!(stats.reads_passed, 10);
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids[0], "r10");
        assert_eq!(ids[9], "r19");
        assert_eq!(dropped[0].id, "r0");
    }

    #[test]
    fn test_discard_reads_cancelled() {
        let source = vec![read("ACGT", "IIII"); 5];
        let discarder = Discarder::new(DiscardStrategy::by_length(2).unwrap());
        let token = CancellationToken::new();
        token.cancel();
        let mut kept: Vec<SeqRecord> = Vec::new();
        let stats = discarder
            .discard_reads(&source, &mut kept, None, &RunControl::new(token), "s")
            .unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.total_reads, 0);
    }

    #[test]
    fn test_discard_reads_cancelled_part_way() {
        let source: Vec<SeqRecord> = (0..10)
            .map(|i| SeqRecord::without_quality(format!("r{}", i), vec![b'A'; i]))
            .collect();
        let discarder = Discarder::new(DiscardStrategy::by_length(3).unwrap());
        let token = CancellationToken::new();
        let trigger = token.clone();
        let control = RunControl::new(token).with_progress(
            1,
            Arc::new(move |done: u64| {
                if done == 6 {
                    trigger.cancel();
                }
            }),
        );
        let mut kept: Vec<SeqRecord> = Vec::new();
        let mut dropped: Vec<SeqRecord> = Vec::new();
        let stats = discarder
            .discard_reads(&source, &mut kept, Some(&mut dropped), &control, "s")
            .unwrap();

        assert!(stats.cancelled);
        assert_eq!(stats.total_reads, 6);
        assert_eq!(stats.reads_discarded, 3);
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r4", "r5"]);
        assert_eq!(dropped.len(), 3);
    }

    proptest! {
        #[test]
        fn test_length_rule(length in 0usize..300, threshold in 1usize..300) {
            let strategy = DiscardStrategy::by_length(threshold).unwrap();
            let record = SeqRecord::without_quality("r", vec![b'A'; length]);
            prop_assert_eq!(strategy.can_discard(&record).unwrap(), length < threshold);
        }
    }
}
