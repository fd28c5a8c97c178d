//! Per-position boxplot statistics over the quality matrix
//!
//! Quartiles use linear interpolation between order statistics. Whiskers
//! start at 1.5 IQR beyond the quartiles and are pulled in to the most
//! extreme observation inside that bound.

use crate::analyzer::quality::ABSENT;
use crate::control::RunControl;
use crate::error::{QcError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Boxplot parameters for one read position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub low_whisker: f64,
    pub high_whisker: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub mean: f64,
    pub median: f64,
    pub outliers_low: Vec<u8>,
    pub outliers_high: Vec<u8>,
    /// Number of real (non-padding) observations
    pub observations: usize,
}

impl PositionSummary {
    /// Summary of a position with no observations
    pub fn empty() -> Self {
        Self {
            low_whisker: f64::NAN,
            high_whisker: f64::NAN,
            lower_quartile: f64::NAN,
            upper_quartile: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
            outliers_low: Vec::new(),
            outliers_high: Vec::new(),
            observations: 0,
        }
    }

    /// Summarize one position's block of the matrix, skipping padding
    pub fn from_block(block: &[u8]) -> Self {
        let mut values: Vec<u8> = block.iter().copied().filter(|&v| v != ABSENT).collect();
        if values.is_empty() {
            return Self::empty();
        }
        values.sort_unstable();
        Self::from_sorted(&values)
    }

    fn from_sorted(values: &[u8]) -> Self {
        let lower_quartile = quantile(values, 0.25);
        let median = quantile(values, 0.5);
        let upper_quartile = quantile(values, 0.75);
        let iqr = upper_quartile - lower_quartile;
        let low_bound = lower_quartile - 1.5 * iqr;
        let high_bound = upper_quartile + 1.5 * iqr;

        let low_whisker = values
            .iter()
            .map(|&v| v as f64)
            .find(|&v| v >= low_bound)
            .unwrap_or(low_bound);
        let high_whisker = values
            .iter()
            .rev()
            .map(|&v| v as f64)
            .find(|&v| v <= high_bound)
            .unwrap_or(high_bound);

        let outliers_low = values
            .iter()
            .copied()
            .take_while(|&v| (v as f64) < low_whisker)
            .collect();
        let outliers_high = values
            .iter()
            .copied()
            .filter(|&v| (v as f64) > high_whisker)
            .collect();

        let mean = values.iter().map(|&v| v as u64).sum::<u64>() as f64 / values.len() as f64;

        Self {
            low_whisker,
            high_whisker,
            lower_quartile,
            upper_quartile,
            mean,
            median,
            outliers_low,
            outliers_high,
            observations: values.len(),
        }
    }
}

/// Linearly interpolated percentile of sorted, non-empty values
pub fn quantile(sorted: &[u8], percentile: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * percentile;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let low_value = sorted[lower] as f64;
    let high_value = sorted[upper] as f64;
    low_value + (high_value - low_value) * (position - lower as f64)
}

/// Boxplot summaries for every position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxPlot {
    pub positions: Vec<PositionSummary>,
    /// Positions left empty because the run was cancelled
    pub cancelled: bool,
}

impl BoxPlot {
    pub(crate) fn cancelled(positions: usize) -> Self {
        Self {
            positions: vec![PositionSummary::empty(); positions],
            cancelled: true,
        }
    }
}

/// Compute boxplot summaries from a position-major matrix
///
/// `matrix` holds `max_read_length` blocks of `read_count` values. Positions
/// are independent and computed in parallel.
pub fn compute(matrix: &[u8], read_count: usize, max_read_length: usize, control: &RunControl) -> Result<BoxPlot> {
    let expected = read_count
        .checked_mul(max_read_length)
        .ok_or(QcError::IndexOverflow {
            positions: max_read_length,
            reads: read_count,
        })?;
    if read_count == 0 || matrix.len() != expected {
        return Err(QcError::invalid(
            "matrix",
            format!(
                "expected {} x {} values, got {}",
                max_read_length,
                read_count,
                matrix.len()
            ),
        ));
    }

    let stopped = AtomicBool::new(false);
    let computed: Vec<(usize, PositionSummary)> = matrix
        .par_chunks(read_count)
        .enumerate()
        .map(|(position, block)| {
            if control.should_stop() {
                stopped.store(true, Ordering::Relaxed);
                return None;
            }
            Some((position, PositionSummary::from_block(block)))
        })
        .while_some()
        .collect();

    let mut positions = vec![PositionSummary::empty(); max_read_length];
    for (position, summary) in computed {
        positions[position] = summary;
    }

    let cancelled = stopped.load(Ordering::Relaxed);
    if cancelled {
        warn!("Boxplot computation cancelled");
    } else {
        info!("Computed boxplots for {} positions", max_read_length);
    }
    Ok(BoxPlot { positions, cancelled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancellationToken;
    use proptest::prelude::*;

    #[test]
    fn test_quantile_interpolation() {
        let values = [1, 2, 3, 4];
        assert_eq!(quantile(&values, 0.25), 1.75);
        assert_eq!(quantile(&values, 0.5), 2.5);
        assert_eq!(quantile(&values, 0.75), 3.25);
        assert_eq!(quantile(&[7], 0.5), 7.0);
    }

    #[test]
    fn test_outliers_and_refined_whiskers() {
        let block = [20, 21, 22, 23, 24, 25, 26, 2, 40, ABSENT];
        let summary = PositionSummary::from_block(&block);
        // sorted: 2 20 21 22 23 24 25 26 40; Q1 21, Q3 25, bounds 15..31
        assert_eq!(summary.observations, 9);
        assert_eq!(summary.lower_quartile, 21.0);
        assert_eq!(summary.median, 23.0);
        assert_eq!(summary.upper_quartile, 25.0);
        assert_eq!(summary.low_whisker, 20.0);
        assert_eq!(summary.high_whisker, 26.0);
        assert_eq!(summary.outliers_low, vec![2]);
        assert_eq!(summary.outliers_high, vec![40]);
    }

    #[test]
    fn test_padding_only_position_is_nan() {
        let summary = PositionSummary::from_block(&[ABSENT, ABSENT]);
        assert_eq!(summary.observations, 0);
        assert!(summary.median.is_nan());
        assert!(summary.outliers_low.is_empty());
    }

    #[test]
    fn test_compute_over_matrix() {
        // two positions, three reads
        let matrix = [10, 20, 30, 40, ABSENT, ABSENT];
        let plot = compute(&matrix, 3, 2, &RunControl::default()).unwrap();
        assert!(!plot.cancelled);
        assert_eq!(plot.positions[0].median, 20.0);
        assert_eq!(plot.positions[1].median, 40.0);
        assert_eq!(plot.positions[1].observations, 1);
    }

    #[test]
    fn test_compute_rejects_bad_dimensions() {
        let result = compute(&[1, 2, 3], 2, 2, &RunControl::default());
        assert!(matches!(result, Err(QcError::InvalidParameter { .. })));
    }

    #[test]
    fn test_compute_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let plot = compute(&[1, 2, 3, 4], 2, 2, &RunControl::new(token)).unwrap();
        assert!(plot.cancelled);
        assert_eq!(plot.positions.len(), 2);
    }

    proptest! {
        #[test]
        fn test_boxplot_ordering(values in prop::collection::vec(0u8..=93, 1..200)) {
            let summary = PositionSummary::from_block(&values);
            prop_assert!(summary.lower_quartile <= summary.median);
            prop_assert!(summary.median <= summary.upper_quartile);

            let iqr = summary.upper_quartile - summary.lower_quartile;
            let low_bound = summary.lower_quartile - 1.5 * iqr;
            let high_bound = summary.upper_quartile + 1.5 * iqr;
            let low_side = values.iter().any(|&v| (v as f64) >= low_bound && (v as f64) <= summary.lower_quartile);
            let high_side = values.iter().any(|&v| (v as f64) <= high_bound && (v as f64) >= summary.upper_quartile);
            if low_side {
                prop_assert!(summary.low_whisker <= summary.lower_quartile);
            }
            if high_side {
                prop_assert!(summary.upper_quartile <= summary.high_whisker);
            }
            prop_assert_eq!(
                summary.outliers_low.len() + summary.outliers_high.len()
                    + values.iter().filter(|&&v| (v as f64) >= summary.low_whisker && (v as f64) <= summary.high_whisker).count(),
                values.len()
            );
        }
    }
}
