//! Price-per-area reducer.

/// Running mean of per-row `value / area` ratios.
///
/// A row contributes only when both cells parse, the area is strictly
/// positive and the value is non-negative. This is deliberately the mean of
/// ratios, not the ratio of sums; the statistic is a domain decision carried
/// over as-is.
#[derive(Debug, Default)]
pub struct PriceMeanAccumulator {
    sum_ratio: f64,
    rows_used: u64,
    rows_total: u64,
}

impl PriceMeanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one row's parsed value and area cells.
    pub fn observe(&mut self, value: Option<f64>, area: Option<f64>) {
        self.rows_total += 1;
        let (value, area) = match (value, area) {
            (Some(v), Some(a)) => (v, a),
            _ => return,
        };
        if area <= 0.0 || value < 0.0 {
            return;
        }
        self.sum_ratio += value / area;
        self.rows_used += 1;
    }

    pub fn rows_total(&self) -> u64 {
        self.rows_total
    }

    pub fn rows_used(&self) -> u64 {
        self.rows_used
    }

    /// Finalized mean, or `None` when no row qualified.
    pub fn mean(&self) -> Option<f64> {
        if self.rows_used == 0 {
            None
        } else {
            Some(self.sum_ratio / self.rows_used as f64)
        }
    }
}
