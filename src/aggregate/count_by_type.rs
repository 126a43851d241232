//! Category counting reducer.

use std::collections::HashMap;

use serde::Serialize;

/// Bucket a blank category lands in.
pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";

/// One finalized bucket. `code_postal` is only present in the
/// postal-partitioned variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_postal: Option<String>,
    pub category: String,
    pub count: u64,
}

/// Single-pass counter over canonical rows, optionally partitioned by
/// postal code. Built fresh per invocation; merging across source tables is
/// just observing them into the same counter.
#[derive(Debug, Default)]
pub struct CategoryCounter {
    counts: HashMap<(Option<String>, String), u64>,
    rows_total: u64,
}

impl CategoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row. `category` is the raw cell; blank maps to
    /// [`UNKNOWN_CATEGORY`]. Pass `postal` only in the partitioned variant.
    pub fn observe(&mut self, category: &str, postal: Option<&str>) {
        let trimmed = category.trim();
        let label = if trimmed.is_empty() {
            UNKNOWN_CATEGORY.to_string()
        } else {
            trimmed.to_string()
        };
        let key = (postal.map(|p| p.trim().to_string()), label);
        *self.counts.entry(key).or_insert(0) += 1;
        self.rows_total += 1;
    }

    pub fn rows_total(&self) -> u64 {
        self.rows_total
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Deterministic view: descending count, then postal code ascending,
    /// then category label ascending.
    pub fn finalize(self) -> Vec<CategoryCount> {
        let mut out: Vec<CategoryCount> = self
            .counts
            .into_iter()
            .map(|((code_postal, category), count)| CategoryCount {
                code_postal,
                category,
                count,
            })
            .collect();
        out.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.code_postal.cmp(&b.code_postal))
                .then_with(|| a.category.cmp(&b.category))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_categories_fall_into_unknown() {
        let mut counter = CategoryCounter::new();
        counter.observe("Maison", None);
        counter.observe("", None);
        counter.observe("   ", None);
        let counts = counter.finalize();
        assert_eq!(counts.len(), 2);
        assert!(counts
            .iter()
            .any(|c| c.category == UNKNOWN_CATEGORY && c.count == 2));
    }

    #[test]
    fn finalize_sorts_by_count_then_label() {
        let mut counter = CategoryCounter::new();
        for _ in 0..3 {
            counter.observe("Appartement", None);
        }
        for _ in 0..3 {
            counter.observe("Maison", None);
        }
        counter.observe("Dépendance", None);
        let counts = counter.finalize();
        assert_eq!(counts[0].category, "Appartement");
        assert_eq!(counts[1].category, "Maison");
        assert_eq!(counts[2].category, "Dépendance");
    }

    #[test]
    fn merging_two_disjoint_tables_is_the_union() {
        let mut counter = CategoryCounter::new();
        // table one
        counter.observe("Maison", None);
        counter.observe("Maison", None);
        // table two
        counter.observe("Local industriel", None);
        let counts = counter.finalize();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].category, "Maison");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].count, 1);
        assert_eq!(counter_total(&counts), 3);
    }

    fn counter_total(counts: &[CategoryCount]) -> u64 {
        counts.iter().map(|c| c.count).sum()
    }

    #[test]
    fn partitioned_variant_keys_by_postal_then_category() {
        let mut counter = CategoryCounter::new();
        counter.observe("Maison", Some("75001"));
        counter.observe("Maison", Some("13001"));
        counter.observe("Maison", Some("75001"));
        let counts = counter.finalize();
        assert_eq!(counts[0].code_postal.as_deref(), Some("75001"));
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].code_postal.as_deref(), Some("13001"));
    }
}
