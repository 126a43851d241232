//! Logical-column resolution against drifting silver headers.
//!
//! Different DVF vintages name the same concept differently; each logical
//! column carries an ordered alias list and resolves to the first alias
//! present in the actual header, case-insensitively.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Category of the transaction (building type or mutation nature).
pub const CATEGORY_COLUMNS: &[&str] = &[
    "type_local",
    "type local",
    "nature_mutation",
    "nature mutation",
];

/// Monetary value of the transaction.
pub const VALUE_COLUMNS: &[&str] = &["valeur_fonciere", "valeur fonciere"];

/// Surface area, built or land.
pub const AREA_COLUMNS: &[&str] = &[
    "surface_reelle_bati",
    "surface reelle bati",
    "surface_terrain",
    "surface terrain",
];

/// Postal code of the property.
pub const POSTAL_COLUMNS: &[&str] = &["code_postal", "code postal"];

/// Resolve one logical column to its position in `header`, trying aliases in
/// order. Returns `None` when no alias matches; callers skip the source
/// table and count an error rather than aborting the invocation.
pub fn resolve_column(header: &[String], candidates: &[&str]) -> Option<usize> {
    let lower: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, c)| (c.to_lowercase(), i))
        .collect();
    candidates
        .iter()
        .find_map(|cand| lower.get(&cand.to_lowercase()).copied())
}

/// Like [`resolve_column`] but required: absence is a structural error
/// naming the aliases that were tried.
pub fn require_column(header: &[String], candidates: &[&str]) -> Result<usize> {
    resolve_column(header, candidates).ok_or_else(|| {
        PipelineError::ColumnNotFound(candidates.iter().map(|s| s.to_string()).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_first_alias_present() {
        let h = header(&["date_mutation", "type_local", "nature_mutation"]);
        assert_eq!(resolve_column(&h, CATEGORY_COLUMNS), Some(1));

        // older vintage only carries nature_mutation
        let h = header(&["date_mutation", "nature_mutation"]);
        assert_eq!(resolve_column(&h, CATEGORY_COLUMNS), Some(1));
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let h = header(&["Type_Local", "Valeur Fonciere"]);
        assert_eq!(resolve_column(&h, CATEGORY_COLUMNS), Some(0));
        assert_eq!(resolve_column(&h, VALUE_COLUMNS), Some(1));
    }

    #[test]
    fn area_prefers_built_surface_over_land() {
        let h = header(&["surface_terrain", "surface_reelle_bati"]);
        assert_eq!(resolve_column(&h, AREA_COLUMNS), Some(1));
    }

    #[test]
    fn missing_column_is_a_structural_error() {
        let h = header(&["a", "b"]);
        assert_eq!(resolve_column(&h, VALUE_COLUMNS), None);
        assert!(matches!(
            require_column(&h, VALUE_COLUMNS),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn duplicate_header_names_resolve_to_the_last_occurrence() {
        // lowercased map construction keeps the last duplicate; recorded
        // behavior, see DESIGN.md
        let h = header(&["type_local", "x", "type_local"]);
        assert_eq!(resolve_column(&h, CATEGORY_COLUMNS), Some(2));
    }
}
