//! Structure sniffing: delimiter detection and header canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Delimiter used for all silver output, distinct from anything the sniffer
/// can pick so downstream readers never have to re-sniff.
pub const CANONICAL_DELIMITER: char = ';';

/// Candidates in priority order. DVF vintages are usually pipe-delimited,
/// the rest covers the drift we have seen.
const DELIMITER_CANDIDATES: [char; 4] = ['|', ';', '\t', ','];

/// A candidate must occur more than this many times in the first line to be
/// chosen.
const DELIMITER_THRESHOLD: usize = 5;

static NON_ALNUM_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("snake pattern is valid"));

/// Derived once per raw table: the sniffed field delimiter and the canonical
/// column names in first-seen order. Column count is fixed for the schema's
/// lifetime; every accepted row must match it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub delimiter: char,
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Sniff delimiter and columns from the raw first line of a table.
    ///
    /// Never fails: any non-empty line produces a usable schema, an empty
    /// line produces the degenerate single-empty-column one. Duplicate
    /// canonicalized names are kept as-is, collisions are not deduplicated.
    pub fn sniff(first_line: &str) -> Self {
        let line = first_line.trim_end_matches('\n').trim_end_matches('\r');
        let delimiter = guess_delimiter(line);
        let columns = line.split(delimiter).map(snake_case).collect();
        Self { delimiter, columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the first column with this canonical name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Pick the field delimiter from a sample line. This is a heuristic, not a
/// guarantee: the first candidate occurring often enough wins, and a line
/// that defeats every candidate falls back to `'|'`.
pub fn guess_delimiter(sample: &str) -> char {
    for d in DELIMITER_CANDIDATES {
        if sample.matches(d).count() > DELIMITER_THRESHOLD {
            return d;
        }
    }
    '|'
}

/// Canonicalize one header cell: trim, lowercase, collapse every run of
/// non-alphanumerics into a single underscore, strip the ends.
pub fn snake_case(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    NON_ALNUM_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_cases_dvf_headers() {
        assert_eq!(snake_case("Code Postal"), "code_postal");
        assert_eq!(snake_case("  Valeur Fonciere "), "valeur_fonciere");
        assert_eq!(snake_case("No disposition"), "no_disposition");
        assert_eq!(snake_case("___"), "");
        assert_eq!(snake_case("A--B__C"), "a_b_c");
    }

    #[test]
    fn picks_first_candidate_over_threshold() {
        assert_eq!(guess_delimiter("a|b|c|d|e|f|g"), '|');
        assert_eq!(guess_delimiter("a;b;c;d;e;f;g"), ';');
        assert_eq!(guess_delimiter("a\tb\tc\td\te\tf\tg"), '\t');
        assert_eq!(guess_delimiter("a,b,c,d,e,f,g"), ',');
        // pipe has priority even when semicolons are as frequent
        assert_eq!(guess_delimiter("a|b|c|d|e|f|g;;;;;;;"), '|');
    }

    #[test]
    fn too_few_occurrences_falls_back_to_pipe() {
        assert_eq!(guess_delimiter("a,b,c"), '|');
        assert_eq!(guess_delimiter(""), '|');
    }

    #[test]
    fn sniffs_schema_from_header_line() {
        let schema = TableSchema::sniff("Code Postal|Valeur Fonciere|Date Mutation|A|B|C|D\n");
        assert_eq!(schema.delimiter, '|');
        assert_eq!(schema.columns[0], "code_postal");
        assert_eq!(schema.columns[1], "valeur_fonciere");
        assert_eq!(schema.columns[2], "date_mutation");
        assert_eq!(schema.column_count(), 7);
    }

    #[test]
    fn empty_line_yields_degenerate_schema() {
        let schema = TableSchema::sniff("");
        assert_eq!(schema.delimiter, '|');
        assert_eq!(schema.columns, vec![String::new()]);
    }

    #[test]
    fn duplicate_headers_are_kept() {
        let schema = TableSchema::sniff("A|a|b|c|d|e|f");
        assert_eq!(schema.columns[0], "a");
        assert_eq!(schema.columns[1], "a");
        assert_eq!(schema.position("a"), Some(0));
    }
}
