//! Heuristic validation of generated SQL against the physical schema.
//!
//! The generative API carries no hard guarantee of schema fidelity; its
//! dominant failure mode is referencing columns that do not exist. This
//! module tokenizes the SQL text (it is not a parser), extracts candidate
//! identifiers, and diffs them against the actual column set so a bad query
//! is rejected before it ever reaches the storage engine.
//!
//! Known trade-offs, accepted by design: aliases survive extraction and can
//! produce false rejections only if they shadow nothing real (they are
//! reported as missing), and reserved words absent from the keyword list
//! leak through as candidates. The keyword and aggregate lists are plain
//! constants so they can be tuned without touching the extraction logic.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Tokens never treated as column candidates, beyond the table name itself.
pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "ON", "GROUP", "BY",
    "ORDER", "ASC", "DESC", "LIMIT", "OFFSET", "HAVING", "AS", "DISTINCT", "COUNT", "SUM", "AVG",
    "MIN", "MAX", "CASE", "WHEN", "THEN", "ELSE", "END", "AND", "OR", "NOT", "IN", "LIKE",
    "BETWEEN", "IS", "NULL", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "ALTER", "DROP", "INDEX", "VIEW", "WITH", "UNION", "ALL",
];

/// Aggregate function names excluded from the missing-column check.
pub const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Punctuation flattened to whitespace before tokenizing.
const PUNCTUATION: &[char] = &[
    '(', ')', ',', '.', '=', '*', ';', '<', '>', '!', '+', '-', '/', '%',
];

/// Tunable exclusion lists for identifier extraction and validation.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub keywords: HashSet<String>,
    pub aggregates: HashSet<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            keywords: SQL_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            aggregates: AGGREGATE_FUNCTIONS.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

/// A generated query referenced columns missing from the loaded dataset.
#[derive(Debug, Error)]
#[error(
    "the generated query references columns that don't exist in the current dataset: {}. \
     Rephrase the question, check the data, or make sure the schema reflects it.",
    .columns.join(", ")
)]
pub struct UnknownColumns {
    pub columns: Vec<String>,
}

fn single_quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'[^']*'").expect("static pattern"))
}

fn double_quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"]*""#).expect("static pattern"))
}

fn line_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--.*").expect("static pattern"))
}

fn block_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("static pattern"))
}

fn identifier_shaped(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Pulls candidate column identifiers out of a SQL statement.
///
/// String literals and comments are stripped first (escaped quotes inside
/// literals are not handled — a documented limitation of the heuristic),
/// punctuation is flattened to whitespace, and the uppercased tokens are
/// filtered down to identifier-shaped words that are neither keywords, the
/// table name, nor numeric literals.
pub fn extract_identifiers(
    sql: &str,
    table_name: &str,
    config: &ValidatorConfig,
) -> BTreeSet<String> {
    let stripped = single_quoted_regex().replace_all(sql, " ");
    let stripped = double_quoted_regex().replace_all(&stripped, " ");
    let stripped = line_comment_regex().replace_all(&stripped, " ");
    let stripped = block_comment_regex().replace_all(&stripped, " ");

    let table_upper = table_name.to_uppercase();
    stripped
        .to_uppercase()
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .filter(|token| !config.keywords.contains(*token))
        .filter(|token| *token != table_upper)
        .filter(|token| token.parse::<f64>().is_err())
        .filter(|token| identifier_shaped(token))
        .map(str::to_string)
        .collect()
}

/// Diffs candidate identifiers against the actual physical column names.
///
/// Aggregate function names and tokens that are substrings of the table name
/// are dropped from the candidates first. Survivors that match no actual
/// column (compared uppercased) are the missing columns; a non-empty result
/// means the query must not be executed.
pub fn find_missing_columns(
    identifiers: &BTreeSet<String>,
    table_name: &str,
    actual_columns: &[String],
    config: &ValidatorConfig,
) -> BTreeSet<String> {
    let table_upper = table_name.to_uppercase();
    let actual: HashSet<String> = actual_columns.iter().map(|c| c.to_uppercase()).collect();
    identifiers
        .iter()
        .filter(|token| !config.aggregates.contains(*token))
        .filter(|token| !table_upper.contains(token.as_str()))
        .filter(|token| !actual.contains(*token))
        .cloned()
        .collect()
}

/// Convenience wrapper: extract, diff, and reject in one step.
pub fn check_columns(
    sql: &str,
    table_name: &str,
    actual_columns: &[String],
    config: &ValidatorConfig,
) -> Result<(), UnknownColumns> {
    let identifiers = extract_identifiers(sql, table_name, config);
    let missing = find_missing_columns(&identifiers, table_name, actual_columns, config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(UnknownColumns {
            columns: missing.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(sql: &str) -> BTreeSet<String> {
        extract_identifiers(sql, "Placement", &ValidatorConfig::default())
    }

    #[test]
    fn keywords_numbers_and_table_name_are_dropped() {
        let identifiers = extract("SELECT salary FROM Placement WHERE salary > 100000 LIMIT 5");
        assert_eq!(identifiers.len(), 1);
        assert!(identifiers.contains("SALARY"));
    }

    #[test]
    fn string_literals_and_comments_do_not_produce_candidates() {
        let identifiers = extract(
            "SELECT gender -- trailing ghost_one\n\
             FROM Placement /* ghost_two */ WHERE status = 'ghost_three'",
        );
        assert_eq!(
            identifiers,
            BTreeSet::from(["GENDER".to_string(), "STATUS".to_string()])
        );
    }

    #[test]
    fn punctuation_splits_adjacent_identifiers() {
        let identifiers = extract("SELECT MAX(salary),AVG(mba_p) FROM Placement");
        assert!(identifiers.contains("SALARY"));
        assert!(identifiers.contains("MBA_P"));
        // MAX and AVG are in the keyword list and never surface.
        assert!(!identifiers.contains("MAX"));
    }

    #[test]
    fn missing_columns_are_reported_uppercased() {
        let actual = vec!["sl_no".to_string(), "gender".to_string(), "salary".to_string()];
        let config = ValidatorConfig::default();
        let identifiers = extract("SELECT ghost_col FROM Placement");
        let missing = find_missing_columns(&identifiers, "Placement", &actual, &config);
        assert_eq!(missing, BTreeSet::from(["GHOST_COL".to_string()]));
    }

    #[test]
    fn legal_query_passes_check() {
        let actual = vec!["gender".to_string(), "status".to_string()];
        let result = check_columns(
            "SELECT gender, COUNT(*) FROM Placement GROUP BY gender",
            "Placement",
            &actual,
            &ValidatorConfig::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn table_name_substrings_are_not_flagged() {
        let actual = vec!["gender".to_string()];
        let config = ValidatorConfig::default();
        let identifiers = BTreeSet::from(["PLACE".to_string(), "GENDER".to_string()]);
        let missing = find_missing_columns(&identifiers, "Placement", &actual, &config);
        assert!(missing.is_empty());
    }
}
