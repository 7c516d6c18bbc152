//! Column type inference and header sanitization for loaded CSV data.
//!
//! Types are inferred from a configurable sample of leading rows. The lattice
//! is deliberately small (INTEGER ⊂ REAL ⊂ TEXT): a column degrades to the
//! more general type as soon as one sampled value disqualifies the stricter
//! one. Blank cells and the literal `null` carry no type evidence.

use std::collections::HashSet;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// Number of leading data rows sampled for type inference (0 = full scan).
pub const DEFAULT_SAMPLE_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// True for cells that carry no evidence for inference or storage.
pub fn is_null_cell(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Infers a storage type from the first `sample_rows` cells of a column.
///
/// A single non-numeric cell settles the column as `Text` immediately. A
/// numeric cell whose text contains a decimal point, or whose parsed value
/// has a fractional part, rules out `Integer`. A column with no usable
/// evidence (all cells blank or `null`) defaults to `Text`.
pub fn infer_column_type<'a, I>(values: I, sample_rows: usize) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut saw_numeric = false;
    let mut has_decimal_point = false;
    let mut all_integer = true;

    for (processed, value) in values.into_iter().enumerate() {
        if sample_rows > 0 && processed >= sample_rows {
            break;
        }
        let Some(raw) = value else { continue };
        let cell = raw.trim();
        if is_null_cell(cell) {
            continue;
        }
        let Ok(parsed) = cell.parse::<f64>() else {
            return ColumnType::Text;
        };
        saw_numeric = true;
        if cell.contains('.') {
            has_decimal_point = true;
            all_integer = false;
        } else if parsed.fract() != 0.0 {
            all_integer = false;
        }
    }

    if !saw_numeric {
        ColumnType::Text
    } else if all_integer && !has_decimal_point {
        ColumnType::Integer
    } else {
        ColumnType::Real
    }
}

/// Maps a header to an identifier legal in the storage engine: every
/// character outside `[A-Za-z0-9_]` becomes `_`. Idempotent.
pub fn sanitize_header(header: &str) -> String {
    header
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Sanitizes a full header row, disambiguating collisions.
///
/// Two distinct original headers can sanitize to the same identifier
/// (`"a b"` and `"a.b"` both become `a_b`). The later one receives a numeric
/// suffix and the collision is surfaced as a load-time warning, so the
/// sanitized-to-original mapping stays unambiguous.
pub fn sanitize_headers<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    let mut assigned: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut sanitized = Vec::with_capacity(headers.len());
    for header in headers {
        let base = sanitize_header(header.as_ref());
        if assigned.insert(base.clone()) {
            sanitized.push(base);
            continue;
        }
        let mut suffix = 2usize;
        let unique = loop {
            let candidate = format!("{base}_{suffix}");
            if assigned.insert(candidate.clone()) {
                break candidate;
            }
            suffix += 1;
        };
        warn!(
            "Header '{}' sanitizes to '{base}' which is already taken; storing it as '{unique}'",
            header.as_ref()
        );
        sanitized.push(unique);
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[&str]) -> ColumnType {
        infer_column_type(values.iter().map(|v| Some(*v)), DEFAULT_SAMPLE_ROWS)
    }

    #[test]
    fn all_whole_numbers_infer_integer() {
        assert_eq!(infer(&["1", "2", "300"]), ColumnType::Integer);
    }

    #[test]
    fn one_decimal_point_flips_to_real() {
        assert_eq!(infer(&["1", "2.0", "300"]), ColumnType::Real);
    }

    #[test]
    fn one_non_numeric_flips_to_text() {
        assert_eq!(infer(&["1", "2.5", "abc"]), ColumnType::Text);
    }

    #[test]
    fn blank_and_null_cells_carry_no_evidence() {
        assert_eq!(infer(&["", "null", "NULL", "7"]), ColumnType::Integer);
        assert_eq!(infer(&["", "null", ""]), ColumnType::Text);
    }

    #[test]
    fn exponent_notation_without_fraction_stays_integer() {
        assert_eq!(infer(&["1e3", "2"]), ColumnType::Integer);
    }

    #[test]
    fn values_outside_sample_are_ignored() {
        let values: Vec<Option<&str>> = (0..25)
            .map(|i| if i < 20 { Some("1") } else { Some("oops") })
            .collect();
        assert_eq!(infer_column_type(values, 20), ColumnType::Integer);
    }

    #[test]
    fn sanitize_replaces_everything_outside_word_chars() {
        assert_eq!(sanitize_header("ssc p (%)"), "ssc_p____");
        assert_eq!(sanitize_header("salary"), "salary");
        assert_eq!(sanitize_header(""), "");
    }

    #[test]
    fn colliding_headers_receive_numeric_suffixes() {
        let sanitized = sanitize_headers(&["a b", "a.b", "a_b"]);
        assert_eq!(sanitized, vec!["a_b", "a_b_2", "a_b_3"]);
    }
}
