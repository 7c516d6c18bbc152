//! Merges the physical schema (what the engine actually created) with the
//! curated reference schema into the natural-language schema text handed to
//! the generative API.
//!
//! The physical side is authoritative for names and order: the generator
//! must see exactly the sanitized identifiers it is allowed to use. The
//! reference side contributes richer types and per-column descriptions, but
//! only when the loaded headers look like the reference dataset at all — an
//! unrelated upload gets a generic description instead, so the generator is
//! not steered toward domain columns that don't exist.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::{infer, reference::ReferenceSchema, store::TableColumn};

/// A dataset is treated as related to the reference schema when at least
/// this share of the smaller header set's names is recognized.
pub const DEFAULT_RELATEDNESS_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    pub relatedness_threshold: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            relatedness_threshold: DEFAULT_RELATEDNESS_THRESHOLD,
        }
    }
}

/// Decides whether the reference schema applies to the loaded headers.
///
/// The bundled sample is related by definition. Otherwise the overlap
/// between lowercased original headers and reference keys must reach the
/// configured share of `min(|reference|, |headers|)`.
pub fn is_related_to_reference(
    original_headers: &[String],
    reference: &ReferenceSchema,
    from_sample: bool,
    config: &ReconcilerConfig,
) -> bool {
    if from_sample || original_headers.is_empty() {
        return true;
    }
    let overlap = original_headers
        .iter()
        .filter(|h| reference.columns.contains_key(&h.to_lowercase()))
        .count();
    let smaller = reference.columns.len().min(original_headers.len());
    !((overlap as f64) < (smaller as f64) * config.relatedness_threshold)
}

/// Builds the schema text for the generative API.
///
/// One line per physical column, in physical order. A column whose original
/// header matches a reference column gets the reference type and
/// description (keyed to the sanitized name, which is what must appear in
/// generated SQL); anything else falls back to the inferred type plus the
/// engine's primary-key / NOT NULL flags.
pub fn build_ai_schema(
    table_name: &str,
    physical_columns: &[TableColumn],
    original_headers: &[String],
    reference: &ReferenceSchema,
    from_sample: bool,
    config: &ReconcilerConfig,
) -> String {
    let sanitized = infer::sanitize_headers(original_headers);
    let sanitized_to_original: HashMap<&str, &str> = sanitized
        .iter()
        .zip(original_headers)
        .map(|(s, o)| (s.as_str(), o.as_str()))
        .collect();

    let related = is_related_to_reference(original_headers, reference, from_sample, config);

    let mut schema_text = format!("Table Name: {table_name}\n");
    let description = if related {
        reference.table_description.as_str()
    } else {
        "Custom user-provided data. Only use column names explicitly listed below for queries."
    };
    let _ = writeln!(schema_text, "Description: {description}");
    schema_text.push_str("Columns:\n");

    if physical_columns.is_empty() {
        schema_text.push_str("- No columns found or table is not initialized. Cannot query.\n");
        return schema_text;
    }

    for column in physical_columns {
        let matched = sanitized_to_original
            .get(column.name.as_str())
            .and_then(|original| reference.column(original));
        let line = match matched {
            Some(reference_column) => format!(
                "- {}: {} {}",
                column.name, reference_column.type_token, reference_column.description
            ),
            None => {
                let mut line =
                    format!("- {}: {}", column.name, column.column_type.to_uppercase());
                if column.primary_key {
                    line.push_str(" (Primary Key)");
                }
                if column.not_null {
                    line.push_str(" NOT NULL");
                }
                line
            }
        };
        let _ = writeln!(schema_text, "{}", line.trim_end());
    }
    schema_text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_column(name: &str, column_type: &str) -> TableColumn {
        TableColumn {
            position: 0,
            name: name.to_string(),
            column_type: column_type.to_string(),
            not_null: false,
            default_value: None,
            primary_key: false,
        }
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn half_overlap_counts_as_related() {
        let reference =
            ReferenceSchema::parse("columns:\n- a: TEXT\n- b: TEXT\n- c: TEXT\n- d: TEXT");
        let config = ReconcilerConfig::default();
        // Overlap 2 against min size 4: threshold is exactly 2.0, still related.
        assert!(is_related_to_reference(
            &headers(&["a", "b", "x", "y"]),
            &reference,
            false,
            &config
        ));
        assert!(!is_related_to_reference(
            &headers(&["x", "y", "z", "w"]),
            &reference,
            false,
            &config
        ));
    }

    #[test]
    fn sample_dataset_is_always_related() {
        let reference = ReferenceSchema::parse("columns:\n- a: TEXT");
        assert!(is_related_to_reference(
            &headers(&["p", "q", "r"]),
            &reference,
            true,
            &ReconcilerConfig::default()
        ));
    }

    #[test]
    fn matched_columns_use_reference_type_and_description() {
        let reference = ReferenceSchema::parse(
            "description: Test data.\ncolumns:\n- sl_no: INTEGER (Serial Number)",
        );
        let schema_text = build_ai_schema(
            "Placement",
            &[table_column("sl_no", "INTEGER")],
            &headers(&["sl_no"]),
            &reference,
            true,
            &ReconcilerConfig::default(),
        );
        assert!(schema_text.contains("Description: Test data."));
        assert!(schema_text.contains("- sl_no: INTEGER (Serial Number)"));
    }

    #[test]
    fn unmatched_columns_fall_back_to_engine_metadata() {
        let reference = ReferenceSchema::parse("columns:\n- other: TEXT");
        let mut column = table_column("score", "real");
        column.not_null = true;
        let schema_text = build_ai_schema(
            "Placement",
            &[column],
            &headers(&["score"]),
            &reference,
            true,
            &ReconcilerConfig::default(),
        );
        assert!(schema_text.contains("- score: REAL NOT NULL"));
    }

    #[test]
    fn unrelated_dataset_gets_generic_description() {
        let reference = ReferenceSchema::parse(
            "description: Placement domain.\ncolumns:\n- a: TEXT\n- b: TEXT",
        );
        let schema_text = build_ai_schema(
            "Placement",
            &[table_column("x", "TEXT")],
            &headers(&["x"]),
            &reference,
            false,
            &ReconcilerConfig::default(),
        );
        assert!(schema_text.contains("Custom user-provided data."));
        assert!(!schema_text.contains("Placement domain."));
    }

    #[test]
    fn no_columns_yields_explanatory_line() {
        let reference = ReferenceSchema::parse("");
        let schema_text = build_ai_schema(
            "Placement",
            &[],
            &[],
            &reference,
            false,
            &ReconcilerConfig::default(),
        );
        assert!(schema_text.contains("No columns found"));
    }
}
