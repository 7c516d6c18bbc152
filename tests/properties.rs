//! Property tests for the pure pieces of the pipeline: header sanitization,
//! type inference monotonicity, and reference-parser totality.

use proptest::prelude::*;
use query_bridge::infer::{self, ColumnType};
use query_bridge::reference::ReferenceSchema;

proptest! {
    #[test]
    fn sanitize_is_idempotent(header in "\\PC*") {
        let once = infer::sanitize_header(&header);
        prop_assert_eq!(infer::sanitize_header(&once), once.clone());
        prop_assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn integer_columns_infer_integer(values in proptest::collection::vec(-1000i64..1000, 1..20)) {
        let cells: Vec<String> = values.iter().map(ToString::to_string).collect();
        let inferred = infer::infer_column_type(
            cells.iter().map(|c| Some(c.as_str())),
            infer::DEFAULT_SAMPLE_ROWS,
        );
        prop_assert_eq!(inferred, ColumnType::Integer);
    }

    #[test]
    fn one_decimal_value_degrades_to_real(
        values in proptest::collection::vec(-1000i64..1000, 1..10),
        position in 0usize..10,
    ) {
        let mut cells: Vec<String> = values.iter().map(ToString::to_string).collect();
        let position = position % cells.len();
        cells.insert(position, "1.5".to_string());
        let inferred = infer::infer_column_type(
            cells.iter().map(|c| Some(c.as_str())),
            infer::DEFAULT_SAMPLE_ROWS,
        );
        prop_assert_eq!(inferred, ColumnType::Real);
    }

    #[test]
    fn one_word_degrades_to_text(
        values in proptest::collection::vec(-1000i64..1000, 1..10),
        position in 0usize..10,
    ) {
        let mut cells: Vec<String> = values.iter().map(ToString::to_string).collect();
        let position = position % cells.len();
        cells.insert(position, "word".to_string());
        let inferred = infer::infer_column_type(
            cells.iter().map(|c| Some(c.as_str())),
            infer::DEFAULT_SAMPLE_ROWS,
        );
        prop_assert_eq!(inferred, ColumnType::Text);
    }

    #[test]
    fn reference_parser_is_total(document in "\\PC*") {
        // Arbitrary input must parse without panicking and yield defaults at worst.
        let schema = ReferenceSchema::parse(&document);
        prop_assert!(!schema.table_name.is_empty());
    }
}
