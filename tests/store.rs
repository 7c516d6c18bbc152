mod common;

use std::io::Cursor;

use query_bridge::infer::ColumnType;
use query_bridge::store::{LoadOptions, LoadOutcome, QueryOutput, Session};

fn sample_session() -> Session {
    let mut session = Session::new("Placement").expect("open session");
    session.load_sample().expect("load sample");
    session
}

fn query_rows(session: &Session, sql: &str) -> (Vec<String>, Vec<Vec<rusqlite::types::Value>>) {
    match session.execute(sql).expect("execute") {
        QueryOutput::Rows { columns, rows } => (columns, rows),
        QueryOutput::Affected(n) => panic!("Expected rows, got {n} affected"),
    }
}

#[test]
fn sample_dataset_infers_expected_types() {
    let session = sample_session();
    let dataset = session.dataset().expect("dataset loaded");
    assert!(dataset.from_sample);
    assert_eq!(dataset.columns.len(), 15);
    assert_eq!(dataset.rows_loaded, 5);
    assert_eq!(dataset.rows_skipped, 0);

    let type_of = |name: &str| {
        dataset
            .columns
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("column {name}"))
            .column_type
    };
    assert_eq!(type_of("sl_no"), ColumnType::Integer);
    assert_eq!(type_of("ssc_p"), ColumnType::Real);
    assert_eq!(type_of("gender"), ColumnType::Text);
    assert_eq!(type_of("salary"), ColumnType::Real);
}

#[test]
fn empty_salary_is_stored_as_null() {
    let session = sample_session();
    let (_, rows) = query_rows(
        &session,
        "SELECT COUNT(*) FROM Placement WHERE salary IS NULL",
    );
    assert_eq!(rows[0][0], rusqlite::types::Value::Integer(1));
}

#[test]
fn group_by_status_returns_two_rows() {
    let session = sample_session();
    let (columns, rows) = query_rows(
        &session,
        "SELECT status, COUNT(*) FROM Placement GROUP BY status",
    );
    assert_eq!(columns[0], "status");
    assert_eq!(rows.len(), 2);
}

#[test]
fn statement_without_result_columns_reports_affected_rows() {
    let session = sample_session();
    match session
        .execute("UPDATE Placement SET salary = 0 WHERE salary IS NULL")
        .expect("execute update")
    {
        QueryOutput::Affected(count) => assert_eq!(count, 1),
        other => panic!("Expected affected count, got {other:?}"),
    }
}

#[test]
fn table_info_reflects_inferred_schema() {
    let session = sample_session();
    let info = session.table_info().expect("table info");
    assert_eq!(info.len(), 15);
    assert_eq!(info[0].name, "sl_no");
    assert_eq!(info[0].column_type, "INTEGER");
    assert!(!info[0].primary_key);
}

#[test]
fn headers_are_sanitized_with_collision_suffixes() {
    let mut session = Session::new("Placement").expect("open session");
    let csv = "a b,a.b,plain\n1,2,3\n";
    session
        .load_csv(Cursor::new(csv), &LoadOptions::default())
        .expect("load");
    let names = session.column_names().expect("columns");
    assert_eq!(names, vec!["a_b", "a_b_2", "plain"]);

    let dataset = session.dataset().expect("dataset");
    assert_eq!(dataset.columns[1].original_header, "a.b");
}

#[test]
fn failed_load_preserves_previous_dataset() {
    let mut session = sample_session();
    // Ragged row: record length no longer matches the header count.
    let bad_csv = "x,y\n1\n";
    let result = session.load_csv(Cursor::new(bad_csv), &LoadOptions::default());
    assert!(result.is_err());

    let dataset = session.dataset().expect("previous dataset intact");
    assert!(dataset.from_sample);
    let (_, rows) = query_rows(&session, "SELECT COUNT(*) FROM Placement");
    assert_eq!(rows[0][0], rusqlite::types::Value::Integer(5));
}

#[test]
fn empty_input_is_a_load_error() {
    let mut session = Session::new("Placement").expect("open session");
    assert!(
        session
            .load_csv(Cursor::new(""), &LoadOptions::default())
            .is_err()
    );
    assert!(
        session
            .load_csv(Cursor::new("a,b\n"), &LoadOptions::default())
            .is_err()
    );
    assert!(session.dataset().is_none());
}

#[test]
fn superseded_load_is_discarded() {
    let mut session = sample_session();

    let stale = session.begin_load();
    let staged = session
        .stage(stale, Cursor::new(common::UNRELATED_CSV), &LoadOptions::default())
        .expect("stage");
    // A newer load starts before the staged one commits.
    let _newer = session.begin_load();

    match session.commit(staged).expect("commit") {
        LoadOutcome::Superseded => {}
        LoadOutcome::Committed(_) => panic!("Stale load must not commit"),
    }

    // The live table still holds the sample dataset.
    let (_, rows) = query_rows(&session, "SELECT COUNT(*) FROM Placement");
    assert_eq!(rows[0][0], rusqlite::types::Value::Integer(5));
    assert!(session.dataset().expect("dataset").from_sample);
}
