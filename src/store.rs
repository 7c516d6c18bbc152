//! Embedded storage engine: an in-memory SQLite database owned by a
//! [`Session`].
//!
//! A session is the explicit context object for one sequence of dataset
//! loads. Each load is staged into a scratch table and only swapped into
//! place on commit, so a failed load always leaves the previously loaded
//! dataset (or the empty state) intact. Loads carry a monotonically
//! increasing generation: a staged load whose generation is no longer
//! current is discarded instead of committed, which makes a superseded load
//! a deterministic no-op rather than a completion-order race.

use std::io::{Cursor, Read};

use anyhow::{Context, Result, bail};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, info, warn};
use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};

use crate::{
    bundled,
    infer::{self, ColumnType, DEFAULT_SAMPLE_ROWS},
    io_utils,
};

/// One column as physically created in the storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    /// Sanitized identifier, unique within the table.
    pub name: String,
    /// Header exactly as it appeared in the CSV.
    pub original_header: String,
    pub column_type: ColumnType,
}

/// Everything known about the currently loaded dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub original_headers: Vec<String>,
    pub columns: Vec<PhysicalColumn>,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    /// True when the bundled sample was loaded rather than user data.
    pub from_sample: bool,
}

/// Column metadata as reported by the engine (`PRAGMA table_info`).
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub position: i64,
    pub name: String,
    pub column_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadGeneration(u64);

/// A fully staged load awaiting commit.
#[derive(Debug)]
pub struct StagedLoad {
    generation: LoadGeneration,
    staging_table: String,
    dataset: Dataset,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    pub columns: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Committed(LoadReport),
    /// A newer load started after this one was staged; nothing was changed.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub sample_rows: usize,
    pub from_sample: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            from_sample: false,
        }
    }
}

/// Result of executing a SQL statement.
#[derive(Debug)]
pub enum QueryOutput {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    Affected(usize),
}

pub struct Session {
    conn: Connection,
    table_name: String,
    generation: u64,
    dataset: Option<Dataset>,
}

impl Session {
    pub fn new(table_name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory database")?;
        Ok(Session {
            conn,
            table_name: table_name.to_string(),
            generation: 0,
            dataset: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Starts a new load, superseding any load staged earlier.
    pub fn begin_load(&mut self) -> LoadGeneration {
        self.generation += 1;
        LoadGeneration(self.generation)
    }

    /// Parses and loads CSV data in one step: stage, then commit.
    pub fn load_csv<R: Read>(&mut self, reader: R, options: &LoadOptions) -> Result<LoadReport> {
        let generation = self.begin_load();
        let staged = self.stage(generation, reader, options)?;
        match self.commit(staged)? {
            LoadOutcome::Committed(report) => Ok(report),
            LoadOutcome::Superseded => bail!("Dataset load superseded by a newer load"),
        }
    }

    /// Loads the bundled sample dataset.
    pub fn load_sample(&mut self) -> Result<LoadReport> {
        let options = LoadOptions {
            from_sample: true,
            ..LoadOptions::default()
        };
        self.load_csv(Cursor::new(bundled::SAMPLE_CSV), &options)
    }

    /// Parses the CSV, infers column types, and writes rows into a staging
    /// table. The live table is untouched; a failure rolls everything back.
    pub fn stage<R: Read>(
        &mut self,
        generation: LoadGeneration,
        reader: R,
        options: &LoadOptions,
    ) -> Result<StagedLoad> {
        let mut csv_reader = io_utils::open_csv_reader(reader, options.delimiter);
        let original_headers = io_utils::reader_headers(&mut csv_reader, options.encoding)
            .context("Reading CSV headers")?;
        if original_headers.is_empty() || original_headers.iter().all(|h| h.trim().is_empty()) {
            bail!("No headers found in CSV data");
        }

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut record = csv::ByteRecord::new();
        while csv_reader
            .read_byte_record(&mut record)
            .context("Reading CSV row")?
        {
            rows.push(io_utils::decode_record(&record, options.encoding)?);
        }
        if rows.is_empty() {
            bail!("No data found in CSV or CSV is empty");
        }

        let sanitized = infer::sanitize_headers(&original_headers);
        let columns: Vec<PhysicalColumn> = sanitized
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells = rows.iter().map(|row| row.get(idx).map(String::as_str));
                PhysicalColumn {
                    name: name.clone(),
                    original_header: original_headers[idx].clone(),
                    column_type: infer::infer_column_type(cells, options.sample_rows),
                }
            })
            .collect();
        debug!(
            "Inferred column types: {:?}",
            columns
                .iter()
                .map(|c| (c.name.as_str(), c.column_type))
                .collect::<Vec<_>>()
        );

        let staging_table = format!("{}_staging_{}", self.table_name, generation.0);
        let (rows_loaded, rows_skipped) =
            self.write_staging(&staging_table, &columns, &rows)?;

        Ok(StagedLoad {
            generation,
            staging_table,
            dataset: Dataset {
                original_headers,
                columns,
                rows_loaded,
                rows_skipped,
                from_sample: options.from_sample,
            },
        })
    }

    fn write_staging(
        &mut self,
        staging_table: &str,
        columns: &[PhysicalColumn],
        rows: &[Vec<String>],
    ) -> Result<(usize, usize)> {
        let tx = self.conn.transaction().context("Starting load transaction")?;

        let column_defs = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_name()))
            .join(", ");
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({column_defs});",
            table = quote_ident(staging_table)
        ))
        .context("Creating staging table")?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let column_list = columns.iter().map(|c| quote_ident(&c.name)).join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote_ident(staging_table)
        );

        let mut rows_loaded = 0usize;
        let mut rows_skipped = 0usize;
        {
            let mut stmt = tx
                .prepare(&insert_sql)
                .context("Preparing row insert statement")?;
            for (row_index, row) in rows.iter().enumerate() {
                let values: Vec<SqlValue> = columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| {
                        storage_value(row.get(idx).map(String::as_str), column.column_type)
                    })
                    .collect();
                match stmt.execute(params_from_iter(values)) {
                    Ok(_) => rows_loaded += 1,
                    Err(err) => {
                        warn!("Skipping row {} due to insert error: {err}", row_index + 1);
                        rows_skipped += 1;
                    }
                }
            }
        }
        tx.commit().context("Committing staged rows")?;
        Ok((rows_loaded, rows_skipped))
    }

    /// Swaps a staged load into place, unless a newer load superseded it.
    pub fn commit(&mut self, staged: StagedLoad) -> Result<LoadOutcome> {
        if staged.generation.0 != self.generation {
            info!(
                "Discarding staged load (generation {} superseded by {})",
                staged.generation.0, self.generation
            );
            self.conn
                .execute_batch(&format!(
                    "DROP TABLE IF EXISTS {}",
                    quote_ident(&staged.staging_table)
                ))
                .context("Dropping superseded staging table")?;
            return Ok(LoadOutcome::Superseded);
        }

        self.conn
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {live}; ALTER TABLE {staging} RENAME TO {live};",
                live = quote_ident(&self.table_name),
                staging = quote_ident(&staged.staging_table)
            ))
            .context("Swapping staged table into place")?;

        let report = LoadReport {
            columns: staged.dataset.columns.len(),
            rows_loaded: staged.dataset.rows_loaded,
            rows_skipped: staged.dataset.rows_skipped,
        };
        self.dataset = Some(staged.dataset);
        info!(
            "Loaded {} row(s) across {} column(s) into '{}' ({} skipped)",
            report.rows_loaded, report.columns, self.table_name, report.rows_skipped
        );
        Ok(LoadOutcome::Committed(report))
    }

    /// Executes one SQL statement, returning rows for queries or the
    /// affected-row count for statements.
    pub fn execute(&self, sql: &str) -> Result<QueryOutput> {
        let mut stmt = self.conn.prepare(sql).context("SQL execution error")?;
        if stmt.column_count() == 0 {
            let affected = stmt.execute([]).context("SQL execution error")?;
            return Ok(QueryOutput::Affected(affected));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_string()).collect();
        let mut rows = Vec::new();
        let mut result_rows = stmt.query([]).context("SQL execution error")?;
        while let Some(row) = result_rows.next().context("SQL execution error")? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(row.get::<_, SqlValue>(idx)?);
            }
            rows.push(values);
        }
        Ok(QueryOutput::Rows { columns, rows })
    }

    /// Column metadata for the live table, in physical column order.
    pub fn table_info(&self) -> Result<Vec<TableColumn>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(&self.table_name));
        let mut stmt = self.conn.prepare(&sql).context("Reading table metadata")?;
        let columns = stmt
            .query_map([], |row| {
                Ok(TableColumn {
                    position: row.get(0)?,
                    name: row.get(1)?,
                    column_type: row.get(2)?,
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    primary_key: row.get::<_, i64>(5)? != 0,
                })
            })
            .context("Reading table metadata")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Reading table metadata")?;
        Ok(columns)
    }

    /// Sanitized column names of the live table.
    pub fn column_names(&self) -> Result<Vec<String>> {
        Ok(self.table_info()?.into_iter().map(|c| c.name).collect())
    }
}

/// Converts a raw CSV cell into the value stored for a column of the given
/// type. Cells that do not fit the column type become NULL rather than
/// aborting the row.
pub fn storage_value(cell: Option<&str>, column_type: ColumnType) -> SqlValue {
    let Some(raw) = cell else {
        return SqlValue::Null;
    };
    let trimmed = raw.trim();
    if infer::is_null_cell(trimmed) {
        return SqlValue::Null;
    }
    match column_type {
        ColumnType::Text => SqlValue::Text(trimmed.to_string()),
        ColumnType::Integer => match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() && value.fract() == 0.0 => {
                SqlValue::Integer(value as i64)
            }
            _ => SqlValue::Null,
        },
        ColumnType::Real => match trimmed.parse::<f64>() {
            Ok(value) => SqlValue::Real(value),
            Err(_) => SqlValue::Null,
        },
    }
}

/// Renders an engine value for table output. NULL shows as empty, floats
/// with a zero fraction drop the trailing `.0`.
pub fn display_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(bytes) => format!("<{} byte blob>", bytes.len()),
    }
}

pub fn value_to_json(value: &SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => serde_json::json!(i),
        SqlValue::Real(f) => serde_json::json!(f),
        SqlValue::Text(s) => serde_json::json!(s),
        SqlValue::Blob(bytes) => serde_json::json!(format!("<{} byte blob>", bytes.len())),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
