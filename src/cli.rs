use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{bundled, infer};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ask natural-language questions of CSV data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the reconciled schema text that is handed to the generative API
    Schema(SchemaArgs),
    /// Validate and execute a SQL statement against a loaded CSV (offline)
    Run(RunArgs),
    /// Ask a natural-language question of a loaded CSV
    Ask(AskArgs),
    /// Explain a SQL statement in plain language
    Explain(ExplainArgs),
    /// List the bundled sample questions for the sample dataset
    Samples,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Input CSV file ('-' for stdin); the bundled sample dataset if omitted
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of rows to sample when inferring column types (0 means full scan)
    #[arg(long, default_value_t = infer::DEFAULT_SAMPLE_ROWS)]
    pub sample_rows: usize,
    /// Name of the table the data is loaded into
    #[arg(long, default_value = bundled::TABLE_NAME)]
    pub table: String,
}

#[derive(Debug, Args)]
pub struct ApiArgs {
    /// Generative API key (falls back to the GEMINI_API_KEY environment variable)
    #[arg(long = "api-key")]
    pub api_key: Option<String>,
    /// Model to request
    #[arg(long, default_value = crate::ai::DEFAULT_MODEL)]
    pub model: String,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// SQL statement to validate and execute
    pub sql: String,
    /// Emit rows as JSON objects instead of an ASCII table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub api: ApiArgs,
    /// Natural-language question about the data
    pub question: String,
    /// Also ask the model to explain the generated SQL
    #[arg(long)]
    pub explain: bool,
    /// Emit rows as JSON objects instead of an ASCII table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub api: ApiArgs,
    /// SQL statement to explain
    pub sql: String,
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw.to_ascii_lowercase().as_str() {
        "," | "comma" => Ok(b','),
        "\t" | "tab" => Ok(b'\t'),
        ";" | "semicolon" => Ok(b';'),
        "|" | "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!("Unsupported delimiter '{other}'")),
    }
}
