pub mod ai;
pub mod bundled;
pub mod cli;
pub mod infer;
pub mod io_utils;
pub mod reconcile;
pub mod reference;
pub mod store;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    ai::{GeminiClient, GeneratedSql, SqlGenerator},
    cli::{ApiArgs, AskArgs, Cli, Commands, DataArgs, ExplainArgs, RunArgs, SchemaArgs},
    reconcile::ReconcilerConfig,
    reference::ReferenceSchema,
    store::{LoadOptions, QueryOutput, Session},
    validate::ValidatorConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("query_bridge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Schema(args) => handle_schema(&args),
        Commands::Run(args) => handle_run(&args),
        Commands::Ask(args) => handle_ask(&args),
        Commands::Explain(args) => handle_explain(&args),
        Commands::Samples => handle_samples(),
    }
}

fn handle_schema(args: &SchemaArgs) -> Result<()> {
    let mut session = Session::new(&args.data.table)?;
    load_dataset(&mut session, &args.data)?;
    print!("{}", build_schema_text(&session)?);
    Ok(())
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let mut session = Session::new(&args.data.table)?;
    load_dataset(&mut session, &args.data)?;
    let actual_columns = session.column_names()?;
    validate::check_columns(
        &args.sql,
        session.table_name(),
        &actual_columns,
        &ValidatorConfig::default(),
    )?;
    let output = session.execute(&args.sql)?;
    render_output(&output, args.json)
}

fn handle_ask(args: &AskArgs) -> Result<()> {
    let mut session = Session::new(&args.data.table)?;
    load_dataset(&mut session, &args.data)?;
    let schema_text = build_schema_text(&session)?;
    let client = build_client(&args.api)?;

    info!("Generating SQL for question: {}", args.question);
    let generated = client.generate_sql(&schema_text, session.table_name(), &args.question)?;
    let sql = match generated {
        GeneratedSql::Refusal { message, .. } => bail!("{message}"),
        GeneratedSql::Query(sql) => sql,
    };
    println!("Generated SQL:\n{sql}\n");

    let actual_columns = session.column_names()?;
    validate::check_columns(
        &sql,
        session.table_name(),
        &actual_columns,
        &ValidatorConfig::default(),
    )?;

    let output = session.execute(&sql)?;
    render_output(&output, args.json)?;

    if args.explain {
        let explanation = client.explain_sql(&sql)?;
        println!("\nExplanation:\n{explanation}");
    }
    Ok(())
}

fn handle_explain(args: &ExplainArgs) -> Result<()> {
    let client = build_client(&args.api)?;
    let explanation = client.explain_sql(&args.sql)?;
    println!("{explanation}");
    Ok(())
}

fn handle_samples() -> Result<()> {
    let headers = vec!["question".to_string(), "description".to_string()];
    let rows = bundled::SAMPLE_QUESTIONS
        .iter()
        .map(|sample| {
            vec![
                sample.question.to_string(),
                sample.description.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn load_dataset(session: &mut Session, args: &DataArgs) -> Result<()> {
    match &args.input {
        None => {
            info!("No input file given; loading the bundled sample dataset");
            session.load_sample()?;
        }
        Some(path) => {
            let options = LoadOptions {
                delimiter: io_utils::resolve_input_delimiter(path, args.delimiter),
                encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
                sample_rows: args.sample_rows,
                from_sample: false,
            };
            let reader = io_utils::open_raw_reader(path)?;
            session
                .load_csv(reader, &options)
                .with_context(|| format!("Loading dataset from {path:?}"))?;
        }
    }
    Ok(())
}

fn build_schema_text(session: &Session) -> Result<String> {
    let dataset = session
        .dataset()
        .context("No dataset loaded")?;
    let physical_columns = session.table_info()?;
    Ok(reconcile::build_ai_schema(
        session.table_name(),
        &physical_columns,
        &dataset.original_headers,
        ReferenceSchema::bundled(),
        dataset.from_sample,
        &ReconcilerConfig::default(),
    ))
}

fn build_client(args: &ApiArgs) -> Result<GeminiClient> {
    let api_key = match &args.api_key {
        Some(key) => key.clone(),
        None => env::var("GEMINI_API_KEY").context(
            "Generative API key not configured; pass --api-key or set GEMINI_API_KEY",
        )?,
    };
    GeminiClient::new(api_key, args.model.clone())
}

fn render_output(output: &QueryOutput, json: bool) -> Result<()> {
    match output {
        QueryOutput::Rows { columns, rows } => {
            if json {
                let objects = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .zip(row)
                            .map(|(name, value)| (name.clone(), store::value_to_json(value)))
                            .collect::<serde_json::Map<_, _>>()
                    })
                    .collect::<Vec<_>>();
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                let rendered_rows = rows
                    .iter()
                    .map(|row| row.iter().map(store::display_value).collect::<Vec<_>>())
                    .collect::<Vec<_>>();
                table::print_table(columns, &rendered_rows);
            }
            info!("Query returned {} row(s)", rows.len());
        }
        QueryOutput::Affected(count) => {
            println!("{count} row(s) affected.");
        }
    }
    Ok(())
}
