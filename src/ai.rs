//! Generative-language API boundary.
//!
//! The model is a black box behind [`SqlGenerator`]: given schema text and a
//! natural-language question it returns either a SQL statement or a sentinel
//! refusal line listing the concepts it could not map. The trait keeps the
//! rest of the pipeline testable without network access; [`GeminiClient`] is
//! the production implementation over the Generative Language REST API.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Model used when none is specified on the command line.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Prefix of the refusal line the prompt instructs the model to emit when a
/// question refers to concepts the schema cannot support.
pub const SENTINEL_PREFIX: &str =
    "ERROR: Cannot address query due to missing or mismatched data concepts:";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a SQL generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSql {
    Query(String),
    /// The model declined; the listed concepts could not be mapped to the
    /// schema. No SQL exists to show or execute.
    Refusal { concepts: Vec<String>, message: String },
}

pub trait SqlGenerator {
    fn generate_sql(&self, schema_text: &str, table_name: &str, question: &str)
    -> Result<GeneratedSql>;
    fn explain_sql(&self, sql: &str) -> Result<String>;
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

const SQL_GENERATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.1,
    top_p: 0.9,
    top_k: 32,
};

const EXPLANATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.4,
    top_p: 0.95,
    top_k: 64,
};

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Building HTTP client")?;
        Ok(GeminiClient {
            http,
            api_key,
            model,
        })
    }

    fn request_text(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: config,
        };
        debug!("Requesting generation from model '{}'", self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .context("Calling generative API")?
            .error_for_status()
            .context("Generative API returned an error status")?;
        let parsed: GenerateResponse = response
            .json()
            .context("Parsing generative API response")?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        let text = text.trim().to_string();
        if text.is_empty() {
            bail!("Generative API returned no text");
        }
        Ok(text)
    }
}

impl SqlGenerator for GeminiClient {
    fn generate_sql(
        &self,
        schema_text: &str,
        table_name: &str,
        question: &str,
    ) -> Result<GeneratedSql> {
        let prompt = sql_prompt(schema_text, table_name, question);
        let text = self.request_text(&prompt, &SQL_GENERATION_CONFIG)?;
        Ok(parse_generated(&text))
    }

    fn explain_sql(&self, sql: &str) -> Result<String> {
        let prompt = explain_prompt(sql);
        self.request_text(&prompt, &EXPLANATION_CONFIG)
    }
}

/// Classifies raw model output as a refusal or a SQL statement, stripping
/// markdown fences defensively even though the prompt forbids them.
pub fn parse_generated(text: &str) -> GeneratedSql {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix(SENTINEL_PREFIX) {
        let concepts = rest
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        return GeneratedSql::Refusal {
            concepts,
            message: trimmed.to_string(),
        };
    }

    let sql = strip_fences(trimmed);
    let upper = sql.to_uppercase();
    if !["SELECT", "WITH", "UPDATE", "DELETE", "INSERT"]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
    {
        warn!("Generated SQL does not look like a standard DQL/DML statement: {sql}");
    }
    GeneratedSql::Query(sql)
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^```(?:sql)?\s*\n?(.*?)\n?\s*```$").expect("static pattern")
    })
}

fn strip_fences(text: &str) -> String {
    match fence_regex().captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.to_string(),
    }
}

fn sql_prompt(schema_text: &str, table_name: &str, question: &str) -> String {
    format!(
        "You are an expert SQL generator. Given the following database schema and a natural \
         language query, convert the natural language query into a valid SQL query for a SQLite \
         database.\n\
         Only output the SQL query and nothing else. Do not include any explanations or markdown \
         formatting like ```sql or ```.\n\
         Ensure the query is directly executable against a table described by the schema.\n\
         The primary table name is '{table_name}'. Refer to columns as defined in the schema.\n\
         \n\
         Database Schema:\n\
         {schema_text}\n\
         \n\
         Natural Language Query:\n\
         {question}\n\
         \n\
         If the natural language query refers to concepts, columns, or specific filter values \
         that are clearly not supported by or cannot be inferred from the provided Database \
         Schema, you MUST respond with a single line starting with \"{SENTINEL_PREFIX}\". List \
         the specific concepts or column names from the natural language query that you cannot \
         map to the schema. For example: \"{SENTINEL_PREFIX} [gender, \
         specific_unlisted_status_value]\". Do not attempt to generate a partial or alternative \
         SQL query in this case.\n\
         \n\
         SQL Query:\n"
    )
}

fn explain_prompt(sql: &str) -> String {
    format!(
        "You are an expert SQL analyst. Given the following SQL query, explain it in simple, \
         easy-to-understand terms.\n\
         Describe:\n\
         - The overall purpose of the query.\n\
         - What each main clause (SELECT, FROM, WHERE, GROUP BY, ORDER BY, JOINs, etc.) does.\n\
         - What kind of information or data the query aims to retrieve or manipulate.\n\
         Keep the explanation clear, concise, and targeted at someone who may not be a SQL \
         expert.\n\
         Do not include any markdown formatting like ```sql or ``` in your explanation.\n\
         \n\
         SQL Query to Explain:\n\
         {sql}\n\
         \n\
         Explanation:\n"
    )
}
