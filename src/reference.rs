//! Parser for the curated reference-schema document.
//!
//! The document is semi-structured text: `table name:` and `description:`
//! header lines, then a `columns:` section whose `- name: TYPE (description)`
//! lines describe one column each. The parser is total — malformed lines are
//! skipped, arbitrary input yields a schema with defaults — because the
//! document is hand-edited configuration, not machine output.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::bundled;

const DEFAULT_TABLE_DESCRIPTION: &str = "Placement data.";

/// One column of the curated schema, keyed case-insensitively by its
/// original (unsanitized) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceColumn {
    /// Name exactly as written in the document.
    pub name: String,
    /// Leading type token, e.g. `INTEGER` or `VARCHAR(255)`. Defaults to `TEXT`.
    pub type_token: String,
    /// First parenthetical on the line, stored with its parentheses; empty if none.
    pub description: String,
    /// Everything after `name:`, trimmed.
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceSchema {
    pub table_name: String,
    pub table_description: String,
    /// Lowercased original name -> column.
    pub columns: HashMap<String, ReferenceColumn>,
}

fn type_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z\s]+(?:\([0-9,]+\))?").expect("static pattern"))
}

fn parenthetical_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("static pattern"))
}

impl ReferenceSchema {
    /// Parses a reference-schema document. Never fails; unrecognized lines
    /// are ignored and missing header lines fall back to defaults.
    pub fn parse(document: &str) -> Self {
        let lines: Vec<&str> = document.trim().lines().collect();

        let table_name = find_header_value(&lines, "table name:")
            .unwrap_or_else(|| bundled::TABLE_NAME.to_string());
        let table_description = find_header_value(&lines, "description:")
            .unwrap_or_else(|| DEFAULT_TABLE_DESCRIPTION.to_string());

        let mut columns = HashMap::new();
        let mut in_columns_section = false;
        for line in &lines {
            if line.trim().to_lowercase().starts_with("columns:") {
                in_columns_section = true;
                continue;
            }
            if !in_columns_section {
                continue;
            }
            let Some(column) = parse_column_line(line) else {
                continue;
            };
            columns.insert(column.name.to_lowercase(), column);
        }

        ReferenceSchema {
            table_name,
            table_description,
            columns,
        }
    }

    /// The schema shipped for the bundled placement dataset, parsed once.
    pub fn bundled() -> &'static ReferenceSchema {
        static SCHEMA: OnceLock<ReferenceSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| ReferenceSchema::parse(bundled::REFERENCE_SCHEMA_DOC))
    }

    pub fn column(&self, original_name: &str) -> Option<&ReferenceColumn> {
        self.columns.get(&original_name.to_lowercase())
    }
}

fn find_header_value(lines: &[&str], key: &str) -> Option<String> {
    lines.iter().find_map(|line| {
        let trimmed = line.trim();
        if !trimmed.to_lowercase().starts_with(key) {
            return None;
        }
        let value = trimmed.splitn(2, ':').nth(1)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

fn parse_column_line(line: &str) -> Option<ReferenceColumn> {
    let trimmed = line.trim();
    let content = trimmed.strip_prefix('-')?.trim();
    let (name, rest) = content.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let detail = rest.trim();
    let type_token = type_token_regex()
        .find(detail)
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "TEXT".to_string());
    let description = parenthetical_regex()
        .captures(detail)
        .map(|caps| format!("({})", &caps[1]))
        .unwrap_or_default();
    Some(ReferenceColumn {
        name: name.to_string(),
        type_token,
        description,
        detail: detail.to_string(),
    })
}
