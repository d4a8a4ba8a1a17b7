//! Text formatting for CLI output.

use crate::cache::CacheStats;
use crate::error::{StorageError, VaultError};
use crate::hierarchy::HierarchyNode;
use crate::store::{BodyEncoding, Classification, LoadStatus, Record};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Output format selected with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, VaultError> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(VaultError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_offline_banner() -> String {
    format!(
        "{}",
        "Offline: remote unavailable, showing cached artifacts".yellow()
    )
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, VaultError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| VaultError::from(StorageError::Serialization(e.to_string())))
}

fn status_label(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::Unfetched => "unfetched",
        LoadStatus::HeaderDecrypted => "header",
        LoadStatus::BodyLoaded => "loaded",
    }
}

/// Record list as a table, newest first as given
pub fn format_record_table(records: &[Record]) -> String {
    if records.is_empty() {
        return "No artifacts.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Title", "Kind", "Path", "Updated", "Status", "ID"]);
    for record in records {
        table.add_row(vec![
            record.title.clone(),
            record.classification.to_string(),
            record.path.clone().unwrap_or_else(|| "-".to_string()),
            record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            status_label(record.load_status()).to_string(),
            record.id.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_grouped_counts(groups: &BTreeMap<Classification, Vec<Record>>) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Kind", "Artifacts"]);
    for (tag, records) in groups {
        table.add_row(vec![tag.to_string(), records.len().to_string()]);
    }
    table.to_string()
}

/// Indented directory tree; directories end with `/`
pub fn format_hierarchy(nodes: &[HierarchyNode]) -> String {
    if nodes.is_empty() {
        return "No artifacts.".to_string();
    }
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, 0);
    }
    out.trim_end().to_string()
}

fn write_node(out: &mut String, node: &HierarchyNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        HierarchyNode::Directory(dir) => {
            out.push_str(&format!("{}{}/\n", indent, dir.name.bold()));
            for child in &dir.children {
                write_node(out, child, depth + 1);
            }
        }
        HierarchyNode::Leaf(leaf) => {
            out.push_str(&format!("{}{}  {}\n", indent, leaf.name, leaf.record_id.dimmed()));
        }
    }
}

/// Full record view including the body when loaded
pub fn format_record_detail(record: &Record) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&record.title)));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    let sessions = record.session_ids.iter().cloned().collect::<Vec<_>>().join(", ");
    let rows = [
        ("ID", record.id.clone()),
        ("Path", record.path.clone().unwrap_or_else(|| "-".to_string())),
        ("Kind", record.classification.to_string()),
        ("MIME type", record.mime_type.clone().unwrap_or_else(|| "-".to_string())),
        ("Language", record.language.clone().unwrap_or_else(|| "-".to_string())),
        ("Sessions", if sessions.is_empty() { "-".to_string() } else { sessions }),
        ("Sequence", record.seq.to_string()),
        ("Created", record.created_at.to_rfc3339()),
        ("Updated", record.updated_at.to_rfc3339()),
        ("Status", status_label(record.load_status()).to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }
    out.push_str(&format!("{}\n\n", table));

    match (record.body(), record.body_encoding) {
        (Some(body), BodyEncoding::Text) if record.is_body_loaded() => {
            out.push_str(&format!("{}\n\n", format_section_heading("Content")));
            out.push_str(body);
        }
        (Some(body), BodyEncoding::Base64) if record.is_body_loaded() => {
            out.push_str(&format!(
                "<binary content, {} base64 characters>",
                body.len()
            ));
        }
        _ => out.push_str("(content unavailable)"),
    }
    out
}

pub fn format_cache_stats(stats: &CacheStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Offline Cache")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Available", (if stats.available { "yes" } else { "no" }).to_string()),
        ("Records", stats.record_count.to_string()),
        ("Bodies", stats.body_count.to_string()),
        ("Size (bytes)", stats.total_size_bytes.to_string()),
        ("Completed writes", stats.completed_writes.to_string()),
        ("Failed writes", stats.failed_writes.to_string()),
        ("Dropped writes", stats.dropped_writes.to_string()),
        ("Fenced writes", stats.fenced_writes.to_string()),
        ("Generation", stats.generation.to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }
    out.push_str(&table.to_string());
    if let Some(err) = &stats.last_error {
        out.push_str(&format!("\n\nLast error: {}", err.red()));
    }
    out
}
