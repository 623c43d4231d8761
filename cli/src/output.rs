//! Plain-text rendering for CLI output.

use std::fmt::Write;

use ctxmem::{Entry, Namespace};
use serde_json::Value;

const KEY_WIDTH: usize = 30;
const PREVIEW_WIDTH: usize = 100;

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn namespace_table(namespaces: &[Namespace]) -> String {
    let rows: Vec<[String; 4]> = namespaces
        .iter()
        .map(|ns| {
            [
                ns.slug.clone(),
                ns.name.clone().unwrap_or_else(|| "-".to_string()),
                ns.entry_count.to_string(),
                ns.created_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    table(["Slug", "Name", "Entries", "Created"], &rows)
}

pub fn entry_table(entries: &[Entry]) -> String {
    let rows: Vec<[String; 3]> = entries
        .iter()
        .map(|e| {
            let tags = e
                .tags
                .as_ref()
                .filter(|t| !t.is_empty())
                .map(|t| t.join(", "))
                .unwrap_or_else(|| "-".to_string());
            [
                truncate(&e.key, KEY_WIDTH),
                tags,
                e.updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    table(["Key", "Tags", "Updated"], &rows)
}

pub fn search_hits(entries: &[Entry]) -> String {
    let mut out = String::new();
    for e in entries {
        let score = e.similarity.unwrap_or_default() * 100.0;
        let preview = match &e.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(out, "[{}/{}] ({score:.1}%)", e.namespace, e.key);
        let _ = writeln!(out, "  {}", truncate(&preview, PREVIEW_WIDTH));
        let _ = writeln!(out);
    }
    out
}

/// Cut to `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn table<const N: usize>(header: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths = header.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(header.as_slice()).chain(rows.iter().map(|r| r.as_slice())) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}
