//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use crate::domain::models::ResultMap;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate to `max_chars` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn status_cell(status: &str) -> Cell {
    let color = match status {
        "success" => Color::Green,
        "failed" => Color::Red,
        _ => Color::Yellow,
    };
    Cell::new(status).fg(color)
}

fn field<'a>(result: &'a ResultMap, key: &str) -> &'a str {
    result.get(key).and_then(Value::as_str).unwrap_or("-")
}

/// One row per task result: status, domain, action, message or error.
pub fn format_task_results(results: &[ResultMap]) -> String {
    let mut table = base_table();
    table.set_header(header(&["Status", "Domain", "Action", "Detail"]));

    for result in results {
        let status = field(result, "status");
        let detail = if status == "failed" {
            format!("{}: {}", field(result, "task"), field(result, "error"))
        } else {
            field(result, "message").to_string()
        };
        table.add_row(vec![
            status_cell(status),
            Cell::new(field(result, "domain")),
            Cell::new(field(result, "action")),
            Cell::new(truncate(&detail, 60)),
        ]);
    }
    table.to_string()
}
