//! Rendering raw store rows into [`RecordItem`]s.
//!
//! The rendered `content` is exactly what the model sees, so the formats
//! here are fixed:
//!
//! - Goal: `{title} (Due: {due_date}, Progress: {progress}%)`
//! - Task: `{title} (Status: {status}, High Impact: {is_high_impact})`
//! - Journal: the entry's `content`, verbatim
//!
//! Missing, `null`, and empty-string fields all take the default.

use digm_core::record::{RecordItem, RecordKind, display_value, present};
use digm_core::store::Row;
use serde_json::{Map, Value};

fn text_or(row: &Row, key: &str, default: &str) -> String {
    present(row, key)
        .map(display_value)
        .unwrap_or_else(|| default.to_string())
}

/// Raw text of a field for search matching; absent fields are "".
fn raw(row: &Row, key: &str) -> String {
    text_or(row, key, "")
}

/// Copy the named fields; absent ones become `null`.
fn pick(row: &Row, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .map(|k| (k.to_string(), row.get(*k).cloned().unwrap_or(Value::Null)))
        .collect()
}

pub fn render_goal(row: &Row) -> RecordItem {
    let content = format!(
        "{} (Due: {}, Progress: {}%)",
        text_or(row, "title", "Untitled"),
        text_or(row, "due_date", "No due date"),
        text_or(row, "progress", "0"),
    );
    RecordItem::new(RecordKind::Goal, content)
        .with_metadata(pick(row, &["due_date", "progress", "timeframe"]))
        .with_search_fields(vec![raw(row, "title"), raw(row, "description")])
}

pub fn render_task(row: &Row) -> RecordItem {
    let content = format!(
        "{} (Status: {}, High Impact: {})",
        text_or(row, "title", "Untitled"),
        text_or(row, "status", "Unknown"),
        text_or(row, "is_high_impact", "false"),
    );
    RecordItem::new(RecordKind::Task, content)
        .with_metadata(pick(row, &["status", "is_high_impact", "is_completed"]))
        .with_search_fields(vec![raw(row, "title"), raw(row, "description")])
}

pub fn render_journal(row: &Row) -> RecordItem {
    let content = raw(row, "content");
    RecordItem::new(RecordKind::Journal, content.clone())
        .with_metadata(pick(row, &["mood", "created_at"]))
        .with_search_fields(vec![content])
}

/// Render every row of one kind, preserving order.
pub fn render_all(kind: RecordKind, rows: &[Row]) -> Vec<RecordItem> {
    let render = match kind {
        RecordKind::Goal => render_goal,
        RecordKind::Task => render_task,
        RecordKind::Journal => render_journal,
    };
    rows.iter().map(render).collect()
}
