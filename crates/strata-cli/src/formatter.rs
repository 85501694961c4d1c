//! Output formatting for command results.
//!
//! Supports table, JSON, and raw output formats.

use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::commands::{CellValue, FileReport, RowSet};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
    /// Raw output (values separated by tabs).
    Raw,
}

impl OutputFormat {
    /// Parses a configured format name, falling back to `Table`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "raw" => Self::Raw,
            _ => Self::Table,
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Formats the `inspect` report.
pub fn format_report(report: &FileReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Raw => {
            let mut output = format!(
                "path\t{}\nfile_size\t{}\ntotal_rows\t{}\n",
                report.path, report.file_size, report.total_rows
            );
            for column in &report.columns {
                output.push_str(&format!(
                    "column\t{}\t{}\t{}\t{}\n",
                    column.index, column.id, column.storage_type, column.role
                ));
            }
            for stripe in &report.stripes {
                output.push_str(&format!(
                    "stripe\t{}\t{}\t{}\t{}\t{}\n",
                    stripe.index,
                    stripe.rows,
                    stripe.stored_bytes,
                    stripe.raw_bytes,
                    stripe.codecs.join(",")
                ));
            }
            output
        }
        OutputFormat::Table => {
            let mut summary = new_table();
            summary.set_header(vec!["File", "Size (bytes)", "Rows", "Stripes"]);
            summary.add_row(vec![
                Cell::new(&report.path),
                Cell::new(report.file_size),
                Cell::new(report.total_rows),
                Cell::new(report.stripes.len()),
            ]);

            let mut columns = new_table();
            columns.set_header(vec!["#", "Id", "Type", "Role"]);
            for column in &report.columns {
                columns.add_row(vec![
                    Cell::new(column.index),
                    Cell::new(column.id),
                    Cell::new(&column.storage_type),
                    Cell::new(column.role),
                ]);
            }

            let mut stripes = new_table();
            stripes.set_header(vec!["Stripe", "Rows", "Stored", "Raw", "Codecs"]);
            for stripe in &report.stripes {
                stripes.add_row(vec![
                    Cell::new(stripe.index),
                    Cell::new(stripe.rows),
                    Cell::new(stripe.stored_bytes),
                    Cell::new(stripe.raw_bytes),
                    Cell::new(stripe.codecs.join(",")),
                ]);
            }

            format!("{}\n{}\n{}", summary, columns, stripes)
        }
    }
}

/// Formats the `dump` row set.
pub fn format_rows(rows: &RowSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            if !rows.columns.is_empty() {
                table.set_header(rows.columns.iter().map(Cell::new));
            }
            for row in &rows.rows {
                table.add_row(row.iter().map(|v| Cell::new(v.to_string())));
            }
            format!(
                "{}\n({} of {} rows)",
                table,
                rows.rows.len(),
                rows.total_rows
            )
        }
        OutputFormat::Json => {
            let objects: Vec<JsonValue> = rows
                .rows
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    for (i, value) in row.iter().enumerate() {
                        let name = rows
                            .columns
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| format!("column_{}", i));
                        obj.insert(name, cell_to_json(value));
                    }
                    JsonValue::Object(obj)
                })
                .collect();
            serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Raw => {
            let mut output = String::new();
            if !rows.columns.is_empty() {
                output.push_str(&rows.columns.join("\t"));
                output.push('\n');
            }
            for row in &rows.rows {
                let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                output.push_str(&values.join("\t"));
                output.push('\n');
            }
            output
        }
    }
}

/// Formats any serializable summary as a two-column key/value listing.
pub fn format_summary<T: Serialize>(value: &T, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(value);
    }

    let fields = match serde_json::to_value(value) {
        Ok(JsonValue::Object(fields)) => fields,
        Ok(other) => return other.to_string(),
        Err(e) => return format!("<unprintable: {}>", e),
    };

    match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec!["Field", "Value"]);
            for (key, value) in &fields {
                table.add_row(vec![Cell::new(key), Cell::new(scalar(value))]);
            }
            table.to_string()
        }
        _ => fields
            .iter()
            .map(|(key, value)| format!("{}\t{}\n", key, scalar(value)))
            .collect(),
    }
}

fn scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// JSON has no NaN or infinity, so non-finite floats are rendered as strings.
fn cell_to_json(value: &CellValue) -> JsonValue {
    match value {
        CellValue::Null => JsonValue::Null,
        CellValue::Integral(v) => json!(*v),
        CellValue::FloatingPoint(v) if v.is_finite() => json!(*v),
        CellValue::FloatingPoint(v) => json!(v.to_string()),
        CellValue::Boolean(v) => json!(*v),
        CellValue::Text(v) => json!(v),
        CellValue::Opaque(_) => json!(value.to_string()),
    }
}
