//! Output formatters for list pages.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use dina_client::Resource;
use dina_table::TableView;
use serde_json::{json, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format one fetched page.
    fn format_page(&self, view: &TableView) -> String;

    /// Format a compiled RSQL filter.
    fn format_rsql(&self, rsql: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_page(&self, view: &TableView) -> String {
        if view.rows.is_empty() {
            return "No results".to_string();
        }

        let columns = columns(&view.rows);
        let mut table = Table::new();
        table.set_header(columns.iter().map(Cell::new).collect::<Vec<_>>());
        for row in &view.rows {
            let cells: Vec<Cell> = columns
                .iter()
                .map(|c| Cell::new(format_value(row.field(c).as_ref())))
                .collect();
            table.add_row(cells);
        }

        format!("{}\n{}", table, summary(view))
    }

    fn format_rsql(&self, rsql: &str) -> String {
        if rsql.is_empty() {
            "(no filter)".to_string()
        } else {
            rsql.to_string()
        }
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_page(&self, view: &TableView) -> String {
        let doc = json!({
            "data": view.rows,
            "meta": {
                "totalResourceCount": view.total_count,
                "pageCount": view.page_count,
                "page": view.current_page + 1,
                "pageSize": view.page_size,
            }
        });
        serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_rsql(&self, rsql: &str) -> String {
        json!({ "rsql": rsql }).to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_page(&self, view: &TableView) -> String {
        let columns = columns(&view.rows);
        let mut output = columns.join(",");
        output.push('\n');

        for row in &view.rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| format_value_csv(row.field(c).as_ref()))
                .collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }

        output
    }

    fn format_rsql(&self, rsql: &str) -> String {
        format!("rsql\n\"{}\"", escape_csv(rsql))
    }
}

/// Column names of a page: `id`, then every attribute in first-seen order.
fn columns(rows: &[Resource]) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    for row in rows {
        for name in row.attributes.keys() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.clone());
            }
        }
    }
    columns
}

fn summary(view: &TableView) -> String {
    match view.page_count {
        Some(pages) => format!(
            "{} row(s), page {} of {}",
            view.total_count,
            view.current_page + 1,
            pages
        ),
        None => format!("{} row(s)", view.rows.len()),
    }
}

/// Format a field as a display string.
fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Format a field for CSV output.
fn format_value_csv(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => format!("\"{}\"", escape_csv(s)),
        Some(other @ (Value::Array(_) | Value::Object(_))) => {
            format!("\"{}\"", escape_csv(&other.to_string()))
        }
        Some(other) => other.to_string(),
    }
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
