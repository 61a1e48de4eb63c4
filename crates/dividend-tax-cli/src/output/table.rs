use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use dividend_tax_core::format::{currency_symbol, format_amount};

use crate::output::{flatten_row, row_headers};

/// Report columns shown as money, rounded to 2 dp.
const MONEY_COLUMNS: [&str; 9] = [
    "total",
    "tax",
    "taxes.absTax",
    "taxes.income",
    "taxes.localIncome",
    "taxes.pit",
    "taxes.militaryTax",
    "taxes.totalTax",
    "taxes.netIncome",
];

/// Columns of the report row table, in display order.
const REPORT_COLUMNS: [(&str, &str); 10] = [
    ("date", "Date"),
    ("ticker", "Ticker"),
    ("shares", "Shares"),
    ("total", "Gross"),
    ("tax", "Withheld"),
    ("curExchange", "Rate"),
    ("taxes.localIncome", "Local income"),
    ("taxes.pit", "PIT"),
    ("taxes.militaryTax", "Military"),
    ("taxes.netIncome", "Net"),
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result.get("rows") {
        Some(Value::Array(rows)) => print_report(result, rows),
        _ => print_flat_object(result),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_report(result: &Value, rows: &[Value]) {
    let rated = result.get("rated").and_then(Value::as_bool).unwrap_or(false);
    let columns: Vec<(&str, &str)> = REPORT_COLUMNS
        .iter()
        .copied()
        .filter(|(key, _)| rated || !(key.starts_with("taxes.") || *key == "curExchange"))
        .collect();

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|(_, title)| title.to_string()));
    for row in rows {
        let fields: Map<String, Value> = flatten_row(row).into_iter().collect();
        let symbol = fields
            .get("currencySymbol")
            .and_then(Value::as_str)
            .map(currency_symbol)
            .unwrap_or("");
        builder.push_record(columns.iter().map(|(key, _)| {
            let cell = fields.get(*key).map(|v| format_cell(key, v)).unwrap_or_default();
            if (*key == "total" || *key == "tax") && !cell.is_empty() {
                format!("{symbol}{cell}")
            } else {
                cell
            }
        }));
    }
    println!("{}", Table::from(builder));

    if let Some(summary @ Value::Object(_)) = result.get("summary") {
        let local = result
            .get("targetCurrency")
            .and_then(Value::as_str)
            .unwrap_or_default();
        println!("\nSummary ({local}):");
        print_flat_object(summary);
    }
    if let Some(kpi @ Value::Object(_)) = result.get("kpi") {
        println!("\nKPI:");
        print_flat_object(kpi);
    }
    if let Some(Value::Array(monthly)) = result.get("monthly") {
        if !monthly.is_empty() {
            println!("\nMonthly:");
            print_array_table(monthly);
        }
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.clone(), format_cell(key, val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if arr.first().is_some_and(Value::is_object) {
        let headers = row_headers(arr);
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            let fields: Map<String, Value> = flatten_row(item).into_iter().collect();
            builder.push_record(headers.iter().map(|h| {
                fields
                    .get(h.as_str())
                    .map(|v| format_value(v))
                    .unwrap_or_default()
            }));
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// Money fields are rounded for display; everything else is shown as is.
fn format_cell(key: &str, value: &Value) -> String {
    let is_money = MONEY_COLUMNS.contains(&key)
        || MONEY_COLUMNS.iter().any(|c| c.strip_prefix("taxes.") == Some(key))
        || matches!(key, "totalGross" | "taxWithheld" | "netIncome");
    match value {
        Value::String(s) if is_money => Decimal::from_str(s)
            .map(format_amount)
            .unwrap_or_else(|_| s.clone()),
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
