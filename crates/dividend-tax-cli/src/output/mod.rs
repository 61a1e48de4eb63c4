pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects one level deep as `parent.child` keys, so report
/// rows can be shown as table or CSV columns.
pub fn flatten_row(value: &Value) -> Vec<(String, Value)> {
    let mut fields = Vec::new();
    if let Value::Object(map) = value {
        for (key, val) in map {
            match val {
                Value::Object(inner) => {
                    for (inner_key, inner_val) in inner {
                        fields.push((format!("{key}.{inner_key}"), inner_val.clone()));
                    }
                }
                other => fields.push((key.clone(), other.clone())),
            }
        }
    }
    fields
}

/// Union of flattened keys over all rows, in first-seen order.
pub fn row_headers(rows: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        for (key, _) in flatten_row(row) {
            if !headers.contains(&key) {
                headers.push(key);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_row_prefixes_nested_fields() {
        let row = json!({ "ticker": "AAPL", "taxes": { "pit": "9" } });
        let keys: Vec<String> = flatten_row(&row).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["taxes.pit", "ticker"]);
    }

    #[test]
    fn test_headers_cover_sparse_rows() {
        let rows = vec![json!({ "id": "1" }), json!({ "id": "2", "shares": "10" })];
        assert_eq!(row_headers(&rows), vec!["id", "shares"]);
    }
}
