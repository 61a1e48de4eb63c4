use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks for well-known fields in the result, then in its `summary` and
/// `kpi` sections, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = ["netIncome", "totalTax", "topPayer", "totalGross", "startDate"];

    if let Value::Object(map) = result_obj {
        let sections = [Some(result_obj), map.get("summary"), map.get("kpi")];
        for section in sections.into_iter().flatten() {
            for key in &priority_keys {
                if let Some(val) = section.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    if let Value::Array(items) = result_obj {
        println!("{}", items.len());
        return;
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
