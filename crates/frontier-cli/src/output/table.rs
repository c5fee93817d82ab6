use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::frontier_rows;

/// Format output as a table using the tabled crate.
///
/// Frontier results get one row per point and one weight column per ticker;
/// anything else is shown as field/value pairs.
pub fn print_table(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", value);
        return;
    };

    match map.get("result") {
        Some(result) => {
            if let Some((headers, rows)) = frontier_rows(result) {
                let mut builder = Builder::default();
                builder.push_record(headers);
                for row in rows {
                    builder.push_record(row);
                }
                println!("{}", Table::from(builder));
                print_list("Excluded", result.get("excluded"), ", ");
            } else {
                print_fields(result);
            }
            print_list("Warnings", map.get("warnings"), "\n  - ");
            if let Some(Value::String(meth)) = map.get("methodology") {
                println!("\nMethodology: {}", meth);
            }
        }
        None => print_fields(value),
    }
}

fn print_fields(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_list(title: &str, items: Option<&Value>, sep: &str) {
    if let Some(Value::Array(items)) = items {
        if items.is_empty() {
            return;
        }
        let names: Vec<String> = items.iter().map(format_value).collect();
        if sep.starts_with('\n') {
            println!("\n{}:{}{}", title, sep, names.join(sep));
        } else {
            println!("\n{}: {}", title, names.join(sep));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
