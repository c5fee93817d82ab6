use serde_json::Value;
use std::io::{self, Write};

use super::frontier_rows;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(stdout.lock(), value) {
        eprintln!("CSV output error: {}", e);
    }
}

/// Frontier results become one row per point; daily returns one number per
/// row; anything else field/value pairs.
fn write_csv<W: Write>(out: W, value: &Value) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    let Value::Object(map) = value else {
        return Ok(());
    };

    if let Some((headers, rows)) = map.get("result").and_then(frontier_rows) {
        wtr.write_record(&headers)?;
        for row in rows {
            wtr.write_record(&row)?;
        }
    } else if let Some(Value::Array(results)) = map.get("results") {
        wtr.write_record(["return"])?;
        for r in results {
            wtr.write_record([r.to_string()])?;
        }
    } else {
        let fields = match map.get("result") {
            Some(Value::Object(result)) => result,
            _ => map,
        };
        wtr.write_record(["field", "value"])?;
        for (key, val) in fields {
            let cell = match val {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            wtr.write_record([key.as_str(), cell.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_csv(&mut buf, value).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_daily_returns_one_per_row() {
        let out = render(&json!({ "results": [0.01, -0.02] }));
        assert_eq!(out, "return\n0.01\n-0.02\n");
    }

    #[test]
    fn test_error_response_as_fields() {
        let out = render(&json!({ "error": "Not a valid ticker." }));
        assert_eq!(out, "field,value\nerror,Not a valid ticker.\n");
    }
}
