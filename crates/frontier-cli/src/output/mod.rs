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

/// Flatten frontier points into rows: one per point, one column per ticker.
///
/// Accepts either a frontier result (`fixed_risk` / `fixed_return` /
/// `min_variance`) or a single point (`values`). Returns `None` for
/// anything else.
pub fn frontier_rows(result: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let map = result.as_object()?;

    let mut points: Vec<(String, String, &Value)> = Vec::new();
    if map.contains_key("values") {
        points.push(("point".into(), String::new(), result));
    } else {
        for sweep in ["fixed_risk", "fixed_return"] {
            let arr = map.get(sweep)?.as_array()?;
            for (step, p) in arr.iter().enumerate() {
                points.push((sweep.to_string(), step.to_string(), p));
            }
        }
        if let Some(p) = map.get("min_variance").filter(|p| !p.is_null()) {
            points.push(("min_variance".into(), String::new(), p));
        }
    }

    let tickers: Vec<String> = match map.get("universe").and_then(|u| u.as_array()) {
        Some(u) => u.iter().filter_map(|t| t.as_str().map(String::from)).collect(),
        None => points
            .first()
            .and_then(|(_, _, p)| p.get("values"))
            .and_then(|v| v.as_object())
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let mut headers: Vec<String> = ["sweep", "step", "target", "return", "risk", "converged"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(tickers.iter().cloned());

    let rows = points
        .into_iter()
        .map(|(sweep, step, p)| {
            let mut row = vec![
                sweep,
                step,
                cell(p.get("target")),
                cell(p.get("return")),
                cell(p.get("risk")),
                cell(p.get("converged")),
            ];
            for t in &tickers {
                row.push(cell(p.get("values").and_then(|v| v.get(t.as_str()))));
            }
            row
        })
        .collect();

    Some((headers, rows))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}
