use serde_json::Value;
use std::io;

use super::{flatten, format_value};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let body = map.get("result").unwrap_or(value);
            match body {
                Value::Array(rows) => write_array_csv(&mut wtr, rows),
                Value::Object(_) => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in flatten(body) {
                        let _ = wtr.write_record([key, format_value(&val)]);
                    }
                }
                other => {
                    let _ = wtr.write_record([format_value(other)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([format_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([format_value(item)]);
        }
    }
}
