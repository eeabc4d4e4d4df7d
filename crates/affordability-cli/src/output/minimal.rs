use serde_json::Value;

use super::format_value;

/// Headline figures, most specific first.
const PRIORITY_KEYS: [&str; 9] = [
    "max_loan_amount",
    "monthly_savings",
    "delta",
    "max_loan",
    "monthly_repayment",
    "monthly_amount",
    "eligible",
    "base_case_value",
    "max_property_value",
];

/// Print just the key answer value from the output.
///
/// Looks for a priority key in the result object, then one level down
/// (purchase outcomes nest it under `affordability`), then falls back to the
/// first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = find_key(result_obj, key) {
                println!("{}", format_value(val));
                return;
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result_obj));
}

fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    if let Some(v) = map.get(key).filter(|v| !v.is_null()) {
        return Some(v);
    }
    map.values()
        .filter(|v| v.is_object())
        .find_map(|v| v.as_object()?.get(key).filter(|v| !v.is_null()))
}
