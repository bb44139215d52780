use serde_json::{Map, Number, Value};

/// Flat mapping from field name to value captured around a mutation.
pub type FieldSnapshot = Map<String, Value>;

/// Compares two field values on their canonical representation.
///
/// Numbers compare by numeric value, so `12000` equals `12000.0`.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right.iter())
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, left)| {
                    right
                        .get(key)
                        .is_some_and(|right| values_equal(left, right))
                })
        }
        _ => left == right,
    }
}

/// Integers compare exactly; floats only when either side is one.
fn numbers_equal(left: &Number, right: &Number) -> bool {
    if !left.is_f64() && !right.is_f64() {
        if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
            return left == right;
        }
        if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
            return left == right;
        }
        return false;
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

/// Lists the fields whose value differs between two snapshots, sorted by name.
///
/// Keys are taken from `after`; when there is no `after` snapshot (removal
/// events) every key of `before` counts as changed. A key missing on the
/// other side compares as absent, not as null.
#[must_use]
pub fn changed_fields(before: Option<&FieldSnapshot>, after: Option<&FieldSnapshot>) -> Vec<String> {
    let mut fields: Vec<String> = match after {
        Some(after) => after
            .iter()
            .filter(|(key, after_value)| {
                !before
                    .and_then(|before| before.get(key.as_str()))
                    .is_some_and(|before_value| values_equal(before_value, after_value))
            })
            .map(|(key, _)| key.clone())
            .collect(),
        None => before
            .map(|before| before.keys().cloned().collect())
            .unwrap_or_default(),
    };

    fields.sort();
    fields
}
