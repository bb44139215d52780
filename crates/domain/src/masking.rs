use serde_json::Value;

use crate::{FieldSnapshot, MaskStrategy, SensitiveFieldPolicy};

/// Marker shown in place of fully masked values.
pub const FULL_MASK: &str = "***";

const MASK_CHAR: char = '*';
const MIN_MASK_RUN: usize = 4;

/// Masks a string keeping `start` leading and `end` trailing characters.
///
/// Length is counted in characters of the trimmed value. A value no longer
/// than `start + end` is masked entirely so a short secret never leaks through
/// its kept prefix and suffix.
#[must_use]
pub fn keep_start_end(value: &str, start: usize, end: usize) -> String {
    let trimmed = value.trim();
    let length = trimmed.chars().count();

    if length == 0 {
        return value.to_owned();
    }

    if length <= start.saturating_add(end) {
        return mask_run(length.max(MIN_MASK_RUN));
    }

    let prefix: String = trimmed.chars().take(start).collect();
    let suffix: String = trimmed.chars().skip(length - end).collect();
    let hidden = (length - start - end).max(MIN_MASK_RUN);

    format!("{prefix}{}{suffix}", mask_run(hidden))
}

/// Masks one value with the given strategy.
///
/// Null and empty values are returned unchanged.
#[must_use]
pub fn mask_value(value: &Value, strategy: MaskStrategy) -> Value {
    if is_blank(value) {
        return value.clone();
    }

    match strategy {
        MaskStrategy::FullMask => Value::String(FULL_MASK.to_owned()),
        MaskStrategy::KeepStartEnd { start, end } => match value {
            Value::String(text) => Value::String(keep_start_end(text, start, end)),
            Value::Number(number) => Value::String(keep_start_end(&number.to_string(), start, end)),
            Value::Bool(flag) => Value::String(keep_start_end(&flag.to_string(), start, end)),
            Value::Array(_) | Value::Object(_) | Value::Null => {
                Value::String(FULL_MASK.to_owned())
            }
        },
    }
}

/// Returns a display-safe copy of a snapshot.
///
/// Every field named by the policy is masked; other fields pass through.
#[must_use]
pub fn mask_for_display(snapshot: &FieldSnapshot, policy: &SensitiveFieldPolicy) -> FieldSnapshot {
    snapshot
        .iter()
        .map(|(field_name, value)| {
            let masked = match policy.mask_strategy_for(field_name) {
                Some(strategy) => mask_value(value, strategy),
                None => value.clone(),
            };
            (field_name.clone(), masked)
        })
        .collect()
}

fn mask_run(length: usize) -> String {
    std::iter::repeat_n(MASK_CHAR, length).collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Number(_) | Value::Bool(_) => false,
    }
}
