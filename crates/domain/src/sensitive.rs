use serde::{Deserialize, Serialize};

use crate::{FieldSnapshot, SensitiveFieldPolicy};

/// Raw before/after values of sensitive fields, the plaintext of the encrypted blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensitiveDiff {
    /// Sensitive values before the mutation.
    #[serde(default)]
    pub before: FieldSnapshot,
    /// Sensitive values after the mutation.
    #[serde(default)]
    pub after: FieldSnapshot,
}

impl SensitiveDiff {
    /// Creates a diff from extracted before/after maps.
    #[must_use]
    pub fn new(before: FieldSnapshot, after: FieldSnapshot) -> Self {
        Self { before, after }
    }

    /// Returns whether neither side carries a sensitive value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Returns the sensitive subset of a snapshot.
///
/// Only keys present in the snapshot are returned; missing keys are omitted
/// rather than represented as null.
#[must_use]
pub fn extract_sensitive(snapshot: &FieldSnapshot, policy: &SensitiveFieldPolicy) -> FieldSnapshot {
    snapshot
        .iter()
        .filter(|(field_name, _)| policy.is_sensitive(field_name))
        .map(|(field_name, value)| (field_name.clone(), value.clone()))
        .collect()
}
