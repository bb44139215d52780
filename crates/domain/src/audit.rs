use std::fmt::{Display, Formatter};
use std::str::FromStr;

use audit_trail_core::{AppError, Causer};
use serde::{Deserialize, Serialize};

use crate::FieldSnapshot;

/// Property keys owned by the recorder; domain context cannot override them.
pub const RESERVED_PROPERTY_KEYS: &[&str] = &["action", "changed_fields", "before", "after"];

const BLOCKED_SUFFIX: &str = "_blocked";

/// Event vocabulary shared by audited domains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuditEventName {
    /// Entity was created.
    Created,
    /// Entity was updated.
    Updated,
    /// Entity was deleted.
    Deleted,
    /// Soft-deleted entity was restored.
    Restored,
    /// Entity status flag was flipped.
    StatusToggled,
    /// An action was refused by a business rule, stored as `<action>_blocked`.
    Blocked(String),
    /// Domain-specific event token.
    Custom(String),
}

impl AuditEventName {
    /// Returns whether the event removes its subject, so only a `before` snapshot exists.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl Display for AuditEventName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => formatter.write_str("created"),
            Self::Updated => formatter.write_str("updated"),
            Self::Deleted => formatter.write_str("deleted"),
            Self::Restored => formatter.write_str("restored"),
            Self::StatusToggled => formatter.write_str("status_toggled"),
            Self::Blocked(action) => write!(formatter, "{action}{BLOCKED_SUFFIX}"),
            Self::Custom(token) => formatter.write_str(token),
        }
    }
}

impl FromStr for AuditEventName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value {
            "" => Err(AppError::Validation(
                "audit event name must not be empty".to_owned(),
            )),
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            "restored" => Ok(Self::Restored),
            "status_toggled" => Ok(Self::StatusToggled),
            _ => match value.strip_suffix(BLOCKED_SUFFIX) {
                Some(action) if !action.is_empty() => Ok(Self::Blocked(action.to_owned())),
                _ => Ok(Self::Custom(value.to_owned())),
            },
        }
    }
}

/// Polymorphic reference to the audited entity. Never dereferenced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    /// Entity type label.
    pub subject_type: String,
    /// Entity identifier.
    pub subject_id: String,
}

impl SubjectRef {
    /// Creates a subject reference.
    #[must_use]
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// Safe, masked payload stored with every audit event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditProperties {
    /// Action token describing what happened.
    #[serde(default)]
    pub action: String,
    /// Fields whose value changed, sorted by name.
    #[serde(default)]
    pub changed_fields: Vec<String>,
    /// Masked snapshot before the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<FieldSnapshot>,
    /// Masked snapshot after the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<FieldSnapshot>,
    /// Extra domain context supplied by the caller.
    #[serde(flatten)]
    pub context: FieldSnapshot,
}

impl AuditProperties {
    /// Returns the JSON text used by property searches.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Removes reserved keys from caller context and returns the dropped key names.
pub fn strip_reserved_keys(context: &mut FieldSnapshot) -> Vec<String> {
    let mut dropped = Vec::new();
    for key in RESERVED_PROPERTY_KEYS {
        if context.remove(*key).is_some() {
            dropped.push((*key).to_owned());
        }
    }

    dropped
}

/// Immutable audit event handed to the event store.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Logical channel, e.g. `employee`.
    pub log_name: String,
    /// Event vocabulary token.
    pub event: AuditEventName,
    /// Human-readable summary.
    pub description: String,
    /// Audited entity.
    pub subject: SubjectRef,
    /// Acting identity, absent for system actions.
    pub causer: Option<Causer>,
    /// Safe properties.
    pub properties: AuditProperties,
    /// Encrypted sensitive before/after values, when any sensitive field was touched.
    pub sensitive_encrypted: Option<String>,
}

/// Stored audit event as returned by the event store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    /// Stable event identifier.
    pub event_id: String,
    /// Logical channel.
    pub log_name: String,
    /// Stored event token.
    pub event: String,
    /// Human-readable summary.
    pub description: String,
    /// Audited entity type.
    pub subject_type: String,
    /// Audited entity identifier.
    pub subject_id: String,
    /// Acting identity, absent for system actions.
    pub causer: Option<Causer>,
    /// Safe properties.
    pub properties: AuditProperties,
    /// Encrypted sensitive before/after values.
    #[serde(skip_serializing)]
    pub sensitive_encrypted: Option<String>,
    /// Event timestamp in RFC3339.
    pub created_at: String,
}
