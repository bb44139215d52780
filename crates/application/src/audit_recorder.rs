use std::sync::Arc;

use audit_trail_core::ActorIdentity;
use audit_trail_domain::{
    AuditEvent, AuditEventName, AuditProperties, FieldSnapshot, SensitiveFieldPolicies,
    SensitiveFieldPolicy, SubjectRef, changed_fields, extract_sensitive, mask_for_display,
    strip_reserved_keys,
};
use tracing::{debug, warn};

use crate::{AuditEventRepository, SensitivePayloadCodec};

/// Raw input for one audit entry, captured around a business mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordAuditInput {
    /// Logical channel; also selects the sensitive field policy.
    pub log_name: String,
    /// Event vocabulary token.
    pub event: AuditEventName,
    /// Action token stored in properties. Defaults to the event name.
    pub action: Option<String>,
    /// Human-readable summary.
    pub description: String,
    /// Audited entity.
    pub subject: SubjectRef,
    /// Acting identity. `None` records a system action.
    pub causer: Option<ActorIdentity>,
    /// Raw snapshot before the mutation.
    pub before: Option<FieldSnapshot>,
    /// Raw snapshot after the mutation.
    pub after: Option<FieldSnapshot>,
    /// Extra domain context merged into properties.
    pub context: FieldSnapshot,
}

impl RecordAuditInput {
    /// Creates an input without snapshots, causer or context.
    #[must_use]
    pub fn new(
        log_name: impl Into<String>,
        event: AuditEventName,
        subject: SubjectRef,
        description: impl Into<String>,
    ) -> Self {
        Self {
            log_name: log_name.into(),
            event,
            action: None,
            description: description.into(),
            subject,
            causer: None,
            before: None,
            after: None,
            context: FieldSnapshot::new(),
        }
    }

    /// Sets the acting identity.
    #[must_use]
    pub fn with_causer(mut self, causer: ActorIdentity) -> Self {
        self.causer = Some(causer);
        self
    }

    /// Sets the action token.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the raw snapshot before the mutation.
    #[must_use]
    pub fn with_before(mut self, before: FieldSnapshot) -> Self {
        self.before = Some(before);
        self
    }

    /// Sets the raw snapshot after the mutation.
    #[must_use]
    pub fn with_after(mut self, after: FieldSnapshot) -> Self {
        self.after = Some(after);
        self
    }

    /// Sets extra domain context.
    #[must_use]
    pub fn with_context(mut self, context: FieldSnapshot) -> Self {
        self.context = context;
        self
    }
}

/// What happened to one recording attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The event store accepted the entry.
    Written {
        /// Whether an encrypted sensitive payload was attached.
        with_sensitive_payload: bool,
    },
    /// The entry was dropped; the business operation is unaffected.
    NotWritten {
        /// Failure description, safe to log.
        reason: String,
    },
}

impl RecordOutcome {
    /// Returns whether the entry reached the event store.
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Builds masked audit entries and hands them to the event store.
///
/// Recording is best effort: failures are logged and reported as
/// [`RecordOutcome::NotWritten`], never as an error.
#[derive(Clone)]
pub struct AuditRecorder {
    repository: Arc<dyn AuditEventRepository>,
    codec: SensitivePayloadCodec,
    policies: SensitiveFieldPolicies,
}

impl AuditRecorder {
    /// Creates a recorder with an injected policy registry.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuditEventRepository>,
        codec: SensitivePayloadCodec,
        policies: SensitiveFieldPolicies,
    ) -> Self {
        Self {
            repository,
            codec,
            policies,
        }
    }

    /// Records one entry using the policy registered for its log name.
    pub async fn record(&self, input: RecordAuditInput) -> RecordOutcome {
        let policy = self.policies.for_entity(input.log_name.as_str());
        self.record_with_policy(input, &policy).await
    }

    /// Records one entry with an explicit policy.
    pub async fn record_with_policy(
        &self,
        input: RecordAuditInput,
        policy: &SensitiveFieldPolicy,
    ) -> RecordOutcome {
        let event = self.build_event(input, policy);
        let log_name = event.log_name.clone();
        let event_name = event.event.to_string();
        let with_sensitive_payload = event.sensitive_encrypted.is_some();

        match self.repository.append_event(event).await {
            Ok(()) => {
                debug!(
                    log_name = %log_name,
                    event = %event_name,
                    with_sensitive_payload,
                    "audit entry recorded"
                );
                RecordOutcome::Written {
                    with_sensitive_payload,
                }
            }
            Err(error) => {
                warn!(
                    log_name = %log_name,
                    event = %event_name,
                    error = %error,
                    "audit entry not written"
                );
                RecordOutcome::NotWritten {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Masks snapshots, encrypts the sensitive subset and assembles the event.
    ///
    /// An encryption failure drops the sensitive payload but keeps the entry.
    #[must_use]
    pub fn build_event(&self, input: RecordAuditInput, policy: &SensitiveFieldPolicy) -> AuditEvent {
        let RecordAuditInput {
            log_name,
            event,
            action,
            description,
            subject,
            causer,
            before,
            after,
            mut context,
        } = input;

        let changed = if event.is_removal() {
            changed_fields(before.as_ref(), None)
        } else {
            changed_fields(before.as_ref(), after.as_ref())
        };

        let dropped = strip_reserved_keys(&mut context);
        if !dropped.is_empty() {
            warn!(
                log_name = %log_name,
                keys = ?dropped,
                "audit context keys collide with reserved properties and were dropped"
            );
        }

        let sensitive_context: Vec<&str> = context
            .keys()
            .map(String::as_str)
            .filter(|key| policy.is_sensitive(key))
            .collect();
        if !sensitive_context.is_empty() {
            warn!(
                log_name = %log_name,
                keys = ?sensitive_context,
                "audit context carries sensitive fields; storing them masked"
            );
        }
        let context = mask_for_display(&context, policy);

        let sensitive_before = before
            .as_ref()
            .map(|snapshot| extract_sensitive(snapshot, policy))
            .unwrap_or_default();
        let sensitive_after = after
            .as_ref()
            .map(|snapshot| extract_sensitive(snapshot, policy))
            .unwrap_or_default();

        let sensitive_encrypted = match self.codec.encrypt_diff(sensitive_before, sensitive_after) {
            Ok(blob) => blob,
            Err(error) => {
                warn!(
                    log_name = %log_name,
                    event = %event,
                    error = %error,
                    "sensitive audit payload not encrypted; recording without it"
                );
                None
            }
        };

        let properties = AuditProperties {
            action: action.unwrap_or_else(|| event.to_string()),
            changed_fields: changed,
            before: before.map(|snapshot| mask_for_display(&snapshot, policy)),
            after: after.map(|snapshot| mask_for_display(&snapshot, policy)),
            context,
        };

        AuditEvent {
            log_name,
            event,
            description,
            subject,
            causer: causer.map(|actor| actor.causer()),
            properties,
            sensitive_encrypted,
        }
    }
}

#[cfg(test)]
mod tests;
