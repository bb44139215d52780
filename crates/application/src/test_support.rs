use std::collections::HashSet;

use async_trait::async_trait;
use audit_trail_core::{AppError, AppResult};
use audit_trail_domain::{AuditEvent, AuditLogEntry, FieldSnapshot, SearchPredicate};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    AuditEventRepository, AuditLogPage, AuditLogQuery, RoleAssignmentRepository, SensitiveCipher,
};

const REVERSED_PREFIX: &str = "rev:";

pub(crate) fn snapshot(value: Value) -> FieldSnapshot {
    match value {
        Value::Object(map) => map,
        _ => FieldSnapshot::new(),
    }
}

/// Reversible stand-in cipher: hides plaintext without key material.
pub(crate) struct ReversingCipher;

impl SensitiveCipher for ReversingCipher {
    fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        Ok(format!(
            "{REVERSED_PREFIX}{}",
            plaintext.chars().rev().collect::<String>()
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        ciphertext
            .strip_prefix(REVERSED_PREFIX)
            .map(|body| body.chars().rev().collect())
            .ok_or_else(|| AppError::Decryption("unknown ciphertext envelope".to_owned()))
    }
}

pub(crate) struct FailingCipher;

impl SensitiveCipher for FailingCipher {
    fn encrypt(&self, _plaintext: &str) -> AppResult<String> {
        Err(AppError::Encryption("cipher unavailable".to_owned()))
    }

    fn decrypt(&self, _ciphertext: &str) -> AppResult<String> {
        Err(AppError::Decryption("cipher unavailable".to_owned()))
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditEventRepository {
    pub(crate) entries: Mutex<Vec<AuditLogEntry>>,
    pub(crate) fail_appends: bool,
}

impl FakeAuditEventRepository {
    pub(crate) fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail_appends: true,
        }
    }

    pub(crate) async fn recorded(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditEventRepository for FakeAuditEventRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail_appends {
            return Err(AppError::Internal("event store offline".to_owned()));
        }

        let mut entries = self.entries.lock().await;
        let sequence = entries.len() + 1;
        entries.push(AuditLogEntry {
            event_id: format!("evt-{sequence}"),
            log_name: event.log_name,
            event: event.event.to_string(),
            description: event.description,
            subject_type: event.subject.subject_type,
            subject_id: event.subject.subject_id,
            causer: event.causer,
            properties: event.properties,
            sensitive_encrypted: event.sensitive_encrypted,
            created_at: format!("2026-03-01T09:{sequence:02}:00Z"),
        });
        Ok(())
    }

    async fn query_events(
        &self,
        predicates: &[SearchPredicate],
        query: AuditLogQuery,
    ) -> AppResult<AuditLogPage> {
        let entries = self.entries.lock().await;
        let matching: Vec<AuditLogEntry> = entries
            .iter()
            .rev()
            .filter(|entry| predicates.iter().all(|predicate| predicate.matches(entry)))
            .cloned()
            .collect();

        Ok(AuditLogPage {
            total: matching.len(),
            entries: matching
                .into_iter()
                .skip(query.offset())
                .take(query.per_page)
                .collect(),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn find_event(&self, event_id: &str) -> AppResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.event_id == event_id)
            .cloned())
    }
}

/// Role assignments keyed by `(actor_id, actor_type, role_name)`.
#[derive(Default)]
pub(crate) struct FakeRoleAssignmentRepository {
    pub(crate) assignments: HashSet<(String, String, String)>,
    pub(crate) fail_typed_lookups: bool,
    pub(crate) typed_lookups: Mutex<usize>,
    pub(crate) fallback_lookups: Mutex<usize>,
}

impl FakeRoleAssignmentRepository {
    pub(crate) fn with_assignment(actor_id: &str, actor_type: &str, role_name: &str) -> Self {
        Self {
            assignments: HashSet::from([(
                actor_id.to_owned(),
                actor_type.to_owned(),
                role_name.to_owned(),
            )]),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RoleAssignmentRepository for FakeRoleAssignmentRepository {
    async fn role_assignment_exists(
        &self,
        actor_id: &str,
        actor_types: &[String],
        role_name: &str,
    ) -> AppResult<bool> {
        *self.typed_lookups.lock().await += 1;
        if self.fail_typed_lookups {
            return Err(AppError::Internal("role store offline".to_owned()));
        }

        Ok(actor_types.iter().any(|actor_type| {
            self.assignments.contains(&(
                actor_id.to_owned(),
                actor_type.clone(),
                role_name.to_owned(),
            ))
        }))
    }

    async fn role_assignment_exists_for_any_type(
        &self,
        actor_id: &str,
        role_name: &str,
    ) -> AppResult<bool> {
        *self.fallback_lookups.lock().await += 1;
        Ok(self
            .assignments
            .iter()
            .any(|(id, _, role)| id == actor_id && role == role_name))
    }
}
