use async_trait::async_trait;
use audit_trail_application::{AuditEventRepository, AuditLogPage, AuditLogQuery};
use audit_trail_core::AppResult;
use audit_trail_domain::{AuditEvent, AuditLogEntry, SearchPredicate};
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory audit event store evaluating predicates with domain matching.
#[derive(Debug, Default)]
pub struct InMemoryAuditEventRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditEventRepository {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditEventRepository for InMemoryAuditEventRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let entry = AuditLogEntry {
            event_id: Uuid::new_v4().to_string(),
            log_name: event.log_name,
            event: event.event.to_string(),
            description: event.description,
            subject_type: event.subject.subject_type,
            subject_id: event.subject.subject_id,
            causer: event.causer,
            properties: event.properties,
            sensitive_encrypted: event.sensitive_encrypted,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn query_events(
        &self,
        predicates: &[SearchPredicate],
        query: AuditLogQuery,
    ) -> AppResult<AuditLogPage> {
        let entries = self.entries.read().await;

        // Insertion order is chronological; newest first means walking backwards.
        let matching: Vec<&AuditLogEntry> = entries
            .iter()
            .rev()
            .filter(|entry| predicates.iter().all(|predicate| predicate.matches(entry)))
            .collect();

        Ok(AuditLogPage {
            total: matching.len(),
            entries: matching
                .into_iter()
                .skip(query.offset())
                .take(query.per_page)
                .cloned()
                .collect(),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn find_event(&self, event_id: &str) -> AppResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| entry.event_id == event_id)
            .cloned())
    }
}
