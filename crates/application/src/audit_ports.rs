use async_trait::async_trait;
use audit_trail_core::AppResult;
use audit_trail_domain::{AuditEvent, AuditLogEntry, SearchPredicate};
use serde::Serialize;

/// Upper bound for one audit log page.
pub const MAX_PAGE_SIZE: usize = 200;

/// Pagination parameters for audit log listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// One-based page number.
    pub page: usize,
    /// Maximum rows per page.
    pub per_page: usize,
}

impl AuditLogQuery {
    /// Creates a query with page and size clamped to supported bounds.
    #[must_use]
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns the number of rows skipped before this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// One page of audit log entries, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogPage {
    /// Entries on this page.
    pub entries: Vec<AuditLogEntry>,
    /// Number of entries matching the predicates across all pages.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Maximum rows per page.
    pub per_page: usize,
}

/// Port for the append-only audit event store.
#[async_trait]
pub trait AuditEventRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;

    /// Lists entries matching every predicate, newest first.
    async fn query_events(
        &self,
        predicates: &[SearchPredicate],
        query: AuditLogQuery,
    ) -> AppResult<AuditLogPage>;

    /// Finds one entry by identifier.
    async fn find_event(&self, event_id: &str) -> AppResult<Option<AuditLogEntry>>;
}

/// Port for role assignment lookups.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Returns whether the actor holds the role under any of the given actor types.
    async fn role_assignment_exists(
        &self,
        actor_id: &str,
        actor_types: &[String],
        role_name: &str,
    ) -> AppResult<bool>;

    /// Returns whether the actor id holds the role regardless of actor type.
    async fn role_assignment_exists_for_any_type(
        &self,
        actor_id: &str,
        role_name: &str,
    ) -> AppResult<bool>;
}

/// Process-wide symmetric cipher protecting sensitive payloads.
pub trait SensitiveCipher: Send + Sync {
    /// Encrypts plaintext into an opaque text blob.
    fn encrypt(&self, plaintext: &str) -> AppResult<String>;

    /// Decrypts a blob produced by [`SensitiveCipher::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> AppResult<String>;
}
