use std::sync::Arc;

use audit_trail_core::{ActorIdentity, AppError, AppResult};
use audit_trail_domain::{AuditLogEntry, FieldSnapshot, SensitiveDiff, parse_search};
use serde::Serialize;

use crate::{
    AuditEventRepository, AuditLogPage, AuditLogQuery, DecryptOutcome, PrivilegeResolver,
    SensitivePayloadCodec,
};

/// Default number of entries per audit log page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Result of asking for the unmasked values of one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealOutcome {
    /// Viewer is privileged and the payload decrypted.
    Revealed(SensitiveDiff),
    /// Viewer does not hold the privileged role.
    NotAuthorized,
    /// Viewer is privileged but the payload could not be opened.
    DecryptionFailed,
    /// Entry carries no sensitive payload.
    NothingSensitive,
}

/// Sensitive block shown next to the safe properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensitiveSection {
    /// Viewer may not see sensitive values; nothing is shown.
    Hidden,
    /// Decrypted values, already merged into the displayed snapshots.
    Revealed {
        /// Unmasked sensitive values before the mutation.
        before: FieldSnapshot,
        /// Unmasked sensitive values after the mutation.
        after: FieldSnapshot,
    },
    /// Payload present but unreadable; the masked data stays visible.
    DecryptionFailed,
    /// Entry has no sensitive payload.
    Absent,
}

/// Display projection of one audit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntryView {
    /// Stored entry with its safe properties.
    pub entry: AuditLogEntry,
    /// Snapshot before the mutation as shown to this viewer.
    pub display_before: Option<FieldSnapshot>,
    /// Snapshot after the mutation as shown to this viewer.
    pub display_after: Option<FieldSnapshot>,
    /// Sensitive section state.
    pub sensitive: SensitiveSection,
}

/// Read side of the audit trail: search, lookup and gated reveal.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditEventRepository>,
    codec: SensitivePayloadCodec,
    privileges: PrivilegeResolver,
    page_size: usize,
}

impl AuditLogService {
    /// Creates the service with the default page size.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuditEventRepository>,
        codec: SensitivePayloadCodec,
        privileges: PrivilegeResolver,
    ) -> Self {
        Self {
            repository,
            codec,
            privileges,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the page size used by [`AuditLogService::search`].
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Searches the audit log with the user-facing search syntax, newest first.
    pub async fn search(&self, raw_query: &str, page: usize) -> AppResult<AuditLogPage> {
        let predicates = parse_search(raw_query);
        self.repository
            .query_events(predicates.as_slice(), AuditLogQuery::new(page, self.page_size))
            .await
    }

    /// Loads one entry by identifier.
    pub async fn find_entry(&self, event_id: &str) -> AppResult<AuditLogEntry> {
        self.repository
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("audit entry '{event_id}' does not exist")))
    }

    /// Returns the unmasked sensitive values of an entry for a privileged viewer.
    ///
    /// Privilege is checked before the payload is touched.
    pub async fn reveal_sensitive(
        &self,
        entry: &AuditLogEntry,
        viewer: Option<&ActorIdentity>,
    ) -> RevealOutcome {
        if !self.privileges.resolve(viewer).await {
            return RevealOutcome::NotAuthorized;
        }

        let Some(ciphertext) = entry.sensitive_encrypted.as_deref() else {
            return RevealOutcome::NothingSensitive;
        };

        match self.codec.decrypt_diff(ciphertext) {
            DecryptOutcome::Decrypted(diff) => RevealOutcome::Revealed(diff),
            DecryptOutcome::Failed => RevealOutcome::DecryptionFailed,
        }
    }

    /// Builds the display projection of an entry for a viewer.
    pub async fn present(
        &self,
        entry: AuditLogEntry,
        viewer: Option<&ActorIdentity>,
    ) -> AuditEntryView {
        let mut display_before = entry.properties.before.clone();
        let mut display_after = entry.properties.after.clone();

        let sensitive = match self.reveal_sensitive(&entry, viewer).await {
            RevealOutcome::NotAuthorized => SensitiveSection::Hidden,
            RevealOutcome::NothingSensitive => SensitiveSection::Absent,
            RevealOutcome::DecryptionFailed => SensitiveSection::DecryptionFailed,
            RevealOutcome::Revealed(diff) => {
                merge_revealed(&mut display_before, &diff.before);
                merge_revealed(&mut display_after, &diff.after);
                SensitiveSection::Revealed {
                    before: diff.before,
                    after: diff.after,
                }
            }
        };

        AuditEntryView {
            entry,
            display_before,
            display_after,
            sensitive,
        }
    }
}

fn merge_revealed(display: &mut Option<FieldSnapshot>, revealed: &FieldSnapshot) {
    if revealed.is_empty() {
        return;
    }

    let display = display.get_or_insert_with(FieldSnapshot::new);
    for (field_name, value) in revealed {
        display.insert(field_name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests;
