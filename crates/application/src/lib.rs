//! Audit trail application services and ports.

#![forbid(unsafe_code)]

mod audit_log_service;
mod audit_ports;
mod audit_recorder;
mod privilege_resolver;
mod sensitive_payload_codec;

#[cfg(test)]
mod test_support;

pub use audit_log_service::{
    AuditEntryView, AuditLogService, DEFAULT_PAGE_SIZE, RevealOutcome, SensitiveSection,
};
pub use audit_ports::{
    AuditEventRepository, AuditLogPage, AuditLogQuery, MAX_PAGE_SIZE, RoleAssignmentRepository,
    SensitiveCipher,
};
pub use audit_recorder::{AuditRecorder, RecordAuditInput, RecordOutcome};
pub use privilege_resolver::{PrivilegeResolver, PrivilegeSettings};
pub use sensitive_payload_codec::{DecryptOutcome, SensitivePayloadCodec};
