//! Infrastructure adapters for audit trail ports.

#![forbid(unsafe_code)]

mod aes_sensitive_cipher;
mod audit_search_sql;
mod in_memory_audit_event_repository;
mod in_memory_role_assignment_repository;
mod postgres_audit_event_repository;
mod postgres_role_assignment_repository;

pub use aes_sensitive_cipher::AesSensitiveCipher;
pub use audit_search_sql::{SqlDialect, push_search_where};
pub use in_memory_audit_event_repository::InMemoryAuditEventRepository;
pub use in_memory_role_assignment_repository::InMemoryRoleAssignmentRepository;
pub use postgres_audit_event_repository::PostgresAuditEventRepository;
pub use postgres_role_assignment_repository::PostgresRoleAssignmentRepository;
