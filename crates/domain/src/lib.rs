//! Audit trail domain model: policies, masking, diffing and search.

#![forbid(unsafe_code)]

mod audit;
mod masking;
mod policy;
mod search;
mod sensitive;
mod snapshot;

pub use audit::{
    AuditEvent, AuditEventName, AuditLogEntry, AuditProperties, RESERVED_PROPERTY_KEYS,
    SubjectRef, strip_reserved_keys,
};
pub use masking::{FULL_MASK, keep_start_end, mask_for_display, mask_value};
pub use policy::{EMPLOYEE_ENTITY_TYPE, MaskStrategy, SensitiveFieldPolicies, SensitiveFieldPolicy};
pub use search::{
    LIKE_ESCAPE, SearchField, SearchPredicate, SearchPredicateKind, contains_pattern, escape_like,
    parse_search, tokenize_terms,
};
pub use sensitive::{SensitiveDiff, extract_sensitive};
pub use snapshot::{FieldSnapshot, changed_fields, values_equal};
