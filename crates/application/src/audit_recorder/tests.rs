use std::sync::Arc;

use audit_trail_core::ActorIdentity;
use audit_trail_domain::{
    AuditEventName, MaskStrategy, SensitiveDiff, SensitiveFieldPolicies, SensitiveFieldPolicy,
    SubjectRef,
};
use serde_json::json;

use super::{AuditRecorder, RecordAuditInput, RecordOutcome};
use crate::test_support::{FailingCipher, FakeAuditEventRepository, ReversingCipher, snapshot};
use crate::{DecryptOutcome, SensitiveCipher, SensitivePayloadCodec};

fn recorder_with(
    repository: Arc<FakeAuditEventRepository>,
    cipher: Arc<dyn SensitiveCipher>,
) -> AuditRecorder {
    AuditRecorder::new(
        repository,
        SensitivePayloadCodec::new(cipher),
        SensitiveFieldPolicies::builtin(),
    )
}

fn hr_manager() -> ActorIdentity {
    ActorIdentity::new(
        "42",
        "employee",
        "Nadia Berrada",
        Some("nadia@acme.test".to_owned()),
    )
}

fn salary_update() -> RecordAuditInput {
    RecordAuditInput::new(
        "employee",
        AuditEventName::Updated,
        SubjectRef::new("App\\Models\\Employee", "1042"),
        "Employee salary revised",
    )
    .with_action("update_employee")
    .with_causer(hr_manager())
    .with_before(snapshot(json!({"cin": "AB123456", "salaryGross": 12000})))
    .with_after(snapshot(json!({"cin": "AB123456", "salaryGross": 13000})))
}

#[tokio::test]
async fn employee_update_is_masked_and_encrypted() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let outcome = recorder.record(salary_update()).await;
    assert_eq!(
        outcome,
        RecordOutcome::Written {
            with_sensitive_payload: true
        }
    );

    let entries = repository.recorded().await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];

    assert_eq!(entry.event, "updated");
    assert_eq!(entry.properties.action, "update_employee");
    assert_eq!(entry.properties.changed_fields, vec!["salaryGross".to_owned()]);

    let after = entry.properties.after.clone().unwrap_or_default();
    assert_eq!(after.get("salaryGross"), Some(&json!("***")));
    assert_eq!(after.get("cin"), Some(&json!("AB****56")));
    let before = entry.properties.before.clone().unwrap_or_default();
    assert_eq!(before.get("salaryGross"), Some(&json!("***")));

    let causer = entry.causer.clone().map(|causer| causer.name);
    assert_eq!(causer.as_deref(), Some("Nadia Berrada"));

    let codec = SensitivePayloadCodec::new(Arc::new(ReversingCipher));
    let revealed = entry
        .sensitive_encrypted
        .as_deref()
        .map(|blob| codec.decrypt_diff(blob));
    assert_eq!(
        revealed,
        Some(DecryptOutcome::Decrypted(SensitiveDiff::new(
            snapshot(json!({"cin": "AB123456", "salaryGross": 12000})),
            snapshot(json!({"cin": "AB123456", "salaryGross": 13000})),
        )))
    );
}

#[tokio::test]
async fn safe_properties_never_embed_raw_secrets() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let _ = recorder.record(salary_update()).await;

    let entries = repository.recorded().await;
    let text = entries
        .first()
        .map(|entry| entry.properties.searchable_text())
        .unwrap_or_default();
    assert!(!text.contains("AB123456"));
    assert!(!text.contains("13000"));
    assert!(!text.contains("sensitive"));
}

#[tokio::test]
async fn non_sensitive_changes_produce_no_blob() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = RecordAuditInput::new(
        "employee",
        AuditEventName::Updated,
        SubjectRef::new("App\\Models\\Employee", "1042"),
        "Employee renamed",
    )
    .with_before(snapshot(json!({"firstName": "Test"})))
    .with_after(snapshot(json!({"firstName": "Tess"})));

    let outcome = recorder.record(input).await;
    assert_eq!(
        outcome,
        RecordOutcome::Written {
            with_sensitive_payload: false
        }
    );

    let entries = repository.recorded().await;
    assert!(entries.iter().all(|entry| entry.sensitive_encrypted.is_none()));
    assert!(entries.iter().all(|entry| entry.causer.is_none()));
    assert!(entries.iter().all(|entry| entry.properties.action == "updated"));
}

#[tokio::test]
async fn encryption_failure_keeps_the_masked_entry() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(FailingCipher));

    let outcome = recorder.record(salary_update()).await;
    assert_eq!(
        outcome,
        RecordOutcome::Written {
            with_sensitive_payload: false
        }
    );

    let entries = repository.recorded().await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].sensitive_encrypted.is_none());
    assert_eq!(
        entries[0].properties.changed_fields,
        vec!["salaryGross".to_owned()]
    );
}

#[tokio::test]
async fn store_failure_is_reported_not_raised() {
    let repository = Arc::new(FakeAuditEventRepository::failing());
    let recorder = recorder_with(repository, Arc::new(ReversingCipher));

    let outcome = recorder.record(salary_update()).await;

    assert!(!outcome.is_written());
    assert!(matches!(
        outcome,
        RecordOutcome::NotWritten { reason } if reason.contains("event store offline")
    ));
}

#[tokio::test]
async fn create_encrypts_after_side_only() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = RecordAuditInput::new(
        "employee",
        AuditEventName::Created,
        SubjectRef::new("App\\Models\\Employee", "7"),
        "Employee hired",
    )
    .with_after(snapshot(json!({"firstName": "Test", "bankIban": "MA6400112233445566"})));

    let _ = recorder.record(input).await;

    let entries = repository.recorded().await;
    let entry = &entries[0];
    assert_eq!(
        entry.properties.changed_fields,
        vec!["bankIban".to_owned(), "firstName".to_owned()]
    );
    assert!(entry.properties.before.is_none());

    let codec = SensitivePayloadCodec::new(Arc::new(ReversingCipher));
    let revealed = entry
        .sensitive_encrypted
        .as_deref()
        .map(|blob| codec.decrypt_diff(blob));
    assert_eq!(
        revealed,
        Some(DecryptOutcome::Decrypted(SensitiveDiff::new(
            snapshot(json!({})),
            snapshot(json!({"bankIban": "MA6400112233445566"})),
        )))
    );
}

#[tokio::test]
async fn delete_lists_fields_from_before_snapshot() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = RecordAuditInput::new(
        "employee",
        AuditEventName::Deleted,
        SubjectRef::new("App\\Models\\Employee", "7"),
        "Employee removed",
    )
    .with_before(snapshot(json!({"lastName": "Employee", "cin": "ZX998877"})));

    let _ = recorder.record(input).await;

    let entries = repository.recorded().await;
    assert_eq!(
        entries[0].properties.changed_fields,
        vec!["cin".to_owned(), "lastName".to_owned()]
    );
    assert!(entries[0].properties.after.is_none());
    assert!(entries[0].sensitive_encrypted.is_some());
}

#[tokio::test]
async fn reserved_context_keys_cannot_override_recorded_fields() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = RecordAuditInput::new(
        "categories",
        AuditEventName::Blocked("delete".to_owned()),
        SubjectRef::new("App\\Models\\Category", "3"),
        "Category still has products",
    )
    .with_context(snapshot(json!({"action": "spoofed", "products_count": 4})));

    let _ = recorder.record(input).await;

    let entries = repository.recorded().await;
    assert_eq!(entries[0].event, "delete_blocked");
    assert_eq!(entries[0].properties.action, "delete_blocked");
    assert_eq!(
        entries[0].properties.context.get("products_count"),
        Some(&json!(4))
    );
    assert!(entries[0].properties.context.get("action").is_none());
}

#[tokio::test]
async fn sensitive_context_keys_are_stored_masked() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = salary_update().with_context(snapshot(json!({
        "salaryGross": 13000,
        "cin": "AB123456",
        "reason": "annual review"
    })));
    let _ = recorder.record(input).await;

    let entries = repository.recorded().await;
    let context = entries[0].properties.context.clone();
    assert_eq!(context.get("salaryGross"), Some(&json!("***")));
    assert_eq!(context.get("cin"), Some(&json!("AB****56")));
    assert_eq!(context.get("reason"), Some(&json!("annual review")));

    let text = entries[0].properties.searchable_text();
    assert!(!text.contains("AB123456"));
    assert!(!text.contains("13000"));
}

#[tokio::test]
async fn explicit_policy_overrides_registry_lookup() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));
    let policy =
        SensitiveFieldPolicy::new("supplier").with_field("vatNumber", MaskStrategy::FullMask);

    let input = RecordAuditInput::new(
        "supplier",
        AuditEventName::Updated,
        SubjectRef::new("App\\Models\\Supplier", "9"),
        "Supplier updated",
    )
    .with_before(snapshot(json!({"vatNumber": "FR123"})))
    .with_after(snapshot(json!({"vatNumber": "FR456"})));

    let outcome = recorder.record_with_policy(input, &policy).await;
    assert_eq!(
        outcome,
        RecordOutcome::Written {
            with_sensitive_payload: true
        }
    );

    let entries = repository.recorded().await;
    let after = entries[0].properties.after.clone().unwrap_or_default();
    assert_eq!(after.get("vatNumber"), Some(&json!("***")));
}

#[tokio::test]
async fn unknown_log_name_masks_nothing() {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let recorder = recorder_with(repository.clone(), Arc::new(ReversingCipher));

    let input = RecordAuditInput::new(
        "categories",
        AuditEventName::StatusToggled,
        SubjectRef::new("App\\Models\\Category", "3"),
        "Category disabled",
    )
    .with_before(snapshot(json!({"is_active": true, "cin": "AB123456"})))
    .with_after(snapshot(json!({"is_active": false, "cin": "AB123456"})));

    let _ = recorder.record(input).await;

    let entries = repository.recorded().await;
    let after = entries[0].properties.after.clone().unwrap_or_default();
    assert_eq!(after.get("cin"), Some(&json!("AB123456")));
    assert!(entries[0].sensitive_encrypted.is_none());
    assert_eq!(
        entries[0].properties.changed_fields,
        vec!["is_active".to_owned()]
    );
}
