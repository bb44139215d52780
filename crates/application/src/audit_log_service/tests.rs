use std::sync::Arc;

use audit_trail_core::{ActorIdentity, AppError, AppResult, NonEmptyString};
use audit_trail_domain::{AuditEventName, SensitiveDiff, SensitiveFieldPolicies, SubjectRef};
use serde_json::json;

use super::{AuditLogService, RevealOutcome, SensitiveSection};
use crate::test_support::{
    FakeAuditEventRepository, FakeRoleAssignmentRepository, ReversingCipher, snapshot,
};
use crate::{
    AuditRecorder, PrivilegeResolver, PrivilegeSettings, RecordAuditInput, SensitivePayloadCodec,
};

struct Harness {
    recorder: AuditRecorder,
    service: AuditLogService,
    repository: Arc<FakeAuditEventRepository>,
}

fn harness() -> AppResult<Harness> {
    let repository = Arc::new(FakeAuditEventRepository::default());
    let codec = SensitivePayloadCodec::new(Arc::new(ReversingCipher));
    let roles = FakeRoleAssignmentRepository::with_assignment("1", "user", "super_admin");
    let privileges = PrivilegeResolver::new(
        Arc::new(roles),
        PrivilegeSettings::new(NonEmptyString::new("super_admin")?, vec!["user".to_owned()]),
    );

    Ok(Harness {
        recorder: AuditRecorder::new(
            repository.clone(),
            codec.clone(),
            SensitiveFieldPolicies::builtin(),
        ),
        service: AuditLogService::new(repository.clone(), codec, privileges).with_page_size(2),
        repository,
    })
}

fn admin() -> ActorIdentity {
    ActorIdentity::new("1", "user", "Root Admin", Some("root@acme.test".to_owned()))
}

fn clerk() -> ActorIdentity {
    ActorIdentity::new("2", "user", "Payroll Clerk", None)
}

fn salary_update() -> RecordAuditInput {
    RecordAuditInput::new(
        "employee",
        AuditEventName::Updated,
        SubjectRef::new("App\\Models\\Employee", "1042"),
        "Employee salary revised",
    )
    .with_causer(admin())
    .with_before(snapshot(json!({"cin": "AB123456", "salaryGross": 12000})))
    .with_after(snapshot(json!({"cin": "AB123456", "salaryGross": 13000})))
}

#[tokio::test]
async fn privileged_viewer_sees_decrypted_values() -> AppResult<()> {
    let harness = harness()?;
    let _ = harness.recorder.record(salary_update()).await;
    let entry = harness.service.find_entry("evt-1").await?;

    let outcome = harness.service.reveal_sensitive(&entry, Some(&admin())).await;

    assert_eq!(
        outcome,
        RevealOutcome::Revealed(SensitiveDiff::new(
            snapshot(json!({"cin": "AB123456", "salaryGross": 12000})),
            snapshot(json!({"cin": "AB123456", "salaryGross": 13000})),
        ))
    );
    Ok(())
}

#[tokio::test]
async fn unprivileged_viewer_is_refused_regardless_of_blob() -> AppResult<()> {
    let harness = harness()?;
    let _ = harness.recorder.record(salary_update()).await;
    let mut entry = harness.service.find_entry("evt-1").await?;

    assert_eq!(
        harness.service.reveal_sensitive(&entry, Some(&clerk())).await,
        RevealOutcome::NotAuthorized
    );
    assert_eq!(
        harness.service.reveal_sensitive(&entry, None).await,
        RevealOutcome::NotAuthorized
    );

    entry.sensitive_encrypted = Some("garbage".to_owned());
    assert_eq!(
        harness.service.reveal_sensitive(&entry, Some(&clerk())).await,
        RevealOutcome::NotAuthorized
    );

    entry.sensitive_encrypted = None;
    assert_eq!(
        harness.service.reveal_sensitive(&entry, Some(&clerk())).await,
        RevealOutcome::NotAuthorized
    );
    Ok(())
}

#[tokio::test]
async fn corrupt_blob_is_a_soft_failure() -> AppResult<()> {
    let harness = harness()?;
    let _ = harness.recorder.record(salary_update()).await;
    let mut entry = harness.service.find_entry("evt-1").await?;
    entry.sensitive_encrypted = Some("rev:}{not json".to_owned());

    let view = harness.service.present(entry, Some(&admin())).await;

    assert_eq!(view.sensitive, SensitiveSection::DecryptionFailed);
    let after = view.display_after.unwrap_or_default();
    assert_eq!(after.get("salaryGross"), Some(&json!("***")));
    assert_eq!(after.get("cin"), Some(&json!("AB****56")));
    Ok(())
}

#[tokio::test]
async fn entries_without_blob_report_nothing_sensitive() -> AppResult<()> {
    let harness = harness()?;
    let input = RecordAuditInput::new(
        "employee",
        AuditEventName::Updated,
        SubjectRef::new("App\\Models\\Employee", "1042"),
        "Employee renamed",
    )
    .with_after(snapshot(json!({"firstName": "Tess"})));
    let _ = harness.recorder.record(input).await;
    let entry = harness.service.find_entry("evt-1").await?;

    assert_eq!(
        harness.service.reveal_sensitive(&entry, Some(&admin())).await,
        RevealOutcome::NothingSensitive
    );
    let view = harness.service.present(entry, Some(&admin())).await;
    assert_eq!(view.sensitive, SensitiveSection::Absent);
    Ok(())
}

#[tokio::test]
async fn present_merges_revealed_values_for_privileged_viewer_only() -> AppResult<()> {
    let harness = harness()?;
    let _ = harness.recorder.record(salary_update()).await;
    let entry = harness.service.find_entry("evt-1").await?;

    let privileged = harness.service.present(entry.clone(), Some(&admin())).await;
    let after = privileged.display_after.clone().unwrap_or_default();
    assert_eq!(after.get("salaryGross"), Some(&json!(13000)));
    assert_eq!(after.get("cin"), Some(&json!("AB123456")));
    assert!(matches!(privileged.sensitive, SensitiveSection::Revealed { .. }));
    assert_eq!(
        privileged.entry.properties.after,
        entry.properties.after,
        "stored safe properties stay masked"
    );

    let hidden = harness.service.present(entry, Some(&clerk())).await;
    let after = hidden.display_after.unwrap_or_default();
    assert_eq!(after.get("salaryGross"), Some(&json!("***")));
    assert_eq!(hidden.sensitive, SensitiveSection::Hidden);
    Ok(())
}

#[tokio::test]
async fn search_pages_newest_first() -> AppResult<()> {
    let harness = harness()?;
    for subject_id in ["1", "2", "3"] {
        let input = RecordAuditInput::new(
            "employee",
            AuditEventName::Updated,
            SubjectRef::new("App\\Models\\Employee", subject_id),
            "Employee updated",
        )
        .with_after(snapshot(json!({"firstName": "Test"})));
        let _ = harness.recorder.record(input).await;
    }

    let first = harness.service.search("", 1).await?;
    assert_eq!(first.total, 3);
    assert_eq!(first.per_page, 2);
    let ids: Vec<&str> = first
        .entries
        .iter()
        .map(|entry| entry.subject_id.as_str())
        .collect();
    assert_eq!(ids, vec!["3", "2"]);

    let second = harness.service.search("", 2).await?;
    assert_eq!(second.entries.len(), 1);
    assert_eq!(second.entries[0].subject_id, "1");
    Ok(())
}

#[tokio::test]
async fn search_applies_parsed_predicates() -> AppResult<()> {
    let harness = harness()?;
    let _ = harness.recorder.record(salary_update()).await;
    let _ = harness
        .recorder
        .record(RecordAuditInput::new(
            "categories",
            AuditEventName::Blocked("delete".to_owned()),
            SubjectRef::new("App\\Models\\Category", "3"),
            "Category still has products",
        ))
        .await;

    assert_eq!(harness.service.search("user:root", 1).await?.total, 1);
    assert_eq!(harness.service.search("event:delete_blocked", 1).await?.total, 1);
    assert_eq!(harness.service.search("\"still has\" category", 1).await?.total, 1);
    assert_eq!(harness.service.search("models", 1).await?.total, 2);
    assert_eq!(harness.service.search("AB123456", 1).await?.total, 0);
    Ok(())
}

#[tokio::test]
async fn missing_entry_is_not_found() -> AppResult<()> {
    let harness = harness()?;

    let result = harness.service.find_entry("evt-404").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(harness.repository.recorded().await.is_empty());
    Ok(())
}
