use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use audit_trail_application::{AuditEventRepository, AuditLogPage, AuditLogQuery};
use audit_trail_core::{AppError, AppResult, Causer};
use audit_trail_domain::{AuditEvent, AuditLogEntry, AuditProperties, SearchPredicate};

use crate::{SqlDialect, push_search_where};

const ENTRY_COLUMNS: &str = "SELECT id, log_name, event, description, subject_type, subject_id, \
     causer_name, causer_email, properties, sensitive_encrypted, created_at FROM audit_events";

/// PostgreSQL-backed append-only audit event store.
#[derive(Clone)]
pub struct PostgresAuditEventRepository {
    pool: PgPool,
}

impl PostgresAuditEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditEventRow {
    id: Uuid,
    log_name: String,
    event: String,
    description: String,
    subject_type: String,
    subject_id: String,
    causer_name: Option<String>,
    causer_email: Option<String>,
    properties: Value,
    sensitive_encrypted: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditEventRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditEventRow) -> Result<Self, Self::Error> {
        let properties: AuditProperties =
            serde_json::from_value(row.properties).map_err(|error| {
                AppError::Internal(format!(
                    "stored properties of audit event '{}' are malformed: {error}",
                    row.id
                ))
            })?;

        Ok(Self {
            event_id: row.id.to_string(),
            log_name: row.log_name,
            event: row.event,
            description: row.description,
            subject_type: row.subject_type,
            subject_id: row.subject_id,
            causer: row.causer_name.map(|name| Causer {
                name,
                email: row.causer_email,
            }),
            properties,
            sensitive_encrypted: row.sensitive_encrypted,
            created_at: row.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

#[async_trait]
impl AuditEventRepository for PostgresAuditEventRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let properties = serde_json::to_value(&event.properties).map_err(|error| {
            AppError::Internal(format!("failed to serialize audit properties: {error}"))
        })?;
        let (causer_name, causer_email) = match event.causer {
            Some(causer) => (Some(causer.name), causer.email),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id,
                log_name,
                event,
                description,
                subject_type,
                subject_id,
                causer_name,
                causer_email,
                properties,
                sensitive_encrypted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.log_name)
        .bind(event.event.to_string())
        .bind(event.description)
        .bind(event.subject.subject_type)
        .bind(event.subject.subject_id)
        .bind(causer_name)
        .bind(causer_email)
        .bind(properties)
        .bind(event.sensitive_encrypted)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }

    async fn query_events(
        &self,
        predicates: &[SearchPredicate],
        query: AuditLogQuery,
    ) -> AppResult<AuditLogPage> {
        let limit = i64::try_from(query.per_page).map_err(|error| {
            AppError::Validation(format!("invalid audit log page size: {error}"))
        })?;
        let offset = i64::try_from(query.offset()).map_err(|error| {
            AppError::Validation(format!("invalid audit log page: {error}"))
        })?;

        let mut count_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_events");
        push_search_where(&mut count_builder, SqlDialect::Postgres, predicates);
        let total: i64 = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to count audit events: {error}"))
            })?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(ENTRY_COLUMNS);
        push_search_where(&mut builder, SqlDialect::Postgres, predicates);
        builder.push(" ORDER BY created_at DESC, append_seq DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<AuditEventRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list audit events: {error}"))
            })?;

        Ok(AuditLogPage {
            entries: rows
                .into_iter()
                .map(AuditLogEntry::try_from)
                .collect::<AppResult<Vec<_>>>()?,
            total: usize::try_from(total).unwrap_or_default(),
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn find_event(&self, event_id: &str) -> AppResult<Option<AuditLogEntry>> {
        let Ok(id) = Uuid::parse_str(event_id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, AuditEventRow>(&format!("{ENTRY_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load audit event: {error}")))?;

        row.map(AuditLogEntry::try_from).transpose()
    }
}
