//! Audit trail operator command line.

#![forbid(unsafe_code)]

mod cli_command;
mod cli_config;

use std::sync::Arc;

use audit_trail_application::{AuditLogService, PrivilegeResolver, SensitivePayloadCodec};
use audit_trail_core::{ActorIdentity, AppError, AppResult};
use audit_trail_domain::{FieldSnapshot, SensitiveFieldPolicies, mask_for_display, parse_search};
use audit_trail_infrastructure::{
    AesSensitiveCipher, PostgresAuditEventRepository, PostgresRoleAssignmentRepository,
    SqlDialect, push_search_where,
};
use clap::Parser;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySql, PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::cli_command::{Cli, CliCommand};
use crate::cli_config::{CliConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;

    match cli.command {
        CliCommand::Migrate => {
            let pool = connect_pool(config.database_url()?).await?;
            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;
            info!("audit trail migrations applied");
        }
        CliCommand::Search { query, page } => {
            let pool = connect_pool(config.database_url()?).await?;
            let service = build_audit_log_service(&config, pool)?;
            let result = service.search(query.join(" ").as_str(), page).await?;

            info!(
                total = result.total,
                page = result.page,
                per_page = result.per_page,
                "audit log search finished"
            );
            print_json(&result)?;
        }
        CliCommand::Show {
            event_id,
            actor_id,
            actor_type,
        } => {
            let pool = connect_pool(config.database_url()?).await?;
            let service = build_audit_log_service(&config, pool)?;
            let entry = service.find_entry(event_id.as_str()).await?;
            let viewer = CliCommand::viewer(actor_id, actor_type).map(|(actor_id, actor_type)| {
                ActorIdentity::new(actor_id.clone(), actor_type, actor_id, None)
            });

            let view = service.present(entry, viewer.as_ref()).await;
            print_json(&view)?;
        }
        CliCommand::Grant {
            role: role_name,
            actor_type,
            actor_id,
        } => {
            let pool = connect_pool(config.database_url()?).await?;
            PostgresRoleAssignmentRepository::new(pool)
                .assign_role(role_name.as_str(), actor_type.as_str(), actor_id.as_str())
                .await?;
            info!(
                role = %role_name,
                actor_type = %actor_type,
                actor_id = %actor_id,
                "role granted"
            );
        }
        CliCommand::Explain { query } => {
            println!(
                "{}",
                explain_search(config.search_dialect, query.join(" ").as_str())
            );
        }
        CliCommand::Mask {
            entity_type,
            snapshot_json,
        } => {
            let policies = config.load_policies()?;
            let masked = mask_snapshot(&policies, entity_type.as_str(), snapshot_json.as_str())?;
            print_json(&masked)?;
        }
    }

    Ok(())
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_audit_log_service(config: &CliConfig, pool: PgPool) -> AppResult<AuditLogService> {
    let cipher = AesSensitiveCipher::from_hex(config.encryption_key()?)?;
    let events = Arc::new(PostgresAuditEventRepository::new(pool.clone()));
    let roles = Arc::new(PostgresRoleAssignmentRepository::new(pool));

    Ok(AuditLogService::new(
        events,
        SensitivePayloadCodec::new(Arc::new(cipher)),
        PrivilegeResolver::new(roles, config.privilege_settings()),
    )
    .with_page_size(config.page_size))
}

fn explain_search(dialect: SqlDialect, query: &str) -> String {
    let predicates = parse_search(query);
    let select = "SELECT * FROM audit_events";

    match dialect {
        SqlDialect::Postgres => {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(select);
            push_search_where(&mut builder, dialect, predicates.as_slice());
            builder.sql().to_owned()
        }
        SqlDialect::Generic => {
            let mut builder: QueryBuilder<'_, MySql> = QueryBuilder::new(select);
            push_search_where(&mut builder, dialect, predicates.as_slice());
            builder.sql().to_owned()
        }
    }
}

fn mask_snapshot(
    policies: &SensitiveFieldPolicies,
    entity_type: &str,
    snapshot_json: &str,
) -> AppResult<FieldSnapshot> {
    let snapshot: FieldSnapshot = serde_json::from_str(snapshot_json).map_err(|error| {
        AppError::Validation(format!("snapshot must be a JSON object: {error}"))
    })?;

    Ok(mask_for_display(&snapshot, &policies.for_entity(entity_type)))
}

fn print_json(value: &impl Serialize) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}
