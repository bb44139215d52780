use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use audit_trail_application::RoleAssignmentRepository;
use audit_trail_core::{AppError, AppResult};

/// PostgreSQL-backed role assignment lookups for polymorphic actors.
#[derive(Clone)]
pub struct PostgresRoleAssignmentRepository {
    pool: PgPool,
}

impl PostgresRoleAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grants a role to an actor, creating the role when missing.
    pub async fn assign_role(
        &self,
        role_name: &str,
        actor_type: &str,
        actor_id: &str,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start role assignment transaction: {error}"))
        })?;

        let role_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO roles (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(role_name)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert role '{role_name}': {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO role_assignments (role_id, actor_type, actor_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, actor_type, actor_id) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(actor_type)
        .bind(actor_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to assign role '{role_name}': {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit role assignment: {error}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl RoleAssignmentRepository for PostgresRoleAssignmentRepository {
    async fn role_assignment_exists(
        &self,
        actor_id: &str,
        actor_types: &[String],
        role_name: &str,
    ) -> AppResult<bool> {
        if actor_types.is_empty() {
            return Ok(false);
        }

        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_assignments assignment
                JOIN roles role ON role.id = assignment.role_id
                WHERE assignment.actor_id = $1
                    AND assignment.actor_type = ANY($2)
                    AND role.name = $3
            )
            "#,
        )
        .bind(actor_id)
        .bind(actor_types)
        .bind(role_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check typed role assignment: {error}"))
        })
    }

    async fn role_assignment_exists_for_any_type(
        &self,
        actor_id: &str,
        role_name: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_assignments assignment
                JOIN roles role ON role.id = assignment.role_id
                WHERE assignment.actor_id = $1
                    AND role.name = $2
            )
            "#,
        )
        .bind(actor_id)
        .bind(role_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check role assignment: {error}")))
    }
}
