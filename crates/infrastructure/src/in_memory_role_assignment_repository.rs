use std::collections::HashSet;

use async_trait::async_trait;
use audit_trail_application::RoleAssignmentRepository;
use audit_trail_core::AppResult;
use tokio::sync::RwLock;

/// In-memory role assignments keyed by `(role, actor type, actor id)`.
#[derive(Debug, Default)]
pub struct InMemoryRoleAssignmentRepository {
    assignments: RwLock<HashSet<(String, String, String)>>,
}

impl InMemoryRoleAssignmentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashSet::new()),
        }
    }

    /// Grants a role to an actor.
    pub async fn assign_role(&self, role_name: &str, actor_type: &str, actor_id: &str) {
        self.assignments.write().await.insert((
            role_name.to_owned(),
            actor_type.to_owned(),
            actor_id.to_owned(),
        ));
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryRoleAssignmentRepository {
    async fn role_assignment_exists(
        &self,
        actor_id: &str,
        actor_types: &[String],
        role_name: &str,
    ) -> AppResult<bool> {
        let assignments = self.assignments.read().await;

        Ok(assignments.iter().any(|(role, actor_type, id)| {
            role == role_name && id == actor_id && actor_types.contains(actor_type)
        }))
    }

    async fn role_assignment_exists_for_any_type(
        &self,
        actor_id: &str,
        role_name: &str,
    ) -> AppResult<bool> {
        let assignments = self.assignments.read().await;

        Ok(assignments
            .iter()
            .any(|(role, _, id)| role == role_name && id == actor_id))
    }
}
