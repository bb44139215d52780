use std::sync::Arc;

use audit_trail_core::{ActorIdentity, NonEmptyString};
use tracing::warn;

use crate::RoleAssignmentRepository;

/// Role and actor-type settings for sensitive payload access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeSettings {
    privileged_role: NonEmptyString,
    fallback_actor_types: Vec<String>,
}

impl PrivilegeSettings {
    /// Creates settings; blank fallback types are ignored.
    #[must_use]
    pub fn new(privileged_role: NonEmptyString, fallback_actor_types: Vec<String>) -> Self {
        Self {
            privileged_role,
            fallback_actor_types: fallback_actor_types
                .into_iter()
                .map(|actor_type| actor_type.trim().to_owned())
                .filter(|actor_type| !actor_type.is_empty())
                .collect(),
        }
    }

    /// Returns the role that unlocks sensitive payloads.
    #[must_use]
    pub fn privileged_role(&self) -> &NonEmptyString {
        &self.privileged_role
    }

    /// Returns generic actor types tried after the actor's own type.
    #[must_use]
    pub fn fallback_actor_types(&self) -> &[String] {
        &self.fallback_actor_types
    }
}

/// Decides whether a viewer may see decrypted sensitive values.
#[derive(Clone)]
pub struct PrivilegeResolver {
    repository: Arc<dyn RoleAssignmentRepository>,
    settings: PrivilegeSettings,
}

impl PrivilegeResolver {
    /// Creates a resolver over a role assignment store.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleAssignmentRepository>, settings: PrivilegeSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    /// Returns the role-assignment types checked for an actor, own type first.
    #[must_use]
    pub fn candidate_actor_types(&self, actor: &ActorIdentity) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let own_type = actor.actor_type().trim();
        let fallbacks = self
            .settings
            .fallback_actor_types()
            .iter()
            .map(String::as_str);

        for actor_type in std::iter::once(own_type).chain(fallbacks) {
            if !actor_type.is_empty() && !candidates.iter().any(|known| known == actor_type) {
                candidates.push(actor_type.to_owned());
            }
        }

        candidates
    }

    /// Returns whether the actor holds the privileged role.
    ///
    /// Checks the typed assignments first, then any assignment for the actor id.
    /// Lookup errors are logged and count as "not privileged".
    pub async fn resolve(&self, actor: Option<&ActorIdentity>) -> bool {
        let Some(actor) = actor else {
            return false;
        };

        let role_name = self.settings.privileged_role().as_str();
        let candidates = self.candidate_actor_types(actor);

        match self
            .repository
            .role_assignment_exists(actor.id(), candidates.as_slice(), role_name)
            .await
        {
            Ok(true) => return true,
            Ok(false) => {}
            Err(error) => {
                warn!(
                    actor_id = %actor.id(),
                    actor_type = %actor.actor_type(),
                    error = %error,
                    "typed role assignment lookup failed"
                );
            }
        }

        match self
            .repository
            .role_assignment_exists_for_any_type(actor.id(), role_name)
            .await
        {
            Ok(found) => found,
            Err(error) => {
                warn!(
                    actor_id = %actor.id(),
                    error = %error,
                    "role assignment lookup failed"
                );
                false
            }
        }
    }
}
