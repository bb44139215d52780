use serde::{Deserialize, Serialize};

/// Actor resolved by the identity provider for the current request.
///
/// The same person may be represented by more than one principal type (for
/// example an employee account and a back-office user), so the concrete type
/// travels with the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    id: String,
    actor_type: String,
    display_name: String,
    email: Option<String>,
}

impl ActorIdentity {
    /// Creates an actor identity from identity provider data.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        actor_type: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            actor_type: actor_type.into(),
            display_name: display_name.into(),
            email,
        }
    }

    /// Returns the stable actor identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the concrete principal type of the actor.
    #[must_use]
    pub fn actor_type(&self) -> &str {
        self.actor_type.as_str()
    }

    /// Returns the display name for the actor.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the denormalized causer stored alongside audit events.
    #[must_use]
    pub fn causer(&self) -> Causer {
        Causer {
            name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Denormalized actor recorded on an audit event.
///
/// An event without a causer was initiated by the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Causer {
    /// Actor display name at the time of the event.
    pub name: String,
    /// Actor email at the time of the event.
    pub email: Option<String>,
}
