use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "audit-trail-cli", about = "Inspect and maintain the audit trail")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Apply pending database migrations
    Migrate,
    /// Search audit entries, newest first
    Search {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Search terms, e.g. `user:john` or `"test employee" foo`
        query: Vec<String>,
    },
    /// Show one entry, revealing sensitive values to a privileged viewer
    Show {
        /// Audit event identifier
        event_id: String,
        /// Viewer id
        #[arg(requires = "actor_type")]
        actor_id: Option<String>,
        /// Viewer actor type
        actor_type: Option<String>,
    },
    /// Grant a role to an actor
    Grant {
        /// Role name, e.g. `super_admin`
        role: String,
        /// Actor type the assignment is recorded under
        actor_type: String,
        /// Actor id
        actor_id: String,
    },
    /// Print the SQL a search renders to
    Explain {
        /// Search terms
        query: Vec<String>,
    },
    /// Mask a JSON snapshot with the policy of an entity type
    Mask {
        /// Entity type whose policy applies
        entity_type: String,
        /// Flat JSON object of field values
        snapshot_json: String,
    },
}

impl CliCommand {
    /// Viewer identity given to `show`, as `(actor id, actor type)`.
    pub fn viewer(actor_id: Option<String>, actor_type: Option<String>) -> Option<(String, String)> {
        actor_id.zip(actor_type)
    }
}
