use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use audit_trail_application::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PrivilegeSettings};
use audit_trail_core::{AppError, AppResult, NonEmptyString};
use audit_trail_domain::SensitiveFieldPolicies;
use audit_trail_infrastructure::SqlDialect;
use tracing_subscriber::EnvFilter;

const DEFAULT_PRIVILEGED_ROLE: &str = "super_admin";
const DEFAULT_FALLBACK_ACTOR_TYPES: &str = "user";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_url: Option<String>,
    pub encryption_key: Option<String>,
    pub privileged_role: NonEmptyString,
    pub fallback_actor_types: Vec<String>,
    pub search_dialect: SqlDialect,
    pub policy_file: Option<PathBuf>,
    pub page_size: usize,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let privileged_role = NonEmptyString::new(
            non_empty("AUDIT_PRIVILEGED_ROLE").unwrap_or_else(|| DEFAULT_PRIVILEGED_ROLE.to_owned()),
        )?;

        let fallback_actor_types = non_empty("AUDIT_FALLBACK_ACTOR_TYPES")
            .unwrap_or_else(|| DEFAULT_FALLBACK_ACTOR_TYPES.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|actor_type| !actor_type.is_empty())
            .map(str::to_owned)
            .collect();

        let search_dialect = non_empty("AUDIT_SEARCH_DIALECT")
            .map(|value| SqlDialect::from_str(value.as_str()))
            .transpose()?
            .unwrap_or_default();

        let page_size = match non_empty("AUDIT_PAGE_SIZE") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|error| {
                    AppError::Validation(format!("invalid AUDIT_PAGE_SIZE value '{value}': {error}"))
                })?
                .clamp(1, MAX_PAGE_SIZE),
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            encryption_key: non_empty("AUDIT_ENCRYPTION_KEY"),
            privileged_role,
            fallback_actor_types,
            search_dialect,
            policy_file: non_empty("AUDIT_POLICY_FILE").map(PathBuf::from),
            page_size,
        })
    }

    pub fn database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))
    }

    pub fn encryption_key(&self) -> AppResult<&str> {
        self.encryption_key
            .as_deref()
            .ok_or_else(|| AppError::Validation("AUDIT_ENCRYPTION_KEY is required".to_owned()))
    }

    pub fn privilege_settings(&self) -> PrivilegeSettings {
        PrivilegeSettings::new(
            self.privileged_role.clone(),
            self.fallback_actor_types.clone(),
        )
    }

    pub fn load_policies(&self) -> AppResult<SensitiveFieldPolicies> {
        let Some(path) = &self.policy_file else {
            return Ok(SensitiveFieldPolicies::builtin());
        };

        let document = std::fs::read_to_string(path).map_err(|error| {
            AppError::Validation(format!(
                "failed to read AUDIT_POLICY_FILE '{}': {error}",
                path.display()
            ))
        })?;

        SensitiveFieldPolicies::from_json_str(document.as_str())
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
