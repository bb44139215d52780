use std::collections::BTreeMap;

use audit_trail_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Entity type of the built-in employee policy.
pub const EMPLOYEE_ENTITY_TYPE: &str = "employee";

/// How a sensitive field is redacted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Keeps `start` leading and `end` trailing characters and masks the rest.
    KeepStartEnd {
        /// Number of leading characters kept.
        start: usize,
        /// Number of trailing characters kept.
        end: usize,
    },
    /// Replaces the whole value with a fixed marker.
    FullMask,
}

/// Sensitive fields of one entity type and the mask applied to each.
///
/// Fields absent from the policy are never masked and never encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SensitiveFieldPolicy {
    entity_type: String,
    fields: BTreeMap<String, MaskStrategy>,
}

impl SensitiveFieldPolicy {
    /// Creates an empty policy for an entity type.
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a sensitive field to the policy.
    #[must_use]
    pub fn with_field(mut self, field_name: impl Into<String>, strategy: MaskStrategy) -> Self {
        self.fields.insert(field_name.into(), strategy);
        self
    }

    /// Built-in policy for employee records.
    #[must_use]
    pub fn employee() -> Self {
        Self::new(EMPLOYEE_ENTITY_TYPE)
            .with_field("cin", MaskStrategy::KeepStartEnd { start: 2, end: 2 })
            .with_field(
                "cnssNumber",
                MaskStrategy::KeepStartEnd { start: 0, end: 2 },
            )
            .with_field("bankIban", MaskStrategy::KeepStartEnd { start: 4, end: 4 })
            .with_field("bankRib", MaskStrategy::KeepStartEnd { start: 0, end: 2 })
            .with_field("salaryGross", MaskStrategy::FullMask)
            .with_field("hourlyRate", MaskStrategy::FullMask)
            .with_field("bonusTarget", MaskStrategy::FullMask)
    }

    /// Returns the entity type this policy applies to.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }

    /// Returns whether the field is sensitive.
    #[must_use]
    pub fn is_sensitive(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }

    /// Returns the mask strategy of a sensitive field.
    #[must_use]
    pub fn mask_strategy_for(&self, field_name: &str) -> Option<MaskStrategy> {
        self.fields.get(field_name).copied()
    }

    /// Iterates over sensitive field names in sorted order.
    pub fn sensitive_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Policy table keyed by entity type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SensitiveFieldPolicies {
    policies: BTreeMap<String, SensitiveFieldPolicy>,
}

impl SensitiveFieldPolicies {
    /// Creates an empty policy table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in policies.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new().with_policy(SensitiveFieldPolicy::employee())
    }

    /// Registers a policy, replacing any previous policy for the same entity type.
    #[must_use]
    pub fn with_policy(mut self, policy: SensitiveFieldPolicy) -> Self {
        self.policies.insert(policy.entity_type.clone(), policy);
        self
    }

    /// Parses a policy table from its JSON representation.
    ///
    /// The document maps entity types to field tables, for example
    /// `{"employee": {"cin": {"strategy": "keep_start_end", "start": 2, "end": 2}}}`.
    pub fn from_json_str(document: &str) -> AppResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, MaskStrategy>> =
            serde_json::from_str(document).map_err(|error| {
                AppError::Validation(format!("invalid sensitive field policy document: {error}"))
            })?;

        Ok(Self {
            policies: raw
                .into_iter()
                .map(|(entity_type, fields)| {
                    let policy = SensitiveFieldPolicy {
                        entity_type: entity_type.clone(),
                        fields,
                    };
                    (entity_type, policy)
                })
                .collect(),
        })
    }

    /// Returns the policy of an entity type, or an empty policy when none is registered.
    #[must_use]
    pub fn for_entity(&self, entity_type: &str) -> SensitiveFieldPolicy {
        self.policies
            .get(entity_type)
            .cloned()
            .unwrap_or_else(|| SensitiveFieldPolicy::new(entity_type))
    }

    /// Returns the number of registered policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns whether no policy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
