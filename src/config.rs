use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationFailure};
use crate::mutation::MUTATION_TYPE_FIELD_NAME;
use crate::time_model::{TimeModel, TimeModelRegistry, DIRECT_TIME_MODEL};

pub const KEY_FIELD_NAMES: &str = "key_field_names";
pub const VALUE_FIELD_NAMES: &str = "value_field_names";
pub const TIMESTAMP_FIELD_NAMES: &str = "timestamp_field_names";
pub const LAST_UPDATED_FIELD_NAME: &str = "last_updated_field_name";
pub const SURROGATE_KEY_FIELD_NAME: &str = "surrogate_key_field_name";
pub const EVENT_TIME_MODEL: &str = "event_time_model";
pub const LAST_UPDATED_TIME_MODEL: &str = "last_updated_time_model";

// ── Raw configuration (as supplied by the caller) ──

/// Named component selection, e.g. `{"type": "longmillis"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeModelSelection {
    #[serde(rename = "type")]
    pub kind: String,
}

impl TimeModelSelection {
    pub fn named(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Options recognised by the event-time upsert planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertPlannerConfig {
    #[serde(default)]
    pub key_field_names: Vec<String>,
    #[serde(default)]
    pub value_field_names: Vec<String>,
    #[serde(default)]
    pub timestamp_field_names: Vec<String>,
    #[serde(default)]
    pub last_updated_field_name: Option<String>,
    #[serde(default)]
    pub surrogate_key_field_name: Option<String>,
    #[serde(default)]
    pub event_time_model: Option<TimeModelSelection>,
    #[serde(default)]
    pub last_updated_time_model: Option<TimeModelSelection>,
}

impl UpsertPlannerConfig {
    /// Parse a configuration document. Absent options take their defaults so
    /// that [`UpsertPlannerConfig::validate`] can report them together.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(json.clone())
            .map_err(|e| Error::configuration("configuration", e.to_string()))
    }

    /// Collect every problem with this configuration. An empty list means valid.
    pub fn validate(&self, registry: &TimeModelRegistry) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        let lists = [
            (KEY_FIELD_NAMES, &self.key_field_names),
            (VALUE_FIELD_NAMES, &self.value_field_names),
            (TIMESTAMP_FIELD_NAMES, &self.timestamp_field_names),
        ];

        for (option, names) in &lists {
            if names.is_empty() {
                failures.push(ValidationFailure::new(
                    *option,
                    "at least one field name is required",
                ));
            }
            let mut seen = BTreeSet::new();
            for name in names.iter() {
                if name.trim().is_empty() {
                    failures.push(ValidationFailure::new(*option, "field names must not be blank"));
                } else if !seen.insert(name.as_str()) {
                    failures.push(ValidationFailure::new(
                        *option,
                        format!("field \"{name}\" is listed more than once"),
                    ));
                }
            }
        }

        // A field may play only one role.
        for (i, (option, names)) in lists.iter().enumerate() {
            for (other_option, other_names) in &lists[..i] {
                for name in names.iter().filter(|n| other_names.contains(*n)) {
                    failures.push(ValidationFailure::new(
                        *option,
                        format!("field \"{name}\" is also listed in {other_option}"),
                    ));
                }
            }
        }

        let record_fields: BTreeSet<&str> = lists
            .iter()
            .flat_map(|(_, names)| names.iter().map(String::as_str))
            .collect();

        let generated = [
            (LAST_UPDATED_FIELD_NAME, self.last_updated_field_name.as_deref()),
            (SURROGATE_KEY_FIELD_NAME, self.surrogate_key_field_name.as_deref()),
        ];
        for (option, name) in generated {
            let Some(name) = name else { continue };
            if name.trim().is_empty() {
                failures.push(ValidationFailure::new(option, "field name must not be blank"));
            } else if record_fields.contains(name) {
                failures.push(ValidationFailure::new(
                    option,
                    format!("field \"{name}\" collides with an existing record field"),
                ));
            }
        }
        if let (Some(lu), Some(sk)) = (&self.last_updated_field_name, &self.surrogate_key_field_name) {
            if lu == sk && !lu.trim().is_empty() {
                failures.push(ValidationFailure::new(
                    SURROGATE_KEY_FIELD_NAME,
                    format!("field \"{sk}\" is also the {LAST_UPDATED_FIELD_NAME}"),
                ));
            }
        }

        let reserved_users = record_fields
            .iter()
            .copied()
            .chain(self.last_updated_field_name.as_deref())
            .chain(self.surrogate_key_field_name.as_deref());
        for name in reserved_users {
            if name == MUTATION_TYPE_FIELD_NAME {
                failures.push(ValidationFailure::new(
                    "configuration",
                    format!("field \"{name}\" is reserved for the mutation marker"),
                ));
            }
        }

        for (option, selection) in [
            (EVENT_TIME_MODEL, &self.event_time_model),
            (LAST_UPDATED_TIME_MODEL, &self.last_updated_time_model),
        ] {
            if let Some(selection) = selection {
                if !registry.contains(&selection.kind) {
                    failures.push(ValidationFailure::new(
                        option,
                        format!(
                            "unknown time model \"{}\" (known: {})",
                            selection.kind,
                            registry.names().collect::<Vec<_>>().join(", ")
                        ),
                    ));
                }
            }
        }

        failures
    }
}

// ── Resolved context ──

/// Fields emitted for every planned record, fixed at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    /// Key, value and timestamp fields, in that order.
    pub base_fields: Vec<String>,
    pub last_updated_field: Option<String>,
    /// Appended on INSERT only.
    pub surrogate_key_field: Option<String>,
}

/// Immutable planner state derived from a validated configuration.
#[derive(Debug, Clone)]
pub struct PlannerContext {
    pub key_fields: Vec<String>,
    pub value_fields: Vec<String>,
    pub timestamp_fields: Vec<String>,
    pub output: OutputShape,
    pub event_time_model: Arc<dyn TimeModel>,
    pub last_updated_time_model: Arc<dyn TimeModel>,
}

impl PlannerContext {
    /// Validate `config` and resolve its time models. Fails with every
    /// validation problem at once.
    pub fn resolve(config: &UpsertPlannerConfig, registry: &TimeModelRegistry) -> Result<Self> {
        let failures = config.validate(registry);
        if !failures.is_empty() {
            return Err(Error::Configuration { failures });
        }

        let event_time_model = resolve_model(registry, EVENT_TIME_MODEL, &config.event_time_model)?;
        let last_updated_time_model =
            resolve_model(registry, LAST_UPDATED_TIME_MODEL, &config.last_updated_time_model)?;

        let base_fields: Vec<String> = config
            .key_field_names
            .iter()
            .chain(&config.value_field_names)
            .chain(&config.timestamp_field_names)
            .cloned()
            .collect();

        tracing::debug!(
            key_fields = ?config.key_field_names,
            event_time_model = event_time_model.name(),
            last_updated = ?config.last_updated_field_name,
            surrogate_key = ?config.surrogate_key_field_name,
            "resolved upsert planner configuration"
        );

        Ok(Self {
            key_fields: config.key_field_names.clone(),
            value_fields: config.value_field_names.clone(),
            timestamp_fields: config.timestamp_field_names.clone(),
            output: OutputShape {
                base_fields,
                last_updated_field: config.last_updated_field_name.clone(),
                surrogate_key_field: config.surrogate_key_field_name.clone(),
            },
            event_time_model,
            last_updated_time_model,
        })
    }
}

fn resolve_model(
    registry: &TimeModelRegistry,
    option: &str,
    selection: &Option<TimeModelSelection>,
) -> Result<Arc<dyn TimeModel>> {
    let name = selection
        .as_ref()
        .map_or(DIRECT_TIME_MODEL, |s| s.kind.as_str());
    registry
        .resolve(name)
        .ok_or_else(|| Error::configuration(option, format!("unknown time model \"{name}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> UpsertPlannerConfig {
        UpsertPlannerConfig {
            key_field_names: vec!["key".into()],
            value_field_names: vec!["value".into()],
            timestamp_field_names: vec!["timestamp".into()],
            ..Default::default()
        }
    }

    fn options(failures: &[ValidationFailure]) -> Vec<&str> {
        failures.iter().map(|f| f.option.as_str()).collect()
    }

    #[test]
    fn minimal_config_is_valid() {
        assert!(base().validate(&TimeModelRegistry::with_defaults()).is_empty());
    }

    #[test]
    fn parses_component_selection_documents() {
        let cfg = UpsertPlannerConfig::from_json(&json!({
            "key_field_names": ["key"],
            "value_field_names": ["value"],
            "timestamp_field_names": ["timestamp"],
            "last_updated_field_name": "lastupdated",
            "event_time_model": {"type": "longmillis"},
        }))
        .unwrap();
        assert_eq!(cfg.event_time_model, Some(TimeModelSelection::named("longmillis")));
        assert_eq!(cfg.last_updated_time_model, None);
        assert_eq!(cfg.last_updated_field_name.as_deref(), Some("lastupdated"));
    }

    #[test]
    fn malformed_document_is_a_configuration_error() {
        let err = UpsertPlannerConfig::from_json(&json!({"key_field_names": [1, 2]})).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn empty_config_reports_all_missing_lists() {
        let failures = UpsertPlannerConfig::default().validate(&TimeModelRegistry::with_defaults());
        assert_eq!(
            options(&failures),
            vec![KEY_FIELD_NAMES, VALUE_FIELD_NAMES, TIMESTAMP_FIELD_NAMES]
        );
    }

    #[test]
    fn collects_every_problem_not_just_the_first() {
        let cfg = UpsertPlannerConfig {
            key_field_names: vec!["key".into(), "".into()],
            value_field_names: vec!["value".into(), "value".into()],
            timestamp_field_names: vec![],
            last_updated_field_name: Some("value".into()),
            surrogate_key_field_name: Some(MUTATION_TYPE_FIELD_NAME.into()),
            event_time_model: Some(TimeModelSelection::named("stringnanos")),
            last_updated_time_model: Some(TimeModelSelection::named("longmillis")),
        };
        let failures = cfg.validate(&TimeModelRegistry::with_defaults());
        let opts = options(&failures);

        assert!(opts.contains(&KEY_FIELD_NAMES));
        assert!(opts.contains(&VALUE_FIELD_NAMES));
        assert!(opts.contains(&TIMESTAMP_FIELD_NAMES));
        assert!(opts.contains(&LAST_UPDATED_FIELD_NAME));
        assert!(opts.contains(&"configuration"));
        assert!(opts.contains(&EVENT_TIME_MODEL));
        assert!(!opts.contains(&LAST_UPDATED_TIME_MODEL));
        assert_eq!(failures.len(), 6);
    }

    #[test]
    fn field_in_two_roles_is_rejected() {
        let mut cfg = base();
        cfg.value_field_names.push("timestamp".into());
        let failures = cfg.validate(&TimeModelRegistry::with_defaults());
        assert_eq!(options(&failures), vec![TIMESTAMP_FIELD_NAMES]);
        assert!(failures[0].message.contains("also listed in value_field_names"));
    }

    #[test]
    fn generated_fields_must_differ() {
        let mut cfg = base();
        cfg.last_updated_field_name = Some("stamp".into());
        cfg.surrogate_key_field_name = Some("stamp".into());
        let failures = cfg.validate(&TimeModelRegistry::with_defaults());
        assert_eq!(options(&failures), vec![SURROGATE_KEY_FIELD_NAME]);
    }

    #[test]
    fn resolve_fails_with_the_full_failure_list() {
        let err = PlannerContext::resolve(
            &UpsertPlannerConfig::default(),
            &TimeModelRegistry::with_defaults(),
        )
        .unwrap_err();
        assert_eq!(err.failures().len(), 3);
    }

    #[test]
    fn resolve_precomputes_output_shape_and_defaults() {
        let mut cfg = base();
        cfg.surrogate_key_field_name = Some("surrogate".into());
        let ctx = PlannerContext::resolve(&cfg, &TimeModelRegistry::with_defaults()).unwrap();

        assert_eq!(ctx.output.base_fields, vec!["key", "value", "timestamp"]);
        assert_eq!(ctx.output.last_updated_field, None);
        assert_eq!(ctx.output.surrogate_key_field.as_deref(), Some("surrogate"));
        assert_eq!(ctx.event_time_model.name(), DIRECT_TIME_MODEL);
        assert_eq!(ctx.last_updated_time_model.name(), DIRECT_TIME_MODEL);
    }
}
