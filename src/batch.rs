//! Reference per-key driver: groups a flat batch by key and plans each key in
//! isolation, so one key's malformed input does not abort the others.

use std::collections::HashMap;

use crate::error::Error;
use crate::planner::EventTimeUpsertPlanner;
use crate::types::{Key, Record};
use crate::util::key_fingerprint;

/// A key whose planning failed.
#[derive(Debug)]
pub struct KeyFailure {
    /// `None` when the key itself could not be read from the record.
    pub key: Option<Key>,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BatchPlan {
    /// Planned records, in first-arrival order of their keys.
    pub mutations: Vec<Record>,
    pub failures: Vec<KeyFailure>,
}

#[derive(Debug)]
struct KeyGroup {
    key: Key,
    arriving: Vec<Record>,
    existing: Vec<Record>,
}

/// Plan every key that has at least one arriving record.
pub fn plan_batch(
    planner: &EventTimeUpsertPlanner,
    arriving: &[Record],
    existing: &[Record],
) -> BatchPlan {
    let key_fields = &planner.context().key_fields;
    let mut plan = BatchPlan::default();

    let mut groups: Vec<KeyGroup> = Vec::new();
    // Key holds float values, so it cannot implement Hash/Eq and key a HashMap
    // directly. Bucket by fingerprint -> indices into `groups`, then compare
    // keys exactly within a bucket.
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();

    for record in arriving {
        let key = match Key::of(record, key_fields) {
            Ok(key) => key,
            Err(error) => {
                plan.failures.push(KeyFailure { key: None, error });
                continue;
            }
        };
        let bucket = buckets.entry(key_fingerprint(&key)).or_default();
        let found = bucket.iter().copied().find(|&i| groups[i].key == key);
        match found {
            Some(i) => groups[i].arriving.push(record.clone()),
            None => {
                bucket.push(groups.len());
                groups.push(KeyGroup {
                    key,
                    arriving: vec![record.clone()],
                    existing: Vec::new(),
                });
            }
        }
    }

    for record in existing {
        let key = match Key::of(record, key_fields) {
            Ok(key) => key,
            Err(error) => {
                plan.failures.push(KeyFailure { key: None, error });
                continue;
            }
        };
        // Stored records with nothing arriving need no decision.
        let Some(bucket) = buckets.get(&key_fingerprint(&key)) else {
            continue;
        };
        if let Some(&i) = bucket.iter().find(|&&i| groups[i].key == key) {
            groups[i].existing.push(record.clone());
        }
    }

    tracing::debug!(
        keys = groups.len(),
        arriving = arriving.len(),
        existing = existing.len(),
        "planning batch"
    );

    for group in groups {
        match planner.plan_mutations_for_key(&group.key, &group.arriving, &group.existing) {
            Ok(mutations) => plan.mutations.extend(mutations),
            Err(error) => {
                tracing::warn!(key = %group.key, %error, "planning failed for key");
                plan.failures.push(KeyFailure {
                    key: Some(group.key),
                    error,
                });
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpsertPlannerConfig;
    use crate::mutation::{mutation_kind_of, MutationKind};
    use crate::time_model::TimeModelRegistry;
    use crate::types::{DataType, Field, Schema, Value};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                Field::new("key", DataType::String, false),
                Field::new("value", DataType::String, true),
                Field::new("timestamp", DataType::Long, true),
            ])
            .unwrap(),
        )
    }

    fn row(key: &str, value: &str, ts: Value) -> Record {
        Record::new(schema(), vec![key.into(), value.into(), ts]).unwrap()
    }

    fn planner() -> EventTimeUpsertPlanner {
        let config = UpsertPlannerConfig {
            key_field_names: vec!["key".into()],
            value_field_names: vec!["value".into()],
            timestamp_field_names: vec!["timestamp".into()],
            ..Default::default()
        };
        EventTimeUpsertPlanner::configure(&config, &TimeModelRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn groups_by_key_in_first_arrival_order() {
        let arriving = vec![
            row("b", "b1", Value::Long(10)),
            row("a", "a1", Value::Long(10)),
            row("b", "b2", Value::Long(20)),
        ];
        let existing = vec![row("a", "a0", Value::Long(5)), row("z", "z0", Value::Long(5))];

        let plan = plan_batch(&planner(), &arriving, &existing);
        assert!(plan.failures.is_empty());
        assert_eq!(plan.mutations.len(), 2);

        assert_eq!(plan.mutations[0].get("value"), Some(&Value::from("b2")));
        assert_eq!(mutation_kind_of(&plan.mutations[0]), Some(MutationKind::Insert));
        assert_eq!(plan.mutations[1].get("value"), Some(&Value::from("a1")));
        assert_eq!(mutation_kind_of(&plan.mutations[1]), Some(MutationKind::Update));
    }

    #[test]
    fn one_bad_key_does_not_affect_the_others() {
        let arriving = vec![
            row("a", "hello", Value::Long(100)),
            row("bad", "oops", Value::Null),
            row("c", "there", Value::Long(100)),
        ];

        let plan = plan_batch(&planner(), &arriving, &[]);
        assert_eq!(plan.mutations.len(), 2);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].key, Some(Key(vec!["bad".into()])));
        assert!(matches!(plan.failures[0].error, Error::MalformedInput { .. }));
    }
}
