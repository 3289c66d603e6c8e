//! Event-time upsert planning.
//!
//! Given the records newly arrived for one key and the records currently
//! stored for it, decide the single write (INSERT or UPDATE), if any, that
//! converges the store. Conflicts are resolved by event time carried in the
//! records, not by arrival order, so replaying or reordering a batch converges
//! to the same state without redundant writes.
//!
//! ```
//! use std::sync::Arc;
//! use event_time_upsert::{
//!     mutation_kind_of, DataType, EventTimeUpsertPlanner, Field, Key, MutationKind, Record,
//!     Schema, TimeModelRegistry, UpsertPlannerConfig,
//! };
//!
//! let config = UpsertPlannerConfig::from_json(&serde_json::json!({
//!     "key_field_names": ["key"],
//!     "value_field_names": ["value"],
//!     "timestamp_field_names": ["timestamp"],
//! }))?;
//! let planner = EventTimeUpsertPlanner::configure(&config, &TimeModelRegistry::with_defaults())?;
//!
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("key", DataType::String, false),
//!     Field::new("value", DataType::String, true),
//!     Field::new("timestamp", DataType::Long, true),
//! ])?);
//! let stored = Record::new(schema.clone(), vec!["a".into(), "world".into(), 50i64.into()])?;
//! let arrived = Record::new(schema, vec!["a".into(), "hello".into(), 100i64.into()])?;
//!
//! let planned = planner.plan_mutations_for_key(&Key(vec!["a".into()]), &[arrived], &[stored])?;
//! assert_eq!(mutation_kind_of(&planned[0]), Some(MutationKind::Update));
//! # Ok::<(), event_time_upsert::Error>(())
//! ```

mod batch;
mod config;
mod error;
mod mutation;
mod planner;
mod surrogate;
mod time_model;
mod types;
mod util;

pub use batch::{plan_batch, BatchPlan, KeyFailure};
pub use config::{
    OutputShape, PlannerContext, TimeModelSelection, UpsertPlannerConfig, EVENT_TIME_MODEL,
    KEY_FIELD_NAMES, LAST_UPDATED_FIELD_NAME, LAST_UPDATED_TIME_MODEL, SURROGATE_KEY_FIELD_NAME,
    TIMESTAMP_FIELD_NAMES, VALUE_FIELD_NAMES,
};
pub use error::{Error, Result, ValidationFailure};
pub use mutation::{mutation_kind_of, tag_mutation, MutationKind, MUTATION_TYPE_FIELD_NAME};
pub use planner::EventTimeUpsertPlanner;
pub use surrogate::{append_surrogate_key, SurrogateKeyGenerator, UuidKeyGenerator};
pub use time_model::{
    DirectTimeModel, LongMillisTimeModel, TimeModel, TimeModelRegistry, DIRECT_TIME_MODEL,
    LONG_MILLIS_TIME_MODEL,
};
pub use types::{DataType, EventTime, Field, Key, Record, Schema, Value};
