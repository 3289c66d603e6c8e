use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::{PlannerContext, UpsertPlannerConfig};
use crate::error::{Error, Result};
use crate::mutation::{tag_mutation, MutationKind};
use crate::surrogate::{append_surrogate_key, SurrogateKeyGenerator, UuidKeyGenerator};
use crate::time_model::TimeModelRegistry;
use crate::types::{EventTime, Field, Key, Record};

/// Plans the write, if any, that converges one key's stored record towards the
/// latest arriving change by event time.
///
/// The planner holds no per-key state; one instance may serve any number of
/// keys concurrently.
#[derive(Debug, Clone)]
pub struct EventTimeUpsertPlanner {
    ctx: PlannerContext,
    surrogate_keys: Arc<dyn SurrogateKeyGenerator>,
}

impl EventTimeUpsertPlanner {
    /// Validate `config` and build a planner. Every configuration problem is
    /// reported together, before any record is seen.
    pub fn configure(config: &UpsertPlannerConfig, registry: &TimeModelRegistry) -> Result<Self> {
        Ok(Self::new(PlannerContext::resolve(config, registry)?))
    }

    pub fn new(ctx: PlannerContext) -> Self {
        Self {
            ctx,
            surrogate_keys: Arc::new(UuidKeyGenerator),
        }
    }

    /// Replace the default UUID surrogate key generator.
    pub fn with_surrogate_key_generator(mut self, generator: Arc<dyn SurrogateKeyGenerator>) -> Self {
        self.surrogate_keys = generator;
        self
    }

    pub fn context(&self) -> &PlannerContext {
        &self.ctx
    }

    /// Decide the mutation for one key.
    ///
    /// Returns an empty list when there is nothing to write: no arriving
    /// records, an arrival older than what is stored, or an arrival whose
    /// values already match the stored record. Otherwise returns exactly one
    /// record tagged INSERT or UPDATE.
    pub fn plan_mutations_for_key(
        &self,
        key: &Key,
        arriving: &[Record],
        existing: &[Record],
    ) -> Result<Vec<Record>> {
        if arriving.is_empty() {
            return Ok(Vec::new());
        }

        // Phase 1: every record must belong to this key
        for record in arriving.iter().chain(existing) {
            let record_key = Key::of(record, &self.ctx.key_fields)?;
            if record_key != *key {
                return Err(Error::malformed(format!(
                    "record with key {record_key} passed for key {key}"
                )));
            }
        }

        // Phase 2: reduce arriving records to the latest by event time
        let Some((winner, winner_time)) = self.latest(arriving)? else {
            return Ok(Vec::new());
        };
        tracing::trace!(%key, event_time = ?winner_time.0, candidates = arriving.len(), "selected latest arriving record");

        // Phase 3: classify against the stored record
        let kind = match self.baseline(key, existing)? {
            None => MutationKind::Insert,
            Some((stored, stored_time)) => {
                if winner_time.compare(&stored_time)? == Ordering::Less {
                    tracing::debug!(%key, "arriving record is older than stored record; skipping");
                    return Ok(Vec::new());
                }
                if self.values_equal(winner, stored)? {
                    tracing::debug!(%key, "arriving values identical to stored record; skipping");
                    return Ok(Vec::new());
                }
                MutationKind::Update
            }
        };

        // Phase 4: build the output record
        let mutation = self.build_mutation(winner, kind)?;
        tracing::debug!(%key, kind = kind.as_str(), arriving = arriving.len(), "planned mutation");

        Ok(vec![mutation])
    }

    fn event_time(&self, record: &Record) -> Result<EventTime> {
        self.ctx
            .timestamp_fields
            .iter()
            .map(|f| self.ctx.event_time_model.comparable(record.require(f)?))
            .collect::<Result<Vec<_>>>()
            .map(EventTime)
    }

    /// Latest record by event time. Ties go to the last record in iteration order.
    fn latest<'a>(&self, records: &'a [Record]) -> Result<Option<(&'a Record, EventTime)>> {
        let mut latest: Option<(&Record, EventTime)> = None;
        for record in records {
            let time = self.event_time(record)?;
            let replace = match &latest {
                None => true,
                Some((_, best)) => time.compare(best)? != Ordering::Less,
            };
            if replace {
                latest = Some((record, time));
            }
        }
        Ok(latest)
    }

    /// The stored record to compare against. The store is keyed, so more than
    /// one existing record is unexpected; the latest of them is used.
    fn baseline<'a>(&self, key: &Key, existing: &'a [Record]) -> Result<Option<(&'a Record, EventTime)>> {
        if existing.len() > 1 {
            tracing::warn!(%key, existing = existing.len(), "multiple stored records for one key; comparing against the latest");
        }
        self.latest(existing)
    }

    fn values_equal(&self, arriving: &Record, stored: &Record) -> Result<bool> {
        for field in &self.ctx.value_fields {
            if !arriving.require(field)?.same_as(stored.require(field)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn build_mutation(&self, winner: &Record, kind: MutationKind) -> Result<Record> {
        let shape = &self.ctx.output;
        let mut record = winner.project(&shape.base_fields)?;

        if let Some(field) = &shape.last_updated_field {
            let model = &self.ctx.last_updated_time_model;
            record = record.append(Field::new(field.as_str(), model.now_type(), false), model.now())?;
        }

        if kind == MutationKind::Insert {
            if let Some(field) = &shape.surrogate_key_field {
                record = append_surrogate_key(&record, field, self.surrogate_keys.as_ref())?;
            }
        }

        tag_mutation(&record, kind)
    }
}
