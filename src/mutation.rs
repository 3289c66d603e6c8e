//! Mutation kinds and the marker field that carries them to the sink.

use crate::error::Result;
use crate::types::{DataType, Field, Record, Value};

/// Reserved field appended to every planned record.
pub const MUTATION_TYPE_FIELD_NAME: &str = "_mutation_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    Insert,
    Update,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            _ => None,
        }
    }
}

/// Append the mutation marker field to `record`.
pub fn tag_mutation(record: &Record, kind: MutationKind) -> Result<Record> {
    record.append(
        Field::new(MUTATION_TYPE_FIELD_NAME, DataType::String, false),
        Value::String(kind.as_str().to_string()),
    )
}

/// Read the mutation marker back off a planned record.
pub fn mutation_kind_of(record: &Record) -> Option<MutationKind> {
    match record.get(MUTATION_TYPE_FIELD_NAME)? {
        Value::String(s) => MutationKind::from_str(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Schema;
    use std::sync::Arc;

    #[test]
    fn tag_round_trips_through_marker() {
        let schema = Schema::new(vec![Field::new("key", DataType::String, false)]).unwrap();
        let record = Record::new(Arc::new(schema), vec!["a".into()]).unwrap();

        let tagged = tag_mutation(&record, MutationKind::Update).unwrap();
        assert_eq!(tagged.len(), 2);
        assert_eq!(
            tagged.get(MUTATION_TYPE_FIELD_NAME),
            Some(&Value::from("UPDATE"))
        );
        assert_eq!(mutation_kind_of(&tagged), Some(MutationKind::Update));
        assert_eq!(mutation_kind_of(&record), None);
    }

    #[test]
    fn kinds_parse_their_canonical_names() {
        for kind in [MutationKind::Insert, MutationKind::Update] {
            assert_eq!(MutationKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(MutationKind::from_str("DELETE"), None);
    }
}
