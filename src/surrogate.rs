//! Surrogate key generation for inserted records.

use std::fmt;

use uuid::Uuid;

use crate::error::Result;
use crate::types::{DataType, Field, Record, Value};

/// Produces globally unique identifiers. The value format is opaque to the planner.
pub trait SurrogateKeyGenerator: fmt::Debug + Send + Sync {
    fn generate(&self) -> Result<Value>;

    /// Type of the generated values.
    fn data_type(&self) -> DataType;
}

/// Random (v4) UUIDs rendered as hyphenated strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl SurrogateKeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> Result<Value> {
        Ok(Value::String(Uuid::new_v4().hyphenated().to_string()))
    }

    fn data_type(&self) -> DataType {
        DataType::String
    }
}

/// Append a freshly generated surrogate key under `field_name`.
/// Only ever called for inserts; nothing is read from an existing record.
pub fn append_surrogate_key(
    record: &Record,
    field_name: &str,
    generator: &dyn SurrogateKeyGenerator,
) -> Result<Record> {
    let value = generator.generate()?;
    record.append(
        Field::new(field_name, generator.data_type(), false),
        value,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Schema;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Broken;

    impl SurrogateKeyGenerator for Broken {
        fn generate(&self) -> Result<Value> {
            Err(Error::Generation {
                message: "exhausted".to_string(),
                source: None,
            })
        }

        fn data_type(&self) -> DataType {
            DataType::Long
        }
    }

    fn record() -> Record {
        let schema = Schema::new(vec![Field::new("key", DataType::String, false)]).unwrap();
        Record::new(Arc::new(schema), vec!["a".into()]).unwrap()
    }

    #[test]
    fn uuid_keys_are_unique() {
        let a = UuidKeyGenerator.generate().unwrap();
        let b = UuidKeyGenerator.generate().unwrap();
        assert_ne!(a, b);
        let Value::String(s) = a else {
            panic!("expected a string key");
        };
        assert!(Uuid::parse_str(&s).is_ok());
    }

    #[test]
    fn appends_one_non_null_field() {
        let out = append_surrogate_key(&record(), "surrogate", &UuidKeyGenerator).unwrap();
        assert_eq!(out.len(), 2);
        assert!(!out.get("surrogate").unwrap().is_null());
    }

    #[test]
    fn generator_failure_propagates() {
        let err = append_surrogate_key(&record(), "surrogate", &Broken).unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }
}
