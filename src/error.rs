//! Error types for upsert planning.

use std::fmt;

/// The result type used throughout the planner.
pub type Result<T> = std::result::Result<T, Error>;

/// One problem found while validating a planner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// The configuration option the failure refers to.
    pub option: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.option, self.message)
    }
}

/// Errors surfaced by configuration and planning.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The planner configuration is invalid. Raised before any record is processed.
    #[error("invalid upsert planner configuration: {}", join_failures(.failures))]
    Configuration {
        /// Every problem found, in validation order.
        failures: Vec<ValidationFailure>,
    },

    /// A record lacks an expected field, carries a value of the wrong type,
    /// or holds an event time the configured time model cannot order.
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Description of the malformed input.
        message: String,
    },

    /// The surrogate key generator failed to produce a value.
    #[error("surrogate key generation failed: {message}")]
    Generation {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a configuration error carrying a single failure.
    #[must_use]
    pub fn configuration(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            failures: vec![ValidationFailure::new(option, message)],
        }
    }

    /// Creates a malformed input error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Creates a generation error with a source.
    #[must_use]
    pub fn generation_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Validation failures carried by a configuration error, empty otherwise.
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            Self::Configuration { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn configuration_error_lists_every_failure() {
        let err = Error::Configuration {
            failures: vec![
                ValidationFailure::new("key_field_names", "must not be empty"),
                ValidationFailure::new("value_field_names", "must not be empty"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("key_field_names: must not be empty"));
        assert!(msg.contains("value_field_names: must not be empty"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn generation_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "entropy unavailable");
        let err = Error::generation_with_source("uuid", io);
        assert!(err.source().is_some());
        assert!(err.failures().is_empty());
    }
}
