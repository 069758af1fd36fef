use std::fmt;
use std::panic::Location;

use thiserror::Error;

/// Configuration could not be assembled from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    Missing { var: &'static str },

    #[error("DB_PORT must be a port number, got {value:?}")]
    InvalidPort { value: String },

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// A legacy pickled value could not be turned into JSON.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("not a valid pickle")]
    Unpickle(#[from] serde_pickle::Error),

    #[error("{kind} values have no JSON representation")]
    Unsupported { kind: &'static str },

    #[error("{kind} cannot be used as a JSON object key")]
    UnsupportedKey { kind: &'static str },

    #[error("NaN and infinite floats have no JSON representation")]
    NonFiniteFloat,

    #[error("integer {value} has no JSON representation")]
    IntegerOutOfRange { value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("could not connect to postgres")]
    Connect(#[source] tokio_postgres::Error),

    #[error("postgres error")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{table}.{column} row {id} could not be transcoded")]
    Transcode {
        table: &'static str,
        column: &'static str,
        id: i64,
        #[source]
        source: TranscodeError,
    },

    #[error("staging data rejected: {0}")]
    Validation(String),

    #[error("post-migration checks failed: {}", .0.join("; "))]
    Verification(Vec<String>),
}

/// An [`Error`] tagged with the step it happened in and the source location
/// where `?` converted it.
#[derive(Debug)]
pub struct MigrationError {
    pub error: Error,
    pub location: &'static Location<'static>,
    pub step: Option<&'static str>,
}

impl MigrationError {
    pub(crate) fn in_step(mut self, step: &'static str) -> Self {
        self.step.get_or_insert(step);
        self
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "step {step} failed at {}: {}", self.location, self.error),
            None => write!(f, "migration failed at {}: {}", self.location, self.error),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<Error> for MigrationError {
    #[track_caller]
    fn from(error: Error) -> Self {
        Self {
            error,
            location: Location::caller(),
            step: None,
        }
    }
}

impl From<tokio_postgres::Error> for MigrationError {
    #[track_caller]
    fn from(error: tokio_postgres::Error) -> Self {
        Self::from(Error::Postgres(error))
    }
}
