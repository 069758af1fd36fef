//! Connection settings, read once from the environment at startup.

use std::fmt;

use crate::error::ConfigError;

/// Where the values for `post.related` come from.
///
/// The legacy script selected the string literal `'similar'` instead of the
/// `"similar"` column, so every post ended up with the JSON string
/// `"similar"`. [`RelatedSource::Literal`] reproduces that; use
/// [`RelatedSource::Column`] to transcode the pickled column like the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelatedSource {
    #[default]
    Literal,
    Column,
}

impl RelatedSource {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "literal" => Some(Self::Literal),
            "column" => Some(Self::Column),
            _ => None,
        }
    }
}

impl fmt::Display for RelatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => f.write_str("literal"),
            Self::Column => f.write_str("column"),
        }
    }
}

#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub related_source: RelatedSource,
}

impl DbConfig {
    /// Read `DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD` and
    /// `DB_DATABASE` (all required) plus the optional
    /// `MIGRATE_RELATED_SOURCE` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing { var })
        };

        let host = required("DB_HOST")?;
        let port = required("DB_PORT")?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort { value: port })?;
        let username = required("DB_USERNAME")?;
        let password = required("DB_PASSWORD")?;
        let database = required("DB_DATABASE")?;

        let related_source = match lookup("MIGRATE_RELATED_SOURCE") {
            None => RelatedSource::default(),
            Some(value) if value.is_empty() => RelatedSource::default(),
            Some(value) => RelatedSource::parse(&value).ok_or(ConfigError::InvalidValue {
                var: "MIGRATE_RELATED_SOURCE",
                value,
            })?,
        };

        Ok(Self {
            host,
            port,
            username,
            password,
            database,
            related_source,
        })
    }

    /// Connection parameters for `tokio_postgres`.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .password(&self.password)
            .dbname(&self.database)
            .application_name("factual-migrate");
        config
    }

    /// `user@host:port/database`, safe to log.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("related_source", &self.related_source)
            .finish()
    }
}
