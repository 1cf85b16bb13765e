//! Store configuration and schema-to-collection resolution.
//!
//! Connection parameters are injected as a [`StoreConfig`] rather than read from
//! globals. [`StoreConfig::from_env`] builds one from the process environment so
//! credentials never need to appear in source.

use std::{collections::HashMap, fmt};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Environment variable holding the store connection URL.
pub const URL_VAR: &str = "DOCACCESS_URL";
/// Environment variable holding the database name.
pub const DATABASE_VAR: &str = "DOCACCESS_DATABASE";
/// Environment variable holding the (optional) user name.
pub const USERNAME_VAR: &str = "DOCACCESS_USERNAME";
/// Environment variable holding the (optional) password.
pub const PASSWORD_VAR: &str = "DOCACCESS_PASSWORD";

/// Built-in schema name to collection name mapping.
pub const SCHEMAS: &[(&str, &str)] = &[("HL7", "hl7_messages")];

/// Looks up the built-in collection for a schema name.
pub fn collection_for(schema: &str) -> Option<&'static str> {
    SCHEMAS
        .iter()
        .find(|(name, _)| *name == schema)
        .map(|(_, collection)| *collection)
}

/// Connection and naming configuration for a store client.
#[derive(Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// Connection URL, without credentials.
    pub url: String,
    /// Database holding the collections.
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Schema name to collection overrides, consulted before [`SCHEMAS`].
    pub collections: HashMap<String, String>,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Sets the credentials used to authenticate against the store.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Maps `schema` to `collection`, overriding the built-in mapping.
    pub fn with_collection(mut self, schema: impl Into<String>, collection: impl Into<String>) -> Self {
        self.collections.insert(schema.into(), collection.into());
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] when [`URL_VAR`] or
    /// [`DATABASE_VAR`] is unset or empty.
    pub fn from_env() -> DocumentStoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentStoreResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DocumentStoreError::Configuration(format!("{key} is not set")))
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.is_empty());

        Ok(Self {
            url: required(URL_VAR)?,
            database: required(DATABASE_VAR)?,
            username: optional(USERNAME_VAR),
            password: optional(PASSWORD_VAR),
            collections: HashMap::new(),
        })
    }

    /// Resolves the collection a schema's documents are stored in.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownSchema`] when neither the overrides nor the
    /// built-in mapping know the schema.
    pub fn collection_for(&self, schema: &str) -> DocumentStoreResult<String> {
        self.collections
            .get(schema)
            .cloned()
            .or_else(|| collection_for(schema).map(str::to_string))
            .ok_or_else(|| DocumentStoreError::UnknownSchema(schema.to_string()))
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("collections", &self.collections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_fields() {
        let config = StoreConfig::from_lookup(env(&[
            (URL_VAR, "mongodb+srv://cluster0.example.net"),
            (DATABASE_VAR, "hl7_db"),
            (USERNAME_VAR, "ingest"),
            (PASSWORD_VAR, "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.url, "mongodb+srv://cluster0.example.net");
        assert_eq!(config.database, "hl7_db");
        assert_eq!(config.username.as_deref(), Some("ingest"));
        assert_eq!(config.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_from_lookup_requires_url_and_database() {
        let err = StoreConfig::from_lookup(env(&[(DATABASE_VAR, "hl7_db")])).unwrap_err();
        assert!(matches!(err, DocumentStoreError::Configuration(ref msg) if msg.contains(URL_VAR)));

        let err = StoreConfig::from_lookup(env(&[(URL_VAR, "mongodb://localhost"), (DATABASE_VAR, "")])).unwrap_err();
        assert!(matches!(err, DocumentStoreError::Configuration(ref msg) if msg.contains(DATABASE_VAR)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = StoreConfig::new("mongodb://localhost", "hl7_db").with_credentials("ingest", "s3cret");
        let printed = format!("{config:?}");

        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_collection_resolution() {
        let config = StoreConfig::new("mongodb://localhost", "hl7_db");
        assert_eq!(config.collection_for("HL7").unwrap(), "hl7_messages");
        assert!(matches!(config.collection_for("ASTM"), Err(DocumentStoreError::UnknownSchema(_))));

        let config = config.with_collection("HL7", "hl7_staging");
        assert_eq!(config.collection_for("HL7").unwrap(), "hl7_staging");
        assert_eq!(collection_for("HL7"), Some("hl7_messages"));
    }
}
