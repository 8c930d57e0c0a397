//! Database initialization, table definitions and document helpers
//!
//! The embedded redb file plays the role of a document store: every value
//! is a JSON document, and secondary tables act as ordered indexes.

use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use crate::analytics::{ReferrerClassifier, TrafficClassifier};
use crate::config::Config;
use crate::error::AppError;

/// Form documents
///
/// Key: form ID
/// Value: JSON-serialized [`Form`](crate::model::Form)
pub const TABLE_FORMS: TableDefinition<&str, &str> = TableDefinition::new("forms_v1");

/// Owner index over forms
///
/// Key: `"{user_id}:{created_at_micros}:{form_id}"`
/// Value: form ID
///
/// The timestamp keeps each owner's forms in creation order.
pub const TABLE_USER_FORMS: TableDefinition<&str, &str> = TableDefinition::new("user_forms_v1");

/// Submissions, grouped by form
///
/// Key: `"{form_id}:{submitted_at_micros}:{response_id}"`
/// Value: JSON-serialized [`FormResponse`](crate::model::FormResponse)
pub const TABLE_FORM_RESPONSES: TableDefinition<&str, &str> =
    TableDefinition::new("form_responses_v1");

/// Analytics documents, one per form
///
/// Key: form ID
/// Value: JSON-serialized [`FormAnalytics`](crate::model::FormAnalytics)
pub const TABLE_FORM_ANALYTICS: TableDefinition<&str, &str> =
    TableDefinition::new("form_analytics_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub classifier: Arc<dyn TrafficClassifier>,
}

impl AppState {
    /// State with the default referrer-based traffic classifier
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            classifier: Arc::new(ReferrerClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: impl TrafficClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }
}

/// Creates or opens the database file and makes sure every table exists
///
/// ```no_run
/// # use formboard::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_FORMS)?;
        write_txn.open_table(TABLE_USER_FORMS)?;
        write_txn.open_table(TABLE_FORM_RESPONSES)?;
        write_txn.open_table(TABLE_FORM_ANALYTICS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Exclusive upper bound for a `"{prefix}:"` range scan
///
/// `;` sorts right after `:`, so `prefix:..prefix;` covers every key that
/// starts with `prefix:`.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (format!("{prefix}:"), format!("{prefix};"))
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(AppError::Encode)
}

pub fn decode<T: DeserializeOwned>(
    table: &'static str,
    key: &str,
    raw: &str,
) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(|source| AppError::Decode {
        table,
        key: key.to_string(),
        source,
    })
}

/// Reads and decodes one document, `None` when the key is absent
pub fn load<T, Tbl>(table: &Tbl, name: &'static str, key: &str) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => decode(name, key, guard.value()).map(Some),
        None => Ok(None),
    }
}
