//! Documents, writes and queries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{StoreError, StoreResult};

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// Encodes a timestamp the way the store writes them.
pub fn timestamp_value(timestamp: DateTime<Utc>) -> Value {
    Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier assigned by the store.
    pub id: String,
    /// Document fields.
    pub fields: Fields,
    /// When the store created the document.
    pub create_time: DateTime<Utc>,
    /// When the store last wrote the document.
    pub update_time: DateTime<Utc>,
}

impl Document {
    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a string field value.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Deserializes the document into `T`, exposing the id as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::InvalidDocument(format!("{}: {}", self.id, e)))
    }
}

/// Value of a field in a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A literal value.
    Value(Value),
    /// Replaced by the store's clock when the write is applied.
    ServerTimestamp,
}

/// The fields of a create or update request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    fields: Vec<(String, FieldValue)>,
}

impl DocumentWrite {
    /// Creates an empty write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field to a literal value.
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(field.into(), FieldValue::Value(value.into()))
    }

    /// Sets a field to a timestamp.
    pub fn set_timestamp(self, field: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        self.put(field.into(), FieldValue::Value(timestamp_value(timestamp)))
    }

    /// Sets a field to the store's clock at write time.
    pub fn server_timestamp(self, field: impl Into<String>) -> Self {
        self.put(field.into(), FieldValue::ServerTimestamp)
    }

    fn put(mut self, field: String, value: FieldValue) -> Self {
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    /// Returns the value written to `field`, if any.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Returns true if nothing is written.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolves server timestamps against `now` and returns the literal fields.
    pub fn resolve(self, now: DateTime<Utc>) -> Fields {
        self.fields
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    FieldValue::Value(value) => value,
                    FieldValue::ServerTimestamp => timestamp_value(now),
                };
                (name, value)
            })
            .collect()
    }
}

/// Equality constraint on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name.
    pub field: String,
    /// Required value.
    pub value: Value,
}

/// A collection query with equality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to read.
    pub collection: String,
    /// All filters must match.
    pub filters: Vec<FieldFilter>,
}

impl Query {
    /// Selects every document of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
        }
    }

    /// Adds an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Returns the value `field` is constrained to, if the query constrains it.
    pub fn equality_on(&self, field: &str) -> Option<&Value> {
        self.filters
            .iter()
            .find(|filter| filter.field == field)
            .map(|filter| &filter.value)
    }

    /// Returns true if `fields` satisfy every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|filter| fields.get(&filter.field) == Some(&filter.value))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_write_resolves_server_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let fields = DocumentWrite::new()
            .set("cliente", "X")
            .server_timestamp("createdAt")
            .resolve(now);

        assert_eq!(fields["cliente"], "X");
        assert_eq!(fields["createdAt"], "2024-01-01T12:00:00Z");
    }

    #[test]
    fn test_write_set_replaces_previous_value() {
        let write = DocumentWrite::new().set("a", 1).set("a", 2);

        assert_eq!(write.get("a"), Some(&FieldValue::Value(json!(2))));
        assert_eq!(write.resolve(Utc::now()).len(), 1);
    }

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::new("agendamentos")
            .where_eq("userId", "a")
            .where_eq("cliente", "X");

        let mut fields = Fields::new();
        fields.insert("userId".to_string(), json!("a"));
        fields.insert("cliente".to_string(), json!("X"));
        assert!(query.matches(&fields));

        fields.insert("userId".to_string(), json!("b"));
        assert!(!query.matches(&fields));

        assert_eq!(query.equality_on("cliente"), Some(&json!("X")));
        assert_eq!(query.equality_on("endereco"), None);
    }

    #[test]
    fn test_decode_injects_id() {
        #[derive(Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let mut fields = Fields::new();
        fields.insert("name".to_string(), json!("n"));
        let now = Utc::now();
        let doc = Document {
            id: "doc-1".to_string(),
            fields,
            create_time: now,
            update_time: now,
        };

        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "doc-1");
        assert_eq!(named.name, "n");
    }

    #[test]
    fn test_decode_reports_shape_errors() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            required: String,
        }

        let now = Utc::now();
        let doc = Document {
            id: "doc-1".to_string(),
            fields: Fields::new(),
            create_time: now,
            update_time: now,
        };

        assert!(matches!(
            doc.decode::<Strict>(),
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
