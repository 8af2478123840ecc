//! Document types for the events collection.

use crate::DocumentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the shared collection holding events.
pub const EVENTS_COLLECTION: &str = "events";

/// Owner recorded on documents created without a signed-in identity.
pub const ANONYMOUS: &str = "anonymous";

/// Field names of an event document.
pub mod field {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const DATE: &str = "date";
    pub const CREATED_BY: &str = "createdBy";
    pub const IS_FAVORITE: &str = "isFavorite";
}

/// A single field value. Events only carry strings and booleans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Bool(bool),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::String(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Named field values of a document. Ordered for deterministic output.
pub type Fields = BTreeMap<String, FieldValue>;

/// An immutable snapshot of one document.
///
/// Changing a field produces a new `Document` via [`Document::with_fields`];
/// holders of the old value never observe the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier within its collection
    pub id: DocumentId,
    /// Field values
    pub fields: Fields,
}

impl Document {
    /// Create a document from an id and its fields.
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a string field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field(field::TITLE)
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field(field::DESCRIPTION)
    }

    pub fn date(&self) -> Option<&str> {
        self.str_field(field::DATE)
    }

    pub fn created_by(&self) -> Option<&str> {
        self.str_field(field::CREATED_BY)
    }

    /// The favorite flag. Missing or non-boolean values read as `false`.
    pub fn is_favorite(&self) -> bool {
        self.get(field::IS_FAVORITE)
            .and_then(FieldValue::as_bool)
            .unwrap_or(false)
    }

    /// Return a new document with `changes` merged over the current fields.
    pub fn with_fields(&self, changes: &Fields) -> Self {
        let mut fields = self.fields.clone();
        for (name, value) in changes {
            fields.insert(name.clone(), value.clone());
        }
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    /// The current values of the named fields, for rollback bookkeeping.
    ///
    /// Fields absent from the document are skipped.
    pub fn project<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Fields {
        names
            .into_iter()
            .filter_map(|name| self.fields.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

/// User input for creating or editing an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date: String,
}

impl EventDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            date: date.into(),
        }
    }

    /// Draft prefilled from an existing document, as shown on the edit screen.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            title: doc.title().unwrap_or_default().to_string(),
            description: doc.description().unwrap_or_default().to_string(),
            date: doc.date().unwrap_or_default().to_string(),
        }
    }

    /// The three editable fields, as stored.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(field::TITLE.into(), self.title.clone().into());
        fields.insert(field::DESCRIPTION.into(), self.description.clone().into());
        fields.insert(field::DATE.into(), self.date.clone().into());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meetup() -> Document {
        let mut fields = EventDraft::new("Meetup", "Team sync", "12-12-2026").to_fields();
        fields.insert(field::CREATED_BY.into(), "uid-1".into());
        fields.insert(field::IS_FAVORITE.into(), false.into());
        Document::new("evt-1", fields)
    }

    #[test]
    fn accessors() {
        let doc = meetup();
        assert_eq!(doc.title(), Some("Meetup"));
        assert_eq!(doc.description(), Some("Team sync"));
        assert_eq!(doc.date(), Some("12-12-2026"));
        assert_eq!(doc.created_by(), Some("uid-1"));
        assert!(!doc.is_favorite());
    }

    #[test]
    fn with_fields_leaves_original_untouched() {
        let doc = meetup();
        let mut changes = Fields::new();
        changes.insert(field::IS_FAVORITE.into(), true.into());

        let changed = doc.with_fields(&changes);
        assert!(changed.is_favorite());
        assert!(!doc.is_favorite());
        assert_eq!(changed.title(), doc.title());
    }

    #[test]
    fn project_skips_missing_fields() {
        let doc = meetup();
        let names = vec![field::IS_FAVORITE.to_string(), "color".to_string()];
        let prior = doc.project(&names);
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[field::IS_FAVORITE], FieldValue::Bool(false));
    }

    #[test]
    fn serializes_as_plain_json() {
        let doc = meetup();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "evt-1",
                "fields": {
                    "createdBy": "uid-1",
                    "date": "12-12-2026",
                    "description": "Team sync",
                    "isFavorite": false,
                    "title": "Meetup"
                }
            })
        );
    }

    #[test]
    fn missing_favorite_reads_false() {
        let doc = Document::new("evt-2", Fields::new());
        assert!(!doc.is_favorite());
        assert_eq!(doc.title(), None);
    }
}
