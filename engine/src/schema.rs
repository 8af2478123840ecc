//! Collection schemas for checking wire payloads.
//!
//! The client builds documents from typed drafts, but a hosted store receives
//! raw JSON maps. A schema rejects unknown fields and wrongly typed values
//! before anything is written.

use crate::document::{field, FieldValue, Fields, EVENTS_COLLECTION};
use crate::error::SchemaError;
use crate::CollectionName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Bool,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Bool => write!(f, "Bool"),
        }
    }
}

/// Definition of a field in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Must be present when a document is created
    pub required: bool,
}

impl FieldDef {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    fn check_type(&self, value: &FieldValue) -> Result<(), SchemaError> {
        let valid = match self.field_type {
            FieldType::String => matches!(value, FieldValue::String(_)),
            FieldType::Bool => matches!(value, FieldValue::Bool(_)),
        };
        if valid {
            Ok(())
        } else {
            Err(SchemaError::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.to_string(),
            })
        }
    }
}

/// Schema for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    pub name: CollectionName,
    pub fields: Vec<FieldDef>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<CollectionName>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the full field set of a new document.
    pub fn validate_create(&self, fields: &Fields) -> Result<(), SchemaError> {
        for def in self.fields.iter().filter(|f| f.required) {
            if !fields.contains_key(&def.name) {
                return Err(SchemaError::MissingField(def.name.clone()));
            }
        }
        self.validate_update(fields)
    }

    /// Check a partial field set. Every given field must be known and typed.
    pub fn validate_update(&self, fields: &Fields) -> Result<(), SchemaError> {
        for (name, value) in fields {
            let def = self
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;
            def.check_type(value)?;
        }
        Ok(())
    }
}

/// Schemas for every collection a store accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub collections: HashMap<CollectionName, CollectionSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, collection: CollectionSchema) -> &mut Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    pub fn with_collection(mut self, collection: CollectionSchema) -> Self {
        self.add_collection(collection);
        self
    }

    /// Look up a collection, failing for unknown names.
    pub fn collection(&self, name: &str) -> Result<&CollectionSchema, SchemaError> {
        self.collections
            .get(name)
            .ok_or_else(|| SchemaError::CollectionNotFound(name.to_string()))
    }

    /// The schema of the `events` collection.
    pub fn events() -> Self {
        Schema::new().with_collection(CollectionSchema::new(
            EVENTS_COLLECTION,
            vec![
                FieldDef::required(field::TITLE, FieldType::String),
                FieldDef::required(field::DESCRIPTION, FieldType::String),
                FieldDef::required(field::DATE, FieldType::String),
                FieldDef::required(field::CREATED_BY, FieldType::String),
                FieldDef::required(field::IS_FAVORITE, FieldType::Bool),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventDraft;

    fn full_event() -> Fields {
        let mut fields = EventDraft::new("Meetup", "Team sync", "12-12-2026").to_fields();
        fields.insert(field::CREATED_BY.into(), "uid-1".into());
        fields.insert(field::IS_FAVORITE.into(), false.into());
        fields
    }

    #[test]
    fn create_accepts_full_event() {
        let schema = Schema::events();
        let events = schema.collection("events").unwrap();
        assert!(events.validate_create(&full_event()).is_ok());
    }

    #[test]
    fn create_requires_all_fields() {
        let schema = Schema::events();
        let events = schema.collection("events").unwrap();
        let mut fields = full_event();
        fields.remove(field::IS_FAVORITE);

        let result = events.validate_create(&fields);
        assert!(matches!(result, Err(SchemaError::MissingField(f)) if f == "isFavorite"));
    }

    #[test]
    fn update_accepts_partial() {
        let schema = Schema::events();
        let events = schema.collection("events").unwrap();
        let mut fields = Fields::new();
        fields.insert(field::IS_FAVORITE.into(), true.into());
        assert!(events.validate_update(&fields).is_ok());
    }

    #[test]
    fn rejects_unknown_field() {
        let schema = Schema::events();
        let events = schema.collection("events").unwrap();
        let mut fields = Fields::new();
        fields.insert("color".into(), "red".into());

        let result = events.validate_update(&fields);
        assert!(matches!(result, Err(SchemaError::UnknownField(f)) if f == "color"));
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = Schema::events();
        let events = schema.collection("events").unwrap();
        let mut fields = Fields::new();
        fields.insert(field::IS_FAVORITE.into(), "yes".into());

        let result = events.validate_update(&fields);
        assert!(matches!(result, Err(SchemaError::TypeMismatch { field, .. }) if field == "isFavorite"));
    }

    #[test]
    fn unknown_collection() {
        let schema = Schema::events();
        assert!(matches!(
            schema.collection("posts"),
            Err(SchemaError::CollectionNotFound(c)) if c == "posts"
        ));
    }

    #[test]
    fn schema_serialization() {
        let schema = Schema::events();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
    }
}
