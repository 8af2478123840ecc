//! Document handlers.
//!
//! Writes are checked against the collection schema. Events additionally run
//! the same field validation as the client. Editing or deleting a document
//! requires owning it; the favorite flag can be set by anyone.

use eventdeck_engine::document::field;
use eventdeck_engine::{
    validate_event, CollectionHandle, Document, DocumentId, DocumentStore, EventDraft, FieldType,
    FieldValue, Fields, Filter, Schema, SchemaError, ANONYMOUS, EVENTS_COLLECTION,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Optional equality filter on a list request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub field: Option<String>,
    pub equals: Option<String>,
}

/// Body of create and patch requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub fields: Fields,
}

/// Response to a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: DocumentId,
}

/// Build the handle a list query describes.
///
/// Query values arrive as text and are typed by the field's schema.
pub fn query_handle(schema: &Schema, collection: &str, query: ListQuery) -> Result<CollectionHandle> {
    let def = schema.collection(collection)?;

    let filter = match (query.field, query.equals) {
        (None, None) => Filter::All,
        (Some(name), Some(raw)) => {
            let field_def = def
                .fields
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;
            let value = match field_def.field_type {
                FieldType::String => FieldValue::String(raw),
                FieldType::Bool => FieldValue::Bool(raw.parse().map_err(|_| {
                    AppError::BadRequest(format!("{} expects true or false", name))
                })?),
            };
            Filter::equals(name, value)
        }
        _ => {
            return Err(AppError::BadRequest(
                "field and equals must be given together".to_string(),
            ))
        }
    };

    Ok(CollectionHandle::new(collection, filter))
}

fn ensure_owner(doc: &Document, uid: &str) -> Result<()> {
    if uid != ANONYMOUS && doc.created_by() == Some(uid) {
        Ok(())
    } else {
        Err(eventdeck_engine::Error::NotOwner(doc.id.clone()).into())
    }
}

/// Replace event text fields in `fields` with their validated, trimmed form.
///
/// `current` supplies the values a partial update leaves untouched.
fn normalize_event(current: &Fields, fields: &mut Fields) -> Result<()> {
    const EDITABLE: [&str; 3] = [field::TITLE, field::DESCRIPTION, field::DATE];

    if !EDITABLE.iter().any(|name| fields.contains_key(*name)) {
        return Ok(());
    }

    let merged = Document::new("", current.clone()).with_fields(fields);
    let valid = validate_event(&EventDraft::from_document(&merged))?;
    for (name, value) in valid.to_fields() {
        if fields.contains_key(&name) {
            fields.insert(name, value);
        }
    }
    Ok(())
}

pub async fn handle_list(
    store: &dyn DocumentStore,
    schema: &Schema,
    collection: &str,
    query: ListQuery,
) -> Result<Vec<Document>> {
    let handle = query_handle(schema, collection, query)?;
    Ok(store.get_documents(&handle).await?)
}

pub async fn handle_get(
    store: &dyn DocumentStore,
    schema: &Schema,
    collection: &str,
    id: &str,
) -> Result<Document> {
    schema.collection(collection)?;
    store
        .get_document(collection, id)
        .await?
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

/// Create a document owned by `uid`, or by nobody when signed out.
pub async fn handle_create(
    store: &dyn DocumentStore,
    schema: &Schema,
    collection: &str,
    uid: Option<&str>,
    mut fields: Fields,
) -> Result<DocumentId> {
    let def = schema.collection(collection)?;
    def.validate_update(&fields)?;

    fields.insert(field::CREATED_BY.into(), uid.unwrap_or(ANONYMOUS).into());
    fields
        .entry(field::IS_FAVORITE.into())
        .or_insert(FieldValue::Bool(false));

    if collection == EVENTS_COLLECTION {
        let mut required = EventDraft::default().to_fields();
        required.append(&mut fields);
        fields = required;
        normalize_event(&Fields::new(), &mut fields)?;
    }
    def.validate_create(&fields)?;

    let id = store.add_document(collection, fields).await?;
    tracing::info!(collection = %collection, document_id = %id, "Document created");
    Ok(id)
}

/// Merge `fields` into a document.
pub async fn handle_update(
    store: &dyn DocumentStore,
    schema: &Schema,
    collection: &str,
    id: &str,
    uid: Option<&str>,
    mut fields: Fields,
) -> Result<()> {
    let def = schema.collection(collection)?;
    def.validate_update(&fields)?;

    if fields.is_empty() {
        return Err(AppError::BadRequest("no fields to update".to_string()));
    }
    if fields.contains_key(field::CREATED_BY) {
        return Err(AppError::BadRequest(format!(
            "{} cannot be changed",
            field::CREATED_BY
        )));
    }

    let existing = store
        .get_document(collection, id)
        .await?
        .ok_or_else(|| AppError::NotFound(id.to_string()))?;

    if !fields.keys().all(|name| name == field::IS_FAVORITE) {
        ensure_owner(&existing, uid.ok_or(AppError::Unauthorized)?)?;
    }
    if collection == EVENTS_COLLECTION {
        normalize_event(&existing.fields, &mut fields)?;
    }

    store.update_document(collection, id, fields).await?;
    tracing::debug!(collection = %collection, document_id = %id, "Document updated");
    Ok(())
}

/// Delete a document owned by `uid`.
pub async fn handle_delete(
    store: &dyn DocumentStore,
    schema: &Schema,
    collection: &str,
    id: &str,
    uid: &str,
) -> Result<()> {
    schema.collection(collection)?;

    let existing = store
        .get_document(collection, id)
        .await?
        .ok_or_else(|| AppError::NotFound(id.to_string()))?;
    ensure_owner(&existing, uid)?;

    store.delete_document(collection, id).await?;
    tracing::info!(collection = %collection, document_id = %id, "Document deleted");
    Ok(())
}
