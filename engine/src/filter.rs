//! Collection handles and filter predicates.
//!
//! A [`CollectionHandle`] names a remote collection and the [`Filter`] a live
//! subscription applies to it. The filter is fixed for the lifetime of a
//! subscription; a different filter means a different handle.

use crate::document::{field, Document, FieldValue, EVENTS_COLLECTION};
use crate::CollectionName;
use serde::{Deserialize, Serialize};

/// A pure predicate over a document's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Filter {
    /// Every document in the collection.
    #[default]
    All,
    /// Documents whose `field` holds exactly `value`.
    Equals { field: String, value: FieldValue },
}

impl Filter {
    /// Equality filter on a single field.
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document belongs to the filtered set.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Equals { field, value } => doc.get(field) == Some(value),
        }
    }
}

/// Reference to a server-side collection plus the filter applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHandle {
    pub collection: CollectionName,
    #[serde(default)]
    pub filter: Filter,
}

impl CollectionHandle {
    pub fn new(collection: impl Into<CollectionName>, filter: Filter) -> Self {
        Self {
            collection: collection.into(),
            filter,
        }
    }

    /// All events.
    pub fn events() -> Self {
        Self::new(EVENTS_COLLECTION, Filter::All)
    }

    /// Events created by `uid`.
    pub fn mine(uid: impl Into<String>) -> Self {
        Self::new(
            EVENTS_COLLECTION,
            Filter::equals(field::CREATED_BY, uid.into()),
        )
    }

    /// Events flagged as favorite.
    pub fn favorites() -> Self {
        Self::new(EVENTS_COLLECTION, Filter::equals(field::IS_FAVORITE, true))
    }

    /// Whether a document of this collection belongs to the handle's view.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filter.matches(doc)
    }
}

/// Which events the dashboard lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardScope {
    #[default]
    All,
    /// Only events created by the signed-in user.
    Mine,
}

impl DashboardScope {
    /// The handle for this scope. `Mine` without an identity falls back to all
    /// events, matching a signed-out dashboard.
    pub fn handle(self, uid: Option<&str>) -> CollectionHandle {
        match (self, uid) {
            (DashboardScope::Mine, Some(uid)) => CollectionHandle::mine(uid),
            _ => CollectionHandle::events(),
        }
    }
}
