//! Record collaborator seam.
//!
//! The engine never talks to a storage backend directly. It sees two
//! capabilities, selected at configuration time:
//!
//! - [`ModelMetadata`] - introspection over a record type (attributes,
//!   relation declarations, file-capable fields) plus instance creation,
//!   lookup and collection scans
//! - [`Record`] - one record instance: attribute access, relation
//!   assignment, validation errors and persistence
//!
//! A document-oriented in-memory backend ships in [`memory`]; relational
//! backends implement the same two traits on their side.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::import::column_map::{ColumnMap, ImportRow};

// =============================================================================
// Relation declarations
// =============================================================================

/// Kind of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The record holds a single reference to another record.
    BelongsTo,
    /// Document-store variant of [`RelationKind::BelongsTo`].
    EmbeddedIn,
    /// The record holds a collection of references.
    HasMany,
    /// Join-table collection of references.
    HasAndBelongsToMany,
    /// Document-store variant of [`RelationKind::HasMany`].
    EmbedsMany,
}

impl RelationKind {
    /// True for relations resolved to a single identity per row.
    pub fn is_to_one(&self) -> bool {
        matches!(self, RelationKind::BelongsTo | RelationKind::EmbeddedIn)
    }

    /// True for relations resolved to a replaced collection per row.
    pub fn is_to_many(&self) -> bool {
        !self.is_to_one()
    }
}

/// A relation declared on a record type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    /// Field name on the owning type, e.g. `category`.
    pub field: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Name of the target model.
    pub target: String,
}

impl RelationDef {
    pub fn new(field: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            target: target.into(),
        }
    }
}

// =============================================================================
// Record identity
// =============================================================================

/// Opaque identity of a persisted record.
///
/// Backends choose the representation (uuid, integer key, composite); the
/// engine only stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Metadata provider
// =============================================================================

/// Introspection and instance operations over one record type.
pub trait ModelMetadata {
    /// Name of the model, used in messages and errors.
    fn model_name(&self) -> &str;

    /// All declared scalar attribute names, in declaration order.
    fn attribute_names(&self) -> Vec<String>;

    /// All declared relations.
    fn relations(&self) -> Vec<RelationDef>;

    /// Attachment-capable field names. Most backends have none.
    fn file_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Metadata of the model a relation field points at.
    fn related_model(&self, field: &str) -> Option<&dyn ModelMetadata>;

    /// Full scan of the persisted collection. Used once per run per
    /// relation field to preload lookup tables.
    fn all_records(&self) -> Vec<Box<dyn Record>>;

    /// A fresh, unsaved record.
    fn new_record(&self) -> Box<dyn Record>;

    /// Locate a persisted record by an attribute value.
    fn find_by(&self, field: &str, value: &str) -> Option<Box<dyn Record>>;
}

// =============================================================================
// Record instance
// =============================================================================

/// One record instance owned by the row importer for the duration of a row.
pub trait Record {
    /// Identity, present once persisted.
    fn id(&self) -> Option<RecordId>;

    /// True until the first successful save.
    fn is_new(&self) -> bool;

    /// Read a scalar attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Write a scalar attribute.
    fn set_attribute(&mut self, name: &str, value: &str);

    /// Point a to-one relation at a related record.
    fn set_to_one(&mut self, field: &str, target: RecordId);

    /// Replace the full to-many collection. Never appends.
    fn replace_to_many(&mut self, field: &str, targets: Vec<RecordId>);

    /// Attach a fetched file to a file-capable field.
    fn attach_file(&mut self, field: &str, path: &Path);

    /// Validation errors accumulated on this instance.
    fn errors(&self) -> Vec<String>;

    /// Record a validation error.
    fn add_error(&mut self, message: &str);

    /// Whether the record would currently pass validation.
    fn is_valid(&self) -> bool;

    /// Persist. Returns false and records validation messages on failure.
    fn save(&mut self) -> bool;

    /// Extension point invoked after relation resolution, before the save
    /// decision. Meant for derived-field computation.
    fn before_import_save(&mut self, _row: &ImportRow, _map: &ColumnMap) {}

    /// Extension point invoked after a successful save.
    fn after_import_save(&mut self, _row: &ImportRow, _map: &ColumnMap) {}

    /// Human-readable label used in report messages: the configured label
    /// attribute, falling back to the identity.
    fn display_label(&self, label_method: &str) -> String {
        match self.attribute(label_method) {
            Some(value) if !value.is_empty() => value,
            _ => match self.id() {
                Some(id) => id.to_string(),
                None => "(new record)".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_kind_classification() {
        assert!(RelationKind::BelongsTo.is_to_one());
        assert!(RelationKind::EmbeddedIn.is_to_one());
        assert!(RelationKind::HasMany.is_to_many());
        assert!(RelationKind::HasAndBelongsToMany.is_to_many());
        assert!(RelationKind::EmbedsMany.is_to_many());
    }

    #[test]
    fn test_relation_kind_serde_names() {
        let json = serde_json::to_string(&RelationKind::BelongsTo).unwrap();
        assert_eq!(json, "\"belongs_to\"");
        let kind: RelationKind = serde_json::from_str("\"has_many\"").unwrap();
        assert_eq!(kind, RelationKind::HasMany);
    }

    #[test]
    fn test_record_id_display() {
        let id = RecordId::new("42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.as_str(), "42");
    }
}
