//! Schema Inspector: derives the importable shape of a record type.
//!
//! Classification is recomputed on demand from the type's declared
//! attributes and relations plus the caller's configuration; callers may
//! memoize the result across runs.

use serde::Serialize;

use crate::config::ImportConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::record::ModelMetadata;

/// Identifier and timestamp fields never imported from a CSV.
const RESERVED_FIELDS: [&str; 6] = ["id", "_id", "created_at", "updated_at", "c_at", "u_at"];

/// Suffixes of file-attachment shadow fields.
const FILE_SHADOW_SUFFIXES: [&str; 4] =
    ["_file_name", "_content_type", "_file_size", "_updated_at"];

/// The importable shape of a record type.
///
/// The scalar, to-one and to-many sets are pairwise disjoint and exclude
/// identifier, timestamp and file-metadata shadow fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportableSchema {
    /// Fields filled directly from a cell value.
    pub scalar_fields: Vec<String>,
    /// Relations resolved to a single identity.
    pub to_one_fields: Vec<String>,
    /// Relations resolved to a replaced collection.
    pub to_many_fields: Vec<String>,
    /// Attachment-capable fields.
    pub file_fields: Vec<String>,
    /// Declared attributes excluded from import.
    pub excluded_fields: Vec<String>,
}

/// Classify a record type's fields for import.
///
/// A field listed in `config.included_fields` is always treated as scalar,
/// even when the type declares a relation under the same name - explicit
/// inclusion overrides relation auto-detection.
///
/// Fails only when the type exposes no introspectable metadata at all.
pub fn classify_fields(
    model: &dyn ModelMetadata,
    config: &ImportConfig,
) -> ConfigResult<ImportableSchema> {
    let attributes = model.attribute_names();
    let relations = model.relations();

    if attributes.is_empty() && relations.is_empty() {
        return Err(ConfigError::NoMetadata(model.model_name().to_string()));
    }

    let to_one_fields: Vec<String> = relations
        .iter()
        .filter(|r| r.kind.is_to_one())
        .map(|r| r.field.clone())
        .filter(|f| !config.included_fields.contains(f))
        .collect();

    let to_many_fields: Vec<String> = relations
        .iter()
        .filter(|r| r.kind.is_to_many())
        .map(|r| r.field.clone())
        .filter(|f| !config.included_fields.contains(f))
        .collect();

    let file_fields: Vec<String> = model
        .file_fields()
        .into_iter()
        .filter(|f| !config.excluded_fields.contains(f))
        .collect();

    let mut scalar_fields = Vec::new();
    let mut excluded_fields = Vec::new();

    if config.included_fields.is_empty() {
        for field in &attributes {
            if is_importable(
                field,
                &to_one_fields,
                &to_many_fields,
                &file_fields,
                &config.excluded_fields,
            ) {
                scalar_fields.push(field.clone());
            } else {
                excluded_fields.push(field.clone());
            }
        }
    } else {
        scalar_fields = config.included_fields.clone();
        excluded_fields = attributes
            .iter()
            .filter(|f| !scalar_fields.contains(f))
            .cloned()
            .collect();
    }

    Ok(ImportableSchema {
        scalar_fields,
        to_one_fields,
        to_many_fields,
        file_fields,
        excluded_fields,
    })
}

fn is_importable(
    field: &str,
    to_one_fields: &[String],
    to_many_fields: &[String],
    file_fields: &[String],
    excluded: &[String],
) -> bool {
    if RESERVED_FIELDS.contains(&field) || excluded.iter().any(|f| f == field) {
        return false;
    }

    // A to-one relation hides both its field and its foreign-key shadow.
    for relation in to_one_fields {
        if field == relation || field == format!("{}_id", relation) {
            return false;
        }
    }

    if to_many_fields.iter().any(|f| f == field) {
        return false;
    }

    // Attachment fields carry four generated shadow attributes.
    for file_field in file_fields {
        for suffix in FILE_SHADOW_SUFFIXES {
            if field == format!("{}{}", file_field, suffix) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::memory::MemoryModel;
    use crate::record::RelationKind;

    fn product_model() -> MemoryModel {
        let category = MemoryModel::new("category", vec!["title".into()]);
        let tag = MemoryModel::new("tag", vec!["label".into()]);
        MemoryModel::new(
            "product",
            vec![
                "id".into(),
                "name".into(),
                "price".into(),
                "category_id".into(),
                "photo_file_name".into(),
                "photo_content_type".into(),
                "photo_file_size".into(),
                "photo_updated_at".into(),
                "created_at".into(),
                "updated_at".into(),
                "internal_code".into(),
            ],
        )
        .with_relation("category", RelationKind::BelongsTo, category)
        .with_relation("tag", RelationKind::HasMany, tag)
        .with_file_field("photo")
    }

    #[test]
    fn test_classification_excludes_reserved_and_shadows() {
        let config = ImportConfig::new();
        let schema = classify_fields(&product_model(), &config).unwrap();

        assert_eq!(
            schema.scalar_fields,
            vec!["name".to_string(), "price".to_string(), "internal_code".to_string()]
        );
        assert_eq!(schema.to_one_fields, vec!["category".to_string()]);
        assert_eq!(schema.to_many_fields, vec!["tag".to_string()]);
        assert_eq!(schema.file_fields, vec!["photo".to_string()]);
        assert!(schema.excluded_fields.contains(&"id".to_string()));
        assert!(schema.excluded_fields.contains(&"category_id".to_string()));
        assert!(schema.excluded_fields.contains(&"photo_file_name".to_string()));
    }

    #[test]
    fn test_excluded_fields_config() {
        let config = ImportConfig::new().with_excluded_fields(vec!["internal_code".into()]);
        let schema = classify_fields(&product_model(), &config).unwrap();

        assert!(!schema.scalar_fields.contains(&"internal_code".to_string()));
        assert!(schema.excluded_fields.contains(&"internal_code".to_string()));
    }

    #[test]
    fn test_included_fields_override_relations() {
        let config =
            ImportConfig::new().with_included_fields(vec!["name".into(), "category".into()]);
        let schema = classify_fields(&product_model(), &config).unwrap();

        // Explicit inclusion wins: category is scalar, not a relation.
        assert_eq!(
            schema.scalar_fields,
            vec!["name".to_string(), "category".to_string()]
        );
        assert!(schema.to_one_fields.is_empty());
    }

    #[test]
    fn test_excluded_file_field() {
        let config = ImportConfig::new().with_excluded_fields(vec!["photo".into()]);
        let schema = classify_fields(&product_model(), &config).unwrap();
        assert!(schema.file_fields.is_empty());
    }

    #[test]
    fn test_no_metadata_fails() {
        let empty = MemoryModel::new("opaque", Vec::new());
        let err = classify_fields(&empty, &ImportConfig::new()).unwrap_err();
        assert!(err.to_string().contains("opaque"));
    }
}
