//! Relation Resolver: preloaded label-to-identity lookup tables.
//!
//! Each relation field gets one table, built from a single full scan of
//! the related collection before any row is processed. Row processing then
//! resolves labels in O(1) instead of one query per row per relation.
//!
//! The tables are a snapshot: a related collection changing mid-run is not
//! observed. Single-run consistency only.

use std::collections::HashMap;

use crate::config::ImportConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::record::{ModelMetadata, RecordId};
use crate::schema::ImportableSchema;

/// Label value to related-record identity, for one relation field.
pub type LookupTable = HashMap<String, RecordId>;

/// All preloaded lookup tables for a run, keyed by relation field.
#[derive(Debug, Clone, Default)]
pub struct RelationLookup {
    tables: HashMap<String, LookupTable>,
}

impl RelationLookup {
    /// Resolve a label for a relation field.
    pub fn resolve(&self, field: &str, label: &str) -> Option<&RecordId> {
        self.tables.get(field).and_then(|table| table.get(label))
    }

    /// The whole table for one field.
    pub fn table(&self, field: &str) -> Option<&LookupTable> {
        self.tables.get(field)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Build lookup tables for every to-one and to-many field of the schema.
///
/// The label of each related record is its configured accessor attribute,
/// the empty string when absent. Related records sharing a label overwrite
/// each other; the last one scanned wins (preserved deliberately).
pub fn preload_lookups(
    model: &dyn ModelMetadata,
    schema: &ImportableSchema,
    config: &ImportConfig,
) -> ConfigResult<RelationLookup> {
    let mut tables = HashMap::new();

    let relation_fields = schema
        .to_one_fields
        .iter()
        .chain(schema.to_many_fields.iter());

    for field in relation_fields {
        let accessor = config
            .relation_label_accessors
            .get(field)
            .ok_or_else(|| ConfigError::MissingLabelAccessor(field.clone()))?;

        let related = model
            .related_model(field)
            .ok_or_else(|| ConfigError::UnknownRelation(field.clone()))?;

        let mut table = LookupTable::new();
        for record in related.all_records() {
            let label = record.attribute(accessor).unwrap_or_default();
            if let Some(id) = record.id() {
                table.insert(label, id);
            }
        }

        tables.insert(field.clone(), table);
    }

    Ok(RelationLookup { tables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::memory::MemoryModel;
    use crate::record::RelationKind;
    use crate::schema::classify_fields;

    fn setup() -> (MemoryModel, MemoryModel) {
        let category = MemoryModel::new("category", vec!["title".into()]);
        let product = MemoryModel::new("product", vec!["name".into()]).with_relation(
            "category",
            RelationKind::BelongsTo,
            category.clone(),
        );
        (product, category)
    }

    #[test]
    fn test_preload_builds_label_table() {
        let (product, category) = setup();
        let tools = category.seed(&[("title", "Tools")]);
        let toys = category.seed(&[("title", "Toys")]);

        let config = ImportConfig::new().with_relation_label("category", "title");
        let schema = classify_fields(&product, &config).unwrap();
        let lookups = preload_lookups(&product, &schema, &config).unwrap();

        assert_eq!(lookups.resolve("category", "Tools"), Some(&tools));
        assert_eq!(lookups.resolve("category", "Toys"), Some(&toys));
        assert_eq!(lookups.resolve("category", "Unknown"), None);
    }

    #[test]
    fn test_duplicate_label_later_wins() {
        let (product, category) = setup();
        category.seed(&[("title", "Tools")]);
        let second = category.seed(&[("title", "Tools")]);

        let config = ImportConfig::new().with_relation_label("category", "title");
        let schema = classify_fields(&product, &config).unwrap();
        let lookups = preload_lookups(&product, &schema, &config).unwrap();

        assert_eq!(lookups.resolve("category", "Tools"), Some(&second));
    }

    #[test]
    fn test_missing_accessor_label() {
        let (product, category) = setup();
        // A related record without the accessor attribute keys as "".
        category.seed(&[("color", "red")]);

        let config = ImportConfig::new().with_relation_label("category", "title");
        let schema = classify_fields(&product, &config).unwrap();
        let lookups = preload_lookups(&product, &schema, &config).unwrap();

        assert!(lookups.resolve("category", "").is_some());
    }

    #[test]
    fn test_missing_label_accessor_config_fails() {
        let (product, _category) = setup();
        let config = ImportConfig::new();
        let schema = classify_fields(&product, &config).unwrap();
        let err = preload_lookups(&product, &schema, &config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLabelAccessor(_)));
    }

    #[test]
    fn test_unknown_related_model_fails() {
        // Relation declared without a registered related model.
        let product = MemoryModel::new("product", vec!["name".into()]);
        let mut schema = classify_fields(&product, &ImportConfig::new()).unwrap();
        schema.to_one_fields.push("category".into());

        let config = ImportConfig::new().with_relation_label("category", "title");
        let err = preload_lookups(&product, &schema, &config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRelation(_)));
    }
}
