//! Row Importer: turns one CSV row into one created or updated record.
//!
//! Per row: locate or instantiate the target, fill scalar attributes,
//! resolve relations through the preloaded lookups, run the extension
//! hooks, import file fields, and decide the outcome. Every row produces
//! exactly one message, routed to successes or errors.

use once_cell::sync::Lazy;
use regex::Regex;

use super::column_map::{ColumnMap, ImportRow};
use super::resolver::RelationLookup;
use crate::config::{ActorContext, ImportConfig};
use crate::fetch::ResourceFetcher;
use crate::record::{ModelMetadata, Record};
use crate::schema::ImportableSchema;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Trailing run of lowercase letters and digits, used as the extension.
static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+$").expect("static pattern"));

/// Outcome of one row.
pub struct RowOutcome {
    /// The report message for this row.
    pub message: String,
    /// Whether the message belongs to the success list.
    pub success: bool,
    /// The row's record was attached to the parent without its own save.
    pub skipped_nested_save: bool,
    /// The record, persisted or not, for parent attachment.
    pub record: Box<dyn Record>,
}

/// Shared, read-only state for importing the rows of one run.
pub struct RowImporter<'a> {
    pub model: &'a dyn ModelMetadata,
    pub schema: &'a ImportableSchema,
    pub map: &'a ColumnMap,
    pub lookups: &'a RelationLookup,
    pub config: &'a ImportConfig,
    pub fetcher: &'a dyn ResourceFetcher,
    /// Update-lookup field when update mode is on.
    pub update_field: Option<&'a str>,
}

impl RowImporter<'_> {
    /// Import one data row.
    pub fn import_row(
        &self,
        row: &ImportRow,
        parent: Option<&dyn Record>,
        actor: Option<&ActorContext>,
    ) -> RowOutcome {
        let mut record = self.locate_or_create(row);
        let was_new = record.is_new();

        // Single staged write: scalars and relations are all in place
        // before the one save call, also on the update path.
        self.apply_to_one(record.as_mut(), row);
        self.apply_to_many(record.as_mut(), row);

        record.before_import_save(row, self.map);
        self.import_files(record.as_mut(), row);

        let mut skip_nested_save = false;
        if let Some(hook) = &self.config.before_import_save {
            let keep = hook(record.as_mut(), row, self.map, parent, actor);
            skip_nested_save = !keep && parent.is_some();
        }

        let label = record.display_label(&self.config.label_method);
        let (done_verb, fail_verb) = if was_new {
            ("Created", "create")
        } else {
            ("Updated", "update")
        };

        if !record.errors().is_empty() {
            return RowOutcome {
                message: format!(
                    "Errors before save: {}. Errors: {}.",
                    label,
                    record.errors().join(", ")
                ),
                success: false,
                skipped_nested_save: false,
                record,
            };
        }

        if skip_nested_save {
            return RowOutcome {
                message: format!("Skipped nested save: {}", label),
                success: true,
                skipped_nested_save: true,
                record,
            };
        }

        if record.save() {
            record.after_import_save(row, self.map);
            RowOutcome {
                message: format!("{}: {}", done_verb, label),
                success: true,
                skipped_nested_save: false,
                record,
            }
        } else {
            RowOutcome {
                message: format!(
                    "Failed to {}: {}. Errors: {}.",
                    fail_verb,
                    label,
                    record.errors().join(", ")
                ),
                success: false,
                skipped_nested_save: false,
                record,
            }
        }
    }

    /// Locate an existing record via the update-lookup field, or
    /// instantiate a new one. Either way the scalar attributes come from
    /// every scalar field present in the column map.
    fn locate_or_create(&self, row: &ImportRow) -> Box<dyn Record> {
        let attrs: Vec<(&str, &str)> = self
            .schema
            .scalar_fields
            .iter()
            .filter_map(|field| {
                self.map
                    .single(field)
                    .map(|idx| (field.as_str(), row.get(idx)))
            })
            .collect();

        if let Some(update_field) = self.update_field {
            if let Some(idx) = self.map.single(update_field) {
                if let Some(mut existing) = self.model.find_by(update_field, row.get(idx)) {
                    for (field, value) in &attrs {
                        if *field != update_field {
                            existing.set_attribute(field, value);
                        }
                    }
                    return existing;
                }
            }
        }

        let mut record = self.model.new_record();
        for (field, value) in &attrs {
            record.set_attribute(field, value);
        }
        record
    }

    /// Point each mapped to-one relation at its resolved identity. An
    /// empty cell or an unknown label leaves the relation unset; that is
    /// not an error.
    fn apply_to_one(&self, record: &mut dyn Record, row: &ImportRow) {
        for field in &self.schema.to_one_fields {
            let Some(idx) = self.map.single(field) else {
                continue;
            };
            let cell = row.get(idx);
            if cell.is_empty() {
                continue;
            }
            if let Some(id) = self.lookups.resolve(field, cell) {
                record.set_to_one(field, id.clone());
            }
        }
    }

    /// Collect resolved identities across every mapped column of each
    /// to-many field. A non-empty list replaces the full collection;
    /// re-importing must resupply all associations or they are dropped.
    fn apply_to_many(&self, record: &mut dyn Record, row: &ImportRow) {
        for field in &self.schema.to_many_fields {
            let values: Vec<_> = self
                .map
                .many(field)
                .iter()
                .map(|&idx| row.get(idx))
                .filter(|cell| !cell.is_empty())
                .filter_map(|cell| self.lookups.resolve(field, cell))
                .cloned()
                .collect();

            if !values.is_empty() {
                record.replace_to_many(field, values);
            }
        }
    }

    /// Fetch and attach file-field resources, only on a new and currently
    /// valid record. Failures become validation errors on the record; the
    /// row continues either way.
    fn import_files(&self, record: &mut dyn Record, row: &ImportRow) {
        if !record.is_new() || !record.is_valid() {
            return;
        }

        for field in &self.schema.file_fields {
            let Some(idx) = self.map.single(field) else {
                continue;
            };
            let cell = row.get(idx);
            if cell.is_empty() {
                continue;
            }

            let location = WHITESPACE.replace_all(cell, "").into_owned();
            if let Err(e) = self.fetch_and_attach(record, field, &location) {
                record.add_error(&format!("Import error: {}", e));
            }
        }
    }

    fn fetch_and_attach(
        &self,
        record: &mut dyn Record,
        field: &str,
        location: &str,
    ) -> Result<(), String> {
        let extension = EXTENSION
            .find(location)
            .map(|m| m.as_str())
            .unwrap_or_default();
        let bytes = self.fetcher.fetch(location).map_err(|e| e.to_string())?;

        let slug = slugify(&record.display_label(&self.config.label_method));
        let staged = self.config.tmp_dir.join(format!("{}.{}", slug, extension));
        std::fs::write(&staged, &bytes).map_err(|e| e.to_string())?;

        record.attach_file(field, &staged);
        Ok(())
    }
}

/// Filesystem-safe slug of a label.
fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::record::memory::MemoryModel;
    use crate::record::RelationKind;
    use crate::schema::classify_fields;

    struct StubFetcher {
        fail: bool,
    }

    impl ResourceFetcher for StubFetcher {
        fn fetch(&self, _location: &str) -> Result<Vec<u8>, FetchError> {
            if self.fail {
                Err(FetchError::Request("connection refused".into()))
            } else {
                Ok(b"bytes".to_vec())
            }
        }
    }

    fn row(cells: &[&str]) -> ImportRow {
        ImportRow::new(cells.iter().map(|c| c.to_string()).collect())
    }

    fn header(cells: &[&str]) -> ImportRow {
        row(cells)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Fancy Widget"), "my-fancy-widget");
        assert_eq!(slugify("  A--B  "), "a-b");
    }

    #[test]
    fn test_unresolved_to_one_is_silent() {
        let category = MemoryModel::new("category", vec!["title".into()]);
        category.seed(&[("title", "Tools")]);
        let product = MemoryModel::new("product", vec!["name".into()]).with_relation(
            "category",
            RelationKind::BelongsTo,
            category,
        );

        let config = ImportConfig::new().with_relation_label("category", "title");
        let schema = classify_fields(&product, &config).unwrap();
        let map = ColumnMap::build(&header(&["name", "category"]), &schema.to_many_fields);
        let lookups =
            crate::import::resolver::preload_lookups(&product, &schema, &config).unwrap();

        let importer = RowImporter {
            model: &product,
            schema: &schema,
            map: &map,
            lookups: &lookups,
            config: &config,
            fetcher: &StubFetcher { fail: false },
            update_field: None,
        };

        let outcome = importer.import_row(&row(&["Widget", "Unknown"]), None, None);
        assert!(outcome.success);
        assert_eq!(outcome.message, "Created: Widget");
        assert!(product.records()[0].to_one.get("category").is_none());
    }

    #[test]
    fn test_to_many_collects_across_columns() {
        let tag = MemoryModel::new("tag", vec!["label".into()]);
        let red = tag.seed(&[("label", "red")]);
        let blue = tag.seed(&[("label", "blue")]);
        let product = MemoryModel::new("product", vec!["name".into()]).with_relation(
            "tag",
            RelationKind::HasMany,
            tag,
        );

        let config = ImportConfig::new().with_relation_label("tag", "label");
        let schema = classify_fields(&product, &config).unwrap();
        let map = ColumnMap::build(&header(&["name", "tag", "tag", "tag"]), &schema.to_many_fields);
        let lookups =
            crate::import::resolver::preload_lookups(&product, &schema, &config).unwrap();

        let importer = RowImporter {
            model: &product,
            schema: &schema,
            map: &map,
            lookups: &lookups,
            config: &config,
            fetcher: &StubFetcher { fail: false },
            update_field: None,
        };

        // One empty cell and one unknown label are skipped, not errors.
        let outcome = importer.import_row(&row(&["Widget", "red", "", "blue"]), None, None);
        assert!(outcome.success);
        assert_eq!(
            product.records()[0].to_many["tag"],
            vec![red.clone(), blue.clone()]
        );
    }

    #[test]
    fn test_fetch_failure_becomes_row_error() {
        let product = MemoryModel::new("product", vec!["name".into()]).with_file_field("photo");

        let config = ImportConfig::new();
        let schema = classify_fields(&product, &config).unwrap();
        let map = ColumnMap::build(&header(&["name", "photo"]), &schema.to_many_fields);
        let lookups = RelationLookup::default();

        let importer = RowImporter {
            model: &product,
            schema: &schema,
            map: &map,
            lookups: &lookups,
            config: &config,
            fetcher: &StubFetcher { fail: true },
            update_field: None,
        };

        let outcome = importer.import_row(
            &row(&["Widget", "http://example.com/p.png"]),
            None,
            None,
        );
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Errors before save: Widget"));
        assert!(outcome.message.contains("Import error"));
        assert_eq!(product.count(), 0);
    }

    #[test]
    fn test_file_attached_on_new_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let product = MemoryModel::new("product", vec!["name".into()]).with_file_field("photo");

        let config = ImportConfig::new().with_tmp_dir(dir.path());
        let schema = classify_fields(&product, &config).unwrap();
        let map = ColumnMap::build(&header(&["name", "photo"]), &schema.to_many_fields);
        let lookups = RelationLookup::default();

        let importer = RowImporter {
            model: &product,
            schema: &schema,
            map: &map,
            lookups: &lookups,
            config: &config,
            fetcher: &StubFetcher { fail: false },
            update_field: None,
        };

        // Whitespace in the cell is stripped before fetching.
        let outcome = importer.import_row(
            &row(&["Widget", " http://example.com/ photo.png "]),
            None,
            None,
        );
        assert!(outcome.success, "{}", outcome.message);

        let stored = &product.records()[0];
        let staged = &stored.files["photo"];
        assert_eq!(staged.file_name().unwrap().to_str().unwrap(), "widget.png");
        assert_eq!(std::fs::read(staged).unwrap(), b"bytes");
    }
}
