//! Import configuration and per-run caller parameters.
//!
//! Hooks are explicit function-typed fields with fixed signatures rather
//! than open-ended variadic callbacks: each one receives the record, the
//! raw row, the column map, and - where relevant - the parent aggregate
//! and the actor context.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::import::column_map::{ColumnMap, ImportRow};
use crate::import::runner::ImportReport;
use crate::record::Record;

/// Who triggered the run, forwarded to hooks verbatim.
#[derive(Debug, Clone, Default)]
pub struct ActorContext {
    pub role: Option<String>,
    pub user: Option<String>,
}

/// Global pre-save hook. Returning `false` while a parent aggregate is
/// configured marks the row as a skipped nested save.
pub type BeforeImportSaveHook = Box<
    dyn Fn(&mut dyn Record, &ImportRow, &ColumnMap, Option<&dyn Record>, Option<&ActorContext>) -> bool,
>;

/// Hook around the parent aggregate's save.
pub type ParentSaveHook = Box<dyn Fn(&mut dyn Record, Option<&ActorContext>)>;

/// Post-run hook; the return value is discarded.
pub type AfterImportHook = Box<dyn Fn(&ImportReport)>;

/// Factory for the optional parent aggregate.
pub type CreateParent = Box<dyn Fn() -> Box<dyn Record>>;

/// Declared configuration of an import target.
pub struct ImportConfig {
    /// Exact scalar field list; overrides attribute auto-detection.
    pub included_fields: Vec<String>,
    /// Fields never imported.
    pub excluded_fields: Vec<String>,
    /// Attribute used as the record's label in report messages.
    pub label_method: String,
    /// Per relation field, the related attribute used as lookup key.
    pub relation_label_accessors: HashMap<String, String>,
    /// Factory for the parent aggregate, when rows nest under one.
    pub create_parent: Option<CreateParent>,
    /// Collection field on the parent that children link into.
    pub nested_field: Option<String>,
    pub before_import_save: Option<BeforeImportSaveHook>,
    pub before_parent_save: Option<ParentSaveHook>,
    pub after_parent_save: Option<ParentSaveHook>,
    pub after_import: Option<AfterImportHook>,
    /// Ceiling on physical CSV records per upload, header included.
    pub line_item_limit: usize,
    /// Keep a timestamped audit copy of each raw upload.
    pub logging: bool,
    /// Where audit copies go.
    pub audit_dir: PathBuf,
    /// Where fetched file-field resources are staged before attachment.
    pub tmp_dir: PathBuf,
    /// CSV delimiter. Explicit: dialect auto-detection is out of scope.
    pub delimiter: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            included_fields: Vec::new(),
            excluded_fields: Vec::new(),
            label_method: "name".to_string(),
            relation_label_accessors: HashMap::new(),
            create_parent: None,
            nested_field: None,
            before_import_save: None,
            before_parent_save: None,
            after_parent_save: None,
            after_import: None,
            line_item_limit: 1000,
            logging: false,
            audit_dir: PathBuf::from("log/import"),
            tmp_dir: std::env::temp_dir(),
            delimiter: b',',
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_included_fields(mut self, fields: Vec<String>) -> Self {
        self.included_fields = fields;
        self
    }

    pub fn with_excluded_fields(mut self, fields: Vec<String>) -> Self {
        self.excluded_fields = fields;
        self
    }

    pub fn with_label_method(mut self, label_method: &str) -> Self {
        self.label_method = label_method.to_string();
        self
    }

    /// Configure the lookup-key attribute for one relation field.
    pub fn with_relation_label(mut self, field: &str, accessor: &str) -> Self {
        self.relation_label_accessors
            .insert(field.to_string(), accessor.to_string());
        self
    }

    /// Nest imported records under a parent aggregate.
    pub fn with_parent(mut self, nested_field: &str, create: CreateParent) -> Self {
        self.nested_field = Some(nested_field.to_string());
        self.create_parent = Some(create);
        self
    }

    pub fn with_before_import_save(mut self, hook: BeforeImportSaveHook) -> Self {
        self.before_import_save = Some(hook);
        self
    }

    pub fn with_before_parent_save(mut self, hook: ParentSaveHook) -> Self {
        self.before_parent_save = Some(hook);
        self
    }

    pub fn with_after_parent_save(mut self, hook: ParentSaveHook) -> Self {
        self.after_parent_save = Some(hook);
        self
    }

    pub fn with_after_import(mut self, hook: AfterImportHook) -> Self {
        self.after_import = Some(hook);
        self
    }

    pub fn with_line_item_limit(mut self, limit: usize) -> Self {
        self.line_item_limit = limit;
        self
    }

    /// Enable audit copies under `audit_dir`.
    pub fn with_logging(mut self, audit_dir: impl Into<PathBuf>) -> Self {
        self.logging = true;
        self.audit_dir = audit_dir.into();
        self
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Per-run parameters supplied by the caller alongside the upload.
#[derive(Debug, Clone, Default)]
pub struct ImportParams {
    /// Update existing records instead of always creating.
    pub update_if_exists: bool,
    /// Field used to locate the existing record in update mode.
    pub update_lookup: Option<String>,
    pub actor: Option<ActorContext>,
}

impl ImportParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable update mode keyed on `field`.
    pub fn update_existing_by(mut self, field: &str) -> Self {
        self.update_if_exists = true;
        self.update_lookup = Some(field.to_string());
        self
    }

    pub fn with_actor(mut self, actor: ActorContext) -> Self {
        self.actor = Some(actor);
        self
    }
}
