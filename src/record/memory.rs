//! Document-oriented in-memory backend.
//!
//! Records are schemaless attribute maps with uuid identities, optionally
//! validated against an embedded JSON Schema (draft 7) on save. The store
//! uses `Rc`/`RefCell` interior mutability: one import run is a single
//! blocking call on one thread, so no locking is needed.
//!
//! Clones of a [`MemoryModel`] share the underlying collection, which is
//! how the same model can serve both as a relation target inside another
//! model and as a handle for assertions or seeding.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

use super::{ModelMetadata, Record, RecordId, RelationDef, RelationKind};

/// Shared core of a model: name, validation schema and the persisted rows.
#[derive(Debug)]
struct ModelCore {
    name: String,
    schema: RefCell<Option<Value>>,
    rows: RefCell<Vec<StoredRecord>>,
}

/// A persisted row as the store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub attributes: BTreeMap<String, String>,
    pub to_one: BTreeMap<String, RecordId>,
    pub to_many: BTreeMap<String, Vec<RecordId>>,
    pub files: BTreeMap<String, PathBuf>,
}

/// An in-memory record type with its collection.
#[derive(Clone)]
pub struct MemoryModel {
    core: Rc<ModelCore>,
    attributes: Vec<String>,
    relations: Vec<RelationDef>,
    file_fields: Vec<String>,
    related: HashMap<String, MemoryModel>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            core: Rc::new(ModelCore {
                name: name.into(),
                schema: RefCell::new(None),
                rows: RefCell::new(Vec::new()),
            }),
            attributes,
            relations: Vec::new(),
            file_fields: Vec::new(),
            related: HashMap::new(),
        }
    }

    /// Declare a relation and register the related model under its field.
    pub fn with_relation(mut self, field: &str, kind: RelationKind, related: MemoryModel) -> Self {
        self.relations
            .push(RelationDef::new(field, kind, related.model_name()));
        self.related.insert(field.to_string(), related);
        self
    }

    /// Declare an attachment-capable field.
    pub fn with_file_field(mut self, field: &str) -> Self {
        self.file_fields.push(field.to_string());
        self
    }

    /// Validate attribute maps against this JSON Schema on save.
    pub fn with_schema(self, schema: Value) -> Self {
        *self.core.schema.borrow_mut() = Some(schema);
        self
    }

    /// Insert a persisted row directly, bypassing validation. Fixture setup.
    pub fn seed(&self, attrs: &[(&str, &str)]) -> RecordId {
        let id = RecordId::new(Uuid::new_v4().to_string());
        self.core.rows.borrow_mut().push(StoredRecord {
            id: id.clone(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            to_one: BTreeMap::new(),
            to_many: BTreeMap::new(),
            files: BTreeMap::new(),
        });
        id
    }

    /// Snapshot of the persisted collection.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.core.rows.borrow().clone()
    }

    /// Snapshot of one persisted row.
    pub fn record(&self, id: &RecordId) -> Option<StoredRecord> {
        self.core.rows.borrow().iter().find(|r| &r.id == id).cloned()
    }

    /// Number of persisted rows.
    pub fn count(&self) -> usize {
        self.core.rows.borrow().len()
    }
}

impl ModelMetadata for MemoryModel {
    fn model_name(&self) -> &str {
        &self.core.name
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.clone()
    }

    fn relations(&self) -> Vec<RelationDef> {
        self.relations.clone()
    }

    fn file_fields(&self) -> Vec<String> {
        self.file_fields.clone()
    }

    fn related_model(&self, field: &str) -> Option<&dyn ModelMetadata> {
        self.related.get(field).map(|m| m as &dyn ModelMetadata)
    }

    fn all_records(&self) -> Vec<Box<dyn Record>> {
        self.core
            .rows
            .borrow()
            .iter()
            .map(|stored| {
                Box::new(MemoryRecord::from_stored(self.core.clone(), stored)) as Box<dyn Record>
            })
            .collect()
    }

    fn new_record(&self) -> Box<dyn Record> {
        Box::new(MemoryRecord::new(self.core.clone()))
    }

    fn find_by(&self, field: &str, value: &str) -> Option<Box<dyn Record>> {
        self.core
            .rows
            .borrow()
            .iter()
            .find(|r| r.attributes.get(field).map(String::as_str) == Some(value))
            .map(|stored| {
                Box::new(MemoryRecord::from_stored(self.core.clone(), stored)) as Box<dyn Record>
            })
    }
}

/// One in-memory record instance.
pub struct MemoryRecord {
    core: Rc<ModelCore>,
    id: Option<RecordId>,
    attributes: BTreeMap<String, String>,
    to_one: BTreeMap<String, RecordId>,
    to_many: BTreeMap<String, Vec<RecordId>>,
    files: BTreeMap<String, PathBuf>,
    errors: Vec<String>,
}

impl MemoryRecord {
    fn new(core: Rc<ModelCore>) -> Self {
        Self {
            core,
            id: None,
            attributes: BTreeMap::new(),
            to_one: BTreeMap::new(),
            to_many: BTreeMap::new(),
            files: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    fn from_stored(core: Rc<ModelCore>, stored: &StoredRecord) -> Self {
        Self {
            core,
            id: Some(stored.id.clone()),
            attributes: stored.attributes.clone(),
            to_one: stored.to_one.clone(),
            to_many: stored.to_many.clone(),
            files: stored.files.clone(),
            errors: Vec::new(),
        }
    }

    fn to_stored(&self, id: RecordId) -> StoredRecord {
        StoredRecord {
            id,
            attributes: self.attributes.clone(),
            to_one: self.to_one.clone(),
            to_many: self.to_many.clone(),
            files: self.files.clone(),
        }
    }

    /// Validation messages from the model's JSON Schema, if one is set.
    fn schema_errors(&self) -> Vec<String> {
        let schema = self.core.schema.borrow();
        let Some(schema) = schema.as_ref() else {
            return Vec::new();
        };

        let attrs: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let data = Value::Object(attrs);

        let validator = match jsonschema::draft7::new(schema) {
            Ok(v) => v,
            Err(e) => return vec![format!("Invalid schema: {}", e)],
        };

        validator.iter_errors(&data).map(|e| e.to_string()).collect()
    }
}

impl Record for MemoryRecord {
    fn id(&self) -> Option<RecordId> {
        self.id.clone()
    }

    fn is_new(&self) -> bool {
        self.id.is_none()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn set_to_one(&mut self, field: &str, target: RecordId) {
        self.to_one.insert(field.to_string(), target);
    }

    fn replace_to_many(&mut self, field: &str, targets: Vec<RecordId>) {
        self.to_many.insert(field.to_string(), targets);
    }

    fn attach_file(&mut self, field: &str, path: &Path) {
        self.files.insert(field.to_string(), path.to_path_buf());
    }

    fn errors(&self) -> Vec<String> {
        self.errors.clone()
    }

    fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.schema_errors().is_empty()
    }

    fn save(&mut self) -> bool {
        let schema_errors = self.schema_errors();
        if !schema_errors.is_empty() {
            self.errors.extend(schema_errors);
            return false;
        }

        let mut rows = self.core.rows.borrow_mut();
        match &self.id {
            Some(id) => {
                let updated = self.to_stored(id.clone());
                match rows.iter_mut().find(|r| &r.id == id) {
                    Some(stored) => *stored = updated,
                    None => rows.push(updated),
                }
            }
            None => {
                let id = RecordId::new(Uuid::new_v4().to_string());
                rows.push(self.to_stored(id.clone()));
                self.id = Some(id);
            }
        }
        true
    }
}
