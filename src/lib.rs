//! # Bulkload - generic CSV bulk import with relation resolution
//!
//! Bulkload turns a tabular upload into created or updated records of any
//! storage backend that implements its two collaborator traits, resolving
//! to-one and to-many relations by human-readable labels and reporting a
//! per-row success/failure log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌───────────────┐    ┌──────────────┐
//! │ CSV File │───▶│  Decode   │───▶│  Column Map   │───▶│ Row Importer │
//! │ (bytes)  │    │ (coerced) │    │ (header → ix) │    │ (per row)    │
//! └──────────┘    └───────────┘    └───────────────┘    └──────┬───────┘
//!                       ▲                                      ▼
//!              ┌────────┴────────┐                   ┌──────────────────┐
//!              │ Schema Inspector│                   │   ImportReport   │
//!              │ Relation Lookups│                   │ (successes/errs) │
//!              └─────────────────┘                   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use bulkload::{run, HttpFetcher, ImportConfig, ImportParams, StdoutLogger};
//! use bulkload::record::memory::MemoryModel;
//! use bulkload::record::RelationKind;
//!
//! let category = MemoryModel::new("category", vec!["title".into()]);
//! category.seed(&[("title", "Tools")]);
//! let product = MemoryModel::new("product", vec!["name".into()])
//!     .with_relation("category", RelationKind::BelongsTo, category);
//!
//! let config = ImportConfig::new().with_relation_label("category", "title");
//! let fetcher = HttpFetcher::new().unwrap();
//! let report = run(
//!     Some(b"name,category\nWidget,Tools"),
//!     &product,
//!     &config,
//!     &ImportParams::new(),
//!     &fetcher,
//!     &StdoutLogger,
//! );
//! assert_eq!(report.successes, vec!["Created: Widget".to_string()]);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - error taxonomy
//! - [`config`] - import configuration, hooks and per-run parameters
//! - [`logging`] - injected run logger
//! - [`record`] - storage collaborator traits and the in-memory backend
//! - [`schema`] - importable field classification
//! - [`import`] - column mapping, relation resolution, row import, runner
//! - [`fetch`] - resource fetching for file fields

// Core modules
pub mod config;
pub mod error;

// Collaborators
pub mod fetch;
pub mod logging;
pub mod record;

// Classification
pub mod schema;

// Pipeline
pub mod import;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConfigError, ConfigResult, FetchError, FetchResult};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ActorContext, ImportConfig, ImportParams};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logging::{
    log_error, log_info, log_success, log_warning, ImportLogger, LogEntry, LogLevel, NullLogger,
    StdoutLogger,
};

// =============================================================================
// Re-exports - Records
// =============================================================================

pub use record::{ModelMetadata, Record, RecordId, RelationDef, RelationKind};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{classify_fields, ImportableSchema};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use import::{
    preload_lookups, run, ColumnMap, ImportReport, ImportRow, RelationLookup, RowImporter,
    RowOutcome,
};

// =============================================================================
// Re-exports - Fetching
// =============================================================================

pub use fetch::{HttpFetcher, ResourceFetcher};
