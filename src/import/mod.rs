//! Import pipeline.
//!
//! - Column map: header row to field positions
//! - Resolver: preloaded relation lookup tables
//! - Row: one row to one created or updated record
//! - Runner: the full orchestrated run

pub mod column_map;
pub mod resolver;
pub mod row;
pub mod runner;

pub use column_map::{ColumnIndex, ColumnMap, ImportRow};
pub use resolver::{preload_lookups, LookupTable, RelationLookup};
pub use row::{RowImporter, RowOutcome};
pub use runner::{run, ImportReport};
