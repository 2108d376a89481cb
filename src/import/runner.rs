//! Import Orchestrator: drives a full import run.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌──────────────┐
//! │ raw file │───▶│  decode  │───▶│ ColumnMap │───▶│ row loop     │
//! │ (bytes)  │    │ (coerce) │    │ (header)  │    │ RowImporter  │
//! └──────────┘    └──────────┘    └───────────┘    └──────┬───────┘
//!                                                         ▼
//!                                             ┌──────────────────┐
//!                                             │ ImportReport     │
//!                                             │ (+ parent msg)   │
//!                                             └──────────────────┘
//! ```
//!
//! Preconditions short-circuit into a single-error report; data-level
//! problems are recorded per row. Nothing escapes `run` - the caller
//! always receives one [`ImportReport`].

use chrono::Local;
use csv::ReaderBuilder;
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::column_map::{ColumnMap, ImportRow};
use super::resolver::preload_lookups;
use super::row::{RowImporter, RowOutcome};
use crate::config::{ImportConfig, ImportParams};
use crate::fetch::ResourceFetcher;
use crate::logging::{log_error, log_info, log_success, log_warning, ImportLogger};
use crate::record::{ModelMetadata, Record};
use crate::schema::classify_fields;

/// Per-row success and failure log of one run.
///
/// Every processed data row contributes exactly one message to exactly one
/// list; a configured parent aggregate prepends zero or one more.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub successes: Vec<String>,
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Report for a run that aborted before touching any row.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            successes: Vec::new(),
            errors: vec![message.into()],
        }
    }

    /// Total number of messages.
    pub fn total(&self) -> usize {
        self.successes.len() + self.errors.len()
    }
}

/// Run a full import.
///
/// `source` is the raw upload; `None` expresses a missing file. The model,
/// fetcher and logger are the run's collaborators; configuration and
/// per-run parameters arrive separately.
pub fn run(
    source: Option<&[u8]>,
    model: &dyn ModelMetadata,
    config: &ImportConfig,
    params: &ImportParams,
    fetcher: &dyn ResourceFetcher,
    logger: &dyn ImportLogger,
) -> ImportReport {
    let Some(bytes) = source else {
        return ImportReport::failed("You must select a file.");
    };

    if config.logging {
        write_audit_copy(bytes, &config.audit_dir, logger);
    }

    let encoding = detect_encoding(bytes);
    let decoded = decode_bytes(bytes, &encoding);
    let text = decoded.strip_suffix('\n').unwrap_or(&decoded);
    log_info(logger, format!("Decoded upload as {}", encoding));

    // The ceiling counts physical records, header included. The file is
    // parsed twice, once to count and once to map - simplicity over
    // streaming.
    let total = count_records(text, config.delimiter);
    if total > config.line_item_limit {
        return ImportReport::failed(format!(
            "Please limit upload file to {} line items.",
            config.line_item_limit
        ));
    }

    let schema = match classify_fields(model, config) {
        Ok(schema) => schema,
        Err(e) => return ImportReport::failed(e.to_string()),
    };

    let mut records = reader(text, config.delimiter).into_records();
    let header = match records.next() {
        Some(Ok(record)) => ImportRow::from_record(&record),
        _ => return ImportReport::default(),
    };
    let map = ColumnMap::build(&header, &schema.to_many_fields);

    let update_field = if params.update_if_exists {
        params.update_lookup.clone()
    } else {
        None
    };
    if params.update_if_exists {
        let mapped = update_field
            .as_deref()
            .map(|field| map.contains(field))
            .unwrap_or(false);
        if !mapped {
            return ImportReport::failed(
                "Your file must contain a column for the 'Update lookup field' you selected.",
            );
        }
    }

    let lookups = match preload_lookups(model, &schema, config) {
        Ok(lookups) => lookups,
        Err(e) => return ImportReport::failed(e.to_string()),
    };
    if !lookups.is_empty() {
        log_success(
            logger,
            format!("Preloaded {} relation lookup table(s)", lookups.len()),
        );
    }

    let mut parent = config.create_parent.as_ref().map(|create| create());
    let mut children: Vec<Box<dyn Record>> = Vec::new();

    let importer = RowImporter {
        model,
        schema: &schema,
        map: &map,
        lookups: &lookups,
        config,
        fetcher,
        update_field: update_field.as_deref(),
    };

    let mut report = ImportReport::default();
    for result in records {
        let Ok(record) = result else { continue };
        let row = ImportRow::from_record(&record);

        let RowOutcome {
            message,
            success,
            skipped_nested_save: _,
            record,
        } = importer.import_row(&row, parent.as_deref(), params.actor.as_ref());

        if success {
            log_success(logger, message.as_str());
            report.successes.push(message);
        } else {
            log_error(logger, message.as_str());
            report.errors.push(message);
        }

        if parent.is_some() {
            children.push(record);
        }
    }

    if let Some(parent_record) = parent.as_deref_mut() {
        finish_parent(parent_record, children, &mut report, config, params, logger);
    }

    if let Some(hook) = &config.after_import {
        hook(&report);
    }

    report
}

/// Save the parent aggregate and link the collected children into it.
fn finish_parent(
    parent: &mut dyn Record,
    mut children: Vec<Box<dyn Record>>,
    report: &mut ImportReport,
    config: &ImportConfig,
    params: &ImportParams,
    logger: &dyn ImportLogger,
) {
    if let Some(hook) = &config.before_parent_save {
        hook(parent, params.actor.as_ref());
    }

    let label = parent.display_label(&config.label_method);
    if parent.save() {
        let message = format!("Saved: {}", label);
        log_success(logger, message.as_str());
        report.successes.insert(0, message);

        // Children skipped from independent persistence save through the
        // parent; they gain ids only now, so the nested link writes back
        // after the cascade.
        let mut ids = Vec::new();
        for child in children.iter_mut() {
            if child.is_new() {
                child.save();
            }
            if let Some(id) = child.id() {
                ids.push(id);
            }
        }
        if let Some(nested_field) = &config.nested_field {
            parent.replace_to_many(nested_field, ids);
            parent.save();
        }
    } else {
        let message = format!(
            "Failed to save {}. Errors: {}.",
            label,
            parent.errors().join(", ")
        );
        log_error(logger, message.as_str());
        report.errors.insert(0, message);
    }

    if let Some(hook) = &config.after_parent_save {
        hook(parent, params.actor.as_ref());
    }
}

// =============================================================================
// Source decoding
// =============================================================================

/// Detect the encoding of raw bytes, normalized to a canonical name.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let detected = chardet::detect(bytes).0;
    match detected.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to text, replacing undecodable sequences.
pub fn decode_bytes(bytes: &[u8], encoding: &str) -> String {
    match encoding {
        "iso-8859-1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes())
}

fn count_records(text: &str, delimiter: u8) -> usize {
    reader(text, delimiter)
        .into_records()
        .filter(|r| r.is_ok())
        .count()
}

/// Keep a timestamped copy of the raw upload. Failures are logged and
/// never abort the run.
fn write_audit_copy(bytes: &[u8], dir: &Path, logger: &dyn ImportLogger) {
    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let path = dir.join(format!("{}-import.csv", stamp));

    match fs::create_dir_all(dir).and_then(|_| fs::write(&path, bytes)) {
        Ok(()) => log_info(logger, format!("Audit copy written to {}", path.display())),
        Err(e) => log_warning(logger, format!("Could not write audit copy: {}", e)),
    }
}
