//! Bulkload CLI - run CSV imports against a JSON-declared model
//!
//! # Commands
//!
//! ```bash
//! bulkload import model.json data.csv   # Run an import, print the report
//! bulkload fields model.json            # Show the field classification
//! bulkload template model.json          # Emit a CSV header template
//! ```
//!
//! The model file declares an in-memory record type: attributes, relations
//! (each with its own nested model and label accessor), file fields, an
//! optional JSON Schema for validation, and seed records for relation
//! targets:
//!
//! ```json
//! {
//!   "name": "product",
//!   "attributes": ["name", "price"],
//!   "relations": [
//!     {
//!       "field": "category",
//!       "kind": "belongs_to",
//!       "label": "title",
//!       "model": {
//!         "name": "category",
//!         "attributes": ["title"],
//!         "records": [{ "title": "Tools" }]
//!       }
//!     }
//!   ]
//! }
//! ```

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bulkload::record::memory::MemoryModel;
use bulkload::record::RelationKind;
use bulkload::{classify_fields, run, HttpFetcher, ImportConfig, ImportParams, StdoutLogger};

#[derive(Parser)]
#[command(name = "bulkload")]
#[command(about = "Generic CSV bulk import with relation resolution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV file into the declared model
    Import {
        /// Model declaration file (JSON)
        model: PathBuf,

        /// Input CSV file
        input: PathBuf,

        /// Update existing records matched by this field
        #[arg(short, long)]
        update_lookup: Option<String>,

        /// Attribute used as the record label in messages
        #[arg(short, long, default_value = "name")]
        label: String,

        /// Maximum physical CSV records per upload, header included
        #[arg(long, default_value = "1000")]
        limit: usize,

        /// CSV delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Keep a timestamped audit copy of the upload in this directory
        #[arg(long)]
        audit_dir: Option<PathBuf>,

        /// Write the report as JSON (default: human-readable to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the importable field classification of a model
    Fields {
        /// Model declaration file (JSON)
        model: PathBuf,
    },

    /// Emit a CSV header template for a model
    Template {
        /// Model declaration file (JSON)
        model: PathBuf,

        /// CSV delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Declaration of an in-memory model, possibly nesting relation targets.
#[derive(Debug, Deserialize)]
struct ModelSpec {
    name: String,
    #[serde(default)]
    attributes: Vec<String>,
    #[serde(default)]
    relations: Vec<RelationSpec>,
    #[serde(default)]
    file_fields: Vec<String>,
    #[serde(default)]
    schema: Option<Value>,
    #[serde(default)]
    records: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RelationSpec {
    field: String,
    kind: RelationKind,
    /// Attribute on the related model used as the lookup key.
    label: String,
    model: ModelSpec,
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            model,
            input,
            update_lookup,
            label,
            limit,
            delimiter,
            audit_dir,
            output,
        } => cmd_import(
            &model,
            &input,
            update_lookup.as_deref(),
            &label,
            limit,
            delimiter,
            audit_dir.as_deref(),
            output.as_deref(),
        ),

        Commands::Fields { model } => cmd_fields(&model),

        Commands::Template {
            model,
            delimiter,
            output,
        } => cmd_template(&model, delimiter, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_model_spec(path: &Path) -> Result<ModelSpec, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let spec: ModelSpec = serde_json::from_str(&content)?;
    Ok(spec)
}

/// Build the memory model declared by a spec, seeding its records.
fn build_model(spec: &ModelSpec) -> MemoryModel {
    let mut model = MemoryModel::new(&spec.name, spec.attributes.clone());

    for field in &spec.file_fields {
        model = model.with_file_field(field);
    }
    if let Some(schema) = &spec.schema {
        model = model.with_schema(schema.clone());
    }
    for relation in &spec.relations {
        let related = build_model(&relation.model);
        model = model.with_relation(&relation.field, relation.kind, related);
    }

    for row in &spec.records {
        let attrs: Vec<(&str, &str)> = row
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        model.seed(&attrs);
    }

    model
}

fn delimiter_byte(delimiter: char) -> Result<u8, Box<dyn std::error::Error>> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(format!("Delimiter must be a single ASCII character, got '{}'", delimiter).into())
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_import(
    model_path: &Path,
    input: &Path,
    update_lookup: Option<&str>,
    label: &str,
    limit: usize,
    delimiter: char,
    audit_dir: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());

    let spec = load_model_spec(model_path)?;
    let model = build_model(&spec);

    let mut config = ImportConfig::new()
        .with_label_method(label)
        .with_line_item_limit(limit)
        .with_delimiter(delimiter_byte(delimiter)?);
    for relation in &spec.relations {
        config = config.with_relation_label(&relation.field, &relation.label);
    }
    if let Some(dir) = audit_dir {
        config = config.with_logging(dir);
    }

    let mut params = ImportParams::new();
    if let Some(field) = update_lookup {
        params = params.update_existing_by(field);
    }

    let bytes = fs::read(input)?;
    let fetcher = HttpFetcher::new()?;
    let report = run(
        Some(&bytes),
        &model,
        &config,
        &params,
        &fetcher,
        &StdoutLogger,
    );

    eprintln!();
    eprintln!(
        "📊 Results: {} succeeded, {} failed",
        report.successes.len(),
        report.errors.len()
    );
    for message in report.errors.iter().take(5) {
        eprintln!("   ❌ {}", message);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        write_output(&json, Some(path))?;
    }

    if !report.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_fields(model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let spec = load_model_spec(model_path)?;
    let model = build_model(&spec);

    let schema = classify_fields(&model, &ImportConfig::new())?;

    println!("Model: {}", spec.name);
    println!("  Scalar:   {}", schema.scalar_fields.join(", "));
    println!("  To-one:   {}", schema.to_one_fields.join(", "));
    println!("  To-many:  {}", schema.to_many_fields.join(", "));
    println!("  File:     {}", schema.file_fields.join(", "));
    println!("  Excluded: {}", schema.excluded_fields.join(", "));
    Ok(())
}

fn cmd_template(
    model_path: &Path,
    delimiter: char,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = load_model_spec(model_path)?;
    let model = build_model(&spec);

    let schema = classify_fields(&model, &ImportConfig::new())?;

    let mut headers = schema.scalar_fields.clone();
    headers.extend(schema.to_one_fields.clone());
    headers.extend(schema.to_many_fields.clone());
    headers.extend(schema.file_fields.clone());

    let line = headers.join(&delimiter.to_string());
    write_output(&line, output)?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
