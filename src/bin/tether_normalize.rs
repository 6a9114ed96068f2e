//! tether-normalize: Flatten REST payloads into a normalized entity graph
//!
//! Usage:
//!   # Read a payload from a file, write tagged records to stdout
//!   tether-normalize --schema schema.json --type post post.json
//!
//!   # Read a paginated envelope from stdin
//!   curl -s https://api.example.com/posts/?page=2 | tether-normalize -s schema.json -t post
//!
//!   # Process NDJSON, one .jsonl file per entity type
//!   tether-normalize -s schema.json -t post --ndjson posts.jsonl --output-dir ./entities

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use tether::writer::{EntityWriter, SingleWriter};
use tether::{
    is_envelope, normalize_json, GraphStore, MemoryStore, PayloadSerializer, SchemaRegistry,
    TetherConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tether-normalize")]
#[command(about = "Flatten REST payloads into a normalized entity graph", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Schema document describing entity types and their relationships
    #[arg(long, short = 's')]
    schema: String,

    /// Entity type of the top-level payload
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// Process newline-delimited JSON (one payload per line)
    #[arg(long)]
    ndjson: bool,

    /// Output directory for separate .jsonl files per entity type
    /// If omitted, writes to stdout as a single stream with entity metadata
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Maximum depth of embedded data to fold into the graph (default: 10)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Suffix of polymorphic type-tag fields (default: "_type")
    #[arg(long)]
    type_key_suffix: Option<String>,

    /// Field holding the type tag inside embedded polymorphic data (default: "type")
    #[arg(long)]
    embedded_type_key: Option<String>,

    /// Log extraction decisions to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Build config
    let mut config = TetherConfig::default();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    if let Some(suffix) = args.type_key_suffix {
        config.type_key_suffix = suffix;
    }
    if let Some(key) = args.embedded_type_key {
        config.embedded_type_key = key;
    }

    let schema = File::open(&args.schema)
        .with_context(|| format!("Failed to open schema: {}", args.schema))?;
    let registry = SchemaRegistry::from_reader(BufReader::new(schema))
        .context("Failed to load schema")?;

    let mut store = MemoryStore::new(&registry);
    let serializer = PayloadSerializer::new(registry, config);
    let root_type = store.resolve_type(&args.type_name)?;

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let (records, meta) = if args.ndjson {
        let records = normalize_json(BufReader::new(reader), &serializer, &mut store, &root_type)?;
        let meta = store.meta_for_type(&root_type).cloned();
        (records, meta)
    } else {
        let payload = read_document(reader)?;
        let meta = serializer.extract_meta(&mut store, &root_type, &payload)?;
        let records = if payload.is_object() && !is_envelope(&payload) {
            vec![serializer.normalize_single(&mut store, &root_type, payload)?]
        } else {
            serializer.normalize_collection(&mut store, &root_type, payload)?
        };
        (records, meta)
    };

    let root_count = records.len();
    store.upsert_many(&root_type, records)?;
    tracing::info!(roots = root_count, entities = store.len(), "normalized");

    let meta = meta.map(serde_json::to_value).transpose()?;

    if let Some(output_dir) = args.output_dir {
        let mut writer = EntityWriter::new_file_writer(&output_dir)?;
        writer.write_records(store.entities())?;
        writer.flush()?;

        if let Some(meta) = meta {
            let path = std::path::Path::new(&output_dir).join("_meta.json");
            std::fs::write(&path, serde_json::to_string_pretty(&meta)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    } else {
        let mut writer = SingleWriter::new(std::io::stdout().lock());
        writer.write_records(store.entities())?;
        if let Some(meta) = meta {
            writer.write_value(&json!({ "_meta": meta, "_entity_type": root_type }))?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Read one JSON document using SIMD-accelerated parsing when possible
fn read_document(reader: Box<dyn Read>) -> Result<Value> {
    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_end(&mut content)?;

    // simd-json parses in place, keep the original bytes for the fallback
    let mut scratch = content.clone();
    match simd_json::to_owned_value(&mut scratch) {
        Ok(value) => {
            let json_str = simd_json::to_string(&value)?;
            Ok(serde_json::from_str(&json_str)?)
        }
        Err(_) => {
            let value: Value = serde_json::from_slice(&content).context("Failed to parse JSON")?;
            Ok(value)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
