//! tether-serialize: Turn normalized records back into wire payloads
//!
//! Usage:
//!   # One normalized record (or an array of them) from a file
//!   tether-serialize --schema schema.json --type post record.json
//!
//!   # NDJSON from stdin, keep the primary key in the output
//!   cat posts.jsonl | tether-serialize -s schema.json -t post --ndjson --include-id

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Write};
use tether::{PayloadSerializer, SchemaRegistry, TetherConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tether-serialize")]
#[command(about = "Serialize normalized records into wire payloads", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Schema document describing entity types and their relationships
    #[arg(long, short = 's')]
    schema: String,

    /// Entity type of the records
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// Process newline-delimited JSON (one record per line)
    #[arg(long)]
    ndjson: bool,

    /// Emit the record's primary key
    #[arg(long)]
    include_id: bool,

    /// Suffix of polymorphic type-tag fields (default: "_type")
    #[arg(long)]
    type_key_suffix: Option<String>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = TetherConfig::default();
    config.include_id = args.include_id;
    if let Some(suffix) = args.type_key_suffix {
        config.type_key_suffix = suffix;
    }

    let schema = File::open(&args.schema)
        .with_context(|| format!("Failed to open schema: {}", args.schema))?;
    let registry = SchemaRegistry::from_reader(BufReader::new(schema))
        .context("Failed to load schema")?;
    let serializer = PayloadSerializer::new(registry, config);

    let reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(File::open(file_path)?))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let mut records = Vec::new();
    if args.ndjson {
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<Value>(line)?);
        }
    } else {
        match serde_json::from_reader::<_, Value>(reader).context("Failed to parse JSON")? {
            Value::Array(values) => records.extend(values),
            value => records.push(value),
        }
    }

    let mut stdout = std::io::stdout().lock();
    for value in records {
        let Value::Object(normalized) = value else {
            bail!("Expected a JSON object for each {} record", args.type_name);
        };
        let record = serializer.materialize(&args.type_name, &normalized)?;
        let wire = serializer.serialize_record(&record)?;

        let output = if args.compact || args.ndjson {
            serde_json::to_string(&wire)?
        } else {
            serde_json::to_string_pretty(&wire)?
        };
        writeln!(stdout, "{}", output)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
