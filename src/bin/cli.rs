//! hsclient CLI Client
//!
//! Command-line interface for running operations against a server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use hsclient::index::IndexHandle;
use hsclient::operation::load_batch;
use hsclient::{Config, Field, Operation, OperationBuilder, ResponseRecord, Session};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// Token standing for NULL on the command line
const NULL_TOKEN: &str = "\\N";

/// hsclient CLI
#[derive(Parser, Debug)]
#[command(name = "hsclient-cli")]
#[command(about = "CLI for HandlerSocket servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "9998")]
    port: u16,

    /// I/O timeout in seconds
    #[arg(short, long, default_value = "600")]
    timeout: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    index: IndexArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Index every operation runs against
#[derive(ClapArgs, Debug)]
struct IndexArgs {
    /// Id to open the index under
    #[arg(long, default_value = "1")]
    id: i32,

    /// Database name
    #[arg(long)]
    db: String,

    /// Table name
    #[arg(long)]
    table: String,

    /// Index name
    #[arg(long, default_value = "PRIMARY")]
    index: String,

    /// Comma-separated fields to open
    #[arg(long, value_delimiter = ',', required = true)]
    fields: Vec<String>,
}

/// Match options shared by find/update/delete
#[derive(ClapArgs, Debug)]
struct MatchArgs {
    /// Comparison operator (=, >, >=, <, <=)
    #[arg(long, default_value = "=")]
    op: String,

    /// Maximum rows (0 = unbounded)
    #[arg(long, default_value = "0")]
    limit: u32,

    /// Rows to skip
    #[arg(long, default_value = "0")]
    skip: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find rows by key (use \N for NULL)
    Find {
        #[command(flatten)]
        matching: MatchArgs,

        /// Key values
        keys: Vec<String>,
    },

    /// Insert one row, values in field order
    Insert {
        /// Row values
        values: Vec<String>,
    },

    /// Overwrite the opened fields of matched rows
    Update {
        #[command(flatten)]
        matching: MatchArgs,

        /// Key values (repeatable)
        #[arg(long = "key", required = true)]
        keys: Vec<String>,

        /// New values in field order
        values: Vec<String>,
    },

    /// Delete matched rows
    Delete {
        #[command(flatten)]
        matching: MatchArgs,

        /// Key values
        keys: Vec<String>,
    },

    /// Pipeline every operation in a JSON batch file
    Batch {
        /// Path to a JSON array of operations
        file: PathBuf,
    },
}

fn to_fields(values: &[String]) -> Vec<Field> {
    values
        .iter()
        .map(|v| {
            if v == NULL_TOKEN {
                None
            } else {
                Some(v.as_bytes().to_vec())
            }
        })
        .collect()
}

fn build_operations(id: i32, command: &Commands) -> hsclient::Result<Vec<Operation>> {
    let operation = match command {
        Commands::Find { matching, keys } => OperationBuilder::find(id, &matching.op, to_fields(keys))
            .limit(matching.limit)
            .skip(matching.skip)
            .build()?,
        Commands::Insert { values } => OperationBuilder::insert(id, to_fields(values)).build()?,
        Commands::Update {
            matching,
            keys,
            values,
        } => OperationBuilder::update(id, &matching.op, to_fields(keys), to_fields(values))
            .limit(matching.limit)
            .skip(matching.skip)
            .build()?,
        Commands::Delete { matching, keys } => OperationBuilder::delete(id, &matching.op, to_fields(keys))
            .limit(matching.limit)
            .skip(matching.skip)
            .build()?,
        Commands::Batch { file } => return load_batch(file),
    };
    Ok(vec![operation])
}

/// Index handle and operations, both checked without touching the network
fn prepare(args: &Args) -> hsclient::Result<(IndexHandle, Vec<Operation>)> {
    let index = &args.index;
    let handle = IndexHandle::new(index.id, &index.db, &index.table, &index.index, &index.fields)?;
    let operations = build_operations(index.id, &args.command)?;
    Ok((handle, operations))
}

fn render_field(field: &Field) -> String {
    match field {
        Some(value) => String::from_utf8_lossy(value).into_owned(),
        None => NULL_TOKEN.to_string(),
    }
}

fn record_json(record: &ResponseRecord) -> Value {
    let rows: Vec<Vec<Value>> = record
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|f| match f {
                    Some(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    json!({
        "error_code": record.error_code,
        "error_message": record.error_message,
        "rows": rows,
    })
}

fn print_records(records: &[ResponseRecord], as_json: bool) {
    if as_json {
        let values: Vec<Value> = records.iter().map(record_json).collect();
        println!("{}", Value::Array(values));
        return;
    }

    for (i, record) in records.iter().enumerate() {
        if records.len() > 1 {
            println!("# operation {}", i + 1);
        }
        if record.is_success() {
            for row in &record.rows {
                let cells: Vec<String> = row.iter().map(render_field).collect();
                println!("{}", cells.join("\t"));
            }
        } else {
            eprintln!(
                "error {}: {}",
                record.error_code,
                record.error_message.as_deref().unwrap_or("")
            );
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Validate everything before connecting
    let (handle, operations) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    let index = &args.index;

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .timeout_secs(args.timeout)
        .build();

    let mut session = match Session::connect(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", config.address(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = session.open_handle(handle) {
        eprintln!("Failed to open index {}.{}.{}: {}", index.db, index.table, index.index, e);
        return ExitCode::FAILURE;
    }

    let records = match session.execute_batch(&operations) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    print_records(&records, args.json);
    session.close();

    if records.len() == operations.len() && records.iter().all(ResponseRecord::is_success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
