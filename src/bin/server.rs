//! hsclient Loopback Server Binary
//!
//! Serves the wire protocol from in-memory tables, for trying the client
//! without a database.

use clap::Parser;
use hsclient::memory::MemoryServer;
use hsclient::network::Server;
use hsclient::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// hsclient loopback server
#[derive(Parser, Debug)]
#[command(name = "hsclient-server")]
#[command(about = "In-memory HandlerSocket-compatible server for local testing")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9998")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Idle connection timeout in seconds
    #[arg(short, long, default_value = "600")]
    timeout: u64,

    /// Tables to create, as db.table:col1,col2,... (first column is the primary key)
    #[arg(long = "table", value_name = "SPEC")]
    tables: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hsclient=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("hsclient-server v{}", hsclient::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let backend = MemoryServer::new();
    for spec in &args.tables {
        if let Err(e) = create_table(&backend, spec) {
            tracing::error!("Bad --table {:?}: {}", spec, e);
            std::process::exit(2);
        }
        tracing::info!("Created table {}", spec);
    }

    let config = Config::builder()
        .max_connections(args.max_connections)
        .timeout_secs(args.timeout)
        .build();

    let mut server = Server::new(config, backend);
    if let Err(e) = server.bind(args.listen.as_str()) {
        tracing::error!("Failed to bind {}: {}", args.listen, e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Parse `db.table:col1,col2,...` and create the table
fn create_table(backend: &MemoryServer, spec: &str) -> hsclient::Result<()> {
    let invalid = || hsclient::HsError::InvalidArgument(format!("expected db.table:cols, got {:?}", spec));

    let (name, columns) = spec.split_once(':').ok_or_else(invalid)?;
    let (database, table) = name.split_once('.').ok_or_else(invalid)?;
    let columns: Vec<&str> = columns.split(',').filter(|c| !c.is_empty()).collect();
    let primary = columns.first().copied().ok_or_else(invalid)?;

    backend.create_table(database, table, &columns[..], &[primary])
}
