//! litetable CLI
//!
//! Command-line interface for reading and writing rows.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use litetable_client::protocol::{
    CreateFamilyRequest, DeleteRequest, ReadRequest, Selector, WriteRequest,
};
use litetable_client::{Client, ClientConfig, ReadResult, ResultSet, RowStore};
use tracing_subscriber::{fmt, EnvFilter};

/// litetable CLI
#[derive(Parser, Debug)]
#[command(name = "litetable-cli")]
#[command(about = "CLI for the litetable column-family store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9443")]
    server: String,

    /// PEM certificate of the server; enables TLS
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Name on the server certificate
    #[arg(long, default_value = "localhost")]
    server_name: String,

    /// Overall response timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Hard ceiling on one response in milliseconds (defaults to three times --timeout-ms)
    #[arg(long)]
    max_total_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read rows by key, key prefix or regex
    Read {
        /// Row key to read
        #[arg(short, long)]
        key: Option<String>,

        /// Read all row keys with this prefix
        #[arg(short = 'p', long = "keyPrefix")]
        key_prefix: Option<String>,

        /// Read all row keys matching this pattern
        #[arg(short, long)]
        regex: Option<String>,

        /// Column family to read
        #[arg(short, long)]
        family: String,

        /// Qualifiers to read (can be specified multiple times)
        #[arg(short, long)]
        qualifier: Vec<String>,

        /// Number of latest versions to return
        #[arg(short, long, default_value = "0")]
        latest: u32,
    },

    /// Write qualifier/value pairs
    Write {
        /// Row key
        #[arg(short, long)]
        key: String,

        /// Column family
        #[arg(short, long)]
        family: String,

        /// Qualifier (can be specified multiple times)
        #[arg(short, long)]
        qualifier: Vec<String>,

        /// Value for the qualifier at the same position
        #[arg(short, long)]
        value: Vec<String>,

        /// Time to live in seconds (0 means no expiration)
        #[arg(short, long, default_value = "0")]
        ttl: u64,
    },

    /// Delete a row, family or qualifiers
    Delete {
        /// Row key to delete
        #[arg(short, long)]
        key: String,

        /// Column family to delete
        #[arg(short, long)]
        family: Option<String>,

        /// Qualifiers to delete (can be specified multiple times)
        #[arg(short, long)]
        qualifier: Vec<String>,

        /// Time-to-live in seconds for tombstone entries
        #[arg(long, default_value = "0")]
        ttl: u64,

        /// Only delete versions from this timestamp on
        #[arg(long)]
        from: Option<i64>,
    },

    /// Create column families
    Create {
        /// Column families to create (comma-separated)
        #[arg(short, long)]
        family: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,litetable_client=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = ClientConfig::builder()
        .endpoint(&args.server)
        .server_name(&args.server_name)
        .response_timeout_ms(args.timeout_ms)
        .max_total_timeout_ms(args.max_total_ms.unwrap_or(args.timeout_ms.saturating_mul(3)));
    if let Some(cert) = &args.cert {
        builder = builder.trust_cert(cert);
    }
    let config = builder.build();

    if let Err(e) = connect_and_run(&config, args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn connect_and_run(config: &ClientConfig, command: Commands) -> litetable_client::Result<()> {
    if config.trust_cert.is_some() {
        #[cfg(feature = "tls")]
        {
            let mut client = Client::tls(config)?;
            return run(&mut client, command);
        }
        #[cfg(not(feature = "tls"))]
        {
            return Err(litetable_client::ClientError::Config(
                "built without TLS support; rebuild with --features tls".to_string(),
            ));
        }
    }

    let mut client = Client::tcp(config)?;
    run(&mut client, command)
}

fn run(store: &mut impl RowStore, command: Commands) -> litetable_client::Result<()> {
    let started = Instant::now();

    match command {
        Commands::Read {
            key,
            key_prefix,
            regex,
            family,
            qualifier,
            latest,
        } => {
            let selector = Selector::from_flags(key.as_deref(), key_prefix.as_deref(), regex.as_deref())?;
            let mut request = ReadRequest::new(selector).family(family);
            request.qualifiers = qualifier;
            if latest > 0 {
                request = request.latest(latest);
            }

            match store.read(&request)? {
                ReadResult::NotFound => println!("row not found"),
                result => {
                    print_rows(result.rows());
                    println!("Row results: {}", result.len());
                }
            }
        }

        Commands::Write {
            key,
            family,
            qualifier,
            value,
            ttl,
        } => {
            let mut request = WriteRequest::from_pairs(key, family, &qualifier, &value)?;
            if ttl > 0 {
                request = request.ttl(ttl);
            }
            let rows = store.write(&request)?;
            print_result_set(&rows);
        }

        Commands::Delete {
            key,
            family,
            qualifier,
            ttl,
            from,
        } => {
            let mut request = DeleteRequest::new(key);
            request.family = family;
            request.qualifiers = qualifier;
            request.from = from.filter(|f| *f > 0);
            if ttl > 0 {
                request = request.ttl(ttl);
            }
            store.delete(&request)?;
            println!("Delete successful");
        }

        Commands::Create { family } => {
            let request = CreateFamilyRequest::parse(&family)?;
            store.create_families(&request)?;
            println!("Created families: {}", request.families.join(", "));
        }
    }

    println!("Query duration: {:?}", started.elapsed());
    Ok(())
}

fn print_rows<'a>(rows: impl Iterator<Item = &'a litetable_client::Row>) {
    for (i, row) in rows.enumerate() {
        if i > 0 {
            println!("--------------------");
            println!();
        }
        println!("{}", row);
    }
}

fn print_result_set(rows: &ResultSet) {
    print_rows(rows.values());
    println!("Row results: {}", rows.len());
}
