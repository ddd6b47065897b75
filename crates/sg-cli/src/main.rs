mod dial;
mod hardware;
mod listener;
mod subspace;

use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use sg_core::{DialAddress, GateEntry, ParseAddressError, STATUS_IDLE, SubspaceMessage};
use sg_store::{BookStore, GateConfig};

use crate::dial::GateOptions;
use crate::subspace::SubspaceClient;

#[derive(Parser)]
#[command(name = "sg", about = "Stargate dialing controller and subspace CLI")]
struct Cli {
    /// Override the data directory (default ~/.stargate)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gate: dialer input, subspace listener, wormhole engine
    Dial {
        /// Override the configured subspace port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the subspace listener without a dialer (receive-only gate)
    Serve {
        /// Override the configured subspace port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask a remote gate whether its wormhole is active
    Status {
        /// Gate name from the address book, or a literal IP
        gate: String,

        /// Override the configured subspace port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage the address book of known fan gates
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
}

#[derive(Subcommand)]
enum BookCommands {
    /// List every known gate
    List,

    /// Add or replace a gate entry
    Add {
        name: String,

        /// Dial address as glyph numbers, e.g. "[7, 32, 27]" or "7,32,27"
        address: String,

        /// The gate's subspace IP
        ip: String,
    },

    /// Remove a gate entry
    Remove { name: String },

    /// Export the book as JSON
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import gates from a JSON export
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn base_dir(cli: &Cli) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| std::env::var("SG_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(sg_store::default_base_dir)
}

fn open_store(cli: &Cli) -> Result<BookStore> {
    let dir = base_dir(cli);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    BookStore::open(&dir.join("gates.sqlite")).context("failed to open the address book")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Dial { port } => cmd_gate(&cli, *port, true).await,
        Commands::Serve { port } => cmd_gate(&cli, *port, false).await,
        Commands::Status { gate, port } => cmd_status(&cli, gate, *port).await,
        Commands::Book { command } => cmd_book(&cli, command),
    }
}

// ---------------------------------------------------------------------------
// Advisory pidfile for observability
// ---------------------------------------------------------------------------

fn pidfile_path(dir: &Path) -> PathBuf {
    dir.join("gate.pid")
}

/// Check for an existing pidfile and log accordingly, then write our own.
fn acquire_pidfile(dir: &Path) -> Option<PathBuf> {
    let path = pidfile_path(dir);
    if let Ok(content) = std::fs::read_to_string(&path)
        && let Ok(pid) = content.trim().parse::<u32>()
    {
        if is_process_alive(pid) {
            tracing::warn!("another gate (PID {pid}) is running on this data dir");
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = std::fs::remove_file(&path);
        }
    }

    match std::fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &Path) {
    let _ = std::fs::remove_file(path);
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false // conservative: assume dead on non-unix
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_gate(cli: &Cli, port_override: Option<u16>, with_keyboard: bool) -> Result<()> {
    let dir = base_dir(cli);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let config = GateConfig::load(&dir).context("failed to load config")?;

    let store = open_store(cli)?;
    let book = store.load_book().context("failed to load the address book")?;
    tracing::info!("address book holds {} fan gates", book.len());

    let pidfile = acquire_pidfile(&dir);

    let result = dial::run_gate(
        book,
        GateOptions {
            bind: config.bind.clone(),
            port: port_override.unwrap_or(config.subspace_port),
            timeout: config.timeout(),
            with_keyboard,
        },
    )
    .await;

    if let Some(path) = pidfile {
        release_pidfile(&path);
    }
    result
}

async fn cmd_status(cli: &Cli, gate: &str, port_override: Option<u16>) -> Result<()> {
    let dir = base_dir(cli);
    let config = GateConfig::load(&dir).context("failed to load config")?;
    let store = open_store(cli)?;
    let book = store.load_book().context("failed to load the address book")?;

    let ip: IpAddr = match book.find(gate) {
        Some(entry) => entry.ip,
        None => gate
            .parse()
            .map_err(|_| anyhow!("no gate named {gate:?} in the book, and not an ip"))?,
    };

    let client = SubspaceClient::new(
        port_override.unwrap_or(config.subspace_port),
        config.timeout(),
    );
    let delivery = client.send(ip, &SubspaceMessage::StatusQuery).await;

    let name = book.resolve_name(ip);
    match &delivery.reply {
        Some(reply) => println!("{name} ({ip}) replied: {reply}"),
        None => println!("{name} ({ip}) is unreachable"),
    }
    // Same interpretation as the dialer uses: only a literal "False"
    // reads as no wormhole.
    let active = delivery.reply.as_deref() != Some(STATUS_IDLE);
    println!("wormhole active: {active}");
    Ok(())
}

fn cmd_book(cli: &Cli, command: &BookCommands) -> Result<()> {
    let store = open_store(cli)?;
    match command {
        BookCommands::List => {
            let book = store.load_book()?;
            if book.is_empty() {
                println!("(address book is empty)");
                return Ok(());
            }
            for entry in book.entries() {
                println!(
                    "{:<16} {:<28} {}",
                    entry.name,
                    entry.address.to_string(),
                    entry.ip
                );
            }
            Ok(())
        }
        BookCommands::Add { name, address, ip } => {
            let entry = GateEntry {
                name: name.clone(),
                address: parse_address_arg(address)?,
                ip: ip
                    .parse()
                    .map_err(|_| anyhow!("not an ip address: {ip:?}"))?,
            };
            store.upsert_gate(&entry)?;
            println!("added {} -> {} ({})", entry.name, entry.address, entry.ip);
            Ok(())
        }
        BookCommands::Remove { name } => {
            if store.remove_gate(name)? {
                println!("removed {name}");
                Ok(())
            } else {
                Err(anyhow!("no gate named {name:?}"))
            }
        }
        BookCommands::Export { path } => {
            let json = store.export_json()?;
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("exported to {}", path.display());
            Ok(())
        }
        BookCommands::Import { path } => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let count = store.import_json(&json)?;
            println!("imported {count} gates from {}", path.display());
            Ok(())
        }
    }
}

/// Accept both the wire form "[7, 32, 27]" and bare "7,32,27".
fn parse_address_arg(text: &str) -> Result<DialAddress> {
    let trimmed = text.trim();
    let bracketed = if trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    };
    let address: DialAddress = bracketed
        .parse()
        .map_err(|e: ParseAddressError| anyhow!("{e}"))?;
    if address.is_empty() {
        return Err(anyhow!("address must name at least one glyph"));
    }
    Ok(address)
}
