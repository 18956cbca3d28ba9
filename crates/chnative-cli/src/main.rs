/// `chnative`: replay a captured ClickHouse server response through the
/// native-protocol dispatcher.
///
/// The input file holds the raw bytes a server sent after a query, i.e.
/// everything following the client's Query packet, exactly as read off
/// the socket.
///
/// # Command overview
///
/// ```text
/// chnative <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print one line per routed packet
///   validate   Report how the response terminates
///   help       Print help information
///
/// Global options:
///   --revision N     Negotiated protocol revision (default 54460)
///   --compressed     Result blocks arrive in compressed frames
///   -v, --verbose    Log dispatcher traces to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                           |
/// |------|---------------------------------------------------|
/// | 0    | Response ended with EndOfStream                   |
/// | 1    | Anything else (I/O failure, exception, bad bytes) |
///
/// Diagnostics go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use chnative_decoder::DecoderConfig;
use chnative_wire::packet::revision;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_inspect;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "chnative", version, about = "ClickHouse native protocol response inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Protocol revision negotiated in the handshake.
    #[arg(long, global = true, default_value_t = revision::DEFAULT)]
    revision: u64,

    /// Data, Totals and Extremes blocks are wrapped in compressed frames.
    #[arg(long, global = true)]
    compressed: bool,

    /// Show dispatcher debug traces (`RUST_LOG` overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::default()
            .with_revision(self.revision)
            .with_compression(self.compressed)
    }
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print one line per routed packet.
    Inspect(InspectArgs),
    /// Run the response to completion and report how it ended.
    Validate(ValidateArgs),
}

/// Arguments for `chnative inspect`.
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────────┐
/// │ Flag          │ Effect                                           │
/// ├───────────────┼──────────────────────────────────────────────────┤
/// │ --json        │ One JSON object per line instead of text         │
/// │ --first-block │ Stop at the first Data packet and summarize it   │
/// └───────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Captured server response.
    pub file: PathBuf,

    /// Print JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Stop at the first Data packet.
    #[arg(long)]
    pub first_block: bool,
}

/// Arguments for `chnative validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Captured server response.
    pub file: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.decoder_config();
    let result = match &cli.command {
        Commands::Inspect(args) => cmd_inspect::run(args, config),
        Commands::Validate(args) => cmd_validate::run(args, config),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
