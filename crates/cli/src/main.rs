// vinrecon - reconcile vehicle prices between an inventory feed and a listing feed

mod exit_codes;
mod fetch;
mod recon;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "vinrecon")]
#[command(about = "Flag VINs whose price differs between two vehicle feeds")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only errors on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile prices between the primary and comparison feeds
    #[command(after_help = "\
Examples:
  vinrecon run --primary https://example.com/inventory.csv \\
               --comparison https://example.com/listings.csv --dealer D1
  vinrecon run --config store.recon.toml
  vinrecon run --config store.recon.toml --dealer D2 --csv --output d2.csv
  vinrecon run --config store.recon.toml --comparison-type-field condition \\
               --comparison-used-label Pre-Owned --json")]
    Run(RunArgs),

    /// List the dealer ids present in the comparison feed
    #[command(after_help = "\
Examples:
  vinrecon dealers --comparison https://example.com/listings.csv
  vinrecon dealers --config store.recon.toml")]
    Dealers {
        /// Path to a .recon.toml config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comparison feed URL or path (overrides config)
        #[arg(long)]
        comparison: Option<String>,

        /// Dealer id column in the comparison feed
        #[arg(long)]
        comparison_dealer_field: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Download one feed and write it out as a UTF-8 CSV snapshot
    #[command(after_help = "\
Examples:
  vinrecon fetch https://example.com/listings.csv --out listings.csv
  vinrecon fetch https://example.com/inventory.txt --delimiter '|' > inventory.csv")]
    Fetch {
        /// Feed URL or path
        source: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Input delimiter: a single character or "auto"
        #[arg(long, default_value = ",")]
        delimiter: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Validate a config file without fetching anything
    #[command(after_help = "\
Examples:
  vinrecon validate --config store.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to a .recon.toml config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Primary (inventory) feed URL or path
    #[arg(long)]
    pub primary: Option<String>,

    /// Comparison (listing) feed URL or path
    #[arg(long)]
    pub comparison: Option<String>,

    /// Only compare against comparison rows for this dealer
    #[arg(long)]
    pub dealer: Option<String>,

    // ── Primary field names ──────────────────────────────────────────
    /// Primary VIN column [default: VIN]
    #[arg(long, help_heading = "Primary feed")]
    pub primary_vin_field: Option<String>,

    /// Primary vehicle type column [default: Type]; "" for none
    #[arg(long, help_heading = "Primary feed")]
    pub primary_type_field: Option<String>,

    /// Primary new-vehicle price column [default: BookValue]
    #[arg(long, help_heading = "Primary feed")]
    pub primary_new_price_field: Option<String>,

    /// Primary used-vehicle price column [default: SellingPrice]
    #[arg(long, help_heading = "Primary feed")]
    pub primary_used_price_field: Option<String>,

    /// Extra label meaning "New" in the primary type column (repeatable)
    #[arg(long, help_heading = "Primary feed")]
    pub primary_new_label: Vec<String>,

    /// Extra label meaning "Used" in the primary type column (repeatable)
    #[arg(long, help_heading = "Primary feed")]
    pub primary_used_label: Vec<String>,

    // ── Comparison field names ───────────────────────────────────────
    /// Comparison VIN column [default: vin]
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_vin_field: Option<String>,

    /// Comparison vehicle type column [default: none]
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_type_field: Option<String>,

    /// Comparison dealer id column [default: dealer_id]
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_dealer_field: Option<String>,

    /// Comparison new-vehicle price column [default: RetailValue]
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_new_price_field: Option<String>,

    /// Comparison used-vehicle price column [default: InternetPrice]
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_used_price_field: Option<String>,

    /// Extra label meaning "New" in the comparison type column (repeatable)
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_new_label: Vec<String>,

    /// Extra label meaning "Used" in the comparison type column (repeatable)
    #[arg(long, help_heading = "Comparison feed")]
    pub comparison_used_label: Vec<String>,

    // ── Policies ─────────────────────────────────────────────────────
    /// Duplicate VIN in the comparison feed: first | error
    #[arg(long)]
    pub on_duplicate: Option<String>,

    /// Unrecognised vehicle type: skip | error | used
    #[arg(long)]
    pub unknown_type: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    // ── Output ───────────────────────────────────────────────────────
    /// Print the full result as JSON
    #[arg(long, conflicts_with = "csv")]
    pub json: bool,

    /// Print the report as CSV
    #[arg(long)]
    pub csv: bool,

    /// Write the report to a file (format from --json/--csv, else extension)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // `log` records from the library crates are bridged in by the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args, cli.quiet),
        Commands::Dealers {
            config,
            comparison,
            comparison_dealer_field,
            timeout,
        } => recon::cmd_dealers(config, comparison, comparison_dealer_field, timeout),
        Commands::Fetch {
            source,
            out,
            delimiter,
            timeout,
        } => fetch::cmd_fetch(source, out, delimiter, timeout, cli.quiet),
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<vinrecon_feed::FetchError> for CliError {
    fn from(e: vinrecon_feed::FetchError) -> Self {
        Self::new(exit_codes::EXIT_FETCH_FAILED, e.to_string())
    }
}

impl From<vinrecon_recon::ReconError> for CliError {
    fn from(e: vinrecon_recon::ReconError) -> Self {
        let code = if e.is_config() {
            exit_codes::EXIT_CONFIG
        } else {
            exit_codes::EXIT_DATA
        };
        let err = Self::new(code, e.to_string());
        match e {
            vinrecon_recon::ReconError::MissingColumn { .. } => {
                err.with_hint("check the --*-field flags or [*.columns] in the config against the feed header")
            }
            vinrecon_recon::ReconError::DuplicateVin { .. } => {
                err.with_hint("use --on-duplicate first to keep the first listing")
            }
            vinrecon_recon::ReconError::UnknownVehicleType { .. } => {
                err.with_hint("add the label with --*-new-label / --*-used-label, or --unknown-type skip")
            }
            _ => err,
        }
    }
}
