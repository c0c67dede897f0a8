//! # Tally Terminal Library
//!
//! Core library for the `tally` binary: argument parsing, startup and
//! command dispatch.
//!
//! ## Module Organization
//! ```text
//! tally_cli/
//! ├── lib.rs          ◄─── You are here (startup & dispatch)
//! ├── config.rs       ◄─── Layered AppConfig
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── session.rs  ◄─── Entry list + batches + storage writes
//! │   └── capture.rs  ◄─── Capture controller + scan mode
//! ├── commands/
//! │   ├── entries.rs  ◄─── scan, add, list, clear
//! │   ├── batches.rs  ◄─── finalize, batches, delete
//! │   ├── export.rs   ◄─── export-batch, export-current
//! │   ├── settings.rs ◄─── header, mode
//! │   ├── capture.rs  ◄─── live capture loop
//! │   └── shell.rs    ◄─── interactive shell
//! ├── terminal.rs     ◄─── Confirm/Feedback on the terminal
//! └── error.rs        ◄─── CliError and exit codes
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;
pub mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tally_capture::{LineSourceDevices, STDIN_DEVICE};
use tally_core::{Confirm, FixedAnswer};
use tally_db::{Database, DbConfig};
use tally_export::XlsxSheetWriter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::settings::HeaderUpdate;
use commands::shell::{Shell, ShellCapture};
use config::{project_dirs, AppConfig};
use error::{CliError, CliResult};
use state::{CaptureState, Session};
use terminal::{StdinConfirm, TerminalNotifier};

/// Database file name inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "tally.db";

// =============================================================================
// Command Line
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Barcode inventory intake")]
pub struct Cli {
    /// Config file (default: tally.toml in the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file (overrides config and TALLY_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log at debug level to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record one decoded code
    Scan { code: String },

    /// Add an entry by hand
    Add {
        barcode: String,
        /// Quantity (default 1)
        #[arg(long, allow_hyphen_values = true)]
        qty: Option<String>,
        /// Unit price (default 0)
        #[arg(long, allow_hyphen_values = true)]
        price: Option<String>,
    },

    /// Show current entries
    List,

    /// Clear current entries
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Save current entries as a new batch
    Finalize,

    /// Show saved batches
    Batches,

    /// Delete a batch by its listed number
    Delete {
        ordinal: usize,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Export a batch to batch_<n>.xlsx
    ExportBatch {
        ordinal: usize,
        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Export current entries to entries.xlsx
    ExportCurrent {
        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Show or change the batch header (date, store, discount)
    Header(HeaderUpdate),

    /// Show or change the scan mode (1d, 2d, all)
    Mode { mode: Option<String> },

    /// Record from capture devices until end of input or Ctrl-C
    Capture {
        /// Scanner device path, repeatable (`-` for stdin)
        #[arg(long = "device", value_name = "PATH")]
        devices: Vec<String>,
    },

    /// Capture plus interactive commands
    Shell {
        /// Scanner device path, repeatable
        #[arg(long = "device", value_name = "PATH")]
        devices: Vec<String>,
    },
}

// =============================================================================
// Startup
// =============================================================================

/// Runs the application.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Parse arguments, initialize logging (stderr)                        │
/// │  2. Load AppConfig: defaults → tally.toml → TALLY_* environment         │
/// │  3. Determine database path: --db → config/TALLY_DB_PATH → data dir    │
/// │  4. Connect (SQLite, WAL) and run pending migrations                    │
/// │  5. Run the command                                                     │
/// │  6. Close the pool; map any error to its exit code                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_json());
            } else {
                eprintln!("error: {}", e);
            }
            ExitCode::from(e.code.exit_code())
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: warnings only, or `info,tally=debug,sqlx=warn` with `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "info,tally=debug,sqlx=warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path.
///
/// ## Resolution Order
/// 1. `--db`
/// 2. `[storage] path` or `TALLY_DB_PATH` (already merged into `config`)
/// 3. Platform data directory, e.g. `~/.local/share/tally/tally.db` on Linux
pub fn get_database_path(flag: Option<PathBuf>, config: &AppConfig) -> CliResult<PathBuf> {
    if let Some(path) = flag.or_else(|| config.storage.path.clone()) {
        return Ok(path);
    }

    let dirs = project_dirs()
        .ok_or_else(|| CliError::internal("Could not determine app data directory"))?;
    let data_dir = dirs.data_dir();

    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join(DATABASE_FILE_NAME))
}

/// Loads configuration, opens storage and runs one command.
pub async fn execute(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(cli.config)?;
    let db_path = get_database_path(cli.db, &config)?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    let result = dispatch(cli.command, &config, &db).await;
    db.close().await;
    result
}

/// Capture devices for the `capture` command: flags, else config, else stdin.
fn capture_devices(flags: Vec<String>, config: &AppConfig) -> Vec<String> {
    if !flags.is_empty() {
        flags
    } else if !config.capture.devices.is_empty() {
        config.capture.devices.clone()
    } else {
        vec![STDIN_DEVICE.to_string()]
    }
}

/// Capture devices for the shell, where stdin carries commands.
fn shell_devices(flags: Vec<String>, config: &AppConfig) -> Vec<String> {
    let devices = if flags.is_empty() {
        config.capture.devices.clone()
    } else {
        flags
    };

    devices
        .into_iter()
        .filter(|d| {
            let is_stdin = d == STDIN_DEVICE;
            if is_stdin {
                warn!("Standard input is the shell's command channel; not capturing from it");
            }
            !is_stdin
        })
        .collect()
}

/// `--yes` answers up front; otherwise ask on the terminal.
fn confirmation(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(StdinConfirm)
    }
}

fn export_writer(dir: Option<PathBuf>, config: &AppConfig) -> XlsxSheetWriter {
    XlsxSheetWriter::new(dir.unwrap_or_else(|| config.export.output_dir.clone()))
}

async fn dispatch(command: Command, config: &AppConfig, db: &Database) -> CliResult<()> {
    let mut out = std::io::stdout();
    let mut feedback = TerminalNotifier::new(config.feedback.bell);
    let storage = db.storage();

    match command {
        Command::Header(update) => commands::settings::header(&storage, &mut out, &update).await,
        Command::Mode { mode } => {
            commands::settings::mode(&storage, &mut out, mode.as_deref()).await
        }
        command => {
            let mut session = Session::load(storage.clone()).await?;

            match command {
                Command::Scan { code } => {
                    commands::entries::scan_typed(&mut session, &mut feedback, &code).await?;
                }
                Command::Add {
                    barcode,
                    qty,
                    price,
                } => {
                    commands::entries::add(
                        &mut session,
                        &mut out,
                        &barcode,
                        qty.as_deref(),
                        price.as_deref(),
                    )
                    .await?;
                }
                Command::List => commands::entries::list(&session, &mut out)?,
                Command::Clear { yes } => {
                    let mut confirm = confirmation(yes);
                    commands::entries::clear(&mut session, &mut out, confirm.as_mut()).await?;
                }
                Command::Finalize => commands::batches::finalize(&mut session, &mut out).await?,
                Command::Batches => commands::batches::list_batches(&session, &mut out)?,
                Command::Delete { ordinal, yes } => {
                    let mut confirm = confirmation(yes);
                    commands::batches::delete(&mut session, &mut out, ordinal, confirm.as_mut())
                        .await?;
                }
                Command::ExportBatch { ordinal, out: dir } => {
                    let mut writer = export_writer(dir, config);
                    commands::export::export_batch(&session, &mut writer, &mut out, ordinal)?;
                }
                Command::ExportCurrent { out: dir } => {
                    let mut writer = export_writer(dir, config);
                    commands::export::export_current(&session, &mut writer, &mut out)?;
                }
                Command::Capture { devices } => {
                    let devices = LineSourceDevices::new(capture_devices(devices, config));
                    let (mut capture, mut detections) = CaptureState::open(devices, storage).await?;
                    let shutdown = async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!(error = %e, "Could not listen for Ctrl-C");
                            std::future::pending::<()>().await;
                        }
                    };

                    let recorded = commands::capture::run_capture(
                        &mut session,
                        &mut capture,
                        &mut detections,
                        &mut feedback,
                        shutdown,
                    )
                    .await?;
                    info!(recorded, entries = session.entries().len(), "Capture finished");
                }
                Command::Shell { devices } => {
                    let devices = shell_devices(devices, config);
                    let capture = if devices.is_empty() {
                        None
                    } else {
                        let (state, detections) =
                            CaptureState::open(LineSourceDevices::new(devices), storage).await?;
                        Some(ShellCapture { state, detections })
                    };

                    let writer = XlsxSheetWriter::new(config.export.output_dir.clone());
                    let input = tokio::io::BufReader::new(tokio::io::stdin());
                    Shell::new(&mut session, capture, writer, &mut feedback)
                        .run(input, &mut out)
                        .await?;
                }
                Command::Header(_) | Command::Mode { .. } => {}
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_negative_quantity() {
        let cli =
            Cli::try_parse_from(["tally", "add", "A1", "--qty", "-3", "--price", "2.5"]).unwrap();
        match cli.command {
            Command::Add { barcode, qty, price } => {
                assert_eq!(barcode, "A1");
                assert_eq!(qty.as_deref(), Some("-3"));
                assert_eq!(price.as_deref(), Some("2.5"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_header_and_globals() {
        let cli = Cli::try_parse_from([
            "tally", "header", "--store", "X", "--discount", "10", "--db", "/tmp/t.db", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.db")));
        match cli.command {
            Command::Header(update) => {
                assert_eq!(update.store.as_deref(), Some("X"));
                assert_eq!(update.discount.as_deref(), Some("10"));
                assert!(!update.today);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_today_conflicts_with_date() {
        assert!(Cli::try_parse_from(["tally", "header", "--today", "--date", "2024-01-01"]).is_err());
    }

    #[test]
    fn test_capture_devices_fallback() {
        let mut config = AppConfig::default();
        assert_eq!(capture_devices(vec![], &config), vec![STDIN_DEVICE]);

        config.capture.devices = vec!["/dev/a".into()];
        assert_eq!(capture_devices(vec![], &config), vec!["/dev/a"]);
        assert_eq!(capture_devices(vec!["/dev/b".into()], &config), vec!["/dev/b"]);
    }

    #[test]
    fn test_shell_never_captures_stdin() {
        let mut config = AppConfig::default();
        config.capture.devices = vec![STDIN_DEVICE.into(), "/dev/a".into()];
        assert_eq!(shell_devices(vec![], &config), vec!["/dev/a"]);
        assert!(shell_devices(vec![STDIN_DEVICE.into()], &AppConfig::default()).is_empty());
    }

    #[test]
    fn test_database_path_precedence() {
        let mut config = AppConfig::default();
        config.storage.path = Some(PathBuf::from("/from/config.db"));

        assert_eq!(
            get_database_path(Some(PathBuf::from("/from/flag.db")), &config).unwrap(),
            PathBuf::from("/from/flag.db")
        );
        assert_eq!(
            get_database_path(None, &config).unwrap(),
            PathBuf::from("/from/config.db")
        );
    }
}
