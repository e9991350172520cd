//! `waybill` — import an XML order document into a SQLite sales database.
//!
//! # Usage
//!
//! ```
//! waybill orders.xml sales.db
//! waybill orders.xml              # database path from config.toml
//! waybill                         # both paths from config.toml
//! waybill --config /etc/waybill.toml
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use waybill_core::LoadError;
use waybill_store_sqlite::SqliteStore;
use waybill_xml::OrderReader;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "waybill",
  about = "Import XML order documents into a SQLite sales database"
)]
struct Cli {
  /// Path to the XML order document. Falls back to `xml_path` from the
  /// config file.
  xml_path: Option<PathBuf>,

  /// Path to the SQLite database. Falls back to `db_path` from the config
  /// file.
  db_path: Option<PathBuf>,

  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional configuration file; both keys may also come from
/// `WAYBILL_*` environment variables.
#[derive(Deserialize, Default)]
struct FileConfig {
  xml_path: Option<PathBuf>,
  db_path:  Option<PathBuf>,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("WAYBILL"))
    .build()
    .context("failed to read config file")?;

  let file_cfg: FileConfig = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  // Explicit arguments override the config file.
  let xml_path = cli
    .xml_path
    .or(file_cfg.xml_path)
    .context("no XML path given on the command line or in the config file")?;
  let db_path = cli
    .db_path
    .or(file_cfg.db_path)
    .context("no database path given on the command line or in the config file")?;

  if !xml_path.exists() {
    anyhow::bail!("XML file not found at {}", xml_path.display());
  }

  let document = std::fs::read_to_string(&xml_path)
    .with_context(|| format!("failed to read {}", xml_path.display()))?;

  let mut store = SqliteStore::open(&db_path)
    .with_context(|| format!("failed to open database at {}", db_path.display()))?;

  tracing::info!(
    xml = %xml_path.display(),
    db = %db_path.display(),
    "starting import"
  );

  match waybill_core::load(&mut store, OrderReader::new(&document)) {
    Ok(report) => {
      println!(
        "Loaded {} orders ({} line items) into {}",
        report.orders,
        report.line_items,
        db_path.display()
      );
      Ok(())
    }
    Err(err) => {
      report_failure(&err);
      std::process::exit(1);
    }
  }
}

/// Print the original failure and the rollback outcome as two distinct
/// messages; a rollback failure never masks the error that caused it.
fn report_failure(
  err: &LoadError<waybill_xml::Error, waybill_store_sqlite::Error>,
) {
  match err {
    LoadError::Source(cause) => {
      eprintln!("import failed: {cause}");
      eprintln!("transaction rolled back; the database is unchanged");
    }
    LoadError::Store(cause) => {
      eprintln!("import failed: {cause}");
      eprintln!("transaction rolled back; the database is unchanged");
    }
    LoadError::RollbackAfterSource { cause, rollback } => {
      eprintln!("import failed: {cause}");
      eprintln!("rollback also failed: {rollback}");
    }
    LoadError::RollbackAfterStore { cause, rollback } => {
      eprintln!("import failed: {cause}");
      eprintln!("rollback also failed: {rollback}");
    }
  }
}
