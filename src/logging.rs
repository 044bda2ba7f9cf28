use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g. `jot=debug`
pub const LOG_VAR: &str = "JOT_LOG";

/// Directory the log file is written to
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .map(|d| d.join("jot"))
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Send tracing output to `<data dir>/jot/jot.log`.
///
/// The terminal belongs to the UI, so nothing is written to stdout or
/// stderr. Keep the returned guard alive until exit so buffered lines get
/// flushed.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "jot.log"));

  let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}
