mod api;
mod app;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;
mod validation;
mod view_state;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::{NotesClient, NotesService};
use crate::query::QueryCache;

#[derive(Parser, Debug)]
#[command(name = "jot")]
#[command(about = "A terminal client for a REST notes service")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./jot.yaml or $XDG_CONFIG_HOME/jot/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init()?;

  let client = NotesClient::new(&config)?;
  let host = client.host().to_string();
  info!(api = %config.api_url, "starting jot");

  let service = NotesService::new(Arc::new(client), QueryCache::new(config.cache_options()));

  let mut app = app::App::new(service, host, config.skills.page_size);
  app.run().await?;

  Ok(())
}
