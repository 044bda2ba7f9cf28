use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::query::CacheOptions;

/// Environment variable holding the API base URL
pub const API_URL_VAR: &str = "JOT_API_URL";

#[derive(Debug, Clone)]
pub struct Config {
  /// Base URL of the notes service
  pub api_url: Url,
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub skills: SkillsConfig,
}

/// Optional YAML settings. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub skills: SkillsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { timeout_secs: 30 }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Unset means cached data only goes stale when a write invalidates it
  pub stale_time_secs: Option<u64>,
  pub gc_time_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: None,
      gc_time_secs: 300,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
  pub page_size: u32,
}

impl Default for SkillsConfig {
  fn default() -> Self {
    Self { page_size: 10 }
  }
}

impl Config {
  /// Load configuration from the environment and an optional file.
  ///
  /// The API URL always comes from `JOT_API_URL`. File search order:
  /// 1. Explicit path if provided
  /// 2. ./jot.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jot/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let file = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => ConfigFile::default(),
    };

    Self::from_parts(file, std::env::var(API_URL_VAR).ok().as_deref())
  }

  /// Combine file settings with the API URL taken from the environment.
  pub fn from_parts(file: ConfigFile, api_url: Option<&str>) -> Result<Self> {
    let raw = api_url
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| eyre!("API URL not set. Set the {} environment variable.", API_URL_VAR))?;

    let api_url =
      Url::parse(raw).map_err(|e| eyre!("Invalid {} value {:?}: {}", API_URL_VAR, raw, e))?;

    if !matches!(api_url.scheme(), "http" | "https") {
      return Err(eyre!("{} must be an http or https URL, got {}", API_URL_VAR, api_url));
    }

    Ok(Self {
      api_url,
      api: file.api,
      cache: file.cache,
      skills: file.skills,
    })
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("jot.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jot").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<ConfigFile, serde_yaml::Error> {
    // An empty file is valid and means all defaults
    if contents.trim().is_empty() {
      return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn cache_options(&self) -> CacheOptions {
    CacheOptions {
      stale_time: self
        .cache
        .stale_time_secs
        .map(|secs| chrono::Duration::seconds(secs as i64)),
      gc_time: chrono::Duration::seconds(self.cache.gc_time_secs as i64),
    }
  }
}
