//! Runtime configuration, layered from an optional TOML file and `SPOKE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use spoke_api::FeedSpec;
use spoke_core::mutation::CounterMode;
use spoke_store_sqlite::AccessRules;

/// Runtime server configuration, deserialised from `spoke.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Populate empty catalog collections before serving.
  pub seed_on_start: bool,
  pub counter_mode:  CounterMode,
  pub access:        AccessRules,
  /// Live feeds opened at startup.
  pub feeds:         Vec<FeedSpec>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".into(),
      port:          8080,
      store_path:    PathBuf::from("spoke.db"),
      seed_on_start: true,
      counter_mode:  CounterMode::default(),
      access:        AccessRules::open(),
      feeds:         FeedSpec::catalog(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SPOKE").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
