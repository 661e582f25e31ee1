//! Application configuration: defaults, an optional TOML file, then env overrides.
//!
//! Env variables:
//!   QUIZ_CONFIG_PATH     : path to a TOML file with any of the `AppConfig` fields
//!   PORT                 : u16, HTTP port
//!   QUIZ_STATIC_DIR      : directory served as the page
//!   QUIZ_DATA_PATH       : question document (JSON)
//!   QUIZ_BOOKMARKS_PATH  : bookmark store file; "memory" keeps bookmarks in-process

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub port: u16,
  pub static_dir: PathBuf,
  pub data_path: PathBuf,
  /// `None` keeps bookmarks in memory only.
  pub bookmarks_path: Option<PathBuf>,
  /// Namespace key the bookmark set is stored under.
  pub bookmark_key: String,
  pub swipe_threshold_px: f64,
  /// Spacing of jump markers in the question list.
  pub jump_block: usize,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      static_dir: "./static".into(),
      data_path: "./static/quiz_data.json".into(),
      bookmarks_path: Some("./bookmarks.json".into()),
      bookmark_key: "az900_bookmarks".into(),
      swipe_threshold_px: 50.0,
      jump_block: 50,
    }
  }
}

impl AppConfig {
  /// Defaults, overlaid by QUIZ_CONFIG_PATH (if readable) and then env variables.
  pub fn from_env() -> Self {
    let mut cfg = load_config_file_from_env().unwrap_or_default();
    cfg.apply_overrides(|k| std::env::var(k).ok());
    cfg
  }

  fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
    if let Some(port) = var("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.port = port;
    }
    if let Some(dir) = var("QUIZ_STATIC_DIR") {
      self.static_dir = dir.into();
    }
    if let Some(path) = var("QUIZ_DATA_PATH") {
      self.data_path = path.into();
    }
    if let Some(path) = var("QUIZ_BOOKMARKS_PATH") {
      self.bookmarks_path = if path.eq_ignore_ascii_case("memory") { None } else { Some(path.into()) };
    }
    if self.jump_block == 0 {
      self.jump_block = 50;
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizdeck", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizdeck", %path, error = %e, "Failed to parse TOML config; using defaults");
        None
      }
    },
    Err(e) => {
      error!(target: "quizdeck", %path, error = %e, "Failed to read TOML config file; using defaults");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn toml_fields_overlay_defaults() {
    let cfg: AppConfig = toml::from_str("port = 8080\nbookmark_key = \"mine\"\n").unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.bookmark_key, "mine");
    assert_eq!(cfg.jump_block, 50);
    assert_eq!(cfg.static_dir, PathBuf::from("./static"));
  }

  #[test]
  fn env_overrides_win() {
    let env: HashMap<&str, &str> = HashMap::from([
      ("PORT", "9090"),
      ("QUIZ_DATA_PATH", "/data/q.json"),
      ("QUIZ_BOOKMARKS_PATH", "memory"),
    ]);
    let mut cfg = AppConfig::default();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.data_path, PathBuf::from("/data/q.json"));
    assert_eq!(cfg.bookmarks_path, None);
  }

  #[test]
  fn bad_port_is_ignored() {
    let mut cfg = AppConfig::default();
    cfg.apply_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()));
    assert_eq!(cfg.port, 3000);
  }
}
