//! Timestamps the notifier keeps between sessions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{state_dir, write_atomically};

const STATE_FILE: &str = "state.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub last_check: Option<DateTime<Utc>>,
    pub last_updates_notification: Option<DateTime<Utc>>,
    /// Package ids covered by the last update notification.
    pub notified_updates: Vec<String>,
}

impl State {
    pub fn default_path() -> PathBuf {
        state_dir().join(STATE_FILE)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).unwrap_or_else(|e| {
            warn!("Starting with empty state: {:#}", e);
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_atomically(path, &toml::to_string_pretty(self)?)
    }

    pub fn record_notification(&mut self, now: DateTime<Utc>, ids: Vec<String>) {
        self.last_updates_notification = Some(now);
        self.notified_updates = ids;
    }
}
