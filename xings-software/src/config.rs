//! User settings, stored as TOML under the XDG config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const CONFIG_DIR_NAME: &str = "xings-software";
const SETTINGS_FILE: &str = "settings.toml";

pub const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between update checks, 0 disables automatic checks.
    pub frequency_get_updates: u64,
    /// Minimum metadata age in seconds before it is refreshed, 0 never refreshes.
    pub frequency_refresh_cache: u64,
    /// Minimum seconds between notifications for non-urgent updates.
    pub frequency_updates_notification: u64,
    pub startup_delay: u64,
    pub recheck_gap: u64,
    pub update_battery: bool,
    pub connection_use_mobile: bool,
    pub auto_download_updates: bool,
    pub notify_updates: bool,
    pub only_trusted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequency_get_updates: DAY_SECS,
            frequency_refresh_cache: DAY_SECS,
            frequency_updates_notification: 7 * DAY_SECS,
            startup_delay: 60,
            recheck_gap: 60,
            update_battery: false,
            connection_use_mobile: false,
            auto_download_updates: false,
            notify_updates: true,
            only_trusted: true,
        }
    }
}

impl Settings {
    pub fn get_updates_every(&self) -> Option<Duration> {
        non_zero(self.frequency_get_updates)
    }

    pub fn refresh_cache_every(&self) -> Option<Duration> {
        non_zero(self.frequency_refresh_cache)
    }

    pub fn notify_every(&self) -> Duration {
        Duration::from_secs(self.frequency_updates_notification)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay)
    }

    pub fn recheck_gap(&self) -> Duration {
        Duration::from_secs(self.recheck_gap)
    }

    pub fn default_path() -> PathBuf {
        config_dir().join(SETTINGS_FILE)
    }

    /// Missing files and missing keys fall back to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Like `load_from` but never fails; broken files are logged and ignored.
    pub fn load() -> Self {
        let path = Self::default_path();
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Using default settings: {:#}", e);
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        write_atomically(path, &text)
    }
}

fn non_zero(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

pub fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
        .join(CONFIG_DIR_NAME)
}

pub fn state_dir() -> PathBuf {
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local/state"))
        .join(CONFIG_DIR_NAME)
}

/// Writes next to `path` then renames, so readers never see half a file.
pub(crate) fn write_atomically(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, text).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Reloads settings whenever the file changes on disk.
pub struct SettingsWatcher {
    path: PathBuf,
    receiver: mpsc::UnboundedReceiver<()>,
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    pub fn new(path: PathBuf) -> Result<Self> {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(config_dir);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let file_name = path.file_name().map(|name| name.to_os_string());
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else {
                return;
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if ours {
                let _ = sender.send(());
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            path,
            receiver,
            _watcher: watcher,
        })
    }

    /// Waits for the next change and returns the freshly loaded settings.
    pub async fn changed(&mut self) -> Option<Settings> {
        loop {
            self.receiver.recv().await?;
            // Editors emit bursts of events for one save.
            while self.receiver.try_recv().is_ok() {}
            match Settings::load_from(&self.path) {
                Ok(settings) => {
                    debug!("Reloaded settings from {}", self.path.display());
                    return Some(settings);
                }
                Err(e) => warn!("Ignoring settings change: {:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "frequency_get_updates = 3600\nupdate_battery = true\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.frequency_get_updates, 3600);
        assert!(settings.update_battery);
        assert_eq!(settings.frequency_refresh_cache, DAY_SECS);
        assert!(settings.only_trusted);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = Settings {
            auto_download_updates: true,
            frequency_get_updates: 0,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        assert!(settings.get_updates_every().is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "frequency_get_updates = \"daily\"").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
