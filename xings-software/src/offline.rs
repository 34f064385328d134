//! Results of updates PackageKit applied during the last boot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::keyfile::KeyFile;
use crate::packagekit::proxy::OfflineProxy;
use crate::packagekit::{ErrorCode, PackageId};

pub const RESULTS_PATH: &str = "/var/lib/PackageKit/offline-update-competed";
const RESULTS_GROUP: &str = "PackageKit Offline Update Results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineResults {
    pub success: bool,
    pub packages: Vec<PackageId>,
    pub error: Option<(ErrorCode, String)>,
}

impl OfflineResults {
    pub fn parse(text: &str) -> Result<Self> {
        let kf = KeyFile::parse(text)?;
        let success = kf.get_bool(RESULTS_GROUP, "Success")?.unwrap_or(false);
        // Package ids contain `;`, so this list is comma separated.
        let packages: Vec<PackageId> = kf
            .get(RESULTS_GROUP, "Packages")
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect();
        let error = if success {
            None
        } else {
            let code = kf
                .get(RESULTS_GROUP, "ErrorCode")
                .map(ErrorCode::from_str_name)
                .unwrap_or(ErrorCode::Unknown);
            let details = kf.get(RESULTS_GROUP, "ErrorDetails").unwrap_or_default().to_string();
            Some((code, details))
        };
        Ok(Self {
            success,
            packages,
            error,
        })
    }

    /// `Ok(None)` when no offline update ran since the results were cleared.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .map(Some)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(RESULTS_PATH)
    }

    pub fn title(&self) -> &'static str {
        if self.success {
            "Software updates installed"
        } else {
            "Software updates failed to install"
        }
    }

    pub fn body(&self) -> String {
        if self.success {
            match self.packages.len() {
                1 => "1 package was updated while the computer restarted.".to_string(),
                n => format!("{} packages were updated while the computer restarted.", n),
            }
        } else {
            let (code, details) = self
                .error
                .clone()
                .unwrap_or((ErrorCode::Unknown, String::new()));
            let mut body = crate::error::error_code_message(code).to_string();
            if !details.is_empty() {
                body.push(' ');
                body.push_str(&details);
            }
            body
        }
    }
}

pub async fn clear_results(offline: &OfflineProxy<'_>) -> Result<()> {
    offline
        .clear_results()
        .await
        .context("Failed to clear offline update results")
}
