//! "Install this to open that" helpers.
//!
//! Every helper follows the same shape: find out what would be installed,
//! let the user see the full set of packages through a [`Confirm`]
//! implementation, then commit. PackageKit does the dependency work.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::backend::PackageBackend;
use crate::config::Settings;
use crate::error::Error;
use crate::packagekit::transaction::{Options, Package};
use crate::packagekit::package_id::compare_versions;
use crate::packagekit::{Filters, Info, PackageId, Results};
use crate::policy::{install_flags, simulate_flags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Install,
    Remove,
}

/// What the user is asked to agree to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub verb: Verb,
    /// Names or paths the caller asked for.
    pub requested: Vec<String>,
    /// Extra packages the transaction pulls in or takes out.
    pub additional: Vec<Package>,
}

impl Confirmation {
    pub fn question(&self) -> String {
        let what = self.requested.join(", ");
        match (self.verb, self.additional.len()) {
            (Verb::Install, 0) => format!("Install {}?", what),
            (Verb::Remove, 0) => format!("Remove {}?", what),
            (Verb::Install, 1) => format!("Install {} and 1 additional package?", what),
            (Verb::Remove, 1) => format!("Remove {} and 1 dependent package?", what),
            (Verb::Install, n) => format!("Install {} and {} additional packages?", what, n),
            (Verb::Remove, n) => format!("Remove {} and {} dependent packages?", what, n),
        }
    }
}

pub trait Confirm: Send + Sync {
    fn confirm(&self, confirmation: &Confirmation) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Confirmation) -> bool + Send + Sync,
{
    fn confirm(&self, confirmation: &Confirmation) -> bool {
        self(confirmation)
    }
}

/// Agrees to everything, for `--assume-yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _: &Confirmation) -> bool {
        true
    }
}

/// PackageKit's spelling of the machine architecture.
pub fn native_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        other => other,
    }
}

fn arch_rank(arch: &str, native: &str) -> u8 {
    if arch == native {
        2
    } else if matches!(arch, "noarch" | "all") {
        1
    } else {
        0
    }
}

/// One installable package per requested name: the newest version, the
/// native arch among equal versions, and the last one PackageKit listed
/// among full equals. Installed packages never count as candidates.
pub fn choose_candidates(packages: &[Package], names: &[String], native: &str) -> Vec<PackageId> {
    names
        .iter()
        .filter_map(|name| {
            packages
                .iter()
                .filter(|p| &p.id.name == name && !is_installed(p))
                .max_by(|a, b| {
                    compare_versions(&a.id.version, &b.id.version)
                        .then_with(|| arch_rank(&a.id.arch, native).cmp(&arch_rank(&b.id.arch, native)))
                })
                .map(|p| p.id.clone())
        })
        .collect()
}

fn is_installed(package: &Package) -> bool {
    package.info == Info::Installed || package.id.is_installed()
}

/// Packages a simulation adds beyond the ones asked for.
pub fn additional_packages(simulated: &Results, requested: &[PackageId]) -> Vec<Package> {
    let mut seen = BTreeMap::new();
    for package in &simulated.packages {
        if !matches!(
            package.info,
            Info::Installing | Info::Updating | Info::Removing | Info::Obsoleting | Info::Downgrading
        ) {
            continue;
        }
        if requested.iter().any(|id| id.name == package.id.name) {
            continue;
        }
        seen.entry(package.id.to_string()).or_insert_with(|| package.clone());
    }
    seen.into_values().collect()
}

/// `font(:lang=xx)` as distributions publish it.
pub fn font_provide(lang: &str) -> String {
    format!("font(:lang={})", lang)
}

pub fn mimetype_provide(mime_type: &str) -> String {
    format!("mimetype({})", mime_type)
}

/// GStreamer 1.x decoders and encoders, e.g. `decoder-audio/mpeg`.
pub fn gstreamer_provide(kind: &str) -> String {
    format!("gstreamer1({})", kind)
}

pub struct Installer<'a, B: PackageBackend + ?Sized> {
    backend: &'a B,
    settings: &'a Settings,
    options: Options,
}

impl<'a, B: PackageBackend + ?Sized> Installer<'a, B> {
    pub fn new(backend: &'a B, settings: &'a Settings) -> Self {
        Self {
            backend,
            settings,
            options: Options::interactive(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub async fn install_package_names(&self, names: &[String], confirm: &dyn Confirm) -> Result<Results> {
        if names.is_empty() {
            bail!("No package names given");
        }
        let resolved = self
            .backend
            .resolve(Filters::ARCH, names, &self.options)
            .await
            .context("Failed to resolve package names")?;

        let found = |name: &String| resolved.packages.iter().any(|p| &p.id.name == name);
        let missing: Vec<String> = names.iter().filter(|&n| !found(n)).cloned().collect();
        if !missing.is_empty() {
            return Err(Error::NotFound(missing).into());
        }

        let installed = |name: &String| {
            resolved
                .packages
                .iter()
                .any(|p| &p.id.name == name && is_installed(p))
        };
        let wanted: Vec<String> = names.iter().filter(|&n| !installed(n)).cloned().collect();
        if wanted.is_empty() {
            return Err(Error::AlreadyInstalled(names.to_vec()).into());
        }

        let ids = choose_candidates(&resolved.packages, &wanted, native_arch());
        self.confirm_and_install(ids, confirm).await
    }

    pub async fn install_files(&self, paths: &[PathBuf], confirm: &dyn Confirm) -> Result<Results> {
        if paths.is_empty() {
            bail!("No files given");
        }
        let mut absolute = Vec::with_capacity(paths.len());
        let mut missing = Vec::new();
        for path in paths {
            match tokio::fs::canonicalize(path).await {
                Ok(path) => absolute.push(path),
                Err(e) => {
                    debug!("Cannot use {}: {}", path.display(), e);
                    missing.push(path.display().to_string());
                }
            }
        }
        if !missing.is_empty() {
            return Err(Error::NotFound(missing).into());
        }

        let simulated = self
            .backend
            .install_files(simulate_flags(self.settings), &absolute, &self.options)
            .await?;
        let confirmation = Confirmation {
            verb: Verb::Install,
            requested: absolute.iter().map(|p| file_label(p)).collect(),
            additional: additional_packages(&simulated, &[]),
        };
        if !confirm.confirm(&confirmation) {
            return Err(Error::Declined.into());
        }

        info!("Installing {} local file(s)", absolute.len());
        self.backend
            .install_files(install_flags(self.settings), &absolute, &self.options)
            .await
    }

    /// Installs whatever package ships the given paths.
    pub async fn install_provide_files(&self, files: &[String], confirm: &dyn Confirm) -> Result<Results> {
        if files.is_empty() {
            bail!("No files given");
        }
        let installed = self
            .backend
            .search_files(Filters::INSTALLED, files, &self.options)
            .await?;
        if !installed.packages.is_empty() {
            let names = installed.packages.iter().map(|p| p.id.name.clone()).collect();
            return Err(Error::AlreadyInstalled(names).into());
        }

        let available = self
            .backend
            .search_files(Filters::NOT_INSTALLED | Filters::NEWEST | Filters::ARCH, files, &self.options)
            .await?;
        let ids = unique_ids(&available.packages);
        if ids.is_empty() {
            return Err(Error::NotFound(files.to_vec()).into());
        }
        self.confirm_and_install(ids, confirm).await
    }

    /// Installs packages that provide capabilities such as codecs, fonts or
    /// mime type handlers.
    pub async fn install_what_provides(&self, values: &[String], confirm: &dyn Confirm) -> Result<Results> {
        if values.is_empty() {
            bail!("Nothing to look for");
        }
        let available = self
            .backend
            .what_provides(Filters::NOT_INSTALLED | Filters::NEWEST | Filters::ARCH, values, &self.options)
            .await?;
        let ids = unique_ids(&available.packages);
        if ids.is_empty() {
            return Err(Error::NotFound(values.to_vec()).into());
        }
        self.confirm_and_install(ids, confirm).await
    }

    pub async fn remove_packages(&self, names: &[String], confirm: &dyn Confirm) -> Result<Results> {
        if names.is_empty() {
            bail!("No package names given");
        }
        let resolved = self
            .backend
            .resolve(Filters::INSTALLED, names, &self.options)
            .await
            .context("Failed to resolve package names")?;
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !resolved.packages.iter().any(|p| &p.id.name == *name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::NotFound(missing).into());
        }
        let ids = unique_ids(&resolved.packages);

        let simulated = self
            .backend
            .remove_packages(simulate_flags(self.settings), &ids, true, false, &self.options)
            .await?;
        let confirmation = Confirmation {
            verb: Verb::Remove,
            requested: ids.iter().map(PackageId::printable).collect(),
            additional: additional_packages(&simulated, &ids),
        };
        if !confirm.confirm(&confirmation) {
            return Err(Error::Declined.into());
        }

        info!("Removing {}", confirmation.requested.join(", "));
        self.backend
            .remove_packages(install_flags(self.settings), &ids, true, false, &self.options)
            .await
    }

    async fn confirm_and_install(&self, ids: Vec<PackageId>, confirm: &dyn Confirm) -> Result<Results> {
        let simulated = self
            .backend
            .install_packages(simulate_flags(self.settings), &ids, &self.options)
            .await?;
        let confirmation = Confirmation {
            verb: Verb::Install,
            requested: ids.iter().map(PackageId::printable).collect(),
            additional: additional_packages(&simulated, &ids),
        };
        if !confirm.confirm(&confirmation) {
            return Err(Error::Declined.into());
        }

        info!("Installing {}", confirmation.requested.join(", "));
        self.backend
            .install_packages(install_flags(self.settings), &ids, &self.options)
            .await
    }
}

fn unique_ids(packages: &[Package]) -> Vec<PackageId> {
    let mut ids: Vec<PackageId> = Vec::new();
    for package in packages {
        if !ids.contains(&package.id) {
            ids.push(package.id.clone());
        }
    }
    ids
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
