use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use xings_software::backend::PackageBackend;
use xings_software::error::Error;
use xings_software::packagekit::transaction::{Options, Package};
use xings_software::packagekit::{
    ErrorCode, Exit, Filters, Info, Network, PackageId, Restart, Results, Role, TransactionFlags,
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RefreshCache,
    GetUpdates,
    Resolve(Filters, Vec<String>),
    SearchFiles(Filters, Vec<String>),
    WhatProvides(Filters, Vec<String>),
    InstallPackages(TransactionFlags, Vec<String>),
    InstallFiles(TransactionFlags, Vec<PathBuf>),
    RemovePackages(TransactionFlags, Vec<String>),
    UpdatePackages(TransactionFlags, Vec<String>),
}

/// Canned PackageKit: `packages` is the whole repository, installed entries
/// carry `Info::Installed`.
#[derive(Default)]
pub struct MockBackend {
    pub packages: Vec<Package>,
    /// `file path -> package` for SearchFiles and WhatProvides.
    pub provides: Vec<(String, Package)>,
    pub updates: Vec<Package>,
    /// What a simulated transaction reports.
    pub simulated: Vec<Package>,
    pub restarts: Vec<(Restart, PackageId)>,
    pub fail_refresh: bool,
    pub fail_updates: Option<ErrorCode>,
    pub network: Option<Network>,
    pub log: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
pub fn pkg(info: Info, id: &str) -> Package {
    Package::new(info, id.parse().unwrap(), "")
}

fn ok(packages: Vec<Package>) -> Result<Results> {
    Ok(Results {
        exit: Some(Exit::Success),
        packages,
        ..Results::default()
    })
}

fn ids(ids: &[PackageId]) -> Vec<String> {
    ids.iter().map(PackageId::to_string).collect()
}

impl MockBackend {
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    fn matching_filters(&self, filters: Filters, package: &Package) -> bool {
        let installed = package.info == Info::Installed;
        if filters.contains(Filters::INSTALLED) {
            installed
        } else if filters.contains(Filters::NOT_INSTALLED) {
            !installed
        } else {
            true
        }
    }

    fn simulate_or_commit(&self, flags: TransactionFlags) -> Result<Results> {
        if flags.contains(TransactionFlags::SIMULATE) {
            return ok(self.simulated.clone());
        }
        Ok(Results {
            exit: Some(Exit::Success),
            restarts: self.restarts.clone(),
            ..Results::default()
        })
    }
}

#[async_trait]
impl PackageBackend for MockBackend {
    async fn get_updates(&self, _filters: Filters, _options: &Options) -> Result<Results> {
        self.record(Call::GetUpdates);
        if let Some(code) = self.fail_updates {
            return Err(Error::Transaction {
                code,
                details: "mock failure".into(),
            }
            .into());
        }
        ok(self.updates.clone())
    }

    async fn refresh_cache(&self, _force: bool, _options: &Options) -> Result<Results> {
        self.record(Call::RefreshCache);
        if self.fail_refresh {
            return Err(Error::Transaction {
                code: ErrorCode::NoNetwork,
                details: String::new(),
            }
            .into());
        }
        ok(Vec::new())
    }

    async fn resolve(&self, filters: Filters, names: &[String], _options: &Options) -> Result<Results> {
        self.record(Call::Resolve(filters, names.to_vec()));
        ok(self
            .packages
            .iter()
            .filter(|p| names.contains(&p.id.name) && self.matching_filters(filters, p))
            .cloned()
            .collect())
    }

    async fn search_names(&self, filters: Filters, values: &[String], _options: &Options) -> Result<Results> {
        ok(self
            .packages
            .iter()
            .filter(|p| values.iter().any(|v| p.id.name.contains(v.as_str())))
            .filter(|p| self.matching_filters(filters, p))
            .cloned()
            .collect())
    }

    async fn search_files(&self, filters: Filters, values: &[String], _options: &Options) -> Result<Results> {
        self.record(Call::SearchFiles(filters, values.to_vec()));
        ok(self
            .provides
            .iter()
            .filter(|(path, p)| values.contains(path) && self.matching_filters(filters, p))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn search_details(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results> {
        self.search_names(filters, values, options).await
    }

    async fn what_provides(&self, filters: Filters, values: &[String], _options: &Options) -> Result<Results> {
        self.record(Call::WhatProvides(filters, values.to_vec()));
        ok(self
            .provides
            .iter()
            .filter(|(provide, p)| values.contains(provide) && self.matching_filters(filters, p))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn install_packages(
        &self,
        flags: TransactionFlags,
        package_ids: &[PackageId],
        _options: &Options,
    ) -> Result<Results> {
        self.record(Call::InstallPackages(flags, ids(package_ids)));
        self.simulate_or_commit(flags)
    }

    async fn install_files(
        &self,
        flags: TransactionFlags,
        paths: &[PathBuf],
        _options: &Options,
    ) -> Result<Results> {
        self.record(Call::InstallFiles(flags, paths.to_vec()));
        self.simulate_or_commit(flags)
    }

    async fn remove_packages(
        &self,
        flags: TransactionFlags,
        package_ids: &[PackageId],
        _allow_deps: bool,
        _autoremove: bool,
        _options: &Options,
    ) -> Result<Results> {
        self.record(Call::RemovePackages(flags, ids(package_ids)));
        self.simulate_or_commit(flags)
    }

    async fn update_packages(
        &self,
        flags: TransactionFlags,
        package_ids: &[PackageId],
        _options: &Options,
    ) -> Result<Results> {
        self.record(Call::UpdatePackages(flags, ids(package_ids)));
        self.simulate_or_commit(flags)
    }

    async fn get_update_detail(&self, _ids: &[PackageId], _options: &Options) -> Result<Results> {
        ok(Vec::new())
    }

    async fn get_details(&self, _ids: &[PackageId], _options: &Options) -> Result<Results> {
        ok(Vec::new())
    }

    async fn depends_on(
        &self,
        _filters: Filters,
        _ids: &[PackageId],
        _recursive: bool,
        _options: &Options,
    ) -> Result<Results> {
        ok(Vec::new())
    }

    async fn time_since_action(&self, _role: Role) -> Result<Option<Duration>> {
        Ok(Some(Duration::from_secs(3 * 60 * 60)))
    }

    async fn network_state(&self) -> Result<Network> {
        self.network
            .ok_or_else(|| anyhow::anyhow!("network state unavailable"))
    }

    async fn is_locked(&self) -> Result<bool> {
        Ok(false)
    }
}
