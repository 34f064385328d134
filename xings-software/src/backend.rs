//! The package operations the front-ends need, independent of the bus.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::packagekit::transaction::Options;
use crate::packagekit::{Filters, Network, PackageId, Results, Role, TransactionFlags};

#[async_trait]
pub trait PackageBackend: Send + Sync {
    async fn get_updates(&self, filters: Filters, options: &Options) -> Result<Results>;

    async fn refresh_cache(&self, force: bool, options: &Options) -> Result<Results>;

    async fn resolve(&self, filters: Filters, names: &[String], options: &Options) -> Result<Results>;

    async fn search_names(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results>;

    async fn search_files(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results>;

    async fn search_details(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results>;

    async fn what_provides(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results>;

    async fn install_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        options: &Options,
    ) -> Result<Results>;

    async fn install_files(
        &self,
        flags: TransactionFlags,
        paths: &[PathBuf],
        options: &Options,
    ) -> Result<Results>;

    async fn remove_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        allow_deps: bool,
        autoremove: bool,
        options: &Options,
    ) -> Result<Results>;

    async fn update_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        options: &Options,
    ) -> Result<Results>;

    async fn get_update_detail(&self, ids: &[PackageId], options: &Options) -> Result<Results>;

    async fn get_details(&self, ids: &[PackageId], options: &Options) -> Result<Results>;

    async fn depends_on(
        &self,
        filters: Filters,
        ids: &[PackageId],
        recursive: bool,
        options: &Options,
    ) -> Result<Results>;

    /// Time since `role` last completed, `None` if it never ran.
    async fn time_since_action(&self, role: Role) -> Result<Option<Duration>>;

    async fn network_state(&self) -> Result<Network>;

    async fn is_locked(&self) -> Result<bool>;
}
