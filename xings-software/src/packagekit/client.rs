use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use zbus::Connection;

use super::proxy::{OfflineProxy, PackageKitProxy, TransactionProxy};
use super::transaction::{self, Options};
use super::{Filters, Network, PackageId, Results, Role, TransactionFlags};
use crate::backend::PackageBackend;

/// PackageKit on the system bus.
#[derive(Clone)]
pub struct Client {
    connection: Connection,
    packagekit: PackageKitProxy<'static>,
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn ids_to_strings(ids: &[PackageId]) -> Vec<String> {
    ids.iter().map(PackageId::to_string).collect()
}

fn paths_to_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.to_string_lossy().into_owned()).collect()
}

impl Client {
    pub async fn connect() -> Result<Self> {
        let connection = Connection::system()
            .await
            .context("Failed to connect to the system bus")?;
        let packagekit = PackageKitProxy::new(&connection).await?;
        Ok(Self {
            connection,
            packagekit,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn proxy(&self) -> &PackageKitProxy<'static> {
        &self.packagekit
    }

    pub async fn offline(&self) -> Result<OfflineProxy<'static>> {
        Ok(OfflineProxy::new(&self.connection).await?)
    }

    pub async fn backend_name(&self) -> Result<String> {
        Ok(self.packagekit.backend_name().await?)
    }

    async fn run_with_strings(
        &self,
        options: &Options,
        values: Vec<String>,
        call: impl FnOnce(TransactionProxy<'static>, Vec<String>) -> BoxFuture<'static, zbus::Result<()>>,
    ) -> Result<Results> {
        let results = transaction::run(&self.connection, &self.packagekit, options, move |tx| {
            call(tx, values)
        })
        .await?;
        Ok(results.into_result()?)
    }
}

macro_rules! string_call {
    ($self:ident, $options:ident, $values:expr, |$tx:ident, $refs:ident| $body:expr) => {
        $self
            .run_with_strings($options, $values, move |$tx, owned| {
                Box::pin(async move {
                    let $refs = as_strs(&owned);
                    $body.await
                })
            })
            .await
    };
}

#[async_trait]
impl PackageBackend for Client {
    async fn get_updates(&self, filters: Filters, options: &Options) -> Result<Results> {
        string_call!(self, options, Vec::new(), |tx, _refs| tx.get_updates(filters.bits()))
    }

    async fn refresh_cache(&self, force: bool, options: &Options) -> Result<Results> {
        string_call!(self, options, Vec::new(), |tx, _refs| tx.refresh_cache(force))
    }

    async fn resolve(&self, filters: Filters, names: &[String], options: &Options) -> Result<Results> {
        string_call!(self, options, names.to_vec(), |tx, refs| tx
            .resolve(filters.bits(), &refs))
    }

    async fn search_names(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results> {
        string_call!(self, options, values.to_vec(), |tx, refs| tx
            .search_names(filters.bits(), &refs))
    }

    async fn search_files(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results> {
        string_call!(self, options, values.to_vec(), |tx, refs| tx
            .search_files(filters.bits(), &refs))
    }

    async fn search_details(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results> {
        string_call!(self, options, values.to_vec(), |tx, refs| tx
            .search_details(filters.bits(), &refs))
    }

    async fn what_provides(&self, filters: Filters, values: &[String], options: &Options) -> Result<Results> {
        string_call!(self, options, values.to_vec(), |tx, refs| tx
            .what_provides(filters.bits(), &refs))
    }

    async fn install_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        options: &Options,
    ) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx
            .install_packages(flags.bits(), &refs))
    }

    async fn install_files(
        &self,
        flags: TransactionFlags,
        paths: &[PathBuf],
        options: &Options,
    ) -> Result<Results> {
        string_call!(self, options, paths_to_strings(paths), |tx, refs| tx
            .install_files(flags.bits(), &refs))
    }

    async fn remove_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        allow_deps: bool,
        autoremove: bool,
        options: &Options,
    ) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx
            .remove_packages(flags.bits(), &refs, allow_deps, autoremove))
    }

    async fn update_packages(
        &self,
        flags: TransactionFlags,
        ids: &[PackageId],
        options: &Options,
    ) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx
            .update_packages(flags.bits(), &refs))
    }

    async fn get_update_detail(&self, ids: &[PackageId], options: &Options) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx
            .get_update_detail(&refs))
    }

    async fn get_details(&self, ids: &[PackageId], options: &Options) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx.get_details(&refs))
    }

    async fn depends_on(
        &self,
        filters: Filters,
        ids: &[PackageId],
        recursive: bool,
        options: &Options,
    ) -> Result<Results> {
        string_call!(self, options, ids_to_strings(ids), |tx, refs| tx
            .depends_on(filters.bits(), &refs, recursive))
    }

    async fn time_since_action(&self, role: Role) -> Result<Option<Duration>> {
        let seconds = self.packagekit.get_time_since_action(role.as_u32()).await?;
        Ok((seconds != u32::MAX).then(|| Duration::from_secs(u64::from(seconds))))
    }

    async fn network_state(&self) -> Result<Network> {
        Ok(Network::from_u32(self.packagekit.network_state().await?))
    }

    async fn is_locked(&self) -> Result<bool> {
        Ok(self.packagekit.locked().await?)
    }
}
