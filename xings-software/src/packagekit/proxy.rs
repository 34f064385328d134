//! zbus proxies for the PackageKit system service.
//!
//! See <https://www.freedesktop.org/software/PackageKit/gtk-doc/api-reference.html>

use std::collections::HashMap;

use zbus::proxy;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};

#[proxy(
    default_service = "org.freedesktop.PackageKit",
    default_path = "/org/freedesktop/PackageKit",
    interface = "org.freedesktop.PackageKit",
    gen_blocking = false
)]
pub trait PackageKit {
    fn create_transaction(&self) -> zbus::Result<OwnedObjectPath>;

    /// Seconds since `role` last ran successfully, `u32::MAX` when never.
    fn get_time_since_action(&self, role: u32) -> zbus::Result<u32>;

    #[zbus(signal)]
    fn updates_changed(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn restart_schedule(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn network_state(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn locked(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn backend_name(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn version_major(&self) -> zbus::Result<u32>;
}

#[proxy(
    default_service = "org.freedesktop.PackageKit",
    interface = "org.freedesktop.PackageKit.Transaction",
    gen_blocking = false
)]
pub trait Transaction {
    fn set_hints(&self, hints: &[&str]) -> zbus::Result<()>;

    fn get_updates(&self, filter: u64) -> zbus::Result<()>;

    fn refresh_cache(&self, force: bool) -> zbus::Result<()>;

    fn resolve(&self, filter: u64, packages: &[&str]) -> zbus::Result<()>;

    fn search_names(&self, filter: u64, values: &[&str]) -> zbus::Result<()>;

    fn search_files(&self, filter: u64, values: &[&str]) -> zbus::Result<()>;

    fn search_details(&self, filter: u64, values: &[&str]) -> zbus::Result<()>;

    fn what_provides(&self, filter: u64, values: &[&str]) -> zbus::Result<()>;

    fn install_packages(&self, transaction_flags: u64, package_ids: &[&str]) -> zbus::Result<()>;

    fn install_files(&self, transaction_flags: u64, full_paths: &[&str]) -> zbus::Result<()>;

    fn remove_packages(
        &self,
        transaction_flags: u64,
        package_ids: &[&str],
        allow_deps: bool,
        autoremove: bool,
    ) -> zbus::Result<()>;

    fn update_packages(&self, transaction_flags: u64, package_ids: &[&str]) -> zbus::Result<()>;

    fn get_update_detail(&self, package_ids: &[&str]) -> zbus::Result<()>;

    fn get_details(&self, package_ids: &[&str]) -> zbus::Result<()>;

    fn depends_on(&self, filter: u64, package_ids: &[&str], recursive: bool) -> zbus::Result<()>;

    fn cancel(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn package(&self, info: u32, package_id: String, summary: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn details(&self, data: HashMap<String, OwnedValue>) -> zbus::Result<()>;

    #[zbus(signal)]
    fn update_detail(
        &self,
        package_id: String,
        updates: Vec<String>,
        obsoletes: Vec<String>,
        vendor_urls: Vec<String>,
        bugzilla_urls: Vec<String>,
        cve_urls: Vec<String>,
        restart: u32,
        update_text: String,
        changelog: String,
        state: u32,
        issued: String,
        updated: String,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    fn error_code(&self, code: u32, details: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn require_restart(&self, restart_type: u32, package_id: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn item_progress(&self, id: String, status: u32, percentage: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn finished(&self, exit: u32, runtime: u32) -> zbus::Result<()>;

    #[zbus(property)]
    fn status(&self) -> zbus::Result<u32>;

    /// 0-100, or 101 when unknown.
    #[zbus(property)]
    fn percentage(&self) -> zbus::Result<u32>;
}

#[proxy(
    default_service = "org.freedesktop.PackageKit",
    default_path = "/org/freedesktop/PackageKit",
    interface = "org.freedesktop.PackageKit.Offline",
    gen_blocking = false
)]
pub trait Offline {
    /// `action` is `reboot` or `power-off`.
    fn trigger(&self, action: &str) -> zbus::Result<()>;

    fn cancel(&self) -> zbus::Result<()>;

    fn clear_results(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn update_prepared(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn trigger_action(&self) -> zbus::Result<String>;
}
