//! Thin client for the `org.freedesktop.PackageKit` system service.

pub mod client;
pub mod enums;
pub mod package_id;
pub mod proxy;
pub mod transaction;

pub use client::Client;
pub use enums::{
    ErrorCode, Exit, Filters, Info, Network, Restart, Role, Status, TransactionFlags, UpdateState,
};
pub use package_id::PackageId;
pub use transaction::{Cancellable, Progress, Results};
