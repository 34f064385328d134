pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod flatpak;
pub mod install;
pub mod keyfile;
pub mod logging;
pub mod notification;
pub mod offline;
pub mod packagekit;
pub mod policy;
pub mod power;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod updates;
pub mod updates_manager;

pub const APP_ID: &str = "io.github.xings.Software";
pub const APP_NAME: &str = "Xings Software";
