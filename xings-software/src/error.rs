use thiserror::Error;

use crate::packagekit::ErrorCode;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transaction failed ({code}): {details}")]
    Transaction { code: ErrorCode, details: String },

    #[error("transaction was cancelled")]
    Cancelled,

    #[error("could not find {}", .0.join(", "))]
    NotFound(Vec<String>),

    #[error("already installed: {}", .0.join(", "))]
    AlreadyInstalled(Vec<String>),

    #[error("invalid package id `{0}`")]
    InvalidPackageId(String),

    #[error("invalid flatpak ref: {0}")]
    InvalidFlatpakRef(String),

    #[error("no session manager is available")]
    NoSessionManager,

    #[error("flatpak exited with status {status}: {stderr}")]
    Flatpak { status: i32, stderr: String },

    #[error("the request was declined")]
    Declined,
}

const NOT_AUTHORIZED: &str =
    "You don't have the necessary privileges to perform this action.";

/// D-Bus error names that mean the user was not allowed to do something.
const DBUS_PERMISSION_ERRORS: &[&str] = &[
    "org.freedesktop.DBus.Error.AccessDenied",
    "org.freedesktop.DBus.Error.AuthFailed",
    "org.freedesktop.DBus.Error.InteractiveAuthorizationRequired",
    "org.freedesktop.PackageKit.Transaction.RefusedByPolicy",
    "org.freedesktop.PackageKit.Transaction.NotAuthorized",
];

/// Renders an error chain as a sentence fit for a dialog or notification.
pub fn user_message(error: &anyhow::Error) -> String {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<Error>() {
            return match err {
                Error::Transaction { code, details } => {
                    let text = error_code_message(*code);
                    if details.is_empty() || *code == ErrorCode::NotAuthorized {
                        text.to_string()
                    } else {
                        format!("{} {}", text, details)
                    }
                }
                Error::Cancelled => "The action was cancelled.".to_string(),
                Error::NotFound(names) => {
                    format!("The following packages could not be found: {}", names.join(", "))
                }
                Error::AlreadyInstalled(names) => {
                    format!("The following packages are already installed: {}", names.join(", "))
                }
                other => other.to_string(),
            };
        }
        if let Some(zbus::Error::MethodError(name, _, _)) = cause.downcast_ref::<zbus::Error>() {
            if DBUS_PERMISSION_ERRORS.contains(&name.as_str()) {
                return NOT_AUTHORIZED.to_string();
            }
        }
        if let Some(zbus::fdo::Error::AccessDenied(_) | zbus::fdo::Error::AuthFailed(_)) =
            cause.downcast_ref::<zbus::fdo::Error>()
        {
            return NOT_AUTHORIZED.to_string();
        }
    }

    format!("{:#}", error)
}

pub fn error_code_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::NotAuthorized => NOT_AUTHORIZED,
        ErrorCode::OutOfMemory => "The system ran out of memory.",
        ErrorCode::NoNetwork => "No network connection was available.",
        ErrorCode::NotSupported => "This action is not supported by the package backend.",
        ErrorCode::GpgFailure | ErrorCode::BadGpgSignature | ErrorCode::MissingGpgSignature => {
            "The package signature could not be verified."
        }
        ErrorCode::PackageIdInvalid => "The package identifier was not well formed.",
        ErrorCode::PackageNotInstalled => "The package is not installed.",
        ErrorCode::PackageNotFound | ErrorCode::UpdateNotFound => "The package could not be found.",
        ErrorCode::PackageAlreadyInstalled | ErrorCode::AllPackagesAlreadyInstalled => {
            "The package is already installed."
        }
        ErrorCode::PackageDownloadFailed | ErrorCode::NoMoreMirrorsToTry => {
            "The package download failed."
        }
        ErrorCode::DepResolutionFailed => "The package dependencies could not be resolved.",
        ErrorCode::TransactionCancelled | ErrorCode::CancelledPriority => {
            "The action was cancelled."
        }
        ErrorCode::NoCache => "The package list needs to be rebuilt.",
        ErrorCode::RepoNotFound | ErrorCode::RepoNotAvailable => {
            "A software source could not be reached."
        }
        ErrorCode::CannotRemoveSystemPackage => "A package required by the system cannot be removed.",
        ErrorCode::CannotGetLock | ErrorCode::LockRequired => {
            "Another package manager is currently running."
        }
        ErrorCode::NoPackagesToUpdate => "There are no packages to update.",
        ErrorCode::LocalInstallFailed | ErrorCode::InvalidPackageFile => {
            "The local file could not be installed."
        }
        ErrorCode::NoLicenseAgreement => "The license agreement was not accepted.",
        ErrorCode::FileConflicts | ErrorCode::PackageConflicts => {
            "The packages conflict with installed software."
        }
        ErrorCode::PackageInstallBlocked => "Installation of the package was blocked.",
        ErrorCode::PackageCorrupt => "The package is corrupt.",
        ErrorCode::FileNotFound => "The file could not be found.",
        ErrorCode::IncompatibleArchitecture => "The package is not compatible with this computer.",
        ErrorCode::NoSpaceOnDevice => "There is not enough disk space.",
        ErrorCode::MediaChangeRequired => "Additional media is required.",
        ErrorCode::CannotInstallRepoUnsigned | ErrorCode::CannotUpdateRepoUnsigned => {
            "The software source is not signed."
        }
        ErrorCode::UpdateFailedDueToRunningProcess => {
            "The update could not be applied because an application is still running."
        }
        ErrorCode::PackageDatabaseChanged => "The package database changed during the action.",
        ErrorCode::UnfinishedTransaction => "A previous package action did not finish.",
        _ => "The package action failed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_errors_render_code_text_and_details() {
        let err = anyhow::Error::new(Error::Transaction {
            code: ErrorCode::NoNetwork,
            details: "mirror timed out".into(),
        });
        assert_eq!(
            user_message(&err),
            "No network connection was available. mirror timed out"
        );
    }

    #[test]
    fn not_authorized_hides_backend_details() {
        let err = anyhow::Error::new(Error::Transaction {
            code: ErrorCode::NotAuthorized,
            details: "polkit said no".into(),
        })
        .context("installing packages");
        assert_eq!(user_message(&err), NOT_AUTHORIZED);
    }

    #[test]
    fn fdo_access_denied_is_special_cased() {
        let err = anyhow::Error::new(zbus::fdo::Error::AccessDenied("nope".into()));
        assert_eq!(user_message(&err), NOT_AUTHORIZED);
    }

    #[test]
    fn other_errors_fall_back_to_chain() {
        let err = anyhow::anyhow!("disk on fire").context("checking updates");
        assert_eq!(user_message(&err), "checking updates: disk on fire");
    }
}
