//! PackageKit enumerations as they travel over D-Bus (plain `u32`/`u64`).

use serde::{Deserialize, Serialize};

macro_rules! pk_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $value:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn from_u32(value: u32) -> Self {
                match value {
                    $($value => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }

            pub fn as_u32(self) -> u32 {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn from_str_name(text: &str) -> Self {
                match text {
                    $($text => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

pk_enum! {
    /// Kind of a `Package` signal: install state or update severity.
    pub enum Info {
        Unknown = 0 => "unknown",
        Installed = 1 => "installed",
        Available = 2 => "available",
        Low = 3 => "low",
        Enhancement = 4 => "enhancement",
        Normal = 5 => "normal",
        Bugfix = 6 => "bugfix",
        Important = 7 => "important",
        Security = 8 => "security",
        Blocked = 9 => "blocked",
        Downloading = 10 => "downloading",
        Updating = 11 => "updating",
        Installing = 12 => "installing",
        Removing = 13 => "removing",
        Cleanup = 14 => "cleanup",
        Obsoleting = 15 => "obsoleting",
        CollectionInstalled = 16 => "collection-installed",
        CollectionAvailable = 17 => "collection-available",
        Finished = 18 => "finished",
        Reinstalling = 19 => "reinstalling",
        Downgrading = 20 => "downgrading",
        Preparing = 21 => "preparing",
        Decompressing = 22 => "decompressing",
        Untrusted = 23 => "untrusted",
        Trusted = 24 => "trusted",
        Unavailable = 25 => "unavailable",
        Critical = 26 => "critical",
    }
}

impl Info {
    /// Rank used to order updates; zero for infos that are not update kinds.
    pub fn severity(self) -> u8 {
        match self {
            Info::Critical => 7,
            Info::Security => 6,
            Info::Important => 5,
            Info::Bugfix => 4,
            Info::Normal => 3,
            Info::Enhancement => 2,
            Info::Low => 1,
            _ => 0,
        }
    }

    pub fn is_update_severity(self) -> bool {
        self.severity() > 0
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, Info::Critical | Info::Security)
    }
}

pk_enum! {
    pub enum Exit {
        Unknown = 0 => "unknown",
        Success = 1 => "success",
        Failed = 2 => "failed",
        Cancelled = 3 => "cancelled",
        KeyRequired = 4 => "key-required",
        EulaRequired = 5 => "eula-required",
        Killed = 6 => "killed",
        MediaChangeRequired = 7 => "media-change-required",
        NeedUntrusted = 8 => "need-untrusted",
        CancelledPriority = 9 => "cancelled-priority",
        SkipTransaction = 10 => "skip-transaction",
        RepairRequired = 11 => "repair-required",
    }
}

pk_enum! {
    pub enum Restart {
        Unknown = 0 => "unknown",
        None = 1 => "none",
        Application = 2 => "application",
        Session = 3 => "session",
        System = 4 => "system",
        SecuritySession = 5 => "security-session",
        SecuritySystem = 6 => "security-system",
    }
}

impl Restart {
    /// System restarts outrank session restarts, security variants outrank plain ones.
    pub fn rank(self) -> u8 {
        match self {
            Restart::Unknown | Restart::None => 0,
            Restart::Application => 1,
            Restart::Session => 2,
            Restart::SecuritySession => 3,
            Restart::System => 4,
            Restart::SecuritySystem => 5,
        }
    }

    pub fn needs_reboot(self) -> bool {
        matches!(self, Restart::System | Restart::SecuritySystem)
    }

    pub fn needs_logout(self) -> bool {
        matches!(self, Restart::Session | Restart::SecuritySession)
    }

    pub fn max(self, other: Restart) -> Restart {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

pk_enum! {
    pub enum Role {
        Unknown = 0 => "unknown",
        Cancel = 1 => "cancel",
        DependsOn = 2 => "depends-on",
        GetDetails = 3 => "get-details",
        GetFiles = 4 => "get-files",
        GetPackages = 5 => "get-packages",
        GetRepoList = 6 => "get-repo-list",
        RequiredBy = 7 => "required-by",
        GetUpdateDetail = 8 => "get-update-detail",
        GetUpdates = 9 => "get-updates",
        InstallFiles = 10 => "install-files",
        InstallPackages = 11 => "install-packages",
        InstallSignature = 12 => "install-signature",
        RefreshCache = 13 => "refresh-cache",
        RemovePackages = 14 => "remove-packages",
        RepoEnable = 15 => "repo-enable",
        RepoSetData = 16 => "repo-set-data",
        Resolve = 17 => "resolve",
        SearchDetails = 18 => "search-details",
        SearchFile = 19 => "search-file",
        SearchGroup = 20 => "search-group",
        SearchName = 21 => "search-name",
        UpdatePackages = 22 => "update-packages",
        WhatProvides = 23 => "what-provides",
        AcceptEula = 24 => "accept-eula",
        DownloadPackages = 25 => "download-packages",
        GetDistroUpgrades = 26 => "get-distro-upgrades",
        GetCategories = 27 => "get-categories",
        GetOldTransactions = 28 => "get-old-transactions",
        RepairSystem = 29 => "repair-system",
        GetDetailsLocal = 30 => "get-details-local",
        GetFilesLocal = 31 => "get-files-local",
        RepoRemove = 32 => "repo-remove",
        UpgradeSystem = 33 => "upgrade-system",
    }
}

pk_enum! {
    pub enum Status {
        Unknown = 0 => "unknown",
        Wait = 1 => "wait",
        Setup = 2 => "setup",
        Running = 3 => "running",
        Query = 4 => "query",
        Info = 5 => "info",
        Remove = 6 => "remove",
        RefreshCache = 7 => "refresh-cache",
        Download = 8 => "download",
        Install = 9 => "install",
        Update = 10 => "update",
        Cleanup = 11 => "cleanup",
        Obsolete = 12 => "obsolete",
        DepResolve = 13 => "dep-resolve",
        SigCheck = 14 => "sig-check",
        TestCommit = 15 => "test-commit",
        Commit = 16 => "commit",
        Request = 17 => "request",
        Finished = 18 => "finished",
        Cancel = 19 => "cancel",
        DownloadRepository = 20 => "download-repository",
        DownloadPackagelist = 21 => "download-packagelist",
        DownloadFilelist = 22 => "download-filelist",
        DownloadChangelog = 23 => "download-changelog",
        DownloadGroup = 24 => "download-group",
        DownloadUpdateinfo = 25 => "download-updateinfo",
        Repackaging = 26 => "repackaging",
        LoadingCache = 27 => "loading-cache",
        ScanApplications = 28 => "scan-applications",
        GeneratePackageList = 29 => "generate-package-list",
        WaitingForLock = 30 => "waiting-for-lock",
        WaitingForAuth = 31 => "waiting-for-auth",
        ScanProcessList = 32 => "scan-process-list",
        CheckExecutableFiles = 33 => "check-executable-files",
        CheckLibraries = 34 => "check-libraries",
        CopyFiles = 35 => "copy-files",
        RunHook = 36 => "run-hook",
    }
}

impl Status {
    /// Short human label for progress lines.
    pub fn label(self) -> &'static str {
        match self {
            Status::Wait | Status::WaitingForLock => "Waiting in queue",
            Status::WaitingForAuth => "Waiting for authentication",
            Status::Setup | Status::Running => "Starting",
            Status::Query | Status::Info => "Querying",
            Status::Remove => "Removing packages",
            Status::RefreshCache | Status::LoadingCache => "Refreshing software list",
            Status::Download
            | Status::DownloadRepository
            | Status::DownloadPackagelist
            | Status::DownloadFilelist
            | Status::DownloadChangelog
            | Status::DownloadGroup
            | Status::DownloadUpdateinfo => "Downloading",
            Status::Install => "Installing packages",
            Status::Update => "Updating packages",
            Status::Cleanup => "Cleaning up",
            Status::DepResolve => "Resolving dependencies",
            Status::SigCheck => "Checking signatures",
            Status::TestCommit => "Testing changes",
            Status::Commit => "Committing changes",
            Status::Finished => "Finished",
            Status::Cancel => "Cancelling",
            _ => "Working",
        }
    }
}

pk_enum! {
    pub enum Network {
        Unknown = 0 => "unknown",
        Offline = 1 => "offline",
        Online = 2 => "online",
        Wired = 3 => "wired",
        Wifi = 4 => "wifi",
        Mobile = 5 => "mobile",
    }
}

pk_enum! {
    pub enum UpdateState {
        Unknown = 0 => "unknown",
        Stable = 1 => "stable",
        Unstable = 2 => "unstable",
        Testing = 3 => "testing",
    }
}

pk_enum! {
    pub enum ErrorCode {
        Unknown = 0 => "unknown",
        OutOfMemory = 1 => "out-of-memory",
        NoNetwork = 2 => "no-network",
        NotSupported = 3 => "not-supported",
        InternalError = 4 => "internal-error",
        GpgFailure = 5 => "gpg-failure",
        PackageIdInvalid = 6 => "package-id-invalid",
        PackageNotInstalled = 7 => "package-not-installed",
        PackageNotFound = 8 => "package-not-found",
        PackageAlreadyInstalled = 9 => "package-already-installed",
        PackageDownloadFailed = 10 => "package-download-failed",
        GroupNotFound = 11 => "group-not-found",
        GroupListInvalid = 12 => "group-list-invalid",
        DepResolutionFailed = 13 => "dep-resolution-failed",
        FilterInvalid = 14 => "filter-invalid",
        CreateThreadFailed = 15 => "create-thread-failed",
        TransactionError = 16 => "transaction-error",
        TransactionCancelled = 17 => "transaction-cancelled",
        NoCache = 18 => "no-cache",
        RepoNotFound = 19 => "repo-not-found",
        CannotRemoveSystemPackage = 20 => "cannot-remove-system-package",
        ProcessKill = 21 => "process-kill",
        FailedInitialization = 22 => "failed-initialization",
        FailedFinalise = 23 => "failed-finalise",
        FailedConfigParsing = 24 => "failed-config-parsing",
        CannotCancel = 25 => "cannot-cancel",
        CannotGetLock = 26 => "cannot-get-lock",
        NoPackagesToUpdate = 27 => "no-packages-to-update",
        CannotWriteRepoConfig = 28 => "cannot-write-repo-config",
        LocalInstallFailed = 29 => "local-install-failed",
        BadGpgSignature = 30 => "bad-gpg-signature",
        MissingGpgSignature = 31 => "missing-gpg-signature",
        CannotInstallSourcePackage = 32 => "cannot-install-source-package",
        RepoConfigurationError = 33 => "repo-configuration-error",
        NoLicenseAgreement = 34 => "no-license-agreement",
        FileConflicts = 35 => "file-conflicts",
        PackageConflicts = 36 => "package-conflicts",
        RepoNotAvailable = 37 => "repo-not-available",
        InvalidPackageFile = 38 => "invalid-package-file",
        PackageInstallBlocked = 39 => "package-install-blocked",
        PackageCorrupt = 40 => "package-corrupt",
        AllPackagesAlreadyInstalled = 41 => "all-packages-already-installed",
        FileNotFound = 42 => "file-not-found",
        NoMoreMirrorsToTry = 43 => "no-more-mirrors-to-try",
        NoDistroUpgradeData = 44 => "no-distro-upgrade-data",
        IncompatibleArchitecture = 45 => "incompatible-architecture",
        NoSpaceOnDevice = 46 => "no-space-on-device",
        MediaChangeRequired = 47 => "media-change-required",
        NotAuthorized = 48 => "not-authorized",
        UpdateNotFound = 49 => "update-not-found",
        CannotInstallRepoUnsigned = 50 => "cannot-install-repo-unsigned",
        CannotUpdateRepoUnsigned = 51 => "cannot-update-repo-unsigned",
        CannotGetFilelist = 52 => "cannot-get-filelist",
        CannotGetRequires = 53 => "cannot-get-requires",
        CannotDisableRepository = 54 => "cannot-disable-repository",
        RestrictedDownload = 55 => "restricted-download",
        PackageFailedToConfigure = 56 => "package-failed-to-configure",
        PackageFailedToBuild = 57 => "package-failed-to-build",
        PackageFailedToInstall = 58 => "package-failed-to-install",
        PackageFailedToRemove = 59 => "package-failed-to-remove",
        UpdateFailedDueToRunningProcess = 60 => "update-failed-due-to-running-process",
        PackageDatabaseChanged = 61 => "package-database-changed",
        ProvideTypeNotSupported = 62 => "provide-type-not-supported",
        InstallRootInvalid = 63 => "install-root-invalid",
        CannotFetchSources = 64 => "cannot-fetch-sources",
        CancelledPriority = 65 => "cancelled-priority",
        UnfinishedTransaction = 66 => "unfinished-transaction",
        LockRequired = 67 => "lock-required",
        RepoAlreadySet = 68 => "repo-already-set",
    }
}

macro_rules! pk_bitfield {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(const $flag:ident = $bit:literal => $text:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const NONE: $name = $name(0);
            $(pub const $flag: $name = $name(1 << $bit);)+

            pub fn bits(self) -> u64 {
                self.0
            }

            pub fn from_bits(bits: u64) -> Self {
                $name(bits)
            }

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub fn names(self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.contains($name::$flag) {
                        names.push($text);
                    }
                )+
                names
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_empty() {
                    return write!(f, "none");
                }
                write!(f, "{}", self.names().join(";"))
            }
        }
    };
}

pk_bitfield! {
    /// Search and resolve filters.
    pub struct Filters {
        const INSTALLED = 2 => "installed";
        const NOT_INSTALLED = 3 => "~installed";
        const DEVELOPMENT = 4 => "devel";
        const NOT_DEVELOPMENT = 5 => "~devel";
        const GUI = 6 => "gui";
        const NOT_GUI = 7 => "~gui";
        const FREE = 8 => "free";
        const NOT_FREE = 9 => "~free";
        const VISIBLE = 10 => "visible";
        const NOT_VISIBLE = 11 => "~visible";
        const SUPPORTED = 12 => "supported";
        const NOT_SUPPORTED = 13 => "~supported";
        const BASENAME = 14 => "basename";
        const NOT_BASENAME = 15 => "~basename";
        const NEWEST = 16 => "newest";
        const NOT_NEWEST = 17 => "~newest";
        const ARCH = 18 => "arch";
        const NOT_ARCH = 19 => "~arch";
        const SOURCE = 20 => "source";
        const NOT_SOURCE = 21 => "~source";
        const COLLECTIONS = 22 => "collections";
        const NOT_COLLECTIONS = 23 => "~collections";
        const APPLICATION = 24 => "application";
        const NOT_APPLICATION = 25 => "~application";
        const DOWNLOADED = 26 => "downloaded";
        const NOT_DOWNLOADED = 27 => "~downloaded";
    }
}

pk_bitfield! {
    /// Flags for transactions that change the system.
    pub struct TransactionFlags {
        const ONLY_TRUSTED = 1 => "only-trusted";
        const SIMULATE = 2 => "simulate";
        const ONLY_DOWNLOAD = 3 => "only-download";
        const ALLOW_REINSTALL = 4 => "allow-reinstall";
        const JUST_REINSTALL = 5 => "just-reinstall";
        const ALLOW_DOWNGRADE = 6 => "allow-downgrade";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_values_map_to_unknown() {
        assert_eq!(Info::from_u32(8), Info::Security);
        assert_eq!(Info::from_u32(999), Info::Unknown);
        assert_eq!(ErrorCode::from_u32(48), ErrorCode::NotAuthorized);
        assert_eq!(Network::from_u32(42), Network::Unknown);
    }

    #[test]
    fn severity_orders_critical_first() {
        assert!(Info::Critical.severity() > Info::Security.severity());
        assert!(Info::Security.severity() > Info::Important.severity());
        assert!(Info::Low.severity() > Info::Installed.severity());
        assert!(!Info::Available.is_update_severity());
    }

    #[test]
    fn restart_max_prefers_system() {
        assert_eq!(Restart::Session.max(Restart::System), Restart::System);
        assert_eq!(Restart::SecuritySystem.max(Restart::Session), Restart::SecuritySystem);
        assert_eq!(Restart::None.max(Restart::Application), Restart::Application);
        assert!(Restart::SecuritySession.needs_logout());
        assert!(!Restart::Application.needs_reboot());
    }

    #[test]
    fn bitfields_combine_and_render() {
        let filters = Filters::NOT_INSTALLED | Filters::NEWEST | Filters::ARCH;
        assert_eq!(filters.bits(), (1 << 3) | (1 << 16) | (1 << 18));
        assert!(filters.contains(Filters::NEWEST));
        assert!(!filters.contains(Filters::INSTALLED));
        assert_eq!(filters.to_string(), "~installed;newest;arch");
        assert_eq!(TransactionFlags::NONE.to_string(), "none");
        assert_eq!(TransactionFlags::SIMULATE.bits(), 4);
    }
}
