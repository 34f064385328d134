//! Installing applications from `.flatpakref` files.
//!
//! Flatpak has its own transaction machinery, so this module drives the
//! `flatpak` command rather than PackageKit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::error::Error;
use crate::keyfile::KeyFile;

const REF_GROUP: &str = "Flatpak Ref";
const DEFAULT_BRANCH: &str = "master";
const MAX_ID_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatpakRef {
    pub name: String,
    pub branch: String,
    pub url: String,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub icon: Option<String>,
    pub is_runtime: bool,
    pub gpg_key: Option<String>,
    pub runtime_repo: Option<String>,
    pub suggest_remote_name: Option<String>,
}

fn id_element_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static regex"))
}

fn base64_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9+/\s]+={0,2}$").expect("static regex"))
}

fn branch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("static regex"))
}

/// Reverse-DNS application id with at least three elements.
pub fn is_valid_app_id(id: &str) -> bool {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return false;
    }
    let elements: Vec<&str> = id.split('.').collect();
    elements.len() >= 3 && elements.iter().all(|e| id_element_re().is_match(e))
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidFlatpakRef(message.into())
}

impl FlatpakRef {
    pub fn parse(text: &str) -> Result<Self> {
        let kf = KeyFile::parse(text).map_err(|e| invalid(format!("{:#}", e)))?;
        if !kf.has_group(REF_GROUP) {
            return Err(invalid(format!("missing [{}] group", REF_GROUP)).into());
        }
        let optional = |key: &str| {
            kf.get(REF_GROUP, key)
                .map(str::to_string)
                .filter(|value| !value.is_empty())
        };

        let name = optional("Name").ok_or_else(|| invalid("missing Name"))?;
        if !is_valid_app_id(&name) {
            return Err(invalid(format!("`{}` is not a valid application id", name)).into());
        }

        let url = optional("Url").ok_or_else(|| invalid("missing Url"))?;
        let scheme_ok = ["http://", "https://", "file://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        if !scheme_ok {
            return Err(invalid(format!("unsupported repository URL `{}`", url)).into());
        }

        let branch = optional("Branch").unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        if !branch_re().is_match(&branch) {
            return Err(invalid(format!("`{}` is not a valid branch", branch)).into());
        }

        let gpg_key = optional("GPGKey");
        if let Some(key) = &gpg_key {
            if !base64_re().is_match(key) {
                return Err(invalid("GPGKey is not base64").into());
            }
        }

        let is_runtime = kf
            .get_bool(REF_GROUP, "IsRuntime")
            .map_err(|e| invalid(e.to_string()))?
            .unwrap_or(false);

        Ok(Self {
            name,
            branch,
            url,
            title: optional("Title"),
            comment: optional("Comment"),
            description: optional("Description"),
            homepage: optional("Homepage"),
            icon: optional("Icon"),
            is_runtime,
            gpg_key,
            runtime_repo: optional("RuntimeRepo"),
            suggest_remote_name: optional("SuggestRemoteName"),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn kind(&self) -> &'static str {
        if self.is_runtime {
            "runtime"
        } else {
            "app"
        }
    }

    /// `app/<name>/<arch>/<branch>`
    pub fn ref_string(&self, arch: &str) -> String {
        format!("{}/{}/{}/{}", self.kind(), self.name, arch, self.branch)
    }

    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

/// Flatpak's spelling of the machine architecture.
pub fn default_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i386",
        "powerpc64" => "ppc64le",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    User,
    System,
}

impl Installation {
    fn flag(self) -> &'static str {
        match self {
            Installation::User => "--user",
            Installation::System => "--system",
        }
    }
}

pub struct FlatpakInstaller {
    program: PathBuf,
    installation: Installation,
}

impl FlatpakInstaller {
    pub fn new(installation: Installation) -> Self {
        Self {
            program: PathBuf::from("flatpak"),
            installation,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn install_args(&self, path: &Path) -> Vec<String> {
        vec![
            "install".to_string(),
            "--noninteractive".to_string(),
            self.installation.flag().to_string(),
            "--from".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }

    pub async fn is_installed(&self, flatpak_ref: &FlatpakRef) -> Result<bool> {
        let status = TokioCommand::new(&self.program)
            .arg("info")
            .arg(self.installation.flag())
            .arg(format!("{}//{}", flatpak_ref.name, flatpak_ref.branch))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        Ok(status.success())
    }

    /// Returns `Ok(false)` when the ref was already installed.
    pub async fn install(&self, path: &Path, flatpak_ref: &FlatpakRef) -> Result<bool> {
        if self.is_installed(flatpak_ref).await? {
            info!("{} is already installed", flatpak_ref.name);
            return Ok(false);
        }

        let args = self.install_args(path);
        debug!("Running {} {}", self.program.display(), args.join(" "));
        let output = TokioCommand::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            return Err(Error::Flatpak {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        info!("Installed {}", flatpak_ref.ref_string(default_arch()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIMP_REF: &str = "[Flatpak Ref]
Title=GNU Image Manipulation Program
Name=org.gimp.GIMP
Branch=stable
Url=https://dl.flathub.org/repo/
SuggestRemoteName=flathub
Homepage=https://www.gimp.org/
Icon=https://dl.flathub.org/repo/logo.svg
RuntimeRepo=https://dl.flathub.org/repo/flathub.flatpakrepo
IsRuntime=false
GPGKey=mQINBFlD2sABEADsiUZUOYBg1UdDaWkEdJYkTSZD68214m8Q1fbrP5AptaUfCl8K
";

    #[test]
    fn parses_a_flathub_ref() {
        let r = FlatpakRef::parse(GIMP_REF).unwrap();
        assert_eq!(r.name, "org.gimp.GIMP");
        assert_eq!(r.branch, "stable");
        assert_eq!(r.suggest_remote_name.as_deref(), Some("flathub"));
        assert!(!r.is_runtime);
        assert_eq!(r.ref_string("x86_64"), "app/org.gimp.GIMP/x86_64/stable");
        assert_eq!(r.display_name(), "GNU Image Manipulation Program");
    }

    #[test]
    fn branch_defaults_to_master() {
        let r = FlatpakRef::parse(
            "[Flatpak Ref]\nName=org.example.Runtime\nUrl=file:///srv/repo\nIsRuntime=true\n",
        )
        .unwrap();
        assert_eq!(r.branch, "master");
        assert_eq!(r.ref_string("aarch64"), "runtime/org.example.Runtime/aarch64/master");
        assert_eq!(r.display_name(), "org.example.Runtime");
    }

    #[test]
    fn rejects_bad_refs() {
        let cases = [
            "[Something Else]\nName=org.a.B\nUrl=https://x/\n",
            "[Flatpak Ref]\nUrl=https://x/\n",
            "[Flatpak Ref]\nName=gimp\nUrl=https://x/\n",
            "[Flatpak Ref]\nName=org.gimp.GIMP\nUrl=ftp://x/\n",
            "[Flatpak Ref]\nName=org.gimp.GIMP\nUrl=https://x/\nGPGKey=not*base64\n",
            "[Flatpak Ref]\nName=org.gimp.GIMP\nUrl=https://x/\nBranch=../etc\n",
        ];
        for case in cases {
            let err = FlatpakRef::parse(case).unwrap_err();
            assert!(
                err.downcast_ref::<Error>().is_some(),
                "expected InvalidFlatpakRef for {:?}, got {:#}",
                case,
                err
            );
        }
    }

    #[test]
    fn app_id_rules() {
        assert!(is_valid_app_id("org.gnome.Builder"));
        assert!(is_valid_app_id("io.github.some_user.app-name"));
        assert!(!is_valid_app_id("org.gnome"));
        assert!(!is_valid_app_id("org.9gnome.App"));
        assert!(!is_valid_app_id("org..App"));
        assert!(!is_valid_app_id(&format!("org.example.{}", "a".repeat(300))));
    }

    #[test]
    fn install_args_pick_installation() {
        let installer = FlatpakInstaller::new(Installation::User);
        assert_eq!(
            installer.install_args(Path::new("/tmp/gimp.flatpakref")),
            vec!["install", "--noninteractive", "--user", "--from", "/tmp/gimp.flatpakref"]
        );
    }

    #[tokio::test]
    async fn failing_flatpak_reports_status() {
        let r = FlatpakRef::parse(GIMP_REF).unwrap();
        // `false` is never "installed" and always fails the install.
        let installer = FlatpakInstaller::new(Installation::User).with_program("false");
        let err = installer
            .install(Path::new("/tmp/gimp.flatpakref"), &r)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Flatpak { status: 1, .. })
        ));
    }
}
