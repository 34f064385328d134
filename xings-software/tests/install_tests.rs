mod common;

use std::sync::Mutex;

use common::{pkg, Call, MockBackend};
use xings_software::config::Settings;
use xings_software::error::Error;
use xings_software::install::{font_provide, AssumeYes, Confirmation, Installer, Verb};
use xings_software::packagekit::{Filters, Info, TransactionFlags};

const GIMP: &str = "gimp;3.0;x86_64;fedora";
const BABL: &str = "babl;0.1;x86_64;fedora";
const BASH: &str = "bash;5.2;x86_64;installed:fedora";

fn repository() -> MockBackend {
    MockBackend {
        packages: vec![
            pkg(Info::Installed, BASH),
            pkg(Info::Available, GIMP),
            pkg(Info::Available, BABL),
        ],
        provides: vec![
            ("/usr/bin/gimp".into(), pkg(Info::Available, GIMP)),
            ("/usr/bin/bash".into(), pkg(Info::Installed, BASH)),
            (font_provide("ja"), pkg(Info::Available, "vlgothic-fonts;2.0;noarch;fedora")),
        ],
        simulated: vec![pkg(Info::Installing, GIMP), pkg(Info::Installing, BABL)],
        ..MockBackend::default()
    }
}

fn trusted() -> TransactionFlags {
    TransactionFlags::ONLY_TRUSTED
}

fn simulate() -> TransactionFlags {
    TransactionFlags::ONLY_TRUSTED | TransactionFlags::SIMULATE
}

fn error_of(err: &anyhow::Error) -> &Error {
    err.downcast_ref::<Error>().expect("typed error")
}

#[tokio::test]
async fn installs_by_name_after_confirmation() {
    let backend = repository();
    let settings = Settings::default();
    let asked = Mutex::new(Vec::new());
    let confirm = |c: &Confirmation| {
        asked.lock().unwrap().push(c.clone());
        true
    };

    Installer::new(&backend, &settings)
        .install_package_names(&["gimp".to_string()], &confirm)
        .await
        .unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::Resolve(Filters::ARCH, vec!["gimp".into()]),
            Call::InstallPackages(simulate(), vec![GIMP.into()]),
            Call::InstallPackages(trusted(), vec![GIMP.into()]),
        ]
    );
    let asked = asked.lock().unwrap();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].verb, Verb::Install);
    assert_eq!(asked[0].requested, vec!["gimp-3.0.x86_64".to_string()]);
    assert_eq!(asked[0].additional.len(), 1);
    assert_eq!(asked[0].additional[0].id.name, "babl");
}

#[tokio::test]
async fn untrusted_installs_when_configured() {
    let backend = repository();
    let settings = Settings {
        only_trusted: false,
        ..Settings::default()
    };
    Installer::new(&backend, &settings)
        .install_package_names(&["gimp".to_string()], &AssumeYes)
        .await
        .unwrap();
    assert_eq!(
        backend.calls().last(),
        Some(&Call::InstallPackages(TransactionFlags::NONE, vec![GIMP.into()]))
    );
}

#[tokio::test]
async fn declining_skips_the_commit() {
    let backend = repository();
    let settings = Settings::default();
    let err = Installer::new(&backend, &settings)
        .install_package_names(&["gimp".to_string()], &|_: &Confirmation| false)
        .await
        .unwrap_err();

    assert!(matches!(error_of(&err), Error::Declined));
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn unknown_and_installed_names_are_reported() {
    let backend = repository();
    let settings = Settings::default();
    let installer = Installer::new(&backend, &settings);

    let err = installer
        .install_package_names(&["gimp".to_string(), "nope".to_string()], &AssumeYes)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), Error::NotFound(names) if names == &vec!["nope".to_string()]));

    let err = installer
        .install_package_names(&["bash".to_string()], &AssumeYes)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), Error::AlreadyInstalled(_)));
}

#[tokio::test]
async fn installs_local_files_by_absolute_path() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello-1.0.rpm");
    std::fs::write(&file, b"rpm").unwrap();
    let canonical = file.canonicalize().unwrap();

    let backend = repository();
    let settings = Settings::default();
    Installer::new(&backend, &settings)
        .install_files(&[file], &AssumeYes)
        .await
        .unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::InstallFiles(simulate(), vec![canonical.clone()]),
            Call::InstallFiles(trusted(), vec![canonical]),
        ]
    );
}

#[tokio::test]
async fn missing_local_files_never_reach_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let backend = repository();
    let settings = Settings::default();
    let err = Installer::new(&backend, &settings)
        .install_files(&[dir.path().join("absent.deb")], &AssumeYes)
        .await
        .unwrap_err();

    assert!(matches!(error_of(&err), Error::NotFound(_)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn installs_the_package_providing_a_file() {
    let backend = repository();
    let settings = Settings::default();
    let files = vec!["/usr/bin/gimp".to_string()];
    Installer::new(&backend, &settings)
        .install_provide_files(&files, &AssumeYes)
        .await
        .unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::SearchFiles(Filters::INSTALLED, files.clone()),
            Call::SearchFiles(Filters::NOT_INSTALLED | Filters::NEWEST | Filters::ARCH, files),
            Call::InstallPackages(simulate(), vec![GIMP.into()]),
            Call::InstallPackages(trusted(), vec![GIMP.into()]),
        ]
    );
}

#[tokio::test]
async fn provided_file_already_installed() {
    let backend = repository();
    let settings = Settings::default();
    let err = Installer::new(&backend, &settings)
        .install_provide_files(&["/usr/bin/bash".to_string()], &AssumeYes)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), Error::AlreadyInstalled(names) if names == &vec!["bash".to_string()]));
}

#[tokio::test]
async fn installs_fonts_through_what_provides() {
    let backend = repository();
    let settings = Settings::default();
    Installer::new(&backend, &settings)
        .install_what_provides(&[font_provide("ja")], &AssumeYes)
        .await
        .unwrap();
    assert_eq!(
        backend.calls().last(),
        Some(&Call::InstallPackages(
            trusted(),
            vec!["vlgothic-fonts;2.0;noarch;fedora".into()]
        ))
    );

    let err = Installer::new(&backend, &settings)
        .install_what_provides(&[font_provide("tlh")], &AssumeYes)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), Error::NotFound(_)));
}

#[tokio::test]
async fn removes_installed_packages_only() {
    let backend = MockBackend {
        simulated: vec![pkg(Info::Removing, BASH)],
        ..repository()
    };
    let settings = Settings::default();
    let installer = Installer::new(&backend, &settings);

    installer
        .remove_packages(&["bash".to_string()], &AssumeYes)
        .await
        .unwrap();
    assert_eq!(
        backend.calls(),
        vec![
            Call::Resolve(Filters::INSTALLED, vec!["bash".into()]),
            Call::RemovePackages(simulate(), vec![BASH.into()]),
            Call::RemovePackages(trusted(), vec![BASH.into()]),
        ]
    );

    let err = installer
        .remove_packages(&["gimp".to_string()], &AssumeYes)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), Error::NotFound(_)));
}

#[tokio::test]
async fn installs_the_newest_of_several_versions() {
    let newer = "gimp;3.0.2;x86_64;updates";
    let backend = MockBackend {
        packages: vec![pkg(Info::Available, newer), pkg(Info::Available, GIMP)],
        ..MockBackend::default()
    };
    let settings = Settings::default();
    Installer::new(&backend, &settings)
        .install_package_names(&["gimp".to_string()], &AssumeYes)
        .await
        .unwrap();
    assert_eq!(
        backend.calls().last(),
        Some(&Call::InstallPackages(trusted(), vec![newer.into()]))
    );
}
