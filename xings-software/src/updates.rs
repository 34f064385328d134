use std::collections::BTreeMap;

use crate::packagekit::transaction::Package;
use crate::packagekit::{Info, PackageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    pub id: PackageId,
    pub info: Info,
    pub summary: String,
}

impl PackageUpdate {
    pub fn is_urgent(&self) -> bool {
        self.info.is_urgent()
    }
}

/// Pending updates, most severe first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateInfo {
    pub total_updates: usize,
    pub packages: Vec<PackageUpdate>,
    counts: BTreeMap<u8, usize>,
}

impl UpdateInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_packages(packages: Vec<Package>) -> Self {
        let mut updates: Vec<PackageUpdate> = packages
            .into_iter()
            .filter(|p| p.info != Info::Blocked)
            .map(|p| PackageUpdate {
                id: p.id,
                info: p.info,
                summary: p.summary,
            })
            .collect();
        updates.sort_by(|a, b| {
            b.info
                .severity()
                .cmp(&a.info.severity())
                .then_with(|| a.id.name.cmp(&b.id.name))
        });

        let mut counts = BTreeMap::new();
        for update in &updates {
            *counts.entry(update.info.severity()).or_insert(0) += 1;
        }

        Self {
            total_updates: updates.len(),
            packages: updates,
            counts,
        }
    }

    pub fn has_updates(&self) -> bool {
        self.total_updates > 0
    }

    pub fn count(&self, info: Info) -> usize {
        self.counts.get(&info.severity()).copied().unwrap_or(0)
    }

    pub fn urgent_updates(&self) -> usize {
        self.count(Info::Critical) + self.count(Info::Security)
    }

    pub fn has_urgent(&self) -> bool {
        self.urgent_updates() > 0
    }

    pub fn has_critical(&self) -> bool {
        self.count(Info::Critical) > 0
    }

    pub fn package_ids(&self) -> Vec<PackageId> {
        self.packages.iter().map(|p| p.id.clone()).collect()
    }

    /// Ids of the updates matching `wanted` (package names or full ids),
    /// plus the entries that matched nothing.
    pub fn select(&self, wanted: &[String]) -> (Vec<PackageId>, Vec<String>) {
        let mut ids = Vec::new();
        let mut missing = Vec::new();
        for entry in wanted {
            let matched: Vec<&PackageId> = self
                .packages
                .iter()
                .map(|p| &p.id)
                .filter(|id| &id.name == entry || &id.to_string() == entry)
                .collect();
            if matched.is_empty() {
                missing.push(entry.clone());
            }
            for id in matched {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        (ids, missing)
    }

    pub fn package_id_strings(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.id.to_string()).collect()
    }

    pub fn summary_title(&self) -> String {
        if self.has_critical() {
            "Critical software updates available".to_string()
        } else if self.has_urgent() {
            "Important software updates available".to_string()
        } else {
            "Software updates available".to_string()
        }
    }

    pub fn summary_body(&self) -> String {
        let total = self.total_updates;
        let urgent = self.urgent_updates();
        let mut body = if total == 1 {
            "There is 1 software update available.".to_string()
        } else {
            format!("There are {} software updates available.", total)
        };
        if urgent > 0 {
            body.push(' ');
            if urgent == 1 {
                body.push_str("1 of them is an important or security update.");
            } else {
                body.push_str(&format!("{} of them are important or security updates.", urgent));
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(info: Info, name: &str) -> Package {
        Package::new(info, PackageId::new(name, "1.0", "x86_64", "updates"), "")
    }

    #[test]
    fn sorts_by_severity_then_name_and_drops_blocked() {
        let info = UpdateInfo::from_packages(vec![
            pkg(Info::Normal, "zsh"),
            pkg(Info::Blocked, "kernel"),
            pkg(Info::Security, "openssl"),
            pkg(Info::Normal, "bash"),
            pkg(Info::Critical, "glibc"),
        ]);
        let names: Vec<&str> = info.packages.iter().map(|p| p.id.name.as_str()).collect();
        assert_eq!(names, vec!["glibc", "openssl", "bash", "zsh"]);
        assert_eq!(info.total_updates, 4);
        assert_eq!(info.count(Info::Normal), 2);
        assert_eq!(info.urgent_updates(), 2);
        assert!(info.has_critical());
    }

    #[test]
    fn summary_uses_singular_and_plural() {
        let one = UpdateInfo::from_packages(vec![pkg(Info::Enhancement, "gimp")]);
        assert_eq!(one.summary_title(), "Software updates available");
        assert_eq!(one.summary_body(), "There is 1 software update available.");

        let many = UpdateInfo::from_packages(vec![
            pkg(Info::Security, "openssl"),
            pkg(Info::Bugfix, "bash"),
            pkg(Info::Security, "curl"),
        ]);
        assert_eq!(many.summary_title(), "Important software updates available");
        assert_eq!(
            many.summary_body(),
            "There are 3 software updates available. 2 of them are important or security updates."
        );

        let critical = UpdateInfo::from_packages(vec![
            pkg(Info::Critical, "kernel"),
            pkg(Info::Normal, "zsh"),
        ]);
        assert_eq!(
            critical.summary_body(),
            "There are 2 software updates available. 1 of them is an important or security update."
        );
    }

    #[test]
    fn empty_set_has_no_updates() {
        let info = UpdateInfo::from_packages(Vec::new());
        assert!(!info.has_updates());
        assert!(!info.has_urgent());
        assert_eq!(info, UpdateInfo::new());
    }

    #[test]
    fn selects_by_name_or_id() {
        let info = UpdateInfo::from_packages(vec![
            pkg(Info::Normal, "zsh"),
            pkg(Info::Security, "openssl"),
        ]);
        let wanted = vec![
            "openssl".to_string(),
            "zsh;1.0;x86_64;updates".to_string(),
            "vim".to_string(),
        ];
        let (ids, missing) = info.select(&wanted);
        assert_eq!(
            ids.iter().map(|id| id.name.as_str()).collect::<Vec<_>>(),
            vec!["openssl", "zsh"]
        );
        assert_eq!(missing, vec!["vim".to_string()]);
    }
}
