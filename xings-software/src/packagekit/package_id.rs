use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `name;version;arch;data` as used by every PackageKit call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub data: String,
}

impl PackageId {
    pub fn new(name: &str, version: &str, arch: &str, data: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            data: data.to_string(),
        }
    }

    /// Backends mark installed packages with `installed` or `installed:<repo>`.
    pub fn is_installed(&self) -> bool {
        self.data == "installed" || self.data.starts_with("installed:")
    }

    /// `name-version.arch`, dropping empty parts.
    pub fn printable(&self) -> String {
        let mut text = self.name.clone();
        if !self.version.is_empty() {
            text.push('-');
            text.push_str(&self.version);
        }
        if !self.arch.is_empty() {
            text.push('.');
            text.push_str(&self.arch);
        }
        text
    }
}

/// Orders two version strings segment by segment. Digit runs compare as
/// numbers, letter runs as text, and a digit run sorts above a letter run.
/// Separators only split segments.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);
    for (x, y) in left.iter().zip(&right) {
        let order = match (is_numeric(x), is_numeric(y)) {
            (true, true) => {
                let (x, y) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                x.len().cmp(&y.len()).then_with(|| x.cmp(y))
            }
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.cmp(y),
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    left.len().cmp(&right.len())
}

fn is_numeric(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit())
}

fn segments(version: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<(usize, bool)> = None;
    for (i, c) in version.char_indices() {
        if !c.is_ascii_alphanumeric() {
            if let Some((s, _)) = start.take() {
                out.push(&version[s..i]);
            }
            continue;
        }
        let digit = c.is_ascii_digit();
        match start {
            Some((_, was_digit)) if was_digit == digit => {}
            Some((s, _)) => {
                out.push(&version[s..i]);
                start = Some((i, digit));
            }
            None => start = Some((i, digit)),
        }
    }
    if let Some((s, _)) = start {
        out.push(&version[s..]);
    }
    out
}

impl FromStr for PackageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(';').collect();
        if parts.len() != 4 || parts[0].is_empty() {
            return Err(Error::InvalidPackageId(s.to_string()));
        }
        Ok(PackageId::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{};{}", self.name, self.version, self.arch, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_form() {
        let id: PackageId = "bash;5.2.26-3.fc40;x86_64;updates".parse().unwrap();
        assert_eq!(id.name, "bash");
        assert_eq!(id.version, "5.2.26-3.fc40");
        assert_eq!(id.arch, "x86_64");
        assert_eq!(id.data, "updates");
        assert_eq!(id.to_string(), "bash;5.2.26-3.fc40;x86_64;updates");
        assert!(!id.is_installed());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("bash;1.0;x86_64".parse::<PackageId>().is_err());
        assert!(";1.0;x86_64;fedora".parse::<PackageId>().is_err());
        assert!("a;b;c;d;e".parse::<PackageId>().is_err());
    }

    #[test]
    fn installed_data_and_printable() {
        let id: PackageId = "vim;9.1;;installed:fedora".parse().unwrap();
        assert!(id.is_installed());
        assert_eq!(id.printable(), "vim-9.1");
        let bare: PackageId = "fonts-noto;;;".parse().unwrap();
        assert_eq!(bare.printable(), "fonts-noto");
    }

    #[test]
    fn versions_compare_by_segment() {
        assert_eq!(compare_versions("5.9", "5.8"), Ordering::Greater);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.39-4.fc40", "2.39-10.fc40"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0a"), Ordering::Less);
        assert_eq!(compare_versions("1.01", "1.1"), Ordering::Equal);
        assert_eq!(compare_versions("1:2.0", "1:2.0"), Ordering::Equal);
    }
}
