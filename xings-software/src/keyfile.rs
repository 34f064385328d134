//! Reader for the freedesktop "key file" format (`[Group]` + `Key=Value`).

use std::sync::OnceLock;

use anyhow::{anyhow, bail, Result};
use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFile {
    groups: Vec<(String, Vec<(String, String)>)>,
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[([^\[\]]+)\]$").expect("static regex"))
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9-]+(?:\[[^\]]+\])?)\s*=\s*(.*)$").expect("static regex"))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl KeyFile {
    pub fn parse(text: &str) -> Result<Self> {
        let mut groups: Vec<(String, Vec<(String, String)>)> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = group_re().captures(line) {
                groups.push((caps[1].to_string(), Vec::new()));
                continue;
            }
            let caps = entry_re()
                .captures(line)
                .ok_or_else(|| anyhow!("line {}: expected `Key=Value`", lineno + 1))?;
            let Some((_, entries)) = groups.last_mut() else {
                bail!("line {}: key outside of any group", lineno + 1);
            };
            entries.push((caps[1].to_string(), unescape(&caps[2])));
        }

        Ok(Self { groups })
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|(name, _)| name == group)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups
            .iter()
            .filter(|(name, _)| name == group)
            .flat_map(|(_, entries)| entries.iter())
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_bool(&self, group: &str, key: &str) -> Result<Option<bool>> {
        match self.get(group, key) {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(true)),
            Some("false") | Some("0") => Ok(Some(false)),
            Some(other) => Err(anyhow!("{} is not a boolean: {}", key, other)),
        }
    }

    pub fn get_list(&self, group: &str, key: &str) -> Vec<String> {
        self.get(group, key)
            .map(|value| {
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_groups_keys_and_lists() {
        let kf = KeyFile::parse(
            "# comment\n[Main]\nName = demo\nEnabled=true\nItems=a;b;;c;\n\n[Other]\nName=second\\sword\n",
        )
        .unwrap();
        assert!(kf.has_group("Main"));
        assert_eq!(kf.get("Main", "Name"), Some("demo"));
        assert_eq!(kf.get("Other", "Name"), Some("second word"));
        assert_eq!(kf.get_bool("Main", "Enabled").unwrap(), Some(true));
        assert_eq!(kf.get_list("Main", "Items"), vec!["a", "b", "c"]);
        assert_eq!(kf.get("Main", "Missing"), None);
    }

    #[test]
    fn rejects_keys_before_groups_and_garbage() {
        assert!(KeyFile::parse("Name=x\n[Main]\n").is_err());
        assert!(KeyFile::parse("[Main]\nthis is not an entry\n").is_err());
    }

    #[test]
    fn last_duplicate_wins_and_bad_bools_error() {
        let kf = KeyFile::parse("[G]\nA=1\nA=2\nB=maybe\n").unwrap();
        assert_eq!(kf.get("G", "A"), Some("2"));
        assert!(kf.get_bool("G", "B").is_err());
    }
}
