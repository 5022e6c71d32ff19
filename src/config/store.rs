//! Persisted shortcut groups
//!
//! One group per component, keyed by its unique name. The default context's
//! entries sit directly in the group; every other context is a nested group.
//! Entries are `[keys, default_keys, friendly_name]` with keys in the tab
//! separated list format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::config::FRIENDLY_NAME_ENTRY;

/// `[keys, default_keys, friendly_name]`
pub type ShortcutEntry = Vec<String>;

/// Whole file: component unique name -> group
pub type ShortcutsFile = BTreeMap<String, ConfigGroup>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    #[serde(rename = "_k_friendly_name", default)]
    pub friendly_name: String,

    #[serde(default)]
    pub entries: BTreeMap<String, ShortcutEntry>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, ConfigGroup>,
}

impl ConfigGroup {
    pub fn new(friendly_name: impl Into<String>) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            ..Default::default()
        }
    }

    pub fn write_entry(&mut self, action: &str, keys: String, default_keys: String, friendly: &str) {
        self.entries
            .insert(action.to_string(), vec![keys, default_keys, friendly.to_string()]);
    }

    /// Well-formed entries as `(action, keys, default_keys, friendly_name)`;
    /// anything that is not a three field record is skipped
    pub fn valid_entries(&self) -> impl Iterator<Item = (&str, &str, &str, &str)> {
        self.entries.iter().filter_map(|(action, entry)| {
            if action == FRIENDLY_NAME_ENTRY {
                return None;
            }
            match entry.as_slice() {
                [keys, defaults, friendly] => {
                    Some((action.as_str(), keys.as_str(), defaults.as_str(), friendly.as_str()))
                }
                _ => {
                    debug!(action = %action, fields = entry.len(), "Skipping malformed shortcut entry");
                    None
                }
            }
        })
    }
}

/// JSON file holding every component group
#[derive(Debug, Clone)]
pub struct ShortcutStore {
    path: PathBuf,
}

impl ShortcutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all groups; a missing file is an empty store
    pub fn load(&self) -> Result<ShortcutsFile> {
        if !self.path.exists() {
            info!("No shortcuts file at {:?}, starting empty", self.path);
            return Ok(ShortcutsFile::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read shortcuts from {:?}", self.path))?;

        let groups: ShortcutsFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", self.path))?;

        info!("Loaded {} shortcut group(s)", groups.len());
        Ok(groups)
    }

    pub fn save(&self, groups: &ShortcutsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json_string = serde_json::to_string_pretty(groups)
            .context("Failed to serialize shortcuts to JSON")?;

        fs::write(&self.path, json_string)
            .with_context(|| format!("Failed to write shortcuts to {:?}", self.path))?;

        debug!(groups = groups.len(), "Saved shortcuts to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_layout() {
        let mut group = ConfigGroup::new("Terminal");
        group.write_entry("_launch", "Meta+Return".into(), "Meta+Return".into(), "Launch");
        let mut work = ConfigGroup::new("Work");
        work.write_entry("new-tab", "none".into(), "none".into(), "New Tab");
        group.contexts.insert("work".into(), work);

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["_k_friendly_name"], "Terminal");
        assert_eq!(json["entries"]["_launch"][0], "Meta+Return");
        assert_eq!(json["contexts"]["work"]["_k_friendly_name"], "Work");

        // Empty context maps are left out
        let plain = serde_json::to_value(ConfigGroup::new("x")).unwrap();
        assert!(plain.get("contexts").is_none());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let group: ConfigGroup = serde_json::from_str(
            r#"{
                "_k_friendly_name": "KWin",
                "entries": {
                    "good": ["Meta+A", "none", "Good"],
                    "short": ["Meta+B"],
                    "_k_friendly_name": ["x", "y", "z"]
                }
            }"#,
        )
        .unwrap();

        let entries: Vec<_> = group.valid_entries().collect();
        assert_eq!(entries, vec![("good", "Meta+A", "none", "Good")]);
    }

    #[test]
    fn test_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ShortcutStore::new(temp_dir.path().join("sub").join("shortcuts.json"));
        assert!(store.load().unwrap().is_empty());

        let mut groups = ShortcutsFile::new();
        let mut group = ConfigGroup::new("KWin");
        group.write_entry("Overview", "Meta+W".into(), "Meta+W".into(), "Toggle Overview");
        groups.insert("kwin".into(), group);

        store.save(&groups).unwrap();
        assert_eq!(store.load().unwrap(), groups);
    }
}
