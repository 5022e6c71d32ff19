//! Desktop launcher files (`*.desktop`)

use anyhow::{Context, Result, anyhow};
use ini::{Ini, ParseOption, Properties};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::desktop::{ACTION_GROUP_PREFIX, MAIN_GROUP, SHORTCUTS_KEY};

/// One `[Desktop Action <id>]` group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesktopAction {
    pub name: String,
    pub exec: Option<String>,
    /// Raw `X-KDE-Shortcuts` value
    pub shortcuts: String,
}

/// The parts of a launcher file the broker cares about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesktopEntry {
    pub name: String,
    pub exec: Option<String>,
    pub dbus_activatable: bool,
    pub no_display: bool,
    pub hidden: bool,
    /// Declared action ids, in file order
    pub actions: Vec<String>,
    /// Raw `X-KDE-Shortcuts` value of the main group
    pub shortcuts: String,
    action_groups: IndexMap<String, DesktopAction>,
}

fn read_bool(group: &Properties, key: &str) -> bool {
    group
        .get(key)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn read_string(group: &Properties, key: &str) -> String {
    group.get(key).unwrap_or_default().trim().to_string()
}

fn read_exec(group: &Properties) -> Option<String> {
    group
        .get("Exec")
        .map(str::trim)
        .filter(|exec| !exec.is_empty())
        .map(str::to_string)
}

impl DesktopEntry {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read desktop file {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse desktop file {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        // Exec lines carry their own quoting rules; keep values verbatim
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(contents, options).map_err(|e| anyhow!("{e}"))?;

        let main = ini
            .section(Some(MAIN_GROUP))
            .ok_or_else(|| anyhow!("missing [{MAIN_GROUP}] group"))?;

        let actions: Vec<String> = main
            .get("Actions")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        let mut action_groups = IndexMap::new();
        for (section, group) in ini.iter() {
            let Some(id) = section.and_then(|name| name.strip_prefix(ACTION_GROUP_PREFIX)) else {
                continue;
            };
            action_groups.insert(
                id.to_string(),
                DesktopAction {
                    name: read_string(group, "Name"),
                    exec: read_exec(group),
                    shortcuts: read_string(group, SHORTCUTS_KEY),
                },
            );
        }

        Ok(Self {
            name: read_string(main, "Name"),
            exec: read_exec(main),
            dbus_activatable: read_bool(main, "DBusActivatable"),
            no_display: read_bool(main, "NoDisplay"),
            hidden: read_bool(main, "Hidden"),
            actions,
            shortcuts: read_string(main, SHORTCUTS_KEY),
            action_groups,
        })
    }

    /// The group of a declared action
    pub fn action(&self, id: &str) -> Option<&DesktopAction> {
        if !self.actions.iter().any(|declared| declared == id) {
            return None;
        }
        self.action_groups.get(id)
    }
}

/// First occurrence of every file name ending in `suffix`, walking `dirs` in
/// order
pub fn find_unique_files(dirs: &[PathBuf], suffix: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for dir in dirs {
        let Ok(read_dir) = fs::read_dir(dir) else {
            debug!("Skipping unreadable directory {:?}", dir);
            continue;
        };

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(suffix))
            })
            .collect();
        files.sort();

        for path in files {
            if let Some(name) = path.file_name().map(|name| name.to_os_string())
                && seen.insert(name)
            {
                found.push(path);
            }
        }
    }

    found
}
