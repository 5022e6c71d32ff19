//! Named, mutually exclusive shortcut sets of one component

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::shortcut::{Shortcut, ShortcutInfo};
use crate::keys::{KeySequence, conflicts};

/// How a key is compared against shortcut keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Same sequence after normalization
    #[default]
    Equal,
    /// The queried key embeds the shortcut key
    Shadows,
    /// The shortcut key embeds the queried key
    ShadowedBy,
}

impl MatchType {
    fn matches(self, key: &KeySequence, other: &KeySequence) -> bool {
        match self {
            MatchType::Equal => key == other,
            MatchType::Shadows => !other.is_empty() && key.contains(other),
            MatchType::ShadowedBy => !other.is_empty() && other.contains(key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    unique_name: String,
    friendly_name: String,
    shortcuts: IndexMap<String, Shortcut>,
}

impl Context {
    pub fn new(unique_name: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            friendly_name: friendly_name.into(),
            shortcuts: IndexMap::new(),
        }
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Insert by unique name; an existing shortcut of that name is replaced
    pub fn add(&mut self, shortcut: Shortcut) {
        self.shortcuts
            .insert(shortcut.unique_name().to_string(), shortcut);
    }

    /// Detach a shortcut and hand it to the caller
    pub fn take(&mut self, name: &str) -> Option<Shortcut> {
        self.shortcuts.shift_remove(name)
    }

    pub fn shortcut(&self, name: &str) -> Option<&Shortcut> {
        self.shortcuts.get(name)
    }

    pub fn shortcut_mut(&mut self, name: &str) -> Option<&mut Shortcut> {
        self.shortcuts.get_mut(name)
    }

    pub fn shortcuts(&self) -> impl Iterator<Item = &Shortcut> {
        self.shortcuts.values()
    }

    pub fn shortcuts_mut(&mut self) -> impl Iterator<Item = &mut Shortcut> {
        self.shortcuts.values_mut()
    }

    pub fn shortcut_names(&self) -> Vec<String> {
        self.shortcuts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// First shortcut, in insertion order, with a key matching `key`
    pub fn lookup_by_key(&self, key: &KeySequence, match_type: MatchType) -> Option<&Shortcut> {
        if key.is_empty() {
            return None;
        }

        let key = key.normalized();
        self.shortcuts.values().find(|shortcut| {
            shortcut
                .keys()
                .iter()
                .any(|other| match_type.matches(&key, &other.normalized()))
        })
    }

    /// True if `key` neither equals nor shadows any member key
    pub fn is_key_available(&self, key: &KeySequence) -> bool {
        let key = key.normalized();
        let member_keys: Vec<KeySequence> = self
            .shortcuts
            .values()
            .flat_map(|shortcut| shortcut.keys())
            .map(KeySequence::normalized)
            .collect();
        !conflicts(&key, &member_keys)
    }

    pub fn all_shortcut_infos(&self, component_friendly: &str) -> Vec<ShortcutInfo> {
        self.shortcuts
            .values()
            .map(|shortcut| shortcut.info(component_friendly, &self.friendly_name))
            .collect()
    }
}
