//! One bindable action

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::grabs::GrabTable;
use crate::constants::registry::SESSION_PREFIX;
use crate::keys::KeySequence;

/// Address of a shortcut: owning component, context and action name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortcutRef {
    pub component: String,
    pub context: String,
    pub action: String,
}

impl ShortcutRef {
    pub fn new(
        component: impl Into<String>,
        context: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            context: context.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for ShortcutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}:{}", self.component, self.context, self.action)
    }
}

/// Everything a client may learn about a shortcut
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutInfo {
    pub context_unique_name: String,
    pub context_friendly_name: String,
    pub component_unique_name: String,
    pub component_friendly_name: String,
    pub unique_name: String,
    pub friendly_name: String,
    pub keys: Vec<KeySequence>,
    pub default_keys: Vec<KeySequence>,
}

#[derive(Debug, Clone)]
pub struct Shortcut {
    unique_name: String,
    friendly_name: String,
    keys: Vec<KeySequence>,
    default_keys: Vec<KeySequence>,
    is_present: bool,
    is_registered: bool,
    is_fresh: bool,
    component: String,
    context: String,
}

impl Shortcut {
    /// A fresh, absent shortcut
    pub fn new(
        component: impl Into<String>,
        context: impl Into<String>,
        unique_name: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            unique_name: unique_name.into(),
            friendly_name: friendly_name.into(),
            keys: Vec::new(),
            default_keys: Vec::new(),
            is_present: false,
            is_registered: false,
            is_fresh: true,
            component: component.into(),
            context: context.into(),
        }
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn set_friendly_name(&mut self, name: impl Into<String>) {
        self.friendly_name = name.into();
    }

    pub fn keys(&self) -> &[KeySequence] {
        &self.keys
    }

    pub fn default_keys(&self) -> &[KeySequence] {
        &self.default_keys
    }

    pub fn set_default_keys(&mut self, keys: Vec<KeySequence>) {
        self.default_keys = keys;
    }

    pub fn is_present(&self) -> bool {
        self.is_present
    }

    /// Registered shortcuts hold grabs for all of their keys
    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh
    }

    pub fn set_fresh(&mut self, fresh: bool) {
        self.is_fresh = fresh;
    }

    pub fn is_session_shortcut(&self) -> bool {
        self.unique_name.starts_with(SESSION_PREFIX)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn reference(&self) -> ShortcutRef {
        ShortcutRef::new(&self.component, &self.context, &self.unique_name)
    }

    pub fn info(&self, component_friendly: &str, context_friendly: &str) -> ShortcutInfo {
        ShortcutInfo {
            context_unique_name: self.context.clone(),
            context_friendly_name: context_friendly.to_string(),
            component_unique_name: self.component.clone(),
            component_friendly_name: component_friendly.to_string(),
            unique_name: self.unique_name.clone(),
            friendly_name: self.friendly_name.clone(),
            keys: self.keys.clone(),
            default_keys: self.default_keys.clone(),
        }
    }

    /// Grab all non-empty keys. No-op unless present and not yet registered.
    pub fn set_active(&mut self, grabs: &mut GrabTable) {
        if !self.is_present || self.is_registered {
            return;
        }

        let owner = self.reference();
        for key in self.keys.iter().filter(|key| !key.is_empty()) {
            if !grabs.register_key(key, &owner) {
                debug!(shortcut = %owner, key = %key, "Could not grab key");
            }
        }
        self.is_registered = true;
    }

    /// Release all grabs held by this shortcut
    pub fn set_inactive(&mut self, grabs: &mut GrabTable) {
        if !self.is_registered {
            return;
        }

        let owner = self.reference();
        for key in self.keys.iter().filter(|key| !key.is_empty()) {
            if !grabs.unregister_key(key, &owner) {
                debug!(shortcut = %owner, key = %key, "Key was not grabbed by this shortcut");
            }
        }
        self.is_registered = false;
    }

    /// Presence drives activation: present shortcuts grab, absent ones do not
    pub fn set_present(&mut self, present: bool, grabs: &mut GrabTable) {
        self.is_present = present;
        if present {
            self.set_active(grabs);
        } else {
            self.set_inactive(grabs);
        }
    }

    /// Swap the key list, moving grabs along if the shortcut is live. Callers
    /// filter out conflicting keys first.
    pub fn replace_keys(&mut self, keys: Vec<KeySequence>, grabs: &mut GrabTable) {
        let active = self.is_registered;
        if active {
            self.set_inactive(grabs);
        }
        self.keys = keys;
        if active {
            self.set_active(grabs);
        }
    }
}
