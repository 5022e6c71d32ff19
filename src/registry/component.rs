//! Shortcut owners
//!
//! A component groups the shortcuts of one application into contexts. It
//! always owns `default` and exactly one context is current at a time; only
//! the current context's shortcuts may hold grabs.

use indexmap::IndexMap;
use tracing::debug;

use super::context::{Context, MatchType};
use super::grabs::GrabTable;
use super::service_action::ServiceAction;
use super::shortcut::{Shortcut, ShortcutInfo};
use crate::constants::registry::{
    COMPONENT_PATH_PREFIX, CONTEXT_SEPARATOR, DEFAULT_CONTEXT, DEFAULT_CONTEXT_FRIENDLY,
    PROTECTED_ACTION, PROTECTED_COMPONENT, UNCONFIGURED_CONTEXT_FRIENDLY,
};
use crate::keys::KeySequence;

#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// Registered by a running client
    Plain,
    /// Backed by a launcher file
    ServiceAction(ServiceAction),
}

#[derive(Debug, Clone)]
pub struct Component {
    unique_name: String,
    friendly_name: String,
    contexts: IndexMap<String, Context>,
    current: String,
    kind: ComponentKind,
}

impl Component {
    pub fn new(unique_name: impl Into<String>, friendly_name: impl Into<String>, kind: ComponentKind) -> Self {
        let unique_name = unique_name.into();
        debug_assert!(
            !unique_name.contains(CONTEXT_SEPARATOR),
            "component names never carry a context"
        );

        let mut contexts = IndexMap::new();
        contexts.insert(
            DEFAULT_CONTEXT.to_string(),
            Context::new(DEFAULT_CONTEXT, DEFAULT_CONTEXT_FRIENDLY),
        );

        Self {
            unique_name,
            friendly_name: friendly_name.into(),
            contexts,
            current: DEFAULT_CONTEXT.to_string(),
            kind,
        }
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Display name, falling back to the unique name
    pub fn friendly_name(&self) -> &str {
        if self.friendly_name.is_empty() {
            &self.unique_name
        } else {
            &self.friendly_name
        }
    }

    pub fn set_friendly_name(&mut self, name: impl Into<String>) {
        self.friendly_name = name.into();
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn service_action(&self) -> Option<&ServiceAction> {
        match &self.kind {
            ComponentKind::ServiceAction(service) => Some(service),
            ComponentKind::Plain => None,
        }
    }

    /// Object path clients use to address this component
    pub fn object_path(&self) -> String {
        let sanitized: String = self
            .unique_name
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
            .collect();
        format!("{COMPONENT_PATH_PREFIX}{sanitized}")
    }

    /// Add an empty context; false if one of that name exists
    pub fn create_context(&mut self, name: &str, friendly_name: &str) -> bool {
        if self.contexts.contains_key(name) {
            debug!(component = %self.unique_name, context = %name, "Context already exists");
            return false;
        }
        self.contexts.insert(
            name.to_string(),
            Context::new(name, friendly_name),
        );
        true
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.get_mut(name)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn context_names(&self) -> Vec<String> {
        self.contexts.keys().cloned().collect()
    }

    pub fn current_context_name(&self) -> &str {
        &self.current
    }

    pub fn current_context(&self) -> &Context {
        // `current` is only ever set to an existing context
        &self.contexts[self.current.as_str()]
    }

    fn current_context_mut(&mut self) -> &mut Context {
        &mut self.contexts[self.current.as_str()]
    }

    /// Switch the current context. A missing context is created unconfigured
    /// and made current, and `false` tells the caller to configure it.
    pub fn activate_context(&mut self, name: &str, grabs: &mut GrabTable) -> bool {
        let existed = self.contexts.contains_key(name);
        if !existed {
            self.create_context(name, UNCONFIGURED_CONTEXT_FRIENDLY);
        }

        self.deactivate_shortcuts(false, grabs);
        self.current = name.to_string();
        debug!(component = %self.unique_name, context = %name, existed, "Activated context");
        existed
    }

    /// Grab keys of every present shortcut in the current context
    pub fn activate_shortcuts(&mut self, grabs: &mut GrabTable) {
        for shortcut in self.current_context_mut().shortcuts_mut() {
            shortcut.set_active(grabs);
        }
    }

    /// Release the current context's grabs. A temporary deactivation keeps
    /// the shortcut that lifts the block.
    pub fn deactivate_shortcuts(&mut self, temporarily: bool, grabs: &mut GrabTable) {
        let protected_component = self.unique_name == PROTECTED_COMPONENT;
        for shortcut in self.current_context_mut().shortcuts_mut() {
            if temporarily && protected_component && shortcut.unique_name() == PROTECTED_ACTION {
                continue;
            }
            shortcut.set_inactive(grabs);
        }
    }

    /// Drop the named shortcut from every context, releasing its grabs
    pub fn unregister_shortcut(&mut self, name: &str, grabs: &mut GrabTable) -> bool {
        let mut removed = false;
        for context in self.contexts.values_mut() {
            if let Some(mut shortcut) = context.take(name) {
                shortcut.set_inactive(grabs);
                removed = true;
            }
        }
        removed
    }

    /// Remove every current-context shortcut whose application went away.
    /// Launcher-backed components first mark all of theirs absent.
    pub fn clean_up(&mut self, grabs: &mut GrabTable) -> bool {
        if let ComponentKind::ServiceAction(_) = self.kind {
            for shortcut in self.current_context_mut().shortcuts_mut() {
                shortcut.set_present(false, grabs);
            }
        }

        let gone: Vec<String> = self
            .current_context()
            .shortcuts()
            .filter(|shortcut| !shortcut.is_present())
            .map(|shortcut| shortcut.unique_name().to_string())
            .collect();

        for name in &gone {
            self.unregister_shortcut(name, grabs);
        }
        !gone.is_empty()
    }

    /// True if some shortcut of the current context is present
    pub fn is_active(&self) -> bool {
        self.current_context().shortcuts().any(Shortcut::is_present)
    }

    /// True if any context holds a shortcut
    pub fn has_shortcuts(&self) -> bool {
        self.contexts.values().any(|context| !context.is_empty())
    }

    pub fn shortcut_by_name(&self, name: &str, context: &str) -> Option<&Shortcut> {
        self.contexts.get(context)?.shortcut(name)
    }

    pub fn shortcut_by_name_mut(&mut self, name: &str, context: &str) -> Option<&mut Shortcut> {
        self.contexts.get_mut(context)?.shortcut_mut(name)
    }

    pub fn shortcut_names(&self, context: &str) -> Vec<String> {
        self.contexts
            .get(context)
            .map(Context::shortcut_names)
            .unwrap_or_default()
    }

    pub fn all_shortcut_infos(&self, context: &str) -> Vec<ShortcutInfo> {
        self.contexts
            .get(context)
            .map(|ctx| ctx.all_shortcut_infos(self.friendly_name()))
            .unwrap_or_default()
    }

    /// Lookup in the current context only
    pub fn shortcut_by_key(&self, key: &KeySequence, match_type: MatchType) -> Option<&Shortcut> {
        self.current_context().lookup_by_key(key, match_type)
    }

    /// First match of every context
    pub fn shortcuts_by_key(&self, key: &KeySequence, match_type: MatchType) -> Vec<&Shortcut> {
        self.contexts
            .values()
            .filter_map(|context| context.lookup_by_key(key, match_type))
            .collect()
    }

    /// A requester may reuse keys of its own other contexts; anyone else has
    /// to stay clear of every context of this component.
    pub fn is_shortcut_available(&self, key: &KeySequence, component: &str, context: &str) -> bool {
        if component == self.unique_name {
            return self
                .contexts
                .get(context)
                .is_none_or(|ctx| ctx.is_key_available(key));
        }
        self.contexts.values().all(|ctx| ctx.is_key_available(key))
    }
}
