//! Broker service surface
//!
//! The operations clients call, independent of the transport that carries
//! them. A [`ShortcutService`] borrows the registry for one request and
//! collects the change notifications the request produced.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::desktop::SUFFIX;
use crate::constants::registry::DEFAULT_CONTEXT;
use crate::keys::KeySequence;
use crate::registry::{MatchType, Registry, Shortcut, ShortcutInfo, ShortcutRef, split_component_address};

/// Client-side name of an action. `component` may carry `|context`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionId {
    pub component: String,
    pub action: String,
    pub component_friendly: String,
    pub action_friendly: String,
}

impl ActionId {
    pub fn new(
        component: impl Into<String>,
        action: impl Into<String>,
        component_friendly: impl Into<String>,
        action_friendly: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            action: action.into(),
            component_friendly: component_friendly.into(),
            action_friendly: action_friendly.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.component.is_empty() && !self.action.is_empty()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SetKeysFlags: u8 {
        /// The application is running and the shortcut may grab
        const SET_PRESENT = 1 << 0;
        /// Overwrite keys even when stored ones exist
        const NO_AUTOLOADING = 1 << 1;
        /// The keys are the application's defaults
        const IS_DEFAULT = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ServiceError {
    #[error("no such component: {0}")]
    NoSuchComponent(String),
    #[error("shortcut registry is not available")]
    Unavailable,
}

/// Keys of an action changed by someone other than its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutsChanged {
    pub action: ActionId,
    pub keys: Vec<KeySequence>,
}

pub struct ShortcutService<'a> {
    registry: &'a mut Registry,
    changes: Vec<ShortcutsChanged>,
}

fn info_of(registry: &Registry, shortcut: &Shortcut) -> Option<ShortcutInfo> {
    let component = registry.component(shortcut.component())?;
    let context = component.context(shortcut.context())?;
    Some(shortcut.info(component.friendly_name(), context.friendly_name()))
}

impl<'a> ShortcutService<'a> {
    pub fn new(registry: &'a mut Registry) -> Self {
        Self {
            registry,
            changes: Vec::new(),
        }
    }

    /// Notifications produced while this service was borrowed
    pub fn into_changes(self) -> Vec<ShortcutsChanged> {
        self.changes
    }

    fn find_action(&self, action: &ActionId) -> Option<ShortcutRef> {
        self.registry.resolve_action(&action.component, &action.action)
    }

    fn action_id(&self, shortcut: &Shortcut) -> ActionId {
        let component_friendly = self
            .registry
            .component(shortcut.component())
            .map(|component| component.friendly_name().to_string())
            .unwrap_or_default();
        ActionId::new(
            shortcut.component(),
            shortcut.unique_name(),
            component_friendly,
            shortcut.friendly_name(),
        )
    }

    /// Every component as `(unique, "", friendly, "")`
    pub fn all_main_components(&self) -> Vec<ActionId> {
        self.registry
            .all_component_names()
            .into_iter()
            .map(|(unique, friendly)| ActionId::new(unique, "", friendly, ""))
            .collect()
    }

    /// Confirmed actions of a component's default context
    pub fn all_actions_for_component(&self, action: &ActionId) -> Vec<ActionId> {
        let (name, _) = split_component_address(&action.component);
        let Some(component) = self.registry.component(name) else {
            debug!(component = %name, "No such component");
            return Vec::new();
        };
        let Some(context) = component.context(DEFAULT_CONTEXT) else {
            return Vec::new();
        };

        context
            .shortcuts()
            .filter(|shortcut| !shortcut.is_fresh())
            .map(|shortcut| self.action_id(shortcut))
            .collect()
    }

    /// The action a key is bound to in the live contexts
    pub fn action_list(&self, key: &KeySequence) -> Option<ActionId> {
        self.registry
            .shortcut_by_key(key, MatchType::Equal)
            .map(|shortcut| self.action_id(shortcut))
    }

    pub fn shortcut_keys(&self, action: &ActionId) -> Vec<KeySequence> {
        self.find_action(action)
            .and_then(|reference| self.registry.shortcut(&reference))
            .map(|shortcut| shortcut.keys().to_vec())
            .unwrap_or_default()
    }

    pub fn default_shortcut_keys(&self, action: &ActionId) -> Vec<KeySequence> {
        self.find_action(action)
            .and_then(|reference| self.registry.shortcut(&reference))
            .map(|shortcut| shortcut.default_keys().to_vec())
            .unwrap_or_default()
    }

    /// Store keys for an action and return the keys it ends up with.
    /// Autoloading keeps keys a confirmed shortcut already has.
    pub fn set_shortcut_keys(
        &mut self,
        action: &ActionId,
        keys: &[KeySequence],
        flags: SetKeysFlags,
    ) -> Vec<KeySequence> {
        let Some(reference) = self.find_action(action) else {
            debug!(component = %action.component, action = %action.action, "No such action");
            return Vec::new();
        };

        if flags.contains(SetKeysFlags::IS_DEFAULT) {
            if self.registry.set_default_keys(&reference, keys) {
                self.registry.schedule_write();
            }
            return keys.to_vec();
        }

        let autoloading = !flags.contains(SetKeysFlags::NO_AUTOLOADING);
        let is_fresh = self
            .registry
            .shortcut(&reference)
            .is_some_and(Shortcut::is_fresh);

        if autoloading && !is_fresh {
            if flags.contains(SetKeysFlags::SET_PRESENT) {
                self.registry.set_shortcut_present(&reference, true);
            }
            return self
                .registry
                .shortcut(&reference)
                .map(|shortcut| shortcut.keys().to_vec())
                .unwrap_or_default();
        }

        let kept = self.registry.set_shortcut_keys(&reference, keys);
        if flags.contains(SetKeysFlags::SET_PRESENT) {
            self.registry.set_shortcut_present(&reference, true);
        }
        self.registry.set_shortcut_fresh(&reference, false);
        self.registry.schedule_write();
        kept
    }

    /// Change another application's keys and tell it about the result
    pub fn set_foreign_shortcut_keys(&mut self, action: &ActionId, keys: &[KeySequence]) {
        if self.find_action(action).is_none() {
            return;
        }
        let keys = self.set_shortcut_keys(action, keys, SetKeysFlags::NO_AUTOLOADING);
        self.changes.push(ShortcutsChanged {
            action: action.clone(),
            keys,
        });
    }

    pub fn global_shortcuts_by_key(&self, key: &KeySequence, match_type: MatchType) -> Vec<ShortcutInfo> {
        self.registry
            .shortcuts_by_key(key, match_type)
            .into_iter()
            .filter_map(|shortcut| info_of(&*self.registry, shortcut))
            .collect()
    }

    /// `component` may carry `|context`; it defaults to the default context
    pub fn is_global_shortcut_available(&self, key: &KeySequence, component: &str) -> bool {
        let (name, context) = split_component_address(component);
        self.registry
            .is_shortcut_available(key, name, context.unwrap_or(DEFAULT_CONTEXT))
    }

    pub fn block_global_shortcuts(&mut self, block: bool) {
        info!(block, "Global shortcuts blocked");
        if block {
            self.registry.deactivate_shortcuts(true);
        } else {
            self.registry.activate_shortcuts();
        }
    }

    /// Announce an action. Unknown actions are created fresh; known ones
    /// only pick up new display names.
    pub fn do_register(&mut self, action: &ActionId) {
        if !action.is_complete() {
            warn!(?action, "Ignoring registration of incomplete action id");
            return;
        }

        match self.find_action(action) {
            None => {
                self.add_action(action);
            }
            Some(reference) => {
                let mut changed = false;
                if !action.action_friendly.is_empty() {
                    changed |= self
                        .registry
                        .set_shortcut_friendly_name(&reference, &action.action_friendly);
                }
                if !action.component_friendly.is_empty() {
                    changed |= self
                        .registry
                        .set_component_friendly_name(&reference.component, &action.component_friendly);
                }
                if changed {
                    self.registry.schedule_write();
                }
            }
        }
    }

    fn add_action(&mut self, action: &ActionId) -> Option<ShortcutRef> {
        let (name, context) = split_component_address(&action.component);
        let context = context.unwrap_or(DEFAULT_CONTEXT);

        if self.registry.component(name).is_none() {
            if name.ends_with(SUFFIX) {
                self.registry
                    .create_service_action_component(name, &action.component_friendly);
                self.registry.activate_context(name, DEFAULT_CONTEXT);
                self.registry.load_from_service(name);
            } else {
                self.registry.create_component(name, &action.component_friendly);
            }
        }

        // Loading a launcher file may already have declared this action
        if let Some(existing) = self
            .registry
            .component(name)
            .and_then(|component| component.shortcut_by_name(&action.action, context))
        {
            return Some(existing.reference());
        }

        debug!(component = %name, context = %context, action = %action.action, "Adding action");
        self.registry
            .add_shortcut(name, context, &action.action, &action.action_friendly)
    }

    /// Forget an action in every context of its component
    pub fn unregister(&mut self, component: &str, action: &str) -> bool {
        if self.registry.resolve_action(component, action).is_none() {
            return false;
        }
        let (name, _) = split_component_address(component);
        self.registry.unregister_shortcut(name, action);
        self.registry.schedule_write();
        true
    }

    /// The owning application went away for now
    pub fn set_inactive(&mut self, action: &ActionId) {
        if let Some(reference) = self.find_action(action) {
            self.registry.set_shortcut_present(&reference, false);
        }
    }

    pub fn activate_global_shortcut_context(&mut self, component: &str, context: &str) -> bool {
        self.registry.activate_context(component, context)
    }

    /// Object path of a component
    pub fn get_component(&self, component: &str) -> Result<String, ServiceError> {
        self.registry
            .component(component)
            .map(|c| c.object_path())
            .ok_or_else(|| ServiceError::NoSuchComponent(component.to_string()))
    }

    pub fn shortcut_names(&self, component: &str, context: &str) -> Result<Vec<String>, ServiceError> {
        self.registry
            .component(component)
            .map(|c| c.shortcut_names(context))
            .ok_or_else(|| ServiceError::NoSuchComponent(component.to_string()))
    }

    pub fn all_shortcut_infos(&self, component: &str, context: &str) -> Result<Vec<ShortcutInfo>, ServiceError> {
        self.registry
            .component(component)
            .map(|c| c.all_shortcut_infos(context))
            .ok_or_else(|| ServiceError::NoSuchComponent(component.to_string()))
    }

    pub fn context_names(&self, component: &str) -> Result<Vec<String>, ServiceError> {
        self.registry
            .component(component)
            .map(|c| c.context_names())
            .ok_or_else(|| ServiceError::NoSuchComponent(component.to_string()))
    }

    pub fn invoke_shortcut(&mut self, component: &str, action: &str, context: &str) -> Result<bool, ServiceError> {
        if self.registry.component(component).is_none() {
            return Err(ServiceError::NoSuchComponent(component.to_string()));
        }
        let context = if context.is_empty() { DEFAULT_CONTEXT } else { context };
        Ok(self.registry.invoke_shortcut(component, action, context))
    }

    pub fn clean_up(&mut self, component: &str) -> Result<bool, ServiceError> {
        if self.registry.component(component).is_none() {
            return Err(ServiceError::NoSuchComponent(component.to_string()));
        }
        Ok(self.registry.clean_up(component))
    }

    pub fn is_active(&self, component: &str) -> Result<bool, ServiceError> {
        self.registry
            .component(component)
            .map(|c| c.is_active())
            .ok_or_else(|| ServiceError::NoSuchComponent(component.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchPaths, ShortcutStore};
    use crate::launch::testing::RecordingLauncher;
    use std::time::Duration;

    fn seq(text: &str) -> KeySequence {
        text.parse().unwrap()
    }

    fn registry(dir: &tempfile::TempDir) -> Registry {
        Registry::new(
            Some(ShortcutStore::new(dir.path().join("shortcuts.json"))),
            SearchPaths::new(vec![dir.path().join("data")]),
            Box::new(RecordingLauncher::default()),
            Duration::from_secs(60),
        )
    }

    fn overview() -> ActionId {
        ActionId::new("kwin", "Overview", "KWin", "Toggle Overview")
    }

    #[test]
    fn test_register_then_set_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);

        service.do_register(&overview());
        // Fresh actions are not listed
        assert!(service.all_actions_for_component(&overview()).is_empty());

        let keys = service.set_shortcut_keys(&overview(), &[seq("Meta+W")], SetKeysFlags::SET_PRESENT);
        assert_eq!(keys, vec![seq("Meta+W")]);
        assert_eq!(service.action_list(&seq("Meta+W")), Some(overview()));
        assert_eq!(service.all_actions_for_component(&overview()), vec![overview()]);
        assert!(service.is_active("kwin").unwrap());

        // Autoloading keeps what a confirmed shortcut already has
        let keys = service.set_shortcut_keys(&overview(), &[seq("Meta+Q")], SetKeysFlags::empty());
        assert_eq!(keys, vec![seq("Meta+W")]);
        assert!(registry.write_deadline().is_some());
    }

    #[test]
    fn test_default_keys_do_not_touch_current_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);
        service.do_register(&overview());

        let keys = service.set_shortcut_keys(&overview(), &[seq("Meta+D")], SetKeysFlags::IS_DEFAULT);
        assert_eq!(keys, vec![seq("Meta+D")]);
        assert_eq!(service.default_shortcut_keys(&overview()), vec![seq("Meta+D")]);
        assert!(service.shortcut_keys(&overview()).is_empty());
    }

    #[test]
    fn test_foreign_change_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);
        service.do_register(&overview());
        service.set_shortcut_keys(&overview(), &[seq("Meta+W")], SetKeysFlags::SET_PRESENT);

        service.set_foreign_shortcut_keys(&overview(), &[seq("Meta+Tab")]);
        service.set_foreign_shortcut_keys(&ActionId::new("kwin", "Missing", "", ""), &[seq("Meta+M")]);
        assert_eq!(
            service.into_changes(),
            vec![ShortcutsChanged {
                action: overview(),
                keys: vec![seq("Meta+Tab")],
            }]
        );
    }

    #[test]
    fn test_register_updates_friendly_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);
        service.do_register(&overview());
        service.do_register(&ActionId::new("kwin", "Overview", "Window Manager", "Show Overview"));

        let components = service.all_main_components();
        assert_eq!(components, vec![ActionId::new("kwin", "", "Window Manager", "")]);
        let infos = service.all_shortcut_infos("kwin", "default").unwrap();
        assert_eq!(infos[0].friendly_name, "Show Overview");
    }

    #[test]
    fn test_context_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);
        let work = ActionId::new("app|work", "a", "App", "A");
        service.do_register(&work);
        service.do_register(&ActionId::new("app", "a", "App", "A"));

        assert_eq!(service.context_names("app").unwrap(), vec!["default", "work"]);
        // Both contexts hold their own "a"
        assert_eq!(service.shortcut_names("app", "work").unwrap(), vec!["a"]);
        assert_eq!(service.shortcut_names("app", "default").unwrap(), vec!["a"]);

        // Work keys are set while work is not current, then tested for
        // availability from both sides
        let kept = service.set_shortcut_keys(&work, &[seq("Meta+A")], SetKeysFlags::NO_AUTOLOADING);
        assert_eq!(kept, vec![seq("Meta+A")]);
        assert!(!service.is_global_shortcut_available(&seq("Meta+A"), "other"));
        assert!(!service.is_global_shortcut_available(&seq("Meta+A"), "app|work"));
        assert!(service.is_global_shortcut_available(&seq("Meta+A"), "app"));

        assert!(service.activate_global_shortcut_context("app", "work"));
        assert!(!service.activate_global_shortcut_context("app", "play"));
    }

    #[test]
    fn test_unregister_and_components() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        let mut service = ShortcutService::new(&mut registry);
        service.do_register(&overview());

        assert_eq!(service.get_component("kwin").unwrap(), "/component/kwin");
        assert_eq!(
            service.get_component("nope"),
            Err(ServiceError::NoSuchComponent("nope".into()))
        );
        assert!(service.clean_up("nope").is_err());

        assert!(service.unregister("kwin", "Overview"));
        assert!(!service.unregister("kwin", "Overview"));
        assert!(service.shortcut_names("kwin", "default").unwrap().is_empty());
    }

    #[test]
    fn test_block_and_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(&dir);
        {
            let mut service = ShortcutService::new(&mut registry);
            service.do_register(&overview());
            service.set_shortcut_keys(&overview(), &[seq("Meta+W")], SetKeysFlags::SET_PRESENT);
            service.block_global_shortcuts(true);
        }
        assert!(registry.grabs().is_empty());

        let mut service = ShortcutService::new(&mut registry);
        service.block_global_shortcuts(false);
        service.set_inactive(&overview());
        assert!(!service.is_active("kwin").unwrap());

        let infos = service.global_shortcuts_by_key(&seq("Meta+W"), MatchType::Equal);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].component_friendly_name, "KWin");
        assert_eq!(infos[0].context_friendly_name, "Default Context");
    }
}
