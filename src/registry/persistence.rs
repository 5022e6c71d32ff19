//! Loading and writing the shortcuts file

use anyhow::Result;
use tracing::{debug, info, warn};

use super::Registry;
use super::component::Component;
use crate::config::{ConfigGroup, DesktopEntry, ShortcutsFile, find_unique_files};
use crate::constants::desktop::{SERVICE_SUBDIR, SUFFIX};
use crate::constants::registry::DEFAULT_CONTEXT;
use crate::keys::format_key_list;

fn is_service_file_name(name: &str) -> bool {
    name.ends_with(SUFFIX)
}

/// Persistable shortcuts of one context; fresh and session shortcuts never
/// leave the process
fn fill_group(group: &mut ConfigGroup, component: &Component, context: &str) {
    let Some(context) = component.context(context) else {
        return;
    };

    for shortcut in context.shortcuts() {
        if shortcut.is_fresh() || shortcut.is_session_shortcut() {
            continue;
        }
        group.write_entry(
            shortcut.unique_name(),
            format_key_list(shortcut.keys()),
            format_key_list(shortcut.default_keys()),
            shortcut.friendly_name(),
        );
    }
}

fn component_group(component: &Component) -> ConfigGroup {
    let mut group = ConfigGroup::new(component.friendly_name());
    fill_group(&mut group, component, DEFAULT_CONTEXT);

    for context in component.contexts() {
        if context.unique_name() == DEFAULT_CONTEXT {
            continue;
        }
        let mut nested = ConfigGroup::new(context.friendly_name());
        fill_group(&mut nested, component, context.unique_name());
        group.contexts.insert(context.unique_name().to_string(), nested);
    }
    group
}

impl Registry {
    /// Rebuild the registry from the shortcuts file, then pick up launcher
    /// files that have no persisted group yet
    pub fn load_settings(&mut self) -> Result<()> {
        let groups = match &self.store {
            Some(store) => store.load()?,
            None => ShortcutsFile::new(),
        };

        for (name, group) in &groups {
            self.load_group(name, group);
        }

        self.load_service_actions();
        Ok(())
    }

    fn load_group(&mut self, name: &str, group: &ConfigGroup) {
        if self.components.contains_key(name) {
            warn!(component = %name, "Duplicate component group, skipping");
            return;
        }

        let is_service = is_service_file_name(name);
        if is_service {
            self.create_service_action_component(name, &group.friendly_name);
        } else {
            self.create_component(name, &group.friendly_name);
        }

        for (context_name, context_group) in &group.contexts {
            self.create_context(name, context_name, &context_group.friendly_name);
            self.activate_context(name, context_name);
            self.load_entries(name, context_group, is_service);
        }

        self.activate_context(name, DEFAULT_CONTEXT);
        self.load_entries(name, group, is_service);
        debug!(component = %name, contexts = group.contexts.len() + 1, "Loaded component");
    }

    /// Entries go into the component's current context
    fn load_entries(&mut self, component: &str, group: &ConfigGroup, present: bool) {
        for (action, keys, default_keys, friendly_name) in group.valid_entries() {
            let Some(reference) =
                self.register_shortcut(component, action, friendly_name, keys, default_keys)
            else {
                continue;
            };
            if present {
                self.set_shortcut_present(&reference, true);
            }
        }
    }

    fn load_service_actions(&mut self) {
        let dirs = self.search_paths.existing_subdirs(SERVICE_SUBDIR);

        for path in find_unique_files(&dirs, SUFFIX) {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if self.components.contains_key(file_name) {
                continue;
            }

            let entry = match DesktopEntry::load(&path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Skipping unreadable launcher file");
                    continue;
                }
            };
            if entry.no_display || entry.hidden {
                debug!(file = %file_name, "Skipping hidden launcher file");
                continue;
            }

            self.create_service_action_component(file_name, &entry.name);
            self.activate_context(file_name, DEFAULT_CONTEXT);
            self.load_from_service(file_name);
            info!(file = %file_name, "Loaded launcher shortcuts");
        }
    }

    /// Write every component with shortcuts; components left without any are
    /// dropped from both the registry and the file
    pub fn write_settings(&mut self) -> Result<()> {
        let empty: Vec<String> = self
            .components
            .values()
            .filter(|component| !component.has_shortcuts())
            .map(|component| component.unique_name().to_string())
            .collect();
        for name in &empty {
            debug!(component = %name, "Dropping component without shortcuts");
            self.components.shift_remove(name);
        }

        let Some(store) = &self.store else {
            return Ok(());
        };

        let groups: ShortcutsFile = self
            .components
            .values()
            .map(|component| (component.unique_name().to_string(), component_group(component)))
            .collect();

        store.save(&groups)
    }
}
