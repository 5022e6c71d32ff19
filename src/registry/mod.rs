//! Shortcut registry
//!
//! Owns every component, the live grab table and the chord buffer used to
//! match multi-chord sequences. All entry points run to completion on the
//! caller's thread; the only deferred work is the debounced write-out, which
//! the owner drives through [`Registry::write_deadline`] and
//! [`Registry::flush_due_write`].
//!
//! Shortcuts are addressed by name ([`ShortcutRef`]) rather than by pointer,
//! so every cross reference is resolved through the registry.

pub mod component;
pub mod context;
pub mod grabs;
pub mod persistence;
pub mod service_action;
pub mod shortcut;
pub mod write_schedule;

#[cfg(test)]
mod tests;

use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub use component::{Component, ComponentKind};
pub use context::{Context, MatchType};
pub use grabs::{GrabTable, ShortcutEvent};
pub use service_action::ServiceAction;
pub use shortcut::{Shortcut, ShortcutInfo, ShortcutRef};
pub use write_schedule::WriteSchedule;

use crate::config::{SearchPaths, ShortcutStore};
use crate::constants::registry::CONTEXT_SEPARATOR;
use crate::keys::{KeyChord, KeySequence, conflicts, parse_key_list};
use crate::launch::Launcher;

pub struct Registry {
    components: IndexMap<String, Component>,
    grabs: GrabTable,
    accumulated: KeySequence,
    store: Option<ShortcutStore>,
    search_paths: SearchPaths,
    launcher: Box<dyn Launcher>,
    write: WriteSchedule,
}

fn shortcut_entry<'a>(
    components: &'a mut IndexMap<String, Component>,
    reference: &ShortcutRef,
) -> Option<&'a mut Shortcut> {
    components
        .get_mut(&reference.component)?
        .shortcut_by_name_mut(&reference.action, &reference.context)
}

fn is_same(shortcut: &Shortcut, reference: &ShortcutRef) -> bool {
    shortcut.component() == reference.component
        && shortcut.context() == reference.context
        && shortcut.unique_name() == reference.action
}

/// Split `component|context`; a bare component name has no context
pub fn split_component_address(address: &str) -> (&str, Option<&str>) {
    match address.split_once(CONTEXT_SEPARATOR) {
        Some((component, context)) => (component, Some(context)),
        None => (address, None),
    }
}

impl Registry {
    /// An empty registry. `store` is `None` when nothing should persist.
    pub fn new(
        store: Option<ShortcutStore>,
        search_paths: SearchPaths,
        launcher: Box<dyn Launcher>,
        write_delay: Duration,
    ) -> Self {
        Self {
            components: IndexMap::new(),
            grabs: GrabTable::default(),
            accumulated: KeySequence::empty(),
            store,
            search_paths,
            launcher,
            write: WriteSchedule::new(write_delay),
        }
    }

    /// Load persisted shortcuts and launcher files
    pub fn init(&mut self) -> anyhow::Result<()> {
        self.load_settings()?;
        info!(components = self.components.len(), "Shortcut registry ready");
        Ok(())
    }

    /// Flush a pending write and release every grab
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        let result = if self.write.cancel() {
            self.write_settings()
        } else {
            Ok(())
        };
        self.deactivate_shortcuts(false);
        result
    }

    fn insert_component(&mut self, component: Component) -> &mut Component {
        let name = component.unique_name().to_string();
        debug_assert!(
            !self.components.contains_key(&name),
            "component {name} already exists"
        );
        if self.components.contains_key(&name) {
            warn!(component = %name, "Component already exists");
        } else {
            debug!(component = %name, "Created component");
        }
        self.components.entry(name).or_insert(component)
    }

    pub fn create_component(&mut self, unique_name: &str, friendly_name: &str) -> &mut Component {
        self.insert_component(Component::new(unique_name, friendly_name, ComponentKind::Plain))
    }

    pub fn create_service_action_component(
        &mut self,
        unique_name: &str,
        friendly_name: &str,
    ) -> &mut Component {
        let service = ServiceAction::resolve(unique_name, &self.search_paths);
        self.insert_component(Component::new(
            unique_name,
            friendly_name,
            ComponentKind::ServiceAction(service),
        ))
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// `(unique_name, friendly_name)` of every component
    pub fn all_component_names(&self) -> Vec<(String, String)> {
        self.components
            .values()
            .map(|c| (c.unique_name().to_string(), c.friendly_name().to_string()))
            .collect()
    }

    pub fn grabs(&self) -> &GrabTable {
        &self.grabs
    }

    pub fn accumulated_sequence(&self) -> &KeySequence {
        &self.accumulated
    }

    pub fn activate_shortcuts(&mut self) {
        for component in self.components.values_mut() {
            component.activate_shortcuts(&mut self.grabs);
        }
    }

    pub fn deactivate_shortcuts(&mut self, temporarily: bool) {
        for component in self.components.values_mut() {
            component.deactivate_shortcuts(temporarily, &mut self.grabs);
        }
    }

    pub fn shortcut(&self, reference: &ShortcutRef) -> Option<&Shortcut> {
        self.components
            .get(&reference.component)?
            .shortcut_by_name(&reference.action, &reference.context)
    }

    /// First match across the components' current contexts
    pub fn shortcut_by_key(&self, key: &KeySequence, match_type: MatchType) -> Option<&Shortcut> {
        self.components
            .values()
            .find_map(|component| component.shortcut_by_key(key, match_type))
    }

    /// Matches from every context of the first component that has any
    pub fn shortcuts_by_key(&self, key: &KeySequence, match_type: MatchType) -> Vec<&Shortcut> {
        self.components
            .values()
            .map(|component| component.shortcuts_by_key(key, match_type))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// True if every component agrees the key is free for the requester
    pub fn is_shortcut_available(&self, key: &KeySequence, component: &str, context: &str) -> bool {
        self.components
            .values()
            .all(|c| c.is_shortcut_available(key, component, context))
    }

    /// Resolve an action given a `component[|context]` address. Without a
    /// context the component's current one is used.
    pub fn resolve_action(&self, component_address: &str, action: &str) -> Option<ShortcutRef> {
        let (name, context) = split_component_address(component_address);
        let Some(component) = self.components.get(name) else {
            debug!(component = %name, "Component not found");
            return None;
        };
        let context = context.unwrap_or(component.current_context_name());

        match component.shortcut_by_name(action, context) {
            Some(shortcut) => Some(shortcut.reference()),
            None => {
                debug!(component = %name, context = %context, action = %action, "No such action");
                None
            }
        }
    }

    pub fn create_context(&mut self, component: &str, context: &str, friendly_name: &str) -> bool {
        self.components
            .get_mut(component)
            .is_some_and(|c| c.create_context(context, friendly_name))
    }

    /// Switch a component's current context; false when it had to be created
    /// or the component is unknown
    pub fn activate_context(&mut self, component: &str, context: &str) -> bool {
        match self.components.get_mut(component) {
            Some(c) => c.activate_context(context, &mut self.grabs),
            None => {
                debug!(component = %component, "Cannot activate context of unknown component");
                false
            }
        }
    }

    /// Placeholder for an action a client announced: fresh, absent, no keys.
    /// The context is created when missing.
    pub fn add_shortcut(
        &mut self,
        component: &str,
        context: &str,
        action: &str,
        friendly_name: &str,
    ) -> Option<ShortcutRef> {
        let owner = self.components.get_mut(component)?;
        owner.create_context(context, "");
        let context_entry = owner.context_mut(context)?;

        if let Some(mut old) = context_entry.take(action) {
            old.set_inactive(&mut self.grabs);
        }
        context_entry.add(Shortcut::new(component, context, action, friendly_name));
        Some(ShortcutRef::new(component, context, action))
    }

    /// Create a confirmed shortcut in the component's current context from
    /// persisted key text. Keys another shortcut already claims are dropped.
    pub fn register_shortcut(
        &mut self,
        component: &str,
        action: &str,
        friendly_name: &str,
        keys: &str,
        default_keys: &str,
    ) -> Option<ShortcutRef> {
        let owner = self.components.get_mut(component)?;
        let context = owner.current_context_name().to_string();
        let context_entry = owner.context_mut(&context)?;

        if let Some(mut old) = context_entry.take(action) {
            old.set_inactive(&mut self.grabs);
        }

        let mut shortcut = Shortcut::new(component, &context, action, friendly_name);
        shortcut.set_default_keys(parse_key_list(default_keys));
        shortcut.set_fresh(false);
        context_entry.add(shortcut);

        let reference = ShortcutRef::new(component, context, action);
        self.set_shortcut_keys(&reference, &parse_key_list(keys));
        Some(reference)
    }

    /// Remove an action from every context of its component
    pub fn unregister_shortcut(&mut self, component: &str, action: &str) -> bool {
        self.components
            .get_mut(component)
            .is_some_and(|c| c.unregister_shortcut(action, &mut self.grabs))
    }

    /// Some other live shortcut whose keys conflict with `key`
    fn conflicting_shortcut(&self, key: &KeySequence, exclude: &ShortcutRef) -> Option<ShortcutRef> {
        let key = key.normalized();
        self.components
            .values()
            .flat_map(|component| component.current_context().shortcuts())
            .filter(|shortcut| !is_same(shortcut, exclude))
            .find(|shortcut| {
                let others: Vec<KeySequence> =
                    shortcut.keys().iter().map(KeySequence::normalized).collect();
                conflicts(&key, &others)
            })
            .map(Shortcut::reference)
    }

    /// Replace a shortcut's keys. Keys equal to, shadowing or shadowed by a
    /// key of another shortcut are dropped with a warning. Returns the keys
    /// that were kept.
    pub fn set_shortcut_keys(&mut self, reference: &ShortcutRef, keys: &[KeySequence]) -> Vec<KeySequence> {
        let mut accepted: Vec<KeySequence> = Vec::new();
        for key in keys {
            if key.is_empty() || accepted.contains(key) {
                continue;
            }
            if let Some(owner) = self.conflicting_shortcut(key, reference) {
                warn!(shortcut = %reference, key = %key, owner = %owner, "Key already taken, dropping it");
                continue;
            }
            accepted.push(key.clone());
        }

        match shortcut_entry(&mut self.components, reference) {
            Some(shortcut) => {
                shortcut.replace_keys(accepted.clone(), &mut self.grabs);
                accepted
            }
            None => Vec::new(),
        }
    }

    /// Returns whether the default keys changed
    pub fn set_default_keys(&mut self, reference: &ShortcutRef, keys: &[KeySequence]) -> bool {
        match shortcut_entry(&mut self.components, reference) {
            Some(shortcut) if shortcut.default_keys() != keys => {
                shortcut.set_default_keys(keys.to_vec());
                true
            }
            _ => false,
        }
    }

    pub fn set_shortcut_present(&mut self, reference: &ShortcutRef, present: bool) {
        if let Some(shortcut) = shortcut_entry(&mut self.components, reference) {
            shortcut.set_present(present, &mut self.grabs);
        }
    }

    pub fn set_shortcut_fresh(&mut self, reference: &ShortcutRef, fresh: bool) {
        if let Some(shortcut) = shortcut_entry(&mut self.components, reference) {
            shortcut.set_fresh(fresh);
        }
    }

    /// Returns whether the name changed
    pub fn set_shortcut_friendly_name(&mut self, reference: &ShortcutRef, name: &str) -> bool {
        match shortcut_entry(&mut self.components, reference) {
            Some(shortcut) if shortcut.friendly_name() != name => {
                shortcut.set_friendly_name(name);
                true
            }
            _ => false,
        }
    }

    /// Returns whether the name changed
    pub fn set_component_friendly_name(&mut self, component: &str, name: &str) -> bool {
        match self.components.get_mut(component) {
            Some(c) if c.friendly_name() != name => {
                c.set_friendly_name(name);
                true
            }
            _ => false,
        }
    }

    /// Drop shortcuts whose application went away; schedules a write when
    /// anything changed
    pub fn clean_up(&mut self, component: &str) -> bool {
        let changed = self
            .components
            .get_mut(component)
            .is_some_and(|c| c.clean_up(&mut self.grabs));
        if changed {
            self.schedule_write();
        }
        changed
    }

    /// Fire a shortcut by name as if its key had been pressed
    pub fn invoke_shortcut(&mut self, component: &str, action: &str, context: &str) -> bool {
        let Some(reference) = self
            .components
            .get(component)
            .and_then(|c| c.shortcut_by_name(action, context))
            .map(Shortcut::reference)
        else {
            return false;
        };
        self.trigger(&reference);
        true
    }

    fn trigger(&mut self, reference: &ShortcutRef) {
        let Some(component) = self.components.get(&reference.component) else {
            return;
        };
        let is_service_action = matches!(component.kind(), ComponentKind::ServiceAction(_));

        if is_service_action {
            self.launch_service_action(reference);
        } else {
            self.grabs.emit_pressed(reference.clone());
        }
    }

    /// Feed one pressed chord. Returns true if a shortcut consumed it.
    #[instrument(level = "trace", skip(self))]
    pub fn key_pressed(&mut self, chord: KeyChord, timestamp: u64) -> bool {
        let chord = chord.corrected();
        self.grabs.set_event_time(timestamp);
        self.accumulated.push_rotating(chord);

        // Trailing chords, shortest first, since the buffer rotates instead
        // of resetting when full
        let found = (1..=self.accumulated.len()).find_map(|length| {
            let candidate = self.accumulated.suffix(length);
            self.shortcut_by_key(&candidate, MatchType::Equal)
                .map(|shortcut| (shortcut.reference(), shortcut.is_registered()))
        });

        let Some((reference, active)) = found else {
            debug!(chord = %chord, sequence = %self.accumulated, "No shortcut for key");
            return false;
        };
        if !active {
            debug!(chord = %chord, shortcut = %reference, "Shortcut for key is inactive");
            return false;
        }

        debug!(chord = %chord, shortcut = %reference, "Shortcut triggered");
        self.accumulated.clear();

        if let Some(previous) = self.grabs.take_last_triggered()
            && previous != reference
        {
            self.grabs.emit_released(previous);
        }

        self.trigger(&reference);
        // Launcher shortcuts are tracked too: their release is reported
        // even though the press became a launch
        self.grabs.set_last_triggered(reference);
        true
    }

    /// Release bookkeeping only; never consumes the event
    #[instrument(level = "trace", skip(self))]
    pub fn key_released(&mut self, chord: KeyChord, timestamp: u64) -> bool {
        self.grabs.set_event_time(timestamp);
        if let Some(previous) = self.grabs.take_last_triggered() {
            self.grabs.emit_released(previous);
        }
        false
    }

    /// Drain pressed/released notifications queued since the last call
    pub fn take_events(&mut self) -> Vec<ShortcutEvent> {
        self.grabs.take_events()
    }

    /// (Re)arm the debounced write-out
    pub fn schedule_write(&mut self) {
        self.write.schedule(Instant::now());
    }

    pub fn write_deadline(&self) -> Option<Instant> {
        self.write.deadline()
    }

    /// Write if the deadline passed; returns whether a write happened
    pub fn flush_due_write(&mut self, now: Instant) -> anyhow::Result<bool> {
        if !self.write.take_due(now) {
            return Ok(false);
        }
        self.write_settings()?;
        Ok(true)
    }
}
