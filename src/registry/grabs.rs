//! Live grab table
//!
//! Maps every grabbed key sequence to the shortcut owning it and counts how
//! many grabbed sequences use each chord. Only registered shortcuts ever
//! appear here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::shortcut::ShortcutRef;
use crate::keys::{KeyChord, KeySequence};

/// Notification for the client owning a shortcut
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortcutEvent {
    Pressed { shortcut: ShortcutRef, timestamp: u64 },
    Released { shortcut: ShortcutRef, timestamp: u64 },
}

#[derive(Debug, Default)]
pub struct GrabTable {
    active_keys: HashMap<KeySequence, ShortcutRef>,
    key_ref_counts: HashMap<KeyChord, usize>,
    last_triggered: Option<ShortcutRef>,
    event_time: u64,
    events: Vec<ShortcutEvent>,
}

impl GrabTable {
    /// Grab `key` for `shortcut`. Fails for the empty sequence and for a
    /// sequence that is already grabbed.
    pub fn register_key(&mut self, key: &KeySequence, shortcut: &ShortcutRef) -> bool {
        if key.is_empty() {
            debug!(shortcut = %shortcut, "Attempt to register an empty key");
            return false;
        }
        if let Some(owner) = self.active_keys.get(key) {
            debug!(shortcut = %shortcut, key = %key, owner = %owner, "Key already taken");
            return false;
        }

        debug!(key = %key, shortcut = %shortcut, "Registering key");
        for chord in key.chords() {
            *self.key_ref_counts.entry(*chord).or_default() += 1;
        }
        self.active_keys.insert(key.clone(), shortcut.clone());
        true
    }

    /// Release `key` if `shortcut` owns it
    pub fn unregister_key(&mut self, key: &KeySequence, shortcut: &ShortcutRef) -> bool {
        if self.active_keys.get(key) != Some(shortcut) {
            return false;
        }

        for chord in key.chords() {
            match self.key_ref_counts.get_mut(chord) {
                Some(count) if *count > 1 => {
                    debug!(chord = %chord, "Key still used by another shortcut");
                    *count -= 1;
                }
                Some(_) => {
                    debug!(chord = %chord, shortcut = %shortcut, "Unregistering key");
                    self.key_ref_counts.remove(chord);
                }
                None => {}
            }
        }

        if self.last_triggered.as_ref() == Some(shortcut) {
            self.last_triggered = None;
            self.emit_released(shortcut.clone());
        }

        self.active_keys.remove(key);
        true
    }

    pub fn owner(&self, key: &KeySequence) -> Option<&ShortcutRef> {
        self.active_keys.get(key)
    }

    pub fn ref_count(&self, chord: &KeyChord) -> usize {
        self.key_ref_counts.get(chord).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.active_keys.is_empty()
    }

    pub fn last_triggered(&self) -> Option<&ShortcutRef> {
        self.last_triggered.as_ref()
    }

    pub(crate) fn take_last_triggered(&mut self) -> Option<ShortcutRef> {
        self.last_triggered.take()
    }

    pub(crate) fn set_last_triggered(&mut self, shortcut: ShortcutRef) {
        self.last_triggered = Some(shortcut);
    }

    pub(crate) fn set_event_time(&mut self, timestamp: u64) {
        self.event_time = timestamp;
    }

    pub(crate) fn emit_pressed(&mut self, shortcut: ShortcutRef) {
        self.events.push(ShortcutEvent::Pressed {
            shortcut,
            timestamp: self.event_time,
        });
    }

    pub(crate) fn emit_released(&mut self, shortcut: ShortcutRef) {
        self.events.push(ShortcutEvent::Released {
            shortcut,
            timestamp: self.event_time,
        });
    }

    pub fn take_events(&mut self) -> Vec<ShortcutEvent> {
        std::mem::take(&mut self.events)
    }
}
