//! Per-session input bridge
//!
//! Receives decoded input from the compositor. Keyboard events go to the
//! registry; pointer buttons, scroll axes and gestures are matched here
//! against session shortcuts that live only as long as this process.

pub mod gestures;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::gestures::{MINIMUM_SCALE_DELTA, MINIMUM_SWIPE_DELTA};
use crate::keys::{Key, KeyChord, Modifiers};
use crate::registry::Registry;
pub use gestures::{
    Delta, GestureEvent, GestureRecognizer, PinchDirection, PinchGesture, SwipeDirection,
    SwipeGesture,
};

bitflags! {
    /// Pressed pointer buttons
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PointerButtons: u32 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerAxisDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Touchpad,
    Touchscreen,
}

/// What fires a session shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionTrigger {
    PointerButton {
        modifiers: Modifiers,
        buttons: PointerButtons,
    },
    PointerAxis {
        modifiers: Modifiers,
        direction: PointerAxisDirection,
    },
    Swipe {
        device: DeviceType,
        direction: SwipeDirection,
        finger_count: u32,
    },
    Pinch {
        direction: PinchDirection,
        finger_count: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionShortcut {
    pub name: String,
    pub trigger: SessionTrigger,
    /// Realtime shortcuts also receive progress while the gesture runs
    pub realtime: bool,
}

/// Notification for the owner of a session shortcut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Triggered { name: String },
    Progress { name: String, progress: f64 },
    Cancelled { name: String },
}

pub struct SessionManager {
    registry: Option<Registry>,
    shortcuts: Vec<SessionShortcut>,
    touchpad: GestureRecognizer,
    touchscreen: GestureRecognizer,
    events: Vec<SessionEvent>,
}

impl SessionManager {
    /// `registry` is `None` when it failed to initialize; keyboard shortcuts
    /// are then never consumed
    pub fn new(registry: Option<Registry>) -> Self {
        if registry.is_none() {
            warn!("No shortcut registry, keyboard shortcuts are disabled");
        }
        Self {
            registry,
            shortcuts: Vec::new(),
            touchpad: GestureRecognizer::default(),
            touchscreen: GestureRecognizer::default(),
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    pub fn registry_mut(&mut self) -> Option<&mut Registry> {
        self.registry.as_mut()
    }

    pub fn shortcuts(&self) -> &[SessionShortcut] {
        &self.shortcuts
    }

    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        match self.registry.as_mut() {
            Some(registry) => registry.shutdown(),
            None => Ok(()),
        }
    }

    /// Feed a key press; true if a shortcut consumed it
    pub fn process_key(&mut self, modifiers: Modifiers, key: Key, timestamp: u64) -> bool {
        if key.0 == 0 && modifiers.is_empty() {
            return false;
        }
        let Some(registry) = self.registry.as_mut() else {
            return false;
        };

        if registry.key_pressed(KeyChord::new(key, modifiers), timestamp) {
            return true;
        }
        // Layouts report Shift+Tab as Backtab, with or without the Shift bit,
        // while stored shortcuts may use either spelling
        if key == Key::BACKTAB {
            let shifted = modifiers | Modifiers::SHIFT;
            if registry.key_pressed(KeyChord::new(key, shifted), timestamp) {
                return true;
            }
            if registry.key_pressed(KeyChord::new(Key::TAB, shifted), timestamp) {
                return true;
            }
        }
        false
    }

    /// Release bookkeeping only; never consumes
    pub fn process_key_release(&mut self, modifiers: Modifiers, key: Key, timestamp: u64) -> bool {
        if let Some(registry) = self.registry.as_mut() {
            registry.key_released(KeyChord::new(key, modifiers), timestamp);
        }
        false
    }

    fn add_shortcut(&mut self, name: &str, trigger: SessionTrigger, realtime: bool) -> bool {
        if self.shortcuts.iter().any(|shortcut| shortcut.trigger == trigger) {
            debug!(name = %name, ?trigger, "Session shortcut already registered");
            return false;
        }
        debug!(name = %name, ?trigger, "Registered session shortcut");
        self.shortcuts.push(SessionShortcut {
            name: name.to_string(),
            trigger,
            realtime,
        });
        true
    }

    pub fn register_pointer_shortcut(
        &mut self,
        name: &str,
        modifiers: Modifiers,
        buttons: PointerButtons,
    ) -> bool {
        self.add_shortcut(name, SessionTrigger::PointerButton { modifiers, buttons }, false)
    }

    pub fn register_axis_shortcut(
        &mut self,
        name: &str,
        modifiers: Modifiers,
        direction: PointerAxisDirection,
    ) -> bool {
        self.add_shortcut(name, SessionTrigger::PointerAxis { modifiers, direction }, false)
    }

    fn register_swipe(
        &mut self,
        name: &str,
        device: DeviceType,
        direction: SwipeDirection,
        finger_count: u32,
        realtime: bool,
    ) -> bool {
        let trigger = SessionTrigger::Swipe {
            device,
            direction,
            finger_count,
        };
        if !self.add_shortcut(name, trigger, realtime) {
            return false;
        }
        let gesture = SwipeGesture {
            direction,
            finger_count,
            minimum_delta: MINIMUM_SWIPE_DELTA,
        };
        self.recognizer(device).register_swipe(name, gesture);
        true
    }

    fn register_pinch(
        &mut self,
        name: &str,
        direction: PinchDirection,
        finger_count: u32,
        realtime: bool,
    ) -> bool {
        let trigger = SessionTrigger::Pinch {
            direction,
            finger_count,
        };
        if !self.add_shortcut(name, trigger, realtime) {
            return false;
        }
        let gesture = PinchGesture {
            direction,
            finger_count,
            minimum_scale_delta: MINIMUM_SCALE_DELTA,
        };
        self.touchpad.register_pinch(name, gesture);
        true
    }

    pub fn register_touchpad_swipe(&mut self, name: &str, direction: SwipeDirection, finger_count: u32) -> bool {
        self.register_swipe(name, DeviceType::Touchpad, direction, finger_count, false)
    }

    pub fn register_realtime_touchpad_swipe(
        &mut self,
        name: &str,
        direction: SwipeDirection,
        finger_count: u32,
    ) -> bool {
        self.register_swipe(name, DeviceType::Touchpad, direction, finger_count, true)
    }

    pub fn register_touchpad_pinch(&mut self, name: &str, direction: PinchDirection, finger_count: u32) -> bool {
        self.register_pinch(name, direction, finger_count, false)
    }

    pub fn register_realtime_touchpad_pinch(
        &mut self,
        name: &str,
        direction: PinchDirection,
        finger_count: u32,
    ) -> bool {
        self.register_pinch(name, direction, finger_count, true)
    }

    pub fn register_touchscreen_swipe(
        &mut self,
        name: &str,
        direction: SwipeDirection,
        finger_count: u32,
    ) -> bool {
        self.register_swipe(name, DeviceType::Touchscreen, direction, finger_count, true)
    }

    /// Drop every session shortcut of that name, cancelling running gestures
    pub fn remove_shortcut(&mut self, name: &str) -> bool {
        let before = self.shortcuts.len();
        self.shortcuts.retain(|shortcut| shortcut.name != name);
        let removed = self.shortcuts.len() != before;

        let mut cancelled = self.touchpad.unregister(name);
        cancelled.extend(self.touchscreen.unregister(name));
        // The shortcut is gone, so its own cancellation is reported directly
        self.events.extend(cancelled.into_iter().filter_map(|event| match event {
            GestureEvent::Cancelled { name } => Some(SessionEvent::Cancelled { name }),
            _ => None,
        }));
        removed
    }

    fn trigger_first(&mut self, matches: impl Fn(&SessionTrigger) -> bool) -> bool {
        let Some(shortcut) = self.shortcuts.iter().find(|shortcut| matches(&shortcut.trigger)) else {
            return false;
        };
        debug!(name = %shortcut.name, "Session shortcut triggered");
        self.events.push(SessionEvent::Triggered {
            name: shortcut.name.clone(),
        });
        true
    }

    pub fn process_pointer_pressed(&mut self, modifiers: Modifiers, buttons: PointerButtons) -> bool {
        let wanted = SessionTrigger::PointerButton { modifiers, buttons };
        self.trigger_first(|trigger| *trigger == wanted)
    }

    pub fn process_axis(&mut self, modifiers: Modifiers, direction: PointerAxisDirection) -> bool {
        let wanted = SessionTrigger::PointerAxis { modifiers, direction };
        self.trigger_first(|trigger| *trigger == wanted)
    }

    fn recognizer(&mut self, device: DeviceType) -> &mut GestureRecognizer {
        match device {
            DeviceType::Touchpad => &mut self.touchpad,
            DeviceType::Touchscreen => &mut self.touchscreen,
        }
    }

    fn forward(&mut self, events: Vec<GestureEvent>) {
        for event in events {
            let session_event = match event {
                GestureEvent::Triggered { name } => SessionEvent::Triggered { name },
                GestureEvent::Cancelled { name } => SessionEvent::Cancelled { name },
                GestureEvent::Progress { name, progress } => {
                    let realtime = self
                        .shortcuts
                        .iter()
                        .any(|shortcut| shortcut.name == name && shortcut.realtime);
                    if !realtime {
                        continue;
                    }
                    SessionEvent::Progress { name, progress }
                }
            };
            self.events.push(session_event);
        }
    }

    pub fn process_swipe_start(&mut self, device: DeviceType, finger_count: u32) {
        self.recognizer(device).start_swipe(finger_count);
    }

    pub fn process_swipe_update(&mut self, device: DeviceType, delta: Delta) {
        let events = self.recognizer(device).update_swipe(delta);
        self.forward(events);
    }

    pub fn process_swipe_cancel(&mut self, device: DeviceType) {
        let events = self.recognizer(device).cancel_swipe();
        self.forward(events);
    }

    pub fn process_swipe_end(&mut self, device: DeviceType) {
        let events = self.recognizer(device).end_swipe();
        self.forward(events);
    }

    pub fn process_pinch_start(&mut self, finger_count: u32) {
        self.touchpad.start_pinch(finger_count);
    }

    /// Only the scale decides a pinch; angle and travel are accepted for
    /// completeness
    pub fn process_pinch_update(&mut self, scale: f64, _angle_delta: f64, _delta: Delta) {
        let events = self.touchpad.update_pinch(scale);
        self.forward(events);
    }

    pub fn process_pinch_cancel(&mut self) {
        let events = self.touchpad.cancel_pinch();
        self.forward(events);
    }

    pub fn process_pinch_end(&mut self) {
        let events = self.touchpad.end_pinch();
        self.forward(events);
    }

    /// Drain session shortcut notifications queued since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchPaths, ShortcutStore};
    use crate::constants::registry::DEFAULT_CONTEXT;
    use crate::keys::KeySequence;
    use crate::launch::testing::RecordingLauncher;
    use crate::registry::ShortcutEvent;
    use std::time::Duration;

    fn registry_with(key: &str) -> (Registry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new(
            Some(ShortcutStore::new(dir.path().join("shortcuts.json"))),
            SearchPaths::new(vec![]),
            Box::new(RecordingLauncher::default()),
            Duration::ZERO,
        );
        registry.create_component("kwin", "KWin");
        let reference = registry
            .add_shortcut("kwin", DEFAULT_CONTEXT, "Walk Back", "")
            .unwrap();
        let key: KeySequence = key.parse().unwrap();
        registry.set_shortcut_keys(&reference, &[key]);
        registry.set_shortcut_present(&reference, true);
        (registry, dir)
    }

    #[test]
    fn test_backtab_variants_reach_shift_tab() {
        let (registry, _dir) = registry_with("Alt+Shift+Tab");
        let mut session = SessionManager::new(Some(registry));

        assert!(session.process_key(Modifiers::ALT, Key::BACKTAB, 7));
        let events = session.registry_mut().unwrap().take_events();
        assert!(matches!(events.as_slice(), [ShortcutEvent::Pressed { timestamp: 7, .. }]));
    }

    #[test]
    fn test_without_registry_nothing_is_consumed() {
        let mut session = SessionManager::new(None);
        assert!(!session.process_key(Modifiers::CTRL, Key(30), 1));
        assert!(!session.process_key_release(Modifiers::CTRL, Key(30), 2));
        assert!(session.shutdown().is_ok());
    }

    #[test]
    fn test_empty_key_is_ignored() {
        let (registry, _dir) = registry_with("Meta+A");
        let mut session = SessionManager::new(Some(registry));
        assert!(!session.process_key(Modifiers::empty(), Key(0), 1));
        assert!(session.registry().unwrap().accumulated_sequence().is_empty());
    }

    #[test]
    fn test_pointer_and_axis_shortcuts() {
        let mut session = SessionManager::new(None);
        assert!(session.register_pointer_shortcut("move", Modifiers::META, PointerButtons::LEFT));
        assert!(!session.register_pointer_shortcut("again", Modifiers::META, PointerButtons::LEFT));
        assert!(session.register_axis_shortcut("zoom", Modifiers::META, PointerAxisDirection::Up));

        assert!(session.process_pointer_pressed(Modifiers::META, PointerButtons::LEFT));
        assert!(!session.process_pointer_pressed(Modifiers::empty(), PointerButtons::LEFT));
        assert!(session.process_axis(Modifiers::META, PointerAxisDirection::Up));
        assert!(!session.process_axis(Modifiers::META, PointerAxisDirection::Down));

        assert_eq!(
            session.take_events(),
            vec![
                SessionEvent::Triggered { name: "move".into() },
                SessionEvent::Triggered { name: "zoom".into() },
            ]
        );
    }

    #[test]
    fn test_realtime_swipe_reports_progress() {
        let mut session = SessionManager::new(None);
        assert!(session.register_realtime_touchpad_swipe("desktop-left", SwipeDirection::Left, 4));
        assert!(session.register_touchpad_swipe("quiet-up", SwipeDirection::Up, 4));
        assert!(!session.register_touchpad_swipe("dup", SwipeDirection::Up, 4));

        session.process_swipe_start(DeviceType::Touchpad, 4);
        session.process_swipe_update(DeviceType::Touchpad, Delta::new(-100.0, 0.0));
        session.process_swipe_update(DeviceType::Touchpad, Delta::new(-150.0, 0.0));
        session.process_swipe_end(DeviceType::Touchpad);

        assert_eq!(
            session.take_events(),
            vec![
                SessionEvent::Cancelled { name: "quiet-up".into() },
                SessionEvent::Progress { name: "desktop-left".into(), progress: 0.5 },
                SessionEvent::Progress { name: "desktop-left".into(), progress: 1.0 },
                SessionEvent::Triggered { name: "desktop-left".into() },
            ]
        );
    }

    #[test]
    fn test_touchscreen_and_touchpad_are_separate() {
        let mut session = SessionManager::new(None);
        assert!(session.register_touchscreen_swipe("edge", SwipeDirection::Down, 3));
        assert!(session.register_touchpad_swipe("pad", SwipeDirection::Down, 3));

        session.process_swipe_start(DeviceType::Touchscreen, 3);
        session.process_swipe_update(DeviceType::Touchscreen, Delta::new(0.0, 300.0));
        session.process_swipe_end(DeviceType::Touchscreen);

        let events = session.take_events();
        assert!(events.contains(&SessionEvent::Triggered { name: "edge".into() }));
        assert!(!events.iter().any(|event| matches!(event, SessionEvent::Triggered { name } if name == "pad")));
    }

    #[test]
    fn test_pinch_and_removal() {
        let mut session = SessionManager::new(None);
        assert!(session.register_realtime_touchpad_pinch("overview", PinchDirection::Contracting, 2));

        session.process_pinch_start(2);
        session.process_pinch_update(0.9, 0.0, Delta::default());
        assert!(session.remove_shortcut("overview"));
        assert!(!session.remove_shortcut("overview"));
        session.process_pinch_end();

        let events = session.take_events();
        assert_eq!(events.last(), Some(&SessionEvent::Cancelled { name: "overview".into() }));
        assert!(!events.iter().any(|event| matches!(event, SessionEvent::Triggered { .. })));
    }
}
