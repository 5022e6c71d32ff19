//! Touchpad and touchscreen gesture recognition
//!
//! One recognizer per device type. Swipes pick an axis once the fingers
//! have travelled far enough, and every gesture pointing the other way is
//! dropped. On end, gestures that travelled their minimum distance trigger
//! and the rest are cancelled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::gestures::AXIS_LOCK_DELTA;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    fn axis(self) -> Axis {
        match self {
            SwipeDirection::Up | SwipeDirection::Down => Axis::Vertical,
            SwipeDirection::Left | SwipeDirection::Right => Axis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinchDirection {
    Expanding,
    Contracting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Finger travel in surface units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub dx: f64,
    pub dy: f64,
}

impl Delta {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwipeGesture {
    pub direction: SwipeDirection,
    pub finger_count: u32,
    pub minimum_delta: f64,
}

impl SwipeGesture {
    /// Travel along the gesture's axis relative to its minimum, capped at 1
    pub fn progress(&self, delta: Delta) -> f64 {
        if self.minimum_delta <= 0.0 {
            return 1.0;
        }
        let travelled = match self.direction.axis() {
            Axis::Vertical => delta.dy,
            Axis::Horizontal => delta.dx,
        };
        (travelled.abs() / self.minimum_delta).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinchGesture {
    pub direction: PinchDirection,
    pub finger_count: u32,
    pub minimum_scale_delta: f64,
}

impl PinchGesture {
    pub fn progress(&self, scale: f64) -> f64 {
        if self.minimum_scale_delta <= 0.0 {
            return 1.0;
        }
        ((scale - 1.0).abs() / self.minimum_scale_delta).clamp(0.0, 1.0)
    }
}

/// Outcome for one registered gesture, addressed by its name
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Progress { name: String, progress: f64 },
    Triggered { name: String },
    Cancelled { name: String },
}

#[derive(Debug, Default)]
pub struct GestureRecognizer {
    swipes: Vec<(String, SwipeGesture)>,
    pinches: Vec<(String, PinchGesture)>,
    active_swipes: Vec<usize>,
    active_pinches: Vec<usize>,
    finger_count: u32,
    delta: Delta,
    axis: Option<Axis>,
    scale: f64,
}

impl GestureRecognizer {
    pub fn register_swipe(&mut self, name: impl Into<String>, gesture: SwipeGesture) {
        self.swipes.push((name.into(), gesture));
    }

    pub fn register_pinch(&mut self, name: impl Into<String>, gesture: PinchGesture) {
        self.pinches.push((name.into(), gesture));
    }

    /// Forget every gesture of that name; an active one is cancelled
    pub fn unregister(&mut self, name: &str) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        let was_active = self
            .active_swipes
            .iter()
            .any(|&index| self.swipes[index].0 == name)
            || self
                .active_pinches
                .iter()
                .any(|&index| self.pinches[index].0 == name);
        if was_active {
            events.push(GestureEvent::Cancelled {
                name: name.to_string(),
            });
        }

        // Indices shift on removal, so active sets are rebuilt by name
        let active_swipe_names = names_of(&self.swipes, &self.active_swipes);
        let active_pinch_names = names_of(&self.pinches, &self.active_pinches);
        self.swipes.retain(|(gesture, _)| gesture != name);
        self.pinches.retain(|(gesture, _)| gesture != name);
        self.active_swipes = indices_of(&self.swipes, &active_swipe_names);
        self.active_pinches = indices_of(&self.pinches, &active_pinch_names);

        events
    }

    pub fn is_active(&self) -> bool {
        !self.active_swipes.is_empty() || !self.active_pinches.is_empty()
    }

    /// Begin a swipe; returns how many gestures are candidates
    pub fn start_swipe(&mut self, finger_count: u32) -> usize {
        self.finger_count = finger_count;
        if self.is_active() {
            return 0;
        }

        let axis = self.axis;
        let candidates: Vec<usize> = self
            .swipes
            .iter()
            .enumerate()
            .filter(|(_, (_, gesture))| gesture.finger_count == finger_count)
            .filter(|(_, (_, gesture))| axis.is_none_or(|axis| gesture.direction.axis() == axis))
            .map(|(index, _)| index)
            .collect();

        debug!(fingers = finger_count, candidates = candidates.len(), "Swipe started");
        self.active_swipes = candidates;
        self.active_swipes.len()
    }

    pub fn update_swipe(&mut self, delta: Delta) -> Vec<GestureEvent> {
        self.delta.dx += delta.dx;
        self.delta.dy += delta.dy;

        let axis = match self.axis {
            Some(axis) => axis,
            None => {
                let axis = if self.delta.dx.abs() >= self.delta.dy.abs() {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                };
                // Small deltas do not commit to an axis yet
                if self.delta.dx.abs() >= AXIS_LOCK_DELTA || self.delta.dy.abs() >= AXIS_LOCK_DELTA {
                    self.axis = Some(axis);
                }
                axis
            }
        };
        let direction = match axis {
            Axis::Vertical if self.delta.dy < 0.0 => SwipeDirection::Up,
            Axis::Vertical => SwipeDirection::Down,
            Axis::Horizontal if self.delta.dx < 0.0 => SwipeDirection::Left,
            Axis::Horizontal => SwipeDirection::Right,
        };

        let mut events = Vec::new();
        // Second pass picks up gestures of the locked axis once the first
        // candidates are gone
        for _ in 0..2 {
            if self.active_swipes.is_empty() {
                self.start_swipe(self.finger_count);
            }
            let swipes = &self.swipes;
            self.active_swipes.retain(|&index| {
                let (name, gesture) = &swipes[index];
                if gesture.direction == direction {
                    return true;
                }
                events.push(GestureEvent::Cancelled { name: name.clone() });
                false
            });
        }

        for &index in &self.active_swipes {
            let (name, gesture) = &self.swipes[index];
            events.push(GestureEvent::Progress {
                name: name.clone(),
                progress: gesture.progress(self.delta),
            });
        }
        events
    }

    pub fn cancel_swipe(&mut self) -> Vec<GestureEvent> {
        let events = self.cancel_active();
        self.reset();
        events
    }

    pub fn end_swipe(&mut self) -> Vec<GestureEvent> {
        let delta = self.delta;
        let events = self
            .active_swipes
            .drain(..)
            .map(|index| {
                let (name, gesture) = &self.swipes[index];
                let name = name.clone();
                if gesture.progress(delta) >= 1.0 {
                    GestureEvent::Triggered { name }
                } else {
                    GestureEvent::Cancelled { name }
                }
            })
            .collect();
        self.reset();
        events
    }

    /// Begin a pinch; direction is decided by the first update
    pub fn start_pinch(&mut self, finger_count: u32) -> usize {
        self.finger_count = finger_count;
        if self.is_active() {
            return 0;
        }
        self.scale = 1.0;

        self.active_pinches = self
            .pinches
            .iter()
            .enumerate()
            .filter(|(_, (_, gesture))| gesture.finger_count == finger_count)
            .map(|(index, _)| index)
            .collect();
        debug!(fingers = finger_count, candidates = self.active_pinches.len(), "Pinch started");
        self.active_pinches.len()
    }

    pub fn update_pinch(&mut self, scale: f64) -> Vec<GestureEvent> {
        let direction = if scale < 1.0 {
            PinchDirection::Contracting
        } else {
            PinchDirection::Expanding
        };

        let mut events = Vec::new();
        for _ in 0..2 {
            if self.active_pinches.is_empty() {
                self.start_pinch(self.finger_count);
            }
            let pinches = &self.pinches;
            self.active_pinches.retain(|&index| {
                let (name, gesture) = &pinches[index];
                if gesture.direction == direction {
                    return true;
                }
                events.push(GestureEvent::Cancelled { name: name.clone() });
                false
            });
        }
        self.scale = scale;

        for &index in &self.active_pinches {
            let (name, gesture) = &self.pinches[index];
            events.push(GestureEvent::Progress {
                name: name.clone(),
                progress: gesture.progress(scale),
            });
        }
        events
    }

    pub fn cancel_pinch(&mut self) -> Vec<GestureEvent> {
        let events = self.cancel_active();
        self.reset();
        events
    }

    pub fn end_pinch(&mut self) -> Vec<GestureEvent> {
        let scale = self.scale;
        let events = self
            .active_pinches
            .drain(..)
            .map(|index| {
                let (name, gesture) = &self.pinches[index];
                let name = name.clone();
                if gesture.progress(scale) >= 1.0 {
                    GestureEvent::Triggered { name }
                } else {
                    GestureEvent::Cancelled { name }
                }
            })
            .collect();
        self.active_swipes.clear();
        self.reset();
        events
    }

    fn cancel_active(&mut self) -> Vec<GestureEvent> {
        let mut events: Vec<GestureEvent> = self
            .active_swipes
            .drain(..)
            .map(|index| GestureEvent::Cancelled {
                name: self.swipes[index].0.clone(),
            })
            .collect();
        events.extend(self.active_pinches.drain(..).map(|index| GestureEvent::Cancelled {
            name: self.pinches[index].0.clone(),
        }));
        events
    }

    fn reset(&mut self) {
        self.finger_count = 0;
        self.delta = Delta::default();
        self.axis = None;
        self.scale = 1.0;
    }
}

fn names_of<G>(gestures: &[(String, G)], active: &[usize]) -> Vec<String> {
    active.iter().map(|&index| gestures[index].0.clone()).collect()
}

fn indices_of<G>(gestures: &[(String, G)], names: &[String]) -> Vec<usize> {
    gestures
        .iter()
        .enumerate()
        .filter(|(_, (name, _))| names.contains(name))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(direction: SwipeDirection, finger_count: u32) -> SwipeGesture {
        SwipeGesture {
            direction,
            finger_count,
            minimum_delta: 100.0,
        }
    }

    fn recognizer() -> GestureRecognizer {
        let mut recognizer = GestureRecognizer::default();
        recognizer.register_swipe("left", swipe(SwipeDirection::Left, 3));
        recognizer.register_swipe("right", swipe(SwipeDirection::Right, 3));
        recognizer.register_swipe("up", swipe(SwipeDirection::Up, 3));
        recognizer.register_swipe("four-up", swipe(SwipeDirection::Up, 4));
        recognizer
    }

    fn triggered(events: &[GestureEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                GestureEvent::Triggered { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_finger_count_filters_candidates() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.start_swipe(3), 3);
        recognizer.cancel_swipe();
        assert_eq!(recognizer.start_swipe(4), 1);
        recognizer.cancel_swipe();
        assert_eq!(recognizer.start_swipe(2), 0);
    }

    #[test]
    fn test_swipe_locks_axis_and_triggers() {
        let mut recognizer = recognizer();
        recognizer.start_swipe(3);

        let events = recognizer.update_swipe(Delta::new(-20.0, 2.0));
        assert!(events.contains(&GestureEvent::Cancelled { name: "right".into() }));
        assert!(events.contains(&GestureEvent::Cancelled { name: "up".into() }));
        assert!(events.contains(&GestureEvent::Progress {
            name: "left".into(),
            progress: 0.2
        }));

        // Axis stays horizontal even when the fingers drift vertically
        let events = recognizer.update_swipe(Delta::new(-90.0, 60.0));
        assert!(events.contains(&GestureEvent::Progress {
            name: "left".into(),
            progress: 1.0
        }));

        assert_eq!(triggered(&recognizer.end_swipe()), vec!["left"]);
        assert!(!recognizer.is_active());
    }

    #[test]
    fn test_short_swipe_is_cancelled() {
        let mut recognizer = recognizer();
        recognizer.start_swipe(3);
        recognizer.update_swipe(Delta::new(0.0, -30.0));
        assert_eq!(
            recognizer.end_swipe(),
            vec![GestureEvent::Cancelled { name: "up".into() }]
        );
    }

    #[test]
    fn test_pinch_direction_and_progress() {
        let mut recognizer = GestureRecognizer::default();
        let pinch = |direction| PinchGesture {
            direction,
            finger_count: 2,
            minimum_scale_delta: 0.5,
        };
        recognizer.register_pinch("zoom-in", pinch(PinchDirection::Expanding));
        recognizer.register_pinch("zoom-out", pinch(PinchDirection::Contracting));

        assert_eq!(recognizer.start_pinch(2), 2);
        let events = recognizer.update_pinch(1.25);
        assert!(events.contains(&GestureEvent::Cancelled { name: "zoom-out".into() }));
        assert!(events.contains(&GestureEvent::Progress {
            name: "zoom-in".into(),
            progress: 0.5
        }));

        recognizer.update_pinch(1.5);
        assert_eq!(triggered(&recognizer.end_pinch()), vec!["zoom-in"]);
    }

    #[test]
    fn test_unregister_cancels_active_gesture() {
        let mut recognizer = recognizer();
        recognizer.start_swipe(4);
        assert_eq!(
            recognizer.unregister("four-up"),
            vec![GestureEvent::Cancelled { name: "four-up".into() }]
        );
        assert!(!recognizer.is_active());
        assert!(recognizer.unregister("four-up").is_empty());

        // Remaining indices still resolve after removal
        recognizer.start_swipe(3);
        recognizer.update_swipe(Delta::new(0.0, -150.0));
        assert_eq!(triggered(&recognizer.end_swipe()), vec!["up"]);
    }
}
