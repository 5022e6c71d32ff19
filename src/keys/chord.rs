//! Key chords and key code naming
//!
//! A chord is one key plus the modifiers held while it was pressed. Key codes
//! live in the Linux input-event code space (`evdev`), extended by a small
//! synthetic range for keys that only exist after layout translation.

use bitflags::bitflags;
use evdev::KeyCode;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::input;

bitflags! {
    /// Modifier mask of a chord
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

impl Modifiers {
    /// Parse a single modifier token (`Ctrl`, `Super`, ...)
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::CTRL),
            "shift" => Some(Self::SHIFT),
            "alt" => Some(Self::ALT),
            "meta" | "super" | "win" => Some(Self::META),
            _ => None,
        }
    }

    /// Modifier names in portable order
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::CTRL) {
            names.push("Ctrl");
        }
        if self.contains(Self::ALT) {
            names.push("Alt");
        }
        if self.contains(Self::SHIFT) {
            names.push("Shift");
        }
        if self.contains(Self::META) {
            names.push("Meta");
        }
        names
    }
}

/// A key code: an evdev code, or a synthetic code at or above
/// [`input::SYNTHETIC_BASE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(pub u32);

/// Names that differ from the evdev spelling: (portable name, code)
/// The first entry for a code is the one used for display.
const KEY_ALIASES: &[(&str, u32)] = &[
    ("Return", 28),
    ("Enter", 28),
    ("Esc", 1),
    ("Escape", 1),
    ("Backspace", 14),
    ("Tab", input::KEY_TAB as u32),
    ("Backtab", input::KEY_BACKTAB),
    ("Space", 57),
    ("Print", 99),
    ("SysReq", 99),
    ("PgUp", 104),
    ("PgDown", 109),
    ("Ins", 110),
    ("Del", 111),
    ("Ctrl", input::KEY_LEFTCTRL as u32),
    ("Shift", input::KEY_LEFTSHIFT as u32),
    ("Alt", input::KEY_LEFTALT as u32),
    ("Meta", input::KEY_LEFTMETA as u32),
    ("Super", input::KEY_LEFTMETA as u32),
];

impl Key {
    pub const TAB: Key = Key(input::KEY_TAB as u32);
    pub const BACKTAB: Key = Key(input::KEY_BACKTAB);

    pub fn from_evdev(code: KeyCode) -> Self {
        Self(code.code() as u32)
    }

    pub fn is_synthetic(self) -> bool {
        self.0 >= input::SYNTHETIC_BASE
    }

    /// The modifier this key produces, if it is a modifier key
    pub fn as_modifier(self) -> Option<Modifiers> {
        let code = u16::try_from(self.0).ok()?;
        match code {
            input::KEY_LEFTSHIFT | input::KEY_RIGHTSHIFT => Some(Modifiers::SHIFT),
            input::KEY_LEFTCTRL | input::KEY_RIGHTCTRL => Some(Modifiers::CTRL),
            input::KEY_LEFTALT | input::KEY_RIGHTALT => Some(Modifiers::ALT),
            input::KEY_LEFTMETA | input::KEY_RIGHTMETA => Some(Modifiers::META),
            _ => None,
        }
    }

    /// Canonical key for a modifier (left and right variants collapse)
    pub fn modifier_key(modifier: Modifiers) -> Option<Self> {
        let code = match modifier {
            Modifiers::SHIFT => input::KEY_LEFTSHIFT,
            Modifiers::CTRL => input::KEY_LEFTCTRL,
            Modifiers::ALT => input::KEY_LEFTALT,
            Modifiers::META => input::KEY_LEFTMETA,
            _ => return None,
        };
        Some(Self(code as u32))
    }

    /// Portable name of this key (e.g. `Return`, `F1`, `A`)
    pub fn name(self) -> String {
        if let Some((name, _)) = KEY_ALIASES.iter().find(|(_, code)| *code == self.0) {
            return (*name).to_string();
        }
        if self.is_synthetic() {
            return format!("0x{:x}", self.0);
        }

        // evdev's Debug output is the Linux name (e.g. "KEY_TAB")
        let linux_name = format!("{:?}", KeyCode(self.0 as u16));
        match linux_name.strip_prefix("KEY_") {
            Some(name) => title_case(name),
            None => format!("0x{:x}", self.0),
        }
    }

    /// Parse a portable key name; accepts aliases, evdev names without the
    /// `KEY_` prefix in any case, and `0x` hex codes
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some((_, code)) = KEY_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        {
            return Some(Self(*code));
        }
        if let Some(hex) = name.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16).ok().map(Self);
        }

        let linux_name = format!("KEY_{}", name.to_ascii_uppercase());
        KeyCode::from_str(&linux_name)
            .ok()
            .map(|code| Self(code.code() as u32))
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str().to_lowercase()),
    }
}

/// One key plus the modifiers held with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A chord made of a key and no modifiers
    pub fn bare(key: Key) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// A lone modifier press arrives as "modifier + itself"; reduce it to the
    /// plain modifier key so `Shift` matches a binding of `Shift`.
    pub fn corrected(self) -> Self {
        match self.key.as_modifier() {
            Some(modifier) if self.modifiers == modifier => {
                let key = Key::modifier_key(modifier).unwrap_or(self.key);
                Self::bare(key)
            }
            _ => self,
        }
    }

    /// Shift+Backtab and Shift+Tab are the same physical chord; fold both
    /// onto Shift+Tab.
    pub fn normalized(self) -> Self {
        if self.modifiers.contains(Modifiers::SHIFT)
            && (self.key == Key::TAB || self.key == Key::BACKTAB)
        {
            Self::new(Key::TAB, self.modifiers)
        } else {
            self
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.modifiers.names() {
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key.name())
    }
}

/// Error produced when a chord or sequence cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyError {
    #[error("empty key text")]
    Empty,
    #[error("unknown key name: {0}")]
    UnknownKey(String),
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
    #[error("sequence has more than {max} chords", max = crate::constants::keys::MAX_SEQUENCE_LENGTH)]
    TooLong,
}

impl FromStr for KeyChord {
    type Err = ParseKeyError;

    /// Parse `Ctrl+Alt+F`: every token but the last is a modifier
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseKeyError::Empty);
        }

        let tokens: Vec<&str> = text.split('+').map(str::trim).collect();
        let Some((key_name, modifier_names)) = tokens.split_last() else {
            return Err(ParseKeyError::Empty);
        };
        if key_name.is_empty() {
            return Err(ParseKeyError::Empty);
        }

        let mut modifiers = Modifiers::empty();
        for name in modifier_names {
            modifiers |= Modifiers::parse_name(name)
                .ok_or_else(|| ParseKeyError::UnknownModifier((*name).to_string()))?;
        }
        let key =
            Key::from_name(key_name).ok_or_else(|| ParseKeyError::UnknownKey((*key_name).to_string()))?;

        Ok(Self::new(key, modifiers))
    }
}

impl Serialize for KeyChord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyChord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
