//! Key sequences and the shadowing algorithms
//!
//! A sequence is up to four chords typed one after another. Two sequences
//! conflict when one is embedded in the other.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::chord::{KeyChord, ParseKeyError};
use crate::constants::keys::{CHORD_SEPARATOR, LIST_SEPARATOR, MAX_SEQUENCE_LENGTH, NONE};

/// Result of comparing one sequence against another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMatch {
    /// Both sequences are identical
    Exact,
    /// The sequence is a strict prefix of the other one
    Partial,
    No,
}

/// Ordered list of at most [`MAX_SEQUENCE_LENGTH`] chords. Empty means unbound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeySequence {
    chords: Vec<KeyChord>,
}

impl KeySequence {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_chords(chords: Vec<KeyChord>) -> Result<Self, ParseKeyError> {
        if chords.len() > MAX_SEQUENCE_LENGTH {
            return Err(ParseKeyError::TooLong);
        }
        Ok(Self { chords })
    }

    pub fn chords(&self) -> &[KeyChord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Chords in inverted order
    pub fn reversed(&self) -> Self {
        Self {
            chords: self.chords.iter().rev().copied().collect(),
        }
    }

    /// Drop the first `count` chords; empty when `count` exceeds the length
    pub fn cropped(&self, count: usize) -> Self {
        Self {
            chords: self.chords.iter().skip(count).copied().collect(),
        }
    }

    /// The trailing `count` chords
    pub fn suffix(&self, count: usize) -> Self {
        self.cropped(self.len().saturating_sub(count))
    }

    /// Append a chord, dropping the oldest one when the sequence is full
    pub fn push_rotating(&mut self, chord: KeyChord) {
        if self.chords.len() == MAX_SEQUENCE_LENGTH {
            self.chords.remove(0);
        }
        self.chords.push(chord);
    }

    pub fn clear(&mut self) {
        self.chords.clear();
    }

    pub fn matches(&self, other: &KeySequence) -> SequenceMatch {
        if self.len() > other.len() || self.chords[..] != other.chords[..self.len()] {
            SequenceMatch::No
        } else if self.len() == other.len() {
            SequenceMatch::Exact
        } else {
            SequenceMatch::Partial
        }
    }

    /// True if `other` is strictly embedded somewhere in this sequence,
    /// anchored at either end of one of its left-crops.
    pub fn contains(&self, other: &KeySequence) -> bool {
        let min_len = self.len().min(other.len());
        if min_len == 0 {
            return false;
        }

        let other_reversed = other.reversed();
        (0..=self.len() - min_len).any(|offset| {
            let cropped = self.cropped(offset);
            other.matches(&cropped) == SequenceMatch::Partial
                || other_reversed.matches(&cropped.reversed()) == SequenceMatch::Partial
        })
    }

    /// Canonical form used before any comparison
    pub fn normalized(&self) -> Self {
        Self {
            chords: self.chords.iter().map(|chord| chord.normalized()).collect(),
        }
    }
}

/// True if `candidate` is equal to, embeds, or is embedded in any non-empty
/// member of `existing`
pub fn conflicts<'a, I>(candidate: &KeySequence, existing: I) -> bool
where
    I: IntoIterator<Item = &'a KeySequence>,
{
    existing.into_iter().any(|other| {
        !other.is_empty()
            && (candidate == other || candidate.contains(other) || other.contains(candidate))
    })
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, chord) in self.chords.iter().enumerate() {
            if index > 0 {
                f.write_str(CHORD_SEPARATOR)?;
            }
            write!(f, "{chord}")?;
        }
        Ok(())
    }
}

impl FromStr for KeySequence {
    type Err = ParseKeyError;

    /// Parse `Ctrl+K, Ctrl+C`; blank text is the empty sequence
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let chords = text
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<KeyChord>, _>>()?;
        Self::from_chords(chords)
    }
}

impl Serialize for KeySequence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeySequence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Parse a tab separated list of sequences. `none` is the empty list;
/// unparsable and empty members are skipped.
pub fn parse_key_list(text: &str) -> Vec<KeySequence> {
    if text == NONE {
        return Vec::new();
    }

    text.split(LIST_SEPARATOR)
        .filter_map(|part| match part.parse::<KeySequence>() {
            Ok(sequence) if !sequence.is_empty() => Some(sequence),
            Ok(_) => None,
            Err(e) => {
                warn!(text = %part, error = %e, "Skipping unparsable key sequence");
                None
            }
        })
        .collect()
}

/// Inverse of [`parse_key_list`]
pub fn format_key_list(keys: &[KeySequence]) -> String {
    if keys.is_empty() {
        return NONE.to_string();
    }
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}
