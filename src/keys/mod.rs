//! Portable key model: chords, sequences and the text format they persist in

pub mod chord;
pub mod sequence;

pub use chord::{Key, KeyChord, Modifiers, ParseKeyError};
pub use sequence::{KeySequence, SequenceMatch, conflicts, format_key_list, parse_key_list};
