//! Configuration management
//!
//! Broker settings and persisted shortcuts are JSON files under the XDG
//! config directory; launcher descriptions are read from the XDG data
//! directories.

pub mod desktop_entry;
pub mod settings;
pub mod store;

pub use desktop_entry::{DesktopAction, DesktopEntry, find_unique_files};
pub use settings::{BrokerConfig, SearchPaths};
pub use store::{ConfigGroup, ShortcutStore, ShortcutsFile};
