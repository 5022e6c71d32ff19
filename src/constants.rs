//! Application-wide constants
//!
//! Names, limits and well-known identifiers shared by the registry, the
//! persistence layer and the launcher, kept in one place.

/// Key sequence limits
pub mod keys {
    /// Maximum number of chords in one key sequence
    pub const MAX_SEQUENCE_LENGTH: usize = 4;

    /// Separator between the chords of one sequence in portable text
    pub const CHORD_SEPARATOR: &str = ", ";

    /// Separator between alternative sequences of one shortcut
    pub const LIST_SEPARATOR: char = '\t';

    /// Portable text of an empty key list
    pub const NONE: &str = "none";
}

/// Input event constants (from linux/input-event-codes.h)
pub mod input {
    pub const KEY_TAB: u16 = 15;
    pub const KEY_LEFTCTRL: u16 = 29;
    pub const KEY_LEFTSHIFT: u16 = 42;
    pub const KEY_RIGHTSHIFT: u16 = 54;
    pub const KEY_LEFTALT: u16 = 56;
    pub const KEY_RIGHTCTRL: u16 = 97;
    pub const KEY_RIGHTALT: u16 = 100;
    pub const KEY_LEFTMETA: u16 = 125;
    pub const KEY_RIGHTMETA: u16 = 126;

    /// First code of the synthetic key range (never produced by evdev)
    pub const SYNTHETIC_BASE: u32 = 0x1000;

    /// Synthetic code for the Shift+Tab keysym some layouts report
    pub const KEY_BACKTAB: u32 = SYNTHETIC_BASE + 1;
}

/// Registry naming conventions
pub mod registry {
    /// Context every component owns from construction on
    pub const DEFAULT_CONTEXT: &str = "default";

    /// Display name of the default context
    pub const DEFAULT_CONTEXT_FRIENDLY: &str = "Default Context";

    /// Display name given to contexts created implicitly by activation
    pub const UNCONFIGURED_CONTEXT_FRIENDLY: &str = "Unconfigured Context";

    /// Separator between component and context in a component address
    pub const CONTEXT_SEPARATOR: char = '|';

    /// Shortcuts with this prefix live only for the session
    pub const SESSION_PREFIX: &str = "_k_session:";

    /// Component owning the shortcut that survives temporary blocking
    pub const PROTECTED_COMPONENT: &str = "kwin";

    /// Action that survives temporary blocking
    pub const PROTECTED_ACTION: &str = "Block Global Shortcuts";

    /// Object path prefix of component objects
    pub const COMPONENT_PATH_PREFIX: &str = "/component/";
}

/// Desktop launcher files
pub mod desktop {
    /// Suffix of desktop entry file names
    pub const SUFFIX: &str = ".desktop";

    /// Shortcut name bound to the main entry of a launcher file
    pub const LAUNCH_ACTION: &str = "_launch";

    /// Data sub-directory holding shortcut launcher files
    pub const SERVICE_SUBDIR: &str = "kglobalaccel";

    /// Data sub-directory holding application launcher files
    pub const APPLICATIONS_SUBDIR: &str = "applications";

    pub const MAIN_GROUP: &str = "Desktop Entry";
    pub const ACTION_GROUP_PREFIX: &str = "Desktop Action ";
    pub const SHORTCUTS_KEY: &str = "X-KDE-Shortcuts";
}

/// Session bus names used when launching
pub mod bus {
    pub const APPLICATION_INTERFACE: &str = "org.freedesktop.Application";
    pub const KLAUNCHER_SERVICE: &str = "org.kde.klauncher5";
    pub const KLAUNCHER_PATH: &str = "/KLauncher";
    pub const KLAUNCHER_INTERFACE: &str = "org.kde.KLauncher";
    pub const DBUS_SERVICE: &str = "org.freedesktop.DBus";
    pub const DBUS_PATH: &str = "/org/freedesktop/DBus";
}

/// Environment variables passed to launched processes
pub mod env {
    pub const ACTIVATION_TOKEN: &str = "XDG_ACTIVATION_TOKEN";
    pub const STARTUP_ID: &str = "DESKTOP_STARTUP_ID";
    pub const DATA_DIRS: &str = "XDG_DATA_DIRS";
    pub const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";
}

/// Configuration paths and filenames
pub mod config {
    /// Application directory name under XDG config
    pub const APP_DIR: &str = "shortcut-broker";

    /// Broker settings filename
    pub const FILENAME: &str = "broker.json";

    /// Persisted shortcuts filename
    pub const SHORTCUTS_FILENAME: &str = "shortcuts.json";

    /// Entry holding a component or context display name
    pub const FRIENDLY_NAME_ENTRY: &str = "_k_friendly_name";
}

/// Default configuration values
pub mod defaults {
    /// Debounce delay before dirty shortcuts are written out
    pub const WRITE_DELAY_MS: u64 = 500;

    /// Session launcher helper preferred for exec launches
    pub const LAUNCH_HELPER: &str = "kstart";
}

/// Gesture recognition thresholds
pub mod gestures {
    /// Accumulated delta at which a swipe locks onto an axis
    pub const AXIS_LOCK_DELTA: f64 = 5.0;

    /// Default delta a swipe has to travel to trigger
    pub const MINIMUM_SWIPE_DELTA: f64 = 200.0;

    /// Default scale change a pinch has to reach to trigger
    pub const MINIMUM_SCALE_DELTA: f64 = 0.2;
}
