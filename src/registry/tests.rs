use std::fs;
use std::time::Duration;

use super::*;
use crate::constants::registry::DEFAULT_CONTEXT;
use crate::launch::LaunchRequest;
use crate::launch::testing::RecordingLauncher;

struct Fixture {
    _dir: tempfile::TempDir,
    data: std::path::PathBuf,
    store: std::path::PathBuf,
    launcher: RecordingLauncher,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        Self {
            store: dir.path().join("shortcuts.json"),
            data,
            _dir: dir,
            launcher: RecordingLauncher::default(),
        }
    }

    fn registry(&self) -> Registry {
        self.registry_with_delay(Duration::ZERO)
    }

    fn registry_with_delay(&self, delay: Duration) -> Registry {
        Registry::new(
            Some(ShortcutStore::new(&self.store)),
            SearchPaths::new(vec![self.data.clone()]),
            Box::new(self.launcher.clone()),
            delay,
        )
    }

    fn write_service(&self, name: &str, contents: &str) {
        let dir = self.data.join("kglobalaccel");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }
}

fn seq(text: &str) -> KeySequence {
    text.parse().unwrap()
}

fn chord(text: &str) -> KeyChord {
    text.parse().unwrap()
}

/// A confirmed, present shortcut in the default context
fn add_live(registry: &mut Registry, component: &str, action: &str, keys: &str) -> ShortcutRef {
    if registry.component(component).is_none() {
        registry.create_component(component, "");
    }
    let reference = registry
        .add_shortcut(component, DEFAULT_CONTEXT, action, "")
        .unwrap();
    registry.set_shortcut_fresh(&reference, false);
    registry.set_shortcut_keys(&reference, &parse_key_list(keys));
    registry.set_shortcut_present(&reference, true);
    reference
}

fn pressed(shortcut: &ShortcutRef, timestamp: u64) -> ShortcutEvent {
    ShortcutEvent::Pressed {
        shortcut: shortcut.clone(),
        timestamp,
    }
}

fn released(shortcut: &ShortcutRef, timestamp: u64) -> ShortcutEvent {
    ShortcutEvent::Released {
        shortcut: shortcut.clone(),
        timestamp,
    }
}

#[test]
fn test_key_has_at_most_one_owner() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let first = add_live(&mut registry, "app", "first", "Meta+A");
    let second = add_live(&mut registry, "other", "second", "Meta+B");

    let kept = registry.set_shortcut_keys(&second, &[seq("Meta+A"), seq("Meta+C")]);
    assert_eq!(kept, vec![seq("Meta+C")]);
    assert_eq!(registry.grabs().owner(&seq("Meta+A")), Some(&first));
    assert_eq!(registry.grabs().owner(&seq("Meta+C")), Some(&second));
    assert!(registry.grabs().owner(&seq("Meta+B")).is_none());
}

#[test]
fn test_shadowing_keys_are_rejected() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    add_live(&mut registry, "app", "find", "Ctrl+Alt+F");
    let chord_shortcut = add_live(&mut registry, "app", "chord", "none");

    let kept = registry.set_shortcut_keys(&chord_shortcut, &[seq("Ctrl+Alt+F, X")]);
    assert!(kept.is_empty());
    assert!(registry.shortcut(&chord_shortcut).unwrap().keys().is_empty());

    // Shadowed from the other side as well
    let kept = registry.set_shortcut_keys(&chord_shortcut, &[seq("Y, Ctrl+Alt+F")]);
    assert!(kept.is_empty());
}

#[test]
fn test_press_release_pairing() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let s = add_live(&mut registry, "app", "s", "Meta+S");
    let t = add_live(&mut registry, "app", "t", "Meta+T");

    assert!(registry.key_pressed(chord("Meta+S"), 1));
    assert!(registry.key_pressed(chord("Meta+T"), 2));
    assert_eq!(
        registry.take_events(),
        vec![pressed(&s, 1), released(&s, 2), pressed(&t, 2)]
    );

    assert!(!registry.key_released(chord("Meta+T"), 3));
    assert_eq!(registry.take_events(), vec![released(&t, 3)]);

    // Nothing left to release
    assert!(!registry.key_released(chord("Meta+T"), 4));
    assert!(registry.take_events().is_empty());
}

#[test]
fn test_unrelated_key_between_triggers() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let find = add_live(&mut registry, "app", "find", "Ctrl+Alt+F");

    assert!(registry.key_pressed(chord("Ctrl+Alt+F"), 1));
    assert_eq!(registry.take_events(), vec![pressed(&find, 1)]);

    assert!(!registry.key_pressed(chord("G"), 2));
    assert!(registry.take_events().is_empty());

    assert!(registry.key_pressed(chord("Ctrl+Alt+F"), 3));
    assert_eq!(registry.take_events(), vec![pressed(&find, 3)]);
}

#[test]
fn test_repeated_press_does_not_release() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let s = add_live(&mut registry, "app", "s", "Meta+S");

    assert!(registry.key_pressed(chord("Meta+S"), 1));
    assert!(registry.key_pressed(chord("Meta+S"), 2));
    assert_eq!(registry.take_events(), vec![pressed(&s, 1), pressed(&s, 2)]);
}

#[test]
fn test_multi_chord_sequence() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let s = add_live(&mut registry, "app", "s", "Meta+K, Meta+L");

    assert!(!registry.key_pressed(chord("Meta+K"), 1));
    assert_eq!(registry.accumulated_sequence().len(), 1);
    assert!(registry.key_pressed(chord("Meta+L"), 2));
    assert_eq!(registry.take_events(), vec![pressed(&s, 2)]);
    assert!(registry.accumulated_sequence().is_empty());
}

#[test]
fn test_chord_buffer_rotates() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    add_live(&mut registry, "app", "s", "Meta+K, Meta+L");

    for key in ["Q", "W", "E", "R", "U", "Meta+K"] {
        assert!(!registry.key_pressed(chord(key), 0));
        assert!(registry.accumulated_sequence().len() <= 4);
    }
    assert!(registry.key_pressed(chord("Meta+L"), 0));
}

#[test]
fn test_absent_shortcut_does_not_consume() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let s = add_live(&mut registry, "app", "s", "Meta+S");
    registry.set_shortcut_present(&s, false);

    assert!(!registry.key_pressed(chord("Meta+S"), 1));
    assert!(registry.take_events().is_empty());
    assert!(registry.grabs().is_empty());
}

#[test]
fn test_chord_reference_counts() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    add_live(&mut registry, "app", "b", "Meta+A, B");
    let c = add_live(&mut registry, "app", "c", "Meta+A, C");

    assert_eq!(registry.grabs().ref_count(&chord("Meta+A")), 2);
    assert_eq!(registry.grabs().ref_count(&chord("B")), 1);

    assert!(registry.unregister_shortcut(&c.component, &c.action));
    assert_eq!(registry.grabs().ref_count(&chord("Meta+A")), 1);
    assert_eq!(registry.grabs().ref_count(&chord("C")), 0);
}

#[test]
fn test_block_keeps_unblock_shortcut() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    add_live(&mut registry, "kwin", "Block Global Shortcuts", "Meta+Esc");
    add_live(&mut registry, "kwin", "Overview", "Meta+W");

    registry.deactivate_shortcuts(true);
    assert!(!registry.key_pressed(chord("Meta+W"), 1));
    assert!(registry.key_pressed(chord("Meta+Esc"), 2));

    registry.activate_shortcuts();
    assert!(registry.key_pressed(chord("Meta+W"), 3));
}

#[test]
fn test_context_switch_moves_grabs() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry();
    let a = add_live(&mut registry, "app", "a", "Meta+A");
    registry.create_context("app", "work", "Work");
    let b = registry.add_shortcut("app", "work", "b", "B").unwrap();
    registry.set_shortcut_fresh(&b, false);

    assert!(registry.activate_context("app", "work"));
    assert!(registry.grabs().owner(&seq("Meta+A")).is_none());
    assert!(registry.set_shortcut_keys(&b, &[seq("Meta+A")]) == vec![seq("Meta+A")]);
    registry.set_shortcut_present(&b, true);
    assert_eq!(registry.grabs().owner(&seq("Meta+A")), Some(&b));

    assert_eq!(registry.resolve_action("app", "b"), Some(b.clone()));
    assert_eq!(registry.resolve_action("app|default", "a"), Some(a));
    assert_eq!(registry.resolve_action("app", "a"), None);
}

#[test]
fn test_settings_roundtrip() {
    let fixture = Fixture::new();
    {
        let mut registry = fixture.registry();
        registry.create_component("app", "App");
        add_live(&mut registry, "app", "a", "Meta+A\tMeta+Shift+A");
        registry.add_shortcut("app", DEFAULT_CONTEXT, "fresh", "Fresh").unwrap();
        add_live(&mut registry, "app", "_k_session:tmp", "Meta+Q");

        registry.create_context("app", "work", "Work");
        let b = registry.add_shortcut("app", "work", "b", "Bee").unwrap();
        registry.set_shortcut_fresh(&b, false);
        registry.set_default_keys(&b, &[seq("Meta+B")]);
        assert_eq!(
            registry.set_shortcut_keys(&b, &[seq("Meta+B, X")]),
            vec![seq("Meta+B, X")]
        );

        registry.create_component("ghost", "Ghost");
        registry.write_settings().unwrap();
        assert!(registry.component("ghost").is_none());
    }

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fixture.store).unwrap()).unwrap();
    assert_eq!(json["app"]["_k_friendly_name"], "App");
    assert_eq!(json["app"]["entries"]["a"][0], "Meta+A\tShift+Meta+A");
    assert!(json["app"]["entries"].get("fresh").is_none());
    assert!(json["app"]["entries"].get("_k_session:tmp").is_none());
    assert_eq!(json["app"]["contexts"]["work"]["entries"]["b"][0], "Meta+B, X");
    assert_eq!(json["app"]["contexts"]["work"]["entries"]["b"][1], "Meta+B");
    assert!(json.get("ghost").is_none());

    let mut registry = fixture.registry();
    registry.init().unwrap();
    let component = registry.component("app").unwrap();
    assert_eq!(component.friendly_name(), "App");
    assert_eq!(component.current_context_name(), DEFAULT_CONTEXT);
    assert_eq!(component.context("work").unwrap().friendly_name(), "Work");

    let a = component.shortcut_by_name("a", DEFAULT_CONTEXT).unwrap();
    assert_eq!(a.keys(), &[seq("Meta+A"), seq("Meta+Shift+A")]);
    assert!(!a.is_fresh());
    assert!(!a.is_present());

    let b = component.shortcut_by_name("b", "work").unwrap();
    assert_eq!(b.friendly_name(), "Bee");
    assert_eq!(b.keys(), &[seq("Meta+B, X")]);
    assert_eq!(b.default_keys(), &[seq("Meta+B")]);
    assert!(!b.is_fresh());
    assert!(component.shortcut_by_name("fresh", DEFAULT_CONTEXT).is_none());
    assert!(component.shortcut_by_name("_k_session:tmp", DEFAULT_CONTEXT).is_none());
}

#[test]
fn test_write_is_debounced() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry_with_delay(Duration::from_secs(60));
    add_live(&mut registry, "app", "a", "Meta+A");

    assert!(registry.write_deadline().is_none());
    registry.schedule_write();
    let deadline = registry.write_deadline().unwrap();

    assert!(!registry.flush_due_write(std::time::Instant::now()).unwrap());
    assert!(!fixture.store.exists());

    assert!(registry.flush_due_write(deadline).unwrap());
    assert!(fixture.store.exists());
    assert!(registry.write_deadline().is_none());
}

#[test]
fn test_shutdown_flushes_pending_write() {
    let fixture = Fixture::new();
    let mut registry = fixture.registry_with_delay(Duration::from_secs(60));
    add_live(&mut registry, "app", "a", "Meta+A");
    registry.schedule_write();

    registry.shutdown().unwrap();
    assert!(fixture.store.exists());
    assert!(registry.grabs().is_empty());
}

const KONSOLE: &str = "\
[Desktop Entry]
Name=Konsole
Exec=konsole
DBusActivatable=true
X-KDE-Shortcuts=Ctrl+Alt+T
";

#[test]
fn test_launcher_file_activates_over_bus() {
    let fixture = Fixture::new();
    fixture.write_service("org.kde.konsole.desktop", KONSOLE);
    fixture.write_service("hidden.desktop", "[Desktop Entry]\nName=Hidden\nNoDisplay=true\n");
    fixture.write_service(
        "deleted.desktop",
        "[Desktop Entry]\nName=Deleted\nHidden=true\nX-KDE-Shortcuts=Meta+D\n",
    );

    let mut registry = fixture.registry();
    registry.init().unwrap();
    assert!(registry.component("hidden.desktop").is_none());
    assert!(registry.component("deleted.desktop").is_none());
    assert!(registry.grabs().owner(&seq("Meta+D")).is_none());

    let component = registry.component("org.kde.konsole.desktop").unwrap();
    assert_eq!(component.friendly_name(), "Konsole");
    let launch = component.shortcut_by_name("_launch", DEFAULT_CONTEXT).unwrap();
    assert!(launch.is_present());
    assert_eq!(launch.keys(), &[seq("Ctrl+Alt+T")]);

    assert!(registry.key_pressed(chord("Ctrl+Alt+T"), 5));
    assert_eq!(
        fixture.launcher.requests.borrow().as_slice(),
        &[LaunchRequest::Activate {
            bus_name: "org.kde.konsole".into(),
            object_path: "/org/kde/konsole".into(),
            action: None,
            token: Some("token-org.kde.konsole".into()),
        }]
    );
    // Launches replace the pressed notification
    assert!(registry.take_events().is_empty());
}

#[test]
fn test_launcher_file_spawns_command() {
    let fixture = Fixture::new();
    fixture.write_service(
        "org.kde.konsole.desktop",
        &KONSOLE.replace("DBusActivatable=true", "DBusActivatable=false"),
    );

    let mut registry = fixture.registry();
    registry.init().unwrap();
    assert!(registry.invoke_shortcut("org.kde.konsole.desktop", "_launch", DEFAULT_CONTEXT));

    assert_eq!(
        fixture.launcher.requests.borrow().as_slice(),
        &[LaunchRequest::Exec {
            program: "konsole".into(),
            args: vec![],
            application_id: None,
            token: Some("token-org.kde.konsole".into()),
        }]
    );
}

#[test]
fn test_persisted_launcher_group_is_present() {
    let fixture = Fixture::new();
    fs::write(
        &fixture.store,
        r#"{
            "org.kde.konsole.desktop": {
                "_k_friendly_name": "Konsole",
                "entries": { "_launch": ["Meta+Return", "Ctrl+Alt+T", "Konsole"] }
            }
        }"#,
    )
    .unwrap();
    fixture.write_service("org.kde.konsole.desktop", KONSOLE);

    let mut registry = fixture.registry();
    registry.init().unwrap();

    let reference = registry
        .resolve_action("org.kde.konsole.desktop", "_launch")
        .unwrap();
    let shortcut = registry.shortcut(&reference).unwrap();
    assert!(shortcut.is_present());
    assert_eq!(shortcut.keys(), &[seq("Meta+Return")]);
    assert_eq!(registry.grabs().owner(&seq("Meta+Return")), Some(&reference));
}

#[test]
fn test_clean_up_drops_launcher_shortcuts() {
    let fixture = Fixture::new();
    fixture.write_service("org.kde.konsole.desktop", KONSOLE);
    let mut registry = fixture.registry();
    registry.init().unwrap();

    assert!(registry.clean_up("org.kde.konsole.desktop"));
    assert!(registry.grabs().is_empty());
    assert!(registry.write_deadline().is_some());

    registry.write_settings().unwrap();
    assert!(registry.component("org.kde.konsole.desktop").is_none());
}

const TERMINAL: &str = "\
[Desktop Entry]
Name=Terminal
Exec=terminal
DBusActivatable=true
Actions=new-window;
X-KDE-Shortcuts=Super+Return

[Desktop Action new-window]
Name=New Window
Exec=terminal --new-window
X-KDE-Shortcuts=Super+Shift+Return
";

#[test]
fn test_launcher_actions_get_their_own_keys() {
    let fixture = Fixture::new();
    fixture.write_service("terminal.desktop", TERMINAL);

    let mut registry = fixture.registry();
    registry.init().unwrap();

    let component = registry.component("terminal.desktop").unwrap();
    let new_window = component.shortcut_by_name("new-window", DEFAULT_CONTEXT).unwrap();
    assert_eq!(new_window.friendly_name(), "New Window");
    assert_eq!(new_window.keys(), &[seq("Meta+Shift+Return")]);
    assert!(new_window.is_present());

    assert!(registry.key_pressed(chord("Super+Shift+Return"), 1));
    assert!(registry.key_pressed(chord("Super+Return"), 2));
    assert_eq!(
        fixture.launcher.requests.borrow().as_slice(),
        &[
            LaunchRequest::Activate {
                bus_name: "terminal".into(),
                object_path: "/terminal".into(),
                action: Some("new-window".into()),
                token: Some("token-terminal".into()),
            },
            LaunchRequest::Activate {
                bus_name: "terminal".into(),
                object_path: "/terminal".into(),
                action: None,
                token: Some("token-terminal".into()),
            },
        ]
    );
}

#[test]
fn test_launcher_release_is_still_reported() {
    let fixture = Fixture::new();
    fixture.write_service("terminal.desktop", TERMINAL);
    let mut registry = fixture.registry();
    registry.init().unwrap();

    // A launch replaces the press, but the release still goes out
    assert!(registry.key_pressed(chord("Super+Shift+Return"), 1));
    assert!(registry.take_events().is_empty());
    assert!(!registry.key_released(chord("Super+Shift+Return"), 2));

    let new_window = ShortcutRef::new("terminal.desktop", DEFAULT_CONTEXT, "new-window");
    assert_eq!(registry.take_events(), vec![released(&new_window, 2)]);
}
