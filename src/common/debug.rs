use anyhow::{Context, Result};
use serde::Serialize;
use std::process::Command;
use tracing::info;

use crate::config::SearchPaths;
use crate::registry::{Registry, ShortcutInfo};

/// Log system information for debugging purposes
pub fn log_system_info(search_paths: &SearchPaths) {
    info!("=== System Information ===");

    if let Ok(kernel) = get_command_output("uname", &["-sr"]) {
        info!("Kernel: {}", kernel);
    }

    if let Ok(os_release) = std::fs::read_to_string("/etc/os-release") {
        for line in os_release.lines() {
            if let Some(name) = line.strip_prefix("PRETTY_NAME=") {
                info!("OS: {}", name.trim_matches('"'));
                break;
            }
        }
    }

    // Session hints
    if let Ok(session) = std::env::var("XDG_SESSION_TYPE") {
        info!("Session Type: {}", session);
    }
    if let Ok(desktop) = std::env::var("XDG_CURRENT_DESKTOP") {
        info!("Desktop Environment: {}", desktop);
    }
    if std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_none() {
        info!("Session bus address not set, D-Bus activation will fail");
    }

    for dir in search_paths.data_dirs() {
        info!(dir = %dir.display(), "Data directory");
    }

    info!("==========================");
}

fn get_command_output(cmd: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(cmd).args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[derive(Serialize)]
struct ComponentDump {
    unique_name: String,
    friendly_name: String,
    active: bool,
    contexts: Vec<String>,
    shortcuts: Vec<ShortcutInfo>,
}

/// Pretty JSON of every component and its shortcuts, for `--dump`
pub fn dump_registry(registry: &Registry) -> Result<String> {
    let components: Vec<ComponentDump> = registry
        .components()
        .map(|component| ComponentDump {
            unique_name: component.unique_name().to_string(),
            friendly_name: component.friendly_name().to_string(),
            active: component.is_active(),
            contexts: component
                .contexts()
                .map(|context| context.unique_name().to_string())
                .collect(),
            shortcuts: component
                .contexts()
                .flat_map(|context| context.all_shortcut_infos(component.friendly_name()))
                .collect(),
        })
        .collect();

    serde_json::to_string_pretty(&components).context("Failed to serialize registry dump")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::testing::RecordingLauncher;
    use std::time::Duration;

    #[test]
    fn test_dump_lists_components() {
        let mut registry = Registry::new(
            None,
            SearchPaths::default(),
            Box::new(RecordingLauncher::default()),
            Duration::from_millis(500),
        );
        registry.create_component("org.kde.krunner", "KRunner");
        registry.add_shortcut("org.kde.krunner", "default", "Run Command", "Run Command");

        let dump = dump_registry(&registry).expect("dump serializes");
        let parsed: serde_json::Value = serde_json::from_str(&dump).expect("valid JSON");
        assert_eq!(parsed[0]["unique_name"], "org.kde.krunner");
        assert_eq!(parsed[0]["friendly_name"], "KRunner");
        assert_eq!(parsed[0]["shortcuts"][0]["unique_name"], "Run Command");
    }
}
