//! Launcher-backed components
//!
//! A component named after a `.desktop` file gets its shortcuts from that
//! file instead of from a running client. Pressing one of them activates the
//! application over the bus or starts its command line.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Registry;
use super::shortcut::ShortcutRef;
use crate::config::{DesktopEntry, SearchPaths};
use crate::constants::desktop::{APPLICATIONS_SUBDIR, LAUNCH_ACTION, SERVICE_SUBDIR, SUFFIX};
use crate::launch::exec::parse_exec;
use crate::launch::{LaunchRequest, Launcher};

#[derive(Debug, Clone, Default)]
pub struct ServiceAction {
    desktop_file: Option<PathBuf>,
    in_applications_dir: bool,
    entry: Option<DesktopEntry>,
}

fn links_into_applications(path: &Path) -> bool {
    fs::read_link(path).is_ok_and(|target| {
        target
            .components()
            .any(|part| part.as_os_str() == APPLICATIONS_SUBDIR)
    })
}

impl ServiceAction {
    /// Find the launcher file: the shortcut service directories first, then
    /// the application directories
    pub fn resolve(file_name: &str, search_paths: &SearchPaths) -> Self {
        let (path, in_applications_dir) = match search_paths.locate(SERVICE_SUBDIR, file_name) {
            Some(path) => {
                let linked = links_into_applications(&path);
                (Some(path), linked)
            }
            None => (search_paths.locate(APPLICATIONS_SUBDIR, file_name), true),
        };

        let entry = match &path {
            Some(path) => match DesktopEntry::load(path) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Unreadable launcher file");
                    None
                }
            },
            None => {
                warn!(file = %file_name, "No launcher file found");
                None
            }
        };

        Self {
            desktop_file: path,
            in_applications_dir,
            entry,
        }
    }

    pub fn desktop_file(&self) -> Option<&Path> {
        self.desktop_file.as_deref()
    }

    pub fn entry(&self) -> Option<&DesktopEntry> {
        self.entry.as_ref()
    }

    /// `(action, friendly_name, keys)` for `_launch` and every declared action
    pub fn declared_shortcuts(&self) -> Vec<(String, String, String)> {
        let Some(entry) = &self.entry else {
            return Vec::new();
        };

        let mut declared = vec![(
            LAUNCH_ACTION.to_string(),
            entry.name.clone(),
            entry.shortcuts.clone(),
        )];
        for id in &entry.actions {
            if let Some(action) = entry.action(id) {
                declared.push((id.clone(), action.name.clone(), action.shortcuts.clone()));
            }
        }
        declared
    }

    /// What pressing `action` of the component `file_name` starts
    pub fn launch_request(
        &self,
        file_name: &str,
        action: &str,
        launcher: &mut dyn Launcher,
    ) -> Option<LaunchRequest> {
        let entry = self.entry.as_ref()?;
        let app_id = file_name.strip_suffix(SUFFIX).unwrap_or(file_name);
        let is_main = action == LAUNCH_ACTION;

        if entry.dbus_activatable {
            let object_path = format!("/{}", app_id.replace('.', "/").replace('-', "_"));
            return Some(LaunchRequest::Activate {
                bus_name: app_id.to_string(),
                object_path,
                action: (!is_main).then(|| action.to_string()),
                token: launcher.activation_token(app_id),
            });
        }

        let exec = if is_main {
            entry.exec.as_deref()
        } else {
            entry.action(action)?.exec.as_deref()
        };
        let (program, args) = parse_exec(exec?)?;

        Some(LaunchRequest::Exec {
            program,
            args,
            application_id: (is_main && self.in_applications_dir).then(|| app_id.to_string()),
            token: launcher.activation_token(app_id),
        })
    }
}

impl Registry {
    /// Register the shortcuts a launcher file declares. They are present
    /// right away: the file existing is all the presence there is.
    pub fn load_from_service(&mut self, component: &str) -> bool {
        let Some(declared) = self
            .components
            .get(component)
            .and_then(|c| c.service_action())
            .map(ServiceAction::declared_shortcuts)
        else {
            return false;
        };

        for (action, friendly_name, keys) in declared {
            // Tab is the list separator; older files used commas
            let keys = keys.replace(',', "\t");
            if let Some(reference) =
                self.register_shortcut(component, &action, &friendly_name, &keys, &keys)
            {
                self.set_shortcut_present(&reference, true);
            }
        }
        true
    }

    pub(super) fn launch_service_action(&mut self, reference: &ShortcutRef) {
        let Some(service) = self
            .components
            .get(&reference.component)
            .and_then(|c| c.service_action())
        else {
            return;
        };

        match service.launch_request(&reference.component, &reference.action, self.launcher.as_mut()) {
            Some(request) => {
                debug!(shortcut = %reference, ?request, "Launching");
                self.launcher.launch(request);
            }
            None => warn!(
                shortcut = %reference,
                file = ?service.desktop_file(),
                "Nothing to launch for shortcut"
            ),
        }
    }
}
