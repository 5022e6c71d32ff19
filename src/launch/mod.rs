//! Starting applications for launcher-backed shortcuts
//!
//! Launches are fire-and-forget: [`SessionLauncher`] hands every request to a
//! detached thread. Failures are logged and otherwise dropped.

pub mod exec;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use zbus::zvariant::Value;

use crate::constants::{bus, config, env};

/// What to start when a launcher-backed shortcut fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRequest {
    /// Bus activation through `org.freedesktop.Application`
    Activate {
        bus_name: String,
        object_path: String,
        /// `None` activates the application itself
        action: Option<String>,
        token: Option<String>,
    },
    /// Start a command line as a new process
    Exec {
        program: String,
        args: Vec<String>,
        /// Set when a session helper can start the application by id
        application_id: Option<String>,
        token: Option<String>,
    },
}

pub trait Launcher {
    /// Token handed to the started application so it may take focus
    fn activation_token(&mut self, app_id: &str) -> Option<String>;

    fn launch(&mut self, request: LaunchRequest);
}

/// Launches through the session bus and session helpers
pub struct SessionLauncher {
    helper: String,
    serial: u64,
}

impl SessionLauncher {
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
            serial: 0,
        }
    }
}

impl Launcher for SessionLauncher {
    fn activation_token(&mut self, app_id: &str) -> Option<String> {
        let serial = self.serial;
        self.serial += 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let token = format!(
            "{}-{}-{}_TIME{}",
            config::APP_DIR,
            std::process::id(),
            serial,
            millis
        );
        debug!(app = %app_id, token = %token, "Issued activation token");
        Some(token)
    }

    fn launch(&mut self, request: LaunchRequest) {
        let helper = self.helper.clone();
        let spawned = std::thread::Builder::new()
            .name("launch".into())
            .spawn(move || {
                let result = match request {
                    LaunchRequest::Activate {
                        bus_name,
                        object_path,
                        action,
                        token,
                    } => activate(&bus_name, &object_path, action.as_deref(), token.as_deref()),
                    LaunchRequest::Exec {
                        program,
                        args,
                        application_id,
                        token,
                    } => run_process(
                        &helper,
                        &program,
                        &args,
                        application_id.as_deref(),
                        token.as_deref(),
                    ),
                };
                if let Err(e) = result {
                    warn!(error = %e, "Launch failed");
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn launch thread");
        }
    }
}

fn platform_data(token: Option<&str>) -> HashMap<&'static str, Value<'_>> {
    let mut data = HashMap::new();
    if let Some(token) = token {
        data.insert("activation-token", Value::from(token));
        data.insert("desktop-startup-id", Value::from(token));
    }
    data
}

fn activate(bus_name: &str, object_path: &str, action: Option<&str>, token: Option<&str>) -> Result<()> {
    let conn = zbus::blocking::Connection::session().context("Failed to open session bus")?;
    let data = platform_data(token);

    match action {
        None => conn.call_method(
            Some(bus_name),
            object_path,
            Some(bus::APPLICATION_INTERFACE),
            "Activate",
            &(data,),
        ),
        Some(action) => conn.call_method(
            Some(bus_name),
            object_path,
            Some(bus::APPLICATION_INTERFACE),
            "ActivateAction",
            &(action, Vec::<Value>::new(), data),
        ),
    }
    .with_context(|| format!("Activation of {} failed", bus_name))?;

    info!(service = %bus_name, action = ?action, "Activated application");
    Ok(())
}

fn klauncher_available(conn: &zbus::blocking::Connection) -> bool {
    conn.call_method(
        Some(bus::DBUS_SERVICE),
        bus::DBUS_PATH,
        Some(bus::DBUS_SERVICE),
        "NameHasOwner",
        &(bus::KLAUNCHER_SERVICE,),
    )
    .and_then(|reply| reply.body().deserialize::<bool>())
    .unwrap_or(false)
}

/// Helper first, then the session launcher service, then a plain spawn
fn run_process(
    helper: &str,
    program: &str,
    args: &[String],
    application_id: Option<&str>,
    token: Option<&str>,
) -> Result<()> {
    if let Ok(helper_path) = which::which(helper) {
        let helper_args: Vec<String> = match application_id {
            Some(id) => vec!["--application".to_string(), id.to_string()],
            None => ["--".to_string(), program.to_string()]
                .into_iter()
                .chain(args.iter().cloned())
                .collect(),
        };
        let mut command = Command::new(helper_path);
        command.args(&helper_args);
        return spawn_detached(command, token);
    }

    if let Ok(conn) = zbus::blocking::Connection::session()
        && klauncher_available(&conn)
    {
        conn.call_method(
            Some(bus::KLAUNCHER_SERVICE),
            bus::KLAUNCHER_PATH,
            Some(bus::KLAUNCHER_INTERFACE),
            "exec_blind",
            &(program, args),
        )
        .with_context(|| format!("exec_blind of {} failed", program))?;
        info!(program = %program, "Started through session launcher");
        return Ok(());
    }

    let program_path =
        which::which(program).with_context(|| format!("Could not find executable {}", program))?;
    let mut command = Command::new(program_path);
    command.args(args);
    spawn_detached(command, token)
}

fn spawn_detached(mut command: Command, token: Option<&str>) -> Result<()> {
    if let Some(token) = token {
        command.env(env::ACTIVATION_TOKEN, token);
        command.env(env::STARTUP_ID, token);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn {:?}", command.get_program()))?;
    info!(pid = child.id(), program = ?command.get_program(), "Started process");

    // Reap on this thread
    let status = child.wait().context("Failed to wait for child")?;
    debug!(?status, "Launched process exited");
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use super::{LaunchRequest, Launcher};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records requests instead of starting anything
    #[derive(Clone, Default)]
    pub struct RecordingLauncher {
        pub requests: Rc<RefCell<Vec<LaunchRequest>>>,
    }

    impl Launcher for RecordingLauncher {
        fn activation_token(&mut self, app_id: &str) -> Option<String> {
            Some(format!("token-{app_id}"))
        }

        fn launch(&mut self, request: LaunchRequest) {
            self.requests.borrow_mut().push(request);
        }
    }
}
