//! Broker main loop and initialization

use anyhow::{Context, Result};
use ipc_channel::ipc::{self, IpcReceiver, IpcSender};
use std::time::Instant;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::dispatcher::{RequestContext, handle_request};
use crate::common::ipc::{BootstrapMessage, BrokerMessage, ClientMessage};
use crate::config::{BrokerConfig, ShortcutStore};
use crate::launch::SessionLauncher;
use crate::registry::Registry;
use crate::session::SessionManager;

/// Build and load the shortcut registry described by `config`
pub fn build_registry(config: &BrokerConfig) -> Result<Registry> {
    let store = config
        .persist
        .then(|| ShortcutStore::new(config.shortcuts_path()));
    if store.is_none() {
        info!("Persistence disabled, shortcuts live in memory only");
    }

    let mut registry = Registry::new(
        store,
        config.search_paths(),
        Box::new(SessionLauncher::new(config.launch_helper.clone())),
        config.write_delay(),
    );
    registry.init().context("Failed to load shortcut registry")?;
    Ok(registry)
}

/// Session manager with a registry, or without one if loading failed
fn build_session(config: &BrokerConfig) -> SessionManager {
    match build_registry(config) {
        Ok(registry) => SessionManager::new(Some(registry)),
        Err(e) => {
            error!(error = ?e, "Global shortcuts unavailable");
            SessionManager::new(None)
        }
    }
}

async fn write_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

/// Send one notification; a failed send is logged and dropped
fn notify_client(event_tx: &IpcSender<BrokerMessage>, message: BrokerMessage) -> bool {
    match event_tx.send(message) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to send notification to client");
            false
        }
    }
}

/// Push queued notifications to the client
fn forward_events(session: &mut SessionManager, event_tx: &IpcSender<BrokerMessage>) {
    let shortcut_events = session
        .registry_mut()
        .map(Registry::take_events)
        .unwrap_or_default();
    let messages = shortcut_events
        .into_iter()
        .map(BrokerMessage::Shortcut)
        .chain(session.take_events().into_iter().map(BrokerMessage::Session));

    for message in messages {
        notify_client(event_tx, message);
    }
}

async fn run_event_loop(
    mut session: SessionManager,
    client_rx: IpcReceiver<ClientMessage>,
    event_tx: IpcSender<BrokerMessage>,
) -> Result<()> {
    info!("Shortcut broker running");

    // IpcReceiver blocks; bridge it into tokio
    let (ipc_client_tx, mut ipc_client_rx) = mpsc::channel(32);
    std::thread::spawn(move || {
        while let Ok(msg) = client_rx.recv() {
            if ipc_client_tx.blocking_send(msg).is_err() {
                break;
            }
        }
    });

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    loop {
        let deadline = session.registry().and_then(Registry::write_deadline);

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = write_due(deadline) => {
                if let Some(registry) = session.registry_mut()
                    && let Err(e) = registry.flush_due_write(Instant::now())
                {
                    error!(error = ?e, "Failed to write shortcuts");
                    notify_client(&event_tx, BrokerMessage::Error(format!("{e:#}")));
                }
            }
            msg = ipc_client_rx.recv() => {
                match msg {
                    Some(ClientMessage::Call(request, reply_tx)) => {
                        debug!(?request, "Received call");
                        let mut ctx = RequestContext::new(&mut session);
                        let reply = handle_request(&mut ctx, request);
                        let changes = ctx.changes;

                        if let Err(e) = reply_tx.send(reply) {
                            warn!(error = %e, "Failed to send reply");
                        }
                        for change in changes {
                            notify_client(&event_tx, BrokerMessage::ShortcutsChanged(change));
                        }
                    }
                    Some(ClientMessage::Shutdown) => {
                        info!("Shutdown requested by client");
                        break;
                    }
                    None => {
                        info!("Client disconnected, shutting down");
                        break;
                    }
                }
            }
        }

        forward_events(&mut session, &event_tx);
    }

    session.shutdown().context("Failed to save shortcuts on shutdown")
}

pub async fn run_broker(config: BrokerConfig, ipc_server_name: String) -> Result<()> {
    info!("Connecting to IPC server: {}", ipc_server_name);
    let bootstrap_sender: IpcSender<BootstrapMessage> =
        IpcSender::connect(ipc_server_name).context("Failed to connect to IPC server")?;

    let (client_tx, client_rx) =
        ipc::channel::<ClientMessage>().context("Failed to create client IPC channel")?;
    let (event_tx, event_rx) =
        ipc::channel::<BrokerMessage>().context("Failed to create event IPC channel")?;

    bootstrap_sender
        .send((client_tx, event_rx))
        .context("Failed to send bootstrap message")?;

    let session = build_session(&config);
    run_event_loop(session, client_rx, event_tx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;

    #[test]
    fn test_notifications_reach_client() {
        let (event_tx, event_rx) = ipc::channel::<BrokerMessage>().unwrap();

        assert!(notify_client(&event_tx, BrokerMessage::Error("disk full".into())));
        match event_rx.recv().unwrap() {
            BrokerMessage::Error(text) => assert_eq!(text, "disk full"),
            other => panic!("unexpected message: {other:?}"),
        }

        let mut session = SessionManager::new(None);
        forward_events(&mut session, &event_tx);
        assert!(event_rx.try_recv().is_err());

        assert!(notify_client(
            &event_tx,
            BrokerMessage::Session(SessionEvent::Triggered { name: "move".into() })
        ));
        assert!(matches!(
            event_rx.recv().unwrap(),
            BrokerMessage::Session(SessionEvent::Triggered { .. })
        ));
    }
}
