//! Request processing for the broker daemon
//!
//! Dispatcher that routes client requests to specialized handlers.

use crate::common::ipc::{BrokerReply, BrokerRequest};
use crate::service::ShortcutsChanged;
use crate::session::SessionManager;

use super::handlers;

/// Context bundle for request handlers
pub struct RequestContext<'a> {
    pub session: &'a mut SessionManager,
    /// Collected `ShortcutsChanged` notifications, sent after the reply
    pub changes: Vec<ShortcutsChanged>,
}

impl<'a> RequestContext<'a> {
    pub fn new(session: &'a mut SessionManager) -> Self {
        Self {
            session,
            changes: Vec::new(),
        }
    }
}

pub fn handle_request(ctx: &mut RequestContext, request: BrokerRequest) -> BrokerReply {
    match request {
        BrokerRequest::KeyPressed { .. }
        | BrokerRequest::KeyReleased { .. }
        | BrokerRequest::PointerPressed { .. }
        | BrokerRequest::Axis { .. }
        | BrokerRequest::SwipeStart { .. }
        | BrokerRequest::SwipeUpdate { .. }
        | BrokerRequest::SwipeCancel(_)
        | BrokerRequest::SwipeEnd(_)
        | BrokerRequest::PinchStart { .. }
        | BrokerRequest::PinchUpdate { .. }
        | BrokerRequest::PinchCancel
        | BrokerRequest::PinchEnd => handlers::input::handle_input(ctx, request),
        BrokerRequest::RegisterSessionShortcut {
            name,
            trigger,
            realtime,
        } => handlers::session::handle_register(ctx, &name, trigger, realtime),
        BrokerRequest::RemoveSessionShortcut(name) => handlers::session::handle_remove(ctx, &name),
        request => handlers::service::handle_service(ctx, request),
    }
}
