use tracing::trace;

use super::super::dispatcher::RequestContext;
use crate::common::ipc::{BrokerReply, BrokerRequest};

/// Feed compositor input into the session; replies whether it was consumed
pub fn handle_input(ctx: &mut RequestContext, request: BrokerRequest) -> BrokerReply {
    let session = &mut *ctx.session;
    let consumed = match request {
        BrokerRequest::KeyPressed {
            modifiers,
            key,
            timestamp,
        } => {
            trace!(key = %key.name(), ?modifiers, "Key pressed");
            session.process_key(modifiers, key, timestamp)
        }
        BrokerRequest::KeyReleased {
            modifiers,
            key,
            timestamp,
        } => session.process_key_release(modifiers, key, timestamp),
        BrokerRequest::PointerPressed { modifiers, buttons } => {
            session.process_pointer_pressed(modifiers, buttons)
        }
        BrokerRequest::Axis {
            modifiers,
            direction,
        } => session.process_axis(modifiers, direction),
        BrokerRequest::SwipeStart {
            device,
            finger_count,
        } => {
            session.process_swipe_start(device, finger_count);
            false
        }
        BrokerRequest::SwipeUpdate { device, delta } => {
            session.process_swipe_update(device, delta);
            false
        }
        BrokerRequest::SwipeCancel(device) => {
            session.process_swipe_cancel(device);
            false
        }
        BrokerRequest::SwipeEnd(device) => {
            session.process_swipe_end(device);
            false
        }
        BrokerRequest::PinchStart { finger_count } => {
            session.process_pinch_start(finger_count);
            false
        }
        BrokerRequest::PinchUpdate {
            scale,
            angle_delta,
            delta,
        } => {
            session.process_pinch_update(scale, angle_delta, delta);
            false
        }
        BrokerRequest::PinchCancel => {
            session.process_pinch_cancel();
            false
        }
        BrokerRequest::PinchEnd => {
            session.process_pinch_end();
            false
        }
        _ => false,
    };
    BrokerReply::Bool(consumed)
}
