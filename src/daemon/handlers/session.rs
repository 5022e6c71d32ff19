use tracing::info;

use super::super::dispatcher::RequestContext;
use crate::common::ipc::BrokerReply;
use crate::session::{DeviceType, SessionTrigger};

pub fn handle_register(
    ctx: &mut RequestContext,
    name: &str,
    trigger: SessionTrigger,
    realtime: bool,
) -> BrokerReply {
    let session = &mut *ctx.session;
    let registered = match trigger {
        SessionTrigger::PointerButton { modifiers, buttons } => {
            session.register_pointer_shortcut(name, modifiers, buttons)
        }
        SessionTrigger::PointerAxis {
            modifiers,
            direction,
        } => session.register_axis_shortcut(name, modifiers, direction),
        SessionTrigger::Swipe {
            device: DeviceType::Touchscreen,
            direction,
            finger_count,
        } => session.register_touchscreen_swipe(name, direction, finger_count),
        SessionTrigger::Swipe {
            device: DeviceType::Touchpad,
            direction,
            finger_count,
        } => {
            if realtime {
                session.register_realtime_touchpad_swipe(name, direction, finger_count)
            } else {
                session.register_touchpad_swipe(name, direction, finger_count)
            }
        }
        SessionTrigger::Pinch {
            direction,
            finger_count,
        } => {
            if realtime {
                session.register_realtime_touchpad_pinch(name, direction, finger_count)
            } else {
                session.register_touchpad_pinch(name, direction, finger_count)
            }
        }
    };
    if registered {
        info!(name = %name, ?trigger, "Session shortcut registered");
    }
    BrokerReply::Bool(registered)
}

pub fn handle_remove(ctx: &mut RequestContext, name: &str) -> BrokerReply {
    BrokerReply::Bool(ctx.session.remove_shortcut(name))
}
