//! Broker daemon - serves shortcut calls and compositor input over IPC

mod dispatcher;
mod main_loop;

pub mod handlers;

pub use dispatcher::{RequestContext, handle_request};
pub use main_loop::{build_registry, run_broker};
