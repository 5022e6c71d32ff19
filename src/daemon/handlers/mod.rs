//! Request handlers, grouped by the surface they serve

pub mod input;
pub mod service;
pub mod session;
