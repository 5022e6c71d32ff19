#![deny(unsafe_code)]

pub mod common;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod keys;
pub mod launch;
pub mod registry;
pub mod service;
pub mod session;
