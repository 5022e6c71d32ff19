//! Pieces shared by the broker binary and its clients

pub mod debug;
pub mod ipc;
