// ABOUTME: Library root for sshbatch - exposes the session, batch, and plan layers.
// ABOUTME: The main binary is in main.rs.

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod ssh;
