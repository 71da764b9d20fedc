// ABOUTME: Library root for dregs - exposes the engine layer and reconciliation core.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod output;
pub mod prompt;
pub mod reconcile;
pub mod shell;
pub mod ssh;
pub mod types;
