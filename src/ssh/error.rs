// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, host key, and channel failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection to {host}:{port} failed: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("authentication failed for {user}: no offered key was accepted")]
    AuthenticationFailed { user: String },

    #[error("no SSH credentials available: {0}")]
    NoCredentials(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("socket forwarding failed: {0}")]
    SocketForwardFailed(String),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
