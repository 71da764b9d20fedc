// ABOUTME: SSH collaborator for reaching a remote engine host.
// ABOUTME: Agent or key-file authentication with known_hosts verification.

mod client;
mod error;
mod forward;

pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use forward::ForwardHandle;
