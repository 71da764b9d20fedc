// ABOUTME: Type-safe identifiers for engine resources.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;

pub use id::{ContainerId, Id, IdError, ImageId, SHORT_LEN};
