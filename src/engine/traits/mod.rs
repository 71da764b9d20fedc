// ABOUTME: Composable capability traits for container engines.
// ABOUTME: Defines ImageOps, ContainerOps, RuntimeInfo, and the combined Engine.

mod container;
mod image;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Every capability a console session needs, usable as `dyn Engine`.
pub trait Engine: ImageOps + ContainerOps + RuntimeInfo {}

impl<T: ImageOps + ContainerOps + RuntimeInfo> Engine for T {}
