pub mod app;
pub mod config;
pub mod memory;
pub mod node;
pub mod transform;

#[cfg(feature = "vis")]
pub mod vis;

pub use crate::config::Config;
pub use crate::memory::{DetectionMemory, TagId};
pub use crate::node::{FrameSummary, Frames, Node};
pub use crate::transform::{StaticTransforms, Stamp, TransformError, TransformLookup};
