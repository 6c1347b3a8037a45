//! File lookup under the served root.

pub mod resolver;

pub use resolver::{resolve, Resolution, ResolvedFile};
