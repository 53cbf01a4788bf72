//! vc-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other vc-* crates,
//! providing type-safe identifiers, a unified error type, the media-domain
//! enums (containers, resolutions, transports), the filename grammar, the
//! bandwidth policy, application configuration, and a broadcast event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod filename;
pub mod ids;
pub mod media;
pub mod policy;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
