// src/store/mod.rs
//! On-disk state: the identity index (`libpics/`) and published assets (`pics/`).
//! Markers need no coordination. Publishes to the same final path are
//! serialized inside the process; across processes the size rule decides.

pub mod index;
pub mod publish;

pub use index::{identity_hash, IdentityIndex};
pub use publish::{PublishOutcome, Publisher, TRUNCATED_VIDEO_BYTES, VIDEO_EXT};
