//! Creature render crate.
//!
//! Draw-batching pipelines for lines and ellipsoid surfaces, plus the small
//! primitives they rely on (pose transforms, unique-id counters).
//!
//! Every pipeline follows the same per-frame lifecycle:
//! `begin` → `draw*` → `end` → `encode`.

pub mod counter;
pub mod ffi;
pub mod logging;
pub mod render;
pub mod scene;
pub mod transform;

pub use counter::Counter;
pub use transform::Transform;
