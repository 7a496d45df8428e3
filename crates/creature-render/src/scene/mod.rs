//! CPU-side draw recording.
//!
//! Shapes are plain fixed-layout values. Pipelines collect them into a
//! [`DrawBatch`] between `begin` and `end`; renderers consume the finalized
//! batch in insertion order.

mod batch;
mod error;
mod field;
pub mod shapes;

pub use batch::{BatchState, DrawBatch, DrawInstance};
pub use error::BatchError;
pub use field::EllipsoidField;
