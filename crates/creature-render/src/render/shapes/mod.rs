//! Shape pipelines.
//!
//! Each pipeline pairs a GPU-free batch with the wgpu resources that draw it.
//! The batch stays private; hosts see counts and the encode range only.

mod common;

pub mod lines;
pub mod surfaces;

pub use lines::{LinePipeline, LineSegment, LineTessellation};
pub use surfaces::{EllipsoidInstance, SurfacePipeline};
