//! Shape primitives accepted by the pipelines.

mod ellipsoid;
mod line;

pub use ellipsoid::Ellipsoid;
pub use line::{Line, LineStyle};
