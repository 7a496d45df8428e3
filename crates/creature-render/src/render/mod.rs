//! GPU rendering subsystem.
//!
//! Pipelines consume finalized `scene` batches and issue instanced draws via wgpu.
//! Each pipeline owns its GPU resources (render pipeline, static geometry,
//! instance buffer); the device, queue and render pass are borrowed from the host.
//!
//! Convention:
//! - geometry is world space, right-handed
//! - bind group 0 is the camera uniform ([`CameraBinding`]), bound by the host
//!   before any `encode`

mod camera;
mod ctx;
mod init;
pub mod shapes;

pub use camera::{CameraBinding, CameraUniform, CAMERA_GROUP};
pub use ctx::RenderCtx;
pub use init::PipelineInit;
