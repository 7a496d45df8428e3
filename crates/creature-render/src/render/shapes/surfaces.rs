use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::ops::Range;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::render::{PipelineInit, RenderCtx};
use crate::scene::shapes::Ellipsoid;
use crate::scene::{BatchError, BatchState, DrawBatch, DrawInstance, EllipsoidField};
use crate::transform::Transform;

use super::common::{
    alpha_blend, depth_state, ensure_device_support, multisample_state, InstanceBuffer,
};

const SPHERE_RINGS: u32 = 12;
const SPHERE_SLICES: u32 = 16;

/// CPU side of the surface pipeline: the ellipsoid batch and its packed
/// per-instance matrices.
#[derive(Debug)]
pub(crate) struct SurfaceBatch {
    draws: DrawBatch<Ellipsoid>,
    packed: Vec<EllipsoidInstance>,
}

impl SurfaceBatch {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            draws: DrawBatch::with_capacity(capacity),
            packed: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> BatchState {
        self.draws.state()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.draws.len()
    }

    pub(crate) fn begin(&mut self) {
        self.draws.begin();
        self.packed.clear();
    }

    #[inline]
    pub(crate) fn draw_ellipsoid(
        &mut self,
        transform: Transform,
        ellipsoid: Ellipsoid,
    ) -> Result<(), BatchError> {
        self.draws.push(transform, ellipsoid)
    }

    /// Finalizes the batch and returns one packed instance per draw, in order.
    pub(crate) fn end(&mut self) -> Result<&[EllipsoidInstance], BatchError> {
        let draws = self.draws.end()?;

        self.packed.clear();
        self.packed.extend(draws.iter().map(EllipsoidInstance::pack));

        Ok(&self.packed)
    }

    #[cfg(test)]
    fn instances(&self) -> Result<&[DrawInstance<Ellipsoid>], BatchError> {
        self.draws.finalized("instances")
    }

    #[cfg(test)]
    fn packed(&self) -> Result<&[EllipsoidInstance], BatchError> {
        self.draws.finalized("packed")?;
        Ok(&self.packed)
    }

    pub(crate) fn instance_range(&self) -> Result<Option<Range<u32>>, BatchError> {
        self.draws.finalized("encode")?;
        let count = self.packed.len() as u32;
        Ok((count > 0).then_some(0..count))
    }

    /// Implicit field of the finalized ellipsoids, for hit testing.
    #[inline]
    pub(crate) fn field(&self) -> Result<EllipsoidField<'_>, BatchError> {
        self.draws.finalized("field").map(EllipsoidField::new)
    }
}

/// Batches ellipsoids between `begin` and `end` and draws them as one
/// instanced sphere mesh per frame.
///
/// Lifecycle is the explicit `begin` / `draw_ellipsoid` / `end` / `encode`
/// sequence, identical to [`LinePipeline`](super::LinePipeline); there is no
/// combined submit call.
///
/// The host binds the camera at group 0 before [`encode`](Self::encode).
pub struct SurfacePipeline {
    pipeline: wgpu::RenderPipeline,

    sphere_vbo: wgpu::Buffer,
    sphere_vertex_count: u32,

    instances: InstanceBuffer<EllipsoidInstance>,
    batch: SurfaceBatch,
}

impl SurfacePipeline {
    pub fn new(
        ctx: &RenderCtx<'_>,
        camera_layout: &wgpu::BindGroupLayout,
        init: &PipelineInit,
    ) -> Result<Self> {
        ensure_device_support(
            ctx.device,
            init,
            "surface pipeline",
            (SphereVertex::ATTRS.len() + EllipsoidInstance::ATTRS.len()) as u32,
            std::mem::size_of::<EllipsoidInstance>() as u64,
        )?;

        let pipeline = Self::create_pipeline(ctx.device, camera_layout, init);

        let vertices = sphere_vertices(SPHERE_RINGS, SPHERE_SLICES);
        let sphere_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("creature sphere vbo"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let label = "creature ellipsoid instance vbo";
        let instances = InstanceBuffer::new(ctx.device, label, init.initial_capacity);

        log::debug!(
            "surface pipeline ready ({} sphere vertices, {} instance slots)",
            vertices.len(),
            instances.capacity()
        );

        Ok(Self {
            pipeline,
            sphere_vbo,
            sphere_vertex_count: vertices.len() as u32,
            instances,
            batch: SurfaceBatch::new(init.initial_capacity),
        })
    }

    /// Clears the batch. Must precede the frame's draws.
    #[inline]
    pub fn begin(&mut self) {
        self.batch.begin();
    }

    /// Queues one ellipsoid.
    #[inline]
    pub fn draw_ellipsoid(
        &mut self,
        transform: Transform,
        ellipsoid: Ellipsoid,
    ) -> Result<(), BatchError> {
        self.batch.draw_ellipsoid(transform, ellipsoid)
    }

    /// Packs the batch and uploads it to the instance buffer.
    pub fn end(&mut self, ctx: &RenderCtx<'_>) -> Result<(), BatchError> {
        let packed = self.batch.end()?;
        self.instances.upload(ctx, packed);

        log::trace!("surface pipeline: {} ellipsoids", self.instances.len());
        Ok(())
    }

    /// Records the draw for the finalized batch into `pass`.
    ///
    /// An empty batch records nothing.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), BatchError> {
        let Some(range) = self.instance_range()? else {
            return Ok(());
        };

        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, self.sphere_vbo.slice(..));
        pass.set_vertex_buffer(1, self.instances.buffer().slice(..));
        pass.draw(0..self.sphere_vertex_count, range);
        Ok(())
    }

    /// Instance range the next [`encode`](Self::encode) submits, clamped to
    /// what the instance buffer holds. `None` when there is nothing to draw.
    pub fn instance_range(&self) -> Result<Option<Range<u32>>, BatchError> {
        let range = self.batch.instance_range()?;
        Ok(range
            .map(|r| r.start..r.end.min(self.instances.len() as u32))
            .filter(|r| !r.is_empty()))
    }

    #[inline]
    pub fn state(&self) -> BatchState {
        self.batch.state()
    }

    /// Number of `draw_ellipsoid` calls recorded since `begin`.
    #[inline]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batch.len() == 0
    }

    /// Read-only implicit surface of the finalized ellipsoids, for hit testing.
    #[inline]
    pub fn field(&self) -> Result<EllipsoidField<'_>, BatchError> {
        self.batch.field()
    }

    #[inline]
    pub fn instance_capacity(&self) -> usize {
        self.instances.capacity()
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn create_pipeline(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        init: &PipelineInit,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("creature surface shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/surfaces.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("creature surface pipeline layout"),
            bind_group_layouts: &[camera_layout],
            immediate_size: 0,
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("creature surface pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SphereVertex::layout(), EllipsoidInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: init.color_format,
                    blend: Some(alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Negative-scale transforms flip winding; shade both sides instead.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth_state(init),
            multisample: multisample_state(init),
            multiview_mask: None,
            cache: None,
        })
    }
}

// ── sphere mesh ───────────────────────────────────────────────────────────

/// Unit sphere as a non-indexed triangle list of `(rings + 1) * slices * 6`
/// vertices, pole to pole.
fn sphere_vertices(rings: u32, slices: u32) -> Vec<SphereVertex> {
    let ring_step = PI / (rings as f32 + 1.0);
    let slice_step = TAU / slices as f32;

    let vertex = |i: u32, j: u32| {
        let lat = -FRAC_PI_2 + ring_step * i as f32;
        let lon = slice_step * j as f32;
        SphereVertex {
            position: [lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos()],
        }
    };

    let mut out = Vec::with_capacity(((rings + 1) * slices * 6) as usize);
    for i in 0..=rings {
        for j in 0..slices {
            out.extend([
                vertex(i, j),
                vertex(i + 1, j + 1),
                vertex(i + 1, j),
                vertex(i, j),
                vertex(i, j + 1),
                vertex(i + 1, j + 1),
            ]);
        }
    }
    out
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct SphereVertex {
    position: [f32; 3],
}

impl SphereVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SphereVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Ellipsoid instance layout (112 bytes):
///
///  offset  0  model   [[f32; 4]; 4]   loc 1..=4  transform * scale(radii)
///  offset 64  normal  [[f32; 4]; 3]   loc 5..=7  inverse-transpose of model, xyz used
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct EllipsoidInstance {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl EllipsoidInstance {
    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        1 => Float32x4, // model col 0
        2 => Float32x4, // model col 1
        3 => Float32x4, // model col 2
        4 => Float32x4, // model col 3
        5 => Float32x4, // normal col 0
        6 => Float32x4, // normal col 1
        7 => Float32x4  // normal col 2
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<EllipsoidInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Zero radii give a non-finite normal matrix; only that instance is affected.
    fn pack(draw: &DrawInstance<Ellipsoid>) -> Self {
        let radii = draw.shape.radii();

        let model = draw.transform.matrix() * Mat4::from_scale(radii);
        let inverse = Mat4::from_scale(radii.recip()) * draw.transform.matrix_inverse();
        let normal = inverse.transpose();

        Self {
            model: model.to_cols_array_2d(),
            normal: [
                normal.x_axis.truncate().extend(0.0).to_array(),
                normal.y_axis.truncate().extend(0.0).to_array(),
                normal.z_axis.truncate().extend(0.0).to_array(),
            ],
        }
    }

    #[inline]
    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// Maps a unit-sphere normal to the world-space (unnormalized) normal.
    #[inline]
    pub fn transform_normal(&self, n: Vec3) -> Vec3 {
        let [c0, c1, c2] = self.normal;
        Vec3::new(c0[0], c0[1], c0[2]) * n.x
            + Vec3::new(c1[0], c1[1], c1[2]) * n.y
            + Vec3::new(c2[0], c2[1], c2[2]) * n.z
    }
}
