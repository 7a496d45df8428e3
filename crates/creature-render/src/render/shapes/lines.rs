use std::f32::consts::TAU;
use std::ops::Range;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::render::{PipelineInit, RenderCtx};
use crate::scene::shapes::{Line, LineStyle};
use crate::scene::{BatchError, BatchState, DrawBatch};
use crate::transform::Transform;

use super::common::{
    alpha_blend, depth_state, ensure_device_support, multisample_state, InstanceBuffer,
};

/// Vertices per segment; the strip is expanded from `vertex_index` in the shader.
const STRIP_VERTEX_COUNT: u32 = 4;

/// How styled lines are broken into GPU segments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineTessellation {
    /// Segments per `Circle` ring (minimum 3).
    pub circle_segments: u32,
    /// Arrow head width as a multiple of the stem thickness.
    pub arrow_head_scale: f32,
    /// Arrow head length as a multiple of the head width.
    pub arrow_head_length_scale: f32,
}

impl Default for LineTessellation {
    fn default() -> Self {
        Self {
            circle_segments: 48,
            arrow_head_scale: 4.0,
            arrow_head_length_scale: 1.5,
        }
    }
}

/// CPU side of the line pipeline: the draw batch and its tessellated segments.
///
/// One `draw` records one [`DrawInstance`](crate::scene::DrawInstance); `end`
/// expands every instance, in order, into one or more [`LineSegment`]s ready
/// for upload.
#[derive(Debug)]
pub(crate) struct LineBatch {
    draws: DrawBatch<Line>,
    segments: Vec<LineSegment>,
    tessellation: LineTessellation,
}

impl LineBatch {
    pub(crate) fn new(tessellation: LineTessellation, capacity: usize) -> Self {
        Self {
            draws: DrawBatch::with_capacity(capacity),
            segments: Vec::with_capacity(capacity),
            tessellation,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> BatchState {
        self.draws.state()
    }

    /// Number of `draw` calls recorded since `begin`.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.draws.len()
    }

    pub(crate) fn begin(&mut self) {
        self.draws.begin();
        self.segments.clear();
    }

    #[inline]
    pub(crate) fn draw(&mut self, transform: Transform, line: Line) -> Result<(), BatchError> {
        self.draws.push(transform, line)
    }

    /// Finalizes the batch and returns the segments in draw order.
    pub(crate) fn end(&mut self) -> Result<&[LineSegment], BatchError> {
        let draws = self.draws.end()?;

        self.segments.clear();
        for draw in draws {
            tessellate(&draw.transform, &draw.shape, &self.tessellation, &mut self.segments);
        }

        Ok(&self.segments)
    }

    #[cfg(test)]
    fn instances(&self) -> Result<&[crate::scene::DrawInstance<Line>], BatchError> {
        self.draws.finalized("instances")
    }

    #[cfg(test)]
    fn segments(&self) -> Result<&[LineSegment], BatchError> {
        self.draws.finalized("segments")?;
        Ok(&self.segments)
    }

    /// Instance range an encode would submit; `None` when there is nothing to draw.
    pub(crate) fn instance_range(&self) -> Result<Option<Range<u32>>, BatchError> {
        self.draws.finalized("encode")?;
        let count = self.segments.len() as u32;
        Ok((count > 0).then_some(0..count))
    }
}

/// Batches lines between `begin` and `end` and draws them as one instanced
/// triangle strip per frame.
///
/// Each segment is a camera-facing quad (or triangle for arrow heads) of world
/// space `thickness`; dashes are cut in the fragment shader.
///
/// The host binds the camera at group 0 before [`encode`](Self::encode).
pub struct LinePipeline {
    pipeline: wgpu::RenderPipeline,
    instances: InstanceBuffer<LineSegment>,
    batch: LineBatch,
}

impl LinePipeline {
    /// Builds the render pipeline and an instance buffer of
    /// `init.initial_capacity` segments.
    pub fn new(
        ctx: &RenderCtx<'_>,
        camera_layout: &wgpu::BindGroupLayout,
        init: &PipelineInit,
    ) -> Result<Self> {
        ensure_device_support(
            ctx.device,
            init,
            "line pipeline",
            LineSegment::ATTRS.len() as u32,
            std::mem::size_of::<LineSegment>() as u64,
        )?;

        let pipeline = Self::create_pipeline(ctx.device, camera_layout, init);
        let instances =
            InstanceBuffer::new(ctx.device, "creature line instance vbo", init.initial_capacity);

        log::debug!("line pipeline ready ({} segment slots)", instances.capacity());

        Ok(Self {
            pipeline,
            instances,
            batch: LineBatch::new(LineTessellation::default(), init.initial_capacity),
        })
    }

    /// Replaces the tessellation parameters. Applies from the next `end`.
    pub fn with_tessellation(mut self, tessellation: LineTessellation) -> Self {
        self.batch.tessellation = tessellation;
        self
    }

    /// Clears the batch. Must precede the frame's draws.
    #[inline]
    pub fn begin(&mut self) {
        self.batch.begin();
    }

    /// Queues one line.
    #[inline]
    pub fn draw(&mut self, transform: Transform, line: Line) -> Result<(), BatchError> {
        self.batch.draw(transform, line)
    }

    /// Tessellates the batch and uploads the segments to the instance buffer.
    pub fn end(&mut self, ctx: &RenderCtx<'_>) -> Result<(), BatchError> {
        let segments = self.batch.end()?;
        self.instances.upload(ctx, segments);

        log::trace!(
            "line pipeline: {} lines -> {} segments",
            self.batch.len(),
            self.instances.len()
        );
        Ok(())
    }

    /// Records the draw for the finalized batch into `pass`.
    ///
    /// An empty batch records nothing. Pipeline state is left untouched, so a
    /// finalized batch can be encoded into several passes.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), BatchError> {
        let Some(range) = self.instance_range()? else {
            return Ok(());
        };

        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, self.instances.buffer().slice(..));
        pass.draw(0..STRIP_VERTEX_COUNT, range);
        Ok(())
    }

    /// Segment range the next [`encode`](Self::encode) submits, clamped to
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

    /// Number of `draw` calls recorded since `begin`.
    #[inline]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batch.len() == 0
    }

    /// Segments uploaded by the last `end`.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.instances.len()
    }

    /// Segment slots currently allocated on the GPU.
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
            label: Some("creature line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lines.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("creature line pipeline layout"),
            bind_group_layouts: &[camera_layout],
            immediate_size: 0,
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("creature line pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[LineSegment::layout()],
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
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
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

// ── tessellation ──────────────────────────────────────────────────────────

/// Appends the segments for one line, in world space.
fn tessellate(
    transform: &Transform,
    line: &Line,
    params: &LineTessellation,
    out: &mut Vec<LineSegment>,
) {
    let matrix = transform.matrix();
    let dash_size = line.effective_dash_size();

    match line.style {
        LineStyle::Solid | LineStyle::Dashed => {
            let half = line.size * 0.5;
            let a = matrix.transform_point3(Vec3::new(0.0, half, 0.0));
            let b = matrix.transform_point3(Vec3::new(0.0, -half, 0.0));

            out.push(LineSegment::rectangle(a, b, line, line.thickness, dash_size, 0.0));
        }
        LineStyle::Arrow => {
            let direction = matrix.transform_vector3(Vec3::Y).normalize_or_zero();
            let start = matrix.transform_point3(Vec3::ZERO);
            let end = start + direction * line.size;

            let head_thickness = line.thickness * params.arrow_head_scale;
            let head_length = head_thickness * params.arrow_head_length_scale;

            if line.size <= head_length {
                // Too short for a stem: the whole arrow is head.
                out.push(LineSegment::triangle(start, end, line, head_thickness));
            } else {
                let stem_end = start + direction * (line.size - head_length);

                let thickness = line.thickness;
                out.push(LineSegment::rectangle(start, stem_end, line, thickness, dash_size, 0.0));
                out.push(LineSegment::triangle(stem_end, end, line, head_thickness));
            }
        }
        LineStyle::Circle => {
            let count = params.circle_segments.max(3);
            let radius = line.size * 0.5;

            let point = |i: u32| {
                let angle = TAU * i as f32 / count as f32;
                matrix.transform_point3(Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin()))
            };

            // Running offset keeps the dash pattern continuous around the ring.
            let mut dash_offset = 0.0;
            let mut prev = point(count - 1);
            for i in 0..count {
                let current = point(i);
                out.push(LineSegment::rectangle(
                    current,
                    prev,
                    line,
                    line.thickness,
                    dash_size,
                    dash_offset,
                ));
                dash_offset += current.distance(prev);
                prev = current;
            }
        }
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Segment instance layout (52 bytes):
///
///  offset  0  a            [f32; 3]   loc 0
///  offset 12  b            [f32; 3]   loc 1
///  offset 24  color        [f32; 3]   loc 2
///  offset 36  thickness    f32        loc 3
///  offset 40  shape        u32        loc 4  (0 = rectangle, 1 = triangle)
///  offset 44  dash_size    f32        loc 5  (0 = no dashes)
///  offset 48  dash_offset  f32        loc 6
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineSegment {
    pub a: [f32; 3],
    pub b: [f32; 3],
    pub color: [f32; 3],
    pub thickness: f32,
    pub shape: u32,
    pub dash_size: f32,
    pub dash_offset: f32,
}

impl LineSegment {
    pub const SHAPE_RECTANGLE: u32 = 0;
    pub const SHAPE_TRIANGLE: u32 = 1;

    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3, // a
        1 => Float32x3, // b
        2 => Float32x3, // color
        3 => Float32,   // thickness
        4 => Uint32,    // shape
        5 => Float32,   // dash_size
        6 => Float32    // dash_offset
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineSegment>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    fn rectangle(
        a: Vec3,
        b: Vec3,
        line: &Line,
        thickness: f32,
        dash_size: f32,
        dash_offset: f32,
    ) -> Self {
        Self {
            a: a.to_array(),
            b: b.to_array(),
            color: line.color,
            thickness,
            shape: Self::SHAPE_RECTANGLE,
            dash_size,
            dash_offset,
        }
    }

    fn triangle(base: Vec3, tip: Vec3, line: &Line, thickness: f32) -> Self {
        Self {
            a: base.to_array(),
            b: tip.to_array(),
            color: line.color,
            thickness,
            shape: Self::SHAPE_TRIANGLE,
            dash_size: 0.0,
            dash_offset: 0.0,
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        Vec3::from_array(self.a).distance(Vec3::from_array(self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 3] = [1.0, 0.0, 0.0];
    const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

    fn at(x: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    fn batch() -> LineBatch {
        LineBatch::new(LineTessellation::default(), 4)
    }

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        Vec3::from_array(a).distance(Vec3::from_array(b)) < 1e-5
    }

    fn same_bits(a: &Line, b: &Line) -> bool {
        a.style == b.style
            && a.color.map(f32::to_bits) == b.color.map(f32::to_bits)
            && a.size.to_bits() == b.size.to_bits()
            && a.thickness.to_bits() == b.thickness.to_bits()
            && a.dash_size.to_bits() == b.dash_size.to_bits()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn dashed_then_solid_submits_two_instances_in_order() {
        let mut b = batch();
        b.begin();
        b.draw(at(1.0), Line::dashed(2.0, RED, 0.2)).unwrap();
        b.draw(at(2.0), Line::solid(2.0, BLUE)).unwrap();
        b.end().unwrap();

        assert_eq!(b.instance_range().unwrap(), Some(0..2));

        let instances = b.instances().unwrap();
        assert_eq!(instances[0].transform, at(1.0));
        assert_eq!(instances[1].transform, at(2.0));

        let segments = b.segments().unwrap();
        assert_eq!(segments[0].color, RED);
        assert_eq!(segments[0].dash_size, 0.2);
        assert_eq!(segments[1].color, BLUE);
        assert_eq!(segments[1].dash_size, 0.0);
    }

    #[test]
    fn empty_batch_encodes_nothing() {
        let mut b = batch();
        b.begin();
        assert!(b.end().unwrap().is_empty());
        assert_eq!(b.instance_range().unwrap(), None);
    }

    #[test]
    fn fresh_batch_encodes_nothing() {
        let b = batch();
        assert_eq!(b.state(), BatchState::Ready);
        assert_eq!(b.instance_range(), Ok(None));
    }

    #[test]
    fn second_frame_does_not_see_first_frame() {
        let mut b = batch();

        b.begin();
        for i in 0..3 {
            b.draw(at(i as f32), Line::solid(1.0, RED)).unwrap();
        }
        b.end().unwrap();
        assert_eq!(b.instance_range().unwrap(), Some(0..3));

        b.begin();
        b.draw(at(9.0), Line::solid(1.0, BLUE)).unwrap();
        b.end().unwrap();

        assert_eq!(b.instance_range().unwrap(), Some(0..1));
        assert_eq!(b.instances().unwrap()[0].transform, at(9.0));
        assert_eq!(b.segments().unwrap()[0].color, BLUE);
    }

    #[test]
    fn contract_violations_are_errors() {
        let mut b = batch();

        assert!(b.draw(at(0.0), Line::solid(1.0, RED)).is_err());
        assert!(b.end().is_err());

        b.begin();
        assert!(matches!(b.instance_range(), Err(BatchError::NotFinalized { .. })));

        b.end().unwrap();
        assert!(b.draw(at(0.0), Line::solid(1.0, RED)).is_err());
        assert_eq!(b.len(), 0);
    }

    #[test]
    fn finalized_line_reads_back_bit_identical() {
        let line = Line::dashed(1.37, [0.1, 0.2, 0.3], 0.071).with_thickness(0.013);

        let mut b = batch();
        b.begin();
        b.draw(Transform::IDENTITY, line).unwrap();
        b.end().unwrap();

        assert!(same_bits(&b.instances().unwrap()[0].shape, &line));
    }

    // ── tessellation ──────────────────────────────────────────────────────

    fn tessellated(transform: Transform, line: Line) -> Vec<LineSegment> {
        let mut out = Vec::new();
        tessellate(&transform, &line, &LineTessellation::default(), &mut out);
        out
    }

    #[test]
    fn solid_line_is_centered_on_local_y() {
        let segs = tessellated(at(3.0), Line::solid(2.0, RED));

        assert_eq!(segs.len(), 1);
        assert!(close(segs[0].a, [3.0, 1.0, 0.0]));
        assert!(close(segs[0].b, [3.0, -1.0, 0.0]));
        assert_eq!(segs[0].shape, LineSegment::SHAPE_RECTANGLE);
        assert_eq!(segs[0].thickness, Line::DEFAULT_THICKNESS);
    }

    #[test]
    fn arrow_has_stem_and_head() {
        // thickness 0.1 -> head 0.4 wide, 0.6 long
        let segs = tessellated(Transform::IDENTITY, Line::arrow(2.0, RED));

        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].shape, LineSegment::SHAPE_RECTANGLE);
        assert!(close(segs[0].a, [0.0, 0.0, 0.0]));
        assert!(close(segs[0].b, [0.0, 1.4, 0.0]));

        assert_eq!(segs[1].shape, LineSegment::SHAPE_TRIANGLE);
        assert!(close(segs[1].a, [0.0, 1.4, 0.0]));
        assert!(close(segs[1].b, [0.0, 2.0, 0.0]));
        assert!((segs[1].thickness - 0.4).abs() < 1e-6);
        assert_eq!(segs[1].dash_size, 0.0);
    }

    #[test]
    fn short_arrow_is_all_head() {
        let segs = tessellated(Transform::IDENTITY, Line::arrow(0.5, RED));

        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].shape, LineSegment::SHAPE_TRIANGLE);
        assert!(close(segs[0].b, [0.0, 0.5, 0.0]));
    }

    #[test]
    fn circle_is_a_closed_ring_with_running_dash_offset() {
        let segs = tessellated(at(1.0), Line::circle(4.0, RED).with_dash_size(0.1));

        assert_eq!(segs.len(), 48);
        for seg in &segs {
            let a = Vec3::from_array(seg.a) - Vec3::X;
            assert!((a.length() - 2.0).abs() < 1e-4);
            assert!(a.y.abs() < 1e-6);
            assert_eq!(seg.dash_size, 0.1);
        }

        // Each segment starts where the previous one's length left off.
        for pair in segs.windows(2) {
            assert!(pair[1].dash_offset > pair[0].dash_offset);
            assert!((pair[1].dash_offset - pair[0].dash_offset - pair[0].length()).abs() < 1e-4);
        }

        // Consecutive segments share an endpoint; the ring closes.
        for pair in segs.windows(2) {
            assert!(close(pair[1].b, pair[0].a));
        }
        assert!(close(segs[0].b, segs[47].a));
    }

    #[test]
    fn circle_segment_count_is_configurable() {
        let params = LineTessellation { circle_segments: 1, ..Default::default() };
        let mut out = Vec::new();
        tessellate(&Transform::IDENTITY, &Line::circle(1.0, RED), &params, &mut out);
        assert_eq!(out.len(), 3);
    }

    // ── GPU layout ────────────────────────────────────────────────────────

    #[test]
    fn segment_layout_matches_vertex_attributes() {
        assert_eq!(std::mem::size_of::<LineSegment>(), 52);

        let layout = LineSegment::layout();
        assert_eq!(layout.array_stride, 52);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(layout.attributes[4].offset, 40);
        assert_eq!(layout.attributes[6].offset, 48);
    }
}
