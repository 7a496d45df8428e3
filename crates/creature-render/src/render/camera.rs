use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Bind group index reserved for the camera uniform.
pub const CAMERA_GROUP: u32 = 0;

/// Camera data read by every pipeline's shaders.
///
/// Layout (80 bytes, matches the WGSL `Camera` struct):
///
///  offset  0  view_proj  [[f32; 4]; 4]
///  offset 64  position   [f32; 3]
///  offset 76  _pad       f32
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

impl CameraUniform {
    #[inline]
    pub fn new(view_proj: Mat4, position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            position: position.to_array(),
            _pad: 0.0,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Vec3::ZERO)
    }
}

/// Host-owned camera uniform buffer and its bind group.
///
/// The view/projection math lives in the host; this type only moves the
/// result to the GPU and exposes the layout pipelines are built against.
pub struct CameraBinding {
    layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("creature camera bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(camera_ubo_min_binding_size()),
                },
                count: None,
            }],
        });

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("creature camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("creature camera bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        Self { layout, ubo, bind_group }
    }

    #[inline]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn write(&self, queue: &wgpu::Queue, camera: &CameraUniform) {
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(camera));
    }

    /// Binds the camera at [`CAMERA_GROUP`]. Call before encoding any pipeline.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(CAMERA_GROUP, &self.bind_group, &[]);
    }
}

/// `CameraUniform` is 80 bytes, so the binding size is never zero.
fn camera_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<CameraUniform>() as u64)
        .expect("CameraUniform has non-zero size by construction")
}
