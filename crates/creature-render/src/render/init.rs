/// Construction parameters shared by all pipelines.
///
/// Formats must match the attachments of the render pass the pipeline is
/// later encoded into.
#[derive(Debug, Clone)]
pub struct PipelineInit {
    /// Format of color attachment 0.
    pub color_format: wgpu::TextureFormat,

    /// Depth attachment format, or `None` to render without depth testing.
    pub depth_format: Option<wgpu::TextureFormat>,

    /// MSAA sample count of the target attachments.
    pub sample_count: u32,

    /// Instance slots allocated up front. Buffers grow past this on demand.
    pub initial_capacity: usize,
}

impl Default for PipelineInit {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
            sample_count: 1,
            initial_capacity: 64,
        }
    }
}
