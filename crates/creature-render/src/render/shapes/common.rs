//! Shared GPU plumbing used by all shape pipelines.

use std::marker::PhantomData;

use anyhow::Result;
use bytemuck::Pod;

use crate::render::{PipelineInit, RenderCtx};

// ── blend ─────────────────────────────────────────────────────────────────

/// Straight (non-premultiplied) alpha blending.
pub(super) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── depth / multisample ───────────────────────────────────────────────────

pub(super) fn depth_state(init: &PipelineInit) -> Option<wgpu::DepthStencilState> {
    init.depth_format.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

pub(super) fn multisample_state(init: &PipelineInit) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: init.sample_count,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

// ── device checks ─────────────────────────────────────────────────────────

/// Fails if the device cannot host a pipeline with this vertex input.
pub(super) fn ensure_device_support(
    device: &wgpu::Device,
    init: &PipelineInit,
    label: &str,
    vertex_attributes: u32,
    instance_stride: u64,
) -> Result<()> {
    let limits = device.limits();

    anyhow::ensure!(
        limits.max_vertex_attributes >= vertex_attributes,
        "{label}: needs {vertex_attributes} vertex attributes, device allows {}",
        limits.max_vertex_attributes
    );
    anyhow::ensure!(
        u64::from(limits.max_vertex_buffer_array_stride) >= instance_stride,
        "{label}: instance stride {instance_stride} exceeds device limit {}",
        limits.max_vertex_buffer_array_stride
    );
    anyhow::ensure!(
        init.sample_count.is_power_of_two(),
        "{label}: sample count {} is not a power of two",
        init.sample_count
    );
    anyhow::ensure!(init.initial_capacity > 0, "{label}: initial capacity must be non-zero");

    let initial = grown_capacity(init.initial_capacity, 1) as u64;
    anyhow::ensure!(
        initial.saturating_mul(instance_stride) <= limits.max_buffer_size,
        "{label}: {initial} instances of {instance_stride} bytes exceed buffer limit {}",
        limits.max_buffer_size
    );

    Ok(())
}

// ── instance buffer ───────────────────────────────────────────────────────

/// Capacity to allocate for `required` instances: the next power of two,
/// never below `min`.
pub(super) fn grown_capacity(required: usize, min: usize) -> usize {
    required.checked_next_power_of_two().unwrap_or(usize::MAX).max(min)
}

/// Most instances of `stride` bytes one buffer can hold on a device with
/// `limits`. Also capped by the `u32` instance range of a draw call.
pub(super) fn max_instances(limits: &wgpu::Limits, stride: u64) -> usize {
    let by_size = limits.max_buffer_size / stride.max(1);
    usize::try_from(by_size).unwrap_or(usize::MAX).min(u32::MAX as usize)
}

/// New capacity for an upload of `required` instances, or `None` when
/// `current` already fits them. Never shrinks; never grows past `max`.
pub(super) fn next_capacity(current: usize, required: usize, max: usize) -> Option<usize> {
    if required <= current {
        return None;
    }
    let grown = grown_capacity(required, current).min(max);
    (grown > current).then_some(grown)
}

/// Per-frame instance storage in a vertex buffer.
///
/// Capacity grows (power-of-two steps) and never shrinks, so a steady frame
/// load stops reallocating after warm-up. Growth stops at the device's
/// buffer size limit; uploads past it keep the leading instances.
pub(super) struct InstanceBuffer<T> {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    max_capacity: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> InstanceBuffer<T> {
    pub(super) fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        let max_capacity = max_instances(&device.limits(), std::mem::size_of::<T>() as u64);
        let capacity = grown_capacity(capacity, 1).min(max_capacity);
        Self {
            label,
            buffer: Self::create(device, label, capacity),
            capacity,
            max_capacity,
            len: 0,
            _marker: PhantomData,
        }
    }

    fn create(device: &wgpu::Device, label: &'static str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<T>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Replaces the buffer contents with `data`, growing if needed.
    pub(super) fn upload(&mut self, ctx: &RenderCtx<'_>, data: &[T]) {
        if let Some(new_cap) = next_capacity(self.capacity, data.len(), self.max_capacity) {
            log::debug!("{}: growing {} -> {} instances", self.label, self.capacity, new_cap);
            self.buffer = Self::create(ctx.device, self.label, new_cap);
            self.capacity = new_cap;
        }

        let data = if data.len() > self.capacity {
            log::warn!(
                "{}: {} instances exceed the device buffer limit; keeping the first {}",
                self.label,
                data.len(),
                self.capacity
            );
            &data[..self.capacity]
        } else {
            data
        };

        self.len = data.len();
        if !data.is_empty() {
            ctx.queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
    }

    #[inline]
    pub(super) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of instances written by the last upload.
    #[inline]
    pub(super) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grown_capacity_respects_minimum() {
        assert_eq!(grown_capacity(1, 64), 64);
        assert_eq!(grown_capacity(64, 64), 64);
        assert_eq!(grown_capacity(65, 64), 128);
        assert_eq!(grown_capacity(1000, 1), 1024);
    }

    // ── growth decisions ──────────────────────────────────────────────────

    #[test]
    fn next_capacity_keeps_buffer_that_fits() {
        assert_eq!(next_capacity(64, 0, usize::MAX), None);
        assert_eq!(next_capacity(64, 10, usize::MAX), None);
        assert_eq!(next_capacity(64, 64, usize::MAX), None);
    }

    #[test]
    fn next_capacity_grows_in_powers_of_two() {
        assert_eq!(next_capacity(64, 65, usize::MAX), Some(128));
        assert_eq!(next_capacity(64, 300, usize::MAX), Some(512));
    }

    #[test]
    fn capacity_never_shrinks_across_frames() {
        let mut cap = 64;
        let mut seen = Vec::new();
        for required in [10, 300, 20, 5000, 1] {
            if let Some(grown) = next_capacity(cap, required, usize::MAX) {
                assert!(grown > cap);
                cap = grown;
            }
            seen.push(cap);
        }
        assert_eq!(seen, vec![64, 512, 512, 8192, 8192]);
    }

    #[test]
    fn next_capacity_stops_at_device_limit() {
        assert_eq!(next_capacity(64, 1000, 100), Some(100));
        assert_eq!(next_capacity(100, 1000, 100), None);
    }

    #[test]
    fn max_instances_follows_buffer_size_limit() {
        let limits = wgpu::Limits {
            max_buffer_size: 256 << 20,
            ..wgpu::Limits::default()
        };
        assert_eq!(max_instances(&limits, 52), (256 << 20) / 52);

        let unbounded = wgpu::Limits {
            max_buffer_size: u64::MAX,
            ..wgpu::Limits::default()
        };
        assert_eq!(max_instances(&unbounded, 1), u32::MAX as usize);
    }
}
