//! Headless host for the creature pipelines.
//!
//! Creates a windowless wgpu device, renders a few frames of a demo creature
//! into an offscreen target, and logs what each frame submitted.

mod config;
mod headless;
mod scene;

use anyhow::Result;
use glam::Vec3;

use creature_render::logging::{init_logging, LoggingConfig};
use creature_render::render::shapes::{LinePipeline, SurfacePipeline};
use creature_render::render::{CameraBinding, PipelineInit};
use creature_render::Counter;

use config::SnapshotConfig;
use headless::{GpuInit, HeadlessGpu, OffscreenTarget};
use scene::{orbit_camera, Creature};

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.96,
    g: 0.95,
    b: 0.93,
    a: 1.0,
};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = SnapshotConfig::from_args(std::env::args().skip(1))?;
    pollster::block_on(run(config))
}

async fn run(config: SnapshotConfig) -> Result<()> {
    let gpu = HeadlessGpu::new(GpuInit::default()).await?;
    let ctx = gpu.render_ctx();

    let init = PipelineInit {
        sample_count: config.sample_count,
        ..Default::default()
    };

    let target = OffscreenTarget::new(gpu.device(), config.width, config.height, &init)?;
    let camera = CameraBinding::new(gpu.device());

    let mut lines = LinePipeline::new(&ctx, camera.layout(), &init)?;
    let mut surfaces = SurfacePipeline::new(&ctx, camera.layout(), &init)?;

    let mut ids = Counter::new();
    let creature = Creature::demo(&mut ids)?;

    for frame in 0..config.frames {
        camera.write(gpu.queue(), &orbit_camera(frame, config.frames, target.aspect()));

        lines.begin();
        surfaces.begin();
        creature.record(&mut lines, &mut surfaces)?;
        lines.end(&ctx)?;
        surfaces.end(&ctx)?;

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("creature-snapshot frame encoder"),
            });
        {
            let mut pass = target.begin_pass(&mut encoder, CLEAR);
            camera.bind(&mut pass);
            surfaces.encode(&mut pass)?;
            lines.encode(&mut pass)?;
        }
        gpu.submit(encoder);

        log::info!(
            "frame {frame}: {} ellipsoids, {} lines ({} segments)",
            surfaces.len(),
            lines.len(),
            lines.segment_count(),
        );
    }

    // Hit-test a few points against the last frame's surface.
    let field = surfaces.field()?;
    for part in creature.parts() {
        log::info!("pick {:>6} (id {}) -> {}", part.name, part.id, field.contains(part.position));
    }
    log::info!("pick  empty       -> {}", field.contains(Vec3::new(0.0, 5.0, 0.0)));

    if let Some(part) = creature.selected() {
        let above = part.position + Vec3::Y * 2.0;
        match field.project(above).and_then(|hit| Some((hit, field.normal(hit)?))) {
            Some((hit, normal)) => log::info!("snap {} -> hit {hit}, normal {normal}", part.name),
            None => log::warn!("snap {} -> no surface near {above}", part.name),
        }
    }

    log::debug!(
        "instance capacity: lines {}, surfaces {}",
        lines.instance_capacity(),
        surfaces.instance_capacity()
    );
    Ok(())
}
