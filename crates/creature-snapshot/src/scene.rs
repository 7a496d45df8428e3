use std::f32::consts::{FRAC_PI_2, TAU};

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};

use creature_render::render::CameraUniform;
use creature_render::render::shapes::{LinePipeline, SurfacePipeline};
use creature_render::scene::BatchError;
use creature_render::scene::shapes::{Ellipsoid, Line};
use creature_render::{Counter, Transform};

const AXIS_X: [f32; 3] = [0.9, 0.2, 0.2];
const AXIS_Y: [f32; 3] = [0.2, 0.8, 0.2];
const AXIS_Z: [f32; 3] = [0.2, 0.3, 0.9];
const SELECTION: [f32; 3] = [1.0, 0.75, 0.1];

/// One ellipsoid of the demo body, with a stable id for selection.
#[derive(Debug, Clone)]
pub struct BodyPart {
    pub id: u64,
    pub name: &'static str,
    pub position: Vec3,
    pub rotation: Vec3,
    pub shape: Ellipsoid,
}

impl BodyPart {
    fn transform(&self) -> Transform {
        Transform::from_pose(self.position, self.rotation, Vec3::ONE)
    }
}

/// Small blob creature used to exercise both pipelines.
#[derive(Debug, Clone)]
pub struct Creature {
    parts: Vec<BodyPart>,
    selected: Option<u64>,
}

impl Creature {
    pub fn demo(ids: &mut Counter) -> Result<Self> {
        let tilt = |z: f32| Vec3::new(0.0, 0.0, z);
        let layout = [
            ("torso", Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, Ellipsoid::new(1.2, 0.8, 0.7)),
            ("head", Vec3::new(1.3, 1.7, 0.0), tilt(0.3), Ellipsoid::sphere(0.5)),
            ("tail", Vec3::new(-1.4, 1.2, 0.0), tilt(-0.6), Ellipsoid::new(0.9, 0.2, 0.2)),
            ("leg_l", Vec3::new(0.3, 0.2, 0.5), Vec3::ZERO, Ellipsoid::new(0.2, 0.6, 0.2)),
            ("leg_r", Vec3::new(0.3, 0.2, -0.5), Vec3::ZERO, Ellipsoid::new(0.2, 0.6, 0.2)),
        ];

        let mut parts = Vec::with_capacity(layout.len());
        for (name, position, rotation, shape) in layout {
            let id = ids.next().context("body part id counter exhausted")?;
            parts.push(BodyPart { id, name, position, rotation, shape });
        }

        let selected = parts.iter().find(|p| p.name == "head").map(|p| p.id);
        Ok(Self { parts, selected })
    }

    #[inline]
    pub fn parts(&self) -> &[BodyPart] {
        &self.parts
    }

    pub fn selected(&self) -> Option<&BodyPart> {
        let id = self.selected?;
        self.parts.iter().find(|p| p.id == id)
    }

    /// Records this frame's draws. Both pipelines must already be in `begin`.
    pub fn record(
        &self,
        lines: &mut LinePipeline,
        surfaces: &mut SurfacePipeline,
    ) -> Result<(), BatchError> {
        for part in &self.parts {
            surfaces.draw_ellipsoid(part.transform(), part.shape)?;
        }

        // World axes gizmo at the origin.
        let to_x = Transform::from_pose(Vec3::ZERO, Vec3::new(0.0, 0.0, -FRAC_PI_2), Vec3::ONE);
        let to_z = Transform::from_pose(Vec3::ZERO, Vec3::new(FRAC_PI_2, 0.0, 0.0), Vec3::ONE);
        lines.draw(to_x, Line::arrow(1.0, AXIS_X))?;
        lines.draw(Transform::IDENTITY, Line::arrow(1.0, AXIS_Y))?;
        lines.draw(to_z, Line::arrow(1.0, AXIS_Z))?;

        if let Some(part) = self.selected() {
            let radius = part.shape.radii().max_element();
            lines.draw(
                Transform::from_translation(part.position),
                Line::circle(radius * 2.4, SELECTION)
                    .with_thickness(0.03)
                    .with_dash_size(0.08),
            )?;
            // Vertical marker from the ground to the part.
            let mid = part.position * Vec3::new(1.0, 0.5, 1.0);
            lines.draw(
                Transform::from_translation(mid),
                Line::dashed(part.position.y, SELECTION, 0.05).with_thickness(0.02),
            )?;
        }

        Ok(())
    }
}

/// Orbiting camera looking at the creature.
pub fn orbit_camera(frame: u64, frames: u64, aspect: f32) -> CameraUniform {
    let angle = TAU * frame as f32 / frames.max(1) as f32;
    let eye = Vec3::new(angle.cos() * 6.0, 3.0, angle.sin() * 6.0);
    let target = Vec3::new(0.0, 1.0, 0.0);

    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    let proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);

    CameraUniform::new(proj * view, eye)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_parts_get_sequential_ids() {
        let mut ids = Counter::new();
        let creature = Creature::demo(&mut ids).unwrap();

        let got: Vec<u64> = creature.parts().iter().map(|p| p.id).collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert_eq!(creature.selected().map(|p| p.name), Some("head"));
    }

    #[test]
    fn second_creature_continues_the_sequence() {
        let mut ids = Counter::new();
        Creature::demo(&mut ids).unwrap();
        let second = Creature::demo(&mut ids).unwrap();
        assert_eq!(second.parts()[0].id, 5);
    }

    #[test]
    fn camera_sits_on_the_orbit() {
        let cam = orbit_camera(0, 4, 1.0);
        assert_eq!(cam.position, [6.0, 3.0, 0.0]);
    }
}
