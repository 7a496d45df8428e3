use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Axis-aligned ellipsoid centered on the origin of its transform.
///
/// Layout: `size: [f32; 3]` (12 bytes), the radius along local X, Y and Z.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Ellipsoid {
    pub size: [f32; 3],
}

impl Ellipsoid {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { size: [x, y, z] }
    }

    #[inline]
    pub const fn sphere(radius: f32) -> Self {
        Self::new(radius, radius, radius)
    }

    #[inline]
    pub fn radii(&self) -> Vec3 {
        Vec3::from_array(self.size)
    }

    /// Implicit function in local space: negative inside, zero on the surface,
    /// positive outside.
    #[inline]
    pub fn eval(&self, local: Vec3) -> f32 {
        let q = local / self.radii();
        q.length_squared() - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_three_floats() {
        assert_eq!(std::mem::size_of::<Ellipsoid>(), 12);
    }

    #[test]
    fn eval_sign_matches_inside_outside() {
        let e = Ellipsoid::new(2.0, 1.0, 0.5);

        assert!(e.eval(Vec3::ZERO) < 0.0);
        assert!(e.eval(Vec3::new(2.0, 0.0, 0.0)).abs() < 1e-6);
        assert!(e.eval(Vec3::new(0.0, 0.0, 0.5)).abs() < 1e-6);
        assert!(e.eval(Vec3::new(0.0, 1.5, 0.0)) > 0.0);
    }
}
