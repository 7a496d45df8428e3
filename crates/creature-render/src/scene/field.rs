use glam::Vec3;

use super::DrawInstance;
use super::shapes::Ellipsoid;

/// Implicit surface formed by a set of ellipsoid draws.
///
/// Each ellipsoid is evaluated in its own local frame; the union is blended
/// with a polynomial smooth minimum so neighbouring shapes fuse into one
/// body. The sign convention follows [`Ellipsoid::eval`].
#[derive(Debug, Copy, Clone)]
pub struct EllipsoidField<'a> {
    shapes: &'a [DrawInstance<Ellipsoid>],
    blend: f32,
}

impl<'a> EllipsoidField<'a> {
    pub const DEFAULT_BLEND: f32 = 0.5;

    /// Step used for the central differences in [`gradient`](Self::gradient).
    pub const GRADIENT_STEP: f32 = 1.0e-3;

    /// Newton steps [`project`](Self::project) takes before giving up.
    pub const PROJECT_ITERATIONS: usize = 32;

    /// `|value|` below which a point counts as on the surface.
    pub const SURFACE_TOLERANCE: f32 = 1.0e-5;

    #[inline]
    pub fn new(shapes: &'a [DrawInstance<Ellipsoid>]) -> Self {
        Self { shapes, blend: Self::DEFAULT_BLEND }
    }

    /// Sets the smooth-minimum radius. `0.0` gives a hard union.
    #[inline]
    pub fn with_blend(mut self, blend: f32) -> Self {
        self.blend = blend.max(0.0);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Samples the field at a world-space point. `None` when there are no shapes.
    pub fn sample(&self, at: Vec3) -> Option<f32> {
        let mut values = self.shapes.iter().map(|s| Self::eval_shape(s, at));

        let first = values.next()?;
        let Some(second) = values.next() else { return Some(first) };

        // Only the two smallest values take part in the blend.
        let (mut min_1, mut min_2) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        for v in values {
            if v < min_1 {
                min_2 = min_1;
                min_1 = v;
            } else if v < min_2 {
                min_2 = v;
            }
        }

        Some(smooth_min(min_1, min_2, self.blend))
    }

    /// Returns `true` if `at` lies inside the blended surface.
    #[inline]
    pub fn contains(&self, at: Vec3) -> bool {
        self.sample(at).is_some_and(|v| v < 0.0)
    }

    /// Field gradient at `at` by central differences. Points away from the
    /// inside. `None` when there are no shapes.
    pub fn gradient(&self, at: Vec3) -> Option<Vec3> {
        let h = Self::GRADIENT_STEP;
        let axis = |d: Vec3| -> Option<f32> {
            Some((self.sample(at + d * h)? - self.sample(at - d * h)?) / (2.0 * h))
        };
        Some(Vec3::new(axis(Vec3::X)?, axis(Vec3::Y)?, axis(Vec3::Z)?))
    }

    /// Unit outward surface normal at `at`, if the gradient is usable there.
    #[inline]
    pub fn normal(&self, at: Vec3) -> Option<Vec3> {
        self.gradient(at)?.try_normalize()
    }

    /// Moves `from` onto the surface with Newton steps along the gradient.
    ///
    /// `None` when there are no shapes, the gradient vanishes, or the point
    /// does not settle within [`PROJECT_ITERATIONS`](Self::PROJECT_ITERATIONS).
    pub fn project(&self, from: Vec3) -> Option<Vec3> {
        let mut point = from;
        for _ in 0..Self::PROJECT_ITERATIONS {
            let value = self.sample(point)?;
            if value.abs() <= Self::SURFACE_TOLERANCE {
                return Some(point);
            }

            let grad = self.gradient(point)?;
            let grad_sq = grad.length_squared();
            if !grad_sq.is_normal() {
                return None;
            }
            point -= grad * (value / grad_sq);
        }

        self.sample(point)
            .filter(|v| v.abs() <= Self::SURFACE_TOLERANCE)
            .map(|_| point)
    }

    fn eval_shape(shape: &DrawInstance<Ellipsoid>, at: Vec3) -> f32 {
        let local = shape.transform.inverse_transform_point(at);
        shape.shape.eval(local)
    }
}

fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return a.min(b);
    }
    let h = (k - (a - b).abs()).max(0.0);
    a.min(b) - h * h * 0.25 / k
}
