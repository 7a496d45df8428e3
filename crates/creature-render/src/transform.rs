use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Pose of a drawn shape: object-to-world matrix and its inverse.
///
/// Both matrices are stored column-major so the struct can be copied verbatim
/// into GPU-visible memory.
///
/// Layout (128 bytes):
///
///  offset  0  matrix          [[f32; 4]; 4]
///  offset 64  matrix_inverse  [[f32; 4]; 4]
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Transform {
    matrix: [[f32; 4]; 4],
    matrix_inverse: [[f32; 4]; 4],
}

const IDENTITY_COLS: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl Transform {
    pub const IDENTITY: Self = Self {
        matrix: IDENTITY_COLS,
        matrix_inverse: IDENTITY_COLS,
    };

    /// Builds a transform from an object-to-world matrix.
    ///
    /// A singular matrix (e.g. zero scale on an axis) yields a non-finite inverse.
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
            matrix_inverse: matrix.inverse().to_cols_array_2d(),
        }
    }

    /// Builds a transform from a pose.
    ///
    /// `rotation` holds Euler angles in radians, applied in XYZ order.
    /// Scale is applied first, then rotation, then translation.
    pub fn from_pose(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
        Self::from_matrix(Mat4::from_scale_rotation_translation(scale, rotation, position))
    }

    #[inline]
    pub fn from_translation(position: Vec3) -> Self {
        Self::from_matrix(Mat4::from_translation(position))
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix)
    }

    #[inline]
    pub fn matrix_inverse(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix_inverse)
    }

    /// Maps a point from object space to world space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix().transform_point3(point)
    }

    /// Maps a point from world space back into object space.
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix_inverse().transform_point3(point)
    }

    /// Maps a direction from object space to world space (translation ignored).
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.matrix().transform_vector3(vector)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn layout_is_two_column_major_matrices() {
        assert_eq!(std::mem::size_of::<Transform>(), 128);
        assert_eq!(std::mem::align_of::<Transform>(), 4);
    }

    #[test]
    fn identity_leaves_points_alone() {
        let p = Vec3::new(1.0, -2.0, 3.5);
        assert_eq!(Transform::IDENTITY.transform_point(p), p);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }

    #[test]
    fn pose_applies_scale_rotation_translation() {
        let t = Transform::from_pose(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        );

        // +X scaled to 2, rotated a quarter turn about Z onto +Y, then shifted.
        assert!(approx(t.transform_point(Vec3::X), Vec3::new(10.0, 2.0, 0.0)));
        assert!(approx(t.transform_vector(Vec3::X), Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn inverse_undoes_matrix() {
        let t = Transform::from_pose(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.3, -0.7, 1.1),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let p = Vec3::new(-4.0, 0.25, 9.0);

        assert!(approx(t.inverse_transform_point(t.transform_point(p)), p));
    }

    #[test]
    fn bytes_round_trip() {
        let t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let bytes = bytemuck::bytes_of(&t);
        assert_eq!(bytes.len(), 128);
        assert_eq!(*bytemuck::from_bytes::<Transform>(bytes), t);
    }
}
