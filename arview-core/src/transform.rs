/// Poses, rotation state and transformation matrices
use nalgebra::{Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};
use std::f32::consts::TAU;

/// A rigid transform as delivered by the AR runtime (column-major 4x4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub matrix: Matrix4<f32>,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Build from sixteen floats in column-major order, the layout of
    /// `XRRigidTransform.matrix`. Returns `None` for any other length.
    pub fn from_column_major(values: &[f32]) -> Option<Self> {
        if values.len() != 16 {
            return None;
        }
        Some(Self {
            matrix: Matrix4::from_column_slice(values),
        })
    }

    pub fn from_translation(position: Point3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&position.coords),
        }
    }

    pub fn from_parts(position: Point3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&position.coords) * orientation.to_homogeneous(),
        }
    }

    /// Translation component
    pub fn position(&self) -> Point3<f32> {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        let linear = self.matrix.fixed_view::<3, 3>(0, 0).into_owned();
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&linear))
    }

    pub fn to_column_major(&self) -> [f32; 16] {
        let mut values = [0.0; 16];
        values.copy_from_slice(self.matrix.as_slice());
        values
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Turn around the vertical axis, keeping the angle in `[0, 2π)`.
    pub fn spin(&mut self, dy: f32) {
        self.y = (self.y + dy).rem_euclid(TAU);
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        // Apply rotations in order: Z, Y, X
        rz * ry * rx
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Model matrix of a placed object: rotate in place, then move to `position`.
    pub fn model_matrix(position: &Point3<f32>, rotation: &RotationState) -> Matrix4<f32> {
        Self::translation_matrix(position.x, position.y, position.z)
            * Self::rotation_matrix(rotation)
    }
}
