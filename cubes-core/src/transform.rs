//! Object transforms: Euler rotation state and model matrices

use nalgebra::{Matrix4, Point3, Vector3};

/// Rotation around three axes (in radians), applied in XYZ order
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotation {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same angle on every axis
    pub fn uniform(angle: f32) -> Self {
        Self::new(angle, angle, angle)
    }

    pub fn set_uniform(&mut self, angle: f32) {
        *self = Self::uniform(angle);
    }
}

pub struct Transform;

impl Transform {
    /// Rotation matrix for intrinsic XYZ Euler angles (`Rx * Ry * Rz`)
    pub fn rotation_matrix(rotation: &Rotation) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        rx * ry * rz
    }

    /// Translate after rotating about the object's own origin
    pub fn model_matrix(position: &Point3<f32>, rotation: &Rotation) -> Matrix4<f32> {
        Matrix4::new_translation(&position.coords) * Self::rotation_matrix(rotation)
    }
}
