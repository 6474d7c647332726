//! Retained scene graph: meshes and directional lights.
//!
//! Objects are only ever added. Handles returned by [`Scene::add_mesh`] and
//! [`Scene::add_light`] stay valid for the life of the scene.

use std::rc::Rc;

use nalgebra::{Matrix4, Point3, Vector3};

use crate::color::Color;
use crate::geometry::Mesh;
use crate::transform::{Rotation, Transform};

/// Opaque handle to an object inside a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// Blinn-Phong surface parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongMaterial {
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
}

impl PhongMaterial {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            specular: Color::rgb(0x11, 0x11, 0x11),
            shininess: 30.0,
        }
    }
}

/// A drawable: shared geometry, its own material and transform
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub geometry: Rc<Mesh>,
    pub material: PhongMaterial,
    pub position: Point3<f32>,
    pub rotation: Rotation,
}

impl MeshObject {
    pub fn new(geometry: Rc<Mesh>, material: PhongMaterial) -> Self {
        Self {
            geometry,
            material,
            position: Point3::origin(),
            rotation: Rotation::default(),
        }
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        Transform::model_matrix(&self.position, &self.rotation)
    }
}

/// Light shining from `position` toward `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl DirectionalLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position: Point3::new(0.0, 1.0, 0.0),
            target: Point3::origin(),
        }
    }

    /// Unit vector pointing from the lit surface toward the light
    pub fn direction_to_light(&self) -> Vector3<f32> {
        (self.position - self.target).normalize()
    }
}

#[derive(Debug, Clone)]
enum SceneObject {
    Mesh(MeshObject),
    Light(DirectionalLight),
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: MeshObject) -> ObjectId {
        self.push(SceneObject::Mesh(mesh))
    }

    pub fn add_light(&mut self, light: DirectionalLight) -> ObjectId {
        self.push(SceneObject::Light(light))
    }

    fn push(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn mesh(&self, id: ObjectId) -> Option<&MeshObject> {
        match self.objects.get(id.0) {
            Some(SceneObject::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self, id: ObjectId) -> Option<&mut MeshObject> {
        match self.objects.get_mut(id.0) {
            Some(SceneObject::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    /// Meshes in insertion order
    pub fn meshes(&self) -> impl Iterator<Item = &MeshObject> {
        self.objects.iter().filter_map(|object| match object {
            SceneObject::Mesh(mesh) => Some(mesh),
            SceneObject::Light(_) => None,
        })
    }

    /// Lights in insertion order
    pub fn lights(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.objects.iter().filter_map(|object| match object {
            SceneObject::Light(light) => Some(light),
            SceneObject::Mesh(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_handles_address_their_objects() {
        let geometry = Rc::new(Mesh::cuboid(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        assert!(scene.is_empty());

        let cube = scene.add_mesh(MeshObject::new(
            Rc::clone(&geometry),
            PhongMaterial::new(Color::GREEN),
        ));
        let light = scene.add_light(DirectionalLight::new(Color::WHITE, 1.0));

        assert_eq!(scene.len(), 2);
        assert!(scene.mesh(cube).is_some());
        assert!(scene.mesh(light).is_none());
        assert!(scene.mesh_mut(light).is_none());
        assert_eq!(scene.meshes().count(), 1);
        assert_eq!(scene.lights().count(), 1);
    }

    #[test]
    fn test_geometry_is_shared() {
        let geometry = Rc::new(Mesh::cuboid(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        for color in [Color::GREEN, Color::YELLOW] {
            scene.add_mesh(MeshObject::new(
                Rc::clone(&geometry),
                PhongMaterial::new(color),
            ));
        }

        assert_eq!(Rc::strong_count(&geometry), 3);
        let colors: Vec<_> = scene.meshes().map(|m| m.material.color).collect();
        assert_eq!(colors, vec![Color::GREEN, Color::YELLOW]);
    }

    #[test]
    fn test_light_direction() {
        let mut light = DirectionalLight::new(Color::WHITE, 1.0);
        light.position = Point3::new(-1.0, 2.0, 4.0);
        let expected = Vector3::new(-1.0, 2.0, 4.0) / 21.0_f32.sqrt();
        assert_relative_eq!(light.direction_to_light(), expected, epsilon = 1e-6);
    }
}
