//! Physics seams: the plugin a scene simulates with, the loader that produces
//! it asynchronously, and the aggregates binding meshes to rigid bodies.
//!
//! The scene never talks to a physics engine directly. It goes through
//! [`PhysicsPlugin`], which [`rapier::RapierPlugin`] implements on top of
//! `rapier3d`.

use std::pin::Pin;

use cgmath::{Quaternion, Vector3};

use crate::{data_structures::mesh::Mesh, error::SceneError, scene::MeshId};

pub mod rapier;

pub use rapier::{RapierLoader, RapierPlugin};

/// Flat meshes still need some thickness to collide against.
pub const MIN_HALF_EXTENT: f32 = 0.01;

/// Future returned by the asynchronous loaders of this crate.
pub type LoadFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Collision shape family an aggregate derives from its mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsShapeType {
    Sphere,
    Box,
}

/// A concrete collision shape in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vector3<f32> },
}

impl Shape {
    /// Fits `shape_type` to the mesh's world-space bounding box.
    pub fn fit(shape_type: PhysicsShapeType, mesh: &Mesh) -> Result<Shape, SceneError> {
        let extents = mesh.world_extents();
        let largest = extents.x.max(extents.y).max(extents.z);
        if largest <= 0.0 {
            return Err(SceneError::DegenerateShape(mesh.name.clone()));
        }
        Ok(match shape_type {
            PhysicsShapeType::Sphere => Shape::Ball {
                radius: largest / 2.0,
            },
            PhysicsShapeType::Box => Shape::Cuboid {
                half_extents: Vector3::new(
                    (extents.x / 2.0).max(MIN_HALF_EXTENT),
                    (extents.y / 2.0).max(MIN_HALF_EXTENT),
                    (extents.z / 2.0).max(MIN_HALF_EXTENT),
                ),
            },
        })
    }
}

/// Mass and material response of an aggregate. A mass of zero makes the body static.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateOptions {
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            mass: 0.0,
            restitution: 0.0,
            friction: 0.2,
        }
    }
}

impl AggregateOptions {
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Everything a plugin needs to create one rigid body with one collider.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub options: AggregateOptions,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

/// A mesh bound to a simulated rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsAggregate {
    pub mesh: MeshId,
    pub shape_type: PhysicsShapeType,
    pub shape: Shape,
    pub body: BodyHandle,
    pub options: AggregateOptions,
}

impl PhysicsAggregate {
    pub fn is_dynamic(&self) -> bool {
        !self.options.is_static()
    }
}

pub trait PhysicsPlugin {
    fn name(&self) -> &str;

    fn set_gravity(&mut self, gravity: Vector3<f32>);

    fn gravity(&self) -> Vector3<f32>;

    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Advance the world; `dt` is the frame delta in seconds.
    fn step(&mut self, dt: f32);

    fn body_transform(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)>;

    fn body_count(&self) -> usize;
}

/// Produces the physics plugin once its backend is ready.
pub trait PhysicsLoader {
    fn load(&self) -> LoadFuture<Box<dyn PhysicsPlugin>>;
}
