//! CPU side of a mounted canvas: cameras, lights, meshes and the physics world
//! the meshes are bound to.
//!
//! A [`Scene`] knows nothing about the GPU. The engine takes ownership of it when
//! the render loop starts and uploads whatever changed each frame.

use std::time::Duration;

use cgmath::Vector3;

use crate::{
    camera::Camera,
    data_structures::mesh::Mesh,
    error::SceneError,
    overlay::{DebugOverlay, OverlayOptions},
    physics::{AggregateOptions, BodyDesc, PhysicsAggregate, PhysicsPlugin, PhysicsShapeType, Shape},
};

pub mod builder;
pub mod light;

pub use light::HemisphericLight;

/// Index of a mesh inside its [`Scene`].
pub type MeshId = usize;

pub struct Scene {
    cameras: Vec<Camera>,
    lights: Vec<HemisphericLight>,
    meshes: Vec<Mesh>,
    physics: Option<Box<dyn PhysicsPlugin>>,
    aggregates: Vec<PhysicsAggregate>,
    debug_layer: Option<Box<dyn DebugOverlay>>,
    pub clear_colour: wgpu::Color,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            cameras: Vec::new(),
            lights: Vec::new(),
            meshes: Vec::new(),
            physics: None,
            aggregates: Vec::new(),
            debug_layer: None,
            clear_colour: wgpu::Color::BLACK,
        }
    }

    pub fn add_camera(&mut self, camera: Camera) {
        self.cameras.push(camera);
    }

    pub fn add_light(&mut self, light: HemisphericLight) {
        self.lights.push(light);
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn lights(&self) -> &[HemisphericLight] {
        &self.lights
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn aggregates(&self) -> &[PhysicsAggregate] {
        &self.aggregates
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    /// The first camera added renders the scene.
    pub fn active_camera(&self) -> Option<&Camera> {
        self.cameras.first()
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.cameras.first_mut()
    }

    /// Attach a physics world. Aggregates can only be created afterwards.
    pub fn enable_physics(&mut self, gravity: Vector3<f32>, mut plugin: Box<dyn PhysicsPlugin>) {
        plugin.set_gravity(gravity);
        log::info!(
            "physics enabled with {} (gravity {:?})",
            plugin.name(),
            gravity
        );
        self.physics = Some(plugin);
    }

    pub fn is_physics_enabled(&self) -> bool {
        self.physics.is_some()
    }

    pub fn physics(&self) -> Option<&dyn PhysicsPlugin> {
        self.physics.as_deref()
    }

    /// Bind `mesh` to a new rigid body whose collider is fitted to the mesh.
    pub fn add_aggregate(
        &mut self,
        mesh: MeshId,
        shape_type: PhysicsShapeType,
        options: AggregateOptions,
    ) -> Result<&PhysicsAggregate, SceneError> {
        let physics = self.physics.as_mut().ok_or(SceneError::PhysicsNotEnabled)?;
        let target = self.meshes.get(mesh).ok_or(SceneError::UnknownMesh(mesh))?;
        let shape = Shape::fit(shape_type, target)?;
        let body = physics.add_body(&BodyDesc {
            shape,
            options,
            position: target.transform.position,
            rotation: target.transform.rotation,
        });
        log::debug!("`{}` bound to body {:?} as {:?}", target.name, body, shape);
        self.aggregates.push(PhysicsAggregate {
            mesh,
            shape_type,
            shape,
            body,
            options,
        });
        Ok(&self.aggregates[self.aggregates.len() - 1])
    }

    /// Advance physics, copy dynamic bodies back into their meshes and apply
    /// camera input.
    pub fn step(&mut self, dt: Duration) {
        if let Some(physics) = self.physics.as_mut() {
            physics.step(dt.as_secs_f32());
            for aggregate in self.aggregates.iter().filter(|a| a.is_dynamic()) {
                let Some((position, rotation)) = physics.body_transform(aggregate.body) else {
                    continue;
                };
                if let Some(mesh) = self.meshes.get_mut(aggregate.mesh) {
                    mesh.transform.position = position;
                    mesh.transform.rotation = rotation;
                }
            }
        }
        if let Some(camera) = self.active_camera_mut() {
            camera.update(dt);
        }
    }

    /// Show `overlay` embedded next to the canvas and keep it for refreshes.
    pub fn attach_debug_layer(&mut self, mut overlay: Box<dyn DebugOverlay>) -> anyhow::Result<()> {
        overlay.show(&OverlayOptions { embed_mode: true }, &self.describe())?;
        self.debug_layer = Some(overlay);
        Ok(())
    }

    pub fn has_debug_layer(&self) -> bool {
        self.debug_layer.is_some()
    }

    pub fn refresh_debug_layer(&mut self) {
        if self.debug_layer.is_none() {
            return;
        }
        let lines = self.describe();
        if let Some(overlay) = self.debug_layer.as_mut() {
            overlay.refresh(&lines);
        }
    }

    /// One line per scene entity; this is what the debug overlay shows.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for camera in &self.cameras {
            let p = camera.position;
            lines.push(format!(
                "camera {} at ({:.2}, {:.2}, {:.2}){}",
                camera.name,
                p.x,
                p.y,
                p.z,
                if camera.has_control() { " [control]" } else { "" }
            ));
        }
        for light in &self.lights {
            lines.push(format!(
                "hemispheric light {} intensity {:.2}",
                light.name, light.intensity
            ));
        }
        for (id, mesh) in self.meshes.iter().enumerate() {
            let p = mesh.transform.position;
            let body = self
                .aggregates
                .iter()
                .find(|aggregate| aggregate.mesh == id)
                .map(|aggregate| {
                    if aggregate.is_dynamic() {
                        format!(" {:?} body, mass {}", aggregate.shape_type, aggregate.options.mass)
                    } else {
                        format!(" static {:?} body", aggregate.shape_type)
                    }
                })
                .unwrap_or_default();
            lines.push(format!(
                "mesh {} at ({:.2}, {:.2}, {:.2}), {} vertices{}",
                mesh.name,
                p.x,
                p.y,
                p.z,
                mesh.data.vertices.len(),
                body
            ));
        }
        if let Some(physics) = self.physics.as_deref() {
            lines.push(format!(
                "physics {} with {} bodies",
                physics.name(),
                physics.body_count()
            ));
        }
        lines
    }
}
