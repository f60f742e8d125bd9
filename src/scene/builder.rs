//! Builds the demo scene: a ball dropped onto a ground plane under gravity.

use std::rc::Rc;

use cgmath::{Deg, Vector3};

use crate::{
    camera::{Camera, CameraController},
    config::DEFAULT_CANVAS_ID,
    data_structures::mesh::{GroundOptions, MeshBuilder, SphereOptions},
    error::SceneError,
    lifecycle::Liveness,
    overlay::{InspectorLoader, OverlayLoader},
    physics::{AggregateOptions, PhysicsLoader, PhysicsShapeType, RapierLoader},
    scene::{HemisphericLight, Scene},
};

pub const GRAVITY: Vector3<f32> = Vector3 {
    x: 0.0,
    y: -9.8,
    z: 0.0,
};

/// Where the asynchronous parts of a scene come from.
#[derive(Clone)]
pub struct SceneLoaders {
    pub physics: Rc<dyn PhysicsLoader>,
    pub overlay: Rc<dyn OverlayLoader>,
}

impl SceneLoaders {
    /// rapier physics and the scene inspector for the canvas `canvas_id`.
    pub fn for_canvas(canvas_id: &str) -> Self {
        Self {
            physics: Rc::new(RapierLoader::default()),
            overlay: Rc::new(InspectorLoader::new(canvas_id)),
        }
    }
}

impl Default for SceneLoaders {
    fn default() -> Self {
        Self::for_canvas(DEFAULT_CANVAS_ID)
    }
}

/// Build the scene, awaiting the physics backend. The debug overlay is not
/// part of it: the host loads that once the render loop runs.
///
/// Every step re-checks `liveness` first: once the owning mount is gone the
/// build stops with [`SceneError::Cancelled`] and the scene it had so far is
/// dropped without being handed to anybody.
pub async fn create_scene(
    liveness: Liveness,
    loaders: SceneLoaders,
) -> Result<Scene, SceneError> {
    liveness.ensure("scene")?;
    let mut scene = Scene::new();

    liveness.ensure("camera")?;
    let mut camera = Camera::new("camera1", (0.0, 5.0, -10.0), Deg(90.0), Deg(0.0));
    camera.set_target((0.0, 0.0, 0.0));
    camera.attach_control(CameraController::new(4.0, 0.4));
    scene.add_camera(camera);

    liveness.ensure("light")?;
    scene.add_light(HemisphericLight::new("light", (0.0, 1.0, 0.0)).with_intensity(0.7));

    liveness.ensure("meshes")?;
    let mut sphere = MeshBuilder::create_sphere(
        "sphere",
        SphereOptions {
            diameter: 2.0,
            segments: 32,
        },
    );
    sphere.transform.position.y = 4.0;
    let sphere = scene.add_mesh(sphere);
    let ground = scene.add_mesh(MeshBuilder::create_ground(
        "ground",
        GroundOptions {
            width: 10.0,
            height: 10.0,
            ..Default::default()
        },
    ));

    let plugin = loaders
        .physics
        .load()
        .await
        .map_err(SceneError::PhysicsLoad)?;
    // the mount may have gone away while the backend was loading
    liveness.ensure("physics")?;
    scene.enable_physics(GRAVITY, plugin);

    liveness.ensure("aggregates")?;
    scene.add_aggregate(
        sphere,
        PhysicsShapeType::Sphere,
        AggregateOptions {
            mass: 1.0,
            restitution: 0.75,
            ..Default::default()
        },
    )?;
    scene.add_aggregate(
        ground,
        PhysicsShapeType::Box,
        AggregateOptions {
            mass: 0.0,
            ..Default::default()
        },
    )?;

    liveness.ensure("scene ready")?;
    Ok(scene)
}
