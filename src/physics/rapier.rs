//! `rapier3d` backend for [`PhysicsPlugin`].

use cgmath::{Quaternion, Vector3};
use rapier3d::{
    math::{Real, Vector},
    na::{self, UnitQuaternion},
    prelude::{
        CCDSolver, CoefficientCombineRule, ColliderBuilder, ColliderSet, DefaultBroadPhase,
        ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase,
        PhysicsPipeline, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, vector,
    },
};

use super::{BodyDesc, BodyHandle, LoadFuture, PhysicsLoader, PhysicsPlugin, Shape};

/// World step used when the plugin ignores the frame delta.
pub const FIXED_STEP: f32 = 1.0 / 60.0;
/// Upper bound for a delta-driven step. Long frames (tab switches) are cut to it.
pub const MAX_STEP: f32 = 1.0 / 30.0;

pub struct RapierPlugin {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    bodies: Vec<RigidBodyHandle>,
    use_delta_for_world_step: bool,
}

impl RapierPlugin {
    /// With `use_delta_for_world_step` the world advances by the frame delta,
    /// otherwise by [`FIXED_STEP`] per frame.
    pub fn new(use_delta_for_world_step: bool) -> Self {
        Self {
            gravity: vector![0.0, -9.81, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: Vec::new(),
            use_delta_for_world_step,
        }
    }
}

impl PhysicsPlugin for RapierPlugin {
    fn name(&self) -> &str {
        "rapier3d"
    }

    fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = vector![gravity.x, gravity.y, gravity.z];
    }

    fn gravity(&self) -> Vector3<f32> {
        Vector3::new(self.gravity.x, self.gravity.y, self.gravity.z)
    }

    fn add_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(
            desc.rotation.s,
            desc.rotation.v.x,
            desc.rotation.v.y,
            desc.rotation.v.z,
        ));
        let builder = if desc.options.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let body = builder
            .translation(vector![desc.position.x, desc.position.y, desc.position.z])
            .rotation(rotation.scaled_axis())
            .build();

        let collider = match desc.shape {
            Shape::Ball { radius } => ColliderBuilder::ball(radius),
            Shape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
        .restitution(desc.options.restitution)
        // a bouncing body keeps its own restitution against a dead surface
        .restitution_combine_rule(CoefficientCombineRule::Max)
        .friction(desc.options.friction);
        let collider = if desc.options.is_static() {
            collider
        } else {
            collider.mass(desc.options.mass)
        };

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);
        self.bodies.push(handle);
        BodyHandle(self.bodies.len() - 1)
    }

    fn step(&mut self, dt: f32) {
        let dt = if self.use_delta_for_world_step {
            dt.min(MAX_STEP)
        } else {
            FIXED_STEP
        };
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    fn body_transform(&self, handle: BodyHandle) -> Option<(Vector3<f32>, Quaternion<f32>)> {
        let body = self.rigid_body_set.get(*self.bodies.get(handle.0)?)?;
        let t = body.translation();
        let q = body.rotation().coords;
        Some((Vector3::new(t.x, t.y, t.z), Quaternion::new(q.w, q.x, q.y, q.z)))
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Hands out a [`RapierPlugin`]. The backend is linked into the crate, so the
/// load resolves on first poll.
#[derive(Clone, Debug)]
pub struct RapierLoader {
    pub use_delta_for_world_step: bool,
}

impl Default for RapierLoader {
    fn default() -> Self {
        Self {
            use_delta_for_world_step: true,
        }
    }
}

impl PhysicsLoader for RapierLoader {
    fn load(&self) -> LoadFuture<Box<dyn PhysicsPlugin>> {
        let use_delta_for_world_step = self.use_delta_for_world_step;
        Box::pin(async move {
            log::info!("physics backend ready: rapier3d");
            let plugin: Box<dyn PhysicsPlugin> = Box::new(RapierPlugin::new(use_delta_for_world_step));
            Ok(plugin)
        })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::One;

    use super::*;
    use crate::physics::AggregateOptions;

    fn ball(y: f32, options: AggregateOptions) -> BodyDesc {
        BodyDesc {
            shape: Shape::Ball { radius: 1.0 },
            options,
            position: Vector3::new(0.0, y, 0.0),
            rotation: Quaternion::one(),
        }
    }

    fn ground() -> BodyDesc {
        BodyDesc {
            shape: Shape::Cuboid {
                half_extents: Vector3::new(5.0, 0.01, 5.0),
            },
            options: AggregateOptions::default(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
        }
    }

    #[test]
    fn dropped_ball_lands_and_bounces() {
        let mut plugin = RapierPlugin::new(true);
        plugin.set_gravity(Vector3::new(0.0, -9.8, 0.0));
        let sphere = plugin.add_body(&ball(
            4.0,
            AggregateOptions {
                mass: 1.0,
                restitution: 0.75,
                ..Default::default()
            },
        ));
        let floor = plugin.add_body(&ground());
        assert_eq!(plugin.body_count(), 2);

        let mut lowest = f32::MAX;
        let mut rebound = f32::MIN;
        for _ in 0..180 {
            plugin.step(1.0 / 60.0);
            let y = plugin.body_transform(sphere).unwrap().0.y;
            if y < lowest {
                lowest = y;
                rebound = y;
            }
            rebound = rebound.max(y);
        }

        assert!(lowest < 1.3, "ball never reached the ground, lowest {}", lowest);
        assert!(lowest > 0.7, "ball sank through the ground, lowest {}", lowest);
        assert!(rebound > lowest + 0.5, "ball did not bounce");
        let (floor_position, _) = plugin.body_transform(floor).unwrap();
        assert_eq!(floor_position, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn fixed_step_ignores_the_frame_delta() {
        let mut fixed = RapierPlugin::new(false);
        let mut delta = RapierPlugin::new(true);
        let a = fixed.add_body(&ball(10.0, AggregateOptions { mass: 1.0, ..Default::default() }));
        let b = delta.add_body(&ball(10.0, AggregateOptions { mass: 1.0, ..Default::default() }));

        fixed.step(0.0);
        delta.step(0.0);

        assert!(fixed.body_transform(a).unwrap().0.y < 10.0);
        assert_eq!(delta.body_transform(b).unwrap().0.y, 10.0);
    }

    #[test]
    fn massless_bodies_do_not_fall() {
        let mut plugin = RapierPlugin::new(true);
        let handle = plugin.add_body(&ball(3.0, AggregateOptions::default()));
        for _ in 0..30 {
            plugin.step(1.0 / 60.0);
        }
        assert_eq!(plugin.body_transform(handle).unwrap().0.y, 3.0);
    }

    #[test]
    fn unknown_handles_have_no_transform() {
        let plugin = RapierPlugin::new(true);
        assert!(plugin.body_transform(BodyHandle(3)).is_none());
    }
}
