//! Rigid-body hand-off.
//!
//! Vessels only produce a force and a torque per tick. Integration belongs
//! to a [`PhysicsBackend`]; the bundled [`DragIntegrator`] is enough to run
//! headless and reproduces linear and angular drag.

use glam::Vec2;
use hecs::World;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::vessel::Vessel;

/// Physics state of one vessel, in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub position: Vec2,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub velocity: Vec2,
    /// Radians per second, counter-clockwise.
    pub angular_velocity: f32,
    pub mass: f32,
    pub inertia: f32,
    /// Force in vessel space, applied on the next integration.
    pub pending_force: Vec2,
    pub pending_torque: f32,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            inertia: 1.0,
            pending_force: Vec2::ZERO,
            pending_torque: 0.0,
        }
    }
}

impl RigidBody {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Same pose and motion, nothing pending. Used for split fragments.
    pub fn inherit(&self) -> Self {
        Self {
            pending_force: Vec2::ZERO,
            pending_torque: 0.0,
            ..*self
        }
    }

    pub fn add_relative_force(&mut self, force: Vec2) {
        self.pending_force += force;
    }

    pub fn add_torque(&mut self, torque: f32) {
        self.pending_torque += torque;
    }

    /// Pending force rotated into world space.
    pub fn world_force(&self) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(self.pending_force)
    }

    pub fn clear_pending(&mut self) {
        self.pending_force = Vec2::ZERO;
        self.pending_torque = 0.0;
    }
}

/// External rigid-body integrator.
pub trait PhysicsBackend {
    /// Advance `body` by `dt` seconds and consume its pending force.
    fn integrate(&mut self, body: &mut RigidBody, dt: f32);
}

/// Semi-implicit Euler with per-second drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragIntegrator {
    pub linear_drag: f32,
    pub angular_drag: f32,
}

impl DragIntegrator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            linear_drag: config.linear_drag,
            angular_drag: config.angular_drag,
        }
    }
}

impl Default for DragIntegrator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl PhysicsBackend for DragIntegrator {
    fn integrate(&mut self, body: &mut RigidBody, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let mass = body.mass.max(f32::EPSILON);
        let inertia = body.inertia.max(f32::EPSILON);

        body.velocity += body.world_force() / mass * dt;
        body.velocity *= 1.0 / (1.0 + self.linear_drag * dt);
        body.angular_velocity += body.pending_torque / inertia * dt;
        body.angular_velocity *= 1.0 / (1.0 + self.angular_drag * dt);

        body.position += body.velocity * dt;
        body.rotation += body.angular_velocity * dt;
        body.clear_pending();
    }
}

/// Integrate every vessel body, refreshing mass properties first.
pub fn physics_system(world: &mut World, backend: &mut dyn PhysicsBackend, dt: f32) {
    for (_, (vessel, body)) in world.query_mut::<(&Vessel, &mut RigidBody)>() {
        if !vessel.is_active() {
            continue;
        }
        let center = vessel.center_of_mass();
        if center.mass > 0.0 {
            body.mass = center.mass;
            body.inertia = vessel.moment_of_inertia().max(f32::EPSILON);
        }
        backend.integrate(body, dt);
    }
}
