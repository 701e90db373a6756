//! Thrust aggregation and per-tick resource flow.

use glam::{IVec2, Vec2};
use hecs::World;

use crate::assembly::Assembly;
use crate::components::{
    ActionSet, ControlAction, ControlInputs, Direction, Engine, Part, PartExtension, Rect,
};
use crate::systems::physics::RigidBody;
use crate::systems::resource_pool::ResourceNetwork;
use crate::vessel::Vessel;

/// Net force and torque of one vessel for one tick, in vessel space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thrust {
    pub force: Vec2,
    /// Counter-clockwise positive.
    pub torque: f32,
}

impl Thrust {
    pub const ZERO: Self = Self {
        force: Vec2::ZERO,
        torque: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.force == Vec2::ZERO && self.torque == 0.0
    }
}

/// Torque of `force` applied at `point` about `center`.
pub fn torque_about(center: Vec2, point: Vec2, force: Vec2) -> f32 {
    (point - center).perp_dot(force)
}

/// Cells directly behind an engine, opposite its thrust.
pub fn exhaust_strip(rect: Rect, thrust: Direction, length: i32) -> Rect {
    let (s, e) = (rect.start, rect.end);
    match thrust.opposite() {
        Direction::Down => Rect::new(IVec2::new(s.x, s.y - length), IVec2::new(e.x, s.y)),
        Direction::Up => Rect::new(IVec2::new(s.x, e.y), IVec2::new(e.x, e.y + length)),
        Direction::Left => Rect::new(IVec2::new(s.x - length, s.y), IVec2::new(s.x, e.y)),
        Direction::Right => Rect::new(IVec2::new(e.x, s.y), IVec2::new(e.x + length, e.y)),
    }
}

/// Whether another part of the same assembly sits in the engine's exhaust.
pub fn exhaust_blocked(assembly: &Assembly, part: &Part, engine: &Engine) -> bool {
    let Some(orientation) = part.orientation() else {
        return false;
    };
    let strip = exhaust_strip(part.rect(), engine.direction(orientation), engine.exhaust_length());
    let blocked = strip
        .cells()
        .filter_map(|cell| assembly.field().get(cell))
        .any(|id| id != part.id);
    blocked
}

/// Sum the contribution of every enabled engine and gyro responding to
/// `actions`, drawing fuel for each one that fires.
pub fn compute_thrust(
    assembly: &Assembly,
    network: &mut ResourceNetwork,
    center: Vec2,
    actions: ActionSet,
    dt: f32,
) -> Thrust {
    let mut thrust = Thrust::ZERO;
    if actions.is_empty() {
        return thrust;
    }
    let rotation = actions.rotation();

    for part in assembly.parts() {
        if !part.enabled || !part.is_placed() {
            continue;
        }
        let Some(orientation) = part.orientation() else {
            continue;
        };
        for ext in &part.extensions {
            match ext {
                PartExtension::Engine(engine) => {
                    let direction = engine.direction(orientation);
                    if !actions.contains(ControlAction::for_direction(direction)) {
                        continue;
                    }
                    if exhaust_blocked(assembly, part, engine) {
                        continue;
                    }
                    if !network.try_consume(part, &engine.consumption, dt) {
                        continue;
                    }
                    let force = engine.force(orientation);
                    let point = part.map_point(engine.thrust_point);
                    thrust.force += force;
                    thrust.torque += torque_about(center, point, force);
                }
                PartExtension::Gyro(gyro) => {
                    let Some(clockwise) = rotation else {
                        continue;
                    };
                    if !network.try_consume(part, &gyro.consumption, dt) {
                        continue;
                    }
                    thrust.torque += gyro.torque(clockwise);
                }
                _ => {}
            }
        }
    }
    thrust
}

/// Step every enabled generator once. Returns how many ran.
pub fn run_generators(assembly: &Assembly, network: &mut ResourceNetwork, dt: f32) -> usize {
    let mut ran = 0;
    for part in assembly.parts().filter(|p| p.enabled && p.is_placed()) {
        for ext in &part.extensions {
            if let PartExtension::Generator(generator) = ext {
                if network.try_convert(part, &generator.consumption, &generator.output, dt) {
                    ran += 1;
                }
            }
        }
    }
    ran
}

/// Resource flow and thrust for every vessel; thrust lands on the body as
/// a pending relative force.
pub fn propulsion_system(world: &mut World, inputs: &ControlInputs, dt: f32) {
    for (_, (vessel, body)) in world.query_mut::<(&mut Vessel, &mut RigidBody)>() {
        if !vessel.is_active() {
            continue;
        }
        let actions = inputs.combined(vessel.controllers());
        let thrust = vessel.tick(actions, dt);
        if !thrust.is_zero() {
            body.add_relative_force(thrust.force);
            body.add_torque(thrust.torque);
        }
    }
}
