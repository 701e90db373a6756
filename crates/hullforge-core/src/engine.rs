//! Simulation engine - main entry point for running the simulation

use std::sync::Arc;

use glam::Vec2;
use hecs::{Entity, World};

use crate::catalog::PartCatalog;
use crate::components::{ControlInputs, ControllerId, PartId};
use crate::config::EngineConfig;
use crate::error::PreconditionError;
use crate::persistence::{self, LoadMode, LoadedLayout, SaveError, ShipLayout};
use crate::systems::*;
use crate::vessel::Vessel;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world holding one entity per vessel (`Vessel` + `RigidBody`)
    pub world: World,
    catalog: Arc<PartCatalog>,
    config: EngineConfig,
    physics: Box<dyn PhysicsBackend>,
    /// Simulated seconds since start
    sim_time: f64,
    tick_count: u64,
    time_scale: f32,
}

impl SimulationEngine {
    /// Create an empty simulation with default constants
    pub fn new(catalog: Arc<PartCatalog>) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    pub fn with_config(catalog: Arc<PartCatalog>, config: EngineConfig) -> Self {
        let physics = Box::new(DragIntegrator::from_config(&config));
        Self {
            world: World::new(),
            catalog,
            config,
            physics,
            sim_time: 0.0,
            tick_count: 0,
            time_scale: 1.0,
        }
    }

    /// Swap in another physics collaborator.
    pub fn set_physics(&mut self, backend: Box<dyn PhysicsBackend>) {
        self.physics = backend;
    }

    pub fn catalog(&self) -> &PartCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add a vessel to the world with the given body.
    pub fn spawn_vessel(&mut self, mut vessel: Vessel, body: RigidBody) -> Entity {
        let entity = self.world.reserve_entity();
        vessel.bind_entity(entity);
        log::info!("Spawned vessel {} ({} parts) as {:?}", vessel.name, vessel.len(), entity);
        // Reserved entities are always insertable.
        let _ = self.world.insert(entity, (vessel, body));
        entity
    }

    /// Load a layout as live vessels with the layout origin at `origin`.
    pub fn spawn_layout(&mut self, layout: &ShipLayout, origin: Vec2) -> Result<Vec<Entity>, SaveError> {
        let LoadedLayout::Simulated(loaded) =
            persistence::load_layout(layout, LoadMode::Simulated, &self.catalog, 0)?
        else {
            return Ok(Vec::new());
        };
        Ok(loaded
            .into_iter()
            .map(|piece| {
                let body = RigidBody::at(piece.body_position(origin));
                self.spawn_vessel(piece.vessel, body)
            })
            .collect())
    }

    /// Snapshot a vessel as a layout.
    pub fn save_vessel(&self, entity: Entity, description: &str) -> Result<ShipLayout, PreconditionError> {
        let vessel = self
            .world
            .get::<&Vessel>(entity)
            .map_err(|_| PreconditionError::UnknownVessel(entity))?;
        Ok(ShipLayout::from_vessel(&*vessel, description))
    }

    pub fn despawn_vessel(&mut self, entity: Entity) -> Option<Vessel> {
        let (vessel, _) = self.world.remove::<(Vessel, RigidBody)>(entity).ok()?;
        let _ = self.world.despawn(entity);
        Some(vessel)
    }

    /// Run `f` against one vessel.
    pub fn with_vessel<R>(&self, entity: Entity, f: impl FnOnce(&Vessel) -> R) -> Result<R, PreconditionError> {
        let vessel = self
            .world
            .get::<&Vessel>(entity)
            .map_err(|_| PreconditionError::UnknownVessel(entity))?;
        Ok(f(&*vessel))
    }

    pub fn with_vessel_mut<R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut Vessel) -> R,
    ) -> Result<R, PreconditionError> {
        let mut vessel = self
            .world
            .get::<&mut Vessel>(entity)
            .map_err(|_| PreconditionError::UnknownVessel(entity))?;
        Ok(f(&mut *vessel))
    }

    /// Current body of a vessel.
    pub fn body(&self, entity: Entity) -> Option<RigidBody> {
        self.world.get::<&RigidBody>(entity).ok().map(|body| *body)
    }

    pub fn vessels(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .world
            .query::<&Vessel>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        entities.sort();
        entities
    }

    pub fn vessel_count(&self) -> usize {
        self.world.query::<&Vessel>().iter().count()
    }

    pub fn bind_controller(
        &mut self,
        entity: Entity,
        part: PartId,
        controller: ControllerId,
    ) -> Result<bool, PreconditionError> {
        self.with_vessel_mut(entity, |vessel| vessel.bind_controller(part, controller))?
    }

    pub fn unbind_controller(&mut self, entity: Entity, part: PartId) -> Result<Option<ControllerId>, PreconditionError> {
        self.with_vessel_mut(entity, |vessel| vessel.unbind_controller(part))
    }

    /// Collision hook: damage a part from an impulse. Returns damage dealt.
    pub fn apply_impact(&mut self, entity: Entity, part: PartId, impulse: f32) -> Result<i32, PreconditionError> {
        let config = self.config.clone();
        self.with_vessel_mut(entity, |vessel| vessel.apply_impact(part, impulse, &config))?
    }

    pub fn damage_part(&mut self, entity: Entity, part: PartId, amount: i32) -> Result<i32, PreconditionError> {
        self.with_vessel_mut(entity, |vessel| vessel.damage_part(part, amount))?
    }

    pub fn request_destroy(&mut self, entity: Entity, part: PartId) -> Result<(), PreconditionError> {
        self.with_vessel_mut(entity, |vessel| vessel.request_destroy(part))?
    }

    /// Advance the simulation by `delta_seconds`.
    ///
    /// Order: resource flow and thrust, physics, then the deferred
    /// destruction batch. Returns what the batch destroyed and spawned.
    pub fn update(&mut self, delta_seconds: f32, inputs: &ControlInputs) -> Vec<DestructionEvent> {
        let dt = delta_seconds * self.time_scale;
        self.sim_time += dt as f64;
        self.tick_count += 1;

        propulsion_system(&mut self.world, inputs, dt);
        physics_system(&mut self.world, self.physics.as_mut(), dt);
        destruction_system(&mut self.world, &self.catalog)
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Simulated seconds since start
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ActionSet, ControlAction};
    use crate::editor::Blueprint;

    const CATALOG: &str = r#"{
        "items": [ { "id": "fuel", "name": "Fuel" } ],
        "parts": [
            { "id": "cockpit", "name": "Cockpit", "size": [1, 1], "category": "Control",
              "max_health": 10, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 },
              "extensions": [ { "type": "ControlBlock" } ] },
            { "id": "beam", "name": "Beam", "size": [1, 1], "category": "Structure",
              "max_health": 3, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 } },
            { "id": "tank", "name": "Tank", "size": [1, 1], "category": "Storages",
              "max_health": 3, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 },
              "extensions": [ { "type": "Storage", "stack": 100.0,
                                "start": { "resource": "fuel", "amount": 100.0 } } ] },
            { "id": "thruster", "name": "Thruster", "size": [1, 1], "category": "Engines",
              "max_health": 3, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 },
              "extensions": [ { "type": "Engine", "thrust": 4.0, "thrust_point": [0.5, 0.0],
                                "consumption": [ { "resource": "fuel", "per_second": 1.0 } ] } ] }
        ]
    }"#;

    /// thruster / tank / cockpit stacked in a column, plus a beam on a
    /// one-cell bridge to the right of the cockpit.
    fn layout(catalog: &PartCatalog) -> ShipLayout {
        let mut bp = Blueprint::new("Probe", 8, 8).unwrap();
        for (key, x, y) in [
            ("thruster", 1.5, 1.5),
            ("tank", 1.5, 2.5),
            ("cockpit", 1.5, 3.5),
            ("beam", 2.5, 3.5),
            ("beam", 3.5, 3.5),
        ] {
            bp.create_part(key, catalog).unwrap();
            bp.release_at(Vec2::new(x, y), catalog).unwrap();
        }
        bp.launch()
    }

    fn engine() -> (SimulationEngine, ShipLayout) {
        let catalog = Arc::new(PartCatalog::from_json(CATALOG).unwrap());
        let layout = layout(&catalog);
        (SimulationEngine::new(catalog), layout)
    }

    #[test]
    fn test_engine_creation() {
        let (engine, _) = engine();
        assert_eq!(engine.vessel_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
    }

    #[test]
    fn test_spawn_layout() {
        let (mut engine, layout) = engine();
        let spawned = engine.spawn_layout(&layout, Vec2::new(100.0, 0.0)).unwrap();
        assert_eq!(spawned.len(), 1);
        let body = engine.body(spawned[0]).unwrap();
        assert_eq!(body.position, Vec2::new(101.0, 1.0));
        assert_eq!(engine.with_vessel(spawned[0], |v| v.len()).unwrap(), 5);
    }

    #[test]
    fn test_controlled_thrust_moves_vessel() {
        let (mut engine, layout) = engine();
        let ship = engine.spawn_layout(&layout, Vec2::ZERO).unwrap()[0];
        let cockpit = engine
            .with_vessel(ship, |v| v.parts().find(|p| p.config == "cockpit").map(|p| p.id))
            .unwrap()
            .unwrap();
        assert!(engine.bind_controller(ship, cockpit, ControllerId(1)).unwrap());

        // Unbound controller input does nothing.
        let idle = ControlInputs::new().with(ControllerId(2), ActionSet::from_iter([ControlAction::MoveForward]));
        engine.update(0.1, &idle);
        assert_eq!(engine.body(ship).unwrap().velocity, Vec2::ZERO);

        let forward = ControlInputs::new().with(ControllerId(1), ActionSet::from_iter([ControlAction::MoveForward]));
        for _ in 0..10 {
            engine.update(0.1, &forward);
        }
        let body = engine.body(ship).unwrap();
        assert!(body.velocity.y > 0.0);
        assert!(body.position.y > 0.0);
        assert_eq!(engine.tick_count(), 11);
    }

    #[test]
    fn test_destroying_bridge_spawns_fragments() {
        let (mut engine, layout) = engine();
        let ship = engine.spawn_layout(&layout, Vec2::ZERO).unwrap()[0];
        let bridge = engine
            .with_vessel(ship, |v| {
                v.parts()
                    .filter(|p| p.config == "beam")
                    .min_by_key(|p| p.rect().start.x)
                    .map(|p| p.id)
            })
            .unwrap()
            .unwrap();
        engine.request_destroy(ship, bridge).unwrap();
        let events = engine.update(0.016, &ControlInputs::new());

        assert_eq!(events.len(), 1);
        assert!(events[0].dissolved);
        assert_eq!(events[0].fragments.len(), 2);
        assert_eq!(engine.vessel_count(), 2);
        assert!(matches!(
            engine.request_destroy(ship, bridge),
            Err(PreconditionError::UnknownVessel(_))
        ));
    }

    #[test]
    fn test_impact_damage() {
        let (mut engine, layout) = engine();
        let ship = engine.spawn_layout(&layout, Vec2::ZERO).unwrap()[0];
        let beam = engine
            .with_vessel(ship, |v| v.parts().find(|p| p.config == "beam").map(|p| p.id))
            .unwrap()
            .unwrap();
        // 10 * 0.4 = 4 damage, beam has 3 health
        assert_eq!(engine.apply_impact(ship, beam, 10.0).unwrap(), 4);
        assert!(engine.with_vessel(ship, |v| v.pending_destroy().any(|id| id == beam)).unwrap());
    }

    #[test]
    fn test_save_vessel_round_trip() {
        let (mut engine, layout) = engine();
        let ship = engine.spawn_layout(&layout, Vec2::ZERO).unwrap()[0];
        let saved = engine.save_vessel(ship, "").unwrap();
        assert_eq!(saved.part_count(), layout.part_count());
        assert_eq!(saved.components[0].parts.len(), 5);
    }

    #[test]
    fn test_time_scale() {
        let (mut engine, _) = engine();
        engine.set_time_scale(2.0);
        engine.update(1.0, &ControlInputs::new());
        assert!((engine.sim_time() - 2.0).abs() < 1e-9);
        engine.set_time_scale(-1.0);
        assert_eq!(engine.time_scale(), 0.0);
    }
}
