//! End-of-tick destruction batches and vessel splitting.

use hecs::{Entity, World};

use crate::catalog::PartCatalog;
use crate::components::PartId;
use crate::systems::physics::RigidBody;
use crate::vessel::Vessel;

/// Result of one vessel's destruction batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DestructionEvent {
    pub vessel: Entity,
    pub destroyed: Vec<PartId>,
    /// Entities spawned for the pieces; empty if the vessel stayed whole.
    pub fragments: Vec<Entity>,
    /// The original entity was despawned (split or emptied).
    pub dissolved: bool,
}

/// Process every vessel's pending destruction queue.
///
/// Split pieces are spawned as new entities inheriting the pose, velocity
/// and angular velocity of the original; dissolved vessels are despawned.
pub fn destruction_system(world: &mut World, catalog: &PartCatalog) -> Vec<DestructionEvent> {
    let mut batches = Vec::new();
    for (entity, (vessel, body)) in world.query_mut::<(&mut Vessel, &RigidBody)>() {
        let outcome = vessel.process_destruction(catalog);
        if outcome.destroyed.is_empty() && !outcome.is_split() && vessel.is_active() {
            continue;
        }
        batches.push((entity, body.inherit(), outcome, !vessel.is_active()));
    }

    let mut events = Vec::with_capacity(batches.len());
    for (entity, body, outcome, dissolved) in batches {
        let mut fragments = Vec::with_capacity(outcome.fragments.len());
        for mut fragment in outcome.fragments {
            let child = world.reserve_entity();
            fragment.bind_entity(child);
            if world.insert(child, (fragment, body)).is_ok() {
                fragments.push(child);
            }
        }
        if dissolved {
            let _ = world.despawn(entity);
        }
        if !fragments.is_empty() {
            log::info!("Vessel {:?} split into {:?}", entity, fragments);
        }
        events.push(DestructionEvent {
            vessel: entity,
            destroyed: outcome.destroyed,
            fragments,
            dissolved,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Assembly;
    use crate::components::{Orientation, Part};
    use glam::{IVec2, Vec2};

    const CATALOG: &str = r#"{
        "parts": [
            { "id": "beam", "name": "Beam", "size": [1, 1], "category": "Structure",
              "max_health": 3, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 } }
        ]
    }"#;

    fn row(catalog: &PartCatalog, n: u32) -> Vessel {
        let mut assembly = Assembly::with_size(n as i32, 1).unwrap();
        for i in 0..n {
            let mut part = Part::new(PartId(i), catalog.part("beam").unwrap()).unwrap();
            part.orient(Orientation::UP).unwrap();
            assembly.try_insert_at(part, IVec2::new(i as i32, 0)).unwrap();
        }
        Vessel::new("row", assembly, catalog)
    }

    #[test]
    fn test_split_spawns_fragments_with_inherited_motion() {
        let catalog = PartCatalog::from_json(CATALOG).unwrap();
        let mut world = World::new();
        let mut body = RigidBody::at(Vec2::new(10.0, 0.0));
        body.velocity = Vec2::new(1.0, 2.0);
        body.angular_velocity = 0.25;
        let original = world.spawn((row(&catalog, 3), body));

        world
            .get::<&mut Vessel>(original)
            .unwrap()
            .request_destroy(PartId(1))
            .unwrap();
        let events = destruction_system(&mut world, &catalog);

        assert_eq!(events.len(), 1);
        assert!(events[0].dissolved);
        assert_eq!(events[0].fragments.len(), 2);
        assert!(!world.contains(original));
        for &fragment in &events[0].fragments {
            let body = world.get::<&RigidBody>(fragment).unwrap();
            assert_eq!(body.velocity, Vec2::new(1.0, 2.0));
            assert_eq!(body.angular_velocity, 0.25);
            let vessel = world.get::<&Vessel>(fragment).unwrap();
            assert_eq!(vessel.len(), 1);
            assert!(vessel.parts().all(|p| p.vessel == Some(fragment)));
        }
    }

    #[test]
    fn test_quiet_vessels_produce_no_events() {
        let catalog = PartCatalog::from_json(CATALOG).unwrap();
        let mut world = World::new();
        world.spawn((row(&catalog, 2), RigidBody::default()));
        assert!(destruction_system(&mut world, &catalog).is_empty());
    }
}
