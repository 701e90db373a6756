//! Integration tests for layout persistence and the engine tick pipeline.
//!
//! Exercises: shipped layouts → load (editable / simulated) → engine spawn
//! → tick → destruction split → save again.

use std::sync::Arc;

use glam::{IVec2, Vec2};
use hullforge_core::catalog::PartCatalog;
use hullforge_core::components::{ActionSet, ControlAction, ControlInputs, ControllerId, PartId};
use hullforge_core::editor::Blueprint;
use hullforge_core::components::Rect;
use hullforge_core::engine::SimulationEngine;
use hullforge_core::error::PreconditionError;
use hullforge_core::persistence::{
    layout_from_json, layout_to_json, load_layout, load_layout_binary, save_layout, LoadMode,
    LoadedLayout, SaveError, ShipLayout, LAYOUT_VERSION,
};

const PARTS_JSON: &str = include_str!("../../../data/parts.json");
const DUMBBELL_JSON: &str = include_str!("../../../data/layouts/dumbbell.json");
const PROBE_JSON: &str = include_str!("../../../data/layouts/probe.json");

// ── Helpers ────────────────────────────────────────────────────────────

fn catalog() -> Arc<PartCatalog> {
    Arc::new(PartCatalog::from_json(PARTS_JSON).unwrap())
}

fn dumbbell() -> ShipLayout {
    layout_from_json(DUMBBELL_JSON).unwrap()
}

// ── Format ─────────────────────────────────────────────────────────────

#[test]
fn shipped_layouts_parse() {
    for json in [DUMBBELL_JSON, PROBE_JSON] {
        let layout = layout_from_json(json).unwrap();
        assert_eq!(layout.version, LAYOUT_VERSION);
        assert_eq!(layout.components.len(), 1);
        for component in &layout.components {
            for part in &component.parts {
                assert!(layout.bounds.contains(part.start));
            }
        }
    }
}

#[test]
fn layout_round_trips_through_both_formats() {
    let layout = dumbbell();

    let json = layout_to_json(&layout).unwrap();
    assert_eq!(layout_from_json(&json).unwrap(), layout);

    let mut buffer = Vec::new();
    save_layout(&mut buffer, &layout).unwrap();
    assert!(buffer.len() < json.len());
    assert_eq!(load_layout_binary(buffer.as_slice()).unwrap(), layout);
}

#[test]
fn future_versions_are_rejected() {
    let json = DUMBBELL_JSON.replacen("\"version\": 1", "\"version\": 99", 1);
    match layout_from_json(&json) {
        Err(SaveError::VersionMismatch { expected, found }) => {
            assert_eq!(expected, LAYOUT_VERSION);
            assert_eq!(found, 99);
        }
        other => panic!("expected version mismatch, got {:?}", other),
    }
}

#[test]
fn truncated_binary_fails_cleanly() {
    let mut buffer = Vec::new();
    save_layout(&mut buffer, &dumbbell()).unwrap();
    buffer.truncate(buffer.len() / 2);
    assert!(matches!(
        load_layout_binary(buffer.as_slice()),
        Err(SaveError::Bincode(_))
    ));
}

#[test]
fn mismatched_extent_is_rejected() {
    let catalog = catalog();
    let mut layout = dumbbell();
    layout.components[0].parts[0].end += IVec2::new(1, 0);
    assert!(matches!(
        load_layout(&layout, LoadMode::Simulated, &catalog, 0),
        Err(SaveError::Precondition(_))
    ));
}

#[test]
fn oversized_component_bounds_are_rejected() {
    let catalog = catalog();
    let mut layout = dumbbell();
    layout.components[0].bounds = Rect::new(IVec2::ZERO, IVec2::splat(i32::MAX));
    assert!(matches!(
        load_layout(&layout, LoadMode::Simulated, &catalog, 0),
        Err(SaveError::BoundsMismatch { .. })
    ));

    // Parts spread across an enormous box hit the field limit instead.
    let mut layout = dumbbell();
    let far = IVec2::new(1 << 20, 1 << 20);
    let component = &mut layout.components[0];
    let last = component.parts.last_mut().unwrap();
    last.start += far;
    last.end += far;
    component.bounds.end = last.end.max(component.bounds.end);
    assert!(matches!(
        load_layout(&layout, LoadMode::Simulated, &catalog, 0),
        Err(SaveError::Precondition(PreconditionError::FieldTooLarge { .. }))
    ));
}

// ── Load modes ─────────────────────────────────────────────────────────

#[test]
fn editable_load_rebuilds_the_same_layout() {
    let catalog = catalog();
    let layout = dumbbell();
    let mut blueprint = Blueprint::new("scratch", 16, 16).unwrap();
    assert_eq!(blueprint.load(&layout, IVec2::ZERO, &catalog).unwrap(), 12);

    let relaunched = blueprint.launch();
    assert_eq!(relaunched.components.len(), 1);
    assert_eq!(relaunched.bounds, layout.bounds);
    let cells = |layout: &ShipLayout| {
        let mut cells: Vec<(i32, i32, String)> = layout.components[0]
            .parts
            .iter()
            .map(|p| (p.start.x, p.start.y, p.config.clone()))
            .collect();
        cells.sort();
        cells
    };
    let (before, after) = (cells(&layout), cells(&relaunched));
    assert_eq!(before, after);
    let com = relaunched.components[0].center_of_mass;
    assert!((com.position - layout.components[0].center_of_mass.position).length() < 1e-3);
}

#[test]
fn simulated_load_builds_one_vessel_per_component() {
    let catalog = catalog();
    let LoadedLayout::Simulated(vessels) =
        load_layout(&dumbbell(), LoadMode::Simulated, &catalog, 100).unwrap()
    else {
        panic!("expected simulated layout");
    };
    assert_eq!(vessels.len(), 1);
    let vessel = &vessels[0].vessel;
    assert_eq!(vessel.len(), 12);
    assert!(vessel.parts().all(|p| p.is_placed() && p.id.0 >= 100));
    assert_eq!(vessel.assembly().field().size(), IVec2::new(7, 6));
    assert!((vessel.center_of_mass().mass - 17.5).abs() < 1e-4);
}

// ── Engine pipeline ────────────────────────────────────────────────────

#[test]
fn dumbbell_flies_and_breaks_apart() {
    let mut engine = SimulationEngine::new(catalog());
    let ship = engine.spawn_layout(&dumbbell(), Vec2::new(50.0, 50.0)).unwrap()[0];
    assert!(engine.bind_controller(ship, PartId(3), ControllerId(1)).unwrap());

    let inputs = ControlInputs::new().with(ControllerId(1), ActionSet::from_iter([ControlAction::MoveForward]));
    for _ in 0..30 {
        assert!(engine.update(1.0 / 30.0, &inputs).is_empty());
    }
    let body = engine.body(ship).unwrap();
    assert!(body.velocity.y > 0.0);
    assert!(body.position.y > 50.0);

    // The middle beam of the bridge.
    engine.request_destroy(ship, PartId(5)).unwrap();
    let events = engine.update(1.0 / 30.0, &inputs);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].destroyed, vec![PartId(5)]);
    assert_eq!(events[0].fragments.len(), 2);

    let mut sizes: Vec<usize> = events[0]
        .fragments
        .iter()
        .map(|e| engine.with_vessel(*e, |v| v.len()).unwrap())
        .collect();
    sizes.sort();
    assert_eq!(sizes, vec![5, 6]);
    let pieces: Vec<_> = events[0]
        .fragments
        .iter()
        .map(|e| engine.body(*e).unwrap())
        .collect();
    assert_eq!(pieces[0].velocity, pieces[1].velocity);
    assert_eq!(pieces[0].position, pieces[1].position);
    assert!(pieces[0].velocity.y > 0.0);

    // Only the half with the cockpit still answers to the controller.
    let steered: Vec<bool> = events[0]
        .fragments
        .iter()
        .map(|e| engine.with_vessel(*e, |v| v.is_under_control()).unwrap())
        .collect();
    assert_eq!(steered.iter().filter(|s| **s).count(), 1);

    let saved = engine.save_vessel(events[0].fragments[0], "debris").unwrap();
    assert_eq!(saved.description, "debris");
    assert_eq!(saved.components.len(), 1);
}
