//! Integration tests for the structural core.
//!
//! Exercises: Part orientation → OccupancyField placement → adjacency
//! → component split → vessel destruction batches.

use std::collections::BTreeSet;

use glam::{IVec2, Vec2};
use hullforge_core::assembly::Assembly;
use hullforge_core::catalog::PartCatalog;
use hullforge_core::components::{Orientation, Part, PartId};
use hullforge_core::graph;
use hullforge_core::vessel::Vessel;
use proptest::prelude::*;

const CATALOG: &str = r#"{
    "parts": [
        { "id": "beam", "name": "Beam", "size": [1, 1], "category": "Structure",
          "max_health": 3, "center_of_mass": { "position": [0.5, 0.5], "mass": 1.0 } },
        { "id": "plank", "name": "Plank", "size": [2, 1], "category": "Structure",
          "max_health": 3, "center_of_mass": { "position": [1.0, 0.5], "mass": 1.0 } },
        { "id": "block", "name": "Block", "size": [2, 3], "category": "Structure",
          "max_health": 9, "center_of_mass": { "position": [1.0, 1.5], "mass": 6.0 } }
    ]
}"#;

// ── Helpers ────────────────────────────────────────────────────────────

fn catalog() -> PartCatalog {
    PartCatalog::from_json(CATALOG).unwrap()
}

fn oriented(catalog: &PartCatalog, id: u32, key: &str, orientation: Orientation) -> Part {
    let mut part = Part::new(PartId(id), catalog.part(key).unwrap()).unwrap();
    part.orient(orientation).unwrap();
    part
}

/// Two 2×2 pods of beams joined by a single bridge beam at (2, 0).
fn dumbbell(catalog: &PartCatalog) -> (Assembly, PartId) {
    let mut asm = Assembly::with_size(5, 2).unwrap();
    let cells = [(0, 0), (1, 0), (0, 1), (1, 1), (2, 0), (3, 0), (4, 0), (3, 1), (4, 1)];
    for (i, (x, y)) in cells.into_iter().enumerate() {
        let part = oriented(catalog, i as u32, "beam", Orientation::UP);
        asm.try_insert_at(part, IVec2::new(x, y)).unwrap();
    }
    (asm, PartId(4))
}

// ── Orientation ────────────────────────────────────────────────────────

#[test]
fn orientation_rotation_and_flips_are_involutions() {
    for o in Orientation::ALL {
        let mut r = o;
        for _ in 0..4 {
            r = r.rotate_clockwise();
        }
        assert_eq!(r, o, "four rotations of {:?}", o);
        assert_eq!(o.flip_x().flip_x(), o);
        assert_eq!(o.flip_y().flip_y(), o);
    }
}

#[test]
fn orientation_extent_swaps_on_quarter_turns() {
    let base = IVec2::new(2, 3);
    for o in Orientation::ALL {
        let extent = o.effective_extent(base);
        let horizontal = o.direction.is_horizontal();
        assert_eq!(extent, if horizontal { IVec2::new(3, 2) } else { base });
    }
}

// ── Placement ──────────────────────────────────────────────────────────

#[test]
fn two_by_one_part_occupies_exactly_its_cells() {
    let catalog = catalog();
    let mut asm = Assembly::with_size(10, 10).unwrap();
    let part = oriented(&catalog, 0, "plank", Orientation::UP);
    asm.try_insert_at(part, IVec2::ZERO).unwrap();

    let field = asm.field();
    for y in 0..10 {
        for x in 0..10 {
            let cell = IVec2::new(x, y);
            let expected = (cell == IVec2::new(0, 0) || cell == IVec2::new(1, 0)).then_some(PartId(0));
            assert_eq!(field.get(cell), expected, "cell {}", cell);
        }
    }
    assert_eq!(field.check_employment(IVec2::ZERO, IVec2::new(2, 1)), Ok(false));
    assert_eq!(field.check_employment(IVec2::new(2, 0), IVec2::new(4, 1)), Ok(true));
}

#[test]
fn rotated_block_places_by_center() {
    let catalog = catalog();
    let mut asm = Assembly::with_size(6, 6).unwrap();
    let part = oriented(&catalog, 0, "block", Orientation::RIGHT);
    asm.insert(part).unwrap();
    // Right turns 2×3 into 3×2; centered at (3, 3) the corner lands on (2, 2)
    // after rounding 1.5 → 2.
    assert_eq!(asm.try_place(PartId(0), Vec2::new(3.0, 3.0)), Ok(true));
    let rect = asm.part(PartId(0)).unwrap().rect();
    assert_eq!(rect.size(), IVec2::new(3, 2));
    assert_eq!(rect.area(), 6);
    assert_eq!(asm.field().occupied_cells().count(), 6);
}

#[test]
fn neighbors_are_symmetric() {
    let catalog = catalog();
    let (asm, _) = dumbbell(&catalog);
    for part in asm.parts() {
        for n in part.neighbors() {
            assert!(asm.part(*n).unwrap().neighbors().contains(&part.id));
        }
    }
    assert_eq!(
        asm.part(PartId(4)).unwrap().neighbors(),
        &BTreeSet::from([PartId(1), PartId(5)])
    );
}

// ── Splitting ──────────────────────────────────────────────────────────

#[test]
fn dumbbell_bridge_removal_yields_two_vessels() {
    let catalog = catalog();
    let (asm, bridge) = dumbbell(&catalog);
    let mut vessel = Vessel::new("dumbbell", asm, &catalog);
    assert!(graph::is_connected(vessel.assembly(), &vessel.assembly().placed_ids()));

    vessel.request_destroy(bridge).unwrap();
    let outcome = vessel.process_destruction(&catalog);

    assert_eq!(outcome.destroyed, vec![bridge]);
    assert_eq!(outcome.fragments.len(), 2);
    let mut members: Vec<PartId> = outcome
        .fragments
        .iter()
        .flat_map(|v| v.parts().map(|p| p.id).collect::<Vec<_>>())
        .collect();
    members.sort();
    let expected: Vec<PartId> = (0..9).filter(|i| *i != 4).map(PartId).collect();
    assert_eq!(members, expected);
    for fragment in &outcome.fragments {
        assert_eq!(fragment.len(), 4);
        assert!(fragment.is_active());
    }
    assert!(!vessel.is_active());

    // Each half carries its own center of mass, in the shared field frame.
    let mut centers: Vec<(f32, f32, f32)> = outcome
        .fragments
        .iter()
        .map(|v| {
            let com = v.center_of_mass();
            (com.position.x, com.position.y, com.mass)
        })
        .collect();
    centers.sort_by(|a, b| a.0.total_cmp(&b.0));
    for ((x, y, mass), expected) in centers.into_iter().zip([Vec2::new(1.0, 1.0), Vec2::new(4.0, 1.0)]) {
        assert!((Vec2::new(x, y) - expected).length() < 1e-5, "center ({}, {})", x, y);
        assert!((mass - 4.0).abs() < 1e-5);
    }
    for fragment in &outcome.fragments {
        let recomputed = fragment.assembly().center_of_mass();
        assert!((fragment.center_of_mass().position - recomputed.position).length() < 1e-5);
    }
}

#[test]
fn leaf_removal_keeps_one_vessel() {
    let catalog = catalog();
    let (asm, _) = dumbbell(&catalog);
    let mut vessel = Vessel::new("dumbbell", asm, &catalog);
    vessel.request_destroy(PartId(8)).unwrap();
    let outcome = vessel.process_destruction(&catalog);
    assert!(!outcome.is_split());
    assert!(vessel.is_active());
    assert_eq!(vessel.len(), 8);
}

#[test]
fn destroying_everything_dissolves() {
    let catalog = catalog();
    let (asm, _) = dumbbell(&catalog);
    let mut vessel = Vessel::new("dumbbell", asm, &catalog);
    for i in 0..9 {
        vessel.request_destroy(PartId(i)).unwrap();
    }
    let outcome = vessel.process_destruction(&catalog);
    assert_eq!(outcome.destroyed.len(), 9);
    assert!(outcome.fragments.is_empty());
    assert!(!vessel.is_active());
}

// ── Properties ─────────────────────────────────────────────────────────

fn arb_rects() -> impl Strategy<Value = Vec<(i32, i32, i32, i32)>> {
    prop::collection::vec((0i32..16, 0i32..16, 1i32..4, 1i32..4), 0..40)
}

proptest! {
    #[test]
    fn released_parts_leave_an_empty_field(rects in arb_rects()) {
        let mut asm = Assembly::with_size(16, 16).unwrap();
        let catalog = catalog();
        let config = catalog.part("beam").unwrap().clone();
        for (i, (x, y, w, h)) in rects.into_iter().enumerate() {
            let mut config = config.clone();
            config.size = IVec2::new(w, h);
            config.center_of_mass.position = config.size.as_vec2() / 2.0;
            let mut part = Part::new(PartId(i as u32), &config).unwrap();
            part.orient(Orientation::UP).unwrap();
            let _ = asm.try_insert_at(part, IVec2::new(x, y));
        }

        // Every occupied cell belongs to the rect of the part named there.
        for (cell, id) in asm.field().occupied_cells() {
            prop_assert!(asm.part(id).unwrap().rect().contains(cell));
        }
        let covered: i32 = asm.parts().filter(|p| p.is_placed()).map(|p| p.rect().area()).sum();
        prop_assert_eq!(covered as usize, asm.field().occupied_cells().count());

        for id in asm.placed_ids() {
            asm.pick(id).unwrap();
        }
        prop_assert!(asm.field().is_empty());
    }

    #[test]
    fn split_is_a_partition(mask in prop::collection::vec(any::<bool>(), 64)) {
        let catalog = catalog();
        let mut asm = Assembly::with_size(8, 8).unwrap();
        for (i, filled) in mask.iter().enumerate() {
            if *filled {
                let part = oriented(&catalog, i as u32, "beam", Orientation::UP);
                asm.try_insert_at(part, IVec2::new(i as i32 % 8, i as i32 / 8)).unwrap();
            }
        }
        let members = asm.placed_ids();
        let components = graph::split(&asm, &members);

        let mut seen = BTreeSet::new();
        for component in &components {
            prop_assert!(!component.is_empty());
            prop_assert!(graph::is_connected(&asm, component));
            for id in component {
                prop_assert!(seen.insert(*id), "{} appears twice", id);
            }
        }
        prop_assert_eq!(seen, members.iter().copied().collect::<BTreeSet<_>>());

        // No edge crosses two components.
        for (a, component) in components.iter().enumerate() {
            for id in component {
                for n in asm.part(*id).unwrap().neighbors() {
                    prop_assert!(components[a].contains(n));
                }
            }
        }
    }
}
