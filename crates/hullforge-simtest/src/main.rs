//! HullForge Headless Simulation Harness
//!
//! Validates the structural engine and its shipped data without rendering.
//! Runs entirely in-process: catalog, layouts, builder, flight and a
//! seeded random-damage sweep.
//!
//! Usage:
//!   cargo run -p hullforge-simtest
//!   cargo run -p hullforge-simtest -- --verbose
//!   cargo run -p hullforge-simtest -- --seed 7
//!   cargo run -p hullforge-simtest -- --json

use std::sync::Arc;

use env_logger::{Builder, Env};
use glam::{IVec2, Vec2};
use hullforge_core::catalog::{ExtensionConfig, PartCategory};
use hullforge_core::graph;
use hullforge_core::persistence::{
    layout_from_json, layout_to_json, load_layout, load_layout_binary, save_layout, LoadedLayout,
};
use hullforge_core::prelude::*;
use hullforge_core::systems::ResourceNetwork;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

// ── Shipped data (same JSON a game client loads) ────────────────────────
const PARTS_JSON: &str = include_str!("../../../data/parts.json");
const DUMBBELL_JSON: &str = include_str!("../../../data/layouts/dumbbell.json");
const PROBE_JSON: &str = include_str!("../../../data/layouts/probe.json");

const PILOT: ControllerId = ControllerId(1);
const DT: f32 = 1.0 / 30.0;

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

/// Machine-readable run summary for `--json`.
#[derive(Serialize)]
struct Report<'a> {
    seed: u64,
    passed: usize,
    failed: usize,
    results: &'a [TestResult],
}

struct Options {
    verbose: bool,
    json: bool,
    seed: u64,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let json = args.iter().any(|a| a == "--json");
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    Options {
        verbose,
        json,
        seed,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let env = Env::default().default_filter_or(level.to_string());
    let _ = Builder::from_env(env).try_init();
}

fn main() {
    let options = parse_args();
    init_logging(options.verbose);
    println!("=== HullForge Simulation Harness (seed {}) ===\n", options.seed);

    let catalog = match PartCatalog::from_json(PARTS_JSON) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            println!("  ✗ catalog_parse: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog validation
    results.extend(validate_catalog(&catalog, options.verbose));

    // 2. Layout formats
    results.extend(validate_layouts(&catalog, options.verbose));

    // 3. Builder workflow
    results.extend(validate_builder(&catalog, options.verbose));

    // 4. Flight and resource flow
    results.extend(validate_flight(&catalog, options.verbose));

    // 5. Random damage sweep
    results.extend(validate_damage_sweep(&catalog, options.seed, options.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || options.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if options.json {
        let report = Report {
            seed: options.seed,
            passed,
            failed,
            results: &results,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("  ✗ report: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &PartCatalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Part Catalog ---");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "catalog_not_empty".into(),
        passed: catalog.part_count() >= 8,
        detail: format!("{} part configs loaded", catalog.part_count()),
    });

    let categories = [
        PartCategory::Control,
        PartCategory::Storages,
        PartCategory::Engines,
        PartCategory::Structure,
    ];
    let empty: Vec<_> = categories
        .iter()
        .filter(|c| catalog.parts_in(**c).count() == 0)
        .collect();
    results.push(TestResult {
        name: "catalog_all_categories".into(),
        passed: empty.is_empty(),
        detail: if empty.is_empty() {
            "every palette category has parts".into()
        } else {
            format!("empty categories: {:?}", empty)
        },
    });

    // Every config builds a part in every orientation with a sane footprint.
    let mut bad = Vec::new();
    for config in catalog.parts() {
        for orientation in Orientation::ALL {
            let built = Part::new(PartId(0), config).and_then(|mut p| {
                p.orient(orientation)?;
                Ok(p)
            });
            match built {
                Ok(part) => {
                    let extent = part.extent().unwrap_or(IVec2::ZERO);
                    if extent.x * extent.y != config.size.x * config.size.y {
                        bad.push(format!("{} {:?}: extent {}", config.id, orientation, extent));
                    }
                }
                Err(e) => bad.push(format!("{}: {}", config.id, e)),
            }
        }
    }
    results.push(TestResult {
        name: "catalog_parts_build".into(),
        passed: bad.is_empty(),
        detail: if bad.is_empty() {
            "all configs build in all 8 orientations".into()
        } else {
            bad.join("; ")
        },
    });

    let has_cockpit = catalog
        .parts()
        .any(|p| p.has_extension(|e| matches!(e, ExtensionConfig::ControlBlock)));
    results.push(TestResult {
        name: "catalog_has_control_block".into(),
        passed: has_cockpit,
        detail: format!("control block present: {}", has_cockpit),
    });

    if verbose {
        println!("  Parts by category:");
        for category in categories {
            let names: Vec<_> = catalog.parts_in(category).map(|p| p.id.as_str()).collect();
            println!("    {:10} {}", format!("{:?}:", category), names.join(", "));
        }
    }

    results
}

// ── 2. Layouts ──────────────────────────────────────────────────────────

fn validate_layouts(catalog: &PartCatalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Layouts ---");
    let mut results = Vec::new();

    for (name, json) in [("dumbbell", DUMBBELL_JSON), ("probe", PROBE_JSON)] {
        let layout = match layout_from_json(json) {
            Ok(l) => l,
            Err(e) => {
                results.push(TestResult {
                    name: format!("layout_{}_parse", name),
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let mut binary = Vec::new();
        let binary_ok = save_layout(&mut binary, &layout).is_ok()
            && load_layout_binary(binary.as_slice()).ok().as_ref() == Some(&layout);
        let json_ok = layout_to_json(&layout)
            .and_then(|j| layout_from_json(&j))
            .ok()
            .as_ref()
            == Some(&layout);
        results.push(TestResult {
            name: format!("layout_{}_roundtrip", name),
            passed: binary_ok && json_ok,
            detail: format!("json={} bincode={} ({} bytes)", json_ok, binary_ok, binary.len()),
        });

        let loaded = load_layout(&layout, LoadMode::Simulated, catalog, 0);
        let detail = match &loaded {
            Ok(LoadedLayout::Simulated(vessels)) => {
                let parts: usize = vessels.iter().map(|v| v.vessel.len()).sum();
                (parts == layout.part_count(), format!("{} vessels, {} parts", vessels.len(), parts))
            }
            Ok(_) => (false, "wrong load mode".to_string()),
            Err(e) => (false, e.to_string()),
        };
        results.push(TestResult {
            name: format!("layout_{}_load", name),
            passed: detail.0,
            detail: detail.1,
        });

        if verbose {
            println!(
                "  {}: bounds {:?}, {} components, {} parts",
                layout.name,
                layout.bounds,
                layout.components.len(),
                layout.part_count()
            );
        }
    }

    results
}

// ── 3. Builder ──────────────────────────────────────────────────────────

fn validate_builder(catalog: &PartCatalog, _verbose: bool) -> Vec<TestResult> {
    println!("--- Builder ---");
    let mut results = Vec::new();

    let Ok(mut blueprint) = Blueprint::from_config("Hauler", &EngineConfig::default()) else {
        results.push(TestResult {
            name: "builder_create".into(),
            passed: false,
            detail: "could not create blueprint".into(),
        });
        return results;
    };

    // Cockpit, tank under it, a girder sideways to the right and cargo.
    let steps = [
        ("core:cockpit", 0, Vec2::new(11.0, 13.0)),
        ("core:tank", 0, Vec2::new(11.0, 11.0)),
        ("core:thruster", 0, Vec2::new(10.5, 9.0)),
        ("core:thruster", 0, Vec2::new(11.5, 9.0)),
        ("core:girder", 1, Vec2::new(12.5, 11.5)),
        ("core:cargo", 0, Vec2::new(14.0, 11.0)),
    ];
    let mut placed = 0;
    for (key, turns, center) in steps {
        blueprint.set_cursor(Orientation::UP);
        for _ in 0..turns {
            blueprint.rotate_cursor();
        }
        let released = blueprint
            .create_part(key, catalog)
            .and_then(|_| blueprint.release_at(center, catalog));
        if matches!(released, Ok(ReleaseOutcome::Placed)) {
            placed += 1;
        }
    }
    results.push(TestResult {
        name: "builder_place_all".into(),
        passed: placed == steps.len(),
        detail: format!("{}/{} parts placed", placed, steps.len()),
    });

    // Dropping on an occupied cell is declined and keeps the part held.
    let declined = blueprint
        .create_part("core:beam", catalog)
        .and_then(|_| blueprint.release_at(Vec2::new(11.0, 13.0), catalog));
    results.push(TestResult {
        name: "builder_declines_overlap".into(),
        passed: matches!(declined, Ok(ReleaseOutcome::Declined)) && blueprint.held().is_some(),
        detail: format!("{:?}", declined),
    });
    blueprint.drop_held();

    let layout = blueprint.launch();
    results.push(TestResult {
        name: "builder_launch_connected".into(),
        passed: layout.components.len() == 1 && layout.part_count() == placed,
        detail: format!("{} components, {} parts", layout.components.len(), layout.part_count()),
    });

    results
}

// ── 4. Flight ───────────────────────────────────────────────────────────

fn validate_flight(catalog: &Arc<PartCatalog>, verbose: bool) -> Vec<TestResult> {
    println!("--- Flight ---");
    let mut results = Vec::new();

    let Ok(layout) = layout_from_json(PROBE_JSON) else {
        return results;
    };
    let mut engine = SimulationEngine::new(Arc::clone(catalog));
    let ship = match engine.spawn_layout(&layout, Vec2::ZERO) {
        Ok(entities) if entities.len() == 1 => entities[0],
        other => {
            results.push(TestResult {
                name: "flight_spawn".into(),
                passed: false,
                detail: format!("{:?}", other.map(|e| e.len())),
            });
            return results;
        }
    };
    let cockpit = engine
        .with_vessel(ship, |v| {
            v.parts()
                .find(|p| p.control_block().is_some())
                .map(|p| p.id)
        })
        .ok()
        .flatten();
    let bound = cockpit
        .map(|id| engine.bind_controller(ship, id, PILOT).unwrap_or(false))
        .unwrap_or(false);
    results.push(TestResult {
        name: "flight_bind_pilot".into(),
        passed: bound,
        detail: format!("cockpit {:?}", cockpit),
    });

    let fuel = ResourceId::new("fuel");
    let fuel_before = engine
        .with_vessel(ship, |v| v.network().total_fluid(&fuel))
        .unwrap_or(0.0);

    let forward = ControlInputs::new().with(PILOT, ActionSet::from_iter([ControlAction::MoveForward]));
    for _ in 0..60 {
        engine.update(DT, &forward);
    }
    let body = engine.body(ship).unwrap_or_default();
    let fuel_after = engine
        .with_vessel(ship, |v| v.network().total_fluid(&fuel))
        .unwrap_or(0.0);
    results.push(TestResult {
        name: "flight_forward_thrust".into(),
        passed: body.velocity.y > 0.0 && body.position.y > 0.0,
        detail: format!("v={:?} p={:?}", body.velocity, body.position),
    });
    results.push(TestResult {
        name: "flight_burns_fuel".into(),
        passed: fuel_after < fuel_before,
        detail: format!("{:.2} -> {:.2}", fuel_before, fuel_after),
    });

    // Coasting: drag bleeds speed.
    let speed = body.velocity.length();
    for _ in 0..60 {
        engine.update(DT, &ControlInputs::new());
    }
    let coasting = engine.body(ship).unwrap_or_default().velocity.length();
    results.push(TestResult {
        name: "flight_drag".into(),
        passed: coasting < speed,
        detail: format!("{:.2} -> {:.2}", speed, coasting),
    });

    let turn = ControlInputs::new().with(PILOT, ActionSet::from_iter([ControlAction::RotateRight]));
    for _ in 0..30 {
        engine.update(DT, &turn);
    }
    let spin = engine.body(ship).unwrap_or_default().angular_velocity;
    results.push(TestResult {
        name: "flight_gyro_turns_clockwise".into(),
        passed: spin < 0.0,
        detail: format!("angular velocity {:.3}", spin),
    });

    if verbose {
        println!(
            "  probe after {} ticks ({:.1}s): {:?}",
            engine.tick_count(),
            engine.sim_time(),
            engine.body(ship)
        );
        if let Ok(pools) = engine.with_vessel(ship, |v| network_summary(v.network())) {
            println!("  pools: {}", pools);
        }
    }

    results
}

// ── 5. Random damage sweep ──────────────────────────────────────────────

/// Every live part sits in exactly one connected vessel, and every
/// vessel's field agrees with its parts' rectangles.
fn check_partition(engine: &SimulationEngine) -> Result<usize, String> {
    let mut total = 0;
    for entity in engine.vessels() {
        let ids = engine
            .with_vessel(entity, |vessel| {
                let ids = vessel.assembly().placed_ids();
                if !graph::is_connected(vessel.assembly(), &ids) {
                    return Err(format!("{} is disconnected", vessel.name));
                }
                let covered: i32 = vessel.parts().map(|p| p.rect().area()).sum();
                let occupied = vessel.assembly().field().occupied_cells().count();
                if covered as usize != occupied {
                    return Err(format!("{}: {} cells covered, {} occupied", vessel.name, covered, occupied));
                }
                if vessel.parts().any(|p| p.vessel != Some(entity)) {
                    return Err(format!("{} has parts pointing elsewhere", vessel.name));
                }
                Ok(ids)
            })
            .map_err(|e| e.to_string())??;
        total += ids.len();
    }
    Ok(total)
}

fn validate_damage_sweep(catalog: &Arc<PartCatalog>, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Damage Sweep ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let Ok(layout) = layout_from_json(DUMBBELL_JSON) else {
        return results;
    };
    let mut engine = SimulationEngine::new(Arc::clone(catalog));
    if engine.spawn_layout(&layout, Vec2::ZERO).is_err() {
        results.push(TestResult {
            name: "sweep_spawn".into(),
            passed: false,
            detail: "dumbbell failed to load".into(),
        });
        return results;
    }

    let initial = layout.part_count();
    let mut destroyed = 0;
    let mut splits = 0;
    let mut violations = Vec::new();
    let mut rounds = 0;

    while engine.vessel_count() > 0 && rounds < 500 {
        rounds += 1;
        let vessels = engine.vessels();
        let target = vessels[rng.gen_range(0..vessels.len())];
        let parts: Vec<PartId> = engine
            .with_vessel(target, |v| v.parts().map(|p| p.id).collect())
            .unwrap_or_default();
        if parts.is_empty() {
            continue;
        }
        let part = parts[rng.gen_range(0..parts.len())];
        if rng.gen_bool(0.5) {
            let impulse = rng.gen_range(0.0..60.0);
            let _ = engine.apply_impact(target, part, impulse);
        } else {
            let _ = engine.damage_part(target, part, rng.gen_range(1..8));
        }

        for event in engine.update(DT, &ControlInputs::new()) {
            destroyed += event.destroyed.len();
            if !event.fragments.is_empty() {
                splits += 1;
            }
        }

        match check_partition(&engine) {
            Ok(live) if live + destroyed == initial => {}
            Ok(live) => violations.push(format!(
                "round {}: {} live + {} destroyed != {}",
                rounds, live, destroyed, initial
            )),
            Err(e) => violations.push(format!("round {}: {}", rounds, e)),
        }
    }

    results.push(TestResult {
        name: "sweep_partition_invariant".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!("{} rounds, {} destroyed, {} splits", rounds, destroyed, splits)
        } else {
            violations.join("; ")
        },
    });
    results.push(TestResult {
        name: "sweep_terminates".into(),
        passed: engine.vessel_count() == 0 || rounds == 500,
        detail: format!("{} vessels left after {} rounds", engine.vessel_count(), rounds),
    });

    if verbose {
        println!(
            "  seed {}: {} rounds, {} parts destroyed, {} splits, {} vessels left",
            seed,
            rounds,
            destroyed,
            splits,
            engine.vessel_count()
        );
    }

    results
}

fn network_summary(network: &ResourceNetwork) -> String {
    network
        .fluid_pools()
        .map(|p| format!("{}={:.1}/{:.1}", p.id(), p.amount(), p.capacity()))
        .collect::<Vec<_>>()
        .join(" ")
}
