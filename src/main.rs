//! spheretree - headless sphere collision simulation
//!
//! Spawns a box of bouncing spheres, runs a fixed number of ticks and reports
//! how many collision checks each resolution mode performed.

use std::process::ExitCode;

use spheretree::config::AppConfig;
use spheretree::scene::SceneBuilder;
use spheretree::systems::SimulationSystem;
use spheretree_physics::ResolutionMode;

fn main() -> ExitCode {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .parse_filters(&config.debug.log_level)
        .parse_default_env()
        .init();
    log::info!("Starting spheretree");

    let simulation = config.simulation.to_simulation_config();
    let mut world = match SceneBuilder::from_config(simulation, &config.scene) {
        Ok(builder) => builder.build(),
        Err(e) => {
            log::error!("Invalid scene: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "Scene: {} spheres, {} planes, {} octree leaves, starting in {:?} mode",
        world.sphere_count(),
        world.planes().len(),
        world.tree().leaf_count(),
        world.mode()
    );

    let mut system = SimulationSystem::new(&config.run, &config.debug);
    let summary = system.run(&mut world, config.run.ticks);

    for mode in [ResolutionMode::BruteForce, ResolutionMode::TreeAccelerated] {
        let totals = summary.totals(mode);
        if totals.ticks == 0 {
            continue;
        }
        log::info!(
            "{:?}: {} ticks, {:.1} sphere checks/tick, {} sphere contacts, {} plane contacts, {:?} total",
            mode,
            totals.ticks,
            totals.checks_per_tick(),
            totals.sphere_contacts,
            totals.plane_contacts,
            totals.elapsed
        );
    }

    ExitCode::SUCCESS
}
