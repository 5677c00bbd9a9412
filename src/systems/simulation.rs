//! Fixed-step simulation system
//!
//! Drives the collision world the way an external clock would:
//! - Fixed timestep integration and collision ticks
//! - Periodic resolution mode switches
//! - Periodic collision counter logging

use std::time::{Duration, Instant};

use spheretree_physics::{CollisionStats, CollisionWorld, ResolutionMode};

use crate::config::{DebugConfig, RunConfig};

/// Totals gathered over a run for one resolution mode
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModeTotals {
    pub ticks: u64,
    pub sphere_checks: u64,
    pub sphere_contacts: u64,
    pub plane_contacts: u64,
    pub elapsed: Duration,
}

impl ModeTotals {
    fn record(&mut self, stats: &CollisionStats, elapsed: Duration) {
        self.ticks += 1;
        self.sphere_checks += stats.sphere_checks;
        self.sphere_contacts += stats.sphere_contacts;
        self.plane_contacts += stats.plane_contacts;
        self.elapsed += elapsed;
    }

    /// Mean sphere-sphere checks per tick
    pub fn checks_per_tick(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.sphere_checks as f64 / self.ticks as f64
        }
    }
}

/// Result of a full run
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub brute_force: ModeTotals,
    pub tree_accelerated: ModeTotals,
}

impl RunSummary {
    pub fn totals(&self, mode: ResolutionMode) -> &ModeTotals {
        match mode {
            ResolutionMode::BruteForce => &self.brute_force,
            ResolutionMode::TreeAccelerated => &self.tree_accelerated,
        }
    }

    fn totals_mut(&mut self, mode: ResolutionMode) -> &mut ModeTotals {
        match mode {
            ResolutionMode::BruteForce => &mut self.brute_force,
            ResolutionMode::TreeAccelerated => &mut self.tree_accelerated,
        }
    }
}

/// Runs the collision world at a fixed timestep
pub struct SimulationSystem {
    timestep: f32,
    toggle_interval: u32,
    stats_interval: u32,
    tick: u64,
    summary: RunSummary,
}

impl SimulationSystem {
    /// Create a new simulation system
    pub fn new(run: &RunConfig, debug: &DebugConfig) -> Self {
        Self {
            timestep: run.timestep,
            toggle_interval: run.toggle_interval,
            stats_interval: debug.stats_interval,
            tick: 0,
            summary: RunSummary::default(),
        }
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run one tick
    ///
    /// Switches mode first when the toggle interval is reached, so each tick
    /// runs entirely under one mode.
    pub fn update(&mut self, world: &mut CollisionWorld) -> CollisionStats {
        if self.toggle_interval > 0 && self.tick > 0 && self.tick % self.toggle_interval as u64 == 0 {
            world.toggle_mode();
        }

        let mode = world.mode();
        let start = Instant::now();
        let stats = world.step(self.timestep);
        let elapsed = start.elapsed();

        self.summary.totals_mut(mode).record(&stats, elapsed);
        self.tick += 1;

        if self.stats_interval > 0 && self.tick % self.stats_interval as u64 == 0 {
            log::info!(
                "tick {} [{:?}]: {} checks, {} sphere contacts, {} plane contacts in {:?}",
                self.tick,
                mode,
                stats.total_checks(),
                stats.sphere_contacts,
                stats.plane_contacts,
                elapsed
            );
        }

        stats
    }

    /// Run `ticks` ticks and return the totals
    pub fn run(&mut self, world: &mut CollisionWorld, ticks: u32) -> RunSummary {
        for _ in 0..ticks {
            self.update(world);
        }
        self.summary
    }
}
