//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`SPT_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use spheretree_math::Vec3;
use spheretree_physics::{OctreeConfig, ResolutionMode, SimulationConfig};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Collision engine configuration
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Scene population
    #[serde(default)]
    pub scene: SceneConfig,
    /// Fixed-step run loop
    #[serde(default)]
    pub run: RunConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`SPT_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        // Load user config (optional)
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // SPT_SIMULATION__MODE=tree_accelerated -> simulation.mode = "tree_accelerated"
        figment = figment.merge(Env::prefixed("SPT_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Collision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Resolution strategy at startup (`brute_force` or `tree_accelerated`)
    pub mode: ResolutionMode,
    /// Centre of the octree root region [x, y, z]
    pub origin: [f32; 3],
    /// Half-width of the octree root region
    pub half_width: f32,
    /// Octree subdivision levels (0 = single leaf)
    pub depth: u32,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let octree = OctreeConfig::default();
        Self {
            mode: ResolutionMode::default(),
            origin: octree.origin.to_array(),
            half_width: octree.half_width,
            depth: octree.depth,
        }
    }
}

impl SimulationSection {
    /// Convert to the collision engine's config
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(
            self.mode,
            OctreeConfig::new(Vec3::from_array(self.origin), self.half_width, self.depth),
        )
    }
}

/// Scene population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Number of spheres spawned at startup
    pub sphere_count: u32,
    /// Seed for sphere positions and velocities
    pub seed: u64,
    /// Spheres spawn with each coordinate in [-spawn_extent, spawn_extent]
    pub spawn_extent: f32,
    /// Each velocity component is drawn from [-max_speed, max_speed]
    pub max_speed: f32,
    /// Radius of every spawned sphere
    pub radius: f32,
    /// Half-extent of the box of walls around the scene (0 = no walls)
    pub bounds_half_extent: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            sphere_count: 100,
            seed: 0,
            spawn_extent: 4.0,
            max_speed: 2.0,
            radius: 0.25,
            bounds_half_extent: 5.0,
        }
    }
}

/// Fixed-step run loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of ticks to simulate
    pub ticks: u32,
    /// Seconds per tick
    pub timestep: f32,
    /// Switch resolution mode every N ticks (0 = never)
    pub toggle_interval: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            timestep: 0.02,
            toggle_interval: 0,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Log collision counters every N ticks (0 = never)
    pub stats_interval: u32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 60,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}
