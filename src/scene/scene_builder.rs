//! SceneBuilder - Declarative scene construction
//!
//! Provides a fluent API for populating a collision world with walls and spheres.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spheretree_math::Vec3;
use spheretree_physics::{CollisionWorld, PhysicsError, Plane, SimulationConfig, Sphere};

use crate::config::SceneConfig;

/// Builder for constructing collision scenes
///
/// # Example
/// ```ignore
/// let world = SceneBuilder::new(SimulationConfig::default())?
///     .add_bounding_box(Vec3::ZERO, 5.0)
///     .add_sphere(Vec3::ZERO, Vec3::X, 0.5)?
///     .add_random_spheres(100, 42, 4.0, 2.0, 0.25)?
///     .build();
/// ```
pub struct SceneBuilder {
    world: CollisionWorld,
}

impl SceneBuilder {
    /// Create a new scene builder around an empty world
    pub fn new(config: SimulationConfig) -> Result<Self, PhysicsError> {
        Ok(Self {
            world: CollisionWorld::new(config)?,
        })
    }

    /// Build a scene from the `[scene]` config section
    pub fn from_config(
        simulation: SimulationConfig,
        scene: &SceneConfig,
    ) -> Result<Self, PhysicsError> {
        let mut builder = Self::new(simulation)?;
        if scene.bounds_half_extent > 0.0 {
            builder = builder.add_bounding_box(Vec3::ZERO, scene.bounds_half_extent);
        }
        builder.add_random_spheres(
            scene.sphere_count,
            scene.seed,
            scene.spawn_extent,
            scene.max_speed,
            scene.radius,
        )
    }

    /// Add a single static plane
    pub fn add_plane(mut self, plane: Plane) -> Self {
        self.world.add_plane(plane);
        self
    }

    /// Enclose the scene in six inward-facing walls
    pub fn add_bounding_box(mut self, center: Vec3, half_extent: f32) -> Self {
        for plane in Plane::bounding_box(center, half_extent) {
            self.world.add_plane(plane);
        }
        self
    }

    /// Add one sphere
    pub fn add_sphere(
        mut self,
        position: Vec3,
        velocity: Vec3,
        radius: f32,
    ) -> Result<Self, PhysicsError> {
        self.world
            .add_sphere(Sphere::new(position, radius)?.with_velocity(velocity));
        Ok(self)
    }

    /// Add `count` spheres with seeded random positions and velocities
    ///
    /// Every coordinate is drawn from `[-extent, extent]` and every velocity
    /// component from `[-max_speed, max_speed]`. Both limits must be finite
    /// and non-negative.
    pub fn add_random_spheres(
        mut self,
        count: u32,
        seed: u64,
        extent: f32,
        max_speed: f32,
        radius: f32,
    ) -> Result<Self, PhysicsError> {
        for limit in [extent, max_speed] {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(PhysicsError::InvalidSpawnRange(limit));
            }
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut random_vec = |limit: f32| {
            if limit > 0.0 {
                Vec3::new(
                    rng.gen_range(-limit..=limit),
                    rng.gen_range(-limit..=limit),
                    rng.gen_range(-limit..=limit),
                )
            } else {
                Vec3::ZERO
            }
        };

        for _ in 0..count {
            let position = random_vec(extent);
            let velocity = random_vec(max_speed);
            self = self.add_sphere(position, velocity, radius)?;
        }

        log::info!("Spawned {} spheres (seed {})", count, seed);
        Ok(self)
    }

    /// Build the final world
    pub fn build(self) -> CollisionWorld {
        self.world
    }
}
