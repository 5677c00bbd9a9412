//! Collision world and per-tick driver

use crate::collision::{resolve_sphere_pair, resolve_sphere_plane, CollisionStats};
use crate::error::PhysicsError;
use crate::octree::{Octree, OctreeConfig};
use crate::shapes::{Plane, Sphere, SphereKey};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Strategy used to find sphere-sphere pairs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Check every unordered pair of spheres
    #[default]
    BruteForce,
    /// Only check spheres that share an octree leaf
    TreeAccelerated,
}

impl ResolutionMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            ResolutionMode::BruteForce => ResolutionMode::TreeAccelerated,
            ResolutionMode::TreeAccelerated => ResolutionMode::BruteForce,
        }
    }
}

/// Configuration for the collision world
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Resolution strategy used by the first tick
    pub mode: ResolutionMode,
    /// Layout of the octree used in tree-accelerated mode
    pub octree: OctreeConfig,
}

impl SimulationConfig {
    pub fn new(mode: ResolutionMode, octree: OctreeConfig) -> Self {
        Self { mode, octree }
    }
}

/// The collision world containing all spheres and planes
///
/// Owns the spheres (the octree only stores their keys), the static planes and
/// the octree itself. Both resolution modes work on the same sphere storage and
/// differ only in which pairs they check.
pub struct CollisionWorld {
    /// All spheres in the world (using generational keys)
    spheres: SlotMap<SphereKey, Sphere>,
    /// Static boundary planes
    planes: Vec<Plane>,
    /// Broad-phase index, refilled every tree-accelerated tick
    tree: Octree,
    mode: ResolutionMode,
    /// Counters from the most recent tick
    stats: CollisionStats,
}

impl CollisionWorld {
    /// Create an empty world
    ///
    /// Fails if the octree configuration is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, PhysicsError> {
        Ok(Self {
            spheres: SlotMap::with_key(),
            planes: Vec::new(),
            tree: Octree::new(config.octree)?,
            mode: config.mode,
            stats: CollisionStats::default(),
        })
    }

    /// Add a sphere to the world and return its key
    pub fn add_sphere(&mut self, sphere: Sphere) -> SphereKey {
        self.spheres.insert(sphere)
    }

    /// Remove a sphere from the world and return it
    pub fn remove_sphere(&mut self, key: SphereKey) -> Option<Sphere> {
        self.spheres.remove(key)
    }

    /// Get an immutable reference to a sphere by key
    pub fn sphere(&self, key: SphereKey) -> Option<&Sphere> {
        self.spheres.get(key)
    }

    /// Get a mutable reference to a sphere by key
    pub fn sphere_mut(&mut self, key: SphereKey) -> Option<&mut Sphere> {
        self.spheres.get_mut(key)
    }

    /// Iterate over all spheres with their keys
    pub fn spheres(&self) -> impl Iterator<Item = (SphereKey, &Sphere)> + '_ {
        self.spheres.iter()
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    /// Add a static plane to the world
    pub fn add_plane(&mut self, plane: Plane) {
        self.planes.push(plane);
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Select the resolution strategy for the next tick
    pub fn set_mode(&mut self, mode: ResolutionMode) {
        if mode != self.mode {
            log::info!("Collision resolution mode: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Switch to the other resolution strategy and return it
    pub fn toggle_mode(&mut self) -> ResolutionMode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    /// Replace the octree with one built from `config`
    ///
    /// On error the current tree is kept.
    pub fn reconfigure_tree(&mut self, config: OctreeConfig) -> Result<(), PhysicsError> {
        self.tree = Octree::new(config)?;
        log::info!("Octree rebuilt with {} leaves", self.tree.leaf_count());
        Ok(())
    }

    /// Counters from the most recent tick
    pub fn last_stats(&self) -> CollisionStats {
        self.stats
    }

    /// Advance every sphere by its velocity, then resolve collisions
    pub fn step(&mut self, dt: f32) -> CollisionStats {
        for sphere in self.spheres.values_mut() {
            sphere.integrate(dt);
        }
        self.resolve_collisions()
    }

    /// Run one collision tick
    ///
    /// This performs:
    /// 1. Sphere-sphere resolution using the current mode
    /// 2. Sphere-plane resolution for every sphere against every plane
    ///
    /// Counters are reset at the start and returned at the end.
    pub fn resolve_collisions(&mut self) -> CollisionStats {
        self.stats.reset();

        match self.mode {
            ResolutionMode::BruteForce => self.resolve_brute_force(),
            ResolutionMode::TreeAccelerated => self.resolve_with_tree(),
        }
        self.resolve_plane_collisions();

        log::debug!(
            "{:?} tick: {} spheres, {} sphere checks ({} contacts), {} plane checks ({} contacts)",
            self.mode,
            self.spheres.len(),
            self.stats.sphere_checks,
            self.stats.sphere_contacts,
            self.stats.plane_checks,
            self.stats.plane_contacts
        );
        self.stats
    }

    /// Check every unordered pair of spheres
    fn resolve_brute_force(&mut self) {
        // Collect all keys first (needed because we can't iterate and mutate)
        let keys: Vec<SphereKey> = self.spheres.keys().collect();

        for (i, &key_a) in keys.iter().enumerate() {
            for &key_b in &keys[i + 1..] {
                if let Some([a, b]) = self.spheres.get_disjoint_mut([key_a, key_b]) {
                    self.stats.record_sphere_check(resolve_sphere_pair(a, b));
                }
            }
        }
    }

    /// Refill the octree and resolve pairs leaf by leaf
    fn resolve_with_tree(&mut self) {
        self.tree.clear();
        for (key, sphere) in &self.spheres {
            self.tree.insert(key, sphere);
        }
        self.tree.resolve_collisions(&mut self.spheres, &mut self.stats);
    }

    /// Resolve every sphere against every static plane
    fn resolve_plane_collisions(&mut self) {
        for sphere in self.spheres.values_mut() {
            for plane in &self.planes {
                self.stats.record_plane_check(resolve_sphere_plane(sphere, plane));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spheretree_math::Vec3;

    const EPSILON: f32 = 1e-4;

    fn world(mode: ResolutionMode) -> CollisionWorld {
        CollisionWorld::new(SimulationConfig::new(
            mode,
            OctreeConfig::new(Vec3::ZERO, 4.0, 2),
        ))
        .unwrap()
    }

    fn sphere(position: Vec3, radius: f32, velocity: Vec3) -> Sphere {
        Sphere::new(position, radius).unwrap().with_velocity(velocity)
    }

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();
        assert_eq!(config.mode, ResolutionMode::BruteForce);
        assert_eq!(config.octree, OctreeConfig::default());
    }

    #[test]
    fn test_invalid_tree_config_is_rejected() {
        let config = SimulationConfig::new(
            ResolutionMode::TreeAccelerated,
            OctreeConfig::new(Vec3::ZERO, -1.0, 1),
        );
        assert!(matches!(
            CollisionWorld::new(config),
            Err(PhysicsError::InvalidHalfWidth(_))
        ));
    }

    #[test]
    fn test_add_and_remove_sphere() {
        let mut world = world(ResolutionMode::BruteForce);
        assert_eq!(world.sphere_count(), 0);

        let key = world.add_sphere(sphere(Vec3::new(0.0, 1.0, 0.0), 0.5, Vec3::ZERO));
        assert_eq!(world.sphere_count(), 1);
        assert_eq!(world.sphere(key).unwrap().position, Vec3::new(0.0, 1.0, 0.0));

        world.sphere_mut(key).unwrap().velocity = Vec3::X;
        assert_eq!(world.sphere(key).unwrap().velocity, Vec3::X);

        assert!(world.remove_sphere(key).is_some());
        assert!(world.sphere(key).is_none());
    }

    #[test]
    fn test_identical_spheres_are_distinct() {
        let mut world = world(ResolutionMode::TreeAccelerated);
        let s = sphere(Vec3::new(1.0, 1.0, 1.0), 0.5, Vec3::ZERO);
        let a = world.add_sphere(s);
        let b = world.add_sphere(s);
        assert_ne!(a, b);

        let stats = world.resolve_collisions();
        assert_eq!(stats.sphere_checks, 1);
        assert_eq!(stats.sphere_contacts, 1);
        let gap = world.sphere(a).unwrap().position.distance(world.sphere(b).unwrap().position);
        assert!(gap >= 1.0 - EPSILON);
    }

    #[test]
    fn test_toggle_mode() {
        let mut world = world(ResolutionMode::BruteForce);
        assert_eq!(world.toggle_mode(), ResolutionMode::TreeAccelerated);
        assert_eq!(world.mode(), ResolutionMode::TreeAccelerated);
        world.set_mode(ResolutionMode::BruteForce);
        assert_eq!(world.mode(), ResolutionMode::BruteForce);
    }

    #[test]
    fn test_brute_force_checks_every_pair() {
        let mut world = world(ResolutionMode::BruteForce);
        for i in 0..6 {
            world.add_sphere(sphere(Vec3::new(i as f32 * 3.0 - 8.0, 0.0, 0.0), 0.5, Vec3::ZERO));
        }
        let stats = world.resolve_collisions();
        assert_eq!(stats.sphere_checks, 15);
        assert_eq!(stats.sphere_contacts, 0);
    }

    #[test]
    fn test_tree_skips_distant_pairs() {
        let mut world = world(ResolutionMode::TreeAccelerated);
        world.add_sphere(sphere(Vec3::new(-3.0, -3.0, -3.0), 0.2, Vec3::ZERO));
        world.add_sphere(sphere(Vec3::new(3.0, 3.0, 3.0), 0.2, Vec3::ZERO));
        world.add_sphere(sphere(Vec3::new(3.0, -3.0, 3.0), 0.2, Vec3::ZERO));

        let stats = world.resolve_collisions();
        assert_eq!(stats.sphere_checks, 0);
    }

    #[test]
    fn test_stats_reset_each_tick() {
        let mut world = world(ResolutionMode::BruteForce);
        world.add_sphere(sphere(Vec3::ZERO, 0.5, Vec3::ZERO));
        world.add_sphere(sphere(Vec3::new(2.0, 0.0, 0.0), 0.5, Vec3::ZERO));
        world.add_plane(Plane::new(Vec3::new(0.0, -5.0, 0.0), Vec3::Y).unwrap());

        let first = world.resolve_collisions();
        let second = world.resolve_collisions();
        assert_eq!(first, second);
        assert_eq!(second.sphere_checks, 1);
        assert_eq!(second.plane_checks, 2);
        assert_eq!(world.last_stats(), second);
    }

    #[test]
    fn test_plane_collision_in_both_modes() {
        for mode in [ResolutionMode::BruteForce, ResolutionMode::TreeAccelerated] {
            let mut world = world(mode);
            world.add_plane(Plane::new(Vec3::new(0.0, -2.0, 0.0), Vec3::Y).unwrap());
            let key = world.add_sphere(sphere(
                Vec3::new(0.0, -1.8, 0.0),
                0.5,
                Vec3::new(0.0, -4.0, 0.0),
            ));

            let stats = world.resolve_collisions();

            let s = world.sphere(key).unwrap();
            assert_eq!(stats.plane_contacts, 1);
            assert_eq!(s.velocity, Vec3::new(0.0, 4.0, 0.0));
            assert!(world.planes()[0].signed_distance(s.position) >= 0.5 - EPSILON);
        }
    }

    #[test]
    fn test_step_integrates_then_resolves() {
        let mut world = world(ResolutionMode::BruteForce);
        world.add_plane(Plane::new(Vec3::new(2.0, 0.0, 0.0), -Vec3::X).unwrap());
        let key = world.add_sphere(sphere(Vec3::ZERO, 0.5, Vec3::new(10.0, 0.0, 0.0)));

        world.step(0.2);

        let s = world.sphere(key).unwrap();
        assert!((s.position.x - 1.5).abs() < EPSILON);
        assert_eq!(s.velocity, Vec3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn test_switching_modes_keeps_state_consistent() {
        let mut world = world(ResolutionMode::BruteForce);
        let a = world.add_sphere(sphere(Vec3::ZERO, 1.0, Vec3::new(1.0, 0.0, 0.0)));
        let b = world.add_sphere(sphere(Vec3::new(1.5, 0.0, 0.0), 1.0, Vec3::new(-1.0, 0.0, 0.0)));

        world.resolve_collisions();
        let after_brute = (*world.sphere(a).unwrap(), *world.sphere(b).unwrap());

        world.toggle_mode();
        let stats = world.resolve_collisions();
        let after_tree = (*world.sphere(a).unwrap(), *world.sphere(b).unwrap());

        // Already resolved: the tree tick must not undo or repeat the response
        assert!(stats.sphere_checks >= 1);
        assert_eq!(after_tree.0.velocity, after_brute.0.velocity);
        assert_eq!(after_tree.1.velocity, after_brute.1.velocity);
        assert!(after_tree.0.position.distance(after_brute.0.position) < EPSILON);
    }

    #[test]
    fn test_reconfigure_tree() {
        let mut world = world(ResolutionMode::TreeAccelerated);
        assert_eq!(world.tree().leaf_count(), 64);

        world
            .reconfigure_tree(OctreeConfig::new(Vec3::ZERO, 8.0, 1))
            .unwrap();
        assert_eq!(world.tree().leaf_count(), 8);

        assert!(world
            .reconfigure_tree(OctreeConfig::new(Vec3::ZERO, 0.0, 1))
            .is_err());
        assert_eq!(world.tree().leaf_count(), 8);
    }
}
