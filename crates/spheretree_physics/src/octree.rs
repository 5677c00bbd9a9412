//! Octree broad phase
//!
//! A fixed-depth octree rebuilt (or cleared and refilled) every tick. Branch
//! nodes hold exactly eight children and no objects; leaves hold sphere keys.
//! Collision resolution only compares spheres that share a leaf, so a sphere is
//! inserted into every octant its bounding sphere reaches, not just the octant
//! containing its centre.
//!
//! A pair of spheres that both straddle the same splitting planes ends up in
//! several leaves together and is resolved once per shared leaf. Resolution is
//! idempotent, so the repeats only cost time.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use spheretree_math::Vec3;

use crate::collision::{resolve_sphere_pair, CollisionStats};
use crate::error::PhysicsError;
use crate::shapes::{Sphere, SphereKey};

/// Deepest tree accepted by [`OctreeConfig::validate`] (8^6 = 262144 leaves)
pub const MAX_OCTREE_DEPTH: u32 = 6;

/// Construction parameters for an [`Octree`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Centre of the root region
    pub origin: Vec3,
    /// Distance from the root centre to each face of the root cube
    pub half_width: f32,
    /// Levels of subdivision below the root (0 = the root is a single leaf)
    pub depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            half_width: 5.0,
            depth: 1,
        }
    }
}

impl OctreeConfig {
    /// Create a config for a tree rooted at `origin`
    pub fn new(origin: Vec3, half_width: f32, depth: u32) -> Self {
        Self {
            origin,
            half_width,
            depth,
        }
    }

    /// Check the half-width and depth
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.half_width.is_finite() && self.half_width > 0.0) {
            return Err(PhysicsError::InvalidHalfWidth(self.half_width));
        }
        if self.depth > MAX_OCTREE_DEPTH {
            return Err(PhysicsError::DepthTooLarge(self.depth));
        }
        Ok(())
    }

    /// Number of leaves a tree with this config has
    ///
    /// `None` when the count does not fit in a `usize`, which only happens
    /// for depths that [`validate`](Self::validate) rejects.
    pub fn leaf_count(&self) -> Option<usize> {
        8usize.checked_pow(self.depth)
    }
}

/// Index of the octant containing `position`
///
/// Bit 0 is set for `x > center.x`, bit 1 for `y`, bit 2 for `z`. A point
/// exactly on a splitting plane belongs to the lower octant.
#[inline]
pub fn octant_index(position: Vec3, center: Vec3) -> usize {
    ((position.x > center.x) as usize)
        | (((position.y > center.y) as usize) << 1)
        | (((position.z > center.z) as usize) << 2)
}

/// Unit offset direction of octant `index`, each component ±1
#[inline]
fn octant_direction(index: usize) -> Vec3 {
    let sign = |bit: usize| if index & bit != 0 { 1.0 } else { -1.0 };
    Vec3::new(sign(1), sign(2), sign(4))
}

/// Bitmask of the octants around `center` that a sphere reaches
///
/// Octants are treated as unbounded beyond the parent, so a sphere outside the
/// root region still lands in the nearest outer octants. Per axis, the gap
/// between the sphere centre and an octant is zero on the octant's side of the
/// splitting plane and the axis offset otherwise; the sphere reaches the octant
/// when the squared gap is within its radius.
fn overlapped_octants(center: Vec3, position: Vec3, radius: f32) -> u8 {
    let d = position - center;
    let radius_sq = radius * radius;
    let gap = |offset: f32, positive_side: bool| {
        if (offset > 0.0) == positive_side {
            0.0
        } else {
            offset * offset
        }
    };

    let mut mask = 0u8;
    for index in 0..8 {
        let gap_sq = gap(d.x, index & 1 != 0) + gap(d.y, index & 2 != 0) + gap(d.z, index & 4 != 0);
        if gap_sq <= radius_sq {
            mask |= 1 << index;
        }
    }
    mask
}

/// A node of the octree
#[derive(Clone, Debug)]
pub enum OctreeNode {
    /// Internal node with eight children covering its octants
    Branch {
        center: Vec3,
        half_width: f32,
        /// Levels of subdivision below this node
        depth: u32,
        children: Box<[OctreeNode; 8]>,
    },
    /// Bottom node holding the keys of the spheres that reach its region
    Leaf {
        center: Vec3,
        half_width: f32,
        objects: Vec<SphereKey>,
    },
}

impl OctreeNode {
    /// Recursively build a tree of the given depth
    ///
    /// Depth 0 yields a leaf. Otherwise each child is centred half a
    /// half-width away from `center` along every axis and has half the
    /// half-width.
    pub fn build(center: Vec3, half_width: f32, depth: u32) -> Self {
        if depth == 0 {
            return OctreeNode::Leaf {
                center,
                half_width,
                objects: Vec::new(),
            };
        }

        let child_half_width = half_width * 0.5;
        let children = Box::new(std::array::from_fn(|index| {
            let child_center = center + octant_direction(index) * child_half_width;
            OctreeNode::build(child_center, child_half_width, depth - 1)
        }));

        OctreeNode::Branch {
            center,
            half_width,
            depth,
            children,
        }
    }

    pub fn center(&self) -> Vec3 {
        match self {
            OctreeNode::Branch { center, .. } | OctreeNode::Leaf { center, .. } => *center,
        }
    }

    pub fn half_width(&self) -> f32 {
        match self {
            OctreeNode::Branch { half_width, .. } | OctreeNode::Leaf { half_width, .. } => {
                *half_width
            }
        }
    }

    /// Levels of subdivision below this node (0 for leaves)
    pub fn depth(&self) -> u32 {
        match self {
            OctreeNode::Branch { depth, .. } => *depth,
            OctreeNode::Leaf { .. } => 0,
        }
    }

    /// Sphere keys stored directly in this node (always empty for branches)
    pub fn objects(&self) -> &[SphereKey] {
        match self {
            OctreeNode::Branch { .. } => &[],
            OctreeNode::Leaf { objects, .. } => objects,
        }
    }

    /// Insert a sphere into every leaf its bounding sphere reaches
    ///
    /// Each leaf is reached through a single path, so one call never stores
    /// the same key twice in one leaf.
    pub fn insert(&mut self, key: SphereKey, sphere: &Sphere) {
        match self {
            OctreeNode::Branch {
                center, children, ..
            } => {
                let mask = overlapped_octants(*center, sphere.position, sphere.radius());
                for (index, child) in children.iter_mut().enumerate() {
                    if mask & (1 << index) != 0 {
                        child.insert(key, sphere);
                    }
                }
            }
            OctreeNode::Leaf { objects, .. } => objects.push(key),
        }
    }

    /// Resolve every sphere pair that shares a leaf
    ///
    /// A leaf holding `k` spheres performs exactly `k * (k - 1) / 2` checks.
    /// Keys that no longer exist in `spheres` are skipped.
    pub fn resolve_collisions(
        &self,
        spheres: &mut SlotMap<SphereKey, Sphere>,
        stats: &mut CollisionStats,
    ) {
        match self {
            OctreeNode::Branch { children, .. } => {
                for child in children.iter() {
                    child.resolve_collisions(spheres, stats);
                }
            }
            OctreeNode::Leaf { objects, .. } => {
                for (i, &key_a) in objects.iter().enumerate() {
                    for &key_b in &objects[i + 1..] {
                        if key_a == key_b {
                            continue;
                        }
                        if let Some([a, b]) = spheres.get_disjoint_mut([key_a, key_b]) {
                            stats.record_sphere_check(resolve_sphere_pair(a, b));
                        }
                    }
                }
            }
        }
    }

    /// Remove all sphere keys, keeping the node structure
    pub fn clear(&mut self) {
        match self {
            OctreeNode::Branch { children, .. } => {
                for child in children.iter_mut() {
                    child.clear();
                }
            }
            OctreeNode::Leaf { objects, .. } => objects.clear(),
        }
    }

    /// Number of leaves under (and including) this node
    pub fn leaf_count(&self) -> usize {
        match self {
            OctreeNode::Branch { children, .. } => children.iter().map(Self::leaf_count).sum(),
            OctreeNode::Leaf { .. } => 1,
        }
    }

    /// Total keys stored in all leaves, counting a sphere once per leaf
    pub fn reference_count(&self) -> usize {
        match self {
            OctreeNode::Branch { children, .. } => {
                children.iter().map(Self::reference_count).sum()
            }
            OctreeNode::Leaf { objects, .. } => objects.len(),
        }
    }

    /// Visit every leaf in octant order
    pub fn for_each_leaf(&self, f: &mut dyn FnMut(&OctreeNode)) {
        match self {
            OctreeNode::Branch { children, .. } => {
                for child in children.iter() {
                    child.for_each_leaf(f);
                }
            }
            OctreeNode::Leaf { .. } => f(self),
        }
    }
}

/// Fixed-depth octree over the spheres of a collision world
#[derive(Clone, Debug)]
pub struct Octree {
    root: OctreeNode,
    config: OctreeConfig,
}

impl Octree {
    /// Build an empty tree
    pub fn new(config: OctreeConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        let root = OctreeNode::build(config.origin, config.half_width, config.depth);
        log::debug!(
            "Built octree: origin={:?} half_width={} depth={} ({} leaves)",
            config.origin,
            config.half_width,
            config.depth,
            root.leaf_count()
        );
        Ok(Self { root, config })
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Check whether a point lies inside the root cube
    pub fn contains_point(&self, point: Vec3) -> bool {
        let d = (point - self.config.origin).abs();
        let hw = self.config.half_width;
        d.x <= hw && d.y <= hw && d.z <= hw
    }

    /// Insert a sphere under `key`
    ///
    /// Spheres outside the root region are kept in the outermost leaves.
    pub fn insert(&mut self, key: SphereKey, sphere: &Sphere) {
        if !self.contains_point(sphere.position) {
            log::trace!(
                "Sphere {:?} at {:?} is outside the octree root region",
                key,
                sphere.position
            );
        }
        self.root.insert(key, sphere);
    }

    /// Resolve all sphere pairs that share a leaf
    pub fn resolve_collisions(
        &self,
        spheres: &mut SlotMap<SphereKey, Sphere>,
        stats: &mut CollisionStats,
    ) {
        self.root.resolve_collisions(spheres, stats);
    }

    /// Remove every sphere key from the tree
    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn reference_count(&self) -> usize {
        self.root.reference_count()
    }

    pub fn for_each_leaf(&self, mut f: impl FnMut(&OctreeNode)) {
        self.root.for_each_leaf(&mut f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(depth: u32) -> Octree {
        Octree::new(OctreeConfig::new(Vec3::ZERO, 4.0, depth)).unwrap()
    }

    fn add(spheres: &mut SlotMap<SphereKey, Sphere>, position: Vec3, radius: f32) -> SphereKey {
        spheres.insert(Sphere::new(position, radius).unwrap())
    }

    fn insert_all(tree: &mut Octree, spheres: &SlotMap<SphereKey, Sphere>) {
        for (key, sphere) in spheres {
            tree.insert(key, sphere);
        }
    }

    #[test]
    fn test_config_default() {
        let config = OctreeConfig::default();
        assert_eq!(config.origin, Vec3::ZERO);
        assert_eq!(config.half_width, 5.0);
        assert_eq!(config.depth, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_half_width() {
        for hw in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = OctreeConfig::new(Vec3::ZERO, hw, 1);
            assert!(matches!(
                config.validate(),
                Err(PhysicsError::InvalidHalfWidth(_))
            ));
        }
    }

    #[test]
    fn test_config_rejects_excessive_depth() {
        let config = OctreeConfig::new(Vec3::ZERO, 1.0, MAX_OCTREE_DEPTH + 1);
        assert_eq!(
            Octree::new(config).unwrap_err(),
            PhysicsError::DepthTooLarge(MAX_OCTREE_DEPTH + 1)
        );
    }

    #[test]
    fn test_depth_zero_is_single_leaf() {
        let tree = tree(0);
        assert!(matches!(tree.root(), OctreeNode::Leaf { .. }));
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_leaf_count_matches_depth() {
        for depth in 0..4 {
            let tree = tree(depth);
            assert_eq!(tree.leaf_count(), 8usize.pow(depth));
            assert_eq!(Some(tree.leaf_count()), tree.config().leaf_count());
        }
    }

    #[test]
    fn test_unvalidated_leaf_count_does_not_overflow() {
        let config = OctreeConfig::new(Vec3::ZERO, 1.0, 30);
        assert_eq!(config.leaf_count(), None);
        assert!(config.validate().is_err());
        assert_eq!(
            OctreeConfig::new(Vec3::ZERO, 1.0, MAX_OCTREE_DEPTH).leaf_count(),
            Some(262_144)
        );
    }

    #[test]
    fn test_child_layout() {
        let root = OctreeNode::build(Vec3::new(1.0, 1.0, 1.0), 4.0, 1);
        let OctreeNode::Branch { children, depth, .. } = &root else {
            panic!("Expected a branch");
        };
        assert_eq!(*depth, 1);
        assert_eq!(children[0].center(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(children[1].center(), Vec3::new(3.0, -1.0, -1.0));
        assert_eq!(children[2].center(), Vec3::new(-1.0, 3.0, -1.0));
        assert_eq!(children[7].center(), Vec3::new(3.0, 3.0, 3.0));
        for (index, child) in children.iter().enumerate() {
            assert_eq!(child.half_width(), 2.0);
            assert_eq!(child.depth(), 0);
            assert_eq!(octant_index(child.center(), root.center()), index);
        }
    }

    #[test]
    fn test_all_leaves_share_one_size() {
        let tree = tree(3);
        let mut leaves = 0;
        tree.for_each_leaf(|leaf| {
            assert_eq!(leaf.half_width(), 0.5);
            leaves += 1;
        });
        assert_eq!(leaves, 512);
    }

    #[test]
    fn test_octant_index() {
        let c = Vec3::ZERO;
        assert_eq!(octant_index(Vec3::new(-1.0, -1.0, -1.0), c), 0);
        assert_eq!(octant_index(Vec3::new(1.0, -1.0, -1.0), c), 1);
        assert_eq!(octant_index(Vec3::new(-1.0, 1.0, -1.0), c), 2);
        assert_eq!(octant_index(Vec3::new(-1.0, -1.0, 1.0), c), 4);
        assert_eq!(octant_index(Vec3::new(1.0, 1.0, 1.0), c), 7);
        // On the splitting plane counts as the lower side
        assert_eq!(octant_index(Vec3::ZERO, c), 0);
    }

    #[test]
    fn test_interior_sphere_goes_to_one_leaf() {
        let mut spheres = SlotMap::with_key();
        add(&mut spheres, Vec3::new(2.0, 2.0, 2.0), 0.5);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);
        assert_eq!(tree.reference_count(), 1);
    }

    #[test]
    fn test_face_straddling_sphere_goes_to_two_leaves() {
        let mut spheres = SlotMap::with_key();
        add(&mut spheres, Vec3::new(0.2, 2.0, 2.0), 0.5);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);
        assert_eq!(tree.reference_count(), 2);
    }

    #[test]
    fn test_centred_sphere_goes_to_every_leaf() {
        let mut spheres = SlotMap::with_key();
        add(&mut spheres, Vec3::ZERO, 0.1);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);
        assert_eq!(tree.reference_count(), 8);
    }

    #[test]
    fn test_corner_test_is_exact() {
        // Reaches the three face-adjacent octants but not the edge or corner ones
        let mask = overlapped_octants(Vec3::ZERO, Vec3::new(0.5, 0.5, 0.5), 0.6);
        assert_eq!(mask, 0b1110_1000);
        assert_eq!(mask.count_ones(), 4);
    }

    #[test]
    fn test_out_of_bounds_sphere_is_clamped_into_outer_leaf() {
        let mut spheres = SlotMap::with_key();
        let key = add(&mut spheres, Vec3::new(100.0, -100.0, 100.0), 1.0);
        let mut tree = tree(2);
        assert!(!tree.contains_point(spheres[key].position));
        insert_all(&mut tree, &spheres);

        assert_eq!(tree.reference_count(), 1);
        let mut holder = None;
        tree.for_each_leaf(|leaf| {
            if leaf.objects().contains(&key) {
                holder = Some(leaf.center());
            }
        });
        assert_eq!(holder, Some(Vec3::new(3.0, -3.0, 3.0)));
    }

    #[test]
    fn test_clear_keeps_structure() {
        let mut spheres = SlotMap::with_key();
        add(&mut spheres, Vec3::new(1.0, 1.0, 1.0), 0.5);
        add(&mut spheres, Vec3::new(-1.0, 1.0, -1.0), 2.0);
        let mut tree = tree(2);
        insert_all(&mut tree, &spheres);
        assert!(tree.reference_count() > 0);

        tree.clear();
        assert_eq!(tree.reference_count(), 0);
        assert_eq!(tree.leaf_count(), 64);
    }

    #[test]
    fn test_leaf_resolves_every_pair_once() {
        let mut spheres = SlotMap::with_key();
        for i in 0..5 {
            add(&mut spheres, Vec3::new(1.0 + 0.5 * i as f32, 2.0, 2.0), 0.1);
        }
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);
        assert_eq!(tree.reference_count(), 5);

        let mut stats = CollisionStats::default();
        tree.resolve_collisions(&mut spheres, &mut stats);
        assert_eq!(stats.sphere_checks, 5 * 4 / 2);
        assert_eq!(stats.sphere_contacts, 0);
    }

    #[test]
    fn test_empty_tree_resolves_nothing() {
        let mut spheres: SlotMap<SphereKey, Sphere> = SlotMap::with_key();
        let tree = tree(2);
        let mut stats = CollisionStats::default();
        tree.resolve_collisions(&mut spheres, &mut stats);
        assert_eq!(stats, CollisionStats::default());
    }

    #[test]
    fn test_last_octant_is_resolved() {
        let mut spheres = SlotMap::with_key();
        let a = add(&mut spheres, Vec3::new(2.0, 2.0, 2.0), 0.5);
        let b = add(&mut spheres, Vec3::new(2.5, 2.0, 2.0), 0.5);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);

        let mut stats = CollisionStats::default();
        tree.resolve_collisions(&mut spheres, &mut stats);

        assert_eq!(stats.sphere_contacts, 1);
        assert!(spheres[a].position.distance(spheres[b].position) >= 1.0 - 1e-4);
    }

    #[test]
    fn test_straddling_pair_is_detected() {
        let mut spheres = SlotMap::with_key();
        let a = add(&mut spheres, Vec3::new(-0.4, 2.0, 2.0), 0.5);
        let b = add(&mut spheres, Vec3::new(0.4, 2.0, 2.0), 0.5);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);

        let mut stats = CollisionStats::default();
        tree.resolve_collisions(&mut spheres, &mut stats);

        // Both spheres sit in both leaves around x = 0
        assert_eq!(stats.sphere_checks, 2);
        assert!(stats.sphere_contacts >= 1);
        assert!(spheres[a].position.distance(spheres[b].position) >= 1.0 - 1e-4);
    }

    #[test]
    fn test_removed_sphere_is_skipped() {
        let mut spheres = SlotMap::with_key();
        let a = add(&mut spheres, Vec3::new(1.0, 1.0, 1.0), 0.5);
        add(&mut spheres, Vec3::new(1.2, 1.0, 1.0), 0.5);
        let mut tree = tree(1);
        insert_all(&mut tree, &spheres);
        spheres.remove(a);

        let mut stats = CollisionStats::default();
        tree.resolve_collisions(&mut spheres, &mut stats);
        assert_eq!(stats.sphere_checks, 0);
    }
}
