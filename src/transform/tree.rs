//! Hierarchical Transform Tree
//!
//! An arena of transform nodes forming a forest. Each node stores its local
//! parameters and lazily derives four matrices (local↔parent, local↔world)
//! which are memoized until the next mutation that could affect them.
//!
//! # Design Principles
//!
//! - **Arena Ownership**: The tree owns every node; parents own their child
//!   lists and children point back through plain handles
//! - **Lazy Evaluation**: Matrices are computed on first read after invalidation
//! - **Downward Invalidation**: A mutation drops the caches of the node and its
//!   descendants, never its ancestors
//! - **All-or-Nothing**: Failing operations validate before touching the tree
//!
//! # Example
//!
//! ```ignore
//! let mut tree = TransformTree::new();
//! let root = tree.spawn(Transform2D::new());
//! let child = tree.spawn(Transform2D::from_position(DVec2::new(10.0, 0.0)));
//! tree.add_child(root, child)?;
//!
//! tree.set_position(root, DVec2::new(5.0, 5.0))?;
//! assert_eq!(tree.world_position(child)?, DVec2::new(15.0, 5.0));
//! ```

use std::cell::Cell;

use glam::{DAffine2, DVec2};
use smallvec::{SmallVec, smallvec};

use super::cache::{CacheStats, NodeMatrices};
use super::error::{Result, TransformError};
use super::node::{Node, NodeDesc, NodeId};
use super::transform::Transform2D;
use crate::math::EPSILON;

// ============================================================================
// Configuration
// ============================================================================

/// Tree configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Number of node slots to pre-allocate
    pub initial_capacity: usize,
    /// Tolerance for parameter equality and decomposition checks
    pub epsilon: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            epsilon: EPSILON,
        }
    }
}

impl TreeConfig {
    /// Pre-allocate room for `capacity` nodes
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the comparison tolerance
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

// ============================================================================
// Arena Entry
// ============================================================================

/// One arena slot. `node` is `None` while the slot sits on the free list.
#[derive(Debug)]
struct Entry {
    generation: u32,
    node: Option<Node>,
}

// ============================================================================
// Transform Tree
// ============================================================================

/// A forest of 2D transform nodes with cached matrices.
///
/// Queries take `&self` and fill caches through interior mutability, which
/// makes the tree `!Sync`. Callers sharing a tree across threads must wrap
/// it in their own lock.
///
/// # Performance
///
/// | Operation              | Cost                                  |
/// |------------------------|---------------------------------------|
/// | Read (valid cache)     | O(1)                                  |
/// | Read (invalid cache)   | O(k), k = invalid ancestors + 1       |
/// | Parameter write        | O(d), d = currently valid descendants |
/// | `add_child`            | O(depth + siblings)                   |
#[derive(Debug)]
pub struct TransformTree {
    entries: Vec<Entry>,
    free_list: Vec<usize>,
    len: usize,
    config: TreeConfig,
    stats: Cell<CacheStats>,
}

impl TransformTree {
    /// Create an empty tree with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Create an empty tree with the given configuration.
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            entries: Vec::with_capacity(config.initial_capacity),
            free_list: Vec::new(),
            len: 0,
            config,
            stats: Cell::new(CacheStats::default()),
        }
    }

    /// The active configuration
    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Node Access
    // -------------------------------------------------------------------------

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.entries
            .get(id.index())
            .filter(|entry| entry.generation == id.generation())
            .and_then(|entry| entry.node.as_ref())
            .ok_or(TransformError::NoSuchNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.entries
            .get_mut(id.index())
            .filter(|entry| entry.generation == id.generation())
            .and_then(|entry| entry.node.as_mut())
            .ok_or(TransformError::NoSuchNode(id))
    }

    /// Number of live nodes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree has no live nodes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `id` refers to a live node
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Iterate over every live node
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .node
                .as_ref()
                .map(|_| NodeId::new(index, entry.generation))
        })
    }

    /// Iterate over every root node
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .node
                .as_ref()
                .filter(|node| node.parent.is_none())
                .map(|_| NodeId::new(index, entry.generation))
        })
    }

    /// Local parameters of a node
    pub fn transform(&self, id: NodeId) -> Result<Transform2D> {
        Ok(self.node(id)?.transform)
    }

    // -------------------------------------------------------------------------
    // Creation / Destruction
    // -------------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let entry = &mut self.entries[index];
            entry.node = Some(node);
            NodeId::new(index, entry.generation)
        } else {
            let index = self.entries.len();
            self.entries.push(Entry {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    fn free(&mut self, id: NodeId) -> Option<Node> {
        let entry = self
            .entries
            .get_mut(id.index())
            .filter(|entry| entry.generation == id.generation())?;
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.push(id.index());
        self.len -= 1;
        Some(node)
    }

    /// Create a parentless node.
    pub fn spawn(&mut self, transform: Transform2D) -> NodeId {
        self.alloc(Node::new(transform))
    }

    /// Create a node, attaching it to `desc.parent` and attaching each of
    /// `desc.children` to it.
    ///
    /// # Errors
    ///
    /// - [`TransformError::NoSuchNode`] if any handle is stale
    /// - [`TransformError::Cycle`] if a requested child is the requested parent
    ///   or one of its ancestors
    ///
    /// Nothing is allocated when an error is returned.
    pub fn create(&mut self, desc: NodeDesc) -> Result<NodeId> {
        for &child in &desc.children {
            self.node(child)?;
        }
        if let Some(parent) = desc.parent {
            self.node(parent)?;
            for &child in &desc.children {
                self.check_attach(parent, child)?;
            }
        }

        let id = self.spawn(desc.transform);
        if let Some(parent) = desc.parent {
            self.attach(parent, id)?;
        }
        for child in desc.children {
            if self.node(child)?.parent != Some(id) {
                self.attach(id, child)?;
            }
        }
        Ok(id)
    }

    /// Create a parentless node with the same local parameters as `id`.
    ///
    /// Children are not copied.
    pub fn clone_node(&mut self, id: NodeId) -> Result<NodeId> {
        let transform = self.node(id)?.transform;
        Ok(self.spawn(transform))
    }

    /// Destroy a single node.
    ///
    /// The node is detached from its parent. Its children are not destroyed;
    /// they become roots and keep their local parameters.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        self.make_root(id)?;
        let Some(node) = self.free(id) else {
            return Err(TransformError::NoSuchNode(id));
        };
        for &child in &node.children {
            self.node_mut(child)?.parent = None;
            self.invalidate(child);
        }
        log::debug!("Destroyed {id}, {} children became roots", node.children.len());
        Ok(())
    }

    /// Destroy a node together with all of its descendants.
    ///
    /// Returns the number of nodes destroyed.
    pub fn destroy_subtree(&mut self, id: NodeId) -> Result<usize> {
        self.make_root(id)?;
        let mut stack: SmallVec<[NodeId; 16]> = smallvec![id];
        let mut count = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.free(current) {
                stack.extend(node.children.iter().copied());
                count += 1;
            }
        }
        log::debug!("Destroyed subtree at {id} ({count} nodes)");
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Parent of a node, `None` for roots
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a node in insertion order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children.as_slice())
    }

    /// Number of children
    pub fn child_count(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.children.len())
    }

    /// Child at `index`.
    ///
    /// # Errors
    ///
    /// [`TransformError::IndexOutOfBounds`] if `index >= child_count`.
    pub fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        let children = &self.node(id)?.children;
        children
            .get(index)
            .copied()
            .ok_or(TransformError::IndexOutOfBounds {
                index,
                len: children.len(),
            })
    }

    /// Whether the node has no parent
    pub fn is_root(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.parent.is_none())
    }

    /// Whether the node has no children
    pub fn is_leaf(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.children.is_empty())
    }

    /// Topmost ancestor of a node (the node itself for roots). O(depth).
    pub fn root(&self, id: NodeId) -> Result<NodeId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Number of ancestors above a node
    pub fn depth(&self, id: NodeId) -> Result<usize> {
        let mut depth = 0;
        let mut cursor = self.node(id)?.parent;
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.node(parent)?.parent;
        }
        Ok(depth)
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> Result<bool> {
        self.node(ancestor)?;
        let mut cursor = self.node(id)?.parent;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return Ok(true);
            }
            cursor = self.node(parent)?.parent;
        }
        Ok(false)
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if child == parent || self.is_ancestor_of(child, parent)? {
            return Err(TransformError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Attach `child` under `parent`.
    ///
    /// The child's local parameters are kept, so its world placement
    /// generally changes. A child that already belongs to `parent` is left
    /// alone; one that belongs elsewhere is detached first.
    ///
    /// # Errors
    ///
    /// [`TransformError::Cycle`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        if self.node(child)?.parent == Some(parent) {
            return Ok(());
        }
        self.check_attach(parent, child)?;
        self.attach(parent, child)
    }

    /// Attach `child` under `parent`, rewriting its local parameters so its
    /// world placement is unchanged.
    ///
    /// # Errors
    ///
    /// - [`TransformError::Cycle`] as for [`add_child`](Self::add_child)
    /// - [`TransformError::Shear`] if the required local matrix contains
    ///   shear (non-uniform scale under rotation), which position, rotation,
    ///   and scale cannot express
    /// - [`TransformError::Degenerate`] if either world matrix is undefined
    pub fn add_child_preserving_world_transform(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<()> {
        self.node(parent)?;
        if self.node(child)?.parent == Some(parent) {
            return Ok(());
        }
        self.check_attach(parent, child)?;

        let child_world = self.matrices(child)?.local_to_world;
        let parent_inverse = self.matrices(parent)?.world_to_local;
        let transform = self.decompose(child, parent_inverse * child_world)?;

        self.node_mut(child)?.transform = transform;
        self.attach(parent, child)
    }

    /// Detach `child` from `parent`.
    ///
    /// Returns `false` without changing anything if `child` is not a child
    /// of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Ok(false);
        }
        self.make_root(child)?;
        Ok(true)
    }

    /// Detach a node from its parent. No-op for roots.
    pub fn make_root(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.unlink(id)? {
            self.invalidate(id);
            log::debug!("Detached {id} from {parent}");
        }
        Ok(())
    }

    /// Detach a node from its parent, rewriting its local parameters so its
    /// world placement is unchanged.
    ///
    /// # Errors
    ///
    /// [`TransformError::Shear`] if the node's world matrix contains shear.
    pub fn make_root_preserving_world_transform(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.parent.is_none() {
            return Ok(());
        }
        let world = self.matrices(id)?.local_to_world;
        let transform = self.decompose(id, world)?;
        self.node_mut(id)?.transform = transform;
        self.make_root(id)
    }

    /// Remove the parent link and the parent's child entry. Returns the old
    /// parent. Caches are left untouched.
    fn unlink(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        let Some(parent) = self.node_mut(id)?.parent.take() else {
            return Ok(None);
        };
        self.node_mut(parent)?.remove_child(id);
        Ok(Some(parent))
    }

    /// Link a validated pair and invalidate the moved subtree.
    fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.unlink(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.invalidate(child);
        log::debug!("Attached {child} under {parent}");
        Ok(())
    }

    /// Local parameters reproducing `matrix` for node `id`.
    fn decompose(&self, id: NodeId, matrix: DAffine2) -> Result<Transform2D> {
        let transform = Transform2D::from_matrix(matrix);
        let tolerance = self.config.epsilon * (1.0 + matrix.translation.length());
        if !transform.matrix().abs_diff_eq(matrix, tolerance) {
            log::warn!("Cannot preserve world transform of {id}: matrix has shear");
            return Err(TransformError::Shear { node: id });
        }
        Ok(transform)
    }

    // -------------------------------------------------------------------------
    // Parameter Mutation
    // -------------------------------------------------------------------------

    fn modify(&mut self, id: NodeId, f: impl FnOnce(&mut Transform2D)) -> Result<()> {
        let node = self.node_mut(id)?;
        let before = node.transform;
        f(&mut node.transform);
        if node.transform != before {
            self.invalidate(id);
        }
        Ok(())
    }

    /// Replace all local parameters
    pub fn set_transform(&mut self, id: NodeId, transform: Transform2D) -> Result<()> {
        self.modify(id, |t| *t = transform)
    }

    /// Set the local position
    pub fn set_position(&mut self, id: NodeId, position: DVec2) -> Result<()> {
        self.modify(id, |t| t.position = position)
    }

    /// Set the local scale
    pub fn set_scale(&mut self, id: NodeId, scale: DVec2) -> Result<()> {
        self.modify(id, |t| t.scale = scale)
    }

    /// Set the same local scale on both axes
    pub fn set_uniform_scale(&mut self, id: NodeId, factor: f64) -> Result<()> {
        self.modify(id, |t| t.scale = DVec2::splat(factor))
    }

    /// Set the local rotation in radians
    pub fn set_rotation(&mut self, id: NodeId, rotation: f64) -> Result<()> {
        self.modify(id, |t| t.rotation = rotation)
    }

    /// Offset the local position
    pub fn translate(&mut self, id: NodeId, delta: DVec2) -> Result<()> {
        self.modify(id, |t| t.position += delta)
    }

    /// Add to the local rotation
    pub fn rotate(&mut self, id: NodeId, angle: f64) -> Result<()> {
        self.modify(id, |t| t.rotation += angle)
    }

    /// Multiply the local scale component-wise
    pub fn scale_by(&mut self, id: NodeId, factor: DVec2) -> Result<()> {
        self.modify(id, |t| t.scale *= factor)
    }

    /// Multiply the local scale uniformly
    pub fn scale_by_factor(&mut self, id: NodeId, factor: f64) -> Result<()> {
        self.modify(id, |t| t.scale *= factor)
    }

    /// Compare the local parameters of two nodes within the configured epsilon
    pub fn local_equals(&self, a: NodeId, b: NodeId) -> Result<bool> {
        let a = self.node(a)?.transform;
        let b = self.node(b)?.transform;
        Ok(a.approx_eq(&b, self.config.epsilon))
    }

    // -------------------------------------------------------------------------
    // Matrix Cache
    // -------------------------------------------------------------------------

    /// Drop the caches of `id` and every descendant.
    ///
    /// Stops at subtrees that are already invalid: a valid cache implies every
    /// ancestor cache is valid, so nothing below an invalid node can be valid.
    fn invalidate(&self, id: NodeId) {
        let mut stack: SmallVec<[NodeId; 16]> = smallvec![id];
        let mut count = 0;
        while let Some(current) = stack.pop() {
            let Ok(node) = self.node(current) else {
                continue;
            };
            if node.cache.invalidate() {
                count += 1;
                stack.extend(node.children.iter().copied());
            }
        }
        if count > 0 {
            log::trace!("Invalidated {count} caches below {id}");
            self.update_stats(|stats| stats.invalidations += count);
        }
    }

    /// All four matrices of a node, computing them (and any invalid ancestor
    /// matrices) if needed.
    ///
    /// # Errors
    ///
    /// [`TransformError::Degenerate`] naming the first node on the path from
    /// the topmost invalid ancestor down to `id` whose matrices cannot be
    /// inverted. Ancestors above that node keep their freshly computed caches.
    pub fn matrices(&self, id: NodeId) -> Result<NodeMatrices> {
        let node = self.node(id)?;
        if let Some(matrices) = node.cache.get() {
            return Ok(matrices);
        }

        // Collect the invalid chain up to the first valid ancestor.
        let mut chain: SmallVec<[NodeId; 16]> = smallvec![id];
        let mut parent_world = None;
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let parent_node = self.node(parent)?;
            if let Some(matrices) = parent_node.cache.get() {
                parent_world = Some(matrices.local_to_world);
                break;
            }
            chain.push(parent);
            cursor = parent_node.parent;
        }

        let mut computed = None;
        for &current in chain.iter().rev() {
            let node = self.node(current)?;
            let matrices = NodeMatrices::compute(&node.transform, parent_world)
                .ok_or(TransformError::Degenerate { node: current })?;
            node.cache.set(matrices);
            self.update_stats(|stats| stats.recomputations += 1);
            parent_world = Some(matrices.local_to_world);
            computed = Some(matrices);
        }
        log::trace!("Recomputed {} caches for {id}", chain.len());

        computed.ok_or(TransformError::NoSuchNode(id))
    }

    /// Whether the node's matrices are currently cached
    pub fn is_cache_valid(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.cache.is_valid())
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    /// Cache activity counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// Zero the cache activity counters
    pub fn reset_stats(&self) {
        self.stats.set(CacheStats::default());
    }
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Transform2D {
        Transform2D::from_position(DVec2::new(x, y))
    }

    /// root -> a -> b, plus a sibling c under root
    fn chain() -> (TransformTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = TransformTree::new();
        let root = tree.spawn(Transform2D::new());
        let a = tree.spawn(at(1.0, 0.0));
        let b = tree.spawn(at(0.0, 1.0));
        let c = tree.spawn(at(2.0, 2.0));
        tree.add_child(root, a).unwrap();
        tree.add_child(a, b).unwrap();
        tree.add_child(root, c).unwrap();
        (tree, root, a, b, c)
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_child_links_both_sides() {
        let (tree, root, a, b, c) = chain();

        assert_eq!(tree.parent(a).unwrap(), Some(root));
        assert_eq!(tree.children(root).unwrap(), &[a, c]);
        assert_eq!(tree.children(a).unwrap(), &[b]);
        assert!(tree.is_root(root).unwrap());
        assert!(tree.is_leaf(b).unwrap());
        assert!(!tree.is_leaf(a).unwrap());
        assert_eq!(tree.child_count(root).unwrap(), 2);
        assert_eq!(tree.depth(b).unwrap(), 2);
    }

    #[test]
    fn test_add_child_same_parent_is_noop() {
        let (mut tree, root, a, _, c) = chain();
        tree.add_child(root, a).unwrap();
        assert_eq!(tree.children(root).unwrap(), &[a, c]);
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let (mut tree, root, a, b, c) = chain();
        tree.add_child(c, b).unwrap();

        assert!(tree.children(a).unwrap().is_empty());
        assert_eq!(tree.children(c).unwrap(), &[b]);
        assert_eq!(tree.parent(b).unwrap(), Some(c));
        assert_eq!(tree.root(b).unwrap(), root);
    }

    #[test]
    fn test_add_self_is_cycle() {
        let (mut tree, root, ..) = chain();
        assert_eq!(
            tree.add_child(root, root),
            Err(TransformError::Cycle {
                parent: root,
                child: root
            })
        );
    }

    #[test]
    fn test_add_ancestor_is_cycle_and_leaves_tree_intact() {
        let (mut tree, root, a, b, c) = chain();
        let err = tree.add_child(b, root).unwrap_err();
        assert_eq!(
            err,
            TransformError::Cycle {
                parent: b,
                child: root
            }
        );

        assert!(tree.is_root(root).unwrap());
        assert_eq!(tree.children(root).unwrap(), &[a, c]);
        assert!(tree.is_leaf(b).unwrap());
        assert!(matches!(tree.add_child(b, a), Err(TransformError::Cycle { .. })));
    }

    #[test]
    fn test_make_root_is_idempotent() {
        let (mut tree, root, a, _, c) = chain();
        tree.make_root(root).unwrap();
        assert!(tree.is_root(root).unwrap());
        assert_eq!(tree.children(root).unwrap(), &[a, c]);

        tree.make_root(a).unwrap();
        tree.make_root(a).unwrap();
        assert!(tree.is_root(a).unwrap());
        assert_eq!(tree.children(root).unwrap(), &[c]);
    }

    #[test]
    fn test_remove_child_only_detaches_own_children() {
        let (mut tree, root, a, b, _) = chain();
        assert!(!tree.remove_child(root, b).unwrap());
        assert_eq!(tree.parent(b).unwrap(), Some(a));

        assert!(tree.remove_child(a, b).unwrap());
        assert!(tree.is_root(b).unwrap());
        assert!(tree.is_leaf(a).unwrap());
        assert_eq!(tree.parent(a).unwrap(), Some(root));
    }

    #[test]
    fn test_child_index_bounds() {
        let (tree, root, a, _, c) = chain();
        assert_eq!(tree.child(root, 0).unwrap(), a);
        assert_eq!(tree.child(root, 1).unwrap(), c);
        assert_eq!(
            tree.child(root, 2),
            Err(TransformError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_roots_lists_every_tree() {
        let (mut tree, root, ..) = chain();
        let lone = tree.spawn(Transform2D::new());
        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(roots, vec![root, lone]);
        assert_eq!(tree.iter().count(), 5);
    }

    #[test]
    fn test_create_with_parent_and_children() {
        let mut tree = TransformTree::new();
        let parent = tree.spawn(Transform2D::new());
        let kid1 = tree.spawn(at(1.0, 0.0));
        let kid2 = tree.spawn(at(2.0, 0.0));

        let id = tree
            .create(
                NodeDesc::new(at(5.0, 0.0))
                    .with_parent(parent)
                    .with_children([kid1, kid2, kid1]),
            )
            .unwrap();

        assert_eq!(tree.parent(id).unwrap(), Some(parent));
        assert_eq!(tree.children(id).unwrap(), &[kid1, kid2]);
        assert_eq!(tree.children(parent).unwrap(), &[id]);
    }

    #[test]
    fn test_create_rejects_ancestor_child_without_allocating() {
        let (mut tree, root, _, b, _) = chain();
        let before = tree.len();

        let result = tree.create(NodeDesc::default().with_parent(b).with_child(root));
        assert_eq!(
            result,
            Err(TransformError::Cycle {
                parent: b,
                child: root
            })
        );
        assert_eq!(tree.len(), before);
        assert!(tree.is_root(root).unwrap());
    }

    #[test]
    fn test_create_rejects_parent_listed_as_child() {
        let (mut tree, _, a, _, _) = chain();
        let before = tree.len();

        let result = tree.create(NodeDesc::default().with_parent(a).with_child(a));
        assert_eq!(result, Err(TransformError::Cycle { parent: a, child: a }));
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn test_create_without_parent_validates_children() {
        let (mut tree, root, ..) = chain();
        let ghost = tree.spawn(Transform2D::new());
        tree.destroy(ghost).unwrap();
        let before = tree.len();

        let result = tree.create(NodeDesc::default().with_children([root, ghost]));
        assert_eq!(result, Err(TransformError::NoSuchNode(ghost)));
        assert_eq!(tree.len(), before);
        assert!(tree.is_root(root).unwrap());
    }

    #[test]
    fn test_destroy_orphans_become_roots() {
        let (mut tree, root, a, b, c) = chain();
        tree.destroy(a).unwrap();

        assert!(!tree.contains(a));
        assert_eq!(tree.children(root).unwrap(), &[c]);
        assert!(tree.is_root(b).unwrap());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.parent(a), Err(TransformError::NoSuchNode(a)));
    }

    #[test]
    fn test_destroy_subtree() {
        let (mut tree, root, a, b, c) = chain();
        assert_eq!(tree.destroy_subtree(a).unwrap(), 2);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.children(root).unwrap(), &[c]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut tree = TransformTree::new();
        let old = tree.spawn(Transform2D::new());
        tree.destroy(old).unwrap();
        let new = tree.spawn(Transform2D::new());

        let index: usize = new.index();
        assert_eq!(old.index(), index);
        assert_ne!(old, new);
        assert!(!tree.contains(old));
        assert!(tree.contains(new));
        assert_eq!(tree.add_child(new, old), Err(TransformError::NoSuchNode(old)));

        // A stale handle never frees the slot's new occupant
        assert_eq!(tree.destroy(old), Err(TransformError::NoSuchNode(old)));
        assert_eq!(tree.destroy_subtree(old), Err(TransformError::NoSuchNode(old)));
        assert!(tree.contains(new));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_clone_node_is_parentless_copy() {
        let (mut tree, _, a, _, _) = chain();
        tree.set_rotation(a, 0.3).unwrap();
        let copy = tree.clone_node(a).unwrap();

        assert!(tree.is_root(copy).unwrap());
        assert!(tree.is_leaf(copy).unwrap());
        assert!(tree.local_equals(a, copy).unwrap());
        assert_eq!(tree.transform(copy).unwrap(), tree.transform(a).unwrap());
    }

    // -------------------------------------------------------------------------
    // Cache
    // -------------------------------------------------------------------------

    #[test]
    fn test_read_validates_whole_ancestor_chain() {
        let (tree, root, a, b, c) = chain();
        assert!(!tree.is_cache_valid(root).unwrap());

        tree.matrices(b).unwrap();
        assert!(tree.is_cache_valid(root).unwrap());
        assert!(tree.is_cache_valid(a).unwrap());
        assert!(tree.is_cache_valid(b).unwrap());
        assert!(!tree.is_cache_valid(c).unwrap());
        assert_eq!(tree.stats().recomputations, 3);
    }

    #[test]
    fn test_repeated_reads_are_memoized() {
        let (tree, _, _, b, _) = chain();
        let first = tree.matrices(b).unwrap();
        tree.reset_stats();

        let second = tree.matrices(b).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.stats().recomputations, 0);
    }

    #[test]
    fn test_mutation_invalidates_descendants_not_ancestors() {
        let (mut tree, root, a, b, c) = chain();
        tree.matrices(b).unwrap();
        tree.matrices(c).unwrap();

        tree.translate(a, DVec2::new(1.0, 0.0)).unwrap();
        assert!(tree.is_cache_valid(root).unwrap());
        assert!(tree.is_cache_valid(c).unwrap());
        assert!(!tree.is_cache_valid(a).unwrap());
        assert!(!tree.is_cache_valid(b).unwrap());

        tree.reset_stats();
        tree.matrices(b).unwrap();
        assert_eq!(tree.stats().recomputations, 2);
    }

    #[test]
    fn test_invalidation_short_circuits() {
        let (mut tree, root, _, b, _) = chain();
        tree.matrices(b).unwrap();
        tree.reset_stats();

        tree.rotate(root, 0.5).unwrap();
        // root, a, b were valid; c was never computed
        assert_eq!(tree.stats().invalidations, 3);

        tree.rotate(root, 0.5).unwrap();
        assert_eq!(tree.stats().invalidations, 3);
    }

    #[test]
    fn test_setting_same_value_keeps_cache() {
        let (mut tree, _, a, _, _) = chain();
        tree.matrices(a).unwrap();
        tree.set_position(a, DVec2::new(1.0, 0.0)).unwrap();
        assert!(tree.is_cache_valid(a).unwrap());
    }

    #[test]
    fn test_reparent_invalidates_moved_subtree() {
        let (mut tree, root, a, b, c) = chain();
        tree.matrices(b).unwrap();
        tree.matrices(c).unwrap();

        tree.add_child(c, a).unwrap();
        assert!(!tree.is_cache_valid(a).unwrap());
        assert!(!tree.is_cache_valid(b).unwrap());
        assert!(tree.is_cache_valid(c).unwrap());
        assert!(tree.is_cache_valid(root).unwrap());
    }

    #[test]
    fn test_destroy_invalidates_orphans() {
        let (mut tree, _, a, b, _) = chain();
        tree.matrices(b).unwrap();
        tree.destroy(a).unwrap();
        assert!(!tree.is_cache_valid(b).unwrap());

        let world = tree.matrices(b).unwrap().local_to_world;
        assert_eq!(world.translation, DVec2::new(0.0, 1.0));
    }

    #[test]
    fn test_degenerate_keeps_cache_invalid() {
        let (mut tree, root, a, b, _) = chain();
        tree.set_scale(a, DVec2::new(0.0, 1.0)).unwrap();

        assert_eq!(tree.matrices(b), Err(TransformError::Degenerate { node: a }));
        assert!(tree.is_cache_valid(root).unwrap());
        assert!(!tree.is_cache_valid(a).unwrap());
        assert!(!tree.is_cache_valid(b).unwrap());

        tree.set_scale(a, DVec2::ONE).unwrap();
        assert!(tree.matrices(b).is_ok());
    }

    #[test]
    fn test_scale_mutators() {
        let mut tree = TransformTree::new();
        let n = tree.spawn(Transform2D::new());
        tree.scale_by(n, DVec2::new(2.0, 3.0)).unwrap();
        tree.scale_by_factor(n, 2.0).unwrap();
        assert_eq!(tree.transform(n).unwrap().scale, DVec2::new(4.0, 6.0));

        tree.set_uniform_scale(n, 0.5).unwrap();
        assert_eq!(tree.transform(n).unwrap().scale, DVec2::splat(0.5));
    }

    #[test]
    fn test_config_epsilon_drives_local_equals() {
        let mut tree = TransformTree::with_config(TreeConfig::default().with_epsilon(0.1));
        let a = tree.spawn(at(1.0, 1.0));
        let b = tree.spawn(at(1.05, 1.0));
        assert!(tree.local_equals(a, b).unwrap());

        let mut strict = TransformTree::new();
        let a = strict.spawn(at(1.0, 1.0));
        let b = strict.spawn(at(1.05, 1.0));
        assert!(!strict.local_equals(a, b).unwrap());
    }
}
