// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::string::String;
use alloc::vec::Vec;

use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::descriptor::Props;
use crate::dirty;

/// Slot index meaning "no node" in the topology arrays.
pub(super) const NONE: u32 = u32::MAX;

/// A node in a [`NodeStore`].
///
/// Pairs a slot with the slot's generation at creation time. Once the node is
/// destroyed and the slot recycled, the old id no longer validates.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the slot index. Only meaningful for diagnostics.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns how many times the slot had been recycled when this node was
    /// created.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Rendered properties --
    pub(crate) kind: Vec<String>,
    pub(crate) props: Vec<Props>,
    pub(crate) retained: Vec<bool>,

    // -- Local state (never written by the reconciler) --
    pub(crate) state: Vec<u64>,

    // -- Computed properties (written by evaluate) --
    pub(crate) effective_retained: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty node store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            props: Vec::new(),
            retained: Vec::new(),
            state: Vec::new(),
            effective_retained: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new parentless node and returns its handle.
    ///
    /// Local state starts at zero.
    pub fn create_node(&mut self, kind: &str, props: Props) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = NONE;
            self.first_child[i] = NONE;
            self.next_sibling[i] = NONE;
            self.prev_sibling[i] = NONE;
            self.kind[i] = String::from(kind);
            self.props[i] = props;
            self.retained[i] = false;
            self.state[i] = 0;
            self.effective_retained[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(NONE);
            self.first_child.push(NONE);
            self.next_sibling.push(NONE);
            self.prev_sibling.push(NONE);
            self.kind.push(String::from(kind));
            self.props.push(props);
            self.retained.push(false);
            self.state.push(0);
            self.effective_retained.push(false);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// The node is unlinked from its parent first if it has one.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (destroy or move them first) or if the
    /// handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == NONE,
            "cannot destroy node with children"
        );

        if self.parent[idx as usize] != NONE {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.props[idx as usize].clear();

        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == NONE,
            "child already has a parent"
        );
        self.link(parent.idx, child.idx, NONE);
    }

    /// Places `child` at position `index` among `parent`'s children.
    ///
    /// If `child` is linked anywhere else (including elsewhere under the same
    /// parent) it is moved. An `index` past the end appends. Placing a child
    /// at the position it already occupies is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` is `parent` or one of
    /// its ancestors.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(!self.is_ancestor_or_self(c, p), "cycle in node tree");

        if self.parent[c as usize] == p && self.nth_child(p, index) == c {
            return;
        }

        if self.parent[c as usize] != NONE {
            let old_p = self.parent[c as usize];
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, old_p, dirty::RETAINED);
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }

        let before = self.nth_child(p, index);
        self.link(p, c, before);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != NONE, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::RETAINED);

        self.dirty.mark_with(c, dirty::RETAINED, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.id_at(self.parent[id.idx as usize])
    }

    /// Returns the direct children of a node, in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.validate(id);
        let first = self.id_at(self.first_child[id.idx as usize]);
        core::iter::successors(first, move |prev| self.id_at(self.next_sibling[prev.idx as usize]))
    }

    /// Returns the handles of root nodes (those with no parent).
    ///
    /// Detached-but-retained subtrees show up here alongside the mount
    /// points.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == NONE && !self.free_list.contains(&idx) {
                roots.extend(self.id_at(idx));
            }
        }
        roots
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &str {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// Returns the properties of a node.
    #[must_use]
    pub fn props(&self, id: NodeId) -> &Props {
        self.validate(id);
        &self.props[id.idx as usize]
    }

    /// Returns a single property of a node.
    #[must_use]
    pub fn prop(&self, id: NodeId, key: &str) -> Option<&str> {
        self.props(id).get(key).map(String::as_str)
    }

    /// Returns the node's local state slot.
    #[must_use]
    pub fn state(&self, id: NodeId) -> u64 {
        self.validate(id);
        self.state[id.idx as usize]
    }

    /// Returns whether the node itself is detached but retained.
    #[must_use]
    pub fn is_retained(&self, id: NodeId) -> bool {
        self.validate(id);
        self.retained[id.idx as usize]
    }

    /// Returns whether the node or any ancestor is detached but retained.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_retained(&self, id: NodeId) -> bool {
        self.validate(id);
        self.effective_retained[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty) --

    /// Replaces the properties of a node.
    pub fn set_props(&mut self, id: NodeId, props: Props) {
        self.validate(id);
        self.props[id.idx as usize] = props;
        self.dirty.mark(id.idx, dirty::PROPS);
    }

    /// Writes the node's local state slot.
    ///
    /// Local state is not rendered, so nothing is marked dirty.
    pub fn set_state(&mut self, id: NodeId, state: u64) {
        self.validate(id);
        self.state[id.idx as usize] = state;
    }

    /// Sets whether the node is detached but retained.
    ///
    /// Marks the RETAINED channel dirty with eager propagation to descendants.
    pub fn set_retained(&mut self, id: NodeId, retained: bool) {
        self.validate(id);
        if self.retained[id.idx as usize] == retained {
            return;
        }
        self.retained[id.idx as usize] = retained;
        self.dirty.mark_with(id.idx, dirty::RETAINED, &EagerPolicy);
    }

    // -- Raw-index accessors for backends --
    //
    // These accept raw slot indices (as found in `TreeChanges`) rather than
    // `NodeId` handles, skipping generation validation.

    /// Returns the kind at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn kind_at(&self, idx: u32) -> &str {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.kind[idx as usize]
    }

    /// Returns the properties at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn props_at(&self, idx: u32) -> &Props {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.props[idx as usize]
    }

    /// Returns whether the node at raw slot `idx` is effectively retained.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn effective_retained_at(&self, idx: u32) -> bool {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.effective_retained[idx as usize]
    }

    // -- Internal helpers --

    /// Returns the current id of slot `idx`, or `None` for [`NONE`].
    fn id_at(&self, idx: u32) -> Option<NodeId> {
        (idx != NONE).then(|| NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Returns the slot of the `n`th child of `p`, or [`NONE`] past the end.
    fn nth_child(&self, p: u32, n: usize) -> u32 {
        let mut cur = self.first_child[p as usize];
        for _ in 0..n {
            if cur == NONE {
                break;
            }
            cur = self.next_sibling[cur as usize];
        }
        cur
    }

    fn is_ancestor_or_self(&self, candidate: u32, mut idx: u32) -> bool {
        while idx != NONE {
            if idx == candidate {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    /// Links parentless `c` under `p` before sibling `before`, or last when
    /// `before` is [`NONE`].
    fn link(&mut self, p: u32, c: u32, before: u32) {
        self.parent[c as usize] = p;
        if before == NONE {
            self.next_sibling[c as usize] = NONE;
            self.prev_sibling[c as usize] = NONE;
            if self.first_child[p as usize] == NONE {
                self.first_child[p as usize] = c;
            } else {
                // Walk to last child.
                let mut last = self.first_child[p as usize];
                while self.next_sibling[last as usize] != NONE {
                    last = self.next_sibling[last as usize];
                }
                self.next_sibling[last as usize] = c;
                self.prev_sibling[c as usize] = last;
            }
        } else {
            let prev = self.prev_sibling[before as usize];
            self.next_sibling[c as usize] = before;
            self.prev_sibling[c as usize] = prev;
            if prev == NONE {
                self.first_child[p as usize] = c;
            } else {
                self.next_sibling[prev as usize] = c;
            }
            self.prev_sibling[before as usize] = c;
        }

        // Child depends on parent for RETAINED.
        let _ = self.dirty.add_dependency(c, p, dirty::RETAINED);

        self.dirty.mark_with(c, dirty::RETAINED, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != NONE {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }
        if next != NONE {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = NONE;
        self.prev_sibling[idx as usize] = NONE;
        self.next_sibling[idx as usize] = NONE;
        self.traversal_dirty = true;
    }
}
