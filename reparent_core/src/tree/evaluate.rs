// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree evaluation and change tracking.
//!
//! Evaluation follows a drain-recompute pattern for each dirty channel:
//!
//! 1. **RETAINED**: Drain dirty indices (with dependents), recompute each
//!    node's `effective_retained` as `parent_effective || retained`.
//! 2. **PROPS**: Drain dirty indices (no recomputation; backends read the
//!    current values directly from the store).
//! 3. **TOPOLOGY**: Drain and discard (the traversal order was already
//!    rebuilt at the start of evaluation if needed).
//!
//! [`TreeChanges`] uses raw slot indices (`u32`) rather than [`NodeId`]
//! handles so that backends can index directly into the store via the
//! `*_at()` accessors.
//!
//! [`NodeId`]: super::NodeId

use alloc::vec::Vec;

use super::store::NONE;
use super::store::NodeStore;
use crate::dirty;

/// The set of changes produced by a single [`NodeStore::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct TreeChanges {
    /// Nodes whose properties were replaced.
    pub updated: Vec<u32>,
    /// Nodes that became effectively retained (left the live tree but kept
    /// their state).
    pub retained: Vec<u32>,
    /// Nodes that stopped being effectively retained.
    pub restored: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl TreeChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.updated.clear();
        self.retained.clear();
        self.restored.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }
}

impl NodeStore {
    /// Evaluates the tree, recomputing dirty properties and returning the set
    /// of changes.
    pub fn evaluate(&mut self) -> TreeChanges {
        let mut changes = TreeChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut TreeChanges) {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        let dirty_retained: Vec<u32> = self
            .dirty
            .drain(dirty::RETAINED)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in dirty_retained {
            if self.free_list.contains(&idx) {
                continue;
            }
            let parent_idx = self.parent[idx as usize];
            let parent_retained =
                parent_idx != NONE && self.effective_retained[parent_idx as usize];
            let now = parent_retained || self.retained[idx as usize];
            if now != self.effective_retained[idx as usize] {
                if now {
                    changes.retained.push(idx);
                } else {
                    changes.restored.push(idx);
                }
                self.effective_retained[idx as usize] = now;
            }
        }

        changes.updated = self
            .dirty
            .drain(dirty::PROPS)
            .deterministic()
            .run()
            .collect();

        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Returns the current traversal order (depth-first pre-order), including
    /// detached subtrees.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called at least
    /// once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == NONE && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
    }

    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != NONE {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}
