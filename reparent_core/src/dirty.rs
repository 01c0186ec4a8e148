// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for the node tree.
//!
//! [`NodeStore`](crate::tree::NodeStore) uses multi-channel dirty tracking
//! (via [`understory_dirty`]) so that a backend only revisits what changed
//! since the last evaluation.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`RETAINED`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency edges
//!   from child to parent. Detaching or re-attaching a subtree marks every
//!   descendant, because a node is effectively retained whenever any
//!   ancestor is.
//!
//! - **Local-only**: [`PROPS`] is marked with the default policy. Only the
//!   updated node appears in the drain output.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on attach, detach, create, and
//!   destroy. It triggers a traversal-order rebuild during evaluation.
//!
//! # Consumption
//!
//! [`NodeStore::evaluate`](crate::tree::NodeStore::evaluate) drains all
//! channels and reports the results as
//! [`TreeChanges`](crate::tree::TreeChanges).

use understory_dirty::Channel;

/// Node properties changed. No propagation.
pub const PROPS: Channel = Channel::new(0);

/// Retained flag changed. Requires effective retained recomputation for
/// descendants.
pub const RETAINED: Channel = Channel::new(1);

/// Tree topology changed. Triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(2);
