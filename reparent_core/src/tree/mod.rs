// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained node tree.
//!
//! [`NodeStore`] is the reference [`Renderer`](crate::renderer::Renderer):
//! the reconciler's commands land here as real tree mutations. Each node has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes stale when
//!   the node is destroyed, so use-after-destroy is caught at the API level.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Detached subtrees are simply parentless roots.
//! - **Rendered properties** written by the reconciler: kind and props.
//! - **Local state**: an opaque per-node slot standing in for component state.
//!   The reconciler never touches it, so it survives detach and reuse and is
//!   lost only when the node is destroyed.
//! - **Computed properties** produced by [`evaluate`](NodeStore::evaluate):
//!   `effective_retained` (the node or an ancestor is detached but retained).
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Dirty tracking
//!
//! Mutations mark the channels in [`dirty`](crate::dirty):
//!
//! - **RETAINED**: propagates to all descendants.
//! - **PROPS**: local-only.
//! - **TOPOLOGY**: structural changes that trigger a traversal-order rebuild.

mod evaluate;
mod render;
mod store;

pub use evaluate::TreeChanges;
pub use store::{NodeId, NodeStore};
