// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reparent registry and reconciler extension for retained UI trees.
//!
//! `reparent_core` lets a tree description mark a subtree as *reparentable*.
//! When a later description moves that subtree somewhere else, the built
//! output (and any live component state inside it) is transferred to the new
//! location instead of being destroyed and rebuilt. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   Owner ──► create_handle() ──► ReparentHandle
//!                                     │ place(descriptor)
//!                                     ▼
//!   Node tree ──► Reconciler::commit() ──► resolve() ──► Redirect
//!                      │                                   │
//!                      ▼                                   ▼
//!                   sweep() ──► Renderer::{attach, detach_but_retain, destroy}
//! ```
//!
//! **[`descriptor`]**: Immutable per-pass tree descriptions: [`Node`],
//! [`SubtreeDescriptor`], and the [`PlacementMarker`] a handle produces.
//!
//! **[`handle`]**: [`ReparentHandle`]: stable identity for a subtree, with
//! `place` and `release`.
//!
//! **[`owner`]**: Owner lifecycle hook. Unmounting an owner force-releases
//! every handle it created.
//!
//! **[`registry`]**: [`ReparentRegistry`]: per-root table of retained
//! entries, generation tracking, and the end-of-commit sweep.
//!
//! **[`reconcile`]**: [`Reconciler`]: the commit driver. It diffs ordinary
//! nodes positionally and redirects placement markers through the registry.
//!
//! **[`renderer`]**: The [`Renderer`] trait a backend implements to receive
//! create, update, attach, detach, and destroy commands.
//!
//! **[`diagnostic`]**: Structured warnings for misuse; never fatal.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! commit instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! **[`tree`]**: [`NodeStore`](tree::NodeStore), a struct-of-arrays retained
//! node tree that implements [`Renderer`].
//!
//! **[`dirty`]**: Dirty-channel constants used by the node tree.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-command
//!   renderer events.
//!
//! [`Node`]: descriptor::Node
//! [`SubtreeDescriptor`]: descriptor::SubtreeDescriptor
//! [`PlacementMarker`]: descriptor::PlacementMarker
//! [`ReparentHandle`]: handle::ReparentHandle
//! [`ReparentRegistry`]: registry::ReparentRegistry
//! [`Reconciler`]: reconcile::Reconciler
//! [`Renderer`]: renderer::Renderer

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod descriptor;
pub mod diagnostic;
pub mod dirty;
pub mod handle;
pub mod owner;
pub mod reconcile;
pub mod registry;
pub mod renderer;
pub mod trace;
pub mod tree;
