// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer contract.
//!
//! The reconciler never owns output nodes. It drives a [`Renderer`] that
//! holds the real tree (a DOM, a native view hierarchy, or the in-crate
//! [`NodeStore`](crate::tree::NodeStore)) and refers to its nodes through the
//! renderer's copyable [`Output`](Renderer::Output) handle.
//!
//! # Command ordering within one commit
//!
//! - `create` is followed by one `attach` once the node's children have been
//!   built and attached.
//! - `attach` may be issued for a node that is already attached somewhere
//!   else, or elsewhere under the same parent. The renderer moves it.
//! - `detach_but_retain` unlinks a reparentable subtree without tearing down
//!   any of its nodes or their local state.
//! - `destroy` is issued children first, so a destroyed node has no children
//!   left. It may still be linked to a parent that survives; the renderer
//!   unlinks it.

use core::fmt::Debug;

use crate::descriptor::SubtreeDescriptor;

/// Where to link a node: child position `index` under `parent`.
///
/// Indices count rendered siblings only. An index past the end appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlacementSite<O> {
    /// The parent output node.
    pub parent: O,
    /// Child position among the parent's rendered children.
    pub index: usize,
}

/// Applies reconciler commands to a backing output tree.
///
/// # Commit pseudocode
///
/// A typical frame wires the pieces together like this:
///
/// ```rust,ignore
/// fn on_frame(state: &AppState) {
///     // Render: build a fresh description, wrapping movable panels.
///     let root = Node::from(
///         SubtreeDescriptor::new("window")
///             .with_child(sidebar.place(describe_sidebar(state))),
///     );
///
///     // Commit: diff against the previous pass and drive the renderer.
///     let summary = reconciler.commit(&mut renderer, mount, &root);
///
///     // Inspect: misuse is reported, never fatal.
///     for d in reconciler.registry().commit_errors() {
///         log(d);
///     }
/// }
/// ```
pub trait Renderer {
    /// Handle to one node of the output tree.
    type Output: Copy + Eq + Debug;

    /// Creates a parentless node for `descriptor` (children are not part of
    /// this call).
    fn create(&mut self, descriptor: &SubtreeDescriptor) -> Self::Output;

    /// Applies a property change to an existing node.
    fn update(
        &mut self,
        output: Self::Output,
        previous: &SubtreeDescriptor,
        next: &SubtreeDescriptor,
    );

    /// Links `output` at `site`, moving it if it is linked elsewhere.
    fn attach(&mut self, output: Self::Output, site: PlacementSite<Self::Output>);

    /// Unlinks `output` from the live tree, keeping it and its subtree intact
    /// for later reuse.
    fn detach_but_retain(&mut self, output: Self::Output);

    /// Permanently destroys a childless node.
    fn destroy(&mut self, output: Self::Output);
}
