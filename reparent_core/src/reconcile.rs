// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit driver with the reparenting extension.
//!
//! [`Reconciler::commit`] diffs a new tree description against a mirror of
//! the previous commit and drives a [`Renderer`]:
//!
//! 1. **Boundary**: a new generation starts. Buffered handle releases and
//!    owner unmounts are applied, tearing down their retained output.
//! 2. **Traversal**: ordinary nodes are matched by position and kind (same
//!    kind updates in place, otherwise the old node is destroyed and a new
//!    one built). Placement markers are matched by handle instead: each one
//!    is resolved to a [`Redirect`] by consulting the registry, so a subtree
//!    built in an earlier commit is reused wherever its marker now appears.
//! 3. **Sweep**: `Placed` entries that no marker referenced are detached
//!    and retained; entries whose owner is gone are destroyed.
//!
//! # Placement slots
//!
//! The mirror remembers every placement slot together with a *visit* stamp.
//! The registry entry records the stamp of the slot that currently holds its
//! output. When the diff drops a slot, its entry is only affected if the
//! stamps match: a subtree that has already moved elsewhere in this commit is
//! left alone.
//!
//! A dropped slot whose parent node survives is left in place until the
//! sweep. A dropped slot whose parent is being destroyed detaches the
//! subtree immediately so that it survives the destruction.
//!
//! # Duplicate placements
//!
//! Before traversal, the description is scanned for the last marker of each
//! handle in traversal order. Only that marker is resolved; earlier ones
//! render nothing and report [`DiagnosticKind::DuplicatePlacement`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::descriptor::{Node, PlacementMarker, SubtreeDescriptor};
use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink, IgnoreDiagnostics};
use crate::handle::{HandleId, ReparentHandle};
use crate::owner::OwnerId;
use crate::registry::{EntryState, LookupError, RegistryEntry, ReparentRegistry};
use crate::renderer::{PlacementSite, Renderer};
use crate::trace::{CommitBeginEvent, CommitSummary, Tracer, TransitionEvent};
#[cfg(feature = "trace-rich")]
use crate::trace::{RenderCommand, RenderCommandEvent};

/// Tuning knobs for a [`Reconciler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Maximum nesting depth of a description. Deeper slots render nothing
    /// and report [`DiagnosticKind::DepthLimit`].
    pub max_depth: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

/// What the reconciler does with a placement marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redirect {
    /// Build the subtree from scratch.
    Build,
    /// Reuse the retained output, update it against the new descriptor, and
    /// attach it here.
    ReuseAndUpdate,
    /// A later marker for the same handle takes the output. Report it and
    /// render nothing here.
    SkipDuplicate,
    /// Report the problem and render nothing here.
    Error(DiagnosticKind),
}

// ---------------------------------------------------------------------------
// Committed mirror
// ---------------------------------------------------------------------------

/// One child slot of the previous commit.
#[derive(Debug)]
pub(crate) enum Mounted<O> {
    Empty,
    Element(MountedElement<O>),
    Placement { handle: HandleId, visit: u64 },
}

impl<O> Default for Mounted<O> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<O> Mounted<O> {
    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A committed ordinary node.
#[derive(Debug)]
pub(crate) struct MountedElement<O> {
    pub(crate) output: O,
    /// Kind and props only.
    pub(crate) descriptor: SubtreeDescriptor,
    pub(crate) children: Vec<Mounted<O>>,
    /// Placements dropped from this node whose output may still be linked
    /// under it until the sweep.
    pub(crate) lingering: Vec<(HandleId, u64)>,
}

impl<O> MountedElement<O> {
    pub(crate) fn new(output: O, descriptor: SubtreeDescriptor) -> Self {
        Self {
            output,
            descriptor,
            children: Vec::new(),
            lingering: Vec::new(),
        }
    }
}

/// Where a list of child slots is being reconciled.
#[derive(Clone, Copy, Debug)]
struct Scope<O> {
    parent: O,
    /// Innermost reparentable subtree being reconciled.
    container: Option<HandleId>,
    depth: usize,
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

/// Per-commit state threaded through the traversal.
struct Pass<'a, 't, R: Renderer> {
    renderer: &'a mut R,
    tracer: &'a mut Tracer<'t>,
    generation: u64,
    summary: CommitSummary,
    path: Vec<usize>,
    /// Site of the authoritative marker per handle.
    last_sites: HashMap<HandleId, Vec<usize>>,
}

impl<'a, 't, R: Renderer> Pass<'a, 't, R> {
    fn new(renderer: &'a mut R, tracer: &'a mut Tracer<'t>, generation: u64) -> Self {
        Self {
            renderer,
            tracer,
            generation,
            summary: CommitSummary {
                generation,
                ..CommitSummary::default()
            },
            path: Vec::new(),
            last_sites: HashMap::new(),
        }
    }

    /// Returns whether the marker at the current site is the last one for
    /// `handle`.
    fn is_last_site(&self, handle: HandleId) -> bool {
        self.last_sites
            .get(&handle)
            .is_none_or(|site| *site == self.path)
    }

    #[cfg(feature = "trace-rich")]
    fn command(&mut self, command: RenderCommand) {
        self.tracer.render_command(&RenderCommandEvent {
            generation: self.generation,
            command,
        });
    }

    fn create(&mut self, descriptor: &SubtreeDescriptor) -> R::Output {
        #[cfg(feature = "trace-rich")]
        self.command(RenderCommand::Create);
        self.renderer.create(descriptor)
    }

    fn update(&mut self, output: R::Output, previous: &SubtreeDescriptor, next: &SubtreeDescriptor) {
        #[cfg(feature = "trace-rich")]
        self.command(RenderCommand::Update);
        self.renderer.update(output, previous, next);
    }

    fn attach(&mut self, output: R::Output, site: PlacementSite<R::Output>) {
        #[cfg(feature = "trace-rich")]
        self.command(RenderCommand::Attach);
        self.renderer.attach(output, site);
    }

    fn detach(&mut self, output: R::Output) {
        #[cfg(feature = "trace-rich")]
        self.command(RenderCommand::DetachButRetain);
        self.renderer.detach_but_retain(output);
    }

    fn destroy(&mut self, output: R::Output) {
        #[cfg(feature = "trace-rich")]
        self.command(RenderCommand::Destroy);
        self.renderer.destroy(output);
    }

    fn record(&mut self, handle: HandleId, from: EntryState, to: EntryState) {
        match to {
            EntryState::Detached => self.summary.detached += 1,
            EntryState::Released => self.summary.released += 1,
            EntryState::Unplaced | EntryState::Placed => {}
        }
        self.tracer.transition(&TransitionEvent {
            generation: self.generation,
            handle,
            from,
            to,
        });
    }

    fn transition(&mut self, entry: &mut RegistryEntry<R::Output>, to: EntryState) {
        let from = entry.state;
        if from == to {
            return;
        }
        entry.state = to;
        self.record(entry.id, from, to);
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Commit driver for one tree root.
///
/// Owns the [`ReparentRegistry`] and a mirror of the last committed
/// description. Commits are serialized by `&mut self`.
pub struct Reconciler<O> {
    registry: ReparentRegistry<O>,
    config: ReconcilerConfig,
    root: Mounted<O>,
    visits: u64,
    sink: Box<dyn DiagnosticSink>,
}

impl<O: fmt::Debug> fmt::Debug for Reconciler<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<O: Copy + Eq + fmt::Debug> Default for Reconciler<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Copy + Eq + fmt::Debug> Reconciler<O> {
    /// Creates a reconciler with the default configuration that discards
    /// diagnostics (they remain available through
    /// [`ReparentRegistry::commit_errors`]).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    /// Creates a reconciler with the given configuration.
    #[must_use]
    pub fn with_config(config: ReconcilerConfig) -> Self {
        Self {
            registry: ReparentRegistry::new(),
            config,
            root: Mounted::Empty,
            visits: 0,
            sink: Box::new(IgnoreDiagnostics),
        }
    }

    /// Routes diagnostics to `sink` from now on.
    pub fn set_diagnostic_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ReparentRegistry<O> {
        &self.registry
    }

    /// Returns the generation of the most recent commit.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    // -- Authoring surface --

    /// Registers a newly mounted owner component.
    pub fn mount_owner(&mut self) -> OwnerId {
        self.registry.mount_owner()
    }

    /// Unmounts an owner. Its handles are force-released at the next commit
    /// boundary (or [`flush`](Self::flush)).
    ///
    /// Returns `false` if the owner is unknown or already unmounting.
    pub fn unmount_owner(&mut self, owner: OwnerId) -> bool {
        self.registry.unmount_owner(owner)
    }

    /// Creates a handle bound to `owner`.
    ///
    /// If `owner` is not mounted, an [`DiagnosticKind::InvalidOwner`]
    /// diagnostic is reported and the returned handle is already released:
    /// placing it renders nothing.
    pub fn create_handle(&mut self, owner: OwnerId) -> ReparentHandle {
        if let Some(handle) = self.registry.create_handle(owner) {
            return handle;
        }
        let handle = self.registry.create_inert_handle(owner);
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::InvalidOwner,
            handle: Some(handle.id()),
            generation: self.registry.generation(),
            site: Vec::new(),
        };
        self.sink.report(&diagnostic);
        self.registry.push_diagnostic(diagnostic);
        handle
    }

    // -- Commit --

    /// Applies `root` as the new description under `mount`.
    pub fn commit<R: Renderer<Output = O>>(
        &mut self,
        renderer: &mut R,
        mount: O,
        root: &Node,
    ) -> CommitSummary {
        self.commit_traced(renderer, mount, root, &mut Tracer::none())
    }

    /// Like [`commit`](Self::commit), emitting trace events to `tracer`.
    pub fn commit_traced<R: Renderer<Output = O>>(
        &mut self,
        renderer: &mut R,
        mount: O,
        root: &Node,
        tracer: &mut Tracer<'_>,
    ) -> CommitSummary {
        let generation = self.registry.begin_generation();
        let pending = self.registry.take_pending();
        tracer.commit_begin(&CommitBeginEvent {
            generation,
            pending_releases: u32::try_from(pending.len()).unwrap_or(u32::MAX),
        });

        let mut pass = Pass::new(renderer, tracer, generation);
        self.release_all(&mut pass, pending);
        scan_last_sites(
            root,
            self.config.max_depth,
            &mut Vec::new(),
            &mut Vec::new(),
            &mut pass.last_sites,
        );

        let old = core::mem::take(&mut self.root);
        let scope = Scope {
            parent: mount,
            container: None,
            depth: 0,
        };
        // The mount point outlives every commit, so lingering root slots are
        // left to the sweep.
        let mut lingering = Vec::new();
        self.root = self.reconcile_slot(&mut pass, old, root, scope, 0, &mut lingering);

        self.sweep(&mut pass);

        let summary = pass.summary;
        pass.tracer.commit_end(&summary);
        summary
    }

    /// Applies buffered releases and owner unmounts now, outside a commit.
    pub fn flush<R: Renderer<Output = O>>(&mut self, renderer: &mut R) -> CommitSummary {
        self.flush_traced(renderer, &mut Tracer::none())
    }

    /// Like [`flush`](Self::flush), emitting trace events to `tracer`.
    pub fn flush_traced<R: Renderer<Output = O>>(
        &mut self,
        renderer: &mut R,
        tracer: &mut Tracer<'_>,
    ) -> CommitSummary {
        let pending = self.registry.take_pending();
        let mut pass = Pass::new(renderer, tracer, self.registry.generation());
        self.release_all(&mut pass, pending);
        pass.summary
    }

    /// Tears down the whole root: destroys the committed tree, unmounts every
    /// owner, and releases every handle.
    pub fn unmount<R: Renderer<Output = O>>(&mut self, renderer: &mut R) -> CommitSummary {
        let mut tracer = Tracer::none();
        let mut pass = Pass::new(renderer, &mut tracer, self.registry.generation());

        let root = core::mem::take(&mut self.root);
        self.teardown(&mut pass, root, None);

        for owner in self.registry.owners().owners() {
            self.registry.unmount_owner(owner);
        }
        let pending = self.registry.take_pending();
        self.release_all(&mut pass, pending);
        pass.summary
    }

    // -- Traversal --

    fn reconcile_slot<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        old: Mounted<O>,
        new: &Node,
        scope: Scope<O>,
        index: usize,
        lingering: &mut Vec<(HandleId, u64)>,
    ) -> Mounted<O> {
        match new {
            Node::Empty => {
                self.teardown(pass, old, Some(lingering));
                Mounted::Empty
            }
            Node::Element(descriptor) => {
                if scope.depth > self.config.max_depth {
                    self.teardown(pass, old, Some(lingering));
                    self.report(pass, DiagnosticKind::DepthLimit, None);
                    return Mounted::Empty;
                }
                let element = match old {
                    Mounted::Element(prev) if prev.descriptor.kind() == descriptor.kind() => {
                        self.update_element(pass, prev, descriptor, scope.container, scope.depth)
                    }
                    other => {
                        self.teardown(pass, other, Some(lingering));
                        self.build_element(pass, descriptor, scope.container, scope.depth)
                    }
                };
                pass.attach(
                    element.output,
                    PlacementSite {
                        parent: scope.parent,
                        index,
                    },
                );
                Mounted::Element(element)
            }
            Node::Placement(marker) => {
                let placed = self.place(pass, marker, scope, index);
                self.teardown(pass, old, Some(lingering));
                placed
            }
        }
    }

    fn reconcile_children<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        old: Vec<Mounted<O>>,
        new: &[Node],
        scope: Scope<O>,
        lingering: &mut Vec<(HandleId, u64)>,
    ) -> Vec<Mounted<O>> {
        let mut old = old.into_iter();
        let mut children = Vec::with_capacity(new.len());
        let mut rendered = 0;
        for (i, node) in new.iter().enumerate() {
            let prev = old.next().unwrap_or_default();
            pass.path.push(i);
            let slot = self.reconcile_slot(pass, prev, node, scope, rendered, lingering);
            pass.path.pop();
            if !slot.is_empty() {
                rendered += 1;
            }
            children.push(slot);
        }
        for stale in old {
            self.teardown(pass, stale, Some(&mut *lingering));
        }
        children
    }

    fn build_element<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        descriptor: &SubtreeDescriptor,
        container: Option<HandleId>,
        depth: usize,
    ) -> MountedElement<O> {
        let output = pass.create(descriptor);
        let mut element = MountedElement::new(output, descriptor.shallow());
        let scope = Scope {
            parent: output,
            container,
            depth: depth + 1,
        };
        element.children = self.reconcile_children(
            pass,
            Vec::new(),
            descriptor.children(),
            scope,
            &mut element.lingering,
        );
        element
    }

    fn update_element<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        prev: MountedElement<O>,
        descriptor: &SubtreeDescriptor,
        container: Option<HandleId>,
        depth: usize,
    ) -> MountedElement<O> {
        let MountedElement {
            output,
            descriptor: previous,
            children,
            mut lingering,
        } = prev;
        if previous.props() != descriptor.props() {
            pass.update(output, &previous, descriptor);
        }
        lingering.retain(|&(handle, visit)| self.still_holds(handle, visit));

        let scope = Scope {
            parent: output,
            container,
            depth: depth + 1,
        };
        let children =
            self.reconcile_children(pass, children, descriptor.children(), scope, &mut lingering);
        MountedElement {
            output,
            descriptor: descriptor.shallow(),
            children,
            lingering,
        }
    }

    // -- Placement --

    /// Decides what to do with a marker and marks its handle seen.
    ///
    /// `last` is false for markers superseded by a later one for the same
    /// handle. Those are not marked seen.
    fn resolve(&mut self, marker: &PlacementMarker, last: bool) -> Redirect {
        let generation = self.registry.generation();
        let entry = match self.registry.lookup_or_create(marker.handle()) {
            Ok(entry) => entry,
            Err(LookupError::Released) => {
                return Redirect::Error(DiagnosticKind::ReleasedHandle);
            }
            Err(LookupError::Unknown) => return Redirect::Error(DiagnosticKind::UnknownHandle),
        };
        if entry.building {
            return Redirect::Error(DiagnosticKind::RecursivePlacement);
        }
        if !last {
            return Redirect::SkipDuplicate;
        }
        let redirect = match entry.state {
            EntryState::Unplaced => Redirect::Build,
            EntryState::Placed | EntryState::Detached => Redirect::ReuseAndUpdate,
            EntryState::Released => Redirect::Error(DiagnosticKind::ReleasedHandle),
        };
        self.registry
            .mark_seen(marker.handle(), marker.descriptor(), generation);
        redirect
    }

    fn place<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        marker: &PlacementMarker,
        scope: Scope<O>,
        index: usize,
    ) -> Mounted<O> {
        let handle = marker.handle();
        if scope.depth > self.config.max_depth {
            self.report(pass, DiagnosticKind::DepthLimit, Some(handle));
            return Mounted::Empty;
        }
        let last = pass.is_last_site(handle);
        match self.resolve(marker, last) {
            Redirect::Build => self.build_placement(pass, marker, scope, index),
            Redirect::ReuseAndUpdate => self.reuse_placement(pass, marker, scope, index),
            Redirect::SkipDuplicate => {
                self.report(pass, DiagnosticKind::DuplicatePlacement, Some(handle));
                Mounted::Empty
            }
            Redirect::Error(kind) => {
                self.report(pass, kind, Some(handle));
                Mounted::Empty
            }
        }
    }

    fn build_placement<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        marker: &PlacementMarker,
        scope: Scope<O>,
        index: usize,
    ) -> Mounted<O> {
        let handle = marker.handle();
        if let Some(entry) = self.registry.entry_mut(handle) {
            entry.building = true;
        }
        let element = self.build_element(pass, marker.descriptor(), Some(handle), scope.depth);
        pass.summary.built += 1;
        self.finish_placement(pass, handle, element, scope, index)
    }

    fn reuse_placement<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        marker: &PlacementMarker,
        scope: Scope<O>,
        index: usize,
    ) -> Mounted<O> {
        let handle = marker.handle();
        let Some(entry) = self.registry.entry_mut(handle) else {
            return Mounted::Empty;
        };
        let Some(previous) = entry.built.take() else {
            return Mounted::Empty;
        };
        entry.building = true;
        // Unlink from the old container first: the container may end up
        // inside this subtree.
        if entry.state == EntryState::Placed
            && entry.container.is_some()
            && entry.container != scope.container
        {
            entry.site = None;
            pass.detach(previous.output);
        }

        let element = if previous.descriptor.kind() == marker.descriptor().kind() {
            pass.summary.reused += 1;
            self.update_element(pass, previous, marker.descriptor(), Some(handle), scope.depth)
        } else {
            // A different root kind cannot be updated in place.
            self.destroy_element(pass, previous);
            pass.summary.built += 1;
            self.build_element(pass, marker.descriptor(), Some(handle), scope.depth)
        };
        self.finish_placement(pass, handle, element, scope, index)
    }

    fn finish_placement<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        handle: HandleId,
        element: MountedElement<O>,
        scope: Scope<O>,
        index: usize,
    ) -> Mounted<O> {
        let site = PlacementSite {
            parent: scope.parent,
            index,
        };
        pass.attach(element.output, site);
        self.visits += 1;
        let visit = self.visits;

        let Some(entry) = self.registry.entry_mut(handle) else {
            self.destroy_element(pass, element);
            return Mounted::Empty;
        };
        entry.building = false;
        entry.built = Some(element);
        entry.site = Some(site);
        entry.container = scope.container;
        entry.visit = visit;
        pass.transition(entry, EntryState::Placed);
        Mounted::Placement { handle, visit }
    }

    /// Returns whether `handle`'s output still sits in the slot stamped
    /// `visit`.
    fn still_holds(&self, handle: HandleId, visit: u64) -> bool {
        self.registry
            .entry(handle)
            .is_some_and(|e| e.visit == visit && e.state == EntryState::Placed)
    }

    // -- Teardown --

    /// Drops a slot from the previous commit.
    ///
    /// `survivor` is the lingering list of the parent when the parent node
    /// stays, and `None` when the parent is being destroyed.
    fn teardown<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        old: Mounted<O>,
        survivor: Option<&mut Vec<(HandleId, u64)>>,
    ) {
        match old {
            Mounted::Empty => {}
            Mounted::Element(element) => self.destroy_element(pass, element),
            Mounted::Placement { handle, visit } => match survivor {
                Some(lingering) => {
                    if let Some(entry) = self.registry.entry_mut(handle)
                        && entry.visit == visit
                        && entry.state == EntryState::Placed
                        && !entry.building
                    {
                        // Unseen again, so the sweep detaches it unless a
                        // later marker claims it.
                        entry.seen = 0;
                        lingering.push((handle, visit));
                    }
                }
                None => self.orphan(pass, handle, visit),
            },
        }
    }

    /// Detaches a placed subtree right away because its parent is about to
    /// be destroyed.
    fn orphan<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        handle: HandleId,
        visit: u64,
    ) {
        if !self.still_holds(handle, visit) {
            return;
        }
        let Some(entry) = self.registry.entry_mut(handle) else {
            return;
        };
        // Already being moved by its own marker.
        if entry.building {
            return;
        }
        if let Some(output) = entry.output() {
            pass.detach(output);
        }
        entry.site = None;
        pass.transition(entry, EntryState::Detached);
    }

    /// Destroys an ordinary node, children first.
    fn destroy_element<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        element: MountedElement<O>,
    ) {
        for child in element.children {
            self.teardown(pass, child, None);
        }
        for (handle, visit) in element.lingering {
            self.orphan(pass, handle, visit);
        }
        pass.destroy(element.output);
    }

    fn release_all<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        ids: Vec<HandleId>,
    ) {
        for id in ids {
            if let Some(entry) = self.registry.release(id) {
                self.teardown_released(pass, entry);
            }
        }
    }

    fn teardown_released<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        mut entry: RegistryEntry<O>,
    ) {
        let built = entry.built.take();
        pass.transition(&mut entry, EntryState::Released);
        if let Some(element) = built {
            self.destroy_element(pass, element);
        }
    }

    fn sweep<R: Renderer<Output = O>>(&mut self, pass: &mut Pass<'_, '_, R>) {
        let swept = self.registry.sweep(pass.generation);
        for (handle, output) in swept.detached {
            pass.detach(output);
            pass.record(handle, EntryState::Placed, EntryState::Detached);
        }
        for entry in swept.released {
            self.teardown_released(pass, entry);
        }
    }

    fn report<R: Renderer<Output = O>>(
        &mut self,
        pass: &mut Pass<'_, '_, R>,
        kind: DiagnosticKind,
        handle: Option<HandleId>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            handle,
            generation: pass.generation,
            site: pass.path.clone(),
        };
        pass.summary.diagnostics += 1;
        pass.tracer.diagnostic(&diagnostic);
        self.sink.report(&diagnostic);
        self.registry.push_diagnostic(diagnostic);
    }
}

/// Records the site of the last marker per handle, in traversal order.
///
/// Mirrors the traversal: stops below `max_depth` and does not count markers
/// nested inside their own handle's descriptor.
fn scan_last_sites(
    node: &Node,
    max_depth: usize,
    path: &mut Vec<usize>,
    enclosing: &mut Vec<HandleId>,
    last: &mut HashMap<HandleId, Vec<usize>>,
) {
    if path.len() > max_depth {
        return;
    }
    let descriptor = match node {
        Node::Empty => return,
        Node::Element(descriptor) => descriptor,
        Node::Placement(marker) => {
            let handle = marker.handle();
            if enclosing.contains(&handle) {
                return;
            }
            last.insert(handle, path.clone());
            enclosing.push(handle);
            scan_children(marker.descriptor(), max_depth, path, enclosing, last);
            enclosing.pop();
            return;
        }
    };
    scan_children(descriptor, max_depth, path, enclosing, last);
}

fn scan_children(
    descriptor: &SubtreeDescriptor,
    max_depth: usize,
    path: &mut Vec<usize>,
    enclosing: &mut Vec<HandleId>,
    last: &mut HashMap<HandleId, Vec<usize>>,
) {
    for (i, child) in descriptor.children().iter().enumerate() {
        path.push(i);
        scan_last_sites(child, max_depth, path, enclosing, last);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::ops::{Deref, DerefMut};

    use super::*;
    use crate::descriptor::Props;
    use crate::tree::{NodeId, NodeStore};

    /// Node tree that counts the commands it receives.
    #[derive(Debug, Default)]
    struct Recorder {
        store: NodeStore,
        created: usize,
        updated: usize,
        detached: usize,
        destroyed: usize,
    }

    impl Deref for Recorder {
        type Target = NodeStore;

        fn deref(&self) -> &NodeStore {
            &self.store
        }
    }

    impl DerefMut for Recorder {
        fn deref_mut(&mut self) -> &mut NodeStore {
            &mut self.store
        }
    }

    impl Renderer for Recorder {
        type Output = NodeId;

        fn create(&mut self, descriptor: &SubtreeDescriptor) -> NodeId {
            self.created += 1;
            self.store.create(descriptor)
        }

        fn update(&mut self, output: NodeId, previous: &SubtreeDescriptor, next: &SubtreeDescriptor) {
            self.updated += 1;
            self.store.update(output, previous, next);
        }

        fn attach(&mut self, output: NodeId, site: PlacementSite<NodeId>) {
            self.store.attach(output, site);
        }

        fn detach_but_retain(&mut self, output: NodeId) {
            self.detached += 1;
            self.store.detach_but_retain(output);
        }

        fn destroy(&mut self, output: NodeId) {
            self.destroyed += 1;
            self.store.destroy(output);
        }
    }

    struct Harness {
        reconciler: Reconciler<NodeId>,
        store: Recorder,
        mount: NodeId,
        log: Rc<RefCell<Vec<Diagnostic>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(ReconcilerConfig::default())
        }

        fn with_config(config: ReconcilerConfig) -> Self {
            let mut store = Recorder::default();
            let mount = store.create_node("mount", Props::new());
            let mut reconciler = Reconciler::with_config(config);
            let log = Rc::new(RefCell::new(Vec::new()));
            reconciler.set_diagnostic_sink(Box::new(Rc::clone(&log)));
            Self {
                reconciler,
                store,
                mount,
                log,
            }
        }

        fn commit(&mut self, root: impl Into<Node>) -> CommitSummary {
            let root = root.into();
            self.reconciler.commit(&mut self.store, self.mount, &root)
        }

        fn output(&self, h: &ReparentHandle) -> Option<NodeId> {
            self.reconciler
                .registry()
                .entry(h.id())
                .and_then(RegistryEntry::output)
        }

        fn state(&self, h: &ReparentHandle) -> Option<EntryState> {
            self.reconciler.registry().state(h.id())
        }

        fn child(&self, parent: NodeId, i: usize) -> NodeId {
            self.store.children(parent).nth(i).unwrap()
        }

        fn kids(&self, parent: NodeId) -> Vec<NodeId> {
            self.store.children(parent).collect()
        }

        /// The `i`th site under the app node.
        fn site(&self, i: usize) -> NodeId {
            let app = self.child(self.mount, 0);
            self.child(app, i)
        }

        fn diagnostics(&self) -> Vec<DiagnosticKind> {
            self.log.borrow().iter().map(|d| d.kind).collect()
        }
    }

    fn panel(title: &str) -> SubtreeDescriptor {
        SubtreeDescriptor::new("panel")
            .with_prop("title", title)
            .with_child(SubtreeDescriptor::new("body").with_child(SubtreeDescriptor::new("counter")))
    }

    fn list(title: &str, items: &[&str]) -> SubtreeDescriptor {
        SubtreeDescriptor::new("list")
            .with_prop("title", title)
            .with_children(
                items
                    .iter()
                    .map(|label| SubtreeDescriptor::new("item").with_prop("label", *label)),
            )
    }

    /// An app node with one site per slot.
    fn sites<const N: usize>(slots: [Node; N]) -> Node {
        SubtreeDescriptor::new("app")
            .with_children(
                slots
                    .into_iter()
                    .map(|slot| SubtreeDescriptor::new("site").with_child(slot)),
            )
            .into()
    }

    #[test]
    fn handle_lifecycle_across_commits() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h1 = t.reconciler.create_handle(owner);

        // Commit 1: build at site A.
        let s = t.commit(sites([h1.place(panel("d1")).into(), Node::Empty]));
        assert_eq!(s.built, 1);
        assert_eq!(t.state(&h1), Some(EntryState::Placed));
        let out = t.output(&h1).unwrap();
        let (a, b) = (t.site(0), t.site(1));
        assert_eq!(t.store.parent(out), Some(a));
        let counter = t.child(t.child(out, 0), 0);
        t.store.set_state(counter, 41);

        // Commit 2: omitted, so detached and retained.
        let s = t.commit(sites([Node::Empty, Node::Empty]));
        assert_eq!(s.detached, 1);
        assert_eq!(t.state(&h1), Some(EntryState::Detached));
        assert!(t.store.is_alive(out));
        assert_eq!(t.store.parent(out), None);
        assert!(t.store.is_retained(out));
        assert!(t.store.children(a).next().is_none());

        // Commit 3: same descriptor at site B, reused without rebuild.
        let created = t.store.created;
        let s = t.commit(sites([Node::Empty, h1.place(panel("d1")).into()]));
        assert_eq!((s.built, s.reused), (0, 1));
        assert_eq!(t.store.created, created);
        assert_eq!(t.output(&h1), Some(out));
        assert_eq!(t.store.parent(out), Some(b));
        assert!(!t.store.is_retained(out));
        assert_eq!(t.store.state(counter), 41);
        let site = t
            .reconciler
            .registry()
            .entry(h1.id())
            .and_then(RegistryEntry::placement_site);
        assert_eq!(site, Some(PlacementSite { parent: b, index: 0 }));

        // Commit 4: the owner unmounts.
        assert!(t.reconciler.unmount_owner(owner));
        let s = t.commit(sites([Node::Empty, Node::Empty]));
        assert_eq!(s.released, 1);
        assert_eq!(t.state(&h1), Some(EntryState::Released));
        assert!(!t.store.is_alive(out));
        assert!(!t.store.is_alive(counter));
        assert!(t.reconciler.registry().is_empty());
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn duplicate_placement_last_site_wins() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h2 = t.reconciler.create_handle(owner);

        let s = t.commit(sites([
            h2.place(panel("x")).into(),
            Node::Empty,
            h2.place(panel("y")).into(),
        ]));
        assert_eq!(s.diagnostics, 1);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::DuplicatePlacement]);
        let d = &t.reconciler.registry().commit_errors()[0];
        assert_eq!(d.handle, Some(h2.id()));
        assert_eq!(d.generation, 1);
        assert_eq!(d.site, vec![0, 0], "reported at the superseded site");

        let out = t.output(&h2).unwrap();
        let (a, c) = (t.site(0), t.site(2));
        assert!(t.store.children(a).next().is_none());
        assert_eq!(t.kids(c), vec![out]);
        assert_eq!(t.store.prop(out, "title"), Some("y"));
        assert_eq!(t.store.roots(), vec![t.mount], "no stray copies");

        // A single placement afterwards is accepted and moves it back.
        let s = t.commit(sites([h2.place(panel("x")).into(), Node::Empty, Node::Empty]));
        assert_eq!(s.diagnostics, 0);
        assert!(t.reconciler.registry().commit_errors().is_empty());
        assert_eq!(t.output(&h2), Some(out));
        assert_eq!(t.kids(a), vec![out]);
        assert!(t.store.children(c).next().is_none());
    }

    #[test]
    fn superseded_duplicate_does_not_touch_retained_output() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);

        t.commit(sites([Node::Empty, Node::Empty, h.place(panel("c")).into()]));
        let out = t.output(&h).unwrap();
        let counter = t.child(t.child(out, 0), 0);
        t.store.set_state(counter, 41);
        let (created, updated) = (t.store.created, t.store.updated);

        // Earlier marker with a different root kind.
        let card = SubtreeDescriptor::new("card").with_child(SubtreeDescriptor::new("face"));
        let s = t.commit(sites([h.place(card).into(), Node::Empty, h.place(panel("c")).into()]));
        assert_eq!((s.built, s.reused, s.diagnostics), (0, 1, 1));
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::DuplicatePlacement]);

        // Earlier marker with the same kind but no children.
        let bare = SubtreeDescriptor::new("panel").with_prop("title", "c");
        let s = t.commit(sites([h.place(bare).into(), Node::Empty, h.place(panel("c")).into()]));
        assert_eq!((s.built, s.reused, s.diagnostics), (0, 1, 1));

        assert_eq!(t.store.created, created);
        assert_eq!(t.store.updated, updated);
        assert_eq!(t.output(&h), Some(out));
        assert_eq!(t.kids(t.site(2)), vec![out]);
        assert!(t.store.children(t.site(0)).next().is_none());
        assert!(t.store.is_alive(counter));
        assert_eq!(t.store.state(counter), 41);
        assert_eq!(
            t.reconciler.registry().entry(h.id()).unwrap().descriptor(),
            Some(&panel("c"))
        );
    }

    #[test]
    fn nested_handles_swap_nesting() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let outer = t.reconciler.create_handle(owner);
        let inner = t.reconciler.create_handle(owner);
        let frame = || SubtreeDescriptor::new("frame");

        t.commit(sites([outer.place(frame().with_child(inner.place(panel("in")))).into()]));
        let (o_out, i_out) = (t.output(&outer).unwrap(), t.output(&inner).unwrap());
        let counter = t.child(t.child(i_out, 0), 0);
        t.store.set_state(counter, 7);
        let created = t.store.created;

        // The nested subtree becomes the container of its former container.
        let s = t.commit(sites([inner
            .place(panel("in").with_child(outer.place(frame())))
            .into()]));
        assert_eq!((s.built, s.reused, s.detached), (0, 2, 0));
        assert_eq!(t.store.parent(i_out), Some(t.site(0)));
        assert_eq!(t.store.parent(o_out), Some(i_out));
        assert!(t.store.children(o_out).next().is_none());
        assert_eq!(t.state(&outer), Some(EntryState::Placed));
        assert_eq!(t.state(&inner), Some(EntryState::Placed));
        let registry = t.reconciler.registry();
        assert_eq!(registry.entry(outer.id()).unwrap().container(), Some(inner.id()));
        assert_eq!(registry.entry(inner.id()).unwrap().container(), None);

        // And back.
        let s = t.commit(sites([outer
            .place(frame().with_child(inner.place(panel("in"))))
            .into()]));
        assert_eq!((s.built, s.reused, s.detached), (0, 2, 0));
        assert_eq!(t.store.parent(o_out), Some(t.site(0)));
        assert_eq!(t.store.parent(i_out), Some(o_out));
        assert_eq!(t.kids(i_out).len(), 1);

        assert_eq!(t.store.created, created);
        assert_eq!(t.store.state(counter), 7);
        assert_eq!(t.store.roots(), vec![t.mount]);
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn nested_handle_moves_between_containers() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let a = t.reconciler.create_handle(owner);
        let b = t.reconciler.create_handle(owner);
        let h = t.reconciler.create_handle(owner);
        let frame = |slot: Node| SubtreeDescriptor::new("frame").with_child(slot);
        let item = || -> Node { h.place(panel("h")).into() };

        t.commit(sites([
            a.place(frame(item())).into(),
            b.place(frame(Node::Empty)).into(),
        ]));
        let (a_out, b_out, h_out) = (
            t.output(&a).unwrap(),
            t.output(&b).unwrap(),
            t.output(&h).unwrap(),
        );
        let created = t.store.created;

        // The old container is visited first.
        let s = t.commit(sites([
            a.place(frame(Node::Empty)).into(),
            b.place(frame(item())).into(),
        ]));
        assert_eq!((s.built, s.reused, s.detached), (0, 3, 0));
        assert_eq!(t.store.parent(h_out), Some(b_out));
        assert!(t.store.children(a_out).next().is_none());
        assert_eq!(
            t.reconciler.registry().entry(h.id()).unwrap().container(),
            Some(b.id())
        );

        // The new container is visited first.
        let s = t.commit(sites([
            a.place(frame(item())).into(),
            b.place(frame(Node::Empty)).into(),
        ]));
        assert_eq!((s.built, s.reused, s.detached), (0, 3, 0));
        assert_eq!(t.store.parent(h_out), Some(a_out));
        assert!(t.store.children(b_out).next().is_none());

        // Next commit still finds it in place.
        t.commit(sites([
            a.place(frame(item())).into(),
            b.place(frame(Node::Empty)).into(),
        ]));
        assert_eq!(t.state(&h), Some(EntryState::Placed));
        assert_eq!(t.store.parent(h_out), Some(a_out));
        assert_eq!(t.store.created, created);
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn release_is_idempotent() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        t.commit(sites([h.place(panel("p")).into()]));
        let out = t.output(&h).unwrap();

        h.release();
        h.release();
        let s = t.commit(sites([Node::Empty]));
        assert_eq!(s.released, 1);
        assert_eq!(s.detached, 0);
        assert!(!t.store.is_alive(out));
        assert_eq!(t.state(&h), Some(EntryState::Released));

        let destroyed = t.store.destroyed;
        h.release();
        let s = t.commit(sites([Node::Empty]));
        assert_eq!(s.released, 0);
        assert_eq!(t.store.destroyed, destroyed);
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn placing_released_handle_renders_nothing() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        h.release();

        let s = t.commit(sites([h.place(panel("p")).into()]));
        assert_eq!(s.built, 0);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::ReleasedHandle]);
        assert!(t.store.children(t.site(0)).next().is_none());
    }

    #[test]
    fn detach_and_reuse_keeps_state_and_applies_updates() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);

        t.commit(sites([h.place(list("inbox", &["a", "b"])).into(), Node::Empty]));
        let out = t.output(&h).unwrap();
        let items = t.kids(out);
        t.store.set_state(items[0], 10);
        t.store.set_state(items[1], 11);

        t.commit(sites([Node::Empty, Node::Empty]));
        assert_eq!(t.state(&h), Some(EntryState::Detached));

        let created = t.store.created;
        let s = t.commit(sites([
            Node::Empty,
            h.place(list("archive", &["a", "b", "c"])).into(),
        ]));
        assert_eq!((s.built, s.reused), (0, 1));
        assert_eq!(t.store.created, created + 1, "only the new item is built");
        assert_eq!(t.store.prop(out, "title"), Some("archive"));

        let now = t.kids(out);
        assert_eq!(&now[..2], &items[..]);
        assert_eq!(t.store.state(now[0]), 10);
        assert_eq!(t.store.state(now[1]), 11);
        assert_eq!(t.store.prop(now[2], "label"), Some("c"));
    }

    #[test]
    fn owner_unmount_releases_every_handle() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let other = t.reconciler.mount_owner();
        let placed = t.reconciler.create_handle(owner);
        let detached = t.reconciler.create_handle(owner);
        let unplaced = t.reconciler.create_handle(owner);
        let survivor = t.reconciler.create_handle(other);

        t.commit(sites([
            placed.place(panel("a")).into(),
            detached.place(panel("b")).into(),
            survivor.place(panel("c")).into(),
        ]));
        t.commit(sites([
            placed.place(panel("a")).into(),
            Node::Empty,
            survivor.place(panel("c")).into(),
        ]));
        let (p_out, d_out) = (t.output(&placed).unwrap(), t.output(&detached).unwrap());
        assert_eq!(t.state(&detached), Some(EntryState::Detached));
        assert_eq!(t.state(&unplaced), Some(EntryState::Unplaced));

        t.reconciler.unmount_owner(owner);
        let s = t.commit(sites([
            Node::Empty,
            Node::Empty,
            survivor.place(panel("c")).into(),
        ]));
        assert_eq!(s.released, 3);
        for h in [&placed, &detached, &unplaced] {
            assert_eq!(t.state(h), Some(EntryState::Released));
        }
        assert!(!t.store.is_alive(p_out));
        assert!(!t.store.is_alive(d_out));
        assert_eq!(t.state(&survivor), Some(EntryState::Placed));
        assert!(t.reconciler.registry().owners().handles(owner).is_empty());
    }

    #[test]
    fn nested_handle_rides_along_with_detached_container() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let outer = t.reconciler.create_handle(owner);
        let inner = t.reconciler.create_handle(owner);
        let frame =
            |title: &str| SubtreeDescriptor::new("frame").with_child(inner.place(panel(title)));

        t.commit(sites([outer.place(frame("in")).into(), Node::Empty]));
        let (o_out, i_out) = (t.output(&outer).unwrap(), t.output(&inner).unwrap());
        assert_eq!(t.store.parent(i_out), Some(o_out));
        assert_eq!(
            t.reconciler.registry().entry(inner.id()).unwrap().container(),
            Some(outer.id())
        );

        let s = t.commit(sites([Node::Empty, Node::Empty]));
        assert_eq!(s.detached, 1);
        assert_eq!(t.state(&outer), Some(EntryState::Detached));
        assert_eq!(t.state(&inner), Some(EntryState::Placed));
        assert_eq!(t.store.parent(i_out), Some(o_out));

        let s = t.commit(sites([Node::Empty, outer.place(frame("in")).into()]));
        assert_eq!((s.built, s.reused), (0, 2));
        assert_eq!(t.store.parent(o_out), Some(t.site(1)));
        assert_eq!(t.store.parent(i_out), Some(o_out));
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn nested_handle_can_leave_detached_container() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let outer = t.reconciler.create_handle(owner);
        let inner = t.reconciler.create_handle(owner);
        let frame = || SubtreeDescriptor::new("frame").with_child(inner.place(panel("in")));

        t.commit(sites([outer.place(frame()).into(), Node::Empty]));
        let (o_out, i_out) = (t.output(&outer).unwrap(), t.output(&inner).unwrap());

        // The container goes away while the nested subtree moves out.
        t.commit(sites([Node::Empty, inner.place(panel("in")).into()]));
        assert_eq!(t.state(&outer), Some(EntryState::Detached));
        assert_eq!(t.state(&inner), Some(EntryState::Placed));
        assert_eq!(t.store.parent(i_out), Some(t.site(1)));
        assert!(t.store.children(o_out).next().is_none());

        // And back in again.
        t.commit(sites([outer.place(frame()).into(), Node::Empty]));
        assert_eq!(t.state(&outer), Some(EntryState::Placed));
        assert_eq!(t.store.parent(i_out), Some(o_out));
        assert!(t.store.children(t.site(1)).next().is_none());
        assert!(t.diagnostics().is_empty());
    }

    #[test]
    fn sibling_reorder_moves_without_detaching() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        let row = |first: Node, second: Node| -> Node {
            SubtreeDescriptor::new("row")
                .with_child(first)
                .with_child(second)
                .into()
        };

        t.commit(row(h.place(panel("p")).into(), SubtreeDescriptor::new("x").into()));
        let out = t.output(&h).unwrap();

        let detached = t.store.detached;
        let s = t.commit(row(SubtreeDescriptor::new("x").into(), h.place(panel("p")).into()));
        assert_eq!(s.detached, 0);
        assert_eq!(t.store.detached, detached);
        assert_eq!(t.output(&h), Some(out));

        let row_node = t.child(t.mount, 0);
        let kids = t.kids(row_node);
        assert_eq!(kids.len(), 2);
        assert_eq!(t.store.kind(kids[0]), "x");
        assert_eq!(kids[1], out);
    }

    #[test]
    fn destroyed_parent_detaches_placed_child_first() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        let root = |kind: &'static str, slot: Node| -> Node {
            SubtreeDescriptor::new("app")
                .with_child(SubtreeDescriptor::new(kind).with_child(slot))
                .into()
        };

        t.commit(root("left", h.place(panel("p")).into()));
        let out = t.output(&h).unwrap();
        let left = t.site(0);

        // Kind change destroys the old parent.
        let s = t.commit(root("other", Node::Empty));
        assert_eq!(s.detached, 1);
        assert!(!t.store.is_alive(left));
        assert!(t.store.is_alive(out));
        assert_eq!(t.state(&h), Some(EntryState::Detached));

        let s = t.commit(root("other", h.place(panel("p")).into()));
        assert_eq!(s.reused, 1);
        assert_eq!(t.store.parent(out), Some(t.site(0)));
    }

    #[test]
    fn unknown_handle_renders_nothing() {
        let mut t = Harness::new();
        let marker = PlacementMarker::new(HandleId(999), panel("?"));
        let s = t.commit(sites([marker.into()]));
        assert_eq!(s.built, 0);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::UnknownHandle]);
        assert!(t.store.children(t.site(0)).next().is_none());
        assert!(t.reconciler.registry().is_empty());
    }

    #[test]
    fn handle_from_another_root_is_unknown_there() {
        let mut t = Harness::new();
        let mut other = Reconciler::<NodeId>::new();
        let owner = other.mount_owner();
        let _first = other.create_handle(owner);
        let foreign = other.create_handle(owner);

        let s = t.commit(sites([foreign.place(panel("?")).into()]));
        assert_eq!(s.built, 0);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::UnknownHandle]);
        assert!(t.reconciler.registry().is_empty());
    }

    #[test]
    fn recursive_placement_is_rejected() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        let d = SubtreeDescriptor::new("frame").with_child(h.place(panel("self")));

        let s = t.commit(sites([h.place(d).into()]));
        assert_eq!(s.built, 1);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::RecursivePlacement]);
        let out = t.output(&h).unwrap();
        assert_eq!(t.store.kind(out), "frame");
        assert!(t.store.children(out).next().is_none());
    }

    #[test]
    fn depth_limit_truncates_description() {
        let mut t = Harness::with_config(ReconcilerConfig { max_depth: 2 });
        let deep = SubtreeDescriptor::new("app").with_child(
            SubtreeDescriptor::new("a")
                .with_child(SubtreeDescriptor::new("b").with_child(SubtreeDescriptor::new("c"))),
        );
        t.commit(deep);
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::DepthLimit]);
        let b = t.child(t.site(0), 0);
        assert_eq!(t.store.kind(b), "b");
        assert!(t.store.children(b).next().is_none());
    }

    #[test]
    fn invalid_owner_is_reported() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        t.reconciler.unmount_owner(owner);

        let h = t.reconciler.create_handle(owner);
        assert!(h.is_released());
        assert_eq!(t.diagnostics(), vec![DiagnosticKind::InvalidOwner]);
        assert_eq!(t.state(&h), Some(EntryState::Released));

        t.commit(sites([h.place(panel("p")).into()]));
        assert_eq!(
            t.diagnostics(),
            vec![DiagnosticKind::InvalidOwner, DiagnosticKind::ReleasedHandle]
        );
    }

    #[test]
    fn flush_releases_outside_commit() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        t.commit(sites([h.place(panel("p")).into()]));
        let out = t.output(&h).unwrap();

        h.release();
        assert!(t.reconciler.registry().has_pending_releases());
        let s = t.reconciler.flush(&mut t.store);
        assert_eq!(s.released, 1);
        assert!(!t.store.is_alive(out));
        assert!(t.store.children(t.site(0)).next().is_none());

        let s = t.commit(sites([Node::Empty]));
        assert_eq!((s.released, s.detached, s.diagnostics), (0, 0, 0));
    }

    #[test]
    fn ordinary_children_diff_by_position_and_kind() {
        let mut t = Harness::new();
        t.commit(
            SubtreeDescriptor::new("app")
                .with_child(SubtreeDescriptor::new("a").with_prop("n", "1"))
                .with_child(SubtreeDescriptor::new("b"))
                .with_child(SubtreeDescriptor::new("c")),
        );
        let app = t.child(t.mount, 0);
        let before = t.kids(app);

        t.commit(
            SubtreeDescriptor::new("app")
                .with_child(SubtreeDescriptor::new("a").with_prop("n", "2"))
                .with_child(SubtreeDescriptor::new("z")),
        );
        let after = t.kids(app);
        assert_eq!(t.store.updated, 1);
        assert_eq!(after.len(), 2);
        assert_eq!(after[0], before[0]);
        assert_eq!(t.store.prop(after[0], "n"), Some("2"));
        assert_eq!(t.store.kind(after[1]), "z");
        assert!(!t.store.is_alive(before[1]));
        assert!(!t.store.is_alive(before[2]));
        assert_eq!(t.store.live_count(), 4);
    }

    #[test]
    fn unmount_destroys_everything() {
        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let placed = t.reconciler.create_handle(owner);
        let detached = t.reconciler.create_handle(owner);
        t.commit(sites([
            placed.place(panel("a")).into(),
            detached.place(panel("b")).into(),
        ]));
        t.commit(sites([placed.place(panel("a")).into(), Node::Empty]));

        let s = t.reconciler.unmount(&mut t.store);
        assert_eq!(s.released, 2);
        assert_eq!(t.store.live_count(), 1);
        assert_eq!(t.store.roots(), vec![t.mount]);
        assert!(t.reconciler.registry().is_empty());
        assert!(t.reconciler.registry().owners().is_empty());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn transitions_are_traced() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Transitions(Vec<(EntryState, EntryState)>, Vec<CommitSummary>);
        impl TraceSink for Transitions {
            fn on_transition(&mut self, e: &TransitionEvent) {
                self.0.push((e.from, e.to));
            }
            fn on_commit_end(&mut self, s: &CommitSummary) {
                self.1.push(*s);
            }
        }

        let mut t = Harness::new();
        let owner = t.reconciler.mount_owner();
        let h = t.reconciler.create_handle(owner);
        let mut sink = Transitions::default();
        let mount = t.mount;
        for slot in [h.place(panel("p")).into(), Node::Empty, h.place(panel("p")).into()] {
            let root = sites([slot]);
            t.reconciler
                .commit_traced(&mut t.store, mount, &root, &mut Tracer::new(&mut sink));
        }
        h.release();
        t.reconciler
            .flush_traced(&mut t.store, &mut Tracer::new(&mut sink));

        use EntryState::*;
        assert_eq!(
            sink.0,
            vec![
                (Unplaced, Placed),
                (Placed, Detached),
                (Detached, Placed),
                (Placed, Released),
            ]
        );
        assert_eq!(sink.1.len(), 3);
        assert_eq!(sink.1[1].detached, 1);
    }
}
