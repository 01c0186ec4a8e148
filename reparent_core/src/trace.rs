// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing for the commit driver.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! reconciler calls as a commit progresses. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`RenderCommandEvent`] plus the
//!   corresponding `TraceSink` method.

use crate::diagnostic::Diagnostic;
use crate::handle::HandleId;
use crate::registry::EntryState;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which renderer command was issued.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderCommand {
    /// A node was created.
    Create,
    /// A node's properties were updated.
    Update,
    /// A node was linked (or moved) under a parent.
    Attach,
    /// A reparentable subtree was unlinked and retained.
    DetachButRetain,
    /// A node was destroyed.
    Destroy,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a commit starts, before buffered releases are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitBeginEvent {
    /// Generation of the commit that is starting.
    pub generation: u64,
    /// Number of buffered release requests (including owner unmounts).
    pub pending_releases: u32,
}

/// Emitted whenever a registry entry changes state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Generation during which the transition happened.
    pub generation: u64,
    /// The entry's handle.
    pub handle: HandleId,
    /// Previous state.
    pub from: EntryState,
    /// New state.
    pub to: EntryState,
}

/// Per-commit counts, returned by
/// [`Reconciler::commit`](crate::reconcile::Reconciler::commit) and passed to
/// [`TraceSink::on_commit_end`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Generation of this commit.
    pub generation: u64,
    /// Reparentable subtrees built from scratch.
    pub built: u32,
    /// Reparentable subtrees reused (in place or moved).
    pub reused: u32,
    /// Entries that moved to `Detached`.
    pub detached: u32,
    /// Entries that were released and torn down.
    pub released: u32,
    /// Diagnostics reported.
    pub diagnostics: u32,
}

/// A single renderer command.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderCommandEvent {
    /// Generation during which the command was issued.
    pub generation: u64,
    /// Which command.
    pub command: RenderCommand,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the commit driver.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a commit begins.
    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        _ = e;
    }

    /// Called on every registry state transition.
    fn on_transition(&mut self, e: &TransitionEvent) {
        _ = e;
    }

    /// Called when a diagnostic is reported.
    fn on_diagnostic(&mut self, d: &Diagnostic) {
        _ = d;
    }

    /// Called with the commit summary once the sweep has finished.
    fn on_commit_end(&mut self, s: &CommitSummary) {
        _ = s;
    }

    /// Called for every renderer command (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_render_command(&mut self, e: &RenderCommandEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`CommitBeginEvent`].
    #[inline]
    pub fn commit_begin(&mut self, e: &CommitBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TransitionEvent`].
    #[inline]
    pub fn transition(&mut self, e: &TransitionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_transition(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`Diagnostic`].
    #[inline]
    pub fn diagnostic(&mut self, d: &Diagnostic) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_diagnostic(d);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = d;
        }
    }

    /// Emits a [`CommitSummary`].
    #[inline]
    pub fn commit_end(&mut self, s: &CommitSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_commit_end(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a renderer command (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn render_command(&mut self, e: &RenderCommandEvent) {
        if let Some(s) = &mut self.sink {
            s.on_render_command(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
