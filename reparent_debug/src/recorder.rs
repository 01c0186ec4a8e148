// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Diagnostic records carry their site path, so they are the only
//! variable-length record.

use reparent_core::diagnostic::{Diagnostic, DiagnosticKind};
use reparent_core::handle::HandleId;
use reparent_core::registry::EntryState;
use reparent_core::trace::{
    CommitBeginEvent, CommitSummary, RenderCommand, RenderCommandEvent, TraceSink,
    TransitionEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_COMMIT_BEGIN: u8 = 1;
const TAG_TRANSITION: u8 = 2;
const TAG_DIAGNOSTIC: u8 = 3;
const TAG_COMMIT_END: u8 = 4;
const TAG_RENDER_COMMAND: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "lengths and indices capped at u32::MAX for recording"
    )]
    fn write_len(&mut self, v: usize) {
        self.write_u32(v.min(u32::MAX as usize) as u32);
    }

    fn write_option_handle(&mut self, v: Option<HandleId>) {
        match v {
            Some(id) => {
                self.write_u8(1);
                self.write_u64(id.get());
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_state(&mut self, s: EntryState) {
        self.write_u8(match s {
            EntryState::Unplaced => 0,
            EntryState::Placed => 1,
            EntryState::Detached => 2,
            EntryState::Released => 3,
        });
    }

    fn write_kind(&mut self, k: DiagnosticKind) {
        self.write_u8(match k {
            DiagnosticKind::DuplicatePlacement => 0,
            DiagnosticKind::ReleasedHandle => 1,
            DiagnosticKind::UnknownHandle => 2,
            DiagnosticKind::InvalidOwner => 3,
            DiagnosticKind::RecursivePlacement => 4,
            DiagnosticKind::DepthLimit => 5,
        });
    }

    fn write_command(&mut self, c: RenderCommand) {
        self.write_u8(match c {
            RenderCommand::Create => 0,
            RenderCommand::Update => 1,
            RenderCommand::Attach => 2,
            RenderCommand::DetachButRetain => 3,
            RenderCommand::Destroy => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        self.write_u8(TAG_COMMIT_BEGIN);
        self.write_u64(e.generation);
        self.write_u32(e.pending_releases);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.write_u8(TAG_TRANSITION);
        self.write_u64(e.generation);
        self.write_u64(e.handle.get());
        self.write_state(e.from);
        self.write_state(e.to);
    }

    fn on_diagnostic(&mut self, d: &Diagnostic) {
        self.write_u8(TAG_DIAGNOSTIC);
        self.write_u64(d.generation);
        self.write_kind(d.kind);
        self.write_option_handle(d.handle);
        self.write_len(d.site.len());
        for &index in &d.site {
            self.write_len(index);
        }
    }

    fn on_commit_end(&mut self, s: &CommitSummary) {
        self.write_u8(TAG_COMMIT_END);
        self.write_u64(s.generation);
        self.write_u32(s.built);
        self.write_u32(s.reused);
        self.write_u32(s.detached);
        self.write_u32(s.released);
        self.write_u32(s.diagnostics);
    }

    fn on_render_command(&mut self, e: &RenderCommandEvent) {
        self.write_u8(TAG_RENDER_COMMAND);
        self.write_u64(e.generation);
        self.write_command(e.command);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`CommitBeginEvent`].
    CommitBegin(CommitBeginEvent),
    /// A [`TransitionEvent`].
    Transition(TransitionEvent),
    /// A [`Diagnostic`].
    Diagnostic(Diagnostic),
    /// A [`CommitSummary`].
    CommitEnd(CommitSummary),
    /// A [`RenderCommandEvent`].
    RenderCommand(RenderCommandEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Iteration stops at the first truncated or unrecognized record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_option_handle(&mut self) -> Option<Option<HandleId>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some((present != 0).then_some(HandleId::from_raw(val)))
    }

    fn read_state(&mut self) -> Option<EntryState> {
        Some(match self.read_u8()? {
            0 => EntryState::Unplaced,
            1 => EntryState::Placed,
            2 => EntryState::Detached,
            3 => EntryState::Released,
            _ => return None,
        })
    }

    fn read_kind(&mut self) -> Option<DiagnosticKind> {
        Some(match self.read_u8()? {
            0 => DiagnosticKind::DuplicatePlacement,
            1 => DiagnosticKind::ReleasedHandle,
            2 => DiagnosticKind::UnknownHandle,
            3 => DiagnosticKind::InvalidOwner,
            4 => DiagnosticKind::RecursivePlacement,
            5 => DiagnosticKind::DepthLimit,
            _ => return None,
        })
    }

    fn read_command(&mut self) -> Option<RenderCommand> {
        Some(match self.read_u8()? {
            0 => RenderCommand::Create,
            1 => RenderCommand::Update,
            2 => RenderCommand::Attach,
            3 => RenderCommand::DetachButRetain,
            4 => RenderCommand::Destroy,
            _ => return None,
        })
    }

    fn decode_commit_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitBegin(CommitBeginEvent {
            generation: self.read_u64()?,
            pending_releases: self.read_u32()?,
        }))
    }

    fn decode_transition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Transition(TransitionEvent {
            generation: self.read_u64()?,
            handle: HandleId::from_raw(self.read_u64()?),
            from: self.read_state()?,
            to: self.read_state()?,
        }))
    }

    fn decode_diagnostic(&mut self) -> Option<RecordedEvent> {
        let generation = self.read_u64()?;
        let kind = self.read_kind()?;
        let handle = self.read_option_handle()?;
        let len = self.read_u32()?;
        let site = (0..len)
            .map(|_| self.read_u32().map(|i| i as usize))
            .collect::<Option<Vec<_>>>()?;
        Some(RecordedEvent::Diagnostic(Diagnostic {
            kind,
            handle,
            generation,
            site,
        }))
    }

    fn decode_commit_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitEnd(CommitSummary {
            generation: self.read_u64()?,
            built: self.read_u32()?,
            reused: self.read_u32()?,
            detached: self.read_u32()?,
            released: self.read_u32()?,
            diagnostics: self.read_u32()?,
        }))
    }

    fn decode_render_command(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderCommand(RenderCommandEvent {
            generation: self.read_u64()?,
            command: self.read_command()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_COMMIT_BEGIN => self.decode_commit_begin(),
            TAG_TRANSITION => self.decode_transition(),
            TAG_DIAGNOSTIC => self.decode_diagnostic(),
            TAG_COMMIT_END => self.decode_commit_end(),
            TAG_RENDER_COMMAND => self.decode_render_command(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
