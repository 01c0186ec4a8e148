// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use reparent_core::diagnostic::Diagnostic;
use reparent_core::trace::{
    CommitBeginEvent, CommitSummary, RenderCommand, RenderCommandEvent, TraceSink,
    TransitionEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    commands: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    ///
    /// Renderer commands are not printed unless enabled with
    /// [`with_commands`](Self::with_commands).
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            commands: false,
        }
    }

    /// Also prints one line per renderer command.
    #[must_use]
    pub fn with_commands(mut self, commands: bool) -> Self {
        self.commands = commands;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn command_name(command: RenderCommand) -> &'static str {
    match command {
        RenderCommand::Create => "create",
        RenderCommand::Update => "update",
        RenderCommand::Attach => "attach",
        RenderCommand::DetachButRetain => "detach",
        RenderCommand::Destroy => "destroy",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[commit:begin] generation={} pending_releases={}",
            e.generation, e.pending_releases,
        );
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        let _ = writeln!(
            self.writer,
            "[transition] generation={} handle={} {} -> {}",
            e.generation,
            e.handle,
            e.from.name(),
            e.to.name(),
        );
    }

    fn on_diagnostic(&mut self, d: &Diagnostic) {
        let _ = writeln!(self.writer, "[diagnostic] {d}");
    }

    fn on_commit_end(&mut self, s: &CommitSummary) {
        let _ = writeln!(
            self.writer,
            "[commit:end] generation={} built={} reused={} detached={} \
             released={} diagnostics={}",
            s.generation, s.built, s.reused, s.detached, s.released, s.diagnostics,
        );
    }

    fn on_render_command(&mut self, e: &RenderCommandEvent) {
        if self.commands {
            let _ = writeln!(
                self.writer,
                "[command] generation={} {}",
                e.generation,
                command_name(e.command),
            );
        }
    }
}
