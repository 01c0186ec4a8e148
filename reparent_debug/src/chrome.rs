// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Recorded events carry no wall-clock time. Each event is stamped with its
//! position in the recording (one microsecond per event), so commits show up
//! as consecutive spans with their transitions and diagnostics inside.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Transitions are drawn on a track per handle.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (ts, recorded) in decode(bytes).enumerate() {
        match recorded {
            RecordedEvent::CommitBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Commit",
                    "cat": "Commit",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                        "pending_releases": e.pending_releases,
                    }
                }));
            }
            RecordedEvent::CommitEnd(s) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Commit",
                    "cat": "Commit",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": s.generation,
                        "built": s.built,
                        "reused": s.reused,
                        "detached": s.detached,
                        "released": s.released,
                        "diagnostics": s.diagnostics,
                    }
                }));
            }
            RecordedEvent::Transition(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": e.to.name(),
                    "cat": "Registry",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.handle.get(),
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                        "handle": e.handle.get(),
                        "from": e.from.name(),
                    }
                }));
            }
            RecordedEvent::Diagnostic(d) => {
                events.push(json!({
                    "ph": "i",
                    "name": d.kind.name(),
                    "cat": "Diagnostic",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "generation": d.generation,
                        "handle": d.handle.map(|h| h.get()),
                        "site": d.site,
                    }
                }));
            }
            RecordedEvent::RenderCommand(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.command),
                    "cat": "Render",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
