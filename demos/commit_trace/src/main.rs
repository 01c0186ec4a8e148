// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted commit sequence that exercises reparenting, tracing, and
//! diagnostics.
//!
//! Two panels are moved between the sidebar and the main area of a small
//! window, hidden, duplicated, and finally released. Every commit is traced
//! to both a [`PrettyPrintSink`](reparent_debug::pretty::PrettyPrintSink) and
//! a [`RecorderSink`](reparent_debug::recorder::RecorderSink), and the
//! recording is exported as a Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use reparent_core::descriptor::{Node, Props, SubtreeDescriptor};
use reparent_core::diagnostic::Diagnostic;
use reparent_core::handle::ReparentHandle;
use reparent_core::reconcile::Reconciler;
use reparent_core::trace::{
    CommitBeginEvent, CommitSummary, RenderCommandEvent, TraceSink, Tracer, TransitionEvent,
};
use reparent_core::tree::{NodeId, NodeStore};

use reparent_debug::pretty::PrettyPrintSink;
use reparent_debug::recorder::RecorderSink;

/// Forwards every event to both sinks.
struct Tee<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl TraceSink for Tee<'_> {
    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        self.pretty.on_commit_begin(e);
        self.recorder.on_commit_begin(e);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.pretty.on_transition(e);
        self.recorder.on_transition(e);
    }

    fn on_diagnostic(&mut self, d: &Diagnostic) {
        self.pretty.on_diagnostic(d);
        self.recorder.on_diagnostic(d);
    }

    fn on_commit_end(&mut self, s: &CommitSummary) {
        self.pretty.on_commit_end(s);
        self.recorder.on_commit_end(s);
    }

    fn on_render_command(&mut self, e: &RenderCommandEvent) {
        self.pretty.on_render_command(e);
        self.recorder.on_render_command(e);
    }
}

fn panel(title: &str, rows: usize) -> SubtreeDescriptor {
    SubtreeDescriptor::new("panel")
        .with_prop("title", title)
        .with_children((0..rows).map(|i| SubtreeDescriptor::new("row").with_prop("n", i.to_string())))
}

fn window(sidebar: impl Into<Node>, main: impl Into<Node>) -> Node {
    SubtreeDescriptor::new("window")
        .with_child(SubtreeDescriptor::new("sidebar").with_child(sidebar))
        .with_child(SubtreeDescriptor::new("main").with_child(main))
        .into()
}

fn place(h: &ReparentHandle, title: &str) -> Node {
    h.place(panel(title, 3)).into()
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- tree --------------------------------------------------------------
    let mut store = NodeStore::new();
    let mount = store.create_node("mount", Props::new());
    let mut reconciler: Reconciler<NodeId> = Reconciler::new();
    let owner = reconciler.mount_owner();
    let files = reconciler.create_handle(owner);
    let outline = reconciler.create_handle(owner);

    // -- script ------------------------------------------------------------
    let script: Vec<(&str, Node)> = vec![
        ("initial layout", window(place(&files, "Files"), place(&outline, "Outline"))),
        ("swap sides", window(place(&outline, "Outline"), place(&files, "Files"))),
        ("hide outline", window(Node::Empty, place(&files, "Files"))),
        ("outline returns", window(place(&outline, "Outline"), place(&files, "Files (2)"))),
        ("files twice", window(place(&files, "Files"), place(&files, "Files"))),
    ];

    for (label, root) in &script {
        println!("== {label}");
        let mut tee = Tee {
            pretty: &mut pretty,
            recorder: &mut recorder,
        };
        reconciler.commit_traced(&mut store, mount, root, &mut Tracer::new(&mut tee));
        for d in reconciler.registry().commit_errors() {
            println!("   ! {d}");
        }
        report(&mut store);
    }

    println!("== owner unmounts");
    reconciler.unmount_owner(owner);
    let mut tee = Tee {
        pretty: &mut pretty,
        recorder: &mut recorder,
    };
    reconciler.commit_traced(
        &mut store,
        mount,
        &window(Node::Empty, Node::Empty),
        &mut Tracer::new(&mut tee),
    );
    report(&mut store);

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    reparent_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({} commits)", reconciler.generation());
}

fn report(store: &mut NodeStore) {
    let changes = store.evaluate();
    println!(
        "   tree: live={} added={} removed={} updated={} retained={} restored={}",
        store.live_count(),
        changes.added.len(),
        changes.removed.len(),
        changes.updated.len(),
        changes.retained.len(),
        changes.restored.len(),
    );
}
