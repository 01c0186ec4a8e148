// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit diagnostics.
//!
//! Misuse of handles is never fatal. The reconciler reports a [`Diagnostic`],
//! treats the offending site as empty (or resolves it deterministically), and
//! carries on with the commit. Diagnostics go to the reconciler's
//! [`DiagnosticSink`] as they happen and are also kept for the current
//! generation in [`ReparentRegistry::commit_errors`].
//!
//! [`ReparentRegistry::commit_errors`]: crate::registry::ReparentRegistry::commit_errors

use alloc::vec::Vec;
use core::fmt;

use crate::handle::HandleId;

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The same handle was placed at more than one site in a single
    /// description. The last site wins.
    DuplicatePlacement,
    /// A released handle was placed. The site renders nothing.
    ReleasedHandle,
    /// A placement carried an id this registry never issued. The site renders
    /// nothing.
    UnknownHandle,
    /// A handle was requested for an owner that is not mounted. The returned
    /// handle is already released.
    InvalidOwner,
    /// A handle was placed inside its own subtree. The inner site renders
    /// nothing.
    RecursivePlacement,
    /// The description nested deeper than the configured limit. The site
    /// renders nothing.
    DepthLimit,
}

impl DiagnosticKind {
    /// Returns a short stable name, suitable for logs and trace encodings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DuplicatePlacement => "duplicate-placement",
            Self::ReleasedHandle => "released-handle",
            Self::UnknownHandle => "unknown-handle",
            Self::InvalidOwner => "invalid-owner",
            Self::RecursivePlacement => "recursive-placement",
            Self::DepthLimit => "depth-limit",
        }
    }
}

/// A reported misuse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// The handle involved, if any.
    pub handle: Option<HandleId>,
    /// Commit generation during which the problem was found.
    pub generation: u64,
    /// Child-slot indices from the description root to the offending site.
    /// Empty for the root slot and for problems outside a commit.
    pub site: Vec<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in generation {}", self.kind.name(), self.generation)?;
        if let Some(handle) = self.handle {
            write!(f, " for handle {handle}")?;
        }
        if !self.site.is_empty() {
            f.write_str(" at ")?;
            for index in &self.site {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

/// Receives diagnostics as they are reported.
pub trait DiagnosticSink {
    /// Called once per diagnostic.
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// A [`DiagnosticSink`] that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreDiagnostics;

impl DiagnosticSink for IgnoreDiagnostics {
    fn report(&mut self, diagnostic: &Diagnostic) {
        _ = diagnostic;
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for alloc::rc::Rc<core::cell::RefCell<S>> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.borrow_mut().report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::vec;

    use super::*;

    #[test]
    fn display_includes_handle_and_site() {
        let d = Diagnostic {
            kind: DiagnosticKind::DuplicatePlacement,
            handle: Some(HandleId(2)),
            generation: 3,
            site: vec![0, 2],
        };
        assert_eq!(
            format!("{d}"),
            "duplicate-placement in generation 3 for handle #2 at /0/2"
        );
    }

    #[test]
    fn display_without_handle_or_site() {
        let d = Diagnostic {
            kind: DiagnosticKind::DepthLimit,
            handle: None,
            generation: 1,
            site: Vec::new(),
        };
        assert_eq!(format!("{d}"), "depth-limit in generation 1");
    }

    #[test]
    fn vec_sink_collects() {
        let mut log: Vec<Diagnostic> = Vec::new();
        let d = Diagnostic {
            kind: DiagnosticKind::UnknownHandle,
            handle: Some(HandleId(99)),
            generation: 1,
            site: vec![1],
        };
        log.report(&d);
        IgnoreDiagnostics.report(&d);
        assert_eq!(log, [d]);
    }
}
