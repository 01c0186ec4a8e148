// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reparent handles.
//!
//! A [`ReparentHandle`] gives a subtree an identity that survives position
//! changes. Each render pass, the owner wraps the subtree's descriptor with
//! [`ReparentHandle::place`]; the reconciler then matches the resulting
//! [`PlacementMarker`] by handle rather than by position.
//!
//! Handles never touch the registry directly. [`release`](ReparentHandle::release)
//! queues a request that is applied at the next commit boundary (or by
//! [`Reconciler::flush`](crate::reconcile::Reconciler::flush)), so releasing
//! during a render pass never races a commit in progress.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::descriptor::{PlacementMarker, SubtreeDescriptor};
use crate::owner::OwnerId;

/// Identity of a reparent handle, unique within one tree root.
///
/// Ids are issued in increasing order starting at 1 and are never reused, so
/// a released id can always be told apart from a live one.
///
/// Ids are only meaningful to the [`Reconciler`](crate::reconcile::Reconciler)
/// that issued them. Every reconciler counts from 1, so a handle placed into
/// a different root is not detected: it resolves to whatever that root issued
/// under the same number, or to
/// [`UnknownHandle`](crate::diagnostic::DiagnosticKind::UnknownHandle) if the
/// number was never issued there.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub(crate) u64);

impl HandleId {
    /// Rebuilds an id from its raw value, e.g. when decoding a recording.
    ///
    /// An id that no registry issued is reported as
    /// [`UnknownHandle`](crate::diagnostic::DiagnosticKind::UnknownHandle)
    /// if it is ever placed.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Release requests waiting for the next commit boundary.
#[derive(Debug, Default)]
pub(crate) struct ReleaseQueue {
    requests: RefCell<Vec<HandleId>>,
}

impl ReleaseQueue {
    fn push(&self, id: HandleId) {
        self.requests.borrow_mut().push(id);
    }

    pub(crate) fn take(&self) -> Vec<HandleId> {
        core::mem::take(&mut *self.requests.borrow_mut())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.borrow().is_empty()
    }
}

/// Stable identity for a reparentable subtree.
///
/// Created by [`Reconciler::create_handle`](crate::reconcile::Reconciler::create_handle)
/// on behalf of an owner. Handles compare by identity.
pub struct ReparentHandle {
    id: HandleId,
    owner: OwnerId,
    released: Cell<bool>,
    queue: Weak<ReleaseQueue>,
}

impl ReparentHandle {
    pub(crate) fn new(id: HandleId, owner: OwnerId, queue: &Rc<ReleaseQueue>) -> Self {
        Self {
            id,
            owner,
            released: Cell::new(false),
            queue: Rc::downgrade(queue),
        }
    }

    /// A handle whose id was never registered. Placing it is reported as a
    /// released-handle use.
    pub(crate) fn inert(id: HandleId, owner: OwnerId) -> Self {
        Self {
            id,
            owner,
            released: Cell::new(true),
            queue: Weak::new(),
        }
    }

    /// Returns this handle's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Returns the owner that created this handle.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Wraps `descriptor` with this handle's identity.
    ///
    /// Pure: nothing happens until the marker is consumed by a commit. Placing
    /// a released handle still produces a marker; the commit reports it and
    /// treats the site as empty.
    #[must_use]
    pub fn place(&self, descriptor: SubtreeDescriptor) -> PlacementMarker {
        PlacementMarker::new(self.id, descriptor)
    }

    /// Requests permanent disposal of the retained subtree.
    ///
    /// Idempotent. Takes effect at the next commit boundary, after which the
    /// built output has been destroyed and the id can no longer be placed.
    pub fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        if let Some(queue) = self.queue.upgrade() {
            queue.push(self.id);
        }
    }

    /// Returns whether [`release`](Self::release) has been called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl PartialEq for ReparentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ReparentHandle {}

impl fmt::Debug for ReparentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReparentHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("released", &self.released.get())
            .finish_non_exhaustive()
    }
}
