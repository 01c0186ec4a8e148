// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owner lifecycle hook.
//!
//! Every handle is bound to the component instance that created it. The
//! [`OwnerTable`] records which handles each owner holds. Unmounting an owner
//! is buffered like a handle release: at the next commit boundary every handle
//! the owner created is force-released, whether or not it was ever placed.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::handle::HandleId;

/// Identity of a mounted owner.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(pub(crate) u64);

impl OwnerId {
    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

#[derive(Debug, Default)]
struct OwnerRecord {
    handles: Vec<HandleId>,
    unmounting: bool,
}

/// Mounted owners and the handles they created.
#[derive(Debug, Default)]
pub struct OwnerTable {
    owners: HashMap<OwnerId, OwnerRecord>,
    subscriptions: HashMap<HandleId, OwnerId>,
    pending_unmounts: Vec<OwnerId>,
    next_id: u64,
}

impl OwnerTable {
    /// Creates an empty owner table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly mounted owner.
    pub fn mount(&mut self) -> OwnerId {
        self.next_id += 1;
        let id = OwnerId(self.next_id);
        self.owners.insert(id, OwnerRecord::default());
        id
    }

    /// Returns whether `owner` is mounted and has no unmount pending.
    ///
    /// New handles can only be created for mounted owners.
    #[must_use]
    pub fn is_mounted(&self, owner: OwnerId) -> bool {
        self.owners.get(&owner).is_some_and(|r| !r.unmounting)
    }

    /// Returns whether `owner` still exists, including while its unmount is
    /// pending.
    #[must_use]
    pub fn is_alive(&self, owner: OwnerId) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Returns the unreleased handles created by `owner`, in creation order.
    #[must_use]
    pub fn handles(&self, owner: OwnerId) -> &[HandleId] {
        self.owners.get(&owner).map_or(&[], |r| &r.handles)
    }

    /// Returns the owner of an unreleased handle.
    #[must_use]
    pub fn owner_of(&self, handle: HandleId) -> Option<OwnerId> {
        self.subscriptions.get(&handle).copied()
    }

    /// Returns the number of live owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns whether no owners are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Returns every live owner in mount order.
    #[must_use]
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut ids: Vec<_> = self.owners.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Buffers an unmount. Returns `false` if the owner is unknown or already
    /// unmounting.
    pub(crate) fn request_unmount(&mut self, owner: OwnerId) -> bool {
        match self.owners.get_mut(&owner) {
            Some(record) if !record.unmounting => {
                record.unmounting = true;
                self.pending_unmounts.push(owner);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn has_pending_unmounts(&self) -> bool {
        !self.pending_unmounts.is_empty()
    }

    /// Subscribes `handle` to `owner`'s teardown.
    pub(crate) fn subscribe(&mut self, owner: OwnerId, handle: HandleId) {
        if let Some(record) = self.owners.get_mut(&owner) {
            record.handles.push(handle);
            self.subscriptions.insert(handle, owner);
        }
    }

    /// Drops `handle` from its owner's list.
    pub(crate) fn unsubscribe(&mut self, handle: HandleId) -> Option<OwnerId> {
        let owner = self.subscriptions.remove(&handle)?;
        if let Some(record) = self.owners.get_mut(&owner) {
            record.handles.retain(|&h| h != handle);
        }
        Some(owner)
    }

    /// Completes buffered unmounts and returns the handles that must now be
    /// force-released.
    ///
    /// The handles stay subscribed until the registry releases them.
    pub(crate) fn take_unmounted(&mut self) -> Vec<HandleId> {
        let mut doomed = Vec::new();
        for owner in core::mem::take(&mut self.pending_unmounts) {
            if let Some(record) = self.owners.remove(&owner) {
                doomed.extend(record.handles);
            }
        }
        doomed
    }
}
