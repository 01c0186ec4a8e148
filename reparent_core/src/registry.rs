// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root registry of reparentable subtrees.
//!
//! The [`ReparentRegistry`] is the single source of truth for every live
//! handle within one tree root. Each placed handle has a [`RegistryEntry`]
//! that owns the built output whenever it is not part of the live tree.
//!
//! # Entry lifecycle
//!
//! ```text
//!   Unplaced ──► Placed ◄──► Detached
//!       │          │            │
//!       └──────────┴────────────┴──► Released (entry removed)
//! ```
//!
//! A handle has no entry until the first commit that references it; until
//! then it reports [`EntryState::Unplaced`]. Released ids are never reused:
//! ids are issued in increasing order, so an issued id without a live owner
//! subscription is known to be released.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::descriptor::SubtreeDescriptor;
use crate::diagnostic::Diagnostic;
use crate::handle::{HandleId, ReleaseQueue, ReparentHandle};
use crate::owner::{OwnerId, OwnerTable};
use crate::reconcile::MountedElement;
use crate::renderer::PlacementSite;

/// Lifecycle state of a registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Created but never built.
    Unplaced,
    /// Built and linked into the live tree.
    Placed,
    /// Built, unlinked, and owned by the entry.
    Detached,
    /// Torn down. Terminal.
    Released,
}

impl EntryState {
    /// Returns a short stable name, suitable for logs and trace encodings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unplaced => "unplaced",
            Self::Placed => "placed",
            Self::Detached => "detached",
            Self::Released => "released",
        }
    }
}

/// Why a handle id could not be resolved to an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// The id was issued by this registry and has since been released.
    Released,
    /// The id was never issued by this registry.
    Unknown,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Released => f.write_str("handle has been released"),
            Self::Unknown => f.write_str("handle was not issued by this registry"),
        }
    }
}

impl core::error::Error for LookupError {}

/// Outcome of [`ReparentRegistry::mark_seen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seen {
    /// First placement of the handle in this generation.
    First,
    /// The handle was already seen in this generation.
    Again,
}

/// Retained state for one handle.
#[derive(Debug)]
pub struct RegistryEntry<O> {
    pub(crate) id: HandleId,
    pub(crate) owner: OwnerId,
    pub(crate) state: EntryState,
    pub(crate) descriptor: Option<SubtreeDescriptor>,
    pub(crate) built: Option<MountedElement<O>>,
    pub(crate) site: Option<PlacementSite<O>>,
    /// Handle whose built output contains this entry's placement.
    pub(crate) container: Option<HandleId>,
    /// Generation in which this entry was last seen; zero for never.
    pub(crate) seen: u64,
    /// Stamp of the authoritative placement slot.
    pub(crate) visit: u64,
    /// Set while the entry's own subtree is being reconciled.
    pub(crate) building: bool,
}

impl<O: Copy> RegistryEntry<O> {
    fn new(id: HandleId, owner: OwnerId) -> Self {
        Self {
            id,
            owner,
            state: EntryState::Unplaced,
            descriptor: None,
            built: None,
            site: None,
            container: None,
            seen: 0,
            visit: 0,
            building: false,
        }
    }

    /// Returns the entry's handle.
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Returns the owner the entry is bound to.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Returns the most recently placed descriptor.
    #[must_use]
    pub fn descriptor(&self) -> Option<&SubtreeDescriptor> {
        self.descriptor.as_ref()
    }

    /// Returns the root output node of the built subtree.
    ///
    /// `Some` exactly when the entry is `Placed` or `Detached`.
    #[must_use]
    pub fn output(&self) -> Option<O> {
        self.built.as_ref().map(|b| b.output)
    }

    /// Returns where the built output is linked, while `Placed`.
    #[must_use]
    pub fn placement_site(&self) -> Option<PlacementSite<O>> {
        self.site
    }

    /// Returns the handle whose subtree contains this placement, if any.
    #[must_use]
    pub fn container(&self) -> Option<HandleId> {
        self.container
    }

    /// Returns the generation in which the entry was last seen.
    #[must_use]
    pub fn last_seen(&self) -> Option<u64> {
        (self.seen != 0).then_some(self.seen)
    }
}

/// Result of [`ReparentRegistry::sweep`].
#[derive(Debug)]
pub struct Sweep<O> {
    /// Entries moved to `Detached`, with the output the renderer must unlink.
    pub detached: Vec<(HandleId, O)>,
    /// Entries removed because their owner is gone. Their output still has
    /// to be torn down.
    pub released: Vec<RegistryEntry<O>>,
}

/// Registry of all live reparent entries within one tree root.
#[derive(Debug)]
pub struct ReparentRegistry<O> {
    entries: HashMap<HandleId, RegistryEntry<O>>,
    owners: OwnerTable,
    releases: Rc<ReleaseQueue>,
    next_id: u64,
    generation: u64,
    diagnostics: Vec<Diagnostic>,
}

impl<O: Copy> Default for ReparentRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Copy> ReparentRegistry<O> {
    /// Creates an empty registry at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            owners: OwnerTable::new(),
            releases: Rc::new(ReleaseQueue::default()),
            next_id: 1,
            generation: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Returns the generation of the most recent commit.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of entries (handles referenced by at least one
    /// commit and not yet released).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the owner table.
    #[must_use]
    pub fn owners(&self) -> &OwnerTable {
        &self.owners
    }

    // -- Owners and handles --

    /// Registers a newly mounted owner.
    pub fn mount_owner(&mut self) -> OwnerId {
        self.owners.mount()
    }

    /// Buffers an owner unmount. Every handle the owner created is released
    /// at the next commit boundary.
    ///
    /// Returns `false` if the owner is unknown or already unmounting.
    pub fn unmount_owner(&mut self, owner: OwnerId) -> bool {
        self.owners.request_unmount(owner)
    }

    /// Issues a new handle for a mounted owner.
    ///
    /// Returns `None` if the owner is not mounted.
    pub fn create_handle(&mut self, owner: OwnerId) -> Option<ReparentHandle> {
        if !self.owners.is_mounted(owner) {
            return None;
        }
        let id = self.issue_id();
        self.owners.subscribe(owner, id);
        Some(ReparentHandle::new(id, owner, &self.releases))
    }

    /// Issues an id that is released from the start.
    pub(crate) fn create_inert_handle(&mut self, owner: OwnerId) -> ReparentHandle {
        let id = self.issue_id();
        ReparentHandle::inert(id, owner)
    }

    fn issue_id(&mut self) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;
        id
    }

    // -- Lookup --

    /// Returns the state of a handle, or `None` for ids this registry never
    /// issued.
    #[must_use]
    pub fn state(&self, id: HandleId) -> Option<EntryState> {
        if let Some(entry) = self.entries.get(&id) {
            return Some(entry.state);
        }
        if self.owners.owner_of(id).is_some() {
            return Some(EntryState::Unplaced);
        }
        self.was_issued(id).then_some(EntryState::Released)
    }

    /// Returns the entry for `id`, if one exists.
    #[must_use]
    pub fn entry(&self, id: HandleId) -> Option<&RegistryEntry<O>> {
        self.entries.get(&id)
    }

    /// Returns all entries ordered by id.
    #[must_use]
    pub fn entries(&self) -> Vec<&RegistryEntry<O>> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_unstable_by_key(|e| e.id);
        entries
    }

    /// Returns the entry for `id`, creating an `Unplaced` one on first
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Released`] for released ids and
    /// [`LookupError::Unknown`] for ids this registry never issued.
    pub fn lookup_or_create(&mut self, id: HandleId) -> Result<&mut RegistryEntry<O>, LookupError> {
        if !self.entries.contains_key(&id) {
            let Some(owner) = self.owners.owner_of(id) else {
                return Err(if self.was_issued(id) {
                    LookupError::Released
                } else {
                    LookupError::Unknown
                });
            };
            self.entries.insert(id, RegistryEntry::new(id, owner));
        }
        self.entries.get_mut(&id).ok_or(LookupError::Unknown)
    }

    pub(crate) fn entry_mut(&mut self, id: HandleId) -> Option<&mut RegistryEntry<O>> {
        self.entries.get_mut(&id)
    }

    fn was_issued(&self, id: HandleId) -> bool {
        id.0 != 0 && id.0 < self.next_id
    }

    // -- Commit bookkeeping --

    /// Records that `generation`'s description places `id` with
    /// `descriptor`.
    ///
    /// Has no effect for ids without an entry.
    pub fn mark_seen(
        &mut self,
        id: HandleId,
        descriptor: &SubtreeDescriptor,
        generation: u64,
    ) -> Seen {
        let Some(entry) = self.entries.get_mut(&id) else {
            return Seen::First;
        };
        let seen = if entry.seen == generation {
            Seen::Again
        } else {
            Seen::First
        };
        entry.seen = generation;
        entry.descriptor = Some(descriptor.clone());
        seen
    }

    /// Settles every entry at the end of `generation`'s traversal.
    ///
    /// - Entries whose owner is gone are removed and returned for teardown.
    /// - `Placed` entries not seen this generation move to `Detached`, unless
    ///   they ride along inside a reparentable container that was itself not
    ///   rendered this generation. Those stay `Placed` within the container's
    ///   retained output.
    ///
    /// Results are ordered by id.
    pub fn sweep(&mut self, generation: u64) -> Sweep<O> {
        let mut ids: Vec<HandleId> = self.entries.keys().copied().collect();
        ids.sort_unstable();

        let mut detach = Vec::new();
        let mut doomed = Vec::new();
        for id in ids {
            let Some(entry) = self.entries.get(&id) else {
                continue;
            };
            if !self.owners.is_alive(entry.owner) {
                doomed.push(id);
            } else if entry.state == EntryState::Placed
                && entry.seen != generation
                && !self.rides_along(entry, generation)
            {
                detach.push(id);
            }
        }

        let mut sweep = Sweep {
            detached: Vec::new(),
            released: Vec::new(),
        };
        for id in detach {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.state = EntryState::Detached;
                entry.site = None;
                if let Some(output) = entry.output() {
                    sweep.detached.push((id, output));
                }
            }
        }
        for id in doomed {
            if let Some(entry) = self.release(id) {
                sweep.released.push(entry);
            }
        }
        sweep
    }

    fn rides_along(&self, entry: &RegistryEntry<O>, generation: u64) -> bool {
        entry
            .container
            .and_then(|c| self.entries.get(&c))
            .is_some_and(|c| {
                c.seen != generation
                    && matches!(c.state, EntryState::Placed | EntryState::Detached)
                    && self.owners.is_alive(c.owner)
            })
    }

    /// Removes `id` from the registry and its owner's subscription list.
    ///
    /// Returns the removed entry so its output can be torn down. The entry
    /// still reports the state it was in when released. Returns `None` if the
    /// id was already released or never issued.
    pub fn release(&mut self, id: HandleId) -> Option<RegistryEntry<O>> {
        let owner = self.owners.unsubscribe(id);
        match self.entries.remove(&id) {
            Some(entry) => Some(entry),
            None => owner.map(|owner| RegistryEntry::new(id, owner)),
        }
    }

    /// Returns the diagnostics collected during the current generation.
    #[must_use]
    pub fn commit_errors(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns whether releases or owner unmounts are waiting for the next
    /// commit boundary.
    #[must_use]
    pub fn has_pending_releases(&self) -> bool {
        !self.releases.is_empty() || self.owners.has_pending_unmounts()
    }

    /// Starts a new generation and clears the previous one's diagnostics.
    pub(crate) fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.diagnostics.clear();
        self.generation
    }

    /// Drains buffered release requests and owner unmounts.
    pub(crate) fn take_pending(&mut self) -> Vec<HandleId> {
        let mut ids = self.releases.take();
        ids.extend(self.owners.take_unmounted());
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
