// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree descriptions for a single render pass.
//!
//! A description is a plain value. It carries no identity beyond structural
//! equality; the only way to give a subtree a stable identity is to wrap it in
//! a [`PlacementMarker`] via [`ReparentHandle::place`].
//!
//! [`ReparentHandle::place`]: crate::handle::ReparentHandle::place

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::handle::HandleId;

/// Properties of a single node.
///
/// Ordered so that comparisons and renderer updates are deterministic.
pub type Props = BTreeMap<String, String>;

/// Immutable description of a node and its children for one render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtreeDescriptor {
    kind: Cow<'static, str>,
    props: Props,
    children: Vec<Node>,
}

impl SubtreeDescriptor {
    /// Creates a descriptor of the given node kind with no properties and no
    /// children.
    #[must_use]
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Returns this descriptor with `key` set to `value`.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Returns this descriptor with `child` appended.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Returns this descriptor with every item of `children` appended.
    #[must_use]
    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns all properties.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Returns a single property value.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Returns the ordered child slots.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Copy of this node without its children.
    pub(crate) fn shallow(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            props: self.props.clone(),
            children: Vec::new(),
        }
    }
}

/// One child slot of a tree description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Node {
    /// Nothing is rendered in this slot.
    #[default]
    Empty,
    /// An ordinary node, matched against the previous commit by position and
    /// kind.
    Element(SubtreeDescriptor),
    /// A reparentable subtree, matched against the previous commit by handle
    /// identity regardless of position.
    Placement(PlacementMarker),
}

impl From<SubtreeDescriptor> for Node {
    fn from(descriptor: SubtreeDescriptor) -> Self {
        Self::Element(descriptor)
    }
}

impl From<PlacementMarker> for Node {
    fn from(marker: PlacementMarker) -> Self {
        Self::Placement(marker)
    }
}

impl<T: Into<Self>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map_or(Self::Empty, Into::into)
    }
}

/// A descriptor wrapped with a handle's identity.
///
/// Produced by [`ReparentHandle::place`] and consumed once per commit by the
/// reconciler. Creating a marker has no effect on its own.
///
/// [`ReparentHandle::place`]: crate::handle::ReparentHandle::place
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementMarker {
    handle: HandleId,
    descriptor: SubtreeDescriptor,
}

impl PlacementMarker {
    pub(crate) fn new(handle: HandleId, descriptor: SubtreeDescriptor) -> Self {
        Self { handle, descriptor }
    }

    /// Returns the identity of the handle that produced this marker.
    #[must_use]
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Returns the wrapped descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &SubtreeDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_props_and_children() {
        let d = SubtreeDescriptor::new("list")
            .with_prop("title", "inbox")
            .with_child(SubtreeDescriptor::new("item"))
            .with_children([SubtreeDescriptor::new("item"), SubtreeDescriptor::new("item")]);

        assert_eq!(d.kind(), "list");
        assert_eq!(d.prop("title"), Some("inbox"));
        assert_eq!(d.prop("missing"), None);
        assert_eq!(d.children().len(), 3);
    }

    #[test]
    fn shallow_drops_children_only() {
        let d = SubtreeDescriptor::new("row")
            .with_prop("k", "v")
            .with_child(SubtreeDescriptor::new("cell"));
        let s = d.shallow();
        assert_eq!(s.kind(), "row");
        assert_eq!(s.props(), d.props());
        assert!(s.children().is_empty());
    }

    #[test]
    fn option_converts_to_empty_slot() {
        let none: Option<SubtreeDescriptor> = None;
        assert_eq!(Node::from(none), Node::Empty);
        let some = Some(SubtreeDescriptor::new("a"));
        assert!(matches!(Node::from(some), Node::Element(_)));
    }
}
