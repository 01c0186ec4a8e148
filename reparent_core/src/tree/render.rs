// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Renderer`] implementation for the retained node tree.

use super::store::NodeId;
use super::store::NodeStore;
use crate::descriptor::SubtreeDescriptor;
use crate::renderer::{PlacementSite, Renderer};

impl Renderer for NodeStore {
    type Output = NodeId;

    fn create(&mut self, descriptor: &SubtreeDescriptor) -> NodeId {
        self.create_node(descriptor.kind(), descriptor.props().clone())
    }

    fn update(&mut self, output: NodeId, previous: &SubtreeDescriptor, next: &SubtreeDescriptor) {
        if previous.props() != next.props() {
            self.set_props(output, next.props().clone());
        }
    }

    fn attach(&mut self, output: NodeId, site: PlacementSite<NodeId>) {
        self.insert_child(site.parent, site.index, output);
        self.set_retained(output, false);
    }

    fn detach_but_retain(&mut self, output: NodeId) {
        if self.parent(output).is_some() {
            self.remove_from_parent(output);
        }
        self.set_retained(output, true);
    }

    fn destroy(&mut self, output: NodeId) {
        self.destroy_node(output);
    }
}
