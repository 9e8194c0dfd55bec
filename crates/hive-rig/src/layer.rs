// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed sub-graphs of scene nodes, one per build phase of a component.

use crate::BuildError;
use hive_core::math::Mat4;
use hive_core::naming::rules;
use hive_core::{NamingResolver, NodeHandle, NodeKind, SceneBackend, SceneError};
use hive_data::ComponentRef;
use indexmap::IndexMap;
use std::fmt;

/// The attribute holding a layer's visibility on its root node.
pub const VISIBILITY_ATTR: &str = "visibility";
/// The attribute holding a layer's pinned flag on its root node.
pub const PINNED_ATTR: &str = "hivePinned";

/// The build phase a layer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// Placement guides.
    Guide,
    /// The skeleton.
    Deform,
    /// Animation controls.
    Rig,
    /// Nodes driven from outside the component.
    Input,
    /// Nodes other components attach to.
    Output,
}

impl LayerKind {
    /// Every layer kind, in build order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Guide,
        LayerKind::Deform,
        LayerKind::Rig,
        LayerKind::Input,
        LayerKind::Output,
    ];

    /// Returns the `layerType` token used in layer root names.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Guide => "guide",
            LayerKind::Deform => "deform",
            LayerKind::Rig => "rig",
            LayerKind::Input => "input",
            LayerKind::Output => "output",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scene node owned by a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    /// The scene handle.
    pub handle: NodeHandle,
    /// The generated node name.
    pub name: String,
    /// The node kind.
    pub kind: NodeKind,
}

/// The scene nodes one build phase created for a component.
///
/// A layer owns a root group and every node it created under it, keyed by a
/// component-local id. Deleting the layer deletes all of them.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    owner: ComponentRef,
    root: LayerNode,
    nodes: IndexMap<String, LayerNode>,
    hidden: bool,
    pinned: bool,
}

impl Layer {
    /// Creates the layer root under `parent`.
    pub(crate) fn create(
        scene: &mut dyn SceneBackend,
        naming: &NamingResolver,
        kind: LayerKind,
        owner: &ComponentRef,
        parent: NodeHandle,
    ) -> Result<Self, BuildError> {
        let name = naming.resolve(
            rules::LAYER_ROOT,
            &[
                ("componentName", owner.name.as_str()),
                ("side", owner.side.as_str()),
                ("layerType", kind.as_str()),
            ],
        )?;
        let handle = scene.create_node(NodeKind::Group, &name)?;
        scene.set_parent(handle, Some(parent))?;
        scene.set_attribute(handle, VISIBILITY_ATTR, true.into())?;
        scene.set_attribute(handle, PINNED_ATTR, false.into())?;
        log::debug!("Created {} layer '{}' for {}", kind, name, owner);

        Ok(Self {
            kind,
            owner: owner.clone(),
            root: LayerNode {
                handle,
                name,
                kind: NodeKind::Group,
            },
            nodes: IndexMap::new(),
            hidden: false,
            pinned: false,
        })
    }

    /// Returns the layer kind.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Returns the layer root node.
    pub fn root(&self) -> &LayerNode {
        &self.root
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: &str) -> Option<&LayerNode> {
        self.nodes.get(id)
    }

    /// Returns the handle of the node with the given id.
    pub fn handle(&self, id: &str) -> Option<NodeHandle> {
        self.nodes.get(id).map(|n| n.handle)
    }

    /// Iterates the nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &LayerNode)> {
        self.nodes.iter().map(|(id, n)| (id.as_str(), n))
    }

    /// Returns the names of the nodes of one kind, in creation order.
    pub fn names_of_kind(&self, kind: NodeKind) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.kind == kind)
            .map(|n| n.name.clone())
            .collect()
    }

    /// Returns the number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the layer holds no nodes besides its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the layer is hidden.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns `true` if the layer is pinned.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Creates a node under the node `parent`, or under the layer root.
    ///
    /// A parent id the layer does not know falls back to the layer root.
    pub fn add_node(
        &mut self,
        scene: &mut dyn SceneBackend,
        id: &str,
        kind: NodeKind,
        name: &str,
        parent: Option<&str>,
        world: Mat4,
    ) -> Result<NodeHandle, BuildError> {
        if self.nodes.contains_key(id) {
            return Err(BuildError::Behavior {
                component: self.owner.to_string(),
                reason: format!("the {} layer already has a node '{}'", self.kind, id),
            });
        }
        let parent = parent
            .and_then(|p| self.handle(p))
            .unwrap_or(self.root.handle);

        let handle = scene.create_node(kind, name)?;
        scene.set_parent(handle, Some(parent))?;
        scene.set_world_transform(handle, world)?;
        self.nodes.insert(
            id.to_string(),
            LayerNode {
                handle,
                name: name.to_string(),
                kind,
            },
        );
        Ok(handle)
    }

    /// Reads the world matrices of the nodes that still exist.
    pub fn world_transforms(
        &self,
        scene: &dyn SceneBackend,
    ) -> Result<IndexMap<String, Mat4>, SceneError> {
        let mut out = IndexMap::new();
        for (id, node) in &self.nodes {
            if scene.exists(node.handle) {
                out.insert(id.clone(), scene.world_transform(node.handle)?);
            }
        }
        Ok(out)
    }

    pub(crate) fn set_hidden(
        &mut self,
        scene: &mut dyn SceneBackend,
        hidden: bool,
    ) -> Result<(), SceneError> {
        self.hidden = hidden;
        if scene.exists(self.root.handle) {
            scene.set_attribute(self.root.handle, VISIBILITY_ATTR, (!hidden).into())?;
        }
        Ok(())
    }

    pub(crate) fn set_pinned(
        &mut self,
        scene: &mut dyn SceneBackend,
        pinned: bool,
    ) -> Result<(), SceneError> {
        self.pinned = pinned;
        if scene.exists(self.root.handle) {
            scene.set_attribute(self.root.handle, PINNED_ATTR, pinned.into())?;
        }
        Ok(())
    }

    /// Deletes the layer root and every node that was moved out from under it.
    ///
    /// Handles deleted by someone else are skipped.
    pub(crate) fn delete(self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        if scene.exists(self.root.handle) {
            scene.delete_node(self.root.handle)?;
        } else {
            log::debug!("Layer root '{}' was already deleted", self.root.name);
        }
        for node in self.nodes.values() {
            if scene.exists(node.handle) {
                scene.delete_node(node.handle)?;
            }
        }
        log::debug!("Deleted {} layer of {}", self.kind, self.owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::math::Vec3;
    use hive_core::AttributeValue;
    use hive_infra::MemoryScene;

    fn layer(scene: &mut MemoryScene) -> Layer {
        let parent = scene.create_node(NodeKind::Group, "arm_L_hrc").unwrap();
        Layer::create(
            scene,
            &NamingResolver::default(),
            LayerKind::Deform,
            &ComponentRef::new("arm", "L"),
            parent,
        )
        .unwrap()
    }

    #[test]
    fn test_root_name_follows_naming_rule() {
        let mut scene = MemoryScene::new();
        let layer = layer(&mut scene);
        assert_eq!(layer.root().name, "arm_L_deform_hrc");
        assert_eq!(
            scene.attribute(layer.root().handle, VISIBILITY_ATTR).unwrap(),
            Some(AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_add_node_parents_by_id() {
        let mut scene = MemoryScene::new();
        let mut layer = layer(&mut scene);
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let upr = layer
            .add_node(&mut scene, "upr", NodeKind::Joint, "arm_L_upr_jnt", None, world)
            .unwrap();
        let mid = layer
            .add_node(&mut scene, "mid", NodeKind::Joint, "arm_L_mid_jnt", Some("upr"), world)
            .unwrap();

        assert_eq!(scene.parent(upr), Some(layer.root().handle));
        assert_eq!(scene.parent(mid), Some(upr));
        assert_eq!(scene.world_transform(mid).unwrap(), world);
        assert!(layer
            .add_node(&mut scene, "mid", NodeKind::Joint, "dup", None, world)
            .is_err());
        assert_eq!(layer.names_of_kind(NodeKind::Joint).len(), 2);
    }

    #[test]
    fn test_delete_tolerates_removed_nodes() {
        let mut scene = MemoryScene::new();
        let mut layer = layer(&mut scene);
        let node = layer
            .add_node(&mut scene, "a", NodeKind::Joint, "a", None, Mat4::IDENTITY)
            .unwrap();
        scene.delete_node(node).unwrap();
        let before = scene.len();

        layer.delete(&mut scene).unwrap();
        assert_eq!(scene.len(), before - 1);
    }

    #[test]
    fn test_hidden_and_pinned_write_attributes() {
        let mut scene = MemoryScene::new();
        let mut layer = layer(&mut scene);
        layer.set_hidden(&mut scene, true).unwrap();
        layer.set_pinned(&mut scene, true).unwrap();

        let root = layer.root().handle;
        assert_eq!(scene.attribute(root, VISIBILITY_ATTR).unwrap(), Some(AttributeValue::Bool(false)));
        assert_eq!(scene.attribute(root, PINNED_ATTR).unwrap(), Some(AttributeValue::Bool(true)));
        assert!(layer.is_hidden() && layer.is_pinned());
    }
}
