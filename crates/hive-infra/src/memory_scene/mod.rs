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

//! An in-memory scene graph.

mod snapshot;

pub use self::snapshot::{NodeSnapshot, SceneSnapshot};

use hive_core::math::Mat4;
use hive_core::{AttributeValue, NodeHandle, NodeKind, SceneBackend, SceneError};
use std::any::Any;
use std::collections::BTreeMap;

/// The data of one live node.
#[derive(Debug, Clone)]
struct SceneNode {
    kind: NodeKind,
    name: String,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    world: Mat4,
    attributes: BTreeMap<String, AttributeValue>,
}

/// A [`SceneBackend`] that keeps every node in memory.
///
/// Nodes live in generational slots. Deleting a node frees its slot for reuse and
/// bumps the slot generation, so handles to deleted nodes stop resolving instead of
/// aliasing the next node created in the same slot.
///
/// World matrices are stored per node. Re-parenting keeps a node's world transform and
/// moving a parent does not move its children; the engine always sets world
/// transforms explicitly.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    /// Every slot ever created. `None` marks a free slot.
    slots: Vec<(NodeHandle, Option<SceneNode>)>,
    /// Indices of free slots, reused most recent first.
    freed: Vec<u32>,
    /// Kind and name of every node created, in order.
    creation_log: Vec<(NodeKind, String)>,
}

impl MemoryScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, handle: NodeHandle) -> Result<&SceneNode, SceneError> {
        self.slots
            .get(handle.index as usize)
            .and_then(|(slot, node)| {
                if slot.generation == handle.generation {
                    node.as_ref()
                } else {
                    None
                }
            })
            .ok_or(SceneError::InvalidHandle(handle))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut SceneNode, SceneError> {
        self.slots
            .get_mut(handle.index as usize)
            .and_then(|(slot, node)| {
                if slot.generation == handle.generation {
                    node.as_mut()
                } else {
                    None
                }
            })
            .ok_or(SceneError::InvalidHandle(handle))
    }

    /// Returns the name of a live node.
    pub fn name(&self, handle: NodeHandle) -> Option<&str> {
        self.node(handle).ok().map(|n| n.name.as_str())
    }

    /// Returns the kind of a live node.
    pub fn kind(&self, handle: NodeHandle) -> Option<NodeKind> {
        self.node(handle).ok().map(|n| n.kind)
    }

    /// Returns the parent of a live node, or `None` for scene roots and dead handles.
    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.node(handle).ok().and_then(|n| n.parent)
    }

    /// Returns the children of a live node, in parenting order.
    pub fn children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.node(handle)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Returns the first live node with the given name, in slot order.
    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.live().find(|(_, n)| n.name == name).map(|(h, _)| h)
    }

    /// Returns every live node of the given kind, in slot order.
    pub fn find_kind(&self, kind: NodeKind) -> Vec<NodeHandle> {
        self.live()
            .filter(|(_, n)| n.kind == kind)
            .map(|(h, _)| h)
            .collect()
    }

    /// Returns the handles of all live nodes, in slot order.
    pub fn handles(&self) -> Vec<NodeHandle> {
        self.live().map(|(h, _)| h).collect()
    }

    /// Returns the number of live nodes.
    pub fn len(&self) -> usize {
        self.live().count()
    }

    /// Returns `true` if the scene has no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the kind and name of every node created so far, in creation order.
    pub fn creation_log(&self) -> &[(NodeKind, String)] {
        &self.creation_log
    }

    /// Forgets the creation log.
    pub fn clear_creation_log(&mut self) {
        self.creation_log.clear();
    }

    /// Returns the `|`-separated name path of a live node from its scene root.
    pub fn path(&self, handle: NodeHandle) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            let node = self.node(h).ok()?;
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        Some(names.join("|"))
    }

    /// Captures the full state of the scene, independent of handle values.
    pub fn snapshot(&self) -> SceneSnapshot {
        let nodes = self
            .live()
            .filter_map(|(h, n)| {
                Some(NodeSnapshot {
                    path: self.path(h)?,
                    kind: n.kind,
                    world: n.world,
                    attributes: n.attributes.clone(),
                })
            })
            .collect();
        SceneSnapshot::new(nodes)
    }

    fn live(&self) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.slots
            .iter()
            .filter_map(|(h, n)| n.as_ref().map(|n| (*h, n)))
    }

    fn free_slot(&mut self, handle: NodeHandle) {
        if let Some((_, node)) = self.slots.get_mut(handle.index as usize) {
            *node = None;
            self.freed.push(handle.index);
        }
    }

    fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.parent(h);
        }
        false
    }
}

impl SceneBackend for MemoryScene {
    fn create_node(&mut self, kind: NodeKind, name: &str) -> Result<NodeHandle, SceneError> {
        let node = SceneNode {
            kind,
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
            attributes: BTreeMap::new(),
        };
        let handle = if let Some(index) = self.freed.pop() {
            let (slot, data) = &mut self.slots[index as usize];
            slot.generation += 1;
            *data = Some(node);
            *slot
        } else {
            let handle = NodeHandle::new(self.slots.len() as u32, 0);
            self.slots.push((handle, Some(node)));
            handle
        };
        self.creation_log.push((kind, name.to_string()));
        log::trace!("Created {} '{}' as {}", kind, name, handle);
        Ok(handle)
    }

    fn exists(&self, handle: NodeHandle) -> bool {
        self.node(handle).is_ok()
    }

    fn set_parent(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
    ) -> Result<(), SceneError> {
        let old_parent = self.node(handle)?.parent;
        if let Some(new_parent) = parent {
            self.node(new_parent)?;
            if self.is_ancestor(handle, new_parent) {
                return Err(SceneError::ParentCycle {
                    child: handle,
                    parent: new_parent,
                });
            }
        }
        if old_parent == parent {
            return Ok(());
        }

        if let Some(old) = old_parent {
            if let Ok(old_node) = self.node_mut(old) {
                old_node.children.retain(|c| *c != handle);
            }
        }
        if let Some(new_parent) = parent {
            self.node_mut(new_parent)?.children.push(handle);
        }
        self.node_mut(handle)?.parent = parent;
        Ok(())
    }

    fn parent_of(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, SceneError> {
        Ok(self.node(handle)?.parent)
    }

    fn children_of(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, SceneError> {
        Ok(self.node(handle)?.children.clone())
    }

    fn world_transform(&self, handle: NodeHandle) -> Result<Mat4, SceneError> {
        Ok(self.node(handle)?.world)
    }

    fn set_world_transform(
        &mut self,
        handle: NodeHandle,
        matrix: Mat4,
    ) -> Result<(), SceneError> {
        self.node_mut(handle)?.world = matrix;
        Ok(())
    }

    fn delete_node(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        let parent = self.node(handle)?.parent;
        if let Some(parent) = parent {
            if let Ok(parent_node) = self.node_mut(parent) {
                parent_node.children.retain(|c| *c != handle);
            }
        }

        // Children first, so slots are freed leaves-up.
        let mut stack = vec![handle];
        let mut order = Vec::new();
        while let Some(h) = stack.pop() {
            order.push(h);
            stack.extend(self.children(h));
        }
        for h in order.into_iter().rev() {
            self.free_slot(h);
        }
        log::trace!("Deleted {}", handle);
        Ok(())
    }

    fn set_attribute(
        &mut self,
        handle: NodeHandle,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), SceneError> {
        self.node_mut(handle)?
            .attributes
            .insert(name.to_string(), value);
        Ok(())
    }

    fn attribute(
        &self,
        handle: NodeHandle,
        name: &str,
    ) -> Result<Option<AttributeValue>, SceneError> {
        Ok(self.node(handle)?.attributes.get(name).cloned())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
