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

use super::{AttributeValue, NodeHandle, NodeKind, SceneError};
use crate::math::Mat4;
use std::any::Any;

/// The primitives the rig engine needs from a host scene graph.
///
/// Transforms are exchanged as world-space matrices. Implementations are not assumed
/// to be thread-safe; the engine calls them from a single thread and every call must
/// complete before returning.
pub trait SceneBackend {
    /// Creates a new, unparented node at the world origin.
    fn create_node(&mut self, kind: NodeKind, name: &str) -> Result<NodeHandle, SceneError>;

    /// Returns `true` if `handle` refers to a live node.
    fn exists(&self, handle: NodeHandle) -> bool;

    /// Parents `handle` under `parent`, or under the scene root for `None`.
    ///
    /// The node keeps its world transform.
    fn set_parent(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
    ) -> Result<(), SceneError>;

    /// Returns the parent of a node, or `None` for a node under the scene root.
    fn parent_of(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, SceneError>;

    /// Returns the direct children of a node.
    fn children_of(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, SceneError>;

    /// Returns the world-space matrix of a node.
    fn world_transform(&self, handle: NodeHandle) -> Result<Mat4, SceneError>;

    /// Sets the world-space matrix of a node.
    ///
    /// Only the node itself moves: descendants keep their own world matrices.
    /// Hosts where children follow their parent must compensate in the backend.
    fn set_world_transform(&mut self, handle: NodeHandle, matrix: Mat4)
        -> Result<(), SceneError>;

    /// Deletes a node together with everything parented below it.
    fn delete_node(&mut self, handle: NodeHandle) -> Result<(), SceneError>;

    /// Creates or overwrites an attribute on a node.
    fn set_attribute(
        &mut self,
        handle: NodeHandle,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), SceneError>;

    /// Reads an attribute. Returns `Ok(None)` if the node has no such attribute.
    fn attribute(&self, handle: NodeHandle, name: &str)
        -> Result<Option<AttributeValue>, SceneError>;

    /// Returns `self` as `&dyn Any`, so callers can reach the concrete backend.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
