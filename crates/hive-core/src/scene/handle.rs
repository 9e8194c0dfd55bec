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

//! Defines node handles and node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque handle to a node in the scene backend.
///
/// It combines an index with a generation count. When a node is deleted its index
/// may be recycled, but the generation is incremented, so stale handles held by a
/// layer or an undo record are detected instead of touching an unrelated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle {
    /// The slot index of the node inside the backend.
    pub index: u32,
    /// A generation counter that is incremented each time the index is recycled.
    pub generation: u32,
}

impl NodeHandle {
    /// Creates a handle from its raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The type of node requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// A plain grouping transform, used for rig, component and layer roots.
    Group,
    /// A placement-time guide.
    Guide,
    /// The visual shape node attached to a guide.
    GuideShape,
    /// A skeleton joint.
    Joint,
    /// An animator-facing control.
    Control,
    /// A component input transform.
    Input,
    /// A component output transform.
    Output,
    /// A space-switch descriptor node.
    SpaceSwitch,
    /// A selection set.
    SelectionSet,
    /// Any other transform, such as a pole vector helper.
    Transform,
}

impl NodeKind {
    /// Returns the lowercase type name, as used in logs and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Guide => "guide",
            NodeKind::GuideShape => "guideShape",
            NodeKind::Joint => "joint",
            NodeKind::Control => "control",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::SpaceSwitch => "spaceSwitch",
            NodeKind::SelectionSet => "selectionSet",
            NodeKind::Transform => "transform",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
