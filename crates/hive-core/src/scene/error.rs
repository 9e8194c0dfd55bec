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

use super::NodeHandle;
use std::fmt;

/// An error reported by a scene backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The handle does not refer to a live node. It was never created, or the node
    /// has been deleted since.
    InvalidHandle(NodeHandle),
    /// Parenting `child` under `parent` would make a node its own ancestor.
    ParentCycle {
        /// The node being re-parented.
        child: NodeHandle,
        /// The requested parent.
        parent: NodeHandle,
    },
    /// The backend refused to create a node.
    CreationFailed {
        /// The requested node name.
        name: String,
        /// A backend-specific reason.
        reason: String,
    },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::InvalidHandle(handle) => {
                write!(f, "Scene node {handle} does not exist")
            }
            SceneError::ParentCycle { child, parent } => {
                write!(
                    f,
                    "Cannot parent node {child} under {parent}: it would create a cycle"
                )
            }
            SceneError::CreationFailed { name, reason } => {
                write!(f, "Failed to create scene node '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for SceneError {}
