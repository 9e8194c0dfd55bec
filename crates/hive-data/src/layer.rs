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

//! Definitions of the non-guide layers.

use crate::Settings;
use hive_core::math::Transform;
use hive_core::NodeKind;
use serde::{Deserialize, Serialize};

fn transform_kind() -> NodeKind {
    NodeKind::Transform
}

/// One node recorded in a deform, rig, input or output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// The node id, unique within its layer.
    pub id: String,
    /// The parent node id within the same layer, or `None` for the layer root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// The node type.
    #[serde(default = "transform_kind")]
    pub kind: NodeKind,
    /// The world transform at the time the definition was captured.
    #[serde(flatten)]
    pub transform: Transform,
    /// Per-node settings.
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl NodeDefinition {
    /// Creates a node record.
    pub fn new(
        id: impl Into<String>,
        parent: Option<String>,
        kind: NodeKind,
        transform: Transform,
    ) -> Self {
        Self {
            id: id.into(),
            parent,
            kind,
            transform,
            settings: Settings::new(),
        }
    }
}

/// A deform, rig, input or output layer section of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDefinition {
    /// The nodes of the layer, parents before children.
    pub dag: Vec<NodeDefinition>,
    /// Layer settings.
    pub settings: Settings,
    /// Free-form metadata.
    pub metadata: Settings,
}

impl LayerDefinition {
    /// Returns the node with the given id.
    pub fn node(&self, id: &str) -> Option<&NodeDefinition> {
        self.dag.iter().find(|n| n.id == id)
    }

    /// Reads a boolean setting, falling back to `default`.
    pub fn bool_setting(&self, key: &str, default: bool) -> bool {
        self.settings
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Reads an integer setting, falling back to `default`.
    pub fn int_setting(&self, key: &str, default: i64) -> i64 {
        self.settings
            .get(key)
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    /// Returns `true` if the layer records no nodes, settings or metadata.
    pub fn is_empty(&self) -> bool {
        self.dag.is_empty() && self.settings.is_empty() && self.metadata.is_empty()
    }
}
