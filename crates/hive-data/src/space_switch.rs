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

//! Space-switch descriptors.
//!
//! A space switch lets an animator pick which driver a control follows. At build time
//! it is purely descriptive: the engine records the driven node, the candidate
//! drivers and the selecting attribute, and the host's constraint system does the rest.

use crate::{ComponentRef, DefinitionError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One candidate driver of a space switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSwitchDriver {
    /// The label shown in the selecting attribute.
    pub label: String,
    /// The component owning the driver node. `None` means the owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentRef>,
    /// The id of the driver node in that component's rig, output or deform layer.
    pub node: String,
}

/// A space switch attached to a component's rig layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSwitchDefinition {
    /// The label of the switch.
    pub label: String,
    /// The id of the driven node in the owning component's rig layer.
    pub driven: String,
    /// The id of the control carrying the selecting attribute.
    pub controller: String,
    /// The name of the selecting attribute.
    pub attribute: String,
    /// The index of the driver active by default.
    #[serde(default)]
    pub default_driver: usize,
    /// The candidate drivers, in attribute order.
    #[serde(default)]
    pub drivers: Vec<SpaceSwitchDriver>,
}

impl SpaceSwitchDefinition {
    /// Checks that the switch has drivers with unique labels and a valid default.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: &str| DefinitionError::InvalidSpaceSwitch {
            label: self.label.clone(),
            reason: reason.to_string(),
        };
        if self.drivers.is_empty() {
            return Err(invalid("it has no drivers"));
        }
        if self.default_driver >= self.drivers.len() {
            return Err(invalid("the default driver index is out of range"));
        }
        let mut labels = HashSet::new();
        if !self.drivers.iter().all(|d| labels.insert(d.label.as_str())) {
            return Err(invalid("driver labels are not unique"));
        }
        Ok(())
    }
}
