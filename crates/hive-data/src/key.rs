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

//! Component identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity triple of a component. It is unique within a rig.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentKey {
    /// The behaviour type name, such as `"vchaincomponent"`.
    #[serde(rename = "type")]
    pub component_type: String,
    /// The component name, such as `"arm"`.
    pub name: String,
    /// The side label, such as `"L"` or `"M"`.
    pub side: String,
}

impl ComponentKey {
    /// Creates a key from its parts.
    pub fn new(
        component_type: impl Into<String>,
        name: impl Into<String>,
        side: impl Into<String>,
    ) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
            side: side.into(),
        }
    }

    /// Returns the name/side reference to this component.
    pub fn to_ref(&self) -> ComponentRef {
        ComponentRef::new(&self.name, &self.side)
    }

    /// Returns `true` if this key has the given name and side.
    pub fn matches(&self, name: &str, side: &str) -> bool {
        self.name == name && self.side == side
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.name, self.side, self.component_type)
    }
}

/// A reference to a component by name and side, as stored in parent links and
/// space-switch drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    /// The component name.
    pub name: String,
    /// The component side.
    pub side: String,
}

impl ComponentRef {
    /// Creates a reference from a name and a side.
    pub fn new(name: impl Into<String>, side: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            side: side.into(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.side)
    }
}
