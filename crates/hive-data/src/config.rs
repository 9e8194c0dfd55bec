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

//! Global rig configuration.

use crate::Settings;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Build flags shared by every component of a rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RigConfiguration {
    /// Hide the rig internals from the host outliner after polish.
    pub black_box: bool,
    /// Realign guides automatically after mirroring.
    pub auto_align_guides: bool,
    /// Create control and deform selection sets at polish.
    pub build_selection_sets: bool,
    /// Share animator attributes between controls through proxies.
    pub use_proxy_attributes: bool,
    /// Ids of the enabled build scripts, in execution order.
    pub build_scripts: Vec<String>,
    /// Per-script property bags, keyed by script id.
    pub build_script_properties: IndexMap<String, Settings>,
}

impl Default for RigConfiguration {
    fn default() -> Self {
        Self {
            black_box: false,
            auto_align_guides: true,
            build_selection_sets: true,
            use_proxy_attributes: true,
            build_scripts: Vec::new(),
            build_script_properties: IndexMap::new(),
        }
    }
}

impl RigConfiguration {
    /// Enables a build script. Enabling an already enabled script does nothing.
    pub fn enable_build_script(&mut self, id: &str) {
        if !self.build_scripts.iter().any(|s| s == id) {
            self.build_scripts.push(id.to_string());
        }
    }

    /// Disables a build script and drops its properties.
    pub fn disable_build_script(&mut self, id: &str) {
        self.build_scripts.retain(|s| s != id);
        self.build_script_properties.shift_remove(id);
    }

    /// Returns the property bag of a script, creating an empty one if needed.
    pub fn script_properties_mut(&mut self, id: &str) -> &mut Settings {
        self.build_script_properties
            .entry(id.to_string())
            .or_default()
    }
}
