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

//! Registry of component behaviours, keyed by type name.

use super::ComponentBehavior;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Maps component type names to their behaviour.
#[derive(Default, Clone)]
pub struct BehaviorRegistry {
    behaviors: IndexMap<String, Arc<dyn ComponentBehavior>>,
}

impl BehaviorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in component types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for behavior in crate::components::builtins() {
            registry.register(behavior);
        }
        registry
    }

    /// Registers a behaviour under its type name and returns the one it replaced.
    pub fn register(
        &mut self,
        behavior: Arc<dyn ComponentBehavior>,
    ) -> Option<Arc<dyn ComponentBehavior>> {
        let name = behavior.component_type().to_string();
        log::info!("BehaviorRegistry: Registered '{}'", name);
        self.behaviors.insert(name, behavior)
    }

    /// Returns the behaviour of a type.
    pub fn get(&self, component_type: &str) -> Option<Arc<dyn ComponentBehavior>> {
        self.behaviors.get(component_type).cloned()
    }

    /// Returns `true` if the type is registered.
    pub fn contains(&self, component_type: &str) -> bool {
        self.behaviors.contains_key(component_type)
    }

    /// Returns the registered type names, in registration order.
    pub fn types(&self) -> Vec<&str> {
        self.behaviors.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("types", &self.types())
            .finish()
    }
}
