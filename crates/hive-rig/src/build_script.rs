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

//! Plugin hooks run by the orchestrator at phase boundaries.

use crate::{BuildError, Rig};
use hive_core::{NamingResolver, SceneBackend};
use hive_data::Settings;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A phase boundary at which enabled build scripts run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildHook {
    /// Before guides are built.
    PreGuideBuild,
    /// Before skeletons are built.
    PreDeformBuild,
    /// Before control rigs are built.
    PreRigBuild,
    /// After control rigs are built.
    PostRigBuild,
    /// Before polishing.
    PrePolish,
    /// After polishing.
    PostPolishBuild,
}

impl BuildHook {
    /// Returns the hook name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildHook::PreGuideBuild => "preGuideBuild",
            BuildHook::PreDeformBuild => "preDeformBuild",
            BuildHook::PreRigBuild => "preRigBuild",
            BuildHook::PostRigBuild => "postRigBuild",
            BuildHook::PrePolish => "prePolish",
            BuildHook::PostPolishBuild => "postPolishBuild",
        }
    }
}

impl fmt::Display for BuildHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a build script may touch.
pub struct ScriptContext<'a> {
    /// The rig being built.
    pub rig: &'a mut Rig,
    /// The scene.
    pub scene: &'a mut dyn SceneBackend,
    /// The naming preset of the session.
    pub naming: &'a NamingResolver,
}

/// Studio-specific finalization that runs without modifying the engine.
///
/// Every hook defaults to a no-op. `properties` is the script's bag from the rig
/// configuration; changes to it are stored back after the hook returns.
pub trait BuildScript {
    /// The id rigs use to enable the script.
    fn id(&self) -> &str;

    /// The properties a rig starts with when it has none stored for this script.
    fn default_properties(&self) -> Settings {
        Settings::new()
    }

    /// Runs before guides are built.
    fn pre_guide_build(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Runs before skeletons are built.
    fn pre_deform_build(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Runs before control rigs are built.
    fn pre_rig_build(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Runs after control rigs are built.
    fn post_rig_build(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Runs before polishing.
    fn pre_polish(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Runs after polishing.
    fn post_polish_build(
        &self,
        _ctx: &mut ScriptContext<'_>,
        _properties: &mut Settings,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Dispatches to the hook method matching `hook`.
    fn run_hook(
        &self,
        hook: BuildHook,
        ctx: &mut ScriptContext<'_>,
        properties: &mut Settings,
    ) -> Result<(), BuildError> {
        match hook {
            BuildHook::PreGuideBuild => self.pre_guide_build(ctx, properties),
            BuildHook::PreDeformBuild => self.pre_deform_build(ctx, properties),
            BuildHook::PreRigBuild => self.pre_rig_build(ctx, properties),
            BuildHook::PostRigBuild => self.post_rig_build(ctx, properties),
            BuildHook::PrePolish => self.pre_polish(ctx, properties),
            BuildHook::PostPolishBuild => self.post_polish_build(ctx, properties),
        }
    }
}

/// The build scripts available to a session, keyed by id.
#[derive(Default, Clone)]
pub struct BuildScriptRegistry {
    scripts: IndexMap<String, Arc<dyn BuildScript>>,
}

impl BuildScriptRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a script under its id and returns the one it replaced.
    pub fn register(&mut self, script: Arc<dyn BuildScript>) -> Option<Arc<dyn BuildScript>> {
        let id = script.id().to_string();
        log::info!("BuildScriptRegistry: Registered '{}'", id);
        self.scripts.insert(id, script)
    }

    /// Returns a script by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn BuildScript>> {
        self.scripts.get(id).cloned()
    }

    /// Returns the registered ids, in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.scripts.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl fmt::Debug for BuildScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildScriptRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
