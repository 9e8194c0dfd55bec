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

//! The session: the scene backend plus every registry, and the [`Hive`] that owns
//! the rigs built in it.

use crate::build_script::{BuildScript, BuildScriptRegistry};
use crate::component::{BehaviorRegistry, ComponentBehavior};
use crate::exporter::{DefinitionExporter, Exporter, ExporterRegistry};
use crate::{ExportError, Rig, RigError};
use hive_core::{NamingResolver, SceneBackend};
use hive_data::{ComponentRef, Settings, TemplateDocument};
use hive_io::TemplateRegistry;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies a rig within a [`Hive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RigId(u32);

impl RigId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rig#{}", self.0)
    }
}

/// The scene and the registries every rig operation draws on.
pub struct Session {
    pub(crate) scene: Box<dyn SceneBackend>,
    pub(crate) naming: NamingResolver,
    pub(crate) behaviors: BehaviorRegistry,
    pub(crate) build_scripts: BuildScriptRegistry,
    pub(crate) exporters: ExporterRegistry,
    pub(crate) templates: Option<TemplateRegistry>,
}

impl Session {
    /// Starts building a session over `scene`.
    pub fn builder(scene: impl SceneBackend + 'static) -> SessionBuilder {
        SessionBuilder::new(Box::new(scene))
    }

    /// Returns the scene.
    pub fn scene(&self) -> &dyn SceneBackend {
        self.scene.as_ref()
    }

    /// Returns the scene mutably. Edits made here are what guides serialize from.
    pub fn scene_mut(&mut self) -> &mut dyn SceneBackend {
        self.scene.as_mut()
    }

    /// Returns the naming preset.
    pub fn naming(&self) -> &NamingResolver {
        &self.naming
    }

    /// Returns the component behaviours.
    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    /// Returns the build scripts.
    pub fn build_scripts(&self) -> &BuildScriptRegistry {
        &self.build_scripts
    }

    /// Returns the exporters.
    pub fn exporters(&self) -> &ExporterRegistry {
        &self.exporters
    }

    /// Returns the template registry, if one was configured.
    pub fn templates(&self) -> Option<&TemplateRegistry> {
        self.templates.as_ref()
    }

    pub(crate) fn template_registry(&self) -> Result<&TemplateRegistry, RigError> {
        self.templates.as_ref().ok_or(RigError::NoTemplateRegistry)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("naming", &self.naming.config().name)
            .field("behaviors", &self.behaviors)
            .field("build_scripts", &self.build_scripts)
            .field("exporters", &self.exporters)
            .field("templates", &self.templates.as_ref().map(|t| t.root()))
            .finish()
    }
}

/// A builder for [`Session`].
///
/// The built-in component types and the definition exporter are registered unless
/// [`SessionBuilder::without_builtins`] is called.
pub struct SessionBuilder {
    scene: Box<dyn SceneBackend>,
    naming: NamingResolver,
    builtins: bool,
    behaviors: Vec<Arc<dyn ComponentBehavior>>,
    build_scripts: Vec<Arc<dyn BuildScript>>,
    exporters: Vec<Arc<dyn Exporter>>,
    templates: Option<PathBuf>,
}

impl SessionBuilder {
    fn new(scene: Box<dyn SceneBackend>) -> Self {
        Self {
            scene,
            naming: NamingResolver::default(),
            builtins: true,
            behaviors: Vec::new(),
            build_scripts: Vec::new(),
            exporters: Vec::new(),
            templates: None,
        }
    }

    /// Uses a naming preset other than the default one.
    pub fn with_naming(mut self, naming: NamingResolver) -> Self {
        self.naming = naming;
        self
    }

    /// Registers a component behaviour. A later registration of the same type wins.
    pub fn with_behavior(mut self, behavior: impl ComponentBehavior + 'static) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    /// Registers a build script.
    pub fn with_build_script(mut self, script: impl BuildScript + 'static) -> Self {
        self.build_scripts.push(Arc::new(script));
        self
    }

    /// Registers an exporter.
    pub fn with_exporter(mut self, exporter: impl Exporter + 'static) -> Self {
        self.exporters.push(Arc::new(exporter));
        self
    }

    /// Stores templates under `root`.
    pub fn with_templates(mut self, root: impl Into<PathBuf>) -> Self {
        self.templates = Some(root.into());
        self
    }

    /// Skips the built-in component types and exporters.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Builds the session.
    pub fn build(self) -> Session {
        let mut behaviors = if self.builtins {
            BehaviorRegistry::with_builtins()
        } else {
            BehaviorRegistry::new()
        };
        for behavior in self.behaviors {
            behaviors.register(behavior);
        }

        let mut build_scripts = BuildScriptRegistry::new();
        for script in self.build_scripts {
            build_scripts.register(script);
        }

        let mut exporters = ExporterRegistry::new();
        if self.builtins {
            exporters.register(Arc::new(DefinitionExporter));
        }
        for exporter in self.exporters {
            exporters.register(exporter);
        }

        log::info!(
            "Session ready: {} component type(s), {} build script(s), {} exporter(s), naming '{}'",
            behaviors.len(),
            build_scripts.len(),
            exporters.len(),
            self.naming.config().name
        );
        Session {
            scene: self.scene,
            naming: self.naming,
            behaviors,
            build_scripts,
            exporters,
            templates: self.templates.map(TemplateRegistry::new),
        }
    }
}

/// The top-level engine object: a session and the rigs built in it.
#[derive(Debug)]
pub struct Hive {
    session: Session,
    rigs: IndexMap<RigId, Rig>,
    next_id: u32,
}

impl Hive {
    /// Creates an engine with no rigs.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            rigs: IndexMap::new(),
            next_id: 0,
        }
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Returns the scene.
    pub fn scene(&self) -> &dyn SceneBackend {
        self.session.scene()
    }

    /// Returns the scene mutably.
    pub fn scene_mut(&mut self) -> &mut dyn SceneBackend {
        self.session.scene_mut()
    }

    /// Creates an empty rig. Rig names are unique within the engine.
    pub fn create_rig(&mut self, name: &str) -> Result<RigId, RigError> {
        self.insert_new_rig(name, None)
    }

    /// Creates an empty rig, reusing `id` when given so a redone command finds the
    /// rig it created the first time.
    pub(crate) fn insert_new_rig(&mut self, name: &str, id: Option<RigId>) -> Result<RigId, RigError> {
        if name.trim().is_empty() {
            return Err(RigError::InvalidName(name.to_string()));
        }
        if self.rig_by_name(name).is_some() {
            return Err(RigError::DuplicateRig(name.to_string()));
        }
        let id = match id {
            Some(id) if !self.rigs.contains_key(&id) => {
                self.next_id = self.next_id.max(id.index() + 1);
                id
            }
            _ => {
                let id = RigId::new(self.next_id);
                self.next_id += 1;
                id
            }
        };
        self.rigs.insert(id, Rig::new(id, name));
        log::info!("Created rig '{}' ({})", name, id);
        Ok(id)
    }

    /// Deletes a rig and everything it built in the scene.
    pub fn delete_rig(&mut self, id: RigId) -> Result<(), RigError> {
        let mut rig = self.rigs.shift_remove(&id).ok_or(RigError::RigNotFound(id))?;
        rig.teardown(self.session.scene.as_mut())?;
        log::info!("Deleted rig '{}' ({})", rig.name(), id);
        Ok(())
    }

    /// Returns a rig.
    pub fn rig(&self, id: RigId) -> Result<&Rig, RigError> {
        self.rigs.get(&id).ok_or(RigError::RigNotFound(id))
    }

    /// Returns a rig mutably.
    pub fn rig_mut(&mut self, id: RigId) -> Result<&mut Rig, RigError> {
        self.rigs.get_mut(&id).ok_or(RigError::RigNotFound(id))
    }

    /// Finds a rig by name.
    pub fn rig_by_name(&self, name: &str) -> Option<&Rig> {
        self.rigs.values().find(|r| r.name() == name)
    }

    /// Iterates the rigs in creation order.
    pub fn rigs(&self) -> impl Iterator<Item = &Rig> {
        self.rigs.values()
    }

    /// Returns `true` if the rig exists.
    pub fn contains_rig(&self, id: RigId) -> bool {
        self.rigs.contains_key(&id)
    }

    /// Runs `f` with a rig and the session borrowed together.
    pub fn with_rig<R, E>(
        &mut self,
        id: RigId,
        f: impl FnOnce(&mut Rig, &mut Session) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<RigError>,
    {
        let rig = self.rigs.get_mut(&id).ok_or(RigError::RigNotFound(id))?;
        f(rig, &mut self.session)
    }

    /// Serializes a rig into the template registry under `name`.
    pub fn save_template(&self, id: RigId, name: &str, overwrite: bool) -> Result<PathBuf, RigError> {
        let rig = self.rig(id)?;
        let document = rig.to_template(self.session.scene(), name)?;
        let path = self
            .session
            .template_registry()?
            .save(name, &document, overwrite)?;
        Ok(path)
    }

    /// Loads a template from the registry. See [`Hive::load_from_template_file`].
    pub fn load_template(
        &mut self,
        template: &str,
        rig_name: Option<&str>,
        into: Option<RigId>,
    ) -> Result<(RigId, Vec<ComponentRef>), RigError> {
        let path = self.session.template_registry()?.path_of(template)?;
        self.load_from_template_file(&path, rig_name, into)
    }

    /// Loads a template file into a new rig, or into `into` when given.
    ///
    /// A new rig is named `rig_name`, falling back to the template name. Returns the
    /// rig and the components that were added to it.
    pub fn load_from_template_file(
        &mut self,
        path: &Path,
        rig_name: Option<&str>,
        into: Option<RigId>,
    ) -> Result<(RigId, Vec<ComponentRef>), RigError> {
        let document = TemplateRegistry::load_file(path)?;
        self.load_document(&document, rig_name, into, None)
    }

    /// Populates a new rig, or `into` when given, from a template document.
    ///
    /// `new_id` pins the id of a newly created rig. A new rig is removed again if
    /// populating it fails.
    pub(crate) fn load_document(
        &mut self,
        document: &TemplateDocument,
        rig_name: Option<&str>,
        into: Option<RigId>,
        new_id: Option<RigId>,
    ) -> Result<(RigId, Vec<ComponentRef>), RigError> {
        let id = match into {
            Some(id) => {
                self.rig(id)?;
                id
            }
            None => self.insert_new_rig(rig_name.unwrap_or(&document.name), new_id)?,
        };

        let rig = self.rigs.get_mut(&id).ok_or(RigError::RigNotFound(id))?;
        match rig.populate(&mut self.session, document, into.is_none()) {
            Ok(created) => Ok((id, created)),
            Err(e) => {
                if into.is_none() {
                    if let Some(mut rig) = self.rigs.shift_remove(&id) {
                        rig.teardown(self.session.scene.as_mut())?;
                    }
                }
                Err(e)
            }
        }
    }

    /// Deletes a stored template.
    pub fn delete_template(&self, name: &str) -> Result<(), RigError> {
        self.session.template_registry()?.delete(name)?;
        Ok(())
    }

    /// Runs an exporter over a rig.
    ///
    /// `settings` override the exporter's defaults key by key.
    pub fn export(
        &self,
        id: RigId,
        exporter: &str,
        settings: Option<&Settings>,
        progress: &mut dyn FnMut(u32, &str),
    ) -> Result<(), ExportError> {
        let rig = self.rig(id)?;
        let exporter = self
            .session
            .exporters
            .get(exporter)
            .ok_or_else(|| ExportError::UnknownExporter(exporter.to_string()))?;

        let mut merged = exporter.export_settings();
        if let Some(settings) = settings {
            for (key, value) in settings {
                merged.insert(key.clone(), value.clone());
            }
        }
        log::info!("Exporting rig '{}' with '{}'", rig.name(), exporter.id());
        exporter.execute(rig, self.session.scene(), &merged, progress)
    }
}
