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

//! Commands that create rigs.

use super::{require_rig, Checkpoint};
use crate::{CommandError, Hive, RigError, RigId};
use hive_core::{Cancellation, Transaction};
use hive_data::{ComponentRef, TemplateDocument};
use hive_io::TemplateRegistry;
use std::path::PathBuf;

/// Creates an empty rig. Undo deletes it; redo brings it back under the same id.
#[derive(Debug, Clone)]
pub struct CreateRig {
    name: String,
    created: Option<RigId>,
}

impl CreateRig {
    /// Creates a rig named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: None,
        }
    }
}

impl Transaction<Hive> for CreateRig {
    type Output = RigId;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Create Rig"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(Cancellation::new("A rig needs a name"));
        }
        if hive.rig_by_name(&self.name).is_some() {
            return Err(Cancellation::new(
                RigError::DuplicateRig(self.name.clone()).to_string(),
            ));
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<RigId, CommandError> {
        let id = hive.insert_new_rig(&self.name, self.created)?;
        self.created = Some(id);
        Ok(id)
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        let id = self.created.ok_or(CommandError::NothingCaptured("Create Rig"))?;
        if hive.contains_rig(id) {
            hive.delete_rig(id)?;
        } else {
            log::warn!("'Create Rig': {} is already gone", id);
        }
        Ok(())
    }
}

/// Where a template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A template stored in the session's registry.
    Name(String),
    /// A template file anywhere on disk.
    File(PathBuf),
}

/// Loads a template into a new rig or into an existing one.
///
/// Undo deletes a rig the command created, or restores an existing rig to how it
/// was before the components were added.
#[derive(Debug, Clone)]
pub struct LoadTemplate {
    source: TemplateSource,
    rig_name: Option<String>,
    into: Option<RigId>,
    path: Option<PathBuf>,
    document: Option<TemplateDocument>,
    created: Option<RigId>,
    checkpoint: Checkpoint,
}

impl LoadTemplate {
    /// Loads `source` into a new rig named after the template.
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            rig_name: None,
            into: None,
            path: None,
            document: None,
            created: None,
            checkpoint: Checkpoint::default(),
        }
    }

    /// Names the new rig.
    pub fn named(mut self, rig_name: impl Into<String>) -> Self {
        self.rig_name = Some(rig_name.into());
        self
    }

    /// Adds the template's components to an existing rig instead.
    pub fn into_rig(mut self, rig: RigId) -> Self {
        self.into = Some(rig);
        self
    }
}

impl Transaction<Hive> for LoadTemplate {
    type Output = (RigId, Vec<ComponentRef>);
    type Error = CommandError;

    fn name(&self) -> &str {
        "Load Template"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        if let Some(rig) = self.into {
            require_rig(hive, rig)?;
        }
        let path = match &self.source {
            TemplateSource::Name(name) => hive
                .session()
                .template_registry()
                .and_then(|registry| registry.path_of(name).map_err(RigError::from))
                .map_err(|e| Cancellation::new(e.to_string()))?,
            TemplateSource::File(path) => path.clone(),
        };
        if !path.is_file() {
            return Err(Cancellation::new(format!(
                "Template file {} does not exist",
                path.display()
            )));
        }
        self.path = Some(path);
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<(RigId, Vec<ComponentRef>), CommandError> {
        let document = match &self.document {
            Some(document) => document.clone(),
            None => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or(CommandError::NothingCaptured("Load Template"))?;
                let document = TemplateRegistry::load_file(path).map_err(RigError::from)?;
                self.document = Some(document.clone());
                document
            }
        };

        if let Some(rig) = self.into {
            let loaded = self
                .checkpoint
                .run(hive, rig, "Load Template", true, |rig, session| {
                    rig.populate(session, &document, false)
                })?;
            return Ok((rig, loaded));
        }

        let (id, created) =
            hive.load_document(&document, self.rig_name.as_deref(), None, self.created)?;
        self.created = Some(id);
        Ok((id, created))
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        if self.into.is_some() {
            return self.checkpoint.restore(hive, "Load Template");
        }
        let id = self
            .created
            .ok_or(CommandError::NothingCaptured("Load Template"))?;
        if hive.contains_rig(id) {
            hive.delete_rig(id)?;
        } else {
            log::warn!("'Load Template': {} is already gone", id);
        }
        Ok(())
    }
}
