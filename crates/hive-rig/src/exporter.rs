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

//! Exporters turn a rig into files for downstream tools.

use crate::{ExportError, Rig, RigError};
use hive_core::SceneBackend;
use hive_data::{Settings, TemplateDocument};
use hive_io::{write_template_file, TemplateError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A named export target with its own settings.
pub trait Exporter {
    /// The id callers select the exporter by.
    fn id(&self) -> &str;

    /// The settings the exporter accepts, with their default values.
    fn export_settings(&self) -> Settings;

    /// Writes the rig out.
    ///
    /// `progress` receives a completion percentage and a short message.
    fn execute(
        &self,
        rig: &Rig,
        scene: &dyn SceneBackend,
        settings: &Settings,
        progress: &mut dyn FnMut(u32, &str),
    ) -> Result<(), ExportError>;
}

/// The exporters available to a session, keyed by id.
#[derive(Default, Clone)]
pub struct ExporterRegistry {
    exporters: IndexMap<String, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an exporter under its id and returns the one it replaced.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) -> Option<Arc<dyn Exporter>> {
        let id = exporter.id().to_string();
        log::info!("ExporterRegistry: Registered '{}'", id);
        self.exporters.insert(id, exporter)
    }

    /// Returns an exporter by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Exporter>> {
        self.exporters.get(id).cloned()
    }

    /// Returns the registered ids.
    pub fn ids(&self) -> Vec<&str> {
        self.exporters.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered exporters.
    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }
}

impl fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

/// Writes the serialized definitions of a rig as a template document.
///
/// Settings: `outputPath` (required) and `templateName` (defaults to the rig name).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionExporter;

impl DefinitionExporter {
    /// The exporter id.
    pub const ID: &'static str = "definition";
}

impl Exporter for DefinitionExporter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn export_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("outputPath".into(), Value::String(String::new()));
        settings.insert("templateName".into(), Value::String(String::new()));
        settings
    }

    fn execute(
        &self,
        rig: &Rig,
        scene: &dyn SceneBackend,
        settings: &Settings,
        progress: &mut dyn FnMut(u32, &str),
    ) -> Result<(), ExportError> {
        let output = settings
            .get("outputPath")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ExportError::InvalidSetting("outputPath".to_string()))?;
        let name = match settings.get("templateName") {
            None => rig.name(),
            Some(Value::String(name)) if name.is_empty() => rig.name(),
            Some(Value::String(name)) => name.as_str(),
            Some(_) => return Err(ExportError::InvalidSetting("templateName".to_string())),
        };

        progress(0, "Serializing components");
        let total = rig.len().max(1) as u32;
        let mut definitions = Vec::with_capacity(rig.len());
        for (i, component) in rig.components().enumerate() {
            definitions.push(component.serialize(scene).map_err(RigError::from)?);
            let done = (i as u32 + 1) * 90 / total;
            progress(done, &format!("Serialized {}", component.key()));
        }

        let document =
            TemplateDocument::from_components(name, rig.configuration().clone(), definitions);
        let path = Path::new(output);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| TemplateError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        write_template_file(path, &document)?;
        progress(100, &format!("Wrote {}", path.display()));
        log::info!(
            "Exported {} component(s) of rig '{}' to {}",
            document.components.len(),
            rig.name(),
            path.display()
        );
        Ok(())
    }
}
