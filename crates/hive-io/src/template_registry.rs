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

//! A directory of named template documents.

use crate::TemplateError;
use hive_data::TemplateDocument;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The file extension of stored templates.
pub const TEMPLATE_EXTENSION: &str = "template";

/// Writes `document` as pretty JSON to `path`.
///
/// The parent directory must exist.
pub fn write_template_file(path: &Path, document: &TemplateDocument) -> Result<(), TemplateError> {
    let io_error = |path: &Path, source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text =
        serde_json::to_string_pretty(document).map_err(|source| TemplateError::Corrupted {
            path: path.to_path_buf(),
            source,
        })?;

    // Staged write, then rename over the target.
    let staging = path.with_extension(format!("{TEMPLATE_EXTENSION}.tmp"));
    fs::write(&staging, text).map_err(|e| io_error(&staging, e))?;
    fs::rename(&staging, path).map_err(|e| io_error(path, e))
}

/// Stores templates as `<root>/<name>.template` JSON files.
///
/// The registry holds no cache: every call reads or writes the directory, so several
/// registries (or external tooling) can share one store.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    root: PathBuf,
}

impl TemplateRegistry {
    /// Creates a registry over `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path of a template name.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, TemplateError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{TEMPLATE_EXTENSION}")))
    }

    /// Returns `true` if a template with this name is stored.
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_ok_and(|path| path.is_file())
    }

    /// Returns the stored template names, sorted.
    pub fn names(&self) -> Result<Vec<String>, TemplateError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(TemplateError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stores `document` under `name`.
    ///
    /// Fails with [`TemplateError::AlreadyExists`] if the name is taken and
    /// `overwrite` is `false`. The stored document carries `name` as its name.
    pub fn save(
        &self,
        name: &str,
        document: &TemplateDocument,
        overwrite: bool,
    ) -> Result<PathBuf, TemplateError> {
        let path = self.path_of(name)?;
        if path.exists() && !overwrite {
            return Err(TemplateError::AlreadyExists(name.to_string()));
        }

        fs::create_dir_all(&self.root).map_err(|source| TemplateError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut document = document.clone();
        document.name = name.to_string();
        write_template_file(&path, &document)?;

        log::info!(
            "Saved template '{}' ({} component(s)) to {}",
            name,
            document.components.len(),
            path.display()
        );
        Ok(path)
    }

    /// Loads the template stored under `name`.
    pub fn load(&self, name: &str) -> Result<TemplateDocument, TemplateError> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        Self::load_file(&path)
    }

    /// Loads and validates a template document from any path.
    pub fn load_file(path: &Path) -> Result<TemplateDocument, TemplateError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                TemplateError::NotFound(path.display().to_string())
            } else {
                TemplateError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let document: TemplateDocument =
            serde_json::from_str(&text).map_err(|source| TemplateError::Corrupted {
                path: path.to_path_buf(),
                source,
            })?;
        document.validate().map_err(|source| TemplateError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Loaded template '{}' from {}",
            document.name,
            path.display()
        );
        Ok(document)
    }

    /// Deletes the template stored under `name`.
    pub fn delete(&self, name: &str) -> Result<(), TemplateError> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Deleted template '{}'", name);
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), TemplateError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if invalid {
        Err(TemplateError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
