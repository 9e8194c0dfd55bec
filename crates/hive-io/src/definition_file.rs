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

//! Reading and writing single component definitions.

use crate::DefinitionFileError;
use hive_data::{ComponentDefinition, DefinitionError, MergeReport};
use std::fs;
use std::path::Path;

/// Reads a definition document.
///
/// With `defaults`, keys missing from the file are merged in from the default
/// definition before parsing (see [`ComponentDefinition::upgrade`]). Without them the
/// file is parsed as is and the returned report is empty.
pub fn read_definition(
    path: &Path,
    defaults: Option<&ComponentDefinition>,
) -> Result<(ComponentDefinition, MergeReport), DefinitionFileError> {
    let text = fs::read_to_string(path).map_err(|source| DefinitionFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let corrupted = |source: DefinitionError| DefinitionFileError::Corrupted {
        path: path.to_path_buf(),
        source,
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| corrupted(DefinitionError::from(e)))?;

    let (definition, report) = match defaults {
        Some(defaults) => ComponentDefinition::upgrade(&value, defaults).map_err(corrupted)?,
        None => (
            ComponentDefinition::from_value(value).map_err(corrupted)?,
            MergeReport::default(),
        ),
    };
    definition.validate().map_err(corrupted)?;
    log::debug!("Read definition {} from {}", definition.key(), path.display());
    Ok((definition, report))
}

/// Writes a definition document as pretty-printed JSON, creating parent directories.
pub fn write_definition(
    path: &Path,
    definition: &ComponentDefinition,
) -> Result<(), DefinitionFileError> {
    let io_error = |source| DefinitionFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_error)?;
    }
    let text = serde_json::to_string_pretty(definition).map_err(|e| {
        DefinitionFileError::Corrupted {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })?;
    fs::write(path, text).map_err(io_error)?;
    log::debug!("Wrote definition {} to {}", definition.key(), path.display());
    Ok(())
}
