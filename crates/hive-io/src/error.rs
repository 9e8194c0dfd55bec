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

//! Errors raised by the persistence layer.

use hive_data::DefinitionError;
use std::path::PathBuf;
use thiserror::Error;

/// Template registry errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template with this name is already stored and overwriting was not requested.
    #[error("Template '{0}' already exists")]
    AlreadyExists(String),

    /// No template with this name is stored.
    #[error("Template '{0}' not found")]
    NotFound(String),

    /// The name cannot be used as a registry key.
    #[error("Invalid template name '{0}'")]
    InvalidName(String),

    /// Reading or writing the template file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable template document.
    #[error("Corrupted template {path}: {source}")]
    Corrupted {
        /// The file involved.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but violates a definition invariant.
    #[error("Invalid template {path}: {source}")]
    Invalid {
        /// The file involved.
        path: PathBuf,
        /// The violated invariant.
        #[source]
        source: DefinitionError,
    },
}

/// Definition file errors.
#[derive(Debug, Error)]
pub enum DefinitionFileError {
    /// Reading or writing the file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a usable definition document.
    #[error("Corrupted definition {path}: {source}")]
    Corrupted {
        /// The file involved.
        path: PathBuf,
        /// The parse or validation error.
        #[source]
        source: DefinitionError,
    },
}
