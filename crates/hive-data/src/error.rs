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

//! Errors raised while validating or parsing definitions.

use crate::ComponentKey;
use thiserror::Error;

/// A definition or template document is invalid.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Two guides share the same id.
    #[error("Duplicate guide id '{0}'")]
    DuplicateGuide(String),

    /// A guide references a parent that is neither a guide nor the root sentinel.
    #[error("Guide '{guide}' references unknown parent '{parent}'")]
    MissingParent {
        /// The guide with the dangling reference.
        guide: String,
        /// The parent id it references.
        parent: String,
    },

    /// The guide parent links form a cycle.
    #[error("Guides form a cycle: {0:?}")]
    CyclicGuides(Vec<String>),

    /// The definition has no guide parented to the root sentinel.
    #[error("Definition has no root guide")]
    NoRootGuide,

    /// A space switch is inconsistent.
    #[error("Space switch '{label}' is invalid: {reason}")]
    InvalidSpaceSwitch {
        /// The label of the space switch.
        label: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two components in one document share the same identity triple.
    #[error("Duplicate component {0}")]
    DuplicateComponent(ComponentKey),

    /// The component parent links in a document form a cycle.
    #[error("Component parent links form a cycle")]
    CyclicComponents,

    /// A component field holds an unusable value.
    #[error("Invalid component {component}: {reason}")]
    InvalidComponent {
        /// The offending component.
        component: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The document could not be parsed into the typed model.
    #[error("Corrupted definition document: {0}")]
    Corrupted(#[from] serde_json::Error),
}
