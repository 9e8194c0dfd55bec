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

//! Error types of the rig engine.

use crate::RigId;
use hive_core::{NamingError, SceneError};
use hive_data::{ComponentKey, ComponentRef, DefinitionError};
use hive_io::{DefinitionFileError, TemplateError};
use thiserror::Error;

/// A failure while building or deleting one component's layers.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The definition lacks a guide the component type requires.
    #[error("Component '{component}' has no guide '{guide}'")]
    MissingGuide {
        /// The component.
        component: String,
        /// The required guide id.
        guide: String,
    },

    /// The deform layer lacks a joint the rig layer requires.
    #[error("Component '{component}' has no joint '{joint}'")]
    MissingJoint {
        /// The component.
        component: String,
        /// The required joint id.
        joint: String,
    },

    /// Component-specific rig generation failed.
    #[error("Component '{component}' failed to build: {reason}")]
    Behavior {
        /// The component.
        component: String,
        /// What went wrong.
        reason: String,
    },

    /// No behaviour is registered for the component type.
    #[error("No behaviour is registered for component type '{0}'")]
    UnknownComponentType(String),

    /// A build script hook failed.
    #[error("Build script '{script}' failed in {hook}: {reason}")]
    Script {
        /// The script id.
        script: String,
        /// The hook name.
        hook: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// The scene backend rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A node name could not be generated.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The definition is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// A failure of a rig or session operation.
#[derive(Error, Debug)]
pub enum RigError {
    /// A component with the same identity already exists.
    #[error("Component {0} already exists")]
    DuplicateComponent(ComponentKey),

    /// No component has the given name and side.
    #[error("Component '{0}' not found")]
    ComponentNotFound(ComponentRef),

    /// The component has no guide with the given id.
    #[error("Component '{component}' has no guide '{guide}'")]
    GuideNotFound {
        /// The component.
        component: ComponentRef,
        /// The missing guide id.
        guide: String,
    },

    /// Parenting would create a cycle in the component graph.
    #[error("Parenting '{child}' under '{parent}' would create a cycle")]
    CyclicParent {
        /// The component being parented.
        child: ComponentRef,
        /// The requested parent.
        parent: ComponentRef,
    },

    /// A mirror descriptor names an unusable target side.
    #[error("Cannot mirror '{component}' to side '{side}'")]
    InvalidMirrorSide {
        /// The source component.
        component: ComponentRef,
        /// The requested side, empty if none could be resolved.
        side: String,
    },

    /// A mirror with `duplicate = false` found no existing opposite component.
    #[error("No opposite component '{0}' to overwrite")]
    MissingMirrorTarget(ComponentRef),

    /// No behaviour is registered for the component type.
    #[error("No behaviour is registered for component type '{0}'")]
    UnknownComponentType(String),

    /// The component name is empty or otherwise unusable.
    #[error("Invalid component name '{0}'")]
    InvalidName(String),

    /// No rig has the given id.
    #[error("Rig {0} not found")]
    RigNotFound(RigId),

    /// A rig with the same name already exists.
    #[error("Rig '{0}' already exists")]
    DuplicateRig(String),

    /// The session has no template registry.
    #[error("The session has no template registry")]
    NoTemplateRegistry,

    /// A batch build stopped at a failing component.
    ///
    /// The components listed in `built` completed before the failure and stay built.
    #[error("Building {component} failed: {source}")]
    BuildFailed {
        /// The component that failed.
        component: ComponentKey,
        /// The components built earlier in the same batch.
        built: Vec<ComponentRef>,
        /// The underlying failure.
        #[source]
        source: BuildError,
    },

    /// A build script hook failed outside of a component build.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A definition or template document is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The template store failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A definition file could not be read or written.
    #[error(transparent)]
    DefinitionFile(#[from] DefinitionFileError),

    /// The scene backend rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A node name could not be generated.
    #[error(transparent)]
    Naming(#[from] NamingError),
}

/// A failure of a command's `do_it` or `undo_it`.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The rig operation failed.
    #[error(transparent)]
    Rig(#[from] RigError),

    /// `undo_it` ran before `do_it` captured anything.
    #[error("'{0}' has nothing captured to undo")]
    NothingCaptured(&'static str),
}

/// A failure of an exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No exporter has the given id.
    #[error("Unknown exporter '{0}'")]
    UnknownExporter(String),

    /// A required setting is missing or has the wrong type.
    #[error("Export setting '{0}' is missing or invalid")]
    InvalidSetting(String),

    /// The rig could not be read.
    #[error(transparent)]
    Rig(#[from] RigError),

    /// Writing the output failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
