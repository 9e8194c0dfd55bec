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

//! # Hive Rig
//!
//! The rig engine. A [`Hive`] owns a [`Session`] (the scene backend plus the
//! component, build-script and exporter registries) and the [`Rig`]s built in it.
//! Each rig orchestrates a DAG of [`Component`]s through the guide, skeleton, rig
//! and polish phases; every mutation is also available as a reversible command in
//! [`commands`].

#![warn(missing_docs)]

pub mod build_script;
pub mod commands;
pub mod component;
pub mod components;
pub mod error;
pub mod exporter;
pub mod layer;
pub mod rig;
pub mod session;
pub mod space_switch;

pub use build_script::{BuildHook, BuildScript, BuildScriptRegistry, ScriptContext};
pub use commands::{CommandExecutor, CommandReport, CommandStatus};
pub use component::{BehaviorRegistry, Component, ComponentBehavior, ComponentState};
pub use error::{BuildError, CommandError, ExportError, RigError};
pub use exporter::{DefinitionExporter, Exporter, ExporterRegistry};
pub use layer::{Layer, LayerKind, LayerNode};
pub use rig::{
    BuildReport, DuplicateRequest, GuideCapture, MirrorDescriptor, MirrorReport, Rig, RigCapture,
};
pub use session::{Hive, RigId, Session, SessionBuilder};
