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

//! # Hive Data
//!
//! The declarative side of the rig engine. A [`ComponentDefinition`] is the single
//! source of truth for what a component should look like; the scene graph is a
//! rebuildable projection of it. This crate holds the definition model, the rig
//! configuration, template documents and the default-schema merge used to upgrade
//! definitions written by older versions.

#![warn(missing_docs)]

pub mod component;
pub mod config;
pub mod error;
pub mod guide;
pub mod key;
pub mod layer;
pub mod merge;
pub mod space_switch;
pub mod template;

pub use component::{ComponentDefinition, InfoDefinition, ParentLink};
pub use config::RigConfiguration;
pub use error::DefinitionError;
pub use guide::{GuideDag, GuideDefinition, GuideLayerDefinition, ROOT_GUIDE};
pub use key::{ComponentKey, ComponentRef};
pub use layer::{LayerDefinition, NodeDefinition};
pub use merge::{merge_with_defaults, MergeReport, TypeConflict};
pub use space_switch::{SpaceSwitchDefinition, SpaceSwitchDriver};
pub use template::{TemplateDocument, TEMPLATE_FORMAT_VERSION};

/// A free-form settings or metadata map, ordered as written.
pub type Settings = serde_json::Map<String, serde_json::Value>;
