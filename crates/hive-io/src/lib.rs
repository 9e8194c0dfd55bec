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

//! # Hive IO
//!
//! Persistence for the rig engine: the on-disk [`TemplateRegistry`] and single
//! definition files with default-schema upgrade on read.

#![warn(missing_docs)]

pub mod definition_file;
pub mod error;
pub mod template_registry;

pub use definition_file::{read_definition, write_definition};
pub use error::{DefinitionFileError, TemplateError};
pub use template_registry::{write_template_file, TemplateRegistry, TEMPLATE_EXTENSION};
