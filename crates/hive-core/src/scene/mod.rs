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

//! The contract between the rig engine and the host scene graph.
//!
//! The engine never talks to a concrete scene directly. Every node it creates, parents,
//! moves or deletes goes through a [`SceneBackend`], which keeps the orchestration
//! testable against an in-memory fake and portable across hosts.

mod attribute;
mod backend;
mod error;
mod handle;

pub use self::attribute::AttributeValue;
pub use self::backend::SceneBackend;
pub use self::error::SceneError;
pub use self::handle::{NodeHandle, NodeKind};
