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

//! # Hive Core
//!
//! Foundational crate containing the math, scene-backend contract, naming rules and
//! the transaction abstraction that every other Hive crate builds upon.

#![warn(missing_docs)]

pub mod graph;
pub mod math;
pub mod naming;
pub mod scene;
pub mod transaction;

pub use naming::{NamingConfig, NamingError, NamingResolver};
pub use scene::{AttributeValue, NodeHandle, NodeKind, SceneBackend, SceneError};
pub use graph::{topological_sort, CycleError};
pub use transaction::{
    Cancellation, Reversible, Transaction, TransactionError, TransactionGroup, TransactionStack,
};
