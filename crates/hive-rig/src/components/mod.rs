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

//! The built-in component types.

mod fk_chain;
mod godnode;
mod vchain;

pub use self::fk_chain::FkChain;
pub use self::godnode::GodNode;
pub use self::vchain::VChain;

use crate::component::ComponentBehavior;
use std::sync::Arc;

/// Returns one instance of every built-in behaviour.
pub fn builtins() -> Vec<Arc<dyn ComponentBehavior>> {
    vec![Arc::new(GodNode), Arc::new(FkChain), Arc::new(VChain)]
}
