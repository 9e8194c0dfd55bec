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

//! Commands that add, remove, rename and re-parent components.

use super::{require_components, require_rig, Checkpoint};
use crate::{CommandError, Hive, Rig, RigId};
use hive_core::{Cancellation, Transaction};
use hive_data::{ComponentKey, ComponentRef, ParentLink};

fn check_link(rig: &Rig, link: &ParentLink) -> Result<(), Cancellation> {
    require_components(rig, [&link.component])?;
    let has_guide = rig
        .component(&link.component)
        .is_some_and(|c| c.definition().guide(&link.guide).is_some());
    if !has_guide {
        return Err(Cancellation::new(format!(
            "Component '{}' has no guide '{}'",
            link.component, link.guide
        )));
    }
    Ok(())
}

/// Creates a component from the default definition of its type, optionally parented.
#[derive(Debug, Clone)]
pub struct CreateComponent {
    rig: RigId,
    component_type: String,
    name: String,
    side: String,
    parent: Option<ParentLink>,
    checkpoint: Checkpoint,
}

impl CreateComponent {
    /// Creates a `component_type` component called `name` on `side`.
    pub fn new(
        rig: RigId,
        component_type: impl Into<String>,
        name: impl Into<String>,
        side: impl Into<String>,
    ) -> Self {
        Self {
            rig,
            component_type: component_type.into(),
            name: name.into(),
            side: side.into(),
            parent: None,
            checkpoint: Checkpoint::default(),
        }
    }

    /// Parents the new component under a guide of an existing one.
    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl Transaction<Hive> for CreateComponent {
    type Output = ComponentRef;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Create Component"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        if !hive.session().behaviors().contains(&self.component_type) {
            return Err(Cancellation::new(format!(
                "Unknown component type '{}'",
                self.component_type
            )));
        }
        Rig::validate_name(&self.name).map_err(|e| Cancellation::new(e.to_string()))?;
        if rig.find(&self.name, &self.side).is_some() {
            let key = ComponentKey::new(&self.component_type, &self.name, &self.side);
            return Err(Cancellation::new(format!("Component {key} already exists")));
        }
        if let Some(link) = &self.parent {
            check_link(rig, link)?;
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<ComponentRef, CommandError> {
        let (component_type, name, side) = (&self.component_type, &self.name, &self.side);
        let parent = self.parent.clone();
        self.checkpoint
            .run(hive, self.rig, "Create Component", true, |rig, session| {
                let created = rig.create_component(session, component_type, name, side)?;
                if parent.is_some() {
                    rig.set_parent(session, &created, parent)?;
                }
                Ok(created)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Create Component")
    }
}

/// Deletes a component, and with `children` its whole subtree.
#[derive(Debug, Clone)]
pub struct DeleteComponent {
    rig: RigId,
    component: ComponentRef,
    children: bool,
    checkpoint: Checkpoint,
}

impl DeleteComponent {
    /// Deletes `component`; its children are re-parented unless `children` is set.
    pub fn new(rig: RigId, component: ComponentRef, children: bool) -> Self {
        Self {
            rig,
            component,
            children,
            checkpoint: Checkpoint::default(),
        }
    }
}

impl Transaction<Hive> for DeleteComponent {
    type Output = Vec<ComponentRef>;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Delete Component"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        require_components(require_rig(hive, self.rig)?, [&self.component])
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<Vec<ComponentRef>, CommandError> {
        let (component, children) = (&self.component, self.children);
        self.checkpoint
            .run(hive, self.rig, "Delete Component", true, |rig, session| {
                rig.delete_component(session, component, children)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Delete Component")
    }
}

/// Renames a component, keeping its side and build state.
#[derive(Debug, Clone)]
pub struct RenameComponent {
    rig: RigId,
    component: ComponentRef,
    new_name: String,
    checkpoint: Checkpoint,
}

impl RenameComponent {
    /// Renames `component` to `new_name`.
    pub fn new(rig: RigId, component: ComponentRef, new_name: impl Into<String>) -> Self {
        Self {
            rig,
            component,
            new_name: new_name.into(),
            checkpoint: Checkpoint::default(),
        }
    }
}

impl Transaction<Hive> for RenameComponent {
    type Output = ComponentRef;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Rename Component"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, [&self.component])?;
        Rig::validate_name(&self.new_name).map_err(|e| Cancellation::new(e.to_string()))?;
        if self.new_name != self.component.name
            && rig.find(&self.new_name, &self.component.side).is_some()
        {
            return Err(Cancellation::new(format!(
                "Component '{}:{}' already exists",
                self.new_name, self.component.side
            )));
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<ComponentRef, CommandError> {
        let (component, new_name) = (&self.component, &self.new_name);
        self.checkpoint
            .run(hive, self.rig, "Rename Component", true, |rig, session| {
                rig.rename_component(session, component, new_name)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Rename Component")
    }
}

/// Parents a component under a guide of another one, or unparents it.
#[derive(Debug, Clone)]
pub struct SetComponentParent {
    rig: RigId,
    child: ComponentRef,
    parent: Option<ParentLink>,
    checkpoint: Checkpoint,
}

impl SetComponentParent {
    /// Sets the parent of `child`. `None` unparents it.
    pub fn new(rig: RigId, child: ComponentRef, parent: Option<ParentLink>) -> Self {
        Self {
            rig,
            child,
            parent,
            checkpoint: Checkpoint::default(),
        }
    }
}

impl Transaction<Hive> for SetComponentParent {
    type Output = ();
    type Error = CommandError;

    fn name(&self) -> &str {
        "Set Component Parent"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, [&self.child])?;
        if let Some(link) = &self.parent {
            check_link(rig, link)?;
            if link.component == self.child || rig.descendants(&self.child).contains(&link.component) {
                return Err(Cancellation::new(format!(
                    "Parenting '{}' under '{}' would create a cycle",
                    self.child, link.component
                )));
            }
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        let (child, parent) = (&self.child, self.parent.clone());
        self.checkpoint
            .run(hive, self.rig, "Set Component Parent", true, |rig, session| {
                rig.set_parent(session, child, parent)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Set Component Parent")
    }
}
