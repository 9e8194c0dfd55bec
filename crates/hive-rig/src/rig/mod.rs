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

//! The rig orchestrator.
//!
//! A [`Rig`] owns its components, keyed by name and side in creation order. It
//! resolves parent links, runs the build phases in topological order, fires build
//! scripts at phase boundaries and implements the operations that span several
//! components: mirroring, duplication, alignment and templates.

mod build;
mod capture;
mod symmetry;

pub use self::build::{BuildReport, BLACK_BOX_ATTR, MEMBERS_ATTR, OUTLINER_HIDDEN_ATTR};
pub use self::capture::{ComponentCapture, GuideCapture, RigCapture};
pub use self::symmetry::{reflect_guides, DuplicateRequest, MirrorDescriptor, MirrorReport};
pub(crate) use self::symmetry::target_side;

use crate::component::{Component, ComponentState};
use crate::layer::LayerNode;
use crate::{RigError, RigId, Session};
use hive_core::naming::rules;
use hive_core::{topological_sort, NodeHandle, NodeKind, SceneBackend, SceneError};
use hive_data::{
    ComponentDefinition, ComponentRef, MergeReport, ParentLink, RigConfiguration,
    TemplateDocument,
};
use hive_io::{read_definition, write_definition};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// The attribute holding the rig name on the rig root.
pub const RIG_ATTR: &str = "hiveRig";

/// Which relatives of the requested components an operation also covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relatives {
    None,
    Ancestors,
    Descendants,
}

/// A named collection of components with a shared configuration.
pub struct Rig {
    id: RigId,
    name: String,
    configuration: RigConfiguration,
    components: IndexMap<ComponentRef, Component>,
    root: Option<LayerNode>,
    selection_sets: Vec<LayerNode>,
    finalized: bool,
}

impl Rig {
    pub(crate) fn new(id: RigId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            configuration: RigConfiguration::default(),
            components: IndexMap::new(),
            root: None,
            selection_sets: Vec::new(),
            finalized: false,
        }
    }

    /// Returns the rig id.
    pub fn id(&self) -> RigId {
        self.id
    }

    /// Returns the rig name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    pub fn configuration(&self) -> &RigConfiguration {
        &self.configuration
    }

    /// Returns the configuration mutably. Changes apply from the next build.
    pub fn configuration_mut(&mut self) -> &mut RigConfiguration {
        &mut self.configuration
    }

    /// Returns the rig root node, once something has been built.
    pub fn root(&self) -> Option<&LayerNode> {
        self.root.as_ref()
    }

    /// Returns the selection sets created by the last polish.
    pub fn selection_sets(&self) -> &[LayerNode] {
        &self.selection_sets
    }

    /// Returns `true` if rig-level polish (selection sets, black box) is applied.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the rig has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns `true` if a component with this name and side exists.
    pub fn contains(&self, reference: &ComponentRef) -> bool {
        self.components.contains_key(reference)
    }

    /// Returns a component.
    pub fn component(&self, reference: &ComponentRef) -> Option<&Component> {
        self.components.get(reference)
    }

    /// Finds a component by name and side.
    pub fn find(&self, name: &str, side: &str) -> Option<&Component> {
        self.components.get(&ComponentRef::new(name, side))
    }

    /// Iterates the components in creation order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Returns the component references in creation order.
    pub fn references(&self) -> Vec<ComponentRef> {
        self.components.keys().cloned().collect()
    }

    fn require(&self, reference: &ComponentRef) -> Result<&Component, RigError> {
        self.components
            .get(reference)
            .ok_or_else(|| RigError::ComponentNotFound(reference.clone()))
    }

    /// Returns every component with parents before children.
    ///
    /// Siblings keep their creation order. Parent links to components outside the
    /// rig are ignored.
    pub fn build_order(&self) -> Vec<ComponentRef> {
        let edges: Vec<(usize, usize)> = self
            .components
            .values()
            .enumerate()
            .filter_map(|(child, component)| {
                let link = component.parent()?;
                let parent = self.components.get_index_of(&link.component)?;
                Some((parent, child))
            })
            .collect();
        let order = match topological_sort(0..self.components.len(), edges) {
            Ok(order) => order,
            Err(e) => {
                log::error!("Rig '{}': {}, using creation order", self.name, e);
                (0..self.components.len()).collect()
            }
        };
        order
            .into_iter()
            .filter_map(|i| self.components.get_index(i).map(|(r, _)| r.clone()))
            .collect()
    }

    /// Returns the direct children of a component, in creation order.
    pub fn children(&self, reference: &ComponentRef) -> Vec<ComponentRef> {
        self.components
            .iter()
            .filter(|(_, c)| c.parent().is_some_and(|l| &l.component == reference))
            .map(|(r, _)| r.clone())
            .collect()
    }

    /// Returns every descendant of a component, parents before children.
    pub fn descendants(&self, reference: &ComponentRef) -> Vec<ComponentRef> {
        let mut out = Vec::new();
        let mut stack = self.children(reference);
        stack.reverse();
        while let Some(next) = stack.pop() {
            if out.contains(&next) {
                continue;
            }
            let mut children = self.children(&next);
            children.reverse();
            stack.extend(children);
            out.push(next);
        }
        out
    }

    /// Returns the ancestors of a component, nearest first.
    pub fn ancestors(&self, reference: &ComponentRef) -> Vec<ComponentRef> {
        let mut out: Vec<ComponentRef> = Vec::new();
        let mut current = self.components.get(reference).and_then(Component::parent);
        while let Some(link) = current {
            if &link.component == reference || out.contains(&link.component) {
                break;
            }
            out.push(link.component.clone());
            current = self.components.get(&link.component).and_then(Component::parent);
        }
        out
    }

    /// Expands `targets` with their relatives and returns them in build order.
    ///
    /// `None` selects every component.
    pub(crate) fn ordered(
        &self,
        targets: Option<&[ComponentRef]>,
        relatives: Relatives,
    ) -> Result<Vec<ComponentRef>, RigError> {
        let Some(targets) = targets else {
            return Ok(self.build_order());
        };
        let mut selected = HashSet::new();
        for target in targets {
            self.require(target)?;
            selected.insert(target.clone());
            let related = match relatives {
                Relatives::None => Vec::new(),
                Relatives::Ancestors => self.ancestors(target),
                Relatives::Descendants => self.descendants(target),
            };
            selected.extend(related);
        }
        Ok(self
            .build_order()
            .into_iter()
            .filter(|r| selected.contains(r))
            .collect())
    }

    pub(crate) fn validate_name(name: &str) -> Result<(), RigError> {
        let usable = !name.is_empty()
            && !name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '|' | ':' | '{' | '}'));
        if usable {
            Ok(())
        } else {
            Err(RigError::InvalidName(name.to_string()))
        }
    }

    /// Creates a component of a registered type from its default definition.
    pub fn create_component(
        &mut self,
        session: &Session,
        component_type: &str,
        name: &str,
        side: &str,
    ) -> Result<ComponentRef, RigError> {
        let behavior = session
            .behaviors
            .get(component_type)
            .ok_or_else(|| RigError::UnknownComponentType(component_type.to_string()))?;
        Self::validate_name(name)?;
        let definition = behavior.default_definition(name, side);
        self.add_component(session, definition)
    }

    /// Adds a component from a definition.
    ///
    /// The name and side must be unused in the rig, and a parent link must name an
    /// existing component and one of its guides.
    pub fn add_component(
        &mut self,
        session: &Session,
        definition: ComponentDefinition,
    ) -> Result<ComponentRef, RigError> {
        let behavior = session
            .behaviors
            .get(&definition.component_type)
            .ok_or_else(|| RigError::UnknownComponentType(definition.component_type.clone()))?;
        Self::validate_name(&definition.name)?;
        definition.validate()?;

        let reference = ComponentRef::new(&definition.name, &definition.side);
        if self.components.contains_key(&reference) {
            return Err(RigError::DuplicateComponent(definition.key()));
        }
        if let Some(link) = &definition.parent {
            self.check_link(link)?;
        }

        log::info!("Rig '{}': created component {}", self.name, definition.key());
        self.components
            .insert(reference.clone(), Component::new(definition, behavior, self.id));
        Ok(reference)
    }

    fn check_link(&self, link: &ParentLink) -> Result<(), RigError> {
        let parent = self.require(&link.component)?;
        if parent.definition().guide(&link.guide).is_none() {
            return Err(RigError::GuideNotFound {
                component: link.component.clone(),
                guide: link.guide.clone(),
            });
        }
        Ok(())
    }

    /// Parents a component under a guide of another component, or unparents it.
    ///
    /// Parenting is a data relationship: it orders builds and drives the input of
    /// the child's rig. A built control rig is rebuilt to pick up the new parent.
    pub fn set_parent(
        &mut self,
        session: &mut Session,
        child: &ComponentRef,
        parent: Option<ParentLink>,
    ) -> Result<(), RigError> {
        self.require(child)?;
        if let Some(link) = &parent {
            self.check_link(link)?;
            if &link.component == child || self.descendants(child).contains(&link.component) {
                return Err(RigError::CyclicParent {
                    child: child.clone(),
                    parent: link.component.clone(),
                });
            }
        }

        match &parent {
            Some(link) => log::info!(
                "Rig '{}': parented {} under {}.{}",
                self.name,
                child,
                link.component,
                link.guide
            ),
            None => log::info!("Rig '{}': unparented {}", self.name, child),
        }
        if let Some(component) = self.components.get_mut(child) {
            component.definition_mut().parent = parent;
        }
        self.rebuild_rig_layers(session, child)
    }

    /// Renames a component, keeping its side, its place in the rig and its build
    /// state.
    ///
    /// Parent links and space-switch drivers that refer to the component follow the
    /// new name. Guides come back exactly where they were.
    pub fn rename_component(
        &mut self,
        session: &mut Session,
        reference: &ComponentRef,
        new_name: &str,
    ) -> Result<ComponentRef, RigError> {
        Self::validate_name(new_name)?;
        let index = self
            .components
            .get_index_of(reference)
            .ok_or_else(|| RigError::ComponentNotFound(reference.clone()))?;
        let renamed = ComponentRef::new(new_name, &reference.side);
        if &renamed == reference {
            return Ok(renamed);
        }
        if let Some(existing) = self.components.get(&renamed) {
            return Err(RigError::DuplicateComponent(existing.key()));
        }

        let dependents: Vec<ComponentRef> = self
            .components
            .iter()
            .filter(|(r, c)| {
                *r != reference
                    && c.state() >= ComponentState::RigBuilt
                    && refers_to(c.definition(), reference)
            })
            .map(|(r, _)| r.clone())
            .collect();

        let scene = session.scene.as_mut();
        let Some(mut component) = self.components.shift_remove(reference) else {
            return Err(RigError::ComponentNotFound(reference.clone()));
        };
        let capture = ComponentCapture::capture(&component, scene)?;
        component.sync_definition(scene)?;
        component.teardown(scene)?;
        component.set_identity(new_name, &reference.side);
        self.components.shift_insert(index, renamed.clone(), component);

        for component in self.components.values_mut() {
            retarget(component.definition_mut(), reference, &renamed);
        }
        log::info!("Rig '{}': renamed {} to {}", self.name, reference, renamed);

        self.restore_states(session, &[(renamed.clone(), capture)])?;
        for dependent in &dependents {
            self.rebuild_rig_layers(session, dependent)?;
        }
        if self.finalized {
            self.finalize(session)?;
        }
        Ok(renamed)
    }

    /// Deletes a component and what it built.
    ///
    /// With `children`, every descendant is deleted as well, deepest first.
    /// Otherwise the children are re-parented to the deleted component's parent.
    /// Space-switch drivers on deleted components are dropped from the survivors,
    /// and every survivor whose links changed gets its control rig rebuilt.
    /// Returns the deleted components.
    pub fn delete_component(
        &mut self,
        session: &mut Session,
        reference: &ComponentRef,
        children: bool,
    ) -> Result<Vec<ComponentRef>, RigError> {
        let parent = self.require(reference)?.parent().cloned();

        let mut doomed = Vec::new();
        let mut relinked = Vec::new();
        if children {
            doomed = self.descendants(reference);
            doomed.reverse();
        } else {
            for child in self.children(reference) {
                if let Some(component) = self.components.get_mut(&child) {
                    component.definition_mut().parent = parent.clone();
                    log::debug!("Rig '{}': re-parented {} after delete", self.name, child);
                    relinked.push(child);
                }
            }
        }
        doomed.push(reference.clone());

        let scene = session.scene.as_mut();
        for target in &doomed {
            if let Some(mut component) = self.components.shift_remove(target) {
                component.teardown(scene)?;
                log::info!("Rig '{}': deleted component {}", self.name, component.key());
            }
        }
        for (survivor, component) in self.components.iter_mut() {
            let dropped = drop_drivers(component.definition_mut(), &doomed);
            if dropped > 0 {
                log::warn!(
                    "Rig '{}': dropped {} space-switch driver(s) of {} on deleted components",
                    self.name,
                    dropped,
                    survivor
                );
                if !relinked.contains(survivor) {
                    relinked.push(survivor.clone());
                }
            }
        }

        for survivor in self.build_order() {
            if relinked.contains(&survivor) {
                self.rebuild_rig_layers(session, &survivor)?;
            }
        }
        if self.finalized {
            self.finalize(session)?;
        }
        Ok(doomed)
    }

    /// Hides or shows the guides of the given components, or of every component.
    pub fn set_guides_visible(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
        visible: bool,
    ) -> Result<(), RigError> {
        let scene = session.scene.as_mut();
        for reference in self.ordered(targets, Relatives::None)? {
            if let Some(component) = self.components.get_mut(&reference) {
                component.set_guides_hidden(scene, !visible)?;
            }
        }
        Ok(())
    }

    /// Pins or unpins the guides of the given components, or of every component.
    pub fn set_guides_pinned(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
        pinned: bool,
    ) -> Result<(), RigError> {
        let scene = session.scene.as_mut();
        for reference in self.ordered(targets, Relatives::None)? {
            if let Some(component) = self.components.get_mut(&reference) {
                component.set_pinned(scene, pinned)?;
            }
        }
        Ok(())
    }

    /// Aims guides along their chains for the given components, or for all.
    ///
    /// Returns the guides each component realigned.
    pub fn align_guides(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
        include_end: bool,
    ) -> Result<Vec<(ComponentRef, Vec<String>)>, RigError> {
        let selected = self.ordered(targets, Relatives::None)?;
        let scene = session.scene.as_mut();
        let mut aligned = Vec::new();
        for reference in selected {
            let Some(component) = self.components.get_mut(&reference) else {
                continue;
            };
            let guides = component.align_guides(scene, include_end)?;
            if !guides.is_empty() {
                aligned.push((reference, guides));
            }
        }
        log::info!("Rig '{}': aligned guides of {} component(s)", self.name, aligned.len());
        Ok(aligned)
    }

    /// Serializes every component, in creation order.
    pub fn serialize(&self, scene: &dyn SceneBackend) -> Result<Vec<ComponentDefinition>, SceneError> {
        self.components.values().map(|c| c.serialize(scene)).collect()
    }

    /// Serializes one component.
    pub fn definition(
        &self,
        scene: &dyn SceneBackend,
        reference: &ComponentRef,
    ) -> Result<ComponentDefinition, RigError> {
        Ok(self.require(reference)?.serialize(scene)?)
    }

    /// Captures the configuration and every serialized definition as a template.
    pub fn to_template(
        &self,
        scene: &dyn SceneBackend,
        name: &str,
    ) -> Result<TemplateDocument, RigError> {
        Ok(TemplateDocument::from_components(
            name,
            self.configuration.clone(),
            self.serialize(scene)?,
        ))
    }

    /// Adds every component of a template, validating the whole document first.
    ///
    /// With `apply_configuration`, the template configuration replaces the rig's.
    pub fn populate(
        &mut self,
        session: &Session,
        document: &TemplateDocument,
        apply_configuration: bool,
    ) -> Result<Vec<ComponentRef>, RigError> {
        document.validate()?;
        let mut behaviors = Vec::with_capacity(document.components.len());
        for definition in &document.components {
            let behavior = session
                .behaviors
                .get(&definition.component_type)
                .ok_or_else(|| RigError::UnknownComponentType(definition.component_type.clone()))?;
            Self::validate_name(&definition.name)?;
            if self
                .components
                .contains_key(&ComponentRef::new(&definition.name, &definition.side))
            {
                return Err(RigError::DuplicateComponent(definition.key()));
            }
            behaviors.push(behavior);
        }

        if apply_configuration {
            self.configuration = document.configuration.clone();
        }
        let mut created = Vec::with_capacity(behaviors.len());
        for (definition, behavior) in document.components.iter().zip(behaviors) {
            let reference = ComponentRef::new(&definition.name, &definition.side);
            self.components.insert(
                reference.clone(),
                Component::new(definition.clone(), behavior, self.id),
            );
            created.push(reference);
        }
        log::info!(
            "Rig '{}': loaded {} component(s) from template '{}'",
            self.name,
            created.len(),
            document.name
        );
        Ok(created)
    }

    /// Adds a component from a definition file.
    ///
    /// Keys the file lacks are filled from the default definition of its type; the
    /// report lists them along with any type conflicts.
    pub fn import_definition(
        &mut self,
        session: &Session,
        path: &Path,
    ) -> Result<(ComponentRef, MergeReport), RigError> {
        let (stored, _) = read_definition(path, None)?;
        let behavior = session
            .behaviors
            .get(&stored.component_type)
            .ok_or_else(|| RigError::UnknownComponentType(stored.component_type.clone()))?;
        let defaults = behavior.default_definition(&stored.name, &stored.side);
        let (definition, report) = read_definition(path, Some(&defaults))?;
        for conflict in &report.conflicts {
            log::warn!(
                "Rig '{}': {} keeps its stored value for '{}'",
                self.name,
                definition.key(),
                conflict.path
            );
        }
        let reference = self.add_component(session, definition)?;
        Ok((reference, report))
    }

    /// Writes the serialized definition of a component to a file.
    pub fn export_definition(
        &self,
        scene: &dyn SceneBackend,
        reference: &ComponentRef,
        path: &Path,
    ) -> Result<(), RigError> {
        let definition = self.definition(scene, reference)?;
        write_definition(path, &definition)?;
        Ok(())
    }

    pub(crate) fn ensure_root(&mut self, session: &mut Session) -> Result<NodeHandle, RigError> {
        if let Some(root) = &self.root {
            if session.scene.exists(root.handle) {
                return Ok(root.handle);
            }
        }
        let name = session
            .naming
            .resolve(rules::RIG_ROOT, &[("rigName", self.name.as_str())])?;
        let scene = session.scene.as_mut();
        let handle = scene.create_node(NodeKind::Group, &name)?;
        scene.set_attribute(handle, RIG_ATTR, self.name.as_str().into())?;
        log::debug!("Rig '{}': created root '{}'", self.name, name);
        self.root = Some(LayerNode {
            handle,
            name,
            kind: NodeKind::Group,
        });
        Ok(handle)
    }

    /// Removes everything the rig built, deepest components first. Definitions stay.
    pub(crate) fn teardown(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        for reference in self.build_order().iter().rev() {
            if let Some(component) = self.components.get_mut(reference) {
                component.teardown(scene)?;
            }
        }
        self.clear_finalize(scene)?;
        if let Some(root) = self.root.take() {
            if scene.exists(root.handle) {
                scene.delete_node(root.handle)?;
            }
        }
        Ok(())
    }
}

/// Returns `true` if `definition` links to `target` as parent or space-switch driver.
fn refers_to(definition: &ComponentDefinition, target: &ComponentRef) -> bool {
    definition
        .parent
        .as_ref()
        .is_some_and(|l| &l.component == target)
        || definition
            .space_switching
            .iter()
            .flat_map(|s| &s.drivers)
            .any(|d| d.component.as_ref() == Some(target))
}

/// Removes the space-switch drivers owned by one of `removed`, keeping each
/// default pointing at the same driver when it survives. Returns how many went.
fn drop_drivers(definition: &mut ComponentDefinition, removed: &[ComponentRef]) -> usize {
    let mut dropped = 0;
    for switch in definition.space_switching.iter_mut() {
        let kept: Vec<bool> = switch
            .drivers
            .iter()
            .map(|d| d.component.as_ref().map_or(true, |c| !removed.contains(c)))
            .collect();
        let gone = kept.iter().filter(|k| !**k).count();
        if gone == 0 {
            continue;
        }
        switch.default_driver = match kept.get(switch.default_driver) {
            Some(true) => kept[..switch.default_driver].iter().filter(|k| **k).count(),
            _ => 0,
        };
        let mut flags = kept.into_iter();
        switch.drivers.retain(|_| flags.next().unwrap_or(true));
        dropped += gone;
    }
    dropped
}

/// Points parent links and space-switch drivers at `to` instead of `from`.
fn retarget(definition: &mut ComponentDefinition, from: &ComponentRef, to: &ComponentRef) {
    if let Some(link) = definition.parent.as_mut() {
        if &link.component == from {
            link.component = to.clone();
        }
    }
    for driver in definition
        .space_switching
        .iter_mut()
        .flat_map(|s| s.drivers.iter_mut())
    {
        if driver.component.as_ref() == Some(from) {
            driver.component = Some(to.clone());
        }
    }
}

impl fmt::Debug for Rig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("components", &self.components.values().collect::<Vec<_>>())
            .field("finalized", &self.finalized)
            .finish()
    }
}
