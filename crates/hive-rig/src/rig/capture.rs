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

//! Whole-rig captures for undo.
//!
//! A capture records what is needed to rebuild a rig exactly: the configuration,
//! every definition in creation order, each component's state and flags, and the
//! exact guide-layer world matrices. Restoring tears the rig down and rebuilds it
//! phase by phase without running build scripts or auto-align. Nodes the rig does
//! not own but which sit in its hierarchy are moved out first and parented back
//! under the rebuilt node of the same name.

use super::build::{BuildReport, PhaseOptions};
use super::Rig;
use crate::component::{Component, ComponentState};
use crate::layer::LayerKind;
use crate::{RigError, RigId, Session};
use hive_core::math::Mat4;
use hive_core::{NodeHandle, SceneBackend, SceneError};
use hive_data::{ComponentDefinition, ComponentKey, ComponentRef, GuideDag, RigConfiguration};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The state of one component at capture time.
#[derive(Debug, Clone)]
pub struct ComponentCapture {
    definition: ComponentDefinition,
    state: ComponentState,
    guide_worlds: IndexMap<String, Mat4>,
    skeleton_guides: IndexMap<String, Mat4>,
    guides_hidden: bool,
    pinned: bool,
}

impl ComponentCapture {
    pub(crate) fn capture(component: &Component, scene: &dyn SceneBackend) -> Result<Self, SceneError> {
        let guide_worlds = match component.layer(LayerKind::Guide) {
            Some(layer) => layer.world_transforms(scene)?,
            None => IndexMap::new(),
        };
        Ok(Self {
            definition: component.definition().clone(),
            state: component.state(),
            guide_worlds,
            skeleton_guides: component.guide_snapshot().clone(),
            guides_hidden: component.guides_hidden(),
            pinned: component.is_pinned(),
        })
    }

    /// Returns the captured identity.
    pub fn key(&self) -> ComponentKey {
        self.definition.key()
    }

    /// Returns the captured definition.
    pub fn definition(&self) -> &ComponentDefinition {
        &self.definition
    }

    /// Returns the captured build state.
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// The guide worlds the skeleton was built from.
    fn skeleton_source(&self) -> &IndexMap<String, Mat4> {
        if self.skeleton_guides.is_empty() {
            &self.guide_worlds
        } else {
            &self.skeleton_guides
        }
    }
}

/// The guide placement and guide flags of one component.
///
/// Restoring writes them back onto the live guide nodes, so scene handles stay
/// valid and nothing outside the guide layer is touched.
#[derive(Debug, Clone)]
pub struct GuideCapture {
    component: ComponentRef,
    dag: GuideDag,
    guide_worlds: IndexMap<String, Mat4>,
    guides_hidden: bool,
    pinned: bool,
}

impl GuideCapture {
    pub(crate) fn capture(
        reference: &ComponentRef,
        component: &Component,
        scene: &dyn SceneBackend,
    ) -> Result<Self, SceneError> {
        let guide_worlds = match component.layer(LayerKind::Guide) {
            Some(layer) => layer.world_transforms(scene)?,
            None => IndexMap::new(),
        };
        Ok(Self {
            component: reference.clone(),
            dag: component.definition().guide_layer.dag.clone(),
            guide_worlds,
            guides_hidden: component.guides_hidden(),
            pinned: component.is_pinned(),
        })
    }

    /// Returns the captured component.
    pub fn component(&self) -> &ComponentRef {
        &self.component
    }
}

/// A snapshot of a whole rig that can be restored exactly.
#[derive(Debug, Clone)]
pub struct RigCapture {
    rig: RigId,
    name: String,
    configuration: RigConfiguration,
    has_root: bool,
    finalized: bool,
    components: Vec<ComponentCapture>,
}

impl RigCapture {
    /// Captures a rig as it currently stands in `scene`.
    pub fn capture(rig: &Rig, scene: &dyn SceneBackend) -> Result<Self, SceneError> {
        let components = rig
            .components
            .values()
            .map(|c| ComponentCapture::capture(c, scene))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rig: rig.id,
            name: rig.name.clone(),
            configuration: rig.configuration.clone(),
            has_root: rig.root.as_ref().is_some_and(|r| scene.exists(r.handle)),
            finalized: rig.finalized,
            components,
        })
    }

    /// Returns the id of the captured rig.
    pub fn rig(&self) -> RigId {
        self.rig
    }

    /// Returns the captured components in creation order.
    pub fn components(&self) -> &[ComponentCapture] {
        &self.components
    }

    /// Rebuilds `rig` to the captured state.
    pub fn restore(&self, rig: &mut Rig, session: &mut Session) -> Result<(), RigError> {
        let foreign = rig.detach_foreign(session.scene.as_mut())?;
        let rebuilt = self.rebuild(rig, session);
        rig.reattach_foreign(session.scene.as_mut(), &foreign)?;
        rebuilt
    }

    fn rebuild(&self, rig: &mut Rig, session: &mut Session) -> Result<(), RigError> {
        rig.teardown(session.scene.as_mut())?;

        let mut components = IndexMap::with_capacity(self.components.len());
        for capture in &self.components {
            let definition = &capture.definition;
            let behavior = session
                .behaviors
                .get(&definition.component_type)
                .ok_or_else(|| RigError::UnknownComponentType(definition.component_type.clone()))?;
            components.insert(
                ComponentRef::new(&definition.name, &definition.side),
                Component::new(definition.clone(), behavior, rig.id),
            );
        }
        rig.components = components;
        rig.name = self.name.clone();
        rig.configuration = self.configuration.clone();

        if self.has_root {
            rig.ensure_root(session)?;
        }
        let order: Vec<(ComponentRef, ComponentCapture)> = rig
            .build_order()
            .into_iter()
            .filter_map(|reference| {
                let capture = self.components.iter().find(|c| {
                    c.definition.name == reference.name && c.definition.side == reference.side
                })?;
                Some((reference, capture.clone()))
            })
            .collect();
        rig.restore_states(session, &order)?;
        if self.finalized {
            rig.finalize(session)?;
        }
        log::debug!(
            "Rig '{}': restored {} component(s) from capture",
            rig.name,
            self.components.len()
        );
        Ok(())
    }
}

impl Rig {
    /// Rebuilds components to captured states, placing guides exactly.
    ///
    /// Skeletons are built from the guide worlds they were originally built from,
    /// after which the captured guide worlds and flags are applied.
    pub(crate) fn restore_states(
        &mut self,
        session: &mut Session,
        captures: &[(ComponentRef, ComponentCapture)],
    ) -> Result<(), RigError> {
        if captures.iter().any(|(_, c)| c.state > ComponentState::Empty) {
            self.ensure_root(session)?;
        }
        for phase in [
            ComponentState::GuideBuilt,
            ComponentState::SkeletonBuilt,
            ComponentState::RigBuilt,
            ComponentState::Polished,
        ] {
            for (reference, capture) in captures {
                if capture.state < phase {
                    continue;
                }
                if phase == ComponentState::SkeletonBuilt {
                    self.write_guide_worlds(session, reference, capture.skeleton_source())?;
                }
                self.transition(session, reference, phase, PhaseOptions::RESTORE)
                    .map_err(|source| {
                        self.batch_failure(reference, phase, BuildReport::default(), source)
                    })?;
                if phase == ComponentState::GuideBuilt {
                    self.write_guide_worlds(session, reference, &capture.guide_worlds)?;
                }
            }
        }

        let scene = session.scene.as_mut();
        for (reference, capture) in captures {
            if let Some(component) = self.components.get_mut(reference) {
                component.set_guide_worlds(scene, &capture.guide_worlds)?;
                component.set_guides_hidden(scene, capture.guides_hidden)?;
                component.set_pinned(scene, capture.pinned)?;
            }
        }
        Ok(())
    }

    /// Returns every scene node the rig built, with its name.
    pub(crate) fn owned_nodes(&self) -> HashMap<NodeHandle, &str> {
        let mut owned = HashMap::new();
        let rig_nodes = self.root.iter().chain(&self.selection_sets);
        let component_nodes = self.components.values().flat_map(|c| {
            c.root().into_iter().chain(
                c.layers()
                    .flat_map(|l| std::iter::once(l.root()).chain(l.nodes().map(|(_, n)| n))),
            )
        });
        for node in rig_nodes.chain(component_nodes) {
            owned.insert(node.handle, node.name.as_str());
        }
        owned
    }

    /// Unparents the nodes under the rig hierarchy that the rig did not build.
    ///
    /// Each detached node keeps its world transform and its own subtree. Returns
    /// the detached nodes with the name of the rig node they were under.
    pub(crate) fn detach_foreign(
        &self,
        scene: &mut dyn SceneBackend,
    ) -> Result<Vec<(String, NodeHandle)>, SceneError> {
        let Some(root) = self.root.as_ref().filter(|r| scene.exists(r.handle)) else {
            return Ok(Vec::new());
        };
        let owned = self.owned_nodes();
        let mut foreign = Vec::new();
        let mut stack = vec![root.handle];
        while let Some(handle) = stack.pop() {
            for child in scene.children_of(handle)? {
                if owned.contains_key(&child) {
                    stack.push(child);
                } else if let Some(name) = owned.get(&handle) {
                    foreign.push((name.to_string(), child));
                }
            }
        }
        for (_, handle) in &foreign {
            scene.set_parent(*handle, None)?;
        }
        if !foreign.is_empty() {
            log::debug!("Rig '{}': moved {} foreign node(s) aside", self.name, foreign.len());
        }
        Ok(foreign)
    }

    /// Parents detached nodes back under the rig node with the name they were under.
    ///
    /// A node whose former parent was not rebuilt stays under the scene root.
    pub(crate) fn reattach_foreign(
        &self,
        scene: &mut dyn SceneBackend,
        foreign: &[(String, NodeHandle)],
    ) -> Result<(), SceneError> {
        if foreign.is_empty() {
            return Ok(());
        }
        let by_name: HashMap<&str, NodeHandle> = self
            .owned_nodes()
            .into_iter()
            .map(|(handle, name)| (name, handle))
            .collect();
        for (parent, handle) in foreign {
            if !scene.exists(*handle) {
                continue;
            }
            match by_name.get(parent.as_str()) {
                Some(target) if scene.exists(*target) => scene.set_parent(*handle, Some(*target))?,
                _ => log::warn!(
                    "Rig '{}': '{}' no longer exists, a foreign node stays under the scene root",
                    self.name,
                    parent
                ),
            }
        }
        Ok(())
    }

    /// Captures the guides of the given components, or of every component.
    pub(crate) fn capture_guides(
        &self,
        scene: &dyn SceneBackend,
        targets: Option<&[ComponentRef]>,
    ) -> Result<Vec<GuideCapture>, RigError> {
        let mut captures = Vec::new();
        for reference in self.ordered(targets, super::Relatives::None)? {
            if let Some(component) = self.components.get(&reference) {
                captures.push(GuideCapture::capture(&reference, component, scene)?);
            }
        }
        Ok(captures)
    }

    /// Puts captured guides back in place. Components deleted since are skipped.
    pub(crate) fn restore_guides(
        &mut self,
        scene: &mut dyn SceneBackend,
        captures: &[GuideCapture],
    ) -> Result<(), SceneError> {
        for capture in captures {
            let Some(component) = self.components.get_mut(&capture.component) else {
                log::warn!(
                    "Rig '{}': {} no longer exists, its guides are not restored",
                    self.name,
                    capture.component
                );
                continue;
            };
            component.definition_mut().guide_layer.dag = capture.dag.clone();
            component.set_guide_worlds(scene, &capture.guide_worlds)?;
            component.set_guides_hidden(scene, capture.guides_hidden)?;
            component.set_pinned(scene, capture.pinned)?;
        }
        Ok(())
    }

    fn write_guide_worlds(
        &mut self,
        session: &mut Session,
        reference: &ComponentRef,
        worlds: &IndexMap<String, Mat4>,
    ) -> Result<(), SceneError> {
        match self.components.get_mut(reference) {
            Some(component) => component.set_guide_worlds(session.scene.as_mut(), worlds),
            None => Ok(()),
        }
    }
}
