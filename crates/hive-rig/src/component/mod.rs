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

//! Components: the per-phase state machine over one definition and its layers.

mod behavior;
mod registry;

pub use self::behavior::{
    align_chain, build_control_chain, build_guides, build_joints, build_outputs,
    build_root_input, shape_key, BuildContext, ComponentBehavior, RigLayers, COLOR_ATTR,
    GUIDE_ID_ATTR, SHAPE_ATTR,
};
pub use self::registry::BehaviorRegistry;

use crate::layer::{Layer, LayerKind, LayerNode};
use crate::{BuildError, RigId};
use hive_core::math::{Mat4, Transform};
use hive_core::naming::rules;
use hive_core::{AttributeValue, NodeHandle, NodeKind, SceneBackend, SceneError};
use hive_data::{ComponentDefinition, ComponentKey, ComponentRef, GuideDag, ParentLink};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The attribute holding the component type on a component root.
pub const TYPE_ATTR: &str = "hiveType";

/// How far a component has been built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ComponentState {
    /// Nothing exists in the scene.
    #[default]
    Empty,
    /// Guides are built.
    GuideBuilt,
    /// The skeleton is built.
    SkeletonBuilt,
    /// The control rig is built.
    RigBuilt,
    /// Finalization hooks have run.
    Polished,
}

impl ComponentState {
    /// Returns the state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Empty => "empty",
            ComponentState::GuideBuilt => "guides",
            ComponentState::SkeletonBuilt => "skeleton",
            ComponentState::RigBuilt => "rig",
            ComponentState::Polished => "polished",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a state transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Applied,
    Skipped,
}

/// A named, typed, sided rig-building unit.
///
/// A component owns its definition and the layers built from it. It refers to its
/// rig and its parent by id only; the rig resolves both.
pub struct Component {
    definition: ComponentDefinition,
    behavior: Arc<dyn ComponentBehavior>,
    rig: RigId,
    state: ComponentState,
    root: Option<LayerNode>,
    layers: BTreeMap<LayerKind, Layer>,
    guide_snapshot: IndexMap<String, Mat4>,
    guides_hidden: bool,
    pinned: bool,
}

impl Component {
    pub(crate) fn new(
        definition: ComponentDefinition,
        behavior: Arc<dyn ComponentBehavior>,
        rig: RigId,
    ) -> Self {
        Self {
            definition,
            behavior,
            rig,
            state: ComponentState::Empty,
            root: None,
            layers: BTreeMap::new(),
            guide_snapshot: IndexMap::new(),
            guides_hidden: false,
            pinned: false,
        }
    }

    /// Returns the identity triple.
    pub fn key(&self) -> ComponentKey {
        self.definition.key()
    }

    /// Returns the name/side reference.
    pub fn reference(&self) -> ComponentRef {
        ComponentRef::new(&self.definition.name, &self.definition.side)
    }

    /// Returns the component name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the side label.
    pub fn side(&self) -> &str {
        &self.definition.side
    }

    /// Returns the type name.
    pub fn component_type(&self) -> &str {
        &self.definition.component_type
    }

    /// Returns the id of the owning rig.
    pub fn rig(&self) -> RigId {
        self.rig
    }

    /// Returns the definition as last synchronized with the scene.
    pub fn definition(&self) -> &ComponentDefinition {
        &self.definition
    }

    pub(crate) fn definition_mut(&mut self) -> &mut ComponentDefinition {
        &mut self.definition
    }

    /// Returns the behaviour of the component type.
    pub fn behavior(&self) -> &dyn ComponentBehavior {
        self.behavior.as_ref()
    }

    pub(crate) fn behavior_arc(&self) -> Arc<dyn ComponentBehavior> {
        Arc::clone(&self.behavior)
    }

    /// Returns the build state.
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// Returns the parent link.
    pub fn parent(&self) -> Option<&ParentLink> {
        self.definition.parent.as_ref()
    }

    /// Returns the component root node, once guides have been built.
    pub fn root(&self) -> Option<&LayerNode> {
        self.root.as_ref()
    }

    /// Returns a built layer.
    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.get(&kind)
    }

    pub(crate) fn layer_mut(&mut self, kind: LayerKind) -> Option<&mut Layer> {
        self.layers.get_mut(&kind)
    }

    /// Iterates the built layers in build order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Returns the guide world matrices captured when the skeleton was built.
    pub fn guide_snapshot(&self) -> &IndexMap<String, Mat4> {
        &self.guide_snapshot
    }

    /// Returns `true` if the guides were hidden on request.
    pub fn guides_hidden(&self) -> bool {
        self.guides_hidden
    }

    /// Returns `true` if the guides are pinned.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Returns the live scene handle of a guide.
    pub fn guide_handle(&self, scene: &dyn SceneBackend, id: &str) -> Option<NodeHandle> {
        self.layers
            .get(&LayerKind::Guide)
            .and_then(|l| l.handle(id))
            .filter(|h| scene.exists(*h))
    }

    /// Reads the current guide state back from the scene into a definition.
    ///
    /// Guides whose nodes are gone fall back to the skeleton-build snapshot, then
    /// to the stored definition. Only shared access to the scene is taken, so the
    /// result reflects one coherent scene state.
    pub fn serialize(&self, scene: &dyn SceneBackend) -> Result<ComponentDefinition, SceneError> {
        let mut definition = self.definition.clone();
        for guide in definition.guide_layer.dag.iter_mut() {
            let Some(handle) = self.guide_handle(scene, &guide.id) else {
                if let Some(world) = self.guide_snapshot.get(&guide.id) {
                    guide.transform = Transform::from_mat4(world);
                }
                continue;
            };

            let world = scene.world_transform(handle)?;
            guide.transform = Transform::from_mat4(&world);
            if let Some(AttributeValue::String(shape)) = scene.attribute(handle, SHAPE_ATTR)? {
                guide.shape = Some(shape);
            }
            if let Some(AttributeValue::Vec3(color)) = scene.attribute(handle, COLOR_ATTR)? {
                guide.color = Some(color);
            }
            let shape = self.guide_handle(scene, &shape_key(&guide.id));
            if let (Some(shape), Some(inverse)) = (shape, world.affine_inverse()) {
                let local = inverse * scene.world_transform(shape)?;
                guide.shape_transform = Transform::from_mat4(&local);
            }
        }
        Ok(definition)
    }

    pub(crate) fn sync_definition(&mut self, scene: &dyn SceneBackend) -> Result<(), SceneError> {
        if self.state > ComponentState::Empty {
            self.definition = self.serialize(scene)?;
        }
        Ok(())
    }

    pub(crate) fn set_identity(&mut self, name: &str, side: &str) {
        self.definition.name = name.to_string();
        self.definition.side = side.to_string();
    }

    fn root_handle(&self) -> Result<NodeHandle, BuildError> {
        self.root
            .as_ref()
            .map(|r| r.handle)
            .ok_or_else(|| BuildError::Behavior {
                component: self.key().to_string(),
                reason: "the component root is missing".to_string(),
            })
    }

    fn ensure_root(
        &mut self,
        ctx: &mut BuildContext<'_>,
        rig_root: NodeHandle,
    ) -> Result<NodeHandle, BuildError> {
        if let Some(root) = &self.root {
            if ctx.scene.exists(root.handle) {
                return Ok(root.handle);
            }
        }
        let name = ctx.naming.resolve(
            rules::COMPONENT_ROOT,
            &[
                ("componentName", self.definition.name.as_str()),
                ("side", self.definition.side.as_str()),
            ],
        )?;
        let handle = ctx.scene.create_node(NodeKind::Group, &name)?;
        ctx.scene.set_parent(handle, Some(rig_root))?;
        ctx.scene.set_attribute(
            handle,
            TYPE_ATTR,
            self.definition.component_type.as_str().into(),
        )?;
        self.root = Some(LayerNode {
            handle,
            name,
            kind: NodeKind::Group,
        });
        Ok(handle)
    }

    fn guide_worlds(&self, scene: &dyn SceneBackend) -> Result<IndexMap<String, Mat4>, SceneError> {
        let mut worlds = IndexMap::new();
        for guide in self.definition.guide_layer.dag.preorder() {
            let world = match self.guide_handle(scene, &guide.id) {
                Some(handle) => scene.world_transform(handle)?,
                None => guide.transform.to_mat4(),
            };
            worlds.insert(guide.id.clone(), world);
        }
        Ok(worlds)
    }

    pub(crate) fn build_guides(
        &mut self,
        ctx: &mut BuildContext<'_>,
        rig_root: NodeHandle,
        force: bool,
    ) -> Result<Transition, BuildError> {
        if self.state >= ComponentState::GuideBuilt {
            if !force {
                log::debug!("{} already has guides", self.key());
                return Ok(Transition::Skipped);
            }
            self.sync_definition(ctx.scene)?;
            self.delete_layers(ctx.scene)?;
            self.state = ComponentState::Empty;
        }
        self.definition.validate()?;

        let root = self.ensure_root(ctx, rig_root)?;
        let mut layer = Layer::create(
            ctx.scene,
            ctx.naming,
            LayerKind::Guide,
            &self.reference(),
            root,
        )?;
        if let Err(e) = self
            .behavior
            .build_guide_layer(ctx, &self.definition, &mut layer)
        {
            layer.delete(ctx.scene)?;
            self.delete_root(ctx.scene)?;
            return Err(e);
        }
        self.layers.insert(LayerKind::Guide, layer);
        self.state = ComponentState::GuideBuilt;
        self.apply_guide_flags(ctx.scene)?;
        log::debug!("Built guides of {}", self.key());
        Ok(Transition::Applied)
    }

    pub(crate) fn build_deform(
        &mut self,
        ctx: &mut BuildContext<'_>,
        align: bool,
    ) -> Result<Transition, BuildError> {
        match self.state {
            ComponentState::Empty => {
                log::warn!("Cannot build the skeleton of {}: no guides", self.key());
                return Ok(Transition::Skipped);
            }
            ComponentState::GuideBuilt => {}
            _ => {
                log::debug!("{} already has a skeleton", self.key());
                return Ok(Transition::Skipped);
            }
        }
        let auto_align = ctx.configuration.auto_align_guides
            && self.definition.guide_layer.bool_setting("autoAlign", false);
        if align && auto_align {
            self.align_guides(ctx.scene, false)?;
        }

        let guides = self.guide_worlds(ctx.scene)?;
        let root = self.root_handle()?;
        let mut layer = Layer::create(
            ctx.scene,
            ctx.naming,
            LayerKind::Deform,
            &self.reference(),
            root,
        )?;
        if let Err(e) = self
            .behavior
            .build_deform_layer(ctx, &self.definition, &guides, &mut layer)
        {
            layer.delete(ctx.scene)?;
            return Err(e);
        }
        self.layers.insert(LayerKind::Deform, layer);
        self.guide_snapshot = guides;
        self.state = ComponentState::SkeletonBuilt;
        log::debug!("Built skeleton of {}", self.key());
        Ok(Transition::Applied)
    }

    pub(crate) fn build_rigs(&mut self, ctx: &mut BuildContext<'_>) -> Result<Transition, BuildError> {
        match self.state {
            ComponentState::SkeletonBuilt => {}
            ComponentState::Empty | ComponentState::GuideBuilt => {
                log::warn!("Cannot build the rig of {}: no skeleton", self.key());
                return Ok(Transition::Skipped);
            }
            _ => {
                log::debug!("{} already has a rig", self.key());
                return Ok(Transition::Skipped);
            }
        }

        let root = self.root_handle()?;
        let reference = self.reference();
        let mut rig = Layer::create(ctx.scene, ctx.naming, LayerKind::Rig, &reference, root)?;
        let mut input = Layer::create(ctx.scene, ctx.naming, LayerKind::Input, &reference, root)?;
        let mut output = Layer::create(ctx.scene, ctx.naming, LayerKind::Output, &reference, root)?;

        let result = match self.layers.get(&LayerKind::Deform) {
            Some(deform) => self.behavior.build_rig_layer(
                ctx,
                &self.definition,
                RigLayers {
                    deform,
                    rig: &mut rig,
                    input: &mut input,
                    output: &mut output,
                },
            ),
            None => Err(BuildError::Behavior {
                component: self.key().to_string(),
                reason: "the skeleton layer is missing".to_string(),
            }),
        };
        if let Err(e) = result {
            for layer in [rig, input, output] {
                layer.delete(ctx.scene)?;
            }
            return Err(e);
        }

        self.layers.insert(LayerKind::Rig, rig);
        self.layers.insert(LayerKind::Input, input);
        self.layers.insert(LayerKind::Output, output);
        self.state = ComponentState::RigBuilt;
        self.apply_guide_flags(ctx.scene)?;
        log::debug!("Built rig of {}", self.key());
        Ok(Transition::Applied)
    }

    pub(crate) fn polish(&mut self, scene: &mut dyn SceneBackend) -> Result<Transition, SceneError> {
        match self.state {
            ComponentState::RigBuilt => {}
            ComponentState::Polished => return Ok(Transition::Skipped),
            _ => {
                log::warn!("Cannot polish {}: no rig", self.key());
                return Ok(Transition::Skipped);
            }
        }
        for kind in [LayerKind::Input, LayerKind::Output] {
            if let Some(layer) = self.layers.get_mut(&kind) {
                layer.set_hidden(scene, true)?;
            }
        }
        self.state = ComponentState::Polished;
        Ok(Transition::Applied)
    }

    pub(crate) fn delete_rigs(&mut self, scene: &mut dyn SceneBackend) -> Result<Transition, SceneError> {
        if self.state < ComponentState::RigBuilt {
            log::warn!("{} has no rig to delete", self.key());
            return Ok(Transition::Skipped);
        }
        for kind in [LayerKind::Output, LayerKind::Input, LayerKind::Rig] {
            if let Some(layer) = self.layers.remove(&kind) {
                layer.delete(scene)?;
            }
        }
        self.state = ComponentState::SkeletonBuilt;
        self.apply_guide_flags(scene)?;
        log::debug!("Deleted rig of {}", self.key());
        Ok(Transition::Applied)
    }

    pub(crate) fn delete_deform(&mut self, scene: &mut dyn SceneBackend) -> Result<Transition, SceneError> {
        if self.state < ComponentState::SkeletonBuilt {
            log::warn!("{} has no skeleton to delete", self.key());
            return Ok(Transition::Skipped);
        }
        if self.state >= ComponentState::RigBuilt {
            self.delete_rigs(scene)?;
        }
        if let Some(layer) = self.layers.remove(&LayerKind::Deform) {
            layer.delete(scene)?;
        }
        self.state = ComponentState::GuideBuilt;
        log::debug!("Deleted skeleton of {}", self.key());
        Ok(Transition::Applied)
    }

    /// Deletes every layer after reading the guides back into the definition.
    pub(crate) fn delete_guides(&mut self, scene: &mut dyn SceneBackend) -> Result<Transition, SceneError> {
        if self.state == ComponentState::Empty {
            log::warn!("{} has no guides to delete", self.key());
            return Ok(Transition::Skipped);
        }
        self.sync_definition(scene)?;
        self.teardown(scene)?;
        log::debug!("Deleted guides of {}", self.key());
        Ok(Transition::Applied)
    }

    /// Removes everything the component created in the scene, leaving the
    /// definition untouched.
    pub(crate) fn teardown(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        self.delete_layers(scene)?;
        self.delete_root(scene)?;
        self.guide_snapshot.clear();
        self.state = ComponentState::Empty;
        Ok(())
    }

    fn delete_layers(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        while let Some((_, layer)) = self.layers.pop_last() {
            layer.delete(scene)?;
        }
        Ok(())
    }

    fn delete_root(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        if let Some(root) = self.root.take() {
            if scene.exists(root.handle) {
                scene.delete_node(root.handle)?;
            }
        }
        Ok(())
    }

    fn apply_guide_flags(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        let hidden = self.guides_hidden || self.state >= ComponentState::RigBuilt;
        if let Some(layer) = self.layers.get_mut(&LayerKind::Guide) {
            layer.set_hidden(scene, hidden)?;
            layer.set_pinned(scene, self.pinned)?;
        }
        Ok(())
    }

    /// Hides or shows the guides. Guides are also hidden while a rig is built.
    pub(crate) fn set_guides_hidden(
        &mut self,
        scene: &mut dyn SceneBackend,
        hidden: bool,
    ) -> Result<(), SceneError> {
        self.guides_hidden = hidden;
        self.apply_guide_flags(scene)
    }

    pub(crate) fn set_pinned(&mut self, scene: &mut dyn SceneBackend, pinned: bool) -> Result<(), SceneError> {
        self.pinned = pinned;
        self.apply_guide_flags(scene)
    }

    /// Writes exact world matrices to guide-layer nodes, keyed by layer id.
    pub(crate) fn set_guide_worlds(
        &mut self,
        scene: &mut dyn SceneBackend,
        worlds: &IndexMap<String, Mat4>,
    ) -> Result<(), SceneError> {
        for (id, world) in worlds {
            if let Some(handle) = self.guide_handle(scene, id) {
                scene.set_world_transform(handle, *world)?;
            }
        }
        Ok(())
    }

    /// Pushes the definition transforms of the listed guides to the scene.
    ///
    /// Every other guide-layer node is put back at its previous world matrix
    /// afterwards, so hosts that carry children along with a moved parent do not
    /// drag the guides that were not listed.
    fn write_guides(&mut self, scene: &mut dyn SceneBackend, ids: &[String]) -> Result<(), SceneError> {
        let before = match self.layer(LayerKind::Guide) {
            Some(layer) => layer.world_transforms(scene)?,
            None => return Ok(()),
        };
        for id in ids {
            let Some(guide) = self.definition.guide(id) else {
                continue;
            };
            let world = guide.transform.to_mat4();
            if let Some(handle) = self.guide_handle(scene, id) {
                scene.set_world_transform(handle, world)?;
            }
            if let Some(shape) = self.guide_handle(scene, &shape_key(id)) {
                scene.set_world_transform(shape, world * guide.shape_transform.to_mat4())?;
            }
        }
        let written: Vec<String> = ids.iter().flat_map(|id| [id.clone(), shape_key(id)]).collect();
        let untouched: IndexMap<String, Mat4> = before
            .into_iter()
            .filter(|(id, _)| !written.contains(id))
            .collect();
        self.set_guide_worlds(scene, &untouched)
    }

    pub(crate) fn align_guides(
        &mut self,
        scene: &mut dyn SceneBackend,
        include_end: bool,
    ) -> Result<Vec<String>, SceneError> {
        self.sync_definition(scene)?;
        let aligned = self
            .behavior
            .align_guides(&mut self.definition, include_end);
        self.write_guides(scene, &aligned)?;
        Ok(aligned)
    }

    /// Copies the transforms of every guide `source` shares with this component.
    pub(crate) fn apply_guide_transforms(
        &mut self,
        scene: &mut dyn SceneBackend,
        source: &GuideDag,
    ) -> Result<Vec<String>, SceneError> {
        self.sync_definition(scene)?;
        let mut updated = Vec::new();
        for guide in source.iter() {
            if let Some(target) = self.definition.guide_mut(&guide.id) {
                target.transform = guide.transform;
                target.shape_transform = guide.shape_transform;
                updated.push(guide.id.clone());
            }
        }
        self.write_guides(scene, &updated)?;
        Ok(updated)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("key", &self.key())
            .field("rig", &self.rig)
            .field("state", &self.state)
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .finish()
    }
}
