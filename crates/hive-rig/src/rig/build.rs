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

//! Build phases, build-script hooks and rig-level polish.

use super::{Relatives, Rig};
use crate::build_script::{BuildHook, ScriptContext};
use crate::component::{BuildContext, Component, ComponentState, Transition};
use crate::layer::{LayerKind, LayerNode};
use crate::{space_switch, BuildError, RigError, Session};
use hive_core::naming::rules;
use hive_core::{AttributeValue, NodeKind, SceneBackend, SceneError};
use hive_data::ComponentRef;

/// The member names on a selection-set node.
pub const MEMBERS_ATTR: &str = "members";
/// Set on the rig root when the rig is black-boxed.
pub const BLACK_BOX_ATTR: &str = "blackBox";
/// Set on the layer roots a black-boxed rig hides from outliners.
pub const OUTLINER_HIDDEN_ATTR: &str = "hiddenInOutliner";

const SELECTION_SETS: [(&str, LayerKind, NodeKind); 2] = [
    ("ctrls", LayerKind::Rig, NodeKind::Control),
    ("deform", LayerKind::Deform, NodeKind::Joint),
];
const BLACK_BOXED_LAYERS: [LayerKind; 4] = [
    LayerKind::Guide,
    LayerKind::Deform,
    LayerKind::Input,
    LayerKind::Output,
];

/// What a batch phase did to each selected component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Components whose state changed, in processing order.
    pub applied: Vec<ComponentRef>,
    /// Components left as they were because the transition did not apply.
    pub skipped: Vec<ComponentRef>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseOptions {
    pub force: bool,
    pub align: bool,
}

impl PhaseOptions {
    pub(crate) const BUILD: Self = Self {
        force: false,
        align: true,
    };
    pub(crate) const RESTORE: Self = Self {
        force: false,
        align: false,
    };
}

fn hooks(phase: ComponentState) -> Option<(BuildHook, Option<BuildHook>)> {
    match phase {
        ComponentState::Empty => None,
        ComponentState::GuideBuilt => Some((BuildHook::PreGuideBuild, None)),
        ComponentState::SkeletonBuilt => Some((BuildHook::PreDeformBuild, None)),
        ComponentState::RigBuilt => Some((BuildHook::PreRigBuild, Some(BuildHook::PostRigBuild))),
        ComponentState::Polished => Some((BuildHook::PrePolish, Some(BuildHook::PostPolishBuild))),
    }
}

impl Rig {
    /// Builds guides for the given components, or for every component.
    ///
    /// Ancestors of the requested components are built as well.
    pub fn build_guides(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.build_to(session, ComponentState::GuideBuilt, targets, false)
    }

    /// Tears down and rebuilds guides, keeping the guide edits made in the scene.
    pub fn rebuild_guides(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.build_to(session, ComponentState::GuideBuilt, targets, true)
    }

    /// Builds skeletons, building missing guides first.
    pub fn build_deform(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.build_to(session, ComponentState::SkeletonBuilt, targets, false)
    }

    /// Builds control rigs, building missing guides and skeletons first.
    pub fn build_rigs(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.build_to(session, ComponentState::RigBuilt, targets, false)
    }

    /// Polishes components, then builds selection sets and applies the black box.
    pub fn polish(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.build_to(session, ComponentState::Polished, targets, false)
    }

    /// Deletes guides and everything built on them. Descendants go first.
    pub fn delete_guides(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.delete_to(session, ComponentState::GuideBuilt, targets)
    }

    /// Deletes skeletons and control rigs.
    pub fn delete_deform(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.delete_to(session, ComponentState::SkeletonBuilt, targets)
    }

    /// Deletes control rigs.
    pub fn delete_rigs(
        &mut self,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        self.delete_to(session, ComponentState::RigBuilt, targets)
    }

    fn build_to(
        &mut self,
        session: &mut Session,
        phase: ComponentState,
        targets: Option<&[ComponentRef]>,
        force: bool,
    ) -> Result<BuildReport, RigError> {
        let selected = self.ordered(targets, Relatives::Ancestors)?;
        for lower in [
            ComponentState::GuideBuilt,
            ComponentState::SkeletonBuilt,
            ComponentState::RigBuilt,
        ] {
            if lower >= phase {
                break;
            }
            let behind = selected
                .iter()
                .filter_map(|r| self.components.get(r))
                .any(|c| c.state() < lower);
            if behind {
                self.run_phase(session, lower, &selected, PhaseOptions::BUILD)?;
            }
        }
        let options = PhaseOptions {
            force,
            ..PhaseOptions::BUILD
        };
        self.run_phase(session, phase, &selected, options)
    }

    fn run_phase(
        &mut self,
        session: &mut Session,
        phase: ComponentState,
        selected: &[ComponentRef],
        options: PhaseOptions,
    ) -> Result<BuildReport, RigError> {
        let Some((pre, post)) = hooks(phase) else {
            return Ok(BuildReport::default());
        };
        self.ensure_root(session)?;
        self.run_hook(session, pre)?;

        let mut report = BuildReport::default();
        for reference in selected {
            match self.transition(session, reference, phase, options) {
                Ok(Transition::Applied) => report.applied.push(reference.clone()),
                Ok(Transition::Skipped) => report.skipped.push(reference.clone()),
                Err(source) => return Err(self.batch_failure(reference, phase, report, source)),
            }
        }
        if phase == ComponentState::Polished {
            self.finalize(session)?;
        }

        if let Some(post) = post {
            self.run_hook(session, post)?;
        }
        log::info!(
            "Rig '{}': {} phase applied to {} component(s), {} skipped",
            self.name,
            phase,
            report.applied.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    pub(crate) fn batch_failure(
        &self,
        reference: &ComponentRef,
        phase: ComponentState,
        report: BuildReport,
        source: BuildError,
    ) -> RigError {
        let component = match self.components.get(reference) {
            Some(component) => component.key(),
            None => hive_data::ComponentKey::new("", &reference.name, &reference.side),
        };
        log::error!(
            "Rig '{}': {} phase failed at {} after {} component(s): {}",
            self.name,
            phase,
            component,
            report.applied.len(),
            source
        );
        RigError::BuildFailed {
            component,
            built: report.applied,
            source,
        }
    }

    /// Moves one component into `phase`, wiring space switches after a rig build.
    pub(crate) fn transition(
        &mut self,
        session: &mut Session,
        reference: &ComponentRef,
        phase: ComponentState,
        options: PhaseOptions,
    ) -> Result<Transition, BuildError> {
        let rig_root = self
            .root
            .as_ref()
            .map(|r| r.handle)
            .ok_or_else(|| BuildError::Behavior {
                component: reference.to_string(),
                reason: format!("rig '{}' has no root", self.name),
            })?;
        let component = self
            .components
            .get_mut(reference)
            .ok_or_else(|| BuildError::Behavior {
                component: reference.to_string(),
                reason: format!("not a component of rig '{}'", self.name),
            })?;
        let mut ctx = BuildContext {
            scene: session.scene.as_mut(),
            naming: &session.naming,
            configuration: &self.configuration,
        };

        let transition = match phase {
            ComponentState::Empty => Transition::Skipped,
            ComponentState::GuideBuilt => component.build_guides(&mut ctx, rig_root, options.force)?,
            ComponentState::SkeletonBuilt => component.build_deform(&mut ctx, options.align)?,
            ComponentState::RigBuilt => component.build_rigs(&mut ctx)?,
            ComponentState::Polished => component.polish(ctx.scene)?,
        };
        if phase == ComponentState::RigBuilt && transition == Transition::Applied {
            space_switch::wire(
                &mut self.components,
                reference,
                session.scene.as_mut(),
                &session.naming,
            )?;
        }
        Ok(transition)
    }

    fn delete_to(
        &mut self,
        session: &mut Session,
        phase: ComponentState,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        let mut selected = self.ordered(targets, Relatives::Descendants)?;
        selected.reverse();

        let mut report = BuildReport::default();
        let mut unpolished = false;
        for reference in &selected {
            let Some(component) = self.components.get_mut(reference) else {
                continue;
            };
            let was_polished = component.state() == ComponentState::Polished;
            let scene = session.scene.as_mut();
            let result = match phase {
                ComponentState::GuideBuilt => component.delete_guides(scene),
                ComponentState::SkeletonBuilt => component.delete_deform(scene),
                _ => component.delete_rigs(scene),
            };
            match result {
                Ok(Transition::Applied) => {
                    unpolished |= was_polished;
                    report.applied.push(reference.clone());
                }
                Ok(Transition::Skipped) => report.skipped.push(reference.clone()),
                Err(e) => {
                    return Err(self.batch_failure(reference, phase, report, e.into()));
                }
            }
        }
        if unpolished {
            self.clear_finalize(session.scene.as_mut())?;
        }
        log::info!(
            "Rig '{}': deleted down from {} on {} component(s), {} skipped",
            self.name,
            phase,
            report.applied.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Rebuilds the control rig of a component that has one.
    pub(crate) fn rebuild_rig_layers(
        &mut self,
        session: &mut Session,
        reference: &ComponentRef,
    ) -> Result<(), RigError> {
        let Some(component) = self.components.get_mut(reference) else {
            return Ok(());
        };
        let state = component.state();
        if state < ComponentState::RigBuilt {
            return Ok(());
        }
        component.delete_rigs(session.scene.as_mut())?;
        for phase in [ComponentState::RigBuilt, ComponentState::Polished] {
            if phase <= state {
                self.transition(session, reference, phase, PhaseOptions::RESTORE)
                    .map_err(|source| {
                        self.batch_failure(reference, phase, BuildReport::default(), source)
                    })?;
            }
        }
        if state == ComponentState::Polished && self.finalized {
            self.finalize(session)?;
        }
        log::debug!("Rig '{}': rebuilt the rig layers of {}", self.name, reference);
        Ok(())
    }

    /// Raises freshly added components to the given states, phase by phase.
    ///
    /// Hooks and auto-align do not run.
    pub(crate) fn raise_components(
        &mut self,
        session: &mut Session,
        targets: &[(ComponentRef, ComponentState)],
    ) -> Result<(), RigError> {
        if targets.iter().all(|(_, state)| *state == ComponentState::Empty) {
            return Ok(());
        }
        self.ensure_root(session)?;
        for phase in [
            ComponentState::GuideBuilt,
            ComponentState::SkeletonBuilt,
            ComponentState::RigBuilt,
            ComponentState::Polished,
        ] {
            for (reference, state) in targets {
                if *state >= phase {
                    self.transition(session, reference, phase, PhaseOptions::RESTORE)
                        .map_err(|source| {
                            self.batch_failure(reference, phase, BuildReport::default(), source)
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Runs the enabled build scripts for `hook`, in configuration order.
    ///
    /// Each script sees its property bag from the configuration, or its defaults
    /// when none is stored, and the bag is stored back afterwards.
    fn run_hook(&mut self, session: &mut Session, hook: BuildHook) -> Result<(), RigError> {
        let ids = self.configuration.build_scripts.clone();
        for id in ids {
            let Some(script) = session.build_scripts.get(&id) else {
                log::warn!(
                    "Rig '{}': build script '{}' is not registered, skipped",
                    self.name,
                    id
                );
                continue;
            };
            let mut properties = std::mem::take(self.configuration.script_properties_mut(&id));
            if properties.is_empty() {
                properties = script.default_properties();
            }

            log::debug!("Rig '{}': running {} of '{}'", self.name, hook, id);
            let result = {
                let mut ctx = ScriptContext {
                    rig: self,
                    scene: session.scene.as_mut(),
                    naming: &session.naming,
                };
                script.run_hook(hook, &mut ctx, &mut properties)
            };
            *self.configuration.script_properties_mut(&id) = properties;

            if let Err(e) = result {
                log::error!("Rig '{}': build script '{}' failed in {}: {}", self.name, id, hook, e);
                return Err(BuildError::Script {
                    script: id,
                    hook: hook.as_str(),
                    reason: e.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Rebuilds the rig-level polish: selection sets and the black box.
    pub(crate) fn finalize(&mut self, session: &mut Session) -> Result<(), RigError> {
        let scene = session.scene.as_mut();
        self.clear_finalize(scene)?;
        let Some(root) = self.root.as_ref().map(|r| r.handle) else {
            return Ok(());
        };

        let polished: Vec<&Component> = self
            .build_order()
            .iter()
            .filter_map(|r| self.components.get(r))
            .filter(|c| c.state() == ComponentState::Polished)
            .collect();
        let mut sets = Vec::new();
        if self.configuration.build_selection_sets {
            for (id, layer, kind) in SELECTION_SETS {
                let members: Vec<String> = polished
                    .iter()
                    .filter_map(|c| c.layer(layer))
                    .flat_map(|l| l.names_of_kind(kind))
                    .collect();
                let name = session.naming.resolve(
                    rules::SELECTION_SET,
                    &[("rigName", self.name.as_str()), ("id", id)],
                )?;
                let handle = scene.create_node(NodeKind::SelectionSet, &name)?;
                scene.set_parent(handle, Some(root))?;
                scene.set_attribute(handle, MEMBERS_ATTR, AttributeValue::StringList(members))?;
                sets.push(LayerNode {
                    handle,
                    name,
                    kind: NodeKind::SelectionSet,
                });
            }
        }
        if self.configuration.black_box {
            scene.set_attribute(root, BLACK_BOX_ATTR, true.into())?;
            for layer in polished
                .iter()
                .flat_map(|c| BLACK_BOXED_LAYERS.iter().filter_map(|k| c.layer(*k)))
            {
                scene.set_attribute(layer.root().handle, OUTLINER_HIDDEN_ATTR, true.into())?;
            }
        }

        log::debug!(
            "Rig '{}': finalized with {} selection set(s)",
            self.name,
            sets.len()
        );
        self.selection_sets = sets;
        self.finalized = true;
        Ok(())
    }

    /// Removes the selection sets and lifts the black box.
    pub(crate) fn clear_finalize(&mut self, scene: &mut dyn SceneBackend) -> Result<(), SceneError> {
        for set in self.selection_sets.drain(..) {
            if scene.exists(set.handle) {
                scene.delete_node(set.handle)?;
            }
        }
        if self.finalized && self.configuration.black_box {
            if let Some(root) = self.root.as_ref().filter(|r| scene.exists(r.handle)) {
                scene.set_attribute(root.handle, BLACK_BOX_ATTR, false.into())?;
            }
            for layer in self
                .components
                .values()
                .flat_map(|c| BLACK_BOXED_LAYERS.iter().filter_map(|k| c.layer(*k)))
            {
                if scene.exists(layer.root().handle) {
                    scene.set_attribute(layer.root().handle, OUTLINER_HIDDEN_ATTR, false.into())?;
                }
            }
        }
        self.finalized = false;
        Ok(())
    }
}
