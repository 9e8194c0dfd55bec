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

//! Build-phase commands, guide alignment and guide display flags.

use super::{require_components, require_rig, Checkpoint, GuideCheckpoint};
use crate::{BuildReport, CommandError, Hive, Rig, RigError, RigId, Session};
use hive_core::{Cancellation, Transaction};
use hive_data::ComponentRef;

/// The phase operation a [`BuildCommand`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildAction {
    /// Builds guides.
    BuildGuides,
    /// Tears guides down and builds them again from their current placement.
    RebuildGuides,
    /// Builds skeletons.
    BuildDeform,
    /// Builds control rigs.
    BuildRigs,
    /// Polishes the rig.
    Polish,
    /// Deletes guides and everything above them.
    DeleteGuides,
    /// Deletes skeletons and control rigs.
    DeleteDeform,
    /// Deletes control rigs.
    DeleteRigs,
}

impl BuildAction {
    /// Returns the command name of the action.
    pub fn label(&self) -> &'static str {
        match self {
            BuildAction::BuildGuides => "Build Guides",
            BuildAction::RebuildGuides => "Rebuild Guides",
            BuildAction::BuildDeform => "Build Deform",
            BuildAction::BuildRigs => "Build Rigs",
            BuildAction::Polish => "Polish",
            BuildAction::DeleteGuides => "Delete Guides",
            BuildAction::DeleteDeform => "Delete Deform",
            BuildAction::DeleteRigs => "Delete Rigs",
        }
    }

    fn apply(
        self,
        rig: &mut Rig,
        session: &mut Session,
        targets: Option<&[ComponentRef]>,
    ) -> Result<BuildReport, RigError> {
        match self {
            BuildAction::BuildGuides => rig.build_guides(session, targets),
            BuildAction::RebuildGuides => rig.rebuild_guides(session, targets),
            BuildAction::BuildDeform => rig.build_deform(session, targets),
            BuildAction::BuildRigs => rig.build_rigs(session, targets),
            BuildAction::Polish => rig.polish(session, targets),
            BuildAction::DeleteGuides => rig.delete_guides(session, targets),
            BuildAction::DeleteDeform => rig.delete_deform(session, targets),
            BuildAction::DeleteRigs => rig.delete_rigs(session, targets),
        }
    }
}

/// Runs one build phase over a rig, or over some of its components.
///
/// A failing batch keeps the components it built before the failure. Undo
/// restores the rig as it was before the command.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    rig: RigId,
    action: BuildAction,
    targets: Option<Vec<ComponentRef>>,
    checkpoint: Checkpoint,
}

impl BuildCommand {
    /// Runs `action` over every component of `rig`.
    pub fn new(rig: RigId, action: BuildAction) -> Self {
        Self {
            rig,
            action,
            targets: None,
            checkpoint: Checkpoint::default(),
        }
    }

    /// Restricts the command to `targets`.
    pub fn with_targets(mut self, targets: Vec<ComponentRef>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Builds guides.
    pub fn build_guides(rig: RigId) -> Self {
        Self::new(rig, BuildAction::BuildGuides)
    }

    /// Builds skeletons.
    pub fn build_deform(rig: RigId) -> Self {
        Self::new(rig, BuildAction::BuildDeform)
    }

    /// Builds control rigs.
    pub fn build_rigs(rig: RigId) -> Self {
        Self::new(rig, BuildAction::BuildRigs)
    }

    /// Polishes the rig.
    pub fn polish(rig: RigId) -> Self {
        Self::new(rig, BuildAction::Polish)
    }

    /// Deletes guides.
    pub fn delete_guides(rig: RigId) -> Self {
        Self::new(rig, BuildAction::DeleteGuides)
    }

    /// Deletes control rigs.
    pub fn delete_rigs(rig: RigId) -> Self {
        Self::new(rig, BuildAction::DeleteRigs)
    }

    /// Returns the action.
    pub fn action(&self) -> BuildAction {
        self.action
    }
}

impl Transaction<Hive> for BuildCommand {
    type Output = BuildReport;
    type Error = CommandError;

    fn name(&self) -> &str {
        self.action.label()
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        if let Some(targets) = &mut self.targets {
            require_components(rig, targets.iter())?;
            let mut seen = Vec::with_capacity(targets.len());
            targets.retain(|t| {
                let fresh = !seen.contains(t);
                if fresh {
                    seen.push(t.clone());
                }
                fresh
            });
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<BuildReport, CommandError> {
        let (action, targets) = (self.action, self.targets.as_deref());
        self.checkpoint
            .run(hive, self.rig, action.label(), false, |rig, session| {
                action.apply(rig, session, targets)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, self.action.label())
    }
}

/// Aims guides along their chains.
///
/// Undo writes the previous guide placement back onto the same guide nodes.
#[derive(Debug, Clone)]
pub struct AlignGuides {
    rig: RigId,
    targets: Option<Vec<ComponentRef>>,
    include_end: bool,
    checkpoint: GuideCheckpoint,
}

impl AlignGuides {
    /// Aligns the guides of every component of `rig`, leaving end guides as they are.
    pub fn new(rig: RigId) -> Self {
        Self {
            rig,
            targets: None,
            include_end: false,
            checkpoint: GuideCheckpoint::default(),
        }
    }

    /// Restricts the command to `targets`.
    pub fn with_targets(mut self, targets: Vec<ComponentRef>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Aligns the terminal guide of each chain as well.
    pub fn including_end(mut self) -> Self {
        self.include_end = true;
        self
    }
}

impl Transaction<Hive> for AlignGuides {
    type Output = Vec<(ComponentRef, Vec<String>)>;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Align Guides"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, self.targets.iter().flatten())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<Self::Output, CommandError> {
        let (targets, include_end) = (self.targets.as_deref(), self.include_end);
        self.checkpoint
            .run(hive, self.rig, targets, "Align Guides", |rig, session| {
                rig.align_guides(session, targets, include_end)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Align Guides")
    }
}

/// A guide display flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideFlag {
    /// Shows (`true`) or hides the guides.
    Visible(bool),
    /// Pins (`true`) or unpins the guides.
    Pinned(bool),
}

/// Shows, hides, pins or unpins guides.
///
/// Undo puts the previous flags back without touching any scene node but the
/// guide layers.
#[derive(Debug, Clone)]
pub struct SetGuideFlags {
    rig: RigId,
    targets: Option<Vec<ComponentRef>>,
    flag: GuideFlag,
    checkpoint: GuideCheckpoint,
}

impl SetGuideFlags {
    /// Sets `flag` on the guides of every component of `rig`.
    pub fn new(rig: RigId, flag: GuideFlag) -> Self {
        Self {
            rig,
            targets: None,
            flag,
            checkpoint: GuideCheckpoint::default(),
        }
    }

    /// Restricts the command to `targets`.
    pub fn with_targets(mut self, targets: Vec<ComponentRef>) -> Self {
        self.targets = Some(targets);
        self
    }
}

impl Transaction<Hive> for SetGuideFlags {
    type Output = ();
    type Error = CommandError;

    fn name(&self) -> &str {
        match self.flag {
            GuideFlag::Visible(true) => "Show Guides",
            GuideFlag::Visible(false) => "Hide Guides",
            GuideFlag::Pinned(true) => "Pin Guides",
            GuideFlag::Pinned(false) => "Unpin Guides",
        }
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, self.targets.iter().flatten())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        let (targets, flag) = (self.targets.as_deref(), self.flag);
        self.checkpoint
            .run(hive, self.rig, targets, "Set Guide Flags", |rig, session| match flag {
                GuideFlag::Visible(visible) => rig.set_guides_visible(session, targets, visible),
                GuideFlag::Pinned(pinned) => rig.set_guides_pinned(session, targets, pinned),
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Set Guide Flags")
    }
}
