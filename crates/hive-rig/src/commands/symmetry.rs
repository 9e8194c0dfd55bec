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

//! Mirror and duplicate commands.

use super::{require_components, require_rig, Checkpoint, GuideCheckpoint};
use crate::rig::{target_side, DuplicateRequest, MirrorDescriptor, MirrorReport};
use crate::{CommandError, Hive, RigId};
use hive_core::{Cancellation, Transaction};
use hive_data::ComponentRef;
use std::collections::HashSet;

/// Mirrors components to their opposite side.
///
/// Undo deletes the components the mirror created and puts overwritten guides back.
/// A mirror that only overwrote existing components is undone in place, without
/// rebuilding the rig.
#[derive(Debug, Clone)]
pub struct MirrorComponents {
    rig: RigId,
    descriptors: Vec<MirrorDescriptor>,
    guides: GuideCheckpoint,
    checkpoint: Checkpoint,
    structural: bool,
}

impl MirrorComponents {
    /// Mirrors with the given descriptors.
    pub fn new(rig: RigId, descriptors: Vec<MirrorDescriptor>) -> Self {
        Self {
            rig,
            descriptors,
            guides: GuideCheckpoint::default(),
            checkpoint: Checkpoint::default(),
            structural: true,
        }
    }
}

impl Transaction<Hive> for MirrorComponents {
    type Output = MirrorReport;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Mirror Components"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        if self.descriptors.is_empty() {
            return Err(Cancellation::new("Nothing to mirror"));
        }
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, self.descriptors.iter().map(|d| &d.component))?;

        let naming = hive.session().naming();
        for descriptor in &self.descriptors {
            let side =
                target_side(naming, descriptor).map_err(|e| Cancellation::new(e.to_string()))?;
            let opposite = ComponentRef::new(&descriptor.component.name, side);
            if !descriptor.duplicate && !rig.contains(&opposite) {
                return Err(Cancellation::new(format!(
                    "No opposite component '{opposite}' to overwrite"
                )));
            }
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<MirrorReport, CommandError> {
        self.guides.take(hive, self.rig, None)?;
        let descriptors = &self.descriptors;
        let report = self
            .checkpoint
            .run(hive, self.rig, "Mirror Components", true, |rig, session| {
                rig.mirror_components(session, descriptors)
            })?;
        self.structural = !report.created.is_empty();
        Ok(report)
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        if self.structural {
            self.checkpoint.restore(hive, "Mirror Components")
        } else {
            self.guides.restore(hive, "Mirror Components")
        }
    }
}

/// Copies components together with their descendants.
#[derive(Debug, Clone)]
pub struct DuplicateComponents {
    rig: RigId,
    requests: Vec<DuplicateRequest>,
    checkpoint: Checkpoint,
}

impl DuplicateComponents {
    /// Duplicates with the given requests.
    pub fn new(rig: RigId, requests: Vec<DuplicateRequest>) -> Self {
        Self {
            rig,
            requests,
            checkpoint: Checkpoint::default(),
        }
    }
}

impl Transaction<Hive> for DuplicateComponents {
    type Output = Vec<(ComponentRef, ComponentRef)>;
    type Error = CommandError;

    fn name(&self) -> &str {
        "Duplicate Components"
    }

    fn resolve_arguments(&mut self, hive: &Hive) -> Result<(), Cancellation> {
        if self.requests.is_empty() {
            return Err(Cancellation::new("Nothing to duplicate"));
        }
        let rig = require_rig(hive, self.rig)?;
        require_components(rig, self.requests.iter().map(|r| &r.source))?;

        let mut claimed = HashSet::new();
        for request in &self.requests {
            if request.name.is_none() && request.side.is_none() {
                continue;
            }
            let target = ComponentRef::new(
                request.name.as_deref().unwrap_or(&request.source.name),
                request.side.as_deref().unwrap_or(&request.source.side),
            );
            if rig.contains(&target) || !claimed.insert(target.clone()) {
                return Err(Cancellation::new(format!(
                    "Component '{target}' already exists"
                )));
            }
        }
        Ok(())
    }

    fn do_it(&mut self, hive: &mut Hive) -> Result<Self::Output, CommandError> {
        let requests = &self.requests;
        self.checkpoint
            .run(hive, self.rig, "Duplicate Components", true, |rig, session| {
                rig.duplicate_components(session, requests)
            })
    }

    fn undo_it(&mut self, hive: &mut Hive) -> Result<(), CommandError> {
        self.checkpoint.restore(hive, "Duplicate Components")
    }
}
