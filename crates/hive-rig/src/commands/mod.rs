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

//! Reversible commands over a [`Hive`].
//!
//! Every mutating rig operation has a command here. A command validates its
//! arguments against the engine in `resolve_arguments` (a rejection is a
//! cancellation and touches nothing), runs the operation in `do_it` and reverts it
//! in `undo_it`. Commands that only move or flag guides capture the guides they
//! touch and write them back on undo, leaving every scene node in place.
//! Structural commands capture a [`RigCapture`] before they run and undo by
//! restoring it, which rebuilds the rig node for node and keeps foreign nodes
//! parented under it.
//!
//! [`CommandExecutor`] runs commands through a [`TransactionStack`] and reports
//! every outcome as a [`CommandReport`] instead of an error.

mod build;
mod component;
mod rig;
mod symmetry;

pub use self::build::{AlignGuides, BuildAction, BuildCommand, GuideFlag, SetGuideFlags};
pub use self::component::{CreateComponent, DeleteComponent, RenameComponent, SetComponentParent};
pub use self::rig::{CreateRig, LoadTemplate, TemplateSource};
pub use self::symmetry::{DuplicateComponents, MirrorComponents};

use crate::rig::{GuideCapture, RigCapture};
use crate::{CommandError, Hive, Rig, RigError, RigId, Session};
use hive_core::{Cancellation, Transaction, TransactionError, TransactionStack};
use hive_data::ComponentRef;
use std::fmt;

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command ran and was recorded.
    Succeeded,
    /// The arguments were rejected. Nothing changed.
    Cancelled,
    /// The command failed while running.
    Failed,
}

/// The structured outcome of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport<T> {
    /// How the command ended.
    pub status: CommandStatus,
    /// A human-readable summary.
    pub message: String,
    /// The command's result, present on success.
    pub value: Option<T>,
}

impl<T> CommandReport<T> {
    fn from_result(name: &str, result: Result<T, TransactionError>) -> Self {
        match result {
            Ok(value) => Self {
                status: CommandStatus::Succeeded,
                message: format!("'{name}' succeeded"),
                value: Some(value),
            },
            Err(e) => Self {
                status: if e.is_cancellation() {
                    CommandStatus::Cancelled
                } else {
                    CommandStatus::Failed
                },
                message: e.to_string(),
                value: None,
            },
        }
    }

    /// Returns `true` if the command succeeded.
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Succeeded
    }

    /// Returns the result value, if the command succeeded.
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// Runs commands against a [`Hive`] and keeps their undo history.
pub struct CommandExecutor {
    stack: TransactionStack<Hive>,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    /// Creates an executor with an unbounded history.
    pub fn new() -> Self {
        Self {
            stack: TransactionStack::new(),
        }
    }

    /// Creates an executor that keeps at most `limit` undo entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            stack: TransactionStack::with_limit(limit),
        }
    }

    /// Validates and runs a command.
    pub fn execute<T>(&mut self, hive: &mut Hive, command: T) -> CommandReport<T::Output>
    where
        T: Transaction<Hive> + 'static,
    {
        let name = <T as Transaction<Hive>>::name(&command).to_string();
        CommandReport::from_result(&name, self.stack.execute(command, hive))
    }

    /// Runs several commands as one undo entry.
    ///
    /// `body` executes its commands through the stack it is given. If it fails,
    /// the commands it already ran are undone in reverse order.
    pub fn group<R>(
        &mut self,
        hive: &mut Hive,
        name: &str,
        body: impl FnOnce(&mut TransactionStack<Hive>, &mut Hive) -> Result<R, TransactionError>,
    ) -> CommandReport<R> {
        CommandReport::from_result(name, self.stack.run_group(name, hive, body))
    }

    /// Undoes the most recent entry.
    pub fn undo(&mut self, hive: &mut Hive) -> CommandReport<()> {
        CommandReport::from_result("undo", self.stack.undo(hive))
    }

    /// Re-applies the most recently undone entry.
    pub fn redo(&mut self, hive: &mut Hive) -> CommandReport<()> {
        CommandReport::from_result("redo", self.stack.redo(hive))
    }

    /// Returns `true` if there is an entry to undo.
    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    /// Returns `true` if there is an entry to redo.
    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    /// Returns the names of the undo entries, oldest first.
    pub fn history(&self) -> Vec<&str> {
        self.stack.history()
    }

    /// Drops the whole history.
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("history", &self.stack.history())
            .field("can_redo", &self.stack.can_redo())
            .finish()
    }
}

/// The before-state of a command scoped to one rig.
#[derive(Debug, Clone, Default)]
pub(crate) struct Checkpoint(Option<RigCapture>);

impl Checkpoint {
    fn take(&mut self, hive: &Hive, rig: RigId) -> Result<(), RigError> {
        self.0 = Some(RigCapture::capture(hive.rig(rig)?, hive.scene())?);
        Ok(())
    }

    /// Restores the captured rig. A rig deleted since the capture is left alone.
    pub(crate) fn restore(&self, hive: &mut Hive, command: &'static str) -> Result<(), CommandError> {
        let capture = self.0.as_ref().ok_or(CommandError::NothingCaptured(command))?;
        if !hive.contains_rig(capture.rig()) {
            log::warn!(
                "'{}': {} no longer exists, nothing to restore",
                command,
                capture.rig()
            );
            return Ok(());
        }
        hive.with_rig(capture.rig(), |rig, session| capture.restore(rig, session))?;
        Ok(())
    }

    /// Captures `rig`, then runs `f` on it.
    ///
    /// With `rollback`, a failure restores the capture before the error is returned
    /// so the command leaves nothing half-applied.
    pub(crate) fn run<R>(
        &mut self,
        hive: &mut Hive,
        rig: RigId,
        command: &'static str,
        rollback: bool,
        f: impl FnOnce(&mut Rig, &mut Session) -> Result<R, RigError>,
    ) -> Result<R, CommandError> {
        self.take(hive, rig)?;
        match hive.with_rig(rig, f) {
            Ok(value) => Ok(value),
            Err(e) => {
                if rollback {
                    if let Err(restore) = self.restore(hive, command) {
                        log::error!("'{}': rollback failed: {}", command, restore);
                    }
                }
                Err(e.into())
            }
        }
    }
}

/// The before-state of a command that only moves or flags guides.
#[derive(Debug, Clone, Default)]
pub(crate) struct GuideCheckpoint(Option<(RigId, Vec<GuideCapture>)>);

impl GuideCheckpoint {
    /// Captures the guides of `targets` in `rig`, or of every component.
    pub(crate) fn take(
        &mut self,
        hive: &Hive,
        rig: RigId,
        targets: Option<&[ComponentRef]>,
    ) -> Result<(), RigError> {
        let guides = hive.rig(rig)?.capture_guides(hive.scene(), targets)?;
        self.0 = Some((rig, guides));
        Ok(())
    }

    /// Writes the captured guides back. A rig deleted since the capture is left alone.
    pub(crate) fn restore(&self, hive: &mut Hive, command: &'static str) -> Result<(), CommandError> {
        let (rig, guides) = self.0.as_ref().ok_or(CommandError::NothingCaptured(command))?;
        if !hive.contains_rig(*rig) {
            log::warn!("'{}': {} no longer exists, nothing to restore", command, rig);
            return Ok(());
        }
        hive.with_rig(*rig, |rig, session| {
            rig.restore_guides(session.scene.as_mut(), guides)
                .map_err(RigError::from)
        })?;
        Ok(())
    }

    /// Captures the guides, then runs `f`. A failure writes them back before the
    /// error is returned.
    pub(crate) fn run<R>(
        &mut self,
        hive: &mut Hive,
        rig: RigId,
        targets: Option<&[ComponentRef]>,
        command: &'static str,
        f: impl FnOnce(&mut Rig, &mut Session) -> Result<R, RigError>,
    ) -> Result<R, CommandError> {
        self.take(hive, rig, targets)?;
        match hive.with_rig(rig, f) {
            Ok(value) => Ok(value),
            Err(e) => {
                if let Err(restore) = self.restore(hive, command) {
                    log::error!("'{}': rollback failed: {}", command, restore);
                }
                Err(e.into())
            }
        }
    }
}

pub(crate) fn require_rig(hive: &Hive, rig: RigId) -> Result<&Rig, Cancellation> {
    hive.rig(rig).map_err(|e| Cancellation::new(e.to_string()))
}

pub(crate) fn require_components<'a>(
    rig: &Rig,
    references: impl IntoIterator<Item = &'a ComponentRef>,
) -> Result<(), Cancellation> {
    for reference in references {
        if !rig.contains(reference) {
            return Err(Cancellation::new(format!(
                "Rig '{}' has no component '{}'",
                rig.name(),
                reference
            )));
        }
    }
    Ok(())
}
