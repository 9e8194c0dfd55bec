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

//! The undo/redo backbone of the engine.
//!
//! Every mutating operation is a [`Transaction`]: arguments are validated first
//! (`resolve_arguments`, which may cancel without touching anything), then the
//! mutation runs (`do_it`) while capturing what it needs to be reversed
//! (`undo_it`). A [`TransactionStack`] executes transactions against a context,
//! keeps the undo/redo history and composes several transactions into one entry
//! with [`TransactionStack::run_group`].

use std::error::Error;
use std::fmt;

/// A validation failure raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    /// A human-readable reason.
    pub reason: String,
}

impl Cancellation {
    /// Creates a cancellation with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl Error for Cancellation {}

/// An error produced by the [`TransactionStack`].
#[derive(Debug)]
pub enum TransactionError {
    /// The transaction rejected its arguments. Nothing was mutated.
    Cancelled {
        /// The name of the transaction.
        transaction: String,
        /// Why it was rejected.
        cancellation: Cancellation,
    },
    /// The transaction failed while running, undoing or redoing.
    Failed {
        /// The name of the transaction.
        transaction: String,
        /// The underlying error.
        source: Box<dyn Error + 'static>,
    },
    /// `undo` was called with an empty undo history.
    NothingToUndo,
    /// `redo` was called with an empty redo history.
    NothingToRedo,
}

impl TransactionError {
    /// Returns `true` if the error is a cancellation, meaning nothing was mutated.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransactionError::Cancelled { .. })
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::Cancelled {
                transaction,
                cancellation,
            } => write!(f, "'{transaction}' was cancelled: {cancellation}"),
            TransactionError::Failed {
                transaction,
                source,
            } => write!(f, "'{transaction}' failed: {source}"),
            TransactionError::NothingToUndo => write!(f, "Nothing to undo"),
            TransactionError::NothingToRedo => write!(f, "Nothing to redo"),
        }
    }
}

impl Error for TransactionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransactionError::Cancelled { cancellation, .. } => Some(cancellation),
            TransactionError::Failed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// A reversible operation over a context `C`.
pub trait Transaction<C> {
    /// The value produced by a successful `do_it`.
    type Output;
    /// The error produced by `do_it` or `undo_it`.
    type Error: Error + 'static;

    /// A short, human-readable name used in logs and the undo history.
    fn name(&self) -> &str;

    /// Validates and normalizes the arguments against the current context.
    ///
    /// Must not mutate the context.
    fn resolve_arguments(&mut self, context: &C) -> Result<(), Cancellation>;

    /// Performs the mutation, capturing whatever is needed to reverse it.
    fn do_it(&mut self, context: &mut C) -> Result<Self::Output, Self::Error>;

    /// Restores the state captured by `do_it`.
    ///
    /// Must tolerate handles that were deleted since `do_it` ran.
    fn undo_it(&mut self, context: &mut C) -> Result<(), Self::Error>;

    /// Whether the transaction is recorded in the undo history.
    fn is_undoable(&self) -> bool {
        true
    }
}

/// The object-safe view of a recorded transaction, as stored in the history.
pub trait Reversible<C> {
    /// The name of the recorded transaction.
    fn name(&self) -> &str;
    /// Reverts the transaction.
    fn undo(&mut self, context: &mut C) -> Result<(), TransactionError>;
    /// Applies the transaction again after an undo.
    fn redo(&mut self, context: &mut C) -> Result<(), TransactionError>;
}

impl<C, T: Transaction<C>> Reversible<C> for T {
    fn name(&self) -> &str {
        <T as Transaction<C>>::name(self)
    }

    fn undo(&mut self, context: &mut C) -> Result<(), TransactionError> {
        self.undo_it(context).map_err(|e| TransactionError::Failed {
            transaction: <T as Transaction<C>>::name(self).to_string(),
            source: Box::new(e),
        })
    }

    fn redo(&mut self, context: &mut C) -> Result<(), TransactionError> {
        match self.do_it(context) {
            Ok(_) => Ok(()),
            Err(e) => Err(TransactionError::Failed {
                transaction: <T as Transaction<C>>::name(self).to_string(),
                source: Box::new(e),
            }),
        }
    }
}

/// Several recorded transactions that undo and redo as one history entry.
pub struct TransactionGroup<C> {
    name: String,
    children: Vec<Box<dyn Reversible<C>>>,
}

impl<C> TransactionGroup<C> {
    /// Returns the names of the grouped transactions, in execution order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name()).collect()
    }

    fn rollback(
        children: &mut [Box<dyn Reversible<C>>],
        context: &mut C,
    ) -> Result<(), TransactionError> {
        let mut first_error = None;
        for child in children.iter_mut().rev() {
            if let Err(e) = child.undo(context) {
                log::warn!("Failed to undo '{}' during rollback: {}", child.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<C> Transaction<C> for TransactionGroup<C> {
    type Output = ();
    type Error = TransactionError;

    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_arguments(&mut self, _context: &C) -> Result<(), Cancellation> {
        Ok(())
    }

    fn do_it(&mut self, context: &mut C) -> Result<(), TransactionError> {
        for i in 0..self.children.len() {
            if let Err(e) = self.children[i].redo(context) {
                Self::rollback(&mut self.children[..i], context)?;
                return Err(e);
            }
        }
        Ok(())
    }

    fn undo_it(&mut self, context: &mut C) -> Result<(), TransactionError> {
        Self::rollback(&mut self.children, context)
    }
}

/// Executes transactions and keeps the undo/redo history.
pub struct TransactionStack<C> {
    undo_stack: Vec<Box<dyn Reversible<C>>>,
    redo_stack: Vec<Box<dyn Reversible<C>>>,
    limit: Option<usize>,
    // Open groups, innermost last.
    recording: Vec<Vec<Box<dyn Reversible<C>>>>,
}

impl<C: 'static> Default for TransactionStack<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> TransactionStack<C> {
    /// Creates an empty stack with an unbounded history.
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: None,
            recording: Vec::new(),
        }
    }

    /// Creates an empty stack that keeps at most `limit` undo entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Validates and runs a transaction, recording it in the history if it is undoable.
    ///
    /// A transaction whose `do_it` fails is not recorded. Any partial effect stays
    /// in place unless the transaction runs inside a group, which rolls back.
    pub fn execute<T>(
        &mut self,
        mut transaction: T,
        context: &mut C,
    ) -> Result<T::Output, TransactionError>
    where
        T: Transaction<C> + 'static,
    {
        let name = <T as Transaction<C>>::name(&transaction).to_string();
        if let Err(cancellation) = transaction.resolve_arguments(context) {
            log::info!("'{}' cancelled: {}", name, cancellation);
            return Err(TransactionError::Cancelled {
                transaction: name,
                cancellation,
            });
        }

        let output = transaction.do_it(context).map_err(|e| {
            log::error!("'{}' failed: {}", name, e);
            TransactionError::Failed {
                transaction: name.clone(),
                source: Box::new(e),
            }
        })?;

        if transaction.is_undoable() {
            self.record(Box::new(transaction));
        }
        log::debug!("Executed '{}'", name);
        Ok(output)
    }

    /// Runs `body` as one composite transaction named `name`.
    ///
    /// Every transaction executed through the stack inside `body` joins the group.
    /// If `body` fails, the transactions it already ran are undone in reverse order
    /// and the error is returned. On success the group is recorded as a single entry.
    pub fn run_group<R, F>(
        &mut self,
        name: &str,
        context: &mut C,
        body: F,
    ) -> Result<R, TransactionError>
    where
        F: FnOnce(&mut Self, &mut C) -> Result<R, TransactionError>,
    {
        self.recording.push(Vec::new());
        let result = body(self, context);
        let mut children = self.recording.pop().unwrap_or_default();

        match result {
            Ok(value) => {
                if !children.is_empty() {
                    self.record(Box::new(TransactionGroup {
                        name: name.to_string(),
                        children,
                    }));
                }
                Ok(value)
            }
            Err(e) => {
                log::warn!(
                    "Group '{}' failed, rolling back {} transaction(s)",
                    name,
                    children.len()
                );
                TransactionGroup::rollback(&mut children, context)?;
                Err(e)
            }
        }
    }

    /// Undoes the most recent entry.
    pub fn undo(&mut self, context: &mut C) -> Result<(), TransactionError> {
        let mut entry = self.undo_stack.pop().ok_or(TransactionError::NothingToUndo)?;
        entry.undo(context)?;
        log::debug!("Undid '{}'", entry.name());
        self.redo_stack.push(entry);
        Ok(())
    }

    /// Re-applies the most recently undone entry.
    pub fn redo(&mut self, context: &mut C) -> Result<(), TransactionError> {
        let mut entry = self.redo_stack.pop().ok_or(TransactionError::NothingToRedo)?;
        entry.redo(context)?;
        log::debug!("Redid '{}'", entry.name());
        self.undo_stack.push(entry);
        Ok(())
    }

    /// Returns `true` if there is an entry to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there is an entry to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns the names of the undo entries, oldest first.
    pub fn history(&self) -> Vec<&str> {
        self.undo_stack.iter().map(|e| e.name()).collect()
    }

    /// Drops the whole history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn record(&mut self, entry: Box<dyn Reversible<C>>) {
        if let Some(group) = self.recording.last_mut() {
            group.push(entry);
            return;
        }
        self.redo_stack.clear();
        self.undo_stack.push(entry);
        if let Some(limit) = self.limit {
            if self.undo_stack.len() > limit {
                let excess = self.undo_stack.len() - limit;
                self.undo_stack.drain(..excess);
            }
        }
    }
}
