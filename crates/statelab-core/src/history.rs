//! # Command Log
//!
//! Two-stack undo/redo over journaled patches.
//!
//! Each entry stores the before- and after-images of exactly the keys its
//! command touched. Replaying an entry restores images; it never re-runs
//! command logic, so undo and redo never push new entries.

use crate::document::{Document, Patch, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which user-level command produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    CreateState,
    LinkState,
    UnlinkState,
    DeleteState,
    ChangeStateName,
    ChangeStatePosition,
    ChangeStateSize,
    ChangeStateEvents,
    ChangeEvent,
    DeleteEvent,
    ChangeInitialState,
    CreateTransition,
    ChangeTransition,
    ChangeTransitionPosition,
    DeleteTransition,
    CreateNote,
    ChangeNoteText,
    ChangeNotePosition,
    DeleteNote,
    AddComponent,
    EditComponent,
    RemoveComponent,
    PasteState,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateState => "create state",
            Self::LinkState => "link state",
            Self::UnlinkState => "unlink state",
            Self::DeleteState => "delete state",
            Self::ChangeStateName => "rename state",
            Self::ChangeStatePosition => "move state",
            Self::ChangeStateSize => "resize state",
            Self::ChangeStateEvents => "change state events",
            Self::ChangeEvent => "change event",
            Self::DeleteEvent => "delete event",
            Self::ChangeInitialState => "change initial state",
            Self::CreateTransition => "create transition",
            Self::ChangeTransition => "change transition",
            Self::ChangeTransitionPosition => "move transition label",
            Self::DeleteTransition => "delete transition",
            Self::CreateNote => "create note",
            Self::ChangeNoteText => "change note text",
            Self::ChangeNotePosition => "move note",
            Self::DeleteNote => "delete note",
            Self::AddComponent => "add component",
            Self::EditComponent => "edit component",
            Self::RemoveComponent => "remove component",
            Self::PasteState => "paste state",
        };
        f.write_str(name)
    }
}

/// One undoable command.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: CommandKind,
    /// Images written back by redo.
    pub redo: Snapshot,
    /// Images written back by undo.
    pub undo: Snapshot,
}

/// The undo and redo stacks.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly applied command. Clears the redo stack.
    pub fn push(&mut self, kind: CommandKind, patch: Patch) {
        self.redo.clear();
        self.undo.push(Entry {
            kind,
            redo: patch.redo,
            undo: patch.undo,
        });
    }

    /// Revert the most recent command. Returns the replayed entry, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Option<&Entry> {
        let entry = self.undo.pop()?;
        doc.restore(&entry.undo);
        tracing::debug!(command = %entry.kind, "undo");
        self.redo.push(entry);
        self.redo.last()
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, doc: &mut Document) -> Option<&Entry> {
        let entry = self.redo.pop()?;
        doc.restore(&entry.redo);
        tracing::debug!(command = %entry.kind, "redo");
        self.undo.push(entry);
        self.undo.last()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Kinds on the undo stack, oldest first.
    pub fn undo_kinds(&self) -> impl Iterator<Item = CommandKind> + '_ {
        self.undo.iter().map(|entry| entry.kind)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
