//! # Editor
//!
//! The single owner of an open document. Every mutation arrives as an
//! [`Intent`], runs inside a journaled transaction and lands in the
//! command log as exactly one entry. Failed commands are rolled back and
//! leave neither document changes nor history behind.
//!
//! Hosts observe the document through typed [`Change`] notifications,
//! drained after each batch of intents.

use crate::clipboard;
use crate::components::ComponentEditor;
use crate::document::{Document, Snapshot};
use crate::events::EventEditor;
use crate::formats::{interchange, persistence, plain};
use crate::hierarchy::Hierarchy;
use crate::history::{CommandKind, History};
use crate::intent::Intent;
use crate::notes::NoteEditor;
use crate::platform::{self, PlatformBinding, PlatformRegistry};
use crate::router::TransitionRouter;
use crate::{Elements, NoteId, StateId, StatelabError, TransitionId};

/// What changed in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    StateCreated(StateId),
    StateChanged(StateId),
    StateDeleted(StateId),
    TransitionCreated(TransitionId),
    TransitionChanged(TransitionId),
    TransitionDeleted(TransitionId),
    NoteCreated(NoteId),
    NoteChanged(NoteId),
    NoteDeleted(NoteId),
    ComponentCreated(String),
    ComponentChanged(String),
    ComponentDeleted(String),
    InitialStateChanged(Option<StateId>),
    /// The whole document was replaced (load, import, new).
    DocumentReplaced,
}

impl Change {
    /// Changes that moving the document from `before` to `after` images
    /// represents. Both snapshots cover the same keys.
    #[must_use]
    pub fn between(before: &Snapshot, after: &Snapshot) -> Vec<Self> {
        let mut changes = Vec::new();
        for (id, image) in &after.states {
            let existed = before.states.get(id).is_some_and(Option::is_some);
            changes.push(match (existed, image.is_some()) {
                (false, _) => Self::StateCreated(id.clone()),
                (true, true) => Self::StateChanged(id.clone()),
                (true, false) => Self::StateDeleted(id.clone()),
            });
        }
        for (id, image) in &after.transitions {
            let existed = before.transitions.get(id).is_some_and(Option::is_some);
            changes.push(match (existed, image.is_some()) {
                (false, _) => Self::TransitionCreated(id.clone()),
                (true, true) => Self::TransitionChanged(id.clone()),
                (true, false) => Self::TransitionDeleted(id.clone()),
            });
        }
        for (id, image) in &after.notes {
            let existed = before.notes.get(id).is_some_and(Option::is_some);
            changes.push(match (existed, image.is_some()) {
                (false, _) => Self::NoteCreated(id.clone()),
                (true, true) => Self::NoteChanged(id.clone()),
                (true, false) => Self::NoteDeleted(id.clone()),
            });
        }
        for (name, image) in &after.components {
            let existed = before.components.get(name).is_some_and(Option::is_some);
            changes.push(match (existed, image.is_some()) {
                (false, _) => Self::ComponentCreated(name.clone()),
                (true, true) => Self::ComponentChanged(name.clone()),
                (true, false) => Self::ComponentDeleted(name.clone()),
            });
        }
        if let Some(initial) = &after.initial_state {
            changes.push(Self::InitialStateChanged(initial.clone()));
        }
        changes
    }
}

/// Result of a dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    StateCreated(StateId),
    TransitionCreated(TransitionId),
    NoteCreated(NoteId),
    /// Undo or redo replayed this command; `None` when the stack was empty.
    Replayed(Option<CommandKind>),
}

impl Outcome {
    /// The state this outcome created, if any.
    #[must_use]
    pub fn created_state(&self) -> Option<&StateId> {
        match self {
            Self::StateCreated(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn created_transition(&self) -> Option<&TransitionId> {
        match self {
            Self::TransitionCreated(id) => Some(id),
            _ => None,
        }
    }
}

/// Owner of one open document, its history and its platform registry.
#[derive(Debug)]
pub struct Editor {
    document: Document,
    history: History,
    platforms: PlatformRegistry,
    changes: Vec<Change>,
}

impl Editor {
    /// An empty document on `platform`, which must be registered.
    pub fn new(platforms: PlatformRegistry, platform: &str) -> Result<Self, StatelabError> {
        platforms.resolve(platform)?;
        Ok(Self {
            document: Document::new(platform),
            history: History::new(),
            platforms,
            changes: Vec::new(),
        })
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// The binding of the open document's platform.
    pub fn platform(&self) -> Result<&dyn PlatformBinding, StatelabError> {
        self.platforms.resolve(self.document.platform())
    }

    // =========================================================================
    // LOAD / SAVE
    // =========================================================================

    /// Replace the document with one parsed from the plain form. On error
    /// the open document is untouched.
    pub fn load(&mut self, text: &str) -> Result<(), StatelabError> {
        let elements = plain::from_json(text)?;
        self.replace(elements)
    }

    /// Replace the document with one imported from the interchange form.
    pub fn import_interchange(&mut self, text: &str) -> Result<(), StatelabError> {
        let document = interchange::from_json(text)?;
        let elements = interchange::to_elements(&document)?;
        self.replace(elements)
    }

    /// Replace the document with one decoded from a binary snapshot.
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> Result<(), StatelabError> {
        let elements = persistence::elements_from_bytes(bytes)?;
        self.replace(elements)
    }

    fn replace(&mut self, elements: Elements) -> Result<(), StatelabError> {
        if let Err(err) = self.platforms.resolve(&elements.platform) {
            tracing::warn!(platform = %elements.platform, "document platform not available");
            return Err(err);
        }
        self.document = Document::from_elements(elements);
        self.history.clear();
        self.changes.clear();
        self.changes.push(Change::DocumentReplaced);
        tracing::info!(
            states = self.document.state_count(),
            transitions = self.document.transition_count(),
            "document loaded"
        );
        Ok(())
    }

    /// Plain form of the document. Clears the dirty flag.
    pub fn save(&mut self) -> Result<String, StatelabError> {
        let text = plain::to_json(self.document.elements())?;
        self.document.mark_clean();
        Ok(text)
    }

    pub fn export_interchange(&self) -> Result<String, StatelabError> {
        interchange::to_json(&self.document)
    }

    /// Binary snapshot for autosave. Does not touch the dirty flag.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, StatelabError> {
        persistence::elements_to_bytes(self.document.elements())
    }

    pub fn copy_state(&self, id: &StateId) -> Result<String, StatelabError> {
        clipboard::copy_state(&self.document, id)
    }

    // =========================================================================
    // PLATFORM QUERIES
    // =========================================================================

    pub fn vacant_components(&self) -> Result<Vec<String>, StatelabError> {
        Ok(platform::vacant_components(self.platform()?, &self.document))
    }

    pub fn check_references(&self) -> Result<Vec<String>, StatelabError> {
        Ok(platform::check_references(self.platform()?, &self.document))
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Apply one intent.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, StatelabError> {
        let Some(kind) = intent.kind() else {
            return Ok(match intent {
                Intent::Redo => Outcome::Replayed(self.redo()),
                _ => Outcome::Replayed(self.undo()),
            });
        };

        self.transact(kind, |doc, platforms| match intent {
            Intent::CreateState(params) => {
                Hierarchy::create_state(doc, params).map(Outcome::StateCreated)
            }
            Intent::LinkState { parent, child } => {
                Hierarchy::link_state(doc, &parent, &child).map(|()| Outcome::Done)
            }
            Intent::UnlinkState { id } => Hierarchy::unlink_state(doc, &id).map(|()| Outcome::Done),
            Intent::DeleteState { id } => Hierarchy::delete_state(doc, &id).map(|_| Outcome::Done),
            Intent::ChangeStateName { id, name } => {
                EventEditor::change_state_name(doc, &id, name).map(|()| Outcome::Done)
            }
            Intent::ChangeStatePosition { id, position } => {
                Hierarchy::change_state_position(doc, &id, position).map(|()| Outcome::Done)
            }
            Intent::ChangeStateSize { id, width, height } => {
                Hierarchy::change_state_size(doc, &id, width, height).map(|()| Outcome::Done)
            }
            Intent::ChangeStateEvents { id, events } => {
                EventEditor::change_state_events(doc, &id, events).map(|()| Outcome::Done)
            }
            Intent::ChangeEvent { id, index, event } => {
                EventEditor::change_event(doc, &id, index, event).map(|()| Outcome::Done)
            }
            Intent::DeleteEvent { id, index } => {
                EventEditor::delete_event(doc, &id, index).map(|_| Outcome::Done)
            }
            Intent::ChangeInitialState { id } => {
                Hierarchy::change_initial_state(doc, id.as_ref()).map(|()| Outcome::Done)
            }
            Intent::CreateTransition(params) => {
                TransitionRouter::create_transition(doc, params).map(Outcome::TransitionCreated)
            }
            Intent::ChangeTransition { id, edit } => {
                TransitionRouter::change_transition(doc, &id, edit).map(|()| Outcome::Done)
            }
            Intent::ChangeTransitionPosition { id, position } => {
                TransitionRouter::change_transition_position(doc, &id, position)
                    .map(|()| Outcome::Done)
            }
            Intent::DeleteTransition { id } => {
                TransitionRouter::delete_transition(doc, &id).map(|_| Outcome::Done)
            }
            Intent::CreateNote { id, text, position } => {
                NoteEditor::create_note(doc, id, text, position).map(Outcome::NoteCreated)
            }
            Intent::ChangeNoteText { id, text } => {
                NoteEditor::change_note_text(doc, &id, text).map(|()| Outcome::Done)
            }
            Intent::ChangeNotePosition { id, position } => {
                NoteEditor::change_note_position(doc, &id, position).map(|()| Outcome::Done)
            }
            Intent::DeleteNote { id } => NoteEditor::delete_note(doc, &id).map(|_| Outcome::Done),
            Intent::AddComponent {
                name,
                type_id,
                parameters,
            } => {
                let platform = platforms.resolve(doc.platform())?;
                ComponentEditor::add_component(doc, platform, &name, &type_id, parameters)
                    .map(|()| Outcome::Done)
            }
            Intent::EditComponent {
                name,
                parameters,
                new_name,
            } => ComponentEditor::edit_component(doc, &name, parameters, new_name.as_deref())
                .map(|()| Outcome::Done),
            Intent::RemoveComponent { name, purge } => {
                ComponentEditor::remove_component(doc, &name, purge).map(|_| Outcome::Done)
            }
            Intent::PasteState { text, at } => {
                clipboard::paste_state(doc, &text, at).map(Outcome::StateCreated)
            }
            Intent::Undo | Intent::Redo => Ok(Outcome::Done),
        })
    }

    /// Apply intents in order, stopping at the first failure. Earlier
    /// intents stay applied.
    pub fn dispatch_all(
        &mut self,
        intents: impl IntoIterator<Item = Intent>,
    ) -> Result<Vec<Outcome>, StatelabError> {
        intents.into_iter().map(|intent| self.dispatch(intent)).collect()
    }

    /// Revert the most recent command.
    pub fn undo(&mut self) -> Option<CommandKind> {
        let entry = self.history.undo(&mut self.document)?;
        self.changes.extend(Change::between(&entry.redo, &entry.undo));
        Some(entry.kind)
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Option<CommandKind> {
        let entry = self.history.redo(&mut self.document)?;
        self.changes.extend(Change::between(&entry.undo, &entry.redo));
        Some(entry.kind)
    }

    /// Take the notifications queued since the last drain.
    pub fn drain_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    fn transact<T>(
        &mut self,
        kind: CommandKind,
        command: impl FnOnce(&mut Document, &PlatformRegistry) -> Result<T, StatelabError>,
    ) -> Result<T, StatelabError> {
        let Self {
            document,
            history,
            platforms,
            changes,
        } = self;

        document.begin_journal();
        let result = command(document, platforms);
        let patch = document.end_journal();

        match result {
            Ok(value) => {
                if let Some(patch) = patch {
                    changes.extend(Change::between(&patch.undo, &patch.redo));
                    tracing::debug!(command = %kind, keys = patch.redo.len(), "command applied");
                    history.push(kind, patch);
                }
                Ok(value)
            }
            Err(err) => {
                if let Some(patch) = patch {
                    document.rollback(&patch);
                }
                tracing::warn!(command = %kind, error = %err, "command rejected");
                Err(err)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
