//! # Graph Document
//!
//! The canonical in-memory store of a statelab document.
//!
//! All entities live in identifier-keyed `BTreeMap`s; relations between
//! them (parent, children, transition endpoints) are identifiers, never
//! references. Writes are crate-private and funnel through the hierarchy
//! manager and transition router.
//!
//! ## Journal
//!
//! While a journal is open, the first write to any key records that key's
//! before-image. Closing the journal produces a [`Patch`] holding the
//! before- and after-images of exactly the touched keys. The command log
//! stores patches; undo and redo restore them.

use crate::primitives::{ID_PADDING, NOTE_ID_PREFIX, STATE_ID_PREFIX, TRANSITION_ID_PREFIX};
use crate::router::TransitionRouter;
use crate::{Component, Elements, Note, NoteId, State, StateId, Transition, TransitionId};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Images of a set of keys. `None` means "absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub(crate) states: BTreeMap<StateId, Option<State>>,
    pub(crate) transitions: BTreeMap<TransitionId, Option<Transition>>,
    pub(crate) notes: BTreeMap<NoteId, Option<Note>>,
    pub(crate) components: BTreeMap<String, Option<Component>>,
    pub(crate) initial_state: Option<Option<StateId>>,
}

impl Snapshot {
    /// Whether the snapshot covers no key at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.transitions.is_empty()
            && self.notes.is_empty()
            && self.components.is_empty()
            && self.initial_state.is_none()
    }

    /// States covered by this snapshot.
    pub fn state_ids(&self) -> impl Iterator<Item = &StateId> {
        self.states.keys()
    }

    /// Transitions covered by this snapshot.
    pub fn transition_ids(&self) -> impl Iterator<Item = &TransitionId> {
        self.transitions.keys()
    }

    /// Number of entity images held (initial state counts as one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
            + self.transitions.len()
            + self.notes.len()
            + self.components.len()
            + usize::from(self.initial_state.is_some())
    }
}

/// Before- and after-images of one journaled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Images to restore to undo the operation.
    pub undo: Snapshot,
    /// Images to restore to redo the operation.
    pub redo: Snapshot,
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// The graph document: elements, derived transition ownership, identifier
/// counters and the dirty flag.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Elements,
    /// Derived: owning container of each transition (`None` = root).
    owners: BTreeMap<TransitionId, Option<StateId>>,
    next_state: u64,
    next_transition: u64,
    next_note: u64,
    dirty: bool,
    journal: Option<Snapshot>,
    /// Dirty flag when the open journal began.
    journal_dirty: bool,
}

impl Document {
    /// Create an empty document bound to a platform.
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self::from_elements(Elements::new(platform))
    }

    /// Wrap already-validated elements and derive transition ownership.
    #[must_use]
    pub fn from_elements(elements: Elements) -> Self {
        let mut doc = Self {
            elements,
            owners: BTreeMap::new(),
            next_state: 1,
            next_transition: 1,
            next_note: 1,
            dirty: false,
            journal: None,
            journal_dirty: false,
        };
        TransitionRouter::relink_all(&mut doc);
        doc
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// All persisted elements.
    #[must_use]
    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    /// Selected platform identifier.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.elements.platform
    }

    /// States in identifier order.
    pub fn states(&self) -> impl Iterator<Item = (&StateId, &State)> {
        self.elements.states.iter()
    }

    #[must_use]
    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.elements.states.get(id)
    }

    #[must_use]
    pub fn contains_state(&self, id: &StateId) -> bool {
        self.elements.states.contains_key(id)
    }

    /// Transitions in identifier order.
    pub fn transitions(&self) -> impl Iterator<Item = (&TransitionId, &Transition)> {
        self.elements.transitions.iter()
    }

    #[must_use]
    pub fn transition(&self, id: &TransitionId) -> Option<&Transition> {
        self.elements.transitions.get(id)
    }

    /// Notes in identifier order.
    pub fn notes(&self) -> impl Iterator<Item = (&NoteId, &Note)> {
        self.elements.notes.iter()
    }

    #[must_use]
    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.elements.notes.get(id)
    }

    /// Components in name order.
    pub fn components(&self) -> impl Iterator<Item = (&String, &Component)> {
        self.elements.components.iter()
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.elements.components.get(name)
    }

    #[must_use]
    pub fn initial_state(&self) -> Option<&StateId> {
        self.elements.initial_state.as_ref()
    }

    /// Owning container of a transition: `Some(None)` is the document
    /// root, `None` means the transition does not exist.
    #[must_use]
    pub fn ownership(&self, id: &TransitionId) -> Option<Option<&StateId>> {
        self.owners.get(id).map(Option::as_ref)
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.elements.states.len()
    }

    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.elements.transitions.len()
    }

    /// Whether the document changed since the last `mark_clean`.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // -------------------------------------------------------------------------
    // Identifier allocation
    // -------------------------------------------------------------------------

    pub(crate) fn allocate_state_id(&mut self) -> StateId {
        let states = &self.elements.states;
        let raw = allocate(&mut self.next_state, STATE_ID_PREFIX, |candidate| {
            states.contains_key(candidate)
        });
        StateId(raw)
    }

    pub(crate) fn allocate_transition_id(&mut self) -> TransitionId {
        let transitions = &self.elements.transitions;
        let raw = allocate(&mut self.next_transition, TRANSITION_ID_PREFIX, |candidate| {
            transitions.contains_key(candidate)
        });
        TransitionId(raw)
    }

    pub(crate) fn allocate_note_id(&mut self) -> NoteId {
        let notes = &self.elements.notes;
        let raw = allocate(&mut self.next_note, NOTE_ID_PREFIX, |candidate| {
            notes.contains_key(candidate)
        });
        NoteId(raw)
    }

    // -------------------------------------------------------------------------
    // Journaled writes
    // -------------------------------------------------------------------------

    fn record_state(&mut self, id: &StateId) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.states.contains_key(id) {
                journal
                    .states
                    .insert(id.clone(), self.elements.states.get(id).cloned());
            }
        }
        self.dirty = true;
    }

    fn record_transition(&mut self, id: &TransitionId) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.transitions.contains_key(id) {
                journal
                    .transitions
                    .insert(id.clone(), self.elements.transitions.get(id).cloned());
            }
        }
        self.dirty = true;
    }

    fn record_note(&mut self, id: &NoteId) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.notes.contains_key(id) {
                journal
                    .notes
                    .insert(id.clone(), self.elements.notes.get(id).cloned());
            }
        }
        self.dirty = true;
    }

    fn record_component(&mut self, name: &str) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.components.contains_key(name) {
                journal
                    .components
                    .insert(name.to_string(), self.elements.components.get(name).cloned());
            }
        }
        self.dirty = true;
    }

    pub(crate) fn state_mut(&mut self, id: &StateId) -> Option<&mut State> {
        if !self.elements.states.contains_key(id) {
            return None;
        }
        self.record_state(id);
        self.elements.states.get_mut(id)
    }

    pub(crate) fn insert_state(&mut self, id: StateId, state: State) {
        self.record_state(&id);
        self.elements.states.insert(id, state);
    }

    pub(crate) fn remove_state(&mut self, id: &StateId) -> Option<State> {
        if !self.elements.states.contains_key(id) {
            return None;
        }
        self.record_state(id);
        self.elements.states.remove(id)
    }

    pub(crate) fn transition_mut(&mut self, id: &TransitionId) -> Option<&mut Transition> {
        if !self.elements.transitions.contains_key(id) {
            return None;
        }
        self.record_transition(id);
        self.elements.transitions.get_mut(id)
    }

    pub(crate) fn insert_transition(&mut self, id: TransitionId, transition: Transition) {
        self.record_transition(&id);
        self.elements.transitions.insert(id, transition);
    }

    pub(crate) fn remove_transition(&mut self, id: &TransitionId) -> Option<Transition> {
        if !self.elements.transitions.contains_key(id) {
            return None;
        }
        self.record_transition(id);
        self.owners.remove(id);
        self.elements.transitions.remove(id)
    }

    pub(crate) fn note_mut(&mut self, id: &NoteId) -> Option<&mut Note> {
        if !self.elements.notes.contains_key(id) {
            return None;
        }
        self.record_note(id);
        self.elements.notes.get_mut(id)
    }

    pub(crate) fn insert_note(&mut self, id: NoteId, note: Note) {
        self.record_note(&id);
        self.elements.notes.insert(id, note);
    }

    pub(crate) fn remove_note(&mut self, id: &NoteId) -> Option<Note> {
        if !self.elements.notes.contains_key(id) {
            return None;
        }
        self.record_note(id);
        self.elements.notes.remove(id)
    }

    pub(crate) fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        if !self.elements.components.contains_key(name) {
            return None;
        }
        self.record_component(name);
        self.elements.components.get_mut(name)
    }

    pub(crate) fn insert_component(&mut self, name: String, component: Component) {
        self.record_component(&name);
        self.elements.components.insert(name, component);
    }

    pub(crate) fn remove_component(&mut self, name: &str) -> Option<Component> {
        if !self.elements.components.contains_key(name) {
            return None;
        }
        self.record_component(name);
        self.elements.components.remove(name)
    }

    pub(crate) fn set_initial_state(&mut self, id: Option<StateId>) {
        if let Some(journal) = self.journal.as_mut() {
            if journal.initial_state.is_none() {
                journal.initial_state = Some(self.elements.initial_state.clone());
            }
        }
        self.dirty = true;
        self.elements.initial_state = id;
    }

    /// Ownership is derived data: never journaled.
    pub(crate) fn set_owner(&mut self, id: TransitionId, owner: Option<StateId>) {
        self.owners.insert(id, owner);
    }

    // -------------------------------------------------------------------------
    // Journal lifecycle
    // -------------------------------------------------------------------------

    /// Start recording before-images. Nested journals are not supported;
    /// an open journal is kept.
    pub(crate) fn begin_journal(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Snapshot::default());
            self.journal_dirty = self.dirty;
        }
    }

    /// Stop recording and build the patch of keys that actually changed.
    /// Returns `None` when nothing changed.
    pub(crate) fn end_journal(&mut self) -> Option<Patch> {
        let before = self.journal.take()?;
        let mut undo = Snapshot::default();
        let mut redo = Snapshot::default();

        for (id, old) in before.states {
            let new = self.elements.states.get(&id).cloned();
            if old != new {
                undo.states.insert(id.clone(), old);
                redo.states.insert(id, new);
            }
        }
        for (id, old) in before.transitions {
            let new = self.elements.transitions.get(&id).cloned();
            if old != new {
                undo.transitions.insert(id.clone(), old);
                redo.transitions.insert(id, new);
            }
        }
        for (id, old) in before.notes {
            let new = self.elements.notes.get(&id).cloned();
            if old != new {
                undo.notes.insert(id.clone(), old);
                redo.notes.insert(id, new);
            }
        }
        for (name, old) in before.components {
            let new = self.elements.components.get(&name).cloned();
            if old != new {
                undo.components.insert(name.clone(), old);
                redo.components.insert(name, new);
            }
        }
        if let Some(old) = before.initial_state {
            if old != self.elements.initial_state {
                undo.initial_state = Some(old);
                redo.initial_state = Some(self.elements.initial_state.clone());
            }
        }

        if undo.is_empty() {
            self.dirty = self.journal_dirty;
            None
        } else {
            Some(Patch { undo, redo })
        }
    }

    /// Undo a just-closed journal after a failed command, including the
    /// dirty flag.
    pub(crate) fn rollback(&mut self, patch: &Patch) {
        self.restore(&patch.undo);
        self.dirty = self.journal_dirty;
    }

    /// Write every image of a snapshot back into the store, then re-derive
    /// ownership for every transition the snapshot can affect.
    pub(crate) fn restore(&mut self, snapshot: &Snapshot) {
        for (id, image) in &snapshot.states {
            match image {
                Some(state) => {
                    self.elements.states.insert(id.clone(), state.clone());
                }
                None => {
                    self.elements.states.remove(id);
                }
            }
        }
        for (id, image) in &snapshot.transitions {
            match image {
                Some(transition) => {
                    self.elements.transitions.insert(id.clone(), transition.clone());
                }
                None => {
                    self.elements.transitions.remove(id);
                    self.owners.remove(id);
                }
            }
        }
        for (id, image) in &snapshot.notes {
            match image {
                Some(note) => {
                    self.elements.notes.insert(id.clone(), note.clone());
                }
                None => {
                    self.elements.notes.remove(id);
                }
            }
        }
        for (name, image) in &snapshot.components {
            match image {
                Some(component) => {
                    self.elements.components.insert(name.clone(), component.clone());
                }
                None => {
                    self.elements.components.remove(name);
                }
            }
        }
        if let Some(initial) = &snapshot.initial_state {
            self.elements.initial_state = initial.clone();
        }
        self.dirty = true;

        let mut affected: BTreeSet<TransitionId> = snapshot
            .transitions
            .iter()
            .filter(|(_, image)| image.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        let moved: Vec<StateId> = snapshot.states.keys().cloned().collect();
        affected.extend(TransitionRouter::transitions_touching_subtrees(self, &moved));
        for id in affected {
            TransitionRouter::relink_internal(self, &id);
        }
    }
}

/// Next free `<prefix>-<padded counter>` identifier.
fn allocate(counter: &mut u64, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = format!("{prefix}-{:0width$}", *counter, width = ID_PADDING);
        *counter = counter.saturating_add(1);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
