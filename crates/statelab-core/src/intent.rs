//! # Intents
//!
//! Every user-level request the editor understands, as data. Hosts build
//! intents from pointer gestures, forms or scripts and hand them to
//! [`Editor::dispatch`](crate::Editor::dispatch).
//!
//! Serialized as JSON objects tagged by `intent`, e.g.
//! `{"intent": "delete_state", "id": "state-000001"}`.

use crate::history::CommandKind;
use crate::hierarchy::NewState;
use crate::router::{NewTransition, TransitionEdit};
use crate::{Args, EventData, NoteId, Point, StateId, TransitionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    CreateState(NewState),
    LinkState {
        parent: StateId,
        child: StateId,
    },
    UnlinkState {
        id: StateId,
    },
    DeleteState {
        id: StateId,
    },
    ChangeStateName {
        id: StateId,
        name: String,
    },
    ChangeStatePosition {
        id: StateId,
        position: Point,
    },
    ChangeStateSize {
        id: StateId,
        width: f64,
        height: f64,
    },
    ChangeStateEvents {
        id: StateId,
        events: Vec<EventData>,
    },
    ChangeEvent {
        id: StateId,
        index: usize,
        event: EventData,
    },
    DeleteEvent {
        id: StateId,
        index: usize,
    },
    ChangeInitialState {
        #[serde(default)]
        id: Option<StateId>,
    },
    CreateTransition(NewTransition),
    ChangeTransition {
        id: TransitionId,
        #[serde(flatten)]
        edit: TransitionEdit,
    },
    ChangeTransitionPosition {
        id: TransitionId,
        position: Point,
    },
    DeleteTransition {
        id: TransitionId,
    },
    CreateNote {
        #[serde(default)]
        id: Option<NoteId>,
        text: String,
        position: Point,
    },
    ChangeNoteText {
        id: NoteId,
        text: String,
    },
    ChangeNotePosition {
        id: NoteId,
        position: Point,
    },
    DeleteNote {
        id: NoteId,
    },
    AddComponent {
        name: String,
        #[serde(rename = "type")]
        type_id: String,
        #[serde(default)]
        parameters: Args,
    },
    EditComponent {
        name: String,
        #[serde(default)]
        parameters: Args,
        #[serde(default)]
        new_name: Option<String>,
    },
    RemoveComponent {
        name: String,
        #[serde(default)]
        purge: bool,
    },
    PasteState {
        text: String,
        #[serde(default)]
        at: Option<Point>,
    },
    Undo,
    Redo,
}

impl Intent {
    /// History kind recorded for this intent. `None` for undo and redo,
    /// which replay history instead of adding to it.
    #[must_use]
    pub fn kind(&self) -> Option<CommandKind> {
        let kind = match self {
            Self::CreateState(_) => CommandKind::CreateState,
            Self::LinkState { .. } => CommandKind::LinkState,
            Self::UnlinkState { .. } => CommandKind::UnlinkState,
            Self::DeleteState { .. } => CommandKind::DeleteState,
            Self::ChangeStateName { .. } => CommandKind::ChangeStateName,
            Self::ChangeStatePosition { .. } => CommandKind::ChangeStatePosition,
            Self::ChangeStateSize { .. } => CommandKind::ChangeStateSize,
            Self::ChangeStateEvents { .. } => CommandKind::ChangeStateEvents,
            Self::ChangeEvent { .. } => CommandKind::ChangeEvent,
            Self::DeleteEvent { .. } => CommandKind::DeleteEvent,
            Self::ChangeInitialState { .. } => CommandKind::ChangeInitialState,
            Self::CreateTransition(_) => CommandKind::CreateTransition,
            Self::ChangeTransition { .. } => CommandKind::ChangeTransition,
            Self::ChangeTransitionPosition { .. } => CommandKind::ChangeTransitionPosition,
            Self::DeleteTransition { .. } => CommandKind::DeleteTransition,
            Self::CreateNote { .. } => CommandKind::CreateNote,
            Self::ChangeNoteText { .. } => CommandKind::ChangeNoteText,
            Self::ChangeNotePosition { .. } => CommandKind::ChangeNotePosition,
            Self::DeleteNote { .. } => CommandKind::DeleteNote,
            Self::AddComponent { .. } => CommandKind::AddComponent,
            Self::EditComponent { .. } => CommandKind::EditComponent,
            Self::RemoveComponent { .. } => CommandKind::RemoveComponent,
            Self::PasteState { .. } => CommandKind::PasteState,
            Self::Undo | Self::Redo => return None,
        };
        Some(kind)
    }
}
