//! # Interchange Form
//!
//! A flattened JSON representation for exchange with other tools:
//!
//! - states are a flat list with explicit `parent` references and both
//!   relative and absolute bounds;
//! - transitions carry trigger, guard tree, ordered actions, color, label
//!   position and the computed owner;
//! - transient selection flags are never emitted.
//!
//! The same records make up per-entity snapshots and clipboard fragments.

use crate::document::Document;
use crate::hierarchy::Hierarchy;
use crate::primitives::{INTERCHANGE_FORMAT, INTERCHANGE_VERSION, MAX_DOCUMENT_SIZE};
use crate::router::TransitionRouter;
use crate::{
    Action, Component, Condition, Elements, EventData, Note, NoteId, Point, Rect, State, StateId,
    StatelabError, Transition, TransitionId, TransitionLabel, Trigger,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A whole document in interchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeDocument {
    pub format: String,
    pub version: u32,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<StateId>,
    #[serde(default)]
    pub states: Vec<InterchangeState>,
    #[serde(default)]
    pub transitions: Vec<InterchangeTransition>,
    #[serde(default)]
    pub notes: Vec<InterchangeNote>,
    #[serde(default)]
    pub components: Vec<InterchangeComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeState {
    pub id: StateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<StateId>,
    /// Relative to the parent's child-area origin.
    pub bounds: Rect,
    pub absolute: Rect,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeTransition {
    pub id: TransitionId,
    pub source: StateId,
    pub target: StateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<StateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(rename = "do", default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Present exactly when the transition has a label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeNote {
    pub id: NoteId,
    pub text: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeComponent {
    pub name: String,
    #[serde(flatten)]
    pub component: Component,
}

/// A state subtree with the transitions internal to it.
///
/// `states` is in preorder: the root first, every parent before its
/// children. The root keeps its original `parent` so a paste can return
/// it there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFragment {
    pub format: String,
    pub version: u32,
    pub platform: String,
    pub root: StateId,
    pub states: Vec<InterchangeState>,
    #[serde(default)]
    pub transitions: Vec<InterchangeTransition>,
}

// =============================================================================
// EXPORT
// =============================================================================

fn state_record(doc: &Document, id: &StateId, state: &State) -> InterchangeState {
    InterchangeState {
        id: id.clone(),
        name: state.name.clone(),
        parent: state.parent.clone(),
        bounds: state.bounds,
        absolute: Hierarchy::absolute_bounds(doc, id).unwrap_or(state.bounds),
        events: state.events.clone(),
    }
}

fn transition_record(doc: &Document, id: &TransitionId, transition: &Transition) -> InterchangeTransition {
    let label = transition.label.clone().unwrap_or_default();
    InterchangeTransition {
        id: id.clone(),
        source: transition.source.clone(),
        target: transition.target.clone(),
        owner: TransitionRouter::owner(doc, id).ok().flatten(),
        trigger: label.trigger,
        condition: label.condition,
        actions: label.actions,
        color: label.color,
        label_position: transition.label.as_ref().map(|l| l.position),
    }
}

fn note_record(id: &NoteId, note: &Note) -> InterchangeNote {
    InterchangeNote {
        id: id.clone(),
        text: note.text.clone(),
        position: note.position,
    }
}

/// Flatten a document into interchange form.
#[must_use]
pub fn export(doc: &Document) -> InterchangeDocument {
    InterchangeDocument {
        format: INTERCHANGE_FORMAT.to_string(),
        version: INTERCHANGE_VERSION,
        platform: doc.platform().to_string(),
        initial_state: doc.initial_state().cloned(),
        states: doc
            .states()
            .map(|(id, state)| state_record(doc, id, state))
            .collect(),
        transitions: doc
            .transitions()
            .map(|(id, t)| transition_record(doc, id, t))
            .collect(),
        notes: doc.notes().map(|(id, n)| note_record(id, n)).collect(),
        components: doc
            .components()
            .map(|(name, c)| InterchangeComponent {
                name: name.clone(),
                component: c.clone(),
            })
            .collect(),
    }
}

/// Interchange form as pretty JSON.
pub fn to_json(doc: &Document) -> Result<String, StatelabError> {
    serde_json::to_string_pretty(&export(doc)).map_err(|e| StatelabError::Serialization(e.to_string()))
}

/// Snapshot of one state and its nested subtree.
pub fn state_snapshot(doc: &Document, id: &StateId) -> Result<StateFragment, StatelabError> {
    if !doc.contains_state(id) {
        return Err(StatelabError::unknown_state(id));
    }
    let members = Hierarchy::subtree(doc, id);
    let inside: BTreeSet<&StateId> = members.iter().collect();
    let states = members
        .iter()
        .filter_map(|member| doc.state(member).map(|s| state_record(doc, member, s)))
        .collect();
    let transitions = doc
        .transitions()
        .filter(|(_, t)| inside.contains(&t.source) && inside.contains(&t.target))
        .map(|(tid, t)| transition_record(doc, tid, t))
        .collect();
    Ok(StateFragment {
        format: INTERCHANGE_FORMAT.to_string(),
        version: INTERCHANGE_VERSION,
        platform: doc.platform().to_string(),
        root: id.clone(),
        states,
        transitions,
    })
}

pub fn transition_snapshot(
    doc: &Document,
    id: &TransitionId,
) -> Result<InterchangeTransition, StatelabError> {
    doc.transition(id)
        .map(|t| transition_record(doc, id, t))
        .ok_or_else(|| StatelabError::unknown_transition(id))
}

pub fn note_snapshot(doc: &Document, id: &NoteId) -> Result<InterchangeNote, StatelabError> {
    doc.note(id)
        .map(|n| note_record(id, n))
        .ok_or_else(|| StatelabError::unknown_note(id))
}

// =============================================================================
// IMPORT
// =============================================================================

fn check_header(format: &str, version: u32) -> Result<(), StatelabError> {
    if format != INTERCHANGE_FORMAT {
        return Err(StatelabError::Structural(format!(
            "Unknown interchange format '{format}'"
        )));
    }
    if version != INTERCHANGE_VERSION {
        return Err(StatelabError::Structural(format!(
            "Unsupported interchange version: {version} (expected {INTERCHANGE_VERSION})"
        )));
    }
    Ok(())
}

fn parse<T: serde::de::DeserializeOwned>(text: &str, limit: usize) -> Result<T, StatelabError> {
    if text.len() > limit {
        return Err(StatelabError::Structural(format!(
            "Input size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            limit
        )));
    }
    serde_json::from_str(text).map_err(|e| StatelabError::Deserialization(e.to_string()))
}

/// Parse an interchange document and check its header.
pub fn from_json(text: &str) -> Result<InterchangeDocument, StatelabError> {
    let document: InterchangeDocument = parse(text, MAX_DOCUMENT_SIZE)?;
    check_header(&document.format, document.version)?;
    Ok(document)
}

/// Parse a state fragment and check its header.
pub fn fragment_from_json(text: &str, limit: usize) -> Result<StateFragment, StatelabError> {
    let fragment: StateFragment = parse(text, limit)?;
    check_header(&fragment.format, fragment.version)?;
    if fragment.states.first().map(|s| &s.id) != Some(&fragment.root) {
        return Err(StatelabError::Structural(
            "Fragment does not start with its root state".to_string(),
        ));
    }
    Ok(fragment)
}

/// Rebuild a transition from its interchange record.
#[must_use]
pub fn transition_from_record(record: &InterchangeTransition) -> Transition {
    Transition {
        source: record.source.clone(),
        target: record.target.clone(),
        label: record.label_position.map(|position| TransitionLabel {
            trigger: record.trigger.clone(),
            condition: record.condition.clone(),
            actions: record.actions.clone(),
            color: record.color.clone(),
            position,
            selection: false,
        }),
    }
}

/// Rebuild plain elements: children sets are derived from the parent
/// references, then the result is structurally validated.
pub fn to_elements(document: &InterchangeDocument) -> Result<Elements, StatelabError> {
    check_header(&document.format, document.version)?;
    let mut elements = Elements::new(document.platform.clone());
    elements.initial_state = document.initial_state.clone();

    for record in &document.states {
        let mut state = State::new(record.name.clone(), record.bounds);
        state.parent = record.parent.clone();
        state.events = record.events.clone();
        if elements.states.insert(record.id.clone(), state).is_some() {
            return Err(StatelabError::DuplicateId(record.id.to_string()));
        }
    }
    for record in &document.states {
        let Some(parent) = &record.parent else {
            continue;
        };
        let parent_state = elements.states.get_mut(parent).ok_or_else(|| {
            StatelabError::Structural(format!("state {}: unknown parent {parent}", record.id))
        })?;
        parent_state.children.insert(record.id.clone());
    }
    for record in &document.transitions {
        let previous = elements
            .transitions
            .insert(record.id.clone(), transition_from_record(record));
        if previous.is_some() {
            return Err(StatelabError::DuplicateId(record.id.to_string()));
        }
    }
    for record in &document.notes {
        let note = Note {
            text: record.text.clone(),
            position: record.position,
        };
        if elements.notes.insert(record.id.clone(), note).is_some() {
            return Err(StatelabError::DuplicateId(record.id.to_string()));
        }
    }
    for record in &document.components {
        let previous = elements
            .components
            .insert(record.name.clone(), record.component.clone());
        if previous.is_some() {
            return Err(StatelabError::DuplicateComponent(record.name.clone()));
        }
    }

    super::plain::validate(&elements)?;
    Ok(elements)
}

// =============================================================================
// TESTS
// =============================================================================
