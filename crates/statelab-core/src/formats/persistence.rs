//! # Binary Snapshot Format
//!
//! Compact binary form of a document's elements, used for autosave.
//! File I/O lives in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized elements.
//! - 4 bytes: Magic ("STLB")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, and the
//! decoded elements go through the same structural validation as a
//! plain-form load.

use crate::{
    Action, Component, Condition, Elements, Note, NoteId, Operator, Point, State, StateId,
    StatelabError, Transition, TransitionId, TransitionLabel, Trigger, Variable, primitives,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum valid snapshot size (header only).
const MIN_SNAPSHOT_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The snapshot header precedes all element data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), StatelabError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(StatelabError::Deserialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(StatelabError::Deserialization(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StatelabError> {
        let Some(header) = bytes.get(..MIN_SNAPSHOT_SIZE) else {
            return Err(StatelabError::Deserialization("Header too short".to_string()));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZABLE MIRROR
// =============================================================================

// postcard is not self-describing, so the adjacently tagged condition tree
// is stored as a plain externally tagged enum.

#[derive(Serialize, Deserialize)]
enum SerializableCondition {
    Value(String),
    Component(Variable),
    Operator(Operator, Vec<SerializableCondition>),
}

impl From<&Condition> for SerializableCondition {
    fn from(condition: &Condition) -> Self {
        let node = |op, operands: &Vec<Condition>| {
            Self::Operator(op, operands.iter().map(Self::from).collect())
        };
        match condition {
            Condition::Value(v) => Self::Value(v.clone()),
            Condition::Component(var) => Self::Component(var.clone()),
            Condition::Equals(c) => node(Operator::Equals, c),
            Condition::NotEquals(c) => node(Operator::NotEquals, c),
            Condition::Greater(c) => node(Operator::Greater, c),
            Condition::Less(c) => node(Operator::Less, c),
            Condition::GreaterOrEqual(c) => node(Operator::GreaterOrEqual, c),
            Condition::LessOrEqual(c) => node(Operator::LessOrEqual, c),
            Condition::And(c) => node(Operator::And, c),
            Condition::Or(c) => node(Operator::Or, c),
        }
    }
}

impl From<SerializableCondition> for Condition {
    fn from(condition: SerializableCondition) -> Self {
        match condition {
            SerializableCondition::Value(v) => Self::Value(v),
            SerializableCondition::Component(var) => Self::Component(var),
            SerializableCondition::Operator(op, operands) => {
                Self::operator(op, operands.into_iter().map(Self::from).collect())
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableLabel {
    trigger: Option<Trigger>,
    condition: Option<SerializableCondition>,
    actions: Vec<Action>,
    color: Option<String>,
    position: Point,
    selection: bool,
}

#[derive(Serialize, Deserialize)]
struct SerializableTransition {
    source: StateId,
    target: StateId,
    label: Option<SerializableLabel>,
}

/// Postcard-friendly mirror of [`Elements`].
#[derive(Serialize, Deserialize)]
pub struct SerializableElements {
    platform: String,
    initial_state: Option<StateId>,
    states: BTreeMap<StateId, State>,
    transitions: BTreeMap<TransitionId, SerializableTransition>,
    notes: BTreeMap<NoteId, Note>,
    components: BTreeMap<String, Component>,
}

impl From<&Elements> for SerializableElements {
    fn from(elements: &Elements) -> Self {
        let transitions = elements
            .transitions
            .iter()
            .map(|(id, t)| {
                let label = t.label.as_ref().map(|l| SerializableLabel {
                    trigger: l.trigger.clone(),
                    condition: l.condition.as_ref().map(SerializableCondition::from),
                    actions: l.actions.clone(),
                    color: l.color.clone(),
                    position: l.position,
                    selection: l.selection,
                });
                let mirror = SerializableTransition {
                    source: t.source.clone(),
                    target: t.target.clone(),
                    label,
                };
                (id.clone(), mirror)
            })
            .collect();
        Self {
            platform: elements.platform.clone(),
            initial_state: elements.initial_state.clone(),
            states: elements.states.clone(),
            transitions,
            notes: elements.notes.clone(),
            components: elements.components.clone(),
        }
    }
}

impl From<SerializableElements> for Elements {
    fn from(mirror: SerializableElements) -> Self {
        let transitions = mirror
            .transitions
            .into_iter()
            .map(|(id, t)| {
                let label = t.label.map(|l| TransitionLabel {
                    trigger: l.trigger,
                    condition: l.condition.map(Condition::from),
                    actions: l.actions,
                    color: l.color,
                    position: l.position,
                    selection: l.selection,
                });
                let transition = Transition {
                    source: t.source,
                    target: t.target,
                    label,
                };
                (id, transition)
            })
            .collect();
        Self {
            platform: mirror.platform,
            initial_state: mirror.initial_state,
            states: mirror.states,
            transitions,
            notes: mirror.notes,
            components: mirror.components,
        }
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize elements to bytes (header + payload).
pub fn elements_to_bytes(elements: &Elements) -> Result<Vec<u8>, StatelabError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(&SerializableElements::from(elements))
        .map_err(|e| StatelabError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_SNAPSHOT_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize and validate elements from bytes.
pub fn elements_from_bytes(bytes: &[u8]) -> Result<Elements, StatelabError> {
    if bytes.len() < MIN_SNAPSHOT_SIZE {
        return Err(StatelabError::Deserialization(format!(
            "Data too short: minimum {MIN_SNAPSHOT_SIZE} bytes required"
        )));
    }
    if bytes.len() > primitives::MAX_DOCUMENT_SIZE {
        return Err(StatelabError::Deserialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_DOCUMENT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(MIN_SNAPSHOT_SIZE..).unwrap_or_default();
    let mirror: SerializableElements = postcard::from_bytes(payload).map_err(|e| {
        StatelabError::Deserialization(format!("Failed to decode snapshot payload: {e}"))
    })?;
    let elements = Elements::from(mirror);
    super::plain::validate(&elements)?;
    Ok(elements)
}

// =============================================================================
// TESTS
// =============================================================================
