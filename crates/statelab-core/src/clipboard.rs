//! # Clipboard
//!
//! Copy a state subtree to an interchange fragment and paste it back with
//! fresh identifiers. The engine only produces and consumes text; reading
//! and writing the system clipboard is the host's job.

use crate::document::Document;
use crate::formats::interchange::{self, StateFragment};
use crate::hierarchy::{Hierarchy, NewState};
use crate::primitives::MAX_FRAGMENT_SIZE;
use crate::router::{NewTransition, TransitionRouter};
use crate::{Point, StateId, StatelabError};
use std::collections::{BTreeMap, BTreeSet};

/// Serialize a state and its subtree for the clipboard.
pub fn copy_state(doc: &Document, id: &StateId) -> Result<String, StatelabError> {
    let fragment = interchange::state_snapshot(doc, id)?;
    serde_json::to_string(&fragment).map_err(|e| StatelabError::Serialization(e.to_string()))
}

/// Parse a clipboard fragment without touching any document.
///
/// Every state after the root must name a parent listed before it, so a
/// fragment that parses can be pasted in order.
pub fn parse_fragment(text: &str) -> Result<StateFragment, StatelabError> {
    let fragment = interchange::fragment_from_json(text, MAX_FRAGMENT_SIZE)?;
    let mut seen: BTreeSet<&StateId> = BTreeSet::new();
    for (index, record) in fragment.states.iter().enumerate() {
        let linked = index == 0 || record.parent.as_ref().is_some_and(|p| seen.contains(p));
        if !linked {
            return Err(StatelabError::Structural(format!(
                "Fragment state {} is outside the copied subtree",
                record.id
            )));
        }
        if !seen.insert(&record.id) {
            return Err(StatelabError::DuplicateId(record.id.to_string()));
        }
    }
    Ok(fragment)
}

/// Insert a copied subtree with fresh identifiers and return the new root.
///
/// The root goes back under its original parent when that still exists
/// and no explicit position is given; otherwise it is auto-parented at its
/// (possibly overridden) position. Descendants keep their relative layout,
/// and transitions internal to the subtree are recreated.
pub fn paste_state(
    doc: &mut Document,
    text: &str,
    at: Option<Point>,
) -> Result<StateId, StatelabError> {
    let fragment = parse_fragment(text)?;
    let Some(root) = fragment.states.first() else {
        return Err(StatelabError::Structural("Empty fragment".to_string()));
    };

    let root_bounds = match at {
        Some(position) => root.absolute.with_origin(position),
        None => root.absolute,
    };
    let root_parent = match (&root.parent, at) {
        (Some(parent), None) if doc.contains_state(parent) => Some(parent.clone()),
        _ => None,
    };
    let new_root = Hierarchy::create_state(
        doc,
        NewState {
            id: None,
            name: root.name.clone(),
            bounds: root_bounds,
            parent: root_parent,
            events: root.events.clone(),
        },
    )?;

    let mut mapping: BTreeMap<StateId, StateId> = BTreeMap::new();
    mapping.insert(root.id.clone(), new_root.clone());

    for record in fragment.states.iter().skip(1) {
        let Some(parent) = record.parent.as_ref().and_then(|p| mapping.get(p)).cloned() else {
            return Err(StatelabError::Structural(format!(
                "Fragment state {} is outside the copied subtree",
                record.id
            )));
        };
        let origin = Hierarchy::child_origin(doc, &parent).unwrap_or_default();
        let bounds = record.bounds.with_origin(origin.offset(record.bounds.origin()));
        let id = Hierarchy::create_state(
            doc,
            NewState {
                id: None,
                name: record.name.clone(),
                bounds,
                parent: Some(parent),
                events: record.events.clone(),
            },
        )?;
        mapping.insert(record.id.clone(), id);
    }

    let root_shift = Hierarchy::absolute_position(doc, &new_root)
        .map(|p| Point::new(p.x - root.absolute.x, p.y - root.absolute.y))
        .unwrap_or_default();
    for record in &fragment.transitions {
        let (Some(source), Some(target)) = (mapping.get(&record.source), mapping.get(&record.target))
        else {
            continue;
        };
        let template = interchange::transition_from_record(record);
        let mut params = NewTransition::new(source.clone(), target.clone());
        params.label_position = record.label_position.map(|p| p.offset(root_shift));
        params.label = template.label;
        TransitionRouter::create_transition(doc, params)?;
    }

    tracing::debug!(root = %new_root, states = mapping.len(), "fragment pasted");
    Ok(new_root)
}

// =============================================================================
// TESTS
// =============================================================================
