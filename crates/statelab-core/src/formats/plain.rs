//! # Plain Form
//!
//! Pretty JSON of [`Elements`], including transient selection flags.
//! `from_json(to_json(e)) == e` for every valid element set.
//!
//! Loading validates structure before anything is handed to a document:
//! dangling parent, child, endpoint and initial-state references,
//! parent/child asymmetry, cyclic parent chains and nesting beyond
//! [`MAX_NESTING_DEPTH`] are all rejected.

use crate::primitives::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};
use crate::{Elements, StateId, StatelabError};
use std::collections::BTreeSet;

/// Serialize elements to pretty JSON.
pub fn to_json(elements: &Elements) -> Result<String, StatelabError> {
    serde_json::to_string_pretty(elements).map_err(|e| StatelabError::Serialization(e.to_string()))
}

/// Parse and validate elements from JSON text.
pub fn from_json(text: &str) -> Result<Elements, StatelabError> {
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(StatelabError::Structural(format!(
            "Document size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            MAX_DOCUMENT_SIZE
        )));
    }
    let elements: Elements = serde_json::from_str(text)
        .map_err(|e| StatelabError::Structural(format!("Malformed document: {e}")))?;
    validate(&elements)?;
    Ok(elements)
}

/// Structural consistency problems of an element set. Empty when valid.
#[must_use]
pub fn problems(elements: &Elements) -> Vec<String> {
    let mut problems = Vec::new();

    for (id, state) in &elements.states {
        if let Some(parent) = &state.parent {
            match elements.states.get(parent) {
                None => problems.push(format!("state {id}: unknown parent {parent}")),
                Some(p) if !p.children.contains(id) => {
                    problems.push(format!("state {id}: parent {parent} does not list it as a child"));
                }
                Some(_) => {}
            }
        }
        for child in &state.children {
            match elements.states.get(child) {
                None => problems.push(format!("state {id}: unknown child {child}")),
                Some(c) if c.parent.as_ref() != Some(id) => {
                    problems.push(format!("state {id}: child {child} names a different parent"));
                }
                Some(_) => {}
            }
        }
    }

    // Parent chains must reach a root within |states| steps.
    let limit = elements.states.len();
    for id in elements.states.keys() {
        let mut seen: BTreeSet<&StateId> = BTreeSet::new();
        let mut current = Some(id);
        let mut cyclic = false;
        while let Some(node) = current {
            if !seen.insert(node) || seen.len() > limit {
                problems.push(format!("state {id}: cyclic parent chain"));
                cyclic = true;
                break;
            }
            current = elements.states.get(node).and_then(|s| s.parent.as_ref());
        }
        if !cyclic && seen.len() > MAX_NESTING_DEPTH + 1 {
            problems.push(format!(
                "state {id}: nested {} levels deep, limit is {MAX_NESTING_DEPTH}",
                seen.len() - 1
            ));
        }
    }

    for (id, transition) in &elements.transitions {
        for (role, endpoint) in [("source", &transition.source), ("target", &transition.target)] {
            if !elements.states.contains_key(endpoint) {
                problems.push(format!("transition {id}: unknown {role} {endpoint}"));
            }
        }
    }

    if let Some(initial) = &elements.initial_state {
        if !elements.states.contains_key(initial) {
            problems.push(format!("unknown initial state {initial}"));
        }
    }

    problems
}

/// Reject structurally inconsistent elements.
pub fn validate(elements: &Elements) -> Result<(), StatelabError> {
    let problems = problems(elements);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(StatelabError::Structural(problems.join("; ")))
    }
}

// =============================================================================
// TESTS
// =============================================================================
