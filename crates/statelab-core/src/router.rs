//! # Transition Router
//!
//! Creates, edits and deletes transitions, and keeps each transition's
//! *owner* current.
//!
//! The owner is the container a transition is drawn in:
//!
//! - if either endpoint is a root state, the owner is the root (`None`);
//! - otherwise the owner is the shallower of the two endpoints' parents,
//!   with the source's parent winning a tie.
//!
//! Ownership is derived. It is recomputed whenever an endpoint's ancestry
//! changes and is never journaled or serialized as authoritative data.

use crate::document::Document;
use crate::hierarchy::Hierarchy;
use crate::{
    Action, Condition, Point, StateId, StatelabError, Transition, TransitionId, TransitionLabel,
    Trigger,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters of a new transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransition {
    #[serde(default)]
    pub id: Option<TransitionId>,
    pub source: StateId,
    pub target: StateId,
    #[serde(default)]
    pub label: Option<TransitionLabel>,
    /// Where to place the label. Defaults to the midpoint between the
    /// endpoints' absolute positions.
    #[serde(default)]
    pub label_position: Option<Point>,
}

impl NewTransition {
    #[must_use]
    pub fn new(source: StateId, target: StateId) -> Self {
        Self {
            id: None,
            source,
            target,
            label: None,
            label_position: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: TransitionLabel) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: TransitionId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Edit of an existing transition.
///
/// Endpoints change only when given. The label content (trigger, guard,
/// actions, color) is replaced as a whole; the label position and
/// selection are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionEdit {
    #[serde(default)]
    pub source: Option<StateId>,
    #[serde(default)]
    pub target: Option<StateId>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default, rename = "do")]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub color: Option<String>,
}

/// The Transition Router.
pub struct TransitionRouter;

impl TransitionRouter {
    /// Owner a transition would have in the current containment tree.
    #[must_use]
    pub fn owner_of(doc: &Document, transition: &Transition) -> Option<StateId> {
        let source_parent = doc.state(&transition.source)?.parent.clone()?;
        let target_parent = doc.state(&transition.target)?.parent.clone()?;
        if Hierarchy::depth(doc, &source_parent) <= Hierarchy::depth(doc, &target_parent) {
            Some(source_parent)
        } else {
            Some(target_parent)
        }
    }

    /// Current owner of a transition (`Ok(None)` is the root).
    pub fn owner(doc: &Document, id: &TransitionId) -> Result<Option<StateId>, StatelabError> {
        doc.ownership(id)
            .map(|owner| owner.cloned())
            .ok_or_else(|| StatelabError::unknown_transition(id))
    }

    /// Transitions with `state` as source or target, in id order.
    #[must_use]
    pub fn transitions_touching(doc: &Document, state: &StateId) -> Vec<TransitionId> {
        doc.transitions()
            .filter(|(_, t)| &t.source == state || &t.target == state)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Transitions with an endpoint anywhere in the subtrees of `roots`.
    pub(crate) fn transitions_touching_subtrees(
        doc: &Document,
        roots: &[StateId],
    ) -> BTreeSet<TransitionId> {
        let members: BTreeSet<StateId> = roots
            .iter()
            .flat_map(|root| Hierarchy::subtree(doc, root))
            .collect();
        if members.is_empty() {
            return BTreeSet::new();
        }
        doc.transitions()
            .filter(|(_, t)| members.contains(&t.source) || members.contains(&t.target))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Recompute the owner of one transition and report it.
    pub fn relink(doc: &mut Document, id: &TransitionId) -> Result<Option<StateId>, StatelabError> {
        if doc.transition(id).is_none() {
            return Err(StatelabError::unknown_transition(id));
        }
        Self::relink_internal(doc, id);
        Self::owner(doc, id)
    }

    pub(crate) fn relink_internal(doc: &mut Document, id: &TransitionId) {
        let Some(transition) = doc.transition(id) else {
            return;
        };
        let owner = Self::owner_of(doc, transition);
        tracing::trace!(transition = %id, owner = ?owner, "transition relinked");
        doc.set_owner(id.clone(), owner);
    }

    /// Relink every transition with an endpoint inside the subtrees of
    /// `states`. Called after containment changes.
    pub fn relink_touching(doc: &mut Document, states: &[StateId]) {
        for id in Self::transitions_touching_subtrees(doc, states) {
            Self::relink_internal(doc, &id);
        }
    }

    pub(crate) fn relink_all(doc: &mut Document) {
        let ids: Vec<TransitionId> = doc.transitions().map(|(id, _)| id.clone()).collect();
        for id in ids {
            Self::relink_internal(doc, &id);
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create a transition between two existing states.
    pub fn create_transition(
        doc: &mut Document,
        params: NewTransition,
    ) -> Result<TransitionId, StatelabError> {
        if !doc.contains_state(&params.source) {
            return Err(StatelabError::unknown_state(&params.source));
        }
        if !doc.contains_state(&params.target) {
            return Err(StatelabError::unknown_state(&params.target));
        }
        let id = match params.id {
            Some(id) if doc.transition(&id).is_some() => {
                return Err(StatelabError::DuplicateId(id.to_string()));
            }
            Some(id) => id,
            None => doc.allocate_transition_id(),
        };

        let position = match params.label_position {
            Some(position) => position,
            None => Self::midpoint(doc, &params.source, &params.target),
        };
        let label = TransitionLabel {
            position,
            ..params.label.unwrap_or_default()
        };

        doc.insert_transition(
            id.clone(),
            Transition {
                source: params.source,
                target: params.target,
                label: Some(label),
            },
        );
        Self::relink_internal(doc, &id);
        tracing::debug!(transition = %id, "transition created");
        Ok(id)
    }

    /// Edit endpoints and label content of a transition.
    pub fn change_transition(
        doc: &mut Document,
        id: &TransitionId,
        edit: TransitionEdit,
    ) -> Result<(), StatelabError> {
        let Some(current) = doc.transition(id) else {
            return Err(StatelabError::unknown_transition(id));
        };
        let source = edit.source.unwrap_or_else(|| current.source.clone());
        let target = edit.target.unwrap_or_else(|| current.target.clone());
        for endpoint in [&source, &target] {
            if !doc.contains_state(endpoint) {
                return Err(StatelabError::unknown_state(endpoint));
            }
        }
        let (position, selection) = match &current.label {
            Some(label) => (label.position, label.selection),
            None => (Self::midpoint(doc, &source, &target), false),
        };

        let transition = doc
            .transition_mut(id)
            .ok_or_else(|| StatelabError::unknown_transition(id))?;
        transition.source = source;
        transition.target = target;
        transition.label = Some(TransitionLabel {
            trigger: edit.trigger,
            condition: edit.condition,
            actions: edit.actions,
            color: edit.color,
            position,
            selection,
        });
        Self::relink_internal(doc, id);
        Ok(())
    }

    /// Move a transition's label. A transition without a label gets an
    /// empty one at that position.
    pub fn change_transition_position(
        doc: &mut Document,
        id: &TransitionId,
        position: Point,
    ) -> Result<(), StatelabError> {
        let transition = doc
            .transition_mut(id)
            .ok_or_else(|| StatelabError::unknown_transition(id))?;
        transition.label.get_or_insert_with(TransitionLabel::default).position = position;
        Ok(())
    }

    /// Delete a transition and its ownership entry.
    pub fn delete_transition(
        doc: &mut Document,
        id: &TransitionId,
    ) -> Result<Transition, StatelabError> {
        let removed = doc
            .remove_transition(id)
            .ok_or_else(|| StatelabError::unknown_transition(id))?;
        tracing::debug!(transition = %id, "transition deleted");
        Ok(removed)
    }

    fn midpoint(doc: &Document, source: &StateId, target: &StateId) -> Point {
        let a = Hierarchy::absolute_position(doc, source).unwrap_or_default();
        let b = Hierarchy::absolute_position(doc, target).unwrap_or_default();
        a.midpoint(b)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;
    use crate::hierarchy::NewState;

    fn state(doc: &mut Document, name: &str, bounds: Rect) -> StateId {
        Hierarchy::create_state(doc, NewState::new(name, bounds)).expect("state")
    }

    /// Root A containing B, B containing C. D is a separate root.
    fn nested() -> (Document, StateId, StateId, StateId, StateId) {
        let mut doc = Document::new("p");
        let a = state(&mut doc, "A", Rect::new(0.0, 0.0, 500.0, 50.0));
        let b = state(&mut doc, "B", Rect::new(10.0, 10.0, 400.0, 40.0));
        let c = state(&mut doc, "C", Rect::new(20.0, 60.0, 50.0, 20.0));
        let d = state(&mut doc, "D", Rect::new(2000.0, 0.0, 50.0, 20.0));
        assert_eq!(Hierarchy::depth(&doc, &c), 2);
        (doc, a, b, c, d)
    }

    #[test]
    fn root_endpoint_means_root_owner() {
        let (mut doc, _, _, c, d) = nested();
        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(c, d))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &t).expect("owner"), None);
    }

    #[test]
    fn shallower_parent_owns() {
        let (mut doc, a, b, c, _) = nested();
        // B's parent is A (depth 0), C's parent is B (depth 1).
        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(c.clone(), b.clone()))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &t).expect("owner"), Some(a.clone()));

        let back = TransitionRouter::create_transition(&mut doc, NewTransition::new(b, c))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &back).expect("owner"), Some(a));
    }

    #[test]
    fn equal_depth_prefers_source_parent() {
        let mut doc = Document::new("p");
        let left = state(&mut doc, "L", Rect::new(0.0, 0.0, 100.0, 50.0));
        let right = state(&mut doc, "R", Rect::new(500.0, 0.0, 100.0, 50.0));
        let x = state(&mut doc, "X", Rect::new(10.0, 10.0, 20.0, 20.0));
        let y = state(&mut doc, "Y", Rect::new(510.0, 10.0, 20.0, 20.0));

        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(x.clone(), y.clone()))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &t).expect("owner"), Some(left));
        let u = TransitionRouter::create_transition(&mut doc, NewTransition::new(y, x))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &u).expect("owner"), Some(right));
    }

    #[test]
    fn unlinking_an_endpoint_moves_ownership_to_root() {
        let (mut doc, a, b, c, _) = nested();
        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(c, b.clone()))
            .expect("transition");
        assert_eq!(TransitionRouter::owner(&doc, &t).expect("owner"), Some(a));

        Hierarchy::unlink_state(&mut doc, &b).expect("unlink");
        assert_eq!(TransitionRouter::owner(&doc, &t).expect("owner"), None);
    }

    #[test]
    fn label_defaults_to_midpoint() {
        let mut doc = Document::new("p");
        let a = state(&mut doc, "A", Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = state(&mut doc, "B", Rect::new(100.0, 200.0, 10.0, 10.0));

        let t = TransitionRouter::create_transition(
            &mut doc,
            NewTransition::new(a, b).with_label(TransitionLabel::default()),
        )
        .expect("transition");
        let label = doc.transition(&t).and_then(|t| t.label.clone()).expect("label");
        assert_eq!(label.position, Point::new(50.0, 100.0));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut doc = Document::new("p");
        let a = state(&mut doc, "A", Rect::default());
        let err = TransitionRouter::create_transition(
            &mut doc,
            NewTransition::new(a, StateId::new("ghost")),
        );
        assert!(matches!(err, Err(StatelabError::UnknownReference { .. })));
        assert_eq!(doc.transition_count(), 0);
    }

    #[test]
    fn change_keeps_label_position() {
        let mut doc = Document::new("p");
        let a = state(&mut doc, "A", Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = state(&mut doc, "B", Rect::new(100.0, 0.0, 10.0, 10.0));
        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(a, b))
            .expect("transition");
        TransitionRouter::change_transition_position(&mut doc, &t, Point::new(7.0, 8.0))
            .expect("move");

        let edit = TransitionEdit {
            trigger: Some(Trigger::new("timer", "timeout")),
            ..TransitionEdit::default()
        };
        TransitionRouter::change_transition(&mut doc, &t, edit).expect("change");

        let label = doc.transition(&t).and_then(|t| t.label.clone()).expect("label");
        assert_eq!(label.position, Point::new(7.0, 8.0));
        assert_eq!(label.trigger, Some(Trigger::new("timer", "timeout")));
    }

    #[test]
    fn delete_removes_ownership() {
        let (mut doc, _, b, c, _) = nested();
        let t = TransitionRouter::create_transition(&mut doc, NewTransition::new(c, b))
            .expect("transition");
        TransitionRouter::delete_transition(&mut doc, &t).expect("delete");
        assert!(TransitionRouter::owner(&doc, &t).is_err());
        assert!(TransitionRouter::delete_transition(&mut doc, &t).is_err());
    }
}
