//! # Hierarchy Manager
//!
//! Owns the containment forest over states.
//!
//! ## Coordinates
//!
//! A root state's bounds are absolute. A nested state's bounds are relative
//! to its parent's *child-area origin*: the parent's absolute top-left
//! corner shifted down by the parent's header height (`bounds.height`), so
//! children never overlap the parent's header. A parent's painted area
//! grows downwards to enclose its children.
//!
//! ## Invariants
//!
//! - The parent relation is a forest: `link_state` rejects cycles.
//! - `parent`/`children` are kept symmetric by every operation here.
//! - Every containment change relinks the transitions touching the moved
//!   subtree, so ownership is always current.

use crate::document::Document;
use crate::primitives::MAX_NESTING_DEPTH;
use crate::router::TransitionRouter;
use crate::{EventData, Point, Rect, State, StateId, StatelabError};
use serde::{Deserialize, Serialize};

/// Parameters of a new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewState {
    /// Reuse a specific identifier (replays, imports). Fresh when `None`.
    #[serde(default)]
    pub id: Option<StateId>,
    pub name: String,
    /// Absolute bounds. The top-left corner drives auto-parenting.
    pub bounds: Rect,
    /// Link directly under this parent instead of auto-parenting.
    #[serde(default)]
    pub parent: Option<StateId>,
    #[serde(default)]
    pub events: Vec<EventData>,
}

impl NewState {
    #[must_use]
    pub fn new(name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: None,
            name: name.into(),
            bounds,
            parent: None,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: StateId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: StateId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<EventData>) -> Self {
        self.events = events;
        self
    }
}

/// The Hierarchy Manager: containment queries and mutations.
pub struct Hierarchy;

impl Hierarchy {
    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Ancestors of a state, nearest first.
    #[must_use]
    pub fn ancestors(doc: &Document, id: &StateId) -> Vec<StateId> {
        let limit = doc.state_count().min(MAX_NESTING_DEPTH);
        let mut result = Vec::new();
        let mut current = doc.state(id).and_then(|s| s.parent.clone());
        while let Some(parent) = current {
            if result.len() >= limit {
                break;
            }
            current = doc.state(&parent).and_then(|s| s.parent.clone());
            result.push(parent);
        }
        result
    }

    /// Nesting depth: 0 for root states.
    #[must_use]
    pub fn depth(doc: &Document, id: &StateId) -> usize {
        Self::ancestors(doc, id).len()
    }

    /// Whether `id` lies strictly inside the subtree of `ancestor`.
    ///
    /// Walks the whole parent chain, independent of the nesting limit.
    #[must_use]
    pub fn is_descendant(doc: &Document, id: &StateId, ancestor: &StateId) -> bool {
        let mut current = doc.state(id).and_then(|s| s.parent.as_ref());
        for _ in 0..doc.state_count() {
            match current {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = doc.state(parent).and_then(|s| s.parent.as_ref()),
                None => return false,
            }
        }
        false
    }

    /// Levels below `id` in its subtree: 0 for a leaf.
    #[must_use]
    pub fn subtree_height(doc: &Document, id: &StateId) -> usize {
        let mut height = 0;
        let mut stack = vec![(id, 0usize)];
        let mut visited = 0;
        while let Some((current, level)) = stack.pop() {
            visited += 1;
            if visited > doc.state_count() {
                break;
            }
            height = height.max(level);
            if let Some(state) = doc.state(current) {
                stack.extend(state.children.iter().map(|c| (c, level + 1)));
            }
        }
        height
    }

    /// The state and all its descendants, preorder, children in id order.
    #[must_use]
    pub fn subtree(doc: &Document, id: &StateId) -> Vec<StateId> {
        let mut result = Vec::new();
        if !doc.contains_state(id) {
            return result;
        }
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(state) = doc.state(&current) {
                stack.extend(state.children.iter().rev().cloned());
            }
            result.push(current);
            if result.len() > doc.state_count() {
                break;
            }
        }
        result
    }

    /// States without a parent, in id order.
    #[must_use]
    pub fn roots(doc: &Document) -> Vec<StateId> {
        doc.states()
            .filter(|(_, s)| s.parent.is_none())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Absolute top-left corner of a state.
    #[must_use]
    pub fn absolute_position(doc: &Document, id: &StateId) -> Option<Point> {
        let state = doc.state(id)?;
        let position = match &state.parent {
            Some(parent) => Self::child_origin(doc, parent)
                .map(|origin| origin.offset(state.bounds.origin()))
                .unwrap_or(state.bounds.origin()),
            None => state.bounds.origin(),
        };
        Some(position)
    }

    /// Absolute bounds of a state's own body (header), without children.
    #[must_use]
    pub fn absolute_bounds(doc: &Document, id: &StateId) -> Option<Rect> {
        let state = doc.state(id)?;
        let position = Self::absolute_position(doc, id)?;
        Some(state.bounds.with_origin(position))
    }

    /// Absolute origin against which children's bounds are measured.
    #[must_use]
    pub fn child_origin(doc: &Document, id: &StateId) -> Option<Point> {
        let header = doc.state(id)?.bounds.height;
        let mut origin = doc.state(id)?.bounds.origin();
        origin.y += header;
        // Walk up, accumulating each ancestor's child-area offset.
        for ancestor in Self::ancestors(doc, id) {
            let bounds = doc.state(&ancestor)?.bounds;
            origin.x += bounds.x;
            origin.y += bounds.y + bounds.height;
        }
        Some(origin)
    }

    /// Height the children of a state occupy below its header.
    #[must_use]
    pub fn children_extent(doc: &Document, id: &StateId) -> f64 {
        Self::children_extent_bounded(doc, id, 0)
    }

    fn children_extent_bounded(doc: &Document, id: &StateId, level: usize) -> f64 {
        if level >= MAX_NESTING_DEPTH {
            return 0.0;
        }
        let Some(state) = doc.state(id) else {
            return 0.0;
        };
        state
            .children
            .iter()
            .filter_map(|child| {
                let bounds = doc.state(child)?.bounds;
                let nested = Self::children_extent_bounded(doc, child, level + 1);
                Some(bounds.y + bounds.height + nested)
            })
            .fold(0.0, f64::max)
    }

    /// Painted area: absolute body extended downwards over the children.
    #[must_use]
    pub fn painted_bounds(doc: &Document, id: &StateId) -> Option<Rect> {
        let mut rect = Self::absolute_bounds(doc, id)?;
        rect.height += Self::children_extent(doc, id);
        Some(rect)
    }

    /// Deepest state whose painted area contains `point`.
    ///
    /// Candidates are scanned in identifier order; among equally deep
    /// candidates the first one scanned wins. `exclude` is never returned.
    #[must_use]
    pub fn state_at(doc: &Document, point: Point, exclude: Option<&StateId>) -> Option<StateId> {
        let mut best: Option<(usize, &StateId)> = None;
        for (id, _) in doc.states() {
            if exclude == Some(id) {
                continue;
            }
            let contains = Self::painted_bounds(doc, id).is_some_and(|r| r.contains(point));
            if !contains {
                continue;
            }
            let depth = Self::depth(doc, id);
            if best.is_none_or(|(best_depth, _)| depth > best_depth) {
                best = Some((depth, id));
            }
        }
        best.map(|(_, id)| id.clone())
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create a state, nesting it under `parent` or under the deepest state
    /// painted at its top-left corner.
    pub fn create_state(doc: &mut Document, params: NewState) -> Result<StateId, StatelabError> {
        if let Some(parent) = &params.parent {
            if !doc.contains_state(parent) {
                return Err(StatelabError::unknown_state(parent));
            }
            let depth = Self::depth(doc, parent) + 1;
            if depth > MAX_NESTING_DEPTH {
                return Err(StatelabError::NestingTooDeep {
                    parent: parent.clone(),
                    depth,
                });
            }
        }
        let id = match params.id {
            Some(id) if doc.contains_state(&id) => {
                return Err(StatelabError::DuplicateId(id.to_string()));
            }
            Some(id) => id,
            None => doc.allocate_state_id(),
        };

        let mut state = State::new(params.name, params.bounds);
        state.events = params.events;
        doc.insert_state(id.clone(), state);
        tracing::debug!(state = %id, "state created");

        match params.parent {
            Some(parent) => Self::link_state(doc, &parent, &id)?,
            None => {
                let found = Self::state_at(doc, params.bounds.origin(), Some(&id));
                match found {
                    Some(parent) if Self::depth(doc, &parent) < MAX_NESTING_DEPTH => {
                        tracing::debug!(state = %id, parent = %parent, "auto-parented by position");
                        Self::link_state(doc, &parent, &id)?;
                    }
                    Some(parent) => {
                        tracing::debug!(state = %id, parent = %parent, "nesting limit reached, kept at root");
                    }
                    None => {}
                }
            }
        }
        Ok(id)
    }

    /// Nest `child` inside `parent`, converting its bounds to the parent's
    /// child-area coordinates.
    pub fn link_state(
        doc: &mut Document,
        parent: &StateId,
        child: &StateId,
    ) -> Result<(), StatelabError> {
        if !doc.contains_state(parent) {
            return Err(StatelabError::unknown_state(parent));
        }
        if !doc.contains_state(child) {
            return Err(StatelabError::unknown_state(child));
        }
        if parent == child || Self::is_descendant(doc, parent, child) {
            return Err(StatelabError::CyclicContainment {
                parent: parent.clone(),
                child: child.clone(),
            });
        }
        let depth = Self::depth(doc, parent) + 1 + Self::subtree_height(doc, child);
        if depth > MAX_NESTING_DEPTH {
            return Err(StatelabError::NestingTooDeep {
                parent: parent.clone(),
                depth,
            });
        }

        if doc.state(child).is_some_and(|s| s.parent.is_some()) {
            Self::detach(doc, child);
        }

        let absolute = Self::absolute_position(doc, child).unwrap_or_default();
        let origin = Self::child_origin(doc, parent).unwrap_or_default();
        let relative = Point::new(
            (absolute.x - origin.x).max(0.0),
            (absolute.y - origin.y).max(0.0),
        );

        if let Some(state) = doc.state_mut(child) {
            state.parent = Some(parent.clone());
            state.bounds = state.bounds.with_origin(relative);
        }
        if let Some(state) = doc.state_mut(parent) {
            state.children.insert(child.clone());
        }
        tracing::debug!(parent = %parent, child = %child, "state linked");

        TransitionRouter::relink_touching(doc, std::slice::from_ref(child));
        Ok(())
    }

    /// Move a nested state back to the root, keeping its absolute position.
    /// Unlinking a root state succeeds without changes.
    pub fn unlink_state(doc: &mut Document, id: &StateId) -> Result<(), StatelabError> {
        let Some(state) = doc.state(id) else {
            return Err(StatelabError::unknown_state(id));
        };
        if state.parent.is_none() {
            return Ok(());
        }
        Self::detach(doc, id);
        TransitionRouter::relink_touching(doc, std::slice::from_ref(id));
        Ok(())
    }

    fn detach(doc: &mut Document, id: &StateId) {
        let absolute = Self::absolute_position(doc, id).unwrap_or_default();
        let Some(parent) = doc.state(id).and_then(|s| s.parent.clone()) else {
            return;
        };
        if let Some(state) = doc.state_mut(&parent) {
            state.children.remove(id);
        }
        if let Some(state) = doc.state_mut(id) {
            state.parent = None;
            state.bounds = state.bounds.with_origin(absolute);
        }
        tracing::debug!(parent = %parent, child = %id, "state unlinked");
    }

    /// Delete a state and cascade: its transitions are deleted, its
    /// children move up to its parent (or to the root), then it is removed.
    pub fn delete_state(doc: &mut Document, id: &StateId) -> Result<State, StatelabError> {
        let Some(state) = doc.state(id) else {
            return Err(StatelabError::unknown_state(id));
        };
        let grandparent = state.parent.clone();
        let children: Vec<StateId> = state.children.iter().cloned().collect();

        for transition in TransitionRouter::transitions_touching(doc, id) {
            TransitionRouter::delete_transition(doc, &transition)?;
        }

        for child in &children {
            match &grandparent {
                Some(parent) => Self::link_state(doc, parent, child)?,
                None => Self::unlink_state(doc, child)?,
            }
        }

        Self::unlink_state(doc, id)?;

        if doc.initial_state() == Some(id) {
            doc.set_initial_state(None);
        }

        let removed = doc
            .remove_state(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        tracing::debug!(state = %id, children = children.len(), "state deleted");
        Ok(removed)
    }

    /// Move a state within its current coordinate space. Parentage is
    /// unchanged; explicit reparenting goes through `link_state`.
    pub fn change_state_position(
        doc: &mut Document,
        id: &StateId,
        position: Point,
    ) -> Result<(), StatelabError> {
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        state.bounds = state.bounds.with_origin(position);
        Ok(())
    }

    /// Set or clear the initial state.
    pub fn change_initial_state(
        doc: &mut Document,
        id: Option<&StateId>,
    ) -> Result<(), StatelabError> {
        if let Some(id) = id {
            if !doc.contains_state(id) {
                return Err(StatelabError::unknown_state(id));
            }
        }
        doc.set_initial_state(id.cloned());
        Ok(())
    }

    /// Resize a state's header.
    pub fn change_state_size(
        doc: &mut Document,
        id: &StateId,
        width: f64,
        height: f64,
    ) -> Result<(), StatelabError> {
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        state.bounds.width = width.max(0.0);
        state.bounds.height = height.max(0.0);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create(doc: &mut Document, name: &str, bounds: Rect) -> StateId {
        Hierarchy::create_state(doc, NewState::new(name, bounds)).expect("create")
    }

    #[test]
    fn state_inside_bounds_is_auto_parented() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 100.0, 60.0));
        let b = create(&mut doc, "B", Rect::new(10.0, 10.0, 30.0, 20.0));

        assert_eq!(doc.state(&b).and_then(|s| s.parent.clone()), Some(a.clone()));
        assert!(doc.state(&a).is_some_and(|s| s.children.contains(&b)));
    }

    #[test]
    fn state_outside_bounds_stays_at_root() {
        let mut doc = Document::new("p");
        create(&mut doc, "A", Rect::new(0.0, 0.0, 100.0, 60.0));
        let b = create(&mut doc, "B", Rect::new(300.0, 300.0, 30.0, 20.0));

        assert!(doc.state(&b).is_some_and(|s| s.parent.is_none()));
    }

    #[test]
    fn deepest_candidate_wins() {
        let mut doc = Document::new("p");
        let outer = create(&mut doc, "Outer", Rect::new(0.0, 0.0, 400.0, 100.0));
        // Dropped on Outer's header: nested, clamped to the child-area origin.
        let inner = create(&mut doc, "Inner", Rect::new(10.0, 10.0, 300.0, 40.0));
        assert_eq!(doc.state(&inner).and_then(|s| s.parent.clone()), Some(outer));

        // Both Outer's painted area and Inner's body cover (20, 110).
        let leaf = create(&mut doc, "Leaf", Rect::new(20.0, 110.0, 50.0, 20.0));
        assert_eq!(doc.state(&leaf).and_then(|s| s.parent.clone()), Some(inner));
    }

    #[test]
    fn overlapping_roots_resolve_to_first_in_id_order() {
        let mut doc = Document::new("p");
        let first = create(&mut doc, "First", Rect::new(0.0, 0.0, 100.0, 100.0));
        let second = create(&mut doc, "Second", Rect::new(200.0, 0.0, 100.0, 100.0));
        // Move Second onto First without reparenting: both now cover (50, 50).
        Hierarchy::change_state_position(&mut doc, &second, Point::new(0.0, 0.0))
            .expect("move");

        let probe = Hierarchy::state_at(&doc, Point::new(50.0, 50.0), None);
        assert_eq!(probe, Some(first));
    }

    #[test]
    fn link_converts_to_relative_and_unlink_restores_absolute() {
        let mut doc = Document::new("p");
        let parent = create(&mut doc, "P", Rect::new(100.0, 100.0, 200.0, 40.0));
        let child = create(&mut doc, "C", Rect::new(500.0, 500.0, 50.0, 20.0));

        Hierarchy::link_state(&mut doc, &parent, &child).expect("link");
        let rel = doc.state(&child).map(|s| s.bounds).expect("child");
        assert_eq!((rel.x, rel.y), (400.0, 360.0));
        assert_eq!(
            Hierarchy::absolute_position(&doc, &child),
            Some(Point::new(500.0, 500.0))
        );

        Hierarchy::unlink_state(&mut doc, &child).expect("unlink");
        let abs = doc.state(&child).map(|s| s.bounds).expect("child");
        assert_eq!((abs.x, abs.y), (500.0, 500.0));
        assert!(doc.state(&parent).is_some_and(|s| s.children.is_empty()));
    }

    #[test]
    fn link_clamps_negative_offsets() {
        let mut doc = Document::new("p");
        let parent = create(&mut doc, "P", Rect::new(100.0, 100.0, 200.0, 40.0));
        let child = create(&mut doc, "C", Rect::new(0.0, 0.0, 50.0, 20.0));

        Hierarchy::link_state(&mut doc, &parent, &child).expect("link");
        let rel = doc.state(&child).map(|s| s.bounds).expect("child");
        assert_eq!((rel.x, rel.y), (0.0, 0.0));
    }

    #[test]
    fn link_rejects_cycles() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 300.0, 50.0));
        let b = create(&mut doc, "B", Rect::new(10.0, 10.0, 100.0, 30.0));
        assert_eq!(doc.state(&b).and_then(|s| s.parent.clone()), Some(a.clone()));

        let err = Hierarchy::link_state(&mut doc, &b, &a);
        assert!(matches!(err, Err(StatelabError::CyclicContainment { .. })));
        let err = Hierarchy::link_state(&mut doc, &a, &a);
        assert!(matches!(err, Err(StatelabError::CyclicContainment { .. })));
    }

    #[test]
    fn relinking_moves_between_parents() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 100.0, 50.0));
        let b = create(&mut doc, "B", Rect::new(500.0, 0.0, 100.0, 50.0));
        let c = create(&mut doc, "C", Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(doc.state(&c).and_then(|s| s.parent.clone()), Some(a.clone()));

        Hierarchy::link_state(&mut doc, &b, &c).expect("link");
        assert!(doc.state(&a).is_some_and(|s| s.children.is_empty()));
        assert!(doc.state(&b).is_some_and(|s| s.children.contains(&c)));
    }

    #[test]
    fn delete_moves_children_to_grandparent() {
        let mut doc = Document::new("p");
        let top = create(&mut doc, "Top", Rect::new(0.0, 0.0, 500.0, 50.0));
        let mid = create(&mut doc, "Mid", Rect::new(10.0, 10.0, 400.0, 40.0));
        let leaf = create(&mut doc, "Leaf", Rect::new(20.0, 60.0, 50.0, 20.0));
        assert_eq!(doc.state(&leaf).and_then(|s| s.parent.clone()), Some(mid.clone()));
        let leaf_abs = Hierarchy::absolute_position(&doc, &leaf);

        Hierarchy::delete_state(&mut doc, &mid).expect("delete");

        assert!(!doc.contains_state(&mid));
        assert_eq!(doc.state(&leaf).and_then(|s| s.parent.clone()), Some(top.clone()));
        assert!(doc.state(&top).is_some_and(|s| s.children.contains(&leaf)));
        assert_eq!(Hierarchy::absolute_position(&doc, &leaf), leaf_abs);
    }

    #[test]
    fn delete_clears_initial_state() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 100.0, 50.0));
        doc.set_initial_state(Some(a.clone()));

        Hierarchy::delete_state(&mut doc, &a).expect("delete");
        assert!(doc.initial_state().is_none());
    }

    #[test]
    fn unknown_ids_are_rejected_without_mutation() {
        let mut doc = Document::new("p");
        let ghost = StateId::new("ghost");

        assert!(Hierarchy::unlink_state(&mut doc, &ghost).is_err());
        assert!(Hierarchy::delete_state(&mut doc, &ghost).is_err());
        assert!(Hierarchy::change_state_position(&mut doc, &ghost, Point::default()).is_err());
        let err = Hierarchy::create_state(
            &mut doc,
            NewState::new("X", Rect::default()).with_parent(ghost),
        );
        assert!(matches!(err, Err(StatelabError::UnknownReference { .. })));
        assert_eq!(doc.state_count(), 0);
    }

    #[test]
    fn create_with_existing_id_is_rejected() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::default());
        let err = Hierarchy::create_state(&mut doc, NewState::new("B", Rect::default()).with_id(a));
        assert!(matches!(err, Err(StatelabError::DuplicateId(_))));
    }

    #[test]
    fn painted_bounds_grow_with_children() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 200.0, 50.0));
        create(&mut doc, "B", Rect::new(10.0, 10.0, 50.0, 30.0));

        let painted = Hierarchy::painted_bounds(&doc, &a).expect("painted");
        // Header 50 + child clamped to relative y 0 with height 30.
        assert_eq!(painted.height, 80.0);
    }

    #[test]
    fn subtree_is_preorder() {
        let mut doc = Document::new("p");
        let a = create(&mut doc, "A", Rect::new(0.0, 0.0, 500.0, 50.0));
        let b = create(&mut doc, "B", Rect::new(10.0, 10.0, 300.0, 40.0));
        let c = create(&mut doc, "C", Rect::new(20.0, 60.0, 50.0, 20.0));

        assert_eq!(Hierarchy::subtree(&doc, &a), vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(Hierarchy::depth(&doc, &c), 2);
        assert_eq!(Hierarchy::ancestors(&doc, &c), vec![b.clone(), a.clone()]);
        assert!(Hierarchy::is_descendant(&doc, &c, &a));
        assert!(!Hierarchy::is_descendant(&doc, &b, &c));
        assert!(!Hierarchy::is_descendant(&doc, &a, &a));
        assert_eq!(Hierarchy::roots(&doc), vec![a]);
    }
}
