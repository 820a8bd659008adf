//! # State Properties
//!
//! Name and event-list edits on a single state. None of these touch
//! containment, so no transition is relinked.

use crate::document::Document;
use crate::{EventData, StateId, StatelabError};

/// Edits of a state's name and events.
pub struct EventEditor;

impl EventEditor {
    pub fn change_state_name(
        doc: &mut Document,
        id: &StateId,
        name: impl Into<String>,
    ) -> Result<(), StatelabError> {
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        state.name = name.into();
        Ok(())
    }

    /// Replace the whole event list.
    pub fn change_state_events(
        doc: &mut Document,
        id: &StateId,
        events: Vec<EventData>,
    ) -> Result<(), StatelabError> {
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        state.events = events;
        Ok(())
    }

    /// Replace one event entry, or append when `index` equals the list
    /// length.
    pub fn change_event(
        doc: &mut Document,
        id: &StateId,
        index: usize,
        event: EventData,
    ) -> Result<(), StatelabError> {
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        if index == state.events.len() {
            state.events.push(event);
            return Ok(());
        }
        let slot = state
            .events
            .get_mut(index)
            .ok_or_else(|| StatelabError::unknown_event(id, index))?;
        *slot = event;
        Ok(())
    }

    pub fn delete_event(
        doc: &mut Document,
        id: &StateId,
        index: usize,
    ) -> Result<EventData, StatelabError> {
        let len = doc
            .state(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?
            .events
            .len();
        if index >= len {
            return Err(StatelabError::unknown_event(id, index));
        }
        let state = doc
            .state_mut(id)
            .ok_or_else(|| StatelabError::unknown_state(id))?;
        Ok(state.events.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{Hierarchy, NewState};
    use crate::{Action, Rect, Trigger};

    fn doc_with_state() -> (Document, StateId) {
        let mut doc = Document::new("p");
        let id = Hierarchy::create_state(&mut doc, NewState::new("A", Rect::default()))
            .expect("create");
        (doc, id)
    }

    fn entry(method: &str) -> EventData {
        EventData::new(
            Trigger::new("System", method),
            vec![Action::new("Led1", "on")],
        )
    }

    #[test]
    fn rename_state() {
        let (mut doc, id) = doc_with_state();
        EventEditor::change_state_name(&mut doc, &id, "Idle").expect("rename");
        assert_eq!(doc.state(&id).map(|s| s.name.as_str()), Some("Idle"));
    }

    #[test]
    fn change_event_replaces_or_appends() {
        let (mut doc, id) = doc_with_state();
        EventEditor::change_event(&mut doc, &id, 0, entry("onEnter")).expect("append");
        EventEditor::change_event(&mut doc, &id, 0, entry("onExit")).expect("replace");

        let events = doc.state(&id).map(|s| s.events.clone()).expect("state");
        assert_eq!(events, vec![entry("onExit")]);

        let err = EventEditor::change_event(&mut doc, &id, 5, entry("x"));
        assert!(matches!(err, Err(StatelabError::UnknownReference { .. })));
    }

    #[test]
    fn delete_event_removes_entry() {
        let (mut doc, id) = doc_with_state();
        EventEditor::change_state_events(&mut doc, &id, vec![entry("a"), entry("b")])
            .expect("set");

        let removed = EventEditor::delete_event(&mut doc, &id, 0).expect("delete");
        assert_eq!(removed, entry("a"));
        assert!(EventEditor::delete_event(&mut doc, &id, 1).is_err());
    }
}
