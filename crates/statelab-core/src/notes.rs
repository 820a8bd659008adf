//! # Notes
//!
//! Free-text canvas notes. Notes have no relations to other entities.

use crate::document::Document;
use crate::{Note, NoteId, Point, StatelabError};

pub struct NoteEditor;

impl NoteEditor {
    pub fn create_note(
        doc: &mut Document,
        id: Option<NoteId>,
        text: impl Into<String>,
        position: Point,
    ) -> Result<NoteId, StatelabError> {
        let id = match id {
            Some(id) if doc.note(&id).is_some() => {
                return Err(StatelabError::DuplicateId(id.to_string()));
            }
            Some(id) => id,
            None => doc.allocate_note_id(),
        };
        doc.insert_note(
            id.clone(),
            Note {
                text: text.into(),
                position,
            },
        );
        tracing::debug!(note = %id, "note created");
        Ok(id)
    }

    pub fn change_note_text(
        doc: &mut Document,
        id: &NoteId,
        text: impl Into<String>,
    ) -> Result<(), StatelabError> {
        let note = doc
            .note_mut(id)
            .ok_or_else(|| StatelabError::unknown_note(id))?;
        note.text = text.into();
        Ok(())
    }

    pub fn change_note_position(
        doc: &mut Document,
        id: &NoteId,
        position: Point,
    ) -> Result<(), StatelabError> {
        let note = doc
            .note_mut(id)
            .ok_or_else(|| StatelabError::unknown_note(id))?;
        note.position = position;
        Ok(())
    }

    pub fn delete_note(doc: &mut Document, id: &NoteId) -> Result<Note, StatelabError> {
        doc.remove_note(id)
            .ok_or_else(|| StatelabError::unknown_note(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_lifecycle() {
        let mut doc = Document::new("p");
        let id = NoteEditor::create_note(&mut doc, None, "todo", Point::new(1.0, 2.0))
            .expect("create");
        NoteEditor::change_note_text(&mut doc, &id, "done").expect("text");
        NoteEditor::change_note_position(&mut doc, &id, Point::new(3.0, 4.0)).expect("move");

        let note = doc.note(&id).cloned().expect("note");
        assert_eq!(note.text, "done");
        assert_eq!(note.position, Point::new(3.0, 4.0));

        NoteEditor::delete_note(&mut doc, &id).expect("delete");
        assert!(doc.note(&id).is_none());
        assert!(NoteEditor::delete_note(&mut doc, &id).is_err());
    }

    #[test]
    fn duplicate_note_id_is_rejected() {
        let mut doc = Document::new("p");
        let id = NoteEditor::create_note(&mut doc, None, "a", Point::default()).expect("create");
        let err = NoteEditor::create_note(&mut doc, Some(id), "b", Point::default());
        assert!(matches!(err, Err(StatelabError::DuplicateId(_))));
    }
}
