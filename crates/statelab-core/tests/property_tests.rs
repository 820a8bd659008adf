//! # Property-Based Tests
//!
//! Random edit sequences driven through the editor. After every step the
//! document must be structurally consistent, ownership must match the
//! ownership rule, and undo must restore the exact previous elements.

use proptest::collection::vec;
use proptest::prelude::*;
use statelab_core::formats::plain;
use statelab_core::primitives::BUILTIN_PLATFORM;
use statelab_core::{
    Document, Editor, Elements, Intent, NewState, NewTransition, Point, PlatformRegistry, Rect,
    StateId, TransitionRouter,
};

// =============================================================================
// OPERATION MODEL
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Create { x: i16, y: i16, w: u8, h: u8 },
    Link { parent: usize, child: usize },
    Unlink { state: usize },
    Delete { state: usize },
    Move { state: usize, x: i16, y: i16 },
    Connect { source: usize, target: usize },
    Rename { state: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i16..600, 0i16..600, 1u8..200, 1u8..80)
            .prop_map(|(x, y, w, h)| Op::Create { x, y, w, h }),
        2 => (0usize..32, 0usize..32).prop_map(|(parent, child)| Op::Link { parent, child }),
        1 => (0usize..32).prop_map(|state| Op::Unlink { state }),
        1 => (0usize..32).prop_map(|state| Op::Delete { state }),
        1 => (0usize..32, -50i16..600, -50i16..600).prop_map(|(state, x, y)| Op::Move { state, x, y }),
        2 => (0usize..32, 0usize..32).prop_map(|(source, target)| Op::Connect { source, target }),
        1 => (0usize..32).prop_map(|state| Op::Rename { state }),
    ]
}

fn pick(doc: &Document, index: usize) -> Option<StateId> {
    let ids: Vec<&StateId> = doc.states().map(|(id, _)| id).collect();
    if ids.is_empty() {
        return None;
    }
    ids.get(index % ids.len()).map(|id| (*id).clone())
}

fn to_intent(doc: &Document, op: &Op) -> Option<Intent> {
    let intent = match *op {
        Op::Create { x, y, w, h } => Intent::CreateState(NewState::new(
            "S",
            Rect::new(f64::from(x), f64::from(y), f64::from(w), f64::from(h)),
        )),
        Op::Link { parent, child } => Intent::LinkState {
            parent: pick(doc, parent)?,
            child: pick(doc, child)?,
        },
        Op::Unlink { state } => Intent::UnlinkState {
            id: pick(doc, state)?,
        },
        Op::Delete { state } => Intent::DeleteState {
            id: pick(doc, state)?,
        },
        Op::Move { state, x, y } => Intent::ChangeStatePosition {
            id: pick(doc, state)?,
            position: Point::new(f64::from(x), f64::from(y)),
        },
        Op::Connect { source, target } => Intent::CreateTransition(NewTransition::new(
            pick(doc, source)?,
            pick(doc, target)?,
        )),
        Op::Rename { state } => Intent::ChangeStateName {
            id: pick(doc, state)?,
            name: format!("R{state}"),
        },
    };
    Some(intent)
}

fn editor() -> Editor {
    Editor::new(PlatformRegistry::with_builtin(), BUILTIN_PLATFORM).expect("editor")
}

fn check_consistent(doc: &Document) -> Result<(), TestCaseError> {
    let problems = plain::problems(doc.elements());
    prop_assert!(problems.is_empty(), "inconsistent document: {:?}", problems);

    for (id, transition) in doc.transitions() {
        let stored = TransitionRouter::owner(doc, id).expect("owner entry");
        prop_assert_eq!(stored, TransitionRouter::owner_of(doc, transition));
    }
    Ok(())
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The parent graph stays a symmetric forest and ownership stays current.
    #[test]
    fn forest_invariant_holds_under_random_edits(ops in vec(op_strategy(), 1..40)) {
        let mut editor = editor();
        for op in &ops {
            if let Some(intent) = to_intent(editor.document(), op) {
                let _ = editor.dispatch(intent);
            }
            check_consistent(editor.document())?;
        }
    }

    /// Undo right after any command restores object-equal elements; redo
    /// returns to the post-command elements.
    #[test]
    fn undo_restores_previous_elements(ops in vec(op_strategy(), 1..30)) {
        let mut editor = editor();
        for op in &ops {
            let Some(intent) = to_intent(editor.document(), op) else {
                continue;
            };
            let before = editor.document().elements().clone();
            let entries = editor.history().undo_len();
            if editor.dispatch(intent).is_err() {
                prop_assert_eq!(editor.document().elements(), &before);
                prop_assert_eq!(editor.history().undo_len(), entries);
                continue;
            }
            if editor.history().undo_len() == entries {
                continue;
            }
            let after = editor.document().elements().clone();

            editor.undo().expect("undo");
            prop_assert_eq!(editor.document().elements(), &before);
            check_consistent(editor.document())?;

            editor.redo().expect("redo");
            prop_assert_eq!(editor.document().elements(), &after);
            check_consistent(editor.document())?;
        }
    }

    /// Undoing the whole history returns to the empty document.
    #[test]
    fn undo_everything_returns_to_empty(ops in vec(op_strategy(), 1..30)) {
        let mut editor = editor();
        for op in &ops {
            if let Some(intent) = to_intent(editor.document(), op) {
                let _ = editor.dispatch(intent);
            }
        }
        while editor.undo().is_some() {}
        prop_assert_eq!(editor.document().elements(), &Elements::new(BUILTIN_PLATFORM));
    }

    /// Plain form and binary snapshot both round-trip documents built by
    /// operations.
    #[test]
    fn serialization_roundtrips(ops in vec(op_strategy(), 1..30)) {
        let mut editor = editor();
        for op in &ops {
            if let Some(intent) = to_intent(editor.document(), op) {
                let _ = editor.dispatch(intent);
            }
        }
        let elements = editor.document().elements().clone();

        let text = editor.save().expect("save");
        let mut reloaded = self::editor();
        reloaded.load(&text).expect("load");
        prop_assert_eq!(reloaded.document().elements(), &elements);

        let bytes = editor.snapshot_bytes().expect("snapshot");
        let mut restored = self::editor();
        restored.load_snapshot(&bytes).expect("load snapshot");
        prop_assert_eq!(restored.document().elements(), &elements);
    }

    /// A created state lands under whatever state the point query reports.
    #[test]
    fn auto_parent_is_a_containing_state(ops in vec(op_strategy(), 1..30), x in 0i16..600, y in 0i16..600) {
        let mut editor = editor();
        for op in &ops {
            if let Some(intent) = to_intent(editor.document(), op) {
                let _ = editor.dispatch(intent);
            }
        }
        let point = Point::new(f64::from(x), f64::from(y));
        let expected = statelab_core::Hierarchy::state_at(editor.document(), point, None);

        let outcome = editor
            .dispatch(Intent::CreateState(NewState::new("probe", Rect::new(point.x, point.y, 5.0, 5.0))))
            .expect("create");
        let id = outcome.created_state().cloned().expect("state id");
        let parent = editor.document().state(&id).and_then(|s| s.parent.clone());
        prop_assert_eq!(parent, expected);
    }
}
