//! # statelab-core
//!
//! The document engine for statelab: a mutable, hierarchically nested
//! collection of states, transitions, notes and components that stays
//! internally consistent under arbitrary interactive edits.
//!
//! ## Layout
//!
//! - `document`: keyed entity store, dirty flag, write journal
//! - `hierarchy`: containment forest, geometric auto-parenting
//! - `router`: transition lifecycle and ownership
//! - `history`: undo/redo over journaled patches
//! - `formats`: plain, interchange and binary snapshot forms
//! - `platform`: component metadata consumed from target platforms
//! - `editor`: the facade hosts talk to, through `Intent`s
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no file I/O
//! - Deterministic: identifier-ordered `BTreeMap`s everywhere
//! - Relations are identifiers, never references
//! - Every user mutation is exactly one undoable history entry

// =============================================================================
// MODULES
// =============================================================================

pub mod clipboard;
pub mod components;
pub mod document;
pub mod editor;
pub mod events;
pub mod formats;
pub mod hierarchy;
pub mod history;
pub mod intent;
pub mod notes;
pub mod platform;
pub mod primitives;
pub mod router;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Action, Args, Component, Condition, Elements, EntityKind, EventData, Note, NoteId, Operator,
    Point, Rect, State, StateId, StatelabError, Transition, TransitionId, TransitionLabel, Trigger,
    Variable,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use components::ComponentEditor;
pub use document::{Document, Patch, Snapshot};
pub use editor::{Change, Editor, Outcome};
pub use events::EventEditor;
pub use hierarchy::{Hierarchy, NewState};
pub use history::{CommandKind, History};
pub use intent::Intent;
pub use notes::NoteEditor;
pub use router::{NewTransition, TransitionEdit, TransitionRouter};

// =============================================================================
// RE-EXPORTS: Platform and Formats
// =============================================================================

pub use formats::interchange::{InterchangeDocument, StateFragment};
pub use formats::persistence::{SnapshotHeader, elements_from_bytes, elements_to_bytes};
pub use platform::{ComponentType, Entry, PlatformBinding, PlatformCatalogue, PlatformRegistry};
