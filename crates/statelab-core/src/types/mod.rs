//! # Core Type Definitions
//!
//! This module contains all entity types of a statelab document:
//! - Identifiers (`StateId`, `TransitionId`, `NoteId`)
//! - Geometry (`Point`, `Rect`)
//! - Labels (`Trigger`, `Action`, `EventData`, `Condition`)
//! - Entities (`State`, `Transition`, `Note`, `Component`)
//! - The serializable element set (`Elements`)
//! - Error types (`StatelabError`)
//!
//! ## Determinism Guarantees
//!
//! All keyed collections are `BTreeMap`/`BTreeSet`, so every enumeration
//! (auto-parenting scans, serialization, cascades) follows identifier order.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier of a state.
    StateId
);

string_id!(
    /// Unique identifier of a transition.
    TransitionId
);

string_id!(
    /// Unique identifier of a note.
    NoteId
);

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by another point.
    #[must_use]
    pub fn offset(self, by: Point) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// An axis-aligned rectangle.
///
/// For states, `x`/`y` are relative to the parent's child-area origin
/// (or absolute for root states).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Same size, new top-left corner.
    #[must_use]
    pub fn with_origin(self, origin: Point) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            ..self
        }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

// =============================================================================
// LABEL COMPONENTS
// =============================================================================

/// Ordered argument map of a trigger, action or variable.
pub type Args = BTreeMap<String, String>;

/// The event of a component that fires a transition or a state event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub component: String,
    pub method: String,
    #[serde(default)]
    pub args: Args,
}

impl Trigger {
    #[must_use]
    pub fn new(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            method: method.into(),
            args: Args::new(),
        }
    }
}

/// A call to a component method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub component: String,
    pub method: String,
    #[serde(default)]
    pub args: Args,
}

impl Action {
    #[must_use]
    pub fn new(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            method: method.into(),
            args: Args::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// One entry of a state's event list: `trigger → ordered actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub trigger: Trigger,
    #[serde(rename = "do", default)]
    pub actions: Vec<Action>,
}

impl EventData {
    #[must_use]
    pub fn new(trigger: Trigger, actions: Vec<Action>) -> Self {
        Self { trigger, actions }
    }
}

/// A component variable read inside a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub component: String,
    pub method: String,
    #[serde(default)]
    pub args: Args,
}

impl Variable {
    #[must_use]
    pub fn new(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            method: method.into(),
            args: Args::new(),
        }
    }
}

/// Operators available in condition expression trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    And,
    Or,
}

impl Operator {
    /// Infix symbol used in human-readable renderings.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// A condition expression tree.
///
/// Serialized as `{"type": <tag>, "value": <payload>}`. Operator nodes hold
/// an ordered list of child conditions; their children can only be
/// literals, variables or further operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Condition {
    /// A literal value.
    Value(String),
    /// A component variable reference.
    Component(Variable),
    Equals(Vec<Condition>),
    NotEquals(Vec<Condition>),
    Greater(Vec<Condition>),
    Less(Vec<Condition>),
    GreaterOrEqual(Vec<Condition>),
    LessOrEqual(Vec<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    /// Build an operator node.
    #[must_use]
    pub fn operator(op: Operator, operands: Vec<Condition>) -> Self {
        match op {
            Operator::Equals => Self::Equals(operands),
            Operator::NotEquals => Self::NotEquals(operands),
            Operator::Greater => Self::Greater(operands),
            Operator::Less => Self::Less(operands),
            Operator::GreaterOrEqual => Self::GreaterOrEqual(operands),
            Operator::LessOrEqual => Self::LessOrEqual(operands),
            Operator::And => Self::And(operands),
            Operator::Or => Self::Or(operands),
        }
    }

    /// Literal shorthand.
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    /// Variable shorthand.
    #[must_use]
    pub fn variable(component: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Component(Variable::new(component, method))
    }

    /// The operator of an operator node, `None` for leaves.
    #[must_use]
    pub fn op(&self) -> Option<Operator> {
        match self {
            Self::Value(_) | Self::Component(_) => None,
            Self::Equals(_) => Some(Operator::Equals),
            Self::NotEquals(_) => Some(Operator::NotEquals),
            Self::Greater(_) => Some(Operator::Greater),
            Self::Less(_) => Some(Operator::Less),
            Self::GreaterOrEqual(_) => Some(Operator::GreaterOrEqual),
            Self::LessOrEqual(_) => Some(Operator::LessOrEqual),
            Self::And(_) => Some(Operator::And),
            Self::Or(_) => Some(Operator::Or),
        }
    }

    /// Child conditions (empty for leaves).
    #[must_use]
    pub fn operands(&self) -> &[Condition] {
        match self {
            Self::Value(_) | Self::Component(_) => &[],
            Self::Equals(c)
            | Self::NotEquals(c)
            | Self::Greater(c)
            | Self::Less(c)
            | Self::GreaterOrEqual(c)
            | Self::LessOrEqual(c)
            | Self::And(c)
            | Self::Or(c) => c,
        }
    }

    fn operands_mut(&mut self) -> &mut [Condition] {
        match self {
            Self::Value(_) | Self::Component(_) => &mut [],
            Self::Equals(c)
            | Self::NotEquals(c)
            | Self::Greater(c)
            | Self::Less(c)
            | Self::GreaterOrEqual(c)
            | Self::LessOrEqual(c)
            | Self::And(c)
            | Self::Or(c) => c,
        }
    }

    /// Visit every variable reference in the tree, depth first.
    pub fn for_each_variable(&self, f: &mut impl FnMut(&Variable)) {
        match self {
            Self::Value(_) => {}
            Self::Component(var) => f(var),
            _ => {
                for child in self.operands() {
                    child.for_each_variable(f);
                }
            }
        }
    }

    /// Visit every variable reference in the tree mutably, depth first.
    pub fn for_each_variable_mut(&mut self, f: &mut impl FnMut(&mut Variable)) {
        match self {
            Self::Value(_) => {}
            Self::Component(var) => f(var),
            _ => {
                for child in self.operands_mut() {
                    child.for_each_variable_mut(f);
                }
            }
        }
    }

    /// Human-readable infix rendering, e.g. `(Button1.count > 5)`.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Value(v) => v.clone(),
            Self::Component(var) => format!("{}.{}", var.component, var.method),
            _ => {
                let symbol = self.op().map(Operator::symbol).unwrap_or_default();
                let parts: Vec<String> = self.operands().iter().map(Self::render).collect();
                format!("({})", parts.join(&format!(" {} ", symbol)))
            }
        }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A state of the machine. Composite when it has children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    /// Bounds relative to the parent's child-area origin.
    pub bounds: Rect,
    #[serde(default)]
    pub parent: Option<StateId>,
    #[serde(default)]
    pub children: BTreeSet<StateId>,
    #[serde(default)]
    pub events: Vec<EventData>,
    /// UI selection flag. Transient.
    #[serde(default)]
    pub selection: bool,
}

impl State {
    #[must_use]
    pub fn new(name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            bounds,
            parent: None,
            children: BTreeSet::new(),
            events: Vec::new(),
            selection: false,
        }
    }

    /// Whether this state contains other states.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Label of a transition: trigger, guard, actions and presentation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionLabel {
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(rename = "do", default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Point,
    /// UI selection flag. Transient.
    #[serde(default)]
    pub selection: bool,
}

impl TransitionLabel {
    /// Text rendering: `Component.method [guard] / Comp.act(); ...`
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(trigger) = &self.trigger {
            parts.push(format!("{}.{}", trigger.component, trigger.method));
        }
        if let Some(condition) = &self.condition {
            parts.push(format!("[{}]", condition.render()));
        }
        if !self.actions.is_empty() {
            let actions: Vec<String> = self
                .actions
                .iter()
                .map(|a| format!("{}.{}()", a.component, a.method))
                .collect();
            parts.push(format!("/ {}", actions.join("; ")));
        }
        parts.join(" ")
    }
}

/// A transition between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub source: StateId,
    pub target: StateId,
    #[serde(default)]
    pub label: Option<TransitionLabel>,
}

/// A free-text canvas note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub position: Point,
}

/// An instance of a platform component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Component {
    #[must_use]
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            parameters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// ELEMENTS (the persisted document content)
// =============================================================================

/// Every persisted element of a document.
///
/// This is the plain structured form: save/open round-trips go through it
/// unchanged. Two documents are object-equal when their `Elements` are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elements {
    pub platform: String,
    #[serde(default)]
    pub initial_state: Option<StateId>,
    #[serde(default)]
    pub states: BTreeMap<StateId, State>,
    #[serde(default)]
    pub transitions: BTreeMap<TransitionId, Transition>,
    #[serde(default)]
    pub notes: BTreeMap<NoteId, Note>,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
}

impl Elements {
    /// Empty element set for a platform.
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            initial_state: None,
            states: BTreeMap::new(),
            transitions: BTreeMap::new(),
            notes: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Kinds of addressable entities, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    State,
    Transition,
    Note,
    Component,
    Event,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "state",
            Self::Transition => "transition",
            Self::Note => "note",
            Self::Component => "component",
            Self::Event => "event",
        })
    }
}

/// Errors that can occur in the statelab engine.
///
/// - No silent failures: rejected operations leave the document untouched
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum StatelabError {
    /// The document is malformed or internally inconsistent.
    #[error("Structural error: {0}")]
    Structural(String),

    /// An operation named an entity that does not exist.
    #[error("Unknown {kind}: {id}")]
    UnknownReference { kind: EntityKind, id: String },

    /// The document names a platform that no catalogue supplies.
    #[error("Platform not available: {0}")]
    PlatformResolution(String),

    /// A component type is not part of the platform catalogue.
    #[error("Unknown component type '{type_id}' on platform '{platform}'")]
    UnknownComponentType { platform: String, type_id: String },

    /// A component with this name already exists.
    #[error("Component already exists: {0}")]
    DuplicateComponent(String),

    /// An entity with this identifier already exists.
    #[error("Identifier already in use: {0}")]
    DuplicateId(String),

    /// Linking would place a state inside itself or its own subtree.
    #[error("Cannot nest state {child} inside {parent}: containment would form a cycle")]
    CyclicContainment { parent: StateId, child: StateId },

    /// Linking would nest some state deeper than the nesting limit.
    #[error("Cannot nest inside {parent}: nesting would reach depth {depth}")]
    NestingTooDeep { parent: StateId, depth: usize },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl StatelabError {
    pub(crate) fn unknown_state(id: &StateId) -> Self {
        Self::UnknownReference {
            kind: EntityKind::State,
            id: id.to_string(),
        }
    }

    pub(crate) fn unknown_transition(id: &TransitionId) -> Self {
        Self::UnknownReference {
            kind: EntityKind::Transition,
            id: id.to_string(),
        }
    }

    pub(crate) fn unknown_note(id: &NoteId) -> Self {
        Self::UnknownReference {
            kind: EntityKind::Note,
            id: id.to_string(),
        }
    }

    pub(crate) fn unknown_component(name: &str) -> Self {
        Self::UnknownReference {
            kind: EntityKind::Component,
            id: name.to_string(),
        }
    }

    pub(crate) fn unknown_event(state: &StateId, index: usize) -> Self {
        Self::UnknownReference {
            kind: EntityKind::Event,
            id: format!("{state}#{index}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_inclusive() {
        let rect = Rect::new(0.0, 0.0, 100.0, 60.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(100.0, 60.0)));
        assert!(!rect.contains(Point::new(100.5, 10.0)));
        assert!(!rect.contains(Point::new(-1.0, 10.0)));
    }

    #[test]
    fn condition_serializes_with_type_and_value() {
        let cond = Condition::operator(
            Operator::Greater,
            vec![Condition::variable("Counter1", "value"), Condition::value("5")],
        );
        let json = serde_json::to_value(&cond).expect("serialize");

        assert_eq!(json["type"], "greater");
        assert_eq!(json["value"][0]["type"], "component");
        assert_eq!(json["value"][0]["value"]["component"], "Counter1");
        assert_eq!(json["value"][1]["type"], "value");
        assert_eq!(json["value"][1]["value"], "5");

        let back: Condition = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, cond);
    }

    #[test]
    fn condition_rejects_unknown_tag() {
        let json = r#"{"type":"xor","value":[]}"#;
        assert!(serde_json::from_str::<Condition>(json).is_err());
    }

    #[test]
    fn condition_visits_nested_variables() {
        let mut cond = Condition::operator(
            Operator::And,
            vec![
                Condition::operator(
                    Operator::Equals,
                    vec![Condition::variable("Led1", "state"), Condition::value("1")],
                ),
                Condition::variable("Led1", "level"),
            ],
        );

        let mut seen = Vec::new();
        cond.for_each_variable(&mut |v| seen.push(v.method.clone()));
        assert_eq!(seen, vec!["state".to_string(), "level".to_string()]);

        cond.for_each_variable_mut(&mut |v| v.component = "Led2".to_string());
        let mut components = Vec::new();
        cond.for_each_variable(&mut |v| components.push(v.component.clone()));
        assert!(components.iter().all(|c| c == "Led2"));
    }

    #[test]
    fn condition_render_is_infix() {
        let cond = Condition::operator(
            Operator::LessOrEqual,
            vec![Condition::variable("Timer", "elapsed"), Condition::value("10")],
        );
        assert_eq!(cond.render(), "(Timer.elapsed <= 10)");
    }

    #[test]
    fn label_describe_lists_parts() {
        let label = TransitionLabel {
            trigger: Some(Trigger::new("Button1", "clicked")),
            condition: Some(Condition::value("true")),
            actions: vec![Action::new("Led1", "on")],
            ..TransitionLabel::default()
        };
        assert_eq!(label.describe(), "Button1.clicked [true] / Led1.on()");
    }

    #[test]
    fn state_fields_default_when_absent() {
        let json = r#"{"name": "Idle", "bounds": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}}"#;
        let state: State = serde_json::from_str(json).expect("deserialize");
        assert_eq!(state, State::new("Idle", Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert!(!state.is_composite());
    }

    #[test]
    fn error_messages_name_the_entity() {
        let err = StatelabError::unknown_state(&StateId::new("state-000009"));
        assert_eq!(err.to_string(), "Unknown state: state-000009");
    }
}
