//! # Platform Binding
//!
//! Read-only metadata about the component types a target platform offers:
//! their events (trigger signals), actions (callable methods) and
//! variables. The engine consumes this; it never mutates it.
//!
//! [`PlatformCatalogue`] is the data-driven binding, deserializable from
//! any serde format. [`PlatformRegistry`] maps platform identifiers to
//! bindings and is constructed explicitly by whoever owns the editor.

use crate::document::Document;
use crate::primitives::BUILTIN_PLATFORM;
use crate::{Condition, StatelabError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A named platform member with a human description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Entry {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Metadata source for one platform.
pub trait PlatformBinding {
    /// Platform identifier, as stored in documents.
    fn id(&self) -> &str;

    /// Component type identifiers, sorted.
    fn component_types(&self) -> Vec<String>;

    fn events(&self, type_id: &str) -> Vec<Entry>;

    fn actions(&self, type_id: &str) -> Vec<Entry>;

    fn variables(&self, type_id: &str) -> Vec<Entry>;

    /// Singleton types may be instantiated at most once per document.
    fn is_singleton(&self, _type_id: &str) -> bool {
        false
    }

    fn has_component_type(&self, type_id: &str) -> bool {
        self.component_types().iter().any(|t| t == type_id)
    }
}

/// One component type of a catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentType {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub singleton: bool,
    #[serde(default)]
    pub parameters: Vec<Entry>,
    #[serde(default)]
    pub signals: Vec<Entry>,
    #[serde(default)]
    pub methods: Vec<Entry>,
    #[serde(default)]
    pub variables: Vec<Entry>,
}

/// Data-driven platform binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCatalogue {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentType>,
}

impl PlatformCatalogue {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            components: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_component(mut self, type_id: impl Into<String>, component: ComponentType) -> Self {
        self.components.insert(type_id.into(), component);
        self
    }

    /// The catalogue always available without configuration.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = |list: &[(&str, &str)]| -> Vec<Entry> {
            list.iter().map(|(n, d)| Entry::new(*n, *d)).collect()
        };
        Self::new(BUILTIN_PLATFORM)
            .with_component(
                "System",
                ComponentType {
                    description: "State lifecycle".to_string(),
                    singleton: true,
                    signals: entries(&[("onEnter", "State entered"), ("onExit", "State left")]),
                    ..ComponentType::default()
                },
            )
            .with_component(
                "Timer",
                ComponentType {
                    description: "Software timer".to_string(),
                    parameters: entries(&[("interval", "Period in milliseconds")]),
                    signals: entries(&[("timeout", "Period elapsed")]),
                    methods: entries(&[
                        ("start", "Start counting"),
                        ("stop", "Stop counting"),
                        ("reset", "Restart from zero"),
                    ]),
                    variables: entries(&[("elapsed", "Milliseconds since start")]),
                    ..ComponentType::default()
                },
            )
            .with_component(
                "Led",
                ComponentType {
                    description: "Digital output".to_string(),
                    parameters: entries(&[("pin", "Output pin")]),
                    methods: entries(&[
                        ("on", "Drive high"),
                        ("off", "Drive low"),
                        ("toggle", "Invert"),
                    ]),
                    variables: entries(&[("value", "Current level")]),
                    ..ComponentType::default()
                },
            )
            .with_component(
                "Button",
                ComponentType {
                    description: "Digital input".to_string(),
                    parameters: entries(&[("pin", "Input pin")]),
                    signals: entries(&[("clicked", "Pressed and released"), ("pressed", "Pressed")]),
                    variables: entries(&[("isPressed", "Current level")]),
                    ..ComponentType::default()
                },
            )
            .with_component(
                "Counter",
                ComponentType {
                    description: "Integer accumulator".to_string(),
                    methods: entries(&[
                        ("add", "Increase by value"),
                        ("sub", "Decrease by value"),
                        ("reset", "Set to zero"),
                    ]),
                    variables: entries(&[("value", "Current count")]),
                    ..ComponentType::default()
                },
            )
    }

    fn members(&self, type_id: &str, pick: impl Fn(&ComponentType) -> &Vec<Entry>) -> Vec<Entry> {
        self.components
            .get(type_id)
            .map(|c| pick(c).clone())
            .unwrap_or_default()
    }
}

impl PlatformBinding for PlatformCatalogue {
    fn id(&self) -> &str {
        &self.id
    }

    fn component_types(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    fn events(&self, type_id: &str) -> Vec<Entry> {
        self.members(type_id, |c| &c.signals)
    }

    fn actions(&self, type_id: &str) -> Vec<Entry> {
        self.members(type_id, |c| &c.methods)
    }

    fn variables(&self, type_id: &str) -> Vec<Entry> {
        self.members(type_id, |c| &c.variables)
    }

    fn is_singleton(&self, type_id: &str) -> bool {
        self.components.get(type_id).is_some_and(|c| c.singleton)
    }

    fn has_component_type(&self, type_id: &str) -> bool {
        self.components.contains_key(type_id)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Platform identifiers mapped to bindings.
#[derive(Default)]
pub struct PlatformRegistry {
    bindings: BTreeMap<String, Box<dyn PlatformBinding>>,
}

impl fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformRegistry")
            .field("platforms", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PlatformRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalogue.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PlatformCatalogue::builtin());
        registry
    }

    /// Register a binding, replacing any binding with the same id.
    pub fn register(&mut self, binding: impl PlatformBinding + 'static) {
        let id = binding.id().to_string();
        if self.bindings.contains_key(&id) {
            tracing::warn!(platform = %id, "replacing registered platform");
        }
        self.bindings.insert(id, Box::new(binding));
    }

    pub fn resolve(&self, id: &str) -> Result<&dyn PlatformBinding, StatelabError> {
        self.bindings
            .get(id)
            .map(|binding| binding.as_ref())
            .ok_or_else(|| StatelabError::PlatformResolution(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// =============================================================================
// DOCUMENT QUERIES
// =============================================================================

/// Component types that can still be added to the document: every type
/// except singletons already instantiated.
#[must_use]
pub fn vacant_components(platform: &dyn PlatformBinding, doc: &Document) -> Vec<String> {
    let used: BTreeSet<&str> = doc
        .components()
        .map(|(_, component)| component.type_id.as_str())
        .collect();
    platform
        .component_types()
        .into_iter()
        .filter(|t| !(platform.is_singleton(t) && used.contains(t.as_str())))
        .collect()
}

/// Report triggers, actions and condition variables that name unknown
/// components or members. An empty report means every reference resolves.
#[must_use]
pub fn check_references(platform: &dyn PlatformBinding, doc: &Document) -> Vec<String> {
    let mut problems = Vec::new();

    // A name resolves to a document component, or to a platform type used
    // directly (singleton style).
    let type_of = |name: &str| -> Option<String> {
        doc.component(name)
            .map(|c| c.type_id.clone())
            .or_else(|| platform.has_component_type(name).then(|| name.to_string()))
    };
    let mut check = |place: &str, component: &str, method: &str, kind: Member| {
        let Some(type_id) = type_of(component) else {
            problems.push(format!("{place}: unknown component '{component}'"));
            return;
        };
        let members = match kind {
            Member::Event => platform.events(&type_id),
            Member::Action => platform.actions(&type_id),
            Member::Variable => platform.variables(&type_id),
        };
        if !members.iter().any(|m| m.name == method) {
            problems.push(format!(
                "{place}: '{type_id}' has no {kind} '{method}' (via '{component}')"
            ));
        }
    };

    for (id, state) in doc.states() {
        for (index, event) in state.events.iter().enumerate() {
            let place = format!("state {id} event {index}");
            check(&place, &event.trigger.component, &event.trigger.method, Member::Event);
            for action in &event.actions {
                check(&place, &action.component, &action.method, Member::Action);
            }
        }
    }
    for (id, transition) in doc.transitions() {
        let Some(label) = &transition.label else {
            continue;
        };
        let place = format!("transition {id}");
        if let Some(trigger) = &label.trigger {
            check(&place, &trigger.component, &trigger.method, Member::Event);
        }
        for action in &label.actions {
            check(&place, &action.component, &action.method, Member::Action);
        }
        if let Some(condition) = &label.condition {
            visit_variables(condition, &mut |component, method| {
                check(&place, component, method, Member::Variable);
            });
        }
    }
    problems
}

fn visit_variables(condition: &Condition, f: &mut impl FnMut(&str, &str)) {
    condition.for_each_variable(&mut |var| f(&var.component, &var.method));
}

#[derive(Clone, Copy)]
enum Member {
    Event,
    Action,
    Variable,
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Event => "event",
            Self::Action => "action",
            Self::Variable => "variable",
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
