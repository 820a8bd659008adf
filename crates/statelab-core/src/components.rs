//! # Components
//!
//! Component instances of the document and the propagation of component
//! renames and removals into every place that names a component:
//!
//! - state event triggers and actions;
//! - transition triggers and actions;
//! - variables anywhere inside transition guard conditions.

use crate::document::Document;
use crate::platform::PlatformBinding;
use crate::{Args, Component, EventData, StateId, StatelabError, TransitionId, TransitionLabel};

pub struct ComponentEditor;

impl ComponentEditor {
    /// Instantiate a platform component type under a unique name.
    pub fn add_component(
        doc: &mut Document,
        platform: &dyn PlatformBinding,
        name: &str,
        type_id: &str,
        parameters: Args,
    ) -> Result<(), StatelabError> {
        if !platform.has_component_type(type_id) {
            return Err(StatelabError::UnknownComponentType {
                platform: platform.id().to_string(),
                type_id: type_id.to_string(),
            });
        }
        if doc.component(name).is_some() {
            return Err(StatelabError::DuplicateComponent(name.to_string()));
        }
        if platform.is_singleton(type_id) && doc.components().any(|(_, c)| c.type_id == type_id) {
            return Err(StatelabError::DuplicateComponent(type_id.to_string()));
        }
        doc.insert_component(
            name.to_string(),
            Component {
                type_id: type_id.to_string(),
                parameters,
            },
        );
        tracing::debug!(component = name, type_id, "component added");
        Ok(())
    }

    /// Replace a component's parameters and optionally rename it.
    pub fn edit_component(
        doc: &mut Document,
        name: &str,
        parameters: Args,
        new_name: Option<&str>,
    ) -> Result<(), StatelabError> {
        if let Some(new_name) = new_name {
            if new_name != name && doc.component(new_name).is_some() {
                return Err(StatelabError::DuplicateComponent(new_name.to_string()));
            }
        }
        let component = doc
            .component_mut(name)
            .ok_or_else(|| StatelabError::unknown_component(name))?;
        component.parameters = parameters;

        match new_name {
            Some(new_name) if new_name != name => Self::rename_component(doc, name, new_name),
            _ => Ok(()),
        }
    }

    /// Rename a component and rewrite every reference to it.
    pub fn rename_component(
        doc: &mut Document,
        name: &str,
        new_name: &str,
    ) -> Result<(), StatelabError> {
        if doc.component(new_name).is_some() {
            return Err(StatelabError::DuplicateComponent(new_name.to_string()));
        }
        let component = doc
            .remove_component(name)
            .ok_or_else(|| StatelabError::unknown_component(name))?;
        doc.insert_component(new_name.to_string(), component);

        let mut touched = 0usize;
        for id in Self::states_naming(doc, name) {
            if let Some(state) = doc.state_mut(&id) {
                for event in &mut state.events {
                    rename_in_event(event, name, new_name);
                }
                touched += 1;
            }
        }
        for id in Self::transitions_naming(doc, name) {
            if let Some(label) = doc.transition_mut(&id).and_then(|t| t.label.as_mut()) {
                rename_in_label(label, name, new_name);
                touched += 1;
            }
        }
        tracing::debug!(from = name, to = new_name, touched, "component renamed");
        Ok(())
    }

    /// Remove a component. With `purge`, also drop every event entry,
    /// action, trigger and guard that names it.
    pub fn remove_component(
        doc: &mut Document,
        name: &str,
        purge: bool,
    ) -> Result<Component, StatelabError> {
        let removed = doc
            .remove_component(name)
            .ok_or_else(|| StatelabError::unknown_component(name))?;
        if purge {
            for id in Self::states_naming(doc, name) {
                if let Some(state) = doc.state_mut(&id) {
                    state.events.retain(|e| e.trigger.component != name);
                    for event in &mut state.events {
                        event.actions.retain(|a| a.component != name);
                    }
                }
            }
            for id in Self::transitions_naming(doc, name) {
                if let Some(label) = doc.transition_mut(&id).and_then(|t| t.label.as_mut()) {
                    if label.trigger.as_ref().is_some_and(|t| t.component == name) {
                        label.trigger = None;
                    }
                    label.actions.retain(|a| a.component != name);
                    if label.condition.as_ref().is_some_and(|c| condition_names(c, name)) {
                        label.condition = None;
                    }
                }
            }
        }
        tracing::debug!(component = name, purge, "component removed");
        Ok(removed)
    }

    /// States with an event trigger or action naming `component`.
    #[must_use]
    pub fn states_naming(doc: &Document, component: &str) -> Vec<StateId> {
        doc.states()
            .filter(|(_, s)| s.events.iter().any(|e| event_names(e, component)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Transitions whose label names `component` anywhere.
    #[must_use]
    pub fn transitions_naming(doc: &Document, component: &str) -> Vec<TransitionId> {
        doc.transitions()
            .filter(|(_, t)| t.label.as_ref().is_some_and(|l| label_names(l, component)))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn event_names(event: &EventData, component: &str) -> bool {
    event.trigger.component == component || event.actions.iter().any(|a| a.component == component)
}

fn label_names(label: &TransitionLabel, component: &str) -> bool {
    label.trigger.as_ref().is_some_and(|t| t.component == component)
        || label.actions.iter().any(|a| a.component == component)
        || label
            .condition
            .as_ref()
            .is_some_and(|c| condition_names(c, component))
}

fn condition_names(condition: &crate::Condition, component: &str) -> bool {
    let mut found = false;
    condition.for_each_variable(&mut |var| found |= var.component == component);
    found
}

fn rename_in_event(event: &mut EventData, name: &str, new_name: &str) {
    if event.trigger.component == name {
        event.trigger.component = new_name.to_string();
    }
    for action in &mut event.actions {
        if action.component == name {
            action.component = new_name.to_string();
        }
    }
}

fn rename_in_label(label: &mut TransitionLabel, name: &str, new_name: &str) {
    if let Some(trigger) = &mut label.trigger {
        if trigger.component == name {
            trigger.component = new_name.to_string();
        }
    }
    for action in &mut label.actions {
        if action.component == name {
            action.component = new_name.to_string();
        }
    }
    if let Some(condition) = &mut label.condition {
        condition.for_each_variable_mut(&mut |var| {
            if var.component == name {
                var.component = new_name.to_string();
            }
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
