//! Extraction of partial updates from an abstract widget tree.
//!
//! The container never touches a real UI toolkit; it consumes events and
//! widget subtrees through this module's abstract shapes. An [`Element`]
//! carries an optional `name` (a dotted state path), an optional string
//! `value`, a [`Control`] kind, and children. [`extract`] collapses every
//! named element under a root into one partial update; [`to_data`] and
//! [`to_name`] convert a single change or click event into a partial
//! update or an action name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::merge::merge;
use crate::path::{expand, Path};

/// What kind of widget an [`Element`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    /// Free-form input; its value is committed as-is.
    Text,
    /// One member of a checkbox group; groups aggregate checked values.
    Checkbox { checked: bool },
    /// One member of a radio group; the checked member's value wins.
    Radio { checked: bool },
    /// A clickable control; its name doubles as an action name.
    Button,
    /// A nameless structural node holding children.
    Group,
}

/// A node in the abstract widget tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: Option<String>,
    pub value: Option<String>,
    pub control: Control,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn group(children: Vec<Element>) -> Self {
        Self {
            name: None,
            value: None,
            control: Control::Group,
            children,
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            control: Control::Text,
            children: Vec::new(),
        }
    }

    pub fn checkbox(name: &str, value: &str, checked: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            control: Control::Checkbox { checked },
            children: Vec::new(),
        }
    }

    pub fn radio(name: &str, value: &str, checked: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            control: Control::Radio { checked },
            children: Vec::new(),
        }
    }

    pub fn button(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            value: None,
            control: Control::Button,
            children: Vec::new(),
        }
    }

    fn named_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// An input event: something happened on a target element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub target: Element,
}

impl InputEvent {
    pub fn new(target: Element) -> Self {
        Self { target }
    }
}

/// Collapse every named element under `root` into one partial update.
///
/// Dotted names expand into nested objects. Checkbox groups sharing a
/// name aggregate the values of their checked members into an array;
/// radio groups yield the single checked value (nothing when none is
/// checked); other controls contribute their value, last one winning.
pub fn extract(root: &Element) -> Value {
    let mut named = Vec::new();
    collect_named(root, &mut named);

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Element>> = HashMap::new();
    for element in named {
        let name = match element.named_name() {
            Some(name) => name,
            None => continue,
        };
        if !groups.contains_key(name) {
            order.push(name);
        }
        groups.entry(name).or_default().push(element);
    }

    let mut result = Value::Object(Map::new());
    for name in order {
        let value = match group_value(&groups[name]) {
            Some(value) => value,
            None => continue,
        };
        let path = match Path::parse(name) {
            Ok(path) => path,
            Err(err) => {
                debug!(name, %err, "skipping element with unparseable name");
                continue;
            }
        };
        merge(&mut result, expand(&path, value));
    }
    result
}

fn collect_named<'a>(element: &'a Element, named: &mut Vec<&'a Element>) {
    if element.named_name().is_some() {
        named.push(element);
    }
    for child in &element.children {
        collect_named(child, named);
    }
}

fn group_value(members: &[&Element]) -> Option<Value> {
    if members
        .iter()
        .any(|member| matches!(member.control, Control::Checkbox { .. }))
    {
        let checked: Vec<Value> = members
            .iter()
            .filter(|member| matches!(member.control, Control::Checkbox { checked: true }))
            .map(|member| Value::String(member.value.clone().unwrap_or_default()))
            .collect();
        return Some(Value::Array(checked));
    }
    if members
        .iter()
        .any(|member| matches!(member.control, Control::Radio { .. }))
    {
        return members
            .iter()
            .find(|member| matches!(member.control, Control::Radio { checked: true }))
            .map(|member| Value::String(member.value.clone().unwrap_or_default()));
    }
    members
        .last()
        .map(|member| Value::String(member.value.clone().unwrap_or_default()))
}

/// Convert a change event into a partial update, `None` when the target
/// carries no name.
///
/// A single event only sees its own target; checkbox/radio group
/// aggregation is [`extract`]'s job over a whole subtree.
pub fn to_data(event: &InputEvent) -> Option<Value> {
    let name = event.target.named_name()?;
    let path = match Path::parse(name) {
        Ok(path) => path,
        Err(err) => {
            debug!(name, %err, "event target has unparseable name");
            return None;
        }
    };
    let value = event.target.value.clone().unwrap_or_default();
    Some(expand(&path, Value::String(value)))
}

/// Resolve a click event to an action name, `None` when the target
/// carries no name.
pub fn to_name(event: &InputEvent) -> Option<String> {
    event.target.named_name().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_fields_with_dotted_names() {
        let root = Element::group(vec![
            Element::text("person.first", "John"),
            Element::text("person.last", "Doe"),
            Element::text("city", "Oslo"),
        ]);
        assert_eq!(
            extract(&root),
            json!({"person": {"first": "John", "last": "Doe"}, "city": "Oslo"})
        );
    }

    #[test]
    fn test_extract_aggregates_checked_checkboxes() {
        let root = Element::group(vec![
            Element::checkbox("fruit", "Apple", true),
            Element::checkbox("fruit", "Orange", true),
            Element::checkbox("fruit", "Grape", false),
        ]);
        assert_eq!(extract(&root), json!({"fruit": ["Apple", "Orange"]}));
    }

    #[test]
    fn test_extract_unchecked_checkbox_group_yields_empty_array() {
        let root = Element::group(vec![Element::checkbox("fruit", "Apple", false)]);
        assert_eq!(extract(&root), json!({"fruit": []}));
    }

    #[test]
    fn test_extract_radio_group_yields_checked_value() {
        let root = Element::group(vec![
            Element::radio("size", "S", false),
            Element::radio("size", "M", true),
            Element::radio("size", "L", false),
        ]);
        assert_eq!(extract(&root), json!({"size": "M"}));
    }

    #[test]
    fn test_extract_radio_group_without_checked_member_is_absent() {
        let root = Element::group(vec![
            Element::radio("size", "S", false),
            Element::radio("size", "L", false),
        ]);
        assert_eq!(extract(&root), json!({}));
    }

    #[test]
    fn test_extract_ignores_nameless_elements() {
        let root = Element::group(vec![Element {
            name: None,
            value: Some("orphan".to_string()),
            control: Control::Text,
            children: Vec::new(),
        }]);
        assert_eq!(extract(&root), json!({}));
    }

    #[test]
    fn test_extract_last_text_value_wins() {
        let root = Element::group(vec![
            Element::text("city", "Oslo"),
            Element::text("city", "Bergen"),
        ]);
        assert_eq!(extract(&root), json!({"city": "Bergen"}));
    }

    #[test]
    fn test_to_data_expands_dotted_name() {
        let event = InputEvent::new(Element::text("person.first", "john"));
        assert_eq!(to_data(&event), Some(json!({"person": {"first": "john"}})));
    }

    #[test]
    fn test_to_data_without_name_is_none() {
        let event = InputEvent::new(Element::group(Vec::new()));
        assert_eq!(to_data(&event), None);
    }

    #[test]
    fn test_to_name_reads_target_name() {
        let event = InputEvent::new(Element::button("countUp"));
        assert_eq!(to_name(&event).as_deref(), Some("countUp"));

        let anonymous = InputEvent::new(Element::group(Vec::new()));
        assert_eq!(to_name(&anonymous), None);
    }
}
