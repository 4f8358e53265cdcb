//! Prop application shared by the materializer (set) and the diff engine (patch/revert)
use crate::dom::{Host, NodeId, dataset_key};
use crate::event_manager::EventManager;
use crate::types::{PropValue, Props};
use log::{debug, warn};
use phf::phf_map;

/// Boolean props whose presence attribute is toggled alongside the live property.
static PRESENCE_ATTRIBUTES: phf::Map<&'static str, &'static str> = phf_map! {
    "disabled" => "disabled",
    "readOnly" => "readonly",
};

pub const CLASS_ALIAS: &str = "className";
pub const STYLE_KEY: &str = "style";
const DATA_PREFIX: &str = "data-";

/// `onClick`, `onKeyDown`, ... : "on" followed by an uppercase letter.
pub fn is_event_prop(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// `onClick` → `click`
pub fn event_name(key: &str) -> String {
    key[2..].to_lowercase()
}

/// Apply every prop of a freshly created element.
pub fn set_attributes<H: Host + ?Sized>(host: &mut H, events: &EventManager, node: NodeId, props: &Props) {
    for (key, value) in props {
        apply_prop(host, events, node, key, value, None);
    }
}

/// Bring `node` from `old_props` to `new_props`. Returns the keys that were touched.
pub fn patch_attributes<H: Host + ?Sized>(
    host: &mut H,
    events: &EventManager,
    node: NodeId,
    new_props: &Props,
    old_props: &Props,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, value) in new_props {
        let previous = old_props.get(key);
        if previous == Some(value) {
            continue;
        }
        apply_prop(host, events, node, key, value, previous);
        changed.push(key.clone());
    }

    for (key, old_value) in old_props {
        if !new_props.contains_key(key) {
            revert_prop(host, events, node, key, old_value);
            changed.push(key.clone());
        }
    }

    changed
}

/// Write one prop. `previous` is the value being replaced, if any.
pub fn apply_prop<H: Host + ?Sized>(
    host: &mut H,
    events: &EventManager,
    node: NodeId,
    key: &str,
    value: &PropValue,
    previous: Option<&PropValue>,
) {
    if is_event_prop(key) {
        let name = event_name(key);
        if let Some(PropValue::Handler(old)) = previous {
            events.remove_event(node, &name, old);
        }
        match value {
            PropValue::Handler(handler) => events.add_event(node, &name, handler.clone()),
            PropValue::Null => {}
            other => warn!("ignoring non-handler value {:?} for event prop '{}'", other, key),
        }
        return;
    }

    if key == CLASS_ALIAS {
        match value.to_attribute_value() {
            Some(class) if value.is_truthy() => host.set_attribute(node, "class", &class),
            _ => host.remove_attribute(node, "class"),
        }
        return;
    }

    if key == STYLE_KEY {
        if let PropValue::Style(styles) = value {
            match previous {
                Some(PropValue::Style(old_styles)) => {
                    for name in old_styles.keys().filter(|k| !styles.contains_key(*k)) {
                        host.set_style(node, name, "");
                    }
                }
                Some(PropValue::Null) | None => {}
                Some(_) => host.remove_attribute(node, STYLE_KEY),
            }
            for (name, style_value) in styles {
                host.set_style(node, name, style_value);
            }
            return;
        }
    }

    if key.starts_with(DATA_PREFIX) {
        match value.to_attribute_value() {
            Some(text) => host.set_dataset(node, &dataset_key(key), &text),
            None => host.remove_dataset(node, &dataset_key(key)),
        }
        return;
    }

    match (value, previous) {
        (PropValue::Bool(flag), _) => {
            set_boolean(host, node, key, *flag);
            return;
        }
        (PropValue::Null, Some(PropValue::Bool(_))) => {
            set_boolean(host, node, key, false);
            return;
        }
        _ => {}
    }

    match value.to_attribute_value() {
        Some(text) => host.set_attribute(node, key, &text),
        None => {
            if let PropValue::Handler(_) = value {
                warn!("handler passed to non-event prop '{}'; not written", key);
            }
            host.remove_attribute(node, key);
        }
    }
}

/// Undo a prop that is no longer present.
pub fn revert_prop<H: Host + ?Sized>(
    host: &mut H,
    events: &EventManager,
    node: NodeId,
    key: &str,
    old_value: &PropValue,
) {
    debug!("revert prop '{}' on {:?}", key, node);

    if is_event_prop(key) {
        if let PropValue::Handler(old) = old_value {
            events.remove_event(node, &event_name(key), old);
        }
        return;
    }

    if key == CLASS_ALIAS {
        host.remove_attribute(node, "class");
        return;
    }

    if key.starts_with(DATA_PREFIX) {
        host.remove_dataset(node, &dataset_key(key));
        return;
    }

    match old_value {
        PropValue::Bool(_) => set_boolean(host, node, key, false),
        PropValue::Style(old_styles) if key == STYLE_KEY => {
            for name in old_styles.keys() {
                host.set_style(node, name, "");
            }
            host.remove_attribute(node, STYLE_KEY);
        }
        _ => host.remove_attribute(node, key),
    }
}

/// Set the live property; only presence-reflected keys keep a bare attribute.
pub fn set_boolean<H: Host + ?Sized>(host: &mut H, node: NodeId, key: &str, value: bool) {
    host.set_property(node, key, value);
    match PRESENCE_ATTRIBUTES.get(key) {
        Some(attr) if value => host.set_attribute(node, attr, ""),
        Some(attr) => host.remove_attribute(node, attr),
        None => host.remove_attribute(node, key),
    }
}
