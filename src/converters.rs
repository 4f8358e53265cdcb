//! Zero-panic conversion between JSON descriptions and virtual trees
use crate::errors::ReconcilerError;
use crate::types::{Child, PropValue, Props, StyleMap, VTree, number_to_string};
use crate::vnode::create_vnode;
use serde_json::{Map, Value};

/// Build an un-normalized child from JSON.
///
/// Objects must look like `{ "type": "div", "props": {...}, "children": [...] }`;
/// `props` and `children` are optional.
pub fn child_from_json(value: &Value) -> Result<Child, ReconcilerError> {
    match value {
        Value::Null => Ok(Child::Null),
        Value::Bool(b) => Ok(Child::Bool(*b)),
        Value::Number(n) => Ok(Child::Number(n.as_f64().unwrap_or(f64::NAN))),
        Value::String(s) => Ok(Child::Text(s.clone())),
        Value::Array(items) => Ok(Child::List(
            items.iter().map(child_from_json).collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Object(map) => {
            let tag = match map.get("type") {
                Some(Value::String(tag)) => tag.clone(),
                Some(other) => {
                    return Err(ReconcilerError::TypeConversionError {
                        expected: "string node type".into(),
                        actual: other.to_string(),
                    });
                }
                None => {
                    return Err(ReconcilerError::KeyError { details: "Missing key 'type' in node object".into() });
                }
            };

            let props = match map.get("props") {
                None | Some(Value::Null) => None,
                Some(Value::Object(props)) => Some(props_from_json(props)),
                Some(other) => {
                    return Err(ReconcilerError::TypeConversionError {
                        expected: "props object".into(),
                        actual: other.to_string(),
                    });
                }
            };

            let children = match map.get("children") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.iter().map(child_from_json).collect::<Result<Vec<_>, _>>()?,
                Some(single) => vec![child_from_json(single)?],
            };

            Ok(Child::Node(create_vnode(tag, props, children)))
        }
    }
}

pub fn props_from_json(map: &Map<String, Value>) -> Props {
    map.iter()
        .map(|(key, value)| (key.clone(), prop_value_from_json(key, value)))
        .collect()
}

/// Objects become style maps under `style`; any other nested JSON is kept as its text.
pub fn prop_value_from_json(key: &str, value: &Value) -> PropValue {
    match value {
        Value::Null => PropValue::Null,
        Value::Bool(b) => PropValue::Bool(*b),
        Value::Number(n) => PropValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => PropValue::Str(s.clone()),
        Value::Object(styles) if key == "style" => PropValue::Style(
            styles
                .iter()
                .map(|(name, v)| (name.clone(), json_scalar_to_string(v)))
                .collect::<StyleMap>(),
        ),
        other => PropValue::Str(other.to_string()),
    }
}

fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n.as_f64().unwrap_or(f64::NAN)),
        other => other.to_string(),
    }
}

pub fn prop_value_to_json(value: &PropValue) -> Value {
    match value {
        PropValue::Null => Value::Null,
        PropValue::Bool(b) => Value::Bool(*b),
        PropValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::from(*n as i64),
        PropValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        PropValue::Str(s) => Value::String(s.clone()),
        PropValue::Style(styles) => Value::Object(
            styles.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect(),
        ),
        PropValue::Handler(_) => Value::String("[handler]".into()),
    }
}

pub fn props_to_json(props: &Props) -> Value {
    Value::Object(props.iter().map(|(k, v)| (k.clone(), prop_value_to_json(v))).collect())
}

/// JSON view of raw input. Components appear by name only.
pub fn child_to_json(child: &Child) -> Value {
    match child {
        Child::Null => Value::Null,
        Child::Bool(b) => Value::Bool(*b),
        Child::Number(n) => prop_value_to_json(&PropValue::Number(*n)),
        Child::Text(text) => Value::String(text.clone()),
        Child::List(items) => Value::Array(items.iter().map(child_to_json).collect()),
        Child::Node(node) => serde_json::json!({
            "type": node.node_type.name(),
            "props": node.props.as_ref().map_or(Value::Null, props_to_json),
            "children": node.children.iter().map(child_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// JSON view of a normalized tree, in the same shape `child_from_json` accepts.
pub fn vtree_to_json(tree: &VTree) -> Value {
    match tree {
        VTree::Empty => Value::String(String::new()),
        VTree::Text(text) => Value::String(text.clone()),
        VTree::Fragment(items) => Value::Array(items.iter().map(vtree_to_json).collect()),
        VTree::Element(el) => serde_json::json!({
            "type": el.tag,
            "props": props_to_json(&el.props),
            "children": el.children.iter().map(vtree_to_json).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Handler, NodeType};
    use crate::vnode::normalize_vnode;
    use serde_json::json;

    #[test]
    fn builds_elements_from_objects() {
        let child = child_from_json(&json!({
            "type": "div",
            "props": { "id": "a", "style": { "width": 10, "color": "red" }, "data-meta": [1, 2] },
            "children": ["hi", null, false, "", 0, [["deep"]]],
        }))
        .unwrap();

        let Child::Node(node) = child else { panic!("expected a node") };
        assert_eq!(node.node_type, NodeType::Tag("div".into()));
        let props = node.props.unwrap();
        assert_eq!(props["id"], PropValue::from("a"));
        assert_eq!(props["style"], PropValue::style([("width", "10"), ("color", "red")]));
        assert_eq!(props["data-meta"], PropValue::from("[1,2]"));
        assert_eq!(node.children, vec![Child::from("hi"), Child::Number(0.0), Child::from("deep")]);
    }

    #[test]
    fn rejects_malformed_nodes() {
        assert!(matches!(
            child_from_json(&json!({ "props": {} })),
            Err(ReconcilerError::KeyError { .. })
        ));
        assert!(matches!(
            child_from_json(&json!({ "type": 3 })),
            Err(ReconcilerError::TypeConversionError { .. })
        ));
        assert!(matches!(
            child_from_json(&json!({ "type": "p", "props": "nope" })),
            Err(ReconcilerError::TypeConversionError { .. })
        ));
    }

    #[test]
    fn normalized_trees_serialize_to_the_accepted_shape() {
        let source = json!({ "type": "p", "props": { "className": "x" }, "children": ["a", 1] });
        let tree = normalize_vnode(child_from_json(&source).unwrap()).unwrap();
        let out = vtree_to_json(&tree);
        assert_eq!(out, json!({ "type": "p", "props": { "className": "x" }, "children": ["a", "1"] }));

        let again = normalize_vnode(child_from_json(&out).unwrap()).unwrap();
        assert_eq!(again, tree);
    }

    #[test]
    fn raw_children_serialize_with_component_names() {
        let comp = crate::types::Component::new("Badge", |_| Child::Null);
        let child = Child::from(create_vnode(comp, None, vec![Child::from(2), Child::Bool(true)]));
        assert_eq!(child_to_json(&child), json!({ "type": "Badge", "props": null, "children": [2, true] }));
    }

    #[test]
    fn handlers_serialize_as_placeholders() {
        let mut props = Props::new();
        props.insert("onClick".into(), PropValue::Handler(Handler::new(|_| {})));
        assert_eq!(props_to_json(&props), json!({ "onClick": "[handler]" }));
    }
}
