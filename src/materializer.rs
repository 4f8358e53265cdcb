//! Builds fresh presentation subtrees from virtual nodes
use crate::attributes::set_attributes;
use crate::dom::{Host, NodeId};
use crate::errors::ReconcilerError;
use crate::event_manager::EventManager;
use crate::types::{Child, NodeType, VNode, VTree, number_to_string};
use log::warn;

/// Materialize a normalized tree. `None` means no node was produced.
pub fn materialize<H: Host + ?Sized>(host: &mut H, events: &EventManager, tree: &VTree) -> Option<NodeId> {
    match tree {
        VTree::Empty => Some(host.create_text("")),
        VTree::Text(text) => Some(host.create_text(text)),
        VTree::Fragment(items) => {
            let fragment = host.create_fragment();
            for item in items {
                if let Some(node) = materialize(host, events, item) {
                    host.append_child(fragment, node);
                }
            }
            Some(fragment)
        }
        VTree::Element(el) => {
            if el.tag.is_empty() {
                warn!("materialize: element without a tag name; no node produced");
                return None;
            }
            let node = host.create_element(&el.tag);
            set_attributes(host, events, node, &el.props);
            for child in &el.children {
                if let Some(child_node) = materialize(host, events, child) {
                    host.append_child(node, child_node);
                }
            }
            Some(node)
        }
    }
}

/// Materialize raw input that is expected to be normalized already.
///
/// Null and booleans become empty text nodes, lists become fragments. A
/// component type anywhere in the input means normalization was skipped and
/// is reported as [`ReconcilerError::UnexpandedComponent`].
pub fn create_element<H: Host + ?Sized>(
    host: &mut H,
    events: &EventManager,
    child: &Child,
) -> Result<Option<NodeId>, ReconcilerError> {
    match child {
        Child::Null | Child::Bool(_) => Ok(Some(host.create_text(""))),
        Child::Text(text) => Ok(Some(host.create_text(text))),
        Child::Number(n) => Ok(Some(host.create_text(&number_to_string(*n)))),
        Child::List(items) => {
            let fragment = host.create_fragment();
            for item in items {
                if let Some(node) = create_element(host, events, item)? {
                    host.append_child(fragment, node);
                }
            }
            Ok(Some(fragment))
        }
        Child::Node(VNode { node_type: NodeType::Component(component), .. }) => {
            Err(ReconcilerError::UnexpandedComponent { component: component.name().to_string() })
        }
        Child::Node(VNode { node_type: NodeType::Tag(tag), props, children }) => {
            if tag.is_empty() {
                warn!("create_element: element without a tag name; no node produced");
                return Ok(None);
            }
            let node = host.create_element(tag);
            if let Some(props) = props {
                set_attributes(host, events, node, props);
            }
            for child in children {
                if let Some(child_node) = create_element(host, events, child)? {
                    host.append_child(node, child_node);
                }
            }
            Ok(Some(node))
        }
    }
}
