//! Virtual node construction and normalization
use crate::children::{flatten_children, is_valid_child};
use crate::errors::ReconcilerError;
use crate::types::{Child, ComponentProps, NodeType, Props, VElement, VNode, VTree, number_to_string};
use log::debug;

/// Component expansion depth allowed along one path of the tree.
pub const DEFAULT_MAX_COMPONENT_DEPTH: usize = 256;

/// Build a virtual node. Children are flattened and invalid entries dropped;
/// component types are kept as-is until normalization.
pub fn create_vnode(node_type: impl Into<NodeType>, props: Option<Props>, children: Vec<Child>) -> VNode {
    let children = flatten_children(children)
        .into_iter()
        .filter(is_valid_child)
        .collect();

    VNode { node_type: node_type.into(), props, children }
}

/// Expand components, coerce primitives to text and strip invalid children.
pub fn normalize_vnode(vnode: impl Into<Child>) -> Result<VTree, ReconcilerError> {
    normalize_vnode_with_limit(vnode, DEFAULT_MAX_COMPONENT_DEPTH)
}

pub fn normalize_vnode_with_limit(vnode: impl Into<Child>, max_depth: usize) -> Result<VTree, ReconcilerError> {
    Normalizer { max_depth }.normalize(vnode.into(), 0)
}

struct Normalizer {
    max_depth: usize,
}

impl Normalizer {
    fn normalize(&self, child: Child, depth: usize) -> Result<VTree, ReconcilerError> {
        match child {
            Child::Null | Child::Bool(_) => Ok(VTree::Empty),
            Child::Text(text) if text.is_empty() => Ok(VTree::Empty),
            Child::Text(text) => Ok(VTree::Text(text)),
            Child::Number(n) => Ok(VTree::Text(number_to_string(n))),
            Child::List(items) => Ok(VTree::Fragment(self.normalize_children(items, depth)?)),
            Child::Node(VNode { node_type: NodeType::Component(component), props, children }) => {
                if depth >= self.max_depth {
                    return Err(ReconcilerError::ComponentDepthExceeded {
                        component: component.name().to_string(),
                        limit: self.max_depth,
                    });
                }
                debug!("normalize: expanding component '{}' at depth {}", component.name(), depth);
                let rendered = component.render(ComponentProps {
                    props: props.unwrap_or_default(),
                    children,
                })?;
                self.normalize(rendered, depth + 1)
            }
            Child::Node(VNode { node_type: NodeType::Tag(tag), props, children }) => {
                Ok(VTree::Element(VElement {
                    tag,
                    props: props.unwrap_or_default(),
                    children: self.normalize_children(children, depth)?,
                }))
            }
        }
    }

    // Validity is re-checked after normalization since a component may yield nothing.
    fn normalize_children(&self, children: Vec<Child>, depth: usize) -> Result<Vec<VTree>, ReconcilerError> {
        let mut normalized = Vec::with_capacity(children.len());
        for child in children {
            match self.normalize(child, depth)? {
                VTree::Empty => {}
                VTree::Fragment(items) => normalized.extend(items),
                tree => normalized.push(tree),
            }
        }
        Ok(normalized)
    }
}
