//! Presentation tree: the host primitives the pipeline drives, and an in-memory implementation
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::HashMap;

/// Node identifier (index into the host's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    Fragment,
}

/// Primitives supplied by the presentation environment.
///
/// Mutations addressed at nodes that do not exist are ignored by implementations;
/// callers treat the resulting absence as a valid outcome.
pub trait Host {
    fn create_text(&mut self, text: &str) -> NodeId;
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_fragment(&mut self) -> NodeId;

    /// Appending a fragment moves its children instead of the fragment itself.
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId);
    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId);
    fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Option<NodeId>;
    fn clear_children(&mut self, parent: NodeId);

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId>;
    fn child_count(&self, parent: NodeId) -> usize;
    fn children(&self, parent: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn kind(&self, node: NodeId) -> Option<NodeKind>;
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn text(&self, node: NodeId) -> Option<&str>;
    fn set_text(&mut self, node: NodeId, text: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn property(&self, node: NodeId, name: &str) -> Option<bool>;
    fn set_property(&mut self, node: NodeId, name: &str, value: bool);
    fn set_style(&mut self, node: NodeId, name: &str, value: &str);
    fn style(&self, node: NodeId, name: &str) -> Option<&str>;
    fn dataset(&self, node: NodeId, key: &str) -> Option<&str>;
    fn set_dataset(&mut self, node: NodeId, key: &str, value: &str);
    fn remove_dataset(&mut self, node: NodeId, key: &str);

    /// Install the single delegated listener for `event_type` on `root`.
    fn attach_listener(&mut self, root: NodeId, event_type: &str);

    /// Detach `node` and free it with everything below it. Ids of disposed
    /// nodes may be handed out again by later `create_*` calls.
    fn dispose(&mut self, node: NodeId);

    fn is_text(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Text)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    /// `node` plus every node below it, parents before children.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }
}

#[derive(Debug, Default)]
struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, bool>,
    styles: IndexMap<String, String>,
}

#[derive(Debug)]
enum NodeData {
    Element(ElementData),
    Text(String),
    Fragment,
}

#[derive(Debug)]
struct NodeEntry {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed presentation tree. Disposed slots are recycled.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Option<NodeEntry>>,
    free_list: Vec<u32>,
    listeners: HashMap<NodeId, IndexSet<String>>,
    listener_installs: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, live or free.
    pub fn arena_size(&self) -> usize {
        self.nodes.len()
    }

    /// Event types with a delegated listener on `root`.
    pub fn listeners(&self, root: NodeId) -> Vec<&str> {
        self.listeners
            .get(&root)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total `attach_listener` calls, duplicates included.
    pub fn listener_installs(&self) -> usize {
        self.listener_installs
    }

    /// Walk a child-index path from `root`.
    pub fn node_at(&self, root: NodeId, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(root, |node, &i| self.child_at(node, i))
    }

    /// Concatenated text of a subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let entry = NodeEntry { parent: None, children: Vec::new(), data };
        match self.free_list.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(entry);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(entry));
                NodeId(self.nodes.len() as u32 - 1)
            }
        }
    }

    fn entry(&self, node: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(node.index())?.as_ref()
    }

    fn entry_mut(&mut self, node: NodeId) -> Option<&mut NodeEntry> {
        self.nodes.get_mut(node.index())?.as_mut()
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.entry(node)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.entry_mut(node)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.entry(node).and_then(|e| e.parent) else { return };
        if let Some(p) = self.entry_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(e) = self.entry_mut(node) {
            e.parent = None;
        }
    }

    /// Nodes that `child` contributes when inserted: a fragment gives up its children.
    fn take_insertable(&mut self, child: NodeId) -> Vec<NodeId> {
        match self.entry(child).map(|e| &e.data) {
            Some(NodeData::Fragment) => {
                let moved = self.entry_mut(child).map(|e| std::mem::take(&mut e.children)).unwrap_or_default();
                for &m in &moved {
                    if let Some(e) = self.entry_mut(m) {
                        e.parent = None;
                    }
                }
                moved
            }
            Some(_) => {
                self.detach(child);
                vec![child]
            }
            None => Vec::new(),
        }
    }

    fn splice_in(&mut self, parent: NodeId, index: usize, nodes: Vec<NodeId>) {
        if self.entry(parent).is_none() {
            return;
        }
        for &n in &nodes {
            if let Some(e) = self.entry_mut(n) {
                e.parent = Some(parent);
            }
        }
        if let Some(p) = self.entry_mut(parent) {
            let at = index.min(p.children.len());
            p.children.splice(at..at, nodes);
        }
    }

    fn sync_style_attribute(&mut self, node: NodeId) {
        if let Some(el) = self.element_mut(node) {
            if el.styles.is_empty() {
                el.attributes.shift_remove("style");
            } else {
                let css = el
                    .styles
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join("; ");
                el.attributes.insert("style".to_string(), css);
            }
        }
    }
}

impl Host for Document {
    fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData { tag: tag.to_string(), ..Default::default() }))
    }

    fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::Fragment)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let nodes = self.take_insertable(child);
        let end = self.child_count(parent);
        self.splice_in(parent, end, nodes);
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let nodes = self.take_insertable(child);
        self.splice_in(parent, index, nodes);
    }

    fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) {
        let Some(index) = self.entry(parent).and_then(|p| p.children.iter().position(|&c| c == old_child)) else {
            return;
        };
        self.detach(old_child);
        let nodes = self.take_insertable(new_child);
        self.splice_in(parent, index, nodes);
    }

    fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        let child = self.child_at(parent, index)?;
        self.detach(child);
        Some(child)
    }

    fn clear_children(&mut self, parent: NodeId) {
        for child in self.children(parent) {
            self.detach(child);
        }
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.entry(parent)?.children.get(index).copied()
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.entry(parent).map_or(0, |e| e.children.len())
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.entry(parent).map(|e| e.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.entry(node)?.parent
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        Some(match self.entry(node)?.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Fragment => NodeKind::Fragment,
        })
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.entry(node)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(NodeEntry { data: NodeData::Text(current), .. }) = self.entry_mut(node) {
            *current = text.to_string();
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attributes.get(name).map(String::as_str)
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.element(node)
            .map(|el| el.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attributes.shift_remove(name);
            if name == "style" {
                el.styles.clear();
            }
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Option<bool> {
        self.element(node)?.properties.get(name).copied()
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: bool) {
        if let Some(el) = self.element_mut(node) {
            el.properties.insert(name.to_string(), value);
        }
    }

    fn set_style(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            if value.is_empty() {
                el.styles.shift_remove(name);
            } else {
                el.styles.insert(name.to_string(), value.to_string());
            }
        }
        self.sync_style_attribute(node);
    }

    fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.styles.get(name).map(String::as_str)
    }

    fn dataset(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attribute(node, &dataset_attribute_name(key))
    }

    fn set_dataset(&mut self, node: NodeId, key: &str, value: &str) {
        self.set_attribute(node, &dataset_attribute_name(key), value);
    }

    fn remove_dataset(&mut self, node: NodeId, key: &str) {
        self.remove_attribute(node, &dataset_attribute_name(key));
    }

    fn attach_listener(&mut self, root: NodeId, event_type: &str) {
        self.listener_installs += 1;
        self.listeners.entry(root).or_default().insert(event_type.to_string());
    }

    fn dispose(&mut self, node: NodeId) {
        if self.entry(node).is_none() {
            return;
        }
        self.detach(node);
        for n in self.descendants(node) {
            if let Some(slot) = self.nodes.get_mut(n.index()) {
                if slot.take().is_some() {
                    self.free_list.push(n.0);
                }
            }
            self.listeners.remove(&n);
        }
    }
}

/// `data-user-id` → `userId`
pub fn dataset_key(attribute: &str) -> String {
    let raw = attribute.strip_prefix("data-").unwrap_or(attribute);
    let mut key = String::with_capacity(raw.len());
    let mut upper_next = false;
    for ch in raw.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next && ch.is_ascii_lowercase() {
            key.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            if upper_next {
                key.push('-');
                upper_next = false;
            }
            key.push(ch);
        }
    }
    if upper_next {
        key.push('-');
    }
    key
}

/// `userId` → `data-user-id`
pub fn dataset_attribute_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_names_round_trip() {
        assert_eq!(dataset_key("data-user-id"), "userId");
        assert_eq!(dataset_key("data-x"), "x");
        assert_eq!(dataset_key("data-a-1"), "a-1");
        assert_eq!(dataset_attribute_name("userId"), "data-user-id");
    }

    #[test]
    fn fragments_splice_their_children() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let frag = doc.create_fragment();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        doc.append_child(frag, a);
        doc.append_child(frag, b);
        doc.append_child(root, frag);

        assert_eq!(doc.children(root), vec![a, b]);
        assert_eq!(doc.parent(a), Some(root));
        assert_eq!(doc.child_count(frag), 0);
    }

    #[test]
    fn insert_replace_remove() {
        let mut doc = Document::new();
        let root = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let c = doc.create_element("li");
        doc.append_child(root, a);
        doc.insert_at(root, 0, b);
        assert_eq!(doc.children(root), vec![b, a]);

        doc.replace_child(root, c, b);
        assert_eq!(doc.children(root), vec![c, a]);
        assert_eq!(doc.parent(b), None);

        assert_eq!(doc.remove_child_at(root, 1), Some(a));
        assert_eq!(doc.remove_child_at(root, 5), None);
        assert_eq!(doc.children(root), vec![c]);
    }

    #[test]
    fn reinserting_moves_the_node() {
        let mut doc = Document::new();
        let left = doc.create_element("div");
        let right = doc.create_element("div");
        let item = doc.create_text("x");
        doc.append_child(left, item);
        doc.append_child(right, item);
        assert_eq!(doc.child_count(left), 0);
        assert_eq!(doc.parent(item), Some(right));
    }

    #[test]
    fn styles_mirror_into_the_style_attribute() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_style(el, "color", "red");
        doc.set_style(el, "margin", "0");
        assert_eq!(doc.attribute(el, "style"), Some("color: red; margin: 0"));

        doc.set_style(el, "color", "");
        assert_eq!(doc.attribute(el, "style"), Some("margin: 0"));

        doc.remove_attribute(el, "style");
        assert_eq!(doc.style(el, "margin"), None);
    }

    #[test]
    fn text_nodes_ignore_element_operations() {
        let mut doc = Document::new();
        let t = doc.create_text("hi");
        doc.set_attribute(t, "id", "x");
        assert_eq!(doc.attribute(t, "id"), None);
        assert!(doc.is_text(t));
        doc.set_text(t, "bye");
        assert_eq!(doc.text(t), Some("bye"));
    }

    #[test]
    fn node_paths_and_text_content() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let p = doc.create_element("p");
        let t = doc.create_text("deep");
        doc.append_child(root, p);
        doc.append_child(p, t);
        assert_eq!(doc.node_at(root, &[0, 0]), Some(t));
        assert_eq!(doc.node_at(root, &[1]), None);
        assert_eq!(doc.text_content(root), "deep");
        assert_eq!(doc.descendants(root), vec![root, p, t]);
    }

    #[test]
    fn disposed_subtrees_free_their_slots() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let p = doc.create_element("p");
        let t = doc.create_text("gone");
        doc.append_child(root, p);
        doc.append_child(p, t);

        doc.dispose(p);
        assert_eq!(doc.child_count(root), 0);
        assert_eq!(doc.kind(p), None);
        assert_eq!(doc.kind(t), None);
        assert_eq!(doc.len(), 1);

        let a = doc.create_text("a");
        let b = doc.create_text("b");
        assert!(a.index() < 3 && b.index() < 3);
        assert_eq!(doc.arena_size(), 3);
        assert_eq!(doc.text(a), Some("a"));
        assert_eq!(doc.len(), 3);
    }
}
