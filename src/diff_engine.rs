//! Positional diff/patch of a live presentation tree against two normalized virtual trees
use crate::attributes::patch_attributes;
use crate::dom::{Host, NodeId};
use crate::event_manager::EventManager;
use crate::materializer::materialize;
use crate::types::{Patch, PatchAction, VTree};
use log::debug;
use serde_json::json;

pub struct DiffEngine<'a, H: Host + ?Sized> {
    host: &'a mut H,
    events: &'a EventManager,
    patches: Vec<Patch>,
    record_patches: bool,
}

impl<'a, H: Host + ?Sized> DiffEngine<'a, H> {
    pub fn new(host: &'a mut H, events: &'a EventManager) -> Self {
        DiffEngine { host, events, patches: Vec::new(), record_patches: true }
    }

    pub fn record_patches(mut self, record: bool) -> Self {
        self.record_patches = record;
        self
    }

    pub fn into_patches(self) -> Vec<Patch> {
        self.patches
    }

    /// Reconcile a container's content. A root fragment occupies one slot per
    /// child, any other tree a single slot.
    pub fn reconcile_root(&mut self, container: NodeId, new_tree: &VTree, old_tree: &VTree) {
        self.diff_children(container, root_slots(new_tree), root_slots(old_tree));
    }

    /// Make the child of `parent` at `index` match `new_node`, given it was rendered from `old_node`.
    pub fn update_element(
        &mut self,
        parent: NodeId,
        new_node: Option<&VTree>,
        old_node: Option<&VTree>,
        index: usize,
    ) {
        match (new_node, old_node) {
            (None, None) => {}
            (None, Some(_)) => self.remove_at(parent, index),
            (Some(new_node), None) => self.insert_at(parent, index, new_node),
            (Some(new_node), Some(old_node)) => self.patch(parent, new_node, old_node, index),
        }
    }

    fn patch(&mut self, parent: NodeId, new_node: &VTree, old_node: &VTree, index: usize) {
        if let (Some(new_text), Some(old_text)) = (new_node.as_text(), old_node.as_text()) {
            self.patch_text(parent, new_text, old_text, index);
            return;
        }

        let Some(existing) = self.host.child_at(parent, index) else {
            debug!("diff: no presentation child at {} under {:?}; skipping", index, parent);
            return;
        };

        match (new_node, old_node) {
            (VTree::Element(new_el), VTree::Element(old_el)) if new_el.tag == old_el.tag => {
                if !self.host.is_element(existing) {
                    self.replace(parent, existing, new_node);
                    return;
                }
                let changed = patch_attributes(&mut *self.host, self.events, existing, &new_el.props, &old_el.props);
                if !changed.is_empty() {
                    debug!("diff: <{}> {:?} props changed: {:?}", new_el.tag, existing, changed);
                    self.record(PatchAction::Update, existing, json!({ "props": changed }));
                }
                self.diff_children(existing, &new_el.children, &old_el.children);
            }
            // Type change, or text ⇄ element: never diffed, rebuilt wholesale.
            _ => self.replace(parent, existing, new_node),
        }
    }

    fn patch_text(&mut self, parent: NodeId, new_text: &str, old_text: &str, index: usize) {
        if new_text == old_text {
            return;
        }
        match self.host.child_at(parent, index) {
            Some(existing) if self.host.is_text(existing) => {
                self.host.set_text(existing, new_text);
                self.record(PatchAction::Text, existing, json!({ "text": new_text }));
            }
            Some(existing) => {
                self.events.release_subtree(&*self.host, existing);
                let text = self.host.create_text(new_text);
                self.host.replace_child(parent, text, existing);
                self.host.dispose(existing);
                self.record(PatchAction::Replace, text, json!({ "replaced": existing, "text": new_text }));
            }
            None => debug!("diff: no text node at {} under {:?}; skipping", index, parent),
        }
    }

    /// Children are matched by index only. Surplus old children are removed
    /// from the highest index down so lower indices stay valid.
    fn diff_children(&mut self, node: NodeId, new_children: &[VTree], old_children: &[VTree]) {
        for (i, new_child) in new_children.iter().enumerate() {
            self.update_element(node, Some(new_child), old_children.get(i), i);
        }
        for i in (new_children.len()..old_children.len()).rev() {
            self.update_element(node, None, old_children.get(i), i);
        }
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, new_node: &VTree) {
        let Some(node) = materialize(&mut *self.host, self.events, new_node) else {
            return;
        };
        if index < self.host.child_count(parent) {
            self.host.insert_at(parent, index, node);
        } else {
            self.host.append_child(parent, node);
        }
        self.record(PatchAction::Insert, node, json!({ "parent": parent, "index": index }));
    }

    fn remove_at(&mut self, parent: NodeId, index: usize) {
        match self.host.child_at(parent, index) {
            Some(existing) => {
                self.events.release_subtree(&*self.host, existing);
                self.host.remove_child_at(parent, index);
                self.host.dispose(existing);
                self.record(PatchAction::Remove, existing, json!({ "parent": parent, "index": index }));
            }
            None => debug!("diff: nothing to remove at {} under {:?}", index, parent),
        }
    }

    fn replace(&mut self, parent: NodeId, existing: NodeId, new_node: &VTree) {
        self.events.release_subtree(&*self.host, existing);
        match materialize(&mut *self.host, self.events, new_node) {
            Some(node) => {
                self.host.replace_child(parent, node, existing);
                self.host.dispose(existing);
                self.record(PatchAction::Replace, node, json!({ "replaced": existing }));
            }
            None => {
                self.host.dispose(existing);
                self.record(PatchAction::Remove, existing, json!({ "parent": parent }));
            }
        }
    }

    fn record(&mut self, action: PatchAction, node: NodeId, data: serde_json::Value) {
        if self.record_patches {
            self.patches.push(Patch { action, node, data });
        }
    }
}

fn root_slots(tree: &VTree) -> &[VTree] {
    match tree {
        VTree::Fragment(items) => items,
        other => std::slice::from_ref(other),
    }
}
