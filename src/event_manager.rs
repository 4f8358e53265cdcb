//! Event delegation: one listener per event type on each root, handlers kept in a node-keyed registry
use crate::dom::{Host, NodeId};
use crate::types::{Event, Handler};
use indexmap::{IndexMap, IndexSet};
use log::trace;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Event types a root listens for on behalf of its descendants.
pub const DELEGATED_EVENT_TYPES: [&str; 16] = [
    "click",
    "dblclick",
    "mousedown",
    "mouseup",
    "mouseover",
    "mouseout",
    "mousemove",
    "contextmenu",
    "keydown",
    "keyup",
    "keypress",
    "focus",
    "blur",
    "change",
    "input",
    "submit",
];

type HandlerSets = IndexMap<String, IndexSet<Handler>>;

/// Registry of `node → event type → handlers`.
///
/// Entries for a node are dropped when its subtree is released, which the
/// materializer, diff engine and renderer do for every subtree they detach.
/// Interior mutability lets handlers add or remove handlers while an event is
/// being dispatched.
#[derive(Default)]
pub struct EventManager {
    registry: RefCell<HashMap<NodeId, HandlerSets>>,
    roots: RefCell<HashSet<NodeId>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one delegated listener per event type to `root`.
    pub fn setup_event_listeners<H: Host + ?Sized>(&self, host: &mut H, root: NodeId) {
        for event_type in DELEGATED_EVENT_TYPES {
            host.attach_listener(root, event_type);
        }
        self.roots.borrow_mut().insert(root);
    }

    pub fn is_delegated(&self, root: NodeId) -> bool {
        self.roots.borrow().contains(&root)
    }

    /// Whether `root` has a delegated listener for `event_type`.
    pub fn listens(&self, root: NodeId, event_type: &str) -> bool {
        self.is_delegated(root) && DELEGATED_EVENT_TYPES.contains(&event_type)
    }

    pub fn add_event(&self, node: NodeId, event_type: &str, handler: Handler) {
        self.registry
            .borrow_mut()
            .entry(node)
            .or_default()
            .entry(event_type.to_string())
            .or_default()
            .insert(handler);
    }

    /// No-op when the handler is not registered. Empty sets are pruned eagerly.
    pub fn remove_event(&self, node: NodeId, event_type: &str, handler: &Handler) {
        let mut registry = self.registry.borrow_mut();
        let Some(types) = registry.get_mut(&node) else { return };
        let Some(handlers) = types.get_mut(event_type) else { return };

        handlers.shift_remove(handler);

        if handlers.is_empty() {
            types.shift_remove(event_type);
        }
        if types.is_empty() {
            registry.remove(&node);
        }
    }

    /// Handlers for `(node, event_type)` in registration order.
    pub fn handlers(&self, node: NodeId, event_type: &str) -> Vec<Handler> {
        self.registry
            .borrow()
            .get(&node)
            .and_then(|types| types.get(event_type))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_handlers(&self, node: NodeId) -> bool {
        self.registry.borrow().contains_key(&node)
    }

    /// Number of nodes with at least one handler.
    pub fn registered_nodes(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn release_node(&self, node: NodeId) {
        self.registry.borrow_mut().remove(&node);
    }

    /// Forget every handler in the subtree rooted at `node`.
    pub fn release_subtree<H: Host + ?Sized>(&self, host: &H, node: NodeId) {
        let mut registry = self.registry.borrow_mut();
        if registry.is_empty() {
            return;
        }
        for n in host.descendants(node) {
            registry.remove(&n);
        }
    }

    /// Nodes from `target` up to, but excluding, `root`. Empty when `target` is not below `root`.
    pub fn propagation_path<H: Host + ?Sized>(&self, host: &H, root: NodeId, target: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            if node == root {
                return path;
            }
            path.push(node);
            current = host.parent(node);
        }
        Vec::new()
    }

    /// Invoke handlers along `path`, nearest first. Each node's handler set is
    /// snapshotted before its handlers run. Returns the number of invocations.
    pub fn dispatch_along(&self, path: &[NodeId], event: &Event) -> usize {
        let mut invoked = 0;
        for &node in path {
            let handlers = self.handlers(node, &event.event_type);
            for handler in handlers {
                trace!("dispatch: '{}' -> {:?} on node {:?}", event.event_type, handler, node);
                handler.call(event);
                invoked += 1;
            }
        }
        invoked
    }

    /// What the delegated root listener does when `event` reaches `root`.
    pub fn dispatch<H: Host + ?Sized>(&self, host: &H, root: NodeId, event: &Event) -> usize {
        if !self.listens(root, &event.event_type) {
            trace!("dispatch: no delegated '{}' listener on {:?}", event.event_type, root);
            return 0;
        }
        let path = self.propagation_path(host, root, event.target);
        self.dispatch_along(&path, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<usize>>, Handler) {
        let hits = Rc::new(Cell::new(0));
        let h = {
            let hits = hits.clone();
            Handler::new(move |_| hits.set(hits.get() + 1))
        };
        (hits, h)
    }

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(root, list);
        doc.append_child(list, item);
        (doc, root, list, item)
    }

    #[test]
    fn setup_attaches_every_delegated_type() {
        let (mut doc, root, _, _) = tree();
        let events = EventManager::new();
        events.setup_event_listeners(&mut doc, root);
        assert_eq!(doc.listeners(root).len(), DELEGATED_EVENT_TYPES.len());
        assert!(events.is_delegated(root));
    }

    #[test]
    fn events_bubble_through_ancestors_below_root() {
        let (mut doc, root, list, item) = tree();
        let events = EventManager::new();
        events.setup_event_listeners(&mut doc, root);

        let order = Rc::new(RefCell::new(Vec::new()));
        for (node, label) in [(item, "item"), (list, "list"), (root, "root")] {
            let order = order.clone();
            events.add_event(node, "click", Handler::new(move |_| order.borrow_mut().push(label)));
        }

        let fired = events.dispatch(&doc, root, &Event::new("click", item));
        assert_eq!(fired, 2);
        assert_eq!(*order.borrow(), vec!["item", "list"]);
    }

    #[test]
    fn only_matching_event_types_fire() {
        let (mut doc, root, _, item) = tree();
        let events = EventManager::new();
        events.setup_event_listeners(&mut doc, root);
        let (hits, h) = counter();
        events.add_event(item, "keydown", h);

        assert_eq!(events.dispatch(&doc, root, &Event::new("click", item)), 0);
        assert_eq!(events.dispatch(&doc, root, &Event::new("keydown", item)), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn nothing_fires_without_delegation_or_outside_root() {
        let (mut doc, root, _, item) = tree();
        let events = EventManager::new();
        let (hits, h) = counter();
        events.add_event(item, "click", h);
        assert_eq!(events.dispatch(&doc, root, &Event::new("click", item)), 0);

        events.setup_event_listeners(&mut doc, root);
        let stray = doc.create_element("span");
        events.add_event(stray, "click", Handler::new(|_| panic!("outside root")));
        assert_eq!(events.dispatch(&doc, root, &Event::new("click", stray)), 0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn duplicate_handlers_register_once_and_keep_order() {
        let events = EventManager::new();
        let node = NodeId(3);
        let (_, a) = counter();
        let (_, b) = counter();
        events.add_event(node, "click", a.clone());
        events.add_event(node, "click", b.clone());
        events.add_event(node, "click", a.clone());
        assert_eq!(events.handlers(node, "click"), vec![a, b]);
    }

    #[test]
    fn removal_prunes_empty_entries_and_ignores_unknowns() {
        let events = EventManager::new();
        let node = NodeId(1);
        let (_, a) = counter();
        let (_, stranger) = counter();

        events.remove_event(node, "click", &a);
        events.add_event(node, "click", a.clone());
        events.remove_event(node, "click", &stranger);
        events.remove_event(node, "input", &a);
        assert!(events.has_handlers(node));

        events.remove_event(node, "click", &a);
        assert!(!events.has_handlers(node));
        assert_eq!(events.registered_nodes(), 0);
    }

    #[test]
    fn handlers_may_mutate_the_registry_during_dispatch() {
        let (mut doc, root, list, item) = tree();
        let events = Rc::new(EventManager::new());
        events.setup_event_listeners(&mut doc, root);

        let (list_hits, list_handler) = counter();
        events.add_event(list, "click", list_handler.clone());

        let remover = {
            let events = events.clone();
            Handler::new(move |_| {
                events.remove_event(list, "click", &list_handler);
                events.add_event(list, "input", Handler::new(|_| {}));
            })
        };
        events.add_event(item, "click", remover);

        assert_eq!(events.dispatch(&doc, root, &Event::new("click", item)), 1);
        assert_eq!(list_hits.get(), 0);
        assert_eq!(events.handlers(list, "input").len(), 1);
    }

    #[test]
    fn handlers_receive_the_original_event() {
        let (mut doc, root, _, item) = tree();
        let events = EventManager::new();
        events.setup_event_listeners(&mut doc, root);
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            events.add_event(item, "input", Handler::new(move |e| *seen.borrow_mut() = Some(e.clone())));
        }
        let event = Event::new("input", item).with_data(serde_json::json!({ "value": "abc" }));
        events.dispatch(&doc, root, &event);
        assert_eq!(seen.borrow().as_ref(), Some(&event));
    }

    #[test]
    fn releasing_a_subtree_drops_descendant_entries() {
        let (doc, _, list, item) = tree();
        let events = EventManager::new();
        let (_, a) = counter();
        events.add_event(list, "click", a.clone());
        events.add_event(item, "click", a);
        events.release_subtree(&doc, list);
        assert_eq!(events.registered_nodes(), 0);
    }
}
