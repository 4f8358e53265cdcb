//! Render entry point: per-container snapshots, first render vs. reconcile
use crate::diff_engine::DiffEngine;
use crate::dom::{Host, NodeId};
use crate::errors::ReconcilerError;
use crate::event_manager::EventManager;
use crate::materializer::materialize;
use crate::types::{Child, Event, RenderReport, VTree};
use crate::vnode::{DEFAULT_MAX_COMPONENT_DEPTH, normalize_vnode_with_limit};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Component expansion depth allowed along one path before normalization fails.
    pub max_component_depth: usize,
    /// Keep a patch log in each `RenderReport`.
    pub record_patches: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig { max_component_depth: DEFAULT_MAX_COMPONENT_DEPTH, record_patches: true }
    }
}

impl RendererConfig {
    pub fn from_json(json: &str) -> Result<Self, ReconcilerError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// State kept per container between renders.
#[derive(Debug, Default)]
pub struct RenderSnapshot {
    pub vtree: Option<VTree>,
    pub delegation_installed: bool,
}

/// Owns the last rendered tree of every container and the event registry they share.
///
/// Handlers that need to re-render should not hold a borrow of the renderer
/// while events are dispatched: clone [`Renderer::events`] and dispatch through it.
pub struct Renderer {
    events: Rc<EventManager>,
    snapshots: HashMap<NodeId, RenderSnapshot>,
    config: RendererConfig,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Renderer { events: Rc::new(EventManager::new()), snapshots: HashMap::new(), config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn events(&self) -> &Rc<EventManager> {
        &self.events
    }

    pub fn snapshot(&self, container: NodeId) -> Option<&RenderSnapshot> {
        self.snapshots.get(&container)
    }

    /// Render `vnode` into `container`: materialize on the first call, reconcile
    /// against the previous tree afterwards. The new tree always becomes the snapshot.
    pub fn render_element<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        vnode: impl Into<Child>,
        container: NodeId,
    ) -> Result<RenderReport, ReconcilerError> {
        let next = normalize_vnode_with_limit(vnode, self.config.max_component_depth)?;
        let snapshot = self.snapshots.entry(container).or_default();
        let mut report = RenderReport::default();

        match snapshot.vtree.as_ref() {
            None => {
                debug!("render: first render into {:?}", container);
                for child in host.children(container) {
                    self.events.release_subtree(&*host, child);
                    host.dispose(child);
                }
                if let Some(node) = materialize(host, &self.events, &next) {
                    host.append_child(container, node);
                }
                if !snapshot.delegation_installed {
                    self.events.setup_event_listeners(host, container);
                    snapshot.delegation_installed = true;
                }
                report.first_render = true;
            }
            Some(previous) => {
                let mut engine = DiffEngine::new(host, &self.events).record_patches(self.config.record_patches);
                engine.reconcile_root(container, &next, previous);
                report.patches = engine.into_patches();
                debug!("render: reconciled {:?} with {} patches", container, report.patches.len());
            }
        }

        snapshot.vtree = Some(next);
        Ok(report)
    }

    /// Deliver `event` as the delegated listener on `container` would.
    pub fn dispatch<H: Host + ?Sized>(&self, host: &H, container: NodeId, event: &Event) -> usize {
        self.events.dispatch(host, container, event)
    }

    /// Drop the container's content and snapshot; the next render starts fresh.
    /// Delegation stays installed.
    pub fn unmount<H: Host + ?Sized>(&mut self, host: &mut H, container: NodeId) {
        for child in host.children(container) {
            self.events.release_subtree(&*host, child);
            host.dispose(child);
        }
        if let Some(snapshot) = self.snapshots.get_mut(&container) {
            snapshot.vtree = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::event_manager::DELEGATED_EVENT_TYPES;
    use crate::types::{Component, ComponentProps, PatchAction};
    use crate::vnode::create_vnode;
    use crate::{children, props};

    #[test]
    fn config_defaults_and_json() {
        let config = RendererConfig::from_json(r#"{ "max_component_depth": 8 }"#).unwrap();
        assert_eq!(config.max_component_depth, 8);
        assert!(config.record_patches);
        assert_eq!(RendererConfig::from_json("{}").unwrap(), RendererConfig::default());
        assert!(RendererConfig::from_json("[").is_err());
    }

    #[test]
    fn first_render_clears_existing_content_and_delegates_once() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let leftover = doc.create_text("loading…");
        doc.append_child(container, leftover);

        let mut renderer = Renderer::new();
        let report = renderer.render_element(&mut doc, create_vnode("p", None, children!["a"]), container).unwrap();
        assert!(report.first_render);
        assert_eq!(doc.child_count(container), 1);
        assert_eq!(doc.text_content(container), "a");
        assert_eq!(doc.len(), 3);

        renderer.render_element(&mut doc, create_vnode("p", None, children!["b"]), container).unwrap();
        renderer.render_element(&mut doc, create_vnode("p", None, children!["c"]), container).unwrap();
        assert_eq!(doc.listener_installs(), DELEGATED_EVENT_TYPES.len());
        assert!(renderer.snapshot(container).unwrap().delegation_installed);
    }

    #[test]
    fn snapshot_is_stored_even_without_changes() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let mut renderer = Renderer::new();
        let tree = create_vnode("p", Some(props! { "id" => "same" }), children!["x"]);

        renderer.render_element(&mut doc, tree.clone(), container).unwrap();
        let report = renderer.render_element(&mut doc, tree, container).unwrap();
        assert!(report.is_noop());
        let stored = renderer.snapshot(container).unwrap().vtree.as_ref().unwrap();
        assert_eq!(stored.as_element().unwrap().tag, "p");
    }

    #[test]
    fn independent_containers_keep_separate_snapshots() {
        let mut doc = Document::new();
        let left = doc.create_element("div");
        let right = doc.create_element("div");
        let mut renderer = Renderer::new();

        renderer.render_element(&mut doc, "left", left).unwrap();
        renderer.render_element(&mut doc, "right", right).unwrap();
        let report = renderer.render_element(&mut doc, "left 2", left).unwrap();

        assert_eq!(report.count(PatchAction::Text), 1);
        assert_eq!(doc.text_content(left), "left 2");
        assert_eq!(doc.text_content(right), "right");
        assert_eq!(doc.listeners(left).len(), DELEGATED_EVENT_TYPES.len());
        assert_eq!(doc.listeners(right).len(), DELEGATED_EVENT_TYPES.len());
    }

    #[test]
    fn empty_and_fragment_roots() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let mut renderer = Renderer::new();

        renderer.render_element(&mut doc, Child::Null, container).unwrap();
        assert_eq!(doc.child_count(container), 1);
        assert_eq!(doc.text_content(container), "");

        renderer.render_element(&mut doc, children!["a", "b"], container).unwrap();
        assert_eq!(doc.child_count(container), 2);
        assert_eq!(doc.text_content(container), "ab");

        renderer.render_element(&mut doc, create_vnode("hr", None, vec![]), container).unwrap();
        assert_eq!(doc.child_count(container), 1);
        assert_eq!(doc.tag_name(doc.child_at(container, 0).unwrap()), Some("hr"));
    }

    #[test]
    fn normalization_errors_leave_the_snapshot_alone() {
        fn forever(_: ComponentProps) -> Child {
            create_vnode(Component::new("Forever", forever), None, vec![]).into()
        }
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let mut renderer = Renderer::with_config(RendererConfig { max_component_depth: 4, ..Default::default() });

        renderer.render_element(&mut doc, "ok", container).unwrap();
        let err = renderer
            .render_element(&mut doc, create_vnode(Component::new("Forever", forever), None, vec![]), container)
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::ComponentDepthExceeded { limit: 4, .. }));
        assert_eq!(doc.text_content(container), "ok");
        assert_eq!(renderer.snapshot(container).unwrap().vtree, Some(VTree::Text("ok".into())));
    }

    #[test]
    fn failing_component_keeps_previous_render() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let mut renderer = Renderer::new();
        let broken = Component::try_new("Broken", |_| Err(ReconcilerError::PythonError("boom".into())));

        renderer.render_element(&mut doc, create_vnode("p", None, children!["ok"]), container).unwrap();
        let result = renderer.render_element(&mut doc, create_vnode("p", None, children![create_vnode(broken, None, vec![])]), container);

        assert!(matches!(result, Err(ReconcilerError::PythonError(_))));
        assert_eq!(doc.text_content(container), "ok");
        let stored = renderer.snapshot(container).unwrap().vtree.as_ref().unwrap();
        assert_eq!(stored.as_element().unwrap().children, vec![VTree::Text("ok".into())]);
    }

    #[test]
    fn unmount_starts_over_without_reinstalling_listeners() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let mut renderer = Renderer::new();
        let click = crate::types::Handler::new(|_| {});

        renderer
            .render_element(&mut doc, create_vnode("button", Some(props! { "onClick" => click }), vec![]), container)
            .unwrap();
        renderer.unmount(&mut doc, container);
        assert_eq!(doc.child_count(container), 0);
        assert_eq!(doc.len(), 1);
        assert_eq!(renderer.events().registered_nodes(), 0);

        let report = renderer.render_element(&mut doc, "again", container).unwrap();
        assert!(report.first_render);
        assert_eq!(doc.listener_installs(), DELEGATED_EVENT_TYPES.len());
    }
}
