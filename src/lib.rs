//! Minimal virtual-tree reconciliation runtime.
//!
//! Author input (`Child`, `VNode`) is normalized into a `VTree`, materialized
//! into a [`Host`] presentation tree and patched in place on later renders.
//! Event handlers are delegated to the render container through an
//! [`EventManager`]. Build with the `python` feature for the extension module.
pub mod attributes;
pub mod children;
pub mod converters;
pub mod diff_engine;
pub mod dom;
pub mod errors;
pub mod event_manager;
pub mod html_generator;
pub mod materializer;
pub mod renderer;
pub mod types;
pub mod vnode;

#[cfg(feature = "python")]
mod python;

pub use children::{flatten_children, is_valid_child};
pub use diff_engine::DiffEngine;
pub use dom::{Document, Host, NodeId, NodeKind};
pub use errors::ReconcilerError;
pub use event_manager::{DELEGATED_EVENT_TYPES, EventManager};
pub use html_generator::{inner_html, to_html};
pub use materializer::{create_element, materialize};
pub use renderer::{RenderSnapshot, Renderer, RendererConfig};
pub use types::{
    Child, Component, ComponentProps, Event, Handler, NodeType, Patch, PatchAction, PropValue, Props, RenderReport,
    StyleMap, VElement, VNode, VTree,
};
pub use vnode::{DEFAULT_MAX_COMPONENT_DEPTH, create_vnode, normalize_vnode, normalize_vnode_with_limit};
