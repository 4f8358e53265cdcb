//! Virtual node model: author input, normalized trees, handlers and patch records
use crate::dom::NodeId;
use crate::errors::ReconcilerError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Attribute/event name → value, in author order.
pub type Props = IndexMap<String, PropValue>;

/// Inline style property → value.
pub type StyleMap = IndexMap<String, String>;

/// Global callback id generator (lock-free, atomic)
static CALLBACK_COUNTER: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));

fn next_callback_id() -> usize {
    CALLBACK_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Event handler attached through an `on*` prop.
///
/// Two handlers are equal only if one is a clone of the other; wrapping the same
/// closure twice yields two distinct handlers.
#[derive(Clone)]
pub struct Handler {
    id: usize,
    callback: Rc<dyn Fn(&Event)>,
}

impl Handler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Handler { id: next_callback_id(), callback: Rc::new(callback) }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl Hash for Handler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler(#{})", self.id)
    }
}

/// The single argument a component receives: its props plus its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentProps {
    pub props: Props,
    pub children: Vec<Child>,
}

impl ComponentProps {
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(PropValue::as_str)
    }
}

type RenderFn = dyn Fn(ComponentProps) -> Result<Child, ReconcilerError>;

/// A pure function from props and children to a new child value.
#[derive(Clone)]
pub struct Component {
    id: usize,
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(ComponentProps) -> Child + 'static,
    {
        Self::try_new(name, move |props| Ok(render(props)))
    }

    /// A component whose render can fail; the error aborts the whole render.
    pub fn try_new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(ComponentProps) -> Result<Child, ReconcilerError> + 'static,
    {
        let name: String = name.into();
        Component { id: next_callback_id(), name: Rc::from(name), render: Rc::new(render) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: ComponentProps) -> Result<Child, ReconcilerError> {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({}#{})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Style(StyleMap),
    Handler(Handler),
}

impl PropValue {
    pub fn style<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        PropValue::Style(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// Literal attribute text for this value; `None` when it has no attribute form.
    pub fn to_attribute_value(&self) -> Option<String> {
        match self {
            PropValue::Null | PropValue::Handler(_) => None,
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Number(n) => Some(number_to_string(*n)),
            PropValue::Str(s) => Some(s.clone()),
            PropValue::Style(map) => Some(style_to_css(map)),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Null => false,
            PropValue::Bool(b) => *b,
            PropValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PropValue::Str(s) => !s.is_empty(),
            PropValue::Style(_) | PropValue::Handler(_) => true,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    Tag(String),
    Component(Component),
}

impl NodeType {
    pub fn name(&self) -> &str {
        match self {
            NodeType::Tag(tag) => tag,
            NodeType::Component(c) => c.name(),
        }
    }
}

impl From<&str> for NodeType {
    fn from(value: &str) -> Self {
        NodeType::Tag(value.to_string())
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        NodeType::Tag(value)
    }
}

impl From<Component> for NodeType {
    fn from(value: Component) -> Self {
        NodeType::Component(value)
    }
}

/// Un-normalized virtual node as built by `create_vnode`.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    pub node_type: NodeType,
    pub props: Option<Props>,
    pub children: Vec<Child>,
}

/// Anything that may appear in a children list before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Null,
    Bool(bool),
    Text(String),
    Number(f64),
    Node(VNode),
    List(Vec<Child>),
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Child::Bool(value)
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Number(value)
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Number(value as f64)
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Number(value as f64)
    }
}

impl From<usize> for Child {
    fn from(value: usize) -> Self {
        Child::Number(value as f64)
    }
}

impl From<VNode> for Child {
    fn from(value: VNode) -> Self {
        Child::Node(value)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(value: Vec<T>) -> Self {
        Child::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Null, Into::into)
    }
}

/// Canonical tree produced by normalization.
///
/// `Text` never holds the empty string (that is `Empty`), and `Fragment` only
/// appears at the root: fragments among an element's children are spliced inline.
#[derive(Debug, Clone, PartialEq)]
pub enum VTree {
    Empty,
    Text(String),
    Fragment(Vec<VTree>),
    Element(VElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub props: Props,
    pub children: Vec<VTree>,
}

impl VTree {
    /// Text form of text-shaped trees (`Empty` reads as `""`).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            VTree::Empty => Some(""),
            VTree::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VTree::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, VTree::Empty)
    }
}

impl From<VTree> for Child {
    fn from(value: VTree) -> Self {
        match value {
            VTree::Empty => Child::Null,
            VTree::Text(text) => Child::Text(text),
            VTree::Fragment(items) => Child::List(items.into_iter().map(Child::from).collect()),
            VTree::Element(el) => Child::Node(VNode {
                node_type: NodeType::Tag(el.tag),
                props: Some(el.props),
                children: el.children.into_iter().map(Child::from).collect(),
            }),
        }
    }
}

/// Event delivered to delegated handlers. `data` carries host-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Event { event_type: event_type.into(), target, data: serde_json::Value::Null }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Kind of presentation-tree mutation performed during a render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchAction {
    Insert,
    Remove,
    Replace,
    Update,
    Text,
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatchAction::Insert => "INSERT",
            PatchAction::Remove => "REMOVE",
            PatchAction::Replace => "REPLACE",
            PatchAction::Update => "UPDATE",
            PatchAction::Text => "TEXT",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub action: PatchAction,
    pub node: NodeId,
    pub data: serde_json::Value,
}

/// What a single `render_element` call did to the container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub first_render: bool,
    pub patches: Vec<Patch>,
}

impl RenderReport {
    pub fn count(&self, action: PatchAction) -> usize {
        self.patches.iter().filter(|p| p.action == action).count()
    }

    pub fn is_noop(&self) -> bool {
        !self.first_render && self.patches.is_empty()
    }
}

/// String form of a number as it appears in text and attributes.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponent_form(n)
    } else {
        n.to_string()
    }
}

// `1e21` → `1e+21`, `1.5e-7` → `1.5e-7`
fn exponent_form(n: f64) -> String {
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if exp.starts_with('-') => format!("{}e{}", mantissa, exp),
        Some((mantissa, exp)) => format!("{}e+{}", mantissa, exp),
        None => formatted,
    }
}

pub(crate) fn style_to_css(map: &StyleMap) -> String {
    map.iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build a `Props` map: `props! { "id" => "main", "disabled" => true }`.
#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $( props.insert(::std::string::String::from($key), $crate::PropValue::from($value)); )+
        props
    }};
}

/// Build a children list from mixed values: `children!["a", 0, vnode]`.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),*]
    };
}
