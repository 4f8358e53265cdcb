//! Python module entry point: a renderer owning its own document
use crate::converters::{child_to_json, prop_value_to_json};
use crate::dom::{Document, Host, NodeId};
use crate::errors::ReconcilerError;
use crate::event_manager::DELEGATED_EVENT_TYPES;
use crate::html_generator::inner_html;
use crate::renderer::{Renderer, RendererConfig};
use crate::types::{Child, Component, ComponentProps, Event, Handler, NodeType, PropValue, Props, StyleMap};
use crate::vnode::create_vnode;
use log::{debug, error, info};
use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyModule, PyString, PyTuple};
use std::cell::RefCell;
use std::rc::Rc;

#[pyclass(name = "Renderer", unsendable)]
pub struct PyRenderer {
    document: Rc<RefCell<Document>>,
    renderer: Rc<RefCell<Renderer>>,
    root: NodeId,
}

#[pymethods]
impl PyRenderer {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => RendererConfig::from_json(json)?,
            None => RendererConfig::default(),
        };
        let mut document = Document::new();
        let root = document.create_element("div");
        info!("vdom_reconciler: renderer initialized (root {:?})", root);

        Ok(PyRenderer {
            document: Rc::new(RefCell::new(document)),
            renderer: Rc::new(RefCell::new(Renderer::with_config(config))),
            root,
        })
    }

    #[getter]
    fn root(&self) -> u32 {
        self.root.0
    }

    /// Render a tree (dicts/lists/str/numbers/None; `type` may be a callable) and return the HTML.
    fn render(&self, tree: &Bound<'_, PyAny>) -> PyResult<String> {
        let child = py_to_child(tree)?;
        let mut renderer = self.renderer.try_borrow_mut().map_err(busy)?;
        let mut document = self.document.try_borrow_mut().map_err(busy)?;
        let report = renderer.render_element(&mut *document, child, self.root)?;
        debug!("vdom_reconciler: render produced {} patches", report.patches.len());
        Ok(inner_html(&*document, self.root))
    }

    fn html(&self) -> PyResult<String> {
        let document = self.document.try_borrow().map_err(busy)?;
        Ok(inner_html(&*document, self.root))
    }

    /// Child-index path from the root to a node id.
    fn node_at(&self, path: Vec<usize>) -> PyResult<Option<u32>> {
        let document = self.document.try_borrow().map_err(busy)?;
        Ok(document.node_at(self.root, &path).map(|n| n.0))
    }

    /// Deliver an event to `target`; handlers may call `render` again.
    #[pyo3(signature = (event_type, target, data=None))]
    fn dispatch(&self, event_type: &str, target: u32, data: Option<&Bound<'_, PyAny>>) -> PyResult<usize> {
        let data = match data {
            Some(d) => python_to_json(d.py(), d)?,
            None => serde_json::Value::Null,
        };
        let events = self.renderer.try_borrow().map_err(busy)?.events().clone();
        if !events.listens(self.root, event_type) {
            return Ok(0);
        }
        let path = {
            let document = self.document.try_borrow().map_err(busy)?;
            events.propagation_path(&*document, self.root, NodeId(target))
        };
        let event = Event::new(event_type, NodeId(target)).with_data(data);
        Ok(events.dispatch_along(&path, &event))
    }
}

fn busy<E: std::fmt::Display>(err: E) -> PyErr {
    PyRuntimeError::new_err(format!("renderer is busy: {}", err))
}

/// Convert a Python value into an un-normalized child
fn py_to_child(obj: &Bound<'_, PyAny>) -> Result<Child, ReconcilerError> {
    if obj.is_none() {
        return Ok(Child::Null);
    }
    // bool before int: Python bools are ints
    if let Ok(flag) = obj.cast::<PyBool>() {
        return Ok(Child::Bool(flag.is_true()));
    }
    if obj.is_instance_of::<PyInt>() || obj.is_instance_of::<PyFloat>() {
        return Ok(Child::Number(obj.extract::<f64>()?));
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(Child::Text(obj.extract::<String>()?));
    }
    if let Ok(list) = obj.cast::<PyList>() {
        return Ok(Child::List(list.iter().map(|item| py_to_child(&item)).collect::<Result<_, _>>()?));
    }
    if let Ok(tuple) = obj.cast::<PyTuple>() {
        return Ok(Child::List(tuple.iter().map(|item| py_to_child(&item)).collect::<Result<_, _>>()?));
    }
    if let Ok(dict) = obj.cast::<PyDict>() {
        let type_item = dict.get_item("type")?.ok_or(ReconcilerError::KeyError {
            details: "Missing key 'type' in node dict".into(),
        })?;
        let node_type = if let Ok(tag) = type_item.extract::<String>() {
            NodeType::Tag(tag)
        } else if type_item.is_callable() {
            let name = type_item
                .getattr("__name__")
                .and_then(|n| n.extract::<String>())
                .unwrap_or_else(|_| "component".to_string());
            NodeType::Component(py_component(name, type_item.clone().unbind()))
        } else {
            return Err(ReconcilerError::TypeConversionError {
                expected: "str or callable node type".into(),
                actual: type_item.to_string(),
            });
        };

        let props = match dict.get_item("props")? {
            Some(p) if !p.is_none() => {
                let props_dict = p.cast::<PyDict>().map_err(|e| ReconcilerError::TypeConversionError {
                    expected: "props dict".into(),
                    actual: e.to_string(),
                })?;
                Some(py_props(props_dict)?)
            }
            _ => None,
        };

        let children = match dict.get_item("children")? {
            Some(c) if !c.is_none() => match py_to_child(&c)? {
                Child::List(items) => items,
                single => vec![single],
            },
            _ => Vec::new(),
        };

        return Ok(Child::Node(create_vnode(node_type, props, children)));
    }

    Err(ReconcilerError::TypeConversionError {
        expected: "node dict, list, str, number, bool or None".into(),
        actual: obj.get_type().name().map(|n| n.to_string()).unwrap_or_else(|_| "unknown".into()),
    })
}

fn py_props(dict: &Bound<'_, PyDict>) -> Result<Props, ReconcilerError> {
    let mut props = Props::new();
    for (key_obj, value) in dict.iter() {
        let key: String = key_obj.extract().map_err(|e: PyErr| ReconcilerError::KeyError {
            details: format!("Invalid prop key: {}", e),
        })?;
        let value = py_prop_value(&key, &value)?;
        props.insert(key, value);
    }
    Ok(props)
}

fn py_prop_value(key: &str, value: &Bound<'_, PyAny>) -> Result<PropValue, ReconcilerError> {
    if value.is_none() {
        return Ok(PropValue::Null);
    }
    if let Ok(flag) = value.cast::<PyBool>() {
        return Ok(PropValue::Bool(flag.is_true()));
    }
    if value.is_instance_of::<PyInt>() || value.is_instance_of::<PyFloat>() {
        return Ok(PropValue::Number(value.extract::<f64>()?));
    }
    if value.is_instance_of::<PyString>() {
        return Ok(PropValue::Str(value.extract::<String>()?));
    }
    if value.is_callable() {
        return Ok(PropValue::Handler(py_handler(value.clone().unbind())));
    }
    if let Ok(styles) = value.cast::<PyDict>() {
        if key == "style" {
            let mut map = StyleMap::new();
            for (name, style_value) in styles.iter() {
                map.insert(name.extract::<String>()?, style_value.str()?.extract::<String>()?);
            }
            return Ok(PropValue::Style(map));
        }
    }
    Ok(PropValue::Str(python_to_json(value.py(), value)?.to_string()))
}

fn py_handler(callable: Py<PyAny>) -> Handler {
    Handler::new(move |event: &Event| {
        Python::attach(|py| {
            let result = event_to_py(py, event).and_then(|arg| callable.call1(py, (arg,)));
            if let Err(err) = result {
                error!("vdom_reconciler: '{}' handler raised: {}", event.event_type, err);
            }
        })
    })
}

fn py_component(name: String, callable: Py<PyAny>) -> Component {
    let label = name.clone();
    Component::try_new(name, move |props: ComponentProps| {
        Python::attach(|py| {
            component_props_to_py(py, &props)
                .and_then(|arg| callable.call1(py, (arg,)))
                .map_err(|err| {
                    error!("vdom_reconciler: component '{}' raised: {}", label, err);
                    ReconcilerError::PythonError(format!("component '{}' raised: {}", label, err))
                })
                .and_then(|out| py_to_child(out.bind(py)))
        })
    })
}

fn event_to_py<'py>(py: Python<'py>, event: &Event) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("type", &event.event_type)?;
    dict.set_item("target", event.target.0)?;
    dict.set_item("data", json_to_pyobject(py, &event.data)?)?;
    Ok(dict)
}

// Handlers cross back into Python as placeholders; the original callables are not recovered.
fn component_props_to_py<'py>(py: Python<'py>, props: &ComponentProps) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (key, value) in &props.props {
        dict.set_item(key, json_to_pyobject(py, &prop_value_to_json(value))?)?;
    }
    let children = PyList::empty(py);
    for child in &props.children {
        children.append(json_to_pyobject(py, &child_to_json(child))?)?;
    }
    dict.set_item("children", children)?;
    Ok(dict)
}

/// Convert Python object to JSON with full type support
fn python_to_json<'py>(py: Python<'py>, obj: &Bound<'py, PyAny>) -> Result<serde_json::Value, ReconcilerError> {
    let json_mod = PyModule::import(py, "json")?;
    let dumped = json_mod.getattr("dumps")?.call1((obj,))?;
    let s: String = dumped.extract()?;
    serde_json::from_str(&s).map_err(|e| ReconcilerError::TypeConversionError {
        expected: "JSON-serializable type".into(),
        actual: e.to_string(),
    })
}

/// Convert JSON back to Python with proper type mapping
fn json_to_pyobject<'py>(py: Python<'py>, value: &serde_json::Value) -> PyResult<Bound<'py, PyAny>> {
    match value {
        serde_json::Value::Null => Ok(py.None().into_bound(py)),
        serde_json::Value::Bool(b) => Ok((*b).into_pyobject(py)?.to_owned().into_any()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into_pyobject(py)?.into_any())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into_pyobject(py)?.into_any())
            } else {
                Ok(n.to_string().into_pyobject(py)?.into_any())
            }
        }
        serde_json::Value::String(s) => Ok(s.as_str().into_pyobject(py)?.into_any()),
        serde_json::Value::Array(arr) => {
            let list = PyList::empty(py);
            for v in arr {
                list.append(json_to_pyobject(py, v)?)?;
            }
            Ok(list.into_any())
        }
        serde_json::Value::Object(map) => {
            let dict = PyDict::new(py);
            for (k, v) in map {
                dict.set_item(k, json_to_pyobject(py, v)?)?;
            }
            Ok(dict.into_any())
        }
    }
}

#[pymodule]
fn vdom_reconciler(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRenderer>()?;
    m.add("DELEGATED_EVENT_TYPES", DELEGATED_EVENT_TYPES.to_vec())?;
    Ok(())
}
