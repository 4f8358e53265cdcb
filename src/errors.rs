// /src/errors.rs
//! Error taxonomy for normalization, materialization and conversion
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    /// A component-typed node reached the materializer without being normalized first.
    #[error("Component '{component}' reached the materializer; normalize the tree before rendering")]
    UnexpandedComponent { component: String },

    #[error("Component expansion exceeded depth {limit} while expanding '{component}'")]
    ComponentDepthExceeded { component: String, limit: usize },

    #[error("Key extraction failed: {details}")]
    KeyError { details: String },

    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversionError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Python call failed: {0}")]
    PythonError(String),
}

#[cfg(feature = "python")]
impl From<ReconcilerError> for pyo3::PyErr {
    fn from(err: ReconcilerError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for ReconcilerError {
    fn from(err: pyo3::PyErr) -> Self {
        ReconcilerError::PythonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_component() {
        let err = ReconcilerError::UnexpandedComponent { component: "Counter".into() };
        assert!(err.to_string().contains("Counter"));

        let err = ReconcilerError::ComponentDepthExceeded { component: "Loop".into(), limit: 8 };
        assert_eq!(
            err.to_string(),
            "Component expansion exceeded depth 8 while expanding 'Loop'"
        );
    }

    #[test]
    fn serde_errors_convert() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: ReconcilerError = parse.unwrap_err().into();
        assert!(matches!(err, ReconcilerError::SerdeError(_)));
    }
}
