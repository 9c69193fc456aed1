//! Python bindings.
//!
//! Exposes template rendering to Python. Data crosses the boundary as JSON
//! text, so no Python objects are held by Rust.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::reactive::Snapshot;
use crate::template::{Ambient, Template};
use crate::vdom::to_html;
use crate::Error;

fn to_py_err(err: Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_data(data_json: &str) -> Result<Snapshot, Error> {
    let value: serde_json::Value = serde_json::from_str(data_json)?;
    Ok(Snapshot::from_value(value))
}

/// A compiled template, reusable across renders.
#[pyclass(name = "Template")]
pub struct PyTemplate {
    inner: Template,
}

#[pymethods]
impl PyTemplate {
    /// Compile template source with the standard helpers.
    #[new]
    fn new(source: &str) -> PyResult<Self> {
        let inner = Template::compile(source, Ambient::standard())
            .map_err(|err| to_py_err(err.into()))?;
        Ok(Self { inner })
    }

    /// Render against a JSON object and return markup.
    fn render(&self, data_json: &str) -> PyResult<String> {
        let snapshot = parse_data(data_json).map_err(to_py_err)?;
        Ok(to_html(&self.inner.render(&snapshot)))
    }

    fn __repr__(&self) -> String {
        format!("Template(prefix={:?})", self.inner.syntax().prefix)
    }
}

/// Expand `source` against the JSON object `data_json` and return markup.
#[pyfunction]
fn render_template(source: &str, data_json: &str) -> PyResult<String> {
    let template = PyTemplate::new(source)?;
    template.render(data_json)
}

/// Python module definition.
///
/// This function is called by Python when importing the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTemplate>()?;
    m.add_function(wrap_pyfunction!(render_template, m)?)?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
