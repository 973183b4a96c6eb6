//! Typed access to Matplotlib's runtime configuration
//! ([`rcParams`][rc]).
//!
//! [rc]: https://matplotlib.org/stable/users/explain/customizing.html

use pyo3::{prelude::*, types::PyDict};
use crate::{Error, MATPLOTLIB};

/// Value of a single rc parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum RcValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ToPyObject for RcValue {
    fn to_object(&self, py: Python<'_>) -> PyObject {
        match self {
            RcValue::Bool(b) => b.to_object(py),
            RcValue::Int(i) => i.to_object(py),
            RcValue::Float(x) => x.to_object(py),
            RcValue::Str(s) => s.to_object(py),
            RcValue::List(l) => l.to_object(py),
        }
    }
}

impl From<bool> for RcValue {
    fn from(b: bool) -> Self { RcValue::Bool(b) }
}

impl From<u32> for RcValue {
    fn from(i: u32) -> Self { RcValue::Int(i.into()) }
}

impl From<f64> for RcValue {
    fn from(x: f64) -> Self { RcValue::Float(x) }
}

impl From<&str> for RcValue {
    fn from(s: &str) -> Self { RcValue::Str(s.to_string()) }
}

impl From<String> for RcValue {
    fn from(s: String) -> Self { RcValue::Str(s) }
}

impl From<Vec<String>> for RcValue {
    fn from(l: Vec<String>) -> Self { RcValue::List(l) }
}

/// An ordered set of rc parameters.  Inserting a key twice keeps the
/// position of the first insertion and the latest value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RcParams {
    entries: Vec<(&'static str, RcValue)>,
}

impl RcParams {
    pub fn new() -> Self { Self::default() }

    pub fn insert(
        &mut self, key: &'static str, value: impl Into<RcValue>
    ) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&RcValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RcValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        for (k, v) in &self.entries {
            dict.set_item(*k, v)?;
        }
        Ok(dict)
    }

    /// Update `matplotlib.rcParams` with these values.
    pub fn apply(&self) -> Result<(), Error> {
        let mpl = pymod!(MATPLOTLIB)?;
        Python::with_gil(|py| {
            mpl.bind(py).getattr("rcParams")?
                .call_method1("update", (self.to_dict(py)?,))?;
            Ok(())
        })
    }
}

/// Current value of the numeric rc parameter `key` (a font size,
/// a line width,...).
pub fn get_f64(key: &str) -> Result<f64, Error> {
    let mpl = pymod!(MATPLOTLIB)?;
    Python::with_gil(|py| {
        let value = mpl.bind(py).getattr("rcParams")?
            .get_item(key)?
            .extract()?;
        Ok(value)
    })
}

/// Run `f` with `params` temporarily overriding Matplotlib's rc
/// parameters (`matplotlib.rc_context`).  The previous values are
/// restored when `f` returns, whether it succeeded or not.
pub fn rc_context<T>(
    params: &RcParams, f: impl FnOnce() -> Result<T, Error>
) -> Result<T, Error> {
    let mpl = pymod!(MATPLOTLIB)?;
    let ctx = Python::with_gil(|py| -> Result<PyObject, Error> {
        let kwargs = PyDict::new_bound(py);
        kwargs.set_item("rc", params.to_dict(py)?)?;
        let ctx = mpl.bind(py).getattr("rc_context")?
            .call((), Some(&kwargs))?;
        ctx.call_method0("__enter__")?;
        Ok(ctx.unbind())
    })?;
    let res = f();
    let exit = Python::with_gil(|py| -> PyResult<()> {
        ctx.bind(py).call_method1(
            "__exit__", (py.None(), py.None(), py.None()))
            .map(|_| ())
    });
    let value = res?;
    exit?;
    Ok(value)
}
