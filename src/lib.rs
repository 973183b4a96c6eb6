//! Export [Matplotlib][] figures at the exact size they will have in a
//! LaTeX document, and render the static SVG charts used in the
//! documentation.
//!
//! Usage
//! -----
//!
//! Figures are built through a thin binding close to [Matplotlib][]'s
//! explicit interface, then handed to the [`latex`] helper which
//! fixes their physical size from the document's `\textwidth`:
//!
//! ```no_run
//! let (fig, [[mut ax]]) = texfig::subplots()?;
//! ax.xy(&[1., 2., 3., 4.], &[1., 4., 2., 3.]).label("data").plot()?;
//! ax.legend()?;
//! let pgf = fig.export("target/figures/example").fraction(0.8).save()?;
//! println!("saved {}", pgf.display());
//! # Ok::<(), texfig::Error>(())
//! ```
//!
//! The [`chart`] module does not need Python at all: it writes plain
//! SVG text.
//!
//! [Matplotlib]: https://matplotlib.org/

use std::path::Path;
use lazy_static::lazy_static;
use pyo3::{
    prelude::*,
    exceptions::{PyFileNotFoundError, PyPermissionError, PyValueError},
    types::PyDict,
};
use numpy::PyArray1;

#[cfg(feature = "curve-sampling")]
use curve_sampling::Sampling;

/// Call the method `$m` of the Python object `$obj`.
macro_rules! meth {
    ($obj: expr, $m: ident, $args: expr) => {
        Python::with_gil(|py| {
            $obj.bind(py)
                .call_method1(stringify!($m), $args)
                .map(|r| r.unbind())
        })
    };
}

/// Return a handle to the module `$m`.
/// ⚠ This may try to lock Python's GIL.  Make sure it is executed
/// outside a call to `Python::with_gil`.
macro_rules! pymod { ($m: ident) => {
    $m.as_ref().map_err(|_| $crate::Error::NoMatplotlib)
}}

pub mod rc;
pub mod latex;
pub mod chart;

/// Possible errors of the figure, export and chart functions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Python library "matplotlib" was not found.
    #[error("The matplotlib library has not been found.\n\
             Please install it.  See https://matplotlib.org/")]
    NoMatplotlib,
    /// The path contains an element that is not a directory or does
    /// not exist.
    #[error("A path contains an element that is not a directory or \
             does not exist")]
    FileNotFoundError,
    /// Permission denied to access or create the filesystem path.
    #[error("Permission denied to access or create the filesystem path")]
    PermissionError,
    /// The aspect ratio was not given and the figure has no width to
    /// infer it from.
    #[error("Figure width is zero; cannot infer aspect ratio.  \
             Provide the aspect explicitly")]
    ZeroWidth,
    /// An export was requested with an empty list of formats.
    #[error("No output format was requested")]
    NoFormat,
    /// A configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// Reading a configuration file or creating an output directory
    /// failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Other Python errors.
    #[error("Python error: {0}")]
    Python(PyErr),
}

impl From<PyErr> for Error {
    fn from(e: PyErr) -> Self {
        Python::with_gil(|py| {
            if e.is_instance_of::<PyFileNotFoundError>(py) {
                Error::FileNotFoundError
            } else if e.is_instance_of::<PyPermissionError>(py) {
                Error::PermissionError
            } else {
                Error::Python(e)
            }
        })
    }
}

/// Import and return a handle to the module `$m`.
macro_rules! pyimport { ($m: literal) => {
    Python::with_gil(|py|
        PyModule::import_bound(py, $m).map(Bound::unbind))
}}

lazy_static! {
    // Import matplotlib modules.
    static ref MATPLOTLIB: Result<Py<PyModule>, PyErr> = {
        pyimport!("matplotlib")
    };
    static ref FIGURE: Result<Py<PyModule>, PyErr> = {
        pyimport!("matplotlib.figure")
    };
    static ref PYPLOT: Result<Py<PyModule>, PyErr> = {
        pyimport!("matplotlib.pyplot")
    };
}

#[derive(Debug, Clone)]
pub struct Axes {
    ax: PyObject,
}

/// The top level container for all the plot elements.  Cloning
/// gives another handle to the same Matplotlib figure.
#[derive(Debug, Clone)]
pub struct Figure {
    fig: PyObject, // instance of matplotlib.figure.Figure
}

#[inline(always)]
fn grid<const R: usize, const C: usize, U>(
    f: impl Fn(usize, usize) -> U) -> [[U; C]; R] {
    let mut r = 0;
    [(); R].map(|_| {
        let mut c = 0;
        let row = [(); C].map(|_| {
            let y = f(r, c);
            c += 1;
            y });
        r += 1;
        row })
}

impl Figure {
    /// Return a new `Figure` not managed by pyplot.  The project-wide
    /// LaTeX settings are applied first (see [`latex::configure`]).
    pub fn new() -> Result<Figure, Error> {
        latex::ensure_applied()?;
        let figure = pymod!(FIGURE)?;
        Python::with_gil(|py| {
            let fig = figure.bind(py).getattr("Figure")?.call0()?;
            Ok(Self { fig: fig.unbind() })
        })
    }

    /// Add a grid of `R` × `C` axes to the figure.
    pub fn subplots<const R: usize, const C: usize>(
        &self) -> Result<[[Axes; C]; R], Error> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("squeeze", false)?;
            let axs = self.fig.bind(py)
                .call_method("subplots", (R, C), Some(&kwargs))?;
            let mut cells = Vec::with_capacity(R * C);
            for r in 0 .. R {
                let row = axs.get_item(r)?;
                for c in 0 .. C {
                    cells.push(row.get_item(c)?.unbind());
                }
            }
            Ok(grid(|r, c| Axes { ax: cells[r * C + c].clone_ref(py) }))
        })
    }

    /// Current width and height of the figure, in inches.
    pub fn size_inches(&self) -> Result<(f64, f64), Error> {
        Python::with_gil(|py| {
            let size: Vec<f64> = self.fig.bind(py)
                .call_method0("get_size_inches")?
                .call_method0("tolist")?
                .extract()?;
            match size[..] {
                [w, h] => Ok((w, h)),
                _ => Err(PyValueError::new_err(
                    "get_size_inches did not return a pair").into()),
            }
        })
    }

    /// Resize the figure to `width` × `height` inches, forwarding the
    /// new size to the canvas.
    pub fn set_size_inches(
        &self, width: f64, height: f64) -> Result<(), Error> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("forward", true)?;
            self.fig.bind(py)
                .call_method("set_size_inches", (width, height), Some(&kwargs))?;
            Ok(())
        })
    }

    /// Set the left and right edges of the subplots area, as fractions
    /// of the figure width.
    pub fn subplots_adjust(
        &self, left: f64, right: f64) -> Result<(), Error> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("left", left)?;
            kwargs.set_item("right", right)?;
            self.fig.bind(py)
                .call_method("subplots_adjust", (), Some(&kwargs))?;
            Ok(())
        })
    }

    /// Render the figure on its canvas (so that text sizes and layout
    /// are computed with the current rc parameters).
    pub fn draw(&self) -> Result<(), Error> {
        Python::with_gil(|py| {
            self.fig.bind(py).getattr("canvas")?.call_method0("draw")?;
            Ok(())
        })
    }

    /// Left and right edges of the subplots area, as fractions of the
    /// figure width.
    pub fn subplotpars(&self) -> Result<(f64, f64), Error> {
        Python::with_gil(|py| {
            let pars = self.fig.bind(py).getattr("subplotpars")?;
            let left = pars.getattr("left")?.extract()?;
            let right = pars.getattr("right")?.extract()?;
            Ok((left, right))
        })
    }

    /// Release the figure from pyplot's figure manager.
    pub fn close(self) -> Result<(), Error> {
        let pyplot = pymod!(PYPLOT)?;
        Python::with_gil(|py| {
            pyplot.bind(py).getattr("close")?.call1((self.fig.clone_ref(py),))?;
            Ok(())
        })
    }

    /// Options to save the figure to a file.
    pub fn save(&self) -> Savefig {
        Savefig { fig: self.fig.clone(), dpi: None, bbox_inches: None }
    }

    /// Start exporting the figure for inclusion in a LaTeX document.
    /// `name` is the output path without extension; see
    /// [`latex::Export`].
    pub fn export(self, name: impl AsRef<Path>) -> latex::Export {
        latex::Export::new(self, name)
    }
}

pub struct Savefig {
    fig: PyObject,
    dpi: Option<f64>,
    bbox_inches: Option<String>,
}

impl Savefig {
    pub fn dpi(&mut self, dpi: f64) -> &mut Self {
        if dpi > 0. {
            self.dpi = Some(dpi);
        } else {
            self.dpi = None;
        }
        self
    }

    /// Bounding box in inches, or `"tight"` to trim the whitespace
    /// around the figure.
    pub fn bbox_inches(&mut self, bbox: &str) -> &mut Self {
        self.bbox_inches = Some(bbox.to_string());
        self
    }

    /// Save the figure.  The format is deduced from the extension of
    /// `path`.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new_bound(py);
            if let Some(dpi) = self.dpi {
                kwargs.set_item("dpi", dpi)?;
            }
            if let Some(bbox) = &self.bbox_inches {
                kwargs.set_item("bbox_inches", bbox)?;
            }
            self.fig.bind(py)
                .call_method("savefig", (path.as_ref(),), Some(&kwargs))?;
            Ok(())
        })
    }
}


/// Create a new figure managed by pyplot.  The project-wide LaTeX
/// settings are applied first (see [`latex::configure`]).
pub fn figure() -> Result<Figure, Error> {
    latex::ensure_applied()?;
    let pyplot = pymod!(PYPLOT)?;
    Python::with_gil(|py| {
        let fig = pyplot.bind(py).getattr("figure")?.call0()?;
        Ok(Figure { fig: fig.unbind() })
    })
}

pub fn subplots<const R: usize, const C: usize>(
) -> Result<(Figure, [[Axes; C]; R]), Error> {
    let fig = figure()?;
    let ax = fig.subplots()?;
    Ok((fig, ax))
}

/// Display all open figures.
pub fn show() -> Result<(), Error> {
    let pyplot = pymod!(PYPLOT)?;
    Python::with_gil(|py| {
        pyplot.bind(py).getattr("show")?.call0()?;
        Ok(())
    })
}


impl Axes {
    /// Plot `y` versus `x` as lines and/or markers.
    ///
    /// # Example
    ///
    /// ```no_run
    /// let (fig, [[mut ax]]) = texfig::subplots()?;
    /// ax.xy(&[1., 2., 3., 4.], &[1., 4., 2., 3.]).plot()?;
    /// fig.save().to_file("target/XY_plot.pdf")?;
    /// # Ok::<(), texfig::Error>(())
    /// ```
    #[must_use]
    pub fn xy<'a, D>(&'a mut self, x: &'a D, y: &'a D) -> XY<'a, D>
    where D: AsRef<[f64]> + ?Sized {
        // Mutably borrow `self` to reflect that the final `.plot()`
        // will mutate the underlying Python object.
        XY { axes: self, options: PlotOptions::new(), x, y }
    }

    #[cfg(feature = "curve-sampling")]
    /// Plot the graph of the function `f` on the interval \[`a`, `b`\].
    ///
    /// # Example
    /// ```no_run
    /// let (fig, [[mut ax]]) = texfig::subplots()?;
    /// ax.fun(|x| x * x, 0., 1.).plot()?;
    /// fig.save().to_file("target/Fun_plot.pdf")?;
    /// # Ok::<(), texfig::Error>(())
    /// ```
    #[must_use]
    pub fn fun<'a, F>(&'a mut self, f: F, a: f64, b: f64) -> Fun<'a, F>
    where F: FnMut(f64) -> f64 {
        Fun { axes: self, options: PlotOptions::new(), f, a, b, n: 100 }
    }

    pub fn set_title(&mut self, v: &str) -> Result<&mut Self, Error> {
        meth!(self.ax, set_title, (v,))?;
        Ok(self)
    }

    pub fn set_xlabel(&mut self, label: &str) -> Result<&mut Self, Error> {
        meth!(self.ax, set_xlabel, (label,))?;
        Ok(self)
    }

    pub fn set_ylabel(&mut self, label: &str) -> Result<&mut Self, Error> {
        meth!(self.ax, set_ylabel, (label,))?;
        Ok(self)
    }

    pub fn grid(&mut self) -> Result<&mut Self, Error> {
        meth!(self.ax, grid, (true,))?;
        Ok(self)
    }

    pub fn legend(&mut self) -> Result<&mut Self, Error> {
        meth!(self.ax, legend, ())?;
        Ok(self)
    }

    /// Font size of the x axis label, in points.
    pub fn xlabel_fontsize(&self) -> Result<f64, Error> {
        Python::with_gil(|py| {
            let size = self.ax.bind(py)
                .getattr("xaxis")?.getattr("label")?
                .call_method0("get_fontsize")?
                .extract()?;
            Ok(size)
        })
    }
}

#[derive(Clone)]
struct PlotOptions<'a> {
    fmt: &'a str,
    label: &'a str,
    linewidth: Option<f64>,
}

impl<'a> PlotOptions<'a> {
    fn new() -> PlotOptions<'static> {
        PlotOptions { fmt: "", label: "", linewidth: None }
    }

    fn kwargs<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let kwargs = PyDict::new_bound(py);
        if !self.label.is_empty() {
            kwargs.set_item("label", self.label)?;
        }
        if let Some(w) = self.linewidth {
            kwargs.set_item("linewidth", w)?;
        }
        Ok(kwargs)
    }

    fn plot_xy(&self, axes: &Axes, x: &[f64], y: &[f64]) -> Result<(), Error> {
        Python::with_gil(|py| {
            let xn = PyArray1::from_slice_bound(py, x);
            let yn = PyArray1::from_slice_bound(py, y);
            axes.ax.bind(py).call_method(
                "plot", (xn, yn, self.fmt), Some(&self.kwargs(py)?))?;
            Ok(())
        })
    }
}

/// Declare methods to set the options assuming `self.options` exists.
macro_rules! set_plotoptions { () => {
    /// Format string, e.g. `"r."` for red dots.
    #[must_use]
    pub fn fmt(mut self, fmt: &'a str) -> Self {
        self.options.fmt = fmt;
        self
    }

    /// Label shown in the legend.
    #[must_use]
    pub fn label(mut self, label: &'a str) -> Self {
        self.options.label = label;
        self
    }

    #[must_use]
    pub fn linewidth(mut self, w: f64) -> Self {
        self.options.linewidth = Some(w);
        self
    }
}}

pub struct XY<'a, D>
where D: ?Sized {
    axes: &'a Axes,
    options: PlotOptions<'a>,
    x: &'a D,
    y: &'a D,
}

impl<'a, D> XY<'a, D>
where D: AsRef<[f64]> + ?Sized {
    set_plotoptions!();

    /// Plot the data with the options specified in [`XY`].
    pub fn plot(self) -> Result<(), Error> {
        self.options.plot_xy(self.axes, self.x.as_ref(), self.y.as_ref())
    }
}

/// Options to plot functions (require the library [curve-sampling][]).
///
/// [curve-sampling]: https://crates.io/crates/curve-sampling
#[must_use]
pub struct Fun<'a, F> {
    axes: &'a Axes,
    options: PlotOptions<'a>,
    f: F,
    a: f64, // [a, b] is the interval on which we want to plot f.
    b: f64,
    n: usize,
}

#[cfg(feature = "curve-sampling")]
impl<'a, F> Fun<'a, F>
where F: FnMut(f64) -> f64 {
    set_plotoptions!();

    /// Plot the function with the options specified in [`Fun`].
    pub fn plot(mut self) -> Result<(), Error> {
        let s = Sampling::fun(&mut self.f, self.a, self.b)
            .n(self.n).build();
        let x = s.x();
        let y = s.y();
        self.options.plot_xy(self.axes, &x, &y)
    }

    /// Set the maximum number of evaluations of the function to build
    /// the sampling.  Panic if `n` < 2.
    pub fn n(mut self, n: usize) -> Self {
        if n < 2 {
            panic!("texfig::Fun::n: at least two points are required.");
        }
        self.n = n;
        self
    }
}


#[cfg(doctest)]
doc_comment::doctest!("../README.md");

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};
    use super::*;

    /// Serialise the unit tests touching Matplotlib's global rc state
    /// (`rc_context` restores a snapshot of all of it on exit).
    pub(crate) fn rc_lock() -> MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Like [`rc_lock`], with TeX disabled so that figures can be
    /// rendered without a LaTeX installation.
    pub(crate) fn without_tex() -> Result<MutexGuard<'static, ()>, Error> {
        let guard = rc_lock();
        latex::configure(|cfg| cfg.use_tex = false)?;
        Ok(guard)
    }

    #[test]
    fn error_messages() {
        assert!(Error::ZeroWidth.to_string().contains("aspect"));
        assert_eq!(Error::NoFormat.to_string(),
                   "No output format was requested");
    }

    #[test]
    fn grid_is_row_major() {
        let g: [[(usize, usize); 3]; 2] = grid(|r, c| (r, c));
        assert_eq!(g, [[(0, 0), (0, 1), (0, 2)],
                       [(1, 0), (1, 1), (1, 2)]]);
    }

    #[test]
    fn figure_size_roundtrip() -> Result<(), Error> {
        let _rc = rc_lock();
        let fig = Figure::new()?;
        fig.set_size_inches(4., 3.)?;
        assert_eq!(fig.size_inches()?, (4., 3.));
        Ok(())
    }

    #[test]
    fn subplots_area() -> Result<(), Error> {
        let _rc = rc_lock();
        let fig = Figure::new()?;
        let [[_ax]] = fig.subplots()?;
        fig.subplots_adjust(0.2, 0.7)?;
        let (left, right) = fig.subplotpars()?;
        assert!((left - 0.2).abs() < 1e-12 && (right - 0.7).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn a_basic_svg() -> Result<(), Error> {
        let _rc = without_tex()?;
        let dir = tempfile::tempdir()?;
        let (fig, [[mut ax]]) = subplots()?;
        ax.xy(&[1., 2., 3., 4.], &[1., 4., 2., 3.]).linewidth(3.).plot()?;
        let path = dir.path().join("a_basic.svg");
        fig.save().to_file(&path)?;
        let svg = std::fs::read_to_string(&path)?;
        assert!(svg.contains("stroke-width: 3"));
        fig.close()
    }

    #[test]
    fn a_basic_row() -> Result<(), Error> {
        let _rc = without_tex()?;
        let dir = tempfile::tempdir()?;
        let (fig, [[mut ax0, mut ax1]]) = subplots()?;
        ax0.xy(&[1., 2., 3., 4.], &[1., 4., 2., 3.]).plot()?;
        ax1.xy(&[1., 2., 3., 4.], &[1., 4., 2., 3.]).fmt(".").plot()?;
        let path = dir.path().join("a_basic_row.png");
        fig.save().dpi(50.).to_file(&path)?;
        assert!(path.exists());
        fig.close()
    }

    #[test]
    fn missing_directory() -> Result<(), Error> {
        let _rc = without_tex()?;
        let dir = tempfile::tempdir()?;
        let fig = figure()?;
        let res = fig.save().to_file(dir.path().join("no/such/dir/f.svg"));
        assert!(matches!(res, Err(Error::FileNotFoundError)));
        fig.close()
    }
}
