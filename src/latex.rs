//! Size figures for a LaTeX document and export them as PGF (or any
//! other format Matplotlib can write).
//!
//! The figure is given its final physical size before saving: a
//! fraction of the document's `\textwidth` and a height/width aspect.
//! It must then be included in LaTeX *without* scaling so that the
//! fonts of the figure match the ones of the text.
//!
//! ```no_run
//! use texfig::latex::{self, SideMargin};
//!
//! latex::configure(|cfg| {
//!     cfg.textwidth_pt = 418.25;
//!     cfg.side_margin = Some(SideMargin::Both(0.05));
//! })?;
//! let (fig, [[mut ax]]) = texfig::subplots()?;
//! ax.xy(&[0., 1., 2.], &[0., 1., 4.]).plot()?;
//! fig.export("figures/square")
//!     .fraction(0.5)
//!     .aspect(1.)
//!     .formats(["pgf", "pdf"])
//!     .save()?;
//! # Ok::<(), texfig::Error>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::debug;
use crate::{
    Error, Figure,
    rc::{self, RcParams},
};

/// TeX points per inch.
pub const TEX_POINTS_PER_INCH: f64 = 72.27;

/// Convert TeX points to inches.
pub fn pt_to_in(pt: f64) -> f64 {
    pt / TEX_POINTS_PER_INCH
}

/// TeX engine used by the PGF backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TexEngine {
    #[default]
    Pdflatex,
    Lualatex,
    Xelatex,
}

impl TexEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            TexEngine::Pdflatex => "pdflatex",
            TexEngine::Lualatex => "lualatex",
            TexEngine::Xelatex => "xelatex",
        }
    }
}

/// Extra outer margin, as a fraction of the figure width.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SideMargin {
    /// Same margin on both sides.
    Both(f64),
    /// `(left, right)` margins.
    Split(f64, f64),
}

impl SideMargin {
    /// The requested `(left, right)` fractions.
    pub fn fractions(&self) -> (f64, f64) {
        match *self {
            SideMargin::Both(m) => (m, m),
            SideMargin::Split(l, r) => (l, r),
        }
    }

    /// Positions of the left and right edges of the subplots area,
    /// as accepted by `Figure::subplots_adjust`.  Fractions are
    /// clamped to \[0, 1\].
    pub fn subplot_bounds(&self) -> (f64, f64) {
        let (l, r) = self.fractions();
        (l.clamp(0., 1.), 1. - r.clamp(0., 1.))
    }
}

const DEFAULT_PREAMBLE: &str = r"
\usepackage{amsmath}
\usepackage{amssymb}
\usepackage{siunitx}\sisetup{detect-all}
\providecommand{\mathdefault}[1]{#1}
";

/// Project-wide LaTeX settings.  Fields missing from a configuration
/// file take their default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatexConfig {
    /// The document's `\textwidth`, in TeX points.
    pub textwidth_pt: f64,
    pub engine: TexEngine,
    pub family: String,
    pub serif: Vec<String>,
    pub base_font_pt: u32,
    /// Size of the axes labels; `None` uses `base_font_pt`.
    pub axes_label_pt: Option<u32>,
    pub tick_font_pt: u32,
    pub legend_font_pt: u32,
    pub use_tex: bool,
    pub use_mathtext_for_ticks: bool,
    pub preamble: String,
    /// Default outer margins; `None` leaves the subplots untouched.
    pub side_margin: Option<SideMargin>,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            textwidth_pt: 345.,
            engine: TexEngine::Pdflatex,
            family: "serif".to_string(),
            serif: vec!["Computer Modern".to_string()],
            base_font_pt: 11,
            axes_label_pt: None,
            tick_font_pt: 10,
            legend_font_pt: 10,
            use_tex: true,
            use_mathtext_for_ticks: false,
            preamble: DEFAULT_PREAMBLE.to_string(),
            side_margin: None,
        }
    }
}

impl LatexConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// The Matplotlib rc parameters these settings translate to.
    pub fn rc_params(&self) -> RcParams {
        let mut rc = RcParams::new();
        rc.insert("text.usetex", self.use_tex)
            .insert("font.family", self.family.as_str())
            .insert("font.serif", self.serif.clone())
            .insert("font.size", self.base_font_pt)
            .insert("axes.labelsize",
                    self.axes_label_pt.unwrap_or(self.base_font_pt))
            .insert("legend.fontsize", self.legend_font_pt)
            .insert("xtick.labelsize", self.tick_font_pt)
            .insert("ytick.labelsize", self.tick_font_pt)
            .insert("axes.formatter.use_mathtext",
                    self.use_mathtext_for_ticks)
            .insert("pgf.texsystem", self.engine.as_str())
            .insert("pgf.rcfonts", false)
            .insert("pgf.preamble", self.preamble.as_str());
        rc
    }

    /// Push these settings into `matplotlib.rcParams`.
    pub fn apply(&self) -> Result<(), Error> {
        self.rc_params().apply()
    }
}

lazy_static! {
    static ref SETTINGS: RwLock<LatexConfig> =
        RwLock::new(LatexConfig::default());
}

/// Whether `SETTINGS` has been pushed to Matplotlib at least once.
static APPLIED: AtomicBool = AtomicBool::new(false);

/// Snapshot of the project-wide settings.
pub fn config() -> LatexConfig {
    match SETTINGS.read() {
        Ok(cfg) => cfg.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Modify the project-wide settings and apply them to Matplotlib.
/// Call it once near the start of the program.
pub fn configure(f: impl FnOnce(&mut LatexConfig)) -> Result<(), Error> {
    let cfg = {
        let mut cfg = SETTINGS.write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *cfg);
        cfg.clone()
    };
    cfg.apply()?;
    APPLIED.store(true, Ordering::SeqCst);
    Ok(())
}

/// Replace the project-wide settings by the content of the TOML file
/// `path` and apply them.
pub fn configure_from_file(path: impl AsRef<Path>) -> Result<(), Error> {
    let new = LatexConfig::from_file(path)?;
    configure(|cfg| *cfg = new)
}

/// Push the settings to Matplotlib if `configure` never did.
pub(crate) fn ensure_applied() -> Result<(), Error> {
    if !APPLIED.load(Ordering::SeqCst) {
        config().apply()?;
        APPLIED.store(true, Ordering::SeqCst);
    }
    Ok(())
}

/// Aspect ratio (height / width) to use: `requested` if any, the one
/// of a figure of size `(width, height)` otherwise.
pub fn resolve_aspect(
    requested: Option<f64>, (width, height): (f64, f64)
) -> Result<f64, Error> {
    match requested {
        Some(aspect) => Ok(aspect),
        None if width <= 0. => Err(Error::ZeroWidth),
        None => {
            let aspect = height / width;
            debug!(aspect, "aspect inferred from the figure");
            Ok(aspect)
        }
    }
}

/// Physical size of a figure, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
}

/// Size of a figure spanning `fraction` of a text block
/// `textwidth_pt` wide, with the given height/width `aspect`.
pub fn physical_size(
    textwidth_pt: f64, fraction: f64, aspect: f64
) -> FigureSize {
    let width_in = pt_to_in(textwidth_pt) * fraction;
    FigureSize { width_in, height_in: width_in * aspect }
}

/// The files written for the base path `name`: its extension (if
/// any) is replaced by each of the `formats`, in order.
pub fn output_paths<S: AsRef<str>>(
    name: &Path, formats: &[S]
) -> Vec<PathBuf> {
    formats.iter().map(|f| name.with_extension(f.as_ref())).collect()
}

/// Options of an export, created by [`Figure::export`].
#[derive(Debug)]
#[must_use]
pub struct Export {
    fig: Figure,
    name: PathBuf,
    fraction: f64,
    aspect: Option<f64>,
    show: bool,
    formats: Vec<String>,
    dpi: Option<f64>,
    bbox_inches: Option<String>,
    font_size: Option<u32>,
    axes_label_size: Option<u32>,
    tick_size: Option<u32>,
    legend_size: Option<u32>,
    side_margin: Option<SideMargin>,
}

impl Export {
    pub(crate) fn new(fig: Figure, name: impl AsRef<Path>) -> Self {
        Export {
            fig,
            name: name.as_ref().to_path_buf(),
            fraction: 1.,
            aspect: None,
            show: false,
            formats: vec!["pgf".to_string()],
            dpi: None,
            bbox_inches: None,
            font_size: None,
            axes_label_size: None,
            tick_size: None,
            legend_size: None,
            side_margin: None,
        }
    }

    /// Fraction of `\textwidth` the figure occupies (default: 1).
    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Height / width.  If not set, the current ratio of the figure
    /// is kept.
    pub fn aspect(mut self, aspect: f64) -> Self {
        self.aspect = Some(aspect);
        self
    }

    /// Display the figure after saving it (default: false).
    pub fn show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    /// Formats to save, e.g. `["pgf", "pdf", "png"]` (default: pgf).
    pub fn formats<I, S>(mut self, formats: I) -> Self
    where I: IntoIterator<Item = S>, S: Into<String> {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Resolution of raster outputs.
    pub fn dpi(mut self, dpi: f64) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// See [`crate::Savefig::bbox_inches`].
    pub fn bbox_inches(mut self, bbox: &str) -> Self {
        self.bbox_inches = Some(bbox.to_string());
        self
    }

    pub fn font_size(mut self, pt: u32) -> Self {
        self.font_size = Some(pt);
        self
    }

    pub fn axes_label_size(mut self, pt: u32) -> Self {
        self.axes_label_size = Some(pt);
        self
    }

    /// Size of the tick labels of both axes.
    pub fn tick_size(mut self, pt: u32) -> Self {
        self.tick_size = Some(pt);
        self
    }

    pub fn legend_size(mut self, pt: u32) -> Self {
        self.legend_size = Some(pt);
        self
    }

    /// Outer margins for this figure, overriding the project default.
    pub fn side_margin(mut self, margin: SideMargin) -> Self {
        self.side_margin = Some(margin);
        self
    }

    /// Font overrides valid for the duration of the export.
    fn overrides(&self) -> RcParams {
        let mut rc = RcParams::new();
        if let Some(pt) = self.font_size {
            rc.insert("font.size", pt);
        }
        if let Some(pt) = self.axes_label_size {
            rc.insert("axes.labelsize", pt);
        }
        if let Some(pt) = self.tick_size {
            rc.insert("xtick.labelsize", pt).insert("ytick.labelsize", pt);
        }
        if let Some(pt) = self.legend_size {
            rc.insert("legend.fontsize", pt);
        }
        rc
    }

    fn save_all(&self, paths: &[PathBuf]) -> Result<(), Error> {
        self.fig.draw()?;
        let mut savefig = self.fig.save();
        if let Some(dpi) = self.dpi {
            savefig.dpi(dpi);
        }
        if let Some(bbox) = &self.bbox_inches {
            savefig.bbox_inches(bbox);
        }
        for path in paths {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            savefig.to_file(path)?;
            debug!(path = %path.display(), "figure saved");
        }
        Ok(())
    }

    /// Resize the figure, save it in every requested format, then
    /// close it.  Return the path of the first file written.
    pub fn save(self) -> Result<PathBuf, Error> {
        let paths = output_paths(&self.name, &self.formats);
        let first = paths.first().cloned().ok_or(Error::NoFormat)?;
        ensure_applied()?;
        let cfg = config();

        let aspect = resolve_aspect(self.aspect, self.fig.size_inches()?)?;
        let size = physical_size(cfg.textwidth_pt, self.fraction, aspect);
        self.fig.set_size_inches(size.width_in, size.height_in)?;

        if let Some(margin) = self.side_margin.or(cfg.side_margin) {
            let (left, right) = margin.subplot_bounds();
            self.fig.subplots_adjust(left, right)?;
            let (l, r) = margin.fractions();
            debug!(left = l, right = r, "side margins set");
        }

        let overrides = self.overrides();
        if overrides.is_empty() {
            self.save_all(&paths)?;
        } else {
            rc::rc_context(&overrides, || self.save_all(&paths))?;
        }

        if self.show {
            crate::show()?;
        }
        self.fig.close()?;
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rc::RcValue;

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-12 }

    #[test]
    fn points_to_inches() {
        assert_eq!(pt_to_in(72.27), 1.);
        assert!(close(pt_to_in(345.), 4.773765047737651));
    }

    #[test]
    fn size_from_textwidth() {
        let s = physical_size(72.27 * 6., 0.5, 0.75);
        assert!(close(s.width_in, 3.));
        assert!(close(s.height_in, 2.25));
    }

    #[test]
    fn aspect_given_wins() -> Result<(), Error> {
        assert_eq!(resolve_aspect(Some(1.2), (0., 3.))?, 1.2);
        Ok(())
    }

    #[test]
    fn aspect_inferred() -> Result<(), Error> {
        assert_eq!(resolve_aspect(None, (4., 3.))?, 0.75);
        Ok(())
    }

    #[test]
    fn aspect_zero_width() {
        assert!(matches!(resolve_aspect(None, (0., 3.)),
                         Err(Error::ZeroWidth)));
        assert!(matches!(resolve_aspect(None, (-1., 3.)),
                         Err(Error::ZeroWidth)));
    }

    #[test]
    fn margins() {
        assert_eq!(SideMargin::Both(0.12).fractions(), (0.12, 0.12));
        assert_eq!(SideMargin::Split(0.1, 0.2).subplot_bounds(), (0.1, 0.8));
        assert_eq!(SideMargin::Split(-0.5, 1.5).subplot_bounds(), (0., 0.));
    }

    #[test]
    fn rc_of_defaults() {
        let rc = LatexConfig::default().rc_params();
        assert_eq!(rc.len(), 12);
        assert_eq!(rc.get("axes.labelsize"), Some(&RcValue::Int(11)));
        assert_eq!(rc.get("pgf.texsystem"),
                   Some(&RcValue::Str("pdflatex".into())));
        assert_eq!(rc.get("pgf.rcfonts"), Some(&RcValue::Bool(false)));
        assert_eq!(rc.get("font.serif"),
                   Some(&RcValue::List(vec!["Computer Modern".into()])));
    }

    #[test]
    fn rc_axes_label_override() {
        let cfg = LatexConfig { axes_label_pt: Some(9), ..Default::default() };
        assert_eq!(cfg.rc_params().get("axes.labelsize"),
                   Some(&RcValue::Int(9)));
    }

    #[test]
    fn toml_partial() -> Result<(), Error> {
        let cfg = LatexConfig::from_toml_str(r#"
            textwidth_pt = 418.25
            engine = "lualatex"
            side_margin = [0.05, 0.1]
        "#)?;
        assert_eq!(cfg.textwidth_pt, 418.25);
        assert_eq!(cfg.engine, TexEngine::Lualatex);
        assert_eq!(cfg.side_margin, Some(SideMargin::Split(0.05, 0.1)));
        assert_eq!(cfg.base_font_pt, 11);
        assert!(cfg.use_tex);
        Ok(())
    }

    #[test]
    fn toml_single_margin() -> Result<(), Error> {
        let cfg = LatexConfig::from_toml_str("side_margin = 0.12")?;
        assert_eq!(cfg.side_margin, Some(SideMargin::Both(0.12)));
        Ok(())
    }

    #[test]
    fn toml_unknown_field() {
        let res = LatexConfig::from_toml_str("textwidth = 400.0");
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn paths_per_format() {
        let p = output_paths(Path::new("figures/example"), &["pgf", "pdf"]);
        assert_eq!(p, [PathBuf::from("figures/example.pgf"),
                       PathBuf::from("figures/example.pdf")]);
        let p = output_paths(Path::new("plot.old"), &["png"]);
        assert_eq!(p, [PathBuf::from("plot.png")]);
        assert!(output_paths::<&str>(Path::new("x"), &[]).is_empty());
    }

    #[test]
    fn font_overrides() -> Result<(), Error> {
        let _rc = crate::tests::rc_lock();
        let export = crate::Figure::new()?.export("x")
            .tick_size(8)
            .legend_size(7);
        let rc = export.overrides();
        assert_eq!(rc.len(), 3);
        assert_eq!(rc.get("xtick.labelsize"), Some(&RcValue::Int(8)));
        assert_eq!(rc.get("ytick.labelsize"), Some(&RcValue::Int(8)));
        assert_eq!(rc.get("legend.fontsize"), Some(&RcValue::Int(7)));
        Ok(())
    }
}
