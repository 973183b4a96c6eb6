//! Static SVG charts for the documentation.
//!
//! The charts are written as plain SVG text (no Python needed): a
//! sampled curve is mapped from data coordinates to pixels inside a
//! plot area delimited by fixed margins, and decorated with a dashed
//! grid, tick labels, axis labels and a legend.

use std::{
    f64::consts::{FRAC_PI_2, PI},
    fs,
    path::{Path, PathBuf},
};
use ndarray::Array1;
use tracing::debug;
use crate::Error;

/// Number of samples of the example curve.
pub const DEFAULT_SAMPLES: usize = 400;

/// Fraction of the y span added above and below the data.
pub const DEFAULT_Y_PADDING: f64 = 0.05;

const X_TICKS: [f64; 5] = [0., FRAC_PI_2, PI, 3. * FRAC_PI_2, 2. * PI];
const Y_TICKS: [f64; 5] = [-1., -0.5, 0., 0.5, 1.];
const LINE_COLOR: &str = "#1f77b4";

/// Sample `x ↦ sin(x²)` at `samples` equally spaced points of
/// \[0, 2π\] (both ends included).
pub fn sample_sin_squared(samples: usize) -> (Array1<f64>, Array1<f64>) {
    let x = match samples {
        0 | 1 => Array1::zeros(samples),
        n => Array1::linspace(0., 2. * PI, n),
    };
    let y = x.mapv(|x| (x * x).sin());
    (x, y)
}

/// Label for a tick at `value`: multiples of π/2 up to 2π are
/// written with π, anything else with two decimals.
pub fn format_pi(value: f64) -> String {
    let multiples = value / FRAC_PI_2;
    let k = multiples.round();
    if !((multiples - k).abs() <= 1e-6) {
        return format!("{value:.2}");
    }
    let label = match k as i64 {
        0 => "0",
        1 => "π/2",
        2 => "π",
        3 => "3π/2",
        4 => "2π",
        _ => return format!("{value:.2}"),
    };
    label.to_string()
}

/// Size of the image and of the margins around the plot area, in
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl ChartLayout {
    pub fn plot_width(&self) -> u32 {
        self.width.saturating_sub(self.left.saturating_add(self.right))
    }

    pub fn plot_height(&self) -> u32 {
        self.height.saturating_sub(self.top.saturating_add(self.bottom))
    }
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Position of `v` in `[lo, hi]` as a fraction; the middle when the
/// range is a single point.
fn normalize(v: f64, (lo, hi): (f64, f64)) -> f64 {
    let span = hi - lo;
    if span == 0. { 0.5 } else { (v - lo) / span }
}

/// Linear map from data coordinates to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    layout: ChartLayout,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    /// Frame tightly enclosing `xs`, and `ys` widened by `y_padding`
    /// times its span on both sides.  Empty data gives the range
    /// \[0, 1\].
    pub fn fit(
        xs: &[f64], ys: &[f64], layout: ChartLayout, y_padding: f64
    ) -> Self {
        let x = bounds(xs).unwrap_or((0., 1.));
        let (lo, hi) = bounds(ys).unwrap_or((0., 1.));
        let pad = (hi - lo) * y_padding;
        Frame { layout, x, y: (lo - pad, hi + pad) }
    }

    pub fn x_range(&self) -> (f64, f64) { self.x }

    pub fn y_range(&self) -> (f64, f64) { self.y }

    pub fn x_to_px(&self, x: f64) -> f64 {
        f64::from(self.layout.left)
            + normalize(x, self.x) * f64::from(self.layout.plot_width())
    }

    /// SVG's y axis points down.
    pub fn y_to_px(&self, y: f64) -> f64 {
        f64::from(self.layout.height) - f64::from(self.layout.bottom)
            - normalize(y, self.y) * f64::from(self.layout.plot_height())
    }
}

/// Pixel coordinates of the points `(xs[i], ys[i])`.
pub fn map_points(
    xs: &[f64], ys: &[f64], layout: ChartLayout, y_padding: f64
) -> Vec<(f64, f64)> {
    let frame = Frame::fit(xs, ys, layout, y_padding);
    xs.iter().zip(ys)
        .map(|(&x, &y)| (frame.x_to_px(x), frame.y_to_px(y)))
        .collect()
}

/// Texts of a chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartLabels {
    pub title: String,
    pub subtitle: String,
    /// Note printed under the plot.
    pub side_label: String,
    pub legend_label: String,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// A line chart rendered as an SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgChart {
    pub layout: ChartLayout,
    pub labels: ChartLabels,
    pub y_padding: f64,
}

impl SvgChart {
    pub fn new(layout: ChartLayout) -> Self {
        SvgChart {
            layout,
            labels: ChartLabels::default(),
            y_padding: DEFAULT_Y_PADDING,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.labels.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.labels.subtitle = subtitle.into();
        self
    }

    pub fn with_side_label(mut self, label: impl Into<String>) -> Self {
        self.labels.side_label = label.into();
        self
    }

    pub fn with_legend_label(mut self, label: impl Into<String>) -> Self {
        self.labels.legend_label = label.into();
        self
    }

    pub fn with_y_padding(mut self, y_padding: f64) -> Self {
        self.y_padding = y_padding;
        self
    }

    /// The SVG document plotting `ys` against `xs`.
    pub fn render(&self, xs: &[f64], ys: &[f64]) -> String {
        let frame = Frame::fit(xs, ys, self.layout, self.y_padding);
        let ChartLayout { width, height, left, top, .. } = self.layout;
        let plot_w = self.layout.plot_width();
        let plot_h = self.layout.plot_height();
        let (w, h) = (f64::from(width), f64::from(height));
        let (l, t) = (f64::from(left), f64::from(top));
        let b = f64::from(self.layout.bottom);
        let (pw, ph) = (f64::from(plot_w), f64::from(plot_h));
        let labels = &self.labels;

        let points = xs.iter().zip(ys)
            .map(|(&x, &y)| {
                format!("{:.2},{:.2}", frame.x_to_px(x), frame.y_to_px(y))
            })
            .collect::<Vec<_>>()
            .join(" ");

        let mut svg = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#),
            r##"  <rect x="0" y="0" width="100%" height="100%" fill="#ffffff" />"##.to_string(),
            "  <style>text { font-family: 'DejaVu Sans', Arial, sans-serif; fill: #222; }</style>".to_string(),
            format!(r#"  <text x="{:.1}" y="{:.1}" font-size="24" text-anchor="middle">{}</text>"#,
                    w / 2., t * 0.55, escape(&labels.title)),
            format!(r##"  <text x="{:.1}" y="{:.1}" font-size="16" text-anchor="middle" fill="#555">{}</text>"##,
                    w / 2., t * 0.55 + 24., escape(&labels.subtitle)),
            format!(r##"  <rect x="{left}" y="{top}" width="{plot_w}" height="{plot_h}" fill="#fafafa" stroke="#d0d0d0" stroke-width="1" />"##),
        ];

        for xt in X_TICKS {
            let x = frame.x_to_px(xt);
            svg.push(format!(
                r##"  <line x1="{x:.2}" y1="{top}" x2="{x:.2}" y2="{}" stroke="#e0e0e0" stroke-width="1" stroke-dasharray="4 4" />"##,
                top + plot_h));
        }
        for yt in Y_TICKS {
            let y = frame.y_to_px(yt);
            svg.push(format!(
                r##"  <line x1="{left}" y1="{y:.2}" x2="{}" y2="{y:.2}" stroke="#e0e0e0" stroke-width="1" stroke-dasharray="4 4" />"##,
                left + plot_w));
        }

        let (ylab_x, ylab_y) = (l * 0.35, t + ph / 2.);
        svg.push(format!(
            r#"  <text x="{:.2}" y="{:.2}" font-size="18" text-anchor="middle">X axis label</text>"#,
            l + pw / 2., h - b / 2.));
        svg.push(format!(
            r#"  <text x="{ylab_x:.2}" y="{ylab_y:.2}" font-size="18" text-anchor="middle" transform="rotate(-90 {ylab_x:.2} {ylab_y:.2})">Y axis label</text>"#));

        for xt in X_TICKS {
            svg.push(format!(
                r#"  <text x="{:.2}" y="{:.2}" font-size="14" text-anchor="middle">{}</text>"#,
                frame.x_to_px(xt), h - b + 24., format_pi(xt)));
        }
        for yt in Y_TICKS {
            svg.push(format!(
                r#"  <text x="{:.2}" y="{:.2}" font-size="14" text-anchor="end">{yt}</text>"#,
                l - 12., frame.y_to_px(yt) + 5.));
        }

        svg.push(format!(
            r#"  <polyline points="{points}" fill="none" stroke="{LINE_COLOR}" stroke-width="2.5" />"#));

        let (lx, ly) = (l + pw * 0.03, t + ph * 0.08);
        svg.push(format!(
            r##"  <rect x="{:.2}" y="{:.2}" width="180" height="40" rx="6" ry="6" fill="#ffffff" stroke="#d0d0d0" />"##,
            lx - 10., ly - 18.));
        svg.push(format!(
            r#"  <line x1="{lx:.2}" y1="{ly:.2}" x2="{:.2}" y2="{ly:.2}" stroke="{LINE_COLOR}" stroke-width="2.5" />"#,
            lx + 60.));
        svg.push(format!(
            r#"  <text x="{:.2}" y="{:.2}" font-size="15">{}</text>"#,
            lx + 70., ly + 5., escape(&labels.legend_label)));

        svg.push(format!(
            r##"  <text x="{:.1}" y="{:.1}" font-size="15" text-anchor="middle" fill="#666">{}</text>"##,
            w / 2., h - b * 0.25, escape(&labels.side_label)));
        svg.push("</svg>".to_string());
        svg.join("\n")
    }

    /// Render the chart and write it to `path`.
    pub fn write(
        &self, path: impl AsRef<Path>, xs: &[f64], ys: &[f64]
    ) -> Result<(), Error> {
        fs::write(path.as_ref(), self.render(xs, ys))?;
        debug!(path = %path.as_ref().display(), "chart written");
        Ok(())
    }
}

/// A documentation image: where to write it and how it looks.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub file_name: &'static str,
    pub chart: SvgChart,
}

fn example(layout: ChartLayout, subtitle: &str, side_label: &str) -> SvgChart {
    SvgChart::new(layout)
        .with_title("Example Plot")
        .with_subtitle(subtitle)
        .with_side_label(side_label)
        .with_legend_label("Sine wave")
}

/// The charts illustrating the export options in the README.
pub fn readme_presets() -> Vec<Preset> {
    vec![
        Preset {
            file_name: "auto_height_no_margins.svg",
            chart: example(
                ChartLayout { width: 900, height: 600,
                              left: 80, right: 40, top: 80, bottom: 90 },
                "Auto height • Side margins disabled",
                "export_latex(fig, name=..., fraction=1.0)"),
        },
        Preset {
            file_name: "tall_aspect.svg",
            chart: example(
                ChartLayout { width: 900, height: 840,
                              left: 80, right: 40, top: 80, bottom: 110 },
                "Fixed aspect = 1.2 (taller)",
                "export_latex(fig, name=..., aspect=1.2)"),
        },
        Preset {
            file_name: "wide_margins.svg",
            chart: example(
                ChartLayout { width: 900, height: 600,
                              left: 160, right: 160, top: 80, bottom: 90 },
                "Side margin = 0.12",
                "export_latex(fig, name=..., side_margin=0.12)"),
        },
    ]
}

/// Write every chart of [`readme_presets`] into `dir` (created if
/// needed) and return the paths written.
pub fn generate_readme_examples(
    dir: impl AsRef<Path>
) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let (x, y) = sample_sin_squared(DEFAULT_SAMPLES);
    let (xs, ys) = (x.to_vec(), y.to_vec());
    readme_presets().into_iter()
        .map(|p| -> Result<PathBuf, Error> {
            let path = dir.join(p.file_name);
            p.chart.write(&path, &xs, &ys)?;
            Ok(path)
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SMALL: ChartLayout = ChartLayout {
        width: 200, height: 100, left: 20, right: 20, top: 10, bottom: 10 };

    #[test]
    fn pi_labels() {
        let labels: Vec<_> = X_TICKS.iter().map(|&x| format_pi(x)).collect();
        assert_eq!(labels, ["0", "π/2", "π", "3π/2", "2π"]);
        assert_eq!(format_pi(1.), "1.00");
        assert_eq!(format_pi(5. * FRAC_PI_2), "7.85");
        assert_eq!(format_pi(-FRAC_PI_2), "-1.57");
        assert_eq!(format_pi(PI + 1e-9), "π");
    }

    #[test]
    fn sampling() {
        let (x, y) = sample_sin_squared(DEFAULT_SAMPLES);
        assert_eq!(x.len(), 400);
        assert_eq!(x[0], 0.);
        assert!((x[399] - 2. * PI).abs() < 1e-12);
        assert!((y[200] - (x[200] * x[200]).sin()).abs() < 1e-15);
        assert_eq!(sample_sin_squared(1).0.len(), 1);
        assert!(sample_sin_squared(0).0.is_empty());
    }

    #[test]
    fn plot_area() {
        assert_eq!(SMALL.plot_width(), 160);
        assert_eq!(SMALL.plot_height(), 80);
        let cramped = ChartLayout { width: 10, ..SMALL };
        assert_eq!(cramped.plot_width(), 0);
        let huge = ChartLayout { left: u32::MAX, bottom: u32::MAX, ..SMALL };
        assert_eq!(huge.plot_width(), 0);
        assert_eq!(huge.plot_height(), 0);
    }

    #[test]
    fn linear_mapping() {
        let pts = map_points(&[0., 1., 2.], &[0., 1., 2.], SMALL, 0.);
        assert_eq!(pts, [(20., 90.), (100., 50.), (180., 10.)]);
    }

    #[test]
    fn y_padding_widens_range() {
        let frame = Frame::fit(&[0., 1.], &[-1., 1.], SMALL, 0.05);
        assert_eq!(frame.x_range(), (0., 1.));
        let (lo, hi) = frame.y_range();
        assert!((lo + 1.1).abs() < 1e-12 && (hi - 1.1).abs() < 1e-12);
        // The extreme data points stay inside the plot area.
        let top = frame.y_to_px(1.);
        assert!(top > 10. && top < 50.);
        assert!((frame.y_to_px(0.) - 50.).abs() < 1e-12);
    }

    #[test]
    fn degenerate_ranges() {
        let pts = map_points(&[3., 3.], &[7., 7.], SMALL, 0.05);
        assert_eq!(pts, [(100., 50.), (100., 50.)]);
    }

    #[test]
    fn empty_data() {
        assert!(map_points(&[], &[], SMALL, 0.05).is_empty());
        let svg = SvgChart::new(SMALL).render(&[], &[]);
        assert!(svg.contains(r#"<polyline points="" "#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn mismatched_lengths() {
        let pts = map_points(&[0., 1., 2.], &[0., 1.], SMALL, 0.);
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn document_structure() {
        let svg = SvgChart::new(SMALL)
            .with_title("A <b> & c")
            .with_legend_label("data")
            .with_y_padding(0.)
            .render(&[0., 1., 2.], &[0., 1., 2.]);
        let lines: Vec<_> = svg.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert_eq!(lines[1], r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">"#);
        assert_eq!(lines[4], r#"  <text x="100.0" y="5.5" font-size="24" text-anchor="middle">A &lt;b&gt; &amp; c</text>"#);
        assert_eq!(lines.last(), Some(&"</svg>"));
        assert_eq!(lines.iter().filter(|l| l.contains("<line ")).count(), 11);
        assert!(svg.contains(r#"<polyline points="20.00,90.00 100.00,50.00 180.00,10.00" fill="none""#));
        assert!(svg.contains(r#"text-anchor="end">-0.5</text>"#));
        assert!(svg.contains(r#"text-anchor="middle">3π/2</text>"#));
        assert!(svg.contains(r#"font-size="15">data</text>"#));
    }

    #[test]
    fn preset_layouts() {
        let presets = readme_presets();
        let names: Vec<_> = presets.iter().map(|p| p.file_name).collect();
        assert_eq!(names, ["auto_height_no_margins.svg", "tall_aspect.svg",
                           "wide_margins.svg"]);
        assert_eq!(presets[1].chart.layout.plot_height(), 650);
        assert_eq!(presets[2].chart.layout.plot_width(), 580);
        assert!(presets.iter().all(|p| p.chart.labels.title == "Example Plot"));
    }

    #[test]
    fn readme_examples_written() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("docs");
        let paths = generate_readme_examples(&out)?;
        assert_eq!(paths.len(), 3);
        let svg = fs::read_to_string(&paths[0])?;
        assert!(svg.contains(r#"y="534.00" font-size="14" text-anchor="middle">π</text>"#));
        assert!(svg.contains("export_latex(fig, name=..., fraction=1.0)"));
        Ok(())
    }
}
