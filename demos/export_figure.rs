//! Export a figure sized for a LaTeX document.
//!
//! An optional TOML file with the project settings may be given as
//! first argument.  PGF output needs a LaTeX installation; this demo
//! writes PDF and PNG unless `use_tex` is set in the settings.

use std::{error::Error, f64::consts::PI};
use tracing_subscriber::EnvFilter;
use texfig::latex::{self, SideMargin};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
                         .add_directive("texfig=debug".parse()?))
        .init();
    match std::env::args().nth(1) {
        Some(cfg) => latex::configure_from_file(cfg)?,
        None => latex::configure(|cfg| cfg.use_tex = false)?,
    }
    let formats: &[&str] = if latex::config().use_tex {
        &["pgf", "pdf"]
    } else {
        &["pdf", "png"]
    };

    let (fig, [[mut ax]]) = texfig::subplots()?;
    ax.fun(|x| (x * x).sin(), 0., 2. * PI).label("Sine wave").plot()?;
    ax.set_xlabel("X axis label")?.set_ylabel("Y axis label")?;
    ax.grid()?.legend()?;
    let first = fig.export("target/figures/example")
        .fraction(0.9)
        .aspect(0.6)
        .side_margin(SideMargin::Both(0.12))
        .tick_size(8)
        .formats(formats.iter().copied())
        .dpi(200.)
        .save()?;
    tracing::info!(path = %first.display(), "figure exported");
    Ok(())
}
