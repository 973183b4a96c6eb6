//! Regenerate the SVG images shown in the README.
//!
//! cargo run --example generate_example_plots -- docs/examples

use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
                         .add_directive("texfig=info".parse()?))
        .init();
    let dir = std::env::args().nth(1)
        .unwrap_or_else(|| "docs/examples".to_string());
    for path in texfig::chart::generate_readme_examples(&dir)? {
        tracing::info!(path = %path.display(), "example written");
    }
    Ok(())
}
