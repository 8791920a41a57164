//! `pinwalk report`: turn a JSON scan result into a static HTML page.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use pinwalk_core::report::ScanReport;
use tracing::info;

use crate::html::render_html;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// JSON written by `pinwalk scan --format json` or `--output`.
    #[arg(value_name = "INPUT_JSON")]
    pub input: PathBuf,

    /// Destination HTML file.
    #[arg(value_name = "OUTPUT_HTML")]
    pub output: PathBuf,

    /// Repository name for the page title. Defaults to the input file stem.
    #[arg(long, value_name = "REPO_NAME")]
    pub name: Option<String>,
}

impl ReportArgs {
    fn repo_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.input
                .file_stem()
                .map_or_else(|| "repository".to_string(), |s| s.to_string_lossy().into_owned())
        })
    }
}

/// Execute `pinwalk report`.
///
/// # Errors
///
/// Fails if the input cannot be read or parsed, or the output cannot be written.
pub fn run_report(args: &ReportArgs) -> Result<()> {
    let report = read_report(&args.input)?;
    let html = render_html(&report, &args.repo_name(), chrono::Utc::now())
        .context("failed to render HTML")?;
    std::fs::write(&args.output, html)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(path = %args.output.display(), "HTML report generated");
    println!("HTML report generated: {}", args.output.display());
    Ok(())
}

fn read_report(path: &Path) -> Result<ScanReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
