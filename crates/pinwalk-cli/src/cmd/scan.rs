//! `pinwalk scan`: walk a repository's action dependencies.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use pinwalk_core::config::{self, ScanConfig};
use pinwalk_core::error::ErrorCode;
use pinwalk_core::lock::WorkspaceLock;
use pinwalk_core::report::ScanReport;
use pinwalk_core::traversal::Traversal;
use tracing::info;

use crate::git::GitSource;
use crate::output::{
    CliError, OutputMode, render_error, render_mode, render_report_pretty, render_report_text,
    resolve_output_mode,
};

/// How long to wait for another scan to release the workspace.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Clone URL (or local path) of the repository whose workflows seed the scan.
    #[arg(value_name = "REPO_URL")]
    pub repo_url: String,

    /// Directory that receives every working copy.
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Stop fetching after this many actions (0 = unlimited).
    #[arg(long, value_name = "N")]
    pub max_actions: Option<usize>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, hide = true)]
    pub json: bool,

    /// Also write the JSON report to this file.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    /// Fold command-line overrides into the resolved config.
    fn apply_overrides(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(ref workspace) = self.workspace {
            config.workspace.clone_from(workspace);
        }
        if let Some(max_actions) = self.max_actions {
            config.max_actions = max_actions;
        }
        config
    }
}

/// Execute `pinwalk scan`.
///
/// # Errors
///
/// Fails on an empty locator, an unreadable config, a busy workspace, or a
/// root repository that cannot be fetched. Per-action failures are reported
/// as warnings and do not fail the command.
pub fn run_scan(args: &ScanArgs, project_root: &Path) -> Result<()> {
    let flag_mode = resolve_output_mode(args.format, args.json, None);

    if args.repo_url.trim().is_empty() {
        render_error(
            flag_mode,
            &CliError::from_code(ErrorCode::MissingRootLocator, "repository URL is empty"),
        )?;
        anyhow::bail!("{}", ErrorCode::MissingRootLocator.message());
    }

    let config = match config::resolve_config(project_root) {
        Ok(config) => args.apply_overrides(config),
        Err(err) => {
            render_error(flag_mode, &CliError::from_code(err.code(), err.to_string()))?;
            return Err(err).context("failed to load configuration");
        }
    };
    let mode = resolve_output_mode(args.format, args.json, config.output.as_deref());

    let lock = match WorkspaceLock::acquire(&config.workspace, LOCK_TIMEOUT) {
        Ok(lock) => lock,
        Err(err) => {
            render_error(mode, &CliError::from_code(err.code(), err.to_string()))?;
            return Err(err).context("failed to lock scan workspace");
        }
    };
    info!(workspace = %config.workspace.display(), "workspace locked");

    let source = GitSource::new(
        config.git_program.clone(),
        config.source_base_url.clone(),
        &config.workspace,
    );
    let outcome = match Traversal::new(&source, config.limits()).run(&args.repo_url) {
        Ok(outcome) => outcome,
        Err(err) => {
            render_error(mode, &CliError::from_code(err.code(), err.to_string()))?;
            return Err(err).context("scan aborted");
        }
    };
    lock.release();

    let report = ScanReport::from_outcome(&outcome);
    if let Some(ref path) = args.output {
        write_json_report(&report, path)?;
        info!(path = %path.display(), "JSON report written");
    }

    render_mode(mode, &report, render_report_text, render_report_pretty)
}

fn write_json_report(report: &ScanReport, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    json.push('\n');
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> ScanArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ScanArgs,
        }

        let mut argv = vec!["scan", "https://example.com/org/repo.git"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).args
    }

    #[test]
    fn overrides_replace_config_values() {
        let config = args(&["--workspace", "elsewhere", "--max-actions", "0"])
            .apply_overrides(ScanConfig::default());
        assert_eq!(config.workspace, PathBuf::from("elsewhere"));
        assert_eq!(config.max_actions, 0);
        assert_eq!(config.limits().max_actions, None);
    }

    #[test]
    fn absent_overrides_keep_config_values() {
        let config = args(&[]).apply_overrides(ScanConfig::default());
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn json_report_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("result.json");
        let mut report = ScanReport::default();
        report.all_actions.push("org/tool@v1".to_string());

        write_json_report(&report, &path).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        let back: ScanReport = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, report);
    }
}
