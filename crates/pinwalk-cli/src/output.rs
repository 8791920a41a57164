//! Output layer for pretty/text/JSON rendering of scan results.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `PINWALK_FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` key from `pinwalk.toml` or the user config
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use pinwalk_core::error::ErrorCode;
use pinwalk_core::report::ScanReport;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sectioned output for people.
    Pretty,
    /// Tab-separated rows for pipes and scripts.
    Text,
    /// The canonical JSON report.
    Json,
}

impl OutputMode {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Core resolution logic, separated from I/O for testability.
///
/// Unknown env or config values fall through to the next source.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    format_config: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    if let Some(mode) = format_env
        .and_then(OutputMode::from_name)
        .or_else(|| format_config.and_then(OutputMode::from_name))
    {
        return mode;
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from flags, environment, config and TTY defaults.
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_config: Option<&str>,
) -> OutputMode {
    let env_val = std::env::var("PINWALK_FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(
        format_flag,
        json_flag,
        env_val.as_deref(),
        format_config,
        is_tty,
    )
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match error.error_code {
                Some(ref code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Sectioned human summary of a scan.
pub fn render_report_pretty(report: &ScanReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Dependency Map")?;
    for (parent, children) in report.dependencies_root_first() {
        writeln!(w, "{parent}")?;
        if children.is_empty() {
            writeln!(w, "  (no further dependencies)")?;
        }
        for child in children {
            writeln!(w, "  - {child}")?;
        }
    }
    writeln!(w)?;

    pretty_section(w, "Docker Warnings")?;
    let mut any_warnings = false;
    for (node, _) in report.dependencies_root_first() {
        let warnings = report.warnings_for(node);
        if warnings.is_empty() {
            continue;
        }
        any_warnings = true;
        writeln!(w, "{node}")?;
        for warning in warnings {
            writeln!(w, "  - {warning}")?;
        }
    }
    if !any_warnings {
        writeln!(w, "(no docker-related warnings)")?;
    }
    writeln!(w)?;

    pretty_section(w, "Unique external actions discovered")?;
    for action in &report.all_actions {
        writeln!(w, "- {action}")?;
    }
    writeln!(w)?;

    let summary = report.summary();
    pretty_kv(w, "Total", summary.actions.to_string())?;
    pretty_kv(w, "Edges", summary.edges.to_string())?;
    pretty_kv(w, "Warnings", summary.warnings.to_string())
}

/// One row per edge (`dep`), warning (`warn`) and action (`action`).
pub fn render_report_text(report: &ScanReport, w: &mut dyn Write) -> io::Result<()> {
    for (parent, children) in report.dependencies_root_first() {
        for child in children {
            writeln!(w, "dep\t{parent}\t{child}")?;
        }
    }
    for (node, _) in report.dependencies_root_first() {
        for warning in report.warnings_for(node) {
            writeln!(w, "warn\t{node}\t{warning}")?;
        }
    }
    for action in &report.all_actions {
        writeln!(w, "action\t{action}")?;
    }
    Ok(())
}
