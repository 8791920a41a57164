#![forbid(unsafe_code)]

mod cmd;
mod git;
mod html;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "pinwalk",
    author,
    version,
    about = "pinwalk: recursive audit of CI action dependencies and container pinning",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Filter used when `PINWALK_LOG` is unset.
    fn default_log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose || env::var("DEBUG").is_ok() {
            "pinwalk=debug,info"
        } else {
            "pinwalk=info,warn"
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Scan",
        about = "Discover action dependencies of a repository",
        long_about = "Clone a repository, read its workflows, and recursively fetch every referenced action, following composite actions and checking that container images are pinned by digest.",
        after_help = "EXAMPLES:\n    # Scan a repository\n    pinwalk scan https://github.com/org/repo.git\n\n    # Write the JSON result for `pinwalk report`\n    pinwalk scan https://github.com/org/repo.git --output result.json\n\n    # Emit machine-readable output\n    pinwalk scan https://github.com/org/repo.git --format json"
    )]
    Scan(cmd::scan::ScanArgs),

    #[command(
        next_help_heading = "Report",
        about = "Render a JSON scan result as HTML",
        long_about = "Render the JSON written by `pinwalk scan` as a static HTML page.",
        after_help = "EXAMPLES:\n    # Generate a report\n    pinwalk report result.json report.html --name org/repo"
    )]
    Report(cmd::report::ReportArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    pinwalk completions bash\n\n    # Generate zsh completions\n    pinwalk completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Install the stderr subscriber. Stdout is reserved for command output.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env("PINWALK_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    let format = env::var("PINWALK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.default_log_filter());

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;

    match cli.command {
        Commands::Scan(ref args) => cmd::scan::run_scan(args, &project_root),
        Commands::Report(ref args) => cmd::report::run_report(args),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
