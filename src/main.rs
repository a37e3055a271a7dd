//! symtree CLI
//!
//! Command-line interface for building a mirrored symbolic-link tree.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use is_terminal::IsTerminal;
use std::env;
use std::path::PathBuf;
use tracing::Level;

use symtree::{NoProgress, ProgressSink, SpinnerProgress, config::Config};

#[derive(Parser)]
#[command(name = "symtree")]
#[command(
    author,
    version,
    about = "Mirror files matched by glob patterns into a tree of symbolic links"
)]
struct Cli {
    /// Path to configuration file (default: config.yml in --path)
    #[arg(short, long, env = "SYMTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory searched for the configuration file (default: current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Do not show the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Show detailed output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let cwd = env::current_dir()?;
    let start_dir = cli.path.unwrap_or_else(|| cwd.clone());

    let config_path = match cli.config {
        Some(p) => p,
        None => Config::find_config(&start_dir)?,
    };

    if cli.verbose {
        println!(
            "Using config: {}\n",
            config_path.display().to_string().dimmed()
        );
    }

    // Relative paths in the config are relative to where the tool runs
    let config = Config::load(&config_path)?.resolve(&cwd);

    let progress: Box<dyn ProgressSink + Send> =
        if cli.no_progress || !std::io::stderr().is_terminal() {
            Box::new(NoProgress)
        } else {
            Box::new(SpinnerProgress::new())
        };

    let summary = symtree::run(&config, progress)?;

    println!("{}", "✨ Complete!".green().bold());
    println!(
        "  Linked: {} into {}",
        summary.links.linked.to_string().green(),
        config.destination_path.display()
    );

    Ok(())
}
