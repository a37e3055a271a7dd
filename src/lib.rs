//! symtree - mirrored symbolic-link trees
//!
//! Matches glob patterns below a list of source roots and links every
//! matched file (recursing into matched directories) into a destination
//! tree that preserves each file's path relative to its root.
//!
//! Discovery runs on the calling thread; a single background consumer
//! creates directories and links in discovery order.

#[cfg(not(unix))]
compile_error!("symtree creates POSIX symbolic links and only supports unix-like platforms");

pub mod config;
pub mod discover;
pub mod error;
pub mod installer;
pub mod pipeline;
pub mod progress;
pub mod resolver;

pub use config::Config;
pub use discover::{Discoverer, DiscoveryStats, WorkItem};
pub use error::{DiscoveryError, LinkError, PipelineError};
pub use installer::LinkInstaller;
pub use pipeline::{LinkPipeline, PipelineSummary};
pub use progress::{NoProgress, ProgressSink, SpinnerProgress};

/// Counters for one complete run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub discovery: DiscoveryStats,
    pub links: PipelineSummary,
}

/// Discover everything `config` describes and link it, reporting through
/// `progress`.
///
/// Per-item failures are reported as they happen and counted in the
/// summary; only a broken pipeline is returned as an error.
pub fn run<P>(config: &Config, progress: P) -> Result<RunSummary, PipelineError>
where
    P: ProgressSink + Send + 'static,
{
    let console = progress.console();
    let pipeline = LinkPipeline::spawn(LinkInstaller::new(), progress);

    let discovered = Discoverer::new(config)
        .with_console(console)
        .discover(|item| pipeline.submit(item));
    let discovery = match discovered {
        Ok(stats) => stats,
        Err(e) => {
            // Surface a consumer panic rather than the secondary send failure
            pipeline.finish()?;
            return Err(e);
        }
    };

    let links = pipeline.finish()?;
    tracing::debug!(?discovery, ?links, "Run finished");

    Ok(RunSummary { discovery, links })
}
