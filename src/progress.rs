//! Live progress display for the link consumer

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Receives one update per work item from the link consumer.
///
/// Implementations start their display lazily on the first `update` and
/// must accept `stop` when nothing is showing.
pub trait ProgressSink {
    /// Show `label` (the file being linked) against `target` (where it goes)
    fn update(&mut self, label: &str, target: &str);

    /// Clear the display
    fn stop(&mut self);

    /// Handle other threads print through while the display is live
    fn console(&self) -> Option<MultiProgress> {
        None
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Box<S> {
    fn update(&mut self, label: &str, target: &str) {
        (**self).update(label, target);
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn console(&self) -> Option<MultiProgress> {
        (**self).console()
    }
}

/// Spinner on stderr, label as prefix and target as message
pub struct SpinnerProgress {
    console: MultiProgress,
    spinner: Option<ProgressBar>,
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self {
            console: MultiProgress::new(),
            spinner: None,
        }
    }
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a spinner is currently on screen
    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }

    fn start(console: &MultiProgress) -> ProgressBar {
        let spinner = console.add(ProgressBar::new_spinner());
        // The template is a constant; fall back to the default style rather than fail
        let style = ProgressStyle::with_template("{prefix} {spinner:.red.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(TICK_INTERVAL);
        spinner
    }
}

impl ProgressSink for SpinnerProgress {
    fn update(&mut self, label: &str, target: &str) {
        let console = &self.console;
        let spinner = self
            .spinner
            .get_or_insert_with(|| Self::start(console));
        spinner.set_prefix(label.to_string());
        spinner.set_message(target.to_string());
    }

    fn stop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            self.console.remove(&spinner);
        }
    }

    fn console(&self) -> Option<MultiProgress> {
        Some(self.console.clone())
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sink that shows nothing, for non-interactive runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _label: &str, _target: &str) {}

    fn stop(&mut self) {}
}
