//! Single-consumer link pipeline
//!
//! The producer hands [`WorkItem`]s over a zero-capacity channel, so every
//! `submit` blocks until the consumer thread has taken the item. Completion
//! travels on its own channel; the consumer waits on both with one
//! `select!`, which cannot lose items because a rendezvous send only
//! returns once the item has been received.
//!
//! All filesystem mutation and every progress update happen on the consumer
//! thread, in submission order.

use colored::Colorize;
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::thread::{self, JoinHandle};

use crate::discover::WorkItem;
use crate::error::PipelineError;
use crate::installer::LinkInstaller;
use crate::progress::ProgressSink;

/// Outcome counters returned by the consumer when it shuts down
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub linked: usize,
    pub failed: usize,
}

/// Producer-side handle to the running consumer
pub struct LinkPipeline {
    items: Sender<WorkItem>,
    done: Sender<()>,
    consumer: JoinHandle<PipelineSummary>,
}

impl LinkPipeline {
    /// Start the consumer thread. It owns `installer` and `progress` for its
    /// whole lifetime.
    pub fn spawn<P>(installer: LinkInstaller, progress: P) -> Self
    where
        P: ProgressSink + Send + 'static,
    {
        let (items, item_rx) = bounded(0);
        let (done, done_rx) = bounded(0);

        let consumer = thread::spawn(move || {
            Consumer {
                installer,
                progress,
                summary: PipelineSummary::default(),
            }
            .run(item_rx, done_rx)
        });

        Self {
            items,
            done,
            consumer,
        }
    }

    /// Hand `item` to the consumer, blocking until it has been taken.
    pub fn submit(&self, item: WorkItem) -> Result<(), PipelineError> {
        self.items
            .send(item)
            .map_err(|_| PipelineError::ConsumerGone)
    }

    /// Signal that no more items will arrive and wait for the consumer to
    /// stop.
    pub fn finish(self) -> Result<PipelineSummary, PipelineError> {
        let Self {
            items,
            done,
            consumer,
        } = self;

        // A consumer that already exited has dropped its receiver; joining
        // below tells us why.
        let _ = done.send(());
        drop(items);

        consumer
            .join()
            .map_err(|_| PipelineError::ConsumerPanicked)
    }
}

struct Consumer<P> {
    installer: LinkInstaller,
    progress: P,
    summary: PipelineSummary,
}

impl<P: ProgressSink> Consumer<P> {
    fn run(mut self, items: Receiver<WorkItem>, done: Receiver<()>) -> PipelineSummary {
        loop {
            select! {
                recv(items) -> msg => match msg {
                    Ok(item) => self.handle(&item),
                    // Producer dropped without signalling completion
                    Err(_) => break,
                },
                recv(done) -> _ => break,
            }
        }

        self.progress.stop();
        tracing::debug!(
            linked = self.summary.linked,
            failed = self.summary.failed,
            "Link consumer finished"
        );
        self.summary
    }

    fn handle(&mut self, item: &WorkItem) {
        let label = item.source_file.display().to_string();
        let target = item.destination_root.display().to_string();
        self.progress.update(&label, &target);

        match self.installer.install(item) {
            Ok(_) => self.summary.linked += 1,
            Err(e) => {
                self.progress.stop();
                tracing::debug!(source = %label, error = %e, "Error linking file");
                eprintln!("  {} {}", "✘".red(), e);
                self.summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Update(String),
        Stop,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProgressSink for Recorder {
        fn update(&mut self, label: &str, _target: &str) {
            self.0.lock().unwrap().push(Event::Update(label.to_string()));
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().push(Event::Stop);
        }
    }

    fn item(source_file: &Path, destination_root: &Path, source_root: &Path) -> WorkItem {
        WorkItem {
            source_file: source_file.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            source_root: source_root.to_path_buf(),
        }
    }

    fn sources(temp: &TempDir, names: &[&str]) -> (PathBuf, Vec<PathBuf>) {
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let files = names
            .iter()
            .map(|name| {
                let path = src.join(name);
                fs::write(&path, name).unwrap();
                path
            })
            .collect();
        (src, files)
    }

    #[test]
    fn test_pipeline_links_every_item() {
        let temp = TempDir::new().unwrap();
        let (src, files) = sources(&temp, &["a.txt", "b.txt", "c.txt"]);
        let out = temp.path().join("out");

        let pipeline = LinkPipeline::spawn(LinkInstaller::new(), NoProgress);
        for file in &files {
            pipeline.submit(item(file, &out, &src)).unwrap();
        }
        let summary = pipeline.finish().unwrap();

        assert_eq!(summary, PipelineSummary { linked: 3, failed: 0 });
        for file in &files {
            let link = out.join(file.file_name().unwrap());
            assert_eq!(fs::read_link(link).unwrap(), *file);
        }
    }

    #[test]
    fn test_pipeline_updates_progress_in_submission_order() {
        let temp = TempDir::new().unwrap();
        let (src, files) = sources(&temp, &["1", "2", "3"]);
        let out = temp.path().join("out");
        let recorder = Recorder::default();

        let pipeline = LinkPipeline::spawn(LinkInstaller::new(), recorder.clone());
        for file in &files {
            pipeline.submit(item(file, &out, &src)).unwrap();
        }
        pipeline.finish().unwrap();

        let mut expected: Vec<Event> = files
            .iter()
            .map(|f| Event::Update(f.display().to_string()))
            .collect();
        expected.push(Event::Stop);
        assert_eq!(recorder.events(), expected);
    }

    #[test]
    fn test_pipeline_failure_stops_progress_and_continues() {
        let temp = TempDir::new().unwrap();
        let (src, files) = sources(&temp, &["a.txt", "b.txt"]);
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        // Blocks the parent directory of the first link
        fs::write(out.join("blocked"), "").unwrap();
        fs::create_dir_all(src.join("blocked")).unwrap();
        let blocked = src.join("blocked/x.txt");
        fs::write(&blocked, "x").unwrap();

        let recorder = Recorder::default();
        let pipeline = LinkPipeline::spawn(LinkInstaller::new(), recorder.clone());
        pipeline.submit(item(&blocked, &out, &src)).unwrap();
        for file in &files {
            pipeline.submit(item(file, &out, &src)).unwrap();
        }
        let summary = pipeline.finish().unwrap();

        assert_eq!(summary, PipelineSummary { linked: 2, failed: 1 });
        assert!(out.join("a.txt").is_symlink());
        assert!(out.join("b.txt").is_symlink());
        assert_eq!(
            recorder.events(),
            vec![
                Event::Update(blocked.display().to_string()),
                Event::Stop,
                Event::Update(files[0].display().to_string()),
                Event::Update(files[1].display().to_string()),
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_finish_without_items() {
        let recorder = Recorder::default();
        let pipeline = LinkPipeline::spawn(LinkInstaller::new(), recorder.clone());

        let summary = pipeline.finish().unwrap();

        assert_eq!(summary, PipelineSummary::default());
        assert_eq!(recorder.events(), vec![Event::Stop]);
    }

    #[test]
    fn test_submit_after_consumer_panicked() {
        struct Exploding;

        impl ProgressSink for Exploding {
            fn update(&mut self, _label: &str, _target: &str) {
                panic!("display failed");
            }

            fn stop(&mut self) {}
        }

        let temp = TempDir::new().unwrap();
        let (src, files) = sources(&temp, &["a.txt"]);
        let out = temp.path().join("out");

        let pipeline = LinkPipeline::spawn(LinkInstaller::new(), Exploding);
        // The first handoff succeeds, then the consumer dies while handling it
        pipeline.submit(item(&files[0], &out, &src)).unwrap();
        let second = pipeline.submit(item(&files[0], &out, &src));

        assert!(matches!(second, Err(PipelineError::ConsumerGone)));
        assert!(matches!(
            pipeline.finish(),
            Err(PipelineError::ConsumerPanicked)
        ));
    }
}
