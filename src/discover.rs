//! Source discovery
//!
//! Expands every (source root × pattern) combination as a shell glob and
//! turns the matches into [`WorkItem`]s. Directories among the matches are
//! walked recursively. Failures are logged and counted, never fatal.

use colored::Colorize;
use globset::{GlobBuilder, GlobMatcher};
use indicatif::MultiProgress;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::DiscoveryError;

/// One discovered file waiting to be linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// The file the link will point at
    pub source_file: PathBuf,
    /// Root of the mirrored tree
    pub destination_root: PathBuf,
    /// The configured source path `source_file` was found under
    pub source_root: PathBuf,
}

/// Counters collected while discovering
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Glob matches considered
    pub matched: usize,
    /// Work items handed to the consumer
    pub emitted: usize,
    /// Stat, walk and pattern failures
    pub failed: usize,
}

/// Walks the configured sources and emits work items in discovery order
pub struct Discoverer<'a> {
    config: &'a Config,
    console: Option<MultiProgress>,
}

impl<'a> Discoverer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            console: None,
        }
    }

    /// Print failures through `console` so they do not tear a live spinner
    pub fn with_console(mut self, console: Option<MultiProgress>) -> Self {
        self.console = console;
        self
    }

    /// Run discovery to completion, passing each item to `emit`.
    ///
    /// Only an error from `emit` stops discovery early; it is returned as-is.
    pub fn discover<E, F>(&self, mut emit: F) -> Result<DiscoveryStats, E>
    where
        F: FnMut(WorkItem) -> Result<(), E>,
    {
        let mut stats = DiscoveryStats::default();

        for source_root in &self.config.source_paths {
            for pattern in &self.config.patterns {
                let matches = match expand_glob(source_root, pattern) {
                    Ok(matches) => matches,
                    Err(e) => {
                        self.report(&e);
                        stats.failed += 1;
                        continue;
                    }
                };

                for matched in matches {
                    stats.matched += 1;
                    self.visit_match(source_root, &matched, &mut stats, &mut emit)?;
                }
            }
        }

        Ok(stats)
    }

    fn visit_match<E, F>(
        &self,
        source_root: &Path,
        matched: &Path,
        stats: &mut DiscoveryStats,
        emit: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(WorkItem) -> Result<(), E>,
    {
        let metadata = match fs::metadata(matched) {
            Ok(metadata) => metadata,
            Err(source) => {
                self.report(&DiscoveryError::Stat {
                    path: matched.to_path_buf(),
                    source,
                });
                stats.failed += 1;
                return Ok(());
            }
        };

        if !metadata.is_dir() {
            tracing::debug!(path = %matched.display(), "Discovered file");
            emit(self.work_item(source_root, matched.to_path_buf()))?;
            stats.emitted += 1;
            return Ok(());
        }

        for entry in WalkDir::new(matched).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    // A walk error ends this directory only
                    self.report(&DiscoveryError::Walk {
                        path: matched.to_path_buf(),
                        source,
                    });
                    stats.failed += 1;
                    break;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            tracing::debug!(path = %entry.path().display(), dir = %matched.display(), "Discovered file");
            emit(self.work_item(source_root, entry.into_path()))?;
            stats.emitted += 1;
        }

        Ok(())
    }

    fn report(&self, err: &DiscoveryError) {
        tracing::debug!(error = %err, "Discovery failure");
        let print = || eprintln!("  {} {}", "!".yellow(), err);
        match &self.console {
            Some(console) => console.suspend(print),
            None => print(),
        }
    }

    fn work_item(&self, source_root: &Path, source_file: PathBuf) -> WorkItem {
        WorkItem {
            source_file,
            destination_root: self.config.destination_path.clone(),
            source_root: source_root.to_path_buf(),
        }
    }
}

/// Expand `pattern` below `root` the way a shell would, one path component
/// at a time. Matches are returned sorted by name within each directory.
///
/// `*` and `?` never match `/`, and there is no recursive `**`.
pub fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let components: Vec<&str> = pattern
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    // A leading `/` on the pattern still stays below the root
    if components.is_empty() {
        return Ok(existing(root).into_iter().collect());
    }

    let mut current = vec![root.to_path_buf()];
    let last = components.len() - 1;

    for (idx, component) in components.iter().enumerate() {
        let is_last = idx == last;
        let mut next = Vec::new();

        if !has_meta(component) {
            let literal = unescape(component);
            for dir in &current {
                if let Some(path) = existing(&dir.join(&literal)) {
                    next.push(path);
                }
            }
        } else {
            let matcher = compile(component, pattern)?;
            for dir in &current {
                next.extend(matching_children(dir, &matcher));
            }
        }

        if !is_last {
            next.retain(|path| path.is_dir());
        }
        if next.is_empty() {
            return Ok(next);
        }
        current = next;
    }

    Ok(current)
}

fn existing(path: &Path) -> Option<PathBuf> {
    fs::symlink_metadata(path).ok().map(|_| path.to_path_buf())
}

fn compile(component: &str, pattern: &str) -> Result<GlobMatcher, DiscoveryError> {
    GlobBuilder::new(&escape_alternation(component))
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn matching_children(dir: &Path, matcher: &GlobMatcher) -> Vec<PathBuf> {
    let mut out = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                if matcher.is_match(entry.file_name()) {
                    out.push(entry.into_path());
                }
            }
            Err(e) => {
                // Unreadable directories simply contribute no matches
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            }
        }
    }

    out
}

fn has_meta(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Escape `{`, `}` and `,` outside character classes so globset reads them
/// as plain characters instead of alternation.
fn escape_alternation(component: &str) -> String {
    let mut out = String::with_capacity(component.len() + 4);
    let mut chars = component.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
                // A leading negation and `]` belong to the class body
                if let Some(&next) = chars.peek()
                    && (next == '!' || next == '^')
                {
                    out.push(next);
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '{' | '}' | ',' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

fn unescape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(escaped) = chars.next()
        {
            out.push(escaped);
            continue;
        }
        out.push(c);
    }
    out
}
