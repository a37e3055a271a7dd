//! Destination path computation
//!
//! Maps a discovered file to its place in the mirrored tree by stripping
//! the configured source root and re-rooting the remainder under the
//! destination.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Component, Path, PathBuf};

use crate::discover::WorkItem;

/// Remove the first occurrence of `source_root` from `source_file`.
///
/// The comparison is done on raw bytes, so the suffix keeps its leading
/// separator: `/a/b/c/d.txt` under `/a/b` gives `/c/d.txt`. If the root does
/// not occur at all the file path is returned unchanged.
pub fn relative_suffix(source_file: &Path, source_root: &Path) -> PathBuf {
    let file = source_file.as_os_str().as_bytes();
    let root = source_root.as_os_str().as_bytes();

    if root.is_empty() {
        return source_file.to_path_buf();
    }

    match find_subslice(file, root) {
        Some(idx) => {
            let mut out = Vec::with_capacity(file.len() - root.len());
            out.extend_from_slice(&file[..idx]);
            out.extend_from_slice(&file[idx + root.len()..]);
            PathBuf::from(OsString::from_vec(out))
        }
        None => source_file.to_path_buf(),
    }
}

/// Where the link for `item` goes.
pub fn destination_for(item: &WorkItem) -> PathBuf {
    let relative = relative_suffix(&item.source_file, &item.source_root);
    join_under(&item.destination_root, &relative)
}

/// Join `relative` below `base`, ignoring any root or prefix on `relative`.
///
/// `Path::join` would replace `base` entirely when handed an absolute path.
fn join_under(base: &Path, relative: &Path) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

/// Lexically clean a path: drop `.`, resolve `..` against the preceding
/// component, collapse repeated separators and trailing slashes.
///
/// Never touches the filesystem, so symlinked parents are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
