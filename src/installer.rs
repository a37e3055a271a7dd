//! Symbolic link placement
//!
//! Creates the destination directory, clears whatever already sits at the
//! link path and points a fresh symlink at the source file. Nothing here is
//! transactional: a failure after the directory was created leaves it in
//! place, which is harmless on the next run.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::discover::WorkItem;
use crate::error::LinkError;
use crate::resolver::destination_for;

/// Places one link per [`WorkItem`]
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkInstaller;

impl LinkInstaller {
    pub fn new() -> Self {
        Self
    }

    /// Link `item.source_file` into the mirrored tree.
    ///
    /// Returns the path of the created link. An existing file or symlink at
    /// that path is replaced; an existing directory is left alone and
    /// reported as [`LinkError::DestinationIsDirectory`].
    pub fn install(&self, item: &WorkItem) -> Result<PathBuf, LinkError> {
        let destination = destination_for(item);

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| LinkError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // No-follow stat so an existing link is seen, not its target
        match fs::symlink_metadata(&destination) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(LinkError::DestinationIsDirectory { path: destination });
            }
            Ok(_) => {
                fs::remove_file(&destination).map_err(|source| LinkError::RemoveExisting {
                    path: destination.clone(),
                    source,
                })?;
                tracing::debug!(path = %destination.display(), "Removed existing entry");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(LinkError::Inspect {
                    path: destination,
                    source,
                });
            }
        }

        std::os::unix::fs::symlink(&item.source_file, &destination).map_err(|source| {
            LinkError::Symlink {
                source_file: item.source_file.clone(),
                destination: destination.clone(),
                source,
            }
        })?;

        tracing::debug!(
            source = %item.source_file.display(),
            destination = %destination.display(),
            "Linked"
        );
        Ok(destination)
    }
}
