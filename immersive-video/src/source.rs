//! Source resolution
//!
//! Hosts refer to videos by logical identifiers (a clip name, a relative path
//! inside a media library). A [`SourceResolver`] turns one into an absolute,
//! readable file path before it reaches the playback controller.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::playback::{PlaybackBackend, PlaybackController, StateChange};

/// Source resolution errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Empty source identifier")]
    Empty,
    #[error("Source {0:?} escapes the media root")]
    OutsideRoot(String),
    #[error("Video not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maps logical video identifiers to absolute local paths
pub trait SourceResolver {
    fn resolve(&self, id: &str) -> Result<PathBuf, SourceError>;
}

/// Resolves identifiers relative to a media directory
///
/// Absolute identifiers are accepted as-is; relative ones are joined onto the
/// root and may not climb out of it.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolver rooted at the current working directory
    pub fn current_dir() -> Result<Self, SourceError> {
        std::env::current_dir().map(Self::new).map_err(|source| SourceError::Unreadable {
            path: PathBuf::from("."),
            source,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceResolver for DirectoryResolver {
    fn resolve(&self, id: &str) -> Result<PathBuf, SourceError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(SourceError::Empty);
        }

        let requested = Path::new(id);
        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            if requested
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
            {
                return Err(SourceError::OutsideRoot(id.to_string()));
            }
            self.root.join(requested)
        };

        let resolved = match candidate.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(candidate));
            }
            Err(source) => {
                return Err(SourceError::Unreadable {
                    path: candidate,
                    source,
                })
            }
        };

        if !resolved.is_file() {
            return Err(SourceError::NotFound(resolved));
        }
        std::fs::File::open(&resolved).map_err(|source| SourceError::Unreadable {
            path: resolved.clone(),
            source,
        })?;

        tracing::debug!("Resolved source '{}' -> {}", id, resolved.display());
        Ok(resolved)
    }
}

impl<B: PlaybackBackend> PlaybackController<B> {
    /// Resolve `id` and make it the current source
    pub fn set_source_from<R>(&mut self, resolver: &R, id: &str) -> Result<Option<StateChange>, SourceError>
    where
        R: SourceResolver + ?Sized,
    {
        let path = resolver.resolve(id)?;
        Ok(self.set_source(path))
    }
}
