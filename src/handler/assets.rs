//! Static asset resolver
//!
//! Resolves an untrusted relative path against one of the two asset roots
//! and loads the file. A path may never leave its root: `..`, absolute
//! paths and symlinks pointing outside are all rejected.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use hyper::body::Bytes;
use thiserror::Error;
use tokio::fs;

use crate::http::mime;
use crate::logger;

/// Which asset tree a root serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// Frontend pages, styles and scripts
    Frontend,
    /// Backend-local files under `/static/`
    BackendStatic,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frontend => f.write_str("frontend"),
            Self::BackendStatic => f.write_str("static"),
        }
    }
}

/// Why an asset could not be served
///
/// Every variant is answered with the same 404; the distinction only
/// reaches the log.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no such file: {0}")]
    NotFound(String),

    #[error("path escapes the {root} root: {path}")]
    Traversal { root: RootKind, path: String },

    #[error("{root} root is unavailable: {}", path.display())]
    RootUnavailable { root: RootKind, path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A loaded asset
#[derive(Debug, Clone)]
pub struct Asset {
    pub path: PathBuf,
    pub content: Bytes,
    pub content_type: &'static str,
}

/// One asset root directory
#[derive(Debug, Clone)]
pub struct StaticRoot {
    kind: RootKind,
    /// Absolute path as configured
    path: PathBuf,
    /// Canonical path, `None` when the directory was missing at startup
    canonical: Option<PathBuf>,
}

impl StaticRoot {
    /// Build a root from a configured path
    ///
    /// Relative paths are made absolute against the working directory. A
    /// root that does not exist is kept but will never resolve anything.
    pub fn new(dir: &str, kind: RootKind) -> Self {
        let path = std::path::absolute(dir).unwrap_or_else(|_| PathBuf::from(dir));
        let canonical = match path.canonicalize() {
            Ok(p) if p.is_dir() => Some(p),
            Ok(p) => {
                logger::log_warning(&format!(
                    "{kind} root is not a directory: {}",
                    p.display()
                ));
                None
            }
            Err(e) => {
                logger::log_warning(&format!(
                    "{kind} root not found or inaccessible '{}': {e}",
                    path.display()
                ));
                None
            }
        };

        Self {
            kind,
            path,
            canonical,
        }
    }

    pub const fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `relative` under this root and read the file
    ///
    /// `relative` must already be percent-decoded.
    pub async fn resolve(&self, relative: &str) -> Result<Asset, AssetError> {
        let Some(root) = &self.canonical else {
            return Err(AssetError::RootUnavailable {
                root: self.kind,
                path: self.path.clone(),
            });
        };

        let clean = self.sanitize(relative)?;
        let candidate = root.join(&clean);

        let resolved = match fs::canonicalize(&candidate).await {
            Ok(p) => p,
            Err(e) if is_missing(&e) => return Err(AssetError::NotFound(relative.to_string())),
            Err(source) => {
                return Err(AssetError::Io {
                    path: candidate,
                    source,
                })
            }
        };

        // Symlinks inside the root may still point elsewhere
        if !resolved.starts_with(root) {
            return Err(AssetError::Traversal {
                root: self.kind,
                path: relative.to_string(),
            });
        }

        match fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(AssetError::NotFound(relative.to_string())),
            Err(source) => {
                return Err(AssetError::Io {
                    path: resolved,
                    source,
                })
            }
        }

        let content = fs::read(&resolved).await.map_err(|source| AssetError::Io {
            path: resolved.clone(),
            source,
        })?;
        let content_type = mime::get_content_type(resolved.extension().and_then(|e| e.to_str()));

        Ok(Asset {
            path: resolved,
            content: Bytes::from(content),
            content_type,
        })
    }

    /// Lexical normalization and containment check
    ///
    /// Drops `.`, folds `..` into the preceding segment, and rejects
    /// absolute paths or a `..` that would climb above the root before the
    /// filesystem is touched.
    fn sanitize(&self, relative: &str) -> Result<PathBuf, AssetError> {
        if relative.contains('\0') {
            return Err(AssetError::NotFound(relative.escape_default().to_string()));
        }

        let mut clean = PathBuf::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => clean.push(segment),
                Component::CurDir => {}
                Component::ParentDir if clean.pop() => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AssetError::Traversal {
                        root: self.kind,
                        path: relative.to_string(),
                    });
                }
            }
        }

        if clean.as_os_str().is_empty() {
            return Err(AssetError::NotFound(relative.to_string()));
        }
        Ok(clean)
    }
}

fn is_missing(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}
