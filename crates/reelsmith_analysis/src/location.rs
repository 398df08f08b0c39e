//! Local and remote repository locations.

use reelsmith_error::{InputError, InputErrorKind, ReelsmithResult};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Where a repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    /// Directory on disk
    Local(PathBuf),
    /// Cloneable URL (`http://`, `https://`, `git@`)
    Remote(String),
}

impl RepositoryLocation {
    /// Classify a user-supplied location.
    ///
    /// ```
    /// use reelsmith_analysis::RepositoryLocation;
    ///
    /// assert!(matches!(
    ///     RepositoryLocation::parse("https://github.com/acme/widget.git"),
    ///     RepositoryLocation::Remote(_)
    /// ));
    /// assert!(matches!(RepositoryLocation::parse("./widget"), RepositoryLocation::Local(_)));
    /// ```
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if ["http://", "https://", "git@"]
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            RepositoryLocation::Remote(trimmed.to_string())
        } else {
            RepositoryLocation::Local(PathBuf::from(trimmed))
        }
    }

    /// Repository name: directory name, or URL stem without `.git`.
    pub fn name(&self) -> String {
        match self {
            RepositoryLocation::Local(path) => path
                .canonicalize()
                .ok()
                .as_deref()
                .and_then(Path::file_name)
                .or_else(|| path.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "repository".to_string()),
            RepositoryLocation::Remote(url) => {
                let stem = url
                    .trim_end_matches('/')
                    .rsplit(['/', ':'])
                    .next()
                    .unwrap_or(url);
                stem.trim_end_matches(".git").to_string()
            }
        }
    }

    /// Make the repository readable on disk.
    ///
    /// Remote locations are shallow-cloned with `git` into a temporary
    /// directory owned by the returned [`Checkout`]; dropping it deletes the
    /// clone.
    ///
    /// # Errors
    ///
    /// `RepositoryUnavailable` if a local path is not a readable directory,
    /// `CloneFailed` if `git` cannot be run or exits unsuccessfully.
    #[tracing::instrument(skip(self), fields(location = ?self))]
    pub async fn checkout(&self) -> ReelsmithResult<Checkout> {
        match self {
            RepositoryLocation::Local(path) => {
                let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                    InputError::new(InputErrorKind::RepositoryUnavailable(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                })?;
                if !metadata.is_dir() {
                    return Err(InputError::new(InputErrorKind::RepositoryUnavailable(format!(
                        "{} is not a directory",
                        path.display()
                    )))
                    .into());
                }
                tracing::info!(path = %path.display(), "Using local repository");
                Ok(Checkout {
                    root: path.clone(),
                    name: self.name(),
                    temp_clone: None,
                })
            }
            RepositoryLocation::Remote(url) => {
                let temp = TempDir::with_prefix("reelsmith-clone-").map_err(|e| {
                    InputError::new(InputErrorKind::CloneFailed(format!(
                        "cannot create clone directory: {}",
                        e
                    )))
                })?;
                let target = temp.path().join("repo");

                tracing::info!(url = %url, "Cloning remote repository");
                let output = tokio::process::Command::new("git")
                    .arg("clone")
                    .arg("--depth")
                    .arg("1")
                    .arg(url)
                    .arg(&target)
                    .output()
                    .await
                    .map_err(|e| {
                        InputError::new(InputErrorKind::CloneFailed(format!(
                            "cannot run git: {}",
                            e
                        )))
                    })?;
                if !output.status.success() {
                    return Err(InputError::new(InputErrorKind::CloneFailed(format!(
                        "{}: {}",
                        url,
                        String::from_utf8_lossy(&output.stderr).trim()
                    )))
                    .into());
                }

                tracing::info!(path = %target.display(), "Repository cloned");
                Ok(Checkout {
                    root: target,
                    name: self.name(),
                    temp_clone: Some(temp),
                })
            }
        }
    }
}

/// A repository readable on disk.
///
/// Holds the temporary clone directory, if any, for as long as it lives.
#[derive(Debug)]
pub struct Checkout {
    root: PathBuf,
    name: String,
    temp_clone: Option<TempDir>,
}

impl Checkout {
    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this checkout is a temporary clone.
    pub fn is_clone(&self) -> bool {
        self.temp_clone.is_some()
    }
}
