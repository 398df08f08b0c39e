//! Repository analyzer.

use crate::sampling::{
    Candidate, MANIFESTS, README_NAMES, dominant_language, is_minified, is_skipped_dir,
    select_candidates, truncate_utf8,
};
use crate::{AnalysisLimits, CODE_EXTENSIONS, Checkout};
use reelsmith_core::{AnalysisBundle, RepositoryMetadata, SampleKind, SourceSample};
use reelsmith_error::{InputError, InputErrorKind, ReelsmithResult};
use std::path::{Path, PathBuf};

/// Bytes inspected when deciding whether a file is binary.
const BINARY_PROBE_BYTES: usize = 8192;

/// Builds analysis bundles from checked-out repositories.
#[derive(Debug, Clone, Default)]
pub struct RepositoryAnalyzer {
    limits: AnalysisLimits,
}

impl RepositoryAnalyzer {
    /// Analyzer with the given budgets.
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }

    /// Budgets in effect.
    pub fn limits(&self) -> &AnalysisLimits {
        &self.limits
    }

    /// Sample a checkout into a bundle.
    ///
    /// The walk runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// `RepositoryUnavailable` if the root cannot be read, `EmptyRepository`
    /// if nothing readable was found.
    #[tracing::instrument(skip(self, checkout), fields(repo = %checkout.name()))]
    pub async fn analyze(&self, checkout: &Checkout) -> ReelsmithResult<AnalysisBundle> {
        let root = checkout.root().to_path_buf();
        let name = checkout.name().to_string();
        let limits = self.limits;

        let bundle = tokio::task::spawn_blocking(move || analyze_dir(&root, &name, &limits))
            .await
            .map_err(|e| {
                InputError::new(InputErrorKind::RepositoryUnavailable(format!(
                    "analysis task failed: {}",
                    e
                )))
            })??;

        tracing::info!(
            samples = bundle.samples().len(),
            language = bundle.metadata().primary_language.as_deref().unwrap_or("unknown"),
            fingerprint = bundle.fingerprint().short(),
            "Repository analyzed"
        );
        Ok(bundle)
    }
}

/// Read a file as lossy UTF-8, `None` for unreadable or binary files.
fn read_text(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let probe = &bytes[..bytes.len().min(BINARY_PROBE_BYTES)];
    if probe.contains(&0) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn sample(relative: String, kind: SampleKind, text: &str, max_bytes: usize) -> SourceSample {
    let (kept, truncated) = truncate_utf8(text, max_bytes);
    SourceSample {
        path: relative,
        kind,
        text: kept.to_string(),
        truncated,
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walker(dir: &Path) -> ignore::Walk {
    ignore::WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && is_skipped_dir(&entry.file_name().to_string_lossy()))
        })
        .build()
}

fn walk_files(dir: &Path) -> Vec<PathBuf> {
    walker(dir)
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .collect()
}

pub(crate) fn analyze_dir(
    root: &Path,
    name: &str,
    limits: &AnalysisLimits,
) -> ReelsmithResult<AnalysisBundle> {
    if !root.is_dir() {
        return Err(InputError::new(InputErrorKind::RepositoryUnavailable(format!(
            "{} is not a readable directory",
            root.display()
        )))
        .into());
    }

    let mut samples = Vec::new();
    let mut metadata = RepositoryMetadata {
        name: name.to_string(),
        ..Default::default()
    };

    for readme in README_NAMES {
        let path = root.join(readme);
        if let Some(text) = path.is_file().then(|| read_text(&path)).flatten() {
            tracing::debug!(file = readme, "Found README");
            samples.push(sample(
                readme.to_string(),
                SampleKind::Readme,
                &text,
                *limits.max_readme_bytes(),
            ));
            break;
        }
    }

    for (manifest, language) in MANIFESTS {
        let path = root.join(manifest);
        let Some(text) = path.is_file().then(|| read_text(&path)).flatten() else {
            continue;
        };
        tracing::debug!(file = manifest, language, "Found manifest");
        if metadata.manifest.is_none() {
            metadata.manifest = Some(manifest.to_string());
            metadata.primary_language = Some(language.to_string());
        }
        samples.push(sample(
            manifest.to_string(),
            SampleKind::Manifest,
            &text,
            *limits.max_manifest_bytes(),
        ));
    }

    let docs_dir = root.join("docs");
    if docs_dir.is_dir() {
        let mut docs: Vec<PathBuf> = walk_files(&docs_dir)
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("md")))
            .collect();
        docs.sort();
        for path in docs {
            let relative = relative_path(root, &path);
            metadata.doc_files.push(relative.clone());
            if metadata.doc_files.len() > *limits.max_doc_files() {
                continue;
            }
            if let Some(text) = read_text(&path) {
                samples.push(sample(relative, SampleKind::Doc, &text, *limits.max_doc_bytes()));
            }
        }
        tracing::debug!(count = metadata.doc_files.len(), "Found documentation files");
    }

    let candidates: Vec<Candidate> = walk_files(root)
        .into_iter()
        .filter(|path| !is_minified(path))
        .filter_map(|path| {
            let extension = path.extension()?.to_str()?.to_ascii_lowercase();
            if !CODE_EXTENSIONS.contains(&extension.as_str()) {
                return None;
            }
            let size = std::fs::metadata(&path).ok()?.len();
            (size > 0).then(|| Candidate {
                relative: relative_path(root, &path),
                path,
                extension,
                size,
            })
        })
        .collect();

    let chosen = select_candidates(
        candidates,
        *limits.max_files_per_extension(),
        *limits.max_sampled_files(),
    );
    if metadata.primary_language.is_none() {
        metadata.primary_language = dominant_language(&chosen).map(str::to_string);
    }
    for candidate in &chosen {
        if let Some(text) = read_text(&candidate.path) {
            samples.push(sample(
                candidate.relative.clone(),
                SampleKind::Code,
                &text,
                *limits.max_file_bytes(),
            ));
        }
    }
    tracing::debug!(count = chosen.len(), "Sampled code files");

    samples.retain(|s| !s.text.trim().is_empty());
    if samples.is_empty() {
        return Err(InputError::new(InputErrorKind::EmptyRepository(
            root.display().to_string(),
        ))
        .into());
    }

    Ok(AnalysisBundle::new(samples, metadata))
}
