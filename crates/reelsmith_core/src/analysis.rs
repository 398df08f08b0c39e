//! Repository analysis bundle.

use crate::{CacheKey, Fingerprinter};
use serde::{Deserialize, Serialize};

/// What role a sampled file plays in the bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Top-level README
    Readme,
    /// Package manifest (Cargo.toml, package.json, ...)
    Manifest,
    /// Markdown under docs/
    Doc,
    /// Sampled source file
    Code,
}

/// One sampled file, truncated to its byte budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSample {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Role of the file
    pub kind: SampleKind,
    /// File text, at most the configured byte budget
    pub text: String,
    /// Whether the original was longer than `text`
    pub truncated: bool,
}

/// Repository-level facts gathered during sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RepositoryMetadata {
    /// Repository name (directory or URL stem)
    pub name: String,
    /// Best guess at the primary language
    pub primary_language: Option<String>,
    /// Manifest file name, if one was recognised
    pub manifest: Option<String>,
    /// Markdown files detected under docs/
    pub doc_files: Vec<String>,
}

/// Bounded textual summary of a repository.
///
/// Immutable once built. The fingerprint covers every sample (path, kind,
/// text, truncation) plus all metadata, so anything that changes
/// [`AnalysisBundle::render`] changes it.
///
/// # Examples
///
/// ```
/// use reelsmith_core::{AnalysisBundle, RepositoryMetadata, SampleKind, SourceSample};
///
/// let bundle = AnalysisBundle::new(
///     vec![SourceSample {
///         path: "README.md".into(),
///         kind: SampleKind::Readme,
///         text: "# Demo".into(),
///         truncated: false,
///     }],
///     RepositoryMetadata { name: "demo".into(), ..Default::default() },
/// );
/// assert!(bundle.has_readme());
/// assert_eq!(bundle.fingerprint().as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AnalysisBundle {
    samples: Vec<SourceSample>,
    metadata: RepositoryMetadata,
    fingerprint: CacheKey,
}

impl AnalysisBundle {
    /// Build a bundle and compute its fingerprint.
    pub fn new(samples: Vec<SourceSample>, metadata: RepositoryMetadata) -> Self {
        let fingerprint = Self::compute_fingerprint(&samples, &metadata);
        Self {
            samples,
            metadata,
            fingerprint,
        }
    }

    fn compute_fingerprint(samples: &[SourceSample], metadata: &RepositoryMetadata) -> CacheKey {
        let mut fp = Fingerprinter::new("analysis")
            .field("name", &metadata.name)
            .field(
                "language",
                metadata.primary_language.as_deref().unwrap_or(""),
            )
            .field("manifest", metadata.manifest.as_deref().unwrap_or(""))
            .field("docs", metadata.doc_files.len().to_string());
        for doc in &metadata.doc_files {
            fp = fp.field("doc", doc);
        }
        for sample in samples {
            fp = fp
                .field("path", &sample.path)
                .field("kind", sample.kind.as_ref())
                .field("text", &sample.text)
                .field("truncated", if sample.truncated { "yes" } else { "no" });
        }
        fp.finish()
    }

    /// Whether a README was sampled.
    pub fn has_readme(&self) -> bool {
        self.samples.iter().any(|s| s.kind == SampleKind::Readme)
    }

    /// Samples of one kind, in bundle order.
    pub fn samples_of(&self, kind: SampleKind) -> impl Iterator<Item = &SourceSample> {
        self.samples.iter().filter(move |s| s.kind == kind)
    }

    /// Render the bundle as the text block sent to the language model.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Repository: {}\n", self.metadata.name));
        if let Some(lang) = &self.metadata.primary_language {
            out.push_str(&format!("Primary language: {}\n", lang));
        }
        if !self.metadata.doc_files.is_empty() {
            out.push_str(&format!(
                "Documentation files: {}\n",
                self.metadata.doc_files.join(", ")
            ));
        }
        for sample in &self.samples {
            out.push_str(&format!("\n--- {} ({}) ---\n", sample.path, sample.kind));
            out.push_str(&sample.text);
            if sample.truncated {
                out.push_str("\n[truncated]");
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(metadata: RepositoryMetadata, truncated: bool) -> AnalysisBundle {
        AnalysisBundle::new(
            vec![SourceSample {
                path: "src/lib.rs".into(),
                kind: SampleKind::Code,
                text: "pub fn demo() {}".into(),
                truncated,
            }],
            metadata,
        )
    }

    #[test]
    fn test_fingerprint_covers_rendered_metadata() {
        let base = RepositoryMetadata {
            name: "demo".into(),
            ..Default::default()
        };
        let reference = bundle(base.clone(), false);

        let with_docs = RepositoryMetadata {
            doc_files: vec!["docs/guide.md".into()],
            ..base.clone()
        };
        let with_manifest = RepositoryMetadata {
            manifest: Some("Cargo.toml".into()),
            ..base.clone()
        };

        assert_ne!(reference.fingerprint(), bundle(with_docs, false).fingerprint());
        assert_ne!(reference.fingerprint(), bundle(with_manifest, false).fingerprint());
        assert_ne!(reference.fingerprint(), bundle(base.clone(), true).fingerprint());
        assert_eq!(reference.fingerprint(), bundle(base, false).fingerprint());
    }
}
