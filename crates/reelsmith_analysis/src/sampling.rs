//! File classification and the deterministic sampling heuristic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Recognised package manifests and the language each implies, in priority order.
pub const MANIFESTS: &[(&str, &str)] = &[
    ("package.json", "JavaScript"),
    ("pyproject.toml", "Python"),
    ("setup.py", "Python"),
    ("Cargo.toml", "Rust"),
    ("go.mod", "Go"),
    ("composer.json", "PHP"),
    ("pom.xml", "Java"),
];

/// README names checked at the repository root, in order.
pub(crate) const README_NAMES: &[&str] = &["README.md", "README.rst", "README.txt", "README"];

/// Source extensions eligible for sampling, in tie-break order.
pub const CODE_EXTENSIONS: &[&str] = &["py", "js", "ts", "go", "rs", "java", "cpp", "c"];

/// Generated or vendored directories never sampled.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "vendor", ".git"];

/// Language for a source extension.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "py" => Some("Python"),
        "js" => Some("JavaScript"),
        "ts" => Some("TypeScript"),
        "go" => Some("Go"),
        "rs" => Some("Rust"),
        "java" => Some("Java"),
        "cpp" => Some("C++"),
        "c" => Some("C"),
        _ => None,
    }
}

/// Cut `text` to at most `max_bytes` on a character boundary.
///
/// Returns the kept prefix and whether anything was cut.
///
/// ```
/// use reelsmith_analysis::truncate_utf8;
///
/// assert_eq!(truncate_utf8("héllo", 2), ("h", true));
/// assert_eq!(truncate_utf8("abc", 10), ("abc", false));
/// ```
pub fn truncate_utf8(text: &str, max_bytes: usize) -> (&str, bool) {
    if text.len() <= max_bytes {
        return (text, false);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

pub(crate) fn is_skipped_dir(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name)
}

pub(crate) fn is_minified(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().contains(".min."))
        .unwrap_or(false)
}

/// A source file eligible for sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    /// Path relative to the repository root, `/`-separated
    pub relative: String,
    /// Absolute path
    pub path: PathBuf,
    /// Extension without the dot
    pub extension: String,
    /// Size in bytes
    pub size: u64,
}

/// Pick at most `max_total` candidates, at most `per_extension` per
/// extension, largest first with path order breaking ties.
pub(crate) fn select_candidates(
    mut candidates: Vec<Candidate>,
    per_extension: usize,
    max_total: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.relative.cmp(&b.relative)));

    let mut per_ext: HashMap<String, usize> = HashMap::new();
    let mut chosen = Vec::new();
    for candidate in candidates {
        if chosen.len() >= max_total {
            break;
        }
        let count = per_ext.entry(candidate.extension.clone()).or_insert(0);
        if *count >= per_extension {
            continue;
        }
        *count += 1;
        chosen.push(candidate);
    }
    chosen
}

/// Most frequent extension among the chosen files, ties broken by
/// [`CODE_EXTENSIONS`] order.
pub(crate) fn dominant_language(chosen: &[Candidate]) -> Option<&'static str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for candidate in chosen {
        *counts.entry(candidate.extension.as_str()).or_insert(0) += 1;
    }
    CODE_EXTENSIONS
        .iter()
        .filter_map(|ext| counts.get(ext).map(|count| (*ext, *count)))
        .fold(None::<(&str, usize)>, |best, (ext, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((ext, count)),
        })
        .and_then(|(ext, _)| language_for_extension(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(relative: &str, size: u64) -> Candidate {
        let extension = relative.rsplit('.').next().unwrap_or_default().to_string();
        Candidate {
            relative: relative.to_string(),
            path: PathBuf::from(relative),
            extension,
            size,
        }
    }

    #[test]
    fn test_selection_caps_per_extension_and_total() {
        let candidates = vec![
            candidate("a.rs", 10),
            candidate("b.rs", 50),
            candidate("c.rs", 30),
            candidate("d.rs", 40),
            candidate("main.py", 5),
        ];
        let chosen = select_candidates(candidates, 3, 10);
        let paths: Vec<_> = chosen.iter().map(|c| c.relative.as_str()).collect();
        assert_eq!(paths, vec!["b.rs", "d.rs", "c.rs", "main.py"]);

        let capped = select_candidates(chosen, 3, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_ties_broken_by_path() {
        let chosen = select_candidates(vec![candidate("z.go", 7), candidate("a.go", 7)], 3, 10);
        assert_eq!(chosen[0].relative, "a.go");
    }

    #[test]
    fn test_dominant_language() {
        let chosen = vec![candidate("a.py", 1), candidate("b.rs", 1), candidate("c.rs", 1)];
        assert_eq!(dominant_language(&chosen), Some("Rust"));

        let tie = vec![candidate("a.rs", 1), candidate("b.py", 1)];
        assert_eq!(dominant_language(&tie), Some("Python"));

        assert_eq!(dominant_language(&[]), None);
    }

    #[test]
    fn test_minified_detection() {
        assert!(is_minified(Path::new("static/app.min.js")));
        assert!(!is_minified(Path::new("src/app.js")));
    }
}
