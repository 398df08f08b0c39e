//! Scripts, briefs, bundles and repositories used across tests.

#![allow(dead_code)]

use reelsmith_core::{
    AnalysisBundle, RepositoryMetadata, SampleKind, SourceSample, Script,
};
use reelsmith_pipeline::{ReelsmithConfig, parse_script};
use std::path::Path;

/// A brief the language model might return.
pub fn brief_json(name: &str) -> String {
    serde_json::json!({
        "name": name,
        "tagline": "Fast incremental builds for monorepos",
        "problem": "Builds take too long",
        "solution": "Caches every build step by content hash",
        "architecture": "Daemon plus CLI",
        "key_features": ["Remote cache", "Parallel steps", "Readable logs"],
        "tech_stack": ["Rust", "Tokio"],
        "getting_started": "cargo install demo",
        "target_audience": "Platform engineers"
    })
    .to_string()
}

/// A valid five-scene script answer. Visual prompts carry the marker `Shot {n}:`.
pub fn script_json(title: &str) -> String {
    let scenes: Vec<serde_json::Value> = (1..=5)
        .map(|n| {
            serde_json::json!({
                "number": n,
                "title": format!("Part {}", n),
                "duration": 6,
                "visual_prompt": format!("Shot {}: a glowing build graph, cinematic lighting", n),
                "voiceover_text": format!("Part {} of the story, told in a few words.", n),
                "audio_cues": "soft synth pad, keyboard clicks"
            })
        })
        .collect();
    serde_json::json!({
        "video_title": title,
        "overall_style": "Dark UI, neon accents",
        "scenes": scenes
    })
    .to_string()
}

/// A script answer with one scene too few.
pub fn short_script_json() -> String {
    let mut value: serde_json::Value =
        serde_json::from_str(&script_json("Short")).expect("fixture parses");
    value["scenes"]
        .as_array_mut()
        .expect("scenes array")
        .pop();
    value.to_string()
}

/// A script answer whose third narration is far over the word budget.
pub fn wordy_script_json() -> String {
    let mut value: serde_json::Value =
        serde_json::from_str(&script_json("Wordy")).expect("fixture parses");
    value["scenes"][2]["voiceover_text"] = serde_json::Value::String(
        "this narration keeps going and going well past anything a narrator could say in six seconds"
            .to_string(),
    );
    value.to_string()
}

/// The parsed form of [`script_json`].
pub fn valid_script(title: &str) -> Script {
    parse_script(&script_json(title)).expect("fixture script is valid")
}

/// A small analysis bundle.
pub fn sample_bundle(name: &str, readme: &str) -> AnalysisBundle {
    AnalysisBundle::new(
        vec![
            SourceSample {
                path: "README.md".into(),
                kind: SampleKind::Readme,
                text: readme.into(),
                truncated: false,
            },
            SourceSample {
                path: "src/main.rs".into(),
                kind: SampleKind::Code,
                text: "fn main() { println!(\"hi\"); }".into(),
                truncated: false,
            },
        ],
        RepositoryMetadata {
            name: name.into(),
            primary_language: Some("Rust".into()),
            ..Default::default()
        },
    )
}

/// Write a tiny repository under `root`.
pub fn demo_repository(root: &Path) {
    std::fs::create_dir_all(root.join("src")).expect("create src");
    std::fs::write(
        root.join("README.md"),
        "# demo\n\nFast incremental builds for monorepos.\n",
    )
    .expect("write readme");
    std::fs::write(
        root.join("Cargo.toml"),
        "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n",
    )
    .expect("write manifest");
    std::fs::write(root.join("src/main.rs"), "fn main() {}\n").expect("write main");
}

/// Bundled defaults with zero backoff and the store under `cache_dir`.
pub fn test_config(cache_dir: &Path) -> ReelsmithConfig {
    let toml = format!(
        r#"
cache_dir = "{}"

[language]
initial_backoff_ms = 0

[video]
initial_backoff_ms = 0
poll_interval_secs = 1

[speech]
initial_backoff_ms = 0
"#,
        cache_dir.display()
    );
    ReelsmithConfig::from_toml_str(&toml).expect("test config parses")
}
