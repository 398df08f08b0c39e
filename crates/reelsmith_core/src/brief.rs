//! Structured project brief produced ahead of script writing.

use crate::RepositoryMetadata;
use serde::{Deserialize, Serialize};

/// What the language model understood about the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectBrief {
    /// Project name
    pub name: String,
    /// One-sentence description
    pub tagline: String,
    /// Problem the project solves
    pub problem: String,
    /// How it solves it
    pub solution: String,
    /// High-level architecture
    pub architecture: String,
    /// Standout features
    pub key_features: Vec<String>,
    /// Languages, frameworks, services
    pub tech_stack: Vec<String>,
    /// Quick start steps
    pub getting_started: String,
    /// Intended audience
    pub target_audience: String,
}

impl ProjectBrief {
    /// Deterministic brief used when the model's answer cannot be parsed.
    pub fn fallback(metadata: &RepositoryMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            tagline: "An open source project".to_string(),
            problem: "Solving software challenges".to_string(),
            solution: "Providing tools and libraries".to_string(),
            architecture: "Modern software architecture".to_string(),
            key_features: vec![
                "Open source".to_string(),
                "Well documented".to_string(),
                "Active development".to_string(),
            ],
            tech_stack: metadata
                .primary_language
                .clone()
                .map(|l| vec![l])
                .unwrap_or_else(|| vec!["Various technologies".to_string()]),
            getting_started: "See README for installation".to_string(),
            target_audience: "Developers".to_string(),
        }
    }
}
