//! Language-model prompts and response parsing.

use reelsmith_core::{
    AnalysisBundle, ProjectBrief, SCENE_COUNT, SCENE_DURATION_SECS, Scene, SceneRole, Script,
    TOTAL_DURATION_SECS, max_narration_words,
};
use reelsmith_error::ValidationErrorKind;
use serde::Deserialize;

/// System instruction for every language-model call.
pub const SYSTEM_PROMPT: &str = "You are a technical storyteller who writes concise, \
cinematic explainer videos about software projects. Always answer with JSON only.";

/// Prompt asking for a structured project brief.
pub fn brief_prompt(bundle: &AnalysisBundle) -> String {
    format!(
        r#"Analyze this software repository and provide a comprehensive understanding:

{analysis}

Provide a structured analysis in JSON format:
{{
    "name": "Project name",
    "tagline": "One-sentence description",
    "problem": "What problem does it solve?",
    "solution": "How does it solve it?",
    "architecture": "High-level architecture/approach",
    "key_features": ["feature1", "feature2", "feature3"],
    "tech_stack": ["tech1", "tech2"],
    "getting_started": "Quick start steps",
    "target_audience": "Who is this for?"
}}

Be concise and focus on what would make a compelling {total}-second explainer video."#,
        analysis = bundle.render(),
        total = TOTAL_DURATION_SECS,
    )
}

/// Prompt asking for the five-scene script.
pub fn script_prompt(brief: &ProjectBrief) -> String {
    let brief_json = serde_json::to_string_pretty(brief).unwrap_or_default();
    let roles: String = SceneRole::ORDER
        .iter()
        .enumerate()
        .map(|(i, role)| {
            format!(
                "Scene {} ({} - {} seconds): {}\n",
                i + 1,
                role.as_ref().to_uppercase(),
                SCENE_DURATION_SECS,
                role_direction(*role)
            )
        })
        .collect();

    format!(
        r#"Create a compelling {total}-second explainer video script for this software project.

Project Analysis:
{brief_json}

Create a {count}-scene script ({secs} seconds each) with cinematic visual descriptions:

{roles}
For each scene provide:
1. Visual description (detailed for video generation - camera movements, lighting, colors, objects)
2. Voiceover narration text (natural, conversational, at most {words} words so it fits in {secs} seconds)
3. Audio cues (ambient sounds and effects the video model should generate)

Return as JSON:
{{
    "video_title": "Project Name: Tagline",
    "overall_style": "modern tech + dynamic infographics",
    "scenes": [
        {{
            "number": 1,
            "title": "Scene title",
            "duration": {secs},
            "visual_prompt": "Extremely detailed prompt with cinematic details...",
            "voiceover_text": "What the narrator says...",
            "audio_cues": ["background sound", "effect"]
        }}
    ]
}}

Return exactly {count} scenes, numbered 1 to {count} in order."#,
        total = TOTAL_DURATION_SECS,
        count = SCENE_COUNT,
        secs = SCENE_DURATION_SECS,
        words = max_narration_words(),
    )
}

fn role_direction(role: SceneRole) -> &'static str {
    match role {
        SceneRole::Hook => "visually striking intro showing the project name and tagline",
        SceneRole::Problem => "visualize the problem this solves with relatable metaphors",
        SceneRole::Solution => "show how it works with animated architecture diagrams",
        SceneRole::Features => "highlight two or three standout features",
        SceneRole::GetStarted => "quick getting-started visual and call to action",
    }
}

/// Instruction appended after an invalid script.
pub fn corrective_instruction(violation: &ValidationErrorKind) -> String {
    format!(
        "\n\nYour previous answer was rejected: {}. Return corrected JSON with exactly {} scenes, \
         each with a non-empty visual_prompt and a voiceover_text of at most {} words.",
        violation,
        SCENE_COUNT,
        max_narration_words()
    )
}

/// Strip a surrounding markdown code fence, if any.
///
/// The fence's info string (`json`, `JSON`, `jsonc`, ...) is dropped with
/// the rest of its opening line.
///
/// ```
/// use reelsmith_pipeline::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
/// assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
/// assert_eq!(strip_code_fence("  {}  "), "{}");
/// ```
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some((_, after_fence)) = trimmed.split_once("```") else {
        return trimmed;
    };
    let body = match after_fence.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with(['{', '[']) => rest,
        _ => after_fence,
    };
    body.split_once("```")
        .map(|(inner, _)| inner)
        .unwrap_or(body)
        .trim()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudioCues {
    List(Vec<String>),
    Text(String),
}

impl AudioCues {
    fn into_tags(self) -> Vec<String> {
        let raw = match self {
            AudioCues::List(list) => list,
            AudioCues::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct DraftScene {
    #[serde(default, alias = "scene_number")]
    number: Option<usize>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    visual_prompt: String,
    #[serde(default, alias = "narration")]
    voiceover_text: String,
    #[serde(default)]
    audio_cues: Option<AudioCues>,
}

#[derive(Debug, Deserialize)]
struct DraftScript {
    #[serde(default)]
    video_title: String,
    #[serde(default)]
    overall_style: String,
    #[serde(default)]
    scenes: Vec<DraftScene>,
}

/// Parse a language-model response into a script and validate it.
///
/// Scene numbers, when present, must run 1–5 in order. Missing titles
/// default to the scene's role.
pub fn parse_script(response: &str) -> Result<Script, ValidationErrorKind> {
    let body = strip_code_fence(response);
    let draft: DraftScript =
        serde_json::from_str(body).map_err(|e| ValidationErrorKind::Malformed(e.to_string()))?;

    if draft.scenes.len() != SCENE_COUNT {
        return Err(ValidationErrorKind::SceneCount {
            expected: SCENE_COUNT,
            actual: draft.scenes.len(),
        });
    }

    let mut scenes = Vec::with_capacity(SCENE_COUNT);
    for (index, (draft_scene, role)) in draft.scenes.into_iter().zip(SceneRole::ORDER).enumerate() {
        if let Some(number) = draft_scene.number.filter(|n| *n != index + 1) {
            return Err(ValidationErrorKind::Malformed(format!(
                "scene at position {} is numbered {}",
                index + 1,
                number
            )));
        }
        let title = if draft_scene.title.trim().is_empty() {
            role.to_string()
        } else {
            draft_scene.title.trim().to_string()
        };
        scenes.push(Scene {
            index,
            role,
            title,
            duration_secs: draft_scene.duration.unwrap_or(SCENE_DURATION_SECS),
            visual_prompt: draft_scene.visual_prompt.trim().to_string(),
            narration: draft_scene.voiceover_text.trim().to_string(),
            audio_cues: draft_scene
                .audio_cues
                .map(AudioCues::into_tags)
                .unwrap_or_default(),
        });
    }

    let script = Script {
        video_title: draft.video_title.trim().to_string(),
        overall_style: draft.overall_style.trim().to_string(),
        scenes,
    };
    script.validate()?;
    Ok(script)
}

/// Parse a project brief; `None` when the response is not a brief.
pub fn parse_brief(response: &str) -> Option<ProjectBrief> {
    let brief: ProjectBrief = serde_json::from_str(strip_code_fence(response)).ok()?;
    if brief.name.trim().is_empty() {
        return None;
    }
    Some(brief)
}
