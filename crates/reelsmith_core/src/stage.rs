//! Pipeline stage names, used as key spaces in the artifact store.

use serde::{Deserialize, Serialize};

/// A stage whose outputs are persisted in the artifact store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Repository analysis bundle
    Analysis,
    /// Structured project brief from the language model
    Brief,
    /// Validated five-scene script
    Script,
    /// Downloaded clip before its last frame is extracted
    ClipRaw,
    /// Per-scene video clip plus its last frame
    Clip,
    /// Per-scene narration audio
    Narration,
    /// Final composed video
    Composition,
}
