//! Clip chain errors.

/// Specific error conditions for the clip chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ClipErrorKind {
    /// Scene exhausted its retry budget
    #[display("Clip generation failed for scene {}: {}", scene_index, reason)]
    ClipGenerationFailed {
        /// Scene that failed
        scene_index: usize,
        /// Last underlying failure
        reason: String,
    },
    /// Seed frame missing, corrupt or not matching the prior clip
    #[display("Continuity violation at scene {}: {}", scene_index, reason)]
    ContinuityViolation {
        /// Scene whose seed is broken
        scene_index: usize,
        /// What was wrong with the seed
        reason: String,
    },
}

impl ClipErrorKind {
    /// Scene index the failure belongs to.
    pub fn scene_index(&self) -> usize {
        match self {
            ClipErrorKind::ClipGenerationFailed { scene_index, .. }
            | ClipErrorKind::ContinuityViolation { scene_index, .. } => *scene_index,
        }
    }
}

/// Clip chain error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Clip Error: {} at line {} in {}", kind, line, file)]
pub struct ClipError {
    /// The kind of error that occurred
    pub kind: ClipErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ClipError {
    /// Create a new clip error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ClipErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
