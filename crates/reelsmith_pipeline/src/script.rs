//! Script synthesis: project brief, then a validated five-scene script.

use crate::prompts::{
    SYSTEM_PROMPT, brief_prompt, corrective_instruction, parse_brief, parse_script, script_prompt,
};
use reelsmith_core::{AnalysisBundle, CacheKey, Fingerprinter, ProjectBrief, Script, Stage};
use reelsmith_error::{
    JsonError, ReelsmithError, ReelsmithErrorKind, ReelsmithResult, ValidationError,
    ValidationErrorKind,
};
use reelsmith_models::{LanguageModel, TextRequest};
use reelsmith_rate_limit::RetryPolicy;
use reelsmith_storage::{ArtifactPayload, ArtifactStore, Blob};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const BRIEF_BLOB: &str = "brief.json";
const SCRIPT_BLOB: &str = "script.json";

/// Brief and script for one analysis bundle.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct ScriptOutcome {
    brief: ProjectBrief,
    script: Script,
    /// Whether the script came from the artifact store
    cached: bool,
}

/// Writes scripts with a language model, caching by bundle fingerprint.
#[derive(Clone)]
pub struct ScriptSynthesizer {
    model: Arc<dyn LanguageModel>,
    store: ArtifactStore,
    retry: RetryPolicy,
    max_validation_retries: usize,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl std::fmt::Debug for ScriptSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSynthesizer")
            .field("model", &self.model.model_name())
            .field("max_validation_retries", &self.max_validation_retries)
            .finish_non_exhaustive()
    }
}

impl ScriptSynthesizer {
    /// Synthesizer using `model`, persisting into `store`.
    pub fn new(model: Arc<dyn LanguageModel>, store: ArtifactStore) -> Self {
        Self {
            model,
            store,
            retry: RetryPolicy::default(),
            max_validation_retries: 2,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Retry policy for transient service errors.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Corrective re-asks after an invalid script.
    pub fn with_max_validation_retries(mut self, retries: usize) -> Self {
        self.max_validation_retries = retries;
        self
    }

    /// Sampling parameters passed on every call.
    pub fn with_sampling(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Cache key of the brief for a bundle.
    pub fn brief_key(&self, bundle: &AnalysisBundle) -> CacheKey {
        Fingerprinter::new("brief")
            .field("bundle", bundle.fingerprint().as_str())
            .field("model", self.model.model_name())
            .finish()
    }

    /// Cache key of the script for a bundle.
    pub fn script_key(&self, bundle: &AnalysisBundle) -> CacheKey {
        Fingerprinter::new("script")
            .field("bundle", bundle.fingerprint().as_str())
            .field("model", self.model.model_name())
            .finish()
    }

    /// Load a previously written script for this bundle, if any.
    pub async fn cached_script(&self, bundle: &AnalysisBundle) -> ReelsmithResult<Option<Script>> {
        match self.store.get(Stage::Script, &self.script_key(bundle)).await? {
            Some(entry) => Ok(Some(self.store.read_json(&entry, SCRIPT_BLOB).await?)),
            None => Ok(None),
        }
    }

    /// Brief then script for `bundle`.
    ///
    /// A cached script skips both language-model calls.
    #[instrument(skip(self, bundle), fields(bundle = bundle.fingerprint().short()))]
    pub async fn synthesize(&self, bundle: &AnalysisBundle) -> ReelsmithResult<ScriptOutcome> {
        if let Some(script) = self.cached_script(bundle).await? {
            info!(title = %script.video_title, "Script served from cache");
            let brief = self.cached_brief(bundle).await?.unwrap_or_else(|| {
                ProjectBrief::fallback(bundle.metadata())
            });
            return Ok(ScriptOutcome {
                brief,
                script,
                cached: true,
            });
        }

        let brief = self.brief(bundle).await?;
        let script = self.script(bundle, &brief).await?;
        Ok(ScriptOutcome {
            brief,
            script,
            cached: false,
        })
    }

    async fn cached_brief(&self, bundle: &AnalysisBundle) -> ReelsmithResult<Option<ProjectBrief>> {
        match self.store.get(Stage::Brief, &self.brief_key(bundle)).await? {
            Some(entry) => Ok(Some(self.store.read_json(&entry, BRIEF_BLOB).await?)),
            None => Ok(None),
        }
    }

    /// Structured brief for `bundle`.
    ///
    /// An unparseable answer falls back to a brief derived from repository
    /// metadata. The fallback is not cached, so the next run asks again.
    #[instrument(skip(self, bundle))]
    pub async fn brief(&self, bundle: &AnalysisBundle) -> ReelsmithResult<ProjectBrief> {
        let key = self.brief_key(bundle);
        let request = self.request(brief_prompt(bundle))?;

        let fetched = self
            .store
            .compute_or_fetch(Stage::Brief, &key, || async {
                let response = self.call(&request).await?;
                let brief = parse_brief(&response).ok_or_else(|| {
                    JsonError::new("language model returned an unparseable brief")
                })?;
                let blob = Blob::json(BRIEF_BLOB, &brief)
                    .map_err(|e| JsonError::new(e.to_string()))?;
                Ok(ArtifactPayload::new(vec![blob]))
            })
            .await;

        match fetched {
            Ok(fetched) => self.store.read_json(&fetched.entry, BRIEF_BLOB).await,
            Err(e) if matches!(e.kind(), ReelsmithErrorKind::Json(_)) => {
                warn!(error = %e, "Failed to parse brief, using fallback analysis");
                Ok(ProjectBrief::fallback(bundle.metadata()))
            }
            Err(e) => Err(e),
        }
    }

    /// Validated script for `bundle`, written from `brief`.
    ///
    /// Invalid answers are re-asked with a corrective instruction up to the
    /// configured bound, then fail with `ScriptGenerationFailed`.
    #[instrument(skip(self, bundle, brief))]
    pub async fn script(
        &self,
        bundle: &AnalysisBundle,
        brief: &ProjectBrief,
    ) -> ReelsmithResult<Script> {
        let key = self.script_key(bundle);
        let fetched = self
            .store
            .compute_or_fetch(Stage::Script, &key, || async {
                let script = self.write_script(brief).await?;
                let blob = Blob::json(SCRIPT_BLOB, &script)
                    .map_err(|e| JsonError::new(e.to_string()))?;
                Ok(ArtifactPayload::new(vec![blob]).with_metadata(serde_json::json!({
                    "video_title": script.video_title,
                    "script_fingerprint": script.fingerprint().as_str(),
                })))
            })
            .await?;
        self.store.read_json(&fetched.entry, SCRIPT_BLOB).await
    }

    async fn write_script(&self, brief: &ProjectBrief) -> ReelsmithResult<Script> {
        let base_prompt = script_prompt(brief);
        let attempts = self.max_validation_retries + 1;
        let mut last_violation: Option<ValidationErrorKind> = None;

        for attempt in 0..attempts {
            let prompt = match &last_violation {
                Some(violation) => format!("{}{}", base_prompt, corrective_instruction(violation)),
                None => base_prompt.clone(),
            };
            let response = self.call(&self.request(prompt)?).await?;
            match parse_script(&response) {
                Ok(script) => {
                    info!(attempt, title = %script.video_title, "Script validated");
                    return Ok(script);
                }
                Err(violation) => {
                    warn!(attempt, violation = %violation, "Script rejected");
                    last_violation = Some(violation);
                }
            }
        }

        Err(ValidationError::new(ValidationErrorKind::ScriptGenerationFailed {
            attempts,
            last_violation: last_violation
                .map(|v| v.to_string())
                .unwrap_or_default(),
        })
        .into())
    }

    fn request(&self, user: String) -> ReelsmithResult<TextRequest> {
        let mut builder = TextRequest::builder();
        builder.system(SYSTEM_PROMPT).user(user);
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        if let Some(tokens) = self.max_output_tokens {
            builder.max_output_tokens(tokens);
        }
        builder.build().map_err(|e| {
            ReelsmithError::from(reelsmith_error::ConfigError::new(format!(
                "invalid text request: {}",
                e
            )))
        })
    }

    async fn call(&self, request: &TextRequest) -> ReelsmithResult<String> {
        self.retry
            .run("language model", |_attempt| self.model.generate(request))
            .await
    }
}
