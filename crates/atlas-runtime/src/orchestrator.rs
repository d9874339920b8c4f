//! Bounded generate → score → decide loop.
//!
//! Each attempt streams a fresh guide through a [`GenerationSession`],
//! scores it with the [`LayoutAnalyzer`] and asks the reader preset's
//! regeneration policy what to do. `Regenerate` tightens the
//! generation constraints for the next attempt. The loop ends on `Accept`,
//! or on `AcceptBest` once the attempt budget is spent.
//!
//! Analyzer calls are retried with exponential backoff on transient failures
//! and timeouts; every call and every attempt is bounded by a timeout.

use backon::{ExponentialBuilder, Retryable};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use atlas_core::{
    reader_presets, GenerationConstraints, GovernorValidationResult, LayoutScore, ReaderProfile,
    RegenerationAttempt, RegenerationDecision, RegenerationTracker, SummaryGovernorEngine,
    SummaryType,
};

use crate::analyzer::{LayoutAnalyzer, MarkupLayoutAnalyzer};
use crate::cache::AnalysisCache;
use crate::config::RuntimeConfig;
use crate::generator::ContentGenerator;
use crate::session::{GenerationSession, SessionOutcome};
use crate::store::StateStore;
use crate::RuntimeError;

/// One guide to produce.
#[derive(Debug, Clone)]
pub struct GuideRequest {
    pub session_id: String,
    pub source_text: String,

    /// Overrides the configured summary type.
    pub summary_type: Option<SummaryType>,

    /// Overrides the configured reader profile.
    pub reader_profile: Option<ReaderProfile>,
}

impl GuideRequest {
    pub fn new(session_id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            source_text: source_text.into(),
            summary_type: None,
            reader_profile: None,
        }
    }

    pub fn with_summary_type(mut self, summary_type: SummaryType) -> Self {
        self.summary_type = Some(summary_type);
        self
    }

    pub fn with_reader_profile(mut self, profile: ReaderProfile) -> Self {
        self.reader_profile = Some(profile);
        self
    }
}

/// The accepted guide and how it was reached.
#[derive(Debug, Clone)]
pub struct GuideReport {
    pub session_id: String,
    pub guide: String,

    /// `Accept` or `AcceptBest`.
    pub decision: RegenerationDecision,

    pub score: LayoutScore,
    pub attempts: Vec<RegenerationAttempt>,

    /// Governor metadata for the accepted attempt.
    pub validation: GovernorValidationResult,

    /// Constraints the accepted attempt was generated under.
    pub constraints: GenerationConstraints,
}

pub struct RegenerationOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    analyzer: Arc<dyn LayoutAnalyzer>,
    cache: AnalysisCache,
    store: StateStore,
    config: RuntimeConfig,
}

impl RegenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        analyzer: Arc<dyn LayoutAnalyzer>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            generator,
            analyzer,
            cache: AnalysisCache::from_config(&config.cache),
            store: StateStore::new(),
            config,
        }
    }

    pub fn builder() -> RegenerationOrchestratorBuilder {
        RegenerationOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Snapshots of sessions interrupted mid-stream.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn run(&self, request: GuideRequest) -> Result<GuideReport, RuntimeError> {
        let summary_type = request.summary_type.unwrap_or(self.config.summary_type);
        let profile = request.reader_profile.unwrap_or(self.config.reader_profile);
        let format = self.config.score_format;

        let engine = SummaryGovernorEngine::for_summary_type(summary_type);
        let analysis = self
            .cache
            .get_or_analyze(
                &request.source_text,
                engine.governor().section_budget.fallback_strategy,
            )
            .await;
        let session = GenerationSession::new(
            request.session_id.clone(),
            engine,
            analysis,
            self.store.clone(),
        );

        let preset = reader_presets::preset(profile);
        let policy = preset.regeneration_policy(format);
        let mut constraints = preset
            .constraints()
            .with_word_budget(session.plan().total_budget);
        let mut tracker = RegenerationTracker::new(policy.max_regeneration_attempts, format);
        let mut applied = BTreeSet::new();
        let mut outcomes: Vec<(SessionOutcome, GenerationConstraints)> = Vec::new();

        tracing::info!(
            session = %request.session_id,
            summary_type = %summary_type,
            profile = %profile,
            total_budget = session.plan().total_budget,
            "Guide generation started"
        );

        loop {
            let attempt = tracker.next_attempt_number();
            let outcome = self.generate_attempt(&session, &constraints, attempt).await?;

            if outcome.decision.is_halt() {
                let violations = outcome
                    .decision
                    .result()
                    .violations
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                return Err(RuntimeError::Halted { violations });
            }

            let score = self.score(&outcome.guide, &constraints).await?;
            let decision = policy.should_regenerate(&score, attempt, tracker.best_score());
            tracker.record(score, decision.clone(), applied.clone());
            outcomes.push((outcome, constraints.clone()));

            match &decision {
                RegenerationDecision::Regenerate { constraints: next, .. } => {
                    constraints = constraints.tightened(next);
                    applied.extend(next.iter().cloned());
                }
                RegenerationDecision::Accept { score } | RegenerationDecision::AcceptBest { score } => {
                    let score = score.clone();
                    let index = tracker
                        .attempts()
                        .iter()
                        .rposition(|a| a.score == score)
                        .unwrap_or(outcomes.len() - 1);
                    let (outcome, used) = outcomes.swap_remove(index);

                    tracing::info!(
                        session = %request.session_id,
                        decision = decision.label(),
                        attempts = tracker.attempts().len(),
                        score = score.score_for(format),
                        "Guide generation finished"
                    );

                    return Ok(GuideReport {
                        session_id: request.session_id,
                        guide: outcome.guide,
                        score,
                        attempts: tracker.attempts().to_vec(),
                        validation: outcome.decision.result().clone(),
                        constraints: used,
                        decision,
                    });
                }
            }
        }
    }

    async fn generate_attempt(
        &self,
        session: &GenerationSession,
        constraints: &GenerationConstraints,
        attempt: u32,
    ) -> Result<SessionOutcome, RuntimeError> {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(
            timeout,
            session.run(self.generator.as_ref(), constraints, attempt),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    session = %session.id(),
                    attempt,
                    generator = self.generator.name(),
                    timeout = ?timeout,
                    "Generation attempt timed out"
                );
                Err(RuntimeError::Timeout(timeout))
            }
        }
    }

    async fn score(
        &self,
        guide: &str,
        constraints: &GenerationConstraints,
    ) -> Result<LayoutScore, RuntimeError> {
        let retry = &self.config.analyzer_retry;
        let backoff = ExponentialBuilder::default()
            .with_min_delay(retry.min_delay)
            .with_max_delay(retry.max_delay)
            .with_max_times(retry.max_retries);

        let analyzer = &self.analyzer;
        let timeout = self.config.analyzer_timeout;

        let score = (|| async move {
            match tokio::time::timeout(timeout, analyzer.analyze(guide, constraints)).await {
                Ok(result) => result.map_err(RuntimeError::from),
                Err(_) => Err(RuntimeError::Timeout(timeout)),
            }
        })
        .retry(backoff)
        .when(is_retryable)
        .notify(|err: &RuntimeError, delay: Duration| {
            tracing::warn!(
                analyzer = analyzer.name(),
                error = %err,
                delay = ?delay,
                "Layout analysis failed; retrying"
            );
        })
        .await?;

        Ok(score)
    }
}

fn is_retryable(err: &RuntimeError) -> bool {
    match err {
        RuntimeError::Timeout(_) => true,
        RuntimeError::Analyzer(e) => e.is_transient(),
        _ => false,
    }
}

/// Builder for [`RegenerationOrchestrator`].
pub struct RegenerationOrchestratorBuilder {
    generator: Option<Arc<dyn ContentGenerator>>,
    analyzer: Option<Arc<dyn LayoutAnalyzer>>,
    config: RuntimeConfig,
}

impl RegenerationOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            analyzer: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Defaults to [`MarkupLayoutAnalyzer`] for the configured reader profile.
    pub fn analyzer(mut self, analyzer: Arc<dyn LayoutAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate presets and configuration, then build.
    pub fn build(self) -> Result<RegenerationOrchestrator, RuntimeError> {
        atlas_core::validate_presets()?;
        self.config.validate()?;

        let generator = self.generator.ok_or(RuntimeError::NotConfigured("generator"))?;
        let analyzer = self.analyzer.unwrap_or_else(|| {
            Arc::new(MarkupLayoutAnalyzer::for_profile(self.config.reader_profile))
        });

        Ok(RegenerationOrchestrator::new(generator, analyzer, self.config))
    }
}

impl Default for RegenerationOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
