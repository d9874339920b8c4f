//! One generation attempt: stream, govern, substitute, validate.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use atlas_core::types::word_count;
use atlas_core::{
    ChunkProcessingResult, ContentChunk, EnforcementDecision, ExpansionTypeDetector,
    GenerationConstraints, GenerationPlan, GovernorState, SourceAnalysis, SummaryGovernorEngine,
    SynthesisManager, SynthesisOutcome, SynthesisParagraph,
};

use crate::generator::{ContentGenerator, GeneratedChunk, GenerationRequest};
use crate::store::{SessionSnapshot, StateStore};
use crate::RuntimeError;

const INTRO_CONTEXT: &str = "the opening overview";
const BODY_CONTEXT: &str = "the main discussion";
const CONCLUSION_CONTEXT: &str = "the closing synthesis";

/// A kept piece of guide text, after substitutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideSegment {
    pub section_index: usize,
    pub text: String,
}

/// Result of one attempt.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub attempt: u32,

    /// Assembled guide markup with synthesis substituted for cut content.
    pub guide: String,

    pub state: GovernorState,
    pub paragraphs: Vec<SynthesisParagraph>,

    /// Streaming stopped early on the hard limit.
    pub hard_stopped: bool,

    /// Chunks skipped because a resumed snapshot already applied them.
    pub replayed_chunks: usize,

    pub decision: EnforcementDecision,
}

/// Drives one session's chunk stream through the governor.
///
/// Detection results are shared read-only; the governor state is owned by the
/// session and snapshotted into the [`StateStore`] after every chunk.
pub struct GenerationSession {
    id: String,
    engine: SummaryGovernorEngine,
    plan: GenerationPlan,
    analysis: Arc<SourceAnalysis>,
    manager: SynthesisManager,
    detector: ExpansionTypeDetector,
    store: StateStore,
}

impl GenerationSession {
    pub fn new(
        id: impl Into<String>,
        engine: SummaryGovernorEngine,
        analysis: Arc<SourceAnalysis>,
        store: StateStore,
    ) -> Self {
        let plan = engine.plan(analysis.source_word_count, &analysis.chapters);
        let manager =
            SynthesisManager::for_governor(engine.governor(), analysis.source_type.detected_type);

        Self {
            id: id.into(),
            engine,
            plan,
            analysis,
            manager,
            detector: ExpansionTypeDetector::new(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn plan(&self) -> &GenerationPlan {
        &self.plan
    }

    pub fn engine(&self) -> &SummaryGovernorEngine {
        &self.engine
    }

    /// Start a fresh attempt, replacing any stored snapshot.
    pub async fn run(
        &self,
        generator: &dyn ContentGenerator,
        constraints: &GenerationConstraints,
        attempt: u32,
    ) -> Result<SessionOutcome, RuntimeError> {
        let snapshot = SessionSnapshot::new(attempt);
        self.store.save(&self.id, snapshot.clone());
        self.drive(generator, constraints, snapshot).await
    }

    /// Continue an interrupted attempt from its stored snapshot.
    pub async fn resume(
        &self,
        generator: &dyn ContentGenerator,
        constraints: &GenerationConstraints,
    ) -> Result<SessionOutcome, RuntimeError> {
        let snapshot = self.store.load_required(&self.id)?;
        tracing::info!(
            session = %self.id,
            attempt = snapshot.attempt,
            last_chunk = ?snapshot.state.last_chunk_index,
            "Resuming session"
        );
        self.drive(generator, constraints, snapshot).await
    }

    async fn drive(
        &self,
        generator: &dyn ContentGenerator,
        constraints: &GenerationConstraints,
        mut snapshot: SessionSnapshot,
    ) -> Result<SessionOutcome, RuntimeError> {
        let request = GenerationRequest {
            session_id: self.id.clone(),
            governor: self.engine.governor().clone(),
            plan: self.plan.clone(),
            constraints: constraints.clone(),
            attempt: snapshot.attempt,
        };

        let mut stream = generator.generate(&request).await?;
        let mut hard_stopped = false;
        let mut replayed_chunks = 0;
        let mut chunk_index = 0;

        while let Some(item) = stream.next().await {
            let generated = item?;
            let chunk = self.to_chunk(&generated, chunk_index);
            chunk_index += 1;

            let (state, result) =
                self.engine
                    .process_chunk(&snapshot.state, &chunk, self.plan.total_budget);
            snapshot.state = state;

            if let ChunkProcessingResult::Replayed { .. } = result {
                replayed_chunks += 1;
                continue;
            }

            let mut text = Some(generated.text);
            for event in result.cut_events() {
                let context = self.context_for(event.section_index);
                match self.manager.handle_cut(&mut snapshot.state, event, &context) {
                    SynthesisOutcome::Emitted { paragraph } => {
                        text = Some(paragraph.content.clone());
                        snapshot.paragraphs.push(paragraph);
                    }
                    SynthesisOutcome::Deferred { .. } | SynthesisOutcome::Omitted => text = None,
                }
            }
            if let Some(text) = text {
                snapshot.segments.push(GuideSegment {
                    section_index: generated.section_index,
                    text,
                });
            }

            self.store.save(&self.id, snapshot.clone());

            if result.is_hard_stop() {
                hard_stopped = true;
                break;
            }
        }

        Ok(self.finish(snapshot, hard_stopped, replayed_chunks))
    }

    fn finish(
        &self,
        mut snapshot: SessionSnapshot,
        hard_stopped: bool,
        replayed_chunks: usize,
    ) -> SessionOutcome {
        let consolidated = self
            .manager
            .finalize_all(&mut snapshot.state, &self.guide_context());
        for paragraph in consolidated {
            let position = snapshot
                .segments
                .iter()
                .rposition(|s| s.section_index == paragraph.section_index)
                .map(|p| p + 1)
                .unwrap_or(snapshot.segments.len());
            snapshot.segments.insert(
                position,
                GuideSegment {
                    section_index: paragraph.section_index,
                    text: paragraph.content.clone(),
                },
            );
            snapshot.paragraphs.push(paragraph);
        }

        let result = self.engine.validate(
            &snapshot.state,
            &self.plan,
            Some(&self.analysis.chapters.event),
        );
        let decision = self.engine.enforce(result);

        tracing::info!(
            session = %self.id,
            attempt = snapshot.attempt,
            words = snapshot.state.current_word_count,
            cuts = snapshot.state.cut_events.len(),
            hard_stopped,
            halted = decision.is_halt(),
            "Generation attempt finished"
        );

        self.store.remove(&self.id);

        let guide = snapshot
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        SessionOutcome {
            session_id: self.id.clone(),
            attempt: snapshot.attempt,
            guide,
            state: snapshot.state,
            paragraphs: snapshot.paragraphs,
            hard_stopped,
            replayed_chunks,
            decision,
        }
    }

    fn to_chunk(&self, generated: &GeneratedChunk, chunk_index: usize) -> ContentChunk {
        ContentChunk::new(
            word_count(&generated.text),
            generated.section_index,
            chunk_index,
        )
        .with_expansion(self.detector.detect(&generated.text))
        .with_visuals(generated.visual_count)
    }

    /// Context handed to synthesis for a plan section.
    fn context_for(&self, section_index: usize) -> String {
        if section_index == 0 {
            return INTRO_CONTEXT.to_string();
        }
        if let Some(chapter) = self.analysis.chapters.chapters.get(section_index - 1) {
            return chapter.title.clone();
        }
        if section_index + 1 >= self.plan.section_limits.len() {
            CONCLUSION_CONTEXT.to_string()
        } else {
            BODY_CONTEXT.to_string()
        }
    }

    fn guide_context(&self) -> String {
        let titles: Vec<&str> = self
            .analysis
            .chapters
            .chapters
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        if titles.is_empty() {
            BODY_CONTEXT.to_string()
        } else {
            titles.join(", ")
        }
    }
}
