//! Pipeline controller.
//!
//! A fixed linear sequence with no branching: query expansion ->
//! requirement derivation -> plan synthesis -> markup synthesis -> done.
//! Deliberately not a general graph - it is a five-state machine with one
//! transition each, which makes the "always proceed after failure" policy
//! explicit and auditable: a stage failure appends an error and the next
//! stage still runs, so an early failure typically produces a cascading,
//! ordered error list (first entry = root cause).
//!
//! The controller itself catches nothing per stage - by contract every stage
//! already reduces errors to appended strings - but a fault escaping the
//! stage contract (a panic) is contained at the task-join boundary and
//! reduced to a single `pipeline:` error entry with all structured fields
//! left absent.

use crate::prompt::PromptStore;
use crate::provider::LlmProvider;
use crate::stages::{
    MarkupSynthesis, PlanSynthesis, QueryExpansion, RequirementDerivation, Stage, StageContext,
};
use crate::types::GenerationRecord;
use std::sync::Arc;

/// The controller's states: `Start` plus one state after each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    QueryExpanded,
    RequirementsDerived,
    PlanSynthesized,
    MarkupSynthesized,
}

impl PipelineState {
    /// The single outgoing transition from this state, if any.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Start => Some(PipelineState::QueryExpanded),
            PipelineState::QueryExpanded => Some(PipelineState::RequirementsDerived),
            PipelineState::RequirementsDerived => Some(PipelineState::PlanSynthesized),
            PipelineState::PlanSynthesized => Some(PipelineState::MarkupSynthesized),
            PipelineState::MarkupSynthesized => None,
        }
    }
}

/// Result of one pipeline run: the final record plus the recorded transition
/// history, so tests can assert the always-proceed policy.
#[derive(Debug)]
pub struct PipelineRun {
    pub record: GenerationRecord,
    pub transitions: Vec<PipelineState>,
}

struct PipelineInner {
    ctx: StageContext,
    stages: [Box<dyn Stage>; 4],
}

impl PipelineInner {
    async fn run_sequence(&self, user_query: String) -> PipelineRun {
        let mut record = GenerationRecord::new(user_query);
        let mut state = PipelineState::Start;
        let mut transitions = vec![state];

        for stage in &self.stages {
            record = stage.run(record, &self.ctx).await;
            // By construction the stage order mirrors the state transitions.
            if let Some(next) = state.next() {
                state = next;
                transitions.push(state);
            }
        }

        tracing::info!(
            errors = record.errors.len(),
            has_markup = record.svg_code.is_some(),
            "pipeline run complete"
        );

        PipelineRun {
            record,
            transitions,
        }
    }
}

/// Wires the four stages into the fixed sequence and runs them against one
/// record per request.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompt_store: Arc<dyn PromptStore>,
        temperature: f64,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                ctx: StageContext::new(provider, prompt_store, temperature),
                stages: [
                    Box::new(QueryExpansion),
                    Box::new(RequirementDerivation),
                    Box::new(PlanSynthesis),
                    Box::new(MarkupSynthesis),
                ],
            }),
        }
    }

    /// Run the full pipeline. Never returns an error: all failure is
    /// communicated through the record's `errors` field, and callers must
    /// check it before treating `svg_code` as usable. Partial results are
    /// preserved, not discarded, to aid diagnosis.
    pub async fn generate(&self, user_query: &str) -> GenerationRecord {
        self.run(user_query).await.record
    }

    /// As `generate`, but also returns the state transition history.
    pub async fn run(&self, user_query: &str) -> PipelineRun {
        let inner = Arc::clone(&self.inner);
        let query = user_query.to_string();

        // The sequence runs in its own task so a fault escaping the stage
        // contract is contained here instead of unwinding into the caller.
        let handle = tokio::spawn(async move { inner.run_sequence(query).await });

        match handle.await {
            Ok(run) => run,
            Err(join_err) => {
                tracing::error!(error = %join_err, "pipeline task faulted outside stage handling");
                let mut record = GenerationRecord::new(user_query);
                record
                    .errors
                    .push(format!("pipeline: failed to generate wireframe: {join_err}"));
                PipelineRun {
                    record,
                    transitions: vec![PipelineState::Start],
                }
            }
        }
    }
}
