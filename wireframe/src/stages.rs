//! The four pipeline stages.
//!
//! Contract: input is a `GenerationRecord` (possibly with the stage's
//! required upstream field absent); output is the same record with exactly
//! one additional field populated, or with one additional error appended and
//! every other field passed through unchanged. Stages never retry internally
//! (retry lives in the provider client) and never raise past their own
//! boundary. When an upstream field is absent the prompt is still built and
//! the service still invoked; the unusable result surfaces as a normal
//! extraction/parse failure, producing the expected cascading error entry.

use crate::errors::{RecoveryError, StageError};
use crate::prompt::{
    PromptManager, PromptStore, MARKUP_SYNTHESIS_PROMPT, PLAN_SYNTHESIS_PROMPT,
    QUERY_EXPANSION_PROMPT, REQUIREMENT_DERIVATION_PROMPT,
};
use crate::provider::LlmProvider;
use crate::recovery::{clean_svg, extract_json, extract_svg, has_svg_root, parse_json_with_repair};
use crate::types::GenerationRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

impl PromptStore for Arc<dyn PromptStore> {
    fn get_template(&self, id: &str) -> Result<crate::prompt::PromptTemplate, StageError> {
        (**self).get_template(id)
    }
}

/// Shared collaborators handed to each stage.
pub struct StageContext {
    pub provider: Arc<dyn LlmProvider>,
    pub prompts: PromptManager<Arc<dyn PromptStore>>,
    /// Temperature for all extraction-sensitive stages.
    pub temperature: f64,
}

impl StageContext {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn PromptStore>,
        temperature: f64,
    ) -> Self {
        Self {
            provider,
            prompts: PromptManager::new(store),
            temperature,
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// One pipeline step: calls the generative text service once and updates one
/// field of the record, or appends one error prefixed with its name.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, record: GenerationRecord, ctx: &StageContext) -> GenerationRecord;
}

/// Render a JSON document for inclusion in a prompt. Absent upstream fields
/// render as `null` - the service is invoked anyway, per the stage contract.
fn document_for_prompt(doc: &Option<serde_json::Value>) -> String {
    match doc {
        Some(value) => serde_json::to_string_pretty(value)
            .unwrap_or_else(|_| value.to_string()),
        None => "null".to_string(),
    }
}

/// Rewrites the user query into a clearer form, preserving every
/// specification the user provided. The raw query is kept in
/// `original_query` and is never overwritten afterwards.
pub struct QueryExpansion;

#[async_trait]
impl Stage for QueryExpansion {
    fn name(&self) -> &'static str {
        "query_expansion"
    }

    async fn run(&self, mut record: GenerationRecord, ctx: &StageContext) -> GenerationRecord {
        let raw_query = record.user_query.clone();

        let result: Result<String, StageError> = async {
            let vars = StageContext::vars(&[("user_query", raw_query.as_str())]);
            let prompt = ctx.prompts.render(QUERY_EXPANSION_PROMPT, &vars)?;
            let response = ctx.provider.complete(&prompt, ctx.temperature).await?;
            let value = parse_json_with_repair(extract_json(&response))?;
            let expanded = value
                .get("interpreted_query")
                .and_then(|v| v.as_str())
                .unwrap_or(&raw_query)
                .to_string();
            Ok(expanded)
        }
        .await;

        match result {
            Ok(expanded) => {
                tracing::debug!(stage = self.name(), "query expanded");
                record.original_query = Some(raw_query);
                record.user_query = expanded;
            }
            Err(e) => {
                tracing::warn!(stage = self.name(), error = %e, "stage failed");
                record.errors.push(format!("{}: {}", self.name(), e));
            }
        }
        record
    }
}

/// Derives a structured requirements document from the (expanded) query.
pub struct RequirementDerivation;

#[async_trait]
impl Stage for RequirementDerivation {
    fn name(&self) -> &'static str {
        "requirement_derivation"
    }

    async fn run(&self, mut record: GenerationRecord, ctx: &StageContext) -> GenerationRecord {
        let result: Result<serde_json::Value, StageError> = async {
            let vars = StageContext::vars(&[("user_query", record.user_query.as_str())]);
            let prompt = ctx.prompts.render(REQUIREMENT_DERIVATION_PROMPT, &vars)?;
            let response = ctx.provider.complete(&prompt, ctx.temperature).await?;
            Ok(parse_json_with_repair(extract_json(&response))?)
        }
        .await;

        match result {
            Ok(requirements) => {
                tracing::debug!(stage = self.name(), "requirements derived");
                record.detailed_requirements = Some(requirements);
            }
            Err(e) => {
                tracing::warn!(stage = self.name(), error = %e, "stage failed");
                record.errors.push(format!("{}: {}", self.name(), e));
            }
        }
        record
    }
}

/// Translates the requirements document into a wireframe plan.
pub struct PlanSynthesis;

#[async_trait]
impl Stage for PlanSynthesis {
    fn name(&self) -> &'static str {
        "plan_synthesis"
    }

    async fn run(&self, mut record: GenerationRecord, ctx: &StageContext) -> GenerationRecord {
        let result: Result<serde_json::Value, StageError> = async {
            let requirements_json = document_for_prompt(&record.detailed_requirements);
            let vars = StageContext::vars(&[("requirements_json", requirements_json.as_str())]);
            let prompt = ctx.prompts.render(PLAN_SYNTHESIS_PROMPT, &vars)?;
            let response = ctx.provider.complete(&prompt, ctx.temperature).await?;
            Ok(parse_json_with_repair(extract_json(&response))?)
        }
        .await;

        match result {
            Ok(plan) => {
                tracing::debug!(stage = self.name(), "wireframe plan synthesized");
                record.wireframe_plan = Some(plan);
            }
            Err(e) => {
                tracing::warn!(stage = self.name(), error = %e, "stage failed");
                record.errors.push(format!("{}: {}", self.name(), e));
            }
        }
        record
    }
}

/// Generates the final SVG markup from the wireframe plan. Additionally
/// validates that the cleaned output contains a recognizable root element;
/// absence is a generation failure, not a silent pass-through.
pub struct MarkupSynthesis;

#[async_trait]
impl Stage for MarkupSynthesis {
    fn name(&self) -> &'static str {
        "markup_synthesis"
    }

    async fn run(&self, mut record: GenerationRecord, ctx: &StageContext) -> GenerationRecord {
        let result: Result<String, StageError> = async {
            let plan_json = document_for_prompt(&record.wireframe_plan);
            let vars = StageContext::vars(&[("plan_json", plan_json.as_str())]);
            let prompt = ctx.prompts.render(MARKUP_SYNTHESIS_PROMPT, &vars)?;
            let response = ctx.provider.complete(&prompt, ctx.temperature).await?;
            let svg_code = clean_svg(extract_svg(&response));
            if !has_svg_root(&svg_code) {
                return Err(RecoveryError::EmptyOrInvalidMarkup.into());
            }
            Ok(svg_code)
        }
        .await;

        match result {
            Ok(svg_code) => {
                tracing::debug!(stage = self.name(), bytes = svg_code.len(), "markup generated");
                record.svg_code = Some(svg_code);
            }
            Err(e) => {
                tracing::warn!(stage = self.name(), error = %e, "stage failed");
                record.errors.push(format!("{}: {}", self.name(), e));
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::prompt::InMemoryPromptStore;
    use crate::provider::StubLlmProvider;
    use pretty_assertions::assert_eq;

    struct ProseProvider;

    #[async_trait]
    impl LlmProvider for ProseProvider {
        async fn complete(&self, _prompt: &str, _temperature: f64) -> Result<String, ProviderError> {
            Ok("Happy to help! Let me describe the wireframe in plain words instead.".to_string())
        }
    }

    fn stub_ctx() -> StageContext {
        StageContext::new(
            Arc::new(StubLlmProvider::new()),
            Arc::new(InMemoryPromptStore::new()),
            0.0,
        )
    }

    fn prose_ctx() -> StageContext {
        StageContext::new(
            Arc::new(ProseProvider),
            Arc::new(InMemoryPromptStore::new()),
            0.0,
        )
    }

    #[tokio::test]
    async fn query_expansion_replaces_query_and_keeps_original() {
        let record = GenerationRecord::new("simple login page");
        let record = QueryExpansion.run(record, &stub_ctx()).await;

        assert!(record.is_success());
        assert_eq!(record.original_query.as_deref(), Some("simple login page"));
        assert_ne!(record.user_query, "simple login page");
    }

    #[tokio::test]
    async fn query_expansion_failure_preserves_original_query() {
        let record = GenerationRecord::new("simple login page");
        let record = QueryExpansion.run(record, &prose_ctx()).await;

        assert_eq!(record.user_query, "simple login page");
        assert!(record.original_query.is_none());
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].starts_with("query_expansion:"));
    }

    #[tokio::test]
    async fn requirement_derivation_populates_document() {
        let record = GenerationRecord::new("simple login page");
        let record = RequirementDerivation.run(record, &stub_ctx()).await;

        assert!(record.is_success());
        let requirements = record.detailed_requirements.unwrap();
        assert!(requirements.get("project_type").is_some());
    }

    #[tokio::test]
    async fn plan_synthesis_runs_even_with_absent_requirements() {
        // Upstream field absent: the service is still invoked and the
        // failure surfaces as a normal parse error, not a crash.
        let record = GenerationRecord::new("simple login page");
        let record = PlanSynthesis.run(record, &prose_ctx()).await;

        assert!(record.wireframe_plan.is_none());
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].starts_with("plan_synthesis:"));
    }

    #[tokio::test]
    async fn markup_synthesis_extracts_and_cleans_svg() {
        let mut record = GenerationRecord::new("simple login page");
        record.wireframe_plan = Some(serde_json::json!({"screens": []}));
        let record = MarkupSynthesis.run(record, &stub_ctx()).await;

        assert!(record.is_success());
        let svg = record.svg_code.unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("</svg>"));
    }

    #[tokio::test]
    async fn markup_synthesis_rejects_output_without_root() {
        let mut record = GenerationRecord::new("simple login page");
        record.wireframe_plan = Some(serde_json::json!({"screens": []}));
        let record = MarkupSynthesis.run(record, &prose_ctx()).await;

        assert!(record.svg_code.is_none());
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].contains("no <svg>"));
    }

    #[tokio::test]
    async fn failed_stage_passes_other_fields_through() {
        let mut record = GenerationRecord::new("simple login page");
        record.detailed_requirements = Some(serde_json::json!({"kept": true}));
        let record = PlanSynthesis.run(record, &prose_ctx()).await;

        assert_eq!(
            record.detailed_requirements,
            Some(serde_json::json!({"kept": true}))
        );
    }
}
