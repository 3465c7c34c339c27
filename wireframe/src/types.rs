//! Core data types threaded through the generation pipeline.

use serde::{Deserialize, Serialize};

/// The single mutable-by-replacement value threaded through the four pipeline
/// stages. One record is created per generation request, flows through
/// exactly four stage invocations, and is never discarded on partial failure:
/// each stage receives whatever the previous stage produced, possibly with
/// absent fields, and cascading error entries are expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Rewritten in place by query expansion.
    pub user_query: String,
    /// Set once by query expansion, never overwritten.
    pub original_query: Option<String>,
    /// Set by requirement derivation, consumed by plan synthesis.
    pub detailed_requirements: Option<serde_json::Value>,
    /// Set by plan synthesis, consumed by markup synthesis.
    pub wireframe_plan: Option<serde_json::Value>,
    /// Final rendered-diagram text, set by markup synthesis.
    pub svg_code: Option<String>,
    /// Append-only; one entry per stage failure, each prefixed with the
    /// originating stage's name. Ordered: the first entry is the root cause.
    pub errors: Vec<String>,
}

impl GenerationRecord {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            original_query: None,
            detailed_requirements: None,
            wireframe_plan: None,
            svg_code: None,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The value returned to the caller and stored in the response cache after a
/// fully successful generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireframeResponse {
    pub svg_code: String,
    pub detailed_requirements: Option<serde_json::Value>,
    pub wireframe_plan: Option<serde_json::Value>,
}

impl WireframeResponse {
    /// Build a response from a record with an empty error list. Returns
    /// `None` if the record failed or produced no markup.
    pub fn from_record(record: &GenerationRecord) -> Option<Self> {
        if !record.is_success() {
            return None;
        }
        record.svg_code.as_ref().map(|svg| Self {
            svg_code: svg.clone(),
            detailed_requirements: record.detailed_requirements.clone(),
            wireframe_plan: record.wireframe_plan.clone(),
        })
    }
}
