//! Request-level entry point tying cache and pipeline together.
//!
//! `handle` is the cached path: a synchronous cache consult, the full
//! pipeline on a miss, and a deferred cache write scheduled after the
//! response is already decided. The write happens on a detached task, so a
//! response may be returned before (or without) its cache entry landing;
//! under concurrent identical queries each miss runs the pipeline
//! independently and last-write-wins on the shared entry. Dropped deferred
//! writes are counted and logged, never surfaced to the caller.

use crate::cache::ResponseCache;
use crate::pipeline::Pipeline;
use crate::types::{GenerationRecord, WireframeResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A generation that finished with a non-empty error list. Carries the full
/// record so callers can inspect partial results and the ordered error
/// entries (first entry is the root cause).
#[derive(Debug, Error)]
#[error("wireframe generation failed: {}", record.errors.join("; "))]
pub struct GenerationFailure {
    pub record: GenerationRecord,
}

pub struct WireframeService {
    pipeline: Pipeline,
    cache: Arc<ResponseCache>,
    dropped_cache_writes: Arc<AtomicU64>,
}

impl WireframeService {
    pub fn new(pipeline: Pipeline, cache: Arc<ResponseCache>) -> Self {
        Self {
            pipeline,
            cache,
            dropped_cache_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached generation. On a hit the pipeline is not touched; on a miss
    /// the response is computed, returned, and written back to the cache on
    /// a detached task.
    pub async fn handle(&self, user_query: &str) -> Result<WireframeResponse, GenerationFailure> {
        if let Some(cached) = self.cache.get(user_query) {
            tracing::info!(query = user_query, "serving cached wireframe");
            return Ok(cached);
        }

        let record = self.pipeline.generate(user_query).await;
        let response = match WireframeResponse::from_record(&record) {
            Some(response) => response,
            None => return Err(GenerationFailure { record }),
        };

        if self.cache.is_enabled() {
            let cache = Arc::clone(&self.cache);
            let dropped = Arc::clone(&self.dropped_cache_writes);
            let key = user_query.to_string();
            let value = response.clone();
            // Fire and forget: the caller never waits on the write.
            tokio::spawn(async move {
                if !cache.set(&key, value) {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(key, total, "deferred cache write dropped");
                }
            });
        }

        Ok(response)
    }

    /// Uncached generation: runs the full pipeline and exposes the raw
    /// record, errors and partial fields included.
    pub async fn generate(&self, user_query: &str) -> GenerationRecord {
        self.pipeline.generate(user_query).await
    }

    /// Deferred cache writes that failed to land since construction.
    pub fn dropped_cache_writes(&self) -> u64 {
        self.dropped_cache_writes.load(Ordering::Relaxed)
    }
}
