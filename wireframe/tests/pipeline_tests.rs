//! End-to-end tests for the generation pipeline and the cached service path.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use wireframe::{
    CacheConfig, Clock, GenerationRecord, InMemoryPromptStore, LlmProvider, Pipeline,
    PipelineState, ProviderError, ResponseCache, StubLlmProvider, WireframeResponse,
    WireframeService,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn stub_pipeline() -> Pipeline {
    Pipeline::new(
        Arc::new(StubLlmProvider::new()),
        Arc::new(InMemoryPromptStore::new()),
        0.0,
    )
}

#[tokio::test]
async fn full_pipeline_produces_svg_for_a_simple_query() {
    init_tracing();
    let record = stub_pipeline().generate("simple login page").await;

    assert!(record.is_success(), "errors: {:?}", record.errors);
    assert!(record.original_query.is_some());
    assert!(record.detailed_requirements.is_some());
    assert!(record.wireframe_plan.is_some());
    let svg = record.svg_code.expect("markup should be present");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("</svg>"));
}

/// Answers the first stage normally, then degrades into prose. Everything
/// downstream of requirement derivation should fail in order, and every
/// stage should still run.
struct DegradesAfterExpansion;

#[async_trait]
impl LlmProvider for DegradesAfterExpansion {
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        if prompt.contains("interpreting a user's wireframe request") {
            StubLlmProvider::new().complete(prompt, temperature).await
        } else {
            Ok("Let me think about that out loud instead of answering.".to_string())
        }
    }
}

#[tokio::test]
async fn mid_pipeline_failure_cascades_in_stage_order() {
    init_tracing();
    let pipeline = Pipeline::new(
        Arc::new(DegradesAfterExpansion),
        Arc::new(InMemoryPromptStore::new()),
        0.0,
    );
    let run = pipeline.run("simple login page").await;
    let record = run.record;

    assert!(!record.is_success());
    assert_eq!(record.errors.len(), 3);
    assert!(record.errors[0].starts_with("requirement_derivation:"));
    assert!(record.errors[1].starts_with("plan_synthesis:"));
    assert!(record.errors[2].starts_with("markup_synthesis:"));

    // Query expansion succeeded, everything after is absent.
    assert!(record.original_query.is_some());
    assert!(record.detailed_requirements.is_none());
    assert!(record.wireframe_plan.is_none());
    assert!(record.svg_code.is_none());

    // The controller still visited every state.
    assert_eq!(run.transitions.last(), Some(&PipelineState::MarkupSynthesized));
    assert_eq!(run.transitions.len(), 5);
}

/// Provider that panics if called, to prove a request was served from cache.
struct MustNotBeCalled;

#[async_trait]
impl LlmProvider for MustNotBeCalled {
    async fn complete(&self, _prompt: &str, _temperature: f64) -> Result<String, ProviderError> {
        panic!("provider was called for a query that should be cached");
    }
}

struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Mutex::new(SystemTime::UNIX_EPOCH),
        }
    }

    fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}

#[tokio::test]
async fn cached_query_skips_the_pipeline_until_the_entry_expires() {
    init_tracing();
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ResponseCache::with_clock(
        &CacheConfig {
            enabled: true,
            ttl_seconds: 3600,
        },
        Arc::clone(&clock) as _,
    ));

    let cached = WireframeResponse {
        svg_code: "<svg>cached</svg>".to_string(),
        detailed_requirements: None,
        wireframe_plan: None,
    };
    cache.set("simple login page", cached.clone());

    // A hit must not touch the provider at all.
    let guarded = WireframeService::new(
        Pipeline::new(
            Arc::new(MustNotBeCalled),
            Arc::new(InMemoryPromptStore::new()),
            0.0,
        ),
        Arc::clone(&cache),
    );
    let hit = guarded.handle("simple login page").await.unwrap();
    assert_eq!(hit, cached);

    // Past the TTL the entry is gone for good and the pipeline runs again.
    clock.advance(Duration::from_secs(3601));
    assert_eq!(cache.get("simple login page"), None);
    assert_eq!(cache.get("simple login page"), None);

    let regenerating = WireframeService::new(stub_pipeline(), Arc::clone(&cache));
    let fresh = regenerating.handle("simple login page").await.unwrap();
    assert!(fresh.svg_code.starts_with("<svg"));
    assert_ne!(fresh, cached);
}

/// Counts completions to show that concurrent misses each run the pipeline
/// independently rather than queueing behind one another.
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for CountingProvider {
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StubLlmProvider::new().complete(prompt, temperature).await
    }
}

#[tokio::test]
async fn concurrent_misses_all_complete_independently() {
    init_tracing();
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let service = Arc::new(WireframeService::new(
        Pipeline::new(
            Arc::clone(&provider) as _,
            Arc::new(InMemoryPromptStore::new()),
            0.0,
        ),
        Arc::new(ResponseCache::new(&CacheConfig {
            enabled: true,
            ttl_seconds: 3600,
        })),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            async move { service.handle("simple login page").await }
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    for result in &results {
        let response = result.as_ref().expect("all concurrent runs succeed");
        assert!(response.svg_code.contains("<svg"));
    }

    // All eight requests start before any deferred write can land, so each
    // runs all four stages itself.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 8 * 4);
}

#[tokio::test]
async fn failed_generation_reports_partial_record_and_is_not_cached() {
    init_tracing();
    let cache = Arc::new(ResponseCache::new(&CacheConfig {
        enabled: true,
        ttl_seconds: 3600,
    }));
    let service = WireframeService::new(
        Pipeline::new(
            Arc::new(DegradesAfterExpansion),
            Arc::new(InMemoryPromptStore::new()),
            0.0,
        ),
        Arc::clone(&cache),
    );

    let failure = service.handle("simple login page").await.unwrap_err();
    let record: &GenerationRecord = &failure.record;
    assert!(record.original_query.is_some());
    assert!(record.errors[0].starts_with("requirement_derivation:"));

    // Yield so any (incorrect) deferred write would have a chance to land.
    tokio::task::yield_now().await;
    assert!(cache.is_empty());
}
