//! Wireframe generation core.
//!
//! Turns a natural-language product description into SVG wireframe markup by
//! running a fixed four-stage pipeline against a generative text service:
//! query expansion, requirement derivation, plan synthesis, markup synthesis.
//! Model output is treated as untrusted text and passed through a best-effort
//! recovery layer (fence extraction, brace-span fallback, trailing-comma
//! repair) before anything structural is assumed about it.
//!
//! The pipeline never aborts early: each stage appends a prefixed error on
//! failure and the next stage still runs, so a failed generation yields an
//! ordered, cascading error list with the root cause first. Successful
//! responses are cached by raw query string with a fixed TTL; the cache write
//! happens on a detached task after the response is returned.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wireframe::{
//!     InMemoryPromptStore, OpenAILlmProvider, Pipeline, ResponseCache, WireframeConfig,
//!     WireframeService,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WireframeConfig::from_env()?;
//! let provider = Arc::new(OpenAILlmProvider::new(config.llm.clone())?);
//! let pipeline = Pipeline::new(
//!     provider,
//!     Arc::new(InMemoryPromptStore::new()),
//!     config.llm.stage_temperature,
//! );
//! let cache = Arc::new(ResponseCache::new(&config.cache));
//! let service = WireframeService::new(pipeline, cache);
//!
//! let response = service.handle("a simple login page").await?;
//! println!("{}", response.svg_code);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod recovery;
pub mod service;
pub mod stages;
pub mod types;

pub use cache::{Clock, ResponseCache, SystemClock};
pub use config::{CacheConfig, LlmConfig, WireframeConfig};
pub use errors::{ConfigError, ProviderError, RecoveryError, StageError};
pub use pipeline::{Pipeline, PipelineRun, PipelineState};
pub use prompt::{InMemoryPromptStore, PromptManager, PromptStore, PromptTemplate};
pub use provider::{LlmProvider, OpenAILlmProvider, StubLlmProvider};
pub use service::{GenerationFailure, WireframeService};
pub use types::{GenerationRecord, WireframeResponse};
