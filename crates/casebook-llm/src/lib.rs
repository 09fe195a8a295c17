//! Casebook LLM bridge: grounded prompting, the model gateway, and the
//! pipeline that turns model text into validated store actions.
//!
//! ```text
//! input ──► PromptBuilder ──► Gateway ──► Validator ──► Executor ──► result
//! ```
//!
//! Design constraints:
//! - The model is untrusted: its completions are parsed and validated, never
//!   executed directly.
//! - Prompt text is deterministic, so runs can be cached and replayed.
//! - Gateway failures are transient and retried within a small fixed bound;
//!   validator and store failures are not.
//! - Every rejection keeps its specific kind all the way to the caller.

pub mod gateway;
pub mod grounding;
pub mod ingest;
pub mod pipeline;

pub use gateway::{ConfigError, Gateway, GatewayConfig, GatewayError, LanguageModel, Provider};
pub use grounding::{GroundedPrompt, PromptBuilder, PromptError, HUMAN_END};
pub use ingest::{IngestReport, IngestionLoop, TranscriptOutcome};
pub use pipeline::{Pipeline, PipelineError};
