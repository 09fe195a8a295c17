//! The request pipeline: ground, complete, validate, execute.
//!
//! One pipeline run per request; runs share nothing mutable except the store,
//! which serializes its own writes. A request abandoned at the gateway call
//! leaves no trace — no `Action` exists before full validation.

use casebook_action::Validator;
use casebook_schema::SchemaRegistry;
use casebook_store::{Executor, FactStore, QueryRows, StoreError};
use std::sync::Arc;

use crate::gateway::{Gateway, GatewayError};
use crate::grounding::{PromptBuilder, PromptError};

/// Everything that can go wrong between a natural-language input and a store
/// result. Each variant keeps its specific kind so the presentation surface
/// can say *why* a request was refused, not just that it failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Validation(#[from] casebook_action::ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Pipeline {
    registry: Arc<SchemaRegistry>,
    gateway: Gateway,
    store: Arc<FactStore>,
}

impl Pipeline {
    pub fn new(registry: Arc<SchemaRegistry>, gateway: Gateway, store: Arc<FactStore>) -> Self {
        Self {
            registry,
            gateway,
            store,
        }
    }

    /// Answer a natural-language question with rows from the store.
    pub async fn ask(&self, question: &str) -> Result<QueryRows, PipelineError> {
        let prompt = PromptBuilder::new(&self.registry).build("query_records", question)?;
        let completion = self.gateway.complete(prompt.text()).await?;
        tracing::debug!(operation = prompt.operation(), bytes = completion.len(), "completion received");
        let query = Validator::new(&self.registry).validate_query(&completion)?;
        let rows = Executor::new(&self.store).query(&query)?;
        tracing::info!(rows = rows.len(), "question answered");
        Ok(rows)
    }

    /// Compile one raw transcript into stored records; returns the count.
    pub async fn extract(&self, transcript: &str) -> Result<usize, PipelineError> {
        let prompt = PromptBuilder::new(&self.registry).build("insert_records", transcript)?;
        let completion = self.gateway.complete(prompt.text()).await?;
        tracing::debug!(operation = prompt.operation(), bytes = completion.len(), "completion received");
        let batch = Validator::new(&self.registry).validate_mutation(&completion)?;
        let stored = Executor::new(&self.store).insert(&batch)?;
        tracing::info!(records = stored, "transcript extracted");
        Ok(stored)
    }
}
