//! Grounding prompt construction.
//!
//! A grounded prompt pins the model to one registered operation: the store
//! schema first, then the operation's name, signature and docstring, then the
//! natural-language input, closed by the turn sentinel. Same inputs, same
//! bytes — no timestamps, no randomness — so prompts can be cached, replayed,
//! and asserted on in tests.

use casebook_schema::{SchemaError, SchemaRegistry};

/// Marks the end of the human turn so the completion boundary is
/// unambiguous. This is the one bit-exact format at the gateway boundary.
pub const HUMAN_END: &str = "<human_end>";

#[derive(Debug, Clone, thiserror::Error)]
pub enum PromptError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("natural-language input is empty")]
    EmptyInput,
}

/// A fully assembled prompt. Created per request, discarded after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedPrompt {
    operation: String,
    text: String,
}

impl GroundedPrompt {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Assembles grounded prompts from the schema registry.
pub struct PromptBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Build the prompt for `operation` around `input`.
    ///
    /// `input` must be non-empty after trimming; `operation` must resolve via
    /// the registry.
    pub fn build(&self, operation: &str, input: &str) -> Result<GroundedPrompt, PromptError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PromptError::EmptyInput);
        }
        let op = self.registry.describe(operation)?;
        let text = format!(
            "{schema}\nFunction:\n{name}{signature}\n\"\"\"{doc}\"\"\"\n\n\nUser Query:{input}{HUMAN_END}",
            schema = op.schema_text(),
            name = op.name,
            signature = op.signature_text(),
            doc = op.doc,
        );
        Ok(GroundedPrompt {
            operation: op.name.to_string(),
            text,
        })
    }
}
