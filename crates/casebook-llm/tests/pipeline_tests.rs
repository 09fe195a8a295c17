//! Pipeline tests against a deterministic stub model.
//!
//! The model dependency is a capability interface, so these tests swap in a
//! scripted stub and verify the contract the pipeline makes: completions are
//! validated before anything executes, rejections keep their kind, and one
//! bad transcript never takes down an ingestion batch.

use async_trait::async_trait;
use std::sync::Arc;

use casebook_action::ValidationError;
use casebook_ingest::MemorySource;
use casebook_llm::{
    Gateway, GatewayError, IngestionLoop, LanguageModel, Pipeline, PipelineError,
};
use casebook_schema::{Record, SchemaRegistry};
use casebook_store::FactStore;

/// Scripted model: answers by matching substrings of the prompt, in order.
struct ScriptedModel {
    rules: Vec<(&'static str, String)>,
    fallback: String,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        for (needle, completion) in &self.rules {
            if prompt.contains(needle) {
                return Ok(completion.clone());
            }
        }
        Ok(self.fallback.clone())
    }
}

const RECORD_COMPLETION: &str = r#"[{
    "agent_name": "Dana",
    "customer_email": "kit@example.com",
    "customer_order": "A-1009",
    "customer_phone": "555-0186",
    "customer_sentiment": "frustrated"
}]"#;

fn pipeline_with(model: ScriptedModel) -> (Pipeline, Arc<FactStore>) {
    let store = Arc::new(FactStore::open_in_memory().unwrap());
    let pipeline = Pipeline::new(
        Arc::new(SchemaRegistry::new()),
        Gateway::new(Arc::new(model)),
        Arc::clone(&store),
    );
    (pipeline, store)
}

fn stored_count(store: &FactStore) -> usize {
    store
        .query("SELECT COUNT(*) FROM customer_information")
        .unwrap()
        .rows[0][0]
        .parse()
        .unwrap()
}

#[tokio::test]
async fn ask_compiles_a_question_into_rows() {
    let (pipeline, store) = pipeline_with(ScriptedModel {
        rules: vec![(
            "query_records",
            "SELECT agent_name, customer_phone FROM customer_information \
             WHERE customer_sentiment = 'frustrated'"
                .to_string(),
        )],
        fallback: String::new(),
    });
    store
        .insert(&[Record {
            agent_name: "Dana".to_string(),
            customer_email: "kit@example.com".to_string(),
            customer_order: "A-1009".to_string(),
            customer_phone: "555-0186".to_string(),
            customer_sentiment: "frustrated".to_string(),
        }])
        .unwrap();

    let rows = pipeline
        .ask("who are the frustrated customers and their numbers?")
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["agent_name", "customer_phone"]);
    assert_eq!(
        rows.rows,
        vec![vec!["Dana".to_string(), "555-0186".to_string()]]
    );
}

#[tokio::test]
async fn extract_stores_a_validated_record_batch() {
    let (pipeline, store) = pipeline_with(ScriptedModel {
        rules: vec![("insert_records", RECORD_COMPLETION.to_string())],
        fallback: String::new(),
    });

    let stored = pipeline
        .extract("Agent: sorry for the delay\nCustomer: this is ridiculous")
        .await
        .unwrap();
    assert_eq!(stored, 1);
    assert_eq!(stored_count(&store), 1);
}

#[tokio::test]
async fn malformed_completion_is_rejected_without_side_effects() {
    let (pipeline, store) = pipeline_with(ScriptedModel {
        rules: vec![],
        fallback: "I'm sorry, I couldn't find any structured data here.".to_string(),
    });

    let err = pipeline.extract("Customer: hello?").await.unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Validation(ValidationError::MalformedAction(_))
        ),
        "{err}"
    );
    assert_eq!(stored_count(&store), 0);
}

#[tokio::test]
async fn unsafe_completion_is_rejected_without_side_effects() {
    let (pipeline, store) = pipeline_with(ScriptedModel {
        rules: vec![],
        fallback: "DROP TABLE customer_information".to_string(),
    });

    let err = pipeline.ask("delete everything").await.unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Validation(ValidationError::UnsafeAction(_))
        ),
        "{err}"
    );
    // The table is untouched and still queryable.
    assert_eq!(stored_count(&store), 0);
}

#[tokio::test]
async fn empty_input_never_reaches_the_gateway() {
    let (pipeline, _store) = pipeline_with(ScriptedModel {
        rules: vec![],
        fallback: RECORD_COMPLETION.to_string(),
    });
    let err = pipeline.ask("   ").await.unwrap_err();
    assert!(matches!(err, PipelineError::Prompt(_)), "{err}");
}

#[tokio::test]
async fn ingestion_batch_isolates_one_bad_transcript() {
    let (pipeline, store) = pipeline_with(ScriptedModel {
        // The transcript text is embedded in the prompt, so the marker in
        // transcript #4 steers the stub into returning junk for it.
        rules: vec![("GARBLED", "no structured records found".to_string())],
        fallback: RECORD_COMPLETION.to_string(),
    });

    let transcripts: Vec<String> = (0..10)
        .map(|i| {
            if i == 3 {
                "GARBLED \u{fffd}\u{fffd} audio dropout".to_string()
            } else {
                format!("Agent: case {i} resolved\nCustomer: thank you")
            }
        })
        .collect();
    let mut source = MemorySource::new(transcripts);

    let report = IngestionLoop::new(&pipeline)
        .with_batch_size(10)
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(report.stored_transcripts(), 9);
    assert_eq!(report.stored_records(), 9);
    let failures: Vec<usize> = report.failures().map(|(index, _)| index).collect();
    assert_eq!(failures, vec![3]);
    let (_, error) = report.failures().next().unwrap();
    assert!(
        matches!(
            error,
            PipelineError::Validation(ValidationError::MalformedAction(_))
        ),
        "{error}"
    );
    assert_eq!(stored_count(&store), 9);
}
