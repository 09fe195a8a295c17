//! Operation signatures and the schema registry.
//!
//! The registry is the single source of truth for what a model completion is
//! allowed to touch: the two store operations, the table, and the readable
//! columns. `describe` is the only lookup the prompt builder needs.

use crate::{SchemaError, RECORD_FIELDS, TABLE_NAME};

/// Whether an operation reads or writes the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// A declared parameter of a store operation.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    pub ty: &'static str,
}

/// A named structured-store operation the model may target.
///
/// Defined once at registry construction, read-only afterwards.
#[derive(Debug, Clone)]
pub struct OperationSignature {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub doc: &'static str,
    pub kind: OperationKind,
    schema_text: String,
}

impl OperationSignature {
    /// Parameter list rendered as `(records: [Record])`.
    pub fn signature_text(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({params})")
    }

    /// The grounding text describing the data this operation touches.
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }
}

/// Declares the operations and the store shape the model may target.
pub struct SchemaRegistry {
    operations: Vec<OperationSignature>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            operations: vec![
                OperationSignature {
                    name: "insert_records",
                    params: vec![Param {
                        name: "records",
                        ty: "[Record]",
                    }],
                    doc: "Insert a batch of extracted customer-service records into \
                          the store. Every record carries all five fields; pass an \
                          empty string for anything the conversation does not mention. \
                          Returns the number of records stored.",
                    kind: OperationKind::Write,
                    schema_text: record_schema_text(),
                },
                OperationSignature {
                    name: "query_records",
                    params: vec![Param {
                        name: "sql",
                        ty: "str",
                    }],
                    doc: "Run a single read-only SQL SELECT over the \
                          customer_information table and return the matching rows.",
                    kind: OperationKind::Read,
                    schema_text: table_schema_text(),
                },
            ],
        }
    }

    /// Look up an operation's signature, docstring, and schema text.
    pub fn describe(&self, operation: &str) -> Result<&OperationSignature, SchemaError> {
        self.operations
            .iter()
            .find(|op| op.name == operation)
            .ok_or_else(|| SchemaError::UnknownOperation(operation.to_string()))
    }

    /// The single table the read surface exposes.
    pub fn table(&self) -> &'static str {
        TABLE_NAME
    }

    /// Declared record fields, in order.
    pub fn record_fields(&self) -> &'static [&'static str] {
        &RECORD_FIELDS
    }

    /// Whether `name` is a column a read expression may reference.
    pub fn is_readable_column(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("id")
            || RECORD_FIELDS.iter().any(|f| name.eq_ignore_ascii_case(f))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn record_schema_text() -> String {
    let mut text = String::from("Record:\n");
    for field in RECORD_FIELDS {
        text.push_str(&format!("    {field}: str\n"));
    }
    text
}

fn table_schema_text() -> String {
    let columns = RECORD_FIELDS
        .iter()
        .map(|field| format!("    {field} TEXT"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE {TABLE_NAME} (\n    id INTEGER PRIMARY KEY,\n{columns}\n);\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_returns_registered_operations() {
        let registry = SchemaRegistry::new();

        let insert = registry.describe("insert_records").unwrap();
        assert_eq!(insert.kind, OperationKind::Write);
        assert_eq!(insert.signature_text(), "(records: [Record])");
        assert!(insert.schema_text().contains("customer_sentiment: str"));

        let query = registry.describe("query_records").unwrap();
        assert_eq!(query.kind, OperationKind::Read);
        assert!(query.schema_text().contains("CREATE TABLE customer_information"));
    }

    #[test]
    fn describe_rejects_unknown_operation() {
        let registry = SchemaRegistry::new();
        let err = registry.describe("drop_everything").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownOperation(name) if name == "drop_everything"));
    }

    #[test]
    fn readable_columns_cover_id_and_fields() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_readable_column("id"));
        assert!(registry.is_readable_column("agent_name"));
        assert!(registry.is_readable_column("Customer_Sentiment"));
        assert!(!registry.is_readable_column("password"));
    }

    #[test]
    fn schema_text_is_deterministic() {
        let a = SchemaRegistry::new();
        let b = SchemaRegistry::new();
        assert_eq!(
            a.describe("query_records").unwrap().schema_text(),
            b.describe("query_records").unwrap().schema_text()
        );
    }
}
