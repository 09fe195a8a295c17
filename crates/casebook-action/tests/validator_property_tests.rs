//! Property tests for the action validator.
//!
//! The validator sits on the untrusted boundary, so the properties here are
//! about totality and about the record-batch contract: arbitrary text never
//! panics, well-formed batches always validate, and a dropped field is always
//! a schema violation.

use casebook_action::{Action, ValidationError, Validator};
use casebook_schema::{SchemaRegistry, RECORD_FIELDS};
use proptest::prelude::*;

fn field_value() -> impl Strategy<Value = String> {
    // Printable text including empties; quotes and backslashes exercise JSON
    // escaping on the way through serde.
    proptest::string::string_regex("[ -~]{0,24}").expect("valid regex")
}

fn record_object(values: &[String; 5]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (field, value) in RECORD_FIELDS.iter().zip(values.iter()) {
        map.insert(field.to_string(), serde_json::Value::String(value.clone()));
    }
    serde_json::Value::Object(map)
}

proptest! {
    #[test]
    fn arbitrary_text_never_panics(completion in ".{0,200}") {
        let registry = SchemaRegistry::new();
        let _ = Validator::new(&registry).validate(&completion);
    }

    #[test]
    fn complete_record_batches_always_validate(
        batches in proptest::collection::vec(
            [field_value(), field_value(), field_value(), field_value(), field_value()],
            1..5,
        )
    ) {
        let completion = serde_json::Value::Array(
            batches.iter().map(record_object).collect()
        ).to_string();

        let registry = SchemaRegistry::new();
        let action = Validator::new(&registry).validate(&completion);
        prop_assert!(matches!(action, Ok(Action::Insert(_))), "rejected: {:?}", action);
        let Ok(Action::Insert(insert)) = action else {
            unreachable!();
        };
        prop_assert_eq!(insert.len(), batches.len());
        for (record, values) in insert.records().iter().zip(batches.iter()) {
            prop_assert_eq!(record.values(), [
                values[0].as_str(), values[1].as_str(), values[2].as_str(),
                values[3].as_str(), values[4].as_str(),
            ]);
        }
    }

    #[test]
    fn dropping_any_field_is_a_schema_violation(
        values in [field_value(), field_value(), field_value(), field_value(), field_value()],
        dropped in 0usize..5,
    ) {
        let mut object = record_object(&values);
        object
            .as_object_mut()
            .expect("record is an object")
            .remove(RECORD_FIELDS[dropped]);
        let completion = serde_json::Value::Array(vec![object]).to_string();

        let registry = SchemaRegistry::new();
        let err = Validator::new(&registry).validate(&completion);
        prop_assert!(
            matches!(err, Err(ValidationError::SchemaViolation(_))),
            "expected schema violation, got {:?}",
            err
        );
    }
}
