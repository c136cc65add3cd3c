//! Custom payload fields attached to alert notifications
//!
//! In state every field is a `custom_payload_field` block with either a
//! static `value` or a `dynamic_value` block naming the tag to resolve. On the
//! wire the two shapes are told apart by their `type`.

use tfplug::schema::Block;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, Value};

use crate::api::models::{CustomPayloadField, DynamicFieldValue};
use crate::resourcehandle::MappingError;

pub const CUSTOM_PAYLOAD_FIELD: &str = "custom_payload_field";
pub const DYNAMIC_VALUE: &str = "dynamic_value";

fn dynamic_value_block() -> Block {
    BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("key")
                .optional()
                .description("Key of the tag to resolve, for key value tags")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("tag_name")
                .required()
                .description("Name of the tag whose value is inserted")
                .build(),
        )
        .build()
}

/// `custom_payload_field` list block
pub fn schema_block() -> NestedBlock {
    let field = BlockBuilder::new()
        .description("Custom field added to every notification")
        .attribute(
            AttributeBuilder::string("key")
                .required()
                .description("Key of the payload field")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("value")
                .optional()
                .description("Static value of the payload field")
                .build(),
        )
        .block(NestedBlock::list(DYNAMIC_VALUE, dynamic_value_block()).max_items(1))
        .build();
    NestedBlock::list(CUSTOM_PAYLOAD_FIELD, field)
}

/// Payload fields of `state`; each field needs exactly one of value and dynamic_value
pub fn fields_from_state(state: &Value) -> Result<Vec<CustomPayloadField>, MappingError> {
    state
        .get_blocks(CUSTOM_PAYLOAD_FIELD)
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let path = AttributePath::new(CUSTOM_PAYLOAD_FIELD).index(idx as i64);
            let key = field.get_non_empty_string("key").ok_or_else(|| {
                MappingError::parse(
                    path.clone().attribute("key"),
                    "payload field key must not be empty",
                )
            })?;

            match (field.get_string("value"), field.get_block(DYNAMIC_VALUE)) {
                (Some(value), None) => Ok(CustomPayloadField::Static { key, value }),
                (None, Some(dynamic)) => {
                    let tag_name = dynamic.get_non_empty_string("tag_name").ok_or_else(|| {
                        MappingError::parse(
                            path.clone().attribute(DYNAMIC_VALUE).index(0).attribute("tag_name"),
                            "dynamic payload field requires a tag_name",
                        )
                    })?;
                    Ok(CustomPayloadField::Dynamic {
                        key,
                        value: DynamicFieldValue {
                            key: dynamic.get_non_empty_string("key"),
                            tag_name,
                        },
                    })
                }
                _ => Err(MappingError::parse(
                    path,
                    format!(
                        "payload field '{}' requires exactly one of value or dynamic_value",
                        key
                    ),
                )),
            }
        })
        .collect()
}

/// State rendition of `fields`; no fields is null
pub fn fields_to_state(fields: &[CustomPayloadField]) -> Value {
    if fields.is_empty() {
        return Value::Null;
    }
    Value::List(fields.iter().map(field_to_state).collect())
}

fn field_to_state(field: &CustomPayloadField) -> Value {
    match field {
        CustomPayloadField::Static { key, value } => Value::object([
            ("key", Value::from(key.as_str())),
            ("value", Value::from(value.as_str())),
            (DYNAMIC_VALUE, Value::Null),
        ]),
        CustomPayloadField::Dynamic { key, value } => Value::object([
            ("key", Value::from(key.as_str())),
            ("value", Value::Null),
            (
                DYNAMIC_VALUE,
                Value::List(vec![Value::object([
                    ("key", Value::from(value.key.clone())),
                    ("tag_name", Value::from(value.tag_name.as_str())),
                ])]),
            ),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(fields: Vec<Value>) -> Value {
        Value::object([(CUSTOM_PAYLOAD_FIELD, Value::List(fields))])
    }

    #[test]
    fn static_and_dynamic_fields_map_both_ways() {
        let state = state_with(vec![
            Value::object([
                ("key", Value::from("team")),
                ("value", Value::from("core")),
                (DYNAMIC_VALUE, Value::Null),
            ]),
            Value::object([
                ("key", Value::from("zone")),
                ("value", Value::Null),
                (
                    DYNAMIC_VALUE,
                    Value::List(vec![Value::object([
                        ("key", Value::Null),
                        ("tag_name", Value::from("aws.zone")),
                    ])]),
                ),
            ]),
        ]);

        let fields = fields_from_state(&state).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key(), "team");
        assert!(matches!(
            &fields[1],
            CustomPayloadField::Dynamic { value, .. } if value.tag_name == "aws.zone"
        ));
        assert_eq!(fields_to_state(&fields), state.get(CUSTOM_PAYLOAD_FIELD).clone());
    }

    #[test]
    fn no_fields_is_null() {
        assert!(fields_to_state(&[]).is_null());
        assert!(fields_from_state(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn value_and_dynamic_value_are_exclusive() {
        let state = state_with(vec![Value::object([
            ("key", Value::from("team")),
            ("value", Value::from("core")),
            (
                DYNAMIC_VALUE,
                Value::List(vec![Value::object([("tag_name", Value::from("t"))])]),
            ),
        ])]);

        match fields_from_state(&state) {
            Err(MappingError::ParseError { path, message }) => {
                assert_eq!(path, AttributePath::new(CUSTOM_PAYLOAD_FIELD).index(0));
                assert!(message.contains("team"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
