//! instana_slo_correction_config
//!
//! Correction windows exclude planned downtime from SLO calculations.

use tfplug::defaults::StaticDefault;
use tfplug::validator::{OneOf, StringLength};
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, string_attribute, BlockReader};
use crate::api::models::slo::CorrectionScheduling;
use crate::api::models::SloCorrectionConfig;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_slo_correction_config";

pub const SCHEDULING: &str = "scheduling";

pub const DURATION_UNITS: &[&str] = &[
    "MILLISECOND",
    "SECOND",
    "MINUTE",
    "HOUR",
    "DAY",
    "WEEK",
    "MONTH",
];

fn scheduling_block() -> NestedBlock {
    let block = BlockBuilder::new()
        .description("When the correction applies")
        .attribute(
            AttributeBuilder::int("start_time")
                .required()
                .description("Start of the correction window in epoch milliseconds")
                .build(),
        )
        .attribute(
            AttributeBuilder::int("duration")
                .required()
                .description("Length of the correction window")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("duration_unit")
                .required()
                .validator(OneOf::new(DURATION_UNITS.iter().copied()))
                .description("Unit of the duration")
                .build(),
        )
        .attribute(
            AttributeBuilder::string("recurrent_rule")
                .optional()
                .description("RRULE repeating the window")
                .build(),
        )
        .attribute(
            AttributeBuilder::bool("recurrent")
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .description("Whether the window repeats")
                .build(),
        )
        .build();
    NestedBlock::list(SCHEDULING, block).min_items(1).max_items(1)
}

fn scheduling_from_state(root: &BlockReader) -> Result<CorrectionScheduling, MappingError> {
    let scheduling = root.child(SCHEDULING).ok_or_else(|| {
        MappingError::parse(AttributePath::new(SCHEDULING), "scheduling must be set")
    })?;
    Ok(CorrectionScheduling {
        start_time: scheduling.int("start_time")?,
        duration: scheduling.int("duration")?,
        duration_unit: scheduling.string("duration_unit")?,
        recurrent_rule: scheduling.optional_string("recurrent_rule"),
        recurrent: scheduling.block.get_bool("recurrent").unwrap_or(false),
    })
}

fn scheduling_to_state(scheduling: &CorrectionScheduling) -> Value {
    single_block([
        ("start_time", Value::from(scheduling.start_time)),
        ("duration", Value::from(scheduling.duration)),
        ("duration_unit", Value::from(scheduling.duration_unit.as_str())),
        ("recurrent_rule", Value::from(scheduling.recurrent_rule.clone())),
        ("recurrent", Value::from(scheduling.recurrent)),
    ])
}

#[derive(Default)]
pub struct SloCorrectionConfigResource;

impl ResourceHandle for SloCorrectionConfigResource {
    type Object = SloCorrectionConfig;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Exclude planned windows from SLO calculations")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLength::between(0, 256))
                    .description("Name of the correction")
                    .build(),
            )
            .attribute(string_attribute("description", "Description of the correction"))
            .attribute(
                AttributeBuilder::bool("active")
                    .required()
                    .description("Whether the correction is applied")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("slo_ids")
                    .required()
                    .description("Ids of the corrected SLOs")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_set("tags")
                    .optional()
                    .description("Tags of the correction")
                    .build(),
            )
            .block(scheduling_block())
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<SloCorrectionConfig> {
        client.slo_correction_configs()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<SloCorrectionConfig, MappingError> {
        let root = BlockReader::new(state, AttributePath::root());
        Ok(SloCorrectionConfig {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: required_string(state, "description")?,
            active: state.get_bool("active").unwrap_or(false),
            scheduling: scheduling_from_state(&root)?,
            slo_ids: state.get_string_list("slo_ids"),
            tags: state.get_string_list("tags"),
        })
    }

    fn object_to_state(
        &self,
        _state: &Value,
        config: &SloCorrectionConfig,
    ) -> Result<Value, MappingError> {
        Ok(Value::object([
            ("id", Value::from(config.id.as_str())),
            ("name", Value::from(config.name.as_str())),
            ("description", Value::from(config.description.as_str())),
            ("active", Value::from(config.active)),
            ("slo_ids", Value::string_set_or_null(config.slo_ids.clone())),
            ("tags", Value::string_set_or_null(config.tags.clone())),
            (SCHEDULING, scheduling_to_state(&config.scheduling)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn maintenance_state() -> Value {
        Value::object([
            ("name", Value::from("weekly maintenance")),
            ("description", Value::from("database patching")),
            ("active", Value::from(true)),
            ("slo_ids", Value::string_set(["SLOTFa", "SLOTFb"])),
            ("tags", Value::Null),
            (
                SCHEDULING,
                single_block([
                    ("start_time", Value::from(1_700_000_000_000i64)),
                    ("duration", Value::from(2i64)),
                    ("duration_unit", Value::from("HOUR")),
                    ("recurrent_rule", Value::from("FREQ=WEEKLY;BYDAY=SU")),
                    ("recurrent", Value::from(true)),
                ]),
            ),
        ])
    }

    #[test]
    fn scheduling_is_sent_in_epoch_millis() {
        let config = SloCorrectionConfigResource
            .state_to_object(&maintenance_state(), &Value::Null)
            .unwrap();
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(
            wire["scheduling"],
            json!({
                "startTime": 1_700_000_000_000i64,
                "duration": 2,
                "durationUnit": "HOUR",
                "recurrentRule": "FREQ=WEEKLY;BYDAY=SU",
                "recurrent": true
            })
        );
        assert_eq!(wire["sloIds"], json!(["SLOTFa", "SLOTFb"]));
    }

    #[test]
    fn one_off_windows_read_back_without_a_rule() {
        let mut state = maintenance_state();
        state.set(
            SCHEDULING,
            single_block([
                ("start_time", Value::from(1_700_000_000_000i64)),
                ("duration", Value::from(30i64)),
                ("duration_unit", Value::from("MINUTE")),
                ("recurrent_rule", Value::Null),
                ("recurrent", Value::Null),
            ]),
        );
        let handle = SloCorrectionConfigResource;
        let config = handle.state_to_object(&state, &Value::Null).unwrap();
        assert!(!config.scheduling.recurrent);
        let wire = serde_json::to_value(&config).unwrap();
        assert!(wire["scheduling"].get("recurrentRule").is_none());

        let read = handle.object_to_state(&state, &config).unwrap();
        let scheduling = read.get_block(SCHEDULING).unwrap();
        assert_eq!(scheduling.get_bool("recurrent"), Some(false));
        assert_eq!(scheduling.get("recurrent_rule"), &Value::Null);
        assert_eq!(read.get("tags"), &Value::Null);
    }

    #[test]
    fn missing_scheduling_is_rejected() {
        let mut state = maintenance_state();
        state.set(SCHEDULING, Value::Null);
        match SloCorrectionConfigResource.state_to_object(&state, &Value::Null) {
            Err(MappingError::ParseError { path, .. }) => {
                assert_eq!(path, AttributePath::new(SCHEDULING))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
