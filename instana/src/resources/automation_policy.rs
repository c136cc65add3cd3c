//! instana_automation_policy

use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, string_attribute};
use crate::api::models::automation::{
    ActionConfiguration, Condition, InputParameterValue, PolicyAction, RunConfiguration,
    Runnable, Trigger, TypeConfiguration, TRIGGER_TYPES,
};
use crate::api::models::AutomationPolicy;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_automation_policy";

pub const TRIGGER: &str = "trigger";
pub const TYPE_CONFIGURATION: &str = "type_configuration";
pub const POLICY_TYPES: &[&str] = &["manual", "automatic"];

const RUNNABLE_ACTION: &str = "action";

#[derive(Default)]
pub struct AutomationPolicyResource;

fn trigger_block() -> Block {
    BlockBuilder::new()
        .description("Event or smart alert triggering the policy")
        .attribute(string_attribute("id", "Id of the triggering event or alert"))
        .attribute(
            AttributeBuilder::string("type")
                .required()
                .validator(OneOf::new(TRIGGER_TYPES.iter().copied()))
                .build(),
        )
        .build()
}

fn type_configuration_block() -> Block {
    let condition = BlockBuilder::new()
        .attribute(string_attribute(
            "query",
            "Dynamic focus query selecting the entities the policy runs on",
        ))
        .build();
    let action = BlockBuilder::new()
        .attribute(string_attribute("action_id", "Id of the automation action"))
        .attribute(
            AttributeBuilder::string("agent_id")
                .optional()
                .description("Agent executing the action")
                .build(),
        )
        .attribute(
            AttributeBuilder::string_map("input_parameters")
                .optional()
                .description("Values of the action's input parameters")
                .build(),
        )
        .build();
    BlockBuilder::new()
        .description("Actions to run and whether they run automatically")
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .validator(OneOf::new(POLICY_TYPES.iter().copied()))
                .build(),
        )
        .block(NestedBlock::list("condition", condition).max_items(1))
        .block(NestedBlock::list(RUNNABLE_ACTION, action).min_items(1))
        .build()
}

fn actions_from_state(
    config: &Value,
    path: &AttributePath,
) -> Result<Vec<ActionConfiguration>, MappingError> {
    config
        .get_blocks(RUNNABLE_ACTION)
        .iter()
        .enumerate()
        .map(|(idx, action)| {
            let id = action.get_non_empty_string("action_id").ok_or_else(|| {
                MappingError::parse(
                    path.clone()
                        .attribute(RUNNABLE_ACTION)
                        .index(idx as i64)
                        .attribute("action_id"),
                    "action_id must be set",
                )
            })?;
            Ok(ActionConfiguration {
                action: PolicyAction {
                    id,
                    ..Default::default()
                },
                agent_id: action.get_non_empty_string("agent_id"),
                input_parameter_values: action
                    .get_string_map("input_parameters")
                    .into_iter()
                    .map(|(name, value)| InputParameterValue { name, value })
                    .collect(),
            })
        })
        .collect()
}

fn type_configurations_from_state(state: &Value) -> Result<Vec<TypeConfiguration>, MappingError> {
    state
        .get_blocks(TYPE_CONFIGURATION)
        .iter()
        .enumerate()
        .map(|(idx, config)| {
            let path = AttributePath::new(TYPE_CONFIGURATION).index(idx as i64);
            let name = config.get_non_empty_string("name").ok_or_else(|| {
                MappingError::parse(path.clone().attribute("name"), "name must be set")
            })?;
            Ok(TypeConfiguration {
                name,
                condition: config
                    .get_block("condition")
                    .and_then(|c| c.get_non_empty_string("query"))
                    .map(|query| Condition { query }),
                runnable: Runnable {
                    id: String::new(),
                    runnable_type: RUNNABLE_ACTION.to_string(),
                    run_configuration: RunConfiguration {
                        actions: actions_from_state(config, &path)?,
                    },
                },
            })
        })
        .collect()
}

fn action_to_state(action: &ActionConfiguration) -> Value {
    let input_parameters = if action.input_parameter_values.is_empty() {
        Value::Null
    } else {
        Value::Map(
            action
                .input_parameter_values
                .iter()
                .map(|p| (p.name.clone(), Value::from(p.value.as_str())))
                .collect(),
        )
    };
    Value::object([
        ("action_id", Value::from(action.action.id.as_str())),
        ("agent_id", Value::from(action.agent_id.clone())),
        ("input_parameters", input_parameters),
    ])
}

fn type_configuration_to_state(config: &TypeConfiguration) -> Result<Value, MappingError> {
    if config.runnable.runnable_type != RUNNABLE_ACTION {
        return Err(MappingError::unsupported(
            "policy runnable type",
            config.runnable.runnable_type.as_str(),
        ));
    }
    let condition = match &config.condition {
        Some(condition) => single_block([("query", Value::from(condition.query.as_str()))]),
        None => Value::Null,
    };
    Ok(Value::object([
        ("name", Value::from(config.name.as_str())),
        ("condition", condition),
        (
            RUNNABLE_ACTION,
            Value::List(
                config
                    .runnable
                    .run_configuration
                    .actions
                    .iter()
                    .map(action_to_state)
                    .collect(),
            ),
        ),
    ]))
}

impl ResourceHandle for AutomationPolicyResource {
    type Object = AutomationPolicy;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Policy running automation actions when an event fires")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the policy"))
            .attribute(string_attribute("description", "Description of the policy"))
            .attribute(
                AttributeBuilder::string_list("tags")
                    .optional()
                    .description("Tags of the policy")
                    .build(),
            )
            .block(
                NestedBlock::list(TRIGGER, trigger_block())
                    .min_items(1)
                    .max_items(1),
            )
            .block(NestedBlock::list(TYPE_CONFIGURATION, type_configuration_block()).min_items(1))
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<AutomationPolicy> {
        client.automation_policies()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<AutomationPolicy, MappingError> {
        let trigger = state
            .get_block(TRIGGER)
            .ok_or_else(|| MappingError::missing(TRIGGER))?;
        Ok(AutomationPolicy {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: state.get_string("description").unwrap_or_default(),
            tags: state.get_string_list("tags"),
            trigger: Trigger {
                id: required_string(trigger, "id")?,
                trigger_type: required_string(trigger, "type")?,
            },
            type_configurations: type_configurations_from_state(state)?,
        })
    }

    fn object_to_state(
        &self,
        _state: &Value,
        policy: &AutomationPolicy,
    ) -> Result<Value, MappingError> {
        let type_configurations = policy
            .type_configurations
            .iter()
            .map(type_configuration_to_state)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::object([
            ("id", Value::from(policy.id.as_str())),
            ("name", Value::from(policy.name.as_str())),
            ("description", Value::from(policy.description.as_str())),
            ("tags", Value::string_list_or_null(policy.tags.clone())),
            (
                TRIGGER,
                single_block([
                    ("id", Value::from(policy.trigger.id.as_str())),
                    ("type", Value::from(policy.trigger.trigger_type.as_str())),
                ]),
            ),
            (TYPE_CONFIGURATION, Value::List(type_configurations)),
        ]))
    }
}
