//! instana_alerting_channel
//!
//! One nested block per channel kind; exactly one of them is set. The wire
//! record is flat and tagged with `kind`.

use std::collections::BTreeMap;
use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, string_attribute};
use crate::api::models::{AlertingChannel, ChannelKind};
use crate::api::{Client, RestResource};
use crate::resourcehandle::{
    drop_attributes, required_string, MappingError, ResourceHandle, ResourceMetaData,
    StateUpgrader,
};

pub const RESOURCE_NAME: &str = "instana_alerting_channel";

pub const OPS_GENIE_REGIONS: &[&str] = &["EU", "US"];

#[derive(Default)]
pub struct AlertingChannelResource;

fn kind_block(kind: ChannelKind) -> Block {
    let webhook_url = || {
        AttributeBuilder::string("webhook_url")
            .required()
            .description("The webhook URL notifications are posted to")
            .build()
    };
    let builder = BlockBuilder::new();
    let builder = match kind {
        ChannelKind::Email => builder.attribute(
            AttributeBuilder::string_set("emails")
                .required()
                .description("Recipients of the notification emails")
                .build(),
        ),
        ChannelKind::GoogleChat
        | ChannelKind::Office365
        | ChannelKind::WebexTeamsWebhook => builder.attribute(webhook_url()),
        ChannelKind::OpsGenie => builder
            .attribute(
                AttributeBuilder::string("api_key")
                    .required()
                    .sensitive()
                    .description("OpsGenie API key")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_list("tags")
                    .required()
                    .description("Tags attached to OpsGenie alerts")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .validator(OneOf::new(OPS_GENIE_REGIONS.iter().copied()))
                    .description("OpsGenie region, EU or US")
                    .build(),
            ),
        ChannelKind::PagerDuty => builder.attribute(
            AttributeBuilder::string("service_integration_key")
                .required()
                .sensitive()
                .build(),
        ),
        ChannelKind::Slack => builder
            .attribute(webhook_url())
            .attribute(AttributeBuilder::string("icon_url").optional().build())
            .attribute(AttributeBuilder::string("channel").optional().build()),
        ChannelKind::Splunk => builder
            .attribute(AttributeBuilder::string("url").required().build())
            .attribute(AttributeBuilder::string("token").required().sensitive().build()),
        ChannelKind::VictorOps => builder
            .attribute(
                AttributeBuilder::string("api_key")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(AttributeBuilder::string("routing_key").required().build()),
        ChannelKind::Webhook => builder
            .attribute(
                AttributeBuilder::string_set("webhook_urls")
                    .required()
                    .description("URLs the notification is posted to")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_map("http_headers")
                    .optional()
                    .description("Headers sent with every request")
                    .build(),
            ),
        ChannelKind::ServiceNow => builder
            .attribute(AttributeBuilder::string("service_now_url").required().build())
            .attribute(AttributeBuilder::string("username").required().build())
            .attribute(
                AttributeBuilder::string("password")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(AttributeBuilder::bool("auto_close_incidents").optional().build()),
        ChannelKind::PrometheusWebhook => builder
            .attribute(webhook_url())
            .attribute(AttributeBuilder::string("receiver").optional().build()),
        ChannelKind::WatsonAiopsWebhook => builder.attribute(webhook_url()).attribute(
            AttributeBuilder::string_list("http_headers")
                .optional()
                .description("Headers in the form 'Key: Value'")
                .build(),
        ),
    };
    builder
        .description(&format!("Settings of a {} channel", kind.wire_name()))
        .build()
}

/// Wire form of the OpsGenie tag list
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Webhook headers as sent to the Platform, `Key: Value`
pub fn headers_to_wire(headers: &BTreeMap<String, String>) -> Vec<String> {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect()
}

/// A header without `:` maps to an empty value
pub fn headers_from_wire(headers: &[String]) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|header| match header.split_once(':') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (header.trim().to_string(), String::new()),
        })
        .collect()
}

/// Tag lists holding the same tags in any order
fn same_tags(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

fn string_map(map: BTreeMap<String, String>) -> Value {
    if map.is_empty() {
        return Value::Null;
    }
    Value::Map(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

fn block_required(block: &Value, kind: ChannelKind, name: &str) -> Result<String, MappingError> {
    block
        .get_non_empty_string(name)
        .ok_or_else(|| MappingError::missing(format!("{}.{}", kind.block_name(), name)))
}

impl AlertingChannelResource {
    fn configured_kind(state: &Value) -> Result<(ChannelKind, &Value), MappingError> {
        ChannelKind::ALL
            .into_iter()
            .find_map(|kind| state.get_block(kind.block_name()).map(|b| (kind, b)))
            .ok_or_else(|| MappingError::missing("one of the channel blocks"))
    }

    /// `prior` is the stored block of the same kind, if any
    fn fill_from_block(
        channel: &mut AlertingChannel,
        kind: ChannelKind,
        block: &Value,
        prior: Option<&Value>,
    ) -> Result<(), MappingError> {
        match kind {
            ChannelKind::Email => channel.emails = block.get_string_list("emails"),
            ChannelKind::GoogleChat
            | ChannelKind::Office365
            | ChannelKind::WebexTeamsWebhook => {
                channel.webhook_url = Some(block_required(block, kind, "webhook_url")?);
            }
            ChannelKind::OpsGenie => {
                channel.api_key = Some(block_required(block, kind, "api_key")?);
                channel.tags = Some(join_tags(&block.get_string_list("tags")));
                channel.region = Some(block_required(block, kind, "region")?);
            }
            ChannelKind::PagerDuty => {
                channel.service_integration_key =
                    Some(block_required(block, kind, "service_integration_key")?);
            }
            ChannelKind::Slack => {
                channel.webhook_url = Some(block_required(block, kind, "webhook_url")?);
                channel.icon_url = block.get_non_empty_string("icon_url");
                channel.channel = block.get_non_empty_string("channel");
            }
            ChannelKind::Splunk => {
                channel.url = Some(block_required(block, kind, "url")?);
                channel.token = Some(block_required(block, kind, "token")?);
            }
            ChannelKind::VictorOps => {
                channel.api_key = Some(block_required(block, kind, "api_key")?);
                channel.routing_key = Some(block_required(block, kind, "routing_key")?);
            }
            ChannelKind::Webhook => {
                channel.webhook_urls = block.get_string_list("webhook_urls");
                channel.headers = headers_to_wire(&block.get_string_map("http_headers"));
            }
            ChannelKind::ServiceNow => {
                channel.service_now_url = Some(block_required(block, kind, "service_now_url")?);
                channel.username = Some(block_required(block, kind, "username")?);
                // the Platform never echoes the password; updates resend the stored one
                channel.password = block
                    .get_non_empty_string("password")
                    .or_else(|| prior.and_then(|p| p.get_non_empty_string("password")));
                channel.auto_close_incidents = block.get_bool("auto_close_incidents");
            }
            ChannelKind::PrometheusWebhook => {
                channel.webhook_url = Some(block_required(block, kind, "webhook_url")?);
                channel.receiver = block.get_non_empty_string("receiver");
            }
            ChannelKind::WatsonAiopsWebhook => {
                channel.webhook_url = Some(block_required(block, kind, "webhook_url")?);
                channel.headers = block.get_string_list("http_headers");
            }
        }
        Ok(())
    }

    /// State block of `kind`; `prior` is the block the object was built from
    fn block_from_channel(
        kind: ChannelKind,
        channel: &AlertingChannel,
        prior: Option<&Value>,
    ) -> Value {
        let s = |v: &Option<String>| Value::from(v.clone());
        match kind {
            ChannelKind::Email => {
                single_block([("emails", Value::string_set(channel.emails.clone()))])
            }
            ChannelKind::GoogleChat
            | ChannelKind::Office365
            | ChannelKind::WebexTeamsWebhook => {
                single_block([("webhook_url", s(&channel.webhook_url))])
            }
            ChannelKind::OpsGenie => {
                let echoed = split_tags(channel.tags.as_deref().unwrap_or_default());
                let tags = match prior.map(|b| b.get_string_list("tags")) {
                    Some(stored) if same_tags(&stored, &echoed) => stored,
                    _ => echoed,
                };
                single_block([
                    ("api_key", s(&channel.api_key)),
                    ("tags", Value::string_list(tags)),
                    ("region", s(&channel.region)),
                ])
            }
            ChannelKind::PagerDuty => {
                single_block([("service_integration_key", s(&channel.service_integration_key))])
            }
            ChannelKind::Slack => single_block([
                ("webhook_url", s(&channel.webhook_url)),
                ("icon_url", s(&channel.icon_url)),
                ("channel", s(&channel.channel)),
            ]),
            ChannelKind::Splunk => {
                single_block([("url", s(&channel.url)), ("token", s(&channel.token))])
            }
            ChannelKind::VictorOps => single_block([
                ("api_key", s(&channel.api_key)),
                ("routing_key", s(&channel.routing_key)),
            ]),
            ChannelKind::Webhook => single_block([
                ("webhook_urls", Value::string_set(channel.webhook_urls.clone())),
                ("http_headers", string_map(headers_from_wire(&channel.headers))),
            ]),
            ChannelKind::ServiceNow => {
                // the Platform never echoes the password
                let password = match &channel.password {
                    Some(password) => Value::from(password.as_str()),
                    None => prior.map(|b| b.get("password").clone()).unwrap_or_default(),
                };
                single_block([
                    ("service_now_url", s(&channel.service_now_url)),
                    ("username", s(&channel.username)),
                    ("password", password),
                    ("auto_close_incidents", Value::from(channel.auto_close_incidents)),
                ])
            }
            ChannelKind::PrometheusWebhook => single_block([
                ("webhook_url", s(&channel.webhook_url)),
                ("receiver", s(&channel.receiver)),
            ]),
            ChannelKind::WatsonAiopsWebhook => single_block([
                ("webhook_url", s(&channel.webhook_url)),
                ("http_headers", Value::string_list_or_null(channel.headers.clone())),
            ]),
        }
    }
}

impl ResourceHandle for AlertingChannelResource {
    type Object = AlertingChannel;

    fn metadata(&self) -> ResourceMetaData {
        let block_names: Vec<&str> = ChannelKind::ALL.iter().map(|k| k.block_name()).collect();
        let mut schema = SchemaBuilder::new()
            .version(1)
            .description("Alerting channel notifying about events and alerts")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the alerting channel"));
        for kind in ChannelKind::ALL {
            schema = schema
                .block(NestedBlock::list(kind.block_name(), kind_block(kind)).max_items(1));
        }
        ResourceMetaData::new(RESOURCE_NAME, schema.exactly_one_of(&block_names).build())
    }

    fn rest_resource(&self, client: &Client) -> RestResource<AlertingChannel> {
        client.alerting_channels()
    }

    fn state_to_object(
        &self,
        state: &Value,
        prior: &Value,
    ) -> Result<AlertingChannel, MappingError> {
        let (kind, block) = Self::configured_kind(state)?;
        let mut channel = AlertingChannel {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            kind: kind.wire_name().to_string(),
            ..Default::default()
        };
        Self::fill_from_block(&mut channel, kind, block, prior.get_block(kind.block_name()))?;
        Ok(channel)
    }

    fn object_to_state(
        &self,
        state: &Value,
        channel: &AlertingChannel,
    ) -> Result<Value, MappingError> {
        let kind = ChannelKind::from_wire_name(&channel.kind).ok_or_else(|| {
            MappingError::unsupported("alerting channel kind", channel.kind.as_str())
        })?;

        let mut new_state = Value::object([
            ("id", Value::from(channel.id.as_str())),
            ("name", Value::from(channel.name.as_str())),
        ]);
        for other in ChannelKind::ALL {
            new_state.set(other.block_name(), Value::Null);
        }
        let prior = state.get_block(kind.block_name());
        new_state.set(kind.block_name(), Self::block_from_channel(kind, channel, prior));
        Ok(new_state)
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader::new(0, |state| Ok(drop_attributes(state, &["full_name"])))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_state() -> Value {
        Value::object([
            ("id", Value::from("c1")),
            ("name", Value::from("ops")),
            ("email", single_block([("emails", Value::string_set(["a@x", "b@x"]))])),
        ])
    }

    #[test]
    fn email_channel_maps_to_flat_record() {
        let channel = AlertingChannelResource
            .state_to_object(&email_state(), &Value::Null)
            .unwrap();
        assert_eq!(channel.kind, "EMAIL");
        assert_eq!(channel.emails, vec!["a@x".to_string(), "b@x".to_string()]);
        assert!(channel.webhook_url.is_none());
    }

    #[test]
    fn only_the_returned_kind_block_is_populated() {
        let channel = AlertingChannel {
            id: "c1".to_string(),
            name: "ops".to_string(),
            kind: "EMAIL".to_string(),
            emails: vec!["a@x".to_string(), "b@x".to_string()],
            ..Default::default()
        };
        let state = AlertingChannelResource
            .object_to_state(&Value::Null, &channel)
            .unwrap();

        assert_eq!(state.get_string("id").as_deref(), Some("c1"));
        for kind in ChannelKind::ALL {
            let block = state.get_block(kind.block_name());
            assert_eq!(block.is_some(), kind == ChannelKind::Email, "{:?}", kind);
        }
        assert_eq!(
            state.get_block("email").unwrap().get("emails"),
            &Value::string_set(["b@x", "a@x"])
        );
    }

    #[test]
    fn ops_genie_tags_round_trip_through_csv() {
        let state = Value::object([
            ("name", Value::from("genie")),
            (
                "ops_genie",
                single_block([
                    ("api_key", Value::from("key")),
                    ("tags", Value::string_list(["prod", "db"])),
                    ("region", Value::from("EU")),
                ]),
            ),
        ]);
        let channel = AlertingChannelResource.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(channel.tags.as_deref(), Some("prod,db"));

        let back = AlertingChannelResource.object_to_state(&state, &channel).unwrap();
        assert_eq!(
            back.get_block("ops_genie").unwrap().get("tags"),
            &Value::string_list(["prod", "db"])
        );
        assert_eq!(split_tags(" a , b,,c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn webhook_headers_map_to_key_value_lines() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer x".to_string());
        headers.insert("X-Trace".to_string(), "42".to_string());

        let wire = headers_to_wire(&headers);
        assert!(wire.contains(&"Authorization: Bearer x".to_string()));
        assert!(wire.contains(&"X-Trace: 42".to_string()));

        let parsed = headers_from_wire(&["Key:  val  ".to_string(), "Bare".to_string()]);
        assert_eq!(parsed.get("Key").map(String::as_str), Some("val"));
        assert_eq!(parsed.get("Bare").map(String::as_str), Some(""));
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let channel = AlertingChannel {
            id: "c9".to_string(),
            name: "x".to_string(),
            kind: "CARRIER_PIGEON".to_string(),
            ..Default::default()
        };
        let err = AlertingChannelResource
            .object_to_state(&Value::Null, &channel)
            .unwrap_err();
        assert!(err.to_string().contains("CARRIER_PIGEON"));
    }

    #[test]
    fn service_now_password_is_kept_from_state() {
        let state = Value::object([
            ("name", Value::from("snow")),
            (
                "service_now",
                single_block([
                    ("service_now_url", Value::from("https://snow")),
                    ("username", Value::from("bot")),
                    ("password", Value::from("secret")),
                    ("auto_close_incidents", Value::Bool(true)),
                ]),
            ),
        ]);
        let mut channel = AlertingChannelResource.state_to_object(&state, &Value::Null).unwrap();
        channel.password = None;

        let back = AlertingChannelResource.object_to_state(&state, &channel).unwrap();
        assert_eq!(
            back.get_block("service_now").unwrap().get_string("password").as_deref(),
            Some("secret")
        );
    }

    fn ops_genie_state(tags: &[&str]) -> Value {
        Value::object([
            ("id", Value::from("c2")),
            ("name", Value::from("genie")),
            (
                "ops_genie",
                single_block([
                    ("api_key", Value::from("key")),
                    ("tags", Value::string_list(tags.iter().copied())),
                    ("region", Value::from("EU")),
                ]),
            ),
        ])
    }

    #[test]
    fn reordered_ops_genie_tags_keep_the_stored_order() {
        let stored = ops_genie_state(&["prod", "db", "eu"]);
        let mut echoed = AlertingChannelResource
            .state_to_object(&stored, &Value::Null)
            .unwrap();
        echoed.tags = Some("eu,prod,db".to_string());

        let read = AlertingChannelResource.object_to_state(&stored, &echoed).unwrap();
        assert_eq!(read.get("ops_genie"), stored.get("ops_genie"));

        echoed.tags = Some("eu,prod".to_string());
        let read = AlertingChannelResource.object_to_state(&stored, &echoed).unwrap();
        assert_eq!(
            read.get_block("ops_genie").unwrap().get("tags"),
            &Value::string_list(["eu", "prod"])
        );
    }

    #[test]
    fn service_now_update_resends_the_stored_password() {
        let block = |password: Value| {
            Value::object([
                ("name", Value::from("snow")),
                (
                    "service_now",
                    single_block([
                        ("service_now_url", Value::from("https://snow")),
                        ("username", Value::from("bot")),
                        ("password", password),
                    ]),
                ),
            ])
        };
        let prior = block(Value::from("secret"));
        let channel = AlertingChannelResource
            .state_to_object(&block(Value::Null), &prior)
            .unwrap();
        assert_eq!(channel.password.as_deref(), Some("secret"));

        let channel = AlertingChannelResource
            .state_to_object(&block(Value::from("rotated")), &prior)
            .unwrap();
        assert_eq!(channel.password.as_deref(), Some("rotated"));
    }

    #[test]
    fn version_zero_state_drops_full_name() {
        let upgrader = AlertingChannelResource.state_upgraders()[0];
        let upgraded = (upgrader.upgrade)(Value::object([
            ("name", Value::from("ops")),
            ("full_name", Value::from("prefix ops")),
        ]))
        .unwrap();
        assert!(upgraded.get("full_name").is_null());
        assert_eq!(upgraded.get_string("name").as_deref(), Some("ops"));
    }
}
