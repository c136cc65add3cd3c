//! instana_automation_action
//!
//! State holds either a `script` or an `http` block. On the wire both are a
//! flat list of named fields carrying their own encoding; the script body
//! travels base64 encoded, headers and authentication as JSON documents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use std::collections::BTreeMap;
use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, string_attribute};
use crate::api::models::automation::{
    ActionField, ActionInputParameter, ACTION_TYPE_HTTP, ACTION_TYPE_SCRIPT, ENCODING_BASE64,
};
use crate::api::models::AutomationAction;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_automation_action";

pub const SCRIPT: &str = "script";
pub const HTTP: &str = "http";
pub const INPUT_PARAMETER: &str = "input_parameter";

pub const FIELD_SCRIPT: &str = "script_ssh";
pub const FIELD_SUBTYPE: &str = "subtype";
pub const FIELD_TIMEOUT: &str = "timeout";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_HOST: &str = "host";
pub const FIELD_METHOD: &str = "method";
pub const FIELD_BODY: &str = "body";
pub const FIELD_HEADERS: &str = "headers";
pub const FIELD_IGNORE_CERT_ERRORS: &str = "ignoreCertErrors";
pub const FIELD_LANGUAGE: &str = "language";
pub const FIELD_CONTENT_TYPE: &str = "content_type";
pub const FIELD_AUTH: &str = "authen";

pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
pub const PARAMETER_TYPES: &[&str] = &["static", "dynamic", "vault"];
pub const API_KEY_LOCATIONS: &[&str] = &["header", "query"];

#[derive(Default)]
pub struct AutomationActionResource;

fn optional_string(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::string(name)
        .optional()
        .description(description)
        .build()
}

fn script_block() -> Block {
    BlockBuilder::new()
        .description("Script executed by the agent")
        .attribute(string_attribute("content", "The script content"))
        .attribute(optional_string("interpreter", "Interpreter running the script"))
        .attribute(optional_string("timeout", "Execution timeout in seconds"))
        .attribute(optional_string("source", "Source of the script"))
        .build()
}

fn auth_block() -> Block {
    let basic_auth = BlockBuilder::new()
        .attribute(string_attribute("username", "User name for basic authentication"))
        .attribute(
            AttributeBuilder::string("password")
                .required()
                .sensitive()
                .build(),
        )
        .build();
    let token = BlockBuilder::new()
        .attribute(
            AttributeBuilder::string("bearer_token")
                .required()
                .sensitive()
                .build(),
        )
        .build();
    let api_key = BlockBuilder::new()
        .attribute(string_attribute("key", "Name of the API key"))
        .attribute(AttributeBuilder::string("value").required().sensitive().build())
        .attribute(
            AttributeBuilder::string("key_location")
                .required()
                .validator(OneOf::new(API_KEY_LOCATIONS.iter().copied()))
                .build(),
        )
        .build();
    BlockBuilder::new()
        .description("Authentication of the HTTP request")
        .block(NestedBlock::list("basic_auth", basic_auth).max_items(1))
        .block(NestedBlock::list("token", token).max_items(1))
        .block(NestedBlock::list("api_key", api_key).max_items(1))
        .build()
}

fn http_block() -> Block {
    BlockBuilder::new()
        .description("HTTP request sent by the agent")
        .attribute(string_attribute("host", "URL of the request"))
        .attribute(
            AttributeBuilder::string("method")
                .required()
                .validator(OneOf::new(HTTP_METHODS.iter().copied()))
                .build(),
        )
        .attribute(optional_string("body", "Body of the request"))
        .attribute(
            AttributeBuilder::string_map("headers")
                .optional()
                .description("Headers of the request")
                .build(),
        )
        .attribute(AttributeBuilder::bool("ignore_certificate_errors").optional().build())
        .attribute(optional_string("timeout", "Request timeout in seconds"))
        .attribute(optional_string("language", "Language of the request body"))
        .attribute(optional_string("content_type", "Content type of the request body"))
        .block(NestedBlock::list("auth", auth_block()).max_items(1))
        .build()
}

fn input_parameter_block() -> Block {
    BlockBuilder::new()
        .description("Parameter supplied when the action runs")
        .attribute(string_attribute("name", "Name of the parameter"))
        .attribute(optional_string("label", "Label of the parameter"))
        .attribute(optional_string("description", "Description of the parameter"))
        .attribute(
            AttributeBuilder::string("type")
                .required()
                .validator(OneOf::new(PARAMETER_TYPES.iter().copied()))
                .build(),
        )
        .attribute(AttributeBuilder::bool("required").optional().build())
        .attribute(AttributeBuilder::bool("hidden").optional().build())
        .attribute(AttributeBuilder::bool("secured").optional().build())
        .attribute(optional_string("value", "Default value of the parameter"))
        .build()
}

fn ascii(name: &str, description: &str, value: Option<String>) -> Option<ActionField> {
    value.map(|v| ActionField::ascii(name, description, v))
}

fn script_fields(block: &Value) -> Result<Vec<ActionField>, MappingError> {
    let content = block.get_string("content").ok_or_else(|| {
        MappingError::parse(
            AttributePath::new(SCRIPT).index(0).attribute("content"),
            "script content must be set",
        )
    })?;
    let mut fields = vec![ActionField {
        name: FIELD_SCRIPT.to_string(),
        description: Some("script".to_string()),
        encoding: ENCODING_BASE64.to_string(),
        value: STANDARD.encode(content.as_bytes()),
        secured: false,
    }];
    fields.extend(
        [
            ascii(FIELD_SUBTYPE, "script type", block.get_non_empty_string("interpreter")),
            ascii(FIELD_TIMEOUT, "timeout", block.get_non_empty_string("timeout")),
            ascii(FIELD_SOURCE, "source of the script", block.get_non_empty_string("source")),
        ]
        .into_iter()
        .flatten(),
    );
    Ok(fields)
}

/// JSON document of the `authen` field
pub fn auth_to_wire(auth: Option<&Value>) -> String {
    let document = match auth {
        Some(auth) => {
            if let Some(basic) = auth.get_block("basic_auth") {
                json!({
                    "type": "basicAuth",
                    "username": basic.get_string("username").unwrap_or_default(),
                    "password": basic.get_string("password").unwrap_or_default(),
                })
            } else if let Some(token) = auth.get_block("token") {
                json!({
                    "type": "bearerToken",
                    "bearerToken": token.get_string("bearer_token").unwrap_or_default(),
                })
            } else if let Some(key) = auth.get_block("api_key") {
                json!({
                    "type": "apiKey",
                    "apiKey": key.get_string("key").unwrap_or_default(),
                    "apiKeyValue": key.get_string("value").unwrap_or_default(),
                    "apiKeyAddTo": key.get_string("key_location").unwrap_or_default(),
                })
            } else {
                json!({ "type": "noAuth" })
            }
        }
        None => json!({ "type": "noAuth" }),
    };
    document.to_string()
}

/// State `auth` block of an `authen` document; no authentication is null
pub fn auth_from_wire(document: &str) -> Value {
    let Ok(auth) = serde_json::from_str::<serde_json::Value>(document) else {
        return Value::Null;
    };
    let s = |name: &str| Value::from(auth.get(name).and_then(|v| v.as_str()).unwrap_or_default());
    let (kind, block) = match auth.get("type").and_then(|t| t.as_str()) {
        Some("basicAuth") => (
            "basic_auth",
            single_block([("username", s("username")), ("password", s("password"))]),
        ),
        Some("bearerToken") => ("token", single_block([("bearer_token", s("bearerToken"))])),
        Some("apiKey") => (
            "api_key",
            single_block([
                ("key", s("apiKey")),
                ("value", s("apiKeyValue")),
                ("key_location", s("apiKeyAddTo")),
            ]),
        ),
        _ => return Value::Null,
    };
    let mut auth_block = Value::object([
        ("basic_auth", Value::Null),
        ("token", Value::Null),
        ("api_key", Value::Null),
    ]);
    auth_block.set(kind, block);
    Value::List(vec![auth_block])
}

fn http_fields(block: &Value) -> Result<Vec<ActionField>, MappingError> {
    let path = AttributePath::new(HTTP).index(0);
    let required = |name: &str| {
        block.get_non_empty_string(name).ok_or_else(|| {
            MappingError::parse(path.clone().attribute(name), format!("{} must be set", name))
        })
    };
    let mut fields = vec![
        ActionField::ascii(FIELD_HOST, "url", required("host")?),
        ActionField::ascii(FIELD_METHOD, "method", required("method")?),
    ];
    fields.extend(
        [
            ascii(FIELD_BODY, "body", block.get_string("body")),
            ascii(
                FIELD_IGNORE_CERT_ERRORS,
                "ignore certificate errors",
                block.get_bool("ignore_certificate_errors").map(|b| b.to_string()),
            ),
            ascii(FIELD_TIMEOUT, "timeout", block.get_non_empty_string("timeout")),
            ascii(FIELD_LANGUAGE, "language", block.get_non_empty_string("language")),
            ascii(
                FIELD_CONTENT_TYPE,
                "content type",
                block.get_non_empty_string("content_type"),
            ),
        ]
        .into_iter()
        .flatten(),
    );
    fields.push(ActionField::ascii(
        FIELD_AUTH,
        "authentication",
        auth_to_wire(block.get_block("auth")),
    ));

    let headers = block.get_string_map("headers");
    if !headers.is_empty() {
        let document = serde_json::to_string(&headers)
            .map_err(|e| MappingError::parse(path.clone().attribute("headers"), e.to_string()))?;
        fields.push(ActionField::ascii(FIELD_HEADERS, "headers", document));
    }
    Ok(fields)
}

fn headers_from_wire(document: Option<&str>) -> Value {
    let headers: BTreeMap<String, String> = document
        .and_then(|d| serde_json::from_str(d).ok())
        .unwrap_or_default();
    if headers.is_empty() {
        return Value::Null;
    }
    Value::Map(headers.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

fn input_parameters(state: &Value) -> Result<Vec<ActionInputParameter>, MappingError> {
    state
        .get_blocks(INPUT_PARAMETER)
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            let path = AttributePath::new(INPUT_PARAMETER).index(idx as i64);
            let required = |name: &str| {
                param.get_non_empty_string(name).ok_or_else(|| {
                    let message = format!("{} must be set", name);
                    MappingError::parse(path.clone().attribute(name), message)
                })
            };
            Ok(ActionInputParameter {
                name: required("name")?,
                label: param.get_non_empty_string("label"),
                description: param.get_non_empty_string("description"),
                parameter_type: required("type")?,
                required: param.get_bool("required").unwrap_or(false),
                hidden: param.get_bool("hidden").unwrap_or(false),
                secured: param.get_bool("secured").unwrap_or(false),
                value: param.get_string("value"),
            })
        })
        .collect()
}

fn input_parameters_to_state(params: &[ActionInputParameter]) -> Value {
    if params.is_empty() {
        return Value::Null;
    }
    Value::List(
        params
            .iter()
            .map(|p| {
                Value::object([
                    ("name", Value::from(p.name.as_str())),
                    ("label", Value::from(p.label.clone())),
                    ("description", Value::from(p.description.clone())),
                    ("type", Value::from(p.parameter_type.as_str())),
                    ("required", Value::from(p.required)),
                    ("hidden", Value::from(p.hidden)),
                    ("secured", Value::from(p.secured)),
                    ("value", Value::from(p.value.clone())),
                ])
            })
            .collect(),
    )
}

/// Decoded value of field `name`
fn field_value(action: &AutomationAction, name: &str) -> Result<Option<String>, MappingError> {
    let Some(field) = action.field(name) else {
        return Ok(None);
    };
    if field.encoding != ENCODING_BASE64 {
        return Ok(Some(field.value.clone()));
    }
    let bytes = STANDARD
        .decode(field.value.as_bytes())
        .map_err(|_| MappingError::unsupported("base64 field value", field.value.as_str()))?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| MappingError::unsupported("non UTF-8 field value", field.name.as_str()))
}

fn script_to_state(action: &AutomationAction) -> Result<Value, MappingError> {
    Ok(single_block([
        ("content", Value::from(field_value(action, FIELD_SCRIPT)?)),
        ("interpreter", Value::from(field_value(action, FIELD_SUBTYPE)?)),
        ("timeout", Value::from(field_value(action, FIELD_TIMEOUT)?)),
        ("source", Value::from(field_value(action, FIELD_SOURCE)?)),
    ]))
}

fn http_to_state(action: &AutomationAction) -> Result<Value, MappingError> {
    let ignore_cert_errors = field_value(action, FIELD_IGNORE_CERT_ERRORS)?
        .and_then(|v| v.parse::<bool>().ok());
    Ok(single_block([
        ("host", Value::from(field_value(action, FIELD_HOST)?)),
        ("method", Value::from(field_value(action, FIELD_METHOD)?)),
        ("body", Value::from(field_value(action, FIELD_BODY)?)),
        (
            "headers",
            headers_from_wire(field_value(action, FIELD_HEADERS)?.as_deref()),
        ),
        ("ignore_certificate_errors", Value::from(ignore_cert_errors)),
        ("timeout", Value::from(field_value(action, FIELD_TIMEOUT)?)),
        ("language", Value::from(field_value(action, FIELD_LANGUAGE)?)),
        ("content_type", Value::from(field_value(action, FIELD_CONTENT_TYPE)?)),
        (
            "auth",
            field_value(action, FIELD_AUTH)?
                .map(|d| auth_from_wire(&d))
                .unwrap_or_default(),
        ),
    ]))
}

impl ResourceHandle for AutomationActionResource {
    type Object = AutomationAction;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("Automation action run by agents or triggered by policies")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the automation action"))
            .attribute(optional_string("description", "Description of the action"))
            .attribute(
                AttributeBuilder::string_list("tags")
                    .optional()
                    .description("Tags of the action")
                    .build(),
            )
            .block(NestedBlock::list(SCRIPT, script_block()).max_items(1))
            .block(NestedBlock::list(HTTP, http_block()).max_items(1))
            .block(NestedBlock::list(INPUT_PARAMETER, input_parameter_block()))
            .exactly_one_of(&[SCRIPT, HTTP])
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<AutomationAction> {
        client.automation_actions()
    }

    fn state_to_object(
        &self,
        state: &Value,
        _prior: &Value,
    ) -> Result<AutomationAction, MappingError> {
        let (action_type, fields) = match (state.get_block(SCRIPT), state.get_block(HTTP)) {
            (Some(script), None) => (ACTION_TYPE_SCRIPT, script_fields(script)?),
            (None, Some(http)) => (ACTION_TYPE_HTTP, http_fields(http)?),
            _ => {
                return Err(MappingError::parse(
                    AttributePath::root(),
                    "exactly one of script or http must be configured",
                ))
            }
        };
        Ok(AutomationAction {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            description: state.get_non_empty_string("description"),
            action_type: action_type.to_string(),
            tags: state.get_string_list("tags"),
            fields,
            input_parameters: input_parameters(state)?,
        })
    }

    fn object_to_state(
        &self,
        _state: &Value,
        action: &AutomationAction,
    ) -> Result<Value, MappingError> {
        let (script, http) = match action.action_type.as_str() {
            ACTION_TYPE_SCRIPT => (script_to_state(action)?, Value::Null),
            ACTION_TYPE_HTTP => (Value::Null, http_to_state(action)?),
            other => return Err(MappingError::unsupported("automation action type", other)),
        };
        Ok(Value::object([
            ("id", Value::from(action.id.as_str())),
            ("name", Value::from(action.name.as_str())),
            ("description", Value::from(action.description.clone())),
            ("tags", Value::string_list_or_null(action.tags.clone())),
            (SCRIPT, script),
            (HTTP, http),
            (INPUT_PARAMETER, input_parameters_to_state(&action.input_parameters)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::automation::ENCODING_ASCII;

    fn script_state() -> Value {
        Value::object([
            ("id", Value::from("a1")),
            ("name", Value::from("hello")),
            (
                SCRIPT,
                single_block([
                    ("content", Value::from("echo \"hi\"")),
                    ("interpreter", Value::from("bash")),
                    ("timeout", Value::from("10")),
                    ("source", Value::Null),
                ]),
            ),
        ])
    }

    #[test]
    fn script_content_is_sent_base64_encoded() {
        let action = AutomationActionResource
            .state_to_object(&script_state(), &Value::Null)
            .unwrap();
        assert_eq!(action.action_type, ACTION_TYPE_SCRIPT);

        let script = action.field(FIELD_SCRIPT).unwrap();
        assert_eq!(script.value, STANDARD.encode("echo \"hi\""));
        assert_eq!(script.encoding, ENCODING_BASE64);
        let subtype = action.field(FIELD_SUBTYPE).unwrap();
        assert_eq!((subtype.value.as_str(), subtype.encoding.as_str()), ("bash", ENCODING_ASCII));
        let timeout = action.field(FIELD_TIMEOUT).unwrap();
        assert_eq!((timeout.value.as_str(), timeout.encoding.as_str()), ("10", ENCODING_ASCII));
        assert!(action.field(FIELD_SOURCE).is_none());
    }

    #[test]
    fn script_action_reads_back_decoded() {
        let action = AutomationActionResource
            .state_to_object(&script_state(), &Value::Null)
            .unwrap();
        let state = AutomationActionResource
            .object_to_state(&Value::Null, &action)
            .unwrap();
        let script = state.get_block(SCRIPT).unwrap();
        assert_eq!(script.get_string("content").as_deref(), Some("echo \"hi\""));
        assert!(state.get(HTTP).is_null());
        assert_eq!(AutomationActionResource.state_to_object(&state, &Value::Null).unwrap(), action);
    }

    #[test]
    fn http_headers_and_auth_are_json_fields() {
        let state = Value::object([
            ("name", Value::from("hook")),
            (
                HTTP,
                single_block([
                    ("host", Value::from("https://example.com")),
                    ("method", Value::from("POST")),
                    (
                        "headers",
                        Value::Map(BTreeMap::from([(
                            "X-Token".to_string(),
                            Value::from("abc"),
                        )])),
                    ),
                    ("ignore_certificate_errors", Value::from(true)),
                    (
                        "auth",
                        single_block([(
                            "token",
                            single_block([("bearer_token", Value::from("secret"))]),
                        )]),
                    ),
                ]),
            ),
        ]);
        let action = AutomationActionResource.state_to_object(&state, &Value::Null).unwrap();
        assert_eq!(action.action_type, ACTION_TYPE_HTTP);
        assert_eq!(action.field(FIELD_HEADERS).unwrap().value, r#"{"X-Token":"abc"}"#);
        assert_eq!(action.field(FIELD_IGNORE_CERT_ERRORS).unwrap().value, "true");
        let auth: serde_json::Value =
            serde_json::from_str(&action.field(FIELD_AUTH).unwrap().value).unwrap();
        assert_eq!(auth, json!({"type": "bearerToken", "bearerToken": "secret"}));

        let back = AutomationActionResource
            .object_to_state(&state, &action)
            .unwrap();
        let http = back.get_block(HTTP).unwrap();
        assert_eq!(http.get_string_map("headers").get("X-Token").map(String::as_str), Some("abc"));
        let token = http.get_block("auth").unwrap().get_block("token").unwrap();
        assert_eq!(token.get_string("bearer_token").as_deref(), Some("secret"));
    }

    #[test]
    fn missing_auth_is_sent_as_no_auth() {
        assert_eq!(auth_to_wire(None), r#"{"type":"noAuth"}"#);
        assert!(auth_from_wire(r#"{"type":"noAuth"}"#).is_null());
    }

    #[test]
    fn unknown_action_type_is_unsupported() {
        let action = AutomationAction {
            id: "a1".to_string(),
            name: "jira".to_string(),
            action_type: "JIRA".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AutomationActionResource.object_to_state(&Value::Null, &action),
            Err(MappingError::UnsupportedVariant { .. })
        ));
    }
}
