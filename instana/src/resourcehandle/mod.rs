//! Per-resource plug-in contract
//!
//! A [`ResourceHandle`] describes one Instana collection: its schema, the
//! REST binding and the two mapping directions between the host's value tree
//! and the typed API object. [`HandleResource`] drives every lifecycle
//! operation from that description.

mod engine;

pub use engine::HandleResource;
pub(crate) use engine::generate_id;

use tfplug::types::Diagnostic;
use tfplug::{AttributePath, Schema, Value};
use thiserror::Error;

use crate::api::{Client, RestObject, RestResource};
use crate::tagfilter::TagFilterError;

/// Static description of a resource
pub struct ResourceMetaData {
    /// Full type name, e.g. `instana_alerting_channel`
    pub resource_name: &'static str,
    pub schema: Schema,
    /// Attribute addressing the object in REST paths instead of `id`
    pub id_field_override: Option<&'static str>,
    /// The Platform or the handle assigns the id; no uuid is generated on create
    pub skip_id_generation: bool,
    /// Updates are rejected; the host has to replace the object
    pub create_only: bool,
    pub deprecation_message: Option<&'static str>,
}

impl ResourceMetaData {
    pub fn new(resource_name: &'static str, schema: Schema) -> Self {
        Self {
            resource_name,
            schema,
            id_field_override: None,
            skip_id_generation: false,
            create_only: false,
            deprecation_message: None,
        }
    }

    pub fn with_id_field_override(mut self, field: &'static str) -> Self {
        self.id_field_override = Some(field);
        self
    }

    pub fn skip_id_generation(mut self) -> Self {
        self.skip_id_generation = true;
        self
    }

    pub fn create_only(mut self) -> Self {
        self.create_only = true;
        self
    }

    pub fn deprecated(mut self, message: &'static str) -> Self {
        self.deprecation_message = Some(message);
        self
    }

    pub fn schema_version(&self) -> i64 {
        self.schema.version
    }

    /// Attribute holding the REST address of the object
    pub fn id_attribute(&self) -> &'static str {
        self.id_field_override.unwrap_or("id")
    }
}

/// Migration of a stored state written by schema version `from_version`
#[derive(Clone, Copy)]
pub struct StateUpgrader {
    pub from_version: i64,
    pub upgrade: fn(Value) -> Result<Value, MappingError>,
}

impl StateUpgrader {
    pub fn new(from_version: i64, upgrade: fn(Value) -> Result<Value, MappingError>) -> Self {
        Self {
            from_version,
            upgrade,
        }
    }
}

/// Upgrader dropping attributes that no longer exist
pub fn drop_attributes(mut state: Value, names: &[&str]) -> Value {
    for name in names {
        state.remove(name);
    }
    state
}

/// Upgrader that keeps the stored tree as is
pub fn pass_through(state: Value) -> Result<Value, MappingError> {
    Ok(state)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// User input that cannot be turned into an API object
    #[error("{message}")]
    ParseError {
        path: AttributePath,
        message: String,
    },

    /// The Platform returned a variant this provider does not know
    #[error("unsupported {what} '{value}'; upgrade the provider to manage this object")]
    UnsupportedVariant { what: &'static str, value: String },

    #[error("missing required value {0}")]
    MissingRequired(String),
}

impl MappingError {
    pub fn parse(path: AttributePath, message: impl Into<String>) -> Self {
        MappingError::ParseError {
            path,
            message: message.into(),
        }
    }

    pub fn unsupported(what: &'static str, value: impl Into<String>) -> Self {
        MappingError::UnsupportedVariant {
            what,
            value: value.into(),
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        MappingError::MissingRequired(name.into())
    }

    /// Tag filter text of attribute `path` failed to parse
    pub fn tag_filter(path: AttributePath, err: TagFilterError) -> Self {
        MappingError::parse(path, format!("invalid tag filter: {}", err))
    }

    pub fn into_diagnostic(self, resource_name: &str) -> Diagnostic {
        match self {
            MappingError::ParseError { path, message } => {
                Diagnostic::error("Invalid configuration", message).with_attribute(path)
            }
            other => Diagnostic::error(
                format!("Failed to map {}", resource_name),
                other.to_string(),
            ),
        }
    }
}

/// One Instana collection plugged into the lifecycle engine
pub trait ResourceHandle: Send + Sync + 'static {
    type Object: RestObject;

    fn metadata(&self) -> ResourceMetaData;

    fn rest_resource(&self, client: &Client) -> RestResource<Self::Object>;

    /// Fill client side computed attributes before create
    fn set_computed(&self, _plan: &mut Value) -> Result<(), MappingError> {
        Ok(())
    }

    /// API object for `plan`; `prior` is the stored state on update and
    /// delete, null on create and validation
    fn state_to_object(&self, plan: &Value, prior: &Value) -> Result<Self::Object, MappingError>;

    /// New state for `object`; `state` is the tree the object was built
    /// from, consulted for values the Platform does not echo
    fn object_to_state(&self, state: &Value, object: &Self::Object) -> Result<Value, MappingError>;

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        Vec::new()
    }
}

/// Required string attribute; empty strings count as missing
pub(crate) fn required_string(state: &Value, name: &str) -> Result<String, MappingError> {
    state
        .get_non_empty_string(name)
        .ok_or_else(|| MappingError::missing(name))
}

/// Optional string attribute of a nested block
pub(crate) fn block_string(block: &Value, name: &str) -> Option<String> {
    block.get_non_empty_string(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_pin_the_attribute() {
        let diag = MappingError::parse(AttributePath::new("tag_filter"), "bad input")
            .into_diagnostic("instana_application_config");
        assert_eq!(diag.attribute, Some(AttributePath::new("tag_filter")));
        assert_eq!(diag.detail, "bad input");
    }

    #[test]
    fn unsupported_variant_names_the_value() {
        let diag = MappingError::unsupported("alerting channel kind", "CARRIER_PIGEON")
            .into_diagnostic("instana_alerting_channel");
        assert!(diag.is_error());
        assert!(diag.detail.contains("CARRIER_PIGEON"));
        assert!(diag.summary.contains("instana_alerting_channel"));
    }

    #[test]
    fn dropping_attributes_keeps_the_rest() {
        let state = Value::object([
            ("id", Value::from("1")),
            ("full_name", Value::from("prefix name")),
        ]);
        let upgraded = drop_attributes(state, &["full_name"]);
        assert_eq!(upgraded, Value::object([("id", Value::from("1"))]));
    }

    #[test]
    fn metadata_defaults_to_id_attribute() {
        let meta = ResourceMetaData::new("instana_thing", Schema::default());
        assert_eq!(meta.id_attribute(), "id");
        assert_eq!(
            meta.with_id_field_override("internal_id").id_attribute(),
            "internal_id"
        );
    }
}
