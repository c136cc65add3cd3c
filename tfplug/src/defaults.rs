//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when the configuration leaves an
//! optional attribute null. The planned value then carries the default so
//! that the provider sees it on apply.
//!
//! # Examples
//!
//! ```no_run
//! use tfplug::attribute_type::AttributeType;
//! use tfplug::defaults::StaticDefault;
//! use tfplug::schema::AttributeBuilder;
//!
//! let scope = AttributeBuilder::new("scope", AttributeType::String)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::string("INCLUDE_NO_DOWNSTREAM"))
//!     .build();
//! ```

use crate::types::{AttributePath, Value};

pub trait AttributeDefault: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    fn default_value(&self, path: &AttributePath) -> Value;
}

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Value,
}

impl StaticDefault {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn string(value: &str) -> Self {
        Self::new(Value::String(value.to_string()))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Value::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(Value::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(Value::Float(value))
    }
}

impl AttributeDefault for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _path: &AttributePath) -> Value {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_default_returns_value() {
        let default = StaticDefault::string("DEFAULT");
        assert_eq!(
            default.default_value(&AttributePath::new("boundary_scope")),
            Value::from("DEFAULT")
        );
    }
}
