//! Attribute validators
//!
//! Validators only ever see known values; null and unknown values are skipped
//! by the config validation pass before a validator is invoked.

use crate::types::{AttributePath, Diagnostics, Value};

pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics);
}

/// Accepts only the listed strings; applied per element for lists and sets
pub struct OneOf {
    allowed: Vec<String>,
}

impl OneOf {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    fn check(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.add_attribute_error(
                    path,
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute {} value must be one of: {}, got: \"{}\"",
                        path,
                        self.allowed
                            .iter()
                            .map(|a| format!("\"{}\"", a))
                            .collect::<Vec<_>>()
                            .join(", "),
                        s
                    ),
                );
            }
        }
    }
}

impl Validator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        match value {
            Value::List(items) | Value::Set(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.check(item, &path.clone().index(idx as i64), diagnostics);
                }
            }
            other => self.check(other, path, diagnostics),
        }
    }
}

pub struct StringLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLength {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for StringLength {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.chars().count();
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if too_short || too_long {
            diagnostics.add_attribute_error(
                path,
                "Invalid Attribute Value Length",
                format!("Attribute {} {}, got: {}", path, self.description(), len),
            );
        }
    }
}

/// Bounds the number of elements in a list, set or map
pub struct SizeBetween {
    pub min: usize,
    pub max: usize,
}

impl Validator for SizeBetween {
    fn description(&self) -> String {
        format!("must contain between {} and {} elements", self.min, self.max)
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let len = match value {
            Value::List(items) | Value::Set(items) => items.len(),
            Value::Map(entries) => entries.len(),
            _ => return,
        };
        if len < self.min || len > self.max {
            diagnostics.add_attribute_error(
                path,
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {}", path, self.description(), len),
            );
        }
    }
}

/// Accepts only the listed integers
pub struct IntOneOf {
    allowed: Vec<i64>,
}

impl IntOneOf {
    pub fn new(allowed: &[i64]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }
}

impl Validator for IntOneOf {
    fn description(&self) -> String {
        let allowed: Vec<String> = self.allowed.iter().map(i64::to_string).collect();
        format!("value must be one of: {}", allowed.join(", "))
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(n) = value.as_i64() else {
            return;
        };
        if !self.allowed.contains(&n) {
            diagnostics.add_attribute_error(
                path,
                "Invalid Attribute Value Match",
                format!("Attribute {} {}, got: {}", path, self.description(), n),
            );
        }
    }
}

/// Inclusive integer range
pub struct IntBetween {
    pub min: i64,
    pub max: i64,
}

impl Validator for IntBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let Some(n) = value.as_i64() else {
            return;
        };
        if n < self.min || n > self.max {
            diagnostics.add_attribute_error(
                path,
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {}", path, self.description(), n),
            );
        }
    }
}

/// Requires a string holding a syntactically valid JSON document
pub struct JsonString;

impl Validator for JsonString {
    fn description(&self) -> String {
        "value must be a valid JSON document".to_string()
    }

    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.add_attribute_error(
                    path,
                    "Invalid JSON String Value",
                    format!("Attribute {} must be valid JSON: {}", path, e),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        validator.validate(&value, &AttributePath::new("field"), &mut diags);
        diags
    }

    #[test]
    fn one_of_accepts_member() {
        let validator = OneOf::new(["EU", "US"]);
        assert!(run(&validator, Value::from("EU")).is_empty());
    }

    #[test]
    fn one_of_rejects_each_bad_element() {
        let validator = OneOf::new(["incident", "critical"]);
        let diags = run(&validator, Value::string_set(["incident", "nope", "other"]));

        assert_eq!(diags.len(), 2);
        let first = diags.iter().next().unwrap();
        assert_eq!(
            first.attribute,
            Some(AttributePath::new("field").index(1))
        );
    }

    #[test]
    fn int_one_of_names_the_rejected_value() {
        let validator = IntOneOf::new(&[60000, 300000]);
        assert!(run(&validator, Value::from(300000i64)).is_empty());
        let diags = run(&validator, Value::from(1000i64));
        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().detail.ends_with("got: 1000"));
    }

    #[test]
    fn int_between_is_inclusive() {
        let validator = IntBetween { min: 1, max: 12 };
        assert!(run(&validator, Value::from(1i64)).is_empty());
        assert!(run(&validator, Value::from(12i64)).is_empty());
        assert_eq!(run(&validator, Value::from(13i64)).len(), 1);
        assert!(run(&validator, Value::from("12")).is_empty());
    }

    #[test]
    fn string_length_counts_characters() {
        let validator = StringLength::between(1, 3);
        assert!(run(&validator, Value::from("äöü")).is_empty());
        assert!(run(&validator, Value::from("")).has_errors());
        assert!(run(&validator, Value::from("abcd")).has_errors());
    }

    #[test]
    fn size_between_checks_collections() {
        let validator = SizeBetween { min: 1, max: 2 };
        assert!(run(&validator, Value::string_list(["a"])).is_empty());
        assert!(run(&validator, Value::List(vec![])).has_errors());
    }

    #[test]
    fn json_string_rejects_garbage() {
        assert!(run(&JsonString, Value::from("{\"a\":1}")).is_empty());
        assert!(run(&JsonString, Value::from("{a:")).has_errors());
    }
}
