//! Core value model for tfplug
//!
//! Configuration, plan and state travel between the host and the provider as
//! a dynamically typed tree. This module provides that tree (`Value`), the
//! addressing scheme used to point into it (`AttributePath`) and the
//! diagnostics returned from every operation.

use crate::error::{Result, TfplugError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

static NULL: Value = Value::Null;

/// Value represents a Terraform value of any type
///
/// Sets keep insertion order but compare as multisets. Int and Float compare
/// numerically so a value decoded from the wire as `1.0` equals `Int(1)`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Explicit null value
    #[default]
    Null,
    /// Value not yet known (only during planning)
    Unknown,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered collection, duplicates allowed
    List(Vec<Value>),
    /// Unordered collection
    Set(Vec<Value>),
    /// String keyed collection with a single element type
    Map(BTreeMap<String, Value>),
    /// Fixed structure keyed by attribute name
    Object(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Unknown, Value::Unknown) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => multiset_eq(a, b),
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

fn multiset_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for item in a {
        for (idx, candidate) in b.iter().enumerate() {
            if !used[idx] && item == candidate {
                used[idx] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl Value {
    /// Build an object from (name, value) pairs
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list of strings
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Build a set of strings
    pub fn string_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Empty string collections become null; everything else becomes a list
    pub fn string_list_or_null(items: Vec<String>) -> Self {
        if items.is_empty() {
            Value::Null
        } else {
            Value::string_list(items)
        }
    }

    /// Empty string collections become null; everything else becomes a set
    pub fn string_set_or_null(items: Vec<String>) -> Self {
        if items.is_empty() {
            Value::Null
        } else {
            Value::string_set(items)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Neither null nor unknown
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    /// True when no unknown appears anywhere in the tree
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::List(items) | Value::Set(items) => items.iter().all(Value::is_wholly_known),
            Value::Map(fields) | Value::Object(fields) => {
                fields.values().all(Value::is_wholly_known)
            }
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Elements of a list or set
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map or object
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) | Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Attribute lookup on an object or map; anything missing reads as null
    pub fn get(&self, name: &str) -> &Value {
        self.as_map().and_then(|m| m.get(name)).unwrap_or(&NULL)
    }

    /// Set an attribute, turning a null receiver into an empty object first
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if self.is_null() || self.is_unknown() {
            *self = Value::Object(BTreeMap::new());
        }
        if let Value::Object(fields) | Value::Map(fields) = self {
            fields.insert(name.into(), value);
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        match self {
            Value::Object(fields) | Value::Map(fields) => fields.remove(name),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).as_str().map(str::to_string)
    }

    /// String attribute, treating empty strings as absent
    pub fn get_non_empty_string(&self, name: &str) -> Option<String> {
        self.get(name)
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).as_bool()
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).as_i64()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    /// Known string elements of a list or set attribute; null reads as empty
    pub fn get_string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .as_list()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Known string entries of a map attribute
    pub fn get_string_map(&self, name: &str) -> BTreeMap<String, String> {
        self.get(name)
            .as_map()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Elements of a nested block list or set; null reads as empty
    pub fn get_blocks(&self, name: &str) -> &[Value] {
        self.get(name).as_list().unwrap_or(&[])
    }

    /// First element of a nested block list, or the block itself for single nesting
    pub fn get_block(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Value::List(items) | Value::Set(items) => items.first().filter(|v| v.is_known()),
            v @ Value::Object(_) => Some(v),
            _ => None,
        }
    }

    pub fn get_path(&self, path: &AttributePath) -> &Value {
        let mut current = self;
        for step in &path.steps {
            current = match (current, step) {
                (Value::Object(m) | Value::Map(m), AttributePathStep::AttributeName(name))
                | (Value::Object(m) | Value::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    m.get(name).unwrap_or(&NULL)
                }
                (Value::List(items) | Value::Set(items), AttributePathStep::ElementKeyInt(idx)) => {
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|i| items.get(i))
                        .unwrap_or(&NULL)
                }
                _ => return &NULL,
            };
        }
        current
    }

    pub fn set_path(&mut self, path: &AttributePath, value: Value) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        for step in parents {
            current = current.child_mut(step, path)?;
        }

        match (current, last) {
            (target, AttributePathStep::AttributeName(name))
            | (target, AttributePathStep::ElementKeyString(name))
                if !matches!(target, Value::List(_) | Value::Set(_)) =>
            {
                target.set(name.clone(), value);
                Ok(())
            }
            (Value::List(items) | Value::Set(items), AttributePathStep::ElementKeyInt(idx)) => {
                let slot = usize::try_from(*idx)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| TfplugError::InvalidPath(path.to_string()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(TfplugError::InvalidPath(path.to_string())),
        }
    }

    fn child_mut(&mut self, step: &AttributePathStep, path: &AttributePath) -> Result<&mut Value> {
        match (self, step) {
            (Value::Object(m) | Value::Map(m), AttributePathStep::AttributeName(name))
            | (Value::Object(m) | Value::Map(m), AttributePathStep::ElementKeyString(name)) => m
                .get_mut(name)
                .ok_or_else(|| TfplugError::InvalidPath(path.to_string())),
            (Value::List(items) | Value::Set(items), AttributePathStep::ElementKeyInt(idx)) => {
                usize::try_from(*idx)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| TfplugError::InvalidPath(path.to_string()))
            }
            _ => Err(TfplugError::InvalidPath(path.to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Unknown => "unknown",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// AttributePath represents a path to an attribute within a Value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                AttributePathStep::AttributeName(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    /// Access attribute by name in object
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists and sets)
    ElementKeyInt(i64),
}

/// RawState holds the stored state for a resource to be upgraded
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub json: Option<Vec<u8>>,
    pub flatmap: HashMap<String, String>,
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Ordered collection of diagnostics produced by one operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary, detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    pub fn add_attribute_error(
        &mut self,
        path: &AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::error(summary, detail).with_attribute(path.clone()));
    }

    pub fn add_attribute_warning(
        &mut self,
        path: &AttributePath,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(summary, detail).with_attribute(path.clone()));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
