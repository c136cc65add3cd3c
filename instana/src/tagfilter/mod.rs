//! Instana tag filter expressions
//!
//! The DSL reads `<name>[:<key>][@<entity>] <OPERATOR> [<literal>]` combined
//! with `AND`, `OR` and parentheses, e.g.
//! `service.name@dest EQUALS 'shop' AND (call.http.status GREATER_THAN 499)`.
//!
//! [`Expression::normalize`] gives every expression one canonical spelling:
//! keywords upper-cased, strings single-quoted, the not-applicable entity
//! dropped and `AND`/`OR` chains flattened in source order. Two spellings
//! denote the same filter exactly when their normalized forms match.
//!
//! Integer literals are exact 64 bit values. Comparands of key/value tags are
//! strings; a bare number there keeps its digits as written.

mod parser;
mod wire;

use std::fmt;
use thiserror::Error;

pub use wire::{from_wire, normalized_from_wire, to_wire, wire_from_text};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TagFilterError {
    #[error("invalid tag filter at position {position}: expected {expected}")]
    SyntaxError { position: usize, expected: String },

    #[error("unsupported tag filter element type '{node_type}'")]
    UnsupportedNode { node_type: String },

    #[error("operator {operator} cannot be applied to a {value_type} value")]
    InvalidOperator {
        operator: String,
        value_type: &'static str,
    },

    #[error("incomplete tag filter element: {0}")]
    IncompleteNode(String),

    #[error("number {0} is out of range")]
    NumberOutOfRange(String),
}

/// Parse a tag filter expression
pub fn parse(text: &str) -> Result<Expression, TagFilterError> {
    parser::parse(text)
}

/// Normalized rendition of a user supplied expression; blank input is no filter
pub fn normalize(text: &str) -> Result<Option<String>, TagFilterError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse(text).map(|expr| Some(expr.normalize()))
}

/// Which side of a call a tag is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Source,
    Destination,
    NotApplicable,
}

impl Entity {
    pub fn dsl_suffix(self) -> Option<&'static str> {
        match self {
            Entity::Source => Some("src"),
            Entity::Destination => Some("dest"),
            Entity::NotApplicable => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Entity::Source => "SOURCE",
            Entity::Destination => "DESTINATION",
            Entity::NotApplicable => "NOT_APPLICABLE",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "SOURCE" => Some(Entity::Source),
            "DESTINATION" => Some(Entity::Destination),
            "NOT_APPLICABLE" => Some(Entity::NotApplicable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    NotEqual,
    Contains,
    NotContain,
    StartsWith,
    EndsWith,
    NotStartsWith,
    NotEndsWith,
    GreaterOrEqualThan,
    LessOrEqualThan,
    GreaterThan,
    LessThan,
    RegexMatch,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 13] = [
        ComparisonOperator::Equals,
        ComparisonOperator::NotEqual,
        ComparisonOperator::Contains,
        ComparisonOperator::NotContain,
        ComparisonOperator::StartsWith,
        ComparisonOperator::EndsWith,
        ComparisonOperator::NotStartsWith,
        ComparisonOperator::NotEndsWith,
        ComparisonOperator::GreaterOrEqualThan,
        ComparisonOperator::LessOrEqualThan,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::LessThan,
        ComparisonOperator::RegexMatch,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "EQUALS",
            ComparisonOperator::NotEqual => "NOT_EQUAL",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::NotContain => "NOT_CONTAIN",
            ComparisonOperator::StartsWith => "STARTS_WITH",
            ComparisonOperator::EndsWith => "ENDS_WITH",
            ComparisonOperator::NotStartsWith => "NOT_STARTS_WITH",
            ComparisonOperator::NotEndsWith => "NOT_ENDS_WITH",
            ComparisonOperator::GreaterOrEqualThan => "GREATER_OR_EQUAL_THAN",
            ComparisonOperator::LessOrEqualThan => "LESS_OR_EQUAL_THAN",
            ComparisonOperator::GreaterThan => "GREATER_THAN",
            ComparisonOperator::LessThan => "LESS_THAN",
            ComparisonOperator::RegexMatch => "REGEX_MATCH",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.keyword().eq_ignore_ascii_case(keyword))
    }

    fn accepts(self, literal: &Literal) -> bool {
        use ComparisonOperator::*;
        match literal {
            Literal::String(_) => true,
            Literal::Number(_) => matches!(
                self,
                Equals | NotEqual | GreaterOrEqualThan | LessOrEqualThan | GreaterThan | LessThan
            ),
            Literal::Bool(_) => matches!(self, Equals | NotEqual),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    IsEmpty,
    NotEmpty,
    IsBlank,
    NotBlank,
}

impl UnaryOperator {
    pub const ALL: [UnaryOperator; 4] = [
        UnaryOperator::IsEmpty,
        UnaryOperator::NotEmpty,
        UnaryOperator::IsBlank,
        UnaryOperator::NotBlank,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            UnaryOperator::IsEmpty => "IS_EMPTY",
            UnaryOperator::NotEmpty => "NOT_EMPTY",
            UnaryOperator::IsBlank => "IS_BLANK",
            UnaryOperator::NotBlank => "NOT_BLANK",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.keyword().eq_ignore_ascii_case(keyword))
    }
}

/// Numeric comparand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    /// Number for `digits`, an optional `-`, digits and an optional fraction
    pub fn parse(digits: &str) -> Result<Self, TagFilterError> {
        let out_of_range = || TagFilterError::NumberOutOfRange(digits.to_string());
        if digits.contains('.') {
            match digits.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Number::Decimal(n)),
                _ => Err(out_of_range()),
            }
        } else {
            digits
                .parse::<i64>()
                .map(Number::Integer)
                .map_err(|_| out_of_range())
        }
    }

    pub fn to_json(self) -> Option<serde_json::Number> {
        match self {
            Number::Integer(n) => Some(n.into()),
            Number::Decimal(n) => serde_json::Number::from_f64(n),
        }
    }

    pub fn from_json(number: &serde_json::Number) -> Option<Self> {
        number
            .as_i64()
            .map(Number::Integer)
            .or_else(|| number.as_f64().map(Number::Decimal))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{}", n),
            // decimals keep a fraction so they read back as decimals
            Number::Decimal(n) => {
                let text = n.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(Number),
    Bool(bool),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::String(_) => "string",
            Literal::Number(_) => "number",
            Literal::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    if c == '\'' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("'")
            }
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(true) => f.write_str("TRUE"),
            Literal::Bool(false) => f.write_str("FALSE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        operator: ComparisonOperator,
        value: Literal,
    },
    Unary(UnaryOperator),
}

/// A single tag comparison
#[derive(Debug, Clone, PartialEq)]
pub struct TagExpression {
    pub name: String,
    /// Tag key for key/value tags such as `kubernetes.label:app`
    pub key: Option<String>,
    pub entity: Entity,
    pub predicate: Predicate,
}

impl TagExpression {
    /// Build a comparison, rejecting operators that do not fit the literal;
    /// key/value tags always compare strings
    pub fn compare(
        name: impl Into<String>,
        key: Option<String>,
        entity: Entity,
        operator: ComparisonOperator,
        value: Literal,
    ) -> Result<Self, TagFilterError> {
        let value = match (&key, value) {
            (Some(_), Literal::String(s)) => Literal::String(s),
            (Some(_), Literal::Number(n)) => Literal::String(n.to_string()),
            (Some(_), Literal::Bool(b)) => Literal::String(b.to_string()),
            (None, value) => value,
        };
        if !operator.accepts(&value) {
            return Err(TagFilterError::InvalidOperator {
                operator: operator.keyword().to_string(),
                value_type: value.type_name(),
            });
        }
        Ok(Self {
            name: name.into(),
            key,
            entity,
            predicate: Predicate::Compare { operator, value },
        })
    }

    pub fn unary(
        name: impl Into<String>,
        key: Option<String>,
        entity: Entity,
        operator: UnaryOperator,
    ) -> Self {
        Self {
            name: name.into(),
            key,
            entity,
            predicate: Predicate::Unary(operator),
        }
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(key) = &self.key {
            write!(f, ":{}", key)?;
        }
        if let Some(suffix) = self.entity.dsl_suffix() {
            write!(f, "@{}", suffix)?;
        }
        match &self.predicate {
            Predicate::Compare { operator, value } => {
                write!(f, " {} {}", operator.keyword(), value)
            }
            Predicate::Unary(operator) => write!(f, " {}", operator.keyword()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Two or more operands, none of them an `Or`
    Or(Vec<Expression>),
    /// Two or more operands, none of them an `And`
    And(Vec<Expression>),
    Tag(TagExpression),
}

impl Expression {
    /// Combine operands with OR, splicing nested ORs into the chain
    pub fn or(operands: Vec<Expression>) -> Expression {
        Self::chain(operands, true)
    }

    /// Combine operands with AND, splicing nested ANDs into the chain
    pub fn and(operands: Vec<Expression>) -> Expression {
        Self::chain(operands, false)
    }

    fn chain(operands: Vec<Expression>, is_or: bool) -> Expression {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Expression::Or(inner) if is_or => flat.extend(inner),
                Expression::And(inner) if !is_or => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(single) = flat.pop() {
                return single;
            }
        }
        if is_or {
            Expression::Or(flat)
        } else {
            Expression::And(flat)
        }
    }

    pub fn normalize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Tag(tag) => write!(f, "{}", tag),
            Expression::Or(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{}", operand)?;
                }
                Ok(())
            }
            Expression::And(operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    match operand {
                        Expression::Or(_) => write!(f, "({})", operand)?,
                        _ => write!(f, "{}", operand)?,
                    }
                }
                Ok(())
            }
        }
    }
}
