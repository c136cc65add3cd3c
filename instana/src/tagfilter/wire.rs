//! Conversion between expressions and the Platform's nested wire records

use serde_json::Value as Json;

use super::{
    ComparisonOperator, Entity, Expression, Literal, Number, Predicate, TagExpression,
    TagFilterError, UnaryOperator,
};
use crate::api::models::tag_filter::{TagFilter, EXPRESSION_TYPE, TAG_FILTER_TYPE};

pub fn to_wire(expr: &Expression) -> TagFilter {
    match expr {
        Expression::Or(operands) => {
            TagFilter::expression("OR", operands.iter().map(to_wire).collect())
        }
        Expression::And(operands) => {
            TagFilter::expression("AND", operands.iter().map(to_wire).collect())
        }
        Expression::Tag(tag) => tag_to_wire(tag),
    }
}

fn tag_to_wire(tag: &TagExpression) -> TagFilter {
    let operator = match &tag.predicate {
        Predicate::Compare { operator, .. } => operator.keyword(),
        Predicate::Unary(operator) => operator.keyword(),
    };
    let mut wire = TagFilter::tag(&tag.name, tag.entity.wire_name(), operator);
    wire.key = tag.key.clone();

    if let Predicate::Compare { value, .. } = &tag.predicate {
        match (value, &tag.key) {
            (Literal::String(s), Some(key)) => {
                wire.string_value = Some(format!("{}={}", key, s));
                wire.value = Some(Json::String(s.clone()));
            }
            (Literal::String(s), None) => {
                wire.string_value = Some(s.clone());
                wire.value = Some(Json::String(s.clone()));
            }
            (Literal::Number(n), _) => {
                wire.number_value = n.to_json();
                wire.value = wire.number_value.clone().map(Json::Number);
            }
            (Literal::Bool(b), _) => {
                wire.boolean_value = Some(*b);
                wire.value = Some(Json::Bool(*b));
            }
        }
    }
    wire
}

/// Expression for a wire element; an expression without elements is no filter
pub fn from_wire(wire: &TagFilter) -> Result<Option<Expression>, TagFilterError> {
    match wire.element_type.as_str() {
        EXPRESSION_TYPE => {
            let mut operands = Vec::with_capacity(wire.elements.len());
            for element in &wire.elements {
                if let Some(expr) = from_wire(element)? {
                    operands.push(expr);
                }
            }
            if operands.is_empty() {
                return Ok(None);
            }
            match wire.logical_operator.as_deref() {
                Some(op) if op.eq_ignore_ascii_case("AND") => Ok(Some(Expression::and(operands))),
                Some(op) if op.eq_ignore_ascii_case("OR") => Ok(Some(Expression::or(operands))),
                Some(op) => Err(TagFilterError::IncompleteNode(format!(
                    "unknown logical operator '{}'",
                    op
                ))),
                None if operands.len() == 1 => Ok(operands.pop()),
                None => Err(TagFilterError::IncompleteNode(
                    "expression without logical operator".to_string(),
                )),
            }
        }
        TAG_FILTER_TYPE => tag_from_wire(wire).map(|tag| Some(Expression::Tag(tag))),
        other => Err(TagFilterError::UnsupportedNode {
            node_type: other.to_string(),
        }),
    }
}

fn tag_from_wire(wire: &TagFilter) -> Result<TagExpression, TagFilterError> {
    let name = wire
        .name
        .as_deref()
        .ok_or_else(|| TagFilterError::IncompleteNode("tag filter without name".to_string()))?;
    let operator = wire.operator.as_deref().ok_or_else(|| {
        TagFilterError::IncompleteNode(format!("tag filter '{}' without operator", name))
    })?;
    let entity = match wire.entity.as_deref() {
        None => Entity::NotApplicable,
        Some(entity) => Entity::from_wire_name(entity).ok_or_else(|| {
            TagFilterError::IncompleteNode(format!("unknown entity '{}'", entity))
        })?,
    };
    let key = wire.key.clone().filter(|k| !k.is_empty());

    if let Some(unary) = UnaryOperator::from_keyword(operator) {
        return Ok(TagExpression::unary(name, key, entity, unary));
    }
    let comparison = ComparisonOperator::from_keyword(operator).ok_or_else(|| {
        TagFilterError::IncompleteNode(format!("unknown operator '{}'", operator))
    })?;
    let literal = literal_from_wire(wire, key.as_deref()).ok_or_else(|| {
        TagFilterError::IncompleteNode(format!("tag filter '{}' without value", name))
    })?;
    TagExpression::compare(name, key, entity, comparison, literal)
}

fn literal_from_wire(wire: &TagFilter, key: Option<&str>) -> Option<Literal> {
    if let Some(key) = key {
        if let Some(Json::String(value)) = &wire.value {
            return Some(Literal::String(value.clone()));
        }
        let prefix = format!("{}=", key);
        return wire.string_value.as_deref().map(|s| {
            Literal::String(s.strip_prefix(prefix.as_str()).unwrap_or(s).to_string())
        });
    }
    if let Some(s) = &wire.string_value {
        return Some(Literal::String(s.clone()));
    }
    if let Some(n) = wire.number_value.as_ref().and_then(Number::from_json) {
        return Some(Literal::Number(n));
    }
    if let Some(b) = wire.boolean_value {
        return Some(Literal::Bool(b));
    }
    match &wire.value {
        Some(Json::String(s)) => Some(Literal::String(s.clone())),
        Some(Json::Number(n)) => Number::from_json(n).map(Literal::Number),
        Some(Json::Bool(b)) => Some(Literal::Bool(*b)),
        _ => None,
    }
}

/// Normalized string for an optional wire filter
pub fn normalized_from_wire(wire: Option<&TagFilter>) -> Result<Option<String>, TagFilterError> {
    match wire {
        Some(wire) => Ok(from_wire(wire)?.map(|expr| expr.normalize())),
        None => Ok(None),
    }
}

/// Wire filter for optional user text; blank text is no filter
pub fn wire_from_text(text: Option<&str>) -> Result<Option<TagFilter>, TagFilterError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(Some(to_wire(&super::parse(text)?))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagfilter::parse;
    use serde_json::json;

    #[test]
    fn number_comparison_on_destination() {
        let wire: TagFilter = serde_json::from_value(json!({
            "type": "TAG_FILTER",
            "name": "name",
            "entity": "DESTINATION",
            "operator": "EQUALS",
            "numberValue": 1234,
            "value": 1234
        }))
        .unwrap();

        let expr = from_wire(&wire).unwrap().unwrap();
        assert_eq!(expr.normalize(), "name@dest EQUALS 1234");
    }

    #[test]
    fn integers_are_sent_as_json_integers() {
        let wire = to_wire(&parse("call.count GREATER_THAN 9007199254740993").unwrap());
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains(r#""numberValue":9007199254740993"#), "{}", json);
        assert!(json.contains(r#""value":9007199254740993"#), "{}", json);

        let back: TagFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(
            normalized_from_wire(Some(&back)).unwrap().as_deref(),
            Some("call.count GREATER_THAN 9007199254740993")
        );
    }

    #[test]
    fn decimals_travel_as_json_floats() {
        let wire = to_wire(&parse("call.latency LESS_THAN 2.5").unwrap());
        assert_eq!(serde_json::to_value(&wire).unwrap()["numberValue"], json!(2.5));
    }

    #[test]
    fn logical_expression_maps_to_nested_elements() {
        let expr = parse("a EQUALS 'x' AND (b@src NOT_EMPTY OR c:k EQUALS 'v')").unwrap();
        let wire = to_wire(&expr);

        assert_eq!(wire.element_type, "EXPRESSION");
        assert_eq!(wire.logical_operator.as_deref(), Some("AND"));
        assert_eq!(wire.elements.len(), 2);

        let or = &wire.elements[1];
        assert_eq!(or.logical_operator.as_deref(), Some("OR"));
        assert_eq!(or.elements[0].entity.as_deref(), Some("SOURCE"));
        assert_eq!(or.elements[0].operator.as_deref(), Some("NOT_EMPTY"));
        assert_eq!(or.elements[1].key.as_deref(), Some("k"));
        assert_eq!(or.elements[1].string_value.as_deref(), Some("k=v"));

        assert_eq!(from_wire(&wire).unwrap(), Some(expr));
    }

    #[test]
    fn wire_json_uses_platform_field_names() {
        let wire = to_wire(&parse("call.erroneous EQUALS true").unwrap());
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "TAG_FILTER",
                "name": "call.erroneous",
                "entity": "NOT_APPLICABLE",
                "operator": "EQUALS",
                "booleanValue": true,
                "value": true
            })
        );
    }

    #[test]
    fn empty_expression_is_no_filter() {
        let wire = TagFilter::expression("AND", Vec::new());
        assert_eq!(from_wire(&wire).unwrap(), None);
        assert_eq!(normalized_from_wire(Some(&wire)).unwrap(), None);
        assert_eq!(wire_from_text(Some("  ")).unwrap(), None);
    }

    #[test]
    fn single_element_expression_collapses() {
        let inner = to_wire(&parse("a EQUALS 'x'").unwrap());
        let wire = TagFilter::expression("OR", vec![inner]);
        assert_eq!(
            normalized_from_wire(Some(&wire)).unwrap().as_deref(),
            Some("a EQUALS 'x'")
        );
    }

    #[test]
    fn unknown_element_type_is_unsupported() {
        let wire: TagFilter = serde_json::from_value(json!({"type": "SCRIPT"})).unwrap();
        assert_eq!(
            from_wire(&wire),
            Err(TagFilterError::UnsupportedNode {
                node_type: "SCRIPT".to_string()
            })
        );
    }

    #[test]
    fn key_value_prefix_is_stripped_when_value_missing() {
        let mut wire = TagFilter::tag("agent.tag", "NOT_APPLICABLE", "EQUALS");
        wire.key = Some("env".to_string());
        wire.string_value = Some("env=prod".to_string());

        let expr = from_wire(&wire).unwrap().unwrap();
        assert_eq!(expr.normalize(), "agent.tag:env EQUALS 'prod'");
    }
}
