//! nom grammar for tag filter expressions
//!
//! ```text
//! expression := or
//! or         := and ("OR" and)*
//! and        := primary ("AND" primary)*
//! primary    := "(" or ")" | tag
//! tag        := identifier [":" identifier] ["@" ("src" | "dest" | "na")] operator [literal]
//! literal    := 'single' | "double" | number | TRUE | FALSE
//! ```
//!
//! Keywords and operators are case insensitive. Positions in errors are byte
//! offsets into the input.

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{cut, map, map_opt, not, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{
    ComparisonOperator, Entity, Expression, Literal, Number, TagExpression, TagFilterError,
    UnaryOperator,
};

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parse tree before operator/literal compatibility is checked
#[derive(Debug)]
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Tag(RawTag),
}

#[derive(Debug)]
struct RawTag {
    name: String,
    key: Option<String>,
    entity: Entity,
    predicate: RawPredicate,
}

#[derive(Debug, Clone)]
enum RawPredicate {
    Compare(ComparisonOperator, RawLiteral),
    Unary(UnaryOperator),
}

#[derive(Debug, Clone)]
enum RawLiteral {
    Text(String),
    Bool(bool),
    /// Digits as written
    Number(String),
}

#[derive(Debug, Clone, Copy)]
enum Operator {
    Compare(ComparisonOperator),
    Unary(UnaryOperator),
}

pub(super) fn parse(text: &str) -> Result<Expression, TagFilterError> {
    match delimited(multispace0, or_expr, multispace0)(text) {
        Ok(("", node)) => build(node),
        Ok((rest, _)) => Err(TagFilterError::SyntaxError {
            position: text.len() - rest.len(),
            expected: "AND, OR or end of expression".to_string(),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(text, e)),
        Err(nom::Err::Incomplete(_)) => Err(TagFilterError::SyntaxError {
            position: text.len(),
            expected: "more input".to_string(),
        }),
    }
}

fn syntax_error(text: &str, error: VerboseError<&str>) -> TagFilterError {
    let labelled = error.errors.iter().find_map(|(rest, kind)| match kind {
        VerboseErrorKind::Context(label) => Some((*rest, label.to_string())),
        _ => None,
    });
    let (rest, expected) = match labelled {
        Some(found) => found,
        None => match error.errors.first() {
            Some((rest, VerboseErrorKind::Char(c))) => (*rest, format!("'{}'", c)),
            Some((rest, _)) => (*rest, "tag filter expression".to_string()),
            None => (text, "tag filter expression".to_string()),
        },
    };
    TagFilterError::SyntaxError {
        position: text.len() - rest.len(),
        expected,
    }
}

fn build(node: Node) -> Result<Expression, TagFilterError> {
    match node {
        Node::Or(nodes) => Ok(Expression::or(build_all(nodes)?)),
        Node::And(nodes) => Ok(Expression::and(build_all(nodes)?)),
        Node::Tag(tag) => {
            let expr = match tag.predicate {
                RawPredicate::Compare(operator, raw) => {
                    let literal = match raw {
                        RawLiteral::Text(text) => Literal::String(text),
                        RawLiteral::Bool(b) => Literal::Bool(b),
                        RawLiteral::Number(digits) if tag.key.is_some() => {
                            Literal::String(digits)
                        }
                        RawLiteral::Number(digits) => Literal::Number(Number::parse(&digits)?),
                    };
                    TagExpression::compare(tag.name, tag.key, tag.entity, operator, literal)?
                }
                RawPredicate::Unary(operator) => {
                    TagExpression::unary(tag.name, tag.key, tag.entity, operator)
                }
            };
            Ok(Expression::Tag(expr))
        }
    }
}

fn build_all(nodes: Vec<Node>) -> Result<Vec<Expression>, TagFilterError> {
    nodes.into_iter().map(build).collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/')
}

fn identifier(input: &str) -> ParseResult<'_, &str> {
    take_while1(is_ident_char)(input)
}

fn separator(input: &str) -> ParseResult<'_, &str> {
    multispace1(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

fn or_expr(input: &str) -> ParseResult<'_, Node> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("OR"), multispace0),
        cut(and_expr),
    ))(input)?;
    Ok((input, chain(first, rest, Node::Or)))
}

fn and_expr(input: &str) -> ParseResult<'_, Node> {
    let (input, first) = primary(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("AND"), multispace0),
        cut(primary),
    ))(input)?;
    Ok((input, chain(first, rest, Node::And)))
}

fn chain(first: Node, rest: Vec<Node>, combine: fn(Vec<Node>) -> Node) -> Node {
    if rest.is_empty() {
        return first;
    }
    let mut operands = Vec::with_capacity(rest.len() + 1);
    operands.push(first);
    operands.extend(rest);
    combine(operands)
}

fn primary(input: &str) -> ParseResult<'_, Node> {
    alt((
        preceded(
            char('('),
            cut(terminated(
                delimited(multispace0, or_expr, multispace0),
                context("closing parenthesis", char(')')),
            )),
        ),
        tag_expression,
    ))(input)
}

fn tag_expression(input: &str) -> ParseResult<'_, Node> {
    let (input, name) = context("tag name", identifier)(input)?;
    let (input, key) = opt(preceded(char(':'), cut(context("tag key", identifier))))(input)?;
    let (input, entity) = opt(preceded(
        char('@'),
        cut(context("entity (src, dest or na)", entity)),
    ))(input)?;
    let (input, _) = cut(context("operator", separator))(input)?;
    let (input, operator) = cut(context("operator", operator))(input)?;

    let (input, predicate) = match operator {
        Operator::Compare(op) => {
            let (input, literal) =
                cut(context("literal value", preceded(multispace0, literal)))(input)?;
            (input, RawPredicate::Compare(op, literal))
        }
        Operator::Unary(op) => (input, RawPredicate::Unary(op)),
    };

    Ok((
        input,
        Node::Tag(RawTag {
            name: name.to_string(),
            key: key.map(str::to_string),
            entity: entity.unwrap_or(Entity::NotApplicable),
            predicate,
        }),
    ))
}

fn entity(input: &str) -> ParseResult<'_, Entity> {
    terminated(
        alt((
            value(Entity::Destination, tag_no_case("dest")),
            value(Entity::Source, tag_no_case("src")),
            value(Entity::NotApplicable, tag_no_case("na")),
        )),
        not(satisfy(is_ident_char)),
    )(input)
}

fn operator(input: &str) -> ParseResult<'_, Operator> {
    map_opt(identifier, |word: &str| {
        ComparisonOperator::from_keyword(word)
            .map(Operator::Compare)
            .or_else(|| UnaryOperator::from_keyword(word).map(Operator::Unary))
    })(input)
}

fn literal(input: &str) -> ParseResult<'_, RawLiteral> {
    alt((
        map(quoted('\''), RawLiteral::Text),
        map(quoted('"'), RawLiteral::Text),
        map(boolean, RawLiteral::Bool),
        map(
            recognize(tuple((
                opt(char('-')),
                digit1,
                opt(pair(char('.'), digit1)),
            ))),
            |digits: &str| RawLiteral::Number(digits.to_string()),
        ),
    ))(input)
}

fn boolean(input: &str) -> ParseResult<'_, bool> {
    alt((
        value(true, keyword("TRUE")),
        value(false, keyword("FALSE")),
    ))(input)
}

/// Quoted string; `\'`, `\"` and `\\` are escapes, any other backslash is literal
fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> ParseResult<'a, String> {
    move |input: &'a str| {
        let (mut rest, _) = char::<&'a str, VerboseError<&'a str>>(quote)(input)?;
        let mut text = String::new();
        loop {
            let mut chars = rest.chars();
            match chars.next() {
                None => {
                    return Err(nom::Err::Failure(VerboseError {
                        errors: vec![(rest, VerboseErrorKind::Context("closing quote"))],
                    }))
                }
                Some(c) if c == quote => return Ok((chars.as_str(), text)),
                Some('\\') => match chars.next() {
                    Some(escaped @ ('\'' | '"' | '\\')) => text.push(escaped),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => {
                        return Err(nom::Err::Failure(VerboseError {
                            errors: vec![(rest, VerboseErrorKind::Context("closing quote"))],
                        }))
                    }
                },
                Some(c) => text.push(c),
            }
            rest = chars.as_str();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax(text: &str) -> (usize, String) {
        match parse(text) {
            Err(TagFilterError::SyntaxError { position, expected }) => (position, expected),
            other => panic!("expected syntax error for {:?}, got {:?}", text, other),
        }
    }

    #[test]
    fn parses_simple_comparison() {
        let expr = parse("service.name EQUALS 'shop'").unwrap();
        assert_eq!(
            expr,
            Expression::Tag(TagExpression {
                name: "service.name".to_string(),
                key: None,
                entity: Entity::NotApplicable,
                predicate: super::super::Predicate::Compare {
                    operator: ComparisonOperator::Equals,
                    value: Literal::String("shop".to_string()),
                },
            })
        );
    }

    #[test]
    fn parses_literals() {
        assert_eq!(
            parse("name@dest EQUALS 1234").unwrap().normalize(),
            "name@dest EQUALS 1234"
        );
        assert_eq!(
            parse("call.latency greater_than -12.5").unwrap().normalize(),
            "call.latency GREATER_THAN -12.5"
        );
        assert_eq!(
            parse("call.erroneous@src EQUALS true").unwrap().normalize(),
            "call.erroneous@src EQUALS TRUE"
        );
    }

    #[test]
    fn number_digits_are_kept_for_key_value_tags() {
        let expr = parse("kubernetes.label:build EQUALS 0042").unwrap();
        match expr {
            Expression::Tag(TagExpression { predicate, .. }) => assert_eq!(
                predicate,
                super::super::Predicate::Compare {
                    operator: ComparisonOperator::Equals,
                    value: Literal::String("0042".to_string()),
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_unary_operators() {
        let expr = parse("agent.tag:env not_blank").unwrap();
        assert_eq!(expr.normalize(), "agent.tag:env NOT_BLANK");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a EQUALS 1 OR b EQUALS 2 AND c EQUALS 3").unwrap();
        match expr {
            Expression::Or(operands) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], Expression::And(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn keywords_need_word_boundary() {
        let (position, expected) = syntax("a EQUALS 1 ORDER b EQUALS 2");
        assert_eq!(position, 11);
        assert_eq!(expected, "AND, OR or end of expression");
    }

    #[test]
    fn reports_missing_operator() {
        assert_eq!(syntax("name"), (4, "operator".to_string()));
        assert_eq!(syntax("name FOO 'x'"), (5, "operator".to_string()));
    }

    #[test]
    fn reports_missing_literal() {
        assert_eq!(syntax("name EQUALS"), (11, "literal value".to_string()));
    }

    #[test]
    fn reports_empty_input_and_dangling_and() {
        assert_eq!(syntax(""), (0, "tag name".to_string()));
        assert_eq!(syntax("a EQUALS 1 AND"), (14, "tag name".to_string()));
    }

    #[test]
    fn reports_unbalanced_parenthesis_and_quote() {
        assert_eq!(
            syntax("(a EQUALS 1"),
            (11, "closing parenthesis".to_string())
        );
        assert_eq!(syntax("a EQUALS 'x"), (11, "closing quote".to_string()));
    }

    #[test]
    fn reports_unknown_entity() {
        assert_eq!(
            syntax("a@both EQUALS 1"),
            (2, "entity (src, dest or na)".to_string())
        );
    }
}
