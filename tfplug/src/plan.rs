//! Schema driven validation and planning
//!
//! Every resource gets the same treatment before its own hooks run:
//! configuration is checked against the schema (required attributes,
//! validators, exactly-one-of groups, block counts) and the proposed new
//! state is turned into a plan by applying defaults, marking computed
//! attributes unknown and running attribute plan modifiers.

use crate::plan_modifier::PlanModifyRequest;
use crate::schema::{Block, NestingMode};
use crate::types::{AttributePath, Diagnostics, Value};

/// Check a configuration value against a block
pub fn validate_config(
    block: &Block,
    config: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    if !config.is_known() {
        return;
    }

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = config.get(&attr.name);

        if value.is_null() {
            if attr.required {
                diags.add_attribute_error(
                    &attr_path,
                    "Missing required argument",
                    format!(
                        "The argument \"{}\" is required, but no definition was found.",
                        attr.name
                    ),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required && value.is_known() {
            diags.add_attribute_error(
                &attr_path,
                "Invalid Configuration for Read-Only Attribute",
                format!("Cannot set value for attribute \"{}\" as it is computed only.", attr.name),
            );
            continue;
        }

        if attr.deprecated {
            diags.add_attribute_warning(
                &attr_path,
                "Argument is deprecated",
                format!(
                    "The argument \"{}\" is deprecated and will be removed in a future release.",
                    attr.name
                ),
            );
        }

        if value.is_wholly_known() {
            for validator in &attr.validators {
                validator.validate(value, &attr_path, diags);
            }
        }
    }

    for nested in &block.blocks {
        let block_path = path.clone().attribute(&nested.type_name);
        let value = config.get(&nested.type_name);

        match nested.nesting {
            NestingMode::Single => {
                if value.is_known() {
                    validate_config(&nested.block, value, &block_path, diags);
                } else if nested.min_items > 0 && value.is_null() {
                    diags.add_attribute_error(
                        &block_path,
                        "Missing required block",
                        format!("A block \"{}\" is required.", nested.type_name),
                    );
                }
            }
            NestingMode::List | NestingMode::Set => {
                if value.is_unknown() {
                    continue;
                }
                let items = value.as_list().unwrap_or(&[]);
                let count = items.len() as i64;
                if nested.min_items > 0 && count < nested.min_items {
                    diags.add_attribute_error(
                        &block_path,
                        "Insufficient blocks",
                        format!(
                            "At least {} \"{}\" blocks are required.",
                            nested.min_items, nested.type_name
                        ),
                    );
                }
                if nested.max_items > 0 && count > nested.max_items {
                    diags.add_attribute_error(
                        &block_path,
                        "Too many blocks",
                        format!(
                            "No more than {} \"{}\" blocks are allowed.",
                            nested.max_items, nested.type_name
                        ),
                    );
                }
                for (idx, item) in items.iter().enumerate() {
                    let item_path = block_path.clone().index(idx as i64);
                    validate_config(&nested.block, item, &item_path, diags);
                }
            }
        }
    }

    for group in &block.exactly_one_of {
        let mut unknown = false;
        let set: Vec<&String> = group
            .iter()
            .filter(|name| {
                let v = config.get(name);
                unknown |= v.is_unknown();
                is_set(v)
            })
            .collect();
        if unknown {
            continue;
        }
        if set.len() != 1 {
            let names = group
                .iter()
                .map(|n| format!("{}", path.clone().attribute(n)))
                .collect::<Vec<_>>()
                .join(",");
            let target = set
                .first()
                .map(|n| path.clone().attribute(n))
                .unwrap_or_else(|| path.clone());
            diags.add_attribute_error(
                &target,
                "Invalid combination of arguments",
                format!("exactly one of `{}` must be specified", names),
            );
        }
    }
}

/// A nested block list counts as set only when it has elements
fn is_set(value: &Value) -> bool {
    match value {
        Value::List(items) | Value::Set(items) => !items.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// Outcome of planning a resource change
#[derive(Debug, Clone, Default)]
pub struct PlannedChange {
    pub planned_state: Value,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

/// Compute the planned state from the host's proposal
///
/// A null proposal plans a destroy. Computed attributes the configuration
/// leaves unset become unknown only when something else in the resource
/// changes; otherwise their prior values carry through.
pub fn plan_resource_change(
    block: &Block,
    prior: &Value,
    proposed: &Value,
    config: &Value,
) -> PlannedChange {
    let mut change = PlannedChange::default();

    if proposed.is_null() {
        change.planned_state = Value::Null;
        return change;
    }

    let mut planned = proposed.clone();
    apply_defaults(block, config, &mut planned);

    let changed = prior.is_null() || &planned != prior;
    if changed {
        mark_computed_unknown(block, config, &mut planned);
    }

    run_plan_modifiers(
        block,
        prior,
        config,
        &mut planned,
        &AttributePath::root(),
        &mut change,
    );

    change.planned_state = planned;
    change
}

fn apply_defaults(block: &Block, config: &Value, planned: &mut Value) {
    if !planned.is_known() {
        return;
    }
    for attr in &block.attributes {
        if let Some(default) = &attr.default {
            if config.get(&attr.name).is_null() {
                let value = default.default_value(&AttributePath::new(&attr.name));
                planned.set(attr.name.clone(), value);
            }
        }
    }
    for nested in &block.blocks {
        let cfg = config.get(&nested.type_name);
        with_nested(planned, &nested.type_name, nested.nesting, |idx, item| {
            let item_config = nested_config(cfg, nested.nesting, idx);
            apply_defaults(&nested.block, item_config, item);
        });
    }
}

fn mark_computed_unknown(block: &Block, config: &Value, planned: &mut Value) {
    if !planned.is_known() {
        return;
    }
    for attr in &block.attributes {
        if attr.computed && attr.default.is_none() && config.get(&attr.name).is_null() {
            planned.set(attr.name.clone(), Value::Unknown);
        }
    }
    for nested in &block.blocks {
        let cfg = config.get(&nested.type_name);
        with_nested(planned, &nested.type_name, nested.nesting, |idx, item| {
            let item_config = nested_config(cfg, nested.nesting, idx);
            mark_computed_unknown(&nested.block, item_config, item);
        });
    }
}

fn run_plan_modifiers(
    block: &Block,
    prior: &Value,
    config: &Value,
    planned: &mut Value,
    path: &AttributePath,
    change: &mut PlannedChange,
) {
    if !planned.is_known() {
        return;
    }
    for attr in &block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let attr_path = path.clone().attribute(&attr.name);
        let mut value = planned.get(&attr.name).clone();
        for modifier in &attr.plan_modifiers {
            let resp = modifier.modify_plan(PlanModifyRequest {
                state: prior.get(&attr.name).clone(),
                plan: value,
                config: config.get(&attr.name).clone(),
                path: attr_path.clone(),
            });
            value = resp.plan_value;
            change.diagnostics.extend(resp.diagnostics);
            if resp.requires_replace && !change.requires_replace.contains(&attr_path) {
                change.requires_replace.push(attr_path.clone());
            }
        }
        planned.set(attr.name.clone(), value);
    }
    for nested in &block.blocks {
        let cfg = config.get(&nested.type_name);
        let prior_nested = prior.get(&nested.type_name);
        let block_path = path.clone().attribute(&nested.type_name);
        with_nested(planned, &nested.type_name, nested.nesting, |idx, item| {
            let item_config = nested_config(cfg, nested.nesting, idx);
            let item_prior = nested_config(prior_nested, nested.nesting, idx);
            let item_path = match idx {
                Some(i) => block_path.clone().index(i as i64),
                None => block_path.clone(),
            };
            run_plan_modifiers(&nested.block, item_prior, item_config, item, &item_path, change);
        });
    }
}

/// Element of a nested block value aligned with the planned element
fn nested_config(value: &Value, nesting: NestingMode, idx: Option<usize>) -> &Value {
    match (nesting, idx) {
        (NestingMode::Single, _) => value,
        (_, Some(i)) => value
            .as_list()
            .and_then(|items| items.get(i))
            .unwrap_or(&Value::Null),
        _ => &Value::Null,
    }
}

fn with_nested<F>(planned: &mut Value, name: &str, nesting: NestingMode, mut f: F)
where
    F: FnMut(Option<usize>, &mut Value),
{
    let Value::Object(fields) = planned else {
        return;
    };
    let Some(nested) = fields.get_mut(name) else {
        return;
    };
    match (nesting, nested) {
        (NestingMode::Single, item) => f(None, item),
        (_, Value::List(items) | Value::Set(items)) => {
            for (idx, item) in items.iter_mut().enumerate() {
                f(Some(idx), item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplace, UseStateForUnknown};
    use crate::schema::{AttributeBuilder, BlockBuilder, NestedBlock};
    use crate::validator::OneOf;

    fn block() -> Block {
        let email = BlockBuilder::new()
            .attribute(AttributeBuilder::string_set("emails").required().build())
            .build();
        let slack = BlockBuilder::new()
            .attribute(AttributeBuilder::string("webhook_url").required().build())
            .build();
        BlockBuilder::new()
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(
                AttributeBuilder::string("scope")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("DEFAULT"))
                    .validator(OneOf::new(["DEFAULT", "ALL"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("kind")
                    .optional()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .block(NestedBlock::list("email", email).max_items(1))
            .block(NestedBlock::list("slack", slack).max_items(1))
            .exactly_one_of(&["email", "slack"])
            .build()
    }

    fn config(fields: Vec<(&str, Value)>) -> Value {
        let mut value = Value::object([
            ("id", Value::Null),
            ("name", Value::Null),
            ("scope", Value::Null),
            ("kind", Value::Null),
            ("email", Value::List(vec![])),
            ("slack", Value::List(vec![])),
        ]);
        for (k, v) in fields {
            value.set(k, v);
        }
        value
    }

    fn email_block() -> Value {
        Value::List(vec![Value::object([("emails", Value::string_set(["a@x"]))])])
    }

    #[test]
    fn missing_required_attribute_is_reported_on_its_path() {
        let mut diags = Diagnostics::new();
        let cfg = config(vec![("email", email_block())]);
        validate_config(&block(), &cfg, &AttributePath::root(), &mut diags);

        let err = diags.errors().next().unwrap();
        assert_eq!(err.summary, "Missing required argument");
        assert_eq!(err.attribute, Some(AttributePath::new("name")));
    }

    #[test]
    fn exactly_one_of_rejects_two_blocks() {
        let slack = Value::List(vec![Value::object([(
            "webhook_url",
            Value::from("https://hook"),
        )])]);
        let cfg = config(vec![
            ("name", Value::from("ops")),
            ("email", email_block()),
            ("slack", slack),
        ]);
        let mut diags = Diagnostics::new();
        validate_config(&block(), &cfg, &AttributePath::root(), &mut diags);

        assert!(diags
            .errors()
            .any(|d| d.summary == "Invalid combination of arguments"));
    }

    #[test]
    fn exactly_one_of_rejects_none() {
        let mut diags = Diagnostics::new();
        let cfg = config(vec![("name", Value::from("ops"))]);
        validate_config(&block(), &cfg, &AttributePath::root(), &mut diags);
        assert!(diags.has_errors());
    }

    #[test]
    fn validators_skip_unknown_values() {
        let cfg = config(vec![
            ("name", Value::from("ops")),
            ("scope", Value::Unknown),
            ("email", email_block()),
        ]);
        let mut diags = Diagnostics::new();
        validate_config(&block(), &cfg, &AttributePath::root(), &mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn create_plan_applies_defaults_and_unknowns() {
        let cfg = config(vec![("name", Value::from("ops")), ("email", email_block())]);
        let change = plan_resource_change(&block(), &Value::Null, &cfg, &cfg);

        assert!(change.planned_state.get("id").is_unknown());
        assert_eq!(change.planned_state.get("scope"), &Value::from("DEFAULT"));
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn unchanged_plan_keeps_prior_state() {
        let cfg = config(vec![("name", Value::from("ops")), ("email", email_block())]);
        let mut prior = cfg.clone();
        prior.set("id", Value::from("c1"));
        prior.set("scope", Value::from("DEFAULT"));

        let change = plan_resource_change(&block(), &prior, &prior, &cfg);
        assert_eq!(change.planned_state, prior);
    }

    #[test]
    fn update_plan_keeps_id_and_flags_replacement() {
        let cfg = config(vec![
            ("name", Value::from("ops")),
            ("kind", Value::from("new")),
            ("email", email_block()),
        ]);
        let mut prior = cfg.clone();
        prior.set("id", Value::from("c1"));
        prior.set("scope", Value::from("DEFAULT"));
        prior.set("kind", Value::from("old"));

        let mut proposed = cfg.clone();
        proposed.set("id", Value::from("c1"));

        let change = plan_resource_change(&block(), &prior, &proposed, &cfg);
        assert_eq!(change.planned_state.get("id"), &Value::from("c1"));
        assert_eq!(change.requires_replace, vec![AttributePath::new("kind")]);
    }

    #[test]
    fn destroy_plans_null() {
        let prior = config(vec![("name", Value::from("ops"))]);
        let change = plan_resource_change(&block(), &prior, &Value::Null, &Value::Null);
        assert!(change.planned_state.is_null());
    }
}
