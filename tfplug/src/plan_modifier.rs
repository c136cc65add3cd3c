use crate::types::{AttributePath, Diagnostics, Value};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Value,
    pub plan: Value,
    pub config: Value,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Value,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Trait for adjusting the planned value of a single attribute
///
/// Plan modifiers run after defaults have been applied and computed
/// attributes have been marked unknown. They can:
/// - Replace the planned value
/// - Mark the attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Keeps the prior state value when the planned value is unknown
///
/// Used on computed attributes whose value never changes after creation,
/// such as Platform assigned identifiers.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = if request.plan.is_unknown() && !request.state.is_null() {
            request.state
        } else {
            request.plan
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Marks the resource for replacement whenever the attribute changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be replaced.".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !request.state.is_null()
            && !request.plan.is_unknown()
            && request.plan != request.state;

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(state: Value, plan: Value) -> PlanModifyRequest {
        PlanModifyRequest {
            state,
            plan,
            config: Value::Null,
            path: AttributePath::new("id"),
        }
    }

    #[test]
    fn use_state_for_unknown_restores_prior_value() {
        let resp = UseStateForUnknown.modify_plan(request(Value::from("abc"), Value::Unknown));
        assert_eq!(resp.plan_value, Value::from("abc"));
    }

    #[test]
    fn use_state_for_unknown_keeps_unknown_on_create() {
        let resp = UseStateForUnknown.modify_plan(request(Value::Null, Value::Unknown));
        assert!(resp.plan_value.is_unknown());
    }

    #[test]
    fn requires_replace_only_on_change() {
        let same = RequiresReplace.modify_plan(request(Value::from("a"), Value::from("a")));
        let changed = RequiresReplace.modify_plan(request(Value::from("a"), Value::from("b")));
        let created = RequiresReplace.modify_plan(request(Value::Null, Value::from("b")));

        assert!(!same.requires_replace);
        assert!(changed.requires_replace);
        assert!(!created.requires_replace);
    }
}
