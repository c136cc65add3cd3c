//! instana_rbac_group

use tfplug::schema::Block;
use tfplug::validator::OneOf;
use tfplug::{AttributeBuilder, AttributePath, BlockBuilder, NestedBlock, SchemaBuilder, Value};

use super::{id_attribute, single_block, string_attribute};
use crate::api::models::group::{GroupMember, PermissionSet, ScopeBinding, GROUP_PERMISSIONS};
use crate::api::models::Group;
use crate::api::{Client, RestResource};
use crate::resourcehandle::{required_string, MappingError, ResourceHandle, ResourceMetaData};

pub const RESOURCE_NAME: &str = "instana_rbac_group";

pub const MEMBER: &str = "member";
pub const PERMISSION_SET: &str = "permission_set";

const APPLICATION_IDS: &str = "application_ids";
const INFRA_DFQ_FILTER: &str = "infra_dfq_filter";
const KUBERNETES_CLUSTER_UUIDS: &str = "kubernetes_cluster_uuids";
const KUBERNETES_NAMESPACE_UIDS: &str = "kubernetes_namespaces_uuids";
const MOBILE_APP_IDS: &str = "mobile_app_ids";
const WEBSITE_IDS: &str = "website_ids";
const PERMISSIONS: &str = "permissions";

#[derive(Default)]
pub struct RbacGroupResource;

fn member_block() -> Block {
    BlockBuilder::new()
        .description("Member of the group")
        .attribute(string_attribute("user_id", "Id of the user"))
        .attribute(
            AttributeBuilder::string("email")
                .optional()
                .description("Email address of the user")
                .build(),
        )
        .build()
}

fn permission_set_block() -> Block {
    let scope_set = |name: &str, description: &str| {
        AttributeBuilder::string_set(name)
            .optional()
            .description(description)
            .build()
    };
    BlockBuilder::new()
        .description("Scopes and permissions granted to the members")
        .attribute(scope_set(APPLICATION_IDS, "Applications the group may access"))
        .attribute(
            AttributeBuilder::string(INFRA_DFQ_FILTER)
                .optional()
                .description("Dynamic focus query limiting the infrastructure entities")
                .build(),
        )
        .attribute(scope_set(KUBERNETES_CLUSTER_UUIDS, "Kubernetes clusters the group may access"))
        .attribute(scope_set(
            KUBERNETES_NAMESPACE_UIDS,
            "Kubernetes namespaces the group may access",
        ))
        .attribute(scope_set(MOBILE_APP_IDS, "Mobile apps the group may access"))
        .attribute(scope_set(WEBSITE_IDS, "Websites the group may access"))
        .attribute(
            AttributeBuilder::string_set(PERMISSIONS)
                .optional()
                .validator(OneOf::new(GROUP_PERMISSIONS.iter().copied()))
                .description("Permissions granted to the members")
                .build(),
        )
        .build()
}

fn bindings(block: &Value, name: &str) -> Vec<ScopeBinding> {
    block
        .get_string_list(name)
        .into_iter()
        .map(|scope_id| ScopeBinding {
            scope_id,
            scope_role_id: None,
        })
        .collect()
}

fn binding_ids(bindings: &[ScopeBinding]) -> Value {
    Value::string_set_or_null(bindings.iter().map(|b| b.scope_id.clone()).collect())
}

fn members_from_state(state: &Value) -> Result<Vec<GroupMember>, MappingError> {
    state
        .get_blocks(MEMBER)
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let user_id = member.get_non_empty_string("user_id").ok_or_else(|| {
                MappingError::parse(
                    AttributePath::new(MEMBER).index(idx as i64).attribute("user_id"),
                    "user_id must be set",
                )
            })?;
            Ok(GroupMember {
                user_id,
                email: member.get_non_empty_string("email"),
            })
        })
        .collect()
}

fn permission_set_from_state(state: &Value) -> PermissionSet {
    let Some(block) = state.get_block(PERMISSION_SET) else {
        return PermissionSet::default();
    };
    PermissionSet {
        application_ids: bindings(block, APPLICATION_IDS),
        infra_dfq_filter: block
            .get_non_empty_string(INFRA_DFQ_FILTER)
            .map(|scope_id| ScopeBinding {
                scope_id,
                scope_role_id: None,
            }),
        kubernetes_cluster_uuids: bindings(block, KUBERNETES_CLUSTER_UUIDS),
        kubernetes_namespace_uids: bindings(block, KUBERNETES_NAMESPACE_UIDS),
        mobile_app_ids: bindings(block, MOBILE_APP_IDS),
        website_ids: bindings(block, WEBSITE_IDS),
        permissions: block.get_string_list(PERMISSIONS),
    }
}

fn permission_set_to_state(set: &PermissionSet) -> Value {
    if set.is_empty() {
        return Value::Null;
    }
    single_block([
        (APPLICATION_IDS, binding_ids(&set.application_ids)),
        (
            INFRA_DFQ_FILTER,
            Value::from(set.infra_dfq_filter.as_ref().map(|b| b.scope_id.clone())),
        ),
        (KUBERNETES_CLUSTER_UUIDS, binding_ids(&set.kubernetes_cluster_uuids)),
        (KUBERNETES_NAMESPACE_UIDS, binding_ids(&set.kubernetes_namespace_uids)),
        (MOBILE_APP_IDS, binding_ids(&set.mobile_app_ids)),
        (WEBSITE_IDS, binding_ids(&set.website_ids)),
        (PERMISSIONS, Value::string_set_or_null(set.permissions.clone())),
    ])
}

impl ResourceHandle for RbacGroupResource {
    type Object = Group;

    fn metadata(&self) -> ResourceMetaData {
        let schema = SchemaBuilder::new()
            .description("RBAC group granting permissions to its members")
            .attribute(id_attribute())
            .attribute(string_attribute("name", "Name of the group"))
            .block(NestedBlock::set(MEMBER, member_block()))
            .block(NestedBlock::list(PERMISSION_SET, permission_set_block()).max_items(1))
            .build();
        ResourceMetaData::new(RESOURCE_NAME, schema)
    }

    fn rest_resource(&self, client: &Client) -> RestResource<Group> {
        client.groups()
    }

    fn state_to_object(&self, state: &Value, _prior: &Value) -> Result<Group, MappingError> {
        Ok(Group {
            id: state.get_string("id").unwrap_or_default(),
            name: required_string(state, "name")?,
            members: members_from_state(state)?,
            permission_set: permission_set_from_state(state),
        })
    }

    fn object_to_state(&self, _state: &Value, group: &Group) -> Result<Value, MappingError> {
        let members = if group.members.is_empty() {
            Value::Null
        } else {
            Value::Set(
                group
                    .members
                    .iter()
                    .map(|m| {
                        Value::object([
                            ("user_id", Value::from(m.user_id.as_str())),
                            ("email", Value::from(m.email.clone())),
                        ])
                    })
                    .collect(),
            )
        };
        Ok(Value::object([
            ("id", Value::from(group.id.as_str())),
            ("name", Value::from(group.name.as_str())),
            (MEMBER, members),
            (PERMISSION_SET, permission_set_to_state(&group.permission_set)),
        ]))
    }
}
