//! Protocol buffer types for the Terraform plugin protocols
//!
//! Both protocol generations are compiled at build time by tonic_build:
//! `tfplugin5` (legacy) and `tfplugin6` (current). Their message names
//! overlap with framework types, so always refer to them through the
//! module path:
//!
//! ```rust,ignore
//! use tfplug::proto::tfplugin6;
//!
//! let request = tfplugin6::get_provider_schema::Request::default();
//! let dynamic = tfplugin6::DynamicValue::default();
//! ```
//!
//! Nested messages live in snake_case modules (`diagnostic::Severity`,
//! `attribute_path::step::Selector`) and the service traits are
//! `provider_server::Provider` in each module.

pub mod tfplugin5 {
    tonic::include_proto!("tfplugin5");
}

pub mod tfplugin6 {
    tonic::include_proto!("tfplugin6");
}
