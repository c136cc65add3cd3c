//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust. Providers implement
//! the [`Provider`], [`Resource`] and [`DataSource`] traits against dynamic
//! [`Value`] trees; the framework owns schema validation, plan computation and
//! both host plugin protocols (tfplugin5 and tfplugin6).

pub mod attribute_type;
pub mod codec;
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

pub mod data_source;
pub mod provider;
pub mod resource;

pub mod defaults;
pub mod plan;
pub mod plan_modifier;
pub mod validator;

pub mod grpc;
pub mod logging;
pub mod proto;
pub mod server;

pub use attribute_type::AttributeType;
pub use context::Context;
pub use data_source::{DataSource, DataSourceFactory};
pub use error::{Result, TfplugError};
pub use logging::{init_logging, try_init_logging};
pub use provider::{ProtocolVersion, Provider};
pub use resource::{Resource, ResourceFactory};
pub use schema::{AttributeBuilder, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
pub use server::{serve, serve_default, ServerConfig};
pub use types::{AttributePath, Diagnostic, DiagnosticSeverity, Diagnostics, Value};
