//! Schema types and builders for tfplug
//!
//! A schema describes the attribute tree of a provider, resource or data
//! source: attributes with their types and flags, nested blocks, and the
//! behaviour hooks (validators, defaults, plan modifiers) the planner runs.

use crate::attribute_type::AttributeType;
use crate::defaults::AttributeDefault;
use crate::plan_modifier::PlanModifier;
use crate::validator::Validator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Schema is returned by providers, resources and data sources
/// Version is used for state migration
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    /// Object type of a value conforming to this schema
    pub fn value_type(&self) -> AttributeType {
        self.block.implied_type()
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
    /// Groups of attribute or block names of which exactly one must be set
    pub exactly_one_of: Vec<Vec<String>>,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.blocks.iter().find(|b| b.type_name == name)
    }

    pub fn implied_type(&self) -> AttributeType {
        let mut fields = BTreeMap::new();
        for attr in &self.attributes {
            fields.insert(attr.name.clone(), attr.r#type.clone());
        }
        for nested in &self.blocks {
            let object = nested.block.implied_type();
            let ty = match nested.nesting {
                NestingMode::Single => object,
                NestingMode::List => AttributeType::list(object),
                NestingMode::Set => AttributeType::set(object),
            };
            fields.insert(nested.type_name.clone(), ty);
        }
        AttributeType::Object(fields)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn AttributeDefault>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("deprecated", &self.deprecated)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    pub fn single(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::Single)
    }

    pub fn list(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::List)
    }

    pub fn set(type_name: &str, block: Block) -> Self {
        Self::with_nesting(type_name, block, NestingMode::Set)
    }

    fn with_nesting(type_name: &str, block: Block, nesting: NestingMode) -> Self {
        Self {
            type_name: type_name.to_string(),
            block,
            nesting,
            min_items: 0,
            max_items: 0,
        }
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.max_items = max;
        self
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, AttributeType::Int)
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, AttributeType::Float)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn string_list(name: &str) -> Self {
        Self::new(name, AttributeType::list(AttributeType::String))
    }

    pub fn string_set(name: &str) -> Self {
        Self::new(name, AttributeType::set(AttributeType::String))
    }

    pub fn string_map(name: &str) -> Self {
        Self::new(name, AttributeType::map(AttributeType::String))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Value used when the configuration leaves the attribute null
    pub fn default(mut self, default: impl AttributeDefault + 'static) -> Self {
        self.attribute.default = Some(Arc::new(default));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// BlockBuilder assembles a block out of attributes and nested blocks
#[derive(Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block.blocks.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.block.deprecated = true;
        self
    }

    /// Require exactly one of the named attributes or blocks to be set
    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.block
            .exactly_one_of
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
#[derive(Default)]
pub struct SchemaBuilder {
    version: i64,
    block: BlockBuilder,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block = self.block.attribute(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block = self.block.block(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block = self.block.description(desc);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.block = self.block.deprecated();
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.block = self.block.exactly_one_of(names);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            block: self.block.build(),
        }
    }
}
