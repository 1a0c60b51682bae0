//! Schema building shorthands

use std::collections::HashMap;
use tf_provider::schema::NestedBlock;
use tf_provider::{Attribute, AttributeConstraint, AttributeType, Block, Description, Schema};

fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &'static str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn required(attr_type: AttributeType, description: &'static str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Required, description)
}

pub fn optional(attr_type: AttributeType, description: &'static str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Optional, description)
}

pub fn computed(attr_type: AttributeType, description: &'static str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Computed, description)
}

pub fn optional_computed(attr_type: AttributeType, description: &'static str) -> Attribute {
    attribute(attr_type, AttributeConstraint::OptionalComputed, description)
}

pub fn sensitive(attribute: Attribute) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute
    }
}

pub fn string_set() -> AttributeType {
    AttributeType::Set(AttributeType::String.into())
}

pub fn string_map() -> AttributeType {
    AttributeType::Map(AttributeType::String.into())
}

/// The computed `id` every resource carries
pub fn id_attribute() -> Attribute {
    computed(AttributeType::String, "Identifier of the object")
}

/// Optional operation timeouts, e.g. `timeouts { create = "10m" }`
pub fn timeouts_block() -> NestedBlock {
    NestedBlock::List(Block {
        description: Description::plain("Operation timeouts"),
        attributes: ["create", "update", "delete"]
            .into_iter()
            .map(|op| {
                (
                    op.to_string(),
                    optional(AttributeType::String, "Duration such as \"30s\", \"10m\" or \"1.5h\""),
                )
            })
            .collect(),
        ..Default::default()
    })
}

pub fn resource_schema(
    description: &'static str,
    attributes: HashMap<String, Attribute>,
    blocks: HashMap<String, NestedBlock>,
) -> Schema {
    Schema {
        version: 1,
        block: Block {
            version: 1,
            description: Description::plain(description),
            attributes,
            blocks,
            ..Default::default()
        },
    }
}
