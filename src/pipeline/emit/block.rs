use crate::config::ResourceTypes;
use crate::constants::ALL_PROTOCOLS_LITERAL;
use crate::error::{ImporterError, Result};
use crate::pipeline::emit::hcl::{HclBlock, HclValue};
use crate::pipeline::processing::derive::DerivedRule;
use crate::pipeline::processing::normalize::NormalizedGroup;
use crate::types::Protocol;

/// Renders groups and derived rules as Terraform resource blocks
pub struct BlockEmitter {
    resource_types: ResourceTypes,
}

impl BlockEmitter {
    pub fn new(resource_types: ResourceTypes) -> Self {
        Self { resource_types }
    }

    pub fn resource_types(&self) -> &ResourceTypes {
        &self.resource_types
    }

    /// `aws_security_group` block; description and tags only when present
    pub fn render_group(&self, group: &NormalizedGroup) -> Result<String> {
        if group.name.is_empty() {
            return Err(ImporterError::Render("group name is empty".to_string()));
        }

        let mut block = HclBlock::resource(&self.resource_types.group, &group.name)
            .string("name", &group.name)
            .opt_string("description", group.description.as_deref())
            .opt_string("vpc_id", group.vpc_id.as_deref());

        if !group.tags.is_empty() {
            let entries = group
                .tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            block = block.attr("tags", HclValue::Map(entries));
        }

        Ok(block.render())
    }

    /// Ingress/egress rule block
    pub fn render_rule(&self, rule: &DerivedRule) -> Result<String> {
        if rule.identifier.is_empty() {
            return Err(ImporterError::Render("rule identifier is empty".to_string()));
        }

        let resource_type = self.resource_types.for_direction(rule.direction);
        let mut block = HclBlock::resource(resource_type, &rule.identifier)
            .string("security_group_id", &rule.group_id)
            .attr("ip_protocol", Self::protocol_value(rule.protocol.as_ref()));

        if let Some((from, to)) = rule.port_range {
            block = block.number("from_port", from as i64).number("to_port", to as i64);
        }

        if let Some(address) = &rule.address {
            block = block.string(address.attribute_name(), address.value());
        }

        if !rule.annotation.is_empty() {
            block = block.string("description", &rule.annotation);
        }

        Ok(block.render())
    }

    // A rule without a protocol still has to declare one; it is written as all
    // protocols while the derived rule itself stays protocol-less for matching.
    fn protocol_value(protocol: Option<&Protocol>) -> HclValue {
        match protocol {
            Some(Protocol::Named(name)) => HclValue::String(name.clone()),
            Some(Protocol::All) | None => HclValue::Literal(ALL_PROTOCOLS_LITERAL.to_string()),
        }
    }
}

impl Default for BlockEmitter {
    fn default() -> Self {
        Self::new(ResourceTypes::default())
    }
}
