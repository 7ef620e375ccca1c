use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::constants::{self, ALL_PROTOCOLS_LITERAL, UNRESTRICTED_PORT};

/// One row of the security group export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "GroupName")]
    pub group_name: String,
    #[serde(rename = "VpcId", default)]
    pub vpc_id: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    /// Raw `key:value, key:value` tag string
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
}

/// One row of the security group rule export
///
/// Ports stay textual here: spreadsheet exports write them as `22`, `22.0` or
/// leave them blank, and the normalizer decides what each of those means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleInputRecord {
    #[serde(rename = "GroupName")]
    pub group_name: String,
    #[serde(rename = "GroupId")]
    pub group_id: String,
    /// Direction text, e.g. "Inbound rule" or "egress"
    #[serde(rename = "Type")]
    pub direction: String,
    #[serde(rename = "FromPort", default)]
    pub from_port: Option<String>,
    #[serde(rename = "ToPort", default)]
    pub to_port: Option<String>,
    #[serde(rename = "IpProtocol", default)]
    pub ip_protocol: Option<String>,
    #[serde(rename = "IpRanges", default)]
    pub ip_ranges: Option<String>,
    #[serde(rename = "UserIdGroupPairs", default)]
    pub user_id_group_pairs: Option<String>,
    #[serde(rename = "PrefixListIds", default)]
    pub prefix_list_ids: Option<String>,
}

/// Traffic direction of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    /// Read a free-text direction indicator; anything not naming egress is ingress
    pub fn from_indicator(text: &str) -> Self {
        let lowered = text.to_lowercase();
        if lowered.contains("outbound") || lowered.contains("egress") {
            Direction::Egress
        } else {
            Direction::Ingress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
        }
    }

    pub fn is_egress(&self) -> bool {
        matches!(self, Direction::Egress)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP protocol of a rule, normalized so both sides of a match compare alike
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Every protocol (the remote API's `-1`)
    All,
    /// A lower-cased protocol name such as `tcp`
    Named(String),
}

impl Protocol {
    /// Parse protocol text from either side; blank text is no protocol at all
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return None;
        }
        if value == ALL_PROTOCOLS_LITERAL || value == "all" || value == "all traffic" {
            return Some(Protocol::All);
        }
        if let Some(name) = constants::protocol_number_to_name(&value) {
            return Some(Protocol::Named(name.to_string()));
        }
        Some(Protocol::Named(value))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Protocol::All)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::All => f.write_str(ALL_PROTOCOLS_LITERAL),
            Protocol::Named(name) => f.write_str(name),
        }
    }
}

/// The single traffic source/destination of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Cidr(String),
    ReferencedGroup(String),
    PrefixList(String),
}

impl Address {
    pub fn value(&self) -> &str {
        match self {
            Address::Cidr(v) | Address::ReferencedGroup(v) | Address::PrefixList(v) => v,
        }
    }

    /// Attribute name the address is declared under in a rule block
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Address::Cidr(_) => "cidr_ipv4",
            Address::ReferencedGroup(_) => "referenced_security_group_id",
            Address::PrefixList(_) => "prefix_list_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferencedGroupInfo {
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A rule as listed by the remote API; scanned, never modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteRuleRecord {
    pub security_group_rule_id: String,
    pub group_id: String,
    pub is_egress: bool,
    #[serde(default, deserialize_with = "text_or_number")]
    pub ip_protocol: Option<String>,
    #[serde(default)]
    pub from_port: Option<i32>,
    #[serde(default)]
    pub to_port: Option<i32>,
    #[serde(default)]
    pub cidr_ipv4: Option<String>,
    #[serde(default)]
    pub prefix_list_id: Option<String>,
    #[serde(default)]
    pub referenced_group_info: Option<ReferencedGroupInfo>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteRuleRecord {
    pub fn protocol(&self) -> Option<Protocol> {
        self.ip_protocol.as_deref().and_then(Protocol::parse)
    }

    /// The address this record exposes, checked in CIDR, prefix list, group order
    pub fn address(&self) -> Option<Address> {
        if let Some(cidr) = non_empty(&self.cidr_ipv4) {
            return Some(Address::Cidr(cidr.to_string()));
        }
        if let Some(prefix_list) = non_empty(&self.prefix_list_id) {
            return Some(Address::PrefixList(prefix_list.to_string()));
        }
        self.referenced_group_info
            .as_ref()
            .map(|info| info.group_id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| Address::ReferencedGroup(id.to_string()))
    }

    /// Both ports absent or spelled as the unrestricted sentinel
    pub fn has_unrestricted_ports(&self) -> bool {
        let unrestricted = |port: Option<i32>| port.map_or(true, |p| p == UNRESTRICTED_PORT);
        unrestricted(self.from_port) && unrestricted(self.to_port)
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(i64),
}

// Older CLI versions emit IpProtocol as a bare number
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    }))
}
