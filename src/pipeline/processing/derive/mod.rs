use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::processing::normalize::{non_blank, parse_port, strip_annotation};
use crate::types::{Address, Direction, Protocol, RuleInputRecord};

/// Normalized form of one rule row, immutable once derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRule {
    /// `{group_name}-{direction}{ordinal}`, unique within a batch
    pub identifier: String,
    pub group_name: String,
    /// Owning group id (`sg-...`) the rule is declared against
    pub group_id: String,
    pub direction: Direction,
    pub protocol: Option<Protocol>,
    pub port_range: Option<(i32, i32)>,
    pub address: Option<Address>,
    /// Text that sat in parentheses after the address, or empty
    pub annotation: String,
    pub ordinal: u32,
}

impl DerivedRule {
    /// Identifier of the form `{group_name}-{direction}{ordinal}`
    pub fn compose_identifier(group_name: &str, direction: Direction, ordinal: u32) -> String {
        format!("{}-{}{}", group_name, direction, ordinal)
    }

    pub fn from_port(&self) -> Option<i32> {
        self.port_range.map(|(from, _)| from)
    }

    pub fn to_port(&self) -> Option<i32> {
        self.port_range.map(|(_, to)| to)
    }
}

/// Per (group, direction) ordinal state for one batch run
///
/// Ordinals start at 1 and are handed out in the order rows are visited, so a
/// batch must be derived in input order.
#[derive(Debug, Default)]
pub struct OrdinalCounter {
    counters: HashMap<(String, Direction), u32>,
}

impl OrdinalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next ordinal for a group and direction
    pub fn next(&mut self, group_name: &str, direction: Direction) -> u32 {
        let counter = self
            .counters
            .entry((group_name.to_string(), direction))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    #[cfg(test)]
    fn current(&self, group_name: &str, direction: Direction) -> u32 {
        self.counters
            .get(&(group_name.to_string(), direction))
            .copied()
            .unwrap_or(0)
    }
}

/// Builds derived rules from input rows
pub struct RuleDeriver {
    /// CIDR that turns a port-less egress row into an all-traffic rule
    all_traffic_cidr: String,
}

impl RuleDeriver {
    pub fn new(all_traffic_cidr: impl Into<String>) -> Self {
        Self {
            all_traffic_cidr: all_traffic_cidr.into(),
        }
    }

    /// Derive one rule from one row
    ///
    /// `group_name` is the row's group name as returned by
    /// `normalize_group_name`. `row` is the 1-based data row number used in
    /// error messages. The counter is advanced for the group and direction
    /// only once the row has parsed.
    pub fn derive(
        &self,
        record: &RuleInputRecord,
        group_name: &str,
        row: usize,
        counter: &mut OrdinalCounter,
    ) -> Result<DerivedRule> {
        let direction = Direction::from_indicator(&record.direction);

        let from_port = parse_port(record.from_port.as_deref(), "FromPort").map_err(|e| e.at_row(row))?;
        let to_port = parse_port(record.to_port.as_deref(), "ToPort").map_err(|e| e.at_row(row))?;

        let (address, annotation) = Self::derive_address(record);
        let (protocol, port_range) = self.derive_protocol(record, direction, from_port, to_port, address.as_ref());

        let ordinal = counter.next(group_name, direction);
        let identifier = DerivedRule::compose_identifier(group_name, direction, ordinal);

        debug!(
            "Derived {} (protocol={:?}, ports={:?}, address={:?})",
            identifier, protocol, port_range, address
        );

        Ok(DerivedRule {
            identifier,
            group_name: group_name.to_string(),
            group_id: record.group_id.trim().to_string(),
            direction,
            protocol,
            port_range,
            address,
            annotation,
            ordinal,
        })
    }

    fn derive_protocol(
        &self,
        record: &RuleInputRecord,
        direction: Direction,
        from_port: Option<i32>,
        to_port: Option<i32>,
        address: Option<&Address>,
    ) -> (Option<Protocol>, Option<(i32, i32)>) {
        if let (Some(from), Some(to)) = (from_port, to_port) {
            let protocol = record.ip_protocol.as_deref().and_then(Protocol::parse);
            return match protocol {
                // the all-protocols form never carries ports
                Some(Protocol::All) => (Some(Protocol::All), None),
                other => (other, Some((from, to))),
            };
        }

        let universal_egress = direction.is_egress()
            && matches!(address, Some(Address::Cidr(cidr)) if *cidr == self.all_traffic_cidr);
        if universal_egress {
            return (Some(Protocol::All), None);
        }

        if !direction.is_egress() && from_port.is_none() && to_port.is_none() {
            return (Some(Protocol::All), None);
        }

        (None, None)
    }

    /// First present of IpRanges, UserIdGroupPairs, PrefixListIds wins
    fn derive_address(record: &RuleInputRecord) -> (Option<Address>, String) {
        let candidates: [(Option<&str>, fn(String) -> Address); 3] = [
            (record.ip_ranges.as_deref(), Address::Cidr),
            (record.user_id_group_pairs.as_deref(), Address::ReferencedGroup),
            (record.prefix_list_ids.as_deref(), Address::PrefixList),
        ];

        for (raw, make) in candidates {
            if let Some(text) = non_blank(raw) {
                let (value, annotation) = strip_annotation(text);
                return (Some(make(value)), annotation);
            }
        }
        (None, String::new())
    }
}

impl Default for RuleDeriver {
    fn default() -> Self {
        Self::new(crate::constants::UNIVERSAL_CIDR)
    }
}
