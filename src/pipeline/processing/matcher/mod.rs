//! Pairs a derived rule with the remote rule it describes
//!
//! The remote API has no field that carries our synthesized identifier, so
//! identity is rebuilt from content. A record is selected only if it passes
//! every gate, checked in order and short-circuiting:
//!
//! 0. scope: same owning group id
//! 1. direction: remote egress flag agrees with the rule's direction
//! 2. protocol: all-protocols needs the remote all-protocols sentinel with
//!    unrestricted ports; a named protocol needs the same name and the same
//!    from/to ports; a rule without a protocol never matches
//! 3. address: same kind and same value (no address only matches no address)
//! 4. annotation: case-insensitive equality with the remote description
//!
//! The first record in listing order that passes wins. Nothing is relaxed to
//! rescue a miss: a missed import is reported, a wrong import would adopt the
//! wrong rule.

use tracing::{debug, trace};

use crate::pipeline::processing::derive::DerivedRule;
use crate::types::{Protocol, RemoteRuleRecord};

/// The gate a remote record failed, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Scope,
    Direction,
    Protocol,
    Address,
    Annotation,
}

pub struct Matcher;

impl Matcher {
    /// Find the first remote record equivalent to `rule`
    pub fn find<'a>(rule: &DerivedRule, remote: &'a [RemoteRuleRecord]) -> Option<&'a RemoteRuleRecord> {
        let found = remote.iter().find(|record| match Self::check(rule, record) {
            Ok(()) => true,
            Err(gate) => {
                trace!(
                    "{} vs {}: failed {:?} gate",
                    rule.identifier,
                    record.security_group_rule_id,
                    gate
                );
                false
            }
        });

        if let Some(record) = found {
            debug!("{} matched {}", rule.identifier, record.security_group_rule_id);
        }
        found
    }

    /// Run all gates for one pair, reporting the first that fails
    pub fn check(rule: &DerivedRule, record: &RemoteRuleRecord) -> Result<(), Gate> {
        if record.group_id.trim() != rule.group_id {
            return Err(Gate::Scope);
        }
        if record.is_egress != rule.direction.is_egress() {
            return Err(Gate::Direction);
        }
        if !Self::protocol_matches(rule, record) {
            return Err(Gate::Protocol);
        }
        if record.address() != rule.address {
            return Err(Gate::Address);
        }
        if !Self::annotation_matches(&rule.annotation, record.description_text()) {
            return Err(Gate::Annotation);
        }
        Ok(())
    }

    fn protocol_matches(rule: &DerivedRule, record: &RemoteRuleRecord) -> bool {
        match (&rule.protocol, record.protocol()) {
            (Some(Protocol::All), Some(Protocol::All)) => record.has_unrestricted_ports(),
            (Some(Protocol::Named(ours)), Some(Protocol::Named(theirs))) => {
                *ours == theirs
                    && rule.from_port() == record.from_port
                    && rule.to_port() == record.to_port
            }
            _ => false,
        }
    }

    fn annotation_matches(annotation: &str, description: &str) -> bool {
        annotation.to_lowercase() == description.to_lowercase()
    }
}
