//! Naming constants shared between the pipelines, the emitters and the config defaults

// Terraform resource types (AWS provider)
pub const GROUP_RESOURCE_TYPE: &str = "aws_security_group";
pub const INGRESS_RESOURCE_TYPE: &str = "aws_vpc_security_group_ingress_rule";
pub const EGRESS_RESOURCE_TYPE: &str = "aws_vpc_security_group_egress_rule";

// The remote API spells "all protocols" and "all ports" as -1
pub const ALL_PROTOCOLS_LITERAL: &str = "-1";
pub const UNRESTRICTED_PORT: i32 = -1;

/// The IPv4 block covering every address
pub const UNIVERSAL_CIDR: &str = "0.0.0.0/0";

pub const DEFAULT_IMPORT_COMMAND: &str = "terraform import";

/// Config file picked up from the working directory when no --config is given
pub const DEFAULT_CONFIG_FILE: &str = "sg_importer.toml";

/// Key wrapping the rule array in `aws ec2 describe-security-group-rules` output
pub const REMOTE_LISTING_KEY: &str = "SecurityGroupRules";

/// Map an IANA protocol number to the name the remote API reports for it
pub fn protocol_number_to_name(number: &str) -> Option<&'static str> {
    match number {
        "1" => Some("icmp"),
        "6" => Some("tcp"),
        "17" => Some("udp"),
        "58" => Some("icmpv6"),
        _ => None,
    }
}
