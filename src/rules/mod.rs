use crate::core::{Attachment, Finding, Severity};

/// The only address ranges treated as internet exposure. Broad-but-partial
/// CIDRs (e.g. /1) are intentionally never flagged.
pub const ANY_IPV4: &str = "0.0.0.0/0";
pub const ANY_IPV6: &str = "::/0";

/// Sentinel protocol meaning every protocol and port (`-1` on the wire).
pub const ALL_PROTOCOLS: &str = "All";

/// Attachments retained per finding for display. Truncation policy, not
/// data loss: `attached_count` keeps the full count.
pub const MAX_ATTACHMENT_SAMPLE: usize = 5;

/// Ports that should never be reachable from the internet.
pub const CRITICAL_PORTS: &[i64] = &[22, 23, 3389, 1433, 3306, 5432, 6379, 27017, 9200];

/// Management/admin ports.
pub const MANAGEMENT_PORTS: &[i64] = &[22, 3389, 5900, 5985, 5986];

/// Well-known risky ports and their service names.
pub const RISKY_PORTS: &[(i64, &str)] = &[
    (20, "FTP Data"),
    (21, "FTP Control"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (135, "MS RPC"),
    (137, "NetBIOS"),
    (138, "NetBIOS"),
    (139, "NetBIOS"),
    (443, "HTTPS"),
    (445, "SMB"),
    (1433, "SQL Server"),
    (1434, "SQL Server"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8080, "HTTP Alt"),
    (8443, "HTTPS Alt"),
    (9200, "Elasticsearch"),
    (27017, "MongoDB"),
];

pub fn risky_port_name(port: i64) -> Option<&'static str> {
    RISKY_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

fn is_risky_port(port: i64) -> bool {
    risky_port_name(port).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub const fn label(self) -> &'static str {
        match self {
            Direction::Ingress => "INGRESS",
            Direction::Egress => "EGRESS",
        }
    }
}

/// Identity of the security group a rule belongs to, shared across every
/// range classified for that group.
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    pub region: &'a str,
    pub group_id: &'a str,
    pub group_name: &'a str,
    pub vpc_id: &'a str,
    pub attachments: &'a [Attachment],
}

pub fn is_public(cidr: &str) -> bool {
    cidr == ANY_IPV4 || cidr == ANY_IPV6
}

/// Maps the wire protocol token to its display form. `-1` and a missing
/// protocol both mean the all-protocols sentinel.
pub fn normalize_protocol(protocol: Option<&str>) -> String {
    match protocol {
        None => ALL_PROTOCOLS.to_string(),
        Some("-1") => ALL_PROTOCOLS.to_string(),
        Some(p) => p.to_string(),
    }
}

pub fn port_display(from_port: Option<i64>, to_port: Option<i64>) -> String {
    match (from_port, to_port) {
        (None, None) => "All Ports".to_string(),
        (Some(from), Some(to)) if from == to => format!("Port {from}"),
        (Some(from), Some(to)) => format!("Ports {from}-{to}"),
        (Some(port), None) | (None, Some(port)) => format!("Port {port}"),
    }
}

/// Severity tiers for an internet-exposed ingress rule. The all-protocols
/// override dominates the port-based tiers.
fn ingress_severity(
    from_port: Option<i64>,
    to_port: Option<i64>,
    protocol: &str,
) -> (Severity, &'static str) {
    let mut severity = Severity::Medium;
    let mut finding_type = "Internet-Exposed Port";

    if let Some(from) = from_port {
        let to = to_port.unwrap_or(from);
        if CRITICAL_PORTS.contains(&from) || CRITICAL_PORTS.contains(&to) {
            severity = Severity::Critical;
            finding_type = "Critical Port Exposed to Internet";
        } else if MANAGEMENT_PORTS.contains(&from) || MANAGEMENT_PORTS.contains(&to) {
            severity = Severity::High;
            finding_type = "Management Port Exposed to Internet";
        } else if is_risky_port(from) || is_risky_port(to) {
            severity = Severity::High;
            finding_type = "Risky Port Exposed to Internet";
        }
    }

    if protocol == ALL_PROTOCOLS {
        severity = Severity::Critical;
        finding_type = "All Protocols/Ports Open to Internet";
    }

    (severity, finding_type)
}

/// Remediation for an internet-exposed ingress rule. Total over all inputs.
pub fn recommendation(from_port: Option<i64>, protocol: &str) -> &'static str {
    if protocol == ALL_PROTOCOLS {
        return "URGENT: Restrict to specific protocols and ports. \
                Use VPN or bastion host for management access.";
    }

    if let Some(port) = from_port {
        if port == 22 || port == 3389 {
            return "Use a session manager service or VPN instead of direct internet access";
        }
        if matches!(port, 1433 | 3306 | 5432 | 27017 | 6379 | 9200) {
            return "Database should NEVER be exposed to internet. \
                    Use VPN, VPC peering, or PrivateLink";
        }
        if port == 23 {
            return "Telnet is insecure and deprecated. Use SSH instead and restrict access";
        }
    }

    "Restrict source to specific IP addresses or front with a managed edge \
     service (CDN, load balancer)"
}

const EGRESS_RECOMMENDATION: &str = "Consider restricting egress to specific ports/protocols";
const NO_DESCRIPTION: &str = "No description provided";

/// Classifies one resolved address range of a rule. Returns a finding for
/// internet-exposed ingress ranges and all-protocol egress ranges; every
/// other range is not a finding.
pub fn classify_range(
    ctx: &GroupContext<'_>,
    direction: Direction,
    from_port: Option<i64>,
    to_port: Option<i64>,
    protocol: &str,
    cidr: &str,
    description: Option<&str>,
) -> Option<Finding> {
    if !is_public(cidr) {
        return None;
    }

    let ports = port_display(from_port, to_port);

    if direction == Direction::Egress {
        // Egress to the internet is normal; only the all-protocols case is
        // worth reporting.
        if protocol != ALL_PROTOCOLS {
            return None;
        }
        return Some(Finding {
            finding_type: "Permissive Egress Rule".to_string(),
            severity: Severity::Low,
            region: ctx.region.to_string(),
            group_id: ctx.group_id.to_string(),
            group_name: ctx.group_name.to_string(),
            vpc_id: ctx.vpc_id.to_string(),
            rule: Some(format!(
                "{}: {ports} ({protocol}) -> {cidr}",
                direction.label()
            )),
            description: "All outbound traffic allowed to internet".to_string(),
            attached_count: ctx.attachments.len(),
            attachments: Vec::new(),
            recommendation: EGRESS_RECOMMENDATION.to_string(),
        });
    }

    let (severity, finding_type) = ingress_severity(from_port, to_port, protocol);

    let port_name = from_port
        .and_then(risky_port_name)
        .map(|name| format!(" ({name})"))
        .unwrap_or_default();

    Some(Finding {
        finding_type: finding_type.to_string(),
        severity,
        region: ctx.region.to_string(),
        group_id: ctx.group_id.to_string(),
        group_name: ctx.group_name.to_string(),
        vpc_id: ctx.vpc_id.to_string(),
        rule: Some(format!(
            "{}: {ports}{port_name} ({protocol}) -> {cidr}",
            direction.label()
        )),
        description: description
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        attached_count: ctx.attachments.len(),
        attachments: ctx
            .attachments
            .iter()
            .take(MAX_ATTACHMENT_SAMPLE)
            .cloned()
            .collect(),
        recommendation: recommendation(from_port, protocol).to_string(),
    })
}

/// Finding for a security group with no attached resources. The implicit
/// `default` group is exempt; callers must check that before emitting.
pub fn unused_group_finding(ctx: &GroupContext<'_>) -> Finding {
    Finding {
        finding_type: "Unused Security Group".to_string(),
        severity: Severity::Info,
        region: ctx.region.to_string(),
        group_id: ctx.group_id.to_string(),
        group_name: ctx.group_name.to_string(),
        vpc_id: ctx.vpc_id.to_string(),
        rule: None,
        description: format!(
            "Security group '{}' has no attached resources",
            ctx.group_name
        ),
        attached_count: 0,
        attachments: Vec::new(),
        recommendation: "Consider removing unused security groups to reduce complexity"
            .to_string(),
    }
}
