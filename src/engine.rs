use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{FindingBuckets, GroupSummary, IngressRow, Report, SummaryStats};
use crate::inventory::{self, IpPermission, ScanDocument, SecurityGroup};
use crate::rules::{self, Direction, GroupContext};

/// Groups named this way are created implicitly and are exempt from the
/// unused-group finding.
const DEFAULT_GROUP_NAME: &str = "default";

/// VPC label for groups predating VPC networking.
const CLASSIC_VPC: &str = "EC2-Classic";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub show_progress: bool,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
}

struct Accumulator {
    findings: FindingBuckets,
    stats: SummaryStats,
    security_groups: Vec<GroupSummary>,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Self {
        Self { opts }
    }

    /// Single-pass fold over the scan document. Deterministic: finding order
    /// within each severity bucket is region order, then group, then rule,
    /// then address range.
    pub fn analyze(&self, doc: &ScanDocument) -> Report {
        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();

        let mut acc = Accumulator {
            findings: FindingBuckets::default(),
            stats: SummaryStats::default(),
            security_groups: Vec::new(),
        };

        for region in &doc.regions {
            let pb = if progress_enabled {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                pb.set_message(format!("Analyzing region {}", region.region_name));
                pb.enable_steady_tick(Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            acc.stats.total_groups += region.security_groups.len() as u64;
            let index = inventory::build_attachment_index(&region.network_interfaces);

            for sg in &region.security_groups {
                // Malformed records (missing identity) are skipped, not fatal.
                let (Some(group_id), Some(group_name)) = (&sg.group_id, &sg.group_name) else {
                    continue;
                };
                let attachments = index.get(group_id).map(Vec::as_slice).unwrap_or(&[]);
                let ctx = GroupContext {
                    region: &region.region_name,
                    group_id,
                    group_name,
                    vpc_id: sg.vpc_id.as_deref().unwrap_or(CLASSIC_VPC),
                    attachments,
                };

                if attachments.is_empty() && group_name != DEFAULT_GROUP_NAME {
                    acc.stats.unused_groups += 1;
                    acc.findings.push(rules::unused_group_finding(&ctx));
                }

                for perm in &sg.ip_permissions {
                    walk_rule(&ctx, Direction::Ingress, perm, &mut acc);
                }
                for perm in &sg.ip_permissions_egress {
                    walk_rule(&ctx, Direction::Egress, perm, &mut acc);
                }

                acc.security_groups
                    .push(group_summary(sg, &ctx, attachments.len()));
            }

            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
        }

        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Report {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            scan_timestamp: doc.scan_timestamp.clone(),
            account_id: doc.account_id.clone(),
            account_alias: doc.account_alias.clone(),
            total_regions: doc.regions.len(),
            stats: acc.stats,
            findings: acc.findings,
            security_groups: acc.security_groups,
        }
    }
}

/// Classifies every address range of one rule. The IPv4 ranges are walked
/// before the IPv6 ranges, each range independently.
fn walk_rule(ctx: &GroupContext<'_>, direction: Direction, perm: &IpPermission, acc: &mut Accumulator) {
    let protocol = rules::normalize_protocol(perm.ip_protocol.as_deref());

    let mut classify = |cidr: Option<&str>, description: Option<&str>| {
        let Some(cidr) = cidr else {
            return;
        };
        let Some(finding) = rules::classify_range(
            ctx,
            direction,
            perm.from_port,
            perm.to_port,
            &protocol,
            cidr,
            description,
        ) else {
            return;
        };
        if direction == Direction::Ingress {
            acc.stats.risky_rules += 1;
        }
        acc.findings.push(finding);
    };

    for range in &perm.ip_ranges {
        classify(range.cidr_ip.as_deref(), range.description.as_deref());
    }
    for range in &perm.ipv6_ranges {
        classify(range.cidr_ipv6.as_deref(), range.description.as_deref());
    }
}

/// Flattens all ingress rules of a group into display rows. The summary is
/// a superset view: rows are kept whether or not any finding was raised.
fn group_summary(sg: &SecurityGroup, ctx: &GroupContext<'_>, attached_count: usize) -> GroupSummary {
    let mut ingress_rules = Vec::new();

    for perm in &sg.ip_permissions {
        let protocol = rules::normalize_protocol(perm.ip_protocol.as_deref());

        let cidrs: Vec<&str> = perm
            .ip_ranges
            .iter()
            .filter_map(|r| r.cidr_ip.as_deref())
            .chain(perm.ipv6_ranges.iter().filter_map(|r| r.cidr_ipv6.as_deref()))
            .collect();
        if cidrs.is_empty() {
            continue;
        }

        ingress_rules.push(IngressRow {
            port: summary_port(perm.from_port, perm.to_port),
            protocol,
            source: cidrs.join(", "),
        });
    }

    GroupSummary {
        group_id: ctx.group_id.to_string(),
        group_name: ctx.group_name.to_string(),
        region: ctx.region.to_string(),
        vpc_id: ctx.vpc_id.to_string(),
        attached_count,
        is_used: attached_count > 0,
        ingress_rules,
    }
}

fn summary_port(from_port: Option<i64>, to_port: Option<i64>) -> String {
    match (from_port, to_port) {
        (None, None) => "All Ports".to_string(),
        (Some(from), Some(to)) if from == to => from.to_string(),
        (Some(from), Some(to)) => format!("{from}-{to}"),
        (Some(port), None) | (None, Some(port)) => port.to_string(),
    }
}
