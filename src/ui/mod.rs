use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::{Finding, GroupSummary, Report, Severity};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` for more detail");
    let _ = writeln!(
        stderr,
        "  - see `sgaudit --help` for available commands and options"
    );
}

/// Pretty form of the collector's ISO-8601 scan timestamp. Falls back to
/// the raw string when it does not parse.
pub fn format_scan_date(raw: &str) -> String {
    let format = format_description!("[month repr:long] [day], [year] [hour]:[minute] UTC");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|ts| ts.format(&format).ok())
        .unwrap_or_else(|| raw.to_string())
}

pub fn print_audit(report: &Report, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "Security group audit: account {} ({})",
        report.account_id, report.account_alias
    );
    let _ = writeln!(
        out,
        "Scanned {} at {}",
        plural(report.total_regions, "region", "regions"),
        format_scan_date(&report.scan_timestamp)
    );
    let _ = writeln!(
        out,
        "Groups: {} total, {} unused; risky ingress rules: {}",
        report.stats.total_groups, report.stats.unused_groups, report.stats.risky_rules
    );

    let _ = writeln!(out);
    let counts: Vec<String> = Severity::ALL
        .iter()
        .map(|s| {
            format!(
                "{}={}",
                format_severity(*s, cfg.color),
                report.findings.count(*s)
            )
        })
        .collect();
    let _ = writeln!(out, "Findings: {}", counts.join("  "));

    for severity in Severity::ALL {
        let bucket = report.findings.bucket(severity);
        if bucket.is_empty() {
            continue;
        }
        let rows = cfg.max_table_rows.min(bucket.len());

        let _ = writeln!(out);
        if bucket.len() > rows {
            let _ = writeln!(
                out,
                "{} ({rows} shown / {} total):",
                format_severity(severity, cfg.color),
                bucket.len()
            );
        } else {
            let _ = writeln!(out, "{} ({rows}):", format_severity(severity, cfg.color));
        }
        for finding in bucket.iter().take(rows) {
            print_finding(&mut out, finding, cfg);
        }
    }

    let used: Vec<&GroupSummary> = report.used_groups().collect();
    let unused: Vec<&GroupSummary> = report.unused_groups().collect();

    if !used.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Security groups in use ({}):", used.len());
        print_groups_table(&mut out, &used, cfg.max_table_rows);
    }
    if !unused.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Unused security groups ({}):", unused.len());
        print_groups_table(&mut out, &unused, cfg.max_table_rows);
    }
}

fn print_finding(out: &mut dyn Write, finding: &Finding, cfg: &UiConfig) {
    let _ = writeln!(
        out,
        "- {}: {} ({}) in {}",
        finding.finding_type, finding.group_name, finding.group_id, finding.region
    );
    if let Some(rule) = &finding.rule {
        let _ = writeln!(out, "  - rule: {rule}");
    }
    if cfg.verbose {
        let _ = writeln!(out, "  - description: {}", finding.description);
        let _ = writeln!(out, "  - attached resources: {}", finding.attached_count);
        for attachment in &finding.attachments {
            let _ = writeln!(
                out,
                "  - attachment: {} ({})",
                attachment.eni_id, attachment.private_ip
            );
        }
    }
    let _ = writeln!(out, "  - recommendation: {}", finding.recommendation);
}

fn print_groups_table(out: &mut dyn Write, groups: &[&GroupSummary], max_rows: usize) {
    let rows = max_rows.min(groups.len());

    let label_id = "GROUP ID";
    let label_name = "NAME";
    let label_region = "REGION";
    let label_vpc = "VPC";
    let label_attached = "ATTACHED";
    let label_rules = "INGRESS RULES";

    let id_w = column_width(groups, rows, label_id, |g| g.group_id.as_str());
    let name_w = column_width(groups, rows, label_name, |g| g.group_name.as_str());
    let region_w = column_width(groups, rows, label_region, |g| g.region.as_str());
    let vpc_w = column_width(groups, rows, label_vpc, |g| g.vpc_id.as_str());
    let attached_w = visible_width(label_attached);

    let _ = writeln!(
        out,
        "{}  {}  {}  {}  {}  {}",
        pad_end_display(label_id, id_w),
        pad_end_display(label_name, name_w),
        pad_end_display(label_region, region_w),
        pad_end_display(label_vpc, vpc_w),
        pad_start_display(label_attached, attached_w),
        label_rules
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}  {}  {}",
        "-".repeat(id_w),
        "-".repeat(name_w),
        "-".repeat(region_w),
        "-".repeat(vpc_w),
        "-".repeat(attached_w),
        "-".repeat(visible_width(label_rules))
    );

    for group in groups.iter().take(rows) {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}  {}  {}",
            pad_end_display(&group.group_id, id_w),
            pad_end_display(&group.group_name, name_w),
            pad_end_display(&group.region, region_w),
            pad_end_display(&group.vpc_id, vpc_w),
            pad_start_display(&group.attached_count.to_string(), attached_w),
            group.ingress_rules.len()
        );
    }
    if groups.len() > rows {
        let _ = writeln!(out, "...({} more)", groups.len() - rows);
    }
}

fn column_width(
    groups: &[&GroupSummary],
    rows: usize,
    label: &str,
    field: impl Fn(&GroupSummary) -> &str,
) -> usize {
    groups
        .iter()
        .take(rows)
        .map(|g| visible_width(field(g)))
        .max()
        .unwrap_or(0)
        .max(visible_width(label))
}

/// Markdown report mirroring the terminal output, suitable for archiving or
/// conversion to other formats.
pub fn render_markdown(report: &Report, include_attachments: bool) -> String {
    use std::fmt::Write as _;

    let mut md = String::new();
    let _ = writeln!(md, "# Security Group Audit Report");
    let _ = writeln!(md);
    let _ = writeln!(
        md,
        "- Account: {} ({})",
        report.account_id, report.account_alias
    );
    let _ = writeln!(md, "- Scan date: {}", format_scan_date(&report.scan_timestamp));
    let _ = writeln!(md, "- Generated: {}", format_scan_date(&report.generated_at));
    let _ = writeln!(
        md,
        "- Regions: {}",
        report.total_regions
    );
    let _ = writeln!(md);

    let _ = writeln!(md, "## Summary");
    let _ = writeln!(md);
    let _ = writeln!(md, "| Metric | Count |");
    let _ = writeln!(md, "| --- | --- |");
    let _ = writeln!(md, "| Total security groups | {} |", report.stats.total_groups);
    let _ = writeln!(md, "| Unused security groups | {} |", report.stats.unused_groups);
    let _ = writeln!(md, "| Risky ingress rules | {} |", report.stats.risky_rules);
    for severity in Severity::ALL {
        let _ = writeln!(
            md,
            "| {} findings | {} |",
            severity,
            report.findings.count(severity)
        );
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Findings ({})", report.findings.total());
    for severity in Severity::ALL {
        let bucket = report.findings.bucket(severity);
        if bucket.is_empty() {
            continue;
        }
        let _ = writeln!(md);
        let _ = writeln!(md, "### {severity} ({})", bucket.len());
        for finding in bucket {
            let _ = writeln!(md);
            let _ = writeln!(
                md,
                "- **{}**: `{}` ({}) in {}",
                finding.finding_type, finding.group_id, finding.group_name, finding.region
            );
            if let Some(rule) = &finding.rule {
                let _ = writeln!(md, "  - Rule: `{rule}`");
            }
            let _ = writeln!(md, "  - Description: {}", finding.description);
            let _ = writeln!(md, "  - Attached resources: {}", finding.attached_count);
            if include_attachments {
                for attachment in &finding.attachments {
                    let _ = writeln!(
                        md,
                        "  - Attachment: `{}` {} ({})",
                        attachment.eni_id, attachment.description, attachment.private_ip
                    );
                }
            }
            let _ = writeln!(md, "  - Recommendation: {}", finding.recommendation);
        }
    }
    let _ = writeln!(md);

    let used: Vec<&GroupSummary> = report.used_groups().collect();
    let unused: Vec<&GroupSummary> = report.unused_groups().collect();

    let _ = writeln!(md, "## Security Groups");
    write_groups_markdown(&mut md, "Used", &used);
    write_groups_markdown(&mut md, "Unused", &unused);

    md
}

fn write_groups_markdown(md: &mut String, title: &str, groups: &[&GroupSummary]) {
    use std::fmt::Write as _;

    let _ = writeln!(md);
    let _ = writeln!(md, "### {title} ({})", groups.len());
    if groups.is_empty() {
        return;
    }
    let _ = writeln!(md);
    let _ = writeln!(md, "| Group ID | Name | Region | VPC | Attached | Port | Protocol | Source |");
    let _ = writeln!(md, "| --- | --- | --- | --- | --- | --- | --- | --- |");
    for group in groups {
        if group.ingress_rules.is_empty() {
            let _ = writeln!(
                md,
                "| `{}` | {} | {} | {} | {} | - | - | - |",
                group.group_id, group.group_name, group.region, group.vpc_id, group.attached_count
            );
            continue;
        }
        for rule in &group.ingress_rules {
            let _ = writeln!(
                md,
                "| `{}` | {} | {} | {} | {} | {} | {} | {} |",
                group.group_id,
                group.group_name,
                group.region,
                group.vpc_id,
                group.attached_count,
                rule.port,
                rule.protocol,
                rule.source
            );
        }
    }
}

pub fn format_severity(severity: Severity, color: bool) -> String {
    let s = severity.as_str();
    if !color {
        return s.to_string();
    }

    let code = match severity {
        Severity::Critical => "31",
        Severity::High => "33",
        Severity::Medium => "36",
        Severity::Low => "32",
        Severity::Info => "90",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_display(s: &str, width: usize) -> String {
    let w = visible_width(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_date_parses_trailing_z() {
        assert_eq!(
            format_scan_date("2026-01-12T14:30:22Z"),
            "January 12, 2026 14:30 UTC"
        );
    }

    #[test]
    fn scan_date_falls_back_to_raw_string() {
        assert_eq!(format_scan_date("not-a-date"), "not-a-date");
    }

    #[test]
    fn severity_coloring_is_width_neutral() {
        let colored = format_severity(Severity::Critical, true);
        assert_eq!(visible_width(&colored), "CRITICAL".len());
    }
}
