use crate::core::{Finding, GroupSummary, Severity, SummaryStats};
use serde::{Deserialize, Serialize};

/// Findings grouped into the five severity buckets. Append-only; findings
/// are never merged, deduplicated or reclassified after insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingBuckets {
    pub critical: Vec<Finding>,
    pub high: Vec<Finding>,
    pub medium: Vec<Finding>,
    pub low: Vec<Finding>,
    pub info: Vec<Finding>,
}

impl FindingBuckets {
    pub fn push(&mut self, finding: Finding) {
        self.bucket_mut(finding.severity).push(finding);
    }

    pub fn bucket(&self, severity: Severity) -> &[Finding] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Info => &self.info,
        }
    }

    fn bucket_mut(&mut self, severity: Severity) -> &mut Vec<Finding> {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Info => &mut self.info,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.bucket(severity).len()
    }

    pub fn total(&self) -> usize {
        Severity::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    pub scan_timestamp: String,
    pub account_id: String,
    pub account_alias: String,
    pub total_regions: usize,
    pub stats: SummaryStats,
    pub findings: FindingBuckets,
    pub security_groups: Vec<GroupSummary>,
}

impl Report {
    pub fn used_groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.security_groups.iter().filter(|g| g.is_used)
    }

    pub fn unused_groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.security_groups.iter().filter(|g| !g.is_used)
    }
}
