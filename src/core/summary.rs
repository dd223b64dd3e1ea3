use serde::{Deserialize, Serialize};

/// Running counters accumulated over one full analysis pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_groups: u64,
    pub unused_groups: u64,
    /// Ingress-from-internet rules only; egress findings are excluded.
    pub risky_rules: u64,
}

/// One flattened ingress rule for the group summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRow {
    pub port: String,
    pub protocol: String,
    pub source: String,
}

/// Per-group denormalized view used for tabular display, independent of
/// the finding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_id: String,
    pub group_name: String,
    pub region: String,
    pub vpc_id: String,
    pub attached_count: usize,
    pub is_used: bool,
    pub ingress_rules: Vec<IngressRow>,
}
