use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::Attachment;

/// Top-level scan document produced by the out-of-band collector.
///
/// A document missing any of these top-level fields is a structural failure
/// and aborts the run; everything below the top level degrades gracefully.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanDocument {
    pub scan_timestamp: String,
    pub account_id: String,
    pub account_alias: String,
    pub regions: Vec<RegionInventory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionInventory {
    pub region_name: String,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// One access-control object as exported by the collector (AWS field names).
/// Never mutated by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub ip_permissions: Vec<IpPermission>,
    #[serde(default)]
    pub ip_permissions_egress: Vec<IpPermission>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpPermission {
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub ip_protocol: Option<String>,
    #[serde(default)]
    pub ip_ranges: Vec<IpRange>,
    #[serde(default)]
    pub ipv6_ranges: Vec<Ipv6Range>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpRange {
    pub cidr_ip: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ipv6Range {
    pub cidr_ipv6: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInterface {
    pub network_interface_id: Option<String>,
    pub description: Option<String>,
    pub private_ip_address: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRef {
    pub group_id: Option<String>,
}

pub fn load(path: &Path) -> Result<ScanDocument> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scan data: {}", path.display()))?;
    let doc: ScanDocument =
        serde_json::from_str(&s).context("failed to parse scan data (JSON)")?;
    Ok(doc)
}

/// Builds the lookup from security-group id to attached network interfaces.
///
/// A group absent from the map has zero attachments. Interfaces or group
/// references without an identifier are skipped.
pub fn build_attachment_index(
    network_interfaces: &[NetworkInterface],
) -> HashMap<String, Vec<Attachment>> {
    let mut index: HashMap<String, Vec<Attachment>> = HashMap::new();

    for eni in network_interfaces {
        let eni_id = eni.network_interface_id.as_deref().unwrap_or("unknown");
        let description = eni.description.as_deref().unwrap_or("");
        let private_ip = eni.private_ip_address.as_deref().unwrap_or("N/A");

        for group in &eni.groups {
            let Some(group_id) = group.group_id.as_deref() else {
                continue;
            };
            index
                .entry(group_id.to_string())
                .or_default()
                .push(Attachment::new(eni_id, description, private_ip));
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interfaces(value: serde_json::Value) -> Vec<NetworkInterface> {
        serde_json::from_value(value).expect("parse interfaces")
    }

    #[test]
    fn index_maps_group_id_to_attachments() {
        let enis = interfaces(json!([
            {
                "NetworkInterfaceId": "eni-1",
                "Description": "web server",
                "PrivateIpAddress": "10.0.0.5",
                "Groups": [{"GroupId": "sg-1"}, {"GroupId": "sg-2"}]
            },
            {
                "NetworkInterfaceId": "eni-2",
                "Groups": [{"GroupId": "sg-1"}]
            }
        ]));

        let index = build_attachment_index(&enis);
        assert_eq!(index["sg-1"].len(), 2);
        assert_eq!(index["sg-2"].len(), 1);
        assert_eq!(index["sg-1"][0].eni_id, "eni-1");
        assert_eq!(index["sg-1"][0].private_ip, "10.0.0.5");
        assert_eq!(index["sg-1"][1].private_ip, "N/A");
    }

    #[test]
    fn index_skips_group_refs_without_id() {
        let enis = interfaces(json!([
            {
                "NetworkInterfaceId": "eni-1",
                "Groups": [{}, {"GroupId": "sg-1"}]
            }
        ]));

        let index = build_attachment_index(&enis);
        assert_eq!(index.len(), 1);
        assert_eq!(index["sg-1"].len(), 1);
    }

    #[test]
    fn document_accepts_missing_region_lists() {
        let doc: ScanDocument = serde_json::from_value(json!({
            "scan_timestamp": "2026-01-12T14:30:22Z",
            "account_id": "123456789012",
            "account_alias": "prod",
            "regions": [{"region_name": "us-east-1"}]
        }))
        .expect("parse document");

        assert_eq!(doc.regions.len(), 1);
        assert!(doc.regions[0].security_groups.is_empty());
        assert!(doc.regions[0].network_interfaces.is_empty());
    }

    #[test]
    fn document_missing_top_level_key_is_an_error() {
        let result: Result<ScanDocument, _> = serde_json::from_value(json!({
            "scan_timestamp": "2026-01-12T14:30:22Z",
            "regions": []
        }));
        assert!(result.is_err());
    }
}
