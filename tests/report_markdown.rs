use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn sgaudit_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sgaudit"));
    cmd.env("HOME", home);
    cmd.env_remove("SGAUDIT_CONFIG");
    cmd.env_remove("SGAUDIT_UI_COLOR");
    cmd.env_remove("SGAUDIT_UI_MAX_TABLE_ROWS");
    cmd.env_remove("SGAUDIT_REPORT_INCLUDE_ATTACHMENTS");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    sgaudit_cmd(home).args(args).output().expect("run sgaudit")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);

    let temp = std::env::temp_dir();
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let uniq = format!("sgaudit-report-md-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

const SCAN_FIXTURE: &str = r#"{
  "scan_timestamp": "2026-01-12T14:30:22Z",
  "account_id": "123456789012",
  "account_alias": "prod",
  "regions": [
    {
      "region_name": "us-east-1",
      "security_groups": [
        {
          "GroupId": "sg-1",
          "GroupName": "web",
          "VpcId": "vpc-1",
          "IpPermissions": [
            {
              "FromPort": 22,
              "ToPort": 22,
              "IpProtocol": "tcp",
              "IpRanges": [{"CidrIp": "0.0.0.0/0", "Description": "ops access"}]
            }
          ],
          "IpPermissionsEgress": []
        },
        {
          "GroupId": "sg-2",
          "GroupName": "stale",
          "VpcId": "vpc-1",
          "IpPermissions": [],
          "IpPermissionsEgress": []
        }
      ],
      "network_interfaces": [
        {
          "NetworkInterfaceId": "eni-1",
          "Description": "web server",
          "PrivateIpAddress": "10.0.0.5",
          "Groups": [{"GroupId": "sg-1"}]
        }
      ]
    }
  ]
}"#;

fn write_fixture(home: &Path) -> PathBuf {
    let path = home.join("scan.json");
    std::fs::write(&path, SCAN_FIXTURE).expect("write fixture");
    path
}

#[test]
fn report_markdown_includes_findings_and_group_tables() {
    let home = make_temp_home();
    let input = write_fixture(&home);

    let out = run(&home, &["report", "--markdown", input.to_str().unwrap()]);
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("# Security Group Audit Report"), "stdout={stdout}");
    assert!(stdout.contains("- Scan date: January 12, 2026 14:30 UTC"), "stdout={stdout}");
    assert!(stdout.contains("### CRITICAL (1)"), "stdout={stdout}");
    assert!(stdout.contains("**Critical Port Exposed to Internet**"), "stdout={stdout}");
    assert!(
        stdout.contains("`INGRESS: Port 22 (SSH) (tcp) -> 0.0.0.0/0`"),
        "stdout={stdout}"
    );
    assert!(stdout.contains("- Description: ops access"), "stdout={stdout}");
    assert!(stdout.contains("### INFO (1)"), "stdout={stdout}");
    assert!(stdout.contains("**Unused Security Group**"), "stdout={stdout}");
    assert!(stdout.contains("## Security Groups"), "stdout={stdout}");
    assert!(stdout.contains("### Used (1)"), "stdout={stdout}");
    assert!(stdout.contains("### Unused (1)"), "stdout={stdout}");
    assert!(stdout.contains("| `sg-1` | web |"), "stdout={stdout}");
    assert!(
        !stdout.contains("- Attachment: `eni-1`"),
        "attachments should be hidden by default: stdout={stdout}"
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn report_markdown_can_include_attachments() {
    let home = make_temp_home();
    let input = write_fixture(&home);

    let out = run(
        &home,
        &[
            "report",
            "--markdown",
            "--include-attachments",
            input.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("- Attachment: `eni-1` web server (10.0.0.5)"),
        "stdout={stdout}"
    );

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn report_output_flag_writes_file() {
    let home = make_temp_home();
    let input = write_fixture(&home);
    let output = home.join("report.md");

    let out = run(
        &home,
        &[
            "report",
            "--markdown",
            "--output",
            output.to_str().unwrap(),
            input.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());

    let written = std::fs::read_to_string(&output).expect("read report");
    assert!(written.contains("# Security Group Audit Report"));

    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn audit_json_reports_counts_and_buckets() {
    let home = make_temp_home();
    let input = write_fixture(&home);

    let out = run(&home, &["audit", "--json", input.to_str().unwrap()]);
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse json");
    assert_eq!(v["stats"]["total_groups"], 2);
    assert_eq!(v["stats"]["unused_groups"], 1);
    assert_eq!(v["stats"]["risky_rules"], 1);
    assert_eq!(v["findings"]["critical"].as_array().unwrap().len(), 1);
    assert_eq!(v["findings"]["info"].as_array().unwrap().len(), 1);
    assert_eq!(
        v["findings"]["critical"][0]["attachments"][0]["eni_id"],
        "eni-1"
    );

    let _ = std::fs::remove_dir_all(&home);
}
