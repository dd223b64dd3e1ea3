use std::path::{Path, PathBuf};
use std::process::Command;
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

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);

    let temp = std::env::temp_dir();
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let uniq = format!("sgaudit-config-test-{}-{seq}", std::process::id());
    let home = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

fn show_config(cmd: &mut Command) -> serde_json::Value {
    let out = cmd
        .args(["config", "--show", "--json"])
        .output()
        .expect("run sgaudit");
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse config json")
}

#[test]
fn defaults_apply_without_config_file() {
    let home = make_temp_home();
    let v = show_config(&mut sgaudit_cmd(&home));
    assert_eq!(v["ui"]["color"], true);
    assert_eq!(v["ui"]["max_table_rows"], 20);
    assert_eq!(v["report"]["include_attachments"], false);
    assert!(v.get("config_path").is_none());
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn config_file_overrides_defaults() {
    let home = make_temp_home();
    write_file(
        home.join(".config/sgaudit/config.toml").as_path(),
        br#"
[ui]
max_table_rows = 5

[report]
include_attachments = true
"#,
    );

    let v = show_config(&mut sgaudit_cmd(&home));
    assert_eq!(v["ui"]["max_table_rows"], 5);
    assert_eq!(v["report"]["include_attachments"], true);
    assert_eq!(v["ui"]["color"], true, "untouched keys keep defaults");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn env_overrides_config_file() {
    let home = make_temp_home();
    write_file(
        home.join(".config/sgaudit/config.toml").as_path(),
        br#"
[ui]
max_table_rows = 5
"#,
    );

    let mut cmd = sgaudit_cmd(&home);
    cmd.env("SGAUDIT_UI_MAX_TABLE_ROWS", "7");
    let v = show_config(&mut cmd);
    assert_eq!(v["ui"]["max_table_rows"], 7);
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn sgaudit_config_env_selects_config_path() {
    let home = make_temp_home();
    let custom = home.join("custom.toml");
    write_file(
        &custom,
        br#"
[ui]
color = false
"#,
    );

    let mut cmd = sgaudit_cmd(&home);
    cmd.env("SGAUDIT_CONFIG", &custom);
    let v = show_config(&mut cmd);
    assert_eq!(v["ui"]["color"], false);
    assert_eq!(
        v["config_path"],
        custom.display().to_string().as_str()
    );
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn config_flag_beats_env_path() {
    let home = make_temp_home();
    let from_env = home.join("env.toml");
    let from_flag = home.join("flag.toml");
    write_file(&from_env, b"[ui]\nmax_table_rows = 3\n");
    write_file(&from_flag, b"[ui]\nmax_table_rows = 9\n");

    let mut cmd = sgaudit_cmd(&home);
    cmd.env("SGAUDIT_CONFIG", &from_env);
    cmd.args(["--config", from_flag.to_str().unwrap()]);
    let v = show_config(&mut cmd);
    assert_eq!(v["ui"]["max_table_rows"], 9);
    let _ = std::fs::remove_dir_all(&home);
}
