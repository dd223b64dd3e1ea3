use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub report: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub include_attachments: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            report: ReportConfig {
                include_attachments: false,
            },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    report: Option<RawReportConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    include_attachments: Option<bool>,
}

pub fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .context("HOME environment variable is not set")
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/sgaudit/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(report) = raw.report {
        if let Some(include_attachments) = report.include_attachments {
            cfg.report.include_attachments = include_attachments;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("SGAUDIT_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "SGAUDIT_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("SGAUDIT_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SGAUDIT_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("SGAUDIT_REPORT_INCLUDE_ATTACHMENTS") {
        cfg.report.include_attachments =
            parse_bool(&v).with_context(|| "SGAUDIT_REPORT_INCLUDE_ATTACHMENTS")?;
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for v in ["1", "true", "YES", "On"] {
            assert!(parse_bool(v).expect("parse"));
        }
        for v in ["0", "false", "No", "OFF"] {
            assert!(!parse_bool(v).expect("parse"));
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn raw_config_overrides_defaults() {
        let mut cfg = EffectiveConfig::default();
        let raw: RawConfig = toml::from_str(
            r#"
[ui]
max_table_rows = 5

[report]
include_attachments = true
"#,
        )
        .expect("parse toml");
        apply_raw_config(&mut cfg, raw);
        assert_eq!(cfg.ui.max_table_rows, 5);
        assert!(cfg.report.include_attachments);
        assert!(cfg.ui.color, "untouched keys keep their defaults");
    }
}
