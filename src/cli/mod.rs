use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::engine::{Engine, EngineOptions};
use crate::inventory::ScanDocument;
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "sgaudit",
    version,
    about = "Classifies cloud security-group exposures into severity-ranked findings and renders an audit report"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a scan document and print the findings summary
    Audit(AuditArgs),
    /// Analyze a scan document and emit the full report (JSON or Markdown)
    Report(ReportArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Path to the collector's JSON scan document
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Path to the collector's JSON scan document
    pub input: PathBuf,
    #[arg(long)]
    pub markdown: bool,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub include_attachments: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::effective_home_dir()?;

    let env_config_path = std::env::var_os("SGAUDIT_CONFIG").map(std::path::PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let engine = Engine::new(EngineOptions {
        show_progress: stderr_is_tty && !cli.quiet && !cli.json,
    });

    match cli.command {
        Commands::Audit(args) => {
            let doc = load_document(&args.input)?;
            let report = engine.analyze(&doc);
            if cli.json {
                write_json(&report)?;
            } else {
                crate::ui::print_audit(&report, &ui_cfg);
            }
        }
        Commands::Report(args) => {
            let doc = load_document(&args.input)?;
            let report = engine.analyze(&doc);
            if args.markdown {
                let include_attachments =
                    args.include_attachments || cfg.report.include_attachments;
                let markdown = crate::ui::render_markdown(&report, include_attachments);
                write_output(args.output.as_deref(), &markdown)?;
            } else if let Some(path) = args.output.as_deref() {
                let buf = serde_json::to_vec_pretty(&report)?;
                std::fs::write(path, buf)
                    .with_context(|| format!("failed to write report: {}", path.display()))?;
            } else {
                write_json(&report)?;
            }
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "sgaudit", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `sgaudit config --show`");
            }
        }
    }

    Ok(())
}

fn load_document(path: &Path) -> Result<ScanDocument> {
    crate::inventory::load(path).map_err(crate::exit::input_failed_err)
}

fn write_json(report: &crate::core::Report) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(report)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    use std::io::Write;

    let Some(path) = path else {
        let mut stdout = std::io::stdout().lock();
        return match stdout.write_all(content.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            Err(err) => Err(err.into()),
        };
    };
    std::fs::write(path, content)
        .with_context(|| format!("failed to write report: {}", path.display()))
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
