//! macrodrive CLI — run document macros through the automation host.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use macrodrive::{AutomationHost, AutomationSession, HostConfig, ProcessHost, ScalarValue};

#[derive(Parser)]
#[command(name = "macrodrive")]
#[command(
    author,
    version,
    about = "Run document macros through an external automation host"
)]
struct Cli {
    /// Path to the automation host launcher executable
    #[arg(long, global = true)]
    host_exe: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a document, run a macro, and save a timestamped copy
    Run {
        /// Template document to open
        template: PathBuf,

        /// Macro to invoke, e.g. "ThisWorkbook.Refresh" (qualified with the
        /// document name automatically)
        macro_name: String,

        /// Macro argument, repeatable up to nine times; parsed as bool,
        /// number, or string
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Directory the result file is written to (default: alongside the
        /// template)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Start and quit the host to verify the installation
    Check,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = HostConfig {
        host_exe_path: cli.host_exe,
        extra_args: Vec::new(),
    };

    match cli.command {
        Commands::Run {
            template,
            macro_name,
            args,
            out_dir,
        } => run(config, &template, &macro_name, &args, out_dir.as_deref()),
        Commands::Check => check(config),
    }
}

fn run(
    config: HostConfig,
    template: &Path,
    macro_name: &str,
    raw_args: &[String],
    out_dir: Option<&Path>,
) -> Result<()> {
    let args: Vec<ScalarValue> = raw_args.iter().map(|raw| parse_scalar(raw)).collect();

    // The session blocks this thread for the whole run; a data-heavy macro
    // can take a long time.
    let mut session = AutomationSession::launch(config, template)
        .with_context(|| format!("failed to open '{}'", template.display()))?;

    let value = session
        .invoke(macro_name, &args)
        .with_context(|| format!("macro '{macro_name}' failed"))?;
    if !value.is_null() {
        eprintln!("macro returned: {value}");
    }

    let file_name = result_file_name(template)?;
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => template.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };
    let target = dir.join(&file_name);

    session
        .save_as(&target)
        .with_context(|| format!("failed to save '{}'", target.display()))?;
    session.close().context("session teardown reported failures")?;

    // the derived file name is the caller-visible result
    println!("{file_name}");
    Ok(())
}

fn check(config: HostConfig) -> Result<()> {
    let host = ProcessHost::start(config).context("failed to start the automation host")?;
    host.quit().context("host did not quit cleanly")?;
    eprintln!("automation host OK");
    Ok(())
}

/// `template.xlsm` → `template_20240101000000.xlsm`.
fn result_file_name(template: &Path) -> Result<String> {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .context("template has no usable file name")?;
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    Ok(match template.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{timestamp}.{ext}"),
        None => format!("{stem}_{timestamp}"),
    })
}

/// Booleans and numbers become typed scalars, everything else stays a string.
fn parse_scalar(raw: &str) -> ScalarValue {
    if let Ok(b) = raw.parse::<bool>() {
        return ScalarValue::Bool(b);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return ScalarValue::Number(n);
    }
    ScalarValue::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scalar_types() {
        assert_eq!(parse_scalar("true"), ScalarValue::Bool(true));
        assert_eq!(parse_scalar("1.5"), ScalarValue::Number(1.5));
        assert_eq!(parse_scalar("a1"), ScalarValue::String("a1".to_string()));
        // anything a bool or number parser rejects stays a string
        assert_eq!(parse_scalar("TRUEish"), ScalarValue::String("TRUEish".to_string()));
    }

    #[test]
    fn result_file_name_keeps_stem_and_extension() {
        let name = result_file_name(Path::new("/data/template.xlsm")).unwrap();
        assert!(name.starts_with("template_"));
        assert!(name.ends_with(".xlsm"));
        assert_eq!(name.len(), "template_".len() + 14 + ".xlsm".len());
    }
}
