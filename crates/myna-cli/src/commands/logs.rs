//! Logs command

use crate::app::{LogsArgs, OutputFormat};
use anyhow::Result;
use myna_core::audit::read_recent;
use myna_core::Config;

pub fn run(args: LogsArgs, format: OutputFormat) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => Config::load()?.audit.log_path.ok_or_else(|| {
            anyhow::anyhow!("No interaction log configured (set audit.log_path or MYNA_AUDIT_LOG)")
        })?,
    };

    let lines = read_recent(&path, args.limit)?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = lines
                .iter()
                .map(|line| {
                    serde_json::from_str(line)
                        .unwrap_or_else(|_| serde_json::Value::String(line.clone()))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Cli => {
            if lines.is_empty() {
                eprintln!("No log entries in {}", path.display());
            }
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
