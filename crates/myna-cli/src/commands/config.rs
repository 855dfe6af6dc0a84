//! Config command

use crate::app::{ConfigAction, ConfigArgs, OutputFormat};
use anyhow::Result;
use myna_core::Config;

const REDACTED: &str = "********";

pub fn run(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    let path = Config::default_path();

    match args.action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let mut config = Config::load_from(&path)?;
            redact(&mut config);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Cli => print!("{}", serde_yaml::to_string(&config)?),
            }
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::template().save()?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

fn redact(config: &mut Config) {
    if config.llm_service.api_key.is_some() {
        config.llm_service.api_key = Some(REDACTED.to_string());
    }
    if config.vector_store.api_key.is_some() {
        config.vector_store.api_key = Some(REDACTED.to_string());
    }
}
