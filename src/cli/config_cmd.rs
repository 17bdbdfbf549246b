use anyhow::Result;

use crate::cli::output::{to_json, OutputFormat, OutputOptions};
use crate::core::auth::discover_api_key;
use crate::core::config::AppConfig;

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save_to(&path) {
        Ok(()) => {
            println!("Generated config at {}", path.display());
            if discover_api_key(None).is_some() {
                println!("  API key found in tool configs or the environment.");
            } else {
                println!("  No API key found. Set `api_key` in the config or export key88.");
            }
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `c88 config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        println!("  Base URL: {}", config.settings.base_url);
        println!(
            "  Refresh every {}s, timeout {}ms",
            config.settings.refresh_interval_secs, config.settings.timeout_ms
        );
        let key = if discover_api_key(config.settings.api_key.as_deref()).is_some() {
            "found"
        } else {
            "missing"
        };
        println!("  API key: {}", key);
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}

pub fn path(opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    match opts.format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!(
            "{}",
            to_json(
                &serde_json::json!({
                    "path": path.display().to_string(),
                    "exists": path.exists(),
                }),
                opts
            )?
        ),
    }
    Ok(())
}
