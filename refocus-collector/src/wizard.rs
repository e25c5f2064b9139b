//! Interactive CLI setup wizard for first-time configuration
//!
//! Prompts for the collector name, the controller address and token, and the
//! generators directory, then writes the config file (and the token to the OS
//! keyring when asked to).

use anyhow::{Context, Result};
use refocus_collector::config::{CollectorConfig, RefocusConfig};
use refocus_collector::MetadataCollector;
use std::io::{self, Write};
use std::path::PathBuf;

pub struct SetupWizard;

impl SetupWizard {
    /// Run the interactive setup wizard
    pub async fn run() -> Result<()> {
        println!();
        println!("======================================");
        println!("   REFOCUS COLLECTOR CONFIGURATION");
        println!("======================================");
        println!();

        let existing = CollectorConfig::load()
            .await
            .context("Failed to read existing configuration")?;

        Self::display_system_info();

        let name = Self::prompt_with_default(
            "Collector name",
            existing.name.as_deref().unwrap_or(&Self::default_name()),
        )?;

        let url = Self::prompt_with_default(
            "Controller URL",
            existing
                .refocus
                .url
                .as_deref()
                .unwrap_or("http://localhost:3000"),
        )?;

        let collector_token = Self::prompt_optional("Collector token")?
            .or(existing.refocus.collector_token.clone());

        let store_token = collector_token.is_some()
            && Self::prompt_yes_no("Store the token in the OS keyring?", true)?;

        let generators_dir = PathBuf::from(Self::prompt_with_default(
            "Generators directory",
            &existing.generators_dir.to_string_lossy(),
        )?);

        let heartbeat_interval_secs = Self::prompt_with_default_parse(
            "Heartbeat interval (seconds)",
            &existing.heartbeat_interval_secs.to_string(),
        )?;

        let config = CollectorConfig {
            name: Some(name),
            generators_dir,
            heartbeat_interval_secs,
            refocus: RefocusConfig {
                url: Some(url),
                collector_token,
                store_token,
                ..existing.refocus.clone()
            },
        };

        Self::display_summary(&config);

        if !Self::prompt_yes_no("Save this configuration?", true)? {
            println!("Configuration cancelled.");
            return Ok(());
        }

        if existing.refocus.store_token && !store_token {
            if let Err(e) = CollectorConfig::delete_token() {
                println!("Could not remove the old token from the keyring: {}", e);
            }
        }

        let path = config.save().await.context("Failed to save configuration")?;
        println!();
        println!("Configuration saved to {}", path.display());
        println!();

        Ok(())
    }

    fn display_system_info() {
        let metadata = MetadataCollector::new();
        let identity = metadata.identity();

        println!("SYSTEM INFORMATION");
        println!("----------------------------------------");
        println!("Hostname: {}", identity.hostname);
        println!("OS: {} ({})", identity.os, identity.architecture);
        if let Some(interface) = &identity.interface {
            println!("Address: {} on {}", interface.ip, interface.name);
        }
        println!();
    }

    fn display_summary(config: &CollectorConfig) {
        println!();
        println!("CONFIGURATION SUMMARY");
        println!("----------------------------------------");
        println!("Name: {}", config.name.as_deref().unwrap_or("-"));
        println!("Controller: {}", config.refocus.url.as_deref().unwrap_or("-"));
        println!(
            "Token: {}",
            match (&config.refocus.collector_token, config.refocus.store_token) {
                (None, _) => "not set",
                (Some(_), true) => "set (OS keyring)",
                (Some(_), false) => "set (config file)",
            }
        );
        println!("Generators: {}", config.generators_dir.display());
        println!("Heartbeat: every {}s", config.heartbeat_interval_secs);
        println!();
    }

    fn default_name() -> String {
        format!(
            "collector-{}",
            gethostname::gethostname().to_string_lossy().to_lowercase()
        )
    }

    // Helper functions for user input
    fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
        print!("{} [{}]: ", prompt, default);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input.to_string())
        }
    }

    fn prompt_with_default_parse<T: std::str::FromStr>(prompt: &str, default: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        loop {
            let input = Self::prompt_with_default(prompt, default)?;
            match input.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(e) => println!("Invalid input: {}. Please try again.", e),
            }
        }
    }

    fn prompt_optional(prompt: &str) -> Result<Option<String>> {
        print!("{} (leave empty to keep current): ", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok((!input.is_empty()).then(|| input.to_string()))
    }

    fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
        let default_str = if default { "Y/n" } else { "y/N" };

        loop {
            print!("{} [{}]: ", prompt, default_str);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            match input.trim().to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please enter 'y' or 'n'."),
            }
        }
    }
}
