//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{config::parse_redirect, Config},
};

/// Configuration parser that layers defaults, `.env`, environment and CLI
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        self.cli.validate().map_err(AppError::config)?;

        if let Some(engine) = self.cli.engine {
            config.engine = engine;
        }

        if let Some(base_url) = &self.cli.base_url {
            config.base_url = base_url.trim().to_string();
        }

        if let Some(api_key) = &self.cli.api_key {
            config.api_key = api_key.trim().to_string();
        }

        let models = self.cli.model_list();
        if !models.is_empty() {
            config.models = models;
        }

        for redirect in &self.cli.redirects {
            let (display, upstream) = parse_redirect(redirect)
                .map_err(|e| AppError::config(format!("Invalid --redirect '{}': {}", redirect, e)))?;
            config.model_redirects.insert(display, upstream);
        }

        if let Some(concurrency) = self.cli.concurrency {
            config.concurrency = concurrency;
        }

        if let Some(timeout) = self.cli.timeout {
            config.timeout_seconds = timeout;
        }

        if self.cli.filter.is_some() {
            config.filter = self.cli.filter.clone();
        }

        if let Some(only) = &self.cli.only {
            config.only = Some(only.trim().to_string());
        }

        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Engine: {}", config.engine));
    summary.push(format!("Base URL: {}", config.base_url));
    summary.push(format!(
        "API Key: {}",
        if config.api_key.is_empty() { "(none)" } else { "(set)" }
    ));
    summary.push(format!("Models: {}", config.models.join(", ")));
    if !config.model_redirects.is_empty() {
        let redirects: Vec<String> = config
            .model_redirects
            .iter()
            .map(|(display, upstream)| format!("{} -> {}", display, upstream))
            .collect();
        summary.push(format!("Redirects: {}", redirects.join(", ")));
    }
    summary.push(format!("Concurrency: {}", config.concurrency));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    if let Some(filter) = &config.filter {
        summary.push(format!("Filter: {}", filter));
    }
    if let Some(only) = &config.only {
        summary.push(format!("Only: {}", only));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
