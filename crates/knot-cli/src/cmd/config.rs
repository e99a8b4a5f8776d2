use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use knot_core::config::{
    CONFIG_ENV, ProjectConfig, load_config, load_required_config, resolve_config_path,
    user_config_path,
};
use knot_core::error::ErrorCode;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration (defaults merged with the file)
    Show,
    /// Check thresholds, weights and LLM settings without running anything
    Validate,
    /// Print which config file would be loaded
    Path,
}

/// A resolved config file and its parsed contents.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// `None` when no file was found and defaults are in effect.
    pub path: Option<PathBuf>,
    pub config: ProjectConfig,
}

/// Resolve and parse the config file for this invocation.
///
/// A path named by `--config` or `KNOT_CONFIG` must exist; discovered paths
/// fall back to defaults. Failures are rendered with their error code before
/// returning.
pub fn load(explicit: Option<&Path>, output: OutputMode) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir()?;
    let env_value = std::env::var(CONFIG_ENV).ok();
    let named = explicit.is_some() || env_value.as_deref().is_some_and(|v| !v.trim().is_empty());
    let path = resolve_config_path(explicit, env_value.as_deref(), &cwd, user_config_path());

    let Some(path) = path else {
        return Ok(LoadedConfig::default());
    };

    let loaded = if named {
        load_required_config(&path)
    } else {
        load_config(&path)
    };

    match loaded {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(LoadedConfig {
                path: Some(path),
                config,
            })
        }
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            Err(err)
        }
    }
}

pub fn run_config(args: &ConfigArgs, loaded: &LoadedConfig, output: OutputMode) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(loaded, output),
        ConfigCommand::Validate => validate(loaded, output),
        ConfigCommand::Path => print_path(loaded, output),
    }
}

fn source_label(loaded: &LoadedConfig) -> String {
    loaded
        .path
        .as_ref()
        .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string())
}

fn show(loaded: &LoadedConfig, output: OutputMode) -> Result<()> {
    if output.is_json() {
        return render_mode(output, &loaded.config, |_, _| Ok(()), |_, _| Ok(()));
    }

    let rendered =
        toml::to_string_pretty(&loaded.config).context("Failed to render configuration")?;
    let mut out = io::stdout().lock();
    if output == OutputMode::Pretty {
        pretty_section(&mut out, &format!("Configuration {}", source_label(loaded)))?;
    }
    write!(out, "{rendered}")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    source: String,
}

fn validate(loaded: &LoadedConfig, output: OutputMode) -> Result<()> {
    if let Err(err) = loaded.config.inference.validate() {
        render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
        bail!("configuration is invalid");
    }

    let report = ValidationReport {
        valid: true,
        source: source_label(loaded),
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "ok\t{}", r.source),
        |r, w| {
            pretty_section(w, "Configuration check")?;
            pretty_kv(w, "source", &r.source)?;
            pretty_kv(w, "status", "valid")
        },
    )
}

fn print_path(loaded: &LoadedConfig, output: OutputMode) -> Result<()> {
    let value = serde_json::json!({ "path": loaded.path });
    render_mode(
        output,
        &value,
        |_, w| writeln!(w, "{}", source_label(loaded)),
        |_, w| pretty_kv(w, "config", source_label(loaded)),
    )
}
