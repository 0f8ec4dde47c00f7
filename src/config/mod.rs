//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, HotArgs, LoggingOverrides, MAX_HOT_ROUNDS, PreviewArgs, RenderArgs,
    RenderOverrides, TocArgs, ViewOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "qbank";
const ENV_PREFIX: &str = "QBANK";
pub(crate) const DEFAULT_DIAGRAM_LANGUAGE: &str = "mermaid";
pub(crate) const DEFAULT_MERMAID_CLI_PATH: &str = "mmdc";
pub(crate) const DEFAULT_MERMAID_CACHE_DIR: &str = "/tmp/qbank-mermaid";
const DEFAULT_ENHANCE_DELAY_MS: u64 = 100;
const DEFAULT_COPY_FEEDBACK_MS: u64 = 2000;
const MAX_ENHANCE_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub view: ViewSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub diagram_language: String,
    pub mermaid_cli_path: PathBuf,
    pub mermaid_cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub enhance_delay: Duration,
    pub copy_feedback: Duration,
    pub clipboard_command: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_logging_overrides(&cli.logging);
    match &cli.command {
        Command::Render(args) => raw.apply_render_overrides(&args.render),
        Command::Toc(args) => raw.apply_render_overrides(&args.render),
        Command::Hot(_) => {}
        Command::Preview(args) => {
            raw.apply_render_overrides(&args.render);
            raw.apply_view_overrides(&args.view);
        }
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    view: RawViewSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(language) = overrides.diagram_language.as_ref() {
            self.render.diagram_language = Some(language.clone());
        }
        if let Some(path) = overrides.mermaid_cli_path.as_ref() {
            self.render.mermaid_cli_path = Some(path.clone());
        }
        if let Some(dir) = overrides.mermaid_cache_dir.as_ref() {
            self.render.mermaid_cache_dir = Some(dir.clone());
        }
    }

    fn apply_view_overrides(&mut self, overrides: &ViewOverrides) {
        if let Some(delay) = overrides.enhance_delay_ms {
            self.view.enhance_delay_ms = Some(delay);
        }
        if let Some(feedback) = overrides.copy_feedback_ms {
            self.view.copy_feedback_ms = Some(feedback);
        }
        if let Some(command) = overrides.clipboard_command.as_ref() {
            self.view.clipboard_command = Some(command.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            view,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            view: build_view_settings(view)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            render: RenderSettings {
                diagram_language: DEFAULT_DIAGRAM_LANGUAGE.to_string(),
                mermaid_cli_path: PathBuf::from(DEFAULT_MERMAID_CLI_PATH),
                mermaid_cache_dir: PathBuf::from(DEFAULT_MERMAID_CACHE_DIR),
            },
            view: ViewSettings {
                enhance_delay: Duration::from_millis(DEFAULT_ENHANCE_DELAY_MS),
                copy_feedback: Duration::from_millis(DEFAULT_COPY_FEEDBACK_MS),
                clipboard_command: None,
            },
        }
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let diagram_language = render
        .diagram_language
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_DIAGRAM_LANGUAGE.to_string());
    if diagram_language.is_empty() {
        return Err(LoadError::invalid(
            "render.diagram_language",
            "language must not be empty",
        ));
    }
    if diagram_language.chars().any(char::is_whitespace) {
        return Err(LoadError::invalid(
            "render.diagram_language",
            "language must be a single info-string token",
        ));
    }

    let cli_path = render
        .mermaid_cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MERMAID_CLI_PATH));
    if cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.mermaid_cli_path",
            "path must not be empty",
        ));
    }

    let cache_dir = render
        .mermaid_cache_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MERMAID_CACHE_DIR));
    if cache_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.mermaid_cache_dir",
            "path must not be empty",
        ));
    }

    Ok(RenderSettings {
        diagram_language,
        mermaid_cli_path: cli_path,
        mermaid_cache_dir: cache_dir,
    })
}

fn build_view_settings(view: RawViewSettings) -> Result<ViewSettings, LoadError> {
    let delay_ms = view.enhance_delay_ms.unwrap_or(DEFAULT_ENHANCE_DELAY_MS);
    if delay_ms > MAX_ENHANCE_DELAY_MS {
        return Err(LoadError::invalid(
            "view.enhance_delay_ms",
            format!("must not exceed {MAX_ENHANCE_DELAY_MS}"),
        ));
    }

    let feedback_ms = view.copy_feedback_ms.unwrap_or(DEFAULT_COPY_FEEDBACK_MS);
    if feedback_ms == 0 {
        return Err(LoadError::invalid(
            "view.copy_feedback_ms",
            "must be greater than zero",
        ));
    }

    let clipboard_command = view.clipboard_command.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(ViewSettings {
        enhance_delay: Duration::from_millis(delay_ms),
        copy_feedback: Duration::from_millis(feedback_ms),
        clipboard_command,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    diagram_language: Option<String>,
    mermaid_cli_path: Option<PathBuf>,
    mermaid_cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewSettings {
    enhance_delay_ms: Option<u64>,
    copy_feedback_ms: Option<u64>,
    clipboard_command: Option<String>,
}

#[cfg(test)]
mod tests;
