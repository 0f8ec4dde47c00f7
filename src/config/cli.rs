use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Upper bound for `hot --rounds`.
pub const MAX_HOT_ROUNDS: u32 = 1000;

/// Command-line arguments for the qbank-render binary.
#[derive(Debug, Parser)]
#[command(
    name = "qbank-render",
    version,
    about = "Render question-bank markdown into interactive HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QBANK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a markdown file to an HTML fragment.
    Render(RenderArgs),
    /// Print the table of contents of a markdown file.
    Toc(TocArgs),
    /// Print the ranked hot-question feed from a questions JSON file.
    Hot(HotArgs),
    /// Render, mount and enhance a markdown file, then print the live HTML.
    Preview(PreviewArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the code fence language rendered as a diagram.
    #[arg(long = "render-diagram-language", value_name = "LANG")]
    pub diagram_language: Option<String>,

    /// Override the Mermaid CLI executable path used for diagram rendering.
    #[arg(long = "render-mermaid-cli-path", value_name = "PATH")]
    pub mermaid_cli_path: Option<PathBuf>,

    /// Override the directory used to cache rendered Mermaid diagrams.
    #[arg(long = "render-mermaid-cache-dir", value_name = "PATH")]
    pub mermaid_cache_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ViewOverrides {
    /// Override the delay before the enhancement pass runs.
    #[arg(long = "view-enhance-delay-ms", value_name = "MILLIS")]
    pub enhance_delay_ms: Option<u64>,

    /// Override how long copy confirmation stays visible.
    #[arg(long = "view-copy-feedback-ms", value_name = "MILLIS")]
    pub copy_feedback_ms: Option<u64>,

    /// Override the command that receives copied code on stdin.
    #[arg(long = "view-clipboard-command", value_name = "COMMAND")]
    pub clipboard_command: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Emit the fragment with its heading, code and diagram metadata as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TocArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct HotArgs {
    /// JSON array shaped like the `GET /questions` response.
    #[arg(value_name = "QUESTIONS_JSON", value_hint = ValueHint::FilePath)]
    pub questions: PathBuf,

    /// JSON array shaped like the `GET /questions/categories` response.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub categories: Option<PathBuf>,

    /// Starting window offset.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Number of windows to print, advancing between each.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_HOT_ROUNDS as i64))]
    pub rounds: u32,
}

#[derive(Debug, Args, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub view: ViewOverrides,

    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
