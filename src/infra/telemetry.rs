use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "qbank_render_total",
            Unit::Count,
            "Total number of markdown documents rendered."
        );
        describe_counter!(
            "qbank_render_fallback_total",
            Unit::Count,
            "Renders that degraded to escaped source text."
        );
        describe_counter!(
            "qbank_enhance_pass_total",
            Unit::Count,
            "Enhancement passes run over mounted fragments."
        );
        describe_counter!(
            "qbank_diagram_render_failure_total",
            Unit::Count,
            "Diagrams revealed as raw source after an engine failure."
        );
        describe_counter!(
            "qbank_clipboard_failure_total",
            Unit::Count,
            "Clipboard writes that failed."
        );
    });
}
