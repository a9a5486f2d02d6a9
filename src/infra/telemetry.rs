use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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
            "freshline_revalidate_requests_total",
            Unit::Count,
            "Revalidation requests by outcome (ok, unauthorized, invalid, error)."
        );
        describe_counter!(
            "freshline_auth_rejected_total",
            Unit::Count,
            "Requests rejected for a missing or wrong shared secret."
        );
        describe_counter!(
            "freshline_local_cache_clear_total",
            Unit::Count,
            "Local cache clear attempts by handle and result."
        );
        describe_counter!(
            "freshline_backend_outcome_total",
            Unit::Count,
            "Remote invalidation outcomes by backend."
        );
        describe_histogram!(
            "freshline_backend_latency_ms",
            Unit::Milliseconds,
            "Remote invalidation call latency in milliseconds."
        );
        describe_counter!(
            "freshline_cdn_truncated_total",
            Unit::Count,
            "CDN invalidations whose path list was capped."
        );
    });
}
