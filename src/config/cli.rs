use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the freshline binary.
#[derive(Debug, Parser)]
#[command(name = "freshline", version, about = "Freshline revalidation server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FRESHLINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the revalidation HTTP service.
    Serve(Box<ServeArgs>),
    /// Print the resolved configuration (secrets redacted) and exit.
    #[command(name = "check-config")]
    CheckConfig,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

/// Secrets and credentials are deliberately not accepted as flags.
#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the fraction of rejected credentials that are audit-logged.
    #[arg(long = "audit-sample-rate", value_name = "RATE")]
    pub audit_sample_rate: Option<f64>,

    /// Override the edge purge request timeout.
    #[arg(long = "edge-timeout-seconds", value_name = "SECONDS")]
    pub edge_timeout_seconds: Option<u64>,

    /// Override the CDN invalidation request timeout.
    #[arg(long = "cdn-timeout-seconds", value_name = "SECONDS")]
    pub cdn_timeout_seconds: Option<u64>,

    /// Override the maximum number of paths per CDN invalidation.
    #[arg(long = "cdn-max-paths", value_name = "COUNT")]
    pub cdn_max_paths: Option<u64>,
}
