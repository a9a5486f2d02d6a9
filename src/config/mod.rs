//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    fmt,
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "freshline";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_AUDIT_SAMPLE_RATE: f64 = 0.01;
const DEFAULT_LOCAL_CACHE_CAPACITY: u64 = 256;
const DEFAULT_ORIGIN_CACHE_CAPACITY: u64 = 1024;
const DEFAULT_EDGE_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CDN_MAX_PATHS: u64 = 3000;

/// Credential that never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub revalidate: RevalidateSettings,
    pub local_cache: LocalCacheSettings,
    pub edge: EdgeSettings,
    pub cdn: CdnSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct RevalidateSettings {
    /// Shared secret; `None` rejects every request.
    pub secret: Option<Secret>,
    /// Fraction of rejections that emit an audit event, within [0, 1].
    pub audit_sample_rate: f64,
}

#[derive(Debug, Clone)]
pub struct LocalCacheSettings {
    pub capacity: NonZeroUsize,
    pub origin_capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct EdgeSettings {
    pub api_token: Option<Secret>,
    pub zone_id: Option<String>,
    pub base_url: Url,
    /// Host prepended to every prefix, e.g. `www.example.com`.
    pub host: Option<String>,
    pub timeout: Duration,
}

impl EdgeSettings {
    pub fn is_configured(&self) -> bool {
        self.api_token.is_some() && self.zone_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CdnSettings {
    pub endpoint: Option<Url>,
    pub distribution_id: Option<String>,
    pub api_token: Option<Secret>,
    pub timeout: Duration,
    pub max_paths: NonZeroUsize,
}

impl CdnSettings {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.distribution_id.is_some()
    }
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

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FRESHLINE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CheckConfig) | None => {}
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    revalidate: RawRevalidateSettings,
    local_cache: RawLocalCacheSettings,
    edge: RawEdgeSettings,
    cdn: RawCdnSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(rate) = overrides.audit_sample_rate {
            self.revalidate.audit_sample_rate = Some(rate);
        }
        if let Some(seconds) = overrides.edge_timeout_seconds {
            self.edge.timeout_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cdn_timeout_seconds {
            self.cdn.timeout_seconds = Some(seconds);
        }
        if let Some(max) = overrides.cdn_max_paths {
            self.cdn.max_paths = Some(max);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            revalidate,
            local_cache,
            edge,
            cdn,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            revalidate: build_revalidate_settings(revalidate)?,
            local_cache: build_local_cache_settings(local_cache)?,
            edge: build_edge_settings(edge)?,
            cdn: build_cdn_settings(cdn)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = positive_seconds(graceful_secs, "server.graceful_shutdown_seconds")?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
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

fn build_revalidate_settings(
    revalidate: RawRevalidateSettings,
) -> Result<RevalidateSettings, LoadError> {
    let rate = revalidate
        .audit_sample_rate
        .unwrap_or(DEFAULT_AUDIT_SAMPLE_RATE);
    if rate.is_nan() {
        return Err(LoadError::invalid(
            "revalidate.audit_sample_rate",
            "must be a number",
        ));
    }

    Ok(RevalidateSettings {
        secret: non_blank(revalidate.secret).map(Secret::new),
        audit_sample_rate: rate.clamp(0.0, 1.0),
    })
}

fn build_local_cache_settings(
    local_cache: RawLocalCacheSettings,
) -> Result<LocalCacheSettings, LoadError> {
    let capacity = local_cache
        .capacity
        .unwrap_or(DEFAULT_LOCAL_CACHE_CAPACITY);
    let origin_capacity = local_cache
        .origin_capacity
        .unwrap_or(DEFAULT_ORIGIN_CACHE_CAPACITY);

    Ok(LocalCacheSettings {
        capacity: non_zero_usize(capacity, "local_cache.capacity")?,
        origin_capacity: non_zero_usize(origin_capacity, "local_cache.origin_capacity")?,
    })
}

fn build_edge_settings(edge: RawEdgeSettings) -> Result<EdgeSettings, LoadError> {
    let base_url = match non_blank(edge.base_url) {
        Some(raw) => parse_url(&raw, "edge.base_url")?,
        None => parse_url(DEFAULT_EDGE_BASE_URL, "edge.base_url")?,
    };
    let timeout = positive_seconds(
        edge.timeout_seconds
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
        "edge.timeout_seconds",
    )?;

    Ok(EdgeSettings {
        api_token: non_blank(edge.api_token).map(Secret::new),
        zone_id: non_blank(edge.zone_id),
        base_url,
        host: non_blank(edge.host).map(|host| host.trim_end_matches('/').to_string()),
        timeout,
    })
}

fn build_cdn_settings(cdn: RawCdnSettings) -> Result<CdnSettings, LoadError> {
    let endpoint = non_blank(cdn.endpoint)
        .map(|raw| parse_url(&raw, "cdn.endpoint"))
        .transpose()?;
    let timeout = positive_seconds(
        cdn.timeout_seconds.unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
        "cdn.timeout_seconds",
    )?;
    let max_paths = non_zero_usize(
        cdn.max_paths.unwrap_or(DEFAULT_CDN_MAX_PATHS),
        "cdn.max_paths",
    )?;

    Ok(CdnSettings {
        endpoint,
        distribution_id: non_blank(cdn.distribution_id),
        api_token: non_blank(cdn.api_token).map(Secret::new),
        timeout,
        max_paths,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
    audit_sample_rate: Option<f64>,
}

impl fmt::Debug for RawRevalidateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRevalidateSettings")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("audit_sample_rate", &self.audit_sample_rate)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLocalCacheSettings {
    capacity: Option<u64>,
    origin_capacity: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawEdgeSettings {
    api_token: Option<String>,
    zone_id: Option<String>,
    base_url: Option<String>,
    host: Option<String>,
    timeout_seconds: Option<u64>,
}

impl fmt::Debug for RawEdgeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawEdgeSettings")
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("host", &self.host)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawCdnSettings {
    endpoint: Option<String>,
    distribution_id: Option<String>,
    api_token: Option<String>,
    timeout_seconds: Option<u64>,
    max_paths: Option<u64>,
}

impl fmt::Debug for RawCdnSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCdnSettings")
            .field("endpoint", &self.endpoint)
            .field("distribution_id", &self.distribution_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_paths", &self.max_paths)
            .finish()
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(raw: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("invalid url `{raw}`: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
