#![allow(dead_code)]

use std::{net::SocketAddr, num::NonZeroUsize, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode},
};
use freshline::{
    config::{
        CdnSettings, EdgeSettings, LocalCacheSettings, LogFormat, LoggingSettings,
        RevalidateSettings, Secret, ServerSettings, Settings,
    },
    context::build_application_context,
    infra::http::build_router,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing::level_filters::LevelFilter;
use url::Url;

pub const SECRET: &str = "test-secret";

/// Settings with both backends pointed at the given base URLs (or skipped).
pub fn settings(edge_base: Option<&str>, cdn_endpoint: Option<&str>) -> Settings {
    Settings {
        server: ServerSettings {
            addr: "127.0.0.1:0".parse().expect("addr"),
            graceful_shutdown: Duration::from_secs(1),
        },
        logging: LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        },
        revalidate: RevalidateSettings {
            secret: Some(Secret::new(SECRET)),
            audit_sample_rate: 1.0,
        },
        local_cache: LocalCacheSettings {
            capacity: NonZeroUsize::new(16).expect("non-zero"),
            origin_capacity: NonZeroUsize::new(16).expect("non-zero"),
        },
        edge: EdgeSettings {
            api_token: edge_base.map(|_| Secret::new("edge-token")),
            zone_id: edge_base.map(|_| "zone-1".to_string()),
            base_url: Url::parse(edge_base.unwrap_or("https://api.cloudflare.com/client/v4"))
                .expect("edge url"),
            host: None,
            timeout: Duration::from_secs(2),
        },
        cdn: CdnSettings {
            endpoint: cdn_endpoint.map(|raw| Url::parse(raw).expect("cdn url")),
            distribution_id: cdn_endpoint.map(|_| "dist-1".to_string()),
            api_token: None,
            timeout: Duration::from_secs(2),
            max_paths: NonZeroUsize::new(3000).expect("non-zero"),
        },
    }
}

pub fn router(settings: &Settings) -> Router {
    let app = build_application_context(settings).expect("application context");
    build_router(app.http_state)
}

pub fn revalidate_request(secret: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/revalidate")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-revalidate-secret", secret);
    }
    let mut request = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");
    let peer: SocketAddr = "198.51.100.20:40000".parse().expect("peer");
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(router: &Router, request: Request<Body>) -> Reply {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        headers,
        body,
    }
}
