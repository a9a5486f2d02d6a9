//! Process-lifetime wiring of the revalidation pipeline.

use std::sync::Arc;

use crate::{
    application::{
        auth::{AuditSampler, SecretAuthenticator},
        error::AppError,
        remote::RemoteInvalidator,
        revalidate::RevalidationService,
    },
    cache::{
        LocalCacheConfig, LocalCacheInvalidator, LocalCacheRegistry, OriginTagInvalidator,
        TaggedResponseCache,
    },
    config::Settings,
    domain::tags::TagRegistry,
    infra::{
        backends::{PatternInvalidationClient, PrefixPurgeClient, build_http_client},
        http::HttpState,
    },
};

/// Everything created once at startup and torn down at shutdown.
pub struct ApplicationContext {
    pub http_state: HttpState,
    pub local_caches: Arc<LocalCacheRegistry>,
    pub origin_cache: Arc<TaggedResponseCache>,
}

pub fn build_application_context(settings: &Settings) -> Result<ApplicationContext, AppError> {
    let local_caches = Arc::new(LocalCacheRegistry::with_memory_caches(
        &LocalCacheConfig::from(&settings.local_cache),
    ));
    build_with_local_caches(settings, local_caches)
}

/// Same as [`build_application_context`] with a caller-supplied local cache registry.
pub fn build_with_local_caches(
    settings: &Settings,
    local_caches: Arc<LocalCacheRegistry>,
) -> Result<ApplicationContext, AppError> {
    let registry = TagRegistry::new();
    let cache_config = LocalCacheConfig::from(&settings.local_cache);
    let origin_cache = Arc::new(TaggedResponseCache::new(registry, &cache_config));

    let http = build_http_client()?;
    let edge: Arc<dyn RemoteInvalidator> =
        Arc::new(PrefixPurgeClient::new(http.clone(), settings.edge.clone()));
    let cdn: Arc<dyn RemoteInvalidator> =
        Arc::new(PatternInvalidationClient::new(http, settings.cdn.clone()));

    let authenticator = SecretAuthenticator::new(
        settings.revalidate.secret.as_ref(),
        AuditSampler::with_rate(settings.revalidate.audit_sample_rate),
    );

    let revalidation = RevalidationService::new(
        registry,
        authenticator,
        LocalCacheInvalidator::new(registry, local_caches.clone()),
        OriginTagInvalidator::new(origin_cache.clone()),
        edge,
        cdn,
    );

    Ok(ApplicationContext {
        http_state: HttpState {
            revalidation: Arc::new(revalidation),
        },
        local_caches,
        origin_cache,
    })
}
