mod middleware;
mod revalidate;

use std::{any::Any, sync::Arc};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use freshline_api_types::REVALIDATE_PATH;
use tower_http::catch_panic::CatchPanicLayer;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use crate::application::{error::RevalidateError, revalidate::RevalidationService};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub revalidation: Arc<RevalidationService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(
            REVALIDATE_PATH,
            post(revalidate::revalidate).fallback(revalidate::method_not_allowed),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Sits inside the response logger so the panic detail lands in the error log.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    RevalidateError::unexpected(format!("handler panicked: {detail}")).into_response()
}
