use std::net::SocketAddr;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header::ALLOW},
    response::{IntoResponse, Response},
};
use freshline_api_types::{ErrorBody, SECRET_HEADER};

use crate::application::{
    auth::AuditContext, error::ErrorReport, revalidate::RevalidateCommand,
};

use super::HttpState;

const MAX_BODY_BYTES: usize = 64 * 1024;
const SOURCE: &str = "infra::http::revalidate";

pub(super) async fn revalidate(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    // A present but non-UTF-8 header still counts as a (wrong) credential.
    let secret = parts
        .headers
        .get(SECRET_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    let audit = AuditContext {
        path: parts.uri.path(),
        headers: &parts.headers,
        peer,
    };

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            return state
                .revalidation
                .reject_unreadable(secret, audit, format!("failed to read body: {err}"))
                .into_response();
        }
    };

    let command = RevalidateCommand {
        secret,
        body: &body,
        audit,
    };

    match state.revalidation.revalidate(command).await {
        Ok(aggregated) => match aggregated.into_body() {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(err) => err.into_response(),
        },
        Err(err) => err.into_response(),
    }
}

pub(super) async fn method_not_allowed() -> Response {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    let mut response = (
        status,
        [(ALLOW, "POST")],
        Json(ErrorBody::new("Method not allowed")),
    )
        .into_response();
    ErrorReport::from_message(SOURCE, status, "only POST is accepted").attach(&mut response);
    response
}
