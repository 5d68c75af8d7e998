//! Request forwarding: header sanitization, credential injection, response relay.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Response, header};
use futures::StreamExt;
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::route::BackendRoute;

/// Hop-by-hop headers, never forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Forward a matched request to its backend and relay the response.
///
/// Blacklisted headers (always including `cookie`) are stripped, the
/// extracted token overwrites any inbound `Authorization` value, and the
/// upstream status, headers, and body are relayed verbatim. Upstream
/// transport errors surface as [`ProxyError::BackendUnavailable`] and are
/// never retried.
pub async fn forward(route: &BackendRoute, req: Request) -> Result<Response<Body>> {
    let token = route
        .extractor
        .extract(req.headers())
        .await
        .ok_or(ProxyError::AuthenticationRequired)?;

    let (parts, body) = req.into_parts();
    let target = route.rewrite_url(parts.uri.path(), parts.uri.query());

    debug!(route = %route.name, target = %target, method = %parts.method, "forwarding request");

    let mut headers = axum::http::HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if should_strip(route, name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ProxyError::AuthenticationRequired)?;
    headers.insert(header::AUTHORIZATION, bearer);

    let upstream = route
        .client
        .request(parts.method, target)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await
        .map_err(|e| ProxyError::BackendUnavailable(e.to_string()))?;

    let mut builder = Response::builder().status(upstream.status());
    for (name, value) in upstream.headers() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }

    let body = Body::from_stream(
        upstream
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other)),
    );

    builder
        .body(body)
        .map_err(|e| ProxyError::BackendUnavailable(format!("could not relay response: {}", e)))
}

fn should_strip(route: &BackendRoute, name: &HeaderName) -> bool {
    let name = name.as_str();
    // Authorization is replaced with the extracted token; Host is set from
    // the backend endpoint by the client.
    name == "authorization"
        || name == "host"
        || HOP_BY_HOP.contains(&name)
        || route.header_blacklist.iter().any(|h| h == name)
}
