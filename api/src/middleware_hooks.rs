use axum::{
    body::Body,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use impersonation::{ExpirySlider, Identity, SlideOutcome};
use tracing::{debug, error, trace};

use crate::{transport::CookieTicketTransport, AppState};

/// Header carrying the user name authenticated by a fronting proxy
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Header carrying the scheme the fronting proxy authenticated with
pub const REMOTE_AUTH_TYPE_HEADER: &str = "x-remote-auth-type";

/// Identity middleware
///
/// Makes sure every request carries an [`Identity`] extension. An identity
/// inserted by an outer layer wins. Otherwise, when the deployment trusts its
/// proxy, the identity is read from the proxy's headers; if not, the request
/// is anonymous.
///
/// # Security Notes
///
/// - Only enable `trust_proxy_headers` behind a proxy that strips these
///   headers from client requests
/// - Header values that are not visible ASCII are treated as absent
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.extensions().get::<Identity>().is_none() {
        let identity = if state.trust_proxy_headers {
            identity_from_headers(request.headers())
        } else {
            Identity::anonymous()
        };
        trace!(
            "IDENTITY MIDDLEWARE: {} {} as '{}' ({})",
            request.method(),
            request.uri(),
            identity.name,
            identity.authentication_type
        );
        request.extensions_mut().insert(identity);
    }

    next.run(request).await
}

/// Build an identity from trusted proxy headers
///
/// A missing or blank user header yields an anonymous identity.
pub fn identity_from_headers(headers: &HeaderMap) -> Identity {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    match header(REMOTE_USER_HEADER) {
        Some(name) => Identity::authenticated(name, header(REMOTE_AUTH_TYPE_HEADER).unwrap_or_default()),
        None => Identity::anonymous(),
    }
}

/// Sliding expiration middleware
///
/// Runs after the handler. Renews the ticket cookie once less than half of
/// its lifetime is left and deletes it once expired. Skipped for anonymous
/// requests and for responses that already set the ticket cookie.
pub async fn sliding_expiration_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let recognized = request
        .extensions()
        .get::<Identity>()
        .is_some_and(|identity| identity.is_authenticated);
    if !recognized {
        return next.run(request).await;
    }

    let now = Utc::now();
    let mut transport =
        CookieTicketTransport::from_headers(request.headers(), &state.config, state.codec.clone());

    let mut response = next.run(request).await;
    transport.observe_response(response.headers());

    let outcome = ExpirySlider::new(state.config.ticket_timeout).slide(&mut transport, now);
    match &outcome {
        SlideOutcome::Renewed(ticket) => debug!(
            "SLIDING MIDDLEWARE: Renewed ticket for {} until {}",
            ticket.actual_user,
            ticket.expire_time.to_rfc3339()
        ),
        SlideOutcome::Invalidated => debug!("SLIDING MIDDLEWARE: Removed expired ticket"),
        other => trace!("SLIDING MIDDLEWARE: {:?}", other),
    }

    match transport.into_set_cookie() {
        Ok(Some(cookie)) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Ok(None) => {}
        Err(e) => error!("SLIDING MIDDLEWARE: Failed to write ticket cookie: {}", e),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("alice"));
        headers.insert(REMOTE_AUTH_TYPE_HEADER, HeaderValue::from_static("Negotiate"));

        let identity = identity_from_headers(&headers);
        assert!(identity.is_authenticated);
        assert_eq!(identity.name, "alice");
        assert_eq!(identity.authentication_type, "Negotiate");
    }

    #[test]
    fn test_missing_user_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_AUTH_TYPE_HEADER, HeaderValue::from_static("Negotiate"));
        assert!(!identity_from_headers(&headers).is_authenticated);

        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("   "));
        assert!(!identity_from_headers(&headers).is_authenticated);
    }

    #[test]
    fn test_missing_auth_type_is_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("alice"));

        let identity = identity_from_headers(&headers);
        assert!(identity.is_authenticated);
        assert_eq!(identity.authentication_type, "");
    }
}
