//! Cookie-backed ticket transport
//!
//! Reads the ticket cookie from the request and turns queued updates into a
//! `Set-Cookie` header. Protecting the cookie value is the codec's job.

use std::sync::Arc;

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use cookie::{Cookie, CookieJar, Key, SameSite};
use impersonation::{ImpersonationConfig, SessionToken, TicketTransport};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Turns tickets into cookie values and back.
///
/// Production hosts supply a codec that encrypts and authenticates the
/// value. `decode` returns `None` for anything it cannot verify.
pub trait TicketCodec: Send + Sync {
    fn encode(&self, ticket: &SessionToken) -> ApiResult<String>;
    fn decode(&self, value: &str) -> Option<SessionToken>;
}

/// Unprotected base64(JSON) codec for development and tests.
///
/// Clients can forge these tickets. Deployments use [`PrivateTicketCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTicketCodec;

impl TicketCodec for PlainTicketCodec {
    fn encode(&self, ticket: &SessionToken) -> ApiResult<String> {
        let json = serde_json::to_vec(ticket)
            .map_err(|e| ApiError::InternalError(format!("Failed to serialize ticket: {}", e)))?;
        Ok(BASE64.encode(json))
    }

    fn decode(&self, value: &str) -> Option<SessionToken> {
        let bytes = BASE64.decode(value.as_bytes()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Name the sealed value is bound to inside the private jar
const SEALED_NAME: &str = "impersonation_ticket";

/// Encrypting codec built on the `cookie` crate's private cookies.
///
/// Values are sealed with AES-256-GCM, so a client can neither read
/// nor forge a ticket. Anything sealed under another key decodes as `None`.
#[derive(Clone)]
pub struct PrivateTicketCodec {
    key: Key,
}

impl PrivateTicketCodec {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Build from a 64-byte key written as 128 hex characters.
    ///
    /// Generate one with `openssl rand -hex 64`.
    pub fn from_hex(hex_key: &str) -> ApiResult<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| ApiError::InternalError(format!("Invalid ticket key format: {}", e)))?;
        if bytes.len() != 64 {
            return Err(ApiError::InternalError(
                "Ticket key must be 64 bytes (128 hex characters)".to_string(),
            ));
        }
        Ok(Self::new(Key::from(bytes.as_slice())))
    }

    /// A random key. Tickets do not survive a restart.
    pub fn generate() -> Self {
        Self::new(Key::generate())
    }
}

impl TicketCodec for PrivateTicketCodec {
    fn encode(&self, ticket: &SessionToken) -> ApiResult<String> {
        let json = serde_json::to_string(ticket)
            .map_err(|e| ApiError::InternalError(format!("Failed to serialize ticket: {}", e)))?;

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(Cookie::new(SEALED_NAME, json));
        jar.get(SEALED_NAME)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| ApiError::InternalError("Failed to seal ticket".to_string()))
    }

    fn decode(&self, value: &str) -> Option<SessionToken> {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(SEALED_NAME, value.to_string()));
        let cookie = jar.private(&self.key).get(SEALED_NAME)?;
        serde_json::from_str(cookie.value()).ok()
    }
}

/// Request-scoped ticket transport over the configured cookie.
pub struct CookieTicketTransport {
    codec: Arc<dyn TicketCodec>,
    cookie_name: String,
    cookie_path: String,
    incoming: Option<String>,
    pending: Option<Option<SessionToken>>,
    response_written: bool,
}

impl CookieTicketTransport {
    /// Capture the ticket cookie from request headers.
    pub fn from_headers(
        headers: &HeaderMap,
        config: &ImpersonationConfig,
        codec: Arc<dyn TicketCodec>,
    ) -> Self {
        Self {
            codec,
            incoming: find_cookie(headers, &config.cookie_name),
            cookie_name: config.cookie_name.clone(),
            cookie_path: config.cookie_path.clone(),
            pending: None,
            response_written: false,
        }
    }

    /// Note a ticket cookie already set by the response.
    pub fn observe_response(&mut self, headers: &HeaderMap) {
        self.response_written |= headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value).ok())
            .any(|cookie| cookie.name() == self.cookie_name);
    }

    /// The `Set-Cookie` header for the queued update, if there is one.
    pub fn into_set_cookie(self) -> ApiResult<Option<HeaderValue>> {
        let Some(update) = self.pending else {
            return Ok(None);
        };

        let cookie = match update {
            Some(ticket) => Cookie::build((self.cookie_name, self.codec.encode(&ticket)?))
                .path(ticket.path)
                .http_only(true)
                .same_site(SameSite::Lax)
                .build(),
            None => {
                let mut cookie = Cookie::build((self.cookie_name, ""))
                    .path(self.cookie_path)
                    .build();
                cookie.make_removal();
                cookie
            }
        };

        HeaderValue::from_str(&cookie.to_string())
            .map(Some)
            .map_err(|e| ApiError::InternalError(format!("Invalid ticket cookie: {}", e)))
    }
}

impl TicketTransport for CookieTicketTransport {
    fn read_token(&mut self) -> Option<SessionToken> {
        let value = self.incoming.as_deref()?;
        let ticket = self.codec.decode(value);
        if ticket.is_none() {
            warn!("Ignoring ticket cookie '{}' that failed to decode", self.cookie_name);
        }
        ticket
    }

    fn write_token(&mut self, token: Option<SessionToken>) {
        debug!("Ticket cookie update queued (delete: {})", token.is_none());
        self.pending = Some(token);
    }

    fn has_pending_write(&self) -> bool {
        self.response_written || self.pending.is_some()
    }
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn codec() -> Arc<dyn TicketCodec> {
        Arc::new(PlainTicketCodec)
    }

    fn ticket() -> SessionToken {
        SessionToken::fresh("alice", Utc::now(), Duration::minutes(30))
            .with_impersonated_user(Some("bob"))
    }

    #[test]
    fn test_plain_codec_rejects_garbage() {
        assert!(PlainTicketCodec.decode("!!not base64!!").is_none());
        assert!(PlainTicketCodec.decode(&BASE64.encode(b"{\"x\":1}")).is_none());
    }

    #[test]
    fn test_private_codec_seals_ticket() {
        let codec = PrivateTicketCodec::generate();
        let ticket = ticket();

        let sealed = codec.encode(&ticket).unwrap();
        assert!(!sealed.contains("alice"));
        assert_eq!(codec.decode(&sealed), Some(ticket));

        // A plain ticket is not accepted as a sealed one
        let forged = PlainTicketCodec.encode(&SessionToken::fresh(
            "alice",
            Utc::now(),
            Duration::minutes(30),
        ))
        .unwrap();
        assert_eq!(codec.decode(&forged), None);

        // Neither is a ticket sealed under another key
        assert_eq!(PrivateTicketCodec::generate().decode(&sealed), None);
    }

    #[test]
    fn test_private_codec_from_hex() {
        let hex_key = "ab".repeat(64);
        let codec = PrivateTicketCodec::from_hex(&hex_key).unwrap();
        let again = PrivateTicketCodec::from_hex(&hex_key).unwrap();

        let sealed = codec.encode(&ticket()).unwrap();
        assert!(again.decode(&sealed).is_some());

        assert!(PrivateTicketCodec::from_hex("not hex").is_err());
        assert!(PrivateTicketCodec::from_hex(&"ab".repeat(32)).is_err());
    }

    #[test]
    fn test_reads_named_cookie() {
        let config = ImpersonationConfig::default();
        let ticket = ticket();
        let value = PlainTicketCodec.encode(&ticket).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("other=1; impersonation_ticket={}", value)).unwrap(),
        );

        let mut transport = CookieTicketTransport::from_headers(&headers, &config, codec());
        assert_eq!(transport.read_token(), Some(ticket));
    }

    #[test]
    fn test_missing_or_tampered_cookie_reads_as_none() {
        let config = ImpersonationConfig::default();

        let mut transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());
        assert_eq!(transport.read_token(), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("impersonation_ticket=tampered"));
        let mut transport = CookieTicketTransport::from_headers(&headers, &config, codec());
        assert_eq!(transport.read_token(), None);
    }

    #[test]
    fn test_write_builds_set_cookie() {
        let config = ImpersonationConfig::default();
        let mut transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());
        assert!(!transport.has_pending_write());

        let ticket = ticket();
        transport.write_token(Some(ticket.clone()));
        assert!(transport.has_pending_write());

        let header = transport.into_set_cookie().unwrap().unwrap();
        let cookie = Cookie::parse(header.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.name(), "impersonation_ticket");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(PlainTicketCodec.decode(cookie.value()), Some(ticket));
    }

    #[test]
    fn test_set_cookie_uses_ticket_path() {
        let config = ImpersonationConfig::default();
        let mut transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());
        transport.write_token(Some(ticket().with_path("/portal")));

        let header = transport.into_set_cookie().unwrap().unwrap();
        let cookie = Cookie::parse(header.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.path(), Some("/portal"));
    }

    #[test]
    fn test_delete_builds_removal_cookie() {
        let config = ImpersonationConfig::default();
        let mut transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());
        transport.write_token(None);

        let header = transport.into_set_cookie().unwrap().unwrap();
        let cookie = Cookie::parse(header.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
    }

    #[test]
    fn test_no_update_no_header() {
        let config = ImpersonationConfig::default();
        let transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());
        assert!(transport.into_set_cookie().unwrap().is_none());
    }

    #[test]
    fn test_observe_response() {
        let config = ImpersonationConfig::default();
        let mut transport = CookieTicketTransport::from_headers(&HeaderMap::new(), &config, codec());

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("unrelated=1; Path=/"));
        transport.observe_response(&headers);
        assert!(!transport.has_pending_write());

        headers.append(SET_COOKIE, HeaderValue::from_static("impersonation_ticket=abc; Path=/"));
        transport.observe_response(&headers);
        assert!(transport.has_pending_write());
    }
}
