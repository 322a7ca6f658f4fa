use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use impersonation::{
    EffectiveUser, Identity, ImpersonationError, ImpersonationSession, RequestContext,
};
use tracing::info;

use crate::{
    error::ApiResult,
    models::{EffectiveUserResponse, ImpersonateRequest},
    transport::CookieTicketTransport,
    AppState,
};

/// Start impersonating a user
///
/// POST /impersonate
#[utoipa::path(
    post,
    path = "/impersonate",
    request_body = ImpersonateRequest,
    responses(
        (status = 200, description = "Now acting as the requested user", body = EffectiveUserResponse),
        (status = 400, description = "Missing, empty or unknown user", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Caller is not authenticated", body = crate::error::ApiErrorResponse),
        (status = 403, description = "Impersonation not allowed", body = crate::error::ApiErrorResponse),
        (status = 409, description = "Already impersonating", body = crate::error::ApiErrorResponse),
        (status = 503, description = "Authorization store unavailable", body = crate::error::ApiErrorResponse)
    ),
    tag = "impersonation"
)]
pub async fn impersonate(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
    payload: Option<Json<ImpersonateRequest>>,
) -> ApiResult<Response> {
    let ctx = request_context(identity, &headers);
    let mut transport =
        CookieTicketTransport::from_headers(&headers, &state.config, state.codec.clone());

    let user = {
        let mut session = ImpersonationSession::new(&ctx, &state.config, &mut transport);
        // Anonymous callers are rejected before the body is looked at
        session.actual_user()?;

        let Some(Json(request)) = payload else {
            return Err(ImpersonationError::InvalidArgument(
                "Request body must be JSON with an 'impersonatedUser' field.".to_string(),
            )
            .into());
        };

        session
            .start(&state.gate, &request.impersonated_user)
            .await?;
        EffectiveUser::from_session(&mut session)?
    };

    info!("Impersonation started: {}", user.report());
    with_ticket(transport, Json(EffectiveUserResponse::from(user)))
}

/// Stop impersonating
///
/// POST /stop-impersonating
///
/// Succeeds for any authenticated caller, impersonating or not.
#[utoipa::path(
    post,
    path = "/stop-impersonating",
    responses(
        (status = 200, description = "Acting as the actual user", body = EffectiveUserResponse),
        (status = 401, description = "Caller is not authenticated", body = crate::error::ApiErrorResponse)
    ),
    tag = "impersonation"
)]
pub async fn stop_impersonating(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let ctx = request_context(identity, &headers);
    let mut transport =
        CookieTicketTransport::from_headers(&headers, &state.config, state.codec.clone());

    let user = {
        let mut session = ImpersonationSession::new(&ctx, &state.config, &mut transport);
        session.stop()?;
        EffectiveUser::from_session(&mut session)?
    };

    with_ticket(transport, Json(EffectiveUserResponse::from(user)))
}

/// Describe the effective caller
///
/// GET /whoami
#[utoipa::path(
    get,
    path = "/whoami",
    responses(
        (status = 200, description = "Effective user of this request", body = EffectiveUserResponse),
        (status = 401, description = "Unsupported authentication type", body = crate::error::ApiErrorResponse)
    ),
    tag = "impersonation"
)]
pub async fn whoami(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    headers: HeaderMap,
) -> ApiResult<Json<EffectiveUserResponse>> {
    let ctx = request_context(identity, &headers);
    let mut transport =
        CookieTicketTransport::from_headers(&headers, &state.config, state.codec.clone());
    let mut session = ImpersonationSession::new(&ctx, &state.config, &mut transport);

    let user = match EffectiveUser::from_session(&mut session) {
        Ok(user) => user,
        Err(ImpersonationError::Unauthenticated) => {
            EffectiveUser::unrecognized(ctx.workstation.clone())
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(user.into()))
}

fn request_context(identity: Option<Extension<Identity>>, headers: &HeaderMap) -> RequestContext {
    let identity = identity
        .map(|Extension(identity)| identity)
        .unwrap_or_else(Identity::anonymous);
    let ctx = RequestContext::new(identity, Utc::now());

    match workstation_from_headers(headers) {
        Some(workstation) => ctx.with_workstation(workstation),
        None => ctx,
    }
}

/// First hop of `X-Forwarded-For`, if present.
fn workstation_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn with_ticket(transport: CookieTicketTransport, body: impl IntoResponse) -> ApiResult<Response> {
    let mut response = body.into_response();
    if let Some(cookie) = transport.into_set_cookie()? {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}
