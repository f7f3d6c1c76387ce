//! OAuth2 HTTP endpoints.
//!
//! Each endpoint is a stateless step of the Authorization Code flow:
//! - Authorization endpoint (shows the login form)
//! - Login submission (issues the code)
//! - Token endpoint (exchanges the code)
//! - UserInfo

use crate::error::{ErrorResponse, OAuthError};
use crate::oauth2::{FLOW_PREFIX, OAUTH2_TAG, state::OAuth2State};
use askama::Template;
use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Creates the OAuth2 router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(authorize))
        .routes(routes!(submit))
        .routes(routes!(token))
        .routes(routes!(me))
        .with_state(state)
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// OAuth2 authorization request parameters.
///
/// All fields are optional so that missing parameters can be reported the
/// OAuth2 way instead of being rejected by the extractor. An empty value
/// counts as present.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeRequest {
    /// Must be "code" for Authorization Code flow
    pub response_type: Option<String>,
    /// Client identifier, accepted without registration
    pub client_id: Option<String>,
    /// Where the user is sent back to
    pub redirect_uri: Option<String>,
    /// Opaque value returned unchanged to the client
    pub state: Option<String>,
}

impl AuthorizeRequest {
    /// Builds the request from raw query pairs. The first occurrence of a
    /// repeated key wins and unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut request = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "response_type" => &mut request.response_type,
                "client_id" => &mut request.client_id,
                "redirect_uri" => &mut request.redirect_uri,
                "state" => &mut request.state,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        request
    }
}

/// Login form submitted from the page rendered by `authorize`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitForm {
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    /// Any non-blank value is accepted
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    /// Required, but not checked against any registry
    pub client_id: Option<String>,
    /// Required, but not checked against any registry
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    pub sub: String,
    pub name: String,
    pub email: String,
}

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    action: &'a str,
    redirect_uri: &'a str,
    state: &'a str,
}

// =============================================================================
// Endpoints
// =============================================================================

/// OAuth2 Authorization endpoint.
///
/// Performs no store access; it only checks the request shape and hands over
/// to the login form.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/authorize",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Authorize",
    summary = "Start the Authorization Code flow",
    description = "Validates the authorization request and renders a login form. Any email entered \
                   there is accepted.\n\n\
                   Errors are reported by redirecting to `redirect_uri` with an `error` query parameter. \
                   Without a `redirect_uri` there is nowhere to redirect to, so a plain 400 is returned.",
    params(AuthorizeRequest),
    responses(
        (status = 200, description = "Login page", content_type = "text/html"),
        (status = 303, description = "Redirect back to the client with `error=invalid_request` or `error=unsupported_response_type`"),
        (status = 400, description = "`redirect_uri` missing or unusable"),
    )
)]
pub async fn authorize(Query(pairs): Query<Vec<(String, String)>>) -> Response {
    let params = AuthorizeRequest::from_pairs(pairs);
    let Some(redirect_uri) = params.redirect_uri.as_deref() else {
        return (StatusCode::BAD_REQUEST, "redirect_uri missing").into_response();
    };

    let (Some(response_type), Some(state), Some(_)) = (
        params.response_type.as_deref(),
        params.state.as_deref(),
        params.client_id.as_deref(),
    ) else {
        return error_redirect(
            redirect_uri,
            params.state.as_deref(),
            OAuthError::InvalidRequest,
        );
    };

    if response_type != "code" {
        return error_redirect(
            redirect_uri,
            Some(state),
            OAuthError::UnsupportedResponseType,
        );
    }

    let action = format!("{FLOW_PREFIX}/submit");
    let template = LoginTemplate {
        action: &action,
        redirect_uri,
        state,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render login template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Handle login form submission.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/submit",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Login Submit",
    summary = "Log in as any email address",
    description = "Looks up the identity for the submitted email, creating one on first use, issues a \
                   single-use authorization code and redirects back to `redirect_uri` with `code` and \
                   `state` appended.",
    request_body(
        content = SubmitForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Login form fields"
    ),
    responses(
        (status = 303, description = "Redirect to the client with an authorization code"),
        (status = 400, description = "Missing field, blank email or unusable `redirect_uri`", body = ErrorResponse),
    )
)]
pub async fn submit(
    State(state): State<OAuth2State>,
    form: Result<Form<SubmitForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected login form");
            return OAuthError::InvalidRequest.into_response();
        }
    };

    let (Some(redirect_uri), Some(client_state), Some(email)) =
        (form.redirect_uri, form.state, form.email)
    else {
        return OAuthError::InvalidRequest.into_response();
    };
    if email.trim().is_empty() {
        return OAuthError::InvalidRequest.into_response();
    }

    let Ok(mut redirect_url) = Url::parse(&redirect_uri) else {
        tracing::debug!(redirect_uri = %redirect_uri, "Unparseable redirect_uri");
        return OAuthError::InvalidRequest.into_response();
    };

    let identity = state.identities.get_or_create(&email);
    let code = state.codes.issue(&identity.id);

    redirect_url
        .query_pairs_mut()
        .append_pair("code", &code)
        .append_pair("state", &client_state);

    tracing::info!(identity_id = %identity.id, "Login accepted, redirecting with code");
    Redirect::to(redirect_url.as_str()).into_response()
}

/// OAuth2 Token endpoint.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/token",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Exchange an authorization code for an access token",
    description = "Exchanges an authorization code for a signed bearer token. Each code can be \
                   exchanged once; expired, unknown and already used codes all yield `access_denied`.\n\n\
                   `client_id` and `client_secret` must be present but are not validated.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "`invalid_request`, `unsupported_grant_type` or `access_denied`", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, OAuthError> {
    let Ok(Form(params)) = form else {
        return Err(OAuthError::InvalidRequest);
    };

    let (Some(grant_type), Some(code), Some(_), Some(_)) = (
        params.grant_type,
        params.code,
        params.client_id,
        params.client_secret,
    ) else {
        return Err(OAuthError::InvalidRequest);
    };

    if grant_type != "authorization_code" {
        return Err(OAuthError::UnsupportedGrantType);
    }

    let identity_id = state.codes.consume(&code).map_err(|e| {
        tracing::info!(error = %e, "Rejected authorization code");
        OAuthError::AccessDenied
    })?;

    let access_token = state.tokens.mint(&identity_id).map_err(|e| {
        tracing::error!("Failed to sign access token: {}", e);
        OAuthError::ServerError
    })?;

    tracing::info!(identity_id = %identity_id, "Issued access token");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.tokens.lifetime().as_secs(),
    }))
}

/// UserInfo endpoint.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/me",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 UserInfo",
    summary = "Get the identity behind an access token",
    description = "Verifies the bearer token and returns the identity it was issued for. Malformed, \
                   forged and expired tokens are all reported as `invalid_token`.",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Identity", body = UserInfoResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse),
    )
)]
pub async fn me(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, OAuthError> {
    let access_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(OAuthError::InvalidToken)?;

    let identity_id = state.tokens.verify(access_token).map_err(|e| {
        tracing::info!(reason = %e, "Rejected bearer token");
        OAuthError::from(e)
    })?;

    let identity = state.identities.get_by_id(&identity_id).map_err(|e| {
        tracing::warn!(identity_id = %identity_id, error = %e, "Valid token for unknown identity");
        OAuthError::InvalidToken
    })?;

    Ok(Json(UserInfoResponse {
        sub: identity.id,
        name: identity.name,
        email: identity.email,
    }))
}

// =============================================================================
// Helper Functions
// =============================================================================

fn error_redirect(redirect_uri: &str, state: Option<&str>, error: OAuthError) -> Response {
    let Ok(mut redirect_url) = Url::parse(redirect_uri) else {
        return OAuthError::InvalidRequest.into_response();
    };

    redirect_url
        .query_pairs_mut()
        .append_pair("error", error.code());
    if let Some(s) = state {
        redirect_url.query_pairs_mut().append_pair("state", s);
    }

    Redirect::to(redirect_url.as_str()).into_response()
}
