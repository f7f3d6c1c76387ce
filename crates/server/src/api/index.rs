//! Landing page listing the flow endpoints.

use crate::AppResources;
use crate::api::MISC_TAG;
use crate::oauth2::FLOW_PREFIX;
use askama::Template;
use axum::{
    Extension,
    http::{HeaderMap, StatusCode, header::HOST},
    response::{Html, IntoResponse, Response},
};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    url_prefix: &'a str,
    flow_prefix: &'a str,
    code_ttl_secs: u64,
    token_ttl_secs: u64,
}

/// Scheme and host the caller used to reach us, e.g. `https://sso.example`.
///
/// TLS is expected to be terminated by a proxy, so only `X-Forwarded-Proto`
/// can switch the scheme to https.
pub fn url_prefix(headers: &HeaderMap) -> String {
    let scheme = match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some("https") => "https",
        _ => "http",
    };
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/",
    tag = MISC_TAG,
    operation_id = "Index",
    summary = "List the available flows",
    description = "Renders an HTML page listing the flow endpoints, using the scheme and host the \
                   request was made with.",
    responses(
        (status = 200, description = "Index page", content_type = "text/html"),
    )
)]
pub async fn index(Extension(resources): Extension<AppResources>, headers: HeaderMap) -> Response {
    let prefix = url_prefix(&headers);
    let template = IndexTemplate {
        url_prefix: &prefix,
        flow_prefix: FLOW_PREFIX,
        code_ttl_secs: resources.config.auth_code_ttl_secs,
        token_ttl_secs: resources.config.access_token_ttl_secs,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render index template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn url_prefix_defaults_to_http_localhost() {
        assert_eq!(url_prefix(&HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn url_prefix_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("sso.example:8443"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(url_prefix(&headers), "https://sso.example:8443");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
        assert_eq!(url_prefix(&headers), "http://sso.example:8443");
    }
}
