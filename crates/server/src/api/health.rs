//! Health check endpoint.

use crate::api::MISC_TAG;

/// Reports that the provider is up.
#[tracing::instrument()]
#[utoipa::path(
    method(get, head),
    path = "/healthz",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Liveness probe",
    description = "Returns `ok` once the identity provider is serving. Test harnesses can poll it \
                   before starting an Authorization Code flow. The in-memory stores are not inspected.",
    responses(
        (status = 200, description = "Service is healthy", body = str, content_type = "text/plain", example = "ok")
    )
)]
pub async fn health() -> &'static str {
    "ok"
}
