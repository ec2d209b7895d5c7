//! Bearer-token resolution middleware (spec §1 "identity service that
//! resolves a bearer credential to a principal"). Resolution failures
//! don't block the request — a missing/invalid token just means no
//! `Principal` lands in the request extensions, and route handlers that
//! require one reject with `Unauthorized` via the `Principal` extractor.

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::kernel::EngineDeps;

pub async fn identity_middleware(
    Extension(deps): Extension<EngineDeps>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(header) = request.headers().get(axum::http::header::AUTHORIZATION) {
        if let Ok(raw) = header.to_str() {
            match deps.identity.resolve(raw).await {
                Ok(principal) => {
                    request.extensions_mut().insert(principal);
                }
                Err(err) => debug!(error = %err, "bearer token did not resolve to a principal"),
            }
        }
    }

    next.run(request).await
}
