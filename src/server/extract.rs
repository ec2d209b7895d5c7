//! Request-extension extractors for the HTTP layer.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::common::errors::EngineError;
use crate::kernel::identity::Principal;

/// Pulls the `Principal` the auth middleware attached to the request,
/// rejecting with `Unauthorized` if no bearer token resolved (spec §7).
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(EngineError::Unauthorized)
    }
}

/// A `Json` body extractor that reports malformed, mistyped, or (via each
/// DTO's `#[serde(deny_unknown_fields)]`) extra-field payloads as
/// `EngineError::InvalidArgument` instead of axum's default rejection body
/// (spec §7 "malformed or missing field ... → HTTP 400"). Named `JsonBody`
/// to stay out of the way of `axum::Json`, which every handler still uses
/// to wrap its `ApiResponse` return value.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EngineError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection_to_engine_error(rejection)),
        }
    }
}

fn json_rejection_to_engine_error(rejection: JsonRejection) -> EngineError {
    EngineError::InvalidArgument(rejection.to_string())
}

/// A `Query` extractor with the same `InvalidArgument` mapping as
/// [`JsonBody`], for the same reason.
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(query_rejection_to_engine_error(rejection)),
        }
    }
}

fn query_rejection_to_engine_error(rejection: QueryRejection) -> EngineError {
    EngineError::InvalidArgument(rejection.to_string())
}
