//! Identity — resolves a bearer credential to a `Principal` (spec §1
//! "identity service that resolves a bearer credential to a principal
//! `(id, role∈{customer, ownerOrHelper})`"). The real identity service
//! (registration, password reset, SMS/email codes) is out of scope
//! (spec §1 Non-goals); this module is the trait-shaped mock/adapter the
//! engine consumes, plus a JWT implementation that can stand in for it.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::common::errors::EngineError;
use crate::common::{BusinessId, UserId};

/// The caller's role, per spec §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Customer,
    OwnerOrHelper,
}

/// A resolved identity: who is calling, and in what capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    /// Set when the token was scoped to a single business at issuance
    /// (owners/helpers authenticate against one business at a time).
    pub business_id: Option<BusinessId>,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolves a bearer token (the raw string, without the `Bearer `
    /// prefix) to a principal, or `Unauthorized` if it is missing,
    /// malformed, or expired.
    async fn resolve(&self, bearer_token: &str) -> Result<Principal, EngineError>;

    /// Issues a bearer token for a principal. Exposed so demo/seed tooling
    /// and tests can mint credentials without a real identity provider.
    fn issue(&self, principal: &Principal) -> Result<String, EngineError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    role: Role,
    business_id: Option<BusinessId>,
    exp: i64,
}

/// HMAC-signed JWT identity provider, standing in for the external
/// identity service (spec §1). `SESSION_SECRET` is the HMAC key;
/// `TOKEN_TTL_SECONDS` bounds token lifetime (spec §6 Configuration).
pub struct JwtIdentityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl JwtIdentityService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }
}

#[async_trait]
impl IdentityService for JwtIdentityService {
    async fn resolve(&self, bearer_token: &str) -> Result<Principal, EngineError> {
        let token = bearer_token.strip_prefix("Bearer ").unwrap_or(bearer_token);
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| EngineError::Unauthorized)?;
        let claims = data.claims;
        Ok(Principal {
            user_id: claims.sub,
            role: claims.role,
            business_id: claims.business_id,
        })
    }

    fn issue(&self, principal: &Principal) -> Result<String, EngineError> {
        let claims = Claims {
            sub: principal.user_id,
            role: principal.role,
            business_id: principal.business_id,
            exp: (Utc::now().timestamp() + self.ttl_seconds),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| EngineError::Internal(format!("token issuance failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_principal_through_a_token() {
        let service = JwtIdentityService::new("test-secret", 3600);
        let principal = Principal {
            user_id: UserId::new(),
            role: Role::Customer,
            business_id: None,
        };
        let token = service.issue(&principal).unwrap();
        let resolved = service.resolve(&token).await.unwrap();
        assert_eq!(resolved, principal);
    }

    #[tokio::test]
    async fn rejects_a_garbage_token() {
        let service = JwtIdentityService::new("test-secret", 3600);
        let err = service.resolve("not-a-real-token").await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
    }

    #[tokio::test]
    async fn strips_the_bearer_prefix() {
        let service = JwtIdentityService::new("test-secret", 3600);
        let principal = Principal {
            user_id: UserId::new(),
            role: Role::OwnerOrHelper,
            business_id: Some(BusinessId::new()),
        };
        let token = service.issue(&principal).unwrap();
        let resolved = service.resolve(&format!("Bearer {token}")).await.unwrap();
        assert_eq!(resolved, principal);
    }
}
