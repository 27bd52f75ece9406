//! Firebase ID token authentication.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Google JWKS URL for Firebase Auth.
const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Firebase token issuer prefix.
const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// JWKS cache TTL.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600); // 1 hour

/// Decoded Firebase ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// User ID
    pub sub: String,
    /// Display name (if the account has one)
    #[serde(default)]
    pub name: Option<String>,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub iss: String,
    /// Audience (Firebase project ID)
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
}

/// Authenticated user extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl AuthUser {
    /// Name stored as `createdBy` on listings this user posts.
    pub fn display_name(&self) -> String {
        jobsphere_models::creator_display_name(self.name.as_deref(), self.email.as_deref())
    }
}

impl From<FirebaseClaims> for AuthUser {
    fn from(claims: FirebaseClaims) -> Self {
        Self {
            uid: claims.sub,
            name: claims.name,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
        }
    }
}

/// JWKS response from Google.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
}

/// Cached signing keys for Firebase ID tokens.
pub struct JwksCache {
    http: Client,
    jwks_url: Option<String>,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Option<Instant>>,
    project_id: String,
}

impl JwksCache {
    /// Create a cache backed by Google's JWKS endpoint and load the keys.
    pub async fn new(project_id: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;

        let cache = Self {
            http,
            jwks_url: Some(GOOGLE_JWKS_URL.to_string()),
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            project_id: project_id.into(),
        };

        cache.refresh_keys().await?;

        Ok(cache)
    }

    /// Cache with a fixed key set that is never refreshed.
    pub fn with_static_keys(
        project_id: impl Into<String>,
        keys: HashMap<String, DecodingKey>,
    ) -> Self {
        Self {
            http: Client::new(),
            jwks_url: None,
            keys: RwLock::new(keys),
            last_refresh: RwLock::new(Some(Instant::now())),
            project_id: project_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn refresh_keys(&self) -> anyhow::Result<()> {
        let Some(url) = self.jwks_url.as_deref() else {
            return Ok(());
        };
        debug!("Refreshing JWKS keys");

        let jwks: JwksResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)?;
            keys.insert(jwk.kid, key);
        }

        let key_count = keys.len();
        *self.keys.write().await = keys;
        *self.last_refresh.write().await = Some(Instant::now());

        debug!("Refreshed {} JWKS keys", key_count);
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        let needs_refresh = {
            let last = self.last_refresh.read().await;
            last.map_or(true, |t| t.elapsed() > JWKS_CACHE_TTL)
        };

        if needs_refresh {
            if let Err(e) = self.refresh_keys().await {
                warn!("Failed to refresh JWKS keys: {}", e);
            }
        }

        self.keys.read().await.get(kid).cloned()
    }

    /// Verify a Firebase ID token.
    pub async fn verify_token(&self, token: &str) -> Result<FirebaseClaims, ApiError> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("Token missing key ID"))?;

        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unknown key ID"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation.set_audience(&[&self.project_id]);

        let token_data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract the bearer token from an `Authorization` header value.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.jwks.verify_token(token).await?;
        Ok(AuthUser::from(claims))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    pub const TEST_PROJECT: &str = "jobsphere-test";
    pub const TEST_KID: &str = "test-key";

    const PRIVATE_PEM: &[u8] = include_bytes!("../testdata/test_rsa.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../testdata/test_rsa_pub.pem");

    pub fn test_jwks() -> JwksCache {
        let key = DecodingKey::from_rsa_pem(PUBLIC_PEM).unwrap();
        JwksCache::with_static_keys(TEST_PROJECT, HashMap::from([(TEST_KID.to_string(), key)]))
    }

    pub fn claims_for(uid: &str) -> FirebaseClaims {
        let now = chrono::Utc::now().timestamp();
        FirebaseClaims {
            sub: uid.to_string(),
            name: None,
            email: Some(format!("{}@example.com", uid)),
            email_verified: Some(true),
            iss: format!("{}{}", FIREBASE_ISSUER_PREFIX, TEST_PROJECT),
            aud: TEST_PROJECT.to_string(),
            iat: now,
            exp: now + 3600,
            auth_time: Some(now),
        }
    }

    pub fn sign(claims: &FirebaseClaims) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(TEST_KID.to_string());
        encode(&header, claims, &EncodingKey::from_rsa_pem(PRIVATE_PEM).unwrap()).unwrap()
    }

    pub fn token_for(uid: &str) -> String {
        sign(&claims_for(uid))
    }
}
