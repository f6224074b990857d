//! Bearer-token authentication against an external identity provider
//!
//! The provider owns sessions; this module only asks it who a token
//! belongs to, once per request, with no caching.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::IdentityConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// The caller, as resolved by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Something that can resolve a bearer token to a user
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the provider answered but knows no such user.
    async fn resolve(&self, token: &str) -> Result<Option<AuthUser>>;
}

/// Supabase-compatible provider (`GET {url}/auth/v1/user`)
pub struct SupabaseIdentity {
    http: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build identity http client")?;
        Ok(Self {
            http,
            url: url.into(),
            anon_key: anon_key.into(),
        })
    }

    /// Build from config, if both URL and key are present
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>> {
        match (&config.url, &config.anon_key) {
            (Some(url), Some(key)) if config.is_configured() => {
                Ok(Some(Self::new(url.clone(), key.clone())?))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<AuthUser>> {
        let url = format!("{}/auth/v1/user", self.url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "identity provider rejected token");
            return Ok(None);
        }

        let user = response
            .json::<AuthUser>()
            .await
            .context("failed to decode identity provider user")?;

        Ok(Some(user).filter(|u| !u.id.is_empty()))
    }
}

/// In-process provider for tests and local development
#[derive(Debug, Default)]
pub struct StaticIdentity {
    users: HashMap<String, AuthUser>,
    token_is_user_id: bool,
}

impl StaticIdentity {
    /// Accept exactly the given `(token, user id)` pairs
    pub fn new<I, T, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let users = pairs
            .into_iter()
            .map(|(token, id)| {
                (
                    token.into(),
                    AuthUser {
                        id: id.into(),
                        email: None,
                    },
                )
            })
            .collect();
        Self {
            users,
            token_is_user_id: false,
        }
    }

    /// Treat every non-empty token as the id of the user it names
    pub fn token_is_user_id() -> Self {
        Self {
            users: HashMap::new(),
            token_is_user_id: true,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<AuthUser>> {
        if let Some(user) = self.users.get(token) {
            return Ok(Some(user.clone()));
        }
        if self.token_is_user_id && !token.is_empty() {
            return Ok(Some(AuthUser {
                id: token.to_string(),
                email: None,
            }));
        }
        Ok(None)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware: resolve the caller or stop with 400
///
/// On success the `AuthUser` is available to handlers as an extension.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state.identity.as_ref().ok_or(ApiError::Unconfigured)?;

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .ok_or(ApiError::BadRequest)?;

    let user = match identity.resolve(&token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::BadRequest),
        Err(err) => {
            tracing::warn!(error = ?err, "identity provider failed");
            return Err(ApiError::BadRequest);
        }
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("bearer abc"), None);
    }

    #[tokio::test]
    async fn test_static_identity_pairs() -> Result<()> {
        let identity = StaticIdentity::new([("tok-1", "user-1")]);
        let user = identity.resolve("tok-1").await?.expect("known token");
        assert_eq!(user.id, "user-1");
        assert!(identity.resolve("user-1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_static_identity_token_is_user_id() -> Result<()> {
        let identity = StaticIdentity::token_is_user_id();
        let user = identity.resolve("user-2").await?.expect("any token");
        assert_eq!(user.id, "user-2");
        assert!(identity.resolve("").await?.is_none());
        Ok(())
    }

    #[test]
    fn test_supabase_from_config_requires_both_fields() -> Result<()> {
        let partial = IdentityConfig {
            url: Some("https://x.supabase.co".into()),
            anon_key: None,
        };
        assert!(SupabaseIdentity::from_config(&partial)?.is_none());

        let blank = IdentityConfig {
            url: Some("  ".into()),
            anon_key: Some("anon".into()),
        };
        assert!(SupabaseIdentity::from_config(&blank)?.is_none());

        let full = IdentityConfig {
            url: Some("https://x.supabase.co".into()),
            anon_key: Some("anon".into()),
        };
        assert!(SupabaseIdentity::from_config(&full)?.is_some());
        Ok(())
    }
}
