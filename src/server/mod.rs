//! HTTP API server
//!
//! Solo chat routes live at the root, room routes under `/rooms`.
//! Anything unmatched falls through to the built frontend.

pub mod chat;
pub mod rooms;

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info};

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

const GLOBAL_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Settings the router needs beyond shared state
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub public_dir: std::path::PathBuf,
    pub cors_origins: Vec<String>,
    /// Identity provider URL, allowed as a CSP connect source
    pub identity_url: Option<String>,
}

/// JSON body extractor whose rejection is a blank 400
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(%rejection, "rejected request body");
                Err(ApiError::BadRequest)
            }
        }
    }
}

/// Build the complete application router
pub fn router(state: AppState, options: &RouterOptions) -> Router {
    let authed = middleware::from_fn_with_state(state.clone(), auth::require_user);
    let spa = frontend(&options.public_dir);

    let solo = Router::new()
        .route("/", post(chat::send).fallback_service(spa.clone()))
        .route("/writing-suggestions", post(chat::suggestions))
        .merge(
            Router::new()
                .route("/chat-history", get(chat::history))
                .route("/chats-with-title", get(chat::list_chats))
                .route_layer(authed.clone()),
        );

    let rooms = Router::new()
        .route("/", get(rooms::list).post(rooms::create))
        .route("/public-rooms", get(rooms::list_public))
        .route("/translate-message", post(rooms::translate))
        .route("/messages/{message_id}", delete(rooms::delete_message))
        .route("/{room_id}", patch(rooms::update))
        .route("/{room_id}/join", post(rooms::join))
        .route(
            "/{room_id}/messages",
            get(rooms::messages).post(rooms::post_message),
        )
        .route_layer(authed);

    Router::new()
        .merge(solo)
        .nest("/rooms", rooms)
        .fallback_service(spa)
        .layer(middleware::from_fn_with_state(state.clone(), limit_by_client))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors(&options.cors_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            content_security_policy(options.identity_url.as_deref()),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

/// Built assets first, then other public files, then the SPA entry point
fn frontend(public_dir: &Path) -> ServeDir<ServeDir<ServeFile>> {
    let dist = public_dir.join("dist");
    ServeDir::new(&dist).fallback(
        ServeDir::new(public_dir).fallback(ServeFile::new(dist.join("index.html"))),
    )
}

/// Whether an origin is `http(s)://localhost` with an optional port
pub fn is_local_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    match rest.strip_prefix("localhost") {
        Some("") => true,
        Some(port) => port
            .strip_prefix(':')
            .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<String> = origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| is_local_origin(o) || allowed.iter().any(|a| a == o))
                .unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}

fn content_security_policy(identity_url: Option<&str>) -> HeaderValue {
    let connect = match identity_url {
        Some(url) => format!("'self' {}", url.trim_end_matches('/')),
        None => "'self'".to_string(),
    };
    let policy = format!(
        "default-src 'self'; connect-src {}; img-src 'self' data:; script-src 'self'; \
         style-src 'self' https: 'unsafe-inline'; font-src 'self' https: data:; \
         object-src 'none'; frame-ancestors 'self'; base-uri 'self'; form-action 'self'",
        connect
    );
    HeaderValue::from_str(&policy).unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"))
}

/// Middleware: fixed-window limit per client address across all routes
async fn limit_by_client(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.limits.global.check(&key) {
        debug!(client = %key, "client rate limited");
        return Err(ApiError::TooManyRequests(GLOBAL_LIMIT_MESSAGE));
    }

    Ok(next.run(req).await)
}

/// Serve the API until ctrl-c
pub async fn serve(addr: SocketAddr, state: AppState, options: RouterOptions) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "HTTP server listening");

    let limits = state.limits.clone();
    let pruner = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10 * 60));
        loop {
            interval.tick().await;
            limits.prune();
        }
    });

    let app = router(state, &options);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await
    .context("HTTP server failed")?;

    pruner.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_origins() {
        assert!(is_local_origin("http://localhost"));
        assert!(is_local_origin("http://localhost:5173"));
        assert!(is_local_origin("https://localhost:3000"));
        assert!(!is_local_origin("http://localhost:"));
        assert!(!is_local_origin("http://localhost.evil.com"));
        assert!(!is_local_origin("http://localhost:80x"));
        assert!(!is_local_origin("ftp://localhost"));
        assert!(!is_local_origin("https://aigooooo.com"));
    }

    #[test]
    fn test_csp_includes_identity_provider() {
        let csp = content_security_policy(Some("https://abc.supabase.co/"));
        let csp = csp.to_str().unwrap();
        assert!(csp.contains("connect-src 'self' https://abc.supabase.co;"));
        assert!(csp.contains("object-src 'none'"));
    }
}
