//! Frontend asset serving.
//!
//! Production serves the prebuilt bundle from disk and answers unknown paths
//! with `index.html` so client-side routes resolve. Development forwards every
//! non-API request to the frontend dev server. Either way, unmatched `/api`
//! paths get a JSON 404 rather than the frontend.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use camino::Utf8PathBuf;
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use url::Url;

use blotter_config::{Config, ConfigError, RunMode};

use crate::routes::{ApiError, AppState};

const ASSETS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::assets");

/// Entry document of the production bundle.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Largest request body forwarded to the dev server.
const DEV_PROXY_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Errors raised while preparing the serving strategy.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Production mode found no bundle to serve.
    #[error(
        "frontend bundle not found at '{index}'; build the client before starting in production"
    )]
    MissingBundle {
        /// Expected location of the entry document.
        index: Utf8PathBuf,
    },
    /// The dev server address is unusable.
    #[error("invalid dev server address: {source}")]
    DevServerAddress {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// The dev server client could not be built.
    #[error("failed to build dev server client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

/// How non-API requests are answered.
#[derive(Debug, Clone)]
pub enum StaticStrategy {
    /// Serve files from the built bundle.
    Bundle {
        /// Directory service with the SPA fallback attached.
        serve: ServeDir<ServeFile>,
    },
    /// Forward to the frontend dev server.
    DevServer {
        /// Shared HTTP client.
        client: reqwest::Client,
        /// Dev server origin.
        base: Url,
    },
}

impl StaticStrategy {
    /// Picks the strategy for the configured run mode.
    pub fn select(config: &Config) -> Result<Self, AssetError> {
        match config.mode() {
            RunMode::Production => Self::bundle(config),
            RunMode::Development => config
                .dev_server_url()
                .map_err(|source| AssetError::DevServerAddress { source })
                .and_then(Self::dev_server),
        }
    }

    fn bundle(config: &Config) -> Result<Self, AssetError> {
        let index = config.static_dir().join(INDEX_DOCUMENT);
        if !index.is_file() {
            return Err(AssetError::MissingBundle { index });
        }
        let serve = ServeDir::new(config.static_dir()).fallback(ServeFile::new(index));
        Ok(Self::Bundle { serve })
    }

    fn dev_server(base: Url) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|source| AssetError::Client { source })?;
        Ok(Self::DevServer { client, base })
    }

    /// Run mode the strategy belongs to.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        match self {
            Self::Bundle { .. } => RunMode::Production,
            Self::DevServer { .. } => RunMode::Development,
        }
    }
}

/// Returns `true` for paths owned by the API surface.
#[must_use]
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Fallback handler for every request no route matched.
pub(crate) async fn frontend_fallback(State(state): State<AppState>, request: Request) -> Response {
    if is_api_path(request.uri().path()) {
        return ApiError::not_found(format!("no route for {}", request.uri().path()))
            .into_response();
    }
    match state.assets() {
        StaticStrategy::Bundle { serve } => match serve.clone().oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
        StaticStrategy::DevServer { client, base } => forward(client, base, request).await,
    }
}

async fn forward(client: &reqwest::Client, base: &Url, request: Request) -> Response {
    let path = request
        .uri()
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());
    let target = match base.join(path) {
        Ok(url) => url,
        Err(error) => return bad_gateway(&error),
    };

    let (parts, incoming) = request.into_parts();
    let payload = match to_bytes(incoming, DEV_PROXY_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(error) => return bad_gateway(&error),
    };
    let mut request_headers = parts.headers;
    strip_hop_headers(&mut request_headers);
    request_headers.remove(HOST);

    let upstream = match client
        .request(parts.method, target)
        .headers(request_headers)
        .body(payload)
        .send()
        .await
    {
        Ok(reply) => reply,
        Err(error) => return bad_gateway(&error),
    };

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_headers(&mut response_headers);
    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = response_headers;
            response
        }
        Err(error) => bad_gateway(&error),
    }
}

fn strip_hop_headers(headers: &mut HeaderMap) {
    headers.remove(CONNECTION);
    headers.remove(TRANSFER_ENCODING);
}

fn bad_gateway(error: &dyn std::error::Error) -> Response {
    tracing::warn!(target: ASSETS_TARGET, error = %error, "dev server request failed");
    (
        StatusCode::BAD_GATEWAY,
        "frontend dev server is unreachable; start it or set DEV_SERVER_URL",
    )
        .into_response()
}
