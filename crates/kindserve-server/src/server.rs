//! REST server wiring.
//!
//! [`RestServer`] owns the collaborators and the [`ApiGroupsRegistry`].
//! Callers register hooks and sub-resources through
//! [`api_groups_mut`](RestServer::api_groups_mut), then either build the
//! service for in-process use or bind and serve.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Every registered route. |
//! | `GET`  | `/apis/` | Served group-versions. |
//! | `GET`  | `/apis/<group>/<version>/` | Kind descriptors of one group-version. |
//! | *      | `/apis/<group>/<version>/...` | Per-kind CRUD, see [`ResourceHandler`](crate::ResourceHandler). |

use axum::{
    Json, Router,
    extract::Request,
    http::{
        Method, StatusCode, Uri,
        header::{ALLOW, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
};
use kindserve_kernel::{Codec, ObjectStore, Scheme};
use std::sync::Arc;
use thiserror::Error;
use tower::{Layer, util::MapRequest, util::MapRequestLayer};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::context::ApiState;
use crate::error::ApiError;
use crate::registry::ApiGroupsRegistry;
use crate::router::{RouteError, RouteTable, append_trailing_slash};

/// The complete HTTP service: trailing-slash rewrite in front of the router.
pub type RestService = MapRequest<Router, fn(Request) -> Request>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct RestServer {
    config: ServerConfig,
    state: ApiState,
    api_groups: ApiGroupsRegistry,
}

impl RestServer {
    /// Build handlers for every kind in `scheme` not ignored by `config`.
    pub fn new(
        config: ServerConfig,
        scheme: Arc<Scheme>,
        store: Arc<dyn ObjectStore>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        let api_groups = ApiGroupsRegistry::new(
            &scheme,
            &config.ignored_group_version_set(),
            &config.ignored_kind_set(),
        );
        Self {
            config,
            state: ApiState::new(store, codec, scheme),
            api_groups,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    pub fn api_groups(&self) -> &ApiGroupsRegistry {
        &self.api_groups
    }

    pub fn api_groups_mut(&mut self) -> &mut ApiGroupsRegistry {
        &mut self.api_groups
    }

    /// Freeze the route table and assemble the middleware stack.
    pub fn build_service(self) -> Result<RestService, ServerError> {
        let mut table = RouteTable::new();

        let listing = table.listing();
        table.add(Method::GET, "/", move || {
            let listing = listing.clone();
            async move { Json(listing.get().cloned().unwrap_or_default()) }
        })?;
        self.api_groups.mount(&mut table, &self.state)?;
        info!(routes = table.routes().len(), "route table built");

        let mut router = table
            .finish()
            .fallback(not_found)
            .layer(middleware::map_response(method_not_allowed))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http());
        if self.config.cors {
            router = router.layer(CorsLayer::permissive());
        }

        let rewrite: fn(Request) -> Request = append_trailing_slash;
        Ok(MapRequestLayer::new(rewrite).layer(router))
    }

    /// Bind `listen_address` and serve until the process exits.
    pub async fn listen(self) -> Result<(), ServerError> {
        let addr = self.config.listen_address.clone();
        let service = self.build_service()?;
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(addr = %addr, "kindserve listening");
        axum::serve(
            listener,
            axum::ServiceExt::<Request>::into_make_service(service),
        )
        .await
        .map_err(ServerError::Serve)
    }
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

/// Render axum's bare 405 as a `Status`, keeping its `Allow` header.
async fn method_not_allowed(method: Method, uri: Uri, response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(CONTENT_TYPE)
    {
        return response;
    }
    let allow = response.headers().get(ALLOW).cloned();
    let mut rendered = ApiError::status(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("method {method} is not allowed on {}", uri.path()),
    )
    .into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(ALLOW, allow);
    }
    rendered
}
