//! Route table.
//!
//! Wraps an axum [`Router`] and records every `(method, path)` pair as it is
//! registered, so the table can be listed on `/` and duplicate registrations
//! are caught at startup instead of panicking inside axum.
//!
//! All paths are slash-terminated. [`append_trailing_slash`] runs before
//! routing and rewrites `/foo` to `/foo/`, so both spellings reach the same
//! route.

use axum::{
    Router,
    extract::Request,
    handler::Handler,
    http::{Method, Uri},
    routing::{MethodFilter, on},
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {0} {1} is already registered")]
    DuplicateRoute(String, String),

    #[error("route path {0:?} must start and end with '/'")]
    InvalidPath(String),

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
}

/// Startup-time builder for the process-wide route table.
#[derive(Default)]
pub struct RouteTable {
    router: Router,
    routes: Vec<RouteInfo>,
    seen: HashSet<RouteInfo>,
    listing: Arc<OnceLock<Vec<RouteInfo>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `path` (axum `{param}` syntax).
    pub fn add<H, T>(&mut self, method: Method, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        if !path.starts_with('/') || !path.ends_with('/') {
            return Err(RouteError::InvalidPath(path.to_string()));
        }
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| RouteError::UnsupportedMethod(method.to_string()))?;
        let info = RouteInfo {
            method: method.to_string(),
            path: path.to_string(),
        };
        if !self.seen.insert(info.clone()) {
            return Err(RouteError::DuplicateRoute(info.method, info.path));
        }

        self.router = std::mem::take(&mut self.router).route(path, on(filter, handler));
        self.routes.push(info);
        Ok(())
    }

    /// Routes registered so far, in registration order.
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Shared view of the final table, filled in by [`finish`](Self::finish).
    /// Handlers registered before the table is complete (such as `GET /`)
    /// read it through this.
    pub fn listing(&self) -> Arc<OnceLock<Vec<RouteInfo>>> {
        self.listing.clone()
    }

    /// Freeze the table and hand back the router.
    pub fn finish(self) -> Router {
        let _ = self.listing.set(self.routes);
        self.router
    }
}

/// Rewrite the request path to its slash-terminated form.
pub fn append_trailing_slash(mut req: Request) -> Request {
    let uri = req.uri();
    if uri.path().ends_with('/') {
        return req;
    }
    let path_and_query = match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    };
    let mut parts = uri.clone().into_parts();
    if let Ok(pq) = path_and_query.parse() {
        parts.path_and_query = Some(pq);
        if let Ok(rewritten) = Uri::from_parts(parts) {
            *req.uri_mut() = rewritten;
        }
    }
    req
}

// =============================================================================
// Tests
// =============================================================================
