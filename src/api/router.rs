//! Route table and dispatcher
//!
//! Routes are matched in registration order against glob patterns:
//!
//! - `?` matches exactly one character other than `/`
//! - `*` matches any run of characters within one path segment
//! - `#` matches anything, across segments
//!
//! There is no parameter extraction; handlers read trailing segments from
//! the raw path. A request whose method is not registered for a matching
//! path gets the same 404 as an unknown path. `/api` and `/api/help`
//! always return the route listing, whatever the method. HEAD is answered
//! by the matching GET route with the body dropped.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::ApiError;
use super::request::ApiRequest;
use super::types::RouteListing;

/// Default route table capacity
pub const MAX_ROUTES: usize = 50;

const HELP_PATHS: [&str; 2] = ["/api", "/api/help"];

/// Whether `path` is one of the reserved listing paths
pub fn is_help_path(path: &str) -> bool {
    HELP_PATHS.contains(&path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// `None` for methods routes cannot be registered for (HEAD, OPTIONS, ...)
    pub fn from_http(method: &Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can answer a matched request
///
/// Implemented for every `Fn(ApiRequest, S) -> impl Future<Output = impl IntoResponse>`,
/// so plain `async fn handler(req: ApiRequest, state: S) -> ApiResult<..>` works.
pub trait Handler<S>: Send + Sync + 'static {
    fn call(&self, request: ApiRequest, state: S) -> BoxFuture<'static, Response>;
}

impl<S, F, Fut, R> Handler<S> for F
where
    F: Fn(ApiRequest, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: ApiRequest, state: S) -> BoxFuture<'static, Response> {
        let fut = self(request, state);
        Box::pin(async move { fut.await.into_response() })
    }
}

pub struct Route<S> {
    pub method: HttpMethod,
    pub path: String,
    pub description: String,
    pub handler: Arc<dyn Handler<S>>,
}

impl<S> fmt::Debug for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Public description of a registered route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub method: HttpMethod,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The table already holds `capacity` routes
    CapacityExceeded { capacity: usize },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::CapacityExceeded { capacity } => {
                write!(f, "route table is full ({capacity} routes)")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Result of looking up a request
#[derive(Debug)]
pub enum RouteMatch<'a, S> {
    /// One of the reserved listing paths
    Help,
    Found(&'a Route<S>),
    NotFound,
}

/// Ordered, bounded set of routes
pub struct RouteTable<S> {
    routes: Vec<Route<S>>,
    capacity: usize,
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RouteTable<S> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ROUTES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a route; a full table is left unchanged
    pub fn register(
        &mut self,
        method: HttpMethod,
        path: impl Into<String>,
        handler: impl Handler<S>,
        description: impl Into<String>,
    ) -> Result<(), RouteError> {
        if self.routes.len() >= self.capacity {
            return Err(RouteError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let route = Route {
            method,
            path: path.into(),
            description: description.into(),
            handler: Arc::new(handler),
        };
        debug!("registered route {} {}", route.method, route.path);
        self.routes.push(route);

        Ok(())
    }

    /// First route, in registration order, whose method and pattern match
    pub fn match_route(&self, method: HttpMethod, path: &str) -> RouteMatch<'_, S> {
        if is_help_path(path) {
            return RouteMatch::Help;
        }

        self.routes
            .iter()
            .find(|route| route.method == method && glob_match(&route.path, path))
            .map_or(RouteMatch::NotFound, RouteMatch::Found)
    }

    /// All routes in registration order
    pub fn list(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|route| RouteInfo {
                method: route.method,
                path: route.path.clone(),
                description: route.description.clone(),
            })
            .collect()
    }
}

/// Match `path` against a route pattern
pub fn glob_match(pattern: &str, path: &str) -> bool {
    glob(pattern.as_bytes(), path.as_bytes())
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'?', rest)) => {
            matches!(text.split_first(), Some((c, tail)) if *c != b'/' && glob(rest, tail))
        }
        Some((b'*', rest)) => {
            let segment_end = text.iter().position(|c| *c == b'/').unwrap_or(text.len());
            (0..=segment_end).any(|i| glob(rest, &text[i..]))
        }
        Some((b'#', rest)) => (0..=text.len()).any(|i| glob(rest, &text[i..])),
        Some((expected, rest)) => {
            matches!(text.split_first(), Some((c, tail)) if c == expected && glob(rest, tail))
        }
    }
}

/// Route table plus the state handed to every handler
pub struct Dispatcher<S> {
    routes: Arc<RouteTable<S>>,
    state: S,
}

impl<S: Clone> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            state: self.state.clone(),
        }
    }
}

impl<S> Dispatcher<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(routes: RouteTable<S>, state: S) -> Self {
        Self {
            routes: Arc::new(routes),
            state,
        }
    }

    pub fn routes(&self) -> &RouteTable<S> {
        &self.routes
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Answer one request
    pub async fn dispatch(
        &self,
        method: &Method,
        path: String,
        query: HashMap<String, String>,
        body: Bytes,
    ) -> Response {
        if *method == Method::HEAD {
            let response = self.route(&Method::GET, path, query, body).await;
            let (parts, _) = response.into_parts();
            return Response::from_parts(parts, Body::empty());
        }
        self.route(method, path, query, body).await
    }

    async fn route(
        &self,
        method: &Method,
        path: String,
        query: HashMap<String, String>,
        body: Bytes,
    ) -> Response {
        let Some(method) = HttpMethod::from_http(method) else {
            if is_help_path(&path) {
                return self.listing();
            }
            trace!("unsupported method {} for {}", method, path);
            return not_found();
        };

        match self.routes.match_route(method, &path) {
            RouteMatch::Help => self.listing(),
            RouteMatch::Found(route) => {
                trace!("dispatching {} {} to {}", method, path, route.path);
                let request = ApiRequest {
                    method,
                    path,
                    query,
                    body,
                };
                route.handler.call(request, self.state.clone()).await
            }
            RouteMatch::NotFound => {
                trace!("no route for {} {}", method, path);
                not_found()
            }
        }
    }

    fn listing(&self) -> Response {
        Json(RouteListing::new(self.routes.list())).into_response()
    }
}

fn not_found() -> Response {
    ApiError::NotFound("The requested endpoint does not exist".to_string()).into_response()
}
