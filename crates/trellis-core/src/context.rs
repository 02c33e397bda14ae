//! Per-request context handed to handlers

use crate::Response;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use trellis_router::{Params, Payload, Query, Route};

/// Boxed handler future; `None` means the handler produced no response
pub type HandlerFuture = Pin<Box<dyn Future<Output = Option<Response>> + Send>>;

/// Everything the dispatcher learned about a request
pub struct Context<A> {
    /// Method, URI and headers of the request
    pub request: http::request::Parts,
    pub route: Arc<Route<A>>,
    pub params: Params,
    pub query: Option<Query>,
    body: Option<Payload>,
}

impl<A> Context<A> {
    pub fn new(
        request: http::request::Parts,
        route: Arc<Route<A>>,
        params: Params,
        body: Option<Payload>,
        query: Option<Query>,
    ) -> Self {
        Self {
            request,
            route,
            params,
            query,
            body,
        }
    }

    pub fn method(&self) -> &http::Method {
        &self.request.method
    }

    pub fn uri(&self) -> &http::Uri {
        &self.request.uri
    }

    /// Resource id from the path
    pub fn id(&self) -> Option<&str> {
        self.params.id.as_deref()
    }

    /// Parent resource id from the path
    pub fn parent_id(&self) -> Option<&str> {
        self.params.parent_id.as_deref()
    }

    /// Query value, key matched case-insensitively
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.as_ref()?.get(key)
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Borrow the decoded body as `T`
    pub fn body<T: 'static>(&self) -> Option<&T> {
        self.body.as_deref()?.downcast_ref()
    }

    /// Take ownership of the decoded body as `T`.
    ///
    /// On a type mismatch the body stays in place.
    pub fn take_body<T: 'static>(&mut self) -> Option<T> {
        let body = self.body.take()?;
        match body.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(body) => {
                self.body = Some(body);
                None
            }
        }
    }
}

impl<A> fmt::Debug for Context<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .field("route", &self.route)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Async request handler stored as a route's action
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(Context<Handler>) -> HandlerFuture + Send + Sync>);

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context<Handler>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Response>> + Send + 'static,
    {
        Self(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    pub fn call(&self, ctx: Context<Handler>) -> HandlerFuture {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}
