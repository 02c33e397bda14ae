//! Request dispatcher
//!
//! Runs one request through the pipeline:
//! resolve path -> decode body -> parse query -> build context -> dispatch.
//! Every request yields exactly one well-formed [`Response`]; failures are
//! replaced by canned responses and never reach the transport.

use crate::body::decode_body;
use crate::context::{Context, Handler, HandlerFuture};
use crate::pool::BufferPool;
use crate::{Canned, Config, Error, Response, Result, StatusCode};
use bytes::Bytes;
use http_body::Body;
use http_body_util::Full;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use trellis_router::{parse_query, percent_decode_path, Route, RouteTable};

type ContextFactory<A, C> = Arc<dyn Fn(Context<A>) -> C + Send + Sync>;
type DispatchFn<A, C> = Arc<dyn Fn(Arc<Route<A>>, C) -> HandlerFuture + Send + Sync>;

/// Dispatcher over an immutable route table
///
/// `A` is the action type stored in routes, `C` the application context
/// built from each [`Context`].
pub struct Router<A, C> {
    routes: Arc<RouteTable<A>>,
    pool: BufferPool,
    canned: Canned,
    context_factory: ContextFactory<A, C>,
    dispatch: DispatchFn<A, C>,
}

impl<A, C> Router<A, C>
where
    A: Send + Sync + 'static,
    C: 'static,
{
    /// Create a router.
    ///
    /// `context_factory` turns the base context into the application's
    /// context; `dispatch` invokes the matched route's action with it.
    pub fn new<F, D, Fut>(routes: RouteTable<A>, config: &Config, context_factory: F, dispatch: D) -> Self
    where
        F: Fn(Context<A>) -> C + Send + Sync + 'static,
        D: Fn(Arc<Route<A>>, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Response>> + Send + 'static,
    {
        Self {
            routes: Arc::new(routes),
            pool: BufferPool::new(config.body_pool_size, config.max_body_size),
            canned: Canned::from_config(config),
            context_factory: Arc::new(context_factory),
            dispatch: Arc::new(move |route, ctx| Box::pin(dispatch(route, ctx))),
        }
    }

    /// Replace the canned failure responses
    pub fn with_canned(mut self, canned: Canned) -> Self {
        self.canned = canned;
        self
    }

    pub fn routes(&self) -> &RouteTable<A> {
        &self.routes
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn canned(&self) -> &Canned {
        &self.canned
    }

    /// Run the full pipeline and return the response to send
    pub async fn handle<B>(&self, req: http::Request<B>) -> Response
    where
        B: Body + Send,
        B::Error: fmt::Display,
    {
        let uri = req.uri().clone();
        let outcome = self.process(req).await;
        self.reply(outcome, &uri)
    }

    /// [`handle`](Self::handle), converted for the transport
    pub async fn serve<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Error: fmt::Display,
    {
        self.handle(req).await.into_http()
    }

    async fn process<B>(&self, req: http::Request<B>) -> Result<Option<Response>>
    where
        B: Body + Send,
        B::Error: fmt::Display,
    {
        let (parts, body) = req.into_parts();

        let matched = percent_decode_path(parts.uri.path())
            .and_then(|path| self.routes.resolve(parts.method.as_str(), &path));
        let Some(matched) = matched else {
            return Err(Error::RouteNotFound {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
            });
        };
        let route = Arc::clone(matched.route);
        let params = matched.params;

        let body = decode_body(&route, body, &self.pool).await?;
        let query = parts.uri.query().and_then(parse_query);

        let ctx = Context::new(parts, Arc::clone(&route), params, body, query);
        let ctx = (self.context_factory)(ctx);
        Ok((self.dispatch)(route, ctx).await)
    }

    fn reply(&self, outcome: Result<Option<Response>>, uri: &http::Uri) -> Response {
        let res = match outcome {
            Ok(Some(res)) => res,
            Ok(None) => self
                .canned
                .internal_server_error
                .clone()
                .with_fault(Error::HandlerFault { url: uri.to_string() }),
            Err(e) => {
                tracing::debug!(url = %uri, error = %e, "request rejected");
                self.canned.for_error(&e).with_fault(e)
            }
        };

        if res.status == StatusCode::INTERNAL_SERVER_ERROR {
            match res.fault() {
                Some(fault) => tracing::error!(url = %uri, error = %fault, "internal server error"),
                None => tracing::error!(url = %uri, "internal server error"),
            }
        }
        res
    }
}

impl Router<Handler, Context<Handler>> {
    /// Router whose routes carry their own [`Handler`]s
    pub fn with_handlers(routes: RouteTable<Handler>, config: &Config) -> Self {
        Self::new(routes, config, |ctx| ctx, |route, ctx| route.action().call(ctx))
    }
}

impl<A, C> fmt::Debug for Router<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
