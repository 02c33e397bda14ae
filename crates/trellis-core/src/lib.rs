//! trellis-core: REST request dispatch core
//!
//! Maps HTTP requests onto a versioned route table, decodes JSON bodies
//! through a bounded buffer pool and assembles uniform responses.
//!
//! ## Features
//! - `native` - hyper/tokio server glue and log subscriber setup
//!
//! ## Example
//! ```
//! use trellis_core::{Config, Context, Handler, Response, Route, RouteTable, Router, StatusCode};
//!
//! let mut table = RouteTable::new();
//! table.insert(
//!     "v1",
//!     "users",
//!     Route::new("GET", Handler::new(|ctx: Context<Handler>| async move {
//!         let id = ctx.id()?.to_string();
//!         Some(Response::json(format!(r#"{{"id":"{id}"}}"#), StatusCode::OK))
//!     })),
//! );
//!
//! let router = Router::with_handlers(table, &Config::default());
//! assert_eq!(router.routes().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod body;
pub mod canned;
pub mod config;
pub mod context;
pub mod error;
pub mod pool;
pub mod response;
pub mod router;

#[cfg(feature = "native")]
pub mod logging;

#[cfg(feature = "native")]
pub mod server;

// Re-exports
pub use body::{decode_body, json_body, JsonBody};
pub use canned::Canned;
pub use config::{format_size, parse_size, Config};
pub use context::{Context, Handler, HandlerFuture};
pub use error::{Error, Result};
pub use pool::{BufferPool, PoolStats, PooledBuffer};
pub use response::{Fault, Response, ResponseBuilder, StatusCode, JSON_CONTENT_TYPE};
pub use router::Router;

// Router crate re-exports
pub use trellis_router::{
    parse_query, BodyFactory, Params, Payload, Query, Route, RouteTable, LIST,
};

#[cfg(feature = "native")]
pub use server::{bind, serve};
