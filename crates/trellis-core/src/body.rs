//! Request body decoding
//!
//! Bodies are read into a pooled buffer capped at the configured ceiling,
//! then handed to the route's [`BodyFactory`]. A read that fills the buffer
//! exactly is treated as overflow: the body was truncated at capacity.

use crate::pool::BufferPool;
use crate::{Error, Result};
use http_body::Body;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use trellis_router::{BodyFactory, DecodeError, Payload, Route};

/// JSON body target for `T`; an empty body yields `T::default()`
pub struct JsonBody<T>(PhantomData<fn() -> T>);

impl<T> JsonBody<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BodyFactory for JsonBody<T>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    fn empty(&self) -> Payload {
        Box::new(T::default())
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<Payload, DecodeError> {
        let value: T = serde_json::from_slice(bytes)?;
        Ok(Box::new(value))
    }
}

/// Shared JSON body factory for `T`, ready for [`Route::with_body`]
pub fn json_body<T>() -> Arc<dyn BodyFactory>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    Arc::new(JsonBody::<T>::new())
}

/// Read and decode the request body for `route`.
///
/// Routes without a body factory never touch the pool and yield `None`.
/// The body is consumed (and so closed) on every path; the leased buffer
/// goes back to the pool before this returns.
pub async fn decode_body<A, B>(route: &Route<A>, body: B, pool: &BufferPool) -> Result<Option<Payload>>
where
    B: Body,
    B::Error: fmt::Display,
{
    let Some(factory) = route.body_factory() else {
        return Ok(None);
    };

    let mut buffer = pool.checkout();
    let n = buffer.read_body(body).await;
    if n == 0 {
        return Ok(Some(factory.empty()));
    }
    if n == buffer.capacity() {
        return Err(Error::PayloadTooLarge { limit: n });
    }

    match factory.decode(buffer.bytes()) {
        Ok(payload) => Ok(Some(payload)),
        Err(e) => {
            tracing::debug!(error = %e, len = n, "request body rejected");
            Err(Error::MalformedBody(e.to_string()))
        }
    }
}
