//! Native HTTP server
//!
//! hyper HTTP/1.1 on a multi-threaded tokio runtime:
//! - One task per connection, requests handed to the [`Router`]
//! - SO_REUSEPORT for load balancing
//! - TCP_NODELAY for low latency

use crate::{Config, Error, Result, Router};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind a tuned listener for the configured address
pub fn bind(config: &Config) -> Result<TcpListener> {
    let addr: SocketAddr = config
        .address()
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address {}: {e}", config.address())))?;

    let socket = create_optimized_socket(&addr)?;
    socket.set_nonblocking(true)?;
    Ok(TcpListener::from_std(socket.into())?)
}

/// Create a TCP socket with optimizations
fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // SO_REUSEPORT - enable kernel load balancing across threads
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Accept connections until `shutdown` resolves.
///
/// Connections already accepted keep running to completion on their own
/// tasks; only the accept loop stops.
pub async fn serve<A, C, S>(listener: TcpListener, router: Arc<Router<A, C>>, shutdown: S) -> Result<()>
where
    A: Send + Sync + 'static,
    C: Send + 'static,
    S: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, routes = router.routes().len(), "listening for connections");

    let mut shutdown = std::pin::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { Ok::<_, Infallible>(router.serve(req).await) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        // Only log if not a normal connection close
                        if !e.is_incomplete_message() {
                            tracing::debug!(peer = %peer, error = %e, "connection error");
                        }
                    }
                });
            }
            _ = &mut shutdown => {
                tracing::info!(address = %local_addr, "shutdown requested, no longer accepting connections");
                break;
            }
        }
    }
    Ok(())
}
