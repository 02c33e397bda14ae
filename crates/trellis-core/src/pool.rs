//! Fixed-size pool of request body buffers
//!
//! Every buffer has the same capacity, the configured body ceiling. A
//! checkout hands out a [`PooledBuffer`] guard; dropping the guard returns
//! the buffer, so release happens on every exit path of the caller.
//!
//! When all pooled buffers are out, checkout allocates a detached buffer
//! of the same capacity instead of waiting. Detached buffers are freed on
//! release, so the pool never grows past its configured size.

use bytes::Buf;
use http_body::Body;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub checkouts: u64,
    pub releases: u64,
    /// Checkouts served by a detached buffer
    pub misses: u64,
    /// Buffers currently on the free-list
    pub available: usize,
}

struct Shared {
    free: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
    checkouts: AtomicU64,
    releases: AtomicU64,
    misses: AtomicU64,
}

/// Pool of reusable byte buffers
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<Shared>,
}

impl BufferPool {
    /// Create a pool of `count` buffers, each holding up to `capacity` bytes
    pub fn new(count: usize, capacity: usize) -> Self {
        let free = (0..count).map(|_| Vec::with_capacity(capacity)).collect();
        Self {
            shared: Arc::new(Shared {
                free: Mutex::new(free),
                capacity,
                checkouts: AtomicU64::new(0),
                releases: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Lease a buffer; it is returned when the guard drops
    pub fn checkout(&self) -> PooledBuffer {
        self.shared.checkouts.fetch_add(1, Ordering::Relaxed);

        let buf = self.shared.free.lock().pop();
        let (buf, pooled) = match buf {
            Some(buf) => (buf, true),
            None => {
                self.shared.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(capacity = self.shared.capacity, "body pool exhausted, allocating detached buffer");
                (Vec::with_capacity(self.shared.capacity), false)
            }
        };

        PooledBuffer {
            buf,
            pooled,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Per-buffer capacity
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Buffers currently on the free-list
    pub fn available(&self) -> usize {
        self.shared.free.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            checkouts: self.shared.checkouts.load(Ordering::Relaxed),
            releases: self.shared.releases.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            available: self.available(),
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.shared.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A buffer leased from a [`BufferPool`]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pooled: bool,
    shared: Arc<Shared>,
}

impl PooledBuffer {
    /// Copy as much of `data` as fits; returns the number of bytes taken
    pub fn fill(&mut self, data: &[u8]) -> usize {
        let room = self.shared.capacity - self.buf.len();
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        n
    }

    /// Stream a request body into the buffer.
    ///
    /// Stops at end of body or once the buffer is full, in which case the
    /// rest of the body is left unread. A read error ends the read with
    /// whatever was buffered. Returns the buffered length.
    pub async fn read_body<B>(&mut self, body: B) -> usize
    where
        B: Body,
        B::Error: fmt::Display,
    {
        let mut body = std::pin::pin!(body);
        while !self.is_full() {
            match body.frame().await {
                None => break,
                Some(Ok(frame)) => {
                    let Ok(mut data) = frame.into_data() else {
                        continue;
                    };
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        let len = chunk.len();
                        let n = self.fill(chunk);
                        data.advance(n);
                        if n < len {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, buffered = self.buf.len(), "request body read failed");
                    break;
                }
            }
        }
        self.buf.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.shared.capacity
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.shared.releases.fetch_add(1, Ordering::Relaxed);
        if self.pooled {
            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            self.shared.free.lock().push(buf);
        }
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.shared.capacity)
            .field("pooled", &self.pooled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body::Frame;
    use http_body_util::{Empty, Full};
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Body yielding pre-set frames, optionally ending in an error
    struct Chunked {
        chunks: VecDeque<Bytes>,
        fail_at_end: bool,
    }

    impl Chunked {
        fn new(chunks: &[&'static str], fail_at_end: bool) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Bytes::from_static(c.as_bytes())).collect(),
                fail_at_end,
            }
        }
    }

    impl Body for Chunked {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            match self.chunks.pop_front() {
                Some(chunk) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
                None if self.fail_at_end => {
                    self.fail_at_end = false;
                    Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
                }
                None => Poll::Ready(None),
            }
        }
    }

    #[test]
    fn test_checkout_release() {
        let pool = BufferPool::new(2, 16);
        assert_eq!(pool.available(), 2);

        {
            let a = pool.checkout();
            let _b = pool.checkout();
            assert_eq!(pool.available(), 0);
            assert_eq!(a.capacity(), 16);
        }

        assert_eq!(
            pool.stats(),
            PoolStats {
                checkouts: 2,
                releases: 2,
                misses: 0,
                available: 2,
            }
        );
    }

    #[test]
    fn test_exhausted_pool_detaches() {
        let pool = BufferPool::new(1, 8);
        let held = pool.checkout();
        let extra = pool.checkout();
        assert_eq!(pool.stats().misses, 1);
        drop(extra);
        // detached buffer is not added to the free-list
        assert_eq!(pool.available(), 0);
        drop(held);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.stats().releases, 2);
    }

    #[test]
    fn test_released_buffer_is_cleared() {
        let pool = BufferPool::new(1, 8);
        {
            let mut buf = pool.checkout();
            buf.fill(b"abc");
        }
        assert!(pool.checkout().is_empty());
    }

    #[test]
    fn test_fill_truncates_at_capacity() {
        let pool = BufferPool::new(1, 4);
        let mut buf = pool.checkout();
        assert_eq!(buf.fill(b"ab"), 2);
        assert_eq!(buf.fill(b"cdef"), 2);
        assert!(buf.is_full());
        assert_eq!(buf.fill(b"g"), 0);
        assert_eq!(buf.bytes(), b"abcd");
    }

    #[tokio::test]
    async fn test_read_body() {
        let pool = BufferPool::new(1, 64);

        let mut buf = pool.checkout();
        assert_eq!(buf.read_body(Full::new(Bytes::from_static(b"{\"a\":1}"))).await, 7);
        assert_eq!(buf.bytes(), b"{\"a\":1}");

        let mut buf = pool.checkout();
        assert_eq!(buf.read_body(Empty::<Bytes>::new()).await, 0);
    }

    #[tokio::test]
    async fn test_read_body_stops_when_full() {
        let pool = BufferPool::new(1, 5);
        let mut buf = pool.checkout();
        let n = buf.read_body(Chunked::new(&["abc", "defg", "hij"], false)).await;
        assert_eq!(n, 5);
        assert_eq!(buf.bytes(), b"abcde");
    }

    #[tokio::test]
    async fn test_read_body_error_keeps_prefix() {
        let pool = BufferPool::new(1, 64);
        let mut buf = pool.checkout();
        let n = buf.read_body(Chunked::new(&["ab", "cd"], true)).await;
        assert_eq!(n, 4);
        assert_eq!(buf.bytes(), b"abcd");
    }
}
