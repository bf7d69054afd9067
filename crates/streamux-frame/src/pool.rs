//! Reusable scratch buffers for frame encoding.
//!
//! A [`BufferPool`] is an explicit, cloneable handle: clones share the same
//! free list, so encoders on different threads can draw from one pool.
//! [`PooledBuffer`] returns its buffer on drop, which covers every exit path
//! of an encode, including errors and panics.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;

use crate::codec::HEADER_SIZE;

/// Default capacity of a freshly allocated scratch buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 32 * 1024 + HEADER_SIZE;

/// Default number of idle buffers kept.
pub const DEFAULT_MAX_POOLED: usize = 16;

/// Buffers that grew past this are dropped on release instead of pooled.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Capacity of newly allocated buffers.
    pub buffer_capacity: usize,
    /// Maximum idle buffers kept for reuse.
    pub max_pooled: usize,
    /// Largest buffer capacity that is returned to the pool.
    pub max_retained_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_pooled: DEFAULT_MAX_POOLED,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
        }
    }
}

struct PoolInner {
    free: Mutex<Vec<BytesMut>>,
    config: PoolConfig,
}

/// Shared pool of scratch buffers.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create a pool with default sizing.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with explicit sizing.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(config.max_pooled)),
                config,
            }),
        }
    }

    /// Take an empty buffer from the pool, allocating if none is idle.
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.inner.config.buffer_capacity));
        PooledBuffer {
            buf,
            pool: self.clone(),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Pool sizing.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > self.inner.config.max_retained_capacity {
            tracing::trace!(capacity = buf.capacity(), "dropping oversized scratch buffer");
            return;
        }
        buf.clear();
        let mut free = self.lock();
        if free.len() < self.inner.config.max_pooled {
            free.push(buf);
        }
    }

    // The free list only ever holds cleared buffers, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<BytesMut>> {
        self.inner.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
pub struct PooledBuffer {
    buf: BytesMut,
    pool: BufferPool,
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
