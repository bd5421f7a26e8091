//! Shared/exclusive (reader-writer) lock.
//!
//! Many readers XOR one writer. Unlike [`std::sync::RwLock`] there is no
//! read-to-write upgrade: a caller holding read access must release it and
//! then acquire write, and anything it cached about the protected structure
//! across that gap must be treated as stale (see [`CList`](crate::list::CList)
//! for the one caller in this crate that does exactly that).
//!
//! The default implementation is a counter scheme, portable and the one
//! `loom` model-checks. Enabling the `native-lock` feature swaps it for
//! `std::sync::RwLock<()>`, per the "custom vs native" note carried from the
//! original design.
#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
#[cfg(loom)]
use loom::thread;
#[cfg(not(loom))]
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
#[cfg(not(loom))]
use std::thread;

/// A large offset subtracted from the reader counter while a writer holds
/// the lock. Chosen so that no realistic number of concurrent readers can
/// push the counter back above zero while a writer is draining them.
///
/// The original C implementation used `0xFFFF`; this port scales the bound
/// to `isize` instead of reusing that literal, since it has no particular
/// meaning on 64-bit targets beyond "much larger than any reader count".
const THRESHOLD: isize = isize::MAX / 2;

#[cfg(not(feature = "native-lock"))]
#[derive(Debug, Default)]
pub struct SxLock {
    /// >= 0: that many readers held. <= -THRESHOLD: a writer holds (or is
    /// draining readers).
    state: AtomicIsize,
    /// Serializes writers; readers never touch this. A plain spinlock
    /// rather than `std::sync::Mutex` because `acquire_write`/
    /// `release_write` are separate calls with no guard to carry the
    /// borrow between them.
    writer_held: AtomicBool,
}

#[cfg(not(feature = "native-lock"))]
impl SxLock {
    pub fn new() -> Self {
        Self {
            state: AtomicIsize::new(0),
            writer_held: AtomicBool::new(false),
        }
    }

    pub fn acquire_read(&self) {
        loop {
            let prev = self.state.fetch_add(1, Ordering::Acquire);
            if prev >= 0 {
                return;
            }
            self.state.fetch_sub(1, Ordering::Relaxed);
            tracing::trace!("sxlock: read blocked on pending writer, yielding");
            thread::yield_now();
        }
    }

    pub fn release_read(&self) {
        self.state.fetch_sub(1, Ordering::Release);
    }

    pub fn acquire_write(&self) {
        while self
            .writer_held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::trace!("sxlock: write waiting on another writer");
            thread::yield_now();
        }
        self.state.fetch_sub(THRESHOLD, Ordering::Acquire);
        while self.state.load(Ordering::Acquire) != -THRESHOLD {
            tracing::trace!("sxlock: write waiting for readers to drain");
            thread::yield_now();
        }
    }

    pub fn release_write(&self) {
        while self.state.load(Ordering::Relaxed) != -THRESHOLD {
            tracing::trace!("sxlock: release_write waiting on consistent state");
            thread::yield_now();
        }
        self.state.fetch_add(THRESHOLD, Ordering::Release);
        self.writer_held.store(false, Ordering::Release);
    }
}

#[cfg(feature = "native-lock")]
pub struct SxLock {
    inner: parking_lot::RawRwLock,
}

#[cfg(feature = "native-lock")]
impl Default for SxLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "native-lock")]
impl std::fmt::Debug for SxLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SxLock").finish_non_exhaustive()
    }
}

// `parking_lot::RawRwLock` exposes lock/unlock as independent calls (no
// guard object), which is exactly the shape `acquire_*`/`release_*` need -
// no `mem::forget` trick required, unlike `std::sync::RwLock`.
#[cfg(feature = "native-lock")]
impl SxLock {
    pub fn new() -> Self {
        use lock_api::RawRwLock;
        Self {
            inner: parking_lot::RawRwLock::INIT,
        }
    }

    pub fn acquire_read(&self) {
        use lock_api::RawRwLock;
        self.inner.lock_shared();
    }

    pub fn release_read(&self) {
        use lock_api::RawRwLock;
        // SAFETY: pairs with a prior `acquire_read`, enforced by this
        // crate's only caller, `CList`/`Iter`.
        unsafe { self.inner.unlock_shared() };
    }

    pub fn acquire_write(&self) {
        use lock_api::RawRwLock;
        self.inner.lock_exclusive();
    }

    pub fn release_write(&self) {
        use lock_api::RawRwLock;
        // SAFETY: pairs with a prior `acquire_write`.
        unsafe { self.inner.unlock_exclusive() };
    }
}
