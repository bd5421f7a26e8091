//! Single-producer/single-consumer bounded ring buffer.
//!
//! No mutex anywhere in this module: the producer and the consumer
//! synchronize purely through `Release`/`Acquire` stores and loads of two
//! index atomics, the same idiom `local-rcu`'s `Writer`/`Reader` pair uses
//! between a single `Release` store and `Acquire` load of a data pointer,
//! here applied to two indices instead of one pointer.
//!
//! Exactly one [`Producer`] and one [`Consumer`] exist per channel (neither
//! is `Clone`), which is as close as the type system gets to enforcing the
//! single-producer/single-consumer contract; running two threads against
//! the same `Producer` (or `Consumer`) through shared mutable access it was
//! never designed for remains undefined behavior, as it was in the original.
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Error;

struct Inner<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Number of slots (`N`); usable capacity is `capacity - 1`.
    capacity: usize,
    /// Next index the producer will write to.
    write: AtomicUsize,
    /// Next index the consumer will read from.
    read: AtomicUsize,
}

// SAFETY: all access to `buf` is mediated by the `write`/`read` protocol
// below: the producer only ever touches the slot at `write` (and only
// between its own `begin_write`/`commit` pair), the consumer only the slot
// at `read`. The two never overlap because `commit_write` refuses to
// advance onto a slot the consumer hasn't vacated, and vice versa.
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let read = *self.read.get_mut();
        let write = *self.write.get_mut();
        let mut i = read;
        while i != write {
            // SAFETY: every index in `[read, write)` (mod capacity) holds a
            // value written by `begin_write` and never consumed, since
            // `commit_read` is what advances `read` past it.
            unsafe {
                (*self.buf[i].get()).assume_init_drop();
            }
            i = (i + 1) % self.capacity;
        }
    }
}

fn occupancy<T>(inner: &Inner<T>) -> (usize, usize) {
    let read = inner.read.load(Ordering::Acquire);
    let write = inner.write.load(Ordering::Acquire);
    let used = if read <= write {
        write - read
    } else {
        inner.capacity - (read - write)
    };
    (inner.capacity - 1 - used, used)
}

/// Marker type carrying the channel constructor. There is no free-standing
/// `SpQueue<T>` value: a channel is always split into its [`Producer`] and
/// [`Consumer`] halves at construction time, matching the original's
/// "write/read handles, no shared queue object" shape.
pub struct SpQueue<T>(std::marker::PhantomData<T>);

impl<T> SpQueue<T> {
    /// Creates a bounded SPSC channel of `capacity` slots (usable capacity
    /// is `capacity - 1`, per the ring's full/empty disambiguation
    /// invariant).
    ///
    /// Returns `Error::Internal` if `capacity <= 1` (a queue with zero
    /// usable slots cannot do anything useful).
    pub fn channel(capacity: usize) -> Result<(Producer<T>, Consumer<T>), Error> {
        channel(capacity)
    }
}

fn channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), Error> {
    if capacity <= 1 {
        return Err(Error::Internal(
            "SpQueue capacity must be greater than 1 (one slot is always kept empty)",
        ));
    }
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));
    let inner = Arc::new(Inner {
        buf: slots.into_boxed_slice(),
        capacity,
        write: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
    });
    Ok((
        Producer {
            inner: inner.clone(),
        },
        Consumer { inner },
    ))
}

/// The producer half of an [`SpQueue`](self) channel. Not `Clone`: exactly
/// one exists per channel.
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

/// The consumer half of an [`SpQueue`](self) channel. Not `Clone`: exactly
/// one exists per channel.
pub struct Consumer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Producer<T> {
    /// Begins a write cycle, returning a slot to write the record into.
    /// Never fails or blocks; fullness is only discovered at
    /// [`WriteSlot::commit`].
    pub fn begin_write(&mut self) -> WriteSlot<'_, T> {
        let index = self.inner.write.load(Ordering::Relaxed);
        WriteSlot {
            inner: &self.inner,
            index,
        }
    }

    /// Resets the queue to empty. Caller must ensure no read or write cycle
    /// is in flight anywhere (on either handle) when calling this.
    pub fn clear(&mut self) {
        self.inner.write.store(0, Ordering::Relaxed);
        self.inner.read.store(0, Ordering::Relaxed);
    }

    /// Approximate `(free, used)` slot counts. May observe a torn view
    /// under concurrent update from the consumer.
    pub fn state(&self) -> (usize, usize) {
        occupancy(&self.inner)
    }
}

impl<T> Consumer<T> {
    /// Begins a read cycle. `None` if the queue is empty (the read index is
    /// left untouched in that case).
    pub fn begin_read(&mut self) -> Option<ReadSlot<'_, T>> {
        let read = self.inner.read.load(Ordering::Relaxed);
        let write = self.inner.write.load(Ordering::Acquire);
        if read == write {
            None
        } else {
            Some(ReadSlot {
                inner: &self.inner,
                index: read,
            })
        }
    }

    /// The "no slot pointer" convenience form: begins a read cycle and
    /// immediately commits it, discarding the record. Returns `false` if
    /// the queue was empty.
    pub fn skip(&mut self) -> bool {
        match self.begin_read() {
            Some(slot) => {
                slot.commit();
                true
            }
            None => false,
        }
    }

    /// Inspects the head record without ever advancing the read index,
    /// regardless of whether a read cycle is later started.
    pub fn peek(&self) -> Option<&T> {
        let read = self.inner.read.load(Ordering::Relaxed);
        let write = self.inner.write.load(Ordering::Acquire);
        if read == write {
            None
        } else {
            // SAFETY: `read != write` means the slot at `read` was
            // committed by a write and not yet consumed.
            Some(unsafe { (*self.inner.buf[read].get()).assume_init_ref() })
        }
    }

    /// Resets the queue to empty. Same caller obligation as
    /// [`Producer::clear`].
    pub fn clear(&mut self) {
        self.inner.write.store(0, Ordering::Relaxed);
        self.inner.read.store(0, Ordering::Relaxed);
    }

    /// Approximate `(free, used)` slot counts. May observe a torn view
    /// under concurrent update from the producer.
    pub fn state(&self) -> (usize, usize) {
        occupancy(&self.inner)
    }
}

/// A slot reserved for the producer to write a record into, returned by
/// [`Producer::begin_write`].
pub struct WriteSlot<'a, T> {
    inner: &'a Inner<T>,
    index: usize,
}

impl<'a, T> WriteSlot<'a, T> {
    /// Writes `value` into the slot in place.
    ///
    /// If a previous write to this same slot was never committed (the last
    /// `commit` on this index returned `false`), that previous value is
    /// overwritten here without its destructor running, matching the
    /// original's "full" contract, where an uncommitted write was never
    /// considered part of the queue's contents.
    pub fn put(&mut self, value: T) {
        // SAFETY: only the producer ever touches this index, and only
        // between `begin_write` and the matching `commit`.
        unsafe { &mut *self.inner.buf[self.index].get() }.write(value);
    }

    /// Commits the write. Returns `false` (without advancing) if the queue
    /// is full; the producer must retry later.
    pub fn commit(self) -> bool {
        let candidate = (self.index + 1) % self.inner.capacity;
        let read = self.inner.read.load(Ordering::Acquire);
        if candidate == read {
            false
        } else {
            self.inner.write.store(candidate, Ordering::Release);
            true
        }
    }
}

/// A slot holding a record ready for the consumer, returned by
/// [`Consumer::begin_read`].
pub struct ReadSlot<'a, T> {
    inner: &'a Inner<T>,
    index: usize,
}

impl<'a, T> ReadSlot<'a, T> {
    /// Borrows the record without consuming it.
    pub fn get(&self) -> &T {
        // SAFETY: only the consumer ever touches this index, and only
        // while a `ReadSlot` referencing it exists; the slot was
        // initialized by a committed write.
        unsafe { (*self.inner.buf[self.index].get()).assume_init_ref() }
    }

    /// Consumes the record out of the slot and advances the read index.
    pub fn commit(self) -> T {
        // SAFETY: see `get`; moving the value out here is the one place
        // this slot's contents are read destructively, and `Inner::drop`
        // never touches indices at or past the (now advanced) `read`.
        let value = unsafe { (*self.inner.buf[self.index].get()).assume_init_read() };
        let next = (self.index + 1) % self.inner.capacity;
        self.inner.read.store(next, Ordering::Release);
        value
    }
}
