//! Concurrent intrusive doubly-linked list.
//!
//! Many readers may traverse a [`CList`] at once; exactly one writer may
//! append, remove, or reorder at a time, and a writer blocks until every
//! in-flight reader has finished. The interesting part of this module is
//! the iterator: `first`/`last` hand back a live [`Iter`] that *holds the
//! read lock for as long as it exists*, and stepping it (`next`/`prev`)
//! consumes the old `Iter` and returns a new one (or `None`, releasing the
//! lock). Dropping a live `Iter` early releases the read lock in its `Drop`
//! impl, so there is no way to leak a held lock by forgetting to call
//! `stop` the way the original C API required.
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::sxlock::SxLock;

struct Node<T> {
    prev: Option<NonNull<Node<T>>>,
    next: Option<NonNull<Node<T>>>,
    payload: T,
}

/// Selects whether a [`CList`] is guarded by a lock at all.
///
/// Sealed: these are the only two modes the original `multithreaded` flag
/// distinguished, and nothing outside this crate can add a third.
pub trait LockMode: sealed::Sealed + Default {
    #[doc(hidden)]
    fn acquire_read(&self);
    #[doc(hidden)]
    fn release_read(&self);
    #[doc(hidden)]
    fn acquire_write(&self);
    #[doc(hidden)]
    fn release_write(&self);
}

/// Many readers, one writer, enforced by an embedded shared/exclusive lock.
#[derive(Default)]
pub struct Threaded(SxLock);

/// No locking at all. Eliminates lock overhead for read-only catalogues
/// that are never shared across threads. `CList<T, Unthreaded>` is never
/// `Sync` (see the impls below), so sharing one across threads is a
/// compile error rather than the silent undefined behavior the original
/// left as the caller's responsibility.
#[derive(Default)]
pub struct Unthreaded;

impl LockMode for Threaded {
    fn acquire_read(&self) {
        self.0.acquire_read();
    }
    fn release_read(&self) {
        self.0.release_read();
    }
    fn acquire_write(&self) {
        self.0.acquire_write();
    }
    fn release_write(&self) {
        self.0.release_write();
    }
}

impl LockMode for Unthreaded {
    fn acquire_read(&self) {}
    fn release_read(&self) {}
    fn acquire_write(&self) {}
    fn release_write(&self) {}
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Threaded {}
    impl Sealed for super::Unthreaded {}
}

/// An opaque, comparable identity for a node previously linked into a
/// [`CList`]. Returned by [`CList::append`] and [`Iter::id`].
///
/// Carries no lifetime: it is the caller's responsibility not to pass an
/// `EntryId` naming a node that has since been [`Iter::remove`]d to
/// [`Iter::move_after`], exactly the precondition the original placed on
/// its raw `SIMC_LIST_ENTRY*` "source" argument, and just as unchecked here.
pub struct EntryId<T> {
    node: NonNull<Node<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntryId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for EntryId<T> {}

impl<T> PartialEq for EntryId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}
impl<T> Eq for EntryId<T> {}

impl<T> fmt::Debug for EntryId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryId").field(&self.node.as_ptr()).finish()
    }
}

/// A concurrent intrusive doubly-linked list of `T`.
///
/// `L` selects the lock mode; it defaults to [`Threaded`]. Build a
/// single-threaded list with [`CList::new_unthreaded`].
pub struct CList<T, L: LockMode = Threaded> {
    first: Cell<Option<NonNull<Node<T>>>>,
    last: Cell<Option<NonNull<Node<T>>>>,
    lock: L,
    _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: a `CList` only exposes `T` by value (through owned nodes) or by
// shared reference while a reader holds the list's lock; moving the whole
// list to another thread requires nothing beyond `T: Send`.
unsafe impl<T: Send, L: LockMode> Send for CList<T, L> {}
// SAFETY: `Threaded`'s embedded `SxLock` allows many readers at once, each
// handed out a `&T` concurrently (see `Iter::payload`), which is exactly
// what `RwLock<T>` requires `T: Sync` for; `T: Send` alone would let two
// threads race on a `&RefCell<_>` payload through two simultaneous readers.
// `Unthreaded` deliberately has no such impl (see its doc comment), and it
// doesn't get one transitively: the `Cell` fields above are themselves
// `!Sync` regardless of `L`.
unsafe impl<T: Send + Sync> Sync for CList<T, Threaded> {}

impl<T> CList<T, Threaded> {
    /// A new list guarded by a shared/exclusive lock.
    pub fn new() -> Self {
        Self {
            first: Cell::new(None),
            last: Cell::new(None),
            lock: Threaded::default(),
            _owns: PhantomData,
        }
    }
}

impl<T> Default for CList<T, Threaded> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CList<T, Unthreaded> {
    /// A new list with no locking at all. Not `Sync` (see [`Unthreaded`]).
    pub fn new_unthreaded() -> Self {
        Self {
            first: Cell::new(None),
            last: Cell::new(None),
            lock: Unthreaded,
            _owns: PhantomData,
        }
    }
}

impl<T, L: LockMode> CList<T, L> {
    /// Appends `payload` to the tail. O(1), blocks concurrent iteration for
    /// the duration of the splice.
    pub fn append(&self, payload: T) -> EntryId<T> {
        self.lock.acquire_write();
        let node = Box::new(Node {
            prev: self.last.get(),
            next: None,
            payload,
        });
        // SAFETY: `Box::into_raw` never returns null.
        let node = unsafe { NonNull::new_unchecked(Box::into_raw(node)) };
        if let Some(mut last) = self.last.get() {
            // SAFETY: `last` is a live node owned by this list; we hold the
            // write lock, so no reader can be observing it right now.
            unsafe { last.as_mut().next = Some(node) };
        }
        self.last.set(Some(node));
        if self.first.get().is_none() {
            self.first.set(Some(node));
        }
        tracing::trace!("clist: appended node");
        self.lock.release_write();
        EntryId {
            node,
            _marker: PhantomData,
        }
    }

    /// Starts iterating from the head. `None` if the list is empty (no lock
    /// is held on return in that case).
    pub fn first(&self) -> Option<Iter<'_, T, L>> {
        self.lock.acquire_read();
        match self.first.get() {
            Some(node) => Some(Iter {
                list: self,
                current: node,
                released: false,
            }),
            None => {
                self.lock.release_read();
                None
            }
        }
    }

    /// Starts iterating from the tail. `None` if the list is empty.
    pub fn last(&self) -> Option<Iter<'_, T, L>> {
        self.lock.acquire_read();
        match self.last.get() {
            Some(node) => Some(Iter {
                list: self,
                current: node,
                released: false,
            }),
            None => {
                self.lock.release_read();
                None
            }
        }
    }

    /// Patches `node`'s neighbors (and `first`/`last` if `node` is an
    /// anchor) to skip over it. Does not free `node` and does not touch
    /// `node`'s own `prev`/`next` fields. Caller must hold the write lock.
    fn unlink(&self, node: NonNull<Node<T>>) {
        // SAFETY: caller holds the write lock; `node` is currently linked.
        unsafe {
            let n = node.as_ref();
            match n.prev {
                Some(mut p) => p.as_mut().next = n.next,
                None => self.first.set(n.next),
            }
            match n.next {
                Some(mut nx) => nx.as_mut().prev = n.prev,
                None => self.last.set(n.prev),
            }
        }
    }
}

impl<T, L: LockMode> Drop for CList<T, L> {
    fn drop(&mut self) {
        let mut cur = self.first.get();
        while let Some(node) = cur {
            // SAFETY: `drop` has exclusive access to the list; every linked
            // node was allocated by `append` via `Box::into_raw` and is
            // freed exactly once, here or in `Iter::remove`.
            unsafe {
                let boxed = Box::from_raw(node.as_ptr());
                cur = boxed.next;
            }
        }
    }
}

/// A live traversal of a [`CList`]. Holds the list's read lock for as long
/// as it exists; stepping consumes it and returns the next one (or `None`,
/// having released the lock).
pub struct Iter<'a, T, L: LockMode = Threaded> {
    list: &'a CList<T, L>,
    current: NonNull<Node<T>>,
    released: bool,
}

impl<'a, T, L: LockMode> Iter<'a, T, L> {
    /// The payload at the current position.
    pub fn payload(&self) -> &T {
        // SAFETY: the read lock held since construction keeps `current`
        // alive and unchanged out from under us.
        unsafe { &self.current.as_ref().payload }
    }

    /// An opaque, comparable identity for the current node, usable later as
    /// `move_after`'s `source` argument.
    pub fn id(&self) -> EntryId<T> {
        EntryId {
            node: self.current,
            _marker: PhantomData,
        }
    }

    /// Steps to the next entry, consuming this `Iter`. `None` at the tail
    /// (the read lock has already been released in that case).
    pub fn next(mut self) -> Option<Self> {
        // SAFETY: see `payload`.
        let next = unsafe { self.current.as_ref().next };
        match next {
            Some(node) => {
                self.current = node;
                Some(self)
            }
            None => {
                self.list.lock.release_read();
                self.released = true;
                None
            }
        }
    }

    /// Steps to the previous entry, consuming this `Iter`. `None` at the
    /// head (the read lock has already been released in that case).
    pub fn prev(mut self) -> Option<Self> {
        // SAFETY: see `payload`.
        let prev = unsafe { self.current.as_ref().prev };
        match prev {
            Some(node) => {
                self.current = node;
                Some(self)
            }
            None => {
                self.list.lock.release_read();
                self.released = true;
                None
            }
        }
    }

    /// Ends iteration early. Equivalent to dropping the `Iter`; spelled out
    /// because the original API required an explicit call on early exit.
    pub fn stop(self) {}

    /// Removes the current entry. Consumes this `Iter`, terminating the
    /// current traversal; the caller must call `first`/`last` again to
    /// keep going, exactly as the original required.
    ///
    /// Internally releases the read lock, acquires the write lock (the
    /// upgrade gap named in the module-level docs), splices the node out,
    /// and drops its payload.
    pub fn remove(mut self) {
        let list = self.list;
        let node = self.current;
        list.lock.release_read();
        self.released = true;
        list.lock.acquire_write();
        list.unlink(node);
        tracing::trace!("clist: removed node");
        // SAFETY: `node` was boxed by `append`; this is the one place it is
        // freed on this path, and no reader can be holding a reference to
        // it (the write lock above only granted once every outstanding
        // reader, including whichever `Iter` last referenced this node,
        // had released).
        drop(unsafe { Box::from_raw(node.as_ptr()) });
        list.lock.release_write();
    }

    /// Moves the current entry immediately after `source` (or to the head,
    /// if `source` is `None`). Consumes this `Iter` for the same reason
    /// `remove` does.
    ///
    /// If `source` names the current entry itself this is a no-op (matching
    /// the original's `dest == source` special case).
    pub fn move_after(mut self, source: Option<EntryId<T>>) {
        let list = self.list;
        let dest = self.current;
        if source.map(|s| s.node) == Some(dest) {
            list.lock.release_read();
            self.released = true;
            return;
        }
        list.lock.release_read();
        self.released = true;
        list.lock.acquire_write();
        list.unlink(dest);
        // SAFETY: caller holds the write lock for the whole splice below;
        // `source`, if given, is assumed to still name a node linked into
        // this same list (see `EntryId`'s doc comment).
        unsafe {
            match source {
                Some(src) => {
                    let mut src_node = src.node;
                    let old_next = src_node.as_ref().next;
                    src_node.as_mut().next = Some(dest);
                    let dest_mut = dest.as_ptr();
                    (*dest_mut).prev = Some(src_node);
                    (*dest_mut).next = old_next;
                    match old_next {
                        Some(mut n) => n.as_mut().prev = Some(dest),
                        None => list.last.set(Some(dest)),
                    }
                }
                None => {
                    let old_first = list.first.get();
                    let dest_mut = dest.as_ptr();
                    (*dest_mut).prev = None;
                    (*dest_mut).next = old_first;
                    match old_first {
                        Some(mut f) => f.as_mut().prev = Some(dest),
                        None => list.last.set(Some(dest)),
                    }
                    list.first.set(Some(dest));
                }
            }
        }
        tracing::trace!("clist: moved node");
        list.lock.release_write();
    }
}

impl<'a, T, L: LockMode> Drop for Iter<'a, T, L> {
    fn drop(&mut self) {
        if !self.released {
            self.list.lock.release_read();
        }
    }
}
