//! Concurrency substrate for a simulator core.
//!
//! Three independent primitives, each usable on its own:
//!
//! - [`list`]: [`CList`](list::CList), a concurrent intrusive doubly-linked
//!   list guarded by a shared/exclusive lock, used for catalogues (bodies,
//!   threads, scheduled events) that many readers traverse while a single
//!   writer occasionally appends, removes, or reorders.
//! - [`queue`]: [`SpQueue`](queue), a lock-free single-producer/single-
//!   consumer bounded ring buffer, used to hand records across a thread
//!   boundary without blocking either side.
//! - [`sxlock`]: [`SxLock`](sxlock::SxLock), the shared/exclusive lock
//!   `CList` builds on; exposed as its own module since other call sites
//!   may want the same many-readers-XOR-one-writer discipline without the
//!   list on top of it.
//! - [`time`]: [`now_seconds`](time::now_seconds) and
//!   [`now_mjd`](time::now_mjd), the process-relative clock the rest of a
//!   simulator core times itself against.
//!
//! None of these take a lock across an `await` point or otherwise assume an
//! async runtime; all blocking here is short spins against atomics, not
//! syscalls.
pub mod error;
pub mod list;
pub mod queue;
pub mod sxlock;
pub mod time;

pub use error::Error;
pub use list::{CList, EntryId, Iter, LockMode, Threaded, Unthreaded};
pub use queue::{Consumer, Producer, ReadSlot, SpQueue, WriteSlot};
pub use sxlock::SxLock;
pub use time::{now_mjd, now_seconds};
