// Check that an `Unthreaded` list, which embeds no lock at all, cannot be
// shared across threads the way a `Threaded` one can.
// edition:2021

use simc_sync::list::{CList, Unthreaded};
use std::sync::Arc;
use std::thread;

fn main() {
    let list = Arc::new(CList::<i32, Unthreaded>::new_unthreaded());
    list.append(1);

    let other = list.clone();
    thread::spawn(move || {
        let _ = other.first();
    });
    //~^^^ ERROR: `Cell<Option<NonNull<simc_sync::list::Node<i32>>>>` cannot be shared between threads safely
}
