// Check that a `RefCell` payload cannot be observed from two threads
// through a threaded `CList`'s many-reader path.
// edition:2021

use simc_sync::CList;
use std::cell::RefCell;
use std::sync::Arc;
use std::thread;

fn main() {
    let list = Arc::new(CList::<RefCell<i32>>::new());
    list.append(RefCell::new(0));

    let other = list.clone();
    thread::spawn(move || {
        let it = other.first().unwrap();
        *it.payload().borrow_mut() += 1;
    });
    //~^^^ ERROR: `RefCell<i32>` cannot be shared between threads safely
}
