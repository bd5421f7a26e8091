use simc_sync::list::{CList, Unthreaded};
use simc_sync::queue::SpQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

/// Turns on `tracing` output for this test binary, gated so only the first
/// caller pays for it. Off unless `RUST_LOG` is set, since these tests run
/// by default with no env filter and would otherwise print nothing anyway;
/// set `RUST_LOG=trace cargo test -- --nocapture` to see the crate's
/// contention/append/remove/move trace events.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

// Scenario 2: append/iterate.
#[test]
fn list_append_and_iterate_both_directions() {
    init_tracing();
    let list = CList::<char>::new();
    for c in ['a', 'b', 'c'] {
        list.append(c);
    }

    let mut forward = Vec::new();
    let mut cur = list.first();
    while let Some(it) = cur {
        forward.push(*it.payload());
        cur = it.next();
    }
    assert_eq!(forward, vec!['a', 'b', 'c']);

    let mut backward = Vec::new();
    let mut cur = list.last();
    while let Some(it) = cur {
        backward.push(*it.payload());
        cur = it.prev();
    }
    assert_eq!(backward, vec!['c', 'b', 'a']);
}

// Scenario 3: remove inside iteration terminates the traversal.
#[test]
fn list_remove_inside_iteration_terminates_traversal() {
    init_tracing();
    let list = CList::<char>::new();
    for c in ['a', 'b', 'c', 'd'] {
        list.append(c);
    }

    let mut it = list.first().unwrap();
    loop {
        if *it.payload() == 'b' {
            it.remove();
            break;
        }
        it = it.next().expect("b is in the list");
    }

    let mut remaining = Vec::new();
    let mut cur = list.first();
    while let Some(it) = cur {
        remaining.push(*it.payload());
        cur = it.next();
    }
    assert_eq!(remaining, vec!['a', 'c', 'd']);
}

// Scenario 4: move_after with an explicit source, and with none (head).
#[test]
fn list_move_after_source_and_head() {
    init_tracing();
    let list = CList::<char>::new();
    for c in ['a', 'b', 'c', 'd'] {
        list.append(c);
    }

    let id_of = |c: char| {
        let mut cur = list.first();
        while let Some(it) = cur {
            if *it.payload() == c {
                return it.id();
            }
            cur = it.next();
        }
        unreachable!()
    };
    let c_id = id_of('c');

    let mut cur = list.first();
    while let Some(it) = cur {
        if *it.payload() == 'a' {
            it.move_after(Some(c_id));
            break;
        }
        cur = it.next();
    }
    let snapshot = |list: &CList<char>| {
        let mut out = Vec::new();
        let mut cur = list.first();
        while let Some(it) = cur {
            out.push(*it.payload());
            cur = it.next();
        }
        out
    };
    assert_eq!(snapshot(&list), vec!['b', 'c', 'a', 'd']);

    let mut cur = list.first();
    while let Some(it) = cur {
        if *it.payload() == 'c' {
            it.move_after(None);
            break;
        }
        cur = it.next();
    }
    assert_eq!(snapshot(&list), vec!['c', 'b', 'a', 'd']);
}

// Scenario 5: 8 reader threads iterate a 1000-element list for one second
// while a writer appends 100 more entries; no reader sees a torn link, and
// the final length is 1100.
#[test]
fn list_reader_writer_race_no_torn_links() {
    init_tracing();
    let list = Arc::new(CList::<u64>::new());
    for i in 0..1000u64 {
        list.append(i);
    }

    let deadline = Instant::now() + Duration::from_secs(1);
    let mut readers = Vec::new();
    for _ in 0..8 {
        let list = list.clone();
        readers.push(std::thread::spawn(move || {
            while Instant::now() < deadline {
                let mut count = 0usize;
                let mut cur = list.first();
                while let Some(it) = cur {
                    let _ = it.payload();
                    count += 1;
                    cur = it.next();
                }
                assert!(count >= 1000);
            }
        }));
    }

    let writer_list = list.clone();
    let writer = std::thread::spawn(move || {
        for i in 1000..1100u64 {
            writer_list.append(i);
            std::thread::yield_now();
        }
    });

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let mut count = 0usize;
    let mut cur = list.first();
    while let Some(it) = cur {
        count += 1;
        cur = it.next();
    }
    assert_eq!(count, 1100);
}

// Scenario 1: queue basic capacity and order.
#[test]
fn queue_basic_capacity_and_order() {
    init_tracing();
    let (mut tx, mut rx) = SpQueue::channel::<u64>(4).unwrap();

    for v in [10, 20, 30] {
        let mut slot = tx.begin_write();
        slot.put(v);
        assert!(slot.commit());
    }
    let mut slot = tx.begin_write();
    slot.put(40);
    assert!(!slot.commit());

    for expect in [10, 20, 30] {
        let slot = rx.begin_read().unwrap();
        assert_eq!(slot.commit(), expect);
    }
    assert!(rx.begin_read().is_none());
}

// Scenario 6: a million monotonically increasing values through a 64-slot
// queue, producer and consumer on separate threads.
#[test]
fn queue_stress_one_million_values() {
    init_tracing();
    const N: u64 = 1_000_000;
    let (mut tx, mut rx) = SpQueue::channel::<u64>(64).unwrap();

    let producer = std::thread::spawn(move || {
        let mut next = 0u64;
        while next < N {
            let mut slot = tx.begin_write();
            slot.put(next);
            if slot.commit() {
                next += 1;
            } else {
                std::thread::yield_now();
            }
        }
    });

    let consumer = std::thread::spawn(move || {
        let mut expected = 0u64;
        while expected < N {
            if let Some(slot) = rx.begin_read() {
                assert_eq!(slot.commit(), expected);
                expected += 1;
            } else {
                std::thread::yield_now();
            }
        }
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}

// P1, observed with an external monitor: readers and a writer are never
// both active on the same list at once.
#[test]
fn sxlock_exclusion_observed_externally() {
    init_tracing();
    let list = Arc::new(CList::<u64>::new());
    for i in 0..100u64 {
        list.append(i);
    }

    let active_readers = Arc::new(AtomicUsize::new(0));
    let writer_active = Arc::new(AtomicUsize::new(0));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let list = list.clone();
        let active_readers = active_readers.clone();
        let writer_active = writer_active.clone();
        readers.push(std::thread::spawn(move || {
            for _ in 0..2000 {
                active_readers.fetch_add(1, Ordering::SeqCst);
                assert_eq!(writer_active.load(Ordering::SeqCst), 0);
                let mut cur = list.first();
                while let Some(it) = cur {
                    let _ = it.payload();
                    cur = it.next();
                }
                active_readers.fetch_sub(1, Ordering::SeqCst);
            }
        }));
    }

    let writer = {
        let list = list.clone();
        let active_readers = active_readers.clone();
        let writer_active = writer_active.clone();
        std::thread::spawn(move || {
            for i in 0..500u64 {
                writer_active.store(1, Ordering::SeqCst);
                assert_eq!(active_readers.load(Ordering::SeqCst), 0);
                list.append(1000 + i);
                writer_active.store(0, Ordering::SeqCst);
            }
        })
    };

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

// Exercises the unthreaded variant's functional behavior (no lock overhead,
// still correct single-threaded semantics).
#[test]
fn unthreaded_list_functions_without_locking() {
    init_tracing();
    let list = CList::<u32, Unthreaded>::new_unthreaded();
    list.append(1);
    list.append(2);
    list.append(3);

    let mut out = Vec::new();
    let mut cur = list.first();
    while let Some(it) = cur {
        out.push(*it.payload());
        cur = it.next();
    }
    assert_eq!(out, vec![1, 2, 3]);
}
