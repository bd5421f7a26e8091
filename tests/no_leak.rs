use simc_sync::list::CList;
use simc_sync::queue::SpQueue;
use std::sync::Arc;

#[test]
fn list_drop_releases_every_remaining_payload() {
    let vals: Vec<_> = (0..5).map(Arc::new).collect();

    {
        let list = CList::<Arc<i32>>::new();
        for v in &vals {
            list.append(v.clone());
        }
        assert!(vals.iter().all(|v| Arc::strong_count(v) == 2));

        // Removing one mid-list should drop exactly that payload's extra ref.
        let mut it = list.first().unwrap();
        loop {
            if **it.payload() == 2 {
                it.remove();
                break;
            }
            it = it.next().unwrap();
        }
        assert_eq!(Arc::strong_count(&vals[2]), 1);
        assert!(vals
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .all(|(_, v)| Arc::strong_count(v) == 2));
    }

    assert!(vals.iter().all(|v| Arc::strong_count(v) == 1));
}

#[test]
fn queue_drop_releases_committed_but_unread_payloads() {
    let vals: Vec<_> = (0..3).map(Arc::new).collect();

    {
        let (mut tx, rx) = SpQueue::channel::<Arc<i32>>(4).unwrap();
        for v in &vals {
            let mut slot = tx.begin_write();
            slot.put(v.clone());
            assert!(slot.commit());
        }
        assert!(vals.iter().all(|v| Arc::strong_count(v) == 2));
        drop(tx);
        drop(rx);
    }

    assert!(vals.iter().all(|v| Arc::strong_count(v) == 1));
}

#[test]
fn queue_drop_does_not_double_free_after_full_drain() {
    let vals: Vec<_> = (0..3).map(Arc::new).collect();

    let (mut tx, mut rx) = SpQueue::channel::<Arc<i32>>(4).unwrap();
    for v in &vals {
        let mut slot = tx.begin_write();
        slot.put(v.clone());
        assert!(slot.commit());
    }
    for _ in 0..3 {
        let slot = rx.begin_read().unwrap();
        drop(slot.commit());
    }
    assert!(vals.iter().all(|v| Arc::strong_count(v) == 1));

    drop(tx);
    drop(rx);
    assert!(vals.iter().all(|v| Arc::strong_count(v) == 1));
}
