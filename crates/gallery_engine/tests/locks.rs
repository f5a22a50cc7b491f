mod common;

use std::sync::Arc;
use std::time::Duration;

use gallery_engine::NamedLocks;

use common::init_logging;

#[tokio::test]
async fn lock_is_released_when_section_panics() {
    init_logging();
    let locks = Arc::new(NamedLocks::new());

    let panicking = Arc::clone(&locks);
    let result = tokio::spawn(async move {
        panicking
            .with_lock("images", || async { panic!("section failed") })
            .await
    })
    .await;
    assert!(result.unwrap_err().is_panic());

    let value = tokio::time::timeout(
        Duration::from_secs(1),
        locks.with_lock("images", || async { 42 }),
    )
    .await
    .expect("lock was released");
    assert_eq!(value, 42);
}

#[tokio::test]
async fn waiters_are_served_in_arrival_order() {
    init_logging();
    let locks = Arc::new(NamedLocks::new());
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let held = locks.acquire("settings").await;
    let mut waiters = Vec::new();
    for id in 0..3 {
        let locks = Arc::clone(&locks);
        let order = Arc::clone(&order);
        waiters.push(tokio::spawn(async move {
            locks
                .with_lock("settings", || async move {
                    order.lock().unwrap().push(id);
                })
                .await
        }));
        // Let the waiter enqueue before spawning the next one.
        tokio::task::yield_now().await;
    }
    drop(held);
    for waiter in waiters {
        waiter.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}
