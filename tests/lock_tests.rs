use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use winecap::lock::LockGuard;

mod helpers;
use helpers::unique_test_temp_dir;

#[test]
fn exclusive_lock_blocks_a_second_acquisition_until_released() {
    let dir = unique_test_temp_dir("lock-exclusion");
    let path = dir.join("shared.lock");

    let guard = LockGuard::acquire(&path).expect("first acquire");

    let (tx, rx) = mpsc::channel();
    let contended = path.clone();
    let waiter = thread::spawn(move || {
        let _guard = LockGuard::acquire(&contended).expect("second acquire");
        let _ = tx.send(());
    });

    // The waiter must stay blocked while the lock is held.
    assert!(
        rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "a held lock must exclude a second holder"
    );

    drop(guard);
    rx.recv_timeout(Duration::from_secs(5))
        .expect("a released lock must become acquirable");
    waiter.join().expect("waiter thread");
}

#[test]
fn lock_file_parent_directories_are_created_on_demand() {
    let dir = unique_test_temp_dir("lock-parents");
    let path = dir.join("nested").join("deeper").join("x.lock");

    let _guard = LockGuard::acquire(&path).expect("acquire");

    assert!(path.is_file());
}
