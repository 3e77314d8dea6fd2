use {
    crate::{AcquireError, Acquirable, Acquisition},
    std::{
        sync::Barrier,
        thread,
        time::{Duration, Instant},
    },
};

#[test]
fn wait_and_notify() {
    let acquirable = Acquirable::new(0);
    let condition = acquirable.new_condition();
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        s.spawn(|| {
            barrier.wait();
            let write = acquirable.acquire_write().unwrap();
            write.set(1).unwrap();
            condition.notify_one().unwrap();
        });
        let write = acquirable.acquire_write().unwrap();
        barrier.wait();
        while write.get().unwrap() == 0 {
            condition.wait().unwrap();
        }
        assert_eq!(write.get(), Ok(1));
    });
}

#[test]
fn notify_all_wakes_every_waiter() {
    let acquirable = Acquirable::new(false);
    let condition = acquirable.new_condition();
    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| {
                let write = acquirable.acquire_write().unwrap();
                while !write.get().unwrap() {
                    condition.wait().unwrap();
                }
            });
        }
        thread::sleep(Duration::from_millis(50));
        let write = acquirable.acquire_write().unwrap();
        write.set(true).unwrap();
        condition.notify_all().unwrap();
    });
}

#[test]
fn wait_for_times_out() {
    let duration = Duration::from_millis(100);
    let acquirable = Acquirable::new(());
    let condition = acquirable.new_condition();
    let write = acquirable.acquire_write().unwrap();
    let start = Instant::now();
    assert_eq!(condition.wait_for(duration), Ok(true));
    assert!(start.elapsed() >= duration);
    // The write lock is re-held after the timeout.
    assert_eq!(write.get(), Ok(()));
    drop(write);
    assert!(!acquirable.is_locked());
}

#[test]
fn wait_until_times_out() {
    let duration = Duration::from_millis(100);
    let acquirable = Acquirable::new(());
    let condition = acquirable.new_condition();
    let _write = acquirable.acquire_write().unwrap();
    let start = Instant::now();
    assert_eq!(condition.wait_until(start + duration), Ok(true));
    assert!(start.elapsed() >= duration);
}

#[test]
fn requires_write_lock() {
    let acquirable = Acquirable::new(0);
    let condition = acquirable.new_condition();
    assert_eq!(condition.wait(), Err(AcquireError::WrongThread));
    assert_eq!(condition.notify_one(), Err(AcquireError::WrongThread));
    assert_eq!(condition.notify_all(), Err(AcquireError::WrongThread));
    let read = acquirable.acquire_read();
    assert_eq!(condition.wait(), Err(AcquireError::WrongThread));
    assert_eq!(condition.notify_one(), Err(AcquireError::WrongThread));
    read.close().unwrap();
    // Holding the write lock on another thread does not help the caller.
    let write = acquirable.acquire_write().unwrap();
    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(condition.notify_one(), Err(AcquireError::WrongThread));
        });
    });
    drop(write);
}

#[test]
fn upgraded_acquisition_can_wait() {
    let acquirable = Acquirable::new(0);
    let condition = acquirable.new_condition();
    let _read = acquirable.acquire_read();
    let write = acquirable.acquire_write().unwrap();
    assert_eq!(condition.wait_for(Duration::from_millis(20)), Ok(true));
    write.set(1).unwrap();
    assert_eq!(write.get(), Ok(1));
}
