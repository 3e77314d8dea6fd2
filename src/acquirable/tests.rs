use {
    crate::{value::I32Acquirable, AcquireError, Acquirable, Acquisition, AcquisitionType},
    std::{
        sync::Barrier,
        thread,
        time::{Duration, Instant},
    },
};

fn run_in_thread<T: Send>(f: impl FnOnce() -> T + Send) -> T {
    thread::scope(|s| s.spawn(|| f()).join().unwrap())
}

#[test]
fn default() {
    let acquirable = I32Acquirable::default();
    assert!(!acquirable.is_locked());
    assert_eq!(acquirable.shared.registry.lock().len(), 0);
    assert_eq!(acquirable.acquire_read().get(), Ok(0));
}

#[test]
fn registry_holds_one_entry_per_thread() {
    let acquirable = Acquirable::new(0);
    let _a1 = acquirable.acquire_read();
    let _a2 = acquirable.acquire_read();
    assert_eq!(acquirable.shared.registry.lock().len(), 1);
    run_in_thread(|| {
        let _b = acquirable.acquire_read();
        assert_eq!(acquirable.shared.registry.lock().len(), 2);
    });
    assert_eq!(acquirable.shared.registry.lock().len(), 1);
}

#[test]
fn registry_entry_removed_on_close() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    assert_eq!(acquirable.shared.registry.lock().len(), 1);
    read.close().unwrap();
    assert_eq!(acquirable.shared.registry.lock().len(), 0);
}

#[test]
fn concurrent_readers() {
    let acquirable = Acquirable::new(1);
    let read = acquirable.acquire_read();
    run_in_thread(|| {
        let other = acquirable.try_acquire_read().unwrap();
        assert_eq!(other.get(), Ok(1));
    });
    assert_eq!(read.get(), Ok(1));
}

#[test]
fn writer_excluded_until_reader_closes() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    run_in_thread(|| {
        assert!(acquirable.try_acquire_write().is_none());
    });
    read.close().unwrap();
    run_in_thread(|| {
        assert!(acquirable.try_acquire_write().is_some());
    });
}

#[test]
fn reader_excluded_by_writer() {
    let acquirable = Acquirable::new(0);
    let write = acquirable.acquire_write().unwrap();
    run_in_thread(|| {
        assert!(acquirable.try_acquire_read().is_none());
    });
    drop(write);
    run_in_thread(|| {
        assert!(acquirable.try_acquire_read().is_some());
    });
}

#[test]
fn writer_blocks_until_reader_closes() {
    let acquirable = Acquirable::new(0);
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        let handle = s.spawn(|| {
            barrier.wait();
            let write = acquirable.acquire_write().unwrap();
            write.set(1).unwrap();
        });
        let read = acquirable.acquire_read();
        barrier.wait();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(read.get(), Ok(0));
        read.close().unwrap();
        handle.join().unwrap();
    });
    assert_eq!(acquirable.acquire_read().get(), Ok(1));
}

#[test]
fn upgrade_refused_with_concurrent_reader() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        s.spawn(|| {
            let _other = acquirable.acquire_read();
            barrier.wait();
            barrier.wait();
        });
        barrier.wait();
        assert_eq!(
            acquirable.acquire_write().err(),
            Some(AcquireError::UpgradeRefused),
        );
        assert!(acquirable.try_acquire_write().is_none());
        // The refused upgrade left the read acquisition untouched.
        assert_eq!(read.acquisition_type(), AcquisitionType::Read);
        assert_eq!(read.get(), Ok(0));
        barrier.wait();
    });
    // As the sole reader the upgrade now succeeds.
    let write = acquirable.acquire_write().unwrap();
    assert_eq!(write.acquisition_type(), AcquisitionType::Write);
}

#[test]
fn timed_acquire() {
    let duration = Duration::from_millis(100);
    let acquirable = Acquirable::new(0);
    let write = acquirable.acquire_write().unwrap();
    run_in_thread(|| {
        let start = Instant::now();
        assert!(acquirable.try_acquire_read_for(duration).is_none());
        assert!(start.elapsed() >= duration);
        let start = Instant::now();
        assert!(acquirable.try_acquire_write_until(start + duration).is_none());
        assert!(start.elapsed() >= duration);
    });
    drop(write);
    run_in_thread(|| {
        assert!(acquirable.try_acquire_read_for(duration).is_some());
        assert!(acquirable.try_acquire_write_for(duration).is_some());
    });
}

#[test]
fn timed_reuse_is_available() {
    let acquirable = Acquirable::new(0);
    let _read = acquirable.acquire_read();
    assert!(acquirable.try_acquire_read().is_some());
    assert!(acquirable
        .try_acquire_read_for(Duration::from_millis(100))
        .is_some());
}

#[test]
fn current_acquisition_type() {
    let acquirable = Acquirable::new(0);
    assert_eq!(acquirable.current_acquisition_type(), None);
    let read = acquirable.acquire_read();
    assert_eq!(
        acquirable.current_acquisition_type(),
        Some(AcquisitionType::Read),
    );
    run_in_thread(|| {
        assert_eq!(acquirable.current_acquisition_type(), None);
    });
    let up = acquirable.acquire_write().unwrap();
    assert_eq!(
        acquirable.current_acquisition_type(),
        Some(AcquisitionType::Write),
    );
    up.close().unwrap();
    assert_eq!(
        acquirable.current_acquisition_type(),
        Some(AcquisitionType::Read),
    );
    read.close().unwrap();
    assert_eq!(acquirable.current_acquisition_type(), None);
}

#[test]
fn contended_writers() {
    let acquirable = Acquirable::new(0);
    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let write = acquirable.acquire_write().unwrap();
                let value = write.get().unwrap();
                thread::yield_now();
                write.set(value + 1).unwrap();
            });
        }
    });
    assert_eq!(acquirable.acquire_read().get(), Ok(8));
}

#[test]
fn eq() {
    let acquirable1 = Acquirable::new(0);
    let acquirable2 = Acquirable::new(0);
    assert_eq!(acquirable1, acquirable1.clone());
    assert_ne!(acquirable1, acquirable2);
}

#[test]
fn clone_shares_state() {
    let acquirable = Acquirable::new(0);
    let clone = acquirable.clone();
    acquirable.acquire_write().unwrap().set(1).unwrap();
    assert_eq!(clone.acquire_read().get(), Ok(1));
}

#[test]
fn into_inner() {
    let acquirable = Acquirable::new(5);
    let clone = acquirable.clone();
    let acquirable = acquirable.into_inner().unwrap_err();
    drop(clone);
    assert_eq!(acquirable.into_inner().ok(), Some(5));
}

#[test]
fn get_mut() {
    let mut acquirable = Acquirable::new(5);
    *acquirable.get_mut().unwrap() = 6;
    assert_eq!(acquirable.acquire_read().get(), Ok(6));
    let _clone = acquirable.clone();
    assert!(acquirable.get_mut().is_none());
}

#[test]
fn debug() {
    let acquirable = Acquirable::new("hello world");
    assert!(format!("{acquirable:?}").contains("hello world"));
    let read = acquirable.acquire_read();
    assert!(format!("{acquirable:?}").contains("hello world"));
    read.close().unwrap();
    let write = acquirable.acquire_write().unwrap();
    let formatted = run_in_thread(|| format!("{acquirable:?}"));
    assert!(!formatted.contains("hello world"));
    assert!(formatted.contains("<locked>"));
    drop(write);
}
