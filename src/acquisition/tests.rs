use {
    crate::{AcquireError, Acquirable, Acquisition, AcquisitionType},
    std::thread,
};

fn run_in_thread<T: Send>(f: impl FnOnce() -> T + Send) -> T {
    thread::scope(|s| s.spawn(|| f()).join().unwrap())
}

#[test]
fn round_trip() {
    let acquirable = Acquirable::new(0);
    let write = acquirable.acquire_write().unwrap();
    write.set(5).unwrap();
    write.close().unwrap();
    let read = acquirable.acquire_read();
    assert_eq!(read.get(), Ok(5));
    read.close().unwrap();
    assert!(!acquirable.is_locked());
}

#[test]
fn acquisition_types() {
    let acquirable = Acquirable::new(0);
    {
        let read = acquirable.acquire_read();
        assert_eq!(read.acquisition_type(), AcquisitionType::Read);
    }
    {
        let write = acquirable.acquire_write().unwrap();
        assert_eq!(write.acquisition_type(), AcquisitionType::Write);
    }
}

#[test]
fn close_is_idempotent() {
    let acquirable = Acquirable::new(1);
    let read = acquirable.acquire_read();
    assert_eq!(read.is_unlocked(), Ok(false));
    read.close().unwrap();
    read.close().unwrap();
    assert_eq!(read.is_unlocked(), Ok(true));
    assert_eq!(read.get(), Err(AcquireError::AlreadyUnlocked));
    assert_eq!(
        read.ensure_permitted_and_locked(),
        Err(AcquireError::AlreadyUnlocked),
    );
    assert!(!acquirable.is_locked());
}

#[test]
fn reentrant_read() {
    let acquirable = Acquirable::new(Some("x"));
    let a1 = acquirable.acquire_read();
    let a2 = acquirable.acquire_read();
    assert_eq!(a1.get(), Ok(Some("x")));
    assert_eq!(a2.get(), Ok(Some("x")));
    assert_eq!(a2.is_unlocked(), Ok(true));
    a2.close().unwrap();
    assert_eq!(a1.get(), Ok(Some("x")));
    a1.close().unwrap();
    assert!(!acquirable.is_locked());
    assert_eq!(a2.get(), Err(AcquireError::AlreadyUnlocked));
}

#[test]
fn upgrade() {
    let acquirable = Acquirable::new(0);
    let a1 = acquirable.acquire_read();
    assert_eq!(a1.get(), Ok(0));
    let a2 = acquirable.acquire_write().unwrap();
    a2.set(42).unwrap();
    assert_eq!(a1.get(), Ok(42));
    assert_eq!(a1.acquisition_type(), AcquisitionType::Write);
    assert_eq!(a2.acquisition_type(), AcquisitionType::Write);
    // Readers on other threads are excluded while the upgrade is live.
    run_in_thread(|| {
        assert!(acquirable.try_acquire_read().is_none());
    });
    a2.close().unwrap();
    assert_eq!(a1.acquisition_type(), AcquisitionType::Read);
    run_in_thread(|| {
        assert!(acquirable.try_acquire_read().is_some());
    });
    a1.close().unwrap();
    assert_eq!(run_in_thread(|| acquirable.acquire_read().get()), Ok(42));
}

#[test]
fn nested_upgrades() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    let up1 = acquirable.acquire_write().unwrap();
    let up2 = acquirable.acquire_write().unwrap();
    assert_eq!(read.acquisition_type(), AcquisitionType::Write);
    up2.close().unwrap();
    // The outer upgrade still holds the write stamp.
    assert_eq!(read.acquisition_type(), AcquisitionType::Write);
    assert_eq!(up2.is_unlocked(), Ok(true));
    assert_eq!(
        up2.ensure_permitted_and_locked(),
        Err(AcquireError::AlreadyUnlocked),
    );
    up1.set(1).unwrap();
    up1.close().unwrap();
    assert_eq!(read.acquisition_type(), AcquisitionType::Read);
    assert_eq!(read.get(), Ok(1));
}

#[test]
fn out_of_order_upgrade_close() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    let up1 = acquirable.acquire_write().unwrap();
    let up2 = acquirable.acquire_write().unwrap();
    up1.close().unwrap();
    // The remaining upgrade keeps the write stamp.
    assert_eq!(read.acquisition_type(), AcquisitionType::Write);
    up2.set(1).unwrap();
    up2.close().unwrap();
    assert_eq!(read.acquisition_type(), AcquisitionType::Read);
    assert_eq!(read.get(), Ok(1));
}

#[test]
fn upgrade_close_is_idempotent() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    let up = acquirable.acquire_write().unwrap();
    assert_eq!(up.is_unlocked(), Ok(false));
    up.close().unwrap();
    up.close().unwrap();
    assert_eq!(up.is_unlocked(), Ok(true));
    assert_eq!(up.set(1), Err(AcquireError::AlreadyUnlocked));
    assert_eq!(read.acquisition_type(), AcquisitionType::Read);
}

#[test]
fn reused_write() {
    let acquirable = Acquirable::new(0);
    let outer = acquirable.acquire_write().unwrap();
    let inner = acquirable.acquire_write().unwrap();
    assert_eq!(inner.acquisition_type(), AcquisitionType::Write);
    inner.set(1).unwrap();
    inner.close().unwrap();
    // The reused close is a no-op; the outer acquisition keeps the lock.
    inner.set(2).unwrap();
    outer.close().unwrap();
    assert_eq!(inner.set(3), Err(AcquireError::AlreadyUnlocked));
    assert_eq!(acquirable.acquire_read().get(), Ok(2));
}

#[test]
fn read_reuses_write() {
    let acquirable = Acquirable::new(0);
    let write = acquirable.acquire_write().unwrap();
    let read = acquirable.acquire_read();
    assert_eq!(read.acquisition_type(), AcquisitionType::Write);
    write.set(1).unwrap();
    assert_eq!(read.get(), Ok(1));
}

#[test]
fn wrong_thread() {
    let acquirable = Acquirable::new(0);
    let write = acquirable.acquire_write().unwrap();
    let write = thread::scope(|s| {
        s.spawn(move || {
            assert_eq!(write.get(), Err(AcquireError::WrongThread));
            assert_eq!(write.set(1), Err(AcquireError::WrongThread));
            assert_eq!(write.is_unlocked(), Err(AcquireError::WrongThread));
            assert_eq!(
                write.ensure_permitted_and_locked(),
                Err(AcquireError::WrongThread),
            );
            assert_eq!(write.close(), Err(AcquireError::WrongThread));
            write
        })
        .join()
        .unwrap()
    });
    // The owner thread can still use and close the acquisition.
    assert_eq!(write.get(), Ok(0));
    write.close().unwrap();
    assert!(!acquirable.is_locked());
}

#[test]
#[should_panic(expected = "upgraded acquisition")]
fn close_with_live_upgrade() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    let _write = acquirable.acquire_write().unwrap();
    let _ = read.close();
}

#[test]
fn drop_closes() {
    let acquirable = Acquirable::new(0);
    {
        let _read = acquirable.acquire_read();
        assert!(acquirable.is_locked());
    }
    assert!(!acquirable.is_locked());
    {
        let _write = acquirable.acquire_write().unwrap();
        assert!(acquirable.is_locked());
    }
    assert!(!acquirable.is_locked());
}

#[test]
fn drop_unwinds_upgrade() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    {
        let write = acquirable.acquire_write().unwrap();
        write.set(1).unwrap();
    }
    assert_eq!(read.acquisition_type(), AcquisitionType::Read);
    assert_eq!(read.get(), Ok(1));
}

#[test]
fn debug() {
    let acquirable = Acquirable::new(0);
    let read = acquirable.acquire_read();
    assert!(format!("{read:?}").contains("Read"));
    let write = acquirable.acquire_write().unwrap();
    assert!(format!("{write:?}").contains("Write"));
}
