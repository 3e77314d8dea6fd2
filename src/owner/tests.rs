use {crate::owner::owner_id, std::thread};

#[test]
fn owner() {
    assert_ne!(owner_id(), 0);
    assert_eq!(owner_id(), owner_id());
    let other = thread::spawn(|| owner_id()).join().unwrap();
    assert_ne!(owner_id(), other);
}
