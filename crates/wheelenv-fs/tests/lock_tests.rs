//! Directory lock behavior under contention

use assert_fs::prelude::*;
use predicates::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use wheelenv_fs::{DirLock, Error, NormalizedPath};

const LOCK: &str = ".wheelenv.lock";

fn marker(temp: &assert_fs::TempDir) -> String {
    std::fs::read_to_string(temp.child(LOCK).path()).unwrap()
}

#[test]
fn test_acquire_creates_dir_and_lock_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path().join("env"));

    let lock = DirLock::try_acquire(&dir, LOCK).unwrap();

    temp.child("env").assert(predicate::path::is_dir());
    temp.child("env").child(LOCK).assert(predicate::path::is_file());
    assert!(lock.path().as_str().ends_with(LOCK));
}

#[test]
fn test_second_acquire_reports_held() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());

    let _first = DirLock::try_acquire(&dir, LOCK).unwrap();
    let second = DirLock::try_acquire(&dir, LOCK);

    assert!(matches!(second, Err(Error::LockHeld { .. })));
}

#[test]
fn test_lock_released_on_drop() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());

    {
        let _lock = DirLock::try_acquire(&dir, LOCK).unwrap();
        assert!(DirLock::is_held(&dir, LOCK));
    }

    assert!(!DirLock::is_held(&dir, LOCK));
    DirLock::try_acquire(&dir, LOCK).unwrap();
}

#[test]
fn test_is_held_without_lock_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path().join("never-created"));

    assert!(!DirLock::is_held(&dir, LOCK));
    temp.child("never-created").assert(predicate::path::missing());
}

#[test]
fn test_concurrent_acquire_single_winner() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = Arc::new(NormalizedPath::new(temp.path()));
    let num_threads = 8;
    let start = Arc::new(Barrier::new(num_threads));
    let hold = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let dir = Arc::clone(&dir);
            let start = Arc::clone(&start);
            let hold = Arc::clone(&hold);
            thread::spawn(move || {
                start.wait();
                let result = DirLock::try_acquire(&dir, LOCK);
                // Keep any winner's guard alive until every thread has tried
                hold.wait();
                result.is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

// Windows refuses reads of a locked range
#[cfg(unix)]
#[test]
fn test_holder_marker_written_and_cleared() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());

    {
        let _lock = DirLock::try_acquire(&dir, LOCK).unwrap();
        assert_eq!(marker(&temp), std::process::id().to_string());
    }

    assert_eq!(marker(&temp), "");
    assert!(!DirLock::is_held(&dir, LOCK));
}

#[test]
fn test_idle_lock_file_is_not_held() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());
    temp.child(LOCK).touch().unwrap();

    assert!(!DirLock::is_held(&dir, LOCK));
    // Observing an idle lock never gets in the way of a run starting
    let _lock = DirLock::try_acquire(&dir, LOCK).unwrap();
    assert!(DirLock::is_held(&dir, LOCK));
}

#[cfg(unix)]
#[test]
fn test_stale_marker_from_crashed_holder_is_not_held() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());
    temp.child(LOCK).write_str("4242").unwrap();

    assert!(!DirLock::is_held(&dir, LOCK));
    let _lock = DirLock::try_acquire(&dir, LOCK).unwrap();
    assert_eq!(marker(&temp), std::process::id().to_string());
}
