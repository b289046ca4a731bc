//! Tests for forks, the admission gate and the cancellation token under contention

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dining_table::core::{AdmissionGate, CancelToken, Cancelled, Fork, Table};

#[test]
fn test_fork_serializes_holders() {
    let cancel = CancelToken::new();
    let fork = Fork::new(0, &cancel);
    let inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|p| {
            let fork = Arc::clone(&fork);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..200 {
                    let guard = fork.acquire(p).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    assert_eq!(fork.holder(), Some(p));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    guard.release();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fork.acquisitions(), 800);
    assert!(!fork.is_held());
}

#[test]
fn test_gate_never_exceeds_capacity() {
    let cancel = CancelToken::new();
    let gate = AdmissionGate::new(2, &cancel).unwrap();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..6)
        .map(|p| {
            let gate = Arc::clone(&gate);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                for _ in 0..50 {
                    let permit = gate.enter(p).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    permit.leave();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(gate.peak_issued() <= 2);
    assert_eq!(gate.issued(), 0);
    assert_eq!(gate.admissions(), 300);
}

#[test]
fn test_zero_capacity_gate_is_rejected() {
    let cancel = CancelToken::new();
    assert!(AdmissionGate::new(0, &cancel).is_err());
}

#[test]
fn test_cancel_wakes_every_kind_of_waiter() {
    let cancel = CancelToken::new();
    let table = Table::new(3, &cancel).unwrap();

    // Fill the gate and hold fork 0 so the waiters below block.
    let _permits: Vec<_> = (0..2).map(|p| table.gate().enter(p).unwrap()).collect();
    let _fork = table.seat(0).left.acquire(0).unwrap();

    let gate = Arc::clone(table.gate());
    let at_gate = thread::spawn(move || gate.enter(2).map(|_| ()));
    let fork = Arc::clone(&table.seat(0).left);
    let at_fork = thread::spawn(move || fork.acquire(1).map(|_| ()));
    let sleeper_token = cancel.clone();
    let sleeping = thread::spawn(move || sleeper_token.sleep(Duration::from_secs(30)));

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    assert!(cancel.cancel());

    assert_eq!(at_gate.join().unwrap(), Err(Cancelled));
    assert_eq!(at_fork.join().unwrap(), Err(Cancelled));
    assert_eq!(sleeping.join().unwrap(), Err(Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));

    // Failed waits take nothing.
    assert_eq!(table.gate().issued(), 2);
    assert_eq!(table.fork(0).unwrap().holder(), Some(0));
}

#[test]
fn test_token_clones_share_state() {
    let token = CancelToken::new();
    let clone = token.clone();
    let waiter = thread::spawn(move || clone.wait());
    thread::sleep(Duration::from_millis(10));
    token.cancel();
    waiter.join().unwrap();
    assert!(token.is_cancelled());
}
