//! Concurrent edge delivery against the scheduler's drain and reset.
//!
//! Host threads stand in for the interrupt context; `critical-section`'s
//! `std` implementation provides the exclusion the ESP32 gets from
//! masking interrupts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;

use flowmeter::sensors::PulseCounter;

const PRODUCERS: usize = 4;
const EDGES_PER_PRODUCER: u64 = 20_000;

#[test]
fn concurrent_edges_and_drains_never_lose_or_duplicate_pulses() {
    let counter = Arc::new(PulseCounter::new(0));
    let clock = Arc::new(AtomicU64::new(1));
    let accepted = Arc::new(AtomicU32::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let clock = Arc::clone(&clock);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for _ in 0..EDGES_PER_PRODUCER {
                    let now = clock.fetch_add(1, Ordering::Relaxed);
                    if counter.on_edge(now) {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    let drainer = {
        let counter = Arc::clone(&counter);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut drained: u64 = 0;
            while !done.load(Ordering::Acquire) {
                drained += u64::from(counter.drain());
                thread::yield_now();
            }
            drained
        })
    };

    for p in producers {
        p.join().unwrap();
    }
    done.store(true, Ordering::Release);
    let drained = drainer.join().unwrap() + u64::from(counter.drain());

    let accepted = u64::from(accepted.load(Ordering::Relaxed));
    assert!(accepted > 0);
    assert_eq!(drained, accepted);
    assert_eq!(u64::from(counter.total()), accepted);
}

#[test]
fn tally_snapshot_is_never_torn() {
    let counter = Arc::new(PulseCounter::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let counter = Arc::clone(&counter);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut now = 1;
            while !done.load(Ordering::Acquire) {
                counter.on_edge(now);
                now += 1;
            }
        })
    };

    // Without drains, pending and total move together edge by edge.
    for _ in 0..50_000 {
        let t = counter.tally();
        assert_eq!(t.pending, t.total);
    }
    done.store(true, Ordering::Release);
    producer.join().unwrap();
}

#[test]
fn reset_under_load_leaves_a_consistent_tally() {
    let counter = Arc::new(PulseCounter::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let counter = Arc::clone(&counter);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut now = 1;
            while !done.load(Ordering::Acquire) {
                counter.on_edge(now);
                now += 1;
            }
        })
    };

    for _ in 0..1_000 {
        counter.reset();
        let t = counter.tally();
        assert!(t.pending <= t.total);
    }
    done.store(true, Ordering::Release);
    producer.join().unwrap();
}
