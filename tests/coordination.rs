// SPDX-License-Identifier: Apache-2.0

//! Fan-out/fan-in coordination built from the primitives in this crate: a
//! parent releases several children simultaneously, then waits for all of
//! them to report completion.  The coordination logic itself is application
//! level; this exercises the layer as a building block.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use rand::Rng;
use rand_pcg::Pcg32;

use portable_thread::sync::{Notification, Semaphore};
use portable_thread::thread::{sleep_for, Options, Thread};
use portable_thread::time::Duration;

#[test]
fn children_released_together_all_complete() {
    const CHILDREN: usize = 2;

    let start = Arc::new(Semaphore::new(0, CHILDREN as u32));
    let complete = Arc::new(Mutex::new([false; CHILDREN]));
    let progress = Arc::new(Notification::new());

    let handles: Vec<Thread> = (0..CHILDREN)
        .map(|index| {
            let start = start.clone();
            let complete = complete.clone();
            let progress = progress.clone();
            Thread::spawn(&Options::new().name("child"), move || {
                start.take(portable_thread::time::Forever).unwrap();
                complete.lock().unwrap()[index] = true;
                progress.release();
            })
        })
        .collect();

    // Release everyone at once.
    for _ in 0..CHILDREN {
        start.give();
    }

    // Wait until every child has reported in.  A release can coalesce with
    // another, so re-check the flags on every wakeup.
    loop {
        if complete.lock().unwrap().iter().all(|&done| done) {
            break;
        }
        progress.acquire();
    }

    for handle in handles {
        handle.join();
    }
    assert!(complete.lock().unwrap().iter().all(|&done| done));
}

#[test]
fn lifecycle_stress_with_random_sleeps() {
    // Deterministic randomness, same seeding as the rest of the tests in
    // this repo's lineage.
    let mut rng = Pcg32::new(1, 1);
    let counter = Arc::new(AtomicUsize::new(0));

    for _round in 0..4 {
        let handles: Vec<Thread> = (0..8)
            .map(|_| {
                let millis: u64 = rng.gen_range(1..20);
                let counter = counter.clone();
                Thread::spawn(&Options::new().name("stress"), move || {
                    sleep_for(Duration::millis(millis));
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join();
        }
    }

    assert_eq!(counter.load(Ordering::SeqCst), 4 * 8);
    // Every handle reached a terminal disposition; nothing should still be
    // running.
    std::thread::sleep(StdDuration::from_millis(10));
    assert_eq!(counter.load(Ordering::SeqCst), 4 * 8);
}
