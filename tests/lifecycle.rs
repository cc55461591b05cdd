// SPDX-License-Identifier: Apache-2.0

//! Thread lifecycle tests: exactly-once disposition, context reclamation and
//! reuse, and the fatal preconditions.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration as StdDuration, Instant as StdInstant};

use portable_thread::sync::Notification;
use portable_thread::thread::{spawn_detached, Context, Id, Options, Thread, ThreadCore};

/// Spin until `predicate` holds, failing the test after a generous deadline.
fn wait_until(predicate: impl Fn() -> bool) {
    let deadline = StdInstant::now() + StdDuration::from_secs(5);
    while !predicate() {
        assert!(StdInstant::now() < deadline, "condition never became true");
        std::thread::sleep(StdDuration::from_millis(1));
    }
}

#[test]
fn join_observes_entry_effects() {
    let counter = Arc::new(AtomicUsize::new(0));
    let thread = {
        let counter = counter.clone();
        Thread::spawn(&Options::new().name("join-effects"), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert!(thread.joinable());
    thread.join();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn join_after_completion_is_immediate_and_context_reusable() {
    static CTX: Context = Context::new();
    let options = Options::new().name("reuse").context(&CTX);

    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let thread = {
            let ran = ran.clone();
            Thread::spawn(&options, move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
        };
        // Let the entry function finish first, so this join takes the
        // already-done path.
        wait_until(|| ran.load(Ordering::SeqCst) > 0);
        let before = StdInstant::now();
        thread.join();
        assert!(before.elapsed() < StdDuration::from_secs(1));
        assert!(!CTX.is_in_use());
        ran.store(0, Ordering::SeqCst);
    }
}

#[test]
fn detach_reclaims_context_only_after_entry_returns() {
    static CTX: Context = Context::new();
    let gate = Arc::new(Notification::new());

    let thread = {
        let gate = gate.clone();
        Thread::spawn(&Options::new().name("detach").context(&CTX), move || {
            gate.acquire();
        })
    };
    thread.detach();

    // The entry function is still blocked on the gate, so the context must
    // not have been reclaimed yet.
    std::thread::sleep(StdDuration::from_millis(50));
    assert!(CTX.is_in_use());

    gate.release();
    wait_until(|| !CTX.is_in_use());

    // And the slot is genuinely reusable.
    let again = Arc::new(AtomicUsize::new(0));
    let thread = {
        let again = again.clone();
        Thread::spawn(&Options::new().name("detach-again").context(&CTX), move || {
            again.fetch_add(1, Ordering::SeqCst);
        })
    };
    thread.join();
    assert_eq!(again.load(Ordering::SeqCst), 1);
}

#[test]
fn detach_of_finished_thread_reclaims_synchronously() {
    static CTX: Context = Context::new();
    let ran = Arc::new(AtomicUsize::new(0));
    let thread = {
        let ran = ran.clone();
        Thread::spawn(&Options::new().name("late-detach").context(&CTX), move || {
            ran.fetch_add(1, Ordering::SeqCst);
        })
    };
    wait_until(|| ran.load(Ordering::SeqCst) > 0);
    thread.detach();
    // Reclamation happened in the detach call itself, not in the (long gone)
    // thread.
    wait_until(|| !CTX.is_in_use());
}

#[test]
fn self_join_is_rejected() {
    let (handle_tx, handle_rx) = mpsc::channel::<Thread>();
    let (result_tx, result_rx) = mpsc::channel::<bool>();

    let thread = Thread::spawn(&Options::new().name("self-join"), move || {
        let verdict = catch_unwind(AssertUnwindSafe(|| {
            let me = handle_rx.recv().unwrap();
            // Deadlock if the precondition check were missing.
            me.join();
        }));
        result_tx.send(verdict.is_err()).unwrap();
    });
    handle_tx.send(thread).unwrap();

    let panicked = result_rx
        .recv_timeout(StdDuration::from_secs(5))
        .expect("self-join neither panicked nor returned");
    assert!(panicked, "self-join must be rejected, not allowed");
}

#[test]
#[should_panic(expected = "still joinable")]
fn dropping_a_joinable_thread_panics() {
    let thread = Thread::spawn(&Options::new().name("leaked"), || {});
    drop(thread);
}

#[test]
fn reusing_a_live_context_panics() {
    static CTX: Context = Context::new();
    let gate = Arc::new(Notification::new());
    let options = Options::new().name("occupied").context(&CTX);

    let first = {
        let gate = gate.clone();
        Thread::spawn(&options, move || gate.acquire())
    };

    let second = catch_unwind(AssertUnwindSafe(|| Thread::spawn(&options, || {})));
    assert!(second.is_err(), "claiming a live context must be fatal");

    gate.release();
    first.join();
}

#[test]
fn default_thread_represents_nothing() {
    let thread = Thread::default();
    assert!(!thread.joinable());
    assert_eq!(thread.get_id(), Id::default());
    // Dropping it is fine; it never represented a thread.
}

#[test]
fn detached_spawn_runs() {
    let ran = Arc::new(AtomicUsize::new(0));
    {
        let ran = ran.clone();
        spawn_detached(&Options::new().name("fire-and-forget"), move || {
            ran.fetch_add(1, Ordering::SeqCst);
        });
    }
    wait_until(|| ran.load(Ordering::SeqCst) == 1);
}

#[test]
fn panicking_entry_still_joins() {
    let thread = Thread::spawn(&Options::new().name("panicky"), || {
        panic!("entry function panicked");
    });
    // Must complete rather than deadlock.
    thread.join();
}

struct CounterCore(AtomicUsize);

impl ThreadCore for CounterCore {
    fn run(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn thread_core_runs_once_and_context_is_reusable() {
    static CORE: CounterCore = CounterCore(AtomicUsize::new(0));
    static CTX: Context = Context::new();
    let options = Options::new().name("core").context(&CTX);

    let thread = Thread::spawn_core(&options, &CORE);
    thread.join();
    assert_eq!(CORE.0.load(Ordering::SeqCst), 1);
    assert!(!CTX.is_in_use());

    let thread = Thread::spawn_core(&options, &CORE);
    thread.join();
    assert_eq!(CORE.0.load(Ordering::SeqCst), 2);
}
