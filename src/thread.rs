//! Thread support.
//!
//! This is the portable thread lifecycle: a [`Context`] is the fixed memory
//! block backing one thread slot, an [`Options`] value describes how a thread
//! should be created, and a [`Thread`] is the move-only handle to a live
//! thread of execution.  A handle must reach exactly one of its terminal
//! dispositions, [`join`] or [`detach`], before it is dropped.
//!
//! Contexts can be allocated statically by the caller and bound through
//! [`Options::context`]:
//!
//! ```
//! use portable_thread::thread::{Context, Options, Thread};
//!
//! static WORKER: Context = Context::new();
//!
//! let options = Options::new().name("worker").context(&WORKER);
//! let worker = Thread::spawn(&options, || {
//!     // thread code...
//! });
//! worker.join();
//! ```
//!
//! A context is exclusively owned by its current handle and becomes reusable
//! only once fully reclaimed, which happens in `join`, or in `detach` if the
//! thread has already finished, or otherwise in the exiting thread itself.
//! When no context is bound, one is allocated dynamically for the lifetime of
//! the thread.
//!
//! The done/detached race is resolved with a single atomic lifecycle word per
//! context, rather than the suspend-all or preemption-threshold critical
//! sections native kernels use for the same handshake: each party makes one
//! compare-and-swap, and whoever wins a terminal transition owns reclamation.
//! Exactly one party reclaims, never both, never neither.
//!
//! [`join`]: Thread::join
//! [`detach`]: Thread::detach

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::Ordering;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::{error, trace};
use portable_atomic::AtomicU8;

use crate::sys::native;
use crate::time::{now, Duration, Instant};

/// Lifecycle states of a [`Context`].
#[repr(u8)]
enum Lifecycle {
    /// Not backing any thread; may be claimed.
    Free,
    /// Claimed, thread created; the entry function has not returned and the
    /// handle has not been detached.
    Running,
    /// The entry function returned first; reclamation belongs to the
    /// `join`/`detach` caller.
    Done,
    /// The handle was detached first; reclamation belongs to the exiting
    /// thread.
    Detached,
}

/// The fixed memory block backing one thread slot.
///
/// Holds the lifecycle word, the join signal, and the native task handle.
/// On kernels with statically allocated control blocks and stacks, the
/// backend keeps those inside its `Task`; this type is what the portable
/// layer needs per slot, and it can live in a `static`.
pub struct Context {
    /// Lifecycle word.  All transitions are single CASes; whoever wins a
    /// terminal transition owns reclamation.
    state: AtomicU8,
    /// Join signal.  Reset when the context is claimed, set by the trampoline
    /// after the entry function returns.
    done: native::Signal,
    /// Native task handle.  Written at spawn and emptied by the reclaiming
    /// party before `Free` is stored.
    task: UnsafeCell<Option<native::Task>>,
}

// The task slot is only ever touched by the thread holding the `Thread`
// handle (spawn, join, detach); the exiting thread's half of the handshake
// goes through `state` and `done` alone.  The release store of `Free`
// publishes the emptied slot to the next claimant's acquire CAS.
unsafe impl Sync for Context {}

impl Context {
    /// Construct a free context, suitable for a `static`.
    pub const fn new() -> Context {
        Context {
            state: AtomicU8::new(Lifecycle::Free as u8),
            done: native::Signal::new(),
            task: UnsafeCell::new(None),
        }
    }

    /// Whether this context currently backs a thread (claimed and not yet
    /// fully reclaimed).
    pub fn is_in_use(&self) -> bool {
        self.state.load(Ordering::Acquire) != Lifecycle::Free as u8
    }

    /// Claim the context for a new thread.  Claiming a context that is still
    /// in use is a fatal precondition violation.
    fn claim(&self) {
        if self
            .state
            .compare_exchange(
                Lifecycle::Free as u8,
                Lifecycle::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            panic!("attempt to use a thread context that is already in use");
        }
        self.done.reset();
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

/// A context reference held by a handle and by the trampoline.
#[derive(Clone)]
enum ContextRef {
    Static(&'static Context),
    Dynamic(Arc<Context>),
}

impl ContextRef {
    fn get(&self) -> &Context {
        match self {
            ContextRef::Static(ctx) => ctx,
            ContextRef::Dynamic(ctx) => ctx,
        }
    }
}

/// Configuration for creating a thread.
///
/// An immutable value, read (never mutated) by [`Thread::spawn`], and
/// reusable across creations.  The scheduler knobs are passed through to the
/// backend in its own terms; this layer does not interpret them.
#[derive(Clone)]
pub struct Options {
    name: &'static str,
    priority: i32,
    stack_size: usize,
    time_slice: Option<Duration>,
    preempt_threshold: Option<i32>,
    context: Option<&'static Context>,
}

impl Options {
    /// Default options: unnamed, default stack, no bound context.
    pub const fn new() -> Options {
        Options {
            name: "portable-thread",
            priority: 0,
            stack_size: 0,
            time_slice: None,
            preempt_threshold: None,
            context: None,
        }
    }

    /// Name given to the native thread, visible to debuggers and trace
    /// tools.
    pub const fn name(mut self, name: &'static str) -> Options {
        self.name = name;
        self
    }

    /// Scheduling priority, in backend-native terms.
    pub const fn priority(mut self, priority: i32) -> Options {
        self.priority = priority;
        self
    }

    /// Requested stack size in bytes; zero means the backend default.
    pub const fn stack_size(mut self, stack_size: usize) -> Options {
        self.stack_size = stack_size;
        self
    }

    /// Round-robin time slice, on kernels that support one.
    pub const fn time_slice(mut self, time_slice: Duration) -> Options {
        self.time_slice = Some(time_slice);
        self
    }

    /// Preemption-threshold ceiling, on kernels that support one.
    pub const fn preempt_threshold(mut self, threshold: i32) -> Options {
        self.preempt_threshold = Some(threshold);
        self
    }

    /// Bind a caller-allocated context.  The context must not be in use when
    /// the thread is created.
    pub const fn context(mut self, context: &'static Context) -> Options {
        self.context = Some(context);
        self
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Options {{ name: {:?}, priority: {}, stack_size: {} }}",
            self.name, self.priority, self.stack_size
        )
    }
}

/// An opaque thread identity.
///
/// The default value means "no thread" and never aliases a live thread's
/// identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Id(Option<native::TaskId>);

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "Id({:?})", id),
            None => write!(f, "Id(none)"),
        }
    }
}

/// The identity of the calling thread.
///
/// On the host backend this always succeeds.  RTOS backends must not call
/// this from interrupt context or before their scheduler has started; doing
/// so is a usage error, not a recoverable condition.
pub fn current_id() -> Id {
    Id(Some(native::current()))
}

/// A capability for being used as a thread entry point.
///
/// Lets an object be handed to [`Thread::spawn_core`] without writing a
/// trampoline closure.  `run` is called once, on the new thread; use interior
/// mutability for any state it updates.
pub trait ThreadCore {
    /// The body of the thread.
    fn run(&self);
}

/// A move-only handle representing zero or one live thread of execution.
///
/// A handle that represents a thread must be [`join`]ed or [`detach`]ed
/// before it is dropped; both consume the handle, so calling either twice is
/// a compile error rather than a runtime one.  Dropping a handle that still
/// represents a thread is a fatal precondition violation: this layer
/// deliberately forbids silent thread leaks.
///
/// [`join`]: Thread::join
/// [`detach`]: Thread::detach
pub struct Thread {
    ctx: Option<ContextRef>,
    id: Id,
}

impl Thread {
    /// Create and start a thread running `entry`.
    ///
    /// If `options` binds a context, that context backs the thread and must
    /// not already be in use; otherwise one is allocated for the thread's
    /// lifetime.  Creation failure is a configuration error on statically
    /// sized targets and is fatal; there is no retry policy at this layer.
    pub fn spawn<F>(options: &Options, entry: F) -> Thread
    where
        F: FnOnce() + Send + 'static,
    {
        let ctx = match options.context {
            Some(context) => ContextRef::Static(context),
            None => ContextRef::Dynamic(Arc::new(Context::new())),
        };
        ctx.get().claim();

        let tramp_ctx = ctx.clone();
        let trampoline = move || {
            // A panic in the entry function must not skip the handshake
            // below, or a pending join would never wake.
            if catch_unwind(AssertUnwindSafe(entry)).is_err() {
                error!("thread body panicked; completing lifecycle handshake");
            }
            let ctx = tramp_ctx.get();
            match ctx.state.compare_exchange(
                Lifecycle::Running as u8,
                Lifecycle::Done as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // Finished first: reclamation belongs to the join/detach
                    // caller.  Wake it.
                    ctx.done.set();
                }
                Err(state) if state == Lifecycle::Detached as u8 => {
                    // Detached first: this is the only path that can free the
                    // slot.  The handle itself was already released by
                    // `detach`.
                    ctx.state.store(Lifecycle::Free as u8, Ordering::Release);
                    trace!("detached thread reclaimed its context");
                }
                Err(_) => unreachable!("thread context state corrupted"),
            }
        };

        let spec = native::TaskSpec {
            name: options.name,
            stack_size: options.stack_size,
            priority: options.priority,
            time_slice_ticks: options.time_slice.map(|slice| slice.ticks()),
            preempt_threshold: options.preempt_threshold,
        };
        let task = match native::Task::spawn(&spec, Box::new(trampoline)) {
            Ok(task) => task,
            Err(err) => panic!("failed to create thread {:?}: {}", options.name, err),
        };
        let id = Id(Some(task.id()));

        // SAFETY: the slot is only accessed from the thread holding the
        // handle; the trampoline never touches it.
        unsafe { *ctx.get().task.get() = Some(task) };

        trace!("spawned thread {:?} as {:?}", options.name, id);
        Thread { ctx: Some(ctx), id }
    }

    /// Create and start a thread whose body is `core.run()`.
    pub fn spawn_core(options: &Options, core: &'static (dyn ThreadCore + Sync)) -> Thread {
        Thread::spawn(options, move || core.run())
    }

    /// The identity of the represented thread, or the default [`Id`] if this
    /// handle does not represent one.
    pub fn get_id(&self) -> Id {
        if self.ctx.is_some() {
            self.id
        } else {
            Id::default()
        }
    }

    /// Whether this handle represents a thread that has not been joined or
    /// detached.  A thread whose entry function has returned but which has
    /// not yet been joined is still joinable.
    pub fn joinable(&self) -> bool {
        self.get_id() != Id::default()
    }

    /// Block until the thread's entry function has returned, then reclaim
    /// the context.
    ///
    /// Joining yourself is a deadlock and is rejected fatally rather than
    /// hung.  A join of an already finished thread completes immediately.
    pub fn join(mut self) {
        // The handle is disarmed before the precondition checks; a failed
        // check is already fatal and must not panic a second time out of
        // Drop.
        let ctx = self
            .ctx
            .take()
            .expect("join called on a thread that is not joinable");
        assert!(current_id() != self.id, "a thread cannot join itself");

        let context = ctx.get();
        context.done.wait();

        // SAFETY: single accessor, as in `spawn`.
        let task = unsafe { (*context.task.get()).take() }
            .expect("joinable context lost its native handle");
        task.join();
        context.state.store(Lifecycle::Free as u8, Ordering::Release);
        trace!("joined thread {:?}", self.id);
    }

    /// Release ownership of the thread's eventual cleanup.
    ///
    /// If the entry function has already returned, the context is reclaimed
    /// here, synchronously.  Otherwise the thread reclaims it itself when the
    /// entry function returns, and the context becomes reusable only then.
    pub fn detach(mut self) {
        let ctx = self
            .ctx
            .take()
            .expect("detach called on a thread that is not joinable");

        let context = ctx.get();
        // SAFETY: single accessor, as in `spawn`.
        let task = unsafe { (*context.task.get()).take() }
            .expect("joinable context lost its native handle");
        match context.state.compare_exchange(
            Lifecycle::Running as u8,
            Lifecycle::Detached as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                // Still running: the thread reclaims the slot when its entry
                // function returns.
                task.detach();
                trace!("detached running thread {:?}", self.id);
            }
            Err(state) if state == Lifecycle::Done as u8 => {
                // Already finished: reclaim synchronously here.
                task.join();
                context.done.reset();
                context.state.store(Lifecycle::Free as u8, Ordering::Release);
                trace!("detached finished thread {:?}", self.id);
            }
            Err(_) => unreachable!("thread context state corrupted"),
        }
    }
}

impl Default for Thread {
    /// A handle that represents no thread.
    fn default() -> Thread {
        Thread {
            ctx: None,
            id: Id::default(),
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({:?})", self.get_id())
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.ctx.is_some() {
            panic!(
                "thread {:?} dropped while still joinable; join or detach it first",
                self.id
            );
        }
    }
}

/// Create a thread and immediately detach it.
pub fn spawn_detached<F>(options: &Options, entry: F)
where
    F: FnOnce() + Send + 'static,
{
    Thread::spawn(options, entry).detach();
}

/// Block the calling thread for at least `duration`.
///
/// An empty duration does not block at all: the call yields once and
/// returns.  Anything else is rounded up, never down, by the backend's tick.
pub fn sleep_for(duration: Duration) {
    let mut remaining = duration.ticks();
    if remaining == 0 {
        // Do not block for an empty duration; give up the slice instead.
        native::yield_now();
        return;
    }
    // A tick-based kernel cannot know where inside the current tick the
    // caller is, so every delay carries one extra tick to round up.  Delays
    // beyond what the backend expresses in a single call are chunked, and
    // each chunk keeps one tick of slack for the same reason.
    const CHUNK: u64 = native::DELAY_MAX_TICKS - 1;
    while remaining > CHUNK {
        native::delay(CHUNK);
        remaining -= CHUNK;
    }
    native::delay(remaining + 1);
}

/// Block the calling thread until at least `deadline`.
///
/// A deadline that is not in the future does not block, exactly like
/// `sleep_for` of an empty duration.
pub fn sleep_until(deadline: Instant) {
    let current = now();
    if deadline <= current {
        sleep_for(Duration::from_ticks(0));
    } else {
        sleep_for(deadline - current);
    }
}

/// Give up the remainder of the current time slice to ready threads of the
/// same or higher priority.
///
/// Purely advisory; what actually runs next is the scheduler's business.
pub fn yield_now() {
    native::yield_now();
}
