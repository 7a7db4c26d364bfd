// src/sched/mod.rs
//
// Cooperative FIFO scheduler and its preemptive, timer-driven
// subclass. Threads are modeled as small integer ids into an
// implicit table rather than intrusive linked nodes — the
// alternative the design notes call out explicitly for breaking the
// scheduler/thread ownership cycle. Real context switching (saving
// and restoring a thread's registers and stack) is a narrow
// collaborator, `sched::context`; the scheduler itself only decides
// *which* id becomes current and calls into it.

pub mod context;

use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

use crate::arch::regs::{disable_interrupts, enable_interrupts};

pub type ThreadId = u32;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh, never-reused thread id.
pub fn new_thread_id() -> ThreadId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A context-switch hook, plugged in by the boot code once real
/// threads with real stacks exist. Left unset, `Scheduler` still
/// tracks ordering correctly — useful for testing dispatch order
/// without real stacks.
pub type SwitchHook = fn(from: Option<ThreadId>, to: ThreadId);

pub struct Scheduler {
    ready: Mutex<VecDeque<ThreadId>>,
    current: Mutex<Option<ThreadId>>,
    switch_hook: Mutex<Option<SwitchHook>>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            ready: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            switch_hook: Mutex::new(None),
        }
    }

    pub fn set_switch_hook(&self, hook: SwitchHook) {
        *self.switch_hook.lock() = Some(hook);
    }

    /// Seed the notion of "currently running thread" without putting
    /// it on the ready queue — used once at boot for the thread that
    /// is already executing when the scheduler is installed.
    pub fn set_current(&self, t: ThreadId) {
        *self.current.lock() = Some(t);
    }

    pub fn current(&self) -> Option<ThreadId> {
        *self.current.lock()
    }

    /// Enqueue `t` at the tail of the ready queue.
    pub fn add(&self, t: ThreadId) {
        disable_interrupts();
        self.ready.lock().push_back(t);
        enable_interrupts();
    }

    /// Alias for `add`: a brand-new thread and a thread becoming
    /// runnable again both just mean "append to the ready queue".
    pub fn resume(&self, t: ThreadId) {
        self.add(t);
    }

    /// Dequeue the head of the ready queue and switch to it. The
    /// caller is *not* re-enqueued by this call — a thread that wants
    /// to remain runnable must `resume(self)` before yielding. This
    /// is the policy `RRScheduler` relies on: it resumes the
    /// preempted thread explicitly, then yields.
    ///
    /// A no-op (the caller keeps running) if the queue is empty.
    pub fn yield_now(&self) -> Option<ThreadId> {
        disable_interrupts();
        let next = self.ready.lock().pop_front();
        enable_interrupts();

        if let Some(next) = next {
            let prev = *self.current.lock();
            if let Some(hook) = *self.switch_hook.lock() {
                hook(prev, next);
            }
            *self.current.lock() = Some(next);
        }
        next
    }

    /// Remove `t` from the ready queue by id. Absence is not an error
    /// — it means `t` is the currently running thread.
    pub fn terminate(&self, t: ThreadId) {
        disable_interrupts();
        self.ready.lock().retain(|&id| id != t);
        enable_interrupts();
    }

    pub fn ready_len(&self) -> usize {
        self.ready.lock().len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Preemptive round-robin scheduler: a `Scheduler` plus a tick
/// counter compared against a quantum, driven by the PIT on IRQ0.
pub struct RRScheduler {
    inner: Scheduler,
    ticks: Mutex<u32>,
    hz_threshold: u32,
}

pub const DEFAULT_QUANTUM_HZ: u32 = 5;

impl RRScheduler {
    /// Program the PIT at `hz` and build a scheduler whose quantum is
    /// `hz` ticks (so a timer firing at `hz` Hz gives each thread
    /// roughly one second divided by `hz_threshold`... in practice the
    /// PIT frequency and the quantum threshold are independent knobs;
    /// the teaching default ties them together at `hz`).
    pub fn new(hz_threshold: u32) -> Self {
        crate::interrupts::pit::init(core::cmp::max(hz_threshold, 1));
        RRScheduler {
            inner: Scheduler::new(),
            ticks: Mutex::new(0),
            hz_threshold,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner
    }

    /// Called from the timer IRQ. Rotates the running thread out once
    /// `hz_threshold` ticks have elapsed since the last rotation.
    pub fn tick(&self) {
        let mut ticks = self.ticks.lock();
        *ticks += 1;
        if *ticks < self.hz_threshold {
            return;
        }
        *ticks = 0;
        drop(ticks);

        if let Some(current) = self.inner.current() {
            self.inner.resume(current);
        }
        self.inner.yield_now();
    }
}

static RR: Mutex<Option<RRScheduler>> = Mutex::new(None);

/// Install the system-wide round-robin scheduler. Must run before any
/// IRQ0 fires.
pub fn install(scheduler: RRScheduler) {
    *RR.lock() = Some(scheduler);
}

/// Called from the timer interrupt handler.
pub fn timer_tick() {
    if let Some(rr) = RR.lock().as_ref() {
        rr.tick();
    }
}

/// Voluntarily yield to the next ready thread, if any.
pub fn yield_now() -> Option<ThreadId> {
    RR.lock().as_ref().and_then(|rr| rr.scheduler().yield_now())
}

/// Add a thread to the installed scheduler's ready queue.
pub fn resume(t: ThreadId) {
    if let Some(rr) = RR.lock().as_ref() {
        rr.scheduler().resume(t);
    }
}

/// The currently running thread, if a scheduler is installed and has
/// dispatched at least once.
pub fn current() -> Option<ThreadId> {
    RR.lock().as_ref().and_then(|rr| rr.scheduler().current())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_dispatch_order() {
        let s = Scheduler::new();
        s.add(1);
        s.add(2);
        s.add(3);
        assert_eq!(s.yield_now(), Some(1));
        assert_eq!(s.yield_now(), Some(2));
        assert_eq!(s.yield_now(), Some(3));
        assert_eq!(s.yield_now(), None);
    }

    #[test]
    fn yield_does_not_requeue_the_caller() {
        let s = Scheduler::new();
        s.set_current(1);
        s.add(2);
        assert_eq!(s.yield_now(), Some(2));
        assert_eq!(s.ready_len(), 0);
    }

    #[test]
    fn terminate_removes_by_id_and_absence_is_fine() {
        let s = Scheduler::new();
        s.add(1);
        s.add(2);
        s.terminate(1);
        assert_eq!(s.yield_now(), Some(2));
        s.terminate(99); // not present; not an error
    }

    #[test]
    fn rr_preempts_after_quantum_and_runs_the_peer() {
        let rr = RRScheduler::new(5);
        rr.scheduler().set_current(1);
        rr.scheduler().add(2);

        for _ in 0..4 {
            rr.tick();
        }
        // fewer than hz_threshold ticks: no rotation yet
        assert_eq!(rr.scheduler().current(), Some(1));

        rr.tick(); // 5th tick: rotate
        assert_eq!(rr.scheduler().current(), Some(2));
        // thread 1 was resumed (re-enqueued) by the preemption
        assert_eq!(rr.scheduler().ready_len(), 1);
    }
}
