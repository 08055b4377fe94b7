//! Thread-backed RTOS
//!
//! Each task is an OS thread. Threads cannot be stopped from outside, so
//! suspension and deletion take effect at checkpoints: `park`, `delay_ms`
//! and `yield_now`. A deleted task unwinds out of its checkpoint with a
//! private payload. `delete` joins the thread if it exits within
//! `DELETE_GRACE`; a thread busy outside any checkpoint is detached and
//! unwinds when it next reaches one.

use alloc::string::{String, ToString};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::task::{Rtos, TaskEntry, TaskHandle, TaskSpec};
use crate::{HalError, Result};

/// Host threads need more stack than the device tasks ask for.
const MIN_HOST_STACK: usize = 256 * 1024;

/// How long `delete` waits for the thread to leave before detaching it.
const DELETE_GRACE: Duration = Duration::from_millis(100);

/// Unwind payload that ends a deleted task.
struct TaskDeleted;

#[derive(Default)]
struct GateState {
    suspended: bool,
    deleted: bool,
    exited: bool,
}

/// Per-task suspend/delete gate checked at every checkpoint.
#[derive(Default)]
struct TaskGate {
    state: Mutex<GateState>,
    wake: Condvar,
}

impl TaskGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while suspended, unwind if deleted, return at `deadline`.
    fn wait(&self, deadline: Option<Instant>) {
        let mut st = self.lock();
        loop {
            if st.deleted {
                drop(st);
                panic::resume_unwind(Box::new(TaskDeleted));
            }
            if st.suspended {
                st = self.wake.wait(st).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            let Some(deadline) = deadline else {
                return;
            };
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            st = match self.wake.wait_timeout(st, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn set_suspended(&self, suspended: bool) {
        self.lock().suspended = suspended;
        self.wake.notify_all();
    }

    fn mark_deleted(&self) {
        self.lock().deleted = true;
        self.wake.notify_all();
    }

    fn mark_exited(&self) {
        self.lock().exited = true;
        self.wake.notify_all();
    }

    /// Wait up to `grace` for the thread to leave; true if it did.
    fn wait_exit(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        let mut st = self.lock();
        while !st.exited {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            st = match self.wake.wait_timeout(st, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<TaskGate>>> = const { RefCell::new(None) };
}

fn current_gate() -> Option<Arc<TaskGate>> {
    CURRENT.with(|c| c.borrow().clone())
}

struct TaskRecord {
    name: String,
    gate: Arc<TaskGate>,
    thread: Option<JoinHandle<()>>,
}

/// Manually advanced uptime source.
#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

enum Clock {
    Monotonic(Instant),
    Manual(ManualClock),
}

/// RTOS emulation on host threads.
pub struct HostRtos {
    tasks: spin::Mutex<HashMap<u32, TaskRecord>>,
    next_id: AtomicU32,
    clock: Clock,
}

impl HostRtos {
    /// RTOS whose uptime follows the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::Monotonic(Instant::now()))
    }

    /// RTOS whose uptime only moves when the returned clock is advanced.
    pub fn with_manual_clock() -> (Self, ManualClock) {
        let clock = ManualClock::default();
        (Self::with_clock(Clock::Manual(clock.clone())), clock)
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            tasks: spin::Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            clock,
        }
    }

    fn gate(&self, task: TaskHandle) -> Option<Arc<TaskGate>> {
        self.tasks.lock().get(&task.0).map(|r| r.gate.clone())
    }

    /// Number of tasks spawned and not yet deleted.
    pub fn live_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether `task` has been spawned and not deleted.
    pub fn is_alive(&self, task: TaskHandle) -> bool {
        self.tasks.lock().contains_key(&task.0)
    }

    /// Names of live tasks, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().values().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }

    /// Delete every live task.
    pub fn shutdown(&self) {
        let ids: Vec<u32> = self.tasks.lock().keys().copied().collect();
        for id in ids {
            self.delete(TaskHandle(id));
        }
    }
}

impl Default for HostRtos {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtos for HostRtos {
    fn spawn(&self, spec: &TaskSpec, entry: TaskEntry) -> Result<TaskHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let gate = Arc::new(TaskGate::default());
        let task_gate = gate.clone();
        let name = spec.name.clone();

        log::trace!(
            "[HostRtos] spawn '{}' stack={} prio={} core={:?}",
            spec.name,
            spec.stack_size,
            spec.priority,
            spec.core
        );

        // Hold the table lock across the spawn so the record exists before
        // the new thread can be deleted or queried.
        let mut tasks = self.tasks.lock();
        let thread = thread::Builder::new()
            .name(spec.name.clone())
            .stack_size(spec.stack_size.max(MIN_HOST_STACK))
            .spawn(move || {
                CURRENT.with(|c| *c.borrow_mut() = Some(task_gate.clone()));
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry)) {
                    if !payload.is::<TaskDeleted>() {
                        log::error!("[HostRtos] task '{}' panicked", name);
                    }
                }
                task_gate.mark_exited();
            })
            .map_err(|e| HalError::SpawnFailed(e.to_string()))?;

        tasks.insert(
            id,
            TaskRecord {
                name: spec.name.clone(),
                gate,
                thread: Some(thread),
            },
        );
        Ok(TaskHandle(id))
    }

    fn suspend(&self, task: TaskHandle) {
        let Some(gate) = self.gate(task) else {
            log::warn!("[HostRtos] suspend of unknown {}", task);
            return;
        };
        gate.set_suspended(true);
        if current_gate().is_some_and(|g| Arc::ptr_eq(&g, &gate)) {
            gate.wait(None);
        }
    }

    fn resume(&self, task: TaskHandle) {
        match self.gate(task) {
            Some(gate) => gate.set_suspended(false),
            None => log::warn!("[HostRtos] resume of unknown {}", task),
        }
    }

    fn delete(&self, task: TaskHandle) {
        let Some(mut record) = self.tasks.lock().remove(&task.0) else {
            log::warn!("[HostRtos] delete of unknown {}", task);
            return;
        };
        record.gate.mark_deleted();

        if current_gate().is_some_and(|g| Arc::ptr_eq(&g, &record.gate)) {
            log::warn!("[HostRtos] task '{}' deleted itself", record.name);
            panic::resume_unwind(Box::new(TaskDeleted));
        }

        if let Some(thread) = record.thread.take() {
            if record.gate.wait_exit(DELETE_GRACE) {
                if thread.join().is_err() {
                    log::error!("[HostRtos] task '{}' could not be joined", record.name);
                }
            } else {
                log::warn!(
                    "[HostRtos] task '{}' outside a checkpoint, detached",
                    record.name
                );
            }
        }
        log::trace!("[HostRtos] deleted '{}'", record.name);
    }

    fn park(&self) {
        match current_gate() {
            Some(gate) => {
                gate.set_suspended(true);
                gate.wait(None);
            }
            None => log::warn!("[HostRtos] park() called outside a task"),
        }
    }

    fn delay_ms(&self, ms: u32) {
        let d = Duration::from_millis(ms as u64);
        match current_gate() {
            Some(gate) => gate.wait(Some(Instant::now() + d)),
            None => thread::sleep(d),
        }
    }

    fn yield_now(&self) {
        if let Some(gate) = current_gate() {
            gate.wait(None);
        }
        thread::yield_now();
    }

    fn uptime_ms(&self) -> u64 {
        match &self.clock {
            Clock::Monotonic(start) => start.elapsed().as_millis() as u64,
            Clock::Manual(clock) => clock.now(),
        }
    }

    fn halt(&self, reason: &str) -> ! {
        log::error!("[HostRtos] halt: {}", reason);
        panic!("system halted: {}", reason);
    }
}
