//! Background services
//!
//! A service is started once at boot and runs on its own task forever. Its
//! enabled flag is persisted under `("services", name)`. Toggling the flag
//! does not start or stop the task: a running service polls
//! [`ServiceContext::enabled`] and idles while disabled.

mod manager;

pub use manager::ServiceManager;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use pocket_hal::{Rtos, Settings, TaskHandle, TaskSpec};
use spin::Mutex;

use crate::config::{SERVICES_NAMESPACE, SERVICE_STACK_SIZE, SERVICE_TASK_PRIORITY};
use crate::error::ServiceError;

/// Always-on background logic.
pub trait Service: Send + 'static {
    /// Task name and persistence key.
    fn name(&self) -> &str;

    fn stack_size(&self) -> usize {
        SERVICE_STACK_SIZE
    }

    /// Enabled state when nothing has been persisted yet.
    fn default_enabled(&self) -> bool {
        true
    }

    /// Task body. Expected never to return; returning is an abnormal death.
    fn run(&mut self, cx: &ServiceContext);
}

struct ServiceState {
    name: String,
    enabled: AtomicBool,
    alive: AtomicBool,
}

/// What a service task sees of the system.
pub struct ServiceContext {
    state: Arc<ServiceState>,
    rtos: Arc<dyn Rtos>,
}

impl ServiceContext {
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Current enabled flag. Services check this themselves.
    pub fn enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Acquire)
    }

    pub fn delay_ms(&self, ms: u32) {
        self.rtos.delay_ms(ms);
    }

    pub fn yield_now(&self) {
        self.rtos.yield_now();
    }

    pub fn uptime_ms(&self) -> u64 {
        self.rtos.uptime_ms()
    }
}

/// Owner-side handle of one service.
pub struct ServiceHandle {
    state: Arc<ServiceState>,
    stack_size: usize,
    service: Mutex<Option<Box<dyn Service>>>,
    task: Mutex<Option<TaskHandle>>,
    settings: Arc<dyn Settings>,
}

impl ServiceHandle {
    /// Wrap `service`, loading its persisted enabled flag.
    pub fn new(service: Box<dyn Service>, settings: Arc<dyn Settings>) -> Self {
        let name = String::from(service.name());
        let enabled = settings.get_bool(SERVICES_NAMESPACE, &name, service.default_enabled());
        log::debug!("[Service] '{}' loaded (enabled={})", name, enabled);
        Self {
            state: Arc::new(ServiceState {
                name,
                enabled: AtomicBool::new(enabled),
                alive: AtomicBool::new(false),
            }),
            stack_size: service.stack_size(),
            service: Mutex::new(Some(service)),
            task: Mutex::new(None),
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Acquire)
    }

    /// Persist the flag, then update it in memory. The task keeps running
    /// either way. On a storage error nothing changes.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), ServiceError> {
        self.settings
            .set_bool(SERVICES_NAMESPACE, &self.state.name, enabled)
            .map_err(ServiceError::Storage)?;
        self.state.enabled.store(enabled, Ordering::Release);
        log::info!("[Service] '{}' enabled={}", self.state.name, enabled);
        Ok(())
    }

    /// Spawn the service task. Only once.
    pub fn start(&self, rtos: &Arc<dyn Rtos>) -> Result<TaskHandle, ServiceError> {
        let mut service = self
            .service
            .lock()
            .take()
            .ok_or(ServiceError::AlreadyStarted)?;

        let cx = ServiceContext {
            state: self.state.clone(),
            rtos: rtos.clone(),
        };
        let spec = TaskSpec::new(&self.state.name)
            .stack_size(self.stack_size)
            .priority(SERVICE_TASK_PRIORITY);

        self.state.alive.store(true, Ordering::Release);
        let entry = Box::new(move || {
            service.run(&cx);
            log::error!("[Service] '{}' died: run() returned", cx.state.name);
            cx.state.alive.store(false, Ordering::Release);
            loop {
                cx.rtos.park();
            }
        });

        match rtos.spawn(&spec, entry) {
            Ok(handle) => {
                *self.task.lock() = Some(handle);
                log::info!("[Service] '{}' started ({})", self.state.name, handle);
                Ok(handle)
            }
            Err(e) => {
                self.state.alive.store(false, Ordering::Release);
                log::error!("[Service] '{}' failed to start: {}", self.state.name, e);
                Err(ServiceError::SpawnFailed(e))
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.task.lock().is_some()
    }

    /// False before `start` and after `run` returned.
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire)
    }

    pub fn task(&self) -> Option<TaskHandle> {
        *self.task.lock()
    }
}
