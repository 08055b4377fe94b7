//! Service registry
//!
//! Owns every service by name. Registration happens at boot, before
//! `start_all`.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use pocket_hal::{Rtos, Settings};

use super::{Service, ServiceHandle};
use crate::error::ServiceError;

/// Named service registry.
pub struct ServiceManager {
    services: Vec<Arc<ServiceHandle>>,
    by_name: HashMap<String, usize>,
    settings: Arc<dyn Settings>,
}

impl ServiceManager {
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        Self {
            services: Vec::new(),
            by_name: HashMap::new(),
            settings,
        }
    }

    /// Add a service. Names must be unique.
    pub fn register(&mut self, service: Box<dyn Service>) -> Result<Arc<ServiceHandle>, ServiceError> {
        let name = String::from(service.name());
        if self.by_name.contains_key(&name) {
            return Err(ServiceError::AlreadyRegistered(name));
        }
        let handle = Arc::new(ServiceHandle::new(service, self.settings.clone()));
        self.by_name.insert(name, self.services.len());
        self.services.push(handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ServiceHandle>> {
        self.by_name.get(name).map(|&i| self.services[i].clone())
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), ServiceError> {
        self.get(name)
            .ok_or(ServiceError::NotFound)?
            .set_enabled(enabled)
    }

    /// Start every service not yet started, in registration order. Returns
    /// how many started. Failures are logged and skipped.
    pub fn start_all(&self, rtos: &Arc<dyn Rtos>) -> usize {
        let mut started = 0;
        for svc in self.services.iter().filter(|s| !s.is_started()) {
            match svc.start(rtos) {
                Ok(_) => started += 1,
                Err(e) => log::error!("[ServiceManager] '{}': {}", svc.name(), e),
            }
        }
        log::info!(
            "[ServiceManager] {}/{} services started",
            started,
            self.services.len()
        );
        started
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
