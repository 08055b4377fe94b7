//! System context
//!
//! Built once at startup and passed by reference to whatever needs the
//! scheduler, the services or the audio engine. There are no globals.

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;

use pocket_hal::{AudioHardware, Display, Rtos, Settings};

use crate::app::{AppManager, Application};
use crate::audio::AudioPlayer;
use crate::error::{FatalError, SystemError};
use crate::service::ServiceManager;

pub struct System {
    rtos: Arc<dyn Rtos>,
    settings: Arc<dyn Settings>,
    apps: AppManager,
    services: ServiceManager,
    audio: Arc<AudioPlayer>,
}

impl System {
    pub fn new(
        rtos: Arc<dyn Rtos>,
        display: Box<dyn Display>,
        settings: Arc<dyn Settings>,
        audio_hw: Arc<dyn AudioHardware>,
    ) -> Self {
        let apps = AppManager::new(rtos.clone(), display);
        let services = ServiceManager::new(settings.clone());
        let audio = Arc::new(AudioPlayer::new(rtos.clone(), audio_hw).with_settings(settings.clone()));
        log::info!("[System] Initialized");
        Self {
            rtos,
            settings,
            apps,
            services,
            audio,
        }
    }

    /// Use a custom scheduler (e.g. one with a halt hook).
    pub fn with_app_manager(mut self, apps: AppManager) -> Self {
        self.apps = apps;
        self
    }

    pub fn rtos(&self) -> &Arc<dyn Rtos> {
        &self.rtos
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    pub fn apps(&self) -> &AppManager {
        &self.apps
    }

    pub fn services(&self) -> &ServiceManager {
        &self.services
    }

    /// For registering services before `boot`.
    pub fn services_mut(&mut self) -> &mut ServiceManager {
        &mut self.services
    }

    pub fn audio(&self) -> &Arc<AudioPlayer> {
        &self.audio
    }

    /// Start services, install the panel and queue the home app.
    pub fn boot(&self, panel: Box<dyn Application>, home: Box<dyn Application>) -> Result<(), SystemError> {
        self.services.start_all(&self.rtos);
        self.apps.set_panel(panel)?;
        self.apps.run_app(home);
        log::info!("[System] Booted");
        Ok(())
    }

    /// One scheduler step.
    pub fn tick(&self) -> Result<(), FatalError> {
        self.apps.tick()
    }

    /// Drive the scheduler forever.
    pub fn run(&self) -> ! {
        loop {
            if let Err(e) = self.apps.tick() {
                self.rtos.halt(&format!("{}", e));
            }
        }
    }
}
