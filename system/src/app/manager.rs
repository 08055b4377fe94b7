//! App Manager
//!
//! Stack-based foreground/background scheduler. The last element of the
//! stack is the foreground app: it is `Running`, receives input and is
//! composited. Everything below it is `Suspended`.
//!
//! Launch requests from any task go into a pending queue under the
//! scheduler lock and are applied only inside [`AppManager::tick`], so an
//! app can ask for a new app from its own task without racing the stack
//! mutation that suspends it.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use pocket_graphics::Canvas;
use pocket_hal::{Display, Rtos, TaskSpec};
use spin::Mutex;

use super::application::{AppState, Application};
use super::compositor::{self, Toast, ToastStyle};
use super::context::AppContext;
use super::slot::AppSlot;
use crate::config::APP_TASK_PRIORITY;
use crate::error::{AppError, FatalError};
use crate::input::InputEvent;

// ── Types ───────────────────────────────────────────────────

/// Snapshot of one application for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub state: AppState,
}

impl AppInfo {
    fn of(slot: &AppSlot) -> Self {
        Self {
            name: slot.name.clone(),
            state: slot.state(),
        }
    }
}

/// Everything behind the scheduler lock.
struct Scheduler {
    panel: Option<Arc<AppSlot>>,
    apps: Vec<Arc<AppSlot>>,
    apps_to_run: VecDeque<Box<dyn Application>>,
    toast: Toast,
    display: Box<dyn Display>,
}

/// Halt hook for tests; the default halts through the RTOS.
pub type HaltHook = Box<dyn Fn(&str) + Send + Sync>;

// ── Launcher ────────────────────────────────────────────────

/// Producer handle shared with application tasks.
///
/// Both calls take the scheduler lock only long enough to record the
/// request and never fail.
#[derive(Clone)]
pub struct Launcher {
    inner: Arc<Mutex<Scheduler>>,
    rtos: Arc<dyn Rtos>,
}

impl Launcher {
    /// Queue `app` for launch on the next tick.
    pub fn run_app(&self, app: Box<dyn Application>) {
        let mut sched = self.inner.lock();
        sched.apps_to_run.push_back(app);
        log::debug!(
            "[AppManager] Launch queued ({} pending)",
            sched.apps_to_run.len()
        );
    }

    /// Show `message` for `duration_ms` from now, replacing any toast.
    pub fn start_toast(&self, message: &str, duration_ms: u32) {
        let now = self.rtos.uptime_ms();
        self.inner.lock().toast.start(message, now, duration_ms);
    }
}

// ── App Manager ─────────────────────────────────────────────

/// The scheduler and compositor.
pub struct AppManager {
    launcher: Launcher,
    rtos: Arc<dyn Rtos>,
    toast_style: ToastStyle,
    halt_hook: Option<HaltHook>,
}

impl AppManager {
    pub fn new(rtos: Arc<dyn Rtos>, display: Box<dyn Display>) -> Self {
        let inner = Arc::new(Mutex::new(Scheduler {
            panel: None,
            apps: Vec::new(),
            apps_to_run: VecDeque::new(),
            toast: Toast::default(),
            display,
        }));
        Self {
            launcher: Launcher {
                inner,
                rtos: rtos.clone(),
            },
            rtos,
            toast_style: ToastStyle::default(),
            halt_hook: None,
        }
    }

    /// Set the toast appearance.
    pub fn with_toast_style(mut self, style: ToastStyle) -> Self {
        self.toast_style = style;
        self
    }

    /// Replace the halt on an empty stack with `hook`. If the hook returns,
    /// `tick` reports [`FatalError::EmptyAppStack`].
    pub fn with_halt_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.halt_hook = Some(Box::new(hook));
        self
    }

    fn lock(&self) -> spin::MutexGuard<'_, Scheduler> {
        self.launcher.inner.lock()
    }

    /// A producer handle for other tasks.
    pub fn launcher(&self) -> Launcher {
        self.launcher.clone()
    }

    /// Install and start the always-visible panel. Only once.
    pub fn set_panel(&self, app: Box<dyn Application>) -> Result<(), AppError> {
        let mut sched = self.lock();
        if sched.panel.is_some() {
            return Err(AppError::PanelAlreadySet);
        }
        let slot = self.start(app)?;
        log::info!("[AppManager] Panel '{}' started", slot.name);
        sched.panel = Some(slot);
        Ok(())
    }

    /// Queue `app` for launch on the next tick.
    pub fn run_app(&self, app: Box<dyn Application>) {
        self.launcher.run_app(app);
    }

    /// Show `message` for `duration_ms` from now.
    pub fn start_toast(&self, message: &str, duration_ms: u32) {
        self.launcher.start_toast(message, duration_ms);
    }

    /// One scheduling step: apply launches, reap a finished foreground app,
    /// composite, yield.
    pub fn tick(&self) -> Result<(), FatalError> {
        let now = self.rtos.uptime_ms();
        let mut guard = self.lock();
        let sched = &mut *guard;

        while let Some(app) = sched.apps_to_run.pop_front() {
            let previous = sched.apps.last().cloned();
            if let Some(prev) = &previous {
                self.suspend(prev);
            }
            match self.start(app) {
                Ok(slot) => {
                    log::info!(
                        "[AppManager] Launched '{}' (depth={})",
                        slot.name,
                        sched.apps.len() + 1
                    );
                    sched.apps.push(slot);
                }
                Err(e) => {
                    log::error!("[AppManager] {}", e);
                    if let Some(prev) = &previous {
                        self.resume(prev);
                    }
                }
            }
        }

        let mut popped = false;
        while let Some(top) = sched.apps.last().cloned() {
            if top.state() != AppState::Deleted {
                break;
            }
            sched.apps.pop();
            self.reclaim(&top);
            popped = true;
        }

        if popped && sched.apps.is_empty() {
            drop(guard);
            return Err(self.fatal(FatalError::EmptyAppStack));
        }
        if popped {
            if let Some(top) = sched.apps.last() {
                self.resume(top);
                top.request_redraw();
            }
            if let Some(panel) = &sched.panel {
                panel.request_redraw();
            }
        }

        compositor::composite(
            sched.display.as_mut(),
            sched.panel.as_deref(),
            sched.apps.last().map(|s| &**s),
            &mut sched.toast,
            &self.toast_style,
            now,
        );
        drop(guard);

        self.rtos.yield_now();
        Ok(())
    }

    /// Draw panel, foreground app and toast into `target` (e.g. for a
    /// screenshot). Does not touch the display or dirty flags.
    pub fn render_to_canvas(&self, target: &mut Canvas) {
        let now = self.rtos.uptime_ms();
        let sched = self.lock();
        compositor::render(
            target,
            sched.display.size(),
            sched.panel.as_deref(),
            sched.apps.last().map(|s| &**s),
            &sched.toast,
            &self.toast_style,
            now,
        );
    }

    /// Deliver `event` to the foreground app. Returns false if there is no
    /// running foreground app or its inbox is full.
    pub fn dispatch_input(&self, event: InputEvent) -> bool {
        let sched = self.lock();
        match sched.apps.last() {
            Some(top) if top.state() == AppState::Running => {
                if top.inbox.try_send(event).is_err() {
                    log::warn!("[AppManager] '{}' inbox full, dropping {:?}", top.name, event);
                    return false;
                }
                true
            }
            _ => false,
        }
    }

    // ── Introspection ──

    /// The stack, bottom first.
    pub fn stack(&self) -> Vec<AppInfo> {
        self.lock().apps.iter().map(|s| AppInfo::of(s)).collect()
    }

    pub fn foreground(&self) -> Option<AppInfo> {
        self.lock().apps.last().map(|s| AppInfo::of(s))
    }

    pub fn panel(&self) -> Option<AppInfo> {
        self.lock().panel.as_deref().map(AppInfo::of)
    }

    pub fn app_count(&self) -> usize {
        self.lock().apps.len()
    }

    /// Launch requests not yet applied.
    pub fn pending_launches(&self) -> usize {
        self.lock().apps_to_run.len()
    }

    pub fn toast_message(&self) -> Option<String> {
        self.lock().toast.message().map(String::from)
    }

    // ── Internals ──

    /// Spawn the task for `app`. The slot is `Running` before the task
    /// exists so the task can only ever move it on to `Deleted`.
    fn start(&self, app: Box<dyn Application>) -> Result<Arc<AppSlot>, AppError> {
        let config = app.config();
        let slot = Arc::new(AppSlot::new(&config));
        slot.set_state(AppState::Running);

        let spec = TaskSpec::new(&config.name)
            .stack_size(config.stack_size)
            .priority(APP_TASK_PRIORITY)
            .core(config.core);

        let mut cx = AppContext::new(slot.clone(), self.rtos.clone(), self.launcher());
        let task_slot = slot.clone();
        let rtos = self.rtos.clone();
        let entry = Box::new(move || {
            let mut app = app;
            app.run(&mut cx);
            drop(cx);
            log::info!("[AppManager] '{}' finished", task_slot.name);
            *task_slot.retired.lock() = Some(app);
            task_slot.set_state(AppState::Deleted);
            loop {
                rtos.park();
            }
        });

        match self.rtos.spawn(&spec, entry) {
            Ok(handle) => {
                *slot.task.lock() = Some(handle);
                Ok(slot)
            }
            Err(e) => {
                slot.set_state(AppState::Deleted);
                Err(AppError::SpawnFailed(e))
            }
        }
    }

    fn suspend(&self, slot: &AppSlot) {
        if !slot.transition(AppState::Running, AppState::Suspended) {
            return;
        }
        if let Some(task) = slot.task() {
            self.rtos.suspend(task);
        }
        log::info!("[AppManager] Suspended '{}'", slot.name);
    }

    fn resume(&self, slot: &AppSlot) {
        if !slot.transition(AppState::Suspended, AppState::Running) {
            return;
        }
        if let Some(task) = slot.task() {
            self.rtos.resume(task);
        }
        log::info!("[AppManager] Resumed '{}'", slot.name);
    }

    /// Delete the task of a popped app, then free the app object.
    fn reclaim(&self, slot: &AppSlot) {
        if let Some(task) = slot.task.lock().take() {
            self.rtos.delete(task);
        }
        let app = slot.retired.lock().take();
        drop(app);
        slot.inbox.clear();
        log::info!("[AppManager] Freed '{}'", slot.name);
    }

    fn fatal(&self, error: FatalError) -> FatalError {
        log::error!("[AppManager] {}", error);
        match &self.halt_hook {
            Some(hook) => hook("application stack is empty"),
            None => self.rtos.halt("application stack is empty"),
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::application::AppConfig;
    use crate::input::Button;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use pocket_graphics::{Color, Rect, Size};
    use pocket_hal::host::{HostRtos, MemoryDisplay};
    use std::time::{Duration, Instant};

    const SCREEN: Size = Size::new(32, 24);

    /// Paints a solid colour, counts inputs, returns when `quit` is set.
    struct Solid {
        name: &'static str,
        color: Color,
        quit: Arc<AtomicBool>,
        inputs: Arc<AtomicUsize>,
    }

    impl Solid {
        fn new(name: &'static str, color: Color) -> (Self, Arc<AtomicBool>) {
            let quit = Arc::new(AtomicBool::new(false));
            let app = Self {
                name,
                color,
                quit: quit.clone(),
                inputs: Arc::new(AtomicUsize::new(0)),
            };
            (app, quit)
        }
    }

    impl Application for Solid {
        fn config(&self) -> AppConfig {
            AppConfig::new(self.name, Rect::from_size(SCREEN))
        }

        fn run(&mut self, cx: &mut AppContext) {
            cx.canvas().fill(self.color);
            cx.present();
            while !self.quit.load(Ordering::SeqCst) {
                while cx.poll_input().is_some() {
                    self.inputs.fetch_add(1, Ordering::SeqCst);
                }
                if cx.redraw_requested() {
                    cx.canvas().fill(self.color);
                    cx.present();
                }
                cx.delay_ms(1);
            }
        }
    }

    fn manager() -> (AppManager, Arc<HostRtos>, MemoryDisplay) {
        let rtos = Arc::new(HostRtos::new());
        let display = MemoryDisplay::new(SCREEN);
        let mgr = AppManager::new(rtos.clone(), Box::new(display.clone()));
        (mgr, rtos, display)
    }

    fn tick_until(mgr: &AppManager, mut cond: impl FnMut(&AppManager) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            mgr.tick().unwrap();
            if cond(mgr) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn run_app_is_deferred_until_tick() {
        let (mgr, rtos, _display) = manager();
        let (app, _quit) = Solid::new("x", Color::RED);
        mgr.run_app(Box::new(app));
        assert_eq!(mgr.app_count(), 0);
        assert_eq!(mgr.pending_launches(), 1);

        mgr.tick().unwrap();
        assert_eq!(mgr.pending_launches(), 0);
        assert_eq!(
            mgr.stack(),
            vec![AppInfo {
                name: "x".into(),
                state: AppState::Running
            }]
        );
        rtos.shutdown();
    }

    #[test]
    fn first_frame_reaches_display() {
        let (mgr, rtos, display) = manager();
        let (app, _quit) = Solid::new("x", Color::BLUE);
        mgr.run_app(Box::new(app));
        assert!(tick_until(&mgr, |_| display.blit_count() > 0));
        assert_eq!(display.pixel(5, 5), Some(Color::BLUE.to_rgb565()));
        rtos.shutdown();
    }

    #[test]
    fn second_panel_is_rejected() {
        let (mgr, rtos, _display) = manager();
        let (a, _qa) = Solid::new("panel", Color::GRAY);
        let (b, _qb) = Solid::new("panel2", Color::GRAY);
        mgr.set_panel(Box::new(a)).unwrap();
        assert_eq!(mgr.set_panel(Box::new(b)), Err(AppError::PanelAlreadySet));
        assert_eq!(mgr.panel().map(|p| p.name), Some("panel".into()));
        rtos.shutdown();
    }

    #[test]
    fn input_goes_to_foreground_only() {
        let (mgr, rtos, _display) = manager();
        let (bottom, _qb) = Solid::new("bottom", Color::RED);
        let bottom_inputs = bottom.inputs.clone();
        let (top, _qt) = Solid::new("top", Color::GREEN);
        let top_inputs = top.inputs.clone();

        mgr.run_app(Box::new(bottom));
        mgr.tick().unwrap();
        mgr.run_app(Box::new(top));
        mgr.tick().unwrap();

        assert!(mgr.dispatch_input(InputEvent::Pressed(Button::A)));
        assert!(tick_until(&mgr, |_| top_inputs.load(Ordering::SeqCst) == 1));
        assert_eq!(bottom_inputs.load(Ordering::SeqCst), 0);
        rtos.shutdown();
    }

    #[test]
    fn finished_app_is_reaped_and_previous_resumed() {
        let (mgr, rtos, _display) = manager();
        let (x, _qx) = Solid::new("x", Color::RED);
        let (y, quit_y) = Solid::new("y", Color::GREEN);
        mgr.run_app(Box::new(x));
        mgr.tick().unwrap();
        mgr.run_app(Box::new(y));
        mgr.tick().unwrap();
        assert_eq!(rtos.live_tasks(), 2);

        quit_y.store(true, Ordering::SeqCst);
        assert!(tick_until(&mgr, |m| m.app_count() == 1));
        assert_eq!(
            mgr.foreground(),
            Some(AppInfo {
                name: "x".into(),
                state: AppState::Running
            })
        );
        assert_eq!(rtos.live_tasks(), 1);
        rtos.shutdown();
    }

    #[test]
    fn empty_stack_calls_halt_hook() {
        let rtos = Arc::new(HostRtos::new());
        let halted = Arc::new(AtomicBool::new(false));
        let flag = halted.clone();
        let mgr = AppManager::new(rtos.clone(), Box::new(MemoryDisplay::new(SCREEN)))
            .with_halt_hook(move |_| flag.store(true, Ordering::SeqCst));

        let (x, quit) = Solid::new("only", Color::RED);
        mgr.run_app(Box::new(x));
        mgr.tick().unwrap();
        quit.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut result = Ok(());
        while Instant::now() < deadline && result.is_ok() {
            result = mgr.tick();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(result, Err(FatalError::EmptyAppStack));
        assert!(halted.load(Ordering::SeqCst));
        assert_eq!(rtos.live_tasks(), 0);
    }

    #[test]
    fn toast_is_recorded() {
        let (mgr, _rtos, _display) = manager();
        mgr.start_toast("Saved", 1000);
        assert_eq!(mgr.toast_message(), Some("Saved".into()));
    }

    #[test]
    fn render_to_canvas_captures_foreground() {
        let (mgr, rtos, display) = manager();
        let (x, _q) = Solid::new("x", Color::GREEN);
        mgr.run_app(Box::new(x));
        assert!(tick_until(&mgr, |_| display.blit_count() > 0));
        let mut shot = Canvas::new(SCREEN);
        mgr.render_to_canvas(&mut shot);
        assert_eq!(shot.pixel(0, 0), Some(Color::GREEN.to_rgb565()));
        rtos.shutdown();
    }
}
