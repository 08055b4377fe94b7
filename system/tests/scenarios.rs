//! Scheduler and audio scenarios on the host RTOS.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pocket_graphics::{Color, Rect, Size};
use pocket_hal::host::{HostAudio, HostRtos, MemoryDisplay};
use pocket_hal::{AudioFormat, AudioHardware, AudioOutput, MemorySettings};
use pocket_system::audio::wav::encode_pcm16;
use pocket_system::{
    AppConfig, AppContext, AppManager, AppState, Application, AudioPlayer, FatalError, Sound,
    SoundKind, System,
};

const SCREEN: Size = Size::new(24, 16);
const PANEL_AREA: Rect = Rect::new(0, 0, 24, 4);
const APP_AREA: Rect = Rect::new(0, 4, 24, 12);

// ── Helpers ──

#[derive(Default)]
struct Probe {
    quit: AtomicBool,
    redraws: AtomicUsize,
    launch_child: AtomicBool,
}

/// Fills its canvas, counts forced redraws, optionally launches a child
/// from its own task.
struct ProbeApp {
    name: &'static str,
    bounds: Rect,
    color: Color,
    probe: Arc<Probe>,
}

impl ProbeApp {
    fn new(name: &'static str, color: Color) -> (Box<dyn Application>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let app = Self {
            name,
            bounds: APP_AREA,
            color,
            probe: probe.clone(),
        };
        (Box::new(app), probe)
    }

    fn panel() -> Box<dyn Application> {
        let app = Self {
            name: "panel",
            bounds: PANEL_AREA,
            color: Color::GRAY,
            probe: Arc::new(Probe::default()),
        };
        Box::new(app)
    }
}

impl Application for ProbeApp {
    fn config(&self) -> AppConfig {
        AppConfig::new(self.name, self.bounds)
    }

    fn run(&mut self, cx: &mut AppContext) {
        cx.canvas().fill(self.color);
        cx.present();
        while !self.probe.quit.load(Ordering::SeqCst) {
            if self.probe.launch_child.swap(false, Ordering::SeqCst) {
                let (child, _) = ProbeApp::new("child", Color::BLUE);
                cx.launcher().start_toast("child launched", 1000);
                cx.launcher().run_app(child);
            }
            if cx.redraw_requested() {
                self.probe.redraws.fetch_add(1, Ordering::SeqCst);
                cx.canvas().fill(self.color);
                cx.present();
            }
            cx.delay_ms(1);
        }
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

fn tick_until(mgr: &AppManager, mut cond: impl FnMut(&AppManager) -> bool) -> bool {
    wait_for(|| {
        mgr.tick().unwrap();
        cond(mgr)
    })
}

fn states(mgr: &AppManager) -> Vec<(String, AppState)> {
    mgr.stack().into_iter().map(|a| (a.name, a.state)).collect()
}

fn running_count(mgr: &AppManager) -> usize {
    mgr.stack()
        .iter()
        .filter(|a| a.state == AppState::Running)
        .count()
}

fn with_panel() -> (AppManager, Arc<HostRtos>, MemoryDisplay) {
    let rtos = Arc::new(HostRtos::new());
    let display = MemoryDisplay::new(SCREEN);
    let mgr = AppManager::new(rtos.clone(), Box::new(display.clone()));
    mgr.set_panel(ProbeApp::panel()).unwrap();
    (mgr, rtos, display)
}

// ── Scheduler ──

#[test]
fn launch_onto_panel_only_stack() {
    let (mgr, rtos, _display) = with_panel();
    let (x, _) = ProbeApp::new("x", Color::RED);
    mgr.run_app(x);
    mgr.tick().unwrap();

    assert_eq!(states(&mgr), vec![("x".to_string(), AppState::Running)]);
    rtos.shutdown();
}

#[test]
fn second_launch_suspends_first() {
    let (mgr, rtos, _display) = with_panel();
    let (x, _) = ProbeApp::new("x", Color::RED);
    let (y, _) = ProbeApp::new("y", Color::GREEN);
    mgr.run_app(x);
    mgr.tick().unwrap();
    mgr.run_app(y);
    mgr.tick().unwrap();

    assert_eq!(
        states(&mgr),
        vec![
            ("x".to_string(), AppState::Suspended),
            ("y".to_string(), AppState::Running),
        ]
    );
    assert_eq!(running_count(&mgr), 1);
    rtos.shutdown();
}

#[test]
fn finished_app_is_freed_and_previous_redrawn() {
    let (mgr, rtos, display) = with_panel();
    let (x, px) = ProbeApp::new("x", Color::RED);
    let (y, py) = ProbeApp::new("y", Color::GREEN);
    mgr.run_app(x);
    mgr.tick().unwrap();
    mgr.run_app(y);
    assert!(tick_until(&mgr, |_| display.pixel(1, 10)
        == Some(Color::GREEN.to_rgb565())));

    let redraws_before = px.redraws.load(Ordering::SeqCst);
    py.quit.store(true, Ordering::SeqCst);
    assert!(tick_until(&mgr, |m| m.app_count() == 1));

    assert_eq!(states(&mgr), vec![("x".to_string(), AppState::Running)]);
    assert!(tick_until(&mgr, |_| px.redraws.load(Ordering::SeqCst) > redraws_before));
    assert!(tick_until(&mgr, |_| display.pixel(1, 10) == Some(Color::RED.to_rgb565())));
    // panel + x
    assert_eq!(rtos.live_tasks(), 2);
    rtos.shutdown();
}

#[test]
fn last_app_exit_takes_fatal_path() {
    let rtos = Arc::new(HostRtos::new());
    let halted = Arc::new(Mutex::new(None::<String>));
    let hook_seen = halted.clone();
    let mgr = AppManager::new(rtos.clone(), Box::new(MemoryDisplay::new(SCREEN)))
        .with_halt_hook(move |reason| *hook_seen.lock().unwrap() = Some(reason.to_string()));

    let (x, px) = ProbeApp::new("x", Color::RED);
    mgr.run_app(x);
    mgr.tick().unwrap();
    px.quit.store(true, Ordering::SeqCst);

    let mut result = Ok(());
    assert!(wait_for(|| {
        result = mgr.tick();
        result.is_err()
    }));
    assert_eq!(result, Err(FatalError::EmptyAppStack));
    assert_eq!(
        halted.lock().unwrap().as_deref(),
        Some("application stack is empty")
    );
    assert_eq!(mgr.app_count(), 0);
    rtos.shutdown();
}

#[test]
fn launch_from_app_task_is_deferred() {
    let (mgr, rtos, _display) = with_panel();
    let (x, px) = ProbeApp::new("x", Color::RED);
    mgr.run_app(x);
    mgr.tick().unwrap();

    px.launch_child.store(true, Ordering::SeqCst);
    assert!(wait_for(|| mgr.pending_launches() == 1));
    // the request sits in the queue until the scheduler applies it
    assert_eq!(mgr.app_count(), 1);
    assert_eq!(running_count(&mgr), 1);

    mgr.tick().unwrap();
    assert_eq!(
        states(&mgr),
        vec![
            ("x".to_string(), AppState::Suspended),
            ("child".to_string(), AppState::Running),
        ]
    );
    assert_eq!(mgr.toast_message().as_deref(), Some("child launched"));
    rtos.shutdown();
}

#[test]
fn exactly_one_running_through_push_and_pop() {
    let (mgr, rtos, _display) = with_panel();
    let mut probes = Vec::new();
    for name in ["a", "b", "c"] {
        let (app, probe) = ProbeApp::new(name, Color::RED);
        probes.push(probe);
        mgr.run_app(app);
        mgr.tick().unwrap();
        assert_eq!(running_count(&mgr), 1);
    }
    for probe in probes.iter().skip(1).rev() {
        let before = mgr.app_count();
        probe.quit.store(true, Ordering::SeqCst);
        assert!(tick_until(&mgr, |m| m.app_count() == before - 1));
        assert_eq!(running_count(&mgr), 1);
    }
    assert_eq!(mgr.foreground().map(|a| a.name), Some("a".into()));
    rtos.shutdown();
}

#[test]
fn toast_window_follows_the_clock() {
    let (rtos, clock) = HostRtos::with_manual_clock();
    let rtos = Arc::new(rtos);
    let display = MemoryDisplay::new(SCREEN);
    let mgr = AppManager::new(rtos.clone(), Box::new(display.clone()));
    let (x, px) = ProbeApp::new("x", Color::RED);
    mgr.run_app(x);
    assert!(tick_until(&mgr, |_| display.blit_count() > 0));

    mgr.start_toast("saved", 2000);
    let blits = display.blit_count();
    mgr.tick().unwrap();
    assert!(display.blit_count() > blits);
    assert_eq!(mgr.toast_message().as_deref(), Some("saved"));

    clock.advance(1999);
    mgr.tick().unwrap();
    assert_eq!(mgr.toast_message().as_deref(), Some("saved"));

    let redraws = px.redraws.load(Ordering::SeqCst);
    clock.advance(1);
    mgr.tick().unwrap();
    assert_eq!(mgr.toast_message(), None);
    assert!(wait_for(|| px.redraws.load(Ordering::SeqCst) > redraws));
    rtos.shutdown();
}

// ── Audio ──

/// Default outputs that never accept a frame and log their lifecycle.
#[derive(Clone, Default)]
struct LoggingHardware {
    events: Arc<Mutex<Vec<String>>>,
    next: Arc<AtomicUsize>,
}

struct LoggingOutput {
    id: usize,
    events: Arc<Mutex<Vec<String>>>,
}

impl AudioOutput for LoggingOutput {
    fn begin(&mut self, _format: AudioFormat) -> bool {
        self.events.lock().unwrap().push(format!("begin {}", self.id));
        true
    }

    fn consume(&mut self, _frame: [i16; 2]) -> bool {
        false
    }

    fn set_gain(&mut self, _gain: f32) {}

    fn stop(&mut self) {
        self.events.lock().unwrap().push(format!("stop {}", self.id));
    }
}

impl Drop for LoggingOutput {
    fn drop(&mut self) {
        self.events.lock().unwrap().push(format!("drop {}", self.id));
    }
}

impl AudioHardware for LoggingHardware {
    fn default_output(&self) -> Box<dyn AudioOutput> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        Box::new(LoggingOutput {
            id,
            events: self.events.clone(),
        })
    }
}

fn tone() -> Arc<Sound> {
    let samples = vec![500i16; 4_000];
    Arc::new(Sound::new(encode_pcm16(8_000, 1, &samples), SoundKind::Wav))
}

#[test]
fn replacing_a_session_frees_the_old_one_first() {
    let rtos = Arc::new(HostRtos::new());
    let hw = LoggingHardware::default();
    let player = AudioPlayer::new(rtos.clone(), Arc::new(hw.clone()));

    player.play(tone(), None).unwrap();
    let first_task = player.task().unwrap();
    player.play(tone(), None).unwrap();

    assert!(!rtos.is_alive(first_task));
    assert_eq!(rtos.live_tasks(), 1);
    assert_eq!(
        *hw.events.lock().unwrap(),
        vec!["begin 0", "stop 0", "drop 0", "begin 1"]
    );

    player.stop();
    assert_eq!(rtos.live_tasks(), 0);
    assert_eq!(player.task(), None);
}

#[test]
fn pause_while_idle_is_ignored() {
    let rtos = Arc::new(HostRtos::new());
    let player = AudioPlayer::new(rtos.clone(), Arc::new(HostAudio::new()));
    player.pause();
    assert!(!player.is_paused());
    player.resume();
    assert!(!player.is_paused());
    assert_eq!(rtos.live_tasks(), 0);
}

#[test]
fn stop_is_idempotent() {
    let rtos = Arc::new(HostRtos::new());
    let player = AudioPlayer::new(rtos, Arc::new(LoggingHardware::default()));
    player.play(tone(), None).unwrap();
    player.stop();
    let start = Instant::now();
    player.stop();
    player.stop();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(!player.is_playing());
}

#[test]
fn gain_round_trip_clamps() {
    let rtos = Arc::new(HostRtos::new());
    let player = AudioPlayer::new(rtos, Arc::new(HostAudio::new()));
    for (set, want) in [(0.0, 0.0), (2.0, 2.0), (4.0, 4.0), (12.0, 4.0), (-3.0, 0.0)] {
        player.set_gain(set);
        assert_eq!(player.gain(), want);
    }
}

// ── System ──

#[test]
fn system_boot_and_shared_audio() {
    let rtos = Arc::new(HostRtos::new());
    let display = MemoryDisplay::new(SCREEN);
    let settings = Arc::new(MemorySettings::new());
    let sys = System::new(
        rtos.clone(),
        Box::new(display.clone()),
        settings.clone(),
        Arc::new(LoggingHardware::default()),
    );
    let (home, _) = ProbeApp::new("home", Color::GREEN);
    sys.boot(ProbeApp::panel(), home).unwrap();
    assert!(wait_for(|| {
        sys.tick().unwrap();
        display.blit_count() > 0
    }));

    sys.audio().play(tone(), None).unwrap();
    assert!(sys.audio().is_playing());
    sys.audio().stop();
    assert!(!sys.audio().is_playing());

    let names = rtos.task_names();
    assert!(names.contains(&"home".to_string()));
    assert!(names.contains(&"panel".to_string()));
    assert!(!names.contains(&"audio".to_string()));
    rtos.shutdown();
}
