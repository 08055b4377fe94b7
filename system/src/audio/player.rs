//! Audio Player
//!
//! Owns at most one playback session and the task that drives it. The
//! owning context controls the task only through the command queue:
//!
//! ```text
//!  play/pause/resume/set_gain/stop
//!        │
//!        ▼
//!  [Stop|Pause|Resume|SetGain] ──► playback task ──step──► Generator ──► Sink
//!                                       │
//!                   end of stream/Stop ─┴─► hand session back, finished=true, park
//! ```
//!
//! The task owns its session while it plays; no lock is held across a
//! decode step. Teardown: post `Stop`, wait up to `stop_timeout_ms` for
//! `finished`, delete the task from the caller's context, and only then
//! stop and drop the handed-back generator, source and (owned) sink.

use alloc::boxed::Box;
use alloc::sync::Arc;

use pocket_hal::{AudioHardware, BoundedQueue, CoreAffinity, Rtos, Settings, TaskHandle, TaskSpec};
use spin::Mutex;

use super::generator::{BuiltinDecoders, Decoders, Session, SharedOutput, Sink, Step};
use super::sound::Sound;
use super::source::BufferSource;
use crate::config::{
    AUDIO_COMMAND_QUEUE_DEPTH, AUDIO_IDLE_DELAY_MS, AUDIO_NAMESPACE, AUDIO_STACK_SIZE,
    AUDIO_STOP_POLL_MS, AUDIO_STOP_TIMEOUT_MS, AUDIO_TASK_CORE, AUDIO_TASK_PRIORITY, DEFAULT_GAIN,
    GAIN_KEY, MAX_GAIN, MIN_GAIN, QUEUE_SEND_ATTEMPTS,
};
use crate::error::AudioError;

// ── Configuration ───────────────────────────────────────────

/// Playback engine parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub stack_size: usize,
    pub priority: u8,
    pub core: CoreAffinity,
    pub queue_depth: usize,
    pub stop_timeout_ms: u32,
    pub stop_poll_ms: u32,
    /// Gain of the first session when nothing is persisted.
    pub default_gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            stack_size: AUDIO_STACK_SIZE,
            priority: AUDIO_TASK_PRIORITY,
            core: AUDIO_TASK_CORE,
            queue_depth: AUDIO_COMMAND_QUEUE_DEPTH,
            stop_timeout_ms: AUDIO_STOP_TIMEOUT_MS,
            stop_poll_ms: AUDIO_STOP_POLL_MS,
            default_gain: DEFAULT_GAIN,
        }
    }
}

// ── Shared state ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Stop,
    Pause,
    Resume,
    SetGain(f32),
}

/// State shared with the playback task. Held only for short reads and
/// writes, never across a decode step or a wait.
struct State {
    playing: bool,
    paused: bool,
    finished: bool,
    gain: f32,
    /// Bumped by every teardown. A task only acts on the state of the
    /// session it was spawned for.
    session_id: u32,
    task: Option<TaskHandle>,
    playing_sound: Option<Arc<Sound>>,
}

impl State {
    fn clear_session(&mut self) {
        self.playing = false;
        self.paused = false;
        self.finished = false;
        self.task = None;
        self.playing_sound = None;
    }
}

fn clamp_gain(value: f32) -> f32 {
    if value.is_nan() {
        MIN_GAIN
    } else {
        value.clamp(MIN_GAIN, MAX_GAIN)
    }
}

// ── Player ──────────────────────────────────────────────────

/// Asynchronous playback engine.
pub struct AudioPlayer {
    rtos: Arc<dyn Rtos>,
    hardware: Arc<dyn AudioHardware>,
    decoders: Box<dyn Decoders>,
    settings: Option<Arc<dyn Settings>>,
    config: AudioConfig,
    state: Arc<Mutex<State>>,
    commands: Arc<BoundedQueue<Command>>,
    /// Hand-over slot: filled by `play` for the task to take, filled by the
    /// task again when it finishes.
    session: Arc<Mutex<Option<Session>>>,
    /// Serialises `play` and `stop` callers. Readers never take it.
    control: Mutex<()>,
}

impl AudioPlayer {
    pub fn new(rtos: Arc<dyn Rtos>, hardware: Arc<dyn AudioHardware>) -> Self {
        Self::with_config(rtos, hardware, AudioConfig::default())
    }

    pub fn with_config(rtos: Arc<dyn Rtos>, hardware: Arc<dyn AudioHardware>, config: AudioConfig) -> Self {
        Self {
            rtos,
            hardware,
            decoders: Box::new(BuiltinDecoders),
            settings: None,
            state: Arc::new(Mutex::new(State {
                playing: false,
                paused: false,
                finished: false,
                gain: clamp_gain(config.default_gain),
                session_id: 0,
                task: None,
                playing_sound: None,
            })),
            commands: Arc::new(BoundedQueue::new(config.queue_depth)),
            session: Arc::new(Mutex::new(None)),
            control: Mutex::new(()),
            config,
        }
    }

    /// Persist gain in `settings` and start from the persisted value.
    pub fn with_settings(mut self, settings: Arc<dyn Settings>) -> Self {
        let default_pct = (self.config.default_gain * 100.0) as i32;
        let pct = settings.get_int(AUDIO_NAMESPACE, GAIN_KEY, default_pct);
        self.state.lock().gain = clamp_gain(pct as f32 / 100.0);
        self.settings = Some(settings);
        self
    }

    /// Replace the built-in decoders.
    pub fn with_decoders(mut self, decoders: Box<dyn Decoders>) -> Self {
        self.decoders = decoders;
        self
    }

    /// Start playing `sound`, replacing any current session.
    ///
    /// Plays to `output` if given (not owned), else to a fresh default
    /// output. An unsupported kind fails before anything is torn down.
    pub fn play(&self, sound: Arc<Sound>, output: Option<SharedOutput>) -> Result<(), AudioError> {
        let generator = self
            .decoders
            .generator(sound.kind())
            .ok_or(AudioError::UnsupportedFormat(sound.kind()))?;

        let _serial = self.control.lock();
        self.teardown();

        let sink = match output {
            Some(shared) => Sink::Shared(shared),
            None => Sink::Owned(self.hardware.default_output()),
        };
        let mut session = Session::new(generator, BufferSource::new(sound.clone()), sink);
        session.begin()?;
        let gain = self.state.lock().gain;
        session.set_gain(gain);
        *self.session.lock() = Some(session);

        let session_id = {
            let mut st = self.state.lock();
            st.playing = true;
            st.paused = false;
            st.finished = false;
            st.playing_sound = Some(sound.clone());
            st.session_id
        };

        let spec = TaskSpec::new("audio")
            .stack_size(self.config.stack_size)
            .priority(self.config.priority)
            .core(self.config.core);
        match self.rtos.spawn(&spec, self.task_entry(session_id)) {
            Ok(task) => {
                log::info!("[Audio] Playing {} ({} bytes) on {}", sound.kind(), sound.size(), task);
                self.state.lock().task = Some(task);
                Ok(())
            }
            Err(e) => {
                log::error!("[Audio] {}", e);
                if let Some(mut session) = self.session.lock().take() {
                    session.stop();
                }
                self.state.lock().clear_session();
                Err(AudioError::SpawnFailed(e))
            }
        }
    }

    /// Pause a playing, unpaused session.
    pub fn pause(&self) {
        let post = {
            let st = self.state.lock();
            st.playing && !st.paused
        };
        if post {
            self.post(Command::Pause);
        }
    }

    /// Resume a paused session.
    pub fn resume(&self) {
        let post = {
            let st = self.state.lock();
            st.playing && st.paused
        };
        if post {
            self.post(Command::Resume);
        }
    }

    /// Set the output gain, clamped to `[0, 4]`. Applied to the sink by the
    /// playback task.
    pub fn set_gain(&self, value: f32) {
        let gain = clamp_gain(value);
        let playing = {
            let mut st = self.state.lock();
            st.gain = gain;
            st.playing
        };
        if playing {
            self.post(Command::SetGain(gain));
        }
        if let Some(settings) = &self.settings {
            let pct = (gain * 100.0 + 0.5) as i32;
            if let Err(e) = settings.set_int(AUDIO_NAMESPACE, GAIN_KEY, pct) {
                log::warn!("[Audio] gain not persisted: {}", e);
            }
        }
    }

    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }

    /// Tear down the current session. Returns at once if nothing plays.
    pub fn stop(&self) {
        let _serial = self.control.lock();
        self.teardown();
    }

    /// Final teardown at shutdown.
    pub fn shutdown(&self) {
        self.stop();
        self.commands.clear();
        log::debug!("[Audio] Shut down");
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// The sound of the current session.
    pub fn playing_sound(&self) -> Option<Arc<Sound>> {
        self.state.lock().playing_sound.clone()
    }

    /// Playback task handle, if a session exists.
    pub fn task(&self) -> Option<TaskHandle> {
        self.state.lock().task
    }

    // ── Internals ──

    fn post(&self, command: Command) {
        if self
            .commands
            .send(command, self.rtos.as_ref(), QUEUE_SEND_ATTEMPTS)
            .is_err()
        {
            log::warn!("[Audio] command queue full, dropped {:?}", command);
        }
    }

    /// Caller holds `control`.
    fn teardown(&self) {
        let task = self.state.lock().task;
        if let Some(task) = task {
            if !self.is_finished() {
                self.post(Command::Stop);
                let poll = self.config.stop_poll_ms.max(1);
                let mut waited = 0;
                while !self.is_finished() && waited < self.config.stop_timeout_ms {
                    self.rtos.delay_ms(poll);
                    waited += poll;
                }
            }

            // From here on the task can no longer hand its session back or
            // touch the state.
            let finished = {
                let mut st = self.state.lock();
                st.session_id = st.session_id.wrapping_add(1);
                st.finished
            };
            if !finished {
                log::warn!(
                    "[Audio] task did not stop within {} ms, deleting",
                    self.config.stop_timeout_ms
                );
            }
            self.rtos.delete(task);
            log::debug!("[Audio] Task {} deleted", task);
        }

        // Still in the slot if the task finished or never picked it up.
        if let Some(mut session) = self.session.lock().take() {
            session.stop();
        }
        self.state.lock().clear_session();
        self.commands.clear();
    }

    fn task_entry(&self, session_id: u32) -> Box<dyn FnOnce() + Send> {
        let rtos = self.rtos.clone();
        let state = self.state.clone();
        let commands = self.commands.clone();
        let slot = self.session.clone();

        Box::new(move || {
            let taken = {
                let st = state.lock();
                if st.session_id == session_id {
                    slot.lock().take()
                } else {
                    None
                }
            };
            let Some(mut session) = taken else {
                finish(&state, &slot, None, session_id, rtos.as_ref());
            };

            loop {
                match commands.try_recv() {
                    Some(Command::Stop) => {
                        finish(&state, &slot, Some(session), session_id, rtos.as_ref())
                    }
                    Some(Command::Pause) => set_paused(&state, session_id, true),
                    Some(Command::Resume) => set_paused(&state, session_id, false),
                    Some(Command::SetGain(gain)) => session.set_gain(gain),
                    None => {}
                }

                if state.lock().paused {
                    rtos.delay_ms(AUDIO_IDLE_DELAY_MS);
                    continue;
                }

                match session.step() {
                    Step::Done => {
                        log::debug!("[Audio] End of stream");
                        finish(&state, &slot, Some(session), session_id, rtos.as_ref());
                    }
                    Step::Blocked => rtos.delay_ms(AUDIO_IDLE_DELAY_MS),
                    Step::Continue => rtos.yield_now(),
                }
            }
        })
    }
}

fn set_paused(state: &Mutex<State>, session_id: u32, paused: bool) {
    let mut st = state.lock();
    if st.session_id == session_id {
        st.paused = paused;
    }
}

/// Hand the session back, mark it finished and wait to be deleted.
fn finish(
    state: &Mutex<State>,
    slot: &Mutex<Option<Session>>,
    mut session: Option<Session>,
    session_id: u32,
    rtos: &dyn Rtos,
) -> ! {
    {
        let mut st = state.lock();
        if st.session_id == session_id {
            *slot.lock() = session.take();
            st.playing = false;
            st.finished = true;
        }
    }
    // a session whose teardown already moved on is released here
    drop(session);
    loop {
        rtos.park();
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::generator::Generator;
    use crate::audio::sound::SoundKind;
    use crate::audio::wav::encode_pcm16;
    use pocket_hal::AudioOutput;
    use pocket_hal::host::{HostAudio, HostRtos, RecordingOutput};
    use pocket_hal::MemorySettings;
    use std::time::{Duration, Instant};

    fn player() -> (AudioPlayer, Arc<HostRtos>, HostAudio) {
        let rtos = Arc::new(HostRtos::new());
        let hw = HostAudio::realtime();
        let p = AudioPlayer::new(rtos.clone(), Arc::new(hw.clone()));
        (p, rtos, hw)
    }

    fn tone(seconds: u32) -> Arc<Sound> {
        let samples = vec![1000i16; (8_000 * seconds) as usize];
        Arc::new(Sound::new(encode_pcm16(8_000, 1, &samples), SoundKind::Wav))
    }

    /// Decoder whose every step blocks the task for two seconds without
    /// reaching a scheduling point.
    struct Stalling;

    impl Generator for Stalling {
        fn begin(&mut self, _: &mut BufferSource, _: &mut dyn AudioOutput) -> Result<(), AudioError> {
            Ok(())
        }

        fn step(&mut self, _: &mut BufferSource, _: &mut dyn AudioOutput) -> Step {
            std::thread::sleep(Duration::from_millis(2_000));
            Step::Continue
        }
    }

    struct StallingDecoders;

    impl Decoders for StallingDecoders {
        fn generator(&self, _: SoundKind) -> Option<Box<dyn Generator>> {
            Some(Box::new(Stalling))
        }
    }

    fn stalling_player(config: AudioConfig) -> (AudioPlayer, Arc<HostRtos>) {
        let rtos = Arc::new(HostRtos::new());
        let p = AudioPlayer::with_config(rtos.clone(), Arc::new(HostAudio::new()), config)
            .with_decoders(Box::new(StallingDecoders));
        (p, rtos)
    }

    fn module() -> Arc<Sound> {
        Arc::new(Sound::new(vec![0; 64], SoundKind::Mod))
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

    #[test]
    fn gain_is_clamped() {
        let (p, _rtos, _hw) = player();
        p.set_gain(9.0);
        assert_eq!(p.gain(), 4.0);
        p.set_gain(-1.0);
        assert_eq!(p.gain(), 0.0);
        p.set_gain(1.25);
        assert_eq!(p.gain(), 1.25);
        p.set_gain(f32::NAN);
        assert_eq!(p.gain(), 0.0);
    }

    #[test]
    fn gain_is_persisted_in_percent() {
        let rtos = Arc::new(HostRtos::new());
        let settings = Arc::new(MemorySettings::new());
        let p = AudioPlayer::new(rtos.clone(), Arc::new(HostAudio::new()))
            .with_settings(settings.clone());
        p.set_gain(2.5);
        assert_eq!(settings.get_int("audio", "gain", 0), 250);

        let again = AudioPlayer::new(rtos, Arc::new(HostAudio::new())).with_settings(settings);
        assert_eq!(again.gain(), 2.5);
    }

    #[test]
    fn stop_when_idle_is_prompt() {
        let (p, _rtos, _hw) = player();
        let start = Instant::now();
        p.stop();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!p.is_playing());
    }

    #[test]
    fn unsupported_kind_leaves_session_alone() {
        let (p, rtos, _hw) = player();
        let a = tone(5);
        p.play(a.clone(), None).unwrap();
        let mp3 = Arc::new(Sound::new(vec![0xFF, 0xFB], SoundKind::Mp3));
        assert_eq!(
            p.play(mp3, None),
            Err(AudioError::UnsupportedFormat(SoundKind::Mp3))
        );
        assert!(p.is_playing());
        assert!(p.playing_sound().is_some_and(|s| Arc::ptr_eq(&s, &a)));
        assert_eq!(rtos.live_tasks(), 1);
        p.stop();
    }

    #[test]
    fn playback_applies_gain_and_finishes() {
        let rtos = Arc::new(HostRtos::new());
        let hw = HostAudio::new();
        let p = AudioPlayer::new(rtos.clone(), Arc::new(hw.clone()));
        p.set_gain(0.5);
        p.play(tone(1), None).unwrap();
        assert!(wait_for(|| p.is_finished()));
        assert!(!p.is_playing());

        let out = hw.last_output().unwrap();
        assert_eq!(out.gain(), Some(0.5));
        assert_eq!(out.frames(), 8_000);

        p.stop();
        assert!(out.is_released());
        assert!(out.is_stopped());
        assert_eq!(rtos.live_tasks(), 0);
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let (p, _rtos, hw) = player();
        p.play(tone(5), None).unwrap();
        p.pause();
        assert!(wait_for(|| p.is_paused()));
        let out = hw.last_output().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let frozen = out.frames();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(out.frames(), frozen);

        p.resume();
        assert!(wait_for(|| !p.is_paused()));
        assert!(wait_for(|| out.frames() > frozen));
        p.stop();
    }

    #[test]
    fn gain_change_reaches_running_sink() {
        let (p, _rtos, hw) = player();
        p.play(tone(5), None).unwrap();
        p.set_gain(3.0);
        let out = hw.last_output().unwrap();
        assert!(wait_for(|| out.gain() == Some(3.0)));
        p.stop();
    }

    #[test]
    fn shared_output_is_not_released() {
        let (p, rtos, hw) = player();
        let rec = RecordingOutput::realtime();
        let shared = SharedOutput::new(rec.clone().into_sink());
        p.play(tone(5), Some(shared.clone())).unwrap();
        assert!(wait_for(|| rec.frames() > 0));
        p.stop();
        assert!(!rec.is_released());
        assert!(hw.outputs().is_empty());
        assert_eq!(rtos.live_tasks(), 0);
    }

    #[test]
    fn drop_tears_down() {
        let (p, rtos, hw) = player();
        p.play(tone(5), None).unwrap();
        drop(p);
        assert_eq!(rtos.live_tasks(), 0);
        assert!(hw.last_output().unwrap().is_released());
    }

    #[test]
    fn stop_is_bounded_while_a_step_is_running() {
        let (p, rtos) = stalling_player(AudioConfig::default());
        p.play(module(), None).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        p.stop();
        assert!(start.elapsed() < Duration::from_millis(1_500));
        assert!(!p.is_playing());
        assert_eq!(p.task(), None);
        assert_eq!(p.playing_sound(), None);
        assert_eq!(rtos.live_tasks(), 0);
    }

    #[test]
    fn readers_do_not_wait_for_teardown() {
        let config = AudioConfig {
            stop_timeout_ms: 300,
            ..AudioConfig::default()
        };
        let (p, _rtos) = stalling_player(config);
        let sound = module();
        p.play(sound.clone(), None).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        std::thread::scope(|scope| {
            scope.spawn(|| p.stop());
            std::thread::sleep(Duration::from_millis(50));

            let start = Instant::now();
            let current = p.playing_sound();
            let _ = p.task();
            let _ = p.is_playing();
            assert!(start.elapsed() < Duration::from_millis(50));
            assert!(current.is_some_and(|s| Arc::ptr_eq(&s, &sound)));
        });
        assert_eq!(p.playing_sound(), None);
    }

    #[test]
    fn zero_poll_interval_still_times_out() {
        let config = AudioConfig {
            stop_poll_ms: 0,
            stop_timeout_ms: 50,
            ..AudioConfig::default()
        };
        let (p, rtos) = stalling_player(config);
        p.play(module(), None).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        p.stop();
        assert!(start.elapsed() < Duration::from_millis(1_500));
        assert_eq!(rtos.live_tasks(), 0);
    }

    #[test]
    fn malformed_sound_after_playback_leaves_player_idle() {
        let (p, rtos, hw) = player();
        p.play(tone(5), None).unwrap();
        let first = hw.last_output().unwrap();
        assert!(wait_for(|| first.frames() > 0));

        let garbage = Arc::new(Sound::new(b"RIFX not a wave".to_vec(), SoundKind::Wav));
        assert!(matches!(p.play(garbage, None), Err(AudioError::InvalidData(_))));
        assert!(!p.is_playing());
        assert_eq!(p.task(), None);
        assert_eq!(p.playing_sound(), None);
        assert_eq!(rtos.live_tasks(), 0);
        assert!(first.is_stopped());
        assert!(hw.outputs().iter().all(|o| o.is_released()));

        p.play(tone(1), None).unwrap();
        assert!(wait_for(|| p.is_finished()));
    }
}
