//! System configuration constants.
//!
//! Compile-time limits and defaults for the scheduler, services and the
//! audio engine. Runtime overrides go through `AppConfig`, `AudioConfig`
//! and `ToastStyle`.

use pocket_hal::CoreAffinity;

/// Default stack size for an application task (16 KB).
pub const APP_STACK_SIZE: usize = 16 * 1024;

/// Priority of application tasks.
pub const APP_TASK_PRIORITY: u8 = 1;

/// Depth of each application's input inbox.
pub const INPUT_QUEUE_DEPTH: usize = 16;

/// Default stack size for a service task (8 KB).
pub const SERVICE_STACK_SIZE: usize = 8 * 1024;

/// Priority of service tasks.
pub const SERVICE_TASK_PRIORITY: u8 = 1;

/// Stack size of the playback task (16 KB, decoders keep frame state on it).
pub const AUDIO_STACK_SIZE: usize = 16 * 1024;

/// Playback runs above applications so the sink never starves.
pub const AUDIO_TASK_PRIORITY: u8 = 5;

/// Playback is pinned away from the core running the scheduler.
pub const AUDIO_TASK_CORE: CoreAffinity = CoreAffinity::Core(1);

/// Capacity of the audio command queue.
pub const AUDIO_COMMAND_QUEUE_DEPTH: usize = 8;

/// Upper bound on how long teardown waits for the playback task to stop.
pub const AUDIO_STOP_TIMEOUT_MS: u32 = 500;

/// Poll interval while waiting for the playback task to stop.
pub const AUDIO_STOP_POLL_MS: u32 = 10;

/// Delay while the sink is full or the session is paused.
pub const AUDIO_IDLE_DELAY_MS: u32 = 1;

/// Attempts to enqueue a command before giving up (1 ms apart).
pub const QUEUE_SEND_ATTEMPTS: u32 = 100;

/// Gain used before any gain has been set or persisted.
pub const DEFAULT_GAIN: f32 = 1.0;

/// Gain range accepted by `AudioPlayer::set_gain`.
pub const MIN_GAIN: f32 = 0.0;
pub const MAX_GAIN: f32 = 4.0;

/// Settings namespace of per-service enable flags.
pub const SERVICES_NAMESPACE: &str = "services";

/// Settings namespace and key of the persisted gain (percent).
pub const AUDIO_NAMESPACE: &str = "audio";
pub const GAIN_KEY: &str = "gain";

/// Default toast duration.
pub const TOAST_DURATION_MS: u32 = 2000;

/// Distance between the toast banner and the bottom edge of the screen.
pub const TOAST_MARGIN_BOTTOM: u32 = 8;

/// Padding between the toast text and its banner edge.
pub const TOAST_PADDING: u32 = 3;
