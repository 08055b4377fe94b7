//! Applications
//!
//! - `application`: the `Application` trait, `AppConfig` and `AppState`
//! - `flags`: compositing flags
//! - `context`: what an application task sees of the system
//! - `manager`: the stack scheduler and its `Launcher` handle
//! - `compositor`: panel/foreground compositing and the toast overlay

pub mod application;
pub mod compositor;
pub mod context;
pub mod flags;
pub mod manager;

mod slot;

pub use application::{AppConfig, AppState, Application};
pub use compositor::ToastStyle;
pub use context::AppContext;
pub use flags::AppFlags;
pub use manager::{AppInfo, AppManager, HaltHook, Launcher};
