// Library surface for the binary and the headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod cue;
pub mod error;
pub mod history;
pub mod input;
pub mod logging;
pub mod runtime;
pub mod scheduler;
pub mod ui;
pub mod wake_lock;

pub use app::{App, AppState, Preset};
