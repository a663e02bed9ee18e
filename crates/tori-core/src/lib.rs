pub mod block;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod progress;
pub mod rules;
pub mod scanner;
pub mod storage;
pub mod updater;

pub use config::AppConfig;
pub use engine::{SyncEngine, SyncStage};
pub use error::Error;
pub use progress::{SilentReporter, SyncReporter};
