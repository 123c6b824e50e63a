pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::SyncConfig;

pub use adapters::{NavigationClient, SqliteDedupStore, TicketingClient};
pub use app::SyncJob;
pub use core::{SyncEngine, SyncOptions, SyncReport};
pub use domain::model::{SyncMode, SyncRun};
pub use utils::error::{Result, SyncError};
