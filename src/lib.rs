pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod console;
pub mod control;
pub mod dispatch;
pub mod fake_remote;
pub mod format;
pub mod http_client;
pub mod remote;
pub mod snapshot;
pub mod spectator;
pub mod store;
pub mod ui;
