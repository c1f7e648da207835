pub mod config;
pub mod ipc;
pub mod run;
pub mod state;
mod tick;
pub mod watcher;
