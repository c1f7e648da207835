mod commands;
mod handlers;
mod server;

pub use commands::Command;
pub use handlers::BANNER;
pub use server::{IpcHandles, start};
