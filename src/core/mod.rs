pub mod config;
pub mod dvfs;
pub mod hw;
