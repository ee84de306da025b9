pub mod addon;
pub mod config;
