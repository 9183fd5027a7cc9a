pub mod bridge;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod gate;
pub mod log;
pub mod save;
pub mod script;
pub mod session;
pub mod world;
