pub mod config;
pub mod delivery;
pub mod journal;
pub mod watcher;
