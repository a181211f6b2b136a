pub mod app_core;
pub mod app_events;
pub mod state;
pub mod ui;

pub use app_core::DreamweaverApp;
