pub mod status_bar;
pub mod main_panel;
pub mod preferences;
pub mod player;

pub use status_bar::{render_header, render_status_bar};
pub use main_panel::render_main_panel;
