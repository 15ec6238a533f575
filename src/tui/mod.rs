//! Terminal UI: render loop, input handling, focus order.

pub mod app;
pub mod event;
pub mod focus;
pub mod render;
pub mod style;

pub use app::App;
pub use focus::{FocusCycle, HEADER_ID, build_focus_order};
