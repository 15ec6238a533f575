//! Concurrency runtime: per-widget sampling tasks and redraw coalescing.

mod gate;
mod scheduler;

pub use gate::{RedrawListener, RenderGate};
pub use scheduler::{SchedulerConfig, TaskScheduler, UpdateJob, WidgetJob};
