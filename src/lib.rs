//! hostpulse - Live host telemetry dashboard library.
//!
//! Provides:
//! - `config` — layout/theme configuration and startup validation
//! - `state` — shared per-domain sample cells written by sampling tasks
//! - `collector` — built-in metric collectors (CPU, memory, disk, ...)
//! - `plugin` — extension registry and the plugin capability trait
//! - `runtime` — per-widget task scheduler and redraw coalescing
//! - `tui` — terminal rendering, input handling, focus order
//! - `export` — snapshot assembly and CSV/JSON export
//! - `util` — shared formatting helpers and the clock seam

pub mod collector;
pub mod config;
pub mod export;
pub mod plugin;
pub mod runtime;
pub mod state;
pub mod tui;
pub mod util;

/// Crate version, surfaced in the CLI and the header widget.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
