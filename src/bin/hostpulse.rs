//! hostpulse - Live host telemetry dashboard.
//!
//! Samples CPU, memory, disk, network, GPU, temperature, battery and
//! process metrics on independent per-widget cadences and renders them in
//! a terminal grid. Third-party plugins contribute widgets via
//! `plugins.json`.
//!
//! Usage:
//!   hostpulse                      # defaults, config.json if present
//!   hostpulse -c mytheme.json      # custom layout/theme
//!   hostpulse --plugins p.json -v  # custom plugin set, debug logging

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hostpulse::collector::builtin_collector;
use hostpulse::config;
use hostpulse::export;
use hostpulse::plugin::{self, PluginRegistry, PluginState, load_plugin_config};
use hostpulse::runtime::{RenderGate, SchedulerConfig, TaskScheduler, UpdateJob, WidgetJob};
use hostpulse::state::SharedState;
use hostpulse::tui::App;

/// Live host telemetry dashboard.
#[derive(Parser)]
#[command(name = "hostpulse", about = "Live host telemetry dashboard", version)]
struct Args {
    /// Path to the dashboard config. Missing file = built-in defaults.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Path to the plugin config. Missing file = no plugins.
    #[arg(long, default_value = "plugins.json")]
    plugins: PathBuf,

    /// Cap applied to plugin update intervals, in seconds.
    #[arg(long, default_value = "5", value_name = "SECS")]
    plugin_cadence_cap: u64,

    /// Log file. The TUI owns the terminal, so logs go to a file.
    #[arg(long, default_value = "hostpulse.log")]
    log_file: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let default_filter = if args.quiet {
        "hostpulse=error"
    } else {
        match args.verbose {
            0 => "hostpulse=info",
            1 => "hostpulse=debug",
            _ => "hostpulse=trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.parse().unwrap());

    match std::fs::File::create(&args.log_file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {}", args.log_file.display(), e);
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    // fail fast on a broken layout before anything starts
    let theme = match config::load_theme(&args.config) {
        Ok(theme) => theme,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            process::exit(1);
        }
    };
    let plugin_config = match load_plugin_config(&args.plugins) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("plugin configuration error: {}", e);
            process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async_main(args, theme, plugin_config));
}

async fn async_main(args: Args, theme: config::Theme, plugin_config: plugin::PluginSystemConfig) {
    info!(version = hostpulse::VERSION, "starting");

    let state = Arc::new(SharedState::new());
    let registry = Arc::new(PluginRegistry::new(theme.layout.rows, theme.layout.columns));
    plugin::bootstrap(&registry, &plugin_config);

    let slots = theme.layout.slots();
    let mut jobs = Vec::new();
    for slot in slots.iter().filter(|s| s.enabled) {
        match builtin_collector(&slot.id) {
            Some(collector) => jobs.push(WidgetJob {
                id: slot.id.clone(),
                cadence: slot.cadence,
                job: UpdateJob::Builtin(collector),
            }),
            None => warn!(widget = %slot.id, "no collector for widget"),
        }
    }
    for plugin_info in registry.info() {
        if plugin_info.state == PluginState::Active {
            jobs.push(WidgetJob {
                id: plugin_info.identity.name.clone(),
                cadence: plugin_info.config.layout.update_interval,
                job: UpdateJob::Plugin {
                    name: plugin_info.identity.name.clone(),
                    registry: registry.clone(),
                },
            });
        }
    }
    info!(tasks = jobs.len(), "starting sampling tasks");

    let (gate, redraws) = RenderGate::new();
    let token = CancellationToken::new();
    let scheduler = TaskScheduler::start(
        jobs,
        state.clone(),
        gate,
        token,
        SchedulerConfig {
            plugin_cadence_cap: args.plugin_cadence_cap,
        },
    );

    let app = App::new(theme.clone(), slots, state.clone(), registry.clone());
    if let Err(e) = app.run(redraws).await {
        error!(error = %e, "terminal error");
    }

    // ordered shutdown: cancel and join every sampling task first, so the
    // final export never reads a cell mid-write and teardown never races a
    // plugin's own update
    scheduler.shutdown().await;

    if theme.export.enabled {
        match export::write_all(&theme.export, &state, &registry) {
            Ok(paths) => info!(files = paths.len(), "final export written"),
            Err(e) => warn!(error = %e, "final export failed"),
        }
    }

    registry.unload_all();
    info!("shutdown complete");
}
