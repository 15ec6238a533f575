//! Per-widget sampling tasks.
//!
//! One tokio task per enabled widget, each on its own cadence. Update
//! functions may block, so they run on the blocking pool; a slow update
//! delays only that widget's own next tick. Failures and panics are
//! absorbed at the task boundary and become the widget's "unavailable"
//! state; one faulty collector never takes down the process.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::gate::RenderGate;
use crate::collector::Collector;
use crate::plugin::{PluginRegistry, RegistryError};
use crate::state::SharedState;

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Plugin cadences are capped to this many seconds.
    pub plugin_cadence_cap: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            plugin_cadence_cap: 5,
        }
    }
}

/// The update function behind one widget.
pub enum UpdateJob {
    Builtin(Box<dyn Collector>),
    Plugin {
        name: String,
        registry: Arc<PluginRegistry>,
    },
}

/// One scheduled widget: id, cadence, update function.
pub struct WidgetJob {
    pub id: String,
    pub cadence: i64,
    pub job: UpdateJob,
}

/// Effective period for a job. Non-positive cadences are coerced to the
/// 1 second floor; plugin cadences are additionally capped.
fn effective_cadence(cadence: i64, is_plugin: bool, cap: u64) -> u64 {
    let floor = cadence.max(1) as u64;
    if is_plugin { floor.min(cap.max(1)) } else { floor }
}

/// Runs the sampling tasks until shutdown.
pub struct TaskScheduler {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl TaskScheduler {
    /// Spawns one task per job and returns immediately.
    pub fn start(
        jobs: Vec<WidgetJob>,
        state: Arc<SharedState>,
        gate: RenderGate,
        token: CancellationToken,
        config: SchedulerConfig,
    ) -> Self {
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let state = state.clone();
            let gate = gate.clone();
            let task_token = token.clone();
            handles.push(tokio::spawn(async move {
                run_widget_task(job, state, gate, task_token, config).await;
            }));
        }
        Self { token, handles }
    }

    /// Broadcasts cancellation and awaits every task's exit. Callers must
    /// not read the shared state for a final export until this returns, or
    /// they risk observing a cell mid-write; plugin teardown likewise runs
    /// only after the join.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_widget_task(
    job: WidgetJob,
    state: Arc<SharedState>,
    gate: RenderGate,
    token: CancellationToken,
    config: SchedulerConfig,
) {
    let is_plugin = matches!(job.job, UpdateJob::Plugin { .. });
    let period = effective_cadence(job.cadence, is_plugin, config.plugin_cadence_cap);

    let mut ticker = tokio::time::interval(Duration::from_secs(period));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // a panic poisons the mutex; the next tick clears it and keeps going
    let runner = match job.job {
        UpdateJob::Builtin(collector) => Runner::Builtin(Arc::new(Mutex::new(collector))),
        UpdateJob::Plugin { name, registry } => Runner::Plugin { name, registry },
    };

    debug!(widget = %job.id, period_secs = period, "sampling task started");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            // the first tick completes immediately, giving the initial update
            _ = ticker.tick() => {
                let drew = match &runner {
                    Runner::Builtin(collector) => {
                        run_builtin_once(&job.id, collector, &state).await;
                        true
                    }
                    Runner::Plugin { name, registry } => {
                        run_plugin_once(name, registry).await
                    }
                };
                if drew {
                    gate.request_redraw();
                }
            }
        }
    }
    debug!(widget = %job.id, "sampling task stopped");
}

enum Runner {
    Builtin(Arc<Mutex<Box<dyn Collector>>>),
    Plugin {
        name: String,
        registry: Arc<PluginRegistry>,
    },
}

/// One built-in update through the blocking pool, with the failure
/// contract applied at the boundary.
async fn run_builtin_once(
    id: &str,
    collector: &Arc<Mutex<Box<dyn Collector>>>,
    state: &Arc<SharedState>,
) {
    let collector = collector.clone();
    let task_state = state.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = collector.lock().unwrap_or_else(|p| p.into_inner());
        guard.collect(&task_state)
    })
    .await;

    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!(widget = id, error = %e, "update failed");
            state.mark_unavailable(id, &e.to_string());
        }
        Err(e) if e.is_panic() => {
            warn!(widget = id, "update function panicked");
            state.mark_unavailable(id, "update panicked");
        }
        Err(_) => {}
    }
}

/// One plugin update. Disabled or widgetless plugins skip the tick; an
/// unloaded plugin keeps the task alive in case it is loaded again.
/// Returns whether an update actually ran.
async fn run_plugin_once(name: &str, registry: &Arc<PluginRegistry>) -> bool {
    let (plugin, widget) = match registry.update_target(name) {
        Ok(target) => target,
        Err(RegistryError::Disabled(_)) | Err(RegistryError::NoWidget(_)) => return false,
        Err(e) => {
            debug!(plugin = name, error = %e, "skipping update");
            return false;
        }
    };

    let task_widget = widget.clone();
    let joined = tokio::task::spawn_blocking(move || plugin.update_widget(&task_widget)).await;

    match joined {
        Ok(Ok(())) => registry.touch(name),
        Ok(Err(e)) => {
            debug!(plugin = name, error = %e, "update failed");
            widget.mark_unavailable(e.to_string());
        }
        Err(e) if e.is_panic() => {
            warn!(plugin = name, "update function panicked");
            widget.mark_unavailable("update panicked");
        }
        Err(_) => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectError;
    use crate::plugin::registry::tests::StubPlugin;
    use crate::state::{CellStatus, LoadSample};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    #[test]
    fn test_effective_cadence_floor_and_cap() {
        // builtin: floor only
        assert_eq!(effective_cadence(0, false, 5), 1);
        assert_eq!(effective_cadence(-3, false, 5), 1);
        assert_eq!(effective_cadence(60, false, 5), 60);
        // plugin: floor and cap
        assert_eq!(effective_cadence(0, true, 5), 1);
        assert_eq!(effective_cadence(3, true, 5), 3);
        assert_eq!(effective_cadence(60, true, 5), 5);
        // a zero cap never produces a zero period
        assert_eq!(effective_cadence(10, true, 0), 1);
    }

    struct FailingCollector;

    impl Collector for FailingCollector {
        fn name(&self) -> &'static str {
            "load"
        }

        fn collect(&mut self, _state: &SharedState) -> Result<(), CollectError> {
            Err(CollectError::Unavailable("always down".into()))
        }
    }

    #[tokio::test]
    async fn test_failing_update_counts_every_tick() {
        let state = Arc::new(SharedState::new());
        let collector: Arc<Mutex<Box<dyn Collector>>> =
            Arc::new(Mutex::new(Box::new(FailingCollector)));

        for _ in 0..5 {
            run_builtin_once("load", &collector, &state).await;
        }

        assert_eq!(state.error_count("load"), 5);
        assert_eq!(
            state.load.read().status,
            CellStatus::Unavailable("unavailable: always down".into())
        );
    }

    struct PanicOnceCollector {
        panicked: bool,
    }

    impl Collector for PanicOnceCollector {
        fn name(&self) -> &'static str {
            "load"
        }

        fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
            if !self.panicked {
                self.panicked = true;
                panic!("collector bug");
            }
            state.load.publish(LoadSample::default());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_task_recovers() {
        let state = Arc::new(SharedState::new());
        let collector: Arc<Mutex<Box<dyn Collector>>> =
            Arc::new(Mutex::new(Box::new(PanicOnceCollector { panicked: false })));

        run_builtin_once("load", &collector, &state).await;
        assert_eq!(state.error_count("load"), 1);
        assert_eq!(
            state.load.read().status,
            CellStatus::Unavailable("update panicked".into())
        );

        // the next tick reuses the same collector and succeeds
        run_builtin_once("load", &collector, &state).await;
        assert_eq!(state.load.read().status, CellStatus::Ok);
        assert_eq!(state.error_count("load"), 1);
    }

    #[tokio::test]
    async fn test_plugin_update_failure_marks_widget() {
        let registry = Arc::new(PluginRegistry::new(6, 2));
        let stub = Arc::new(StubPlugin::named("p"));
        registry.load(stub.clone(), None).unwrap();
        registry.create_widgets();
        stub.fail_update.store(true, Ordering::SeqCst);

        for _ in 0..3 {
            assert!(run_plugin_once("p", &registry).await);
        }

        let (_, widget) = registry.update_target("p").unwrap();
        assert_eq!(widget.error_count(), 3);
        assert!(widget.body().unavailable.is_some());

        // recovery clears the overlay
        stub.fail_update.store(false, Ordering::SeqCst);
        run_plugin_once("p", &registry).await;
        assert!(widget.body().unavailable.is_none());
    }

    #[tokio::test]
    async fn test_disabled_plugin_skips_tick() {
        let registry = Arc::new(PluginRegistry::new(6, 2));
        let stub = Arc::new(StubPlugin::named("p"));
        registry.load(stub.clone(), None).unwrap();
        registry.create_widgets();
        registry.disable("p").unwrap();

        assert!(!run_plugin_once("p", &registry).await);
        assert_eq!(stub.updates.load(Ordering::SeqCst), 0);
    }

    /// Collector that flags its own drop, proving shutdown joined the task.
    struct DropFlagCollector {
        dropped: Arc<AtomicBool>,
        ticks: Arc<AtomicU64>,
    }

    impl Collector for DropFlagCollector {
        fn name(&self) -> &'static str {
            "load"
        }

        fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            state.load.publish(LoadSample::default());
            Ok(())
        }
    }

    impl Drop for DropFlagCollector {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_shutdown_joins_all_tasks() {
        let dropped = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));
        let state = Arc::new(SharedState::new());
        let (gate, _listener) = RenderGate::new();

        let jobs = vec![WidgetJob {
            id: "load".to_string(),
            cadence: 1000,
            job: UpdateJob::Builtin(Box::new(DropFlagCollector {
                dropped: dropped.clone(),
                ticks: ticks.clone(),
            })),
        }];

        let scheduler = TaskScheduler::start(
            jobs,
            state.clone(),
            gate,
            CancellationToken::new(),
            SchedulerConfig::default(),
        );

        // let the initial tick land
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown().await;

        // the task exited and its collector was dropped before we returned,
        // so the final export cannot observe a cell mid-write
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(state.load.read().status, CellStatus::Ok);
    }

    #[tokio::test]
    async fn test_initial_tick_requests_redraw() {
        let state = Arc::new(SharedState::new());
        let (gate, mut listener) = RenderGate::new();
        let dropped = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let jobs = vec![WidgetJob {
            id: "load".to_string(),
            cadence: 1000,
            job: UpdateJob::Builtin(Box::new(DropFlagCollector {
                dropped,
                ticks,
            })),
        }];

        let scheduler = TaskScheduler::start(
            jobs,
            state,
            gate,
            CancellationToken::new(),
            SchedulerConfig::default(),
        );

        assert!(listener.wait().await);
        scheduler.shutdown().await;
    }
}
