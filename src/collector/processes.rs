//! Process table and process tree collectors.

use std::collections::{HashMap, HashSet};

use sysinfo::{Pid, ProcessesToUpdate, System, Users};

use super::cache::ProcessCache;
use super::{CollectError, Collector};
use crate::state::{ProcessRow, ProcessSample, ProcessTreeSample, SharedState, TreeRow};

/// Rows kept in the process table after sorting by CPU.
const TABLE_LIMIT: usize = 50;

/// Rows kept in the flattened process tree.
const TREE_LIMIT: usize = 500;

/// Process table sorted by CPU usage. Stable per-process fields (name,
/// user) come from the TTL'd cache and are re-resolved only on a miss.
pub struct ProcessCollector {
    sys: System,
    users: Users,
    cache: ProcessCache,
}

impl ProcessCollector {
    pub fn new(cache: ProcessCache) -> Self {
        Self {
            sys: System::new(),
            users: Users::new_with_refreshed_list(),
            cache,
        }
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        "process"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.sys.refresh_memory();
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        let total_memory = self.sys.total_memory();

        let mut live: HashSet<u32> = HashSet::new();
        let mut rows: Vec<ProcessRow> = Vec::with_capacity(self.sys.processes().len());

        for (pid, process) in self.sys.processes() {
            let pid = pid.as_u32();
            live.insert(pid);

            let (name, user) = match self.cache.get(pid) {
                Some(entry) => (entry.name.clone(), entry.user.clone()),
                None => {
                    let name = process.name().to_string_lossy().into_owned();
                    let user = process
                        .user_id()
                        .and_then(|uid| self.users.get_user_by_id(uid))
                        .map(|u| u.name().to_string())
                        .unwrap_or_else(|| "-".to_string());
                    self.cache.insert(pid, name.clone(), user.clone());
                    (name, user)
                }
            };

            let memory = process.memory();
            rows.push(ProcessRow {
                pid,
                name,
                user,
                cpu_pct: process.cpu_usage(),
                mem_pct: if total_memory > 0 {
                    memory as f64 * 100.0 / total_memory as f64
                } else {
                    0.0
                },
                memory,
                status: process.status().to_string(),
            });
        }

        self.cache.retain_live(&live);

        let total = rows.len();
        rows.sort_by(|a, b| b.cpu_pct.partial_cmp(&a.cpu_pct).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(TABLE_LIMIT);

        state.process.publish(ProcessSample { total, rows });
        Ok(())
    }
}

/// Parent/child hierarchy flattened depth-first for display.
pub struct ProcessTreeCollector {
    sys: System,
}

impl ProcessTreeCollector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for ProcessTreeCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessTreeCollector {
    fn name(&self) -> &'static str {
        "process_tree"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut names: HashMap<u32, String> = HashMap::new();
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut has_parent: HashSet<u32> = HashSet::new();
        let mut pids: Vec<u32> = Vec::new();

        for (pid, process) in self.sys.processes() {
            let pid = pid.as_u32();
            pids.push(pid);
            names.insert(pid, process.name().to_string_lossy().into_owned());
            if let Some(parent) = process.parent().map(|p| p.as_u32())
                && self.sys.processes().contains_key(&Pid::from_u32(parent))
                && parent != pid
            {
                children.entry(parent).or_default().push(pid);
                has_parent.insert(pid);
            }
        }

        for kids in children.values_mut() {
            kids.sort_unstable();
        }
        pids.sort_unstable();

        let total = pids.len();
        let mut rows: Vec<TreeRow> = Vec::new();
        // iterative DFS from the roots, pid order for determinism
        for root in pids.iter().filter(|pid| !has_parent.contains(pid)) {
            let mut stack: Vec<(u32, usize)> = vec![(*root, 0)];
            while let Some((pid, depth)) = stack.pop() {
                if rows.len() >= TREE_LIMIT {
                    break;
                }
                rows.push(TreeRow {
                    pid,
                    depth,
                    name: names.get(&pid).cloned().unwrap_or_default(),
                });
                if let Some(kids) = children.get(&pid) {
                    for kid in kids.iter().rev() {
                        stack.push((*kid, depth + 1));
                    }
                }
            }
        }

        state.process_tree.publish(ProcessTreeSample { total, rows });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::SystemClock;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_process_collector_publishes_rows() {
        let state = SharedState::new();
        let cache = ProcessCache::new(Duration::from_secs(10), Arc::new(SystemClock));
        let mut collector = ProcessCollector::new(cache);
        collector.collect(&state).unwrap();

        let sample = state.process.read().value.unwrap();
        assert!(sample.total > 0);
        assert!(sample.rows.len() <= TABLE_LIMIT);
        // our own process is alive somewhere in the full set
        assert!(sample.total >= 1);
    }

    #[test]
    fn test_process_cache_fills_on_first_pass() {
        let state = SharedState::new();
        let cache = ProcessCache::new(Duration::from_secs(60), Arc::new(SystemClock));
        let mut collector = ProcessCollector::new(cache);
        collector.collect(&state).unwrap();
        assert!(!collector.cache.is_empty());
    }

    #[test]
    fn test_tree_depths_are_consistent() {
        let state = SharedState::new();
        let mut collector = ProcessTreeCollector::new();
        collector.collect(&state).unwrap();

        let sample = state.process_tree.read().value.unwrap();
        assert!(!sample.rows.is_empty());
        // the first row of a DFS is always a root
        assert_eq!(sample.rows[0].depth, 0);
        // depth never jumps by more than one between consecutive rows
        for pair in sample.rows.windows(2) {
            assert!(pair[1].depth <= pair[0].depth + 1);
        }
    }
}
