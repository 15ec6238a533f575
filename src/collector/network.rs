//! Network interface rates (sysinfo) and TCP connection counts
//! (`/proc/net/tcp`, `/proc/net/tcp6`).

use std::path::Path;
use std::time::Instant;

use sysinfo::Networks;

use super::{CollectError, Collector, HostFs};
use crate::state::{ConnectionsSample, IfaceRates, NetworkSample, SharedState};

/// Per-interface receive/transmit rates from successive refreshes.
pub struct NetworkCollector {
    networks: Networks,
    prev_at: Option<Instant>,
}

impl NetworkCollector {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            prev_at: None,
        }
    }
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for NetworkCollector {
    fn name(&self) -> &'static str {
        "network"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        self.networks.refresh(true);
        let now = Instant::now();
        let elapsed = self
            .prev_at
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(0.0);

        let mut interfaces: Vec<IfaceRates> = self
            .networks
            .iter()
            .map(|(name, data)| {
                // received()/transmitted() are deltas since the last refresh
                let (rx_rate, tx_rate) = if elapsed > 0.0 {
                    (
                        (data.received() as f64 / elapsed) as u64,
                        (data.transmitted() as f64 / elapsed) as u64,
                    )
                } else {
                    (0, 0)
                };
                IfaceRates {
                    name: name.clone(),
                    rx_bytes_per_sec: rx_rate,
                    tx_bytes_per_sec: tx_rate,
                    total_rx: data.total_received(),
                    total_tx: data.total_transmitted(),
                }
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        self.prev_at = Some(now);
        state.network.publish(NetworkSample { interfaces });
        Ok(())
    }
}

// TCP state codes from the kernel's socket table.
const TCP_ESTABLISHED: u8 = 0x01;
const TCP_TIME_WAIT: u8 = 0x06;
const TCP_CLOSE_WAIT: u8 = 0x08;
const TCP_LISTEN: u8 = 0x0A;

/// Connection counts by TCP state.
pub struct ConnectionsCollector<F: HostFs> {
    fs: F,
}

impl<F: HostFs> ConnectionsCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn count_states(data: &str, sample: &mut ConnectionsSample) {
        // first line is the column header
        for line in data.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                continue;
            }
            let Ok(tcp_state) = u8::from_str_radix(fields[3], 16) else {
                continue;
            };
            sample.total += 1;
            match tcp_state {
                TCP_ESTABLISHED => sample.established += 1,
                TCP_LISTEN => sample.listening += 1,
                TCP_TIME_WAIT => sample.time_wait += 1,
                TCP_CLOSE_WAIT => sample.close_wait += 1,
                _ => {}
            }
        }
    }
}

impl<F: HostFs> Collector for ConnectionsCollector<F> {
    fn name(&self) -> &'static str {
        "connections"
    }

    fn collect(&mut self, state: &SharedState) -> Result<(), CollectError> {
        let tcp = self
            .fs
            .read_to_string(Path::new("/proc/net/tcp"))
            .map_err(|e| CollectError::Unavailable(format!("/proc/net/tcp: {}", e)))?;

        let mut sample = ConnectionsSample::default();
        Self::count_states(&tcp, &mut sample);

        // v6 table is optional
        if let Ok(tcp6) = self.fs.read_to_string(Path::new("/proc/net/tcp6")) {
            Self::count_states(&tcp6, &mut sample);
        }

        state.connections.publish(sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testfs::MockFs;

    const PROC_NET_TCP: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 12345 1
   1: 0100007F:A3D2 0100007F:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 12346 1
   2: 0100007F:A3D4 0100007F:1F90 06 00000000:00000000 00:00000000 00000000  1000        0 12347 1
";

    const PROC_NET_TCP6: &str = "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000000000000:0050 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 23456 1
   1: 00000000000000000000000001000000:9999 00000000000000000000000001000000:0050 08 00000000:00000000 00:00000000 00000000     0        0 23457 1
";

    #[test]
    fn test_counts_tcp_states_across_tables() {
        let fs = MockFs::default()
            .with_file("/proc/net/tcp", PROC_NET_TCP)
            .with_file("/proc/net/tcp6", PROC_NET_TCP6);
        let state = SharedState::new();
        ConnectionsCollector::new(fs).collect(&state).unwrap();

        let sample = state.connections.read().value.unwrap();
        assert_eq!(sample.total, 5);
        assert_eq!(sample.listening, 2);
        assert_eq!(sample.established, 1);
        assert_eq!(sample.time_wait, 1);
        assert_eq!(sample.close_wait, 1);
    }

    #[test]
    fn test_missing_v6_table_is_not_an_error() {
        let fs = MockFs::default().with_file("/proc/net/tcp", PROC_NET_TCP);
        let state = SharedState::new();
        ConnectionsCollector::new(fs).collect(&state).unwrap();
        assert_eq!(state.connections.read().value.unwrap().total, 3);
    }

    #[test]
    fn test_missing_v4_table_is_unavailable() {
        let state = SharedState::new();
        match ConnectionsCollector::new(MockFs::default()).collect(&state) {
            Err(CollectError::Unavailable(_)) => {}
            other => panic!("expected unavailable, got {:?}", other),
        }
    }
}
