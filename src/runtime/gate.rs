//! Redraw coalescing between many sampling tasks and one render loop.
//!
//! The drawing primitives are single-threaded, but every sampling task
//! wants to trigger a redraw after publishing. A capacity-1 channel bounds
//! pending work to "at most one queued plus one in flight": while a redraw
//! is already pending, further requests are no-ops instead of queueing
//! duplicates.

use tokio::sync::mpsc;

/// Handle sampling tasks use to request a redraw. Cheap to clone.
#[derive(Clone)]
pub struct RenderGate {
    tx: mpsc::Sender<()>,
}

/// Receiving side owned by the render loop.
pub struct RedrawListener {
    rx: mpsc::Receiver<()>,
}

impl RenderGate {
    pub fn new() -> (RenderGate, RedrawListener) {
        let (tx, rx) = mpsc::channel(1);
        (RenderGate { tx }, RedrawListener { rx })
    }

    /// Non-blocking; a full channel means a redraw is already pending and
    /// this request coalesces into it.
    pub fn request_redraw(&self) {
        let _ = self.tx.try_send(());
    }
}

impl RedrawListener {
    /// Waits for the next coalesced wake. Returns `false` once every
    /// `RenderGate` handle has been dropped.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Non-blocking variant for tests and drain loops.
    pub fn try_wait(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_coalesce_to_one_wake() {
        let (gate, mut listener) = RenderGate::new();
        for _ in 0..10 {
            gate.request_redraw();
        }
        assert!(listener.try_wait());
        // the other nine coalesced
        assert!(!listener.try_wait());
    }

    #[tokio::test]
    async fn test_at_most_one_queued_plus_one_in_flight() {
        let (gate, mut listener) = RenderGate::new();

        // a redraw request arrives and the render loop takes it (in flight)
        gate.request_redraw();
        assert!(listener.try_wait());

        // k concurrent requests while that pass is in flight
        for _ in 0..25 {
            gate.request_redraw();
        }

        // exactly one more pass runs, not k
        assert!(listener.try_wait());
        assert!(!listener.try_wait());
    }

    #[tokio::test]
    async fn test_wait_returns_false_when_gates_dropped() {
        let (gate, mut listener) = RenderGate::new();
        drop(gate);
        assert!(!listener.wait().await);
    }
}
