//! Terminal input events.
//!
//! A dedicated thread polls crossterm and forwards events into the async
//! render loop. Redraw wakes arrive separately through the
//! [`RedrawListener`](crate::runtime::RedrawListener); this channel carries
//! only input.

use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

/// Poll timeout; also bounds how quickly the thread notices channel closure.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize,
}

/// Receiving side of the input thread.
pub struct InputEvents {
    rx: mpsc::Receiver<InputEvent>,
}

impl InputEvents {
    /// Spawns the polling thread. It exits once the receiver is dropped.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(64);

        thread::spawn(move || {
            loop {
                if !event::poll(POLL_INTERVAL).unwrap_or(false) {
                    if tx.is_closed() {
                        break;
                    }
                    continue;
                }
                let Ok(evt) = event::read() else { continue };
                let event = match evt {
                    CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                        InputEvent::Key(key)
                    }
                    CrosstermEvent::Resize(_, _) => InputEvent::Resize,
                    _ => continue,
                };
                if tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    /// Next input event; `None` once the input thread has stopped.
    pub async fn next(&mut self) -> Option<InputEvent> {
        self.rx.recv().await
    }
}
