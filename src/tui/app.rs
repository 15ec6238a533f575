//! Main TUI application loop.
//!
//! The only code path that reads input and draws. Processes one unit of
//! work at a time: an input event or a coalesced redraw wake.

use std::io;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use super::event::{InputEvent, InputEvents};
use super::focus::{FocusCycle, build_focus_order};
use super::render::{RenderContext, draw};
use crate::config::{Theme, WidgetSlot};
use crate::export;
use crate::plugin::PluginRegistry;
use crate::runtime::RedrawListener;
use crate::state::SharedState;

pub struct App {
    theme: Theme,
    slots: Vec<WidgetSlot>,
    state: Arc<SharedState>,
    registry: Arc<PluginRegistry>,
    focus: FocusCycle,
    seen_generation: u64,
    show_plugins: bool,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(
        theme: Theme,
        slots: Vec<WidgetSlot>,
        state: Arc<SharedState>,
        registry: Arc<PluginRegistry>,
    ) -> Self {
        let focus = FocusCycle::new(build_focus_order(&slots, &registry));
        let seen_generation = registry.generation();
        Self {
            theme,
            slots,
            state,
            registry,
            focus,
            seen_generation,
            show_plugins: false,
            status: None,
            should_quit: false,
        }
    }

    /// Runs until 'q'. Returns with the terminal restored; the caller then
    /// shuts the scheduler down and performs the final export.
    pub async fn run(mut self, mut redraws: RedrawListener) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut events = InputEvents::spawn();

        loop {
            self.sync_focus_order();

            terminal.draw(|frame| {
                let ctx = RenderContext {
                    theme: &self.theme,
                    slots: &self.slots,
                    state: &self.state,
                    registry: &self.registry,
                    focused: self.focus.current_id(),
                    show_plugins: self.show_plugins,
                    status: self.status.as_deref(),
                };
                draw(frame, &ctx);
            })?;

            tokio::select! {
                event = events.next() => match event {
                    Some(InputEvent::Key(key)) => self.handle_key(key),
                    Some(InputEvent::Resize) => {}
                    None => self.should_quit = true,
                },
                woke = redraws.wait() => {
                    // every gate dropped means the scheduler is gone
                    if !woke {
                        self.should_quit = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Rebuilds the focus order when plugin membership or enablement
    /// changed since the last pass.
    fn sync_focus_order(&mut self) {
        let generation = self.registry.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.focus
                .set_order(build_focus_order(&self.slots, &self.registry));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab => {
                self.focus.next();
            }
            KeyCode::BackTab => {
                self.focus.prev();
            }
            KeyCode::Char('p') => self.show_plugins = !self.show_plugins,
            KeyCode::Char('e') => self.export_now(),
            KeyCode::Char('r') => self.refresh_focused(),
            KeyCode::Esc => {
                self.show_plugins = false;
                self.status = None;
            }
            _ => {}
        }
    }

    fn export_now(&mut self) {
        if !self.theme.export.enabled {
            self.status = Some("export is disabled in the config".to_string());
            return;
        }
        match export::write_all(&self.theme.export, &self.state, &self.registry) {
            Ok(paths) => {
                info!(files = paths.len(), "exported snapshot");
                self.status = Some(format!("exported {} file(s)", paths.len()));
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                self.status = Some(format!("export failed: {}", e));
            }
        }
    }

    /// Forces an out-of-cadence update of the focused plugin widget.
    fn refresh_focused(&mut self) {
        let Some(id) = self.focus.current_id().map(str::to_string) else {
            return;
        };
        match self.registry.refresh(&id) {
            Ok(()) => self.status = Some(format!("refreshed {}", id)),
            Err(e) => self.status = Some(e.to_string()),
        }
    }
}
