//! Grid rendering: one bordered panel per enabled widget.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Clear, Paragraph};

use sysinfo::System;

use crate::config::{Theme, WidgetSlot};
use crate::plugin::{PluginRegistry, PluginState};
use crate::state::{CellStatus, CellView, SharedState};
use crate::tui::focus::HEADER_ID;
use crate::tui::style::color_or;
use crate::util::{format_bytes, format_duration, format_rate, gauge};

pub struct RenderContext<'a> {
    pub theme: &'a Theme,
    pub slots: &'a [WidgetSlot],
    pub state: &'a SharedState,
    pub registry: &'a PluginRegistry,
    pub focused: Option<&'a str>,
    pub show_plugins: bool,
    pub status: Option<&'a str>,
}

/// One full draw pass.
pub fn draw(frame: &mut Frame, ctx: &RenderContext) {
    let [header_area, grid_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header_area, ctx);
    draw_grid(frame, grid_area, ctx);
    draw_footer(frame, footer_area);

    if ctx.show_plugins {
        draw_plugin_overlay(frame, frame.area(), ctx);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let host = System::host_name().unwrap_or_else(|| "unknown".to_string());
    let uptime = format_duration(System::uptime());
    let title = format!("hostpulse v{}  {}  up {}", crate::VERSION, host, uptime);

    let style = if ctx.focused == Some(HEADER_ID) {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut lines = vec![Line::styled(title, style)];
    if let Some(status) = ctx.status {
        lines.push(Line::styled(status.to_string(), Style::default().fg(Color::Cyan)));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new("TAB cycle widgets  e export  p plugins  r refresh  q quit")
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_grid(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let rows = ctx.theme.layout.rows;
    let cols = ctx.theme.layout.columns;

    for slot in ctx.slots.iter().filter(|s| s.enabled) {
        let rect = grid_rect(area, rows, cols, slot.row, slot.col, slot.row_span, slot.col_span);
        if rect.width < 2 || rect.height < 2 {
            continue;
        }
        let lines = builtin_lines(&slot.id, ctx.state, rect.width);
        draw_panel(frame, rect, &slot.title, &slot.border_color, ctx, &slot.id, lines);
    }

    for (name, layout, handle) in ctx.registry.widget_panels() {
        let rect = grid_rect(
            area,
            rows,
            cols,
            layout.row,
            layout.column,
            layout.row_span,
            layout.col_span,
        );
        if rect.width < 2 || rect.height < 2 {
            continue;
        }
        let body = handle.body();
        let title = if layout.title.is_empty() { name.clone() } else { layout.title.clone() };
        let lines = match body.unavailable {
            Some(error) => unavailable_lines(&error),
            None => body.lines.into_iter().map(Line::from).collect(),
        };
        draw_panel(frame, rect, &title, &layout.border_color, ctx, &name, lines);
    }
}

fn draw_panel(
    frame: &mut Frame,
    rect: Rect,
    title: &str,
    border_color: &str,
    ctx: &RenderContext,
    id: &str,
    lines: Vec<Line>,
) {
    let border_style = if ctx.focused == Some(id) {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(color_or(border_color, Color::Reset))
    };
    let block = Block::bordered()
        .title(format!(" {} ", title))
        .border_style(border_style);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

/// Maps a slot's grid coordinates to screen coordinates.
fn grid_rect(
    area: Rect,
    grid_rows: u16,
    grid_cols: u16,
    row: u16,
    col: u16,
    row_span: u16,
    col_span: u16,
) -> Rect {
    let cell_w = area.width / grid_cols.max(1);
    let cell_h = area.height / grid_rows.max(1);
    let x = area.x + col * cell_w;
    let y = area.y + row * cell_h;
    Rect {
        x,
        y,
        width: (cell_w * col_span).min(area.right().saturating_sub(x)),
        height: (cell_h * row_span).min(area.bottom().saturating_sub(y)),
    }
}

fn unavailable_lines(error: &str) -> Vec<Line<'static>> {
    vec![Line::styled(
        format!("unavailable: {}", error),
        Style::default().fg(Color::Red),
    )]
}

/// Renders a cell: waiting / unavailable / formatted value.
fn cell_lines<T>(view: CellView<T>, format: impl Fn(&T) -> Vec<Line<'static>>) -> Vec<Line<'static>> {
    match view.status {
        CellStatus::Empty => vec![Line::styled(
            "waiting for data...",
            Style::default().fg(Color::DarkGray),
        )],
        CellStatus::Unavailable(error) => unavailable_lines(&error),
        CellStatus::Ok => match view.value {
            Some(value) => format(&value),
            None => Vec::new(),
        },
    }
}

fn builtin_lines(id: &str, state: &SharedState, width: u16) -> Vec<Line<'static>> {
    let bar = (width.saturating_sub(12) as usize).clamp(4, 30);
    match id {
        "cpu" => cell_lines(state.cpu.read(), |cpu| {
            let mut lines = vec![Line::from(format!("all {}", gauge(cpu.total_pct as f64, bar)))];
            for (i, pct) in cpu.per_core_pct.iter().take(8).enumerate() {
                lines.push(Line::from(format!("c{:<2} {}", i, gauge(*pct as f64, bar))));
            }
            if cpu.per_core_pct.len() > 8 {
                lines.push(Line::from(format!("... {} cores total", cpu.per_core_pct.len())));
            }
            lines
        }),
        "memory" => cell_lines(state.memory.read(), |mem| {
            let ram_pct = if mem.total > 0 {
                mem.used as f64 * 100.0 / mem.total as f64
            } else {
                0.0
            };
            let swap_pct = if mem.swap_total > 0 {
                mem.swap_used as f64 * 100.0 / mem.swap_total as f64
            } else {
                0.0
            };
            vec![
                Line::from(format!("ram  {}", gauge(ram_pct, bar))),
                Line::from(format!("     {} / {}", format_bytes(mem.used), format_bytes(mem.total))),
                Line::from(format!("swap {}", gauge(swap_pct, bar))),
                Line::from(format!(
                    "     {} / {}",
                    format_bytes(mem.swap_used),
                    format_bytes(mem.swap_total)
                )),
            ]
        }),
        "disk" => cell_lines(state.disk.read(), |disk| {
            disk.mounts
                .iter()
                .map(|m| {
                    Line::from(format!(
                        "{:<12} {:>5.1}% {} / {}",
                        m.mount_point,
                        m.used_pct,
                        format_bytes(m.used),
                        format_bytes(m.total)
                    ))
                })
                .collect()
        }),
        "disk_io" => cell_lines(state.disk_io.read(), |io| {
            io.devices
                .iter()
                .map(|d| {
                    Line::from(format!(
                        "{:<8} r {:>9} w {:>9}",
                        d.device,
                        format_rate(d.read_bytes_per_sec),
                        format_rate(d.write_bytes_per_sec)
                    ))
                })
                .collect()
        }),
        "network" => cell_lines(state.network.read(), |net| {
            net.interfaces
                .iter()
                .map(|i| {
                    Line::from(format!(
                        "{:<8} rx {:>9} tx {:>9}",
                        i.name,
                        format_rate(i.rx_bytes_per_sec),
                        format_rate(i.tx_bytes_per_sec)
                    ))
                })
                .collect()
        }),
        "connections" => cell_lines(state.connections.read(), |c| {
            vec![
                Line::from(format!("total       {}", c.total)),
                Line::from(format!("established {}", c.established)),
                Line::from(format!("listening   {}", c.listening)),
                Line::from(format!("time_wait   {}", c.time_wait)),
                Line::from(format!("close_wait  {}", c.close_wait)),
            ]
        }),
        "gpu" => cell_lines(state.gpu.read(), |gpu| {
            let mut lines = Vec::new();
            for g in &gpu.gpus {
                lines.push(Line::from(g.name.clone()));
                lines.push(Line::from(format!("util {}", gauge(g.utilization_pct, bar))));
                lines.push(Line::from(format!(
                    "mem  {} / {}  {:.0}C",
                    format_bytes(g.memory_used),
                    format_bytes(g.memory_total),
                    g.temperature_c
                )));
            }
            lines
        }),
        "load" => cell_lines(state.load.read(), |load| {
            vec![Line::from(format!(
                "1m {:.2}  5m {:.2}  15m {:.2}",
                load.one, load.five, load.fifteen
            ))]
        }),
        "temperature" => cell_lines(state.temperature.read(), |t| {
            t.sensors
                .iter()
                .map(|s| Line::from(format!("{:<20} {:>6.1}C", s.label, s.celsius)))
                .collect()
        }),
        "battery" => cell_lines(state.battery.read(), |b| {
            vec![Line::from(gauge(b.percent, bar)), Line::from(b.status.clone())]
        }),
        "process" => cell_lines(state.process.read(), |p| {
            let mut lines = vec![Line::styled(
                format!("{:>7} {:<10} {:>6} {:>6}  {}", "PID", "USER", "CPU%", "MEM%", "NAME"),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            for row in &p.rows {
                lines.push(Line::from(format!(
                    "{:>7} {:<10} {:>6.1} {:>6.1}  {}",
                    row.pid, row.user, row.cpu_pct, row.mem_pct, row.name
                )));
            }
            lines
        }),
        "process_tree" => cell_lines(state.process_tree.read(), |t| {
            t.rows
                .iter()
                .map(|row| {
                    Line::from(format!("{}{} ({})", "  ".repeat(row.depth), row.name, row.pid))
                })
                .collect()
        }),
        _ => Vec::new(),
    }
}

fn draw_plugin_overlay(frame: &mut Frame, area: Rect, ctx: &RenderContext) {
    let rect = centered(area, 70, 60);
    frame.render_widget(Clear, rect);

    let mut lines = Vec::new();
    let info = ctx.registry.info();
    if info.is_empty() {
        lines.push(Line::from("no plugins loaded"));
    }
    for plugin in info {
        let status = match plugin.state {
            PluginState::Active => "enabled",
            PluginState::Initialized => "no widget",
            PluginState::Disabled => "disabled",
        };
        lines.push(Line::styled(
            format!(
                "{} v{} - {}",
                plugin.identity.name, plugin.identity.version, status
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(format!("  {}", plugin.identity.description)));
        let last = plugin
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        lines.push(Line::from(format!(
            "  author: {}  last update: {}",
            plugin.identity.author, last
        )));
        lines.push(Line::from(""));
    }

    let block = Block::bordered().title(" Plugins ");
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let width = area.width * pct_x / 100;
    let height = area.height * pct_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rect_spans() {
        let area = Rect::new(0, 3, 100, 60);
        // 6x2 grid: cells are 50x10
        let r = grid_rect(area, 6, 2, 0, 0, 1, 1);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 3, 50, 10));

        let r = grid_rect(area, 6, 2, 2, 1, 2, 1);
        assert_eq!((r.x, r.y, r.width, r.height), (50, 23, 50, 20));
    }

    #[test]
    fn test_grid_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 100, 60);
        // span pushing past the right edge is clipped
        let r = grid_rect(area, 6, 2, 0, 1, 1, 3);
        assert_eq!(r.right(), 100);
    }

    #[test]
    fn test_cell_lines_unavailable_wins_over_value() {
        let cell = crate::state::MetricCell::<crate::state::LoadSample>::default();
        cell.publish(crate::state::LoadSample::default());
        cell.publish_error("probe died");
        let lines = cell_lines(cell.read(), |_| vec![Line::from("value")]);
        assert_eq!(lines.len(), 1);
        assert!(format!("{:?}", lines[0]).contains("probe died"));
    }
}
