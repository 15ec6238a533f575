//! Keyboard navigation order over the live widget set.
//!
//! Rebuilt eagerly: at startup and whenever widget membership or enablement
//! changes (the registry's generation counter tells the render loop when).

use crate::config::WidgetSlot;
use crate::plugin::{PluginRegistry, PluginState};

/// Synthetic entry pinned before every real widget.
pub const HEADER_ID: &str = "header";

/// Builds the forward focus order: header first, then all enabled widgets
/// sorted ascending by (row, col). Ties keep registration order via the
/// stable sort. Disabled widgets and plugins without a widget are absent.
pub fn build_focus_order(slots: &[WidgetSlot], registry: &PluginRegistry) -> Vec<String> {
    struct Entry {
        row: i32,
        col: i32,
        id: String,
    }

    // header sorts first at row -1
    let mut entries = vec![Entry {
        row: -1,
        col: 0,
        id: HEADER_ID.to_string(),
    }];

    for slot in slots.iter().filter(|s| s.enabled) {
        entries.push(Entry {
            row: slot.row as i32,
            col: slot.col as i32,
            id: slot.id.clone(),
        });
    }

    for info in registry.info() {
        if info.state == PluginState::Active {
            entries.push(Entry {
                row: info.config.layout.row as i32,
                col: info.config.layout.column as i32,
                id: info.identity.name.clone(),
            });
        }
    }

    entries.sort_by(|a, b| (a.row, a.col).cmp(&(b.row, b.col)));
    entries.into_iter().map(|e| e.id).collect()
}

/// Tracks the focused widget while cycling forward and backward.
#[derive(Debug, Default)]
pub struct FocusCycle {
    order: Vec<String>,
    current: Option<usize>,
}

impl FocusCycle {
    pub fn new(order: Vec<String>) -> Self {
        Self {
            order,
            current: None,
        }
    }

    /// Installs a freshly built order, keeping the focused widget if it is
    /// still present.
    pub fn set_order(&mut self, order: Vec<String>) {
        let focused = self.current_id().map(str::to_string);
        self.order = order;
        self.current = focused.and_then(|id| self.order.iter().position(|o| *o == id));
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.map(|i| self.order[i].as_str())
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Moves focus forward, wrapping at the end.
    pub fn next(&mut self) -> Option<&str> {
        if self.order.is_empty() {
            self.current = None;
            return None;
        }
        self.current = Some(match self.current {
            Some(i) => (i + 1) % self.order.len(),
            None => 0,
        });
        self.current_id()
    }

    /// Moves focus backward, wrapping at the start.
    pub fn prev(&mut self) -> Option<&str> {
        if self.order.is_empty() {
            self.current = None;
            return None;
        }
        self.current = Some(match self.current {
            Some(0) | None => self.order.len() - 1,
            Some(i) => i - 1,
        });
        self.current_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WidgetSource, WidgetSlot};
    use crate::plugin::registry::tests::StubPlugin;
    use crate::plugin::{PluginConfig, PluginRegistry};
    use std::sync::Arc;

    fn slot(id: &str, row: u16, col: u16, enabled: bool) -> WidgetSlot {
        WidgetSlot {
            id: id.to_string(),
            title: id.to_string(),
            row,
            col,
            row_span: 1,
            col_span: 1,
            min_width: 20,
            enabled,
            border_color: String::new(),
            fg_color: String::new(),
            cadence: 2,
            source: WidgetSource::Builtin,
        }
    }

    #[test]
    fn test_header_first_then_row_col_order() {
        let registry = PluginRegistry::new(4, 2);
        let slots = vec![
            slot("cpu", 0, 0, true),
            slot("memory", 0, 1, true),
            slot("disk", 1, 0, false),
        ];
        let order = build_focus_order(&slots, &registry);
        assert_eq!(order, vec!["header", "cpu", "memory"]);
    }

    #[test]
    fn test_zero_enabled_widgets_leaves_header_only() {
        let registry = PluginRegistry::new(4, 2);
        let slots = vec![slot("cpu", 0, 0, false)];
        assert_eq!(build_focus_order(&slots, &registry), vec!["header"]);
    }

    #[test]
    fn test_duplicate_positions_keep_registration_order() {
        let registry = PluginRegistry::new(4, 2);
        let slots = vec![
            slot("memory", 2, 0, true),
            slot("cpu", 2, 0, true),
            slot("disk", 0, 0, true),
        ];
        // memory registered before cpu, both at (2, 0)
        let order = build_focus_order(&slots, &registry);
        assert_eq!(order, vec!["header", "disk", "memory", "cpu"]);
    }

    #[test]
    fn test_plugin_slots_interleave_by_position() {
        let registry = PluginRegistry::new(6, 2);
        let mut config = PluginConfig::default();
        config.layout.row = 0;
        config.layout.column = 1;
        registry
            .load(Arc::new(StubPlugin::named("docker")), Some(config))
            .unwrap();
        registry.create_widgets();

        let slots = vec![slot("cpu", 0, 0, true), slot("memory", 1, 0, true)];
        let order = build_focus_order(&slots, &registry);
        assert_eq!(order, vec!["header", "cpu", "docker", "memory"]);
    }

    #[test]
    fn test_disabled_plugin_excluded_even_with_widget() {
        let registry = PluginRegistry::new(6, 2);
        let mut config = PluginConfig::default();
        config.layout.row = 3;
        config.layout.column = 0;
        registry
            .load(Arc::new(StubPlugin::named("docker")), Some(config))
            .unwrap();
        registry.create_widgets();
        registry.disable("docker").unwrap();

        let slots = vec![slot("cpu", 0, 0, true)];
        let order = build_focus_order(&slots, &registry);
        assert_eq!(order, vec!["header", "cpu"]);
        // the widget handle survives the disable
        assert!(registry.info()[0].has_widget);
    }

    #[test]
    fn test_plugin_without_widget_excluded() {
        let registry = PluginRegistry::new(6, 2);
        registry
            .load(Arc::new(StubPlugin::named("docker")), None)
            .unwrap();
        // no create_widgets() call
        let order = build_focus_order(&[], &registry);
        assert_eq!(order, vec!["header"]);
    }

    #[test]
    fn test_cycle_wraps_both_directions() {
        let mut cycle = FocusCycle::new(vec!["header".into(), "cpu".into(), "memory".into()]);
        assert_eq!(cycle.current_id(), None);
        assert_eq!(cycle.next(), Some("header"));
        assert_eq!(cycle.next(), Some("cpu"));
        assert_eq!(cycle.next(), Some("memory"));
        assert_eq!(cycle.next(), Some("header"));
        assert_eq!(cycle.prev(), Some("memory"));
    }

    #[test]
    fn test_set_order_keeps_focus_when_possible() {
        let mut cycle = FocusCycle::new(vec!["header".into(), "cpu".into(), "memory".into()]);
        cycle.next();
        cycle.next();
        assert_eq!(cycle.current_id(), Some("cpu"));

        cycle.set_order(vec!["header".into(), "memory".into(), "cpu".into()]);
        assert_eq!(cycle.current_id(), Some("cpu"));

        cycle.set_order(vec!["header".into(), "memory".into()]);
        assert_eq!(cycle.current_id(), None);
        assert_eq!(cycle.next(), Some("header"));
    }
}
