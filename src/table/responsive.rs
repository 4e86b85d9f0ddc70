//! Viewport breakpoints and the table/card layout decision.

use serde::{Deserialize, Serialize};

use super::column::Column;

/// Widths below this are mobile.
pub const MOBILE_MAX_WIDTH: u32 = 768;

/// Widths below this (and at least [`MOBILE_MAX_WIDTH`]) are tablet.
pub const TABLET_MAX_WIDTH: u32 = 1024;

/// Units reserved for the navigation sidebar in [`LayoutMode::Sidebar`].
pub const SIDEBAR_WIDTH: u32 = 160;

/// More essential columns than this on mobile switches to cards.
pub const MAX_MOBILE_TABLE_COLUMNS: usize = 2;

/// Named viewport width tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn from_width(width: u32) -> Self {
        if width < MOBILE_MAX_WIDTH {
            Breakpoint::Mobile
        } else if width < TABLET_MAX_WIDTH {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    /// Highest column priority shown at this tier.
    fn max_priority(self) -> u8 {
        match self {
            Breakpoint::Mobile => 1,
            Breakpoint::Tablet => 2,
            Breakpoint::Desktop => u8::MAX,
        }
    }
}

/// Where the navigation chrome lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Sidebar,
    Header,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            LayoutMode::Sidebar => LayoutMode::Header,
            LayoutMode::Header => LayoutMode::Sidebar,
        }
    }

    /// Width taken from the viewport by navigation chrome.
    pub fn reserved_width(self) -> u32 {
        match self {
            LayoutMode::Sidebar => SIDEBAR_WIDTH,
            LayoutMode::Header => 0,
        }
    }
}

/// How rows are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Every visible column.
    FullTable,
    /// Only the columns allowed at this breakpoint.
    ReducedTable,
    /// One stacked card per row with all visible fields.
    Cards,
}

/// Result of classifying the viewport for a column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveLayout {
    pub breakpoint: Breakpoint,
    pub display: DisplayMode,
    /// Width left for the table after navigation chrome.
    pub container_width: u32,
    /// Indices (into the column slice) to render, in display order.
    pub columns: Vec<usize>,
}

/// Classify `viewport_width` and pick the columns to show.
pub fn compute_layout(columns: &[Column], viewport_width: u32, mode: LayoutMode) -> ResponsiveLayout {
    let breakpoint = Breakpoint::from_width(viewport_width);
    let container_width = viewport_width.saturating_sub(mode.reserved_width());
    let visible: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.visible)
        .map(|(i, _)| i)
        .collect();

    let essential = columns
        .iter()
        .filter(|c| c.visible && c.descriptor.priority <= 1)
        .count();

    if breakpoint == Breakpoint::Mobile && essential > MAX_MOBILE_TABLE_COLUMNS {
        return ResponsiveLayout {
            breakpoint,
            display: DisplayMode::Cards,
            container_width,
            columns: visible,
        };
    }

    let allowed: Vec<usize> = visible
        .iter()
        .copied()
        .filter(|&i| columns[i].descriptor.priority <= breakpoint.max_priority())
        .collect();

    // Nothing important enough is visible: stack every visible field
    if allowed.is_empty() && !visible.is_empty() {
        return ResponsiveLayout {
            breakpoint,
            display: DisplayMode::Cards,
            container_width,
            columns: visible,
        };
    }

    let display = if allowed.len() == visible.len() {
        DisplayMode::FullTable
    } else {
        DisplayMode::ReducedTable
    };

    ResponsiveLayout {
        breakpoint,
        display,
        container_width,
        columns: allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::column::{merge, ColumnDescriptor, ColumnType};

    fn columns(essential: usize) -> Vec<Column> {
        let mut catalog = vec![
            ColumnDescriptor::new("ID", "Id", ColumnType::Number, 80).priority(2),
            ColumnDescriptor::new("EMAIL", "Email", ColumnType::String, 200).priority(3),
            ColumnDescriptor::new("NOTAS", "Notas", ColumnType::String, 200).hidden().priority(1),
        ];
        let names = ["NOMBRE", "CLIENTE", "ESTADO", "REF"];
        for name in names.into_iter().take(essential) {
            catalog.push(ColumnDescriptor::new(name, name, ColumnType::String, 150).priority(1));
        }
        merge(&catalog, &[])
    }

    #[test]
    fn test_breakpoints() {
        assert_eq!(Breakpoint::from_width(320), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(767), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(768), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1023), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1024), Breakpoint::Desktop);
    }

    #[test]
    fn test_desktop_shows_all_visible_columns() {
        let layout = compute_layout(&columns(2), 1600, LayoutMode::Header);
        assert_eq!(layout.display, DisplayMode::FullTable);
        assert_eq!(layout.columns, vec![0, 1, 3, 4]);
        assert_eq!(layout.container_width, 1600);
    }

    #[test]
    fn test_tablet_drops_low_priority_columns() {
        let layout = compute_layout(&columns(2), 900, LayoutMode::Header);
        assert_eq!(layout.breakpoint, Breakpoint::Tablet);
        assert_eq!(layout.display, DisplayMode::ReducedTable);
        assert_eq!(layout.columns, vec![0, 3, 4]);
    }

    #[test]
    fn test_mobile_with_two_essential_columns_reduces() {
        let layout = compute_layout(&columns(2), 500, LayoutMode::Header);
        assert_eq!(layout.display, DisplayMode::ReducedTable);
        assert_eq!(layout.columns, vec![3, 4]);
    }

    #[test]
    fn test_mobile_with_many_essential_columns_uses_cards() {
        let layout = compute_layout(&columns(3), 500, LayoutMode::Header);
        assert_eq!(layout.display, DisplayMode::Cards);
        // Cards carry every visible field
        assert_eq!(layout.columns, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_hidden_essential_columns_do_not_count() {
        // NOTAS is priority 1 but hidden
        let layout = compute_layout(&columns(2), 500, LayoutMode::Header);
        assert_ne!(layout.display, DisplayMode::Cards);
    }

    #[test]
    fn test_no_visible_essential_column_falls_back_to_cards() {
        let layout = compute_layout(&columns(0), 500, LayoutMode::Header);
        assert_eq!(layout.breakpoint, Breakpoint::Mobile);
        assert_eq!(layout.display, DisplayMode::Cards);
        assert_eq!(layout.columns, vec![0, 1]);

        let mut only_low = columns(0);
        only_low[0].visible = false;
        let layout = compute_layout(&only_low, 900, LayoutMode::Header);
        assert_eq!(layout.display, DisplayMode::Cards);
        assert_eq!(layout.columns, vec![1]);
    }

    #[test]
    fn test_sidebar_reserves_width() {
        let layout = compute_layout(&columns(1), 1200, LayoutMode::Sidebar);
        assert_eq!(layout.container_width, 1200 - SIDEBAR_WIDTH);
        assert_eq!(LayoutMode::Sidebar.toggled(), LayoutMode::Header);
    }
}
