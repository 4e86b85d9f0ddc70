//! Terminal rendering of a [`DataTable`].
//!
//! The engine decides what to show; this module decides where. Widths are
//! converted from layout units to cells, columns that do not fit are
//! scrolled horizontally around the focused one, and the geometry of every
//! frame is returned so mouse events can be hit-tested against it.

use ratatui::{
    layout::{Alignment, Constraint, Flex, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table},
    Frame,
};

use crate::table::{
    DataTable, DisplayMode, ScrollMetrics, CELL_WIDTH_UNITS, ROW_HEIGHT_UNITS,
};
use crate::ui::theme::theme;

/// Blank cells between adjacent columns.
const COLUMN_SPACING: u16 = 1;

/// Rows moved by one mouse wheel notch.
pub const WHEEL_STEP: usize = 3;

/// Where one column landed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSlot {
    /// Index into [`DataTable::columns`].
    pub index: usize,
    pub x: u16,
    pub width: u16,
}

impl ColumnSlot {
    fn right_edge(&self) -> u16 {
        self.x + self.width
    }
}

/// Screen geometry of the last rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGeometry {
    /// Area inside the border.
    pub inner: Rect,
    /// Header row, absent in card mode.
    pub header_y: Option<u16>,
    pub body_y: u16,
    /// Screen lines per displayed record (1 for rows, more for cards).
    pub record_height: u16,
    /// Records that fit in the body.
    pub visible_records: usize,
    pub slots: Vec<ColumnSlot>,
}

impl TableGeometry {
    /// Column whose resize handle (its right border) is at `(x, y)`.
    pub fn resize_handle_at(&self, x: u16, y: u16) -> Option<usize> {
        if self.header_y != Some(y) {
            return None;
        }
        self.slots
            .iter()
            .find(|s| x + 1 == s.right_edge() || x == s.right_edge())
            .map(|s| s.index)
    }

    /// Column whose header cell covers `(x, y)`.
    pub fn header_column_at(&self, x: u16, y: u16) -> Option<usize> {
        if self.header_y != Some(y) {
            return None;
        }
        self.slots
            .iter()
            .find(|s| x >= s.x && x < s.right_edge())
            .map(|s| s.index)
    }

    /// Display index of the record drawn at line `y`.
    pub fn record_at(&self, y: u16, offset: usize) -> Option<usize> {
        if y < self.body_y || self.record_height == 0 {
            return None;
        }
        let slot = ((y - self.body_y) / self.record_height) as usize;
        (slot < self.visible_records).then_some(offset + slot)
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.inner.x
            && x < self.inner.x + self.inner.width
            && y >= self.inner.y
            && y < self.inner.y + self.inner.height
    }
}

/// Scroll position kept by the host between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableViewport {
    /// First displayed record.
    pub offset: usize,
    /// Position (within the responsive column list) of the first drawn column.
    pub column_offset: usize,
}

impl TableViewport {
    /// Scroll so `selected` is within the `visible` records.
    pub fn follow(&mut self, selected: Option<usize>, visible: usize, total: usize) {
        let visible = visible.max(1);
        if let Some(selected) = selected {
            if selected < self.offset {
                self.offset = selected;
            } else if selected >= self.offset + visible {
                self.offset = selected + 1 - visible;
            }
        }
        self.clamp(visible, total);
    }

    /// Scroll by `delta` records without moving the selection.
    pub fn scroll_by(&mut self, delta: isize, visible: usize, total: usize) {
        self.offset = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta as usize)
        };
        self.clamp(visible.max(1), total);
    }

    fn clamp(&mut self, visible: usize, total: usize) {
        self.offset = self.offset.min(total.saturating_sub(visible));
    }

    /// Scroll position in layout units, for the infinite scroll check.
    pub fn metrics(&self, visible: usize, total: usize) -> ScrollMetrics {
        ScrollMetrics::new(
            self.offset as u32 * ROW_HEIGHT_UNITS,
            visible as u32 * ROW_HEIGHT_UNITS,
            total as u32 * ROW_HEIGHT_UNITS,
        )
    }
}

/// Layout-unit width to cells, never zero.
pub fn units_to_cells(units: u32) -> u16 {
    (units / CELL_WIDTH_UNITS).clamp(1, u16::MAX as u32) as u16
}

/// Units left for column cells when `columns` columns are drawn into
/// `area`, after the border and the gaps between columns.
pub fn column_area_units(area: Rect, columns: usize) -> u32 {
    let inner = area.width.saturating_sub(2) as u32;
    let gaps = columns.saturating_sub(1) as u32 * COLUMN_SPACING as u32;
    inner.saturating_sub(gaps) * CELL_WIDTH_UNITS
}

/// Lay out `widths` (column index, cells) left to right from
/// `column_offset`, stopping at `available`. The last column is clipped.
pub fn fit_columns(widths: &[(usize, u16)], available: u16, column_offset: usize) -> Vec<ColumnSlot> {
    let mut slots = Vec::new();
    let mut x: u16 = 0;
    for &(index, width) in widths.iter().skip(column_offset) {
        if x >= available {
            break;
        }
        let width = width.min(available - x);
        slots.push(ColumnSlot { index, x, width });
        x = x.saturating_add(width).saturating_add(COLUMN_SPACING);
    }
    slots
}

/// Smallest change to `column_offset` that shows the column at position
/// `focused` in full (or at least first, if it is wider than `available`).
pub fn keep_column_visible(
    widths: &[(usize, u16)],
    available: u16,
    column_offset: usize,
    focused: usize,
) -> usize {
    if focused >= widths.len() {
        return column_offset.min(widths.len().saturating_sub(1));
    }
    if focused < column_offset {
        return focused;
    }
    let mut offset = column_offset;
    while offset < focused {
        let span: u32 = widths[offset..=focused]
            .iter()
            .map(|&(_, w)| w as u32 + COLUMN_SPACING as u32)
            .sum::<u32>()
            - COLUMN_SPACING as u32;
        if span <= available as u32 {
            break;
        }
        offset += 1;
    }
    offset
}

/// Draw `table` into `area` and report where everything went.
pub fn render_data_table(
    frame: &mut Frame,
    area: Rect,
    table: &DataTable,
    viewport: &mut TableViewport,
    title: &str,
    status: &str,
) -> TableGeometry {
    let t = theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(t.border_style(true))
        .title(Span::styled(format!(" {} ", title), t.header_style()))
        .title_bottom(Line::from(Span::styled(format!(" {} ", status), t.dim_style())));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if table.display_len() == 0 {
        let message = if table.load_state().is_loading {
            "Cargando..."
        } else if !table.filter().is_empty() {
            "Ningún registro coincide con el filtro"
        } else {
            "No hay registros"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(message, t.dim_style())).alignment(Alignment::Center),
            inner,
        );
        viewport.offset = 0;
        return TableGeometry {
            inner,
            body_y: inner.y,
            record_height: 1,
            ..TableGeometry::default()
        };
    }

    match table.responsive().display {
        DisplayMode::Cards => render_cards(frame, inner, table, viewport),
        DisplayMode::FullTable | DisplayMode::ReducedTable => {
            render_rows(frame, inner, table, viewport)
        }
    }
}

fn render_rows(
    frame: &mut Frame,
    inner: Rect,
    table: &DataTable,
    viewport: &mut TableViewport,
) -> TableGeometry {
    let t = theme();
    let columns = table.columns();
    let shown = &table.responsive().columns;

    let widths: Vec<(usize, u16)> = shown
        .iter()
        .map(|&i| (i, units_to_cells(table.effective_width(i))))
        .collect();
    let focused_position = shown
        .iter()
        .position(|&i| i == table.focused_column())
        .unwrap_or(0);
    viewport.column_offset =
        keep_column_visible(&widths, inner.width, viewport.column_offset, focused_position);
    let slots = fit_columns(&widths, inner.width, viewport.column_offset);

    let visible = inner.height.saturating_sub(1) as usize;
    let total = table.display_len();
    viewport.follow(table.selected_index(), visible, total);

    let dragging = table.layout().is_dragging();
    let header = TableRow::new(slots.iter().map(|slot| {
        let column = &columns[slot.index];
        let mut label = column.label().to_string();
        if let Some(sort) = table.sort().filter(|s| s.column == column.id()) {
            label.push(' ');
            label.push_str(sort.direction.arrow());
        }
        let mut style = t.header_style();
        if slot.index == table.focused_column() {
            style = style.add_modifier(Modifier::UNDERLINED);
            if dragging {
                style = style.fg(t.accent);
            }
        }
        Cell::from(label).style(style)
    }));

    let selected = table.selected_index();
    let body: Vec<TableRow> = (viewport.offset..(viewport.offset + visible).min(total))
        .filter_map(|i| table.display_row(i).map(|row| (i, row)))
        .map(|(i, row)| {
            let cells = slots
                .iter()
                .map(|slot| Cell::from(columns[slot.index].format_cell(row)));
            let row_widget = TableRow::new(cells);
            if Some(i) == selected {
                row_widget.style(t.selected_style())
            } else {
                row_widget.style(Style::default().fg(t.fg))
            }
        })
        .collect();

    let widget = Table::new(body, slots.iter().map(|s| Constraint::Length(s.width)))
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .flex(Flex::Start);
    frame.render_widget(widget, inner);

    let slots = slots
        .into_iter()
        .map(|s| ColumnSlot {
            x: inner.x + s.x,
            ..s
        })
        .collect();

    TableGeometry {
        inner,
        header_y: Some(inner.y),
        body_y: inner.y + 1,
        record_height: 1,
        visible_records: visible,
        slots,
    }
}

/// One bordered card per record, every visible field on its own line.
fn render_cards(
    frame: &mut Frame,
    inner: Rect,
    table: &DataTable,
    viewport: &mut TableViewport,
) -> TableGeometry {
    let t = theme();
    let columns = table.columns();
    let shown = &table.responsive().columns;
    let record_height = shown.len() as u16 + 2;
    let visible = (inner.height / record_height.max(1)) as usize;
    let total = table.display_len();
    viewport.follow(table.selected_index(), visible, total);

    let label_width = shown
        .iter()
        .map(|&i| columns[i].label().chars().count())
        .max()
        .unwrap_or(0);
    let selected = table.selected_index();

    for (slot, i) in (viewport.offset..(viewport.offset + visible).min(total)).enumerate() {
        let Some(row) = table.display_row(i) else {
            continue;
        };
        let area = Rect::new(
            inner.x,
            inner.y + slot as u16 * record_height,
            inner.width,
            record_height,
        );
        let is_selected = Some(i) == selected;
        let key = table.spec().row_key(row).unwrap_or_default();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style(is_selected))
            .title(Span::styled(format!(" {} ", key), t.dim_style()));

        let lines: Vec<Line> = shown
            .iter()
            .map(|&c| {
                let column = &columns[c];
                Line::from(vec![
                    Span::styled(
                        format!("{:<width$} ", column.label(), width = label_width),
                        t.header_style(),
                    ),
                    Span::raw(column.format_cell(row)),
                ])
            })
            .collect();

        let mut paragraph = Paragraph::new(lines).block(block);
        if is_selected {
            paragraph = paragraph.style(t.selected_style());
        }
        frame.render_widget(paragraph, area);
    }

    TableGeometry {
        inner,
        header_y: None,
        body_y: inner.y,
        record_height,
        visible_records: visible,
        slots: Vec::new(),
    }
}
