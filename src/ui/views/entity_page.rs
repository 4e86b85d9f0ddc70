//! List screen for one entity.
//!
//! The page owns the pagination cursor and the request generation; the
//! [`DataTable`] owns everything about presentation. Fetches are described
//! as [`Request`]s for the main loop to run. Every refresh bumps the
//! generation, and answers carrying an older one are dropped without a
//! word.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tracing::{debug, trace};

use crate::api::{ApiError, Page};
use crate::cache::CacheStatus;
use crate::catalog::Entity;
use crate::events::Action;
use crate::table::{
    DataTable, LayoutMode, LoadState, PreferenceStore, TableOptions, TableOutcome,
    CELL_WIDTH_UNITS,
};
use crate::tasks::Request;
use crate::ui::components::{
    column_area_units, render_data_table, TableGeometry, TableViewport, WHEEL_STEP,
};
use crate::ui::theme::theme;

/// Two clicks on the same record within this window open it.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Pagination state, owned by the page rather than the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// The page the next "load more" asks for.
    pub next_page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub total: Option<u64>,
}

impl PageCursor {
    fn new(page_size: u32) -> Self {
        Self {
            next_page: 1,
            page_size,
            has_more: false,
            total: None,
        }
    }
}

/// What the page asks of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    Request(Request),
    /// Open the record with this key.
    Open(String),
    OpenColumnPicker,
    /// A table change worth telling the user about.
    Changed(TableOutcome),
}

pub struct EntityPage {
    entity: Entity,
    table: DataTable,
    viewport: TableViewport,
    geometry: TableGeometry,
    cursor: PageCursor,
    generation: u64,
    is_loading: bool,
    is_loading_more: bool,
    loaded: bool,
    cache_status: Option<CacheStatus>,
    /// Text being typed into the quick filter, while the filter bar has focus.
    filter_input: Option<String>,
    /// Re-check the scroll position on the next tick.
    scroll_check_pending: bool,
    last_click: Option<(usize, Instant)>,
}

impl EntityPage {
    pub fn new(entity: Entity, store: PreferenceStore, options: TableOptions, page_size: u32) -> Self {
        Self {
            entity,
            table: DataTable::mount(entity.table_spec(), store, options),
            viewport: TableViewport::default(),
            geometry: TableGeometry::default(),
            cursor: PageCursor::new(page_size),
            generation: 0,
            is_loading: false,
            is_loading_more: false,
            loaded: false,
            cache_status: None,
            filter_input: None,
            scroll_check_pending: false,
            last_click: None,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DataTable {
        &mut self.table
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading || self.is_loading_more
    }

    pub fn is_filtering(&self) -> bool {
        self.filter_input.is_some()
    }

    /// Whether the page has never loaded and nothing is on its way.
    pub fn needs_load(&self) -> bool {
        !self.loaded && !self.is_loading()
    }

    pub fn viewport(&self) -> TableViewport {
        self.viewport
    }

    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    fn sync_load_state(&mut self, now: Instant) {
        self.table.set_load_state(
            LoadState {
                is_loading: self.is_loading,
                is_loading_more: self.is_loading_more,
                has_more_data: self.cursor.has_more,
            },
            now,
        );
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Start over from the first page. Supersedes anything in flight.
    pub fn refresh(&mut self, now: Instant) -> Request {
        self.generation += 1;
        self.is_loading = true;
        self.is_loading_more = false;
        self.cursor.next_page = 1;
        self.sync_load_state(now);
        debug!(entity = %self.entity, generation = self.generation, "Refreshing page");
        Request::FetchPage {
            entity: self.entity,
            generation: self.generation,
            page: 1,
            page_size: self.cursor.page_size,
            append: false,
        }
    }

    /// Request the next page, unless one is already coming or there is none.
    pub fn load_next_page(&mut self, now: Instant) -> Option<Request> {
        if !self.cursor.has_more || self.is_loading() {
            return None;
        }
        self.is_loading_more = true;
        self.sync_load_state(now);
        debug!(entity = %self.entity, page = self.cursor.next_page, "Loading next page");
        Some(Request::FetchPage {
            entity: self.entity,
            generation: self.generation,
            page: self.cursor.next_page,
            page_size: self.cursor.page_size,
            append: true,
        })
    }

    /// Forget the fetch in flight: its answer will be stale.
    pub fn cancel(&mut self, now: Instant) {
        if self.is_loading() {
            self.generation += 1;
            self.is_loading = false;
            self.is_loading_more = false;
            self.sync_load_state(now);
            debug!(entity = %self.entity, "Cancelled page fetch");
        }
    }

    /// Apply a fetched page. Stale answers are ignored; errors are handed
    /// back after the loading flags are cleared. `has_more` is left alone on
    /// failure so a later scroll tries again.
    pub fn on_page_fetched(
        &mut self,
        generation: u64,
        append: bool,
        result: Result<(Page, CacheStatus), ApiError>,
        now: Instant,
    ) -> Result<(), ApiError> {
        if generation != self.generation {
            trace!(
                entity = %self.entity,
                generation,
                current = self.generation,
                "Ignoring stale page"
            );
            return Ok(());
        }

        self.is_loading = false;
        self.is_loading_more = false;

        let outcome = match result {
            Ok((page, status)) => {
                debug!(
                    entity = %self.entity,
                    page = page.page,
                    rows = page.rows.len(),
                    has_more = page.has_more,
                    "Page arrived"
                );
                self.cursor.next_page = page.page + 1;
                self.cursor.has_more = page.has_more;
                self.cursor.total = page.total.or(self.cursor.total);
                self.cache_status = Some(status);
                if append {
                    self.table.append_rows(page.rows);
                } else {
                    self.cursor.total = page.total;
                    self.table.set_rows(page.rows);
                    self.viewport.offset = 0;
                    if self.table.selected_key().is_none() {
                        self.table.select_first();
                    }
                }
                self.loaded = true;
                self.scroll_check_pending = true;
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.sync_load_state(now);
        outcome
    }

    /// Ask the table whether the viewport is near the end of loaded data.
    fn check_scroll(&mut self, now: Instant) -> Option<PageAction> {
        let visible = self.geometry.visible_records;
        if visible == 0 {
            return None;
        }
        let metrics = self.viewport.metrics(visible, self.table.display_len());
        match self.table.on_scroll(metrics, now)? {
            TableOutcome::LoadNextPage => self.load_next_page(now).map(PageAction::Request),
            _ => None,
        }
    }

    /// Keep the selection on screen, then check the scroll position.
    fn after_navigation(&mut self, now: Instant) -> Option<PageAction> {
        let visible = self.geometry.visible_records;
        self.viewport
            .follow(self.table.selected_index(), visible, self.table.display_len());
        self.check_scroll(now)
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_action(&mut self, action: Action, now: Instant) -> Option<PageAction> {
        let page_step = self.geometry.visible_records.max(1) as isize;
        match action {
            Action::Down => {
                self.table.move_selection(1);
                self.after_navigation(now)
            }
            Action::Up => {
                self.table.move_selection(-1);
                self.after_navigation(now)
            }
            Action::PageDown => {
                self.table.move_selection(page_step);
                self.after_navigation(now)
            }
            Action::PageUp => {
                self.table.move_selection(-page_step);
                self.after_navigation(now)
            }
            Action::Top => {
                self.table.select_first();
                self.after_navigation(now)
            }
            Action::Bottom => {
                self.table.select_last();
                self.after_navigation(now)
            }
            Action::Open => match self.table.activate_selected()? {
                TableOutcome::RowActivated(key) => Some(PageAction::Open(key)),
                _ => None,
            },
            Action::FocusColumnLeft => {
                self.table.focus_column(-1);
                None
            }
            Action::FocusColumnRight => {
                self.table.focus_column(1);
                None
            }
            Action::SortFocused => self.table.sort_by_focused().map(PageAction::Changed),
            Action::NarrowColumn => self
                .table
                .nudge_focused_width(-(CELL_WIDTH_UNITS as i64))
                .map(PageAction::Changed),
            Action::WidenColumn => self
                .table
                .nudge_focused_width(CELL_WIDTH_UNITS as i64)
                .map(PageAction::Changed),
            Action::Filter => {
                let current = self
                    .table
                    .pending_filter()
                    .unwrap_or(self.table.filter())
                    .to_string();
                self.filter_input = Some(current);
                None
            }
            Action::ColumnPicker => Some(PageAction::OpenColumnPicker),
            Action::Refresh => Some(PageAction::Request(self.refresh(now))),
            Action::ResetTable => {
                self.viewport.column_offset = 0;
                Some(PageAction::Changed(self.table.reset_to_defaults()))
            }
            Action::Back => {
                if self.table.layout().is_dragging() {
                    self.table.cancel_resize();
                } else if !self.table.filter().is_empty() {
                    self.table.clear_filter();
                }
                None
            }
            _ => None,
        }
    }

    /// Keys typed while the filter bar has focus. The filter is applied
    /// once typing pauses.
    pub fn handle_filter_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(text) = self.filter_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => {
                text.push(c);
                let text = text.clone();
                self.table.input_filter(text, now);
            }
            KeyCode::Backspace => {
                text.pop();
                let text = text.clone();
                self.table.input_filter(text, now);
            }
            KeyCode::Enter => {
                self.filter_input = None;
            }
            KeyCode::Esc => {
                self.filter_input = None;
                self.table.clear_filter();
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> Option<PageAction> {
        let (x, y) = (mouse.column, mouse.row);
        let units = x as i64 * CELL_WIDTH_UNITS as i64;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = self.geometry.resize_handle_at(x, y) {
                    self.table.begin_resize(index, units);
                    return None;
                }
                if let Some(index) = self.geometry.header_column_at(x, y) {
                    let id = self.table.columns().get(index)?.id();
                    return self.table.sort_by(id).map(PageAction::Changed);
                }
                if !self.geometry.contains(x, y) {
                    return None;
                }
                let record = self.geometry.record_at(y, self.viewport.offset)?;
                if record >= self.table.display_len() {
                    return None;
                }
                self.table.select_index(record);

                let double = matches!(
                    self.last_click,
                    Some((previous, at)) if previous == record && now.duration_since(at) <= DOUBLE_CLICK
                );
                if double {
                    self.last_click = None;
                    return match self.table.activate_selected()? {
                        TableOutcome::RowActivated(key) => Some(PageAction::Open(key)),
                        _ => None,
                    };
                }
                self.last_click = Some((record, now));
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.table.drag_resize(units, now);
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.table.end_resize().map(PageAction::Changed)
            }
            MouseEventKind::ScrollDown => {
                self.scroll(WHEEL_STEP as isize);
                self.check_scroll(now)
            }
            MouseEventKind::ScrollUp => {
                self.scroll(-(WHEEL_STEP as isize));
                None
            }
            _ => None,
        }
    }

    fn scroll(&mut self, delta: isize) {
        let visible = self.geometry.visible_records;
        self.viewport
            .scroll_by(delta, visible, self.table.display_len());
    }

    /// Apply the debounced filter and any deferred scroll check.
    pub fn tick(&mut self, now: Instant) -> Option<PageAction> {
        if self.table.tick(now) {
            self.viewport.offset = 0;
        }
        if std::mem::take(&mut self.scroll_check_pending) {
            return self.check_scroll(now);
        }
        None
    }

    /// Terminal width in cells.
    pub fn set_terminal_width(&mut self, cells: u16) {
        self.table
            .set_viewport_width(cells as u32 * CELL_WIDTH_UNITS);
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.table.set_layout_mode(mode);
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn status_text(&self) -> String {
        let loaded = self.table.rows().len();
        let mut parts = Vec::new();
        if self.table.filter().is_empty() {
            parts.push(match self.cursor.total {
                Some(total) => format!("{} de {} registros", loaded, total),
                None => format!("{} registros", loaded),
            });
        } else {
            parts.push(format!(
                "{} coincidencias en {} cargados",
                self.table.display_len(),
                loaded
            ));
        }
        if self.is_loading_more {
            parts.push("cargando más…".to_string());
        } else if self.cursor.has_more {
            parts.push("más disponibles".to_string());
        }
        if let Some(status) = self.cache_status.filter(|s| s.is_cached()) {
            parts.push(format!("{} {}", status.icon(), status.text()));
        }
        parts.join(" · ")
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let show_filter = self.filter_input.is_some() || !self.table.filter().is_empty();
        let (filter_area, table_area) = if show_filter {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(3)])
                .split(area);
            (Some(chunks[0]), chunks[1])
        } else {
            (None, area)
        };

        if let Some(filter_area) = filter_area {
            let (text, style) = match &self.filter_input {
                Some(input) => (format!(" / {}▏", input), t.header_style()),
                None => (format!(" / {}", self.table.filter()), t.dim_style()),
            };
            frame.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), filter_area);
        }

        if !self.table.layout().is_dragging() {
            let shown = self.table.responsive().columns.len();
            self.table
                .set_container_width(column_area_units(table_area, shown));
        }

        let status = self.status_text();
        self.geometry = render_data_table(
            frame,
            table_area,
            &self.table,
            &mut self.viewport,
            self.entity.title(),
            &status,
        );
    }
}
