//! Generic, headless data-table engine.
//!
//! One [`DataTable`] instance drives one table on screen. It is configured
//! by a [`TableSpec`] (column catalog + primary-key field) and owns the
//! merged column state, client-side sort and filter, selection, resize
//! gesture, infinite-scroll guard and responsive layout. The host feeds it
//! rows and loading flags and receives [`TableOutcome`]s back; the engine
//! never fetches data itself.
//!
//! Geometry is expressed in abstract layout units. Terminal front-ends map
//! one cell to [`CELL_WIDTH_UNITS`] horizontally and one row to
//! [`ROW_HEIGHT_UNITS`] vertically.

pub mod column;
pub mod layout;
pub mod prefs;
pub mod responsive;
pub mod scroll;
pub mod selection;
pub mod sort;
pub mod timing;
pub mod value;

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

pub use column::{Column, ColumnConfig, ColumnDescriptor, ColumnType};
pub use layout::{ColumnLayout, ResizeState, WidthCommit};
pub use prefs::{JsonFileBackend, KeyValueBackend, MemoryBackend, PreferenceStore, TablePreferences};
pub use responsive::{Breakpoint, DisplayMode, LayoutMode, ResponsiveLayout};
pub use scroll::{InfiniteScroll, LoadState, ScrollMetrics};
pub use selection::Selection;
pub use sort::{SortConfig, SortDirection};
pub use timing::{Debouncer, Throttle};

/// An opaque record as delivered by the API.
pub type Row = serde_json::Map<String, Value>;

/// Horizontal layout units per terminal cell.
pub const CELL_WIDTH_UNITS: u32 = 8;

/// Vertical layout units per table row.
pub const ROW_HEIGHT_UNITS: u32 = 40;

/// Viewport assumed until the host reports a real one.
const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Marks selection keys made up for rows without a primary key. JSON keys
/// from the API never start with a NUL.
const POSITIONAL_KEY_PREFIX: char = '\u{0}';

fn positional_key(index: usize) -> String {
    format!("{}{}", POSITIONAL_KEY_PREFIX, index)
}

/// Whether `key` was made up for a row without a primary key.
pub fn is_positional_key(key: &str) -> bool {
    key.starts_with(POSITIONAL_KEY_PREFIX)
}

/// Static configuration of one table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Persistence id; also the preference key suffix.
    pub table_id: &'static str,
    /// Field holding each row's primary key.
    pub key_field: &'static str,
    /// Column catalog in default display order.
    pub columns: Vec<ColumnDescriptor>,
    /// Whether users may reorder columns.
    pub reorderable: bool,
}

impl TableSpec {
    /// The primary key of `row`, if present.
    pub fn row_key(&self, row: &Row) -> Option<String> {
        match row.get(self.key_field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Catalog entry for column `id`.
    pub fn descriptor(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// Tunables for a table instance.
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Distance from the bottom, in units, that triggers the next page.
    pub scroll_threshold: u32,
    /// Minimum time between two load requests.
    pub load_cooldown: Duration,
    /// Pause in typing before a filter is applied.
    pub filter_debounce: Duration,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            scroll_threshold: scroll::DEFAULT_SCROLL_THRESHOLD,
            load_cooldown: scroll::DEFAULT_LOAD_COOLDOWN,
            filter_debounce: timing::DEFAULT_FILTER_DEBOUNCE,
        }
    }
}

/// What the table reports back to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    /// The selected row changed.
    RowSelected(String),
    /// A row was opened (Enter or double click).
    RowActivated(String),
    /// The host should fetch the next page.
    LoadNextPage,
    /// The sort changed (already applied and persisted).
    SortChanged(SortConfig),
    /// Column visibility, order or width changed (already persisted).
    ColumnsChanged,
}

/// The table engine.
pub struct DataTable {
    spec: TableSpec,
    store: PreferenceStore,
    /// Merged columns in display order.
    columns: Vec<Column>,
    sort: Option<SortConfig>,
    rows: Vec<Row>,
    /// Indices into `rows` after filtering and sorting.
    view: Vec<usize>,
    filter: String,
    pending_filter: Option<String>,
    debouncer: Debouncer,
    selection: Selection,
    layout: ColumnLayout,
    scroll: InfiniteScroll,
    load: LoadState,
    viewport_width: u32,
    layout_mode: LayoutMode,
    responsive: ResponsiveLayout,
    /// Index into `columns` of the column targeted by keyboard sort/resize.
    focused_column: usize,
}

impl DataTable {
    /// Create a table, merging any persisted preferences over the catalog.
    pub fn mount(spec: TableSpec, store: PreferenceStore, options: TableOptions) -> Self {
        let prefs = store.load_table(spec.table_id);
        let mut columns = column::merge(&spec.columns, &prefs.columns_config);
        if spec.reorderable {
            if let Some(order) = &prefs.column_order {
                columns = column::apply_order(columns, order);
            }
        }

        let sort = prefs.sort.filter(|s| {
            spec.descriptor(&s.column)
                .map(|d| d.sortable)
                .unwrap_or(false)
        });

        debug!(
            table = spec.table_id,
            overrides = prefs.columns_config.len(),
            sort = ?sort,
            "Mounted table"
        );

        let layout_mode = LayoutMode::default();
        let responsive = responsive::compute_layout(&columns, DEFAULT_VIEWPORT_WIDTH, layout_mode);
        let focused_column = responsive.columns.first().copied().unwrap_or(0);

        Self {
            layout: ColumnLayout::new(responsive.container_width),
            spec,
            store,
            columns,
            sort,
            rows: Vec::new(),
            view: Vec::new(),
            filter: String::new(),
            pending_filter: None,
            debouncer: Debouncer::new(options.filter_debounce),
            selection: Selection::new(),
            scroll: InfiniteScroll::new(options.scroll_threshold, options.load_cooldown),
            load: LoadState::default(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            layout_mode,
            responsive,
            focused_column,
        }
    }

    /// The static configuration this table was mounted with.
    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Preference key suffix for this table.
    pub fn table_id(&self) -> &'static str {
        self.spec.table_id
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// Replace the data set. The selection survives only if its key is
    /// still present.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.scroll.reset();
        self.rebuild_view();
    }

    /// Append a further page of rows.
    pub fn append_rows(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
        self.rebuild_view();
    }

    /// All loaded rows in arrival order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows after filtering.
    pub fn display_len(&self) -> usize {
        self.view.len()
    }

    /// Row at a display index, after filtering and sorting.
    pub fn display_row(&self, index: usize) -> Option<&Row> {
        self.view.get(index).map(|&i| &self.rows[i])
    }

    /// Rows in display order (filtered and sorted).
    pub fn display_rows(&self) -> impl Iterator<Item = &Row> {
        self.view.iter().map(move |&i| &self.rows[i])
    }

    /// Primary key of the loaded row `index`, or a positional key for rows
    /// without one.
    fn key_at(&self, index: usize) -> String {
        self.spec
            .row_key(&self.rows[index])
            .unwrap_or_else(|| positional_key(index))
    }

    fn display_keys(&self) -> Vec<String> {
        self.view.iter().map(|&i| self.key_at(i)).collect()
    }

    fn rebuild_view(&mut self) {
        let needle = value::fold_text(self.filter.trim());
        let mut view: Vec<usize> = (0..self.rows.len())
            .filter(|&i| needle.is_empty() || self.row_matches(&self.rows[i], &needle))
            .collect();

        if let Some(sort) = &self.sort {
            if let Some(column_type) = self
                .spec
                .descriptor(&sort.column)
                .map(|d| d.column_type)
            {
                sort::sort_indices(&self.rows, &mut view, &sort.column, sort.direction, column_type);
            }
        }

        self.view = view;
        let keys = self.display_keys();
        self.selection.retain_in(&keys);
    }

    fn row_matches(&self, row: &Row, needle: &str) -> bool {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .any(|c| value::fold_text(&c.format_cell(row)).contains(needle))
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Key of the selected row. Rows without a primary key report a
    /// positional key; see [`is_positional_key`].
    pub fn selected_key(&self) -> Option<&str> {
        self.selection.key()
    }

    /// Display index of the selected row.
    pub fn selected_index(&self) -> Option<usize> {
        self.selection.index_in(&self.display_keys())
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.selected_index().and_then(|i| self.display_row(i))
    }

    /// Move the selection by `delta` rows, clamping at the ends.
    pub fn move_selection(&mut self, delta: isize) -> Option<TableOutcome> {
        let keys = self.display_keys();
        self.selection.move_by(&keys, delta).map(TableOutcome::RowSelected)
    }

    /// Select the first displayed row (Home).
    pub fn select_first(&mut self) -> Option<TableOutcome> {
        let keys = self.display_keys();
        self.selection.first(&keys).map(TableOutcome::RowSelected)
    }

    /// Select the last displayed row (End).
    pub fn select_last(&mut self) -> Option<TableOutcome> {
        let keys = self.display_keys();
        self.selection.last(&keys).map(TableOutcome::RowSelected)
    }

    /// Select the row at a display index (e.g. from a click).
    pub fn select_index(&mut self, index: usize) -> Option<TableOutcome> {
        let key = self.view.get(index).map(|&i| self.key_at(i))?;
        if self.selection.key() == Some(key.as_str()) {
            return None;
        }
        self.selection.select(key.clone());
        Some(TableOutcome::RowSelected(key))
    }

    /// Open the selected row.
    pub fn activate_selected(&self) -> Option<TableOutcome> {
        self.selection
            .key()
            .map(|key| TableOutcome::RowActivated(key.to_string()))
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Merged columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id() == id)
    }

    /// Show or hide a column. The last visible column cannot be hidden.
    pub fn toggle_column(&mut self, id: &str) -> Option<TableOutcome> {
        let index = self.column_index(id)?;
        let visible_count = self.columns.iter().filter(|c| c.visible).count();
        if self.columns[index].visible && visible_count <= 1 {
            debug!(table = self.spec.table_id, column = id, "Refusing to hide the last visible column");
            return None;
        }
        self.columns[index].visible = !self.columns[index].visible;
        debug!(table = self.spec.table_id, column = id, visible = self.columns[index].visible, "Toggled column");
        self.columns_changed();
        Some(TableOutcome::ColumnsChanged)
    }

    /// Move a column `delta` positions (reorderable tables only).
    pub fn move_column(&mut self, id: &str, delta: isize) -> Option<TableOutcome> {
        if !self.spec.reorderable {
            return None;
        }
        let from = self.column_index(id)?;
        let to = (from as isize + delta).clamp(0, self.columns.len() as isize - 1) as usize;
        if from == to {
            return None;
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        self.columns_changed();
        self.focused_column = self.column_index(id).unwrap_or(0);
        Some(TableOutcome::ColumnsChanged)
    }

    /// Commit a column width into state and persist it.
    pub fn commit_width(&mut self, index: usize, width: u32) -> Option<TableOutcome> {
        let column = self.columns.get_mut(index)?;
        if column.width == width {
            return None;
        }
        column.width = width;
        self.persist();
        Some(TableOutcome::ColumnsChanged)
    }

    /// Restore catalog defaults and clear persisted preferences.
    pub fn reset_to_defaults(&mut self) -> TableOutcome {
        info!(table = self.spec.table_id, "Resetting table to defaults");
        self.layout.cancel_resize();
        self.columns = column::merge(&self.spec.columns, &[]);
        self.sort = None;
        self.store.reset_table(self.spec.table_id);
        self.recompute_responsive();
        self.rebuild_view();
        TableOutcome::ColumnsChanged
    }

    fn columns_changed(&mut self) {
        self.persist();
        self.recompute_responsive();
        self.rebuild_view();
    }

    fn persist(&self) {
        let prefs = TablePreferences {
            columns_config: self.columns.iter().map(Column::to_config).collect(),
            column_order: self
                .spec
                .reorderable
                .then(|| self.columns.iter().map(|c| c.id().to_string()).collect()),
            sort: self.sort.clone(),
        };
        self.store.save_table(self.spec.table_id, &prefs);
    }

    /// Index into [`columns`](Self::columns) of the keyboard-focused column.
    pub fn focused_column(&self) -> usize {
        self.focused_column
    }

    /// Move keyboard focus among the rendered columns.
    pub fn focus_column(&mut self, delta: isize) {
        let rendered = &self.responsive.columns;
        if rendered.is_empty() {
            return;
        }
        let current = rendered
            .iter()
            .position(|&i| i == self.focused_column)
            .unwrap_or(0);
        let next = (current as isize + delta).clamp(0, rendered.len() as isize - 1) as usize;
        self.focused_column = rendered[next];
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// The active sort, if any.
    pub fn sort(&self) -> Option<&SortConfig> {
        self.sort.as_ref()
    }

    /// Sort by `column_id`, flipping direction if it is already active.
    pub fn sort_by(&mut self, column_id: &str) -> Option<TableOutcome> {
        let descriptor = self.spec.descriptor(column_id)?;
        if !descriptor.sortable {
            return None;
        }
        let next = SortConfig::next_for(self.sort.as_ref(), column_id);
        debug!(table = self.spec.table_id, column = column_id, direction = ?next.direction, "Sorting");
        self.sort = Some(next.clone());
        self.persist();
        self.rebuild_view();
        Some(TableOutcome::SortChanged(next))
    }

    /// Sort by the keyboard-focused column.
    pub fn sort_by_focused(&mut self) -> Option<TableOutcome> {
        let id = self.columns.get(self.focused_column)?.id();
        self.sort_by(id)
    }

    // ------------------------------------------------------------------
    // Resizing
    // ------------------------------------------------------------------

    /// Width state and any resize gesture in progress.
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Width to draw for `columns()[index]`, including a drag preview.
    pub fn effective_width(&self, index: usize) -> u32 {
        self.layout.effective_width(&self.columns, index)
    }

    /// Start dragging the right edge of `columns()[index]` from pointer
    /// position `x`. Returns `false` if a gesture is already running or the
    /// column does not exist.
    pub fn begin_resize(&mut self, index: usize, x: i64) -> bool {
        self.layout.begin_resize(&self.columns, index, x)
    }

    /// Follow the pointer; returns the clamped preview width when the
    /// update was not throttled.
    pub fn drag_resize(&mut self, x: i64, now: Instant) -> Option<u32> {
        self.layout.drag_to(x, now)
    }

    /// End the gesture, committing the width if it changed.
    pub fn end_resize(&mut self) -> Option<TableOutcome> {
        let commit = self.layout.finish_resize()?;
        self.commit_width(commit.column, commit.width)
    }

    /// Abandon the gesture without committing.
    pub fn cancel_resize(&mut self) {
        self.layout.cancel_resize();
    }

    /// Keyboard resize of the focused column by `delta` units.
    pub fn nudge_focused_width(&mut self, delta: i64) -> Option<TableOutcome> {
        let width = self.layout.nudge(&self.columns, self.focused_column, delta)?;
        self.commit_width(self.focused_column, width)
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// The filter currently applied to the view.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Text typed but not applied yet.
    pub fn pending_filter(&self) -> Option<&str> {
        self.pending_filter.as_deref()
    }

    /// Record filter input; applied by [`tick`](Self::tick) once typing pauses.
    pub fn input_filter(&mut self, text: impl Into<String>, now: Instant) {
        self.pending_filter = Some(text.into());
        self.debouncer.touch(now);
    }

    /// Apply a debounced filter if its window has elapsed. Returns `true`
    /// when the view changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.debouncer.ready(now) {
            return false;
        }
        let Some(text) = self.pending_filter.take() else {
            return false;
        };
        if text == self.filter {
            return false;
        }
        debug!(table = self.spec.table_id, filter = %text, "Applying filter");
        self.filter = text;
        self.rebuild_view();
        true
    }

    /// Drop both the applied and the pending filter.
    pub fn clear_filter(&mut self) {
        self.debouncer.cancel();
        self.pending_filter = None;
        if !self.filter.is_empty() {
            self.filter.clear();
            self.rebuild_view();
        }
    }

    // ------------------------------------------------------------------
    // Infinite scroll
    // ------------------------------------------------------------------

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    /// Report the host's loading flags.
    pub fn set_load_state(&mut self, load: LoadState, now: Instant) {
        self.load = load;
        self.scroll.sync(load, now);
    }

    /// Evaluate a scroll position.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> Option<TableOutcome> {
        self.scroll
            .on_scroll(metrics, self.load, now)
            .then_some(TableOutcome::LoadNextPage)
    }

    // ------------------------------------------------------------------
    // Responsive layout
    // ------------------------------------------------------------------

    pub fn responsive(&self) -> &ResponsiveLayout {
        &self.responsive
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    /// Recompute the responsive layout for a new viewport width in units.
    pub fn set_viewport_width(&mut self, width: u32) {
        if width != self.viewport_width {
            self.viewport_width = width;
            self.recompute_responsive();
        }
    }

    /// Width in units actually available to column cells, as measured by
    /// the renderer. Resize clamps use it until the next responsive
    /// recompute falls back to the viewport estimate.
    pub fn set_container_width(&mut self, width: u32) {
        self.layout.set_container_width(width);
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if mode != self.layout_mode {
            self.layout_mode = mode;
            self.recompute_responsive();
        }
    }

    fn recompute_responsive(&mut self) {
        self.responsive =
            responsive::compute_layout(&self.columns, self.viewport_width, self.layout_mode);
        self.layout.set_container_width(self.responsive.container_width);
        if !self.responsive.columns.contains(&self.focused_column) {
            self.focused_column = self.responsive.columns.first().copied().unwrap_or(0);
        }
    }
}
