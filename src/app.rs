//! Main application state.
//!
//! This module implements The Elm Architecture (TEA): all input arrives
//! through [`App::update`], background results through
//! [`App::handle_api_message`], and [`App::view`] draws from state alone.
//! The app never performs I/O on the network itself; it queues
//! [`Request`]s that the main loop collects with [`App::take_requests`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs},
    Frame,
};
use tracing::{debug, info, trace, warn};

use crate::api::{ApiError, Lookups, TokenStore};
use crate::catalog::Entity;
use crate::config::Settings;
use crate::error::AppError;
use crate::events::{Action, Event, KeyBindings};
use crate::table::prefs::LAYOUT_MODE_KEY;
use crate::table::responsive::SIDEBAR_WIDTH;
use crate::table::{is_positional_key, LayoutMode, PreferenceStore, TableOutcome, CELL_WIDTH_UNITS};
use crate::tasks::{ApiMessage, Request};
use crate::ui::theme::theme;
use crate::ui::{
    ColumnPicker, ColumnPickerAction, DetailAction, DetailView, EntityPage, HelpAction, HelpView,
    LoadingIndicator, Notification, NotificationManager, PageAction,
};

/// How long errors that need the user's attention stay on screen.
const CRITICAL_NOTICE: Duration = Duration::from_secs(10);

/// The current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// A list table has focus.
    #[default]
    Browsing,
    /// A single record is shown.
    Detail,
    /// The column picker is open over the list.
    ColumnPicker,
    Help,
    /// The session ended with a 401; the token has been removed.
    LoginRequired,
    Exiting,
}

pub struct App {
    state: AppState,
    /// Where closing the help panel returns to.
    help_return: AppState,
    should_quit: bool,
    keys: KeyBindings,
    /// One page per entity, in [`Entity::ALL`] order.
    pages: Vec<EntityPage>,
    active: usize,
    detail: Option<DetailView>,
    column_picker: ColumnPicker,
    help: HelpView,
    lookups: Lookups,
    prefs: PreferenceStore,
    layout_mode: LayoutMode,
    tokens: Arc<dyn TokenStore>,
    profile_name: String,
    notifications: NotificationManager,
    loading: LoadingIndicator,
    requests: Vec<Request>,
}

impl App {
    pub fn new(
        settings: &Settings,
        profile_name: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        prefs: PreferenceStore,
        initial: Entity,
    ) -> Self {
        let layout_mode = prefs.load(LAYOUT_MODE_KEY, LayoutMode::default());
        let options = settings.table_options();
        let pages: Vec<EntityPage> = Entity::ALL
            .iter()
            .map(|&entity| {
                let mut page = EntityPage::new(entity, prefs.clone(), options, settings.page_size);
                page.set_layout_mode(layout_mode);
                page
            })
            .collect();
        let active = Entity::ALL
            .iter()
            .position(|&e| e == initial)
            .unwrap_or(0);

        debug!(?layout_mode, %initial, "Creating application");

        Self {
            state: AppState::Browsing,
            help_return: AppState::Browsing,
            should_quit: false,
            keys: KeyBindings::new(settings.vim_mode),
            pages,
            active,
            detail: None,
            column_picker: ColumnPicker::new(),
            help: HelpView::new(),
            lookups: Lookups::default(),
            prefs,
            layout_mode,
            tokens,
            profile_name: profile_name.into(),
            notifications: NotificationManager::new(),
            loading: LoadingIndicator::new(),
            requests: Vec::new(),
        }
    }

    /// Queue the initial fetches.
    pub fn start(&mut self, now: Instant) {
        self.requests.push(Request::FetchLookups);
        let request = self.active_page_mut().refresh(now);
        self.requests.push(request);
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn active_entity(&self) -> Entity {
        self.pages[self.active].entity()
    }

    pub fn active_page(&self) -> &EntityPage {
        &self.pages[self.active]
    }

    fn active_page_mut(&mut self) -> &mut EntityPage {
        &mut self.pages[self.active]
    }

    fn page_mut(&mut self, entity: Entity) -> Option<&mut EntityPage> {
        self.pages.iter_mut().find(|p| p.entity() == entity)
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    /// Requests queued since the last call.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update the application state based on an event.
    pub fn update(&mut self, event: Event) {
        self.update_at(event, Instant::now());
    }

    /// [`update`](Self::update) with an explicit clock.
    pub fn update_at(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => {
                trace!(key = ?key.code, modifiers = ?key.modifiers, "Key event");
                self.handle_key(key, now);
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Resize(width, height) => {
                trace!(width, height, "Terminal resize event");
                for page in &mut self.pages {
                    page.set_terminal_width(width);
                }
            }
            Event::Tick => self.tick(now),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if self.state == AppState::Browsing && self.active_page().is_filtering() {
            self.active_page_mut().handle_filter_key(key, now);
            return;
        }

        if self.state == AppState::ColumnPicker {
            let table = self.pages[self.active].table_mut();
            match self.column_picker.handle_input(key, table) {
                Some(ColumnPickerAction::Close) => self.state = AppState::Browsing,
                Some(ColumnPickerAction::Changed(outcome)) => {
                    trace!(?outcome, "Columns changed from picker");
                }
                None => {}
            }
            return;
        }

        if let Some(action) = self.keys.action(&key) {
            self.handle_action(action, now);
        }
    }

    fn handle_action(&mut self, action: Action, now: Instant) {
        match self.state {
            AppState::LoginRequired => {
                if matches!(action, Action::Quit | Action::Back) {
                    self.quit();
                }
            }
            AppState::Help => {
                if let Some(HelpAction::Close) = self.help.handle_action(action) {
                    self.state = self.help_return;
                }
            }
            AppState::Detail => {
                if action == Action::Help {
                    self.open_help();
                    return;
                }
                let Some(detail) = self.detail.as_mut() else {
                    self.state = AppState::Browsing;
                    return;
                };
                match detail.handle_action(action) {
                    Some(DetailAction::Back) => self.close_detail(),
                    Some(DetailAction::Request(request)) => self.requests.push(request),
                    None => {}
                }
            }
            AppState::Browsing => self.handle_browsing_action(action, now),
            AppState::ColumnPicker | AppState::Exiting => {}
        }
    }

    fn handle_browsing_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::Quit => self.quit(),
            Action::Help => self.open_help(),
            Action::NextEntity => {
                let next = (self.active + 1) % self.pages.len();
                self.switch_to(next, now);
            }
            Action::PrevEntity => {
                let previous = (self.active + self.pages.len() - 1) % self.pages.len();
                self.switch_to(previous, now);
            }
            Action::SelectEntity(index) => self.switch_to(index, now),
            Action::ToggleLayout => self.toggle_layout(),
            Action::ResetTable => {
                if let Some(action) = self.active_page_mut().handle_action(action, now) {
                    self.handle_page_action(action);
                }
                let title = self.active_entity().title();
                self.notifications
                    .info(format!("Tabla de {} restablecida", title.to_lowercase()));
            }
            _ => {
                if let Some(action) = self.active_page_mut().handle_action(action, now) {
                    self.handle_page_action(action);
                }
            }
        }
    }

    fn handle_page_action(&mut self, action: PageAction) {
        match action {
            PageAction::Request(request) => self.requests.push(request),
            PageAction::Open(key) => self.open_detail(key),
            PageAction::OpenColumnPicker => {
                self.column_picker = ColumnPicker::new();
                self.state = AppState::ColumnPicker;
            }
            PageAction::Changed(TableOutcome::SortChanged(sort)) => {
                debug!(column = %sort.column, direction = ?sort.direction, "Sort changed");
            }
            PageAction::Changed(outcome) => trace!(?outcome, "Table changed"),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        match self.state {
            AppState::Browsing if !self.active_page().is_filtering() => {
                if let Some(action) = self.active_page_mut().handle_mouse(mouse, now) {
                    self.handle_page_action(action);
                }
            }
            AppState::Detail | AppState::Help => {
                let action = match mouse.kind {
                    MouseEventKind::ScrollDown => Action::Down,
                    MouseEventKind::ScrollUp => Action::Up,
                    _ => return,
                };
                self.handle_action(action, now);
            }
            _ => {}
        }
    }

    fn quit(&mut self) {
        info!("Quit requested");
        self.should_quit = true;
        self.state = AppState::Exiting;
    }

    fn open_help(&mut self) {
        self.help_return = self.state;
        self.help.reset_scroll();
        self.state = AppState::Help;
    }

    /// Make page `index` active. The page being left stops loading.
    fn switch_to(&mut self, index: usize, now: Instant) {
        if index >= self.pages.len() || index == self.active {
            return;
        }
        let leaving = &mut self.pages[self.active];
        if leaving.is_loading() {
            leaving.cancel(now);
            self.requests.push(Request::Cancel(leaving.entity()));
        }

        self.active = index;
        info!(entity = %self.active_entity(), "Switched table");
        if self.active_page().needs_load() {
            let request = self.active_page_mut().refresh(now);
            self.requests.push(request);
        }
    }

    fn toggle_layout(&mut self) {
        self.layout_mode = self.layout_mode.toggled();
        self.prefs.save(LAYOUT_MODE_KEY, &self.layout_mode);
        for page in &mut self.pages {
            page.set_layout_mode(self.layout_mode);
        }
        debug!(mode = ?self.layout_mode, "Layout mode toggled");
    }

    fn open_detail(&mut self, key: String) {
        if is_positional_key(&key) {
            self.notifications
                .warning("El registro no tiene identificador y no se puede abrir");
            return;
        }
        let page = &self.pages[self.active];
        let preview = page
            .table()
            .selected_row()
            .filter(|_| page.table().selected_key() == Some(key.as_str()))
            .cloned();
        debug!(entity = %page.entity(), id = %key, "Opening record");
        let detail = DetailView::new(page.entity(), key, preview);
        self.requests.push(detail.request());
        self.detail = Some(detail);
        self.state = AppState::Detail;
    }

    fn close_detail(&mut self) {
        self.detail = None;
        self.state = AppState::Browsing;
    }

    /// Advance timers: debounced filters, spinners and notifications.
    pub fn tick(&mut self, now: Instant) {
        if let Some(action) = self.active_page_mut().tick(now) {
            self.handle_page_action(action);
        }

        let detail_loading = self.state == AppState::Detail
            && self.detail.as_ref().map(DetailView::is_loading).unwrap_or(false);
        if self.active_page().is_loading() || detail_loading {
            let title = self.active_entity().title().to_lowercase();
            self.loading.start(format!("Cargando {}...", title));
        } else {
            self.loading.stop();
        }
        self.loading.tick();
        self.notifications.tick(now);
    }

    // ------------------------------------------------------------------
    // Background results
    // ------------------------------------------------------------------

    pub fn handle_api_message(&mut self, message: ApiMessage) {
        self.handle_api_message_at(message, Instant::now());
    }

    pub fn handle_api_message_at(&mut self, message: ApiMessage, now: Instant) {
        if message.error().map(ApiError::is_unauthorized).unwrap_or(false) {
            self.session_expired(now);
            return;
        }

        match message {
            ApiMessage::PageFetched {
                entity,
                generation,
                append,
                result,
            } => {
                let Some(page) = self.page_mut(entity) else {
                    return;
                };
                if let Err(e) = page.on_page_fetched(generation, append, result, now) {
                    self.report(e);
                }
            }
            ApiMessage::RecordFetched { entity, id, result } => {
                let Some(detail) = self.detail.as_mut() else {
                    trace!(%entity, %id, "Record arrived after its view closed");
                    return;
                };
                if let Err(e) = detail.on_record(entity, &id, result) {
                    self.report(e);
                }
            }
            ApiMessage::RecordDeleted { entity, id, result } => match result {
                Ok(()) => {
                    info!(%entity, %id, "Record deleted");
                    self.notifications
                        .success(format!("Registro {} eliminado", id));
                    let showing = self
                        .detail
                        .as_ref()
                        .map(|d| d.entity() == entity && d.id() == id)
                        .unwrap_or(false);
                    if showing {
                        self.close_detail();
                    }
                    if let Some(page) = self.page_mut(entity) {
                        let request = page.refresh(now);
                        self.requests.push(request);
                    }
                }
                Err(e) => {
                    if let Some(detail) = self.detail.as_mut() {
                        detail.on_delete_failed();
                    }
                    self.report(e);
                }
            },
            ApiMessage::LookupsFetched(result) => match result {
                Ok(lookups) => self.lookups = lookups,
                Err(e) => {
                    warn!(error = %e, "Could not load lookups");
                    if !e.is_cancelled() {
                        self.notifications
                            .warning("No se pudieron cargar países y provincias");
                    }
                }
            },
        }
    }

    fn report(&mut self, error: ApiError) {
        let error = AppError::from(error);
        if error.is_silent() {
            return;
        }
        warn!(error = %error, critical = error.is_critical(), "Request failed");
        let mut notification = Notification::error(error.display_message());
        if error.is_critical() {
            notification = notification.with_duration(CRITICAL_NOTICE);
        }
        self.notifications.push(notification);
    }

    /// A 401: forget the token, stop everything and ask for a new login.
    fn session_expired(&mut self, now: Instant) {
        if self.state == AppState::LoginRequired {
            return;
        }
        warn!(profile = %self.profile_name, "Session expired; purging token");
        if let Err(e) = self.tokens.delete(&self.profile_name) {
            warn!(error = %e, "Could not remove stored token");
        }
        for page in &mut self.pages {
            page.cancel(now);
        }
        self.requests.push(Request::CancelAll);
        self.detail = None;
        self.state = AppState::LoginRequired;
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    /// Render the application UI.
    pub fn view(&mut self, frame: &mut Frame) {
        let area = frame.area();

        if self.state == AppState::LoginRequired {
            self.render_login_required(frame, area);
            self.notifications.render(frame, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);
        let (main, status) = (chunks[0], chunks[1]);

        let content = match self.layout_mode {
            LayoutMode::Sidebar => {
                let sidebar = (SIDEBAR_WIDTH / CELL_WIDTH_UNITS) as u16;
                let columns = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Length(sidebar), Constraint::Min(10)])
                    .split(main);
                self.render_sidebar(frame, columns[0]);
                columns[1]
            }
            LayoutMode::Header => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(1), Constraint::Min(3)])
                    .split(main);
                self.render_tabs(frame, rows[0]);
                rows[1]
            }
        };

        let showing_detail = self.state == AppState::Detail
            || (self.state == AppState::Help && self.help_return == AppState::Detail);
        match self.detail.as_mut() {
            Some(detail) if showing_detail => detail.render(frame, content, &self.lookups),
            _ => self.pages[self.active].render(frame, content),
        }

        if self.state == AppState::ColumnPicker {
            self.column_picker
                .render(frame, content, self.pages[self.active].table());
        }

        self.render_status_bar(frame, status);

        if self.state == AppState::Help {
            self.help.render(frame, centered_rect(70, 80, area));
        }

        self.notifications.render(frame, area);
    }

    fn render_sidebar(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let items: Vec<ListItem> = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let style = if i == self.active {
                    t.selected_style()
                } else {
                    Style::default().fg(t.fg)
                };
                ListItem::new(format!(" {} {}", i + 1, page.entity().title())).style(style)
            })
            .collect();
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(t.border_style(false))
            .title(Span::styled(" CANAGROSA ", t.header_style().add_modifier(Modifier::BOLD)));
        frame.render_widget(List::new(items).block(block), area);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let titles: Vec<String> = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| format!("{} {}", i + 1, page.entity().title()))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active)
            .style(Style::default().fg(t.fg))
            .highlight_style(t.selected_style())
            .divider(Span::styled("│", t.dim_style()));
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let mode = match self.state {
            AppState::Browsing if self.active_page().is_filtering() => "FILTRO",
            AppState::Browsing => "TABLA",
            AppState::Detail => "DETALLE",
            AppState::ColumnPicker => "COLUMNAS",
            AppState::Help => "AYUDA",
            AppState::LoginRequired => "SESIÓN",
            AppState::Exiting => "SALIENDO",
        };

        let mut spans = vec![
            Span::styled(
                format!(" {} ", mode),
                Style::default().fg(t.bg).bg(t.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {} ", self.profile_name), t.dim_style()),
        ];
        if self.loading.is_active() {
            spans.push(Span::styled(
                self.loading.text(),
                Style::default().fg(t.accent),
            ));
        }
        spans.push(Span::styled("  ?: ayuda  q: salir", t.dim_style()));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_login_required(&self, frame: &mut Frame, area: Rect) {
        let t = theme();
        let popup = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup);
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "La sesión ha caducado",
                Style::default().fg(t.error).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("El token guardado se ha eliminado. Inicie sesión de nuevo con:"),
            Line::from(""),
            Line::from(Span::styled(
                format!("canagrosa login --profile {} --token <TOKEN>", self.profile_name),
                t.header_style(),
            )),
            Line::from(""),
            Line::from(Span::styled("q: salir", t.dim_style())),
        ];
        let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.error)),
        );
        frame.render_widget(paragraph, popup);
    }
}

/// A rectangle of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
