//! Record detail view.
//!
//! Opens with the row already loaded in the table and replaces it with the
//! full record once the fetch completes. Country and province ids are shown
//! with their names when the lookups are available.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, Lookup, Lookups};
use crate::cache::CacheStatus;
use crate::catalog::Entity;
use crate::events::Action;
use crate::table::{value, Row};
use crate::tasks::Request;
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailAction {
    Back,
    Request(Request),
}

/// Fields holding a lookup id.
fn lookup_for(field: &str) -> Option<Lookup> {
    match field {
        "PAIS" => Some(Lookup::Countries),
        "PROVINCIA" => Some(Lookup::Provinces),
        _ => None,
    }
}

pub struct DetailView {
    entity: Entity,
    id: String,
    record: Option<Row>,
    cache_status: Option<CacheStatus>,
    loading: bool,
    confirm_delete: bool,
    deleting: bool,
    scroll: usize,
    total_lines: usize,
    visible_height: usize,
}

impl DetailView {
    /// `preview` is the row as listed, shown until the full record arrives.
    pub fn new(entity: Entity, id: impl Into<String>, preview: Option<Row>) -> Self {
        Self {
            entity,
            id: id.into(),
            record: preview,
            cache_status: None,
            loading: true,
            confirm_delete: false,
            deleting: false,
            scroll: 0,
            total_lines: 0,
            visible_height: 0,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record(&self) -> Option<&Row> {
        self.record.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.confirm_delete
    }

    /// The fetch that fills this view.
    pub fn request(&self) -> Request {
        Request::FetchRecord {
            entity: self.entity,
            id: self.id.clone(),
        }
    }

    /// Apply a fetched record. Answers for another record are ignored.
    pub fn on_record(
        &mut self,
        entity: Entity,
        id: &str,
        result: Result<(Row, CacheStatus), ApiError>,
    ) -> Result<(), ApiError> {
        if entity != self.entity || id != self.id {
            debug!(%entity, id, "Ignoring record for another view");
            return Ok(());
        }
        self.loading = false;
        let (row, status) = result?;
        self.record = Some(row);
        self.cache_status = Some(status);
        Ok(())
    }

    /// A failed delete leaves the view open.
    pub fn on_delete_failed(&mut self) {
        self.deleting = false;
    }

    pub fn handle_action(&mut self, action: Action) -> Option<DetailAction> {
        if self.confirm_delete {
            self.confirm_delete = false;
            if action == Action::Confirm {
                self.deleting = true;
                return Some(DetailAction::Request(Request::DeleteRecord {
                    entity: self.entity,
                    id: self.id.clone(),
                }));
            }
            return None;
        }

        let page = self.visible_height.saturating_sub(1).max(1);
        match action {
            Action::Back | Action::Quit => return Some(DetailAction::Back),
            Action::Delete if !self.deleting => self.confirm_delete = true,
            Action::Refresh => {
                self.loading = true;
                return Some(DetailAction::Request(self.request()));
            }
            Action::Down => self.scroll = (self.scroll + 1).min(self.max_scroll()),
            Action::Up => self.scroll = self.scroll.saturating_sub(1),
            Action::PageDown => self.scroll = (self.scroll + page).min(self.max_scroll()),
            Action::PageUp => self.scroll = self.scroll.saturating_sub(page),
            Action::Top => self.scroll = 0,
            Action::Bottom => self.scroll = self.max_scroll(),
            _ => {}
        }
        None
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.visible_height)
    }

    /// Label and display text of every field: catalog columns first, in
    /// catalog order, then whatever else the record carries.
    pub fn fields(&self, lookups: &Lookups) -> Vec<(String, String)> {
        let Some(row) = &self.record else {
            return Vec::new();
        };
        let spec = self.entity.table_spec();

        let describe = |field: &str, text: String| match lookup_for(field) {
            Some(lookup) if !text.is_empty() => match lookups.name_of(lookup, &text) {
                Some(name) => format!("{} ({})", text, name),
                None => text,
            },
            _ => text,
        };

        let mut fields: Vec<(String, String)> = spec
            .columns
            .iter()
            .map(|c| {
                let text = c.column_type.format(row.get(c.id));
                (c.label.to_string(), describe(c.id, text))
            })
            .collect();

        for (field, raw) in row {
            if spec.descriptor(field).is_some() {
                continue;
            }
            let text = match raw {
                Value::Object(_) | Value::Array(_) => raw.to_string(),
                _ => value::to_text(Some(raw)),
            };
            fields.push((field.clone(), describe(field, text)));
        }
        fields
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, lookups: &Lookups) {
        let t = theme();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let mut title = format!(" {} · {} ", self.entity.title(), self.id);
        if let Some(status) = self.cache_status.filter(|s| s.is_cached()) {
            title.push_str(&format!("{} ", status.icon()));
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style(true))
            .title(Span::styled(title, t.header_style().add_modifier(Modifier::BOLD)));
        let inner = block.inner(chunks[0]);
        frame.render_widget(block, chunks[0]);

        let fields = self.fields(lookups);
        let label_width = fields
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = if fields.is_empty() {
            vec![Line::from(Span::styled(
                if self.loading { "Cargando..." } else { "Sin datos" },
                t.dim_style(),
            ))]
        } else {
            fields
                .into_iter()
                .map(|(label, text)| {
                    Line::from(vec![
                        Span::styled(
                            format!("{:>width$}  ", label, width = label_width),
                            t.header_style(),
                        ),
                        Span::styled(text, Style::default().fg(t.fg)),
                    ])
                })
                .collect()
        };

        self.total_lines = lines.len();
        self.visible_height = inner.height as usize;
        self.scroll = self.scroll.min(self.max_scroll());
        frame.render_widget(Paragraph::new(lines).scroll((self.scroll as u16, 0)), inner);

        if self.total_lines > self.visible_height {
            let mut state = ScrollbarState::new(self.max_scroll()).position(self.scroll);
            frame.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight),
                chunks[0],
                &mut state,
            );
        }

        let footer = if self.confirm_delete {
            Line::from(Span::styled(
                format!(" ¿Eliminar el registro {}? y: confirmar  cualquier otra tecla: cancelar", self.id),
                Style::default().fg(t.error).add_modifier(Modifier::BOLD),
            ))
        } else if self.deleting {
            Line::from(Span::styled(" Eliminando...", t.dim_style()))
        } else {
            Line::from(Span::styled(
                " Esc: volver  j/k: desplazar  r: recargar  d: eliminar",
                t.dim_style(),
            ))
        };
        frame.render_widget(Paragraph::new(footer), chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CatalogItem;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn client_row() -> Row {
        let mut row = Row::new();
        row.insert("ID".to_string(), json!(7));
        row.insert("NOMBRE".to_string(), json!("Agrícola Sur"));
        row.insert("PAIS".to_string(), json!("34"));
        row.insert("PROVINCIA".to_string(), json!(30));
        row.insert("ZONA".to_string(), json!("Levante"));
        row
    }

    fn lookups() -> Lookups {
        Lookups {
            countries: vec![CatalogItem {
                id: "34".to_string(),
                name: "España".to_string(),
            }],
            provinces: vec![CatalogItem {
                id: "30".to_string(),
                name: "Murcia".to_string(),
            }],
        }
    }

    fn find<'a>(fields: &'a [(String, String)], label: &str) -> &'a str {
        &fields.iter().find(|(l, _)| l == label).unwrap().1
    }

    #[test]
    fn test_fields_resolve_lookups() {
        let view = DetailView::new(Entity::Clients, "7", Some(client_row()));
        let fields = view.fields(&lookups());
        assert_eq!(find(&fields, "País"), "34 (España)");
        assert_eq!(find(&fields, "Provincia"), "30 (Murcia)");
        assert_eq!(find(&fields, "Nombre"), "Agrícola Sur");
    }

    #[test]
    fn test_unknown_lookup_id_shown_raw() {
        let view = DetailView::new(Entity::Clients, "7", Some(client_row()));
        let fields = view.fields(&Lookups::default());
        assert_eq!(find(&fields, "País"), "34");
    }

    #[test]
    fn test_extra_fields_follow_catalog() {
        let view = DetailView::new(Entity::Clients, "7", Some(client_row()));
        let fields = view.fields(&Lookups::default());
        let catalog_len = Entity::Clients.table_spec().columns.len();
        assert_eq!(fields.len(), catalog_len + 1);
        assert_eq!(fields[catalog_len], ("ZONA".to_string(), "Levante".to_string()));
    }

    #[test]
    fn test_record_for_another_id_is_ignored() {
        let mut view = DetailView::new(Entity::Clients, "7", None);
        view.on_record(Entity::Clients, "8", Ok((client_row(), CacheStatus::Fresh)))
            .unwrap();
        assert!(view.record().is_none());
        assert!(view.is_loading());

        view.on_record(Entity::Clients, "7", Ok((client_row(), CacheStatus::Fresh)))
            .unwrap();
        assert!(view.record().is_some());
        assert!(!view.is_loading());
    }

    #[test]
    fn test_failed_fetch_keeps_preview() {
        let mut view = DetailView::new(Entity::Clients, "7", Some(client_row()));
        let result = view.on_record(Entity::Clients, "7", Err(ApiError::NotFound("7".to_string())));
        assert!(result.is_err());
        assert!(view.record().is_some());
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut view = DetailView::new(Entity::Samples, "12", None);
        assert_eq!(view.handle_action(Action::Delete), None);
        assert!(view.is_confirming_delete());
        assert_eq!(
            view.handle_action(Action::Confirm),
            Some(DetailAction::Request(Request::DeleteRecord {
                entity: Entity::Samples,
                id: "12".to_string(),
            }))
        );
        // No second delete while the first is running
        assert_eq!(view.handle_action(Action::Delete), None);
        assert!(!view.is_confirming_delete());
    }

    #[test]
    fn test_any_other_key_cancels_delete() {
        let mut view = DetailView::new(Entity::Samples, "12", None);
        view.handle_action(Action::Delete);
        assert_eq!(view.handle_action(Action::Back), None);
        assert!(!view.is_confirming_delete());
        assert_eq!(view.handle_action(Action::Back), Some(DetailAction::Back));
    }

    #[test]
    fn test_render_shows_fields() {
        let mut view = DetailView::new(Entity::Clients, "7", Some(client_row()));
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|f| view.render(f, f.area(), &lookups()))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Agrícola Sur"));
        assert!(text.contains("Murcia"));
    }
}
