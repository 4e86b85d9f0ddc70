//! Column visibility and order picker.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::table::{DataTable, TableOutcome};
use crate::ui::theme::theme;

/// Result of a key press in the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPickerAction {
    Close,
    /// The table changed and has already persisted it.
    Changed(TableOutcome),
}

/// Cursor over the table's columns; all changes go straight to the table.
#[derive(Debug, Clone, Default)]
pub struct ColumnPicker {
    cursor: usize,
}

impl ColumnPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn handle_input(&mut self, key: KeyEvent, table: &mut DataTable) -> Option<ColumnPickerAction> {
        let count = table.columns().len();
        self.cursor = self.cursor.min(count.saturating_sub(1));
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('c') => {
                Some(ColumnPickerAction::Close)
            }
            KeyCode::Down | KeyCode::Char('j') if !shift => {
                self.cursor = (self.cursor + 1).min(count.saturating_sub(1));
                None
            }
            KeyCode::Up | KeyCode::Char('k') if !shift => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let id = table.columns().get(self.cursor)?.id();
                table.toggle_column(id).map(ColumnPickerAction::Changed)
            }
            KeyCode::Char('J') | KeyCode::Down => self.move_current(table, 1),
            KeyCode::Char('K') | KeyCode::Up => self.move_current(table, -1),
            KeyCode::Char('R') => Some(ColumnPickerAction::Changed(table.reset_to_defaults())),
            _ => None,
        }
    }

    /// Move the column under the cursor, keeping the cursor on it.
    fn move_current(&mut self, table: &mut DataTable, delta: isize) -> Option<ColumnPickerAction> {
        let id = table.columns().get(self.cursor)?.id();
        let outcome = table.move_column(id, delta)?;
        if let Some(position) = table.columns().iter().position(|c| c.id() == id) {
            self.cursor = position;
        }
        Some(ColumnPickerAction::Changed(outcome))
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, table: &DataTable) {
        let t = theme();
        let columns = table.columns();
        let label_width = columns
            .iter()
            .map(|c| c.label().chars().count())
            .max()
            .unwrap_or(0);

        let mut lines: Vec<Line> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let mark = if column.visible { "[x]" } else { "[ ]" };
                let mut style = if column.visible {
                    Style::default().fg(t.fg)
                } else {
                    t.dim_style()
                };
                if i == self.cursor {
                    style = style.patch(t.selected_style());
                }
                Line::from(vec![
                    Span::styled(format!(" {} ", mark), style),
                    Span::styled(format!("{:<width$}", column.label(), width = label_width), style),
                    Span::styled(format!(" {:>4}", column.width), t.dim_style()),
                ])
            })
            .collect();

        lines.push(Line::from(""));
        let hint = if table.spec().reorderable {
            "espacio: mostrar/ocultar  J/K: mover  R: restablecer  Esc: cerrar"
        } else {
            "espacio: mostrar/ocultar  R: restablecer  Esc: cerrar"
        };
        lines.push(Line::from(Span::styled(hint, t.dim_style())));

        let width = (label_width as u16 + 14)
            .max(hint.chars().count() as u16 + 2)
            .min(area.width);
        let height = (lines.len() as u16 + 2).min(area.height);
        let popup = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style(true))
            .title(Span::styled(
                " Columnas ",
                t.header_style().add_modifier(Modifier::BOLD),
            ));
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}
