//! Help panel listing the key bindings by context.
//!
//! Opened with `?`; `?`, `q` and `Esc` close it. Scrolling uses the same
//! actions as the tables.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::events::{get_keybindings_grouped, Action, KeyContext, Keybinding};
use crate::ui::theme::theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpAction {
    Close,
}

pub struct HelpView {
    grouped_bindings: Vec<(KeyContext, Vec<Keybinding>)>,
    scroll: usize,
    total_lines: usize,
    /// Updated on render.
    visible_height: usize,
}

impl HelpView {
    pub fn new() -> Self {
        let grouped_bindings = get_keybindings_grouped();
        // Header and blank line per section, one line per binding, a blank
        // line after each section, then the footer
        let total_lines = grouped_bindings
            .iter()
            .map(|(_, bindings)| bindings.len() + 3)
            .sum::<usize>()
            + 1;

        Self {
            grouped_bindings,
            scroll: 0,
            total_lines,
            visible_height: 0,
        }
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.visible_height)
    }

    /// Every other action is swallowed while the panel is open.
    pub fn handle_action(&mut self, action: Action) -> Option<HelpAction> {
        let page = self.visible_height.saturating_sub(2).max(1);
        match action {
            Action::Help | Action::Quit | Action::Back => return Some(HelpAction::Close),
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

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let t = theme();
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Ayuda - Atajos de teclado ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(t.accent));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.visible_height = inner.height as usize;
        self.scroll = self.scroll.min(self.max_scroll());

        let paragraph = Paragraph::new(self.build_content_lines()).scroll((self.scroll as u16, 0));
        frame.render_widget(paragraph, inner);

        if self.total_lines > self.visible_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut state = ScrollbarState::new(self.max_scroll()).position(self.scroll);
            let bar = Rect::new(
                area.x + area.width.saturating_sub(1),
                area.y + 1,
                1,
                area.height.saturating_sub(2),
            );
            frame.render_stateful_widget(scrollbar, bar, &mut state);
        }
    }

    fn build_content_lines(&self) -> Vec<Line<'static>> {
        let t = theme();
        let key_width = self
            .grouped_bindings
            .iter()
            .flat_map(|(_, bindings)| bindings.iter())
            .map(|b| b.key.chars().count())
            .max()
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(self.total_lines);
        for (context, bindings) in &self.grouped_bindings {
            lines.push(Line::from(Span::styled(
                format!("── {} ──", context.display()),
                Style::default().fg(t.warning).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            for binding in bindings {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{:>width$}", binding.key, width = key_width + 2),
                        Style::default().fg(t.success).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::raw(binding.description.clone()),
                ]));
            }
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "?, q o Esc para cerrar",
            t.dim_style(),
        )));
        lines
    }
}

impl Default for HelpView {
    fn default() -> Self {
        Self::new()
    }
}
