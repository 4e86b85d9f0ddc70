//! Loading indicator shown in the status bar and empty tables.

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::Paragraph,
    Frame,
};

use crate::ui::theme::theme;

/// Spinner animation frames.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A message with an animated spinner, advanced once per tick.
#[derive(Debug, Clone, Default)]
pub struct LoadingIndicator {
    message: String,
    frame: usize,
    active: bool,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) with a message.
    pub fn start(&mut self, message: impl Into<String>) {
        self.message = message.into();
        if !self.active {
            self.frame = 0;
        }
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Advance the animation.
    pub fn tick(&mut self) {
        if self.active {
            self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }

    /// Spinner and message, or nothing when idle.
    pub fn text(&self) -> String {
        if self.active {
            format!("{} {}", self.spinner_frame(), self.message)
        } else {
            String::new()
        }
    }

    /// Render centered in `area`.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.active {
            return;
        }
        let paragraph = Paragraph::new(self.text())
            .style(Style::default().fg(theme().accent))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}
