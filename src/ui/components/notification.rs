//! Toast notifications for transient feedback.
//!
//! Expiry is driven by the `Instant` passed to [`NotificationManager::tick`]
//! so the queue can be tested without sleeping. Pushing a message identical
//! to the newest one restarts its timer instead of stacking a duplicate;
//! a failing page fetch retried by scrolling would otherwise flood the
//! corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ui::theme::theme;

const SHORT: Duration = Duration::from_secs(3);
const LONG: Duration = Duration::from_secs(5);
const DEFAULT_MAX_VISIBLE: usize = 3;

/// The kind of notification, which determines its appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationType::Info => "ℹ",
            NotificationType::Success => "✓",
            NotificationType::Warning => "⚠",
            NotificationType::Error => "✗",
        }
    }

    pub fn color(&self) -> Color {
        let t = theme();
        match self {
            NotificationType::Info => t.accent,
            NotificationType::Success => t.success,
            NotificationType::Warning => t.warning,
            NotificationType::Error => t.error,
        }
    }

    /// Default display time; problems stay up longer.
    fn duration(&self) -> Duration {
        match self {
            NotificationType::Info | NotificationType::Success => SHORT,
            NotificationType::Warning | NotificationType::Error => LONG,
        }
    }
}

/// A single notification message.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, notification_type: NotificationType) -> Self {
        Self {
            message: message.into(),
            notification_type,
            created_at: Instant::now(),
            duration: notification_type.duration(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Error)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn created_at(mut self, now: Instant) -> Self {
        self.created_at = now;
        self
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.duration
    }
}

/// Bounded queue of notifications, newest last.
#[derive(Debug)]
pub struct NotificationManager {
    notifications: VecDeque<Notification>,
    max_visible: usize,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::with_max_visible(DEFAULT_MAX_VISIBLE)
    }

    pub fn with_max_visible(max_visible: usize) -> Self {
        Self {
            notifications: VecDeque::new(),
            max_visible,
        }
    }

    /// Add a notification, dropping the oldest past the limit.
    pub fn push(&mut self, notification: Notification) {
        if let Some(last) = self.notifications.back_mut() {
            if last.message == notification.message
                && last.notification_type == notification.notification_type
            {
                last.created_at = notification.created_at;
                return;
            }
        }
        self.notifications.push_back(notification);
        while self.notifications.len() > self.max_visible {
            self.notifications.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Notification::info(message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Notification::success(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Notification::warning(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Notification::error(message));
    }

    /// Remove expired notifications.
    pub fn tick(&mut self, now: Instant) {
        self.notifications.retain(|n| !n.is_expired(now));
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// Render all notifications stacked in the bottom-right corner.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let width = 50.min(area.width.saturating_sub(4));
        // Borders plus the icon prefix
        let inner_width = width.saturating_sub(4).max(1) as usize;

        let heights: Vec<u16> = self
            .notifications
            .iter()
            .map(|n| {
                let text_len = n.message.chars().count() + 2;
                ((text_len + inner_width - 1) / inner_width) as u16 + 2
            })
            .collect();

        let total_height = heights
            .iter()
            .sum::<u16>()
            .min(area.height.saturating_sub(2));

        let x = area.x + area.width.saturating_sub(width + 2);
        let y = area.y + area.height.saturating_sub(total_height + 1);
        let stack = Rect::new(x, y, width, total_height);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(heights.iter().map(|&h| Constraint::Length(h)))
            .split(stack);

        for (notification, chunk) in self.notifications.iter().zip(chunks.iter()) {
            render_notification(notification, frame, *chunk);
        }
    }
}

fn render_notification(notification: &Notification, frame: &mut Frame, area: Rect) {
    frame.render_widget(Clear, area);

    let style = Style::default().fg(notification.notification_type.color());
    let text = Line::from(vec![
        Span::styled(
            format!("{} ", notification.notification_type.icon()),
            style.add_modifier(Modifier::BOLD),
        ),
        Span::styled(notification.message.as_str(), style),
    ]);

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).border_style(style))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_default_durations() {
        assert_eq!(Notification::info("x").duration, SHORT);
        assert_eq!(Notification::success("x").duration, SHORT);
        assert_eq!(Notification::warning("x").duration, LONG);
        assert_eq!(Notification::error("x").duration, LONG);
    }

    #[test]
    fn test_expiry_uses_supplied_clock() {
        let start = Instant::now();
        let n = Notification::info("Guardado").created_at(start);
        assert!(!n.is_expired(start + Duration::from_secs(2)));
        assert!(n.is_expired(start + Duration::from_secs(4)));
    }

    #[test]
    fn test_manager_drops_oldest_past_limit() {
        let mut manager = NotificationManager::with_max_visible(2);
        manager.info("1");
        manager.info("2");
        manager.info("3");
        let messages: Vec<&str> = manager.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["2", "3"]);
    }

    #[test]
    fn test_repeated_message_is_not_stacked() {
        let start = Instant::now();
        let mut manager = NotificationManager::new();
        manager.push(Notification::error("Connection failed").created_at(start));
        manager.push(
            Notification::error("Connection failed").created_at(start + Duration::from_secs(4)),
        );
        assert_eq!(manager.len(), 1);

        // The timer restarted with the second push
        manager.tick(start + Duration::from_secs(6));
        assert_eq!(manager.len(), 1);
        manager.tick(start + Duration::from_secs(10));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_tick_keeps_live_notifications() {
        let start = Instant::now();
        let mut manager = NotificationManager::new();
        manager.push(Notification::info("short").created_at(start));
        manager.push(Notification::error("long").created_at(start));
        manager.tick(start + Duration::from_secs(4));
        let messages: Vec<&str> = manager.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["long"]);
    }

    #[test]
    fn test_render_shows_message() {
        let mut manager = NotificationManager::new();
        manager.error("Servidor no disponible");
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| manager.render(f, f.area())).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Servidor no disponible"));
    }
}
