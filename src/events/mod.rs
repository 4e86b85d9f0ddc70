//! Event handling for the application.
//!
//! Terminal input is polled by [`EventHandler`] and turned into [`Event`]s;
//! [`KeyBindings`] maps key presses onto [`Action`]s.

mod handler;
mod keys;

use crossterm::event::{KeyEvent, MouseEvent};

pub use handler::EventHandler;
pub use keys::{get_keybindings_grouped, Action, KeyBindings, KeyContext, Keybinding};

/// Events consumed by [`crate::app::App::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// A mouse button, drag or wheel event.
    Mouse(MouseEvent),
    /// The terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Nothing happened within the tick rate.
    Tick,
}
