//! User interface components and views.
//!
//! Views own their screen state and return actions; the application decides
//! what those actions mean. Nothing in here talks to the network.

pub mod components;
pub mod theme;
pub mod views;

pub use components::{
    ColumnPicker, ColumnPickerAction, LoadingIndicator, Notification, NotificationManager,
    NotificationType,
};
pub use theme::{init_theme, load_theme, theme, Theme};
pub use views::{
    DetailAction, DetailView, EntityPage, HelpAction, HelpView, PageAction, PageCursor,
};
