//! Application views (screens).

mod detail;
mod entity_page;
mod help;

pub use detail::{DetailAction, DetailView};
pub use entity_page::{EntityPage, PageAction, PageCursor};
pub use help::{HelpAction, HelpView};
