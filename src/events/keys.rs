//! Key binding definitions.
//!
//! Keys are resolved to [`Action`]s in one place so every screen agrees on
//! what a key means. Screens with text input (the quick filter) read raw
//! keys instead and never consult these bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Back,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Open,
    Refresh,
    NextEntity,
    PrevEntity,
    /// Jump to the entity tab at this index.
    SelectEntity(usize),
    FocusColumnLeft,
    FocusColumnRight,
    SortFocused,
    NarrowColumn,
    WidenColumn,
    ColumnPicker,
    Filter,
    ToggleLayout,
    ResetTable,
    Delete,
    Confirm,
}

/// Key binding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    /// Whether vim-style bindings (`hjkl`, `g`/`G`) are enabled.
    pub vim_mode: bool,
}

impl KeyBindings {
    /// Create new key bindings.
    pub fn new(vim_mode: bool) -> Self {
        Self { vim_mode }
    }

    /// Resolve a key press. Returns `None` for unbound keys.
    pub fn action(&self, key: &KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl {
            return match key.code {
                KeyCode::Char('c') => Some(Action::Quit),
                KeyCode::Char('d') => Some(Action::PageDown),
                KeyCode::Char('u') => Some(Action::PageUp),
                _ => None,
            };
        }

        if self.vim_mode {
            let vim = match key.code {
                KeyCode::Char('j') => Some(Action::Down),
                KeyCode::Char('k') => Some(Action::Up),
                KeyCode::Char('h') => Some(Action::FocusColumnLeft),
                KeyCode::Char('l') => Some(Action::FocusColumnRight),
                KeyCode::Char('g') => Some(Action::Top),
                KeyCode::Char('G') => Some(Action::Bottom),
                _ => None,
            };
            if vim.is_some() {
                return vim;
            }
        }

        match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('?') => Some(Action::Help),
            KeyCode::Esc => Some(Action::Back),
            KeyCode::Up => Some(Action::Up),
            KeyCode::Down => Some(Action::Down),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::Home => Some(Action::Top),
            KeyCode::End => Some(Action::Bottom),
            KeyCode::Left => Some(Action::FocusColumnLeft),
            KeyCode::Right => Some(Action::FocusColumnRight),
            KeyCode::Enter => Some(Action::Open),
            KeyCode::Tab => Some(Action::NextEntity),
            KeyCode::BackTab => Some(Action::PrevEntity),
            KeyCode::Char(c @ '1'..='9') => Some(Action::SelectEntity(c as usize - '1' as usize)),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('R') => Some(Action::ResetTable),
            KeyCode::Char('s') => Some(Action::SortFocused),
            KeyCode::Char('<') | KeyCode::Char('-') => Some(Action::NarrowColumn),
            KeyCode::Char('>') | KeyCode::Char('+') => Some(Action::WidenColumn),
            KeyCode::Char('c') => Some(Action::ColumnPicker),
            KeyCode::Char('/') => Some(Action::Filter),
            KeyCode::Char('L') => Some(Action::ToggleLayout),
            KeyCode::Char('d') | KeyCode::Delete => Some(Action::Delete),
            KeyCode::Char('y') => Some(Action::Confirm),
            _ => None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Where a binding applies, for the help panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    Global,
    Table,
    Filter,
    Columns,
    Detail,
}

impl KeyContext {
    pub fn display(&self) -> &'static str {
        match self {
            KeyContext::Global => "General",
            KeyContext::Table => "Tabla",
            KeyContext::Filter => "Filtro",
            KeyContext::Columns => "Columnas",
            KeyContext::Detail => "Detalle",
        }
    }
}

/// A documented key binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybinding {
    pub key: String,
    pub description: String,
}

fn bindings(entries: &[(&str, &str)]) -> Vec<Keybinding> {
    entries
        .iter()
        .map(|(key, description)| Keybinding {
            key: key.to_string(),
            description: description.to_string(),
        })
        .collect()
}

/// Every documented binding, grouped by context in display order.
pub fn get_keybindings_grouped() -> Vec<(KeyContext, Vec<Keybinding>)> {
    vec![
        (
            KeyContext::Global,
            bindings(&[
                ("q / Ctrl+c", "Salir"),
                ("?", "Mostrar u ocultar la ayuda"),
                ("Tab / S-Tab", "Siguiente / anterior tabla"),
                ("1-9", "Ir a la tabla por número"),
                ("L", "Alternar barra lateral / cabecera"),
                ("r", "Recargar"),
            ]),
        ),
        (
            KeyContext::Table,
            bindings(&[
                ("j / k / ↑ / ↓", "Mover la selección"),
                ("Ctrl+d / Ctrl+u", "Avanzar / retroceder una página"),
                ("g / G", "Primer / último registro"),
                ("Enter", "Abrir el registro"),
                ("h / l / ← / →", "Enfocar columna"),
                ("s", "Ordenar por la columna enfocada"),
                ("< / >", "Estrechar / ensanchar la columna"),
                ("c", "Elegir columnas"),
                ("R", "Restablecer la tabla"),
                ("ratón", "Clic ordena o selecciona, arrastrar el borde redimensiona"),
            ]),
        ),
        (
            KeyContext::Filter,
            bindings(&[
                ("/", "Filtrar filas cargadas"),
                ("Enter", "Mantener el filtro"),
                ("Esc", "Quitar el filtro"),
            ]),
        ),
        (
            KeyContext::Columns,
            bindings(&[
                ("Espacio", "Mostrar u ocultar"),
                ("J / K", "Mover la columna"),
                ("R", "Restablecer"),
            ]),
        ),
        (
            KeyContext::Detail,
            bindings(&[
                ("j / k", "Desplazar"),
                ("d", "Eliminar el registro"),
                ("y", "Confirmar la eliminación"),
                ("Esc", "Volver a la tabla"),
            ]),
        ),
    ]
}
