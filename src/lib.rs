//! CANAGROSA administrative client.
//!
//! The [`table`] module is the generic table engine: column model,
//! persisted preferences, sorting, resizing, infinite scroll and responsive
//! layout, driven by a per-entity [`catalog`]. Everything else is the
//! terminal front-end around it: the REST client in [`api`], background
//! work in [`tasks`] and the screens in [`ui`], tied together by [`app`].

pub mod api;
pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod table;
pub mod tasks;
pub mod ui;
