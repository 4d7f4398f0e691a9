//! UI module root: exposes drawing functions for individual tabs and overlays.

pub mod alerts;
pub mod form;
pub mod header;
pub mod login;
pub mod modal;
pub mod overview;
pub mod processes;
pub mod registrations;
pub mod settings;
pub mod theme;
pub mod util;
