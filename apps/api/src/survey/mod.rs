// Survey Step Engine
// Validated step graphs, a per-user interpreter that walks them, and a service
// that persists each completed run exactly once.

pub mod definition;
pub mod handlers;
pub mod interpreter;
pub mod models;
pub mod profile_sync;
pub mod recorder;
pub mod service;
pub mod sessions;
pub mod store;
