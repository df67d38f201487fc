// Resume Builder
// Section ordering and membership, template hydration from a user profile,
// and the column mapping a renderer follows.

pub mod handlers;
pub mod hydrate;
pub mod models;
pub mod render;
pub mod sections;
pub mod service;
pub mod store;
