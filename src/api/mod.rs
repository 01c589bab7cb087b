//! Axum HTTP surface: routes, handlers, basic auth and the image gallery.
pub mod auth;
pub mod gallery;
pub mod handlers;
pub mod routes;

pub use routes::{router, AppState};
