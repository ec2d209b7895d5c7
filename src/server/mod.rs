// HTTP server setup (Axum)
pub mod app;
pub mod dto;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;

pub use app::{build_app, AppState};
