//! Thin HTTP surface: health/readiness and an admin trigger/status API.
//! There is no booking CRUD UI here — that is owned by an external system
//! this crate never touches directly.

pub mod app;
pub mod routes;

pub use app::build_app;
