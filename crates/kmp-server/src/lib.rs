//! KMP Server: HTTP API over knowledge collection, ideas, pulse and stats.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
