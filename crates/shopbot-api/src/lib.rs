//! ShopBot API crate - axum HTTP server and WebSocket event stream.
//!
//! `/load` and `/unload` manage session profiles, `/session` upgrades to the
//! per-session event stream that runs the dialog turns, and `/health`
//! reports liveness.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
