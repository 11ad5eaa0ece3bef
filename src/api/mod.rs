//! HTTP surface: one handler serving the Terraform `http` backend contract
//! on every path.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, AccessGate, AppState, BackendSession};
pub use server::serve;
