//! AML Sentry API Module
//! REST surface for address risk checks and blocklist edit sessions

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use middleware::start_cleanup_task;
pub use routes::create_router;
pub use types::*;
