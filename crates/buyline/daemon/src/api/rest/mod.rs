//! REST API: routing, handlers, and shared state

pub mod handlers;
pub mod router;
pub mod state;
