//! API surface for the buyline daemon

pub mod rest;

pub use rest::router::create_router;
