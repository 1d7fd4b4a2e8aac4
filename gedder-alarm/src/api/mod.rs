//! HTTP API for managing alarms.

pub mod server;
mod v0;

pub use server::{SharedState, router, serve};
