//! Smart alarm clock driven by live travel-time estimates.
//!
//! An alarm rings at its fixed time unless smart mode is on. In smart mode
//! the [`engine`] keeps polling a [`travel`] provider and rings early enough
//! to make the arrival, never later than the alarm itself.

pub mod alarm_manager;
pub mod api;
pub mod api_client;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod recovery;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tracing;
pub mod travel;
pub mod trigger;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
