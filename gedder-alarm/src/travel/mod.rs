//! Travel-Time Provider.
//!
//! Answers "how long from A to B, arriving by T". The engine only sees the
//! [`TravelTimeProvider`] trait; [`DirectionsClient`] is the implementation
//! backed by a Google-style directions web service.

mod client;
mod directions;
mod url;

pub use client::DirectionsClient;
pub use directions::{DirectionsStatus, parse_response};
pub use self::url::{DEFAULT_DIRECTIONS_URL, DirectionsUrl};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::record::{TransitMode, TravelMode};
use crate::types::Timestamp;

/// One provider question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    /// Provider place reference for the start of the trip.
    pub origin: String,
    pub destination: String,
    pub arrive_by: Timestamp,

    /// Ask about leaving at this instant instead of arriving by
    /// `arrive_by`. Only departure queries come back with a traffic
    /// estimate.
    pub depart_at: Option<Timestamp>,

    pub travel_mode: TravelMode,
    pub transit_mode: TransitMode,
}

/// A successful provider answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelSample {
    pub duration_secs: i64,

    /// Only reported for departure-time queries.
    pub duration_in_traffic_secs: Option<i64>,

    pub warnings: Vec<String>,
}

impl TravelSample {
    pub fn new(duration_secs: i64) -> Self {
        Self {
            duration_secs,
            duration_in_traffic_secs: None,
            warnings: Vec::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    pub fn duration_in_traffic(&self) -> Option<Duration> {
        self.duration_in_traffic_secs.map(Duration::seconds)
    }

    /// The longer of the two estimates.
    pub fn worst_case(&self) -> Duration {
        self.duration_in_traffic()
            .map_or(self.duration(), |traffic| traffic.max(self.duration()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unreachable: {0}")]
    Transport(String),

    #[error("Provider did not answer in time")]
    Timeout,

    #[error("Provider returned {status}: {message}")]
    Api {
        status: DirectionsStatus,
        message: String,
    },

    #[error("Provider response malformed: {0}")]
    Malformed(String),

    #[error("Query rejected before sending: {0}")]
    InvalidQuery(String),
}

#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    async fn estimate(&self, query: &RouteQuery) -> Result<TravelSample, ProviderError>;
}
