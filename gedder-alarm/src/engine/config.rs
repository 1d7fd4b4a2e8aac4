use time::Duration;

use crate::travel::TravelSample;

/// Which provider estimate the wake-up arithmetic uses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr,
)]
pub enum DurationBasis {
    /// The plain route duration.
    #[default]
    #[strum(serialize = "typical")]
    Typical,

    /// The traffic-adjusted duration, falling back to the plain one when the
    /// provider doesn't report it.
    #[strum(serialize = "traffic")]
    InTraffic,

    /// Whichever of the two is longer.
    #[strum(serialize = "worst")]
    WorstCase,
}

impl DurationBasis {
    /// Whether this basis reads the traffic estimate, which the provider
    /// only reports for departure-time queries.
    pub fn needs_traffic(self) -> bool {
        !matches!(self, Self::Typical)
    }

    pub fn pick(self, sample: &TravelSample) -> Duration {
        match self {
            Self::Typical => sample.duration(),
            Self::InTraffic => sample.duration_in_traffic().unwrap_or(sample.duration()),
            Self::WorstCase => sample.worst_case(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Safety margin added to the travel estimate before deadline math.
    pub padding: Duration,

    /// Re-poll delay after a failed query with no earlier sample to fall
    /// back on.
    pub failure_delay: Duration,

    /// Upper bound on one provider query.
    pub provider_timeout: std::time::Duration,

    pub duration_basis: DurationBasis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            padding: Duration::minutes(15),
            failure_delay: Duration::minutes(1),
            provider_timeout: std::time::Duration::from_secs(10),
            duration_basis: DurationBasis::Typical,
        }
    }
}
