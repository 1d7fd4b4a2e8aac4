//! Directions request URLs.

use reqwest::Url;

use super::ProviderError;
use crate::record::{TransitMode, TravelMode};
use crate::types::Timestamp;

pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Builder for one directions query.
///
/// Origin, destination, and key are required; everything else is added to
/// the query string only when set.
#[derive(Debug, Clone)]
pub struct DirectionsUrl {
    base: Url,
    origin: String,
    destination: String,
    key: String,
    arrival: Option<Timestamp>,
    departure: Option<Timestamp>,
    travel_mode: Option<TravelMode>,
    transit_mode: Option<TransitMode>,
}

impl DirectionsUrl {
    pub fn new(
        base: Url,
        origin: impl Into<String>,
        destination: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let origin = origin.into();
        let destination = destination.into();
        if origin.is_empty() || destination.is_empty() {
            return Err(ProviderError::InvalidQuery(format!(
                "origin {origin:?} and destination {destination:?} must both be set"
            )));
        }

        Ok(Self {
            base,
            origin,
            destination,
            key: key.into(),
            arrival: None,
            departure: None,
            travel_mode: None,
            transit_mode: None,
        })
    }

    pub fn arrival_time(mut self, at: Timestamp) -> Self {
        self.arrival = Some(at);
        self
    }

    pub fn departure_time(mut self, at: Timestamp) -> Self {
        self.departure = Some(at);
        self
    }

    pub fn travel_mode(mut self, mode: TravelMode) -> Self {
        self.travel_mode = Some(mode);
        self
    }

    pub fn transit_mode(mut self, mode: TransitMode) -> Self {
        self.transit_mode = Some(mode);
        self
    }

    pub fn build(&self) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("origin", &format!("place_id:{}", self.origin));
            query.append_pair("destination", &format!("place_id:{}", self.destination));

            // The service wants whole seconds.
            if let Some(at) = self.arrival {
                query.append_pair("arrival_time", &at.as_secs().to_string());
            }
            if let Some(at) = self.departure {
                query.append_pair("departure_time", &at.as_secs().to_string());
            }
            if let Some(mode) = self.travel_mode {
                query.append_pair("mode", mode.as_ref());
            }
            if let Some(mode) = self.transit_mode {
                query.append_pair("transit_mode", mode.as_ref());
            }

            query.append_pair("key", &self.key);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base() -> Url {
        Url::parse(DEFAULT_DIRECTIONS_URL).unwrap()
    }

    fn pairs(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn required_fields_only() {
        let url = DirectionsUrl::new(base(), "ChIJa", "ChIJb", "secret")
            .unwrap()
            .build();
        let query = pairs(&url);

        assert_eq!(url.host_str(), Some("maps.googleapis.com"));
        assert_eq!(url.path(), "/maps/api/directions/json");
        assert_eq!(query["origin"], "place_id:ChIJa");
        assert_eq!(query["destination"], "place_id:ChIJb");
        assert_eq!(query["key"], "secret");
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn optional_fields_are_added() {
        let url = DirectionsUrl::new(base(), "ChIJa", "ChIJb", "secret")
            .unwrap()
            .arrival_time(Timestamp::from_millis(1_800_000_000_999))
            .travel_mode(TravelMode::Transit)
            .transit_mode(TransitMode::Rail)
            .build();
        let query = pairs(&url);

        assert_eq!(query["arrival_time"], "1800000000");
        assert_eq!(query["mode"], "transit");
        assert_eq!(query["transit_mode"], "rail");
        assert!(!query.contains_key("departure_time"));
    }

    #[test]
    fn departure_time_in_seconds() {
        let url = DirectionsUrl::new(base(), "a", "b", "k")
            .unwrap()
            .departure_time(Timestamp::from_secs(1_700_000_000))
            .build();
        assert_eq!(pairs(&url)["departure_time"], "1700000000");
    }

    #[test]
    fn place_references_are_encoded() {
        let url = DirectionsUrl::new(base(), "a b&c", "d", "k").unwrap().build();
        assert!(!url.as_str().contains("a b&c"));
        assert_eq!(pairs(&url)["origin"], "place_id:a b&c");
    }

    #[test]
    fn empty_places_are_rejected() {
        assert!(matches!(
            DirectionsUrl::new(base(), "", "b", "k"),
            Err(ProviderError::InvalidQuery(_))
        ));
        assert!(matches!(
            DirectionsUrl::new(base(), "a", "", "k"),
            Err(ProviderError::InvalidQuery(_))
        ));
    }
}
