//! HTTP client for the directions web service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use super::{DEFAULT_DIRECTIONS_URL, DirectionsUrl, ProviderError, RouteQuery, TravelSample};
use super::{TravelTimeProvider, parse_response};
use crate::record::TravelMode;
use crate::tracing::prelude::*;

pub struct DirectionsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl DirectionsClient {
    /// Client for the public directions endpoint. Every request is bounded
    /// by `timeout`.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = Url::parse(DEFAULT_DIRECTIONS_URL)
            .map_err(|e| ProviderError::InvalidQuery(e.to_string()))?;
        Self::with_base_url(base_url, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn request_url(&self, query: &RouteQuery) -> Result<Url, ProviderError> {
        let mut url = DirectionsUrl::new(
            self.base_url.clone(),
            &query.origin,
            &query.destination,
            &self.api_key,
        )?
        .travel_mode(query.travel_mode);
        // The service takes one of the two, never both.
        url = match query.depart_at {
            Some(at) => url.departure_time(at),
            None => url.arrival_time(query.arrive_by),
        };
        if query.travel_mode == TravelMode::Transit {
            url = url.transit_mode(query.transit_mode);
        }
        Ok(url.build())
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.without_url().to_string())
    }
}

#[async_trait]
impl TravelTimeProvider for DirectionsClient {
    async fn estimate(&self, query: &RouteQuery) -> Result<TravelSample, ProviderError> {
        let url = self.request_url(query)?;
        debug!(
            origin = %query.origin,
            destination = %query.destination,
            arrive_by = %query.arrive_by,
            depart_at = ?query.depart_at,
            mode = %query.travel_mode,
            "Querying directions"
        );

        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Transport(format!("HTTP {status}")));
        }
        let body = response.text().await.map_err(transport_error)?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{Router, extract::Query, routing::get};
    use tokio::net::TcpListener;

    use super::*;
    use crate::record::TransitMode;
    use crate::types::Timestamp;

    async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/directions/json")).unwrap()
    }

    fn query(mode: TravelMode) -> RouteQuery {
        RouteQuery {
            origin: "ChIJhome".into(),
            destination: "ChIJwork".into(),
            arrive_by: Timestamp::from_secs(1_800_000_000),
            depart_at: None,
            travel_mode: mode,
            transit_mode: TransitMode::Bus,
        }
    }

    #[tokio::test]
    async fn sends_query_and_parses_answer() {
        let router = Router::new().route(
            "/directions/json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["origin"], "place_id:ChIJhome");
                assert_eq!(params["arrival_time"], "1800000000");
                assert_eq!(params["mode"], "transit");
                assert_eq!(params["transit_mode"], "bus");
                assert_eq!(params["key"], "test-key");
                r#"{"status":"OK","routes":[{"warnings":[],"legs":[{"duration":{"value":1500}}]}]}"#
            }),
        );
        let base = serve(router).await;
        let client =
            DirectionsClient::with_base_url(base, "test-key", Duration::from_secs(5)).unwrap();

        let sample = client.estimate(&query(TravelMode::Transit)).await.unwrap();
        assert_eq!(sample.duration_secs, 1500);
    }

    #[tokio::test]
    async fn transit_mode_only_sent_for_transit() {
        let router = Router::new().route(
            "/directions/json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert!(!params.contains_key("transit_mode"));
                r#"{"status":"OK","routes":[{"legs":[{"duration":{"value":60}}]}]}"#
            }),
        );
        let base = serve(router).await;
        let client =
            DirectionsClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();

        assert!(client.estimate(&query(TravelMode::Driving)).await.is_ok());
    }

    #[tokio::test]
    async fn departure_query_replaces_arrival_time() {
        let router = Router::new().route(
            "/directions/json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["departure_time"], "1799996400");
                assert!(!params.contains_key("arrival_time"));
                r#"{"status":"OK","routes":[{"legs":[{"duration":{"value":1500},"duration_in_traffic":{"value":2100}}]}]}"#
            }),
        );
        let base = serve(router).await;
        let client =
            DirectionsClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();
        let query = RouteQuery {
            depart_at: Some(Timestamp::from_secs(1_799_996_400)),
            ..query(TravelMode::Driving)
        };

        let sample = client.estimate(&query).await.unwrap();
        assert_eq!(sample.duration_in_traffic_secs, Some(2100));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let router = Router::new().route(
            "/directions/json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let base = serve(router).await;
        let client =
            DirectionsClient::with_base_url(base, "k", Duration::from_millis(100)).unwrap();

        assert_eq!(
            client.estimate(&query(TravelMode::Driving)).await,
            Err(ProviderError::Timeout)
        );
    }

    #[tokio::test]
    async fn http_error_is_transport_failure() {
        let router = Router::new().route(
            "/directions/json",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream") }),
        );
        let base = serve(router).await;
        let client =
            DirectionsClient::with_base_url(base, "k", Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.estimate(&query(TravelMode::Driving)).await,
            Err(ProviderError::Transport(msg)) if msg.contains("502")
        ));
    }
}
