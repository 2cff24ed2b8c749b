//! Nominatim geocoding for the restaurant search centre

use crate::config::NominatimSettings;
use crate::models::Coordinates;
use crate::{Result, TravelError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Nominatim returns coordinates as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Geocoding client
pub struct GeocodingClient {
    http_client: Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(settings: &NominatimSettings, timeout: Duration) -> Result<Self> {
        // Nominatim's usage policy requires an identifying User-Agent
        let http_client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Best match for `query`, or `None` when nothing is found
    #[instrument(level = "info", skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Geocoding request failed");
            return Err(TravelError::api("Nominatim", status.as_u16(), body));
        }

        let places: Vec<Place> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            debug!("Geocoder returned no match");
            return Ok(None);
        };

        let latitude = parse_degrees(&place.lat)?;
        let longitude = parse_degrees(&place.lon)?;
        debug!(name = %place.display_name, latitude, longitude, "Geocoded location");
        Ok(Some(Coordinates::new(latitude, longitude)))
    }
}

fn parse_degrees(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| TravelError::api("Nominatim", 200, format!("invalid coordinate '{text}'")))
}
