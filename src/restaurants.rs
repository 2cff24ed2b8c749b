//! Restaurant search through the OpenStreetMap Overpass API

use crate::config::OverpassSettings;
use crate::models::{Availability, Coordinates, RestaurantOption};
use crate::{Result, TravelError};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Restaurant search client
pub struct RestaurantClient {
    http_client: Client,
    url: String,
}

impl RestaurantClient {
    pub fn new(settings: &OverpassSettings, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: settings.url.clone(),
        })
    }

    /// Named restaurants within `radius_m` meters of `center`
    #[instrument(level = "info", skip(self, center), fields(center = %center))]
    pub async fn search(
        &self,
        center: Coordinates,
        radius_m: u32,
        max_results: usize,
    ) -> Result<Availability<RestaurantOption>> {
        let query = build_query(center, radius_m);
        debug!(query = %query, "Sending Overpass query");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("data", query.as_str())])
            .send()
            .await?;
        let status = response.status();
        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Overpass request completed"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Overpass query failed");
            return Err(TravelError::api("Overpass", status.as_u16(), body));
        }

        let parsed: OverpassResponse = response.json().await?;
        let restaurants = collect_restaurants(parsed.elements, max_results);
        info!(restaurants_found = restaurants.len(), "Restaurant search completed");
        Ok(Availability::from_vec(restaurants))
    }
}

fn build_query(center: Coordinates, radius_m: u32) -> String {
    format!(
        "[out:json][timeout:25];node[amenity=restaurant](around:{},{},{});out;",
        radius_m, center.latitude, center.longitude
    )
}

/// Keep named nodes, first occurrence of each name, in response order
fn collect_restaurants(elements: Vec<Element>, limit: usize) -> Vec<RestaurantOption> {
    let mut seen = HashSet::new();
    let mut restaurants = Vec::new();

    for element in elements {
        if restaurants.len() >= limit {
            break;
        }
        let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
            continue;
        };
        let Some(name) = element.tags.get("name").map(|n| n.trim()).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !seen.insert(name.to_string()) {
            continue;
        }

        let cuisines = element
            .tags
            .get("cuisine")
            .map(|cuisine| {
                cuisine
                    .split(';')
                    .map(|c| c.trim().replace('_', " "))
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        restaurants.push(RestaurantOption {
            name: name.to_string(),
            cuisines,
            coordinates: Coordinates::new(lat, lon),
        });
    }

    restaurants
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn paris() -> Coordinates {
        Coordinates::new(48.8566, 2.3522)
    }

    #[test]
    fn test_query_text() {
        assert_eq!(
            build_query(paris(), 5000),
            "[out:json][timeout:25];node[amenity=restaurant](around:5000,48.8566,2.3522);out;"
        );
    }

    #[tokio::test]
    async fn test_search_dedupes_and_limits() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/interpreter")
                    .query_param_exists("data");
                then.status(200).json_body(json!({
                    "elements": [
                        {"type": "node", "id": 1, "lat": 48.85, "lon": 2.35, "tags": {"amenity": "restaurant"}},
                        {"type": "node", "id": 2, "lat": 48.86, "lon": 2.34, "tags": {"name": "Le Comptoir", "cuisine": "french;wine_bar"}},
                        {"type": "node", "id": 3, "lat": 48.87, "lon": 2.33, "tags": {"name": "Le Comptoir"}},
                        {"type": "node", "id": 4, "lat": 48.84, "lon": 2.36, "tags": {"name": "Pho 13", "cuisine": "vietnamese"}},
                        {"type": "node", "id": 5, "lat": 48.83, "lon": 2.37, "tags": {"name": "Chez Janou"}},
                        {"type": "node", "id": 6, "lat": 48.82, "lon": 2.38, "tags": {"name": "Septime"}}
                    ]
                }));
            })
            .await;

        let settings = OverpassSettings {
            url: server.url("/api/interpreter"),
        };
        let client = RestaurantClient::new(&settings, Duration::from_secs(5)).unwrap();
        let result = client.search(paris(), 5000, 3).await.unwrap();

        mock.assert_async().await;
        let names: Vec<&str> = result.items().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Le Comptoir", "Pho 13", "Chez Janou"]);
        assert_eq!(
            result.items()[0].cuisines,
            vec!["french".to_string(), "wine bar".to_string()]
        );
        assert!(result.items()[2].cuisines.is_empty());
    }

    #[tokio::test]
    async fn test_empty_area_is_no_results() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/interpreter");
                then.status(200).json_body(json!({"version": 0.6, "elements": []}));
            })
            .await;

        let settings = OverpassSettings {
            url: server.url("/api/interpreter"),
        };
        let client = RestaurantClient::new(&settings, Duration::from_secs(5)).unwrap();
        let result = client.search(paris(), 500, 3).await.unwrap();
        assert_eq!(result, Availability::NoResults);
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/interpreter");
                then.status(504).body("Gateway Timeout");
            })
            .await;

        let settings = OverpassSettings {
            url: server.url("/api/interpreter"),
        };
        let client = RestaurantClient::new(&settings, Duration::from_secs(5)).unwrap();
        let err = client.search(paris(), 5000, 3).await.unwrap_err();
        assert!(matches!(err, TravelError::Api { status: 504, .. }));
    }
}
