//! HTTP client for the Amadeus flight offers API

use crate::config::AmadeusSettings;
use crate::models::{Availability, FlightOption};
use crate::{Result, TravelError};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "Amadeus";

/// Parameters of a round-trip search
#[derive(Debug, Clone, PartialEq)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub budget: Option<f64>,
    pub max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<Offer>,
    #[serde(default)]
    dictionaries: Option<Dictionaries>,
}

#[derive(Debug, Deserialize)]
struct Dictionaries {
    #[serde(default)]
    carriers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    #[serde(default)]
    itineraries: Vec<OfferItinerary>,
    price: OfferPrice,
}

#[derive(Debug, Deserialize)]
struct OfferItinerary {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    departure: Endpoint,
    arrival: Endpoint,
    carrier_code: String,
    number: String,
    #[serde(default)]
    number_of_stops: u32,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferPrice {
    currency: String,
    total: String,
    grand_total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    title: Option<String>,
    detail: Option<String>,
}

/// Flight search client
pub struct FlightClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl FlightClient {
    /// Create a new flight client
    pub fn new(settings: &AmadeusSettings, timeout: Duration) -> Result<Self> {
        debug!("Creating new flight client");
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
        })
    }

    /// Exchange the API key and secret for a bearer token
    #[instrument(level = "debug", skip(self))]
    async fn access_token(&self) -> Result<String> {
        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Obtained access token");
        Ok(token.access_token)
    }

    /// Search round-trip offers; an empty answer is `NoResults`, not an error
    #[instrument(level = "info", skip(self, query), fields(origin = %query.origin, destination = %query.destination))]
    pub async fn search(&self, query: &FlightQuery) -> Result<Availability<FlightOption>> {
        // Amadeus rejects maxPrice=0 and no fare costs less than one unit
        if let Some(budget) = query.budget.filter(|budget| *budget < 1.0) {
            warn!(budget, "Budget below the cheapest possible fare, skipping flight search");
            return Ok(Availability::NoResults);
        }

        let token = self.access_token().await?;

        let mut params = vec![
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            ("departureDate", query.departure_date.to_string()),
            ("returnDate", query.return_date.to_string()),
            ("adults", "1".to_string()),
            ("max", query.max_results.to_string()),
        ];
        if let Some(budget) = query.budget {
            params.push(("maxPrice", (budget.floor() as u64).to_string()));
        }

        let url = format!("{}/v2/shopping/flight-offers", self.base_url);
        info!(url = %url, "Requesting flight offers");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .query(&params)
            .send()
            .await?;
        info!(
            status = %response.status(),
            duration_ms = start_time.elapsed().as_millis(),
            "Flight offers request completed"
        );

        let response = check_status(response).await?;
        let offers: OffersResponse = response.json().await?;
        let flights = select_offers(offers, query.budget, query.max_results);

        if flights.is_empty() {
            warn!("No flights found");
        } else {
            info!(flights_found = flights.len(), "Flight search completed");
        }
        Ok(Availability::from_vec(flights))
    }
}

/// Turn a non-2xx response into an [`TravelError::Api`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .errors
                .into_iter()
                .next()
                .and_then(|entry| entry.detail.or(entry.title))
                .or(parsed.error_description)
        })
        .unwrap_or(body);

    error!(status = %status, message = %message, "Amadeus request failed");
    Err(TravelError::api(PROVIDER, status.as_u16(), message))
}

/// Convert, budget-filter and price-sort the raw offers
fn select_offers(response: OffersResponse, budget: Option<f64>, limit: usize) -> Vec<FlightOption> {
    let carriers = response
        .dictionaries
        .map(|dictionaries| dictionaries.carriers)
        .unwrap_or_default();

    let mut flights: Vec<FlightOption> = response
        .data
        .into_iter()
        .filter_map(|offer| convert_offer(offer, &carriers))
        .filter(|flight| budget.map_or(true, |max| flight.price <= max))
        .collect();

    flights.sort_by(|a, b| a.price.total_cmp(&b.price));
    flights.truncate(limit);
    flights
}

fn convert_offer(offer: Offer, carriers: &HashMap<String, String>) -> Option<FlightOption> {
    let price_text = offer.price.grand_total.as_deref().unwrap_or(&offer.price.total);
    let price = match price_text.parse::<f64>() {
        Ok(price) => price,
        Err(_) => {
            warn!(price = price_text, "Skipping offer with unparseable price");
            return None;
        }
    };

    let mut itineraries = offer.itineraries.into_iter();
    let outbound = itineraries.next()?;
    let first = outbound.segments.first()?;
    let last = outbound.segments.last()?;

    let segment_count = outbound.segments.len() as u32;
    let technical_stops: u32 = outbound.segments.iter().map(|s| s.number_of_stops).sum();

    let return_departure = itineraries
        .next()
        .and_then(|inbound| inbound.segments.first().map(|s| s.departure.at));

    Some(FlightOption {
        carrier: carriers
            .get(&first.carrier_code)
            .cloned()
            .unwrap_or_else(|| first.carrier_code.clone()),
        flight_number: format!("{}{}", first.carrier_code, first.number),
        price,
        currency: offer.price.currency,
        departure: first.departure.at,
        arrival: last.arrival.at,
        stops: segment_count - 1 + technical_stops,
        return_departure,
    })
}
