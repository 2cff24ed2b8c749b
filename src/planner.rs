//! The end-to-end planning pipeline
//!
//! Stages run one after another: extraction, airport resolution, flights,
//! events, geocoding plus restaurants, and finally the itinerary. Any error
//! aborts the run; an empty search result does not.

use crate::airports::{Airport, AirportResolver};
use crate::config::{SearchSettings, Settings};
use crate::events::EventClient;
use crate::extractor::TripExtractor;
use crate::flights::{FlightClient, FlightQuery};
use crate::geocoding::GeocodingClient;
use crate::itinerary::ItineraryGenerator;
use crate::llm::{LanguageModel, OpenAiCompatibleClient};
use crate::models::{
    Availability, Coordinates, EventOption, FlightOption, Itinerary, RestaurantOption, TripRequest,
};
use crate::restaurants::RestaurantClient;
use crate::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Everything gathered for one request
#[derive(Debug, Clone)]
pub struct TripPlan {
    pub trip: TripRequest,
    pub origin_airport: Airport,
    pub destination_airport: Airport,
    pub flights: Availability<FlightOption>,
    pub events: Availability<EventOption>,
    pub restaurants: Availability<RestaurantOption>,
    pub itinerary: Itinerary,
}

/// Wires every stage together
pub struct TravelPlanner {
    extractor: TripExtractor,
    airports: AirportResolver,
    flights: FlightClient,
    events: EventClient,
    geocoder: GeocodingClient,
    restaurants: RestaurantClient,
    itinerary: ItineraryGenerator,
    search: SearchSettings,
}

impl TravelPlanner {
    /// Build a planner talking to the configured language model endpoint
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model = OpenAiCompatibleClient::new(&settings.llm, settings.search.timeout())?;
        info!(model = model.model(), "Language model client ready");
        Self::with_model(settings, Arc::new(model))
    }

    /// Build a planner around an existing language model
    pub fn with_model(settings: &Settings, model: Arc<dyn LanguageModel>) -> Result<Self> {
        settings.validate()?;
        let timeout = settings.search.timeout();

        Ok(Self {
            extractor: TripExtractor::new(model.clone())?,
            airports: AirportResolver::new()?,
            flights: FlightClient::new(&settings.amadeus, timeout)?,
            events: EventClient::new(&settings.eventbrite, timeout)?,
            geocoder: GeocodingClient::new(&settings.nominatim, timeout)?,
            restaurants: RestaurantClient::new(&settings.overpass, timeout)?,
            itinerary: ItineraryGenerator::new(model),
            search: settings.search.clone(),
        })
    }

    /// Run the whole pipeline for one free-text request
    #[instrument(level = "info", skip(self, text))]
    pub async fn plan(&self, text: &str, today: NaiveDate) -> Result<TripPlan> {
        let start_time = std::time::Instant::now();

        let trip = self.extractor.extract(text, today).await?;

        let origin_airport = self.airports.resolve(trip.origin())?.clone();
        let destination_airport = self.airports.resolve(trip.destination())?.clone();
        info!(
            origin = %origin_airport.iata,
            destination = %destination_airport.iata,
            "Resolved airports"
        );

        let query = FlightQuery {
            origin: origin_airport.iata.clone(),
            destination: destination_airport.iata.clone(),
            departure_date: trip.start_date(),
            return_date: trip.end_date(),
            budget: trip.budget(),
            max_results: self.search.max_results,
        };
        let flights = self.flights.search(&query).await?;
        if flights.is_empty() {
            warn!("No flights found for the requested dates");
        }

        let events = self
            .events
            .search(
                trip.destination(),
                trip.start_date(),
                trip.end_date(),
                trip.interests(),
                self.search.max_results,
            )
            .await?;

        let center = self.restaurant_center(&trip, &destination_airport).await?;
        let restaurants = self
            .restaurants
            .search(center, self.search.radius_m, self.search.max_results)
            .await?;

        let itinerary = self
            .itinerary
            .generate(&trip, &flights, &events, &restaurants)
            .await?;

        info!(
            flights = flights.len(),
            events = events.len(),
            restaurants = restaurants.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Trip planned"
        );

        Ok(TripPlan {
            trip,
            origin_airport,
            destination_airport,
            flights,
            events,
            restaurants,
            itinerary,
        })
    }

    async fn restaurant_center(&self, trip: &TripRequest, airport: &Airport) -> Result<Coordinates> {
        match self.geocoder.geocode(trip.destination()).await? {
            Some(coordinates) => Ok(coordinates),
            None => {
                warn!(
                    destination = trip.destination(),
                    iata = %airport.iata,
                    "Geocoder found nothing, using airport coordinates"
                );
                Ok(airport.coordinates())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use crate::TravelError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers extraction with a fixed JSON document and counts calls
    struct FixedExtraction {
        json: String,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl LanguageModel for FixedExtraction {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.json.clone())
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::new("llm-key", "amadeus-key", "amadeus-secret", None);
        // Nothing listens here; these tests must fail before any request is sent
        settings.amadeus.base_url = "http://127.0.0.1:9".to_string();
        settings.overpass.url = "http://127.0.0.1:9/api/interpreter".to_string();
        settings.nominatim.base_url = "http://127.0.0.1:9".to_string();
        settings
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[tokio::test]
    async fn test_unresolved_destination_aborts() {
        let model = Arc::new(FixedExtraction {
            json: r#"{"origin": "New York", "destination": "Xyzzyville", "interests": []}"#.to_string(),
            calls: Mutex::new(0),
        });
        let planner = TravelPlanner::with_model(&settings(), model.clone()).unwrap();

        let err = planner.plan("New York to Xyzzyville", today()).await.unwrap_err();
        assert!(matches!(err, TravelError::UnresolvedLocation(ref city) if city == "Xyzzyville"));
        assert_eq!(*model.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_aborts() {
        let model = Arc::new(FixedExtraction {
            json: "I'm sorry, I can't help with that.".to_string(),
            calls: Mutex::new(0),
        });
        let planner = TravelPlanner::with_model(&settings(), model).unwrap();

        let err = planner.plan("somewhere nice", today()).await.unwrap_err();
        assert!(matches!(err, TravelError::Extraction(_)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = settings();
        settings.amadeus.api_secret = String::new();
        let model = Arc::new(FixedExtraction {
            json: String::new(),
            calls: Mutex::new(0),
        });
        let result = TravelPlanner::with_model(&settings, model);
        assert!(matches!(result, Err(TravelError::Config(_))));
    }
}
