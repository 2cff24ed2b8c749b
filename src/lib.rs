//! # Travel Agent Library
//!
//! Turns a free-form travel request into a day-by-day itinerary. The request is
//! extracted into a [`TripRequest`] by a language model, the cities are resolved
//! to airports from an offline table, and flights (Amadeus), events (Eventbrite)
//! and restaurants (Overpass) are fetched before a second model call writes the
//! itinerary.

pub mod airports;
pub mod config;
pub mod events;
pub mod extractor;
pub mod flights;
pub mod geocoding;
pub mod itinerary;
pub mod llm;
pub mod models;
pub mod planner;
pub mod restaurants;

use thiserror::Error;

// Re-export main types for convenience
pub use airports::{Airport, AirportResolver};
pub use config::Settings;
pub use events::EventClient;
pub use extractor::TripExtractor;
pub use flights::FlightClient;
pub use geocoding::GeocodingClient;
pub use itinerary::ItineraryGenerator;
pub use llm::{CompletionRequest, LanguageModel, OpenAiCompatibleClient};
pub use models::{
    Availability, Coordinates, EventOption, FlightOption, Itinerary, RestaurantOption, TripRequest,
};
pub use planner::{TravelPlanner, TripPlan};
pub use restaurants::RestaurantClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelError>;

/// Error types for the travel agent
#[derive(Error, Debug)]
pub enum TravelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{provider} API returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Could not extract a trip from the request: {0}")]
    Extraction(String),

    #[error("Location could not be resolved: {0}")]
    UnresolvedLocation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TravelError {
    pub fn api<S: Into<String>>(provider: &'static str, status: u16, message: S) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm(message.into())
    }

    pub fn extraction<S: Into<String>>(message: S) -> Self {
        Self::Extraction(message.into())
    }

    pub fn unresolved<S: Into<String>>(location: S) -> Self {
        Self::UnresolvedLocation(location.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Message shown to the person at the terminal
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelError::Extraction(message) => format!(
                "Sorry, I couldn't understand that travel request ({message}). \
                 Try naming where you're leaving from and where you're going."
            ),
            TravelError::UnresolvedLocation(location) => {
                format!("Sorry, I couldn't find an airport for '{location}'.")
            }
            TravelError::Config(message) => {
                format!("Configuration error: {message}. Please check your API keys.")
            }
            TravelError::Api {
                provider, status, ..
            } if *status == 401 || *status == 403 => {
                format!("{provider} rejected the credentials. Please check your API keys.")
            }
            TravelError::Http(_) | TravelError::Api { .. } => {
                "Unable to reach an external service. Please check your internet connection."
                    .to_string()
            }
            TravelError::Llm(_) => "The language model did not return a usable answer.".to_string(),
            TravelError::Json(_) => "An external service returned an unexpected response.".to_string(),
            TravelError::InvalidDate(message) => format!("Invalid date: {message}"),
            TravelError::Io(_) => "Failed to read your input.".to_string(),
            TravelError::Csv(_) => "The airport data file could not be read.".to_string(),
        }
    }
}
