//! Settings for the external services and search limits
//!
//! Values are usually supplied by the CLI (flags backed by environment
//! variables); [`Settings::validate`] is run before any client is built.

use crate::{Result, TravelError};
use std::time::Duration;

/// Root settings structure
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub amadeus: AmadeusSettings,
    pub eventbrite: EventbriteSettings,
    pub overpass: OverpassSettings,
    pub nominatim: NominatimSettings,
    pub search: SearchSettings,
}

/// Chat-completions endpoint used for extraction and itinerary writing
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Amadeus Self-Service credentials
#[derive(Clone)]
pub struct AmadeusSettings {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

/// Eventbrite settings; without a token the event search is skipped
#[derive(Clone)]
pub struct EventbriteSettings {
    pub token: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct OverpassSettings {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NominatimSettings {
    pub base_url: String,
    pub user_agent: String,
}

/// Limits shared by the finders
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Maximum results kept per finder
    pub max_results: usize,
    /// Restaurant search radius in meters
    pub radius_m: u32,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
}

pub fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

pub fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub fn default_amadeus_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

pub fn default_eventbrite_base_url() -> String {
    "https://www.eventbriteapi.com".to_string()
}

pub fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

pub fn default_nominatim_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

pub fn default_user_agent() -> String {
    format!("travel_planner_agent/{}", crate::VERSION)
}

pub fn default_max_results() -> usize {
    3
}

pub fn default_radius_m() -> u32 {
    5000
}

pub fn default_timeout_secs() -> u64 {
    30
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            radius_m: default_radius_m(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OverpassSettings {
    fn default() -> Self {
        Self {
            url: default_overpass_url(),
        }
    }
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            base_url: default_nominatim_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keys stay out of debug output
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for AmadeusSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmadeusSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for EventbriteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventbriteSettings")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Settings {
    /// Settings with default endpoints and the given credentials
    pub fn new(
        llm_api_key: impl Into<String>,
        amadeus_api_key: impl Into<String>,
        amadeus_api_secret: impl Into<String>,
        eventbrite_token: Option<String>,
    ) -> Self {
        Self {
            llm: LlmSettings {
                api_key: llm_api_key.into(),
                base_url: default_llm_base_url(),
                model: default_llm_model(),
            },
            amadeus: AmadeusSettings {
                api_key: amadeus_api_key.into(),
                api_secret: amadeus_api_secret.into(),
                base_url: default_amadeus_base_url(),
            },
            eventbrite: EventbriteSettings {
                token: eventbrite_token,
                base_url: default_eventbrite_base_url(),
            },
            overpass: OverpassSettings::default(),
            nominatim: NominatimSettings::default(),
            search: SearchSettings::default(),
        }
    }

    /// Validate all settings
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.validate_urls()?;
        self.validate_numeric_ranges()?;
        Ok(())
    }

    fn validate_credentials(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(TravelError::config("LLM_API_KEY is not set"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(TravelError::config("model identifier cannot be empty"));
        }
        if self.amadeus.api_key.trim().is_empty() || self.amadeus.api_secret.trim().is_empty() {
            return Err(TravelError::config(
                "AMADEUS_API_KEY and AMADEUS_API_SECRET must both be set",
            ));
        }
        if let Some(token) = &self.eventbrite.token {
            if token.trim().is_empty() {
                return Err(TravelError::config(
                    "EVENTBRITE_TOKEN cannot be empty if provided. Either unset it or provide a valid token.",
                ));
            }
        }
        Ok(())
    }

    fn validate_urls(&self) -> Result<()> {
        let urls = [
            ("LLM", &self.llm.base_url),
            ("Amadeus", &self.amadeus.base_url),
            ("Eventbrite", &self.eventbrite.base_url),
            ("Overpass", &self.overpass.url),
            ("Nominatim", &self.nominatim.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelError::config(format!(
                    "{name} URL must be a valid HTTP or HTTPS URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(1..=50).contains(&self.search.max_results) {
            return Err(TravelError::config("max results must be between 1 and 50"));
        }
        if !(100..=50_000).contains(&self.search.radius_m) {
            return Err(TravelError::config(
                "restaurant radius must be between 100 and 50000 meters",
            ));
        }
        if !(1..=300).contains(&self.search.timeout_secs) {
            return Err(TravelError::config("timeout must be between 1 and 300 seconds"));
        }
        Ok(())
    }
}
