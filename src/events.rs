//! Eventbrite event search with client-side interest filtering

use crate::config::EventbriteSettings;
use crate::models::{Availability, EventOption};
use crate::{Result, TravelError};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    name: TextField,
    description: Option<TextField>,
    start: EventStart,
    url: Option<String>,
    venue: Option<Named>,
    category: Option<Named>,
    subcategory: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct TextField {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventStart {
    local: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
}

/// An event together with the free text its interests are matched against
struct Candidate {
    event: EventOption,
    description: String,
}

/// Event search client
pub struct EventClient {
    http_client: Client,
    base_url: String,
    token: Option<String>,
}

impl EventClient {
    pub fn new(settings: &EventbriteSettings, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    /// Events in `city` between the two dates that match any interest.
    ///
    /// Without a token the search is skipped and yields `NoResults`.
    #[instrument(level = "info", skip(self, interests))]
    pub async fn search(
        &self,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
        interests: &BTreeSet<String>,
        max_results: usize,
    ) -> Result<Availability<EventOption>> {
        let Some(token) = &self.token else {
            warn!("No Eventbrite token; skipping events");
            return Ok(Availability::NoResults);
        };

        let range_start = format!("{}T00:00:00", start);
        let range_end = format!("{}T23:59:59", end);
        let url = format!("{}/v3/events/search/", self.base_url);
        debug!(url = %url, "Requesting events");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("location.address", city),
                ("start_date.range_start", range_start.as_str()),
                ("start_date.range_end", range_end.as_str()),
                ("sort_by", "date"),
                ("expand", "venue,category,subcategory"),
            ])
            .send()
            .await?;
        let status = response.status();
        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Event search request completed"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error_description)
                .unwrap_or(body);
            error!(status = %status, message = %message, "Event search failed");
            return Err(TravelError::api("Eventbrite", status.as_u16(), message));
        }

        let parsed: SearchResponse = response.json().await?;
        let received = parsed.events.len();
        let events: Vec<EventOption> = parsed
            .events
            .into_iter()
            .map(Candidate::from)
            .filter(|candidate| candidate.matches(interests))
            .map(|candidate| candidate.event)
            .take(max_results)
            .collect();

        info!(received, kept = events.len(), "Filtered events by interests");
        Ok(Availability::from_vec(events))
    }
}

impl From<ApiEvent> for Candidate {
    fn from(api: ApiEvent) -> Self {
        let categories = [api.category, api.subcategory]
            .into_iter()
            .flatten()
            .filter_map(|named| named.name)
            .collect();
        Candidate {
            event: EventOption {
                name: api.name.text.unwrap_or_else(|| "Untitled event".to_string()),
                venue: api.venue.and_then(|venue| venue.name),
                start: api.start.local,
                categories,
                url: api.url,
            },
            description: api
                .description
                .and_then(|description| description.text)
                .unwrap_or_default(),
        }
    }
}

impl Candidate {
    /// True when every word of some interest appears, in order, among the
    /// words of the name, description or category tags. An empty interest set
    /// matches everything.
    fn matches(&self, interests: &BTreeSet<String>) -> bool {
        if interests.is_empty() {
            return true;
        }
        let text = format!(
            "{} {} {}",
            self.event.name,
            self.description,
            self.event.categories.join(" ")
        );
        let text_words = words(&text);
        interests.iter().any(|interest| {
            let wanted = words(interest);
            !wanted.is_empty()
                && text_words.windows(wanted.len()).any(|window| {
                    window
                        .iter()
                        .zip(&wanted)
                        .all(|(word, want)| same_word(word, want))
                })
        })
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Equal, or equal up to a plural "s" ("art" and "arts")
fn same_word(word: &str, interest: &str) -> bool {
    word == interest
        || word.strip_suffix('s') == Some(interest)
        || interest.strip_suffix('s') == Some(word)
}
