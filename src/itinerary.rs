//! Prose itinerary generation

use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::{Availability, EventOption, FlightOption, Itinerary, RestaurantOption, TripRequest};
use crate::Result;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const SYSTEM_PROMPT: &str = "You are a helpful travel planner.";

/// Writes the final itinerary from everything the finders collected
pub struct ItineraryGenerator {
    model: Arc<dyn LanguageModel>,
}

impl ItineraryGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Any of the result sets may be `NoResults`; the prompt says so and the
    /// model plans around it.
    #[instrument(level = "info", skip_all, fields(destination = trip.destination()))]
    pub async fn generate(
        &self,
        trip: &TripRequest,
        flights: &Availability<FlightOption>,
        events: &Availability<EventOption>,
        restaurants: &Availability<RestaurantOption>,
    ) -> Result<Itinerary> {
        let prompt = build_prompt(trip, flights, events, restaurants);
        debug!(prompt_length = prompt.len(), "Built itinerary prompt");

        let text = self
            .model
            .complete(CompletionRequest::text(SYSTEM_PROMPT, prompt))
            .await?;
        let itinerary = Itinerary::new(text)?;

        info!(length = itinerary.as_str().len(), "Itinerary generated");
        Ok(itinerary)
    }
}

/// Assemble the planning prompt
pub fn build_prompt(
    trip: &TripRequest,
    flights: &Availability<FlightOption>,
    events: &Availability<EventOption>,
    restaurants: &Availability<RestaurantOption>,
) -> String {
    let mut prompt = format!(
        "Plan a friendly, detailed itinerary for a trip from {} to {}, departing {} and returning {} ({} days).\n",
        trip.origin(),
        trip.destination(),
        trip.start_date(),
        trip.end_date(),
        trip.duration_days()
    );

    if let Some(budget) = trip.budget() {
        prompt.push_str(&format!("Total budget: {budget:.0}.\n"));
    }
    if !trip.interests().is_empty() {
        let interests: Vec<&str> = trip.interests().iter().map(String::as_str).collect();
        prompt.push_str(&format!("Interests: {}.\n", interests.join(", ")));
    }

    push_section(&mut prompt, "Flights", flights);
    push_section(&mut prompt, "Events", events);
    push_section(&mut prompt, "Restaurants", restaurants);

    prompt.push_str(
        "Do not return JSON. Write clear day-by-day bullet points. \
         Only give the itinerary for the trip, do not ask anything back. \
         Do not use decorators like asterisks; use whitespace to keep it clean. \
         If a section above says none found, plan that part with general suggestions instead.",
    );
    prompt
}

fn push_section<T: Display>(prompt: &mut String, title: &str, results: &Availability<T>) {
    match results {
        Availability::NoResults => {
            prompt.push_str(&format!("{title}: none found.\n"));
        }
        Availability::Found(items) => {
            prompt.push_str(&format!("{title}:\n"));
            for item in items {
                prompt.push_str(&format!("- {item}\n"));
            }
        }
    }
}
