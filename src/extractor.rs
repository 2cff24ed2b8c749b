//! Free-text to [`TripRequest`] extraction

use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::TripRequest;
use crate::{Result, TravelError};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shape the model is asked to return. Every field is optional so that a
/// partial answer produces a precise error instead of a serde failure.
#[derive(Debug, Default, Deserialize)]
struct ExtractedTrip {
    origin: Option<String>,
    destination: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    budget: Option<Value>,
    #[serde(default)]
    interests: Option<Vec<String>>,
}

/// Uses a language model to turn a travel request into a [`TripRequest`]
pub struct TripExtractor {
    model: Arc<dyn LanguageModel>,
    fence: Regex,
    amount: Regex,
}

impl TripExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Result<Self> {
        Ok(Self {
            model,
            fence: Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```")
                .map_err(|e| TravelError::config(format!("invalid fence pattern: {e}")))?,
            amount: Regex::new(r"\d+(?:\.\d+)?")
                .map_err(|e| TravelError::config(format!("invalid amount pattern: {e}")))?,
        })
    }

    /// Extract a trip from `text`, resolving relative dates against `today`
    #[instrument(level = "info", skip(self, text), fields(text_length = text.len()))]
    pub async fn extract(&self, text: &str, today: NaiveDate) -> Result<TripRequest> {
        if text.trim().is_empty() {
            return Err(TravelError::extraction("the request was empty"));
        }

        let request = CompletionRequest::json(system_prompt(today), text.trim());
        let raw = self.model.complete(request).await?;
        debug!(response = %raw, "Extraction response received");

        let trip = self.parse(&raw, today)?;
        info!(
            origin = trip.origin(),
            destination = trip.destination(),
            start_date = %trip.start_date(),
            end_date = %trip.end_date(),
            budget = ?trip.budget(),
            interests = ?trip.interests(),
            "Extracted trip request"
        );
        Ok(trip)
    }

    /// Parse the model's answer into a validated [`TripRequest`]
    pub fn parse(&self, raw: &str, today: NaiveDate) -> Result<TripRequest> {
        let json = self.json_payload(raw);
        let extracted: ExtractedTrip = serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "Model answer was not the expected JSON object");
            TravelError::extraction(format!("unparseable model answer: {e}"))
        })?;

        let origin = extracted
            .origin
            .ok_or_else(|| TravelError::extraction("no origin found"))?;
        let destination = extracted
            .destination
            .ok_or_else(|| TravelError::extraction("no destination found"))?;
        let start_date = parse_date(extracted.start_date.as_deref())?;
        let end_date = parse_date(extracted.end_date.as_deref())?;
        let budget = self.parse_budget(extracted.budget)?;

        TripRequest::new(
            &origin,
            &destination,
            start_date,
            end_date,
            budget,
            extracted.interests.unwrap_or_default(),
            today,
        )
    }

    fn json_payload<'a>(&self, raw: &'a str) -> &'a str {
        if let Some(inner) = self.fence.captures(raw).and_then(|c| c.get(1)) {
            return inner.as_str();
        }
        // Tolerate prose around the object
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if start < end => &raw[start..=end],
            _ => raw.trim(),
        }
    }

    fn parse_budget(&self, value: Option<Value>) -> Result<Option<f64>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => Ok(number.as_f64()),
            Some(Value::String(text)) => {
                let digits = text.replace(',', "");
                match self.amount.find(&digits) {
                    Some(m) => m
                        .as_str()
                        .parse::<f64>()
                        .map(Some)
                        .map_err(|e| TravelError::extraction(format!("invalid budget '{text}': {e}"))),
                    None => Ok(None),
                }
            }
            Some(other) => Err(TravelError::extraction(format!("invalid budget {other}"))),
        }
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| TravelError::InvalidDate(format!("'{text}' is not YYYY-MM-DD"))),
    }
}

fn system_prompt(today: NaiveDate) -> String {
    format!(
        "Today is {today}. Extract origin, destination, start_date (YYYY-MM-DD), \
         end_date (YYYY-MM-DD), budget (number) and interests (list of lowercase keywords) \
         from the traveller's sentence. Resolve relative dates such as \"next month\" against \
         today's date and compute end_date from any trip length they mention in words or numbers. \
         If no dates are mentioned, set start_date and end_date to null. \
         Correct the spelling of place names if they are misspelled. \
         Respond with a single JSON object with exactly the keys \
         origin, destination, start_date, end_date, budget, interests.",
        today = today.format(DATE_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a canned answer and remembers the prompts it was given
    struct ScriptedModel {
        answer: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedModel {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request);
            Ok(self.answer.clone())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[tokio::test]
    async fn test_new_york_to_paris_request() {
        let model = ScriptedModel::new(
            r#"{"origin": "New York", "destination": "Paris", "start_date": "2026-11-14",
                "end_date": "2026-11-21", "budget": 1500, "interests": ["art", "food"]}"#,
        );
        let extractor = TripExtractor::new(model.clone()).unwrap();

        let trip = extractor
            .extract(
                "New York to Paris, next month, one week, budget $1500, interests: art and food",
                today(),
            )
            .await
            .unwrap();

        assert_eq!(trip.origin(), "New York");
        assert_eq!(trip.destination(), "Paris");
        assert_eq!(trip.duration_days(), 7);
        let lead = (trip.start_date() - today()).num_days();
        assert!((14..=45).contains(&lead), "start should be roughly a month out, got {lead} days");
        assert_eq!(trip.budget(), Some(1500.0));
        let interests: Vec<&str> = trip.interests().iter().map(String::as_str).collect();
        assert_eq!(interests, vec!["art", "food"]);

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].json_output);
        assert!(seen[0].system.contains("Today is 2026-10-17"));
    }

    #[tokio::test]
    async fn test_missing_dates_fall_back_to_defaults() {
        let model = ScriptedModel::new(
            r#"{"origin": "Chicago", "destination": "Denver", "start_date": null, "end_date": null}"#,
        );
        let extractor = TripExtractor::new(model).unwrap();

        let trip = extractor.extract("Chicago to Denver", today()).await.unwrap();
        assert_eq!(trip.start_date(), NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
        assert_eq!(trip.end_date(), NaiveDate::from_ymd_opt(2026, 11, 7).unwrap());
        assert!(trip.budget().is_none());
        assert!(trip.interests().is_empty());
    }

    #[test]
    fn test_fenced_answer_and_string_budget() {
        let extractor = TripExtractor::new(ScriptedModel::new("")).unwrap();
        let raw = "Here you go:\n```json\n{\"origin\": \"Oslo\", \"destination\": \"Rome\", \"budget\": \"$2,000\"}\n```";

        let trip = extractor.parse(raw, today()).unwrap();
        assert_eq!(trip.destination(), "Rome");
        assert_eq!(trip.budget(), Some(2000.0));
    }

    #[test]
    fn test_unparseable_answers() {
        let extractor = TripExtractor::new(ScriptedModel::new("")).unwrap();

        let not_json = extractor.parse("I am not sure what you mean.", today());
        assert!(matches!(not_json, Err(TravelError::Extraction(_))));

        let no_destination = extractor.parse(r#"{"origin": "Oslo"}"#, today());
        assert!(matches!(no_destination, Err(TravelError::Extraction(_))));

        let bad_date = extractor.parse(
            r#"{"origin": "Oslo", "destination": "Rome", "start_date": "next friday"}"#,
            today(),
        );
        assert!(matches!(bad_date, Err(TravelError::InvalidDate(_))));
    }

    #[tokio::test]
    async fn test_blank_input_skips_the_model() {
        let model = ScriptedModel::new("{}");
        let extractor = TripExtractor::new(model.clone()).unwrap();

        let result = extractor.extract("   ", today()).await;
        assert!(matches!(result, Err(TravelError::Extraction(_))));
        assert!(model.seen.lock().unwrap().is_empty());
    }
}
