//! Core data structures passed between the pipeline stages

use crate::{Result, TravelError};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Days between today and the default departure
pub const DEFAULT_LEAD_DAYS: i64 = 14;
/// Default trip length when no return date is given
pub const DEFAULT_TRIP_DAYS: i64 = 7;

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A structured trip, built once from the user's request.
///
/// Fields are private so the invariants checked in [`TripRequest::new`] hold
/// for the lifetime of the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRequest {
    origin: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    budget: Option<f64>,
    interests: BTreeSet<String>,
}

impl TripRequest {
    /// Build a request, filling missing dates relative to `today`.
    ///
    /// A missing start date becomes `today + 14 days`; a missing end date
    /// becomes `start + 7 days`.
    pub fn new<I, S>(
        origin: &str,
        destination: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        budget: Option<f64>,
        interests: I,
        today: NaiveDate,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() {
            return Err(TravelError::extraction("no origin given"));
        }
        if destination.is_empty() {
            return Err(TravelError::extraction("no destination given"));
        }

        let (start_date, end_date) = ensure_dates(start_date, end_date, today)?;
        if end_date < start_date {
            return Err(TravelError::extraction(format!(
                "return date {end_date} is before departure date {start_date}"
            )));
        }

        if let Some(amount) = budget {
            if !amount.is_finite() || amount < 0.0 {
                return Err(TravelError::extraction(format!("invalid budget {amount}")));
            }
        }

        let interests = interests
            .into_iter()
            .map(|interest| interest.as_ref().trim().to_lowercase())
            .filter(|interest| !interest.is_empty())
            .collect();

        Ok(Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            start_date,
            end_date,
            budget,
            interests,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    pub fn interests(&self) -> &BTreeSet<String> {
        &self.interests
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Fill in the dates the traveller did not mention
pub fn ensure_dates(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = match start_date {
        Some(date) => date,
        None => {
            let date = add_days(today, DEFAULT_LEAD_DAYS)?;
            tracing::info!(start_date = %date, "No start date given, defaulting to two weeks out");
            date
        }
    };
    let end = match end_date {
        Some(date) => date,
        None => {
            let date = add_days(start, DEFAULT_TRIP_DAYS)?;
            tracing::info!(end_date = %date, "No end date given, defaulting to a one-week trip");
            date
        }
    };
    Ok((start, end))
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| TravelError::InvalidDate(format!("{date} plus {days} days is out of range")))
}

/// Outcome of a search: either some results or an explicit "nothing found"
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Found(Vec<T>),
    NoResults,
}

impl<T> Availability<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Availability::NoResults
        } else {
            Availability::Found(items)
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Availability::Found(items) => items,
            Availability::NoResults => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Availability::NoResults)
    }
}

impl<T> Default for Availability<T> {
    fn default() -> Self {
        Availability::NoResults
    }
}

/// A priced flight offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOption {
    pub carrier: String,
    pub flight_number: String,
    pub price: f64,
    pub currency: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub stops: u32,
    pub return_departure: Option<NaiveDateTime>,
}

impl fmt::Display for FlightOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stops = match self.stops {
            0 => "nonstop".to_string(),
            1 => "1 stop".to_string(),
            n => format!("{n} stops"),
        };
        write!(
            f,
            "{} {} departing {} arriving {} ({}), {:.2} {}",
            self.carrier,
            self.flight_number,
            self.departure.format("%Y-%m-%d %H:%M"),
            self.arrival.format("%Y-%m-%d %H:%M"),
            stops,
            self.price,
            self.currency
        )?;
        if let Some(back) = self.return_departure {
            write!(f, ", return departing {}", back.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }
}

/// A scheduled event at the destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOption {
    pub name: String,
    pub venue: Option<String>,
    pub start: NaiveDateTime,
    pub categories: Vec<String>,
    pub url: Option<String>,
}

impl fmt::Display for EventOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.name, self.start.format("%Y-%m-%d %H:%M"))?;
        if let Some(venue) = &self.venue {
            write!(f, " ({venue})")?;
        }
        if !self.categories.is_empty() {
            write!(f, " [{}]", self.categories.join(", "))?;
        }
        Ok(())
    }
}

/// A place to eat near the destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantOption {
    pub name: String,
    pub cuisines: Vec<String>,
    pub coordinates: Coordinates,
}

impl fmt::Display for RestaurantOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.cuisines.is_empty() {
            write!(f, " ({})", self.cuisines.join(", "))?;
        }
        Ok(())
    }
}

/// Generated itinerary text; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itinerary(String);

impl Itinerary {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(TravelError::llm("itinerary text was empty"));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Itinerary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_dates_default_to_one_week_two_weeks_out() {
        let today = date(2026, 10, 17);
        let trip = TripRequest::new("Boston", "Rome", None, None, None, Vec::<String>::new(), today)
            .unwrap();

        assert_eq!(trip.start_date(), date(2026, 10, 31));
        assert_eq!(trip.end_date(), date(2026, 11, 7));
        assert_eq!(trip.duration_days(), 7);
    }

    #[test]
    fn test_missing_end_date_follows_given_start() {
        let today = date(2026, 10, 17);
        let trip = TripRequest::new(
            "Boston",
            "Rome",
            Some(date(2026, 12, 30)),
            None,
            None,
            Vec::<String>::new(),
            today,
        )
        .unwrap();

        assert_eq!(trip.start_date(), date(2026, 12, 30));
        assert_eq!(trip.end_date(), date(2027, 1, 6));
    }

    #[test]
    fn test_default_dates_past_the_calendar_end_are_an_error() {
        let err = ensure_dates(Some(NaiveDate::MAX), None, date(2026, 10, 17)).unwrap_err();
        assert!(matches!(err, TravelError::InvalidDate(_)));

        let trip = TripRequest::new(
            "Boston",
            "Rome",
            None,
            None,
            None,
            Vec::<String>::new(),
            NaiveDate::MAX,
        );
        assert!(matches!(trip, Err(TravelError::InvalidDate(_))));
    }

    #[test]
    fn test_interests_are_normalised() {
        let trip = TripRequest::new(
            " New York ",
            "Paris",
            None,
            None,
            Some(1500.0),
            ["Art", "food", " art ", ""],
            date(2026, 10, 17),
        )
        .unwrap();

        assert_eq!(trip.origin(), "New York");
        let interests: Vec<&str> = trip.interests().iter().map(String::as_str).collect();
        assert_eq!(interests, vec!["art", "food"]);
    }

    #[test]
    fn test_invalid_trips_are_rejected() {
        let today = date(2026, 10, 17);
        let none = Vec::<String>::new();

        assert!(TripRequest::new("", "Paris", None, None, None, none.clone(), today).is_err());
        assert!(TripRequest::new("Oslo", "  ", None, None, None, none.clone(), today).is_err());
        assert!(TripRequest::new("Oslo", "Paris", None, None, Some(-5.0), none.clone(), today).is_err());

        let backwards = TripRequest::new(
            "Oslo",
            "Paris",
            Some(date(2026, 11, 10)),
            Some(date(2026, 11, 1)),
            None,
            none,
            today,
        );
        assert!(matches!(backwards, Err(TravelError::Extraction(_))));
    }

    #[test]
    fn test_availability_from_vec() {
        assert_eq!(Availability::<u8>::from_vec(vec![]), Availability::NoResults);
        let found = Availability::from_vec(vec![1, 2]);
        assert_eq!(found.len(), 2);
        assert!(!found.is_empty());
        assert!(Availability::<u8>::default().items().is_empty());
    }

    #[test]
    fn test_itinerary_rejects_blank_text() {
        assert!(Itinerary::new("   \n").is_err());
        assert_eq!(Itinerary::new("  Day 1: arrive\n").unwrap().as_str(), "Day 1: arrive");
    }

    #[test]
    fn test_flight_display() {
        let flight = FlightOption {
            carrier: "AIR FRANCE".to_string(),
            flight_number: "AF7".to_string(),
            price: 612.4,
            currency: "USD".to_string(),
            departure: date(2026, 11, 14).and_hms_opt(19, 30, 0).unwrap(),
            arrival: date(2026, 11, 15).and_hms_opt(8, 50, 0).unwrap(),
            stops: 0,
            return_departure: None,
        };
        assert_eq!(
            flight.to_string(),
            "AIR FRANCE AF7 departing 2026-11-14 19:30 arriving 2026-11-15 08:50 (nonstop), 612.40 USD"
        );
    }
}
