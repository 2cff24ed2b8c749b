//! Offline city name to IATA code resolution
//!
//! The table in `airports.json` lists one primary airport per city together
//! with the cities it serves and common alternative spellings. Lookups try,
//! in order: an exact city or alias match, an exact IATA code, then the
//! closest name by Damerau-Levenshtein distance. The table can be rebuilt from
//! the OurAirports dump with the `build_airport_table` binary.

use crate::models::Coordinates;
use crate::{Result, TravelError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use tracing::{debug, info, warn};

const AIRPORTS_JSON: &str = include_str!("airports.json");

/// Queries shorter than this are only ever matched exactly
const MIN_FUZZY_LEN: usize = 5;

/// One edit is tolerated per this many characters of the shorter name
const CHARS_PER_EDIT: usize = 5;

/// One row of the airport table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub iata: String,
    pub city: String,
    pub name: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Airport {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    fn names(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.city).chain(self.aliases.iter())
    }
}

/// Resolves city names to airports
pub struct AirportResolver {
    airports: Vec<Airport>,
    /// normalised city or alias -> index into `airports`
    by_name: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl AirportResolver {
    /// Build a resolver over the bundled airport table
    pub fn new() -> Result<Self> {
        let airports: Vec<Airport> = serde_json::from_str(AIRPORTS_JSON)?;
        Ok(Self::from_airports(airports))
    }

    /// Build a resolver over a custom table; earlier rows win on name clashes
    pub fn from_airports(airports: Vec<Airport>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_code = HashMap::new();

        for (index, airport) in airports.iter().enumerate() {
            by_code.entry(airport.iata.to_uppercase()).or_insert(index);
            for name in airport.names() {
                by_name.entry(normalize(name)).or_insert(index);
            }
        }

        debug!(airports = airports.len(), names = by_name.len(), "Airport table loaded");
        Self {
            airports,
            by_name,
            by_code,
        }
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Resolve a city name (or IATA code) to its primary airport
    pub fn resolve(&self, city: &str) -> Result<&Airport> {
        // "Paris, France" -> "Paris"
        let city_part = city.split(',').next().unwrap_or(city);
        let query = normalize(city_part);
        if query.is_empty() {
            return Err(TravelError::unresolved(city));
        }

        if let Some(&index) = self.by_name.get(&query) {
            let airport = &self.airports[index];
            debug!(city = city, iata = %airport.iata, "Exact airport match");
            return Ok(airport);
        }

        if let Some(&index) = self.by_code.get(&query.to_uppercase()) {
            return Ok(&self.airports[index]);
        }

        match self.closest(&query) {
            Some((airport, distance)) => {
                info!(
                    input = city,
                    corrected = %airport.city,
                    iata = %airport.iata,
                    distance,
                    "Corrected misspelled city name"
                );
                Ok(airport)
            }
            None => {
                warn!(city = city, "No airport found for city");
                Err(TravelError::unresolved(city))
            }
        }
    }

    /// Resolve straight to the IATA code
    pub fn iata_code(&self, city: &str) -> Result<&str> {
        self.resolve(city).map(|airport| airport.iata.as_str())
    }

    /// The single airport whose name is nearest to `query`. Two different
    /// airports at the same distance make the correction ambiguous.
    fn closest(&self, query: &str) -> Option<(&Airport, usize)> {
        let query_len = query.chars().count();
        if query_len < MIN_FUZZY_LEN {
            return None;
        }
        let first = query.chars().next()?;

        let mut best: Option<usize> = None;
        let mut matches: HashSet<usize> = HashSet::new();

        for (index, airport) in self.airports.iter().enumerate() {
            for name in airport.names() {
                let candidate = normalize(name);
                let candidate_len = candidate.chars().count();
                if candidate_len < MIN_FUZZY_LEN || candidate.chars().next() != Some(first) {
                    continue;
                }
                let distance = strsim::damerau_levenshtein(query, &candidate);
                if distance > max_edits(query_len.min(candidate_len)) {
                    continue;
                }
                match best {
                    Some(current) if distance > current => {}
                    Some(current) if distance == current => {
                        matches.insert(index);
                    }
                    _ => {
                        best = Some(distance);
                        matches.clear();
                        matches.insert(index);
                    }
                }
            }
        }

        let distance = best?;
        if matches.len() > 1 {
            let codes: Vec<&str> = matches.iter().map(|&i| self.airports[i].iata.as_str()).collect();
            warn!(query, ?codes, "Ambiguous city correction");
            return None;
        }
        let index = matches.into_iter().next()?;
        Some((&self.airports[index], distance))
    }
}

/// Allowed edits for a name of `len` characters
fn max_edits(len: usize) -> usize {
    len / CHARS_PER_EDIT
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One row of the OurAirports `airports.csv` dump; unused columns are ignored
#[derive(Debug, Deserialize)]
struct OurAirportsRow {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    latitude_deg: f64,
    longitude_deg: f64,
    iso_country: String,
    #[serde(default)]
    municipality: String,
    #[serde(default)]
    scheduled_service: String,
    #[serde(default)]
    iata_code: String,
}

impl OurAirportsRow {
    /// Lower is more important; `None` for airports without airline service
    fn rank(&self) -> Option<u8> {
        if self.scheduled_service != "yes" || self.iata_code.trim().len() != 3 {
            return None;
        }
        match self.kind.as_str() {
            "large_airport" => Some(0),
            "medium_airport" => Some(1),
            "small_airport" => Some(2),
            _ => None,
        }
    }
}

/// Read an OurAirports `airports.csv` dump into one primary airport per city.
///
/// Only airports with scheduled service and an IATA code are kept; when a
/// city has several, the largest wins and file order breaks ties. Rows come
/// back largest airports first.
pub fn import_ourairports<R: Read>(reader: R) -> Result<Vec<Airport>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut ranked: Vec<(u8, Airport)> = Vec::new();
    let mut by_city: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<OurAirportsRow>() {
        let row = row?;
        let city = row.municipality.trim();
        let rank = match row.rank() {
            Some(rank) if !city.is_empty() => rank,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let airport = Airport {
            iata: row.iata_code.trim().to_uppercase(),
            city: city.to_string(),
            name: row.name.clone(),
            country: row.iso_country.clone(),
            latitude: row.latitude_deg,
            longitude: row.longitude_deg,
            aliases: Vec::new(),
        };

        let key = normalize(city);
        match by_city.get(&key).copied() {
            Some(slot) if ranked[slot].0 <= rank => skipped += 1,
            Some(slot) => ranked[slot] = (rank, airport),
            None => {
                by_city.insert(key, ranked.len());
                ranked.push((rank, airport));
            }
        }
    }

    ranked.sort_by_key(|(rank, _)| *rank);
    info!(cities = ranked.len(), skipped, "Imported OurAirports dump");
    Ok(ranked.into_iter().map(|(_, airport)| airport).collect())
}

/// Put `curated` rows first and append every imported airport whose code and
/// names are not already claimed by them
pub fn merge_tables(curated: Vec<Airport>, imported: Vec<Airport>) -> Vec<Airport> {
    let mut codes: HashSet<String> = curated.iter().map(|a| a.iata.clone()).collect();
    let mut names: HashSet<String> = curated
        .iter()
        .flat_map(|a| a.names().map(|n| normalize(n)))
        .collect();

    let mut merged = curated;
    for airport in imported {
        if codes.contains(&airport.iata) || names.contains(&normalize(&airport.city)) {
            continue;
        }
        codes.insert(airport.iata.clone());
        names.insert(normalize(&airport.city));
        merged.push(airport);
    }
    merged
}
