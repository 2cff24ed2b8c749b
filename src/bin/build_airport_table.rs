use std::io::Write;
use travel_agent::airports::{import_ourairports, merge_tables, Airport};

const TABLE_PATH: &str = "src/airports.json";

/// Rebuild `src/airports.json` from an OurAirports dump.
///
/// Usage: `build_airport_table <airports.csv>` where the CSV comes from
/// https://davidmegginson.github.io/ourairports-data/airports.csv. Rows already
/// in the table are kept first so their aliases and airport choices survive.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let csv_path = std::env::args()
        .nth(1)
        .ok_or("usage: build_airport_table <airports.csv>")?;

    println!("🚀 Rebuilding airport table from {csv_path}...");

    let curated: Vec<Airport> = serde_json::from_str(&std::fs::read_to_string(TABLE_PATH)?)?;
    let imported = import_ourairports(std::fs::File::open(&csv_path)?)?;

    println!("📊 Curated rows: {}", curated.len());
    println!("📊 Cities with scheduled service: {}", imported.len());

    let table = merge_tables(curated, imported);

    let json_content = serde_json::to_string_pretty(&table)?;
    let mut file = std::fs::File::create(TABLE_PATH)?;
    file.write_all(json_content.as_bytes())?;

    println!("\n✅ Table written to {TABLE_PATH}");
    println!("📊 Total entries: {}", table.len());

    let resolver = travel_agent::AirportResolver::from_airports(table);
    println!("\n🔍 Testing some lookups:");
    for city in &["London", "New York", "Bergen", "Genova", "Lublin"] {
        match resolver.iata_code(city) {
            Ok(code) => println!("  {} -> {}", city, code),
            Err(e) => println!("  {} -> Error: {}", city, e),
        }
    }

    Ok(())
}
