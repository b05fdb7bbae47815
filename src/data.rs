use crate::config::AppConfig;
use crate::types::PropertyRecord;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geojson::{FeatureCollection, GeoJson};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use tracing::{info, warn};

/// Everything the data server hands out.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub regions: FeatureCollection,
    pub properties: Vec<PropertyRecord>,
}

/// One CSV row, with whatever fields parsed.
#[derive(Debug, Clone, PartialEq)]
struct Listing {
    group: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    price: Option<f64>,
}

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    // 1. Load listings
    let listings = load_listings(config)?;
    info!("Loaded {} listings", listings.len());

    // 2. Average per borough, then join onto the boundaries
    let averages = average_prices(&listings);
    let regions = load_geojson_and_join(config, &averages)?;
    info!("Joined average prices onto {} regions", regions.features.len());

    Ok(Dataset {
        regions,
        properties: property_records(&listings),
    })
}

fn parse_number(field: Option<&str>) -> Option<f64> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

fn load_listings(config: &AppConfig) -> Result<Vec<Listing>> {
    let file = File::open(&config.input.data_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", config.input.data_csv))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))
    };
    let group_idx = column(&config.input.join_column_csv)?;
    let lat_idx = column("latitude")?;
    let lon_idx = column("longitude")?;
    let price_idx = column(&config.input.price_column)?;

    let mut listings = Vec::new();
    for result in rdr.records() {
        let record = result?;
        listings.push(Listing {
            group: record
                .get(group_idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            latitude: parse_number(record.get(lat_idx)),
            longitude: parse_number(record.get(lon_idx)),
            price: parse_number(record.get(price_idx)),
        });
    }

    Ok(listings)
}

/// Mean price per group over listings that have both.
fn average_prices(listings: &[Listing]) -> HashMap<String, f64> {
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for listing in listings {
        if let (Some(group), Some(price)) = (listing.group.as_deref(), listing.price) {
            let entry = sums.entry(group).or_insert((0.0, 0));
            entry.0 += price;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(group, (sum, count))| (group.to_string(), sum / count as f64))
        .collect()
}

/// Listings with coordinates and a price, in file order.
fn property_records(listings: &[Listing]) -> Vec<PropertyRecord> {
    listings
        .iter()
        .filter_map(|l| match (l.latitude, l.longitude, l.price) {
            (Some(latitude), Some(longitude), Some(price)) => Some(PropertyRecord {
                latitude,
                longitude,
                price: Some(price),
            }),
            _ => None,
        })
        .collect()
}

fn load_geojson_and_join(config: &AppConfig, averages: &HashMap<String, f64>) -> Result<FeatureCollection> {
    info!("Loading GeoJSON from {:?}...", config.input.geojson);
    let file = File::open(&config.input.geojson)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", config.input.geojson))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    let mut collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    for feature in &mut collection.features {
        let name = feature
            .property(&config.input.join_column_geojson)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let average = match name.as_deref().and_then(|n| averages.get(n)) {
            Some(avg) => serde_json::Number::from_f64(*avg)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            None => {
                warn!("No listings for region {:?}", name);
                serde_json::Value::Null
            }
        };
        feature.set_property("average_price", average);
    }

    Ok(collection)
}
