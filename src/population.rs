// Population Model - density estimation and casualty rings
// Metro table first, then reverse geocoding, then a latitude-band guess

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{generate_key, TtlCache};
use crate::config::SimulatorConfig;
use crate::error::ApiError;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Impacts closer than this to a listed metro use its density
pub const METRO_RADIUS_KM: f64 = 50.0;
pub const URBAN_RADIUS_KM: f64 = 25.0;
pub const MIN_METRO_DENSITY: f64 = 50.0;
pub const DEFAULT_DENSITY: f64 = 50.0;

/// Multiplier when the geocoder places the point inside a settlement
const SETTLEMENT_MULTIPLIER: f64 = 3.0;

/// Place names do not move
pub const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

// Fatality rates per ring
const FIREBALL_FATALITY: f64 = 0.95;
const OVERPRESSURE_FATALITY: f64 = 0.50;
const THERMAL_FATALITY: f64 = 0.15;
const SURVIVOR_INJURY: f64 = 0.60;

// =============================================================================
// REFERENCE TABLES (WorldPop / UN 2024)
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Metro {
    name: &'static str,
    lat: f64,
    lng: f64,
    /// people/km²
    density: f64,
    population: u64,
}

const fn metro(name: &'static str, lat: f64, lng: f64, density: f64, population: u64) -> Metro {
    Metro {
        name,
        lat,
        lng,
        density,
        population,
    }
}

const METROS: [Metro; 30] = [
    metro("Tokyo", 35.6762, 139.6503, 6168.0, 37_400_000),
    metro("Delhi", 28.7041, 77.1025, 11320.0, 30_300_000),
    metro("Shanghai", 31.2304, 121.4737, 3826.0, 27_100_000),
    metro("São Paulo", -23.5505, -46.6333, 7398.0, 22_000_000),
    metro("Mexico City", 19.4326, -99.1332, 6000.0, 21_800_000),
    metro("Cairo", 30.0444, 31.2357, 19376.0, 20_900_000),
    metro("Mumbai", 19.0760, 72.8777, 31700.0, 20_400_000),
    metro("Beijing", 39.9042, 116.4074, 1311.0, 20_400_000),
    metro("Dhaka", 23.8103, 90.4125, 44500.0, 20_300_000),
    metro("Osaka", 34.6937, 135.5023, 12000.0, 19_300_000),
    metro("New York", 40.7128, -74.0060, 10715.0, 18_800_000),
    metro("Karachi", 24.8607, 67.0011, 24000.0, 16_100_000),
    metro("Buenos Aires", -34.6037, -58.3816, 14000.0, 15_200_000),
    metro("Istanbul", 41.0082, 28.9784, 2976.0, 15_200_000),
    metro("Kolkata", 22.5726, 88.3639, 24000.0, 14_900_000),
    metro("Manila", 14.5995, 120.9842, 42857.0, 13_900_000),
    metro("Lagos", 6.5244, 3.3792, 13128.0, 13_900_000),
    metro("Rio de Janeiro", -22.9068, -43.1729, 5265.0, 13_400_000),
    metro("Guangzhou", 23.1291, 113.2644, 1800.0, 13_300_000),
    metro("Los Angeles", 34.0522, -118.2437, 3198.0, 12_400_000),
    metro("Moscow", 55.7558, 37.6173, 4823.0, 12_500_000),
    metro("Paris", 48.8566, 2.3522, 21000.0, 11_000_000),
    metro("London", 51.5074, -0.1278, 5701.0, 9_500_000),
    metro("Chicago", 41.8781, -87.6298, 4447.0, 8_900_000),
    metro("Bangalore", 12.9716, 77.5946, 11000.0, 8_400_000),
    metro("Hong Kong", 22.3193, 114.1694, 6777.0, 7_500_000),
    metro("Singapore", 1.3521, 103.8198, 8358.0, 5_700_000),
    metro("Sydney", -33.8688, 151.2093, 2058.0, 5_300_000),
    metro("San Francisco", 37.7749, -122.4194, 6658.0, 4_700_000),
    metro("Toronto", 43.6532, -79.3832, 4334.0, 6_200_000),
];

/// Country-average densities (people/km²)
const COUNTRY_DENSITIES: [(&str, f64); 26] = [
    ("Monaco", 26150.0),
    ("Singapore", 8358.0),
    ("Hong Kong", 6777.0),
    ("Bangladesh", 1265.0),
    ("Lebanon", 669.0),
    ("Taiwan", 673.0),
    ("South Korea", 527.0),
    ("Netherlands", 508.0),
    ("Belgium", 383.0),
    ("Japan", 347.0),
    ("India", 464.0),
    ("Philippines", 368.0),
    ("Vietnam", 314.0),
    ("United Kingdom", 281.0),
    ("Germany", 240.0),
    ("Italy", 206.0),
    ("China", 153.0),
    ("Indonesia", 151.0),
    ("Nigeria", 226.0),
    ("Pakistan", 287.0),
    ("United States", 36.0),
    ("Brazil", 25.0),
    ("Mexico", 66.0),
    ("Russia", 9.0),
    ("Australia", 3.0),
    ("Canada", 4.0),
];

pub fn country_density(country: &str) -> Option<f64> {
    let wanted = country.trim().to_lowercase();
    COUNTRY_DENSITIES
        .iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .map(|(_, density)| *density)
}

/// Coarse biome proxy by |latitude|
pub fn latitude_band_density(lat: f64) -> f64 {
    let abs_lat = lat.abs();
    if abs_lat < 30.0 {
        80.0
    } else if abs_lat < 50.0 {
        60.0
    } else if abs_lat < 60.0 {
        20.0
    } else {
        2.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MajorCity {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub population: u64,
}

/// Every metro in the reference table, for map overlays.
pub fn major_cities() -> Vec<MajorCity> {
    METROS
        .iter()
        .map(|m| MajorCity {
            name: m.name,
            lat: m.lat,
            lng: m.lng,
            population: m.population,
        })
        .collect()
}

/// Great-circle distance (km)
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

fn nearest_metro(lat: f64, lng: f64) -> Option<(&'static Metro, f64)> {
    METROS
        .iter()
        .map(|m| (m, haversine_km(lat, lng, m.lat, m.lng)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

// =============================================================================
// POPULATION DATA
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DensitySource {
    Metro,
    Country,
    LatitudeBand,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationData {
    /// people/km²
    pub density: f64,
    /// Metro population when matched, else 0
    pub total_population: u64,
    pub nearest_city: Option<String>,
    pub urban_area: bool,
    pub source: DensitySource,
}

impl PopulationData {
    /// Global average used when nothing else can be resolved.
    pub fn global_default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            total_population: 0,
            nearest_city: None,
            urban_area: false,
            source: DensitySource::Default,
        }
    }
}

// =============================================================================
// REVERSE GEOCODER
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeocodeAddress {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
}

impl GeocodeAddress {
    pub fn is_settlement(&self) -> bool {
        self.city.is_some() || self.town.is_some() || self.village.is_some()
    }
}

pub trait ReverseGeocoder {
    fn reverse_geocode(
        &self,
        lat: f64,
        lng: f64,
    ) -> impl Future<Output = Result<GeocodeAddress, ApiError>> + Send;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: Option<GeocodeAddress>,
}

/// OpenStreetMap Nominatim reverse geocoder
pub struct NominatimClient {
    client: reqwest::Client,
    endpoint: String,
    cache: Arc<TtlCache<GeocodeAddress>>,
}

impl NominatimClient {
    pub fn new(client: reqwest::Client, endpoint: String, cache: Arc<TtlCache<GeocodeAddress>>) -> Self {
        Self {
            client,
            endpoint,
            cache,
        }
    }

    pub fn from_config(config: &SimulatorConfig, cache: Arc<TtlCache<GeocodeAddress>>) -> Self {
        Self::new(config.http_client(), config.nominatim_url.clone(), cache)
    }

    async fn fetch(&self, lat: f64, lng: f64) -> Result<GeocodeAddress, ApiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("format", "json".to_string()),
                // country names must match the English density table
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let data: NominatimResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        // open ocean answers with an error object and no address
        Ok(data.address.unwrap_or_default())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl ReverseGeocoder for NominatimClient {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<GeocodeAddress, ApiError> {
        let key = generate_key(
            "nominatim:reverse",
            &[("lat", round2(lat).to_string()), ("lng", round2(lng).to_string())],
        );
        self.cache
            .get_or_fetch(&key, GEOCODE_CACHE_TTL, || self.fetch(lat, lng))
            .await
    }
}

// =============================================================================
// POPULATION MODEL
// =============================================================================

pub struct PopulationModel<G> {
    geocoder: G,
}

impl<G: ReverseGeocoder> PopulationModel<G> {
    pub fn new(geocoder: G) -> Self {
        Self { geocoder }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Density estimate for a coordinate. Never fails.
    pub async fn get_population_density(&self, lat: f64, lng: f64) -> PopulationData {
        if !lat.is_finite() || !lng.is_finite() {
            return PopulationData::global_default();
        }

        let nearest = nearest_metro(lat, lng);
        if let Some(data) = nearest.and_then(|(m, d)| metro_density(m, d)) {
            return data;
        }
        let nearest_city = nearest.map(|(m, _)| m.name.to_string());

        match self.geocoder.reverse_geocode(lat, lng).await {
            Ok(address) => {
                if let Some(density) = address.country.as_deref().and_then(country_density) {
                    let urban = address.is_settlement();
                    let multiplier = if urban { SETTLEMENT_MULTIPLIER } else { 1.0 };
                    return PopulationData {
                        density: density * multiplier,
                        total_population: 0,
                        nearest_city,
                        urban_area: urban,
                        source: DensitySource::Country,
                    };
                }
                tracing::debug!(
                    "no country density for {:?} at ({}, {})",
                    address.country,
                    lat,
                    lng
                );
            }
            Err(e) => {
                tracing::warn!("reverse geocoding failed at ({}, {}): {}", lat, lng, e);
            }
        }

        PopulationData {
            density: latitude_band_density(lat),
            total_population: 0,
            nearest_city,
            urban_area: false,
            source: DensitySource::LatitudeBand,
        }
    }
}

fn metro_density(metro: &Metro, distance_km: f64) -> Option<PopulationData> {
    if distance_km >= METRO_RADIUS_KM {
        return None;
    }
    let decay = (1.0 - distance_km / METRO_RADIUS_KM).sqrt();

    Some(PopulationData {
        density: (metro.density * decay).max(MIN_METRO_DENSITY),
        total_population: metro.population,
        nearest_city: Some(metro.name.to_string()),
        urban_area: distance_km < URBAN_RADIUS_KM,
        source: DensitySource::Metro,
    })
}

// =============================================================================
// CASUALTIES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CasualtyBreakdown {
    pub fireball: u64,
    pub overpressure: u64,
    pub thermal: u64,
    pub injured: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CasualtyEstimate {
    /// Fatalities
    pub estimated: u64,
    pub affected_population: u64,
    #[serde(default)]
    pub breakdown: CasualtyBreakdown,
}

/// Fatalities and injuries over three nested rings: fireball disk,
/// overpressure annulus, thermal annulus.
pub fn calculate_casualties(
    population: &PopulationData,
    fireball_radius_km: f64,
    overpressure_radius_km: f64,
    thermal_radius_km: f64,
) -> CasualtyEstimate {
    let density = population.density.max(0.0);
    let disk = |r: f64| PI * r.max(0.0).powi(2);

    let fireball_area = disk(fireball_radius_km);
    let overpressure_area = (disk(overpressure_radius_km) - fireball_area).max(0.0);
    let thermal_area = (disk(thermal_radius_km) - disk(overpressure_radius_km)).max(0.0);

    let fireball_pop = fireball_area * density;
    let overpressure_pop = overpressure_area * density;
    let thermal_pop = thermal_area * density;

    let fireball_deaths = fireball_pop * FIREBALL_FATALITY;
    let overpressure_deaths = overpressure_pop * OVERPRESSURE_FATALITY;
    let thermal_deaths = thermal_pop * THERMAL_FATALITY;

    let fatalities = fireball_deaths + overpressure_deaths + thermal_deaths;
    let affected = fireball_pop + overpressure_pop + thermal_pop;
    let injured = (affected - fatalities) * SURVIVOR_INJURY;

    CasualtyEstimate {
        estimated: to_count(fatalities),
        affected_population: to_count(affected),
        breakdown: CasualtyBreakdown {
            fireball: to_count(fireball_deaths),
            overpressure: to_count(overpressure_deaths),
            thermal: to_count(thermal_deaths),
            injured: to_count(injured),
        },
    }
}

/// Nearest whole person; non-finite or negative inputs count as zero.
fn to_count(x: f64) -> u64 {
    if x.is_finite() && x > 0.0 {
        x.round() as u64
    } else {
        0
    }
}
