// NASA NeoWs API Client
// Fetches Near-Earth Object data and shapes it into impact scenario inputs

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{generate_key, TtlCache};
use crate::config::SimulatorConfig;
use crate::error::ApiError;
use crate::impact_physics::ImpactParameters;
use crate::orbital_mechanics::OrbitData;

pub const NEOWS_BASE_URL: &str = "https://api.nasa.gov/neo/rest/v1";

/// The feed endpoint rejects windows longer than a week
pub const MAX_FEED_DAYS: u32 = 7;

pub const FEED_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Used when NeoWs has no size estimate (m)
const DEFAULT_DIAMETER_M: f64 = 100.0;

/// Typical NEO encounter speed when no close approach is listed (km/s)
const DEFAULT_VELOCITY_KM_S: f64 = 20.0;

// =============================================================================
// API RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NeoWsResponse {
    pub element_count: Option<i32>,
    /// Keyed by close-approach date, ordered
    pub near_earth_objects: Option<BTreeMap<String, Vec<NeoObject>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeoObject {
    pub id: String,
    pub name: String,
    pub absolute_magnitude_h: Option<f64>,
    pub estimated_diameter: Option<EstimatedDiameter>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    pub close_approach_data: Option<Vec<CloseApproachData>>,
    pub orbital_data: Option<NeoOrbitalData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatedDiameter {
    pub meters: Option<DiameterRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiameterRange {
    pub estimated_diameter_min: f64,
    pub estimated_diameter_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseApproachData {
    pub close_approach_date: Option<String>,
    pub relative_velocity: Option<RelativeVelocity>,
    pub miss_distance: Option<MissDistance>,
    pub orbiting_body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelativeVelocity {
    pub kilometers_per_second: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissDistance {
    pub kilometers: Option<String>,
}

/// NeoWs ships every orbital element as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct NeoOrbitalData {
    pub eccentricity: Option<String>,
    pub semi_major_axis: Option<String>,
    pub inclination: Option<String>,
    pub ascending_node_longitude: Option<String>,
    pub perihelion_argument: Option<String>,
    pub mean_anomaly: Option<String>,
    pub orbit_class: Option<OrbitClass>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrbitClass {
    pub orbit_class_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowseResponse {
    pub page: Option<PageInfo>,
    pub near_earth_objects: Vec<NeoObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

// =============================================================================
// ASTEROID PROFILE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloseApproach {
    pub date: String,
    pub miss_distance_km: f64,
    pub velocity_km_s: f64,
    pub orbiting_body: String,
}

/// The physical and orbital facts the simulator needs about one NEO.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AsteroidProfile {
    pub id: String,
    pub name: String,
    /// Mean of NeoWs min/max estimate (m)
    pub diameter_m: f64,
    pub velocity_km_s: f64,
    pub absolute_magnitude: f64,
    pub is_potentially_hazardous: bool,
    pub density_kg_m3: f64,
    pub orbit_class: String,
    pub orbit: Option<OrbitData>,
    pub close_approaches: Vec<CloseApproach>,
}

impl AsteroidProfile {
    /// Spherical mass (kg)
    pub fn mass_kg(&self) -> f64 {
        let radius = self.diameter_m / 2.0;
        (4.0 / 3.0) * std::f64::consts::PI * radius.powi(3) * self.density_kg_m3
    }

    /// Scenario inputs for striking `(lat, lng)` at `angle` degrees.
    pub fn to_impact_parameters(&self, lat: f64, lng: f64, angle: f64) -> ImpactParameters {
        ImpactParameters {
            asteroid_id: Some(self.id.clone()),
            ..ImpactParameters::new(
                self.diameter_m,
                self.density_kg_m3,
                self.velocity_km_s,
                angle,
                lat,
                lng,
            )
        }
    }
}

/// Estimate asteroid density based on spectral/orbit class
/// References: Carry (2012), DeMeo & Carry (2013)
pub fn estimate_density(orbit_class: &str) -> f64 {
    match orbit_class.to_uppercase().as_str() {
        // NEA orbital classes carry no composition hint
        "AMO" | "APO" | "ATE" | "IEO" => 2000.0,

        s if s.contains('C') => 1700.0, // carbonaceous
        s if s.contains('B') => 1500.0,
        s if s.contains('D') => 1200.0,
        s if s.contains('P') => 1300.0,
        s if s.contains('S') => 2700.0, // silicaceous
        s if s.contains('Q') => 2500.0,
        s if s.contains('V') => 3200.0, // basaltic
        s if s.contains('M') => 4000.0, // metallic
        s if s.contains('X') => 3500.0,

        _ => 2000.0, // rubble pile average
    }
}

fn parse_num(value: Option<&String>) -> Option<f64> {
    value.and_then(|s| s.trim().parse::<f64>().ok())
}

impl NeoOrbitalData {
    /// Elements in AU/degrees, or `None` if any is missing or out of contract.
    pub fn to_orbit(&self) -> Option<OrbitData> {
        let orbit = OrbitData::new(
            parse_num(self.semi_major_axis.as_ref())?,
            parse_num(self.eccentricity.as_ref())?,
            parse_num(self.inclination.as_ref())?,
            parse_num(self.perihelion_argument.as_ref())?,
            parse_num(self.ascending_node_longitude.as_ref())?,
            parse_num(self.mean_anomaly.as_ref())?,
        );
        orbit.validate().ok().map(|_| orbit)
    }
}

impl NeoObject {
    pub fn to_profile(&self) -> AsteroidProfile {
        let diameter_m = self
            .estimated_diameter
            .as_ref()
            .and_then(|d| d.meters.as_ref())
            .map(|m| (m.estimated_diameter_min + m.estimated_diameter_max) / 2.0)
            .unwrap_or(DEFAULT_DIAMETER_M);

        let close_approaches: Vec<CloseApproach> = self
            .close_approach_data
            .iter()
            .flatten()
            .map(|ca| CloseApproach {
                date: ca.close_approach_date.clone().unwrap_or_default(),
                miss_distance_km: parse_num(
                    ca.miss_distance.as_ref().and_then(|m| m.kilometers.as_ref()),
                )
                .unwrap_or(0.0),
                velocity_km_s: parse_num(
                    ca.relative_velocity
                        .as_ref()
                        .and_then(|v| v.kilometers_per_second.as_ref()),
                )
                .unwrap_or(0.0),
                orbiting_body: ca
                    .orbiting_body
                    .clone()
                    .unwrap_or_else(|| "Earth".to_string()),
            })
            .collect();

        let velocity_km_s = close_approaches
            .first()
            .map(|ca| ca.velocity_km_s)
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_VELOCITY_KM_S);

        let orbit_class = self
            .orbital_data
            .as_ref()
            .and_then(|o| o.orbit_class.as_ref())
            .and_then(|c| c.orbit_class_type.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        AsteroidProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            diameter_m,
            velocity_km_s,
            absolute_magnitude: self.absolute_magnitude_h.unwrap_or(0.0),
            is_potentially_hazardous: self.is_potentially_hazardous_asteroid.unwrap_or(false),
            density_kg_m3: estimate_density(&orbit_class),
            orbit: self.orbital_data.as_ref().and_then(|o| o.to_orbit()),
            orbit_class,
            close_approaches,
        }
    }
}

// =============================================================================
// LIST HELPERS
// =============================================================================

pub fn filter_hazardous(asteroids: &[AsteroidProfile]) -> Vec<AsteroidProfile> {
    asteroids
        .iter()
        .filter(|a| a.is_potentially_hazardous)
        .cloned()
        .collect()
}

/// Largest first
pub fn sort_by_size(asteroids: &mut [AsteroidProfile]) {
    asteroids.sort_by(|a, b| b.diameter_m.total_cmp(&a.diameter_m));
}

/// Fastest first
pub fn sort_by_velocity(asteroids: &mut [AsteroidProfile]) {
    asteroids.sort_by(|a, b| b.velocity_km_s.total_cmp(&a.velocity_km_s));
}

/// Feed window starting `today`, capped at a week.
pub fn feed_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let days = days.min(MAX_FEED_DAYS);
    (today, today + ChronoDuration::days(i64::from(days)))
}

// =============================================================================
// API CLIENT
// =============================================================================

pub struct NeoWsClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    feed_cache: Arc<TtlCache<Vec<AsteroidProfile>>>,
}

impl NeoWsClient {
    pub fn new(
        api_key: String,
        client: reqwest::Client,
        feed_cache: Arc<TtlCache<Vec<AsteroidProfile>>>,
    ) -> Self {
        Self {
            api_key,
            base_url: NEOWS_BASE_URL.to_string(),
            client,
            feed_cache,
        }
    }

    pub fn from_config(config: &SimulatorConfig, feed_cache: Arc<TtlCache<Vec<AsteroidProfile>>>) -> Self {
        Self::new(config.nasa_api_key.clone(), config.http_client(), feed_cache)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R, ApiError>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// NEOs with a close approach between `start` and `end`, in date order. Cached for an hour.
    pub async fn fetch_feed(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AsteroidProfile>, ApiError> {
        let start_date = start.format("%Y-%m-%d").to_string();
        let end_date = end.format("%Y-%m-%d").to_string();
        let key = generate_key(
            "neows:feed",
            &[("start", start_date.clone()), ("end", end_date.clone())],
        );

        self.feed_cache
            .get_or_fetch(&key, FEED_CACHE_TTL, || async {
                let data: NeoWsResponse = self
                    .get_json("/feed", &[("start_date", start_date), ("end_date", end_date)])
                    .await?;

                let asteroids: Vec<AsteroidProfile> = data
                    .near_earth_objects
                    .unwrap_or_default()
                    .into_values()
                    .flatten()
                    .map(|neo| neo.to_profile())
                    .collect();

                tracing::info!("fetched {} NEOs for {}..{}", asteroids.len(), start, end);
                Ok::<_, ApiError>(asteroids)
            })
            .await
    }

    /// Feed for the next `days` days (at most a week).
    pub async fn fetch_upcoming(&self, days: u32) -> Result<Vec<AsteroidProfile>, ApiError> {
        let (start, end) = feed_window(Utc::now().date_naive(), days);
        self.fetch_feed(start, end).await
    }

    /// One page of the full catalogue, plus the total page count.
    pub async fn browse(&self, page: u32, size: u32) -> Result<(Vec<AsteroidProfile>, u32), ApiError> {
        let data: BrowseResponse = self
            .get_json(
                "/neo/browse",
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await?;

        let total_pages = data.page.map(|p| p.total_pages).unwrap_or(1);
        let asteroids = data
            .near_earth_objects
            .iter()
            .map(NeoObject::to_profile)
            .collect();

        Ok((asteroids, total_pages))
    }

    pub async fn fetch_neo(&self, neo_id: &str) -> Result<AsteroidProfile, ApiError> {
        let neo: NeoObject = self.get_json(&format!("/neo/{}", neo_id), &[]).await?;
        Ok(neo.to_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FEED_JSON: &str = r#"{
        "element_count": 2,
        "near_earth_objects": {
            "2026-10-17": [{
                "id": "3542519",
                "name": "(2010 PK9)",
                "absolute_magnitude_h": 21.9,
                "estimated_diameter": {
                    "meters": {"estimated_diameter_min": 100.0, "estimated_diameter_max": 200.0}
                },
                "is_potentially_hazardous_asteroid": true,
                "close_approach_data": [{
                    "close_approach_date": "2026-10-17",
                    "relative_velocity": {"kilometers_per_second": "18.1270536783"},
                    "miss_distance": {"kilometers": "4887435.91"},
                    "orbiting_body": "Earth"
                }],
                "orbital_data": {
                    "eccentricity": ".6875381",
                    "semi_major_axis": "1.5347",
                    "inclination": "12.51",
                    "ascending_node_longitude": "325.13",
                    "perihelion_argument": "227.55",
                    "mean_anomaly": "143.98",
                    "orbit_class": {"orbit_class_type": "APO"}
                }
            }],
            "2026-10-16": [{
                "id": "54016386",
                "name": "(2020 GH2)",
                "absolute_magnitude_h": 26.1,
                "is_potentially_hazardous_asteroid": false,
                "close_approach_data": []
            }]
        }
    }"#;

    fn profiles() -> Vec<AsteroidProfile> {
        let data: NeoWsResponse = serde_json::from_str(FEED_JSON).unwrap();
        data.near_earth_objects
            .unwrap()
            .into_values()
            .flatten()
            .map(|neo| neo.to_profile())
            .collect()
    }

    #[test]
    fn test_feed_is_in_date_order() {
        let list = profiles();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "54016386");
        assert_eq!(list[1].id, "3542519");
    }

    #[test]
    fn test_profile_from_full_record() {
        let profile = profiles().into_iter().find(|p| p.id == "3542519").unwrap();

        assert_eq!(profile.diameter_m, 150.0);
        assert_relative_eq!(profile.velocity_km_s, 18.1270536783);
        assert!(profile.is_potentially_hazardous);
        assert_eq!(profile.density_kg_m3, 2000.0);
        assert_eq!(profile.orbit_class, "APO");

        let orbit = profile.orbit.unwrap();
        assert_relative_eq!(orbit.a, 1.5347);
        assert_relative_eq!(orbit.e, 0.6875381);
        assert_relative_eq!(orbit.omega, 227.55);
        assert_relative_eq!(orbit.omega_node, 325.13);
        assert_eq!(profile.close_approaches[0].miss_distance_km, 4887435.91);
    }

    #[test]
    fn test_profile_defaults_for_sparse_record() {
        let profile = profiles().into_iter().find(|p| p.id == "54016386").unwrap();

        assert_eq!(profile.diameter_m, DEFAULT_DIAMETER_M);
        assert_eq!(profile.velocity_km_s, DEFAULT_VELOCITY_KM_S);
        assert!(profile.orbit.is_none());
        assert_eq!(profile.orbit_class, "Unknown");
    }

    #[test]
    fn test_unbound_orbit_is_dropped() {
        let data = NeoOrbitalData {
            eccentricity: Some("1.2".to_string()),
            semi_major_axis: Some("-3.0".to_string()),
            inclination: Some("10".to_string()),
            ascending_node_longitude: Some("20".to_string()),
            perihelion_argument: Some("30".to_string()),
            mean_anomaly: Some("40".to_string()),
            orbit_class: None,
        };
        assert!(data.to_orbit().is_none());
    }

    #[test]
    fn test_density_table() {
        assert_eq!(estimate_density("APO"), 2000.0);
        assert_eq!(estimate_density("c-type"), 1700.0);
        assert_eq!(estimate_density("M"), 4000.0);
        assert_eq!(estimate_density("Unknown"), 2000.0);
    }

    #[test]
    fn test_to_impact_parameters() {
        let profile = profiles().into_iter().find(|p| p.id == "3542519").unwrap();
        let params = profile.to_impact_parameters(35.0, 139.0, 45.0);

        assert_eq!(params.asteroid_id.as_deref(), Some("3542519"));
        assert_eq!(params.size, 150.0);
        assert_eq!(params.density, 2000.0);
        assert_eq!(params.angle, 45.0);
        assert_eq!(params.impact_location.lat, 35.0);
        assert!(params.validate().is_ok());
        assert_relative_eq!(params.mass(), profile.mass_kg(), max_relative = 1e-12);
    }

    #[test]
    fn test_list_helpers() {
        let mut list = profiles();
        assert_eq!(filter_hazardous(&list).len(), 1);

        sort_by_size(&mut list);
        assert_eq!(list[0].id, "3542519");

        sort_by_velocity(&mut list);
        assert_eq!(list[0].velocity_km_s, DEFAULT_VELOCITY_KM_S);
    }

    #[test]
    fn test_feed_window_capped_at_a_week() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let (start, end) = feed_window(today, 3);
        assert_eq!(start, today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

        let (_, end) = feed_window(today, 30);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_error_and_not_cached() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let cache = Arc::new(TtlCache::new());
        let neows = NeoWsClient::new("DEMO_KEY".to_string(), client, cache.clone())
            .with_base_url("http://127.0.0.1:9/neo/rest/v1");

        let result = neows.fetch_upcoming(7).await;
        assert!(matches!(result, Err(ApiError::Request(_))));
        assert!(cache.is_empty());
    }
}
