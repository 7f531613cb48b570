// Terrain Lookup - USGS elevation adapter and terrain corrections
// Resolves a coordinate into water/land classification and refines crater and tsunami estimates

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{generate_key, TtlCache};
use crate::config::SimulatorConfig;
use crate::error::{ApiError, Lookup};
use crate::impact_physics::{base_tsunami, Crater, TsunamiEffects};

/// USGS EPQS value for ocean / no coverage
pub const USGS_NO_DATA: f64 = -1_000_000.0;

/// Elevation assumed for a no-data cell (m)
pub const NO_DATA_ELEVATION: f64 = -100.0;

/// Terrain elevations change rarely
pub const ELEVATION_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Kilometers per degree of latitude, as used for ring sampling
const KM_PER_DEGREE: f64 = 111.0;

const INUNDATION_SAMPLES: usize = 32;

pub const FALLBACK_SOURCE: &str = "Fallback estimation";
pub const USGS_SOURCE: &str = "USGS 3DEP";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElevationSample {
    /// meters, negative below sea level
    pub elevation: f64,
    pub lat: f64,
    pub lng: f64,
    pub source: String,
    pub is_water: bool,
}

impl ElevationSample {
    /// Sentinel returned when no elevation source answers.
    pub fn fallback(lat: f64, lng: f64) -> Self {
        Self {
            elevation: 0.0,
            lat,
            lng,
            source: FALLBACK_SOURCE.to_string(),
            is_water: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    Ocean,
    Coastal,
    Inland,
    Mountain,
}

impl TerrainType {
    /// < -10 m ocean, [-10, 100) coastal, [100, 1000) inland, otherwise mountain
    pub fn from_elevation(elevation: f64) -> Self {
        if elevation < -10.0 {
            TerrainType::Ocean
        } else if elevation < 100.0 {
            TerrainType::Coastal
        } else if elevation < 1000.0 {
            TerrainType::Inland
        } else {
            TerrainType::Mountain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerrainType::Ocean => "ocean",
            TerrainType::Coastal => "coastal",
            TerrainType::Inland => "inland",
            TerrainType::Mountain => "mountain",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationDetails {
    pub is_water: bool,
    /// Water depth (m), 0 on land
    pub depth: f64,
    pub elevation: f64,
    pub terrain_type: TerrainType,
}

impl LocationDetails {
    pub fn from_sample(sample: &ElevationSample) -> Self {
        let is_water = sample.elevation < 0.0 || sample.is_water;
        Self {
            is_water,
            depth: if is_water { sample.elevation.abs() } else { 0.0 },
            elevation: sample.elevation,
            terrain_type: TerrainType::from_elevation(sample.elevation),
        }
    }

    /// Water and coastal impacts raise a wave.
    pub fn generates_tsunami(&self) -> bool {
        self.is_water || self.terrain_type == TerrainType::Coastal
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EnhancedCrater {
    pub diameter: f64,
    pub depth: f64,
    /// m³
    pub volume: f64,
    /// m
    pub ejecta_radius: f64,
    pub modified_by_terrain: bool,
    pub terrain_factor: f64,
}

impl EnhancedCrater {
    pub fn crater(&self) -> Crater {
        Crater {
            diameter: self.diameter,
            depth: self.depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InundationZone {
    pub lat: f64,
    pub lng: f64,
    pub elevation: f64,
    pub flood_depth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedTsunami {
    pub wave_height: f64,
    pub affected_radius: f64,
    pub coastal_areas: Vec<InundationZone>,
    pub water_depth: f64,
}

impl EnhancedTsunami {
    pub fn effects(&self) -> TsunamiEffects {
        TsunamiEffects {
            wave_height: self.wave_height,
            affected_radius: self.affected_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProfilePoint {
    /// km from impact
    pub distance: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainProfile {
    pub points: Vec<ProfilePoint>,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// m per km
    pub average_slope: f64,
}

// =============================================================================
// ELEVATION SOURCE
// =============================================================================

/// Anything that can report ground elevation for a coordinate.
pub trait TerrainSource {
    fn elevation(
        &self,
        lat: f64,
        lng: f64,
    ) -> impl Future<Output = Result<ElevationSample, ApiError>> + Send;
}

#[derive(Debug, Deserialize)]
struct EpqsResponse {
    value: Option<serde_json::Value>,
}

/// USGS 3DEP Elevation Point Query Service client
pub struct UsgsElevationClient {
    client: reqwest::Client,
    endpoint: String,
    cache: Arc<TtlCache<ElevationSample>>,
}

impl UsgsElevationClient {
    pub fn new(client: reqwest::Client, endpoint: String, cache: Arc<TtlCache<ElevationSample>>) -> Self {
        Self {
            client,
            endpoint,
            cache,
        }
    }

    pub fn from_config(config: &SimulatorConfig, cache: Arc<TtlCache<ElevationSample>>) -> Self {
        Self::new(config.http_client(), config.elevation_url.clone(), cache)
    }

    async fn fetch(&self, lat: f64, lng: f64) -> Result<ElevationSample, ApiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("x", lng.to_string()),
                ("y", lat.to_string()),
                ("units", "Meters".to_string()),
                ("output", "json".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let data: EpqsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        parse_epqs_value(data.value.as_ref(), lat, lng)
    }
}

/// EPQS reports `value` as a number or a numeric string.
fn parse_epqs_value(
    value: Option<&serde_json::Value>,
    lat: f64,
    lng: f64,
) -> Result<ElevationSample, ApiError> {
    let raw = match value.ok_or(ApiError::MissingField("value"))? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ApiError::Parse("elevation value is not numeric".to_string()))?;

    let no_data = raw <= USGS_NO_DATA;
    let elevation = if no_data { NO_DATA_ELEVATION } else { raw };

    Ok(ElevationSample {
        elevation: (elevation * 100.0).round() / 100.0,
        lat,
        lng,
        source: USGS_SOURCE.to_string(),
        is_water: no_data || elevation < 0.0,
    })
}

impl TerrainSource for UsgsElevationClient {
    async fn elevation(&self, lat: f64, lng: f64) -> Result<ElevationSample, ApiError> {
        let key = generate_key(
            "usgs:elevation",
            &[("lat", lat.to_string()), ("lng", lng.to_string())],
        );
        self.cache
            .get_or_fetch(&key, ELEVATION_CACHE_TTL, || self.fetch(lat, lng))
            .await
    }
}

// =============================================================================
// PURE CORRECTIONS
// =============================================================================

/// Terrain factor: water 0.7, mountain 1.2, coastal 0.9, otherwise 1.0
pub fn terrain_factor(details: &LocationDetails) -> f64 {
    if details.is_water {
        0.7
    } else {
        match details.terrain_type {
            TerrainType::Mountain => 1.2,
            TerrainType::Coastal => 0.9,
            _ => 1.0,
        }
    }
}

/// Terrain- and angle-adjusted crater.
///
/// Base D = E^(1/3.4) km, base depth D/3. Diameter scales by (0.5 + 0.5·sin θ),
/// depth by sin θ, so a grazing impact leaves a shallow scar.
pub fn enhanced_crater(details: &LocationDetails, energy_mt: f64, angle_deg: f64) -> EnhancedCrater {
    let base_diameter = if energy_mt > 0.0 {
        energy_mt.powf(1.0 / 3.4) * 1000.0
    } else {
        0.0
    };
    let base_depth = base_diameter / 3.0;

    let factor = terrain_factor(details);
    let angle_factor = angle_deg.to_radians().sin().max(0.0);

    let diameter = base_diameter * factor * (0.5 + 0.5 * angle_factor);
    let depth = base_depth * factor * angle_factor;

    EnhancedCrater {
        diameter,
        depth,
        volume: PI * (diameter / 2.0).powi(2) * depth,
        ejecta_radius: diameter * 3.0,
        modified_by_terrain: factor != 1.0,
        terrain_factor: factor,
    }
}

/// Wave height multiplier from water depth: 0.5 + 0.5·min(depth/1000, 3)
pub fn depth_multiplier(water_depth: f64) -> f64 {
    let depth_factor = (water_depth.max(0.0) / 1000.0).min(3.0);
    0.5 + 0.5 * depth_factor
}

/// Point `distance_km` from `(lat, lng)` along `bearing` (radians from north).
pub fn ring_point(lat: f64, lng: f64, distance_km: f64, bearing: f64) -> (f64, f64) {
    let cos_lat = lat.to_radians().cos().abs().max(0.01);
    let sample_lat = (lat + distance_km / KM_PER_DEGREE * bearing.cos()).clamp(-90.0, 90.0);
    let sample_lng = lng + distance_km / (KM_PER_DEGREE * cos_lat) * bearing.sin();
    (sample_lat, (sample_lng + 180.0).rem_euclid(360.0) - 180.0)
}

// =============================================================================
// TERRAIN LOOKUP ADAPTER
// =============================================================================

/// Adapter the orchestrator talks to. Never fails: source errors become fallbacks.
pub struct TerrainLookup<T> {
    source: T,
}

impl<T: TerrainSource> TerrainLookup<T> {
    pub fn new(source: T) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub async fn get_elevation(&self, lat: f64, lng: f64) -> Lookup<ElevationSample> {
        match self.source.elevation(lat, lng).await {
            Ok(sample) => Lookup::Found(sample),
            Err(e) => {
                tracing::warn!("elevation lookup failed at ({}, {}), using fallback: {}", lat, lng, e);
                Lookup::Fallback(ElevationSample::fallback(lat, lng))
            }
        }
    }

    pub async fn get_impact_location_details(&self, lat: f64, lng: f64) -> Lookup<LocationDetails> {
        self.get_elevation(lat, lng)
            .await
            .map(|sample| LocationDetails::from_sample(&sample))
    }

    /// Elevations on a ring at half `radius_km`. Fallback samples are left out.
    pub async fn get_terrain_profile(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        num_points: usize,
    ) -> TerrainProfile {
        let distance = radius_km / 2.0;
        let mut points = Vec::with_capacity(num_points);

        for i in 0..num_points {
            let bearing = i as f64 / num_points as f64 * TAU;
            let (p_lat, p_lng) = ring_point(lat, lng, distance, bearing);
            if let Lookup::Found(sample) = self.get_elevation(p_lat, p_lng).await {
                points.push(ProfilePoint {
                    distance,
                    elevation: sample.elevation,
                });
            }
        }

        if points.is_empty() {
            return TerrainProfile {
                points,
                min_elevation: 0.0,
                max_elevation: 0.0,
                average_slope: 0.0,
            };
        }

        let min_elevation = points.iter().map(|p| p.elevation).fold(f64::INFINITY, f64::min);
        let max_elevation = points.iter().map(|p| p.elevation).fold(f64::NEG_INFINITY, f64::max);
        let average_slope = if radius_km > 0.0 {
            (max_elevation - min_elevation) / radius_km
        } else {
            0.0
        };

        TerrainProfile {
            points,
            min_elevation,
            max_elevation,
            average_slope,
        }
    }

    /// Land points near the edge of the affected area that sit below the wave crest.
    pub async fn get_coastal_inundation_zones(
        &self,
        lat: f64,
        lng: f64,
        wave_height: f64,
        radius_km: f64,
    ) -> Vec<InundationZone> {
        let distance = radius_km * 0.8;
        let mut zones = Vec::new();

        for i in 0..INUNDATION_SAMPLES {
            let bearing = i as f64 / INUNDATION_SAMPLES as f64 * TAU;
            let (p_lat, p_lng) = ring_point(lat, lng, distance, bearing);

            let Lookup::Found(sample) = self.get_elevation(p_lat, p_lng).await else {
                continue;
            };
            if sample.elevation < wave_height && sample.elevation > -10.0 {
                zones.push(InundationZone {
                    lat: p_lat,
                    lng: p_lng,
                    elevation: sample.elevation,
                    flood_depth: wave_height - sample.elevation,
                });
            }
        }

        zones
    }

    pub async fn calculate_enhanced_crater(
        &self,
        lat: f64,
        lng: f64,
        energy_mt: f64,
        angle_deg: f64,
    ) -> EnhancedCrater {
        let details = self.get_impact_location_details(lat, lng).await;
        enhanced_crater(details.value(), energy_mt, angle_deg)
    }

    pub async fn calculate_enhanced_tsunami(
        &self,
        lat: f64,
        lng: f64,
        energy_mt: f64,
    ) -> Option<EnhancedTsunami> {
        let details = self.get_impact_location_details(lat, lng).await;
        self.tsunami_for_location(lat, lng, details.value(), energy_mt)
            .await
    }

    /// Depth-scaled tsunami for already resolved location details.
    ///
    /// `None` unless the site is water or coastal. Coastal land has zero depth
    /// and therefore gets half the open-water wave.
    pub async fn tsunami_for_location(
        &self,
        lat: f64,
        lng: f64,
        details: &LocationDetails,
        energy_mt: f64,
    ) -> Option<EnhancedTsunami> {
        if !details.generates_tsunami() {
            return None;
        }

        let base = base_tsunami(energy_mt);
        let wave_height = base.wave_height * depth_multiplier(details.depth);
        let coastal_areas = if wave_height > 0.0 && base.affected_radius > 0.0 {
            self.get_coastal_inundation_zones(lat, lng, wave_height, base.affected_radius)
                .await
        } else {
            Vec::new()
        };

        Some(EnhancedTsunami {
            wave_height,
            affected_radius: base.affected_radius,
            coastal_areas,
            water_depth: details.depth,
        })
    }
}
