// Simulation Orchestrator - one call from parameters to effects
// Local pipeline, remote backend strategy, and the config-selected front door

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::config::SimulatorConfig;
use crate::error::{ApiError, Lookup, SimulationError};
use crate::impact_physics::{
    calculate_atmospheric_effects, calculate_crater_size, calculate_impact_energy,
    calculate_seismic_effects, calculate_tsunami_effects, AtmosphericEffects, Crater, GeoPoint,
    ImpactEnergy, ImpactParameters, SeismicEffects, TsunamiEffects,
};
use crate::population::{
    calculate_casualties, CasualtyEstimate, DensitySource, NominatimClient, PopulationModel,
    ReverseGeocoder,
};
use crate::terrain::{
    enhanced_crater, InundationZone, TerrainLookup, TerrainSource, TerrainType,
    UsgsElevationClient,
};

pub const REMOTE_SIMULATE_PATH: &str = "/api/simulation/simulate";

// =============================================================================
// RESULTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactResults {
    pub energy: ImpactEnergy,
    pub crater: Crater,
    pub seismic: SeismicEffects,
    /// Present iff the impact site is water or coastal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsunami: Option<TsunamiEffects>,
    /// Flooded coastal points sampled around a real-data water or coastal site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inundation: Option<Vec<InundationZone>>,
    pub atmospheric: AtmosphericEffects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casualties: Option<CasualtyEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain_type: Option<TerrainType>,
    /// m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// people/km²
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_city: Option<String>,
    /// Terrain came from the fallback record, not real elevation data
    #[serde(default)]
    pub terrain_estimated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_source: Option<DensitySource>,
}

impl ImpactResults {
    /// Every radius, magnitude and energy is finite and non-negative.
    pub fn is_physical(&self) -> bool {
        let mut values = vec![
            self.energy.joules,
            self.energy.megatons_tnt,
            self.crater.diameter,
            self.crater.depth,
            self.seismic.magnitude,
            self.seismic.radius,
            self.atmospheric.fireball_radius,
            self.atmospheric.thermal_radiation,
            self.atmospheric.overpressure,
        ];
        if let Some(t) = &self.tsunami {
            values.push(t.wave_height);
            values.push(t.affected_radius);
        }
        values.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

// =============================================================================
// STRATEGY
// =============================================================================

/// A complete `simulate(params) -> results` pipeline.
pub trait ImpactSimulator {
    fn simulate(
        &self,
        params: &ImpactParameters,
    ) -> impl Future<Output = Result<ImpactResults, SimulationError>> + Send;
}

// ===== LOCAL PIPELINE =====

pub struct LocalSimulator<T, G> {
    terrain: TerrainLookup<T>,
    population: PopulationModel<G>,
}

impl<T: TerrainSource, G: ReverseGeocoder> LocalSimulator<T, G> {
    pub fn new(terrain: T, geocoder: G) -> Self {
        Self {
            terrain: TerrainLookup::new(terrain),
            population: PopulationModel::new(geocoder),
        }
    }

    pub fn terrain(&self) -> &TerrainLookup<T> {
        &self.terrain
    }

    pub fn population(&self) -> &PopulationModel<G> {
        &self.population
    }
}

impl<T, G> ImpactSimulator for LocalSimulator<T, G>
where
    T: TerrainSource + Sync,
    G: ReverseGeocoder + Sync,
{
    async fn simulate(&self, params: &ImpactParameters) -> Result<ImpactResults, SimulationError> {
        params.validate()?;

        // 1. explicit target wins
        let GeoPoint { lat, lng } = params.effective_location();

        // 2. terrain
        let terrain = self.terrain.get_impact_location_details(lat, lng).await;
        let terrain_estimated = terrain.is_fallback();

        // 3-4. energy, crater
        let energy = calculate_impact_energy(params);
        let (is_water, crater) = match &terrain {
            Lookup::Found(details) => (
                details.is_water,
                enhanced_crater(details, energy.megatons_tnt, params.angle).crater(),
            ),
            Lookup::Fallback(_) => {
                let is_water = params.is_water_impact.unwrap_or(false);
                (is_water, calculate_crater_size(&energy, is_water))
            }
        };

        // 5. base formulas
        let seismic = calculate_seismic_effects(&energy);
        let atmospheric = calculate_atmospheric_effects(&energy);

        // 6. tsunami
        let (tsunami, inundation) = match &terrain {
            Lookup::Found(details) => match self
                .terrain
                .tsunami_for_location(lat, lng, details, energy.megatons_tnt)
                .await
            {
                Some(enhanced) => (Some(enhanced.effects()), Some(enhanced.coastal_areas)),
                None => (None, None),
            },
            Lookup::Fallback(_) => (calculate_tsunami_effects(&energy, is_water), None),
        };

        // 7-8. population, casualties
        let population = self.population.get_population_density(lat, lng).await;
        let casualties = calculate_casualties(
            &population,
            atmospheric.fireball_radius,
            atmospheric.overpressure,
            atmospheric.thermal_radiation,
        );

        let (terrain_type, elevation) = match &terrain {
            Lookup::Found(details) => (Some(details.terrain_type), Some(details.elevation)),
            Lookup::Fallback(_) => (is_water.then_some(TerrainType::Ocean), None),
        };

        tracing::info!(
            "simulated {:.3e} Mt impact at ({:.4}, {:.4}), water={}, terrain_estimated={}",
            energy.megatons_tnt,
            lat,
            lng,
            is_water,
            terrain_estimated
        );

        // 9. assemble
        Ok(ImpactResults {
            energy,
            crater,
            seismic,
            tsunami,
            inundation,
            atmospheric,
            casualties: Some(casualties),
            terrain_type,
            elevation,
            population_density: Some(population.density),
            nearest_city: population.nearest_city,
            terrain_estimated,
            population_source: Some(population.source),
        })
    }
}

// ===== REMOTE BACKEND =====

/// Body accepted by the remote backend.
#[derive(Debug, Serialize)]
struct RemoteRequest {
    size: f64,
    density: f64,
    velocity: f64,
    angle: f64,
    impact_location: GeoPoint,
    is_water_impact: bool,
}

impl RemoteRequest {
    /// The backend has no target fields, so the resolved location is sent as the impact point.
    fn from_params(params: &ImpactParameters) -> Self {
        Self {
            size: params.size,
            density: params.density,
            velocity: params.velocity,
            angle: params.angle,
            impact_location: params.effective_location(),
            is_water_impact: params.is_water_impact.unwrap_or(false),
        }
    }
}

/// Delegates the whole pipeline to a remote service, falling back to `fallback` on any failure.
pub struct RemoteSimulator<L> {
    client: reqwest::Client,
    base_url: String,
    fallback: L,
}

impl<L> RemoteSimulator<L> {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, fallback: L) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            fallback,
        }
    }

    pub fn fallback(&self) -> &L {
        &self.fallback
    }

    pub async fn simulate_remote(&self, params: &ImpactParameters) -> Result<ImpactResults, ApiError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), REMOTE_SIMULATE_PATH);

        let response = self
            .client
            .post(&url)
            .json(&RemoteRequest::from_params(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let results: ImpactResults = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        if !results.is_physical() {
            return Err(ApiError::Parse("backend returned non-physical values".to_string()));
        }
        Ok(results)
    }
}

impl<L: ImpactSimulator + Sync> ImpactSimulator for RemoteSimulator<L> {
    async fn simulate(&self, params: &ImpactParameters) -> Result<ImpactResults, SimulationError> {
        params.validate()?;

        match self.simulate_remote(params).await {
            Ok(results) => {
                tracing::info!("using remote backend results from {}", self.base_url);
                Ok(results)
            }
            Err(e) => {
                tracing::warn!("remote backend unavailable, falling back to local pipeline: {}", e);
                self.fallback.simulate(params).await
            }
        }
    }
}

// ===== CONFIG-SELECTED FRONT DOOR =====

pub enum Simulator<T, G> {
    Local(LocalSimulator<T, G>),
    Remote(RemoteSimulator<LocalSimulator<T, G>>),
}

impl<T: TerrainSource, G: ReverseGeocoder> Simulator<T, G> {
    /// Local pipeline, wrapped in the remote strategy when `use_backend` is set.
    pub fn from_config(config: &SimulatorConfig, terrain: T, geocoder: G) -> Self {
        let local = LocalSimulator::new(terrain, geocoder);
        if config.use_backend {
            tracing::debug!("remote backend enabled at {}", config.backend_url);
            Simulator::Remote(RemoteSimulator::new(
                config.http_client(),
                config.backend_url.clone(),
                local,
            ))
        } else {
            Simulator::Local(local)
        }
    }

    pub fn local(&self) -> &LocalSimulator<T, G> {
        match self {
            Simulator::Local(local) => local,
            Simulator::Remote(remote) => remote.fallback(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Simulator::Remote(_))
    }
}

impl Simulator<UsgsElevationClient, NominatimClient> {
    /// USGS elevations and Nominatim geocoding, each with its own cache.
    pub fn with_default_services(config: &SimulatorConfig) -> Self {
        let terrain = UsgsElevationClient::from_config(config, Arc::new(TtlCache::new()));
        let geocoder = NominatimClient::from_config(config, Arc::new(TtlCache::new()));
        Self::from_config(config, terrain, geocoder)
    }
}

impl<T, G> ImpactSimulator for Simulator<T, G>
where
    T: TerrainSource + Sync,
    G: ReverseGeocoder + Sync,
{
    async fn simulate(&self, params: &ImpactParameters) -> Result<ImpactResults, SimulationError> {
        match self {
            Simulator::Local(local) => local.simulate(params).await,
            Simulator::Remote(remote) => remote.simulate(params).await,
        }
    }
}
