// Impact Physics - scaling-law effect models
// Energy first; crater, seismic, atmospheric and tsunami all consume it
//
// References: Collins et al. (2005), Holsapple (1993), Schultz & Gault (1975)

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::ParameterError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Joules per ton of TNT; one "megaton" below is this × 1000
pub const TNT_JOULES: f64 = 4.184e9;

/// Fraction of kinetic energy coupled into ground shaking
pub const SEISMIC_EFFICIENCY: f64 = 1e-4;

pub const MAX_MAGNITUDE: f64 = 12.0;
pub const MAX_SEISMIC_RADIUS_KM: f64 = 1500.0;
pub const MAX_WAVE_HEIGHT_M: f64 = 500.0;
pub const MAX_TSUNAMI_RADIUS_KM: f64 = 10_000.0;

/// Crater scaling constants K (D = K·E^(1/3.4) km)
pub const CRATER_K_LAND: f64 = 1.2;
pub const CRATER_K_WATER: f64 = 1.8;

// =============================================================================
// INPUT
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ParameterError::Latitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ParameterError::Longitude(self.lng));
        }
        Ok(())
    }
}

/// Asteroid and target description for one simulation run. Never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asteroid_id: Option<String>,
    /// Diameter (m)
    pub size: f64,
    /// Bulk density (kg/m³)
    pub density: f64,
    /// Entry velocity (km/s)
    pub velocity: f64,
    /// Entry angle from horizontal (degrees)
    pub angle: f64,
    pub impact_location: GeoPoint,
    /// Explicit target, overrides `impact_location` when both parts are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_longitude: Option<f64>,
    /// Caller's guess; terrain lookup overrides it when real data is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_water_impact: Option<bool>,
}

impl ImpactParameters {
    pub fn new(size: f64, density: f64, velocity: f64, angle: f64, lat: f64, lng: f64) -> Self {
        Self {
            asteroid_id: None,
            size,
            density,
            velocity,
            angle,
            impact_location: GeoPoint::new(lat, lng),
            target_latitude: None,
            target_longitude: None,
            is_water_impact: None,
        }
    }

    pub fn with_water_impact(mut self, is_water: bool) -> Self {
        self.is_water_impact = Some(is_water);
        self
    }

    pub fn with_target(mut self, lat: f64, lng: f64) -> Self {
        self.target_latitude = Some(lat);
        self.target_longitude = Some(lng);
        self
    }

    /// Reject non-physical inputs instead of computing nonsense.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ParameterError::Size(self.size));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ParameterError::Density(self.density));
        }
        if !(self.velocity.is_finite() && self.velocity > 0.0) {
            return Err(ParameterError::Velocity(self.velocity));
        }
        if !(0.0..=90.0).contains(&self.angle) {
            return Err(ParameterError::Angle(self.angle));
        }
        self.impact_location.validate()?;
        self.effective_location().validate()
    }

    /// Target coordinates if given, else the impact location. Each axis falls back independently.
    pub fn effective_location(&self) -> GeoPoint {
        GeoPoint {
            lat: self.target_latitude.unwrap_or(self.impact_location.lat),
            lng: self.target_longitude.unwrap_or(self.impact_location.lng),
        }
    }

    /// Spherical mass (kg)
    pub fn mass(&self) -> f64 {
        let radius = self.size / 2.0;
        (4.0 / 3.0) * PI * radius.powi(3) * self.density
    }
}

// =============================================================================
// OUTPUT AGGREGATES
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImpactEnergy {
    pub joules: f64,
    pub megatons_tnt: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Crater {
    /// meters
    pub diameter: f64,
    /// meters
    pub depth: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeismicEffects {
    /// Richter magnitude, [0, 12]
    pub magnitude: f64,
    /// Felt radius (km)
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TsunamiEffects {
    /// meters
    pub wave_height: f64,
    /// km
    pub affected_radius: f64,
}

/// Effect radii (km). Always ordered thermal >= overpressure >= fireball.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AtmosphericEffects {
    pub fireball_radius: f64,
    pub thermal_radiation: f64,
    pub overpressure: f64,
}

// =============================================================================
// SCALING LAWS
// =============================================================================

/// coefficient · E^exponent, zero for non-positive energy
fn power_law(energy_mt: f64, coefficient: f64, exponent: f64) -> f64 {
    if energy_mt <= 0.0 || !energy_mt.is_finite() {
        return 0.0;
    }
    coefficient * energy_mt.powf(exponent)
}

/// Kinetic energy of a spherical impactor: E = ½·m·v²
pub fn calculate_impact_energy(params: &ImpactParameters) -> ImpactEnergy {
    let velocity_ms = params.velocity * 1000.0;
    let joules = 0.5 * params.mass() * velocity_ms * velocity_ms;

    ImpactEnergy {
        joules,
        megatons_tnt: joules / (TNT_JOULES * 1000.0),
    }
}

/// Baseline crater: D = K·E^(1/3.4) km, depth D/5.
///
/// Used when terrain data is unavailable; the terrain adapter has the enhanced form.
pub fn calculate_crater_size(energy: &ImpactEnergy, is_water: bool) -> Crater {
    let k = if is_water { CRATER_K_WATER } else { CRATER_K_LAND };
    let diameter = power_law(energy.megatons_tnt, k, 1.0 / 3.4) * 1000.0;

    Crater {
        diameter,
        depth: diameter / 5.0,
    }
}

/// Richter magnitude and felt radius.
///
/// M = ⅔(log10(E·1e-4) − 4.8), clamped to [0, 12].
/// Felt radius R = 10·10^((M − 3)/2) km, capped at 1500 km. Zero energy gives M = 0, R = 0.
pub fn calculate_seismic_effects(energy: &ImpactEnergy) -> SeismicEffects {
    let seismic_energy = energy.joules * SEISMIC_EFFICIENCY;
    if seismic_energy <= 0.0 || !seismic_energy.is_finite() {
        return SeismicEffects {
            magnitude: 0.0,
            radius: 0.0,
        };
    }

    let magnitude = ((2.0 / 3.0) * (seismic_energy.log10() - 4.8)).clamp(0.0, MAX_MAGNITUDE);
    let radius = 10f64.powf((magnitude - 3.0) * 0.5) * 10.0;

    SeismicEffects {
        magnitude,
        radius: radius.min(MAX_SEISMIC_RADIUS_KM),
    }
}

/// Fireball, thermal (3rd-degree burns) and 5 psi overpressure radii.
///
/// Below 1 Mt the raw thermal law falls under the overpressure law; radii are
/// lifted so the rings stay nested for the casualty model.
pub fn calculate_atmospheric_effects(energy: &ImpactEnergy) -> AtmosphericEffects {
    let e = energy.megatons_tnt;
    let fireball_radius = power_law(e, 0.28, 0.4);
    let overpressure = power_law(e, 2.2, 0.33).max(fireball_radius);
    let thermal_radiation = power_law(e, 2.2, 0.41).max(overpressure);

    AtmosphericEffects {
        fireball_radius,
        thermal_radiation,
        overpressure,
    }
}

/// Base tsunami for water impacts; `None` on land.
pub fn calculate_tsunami_effects(energy: &ImpactEnergy, is_water: bool) -> Option<TsunamiEffects> {
    if !is_water {
        return None;
    }
    Some(base_tsunami(energy.megatons_tnt))
}

/// wave = 10·(E/1000)^0.25 m (≤ 500), radius = 15·√E km (≤ 10000)
pub(crate) fn base_tsunami(energy_mt: f64) -> TsunamiEffects {
    TsunamiEffects {
        wave_height: power_law(energy_mt / 1000.0, 10.0, 0.25).min(MAX_WAVE_HEIGHT_M),
        affected_radius: power_law(energy_mt, 15.0, 0.5).min(MAX_TSUNAMI_RADIUS_KM),
    }
}
